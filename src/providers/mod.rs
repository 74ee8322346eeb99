//! Outbound completion providers.
//!
//! [`CompletionProvider`] is the seam between the generator and the network;
//! [`OpenAiClient`] is the implementation for OpenAI-compatible endpoints.

pub mod openai;
pub mod traits;

pub use openai::OpenAiClient;
pub use traits::CompletionProvider;
