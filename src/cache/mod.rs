//! Caching subsystem.
//!
//! [`ResponseCache`] keeps generated text keyed on a fingerprint of the
//! prompt, so identical prompts inside the TTL window never reach the
//! provider. It sits in the [`Generator`](crate::Generator) in front of the
//! rate limiter: a hit neither calls the provider nor consumes quota.

pub mod response;

pub use response::{ResponseCache, fingerprint};
