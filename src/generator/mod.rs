//! Generation orchestrator and its builder.

mod builder;
mod service;

pub use builder::{Scrivener, ScrivenerBuilder};
pub use service::{CHAT_MAX_TOKENS, CHAT_SUBJECT_ID, Generator, SYSTEM_INSTRUCTION, TEST_PROMPT};
