//! Scrivener - AI text generation for editorial content
//!
//! This crate is the server-side core of an editor integration: given a
//! subject (a post, a page, ...) it builds a prompt from the subject's
//! content, asks an OpenAI-compatible chat-completion API for text, appends
//! the answer to the subject and reports the result. Around that call sit a
//! prompt-keyed response cache, a per-user hourly quota, an append-only
//! usage log and an encrypted store for the provider API key.
//!
//! Host systems plug in through traits: [`SubjectRepository`] and
//! [`AccessPolicy`] for content and permissions, [`CredentialStore`] for the
//! encrypted key, [`UsageLog`] for the audit trail and [`ExpiringStore`] for
//! cache and quota state.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use scrivener::{Requester, Scrivener, Subject};
//! use scrivener::subjects::MemorySubjectRepository;
//!
//! #[tokio::main]
//! async fn main() -> scrivener::Result<()> {
//!     let subjects = MemorySubjectRepository::with_subjects([
//!         Subject::new(42, "post", "Cats sleep up to sixteen hours a day."),
//!     ]);
//!
//!     let generator = Scrivener::builder()
//!         .secret("process-wide secret")
//!         .subjects(Arc::new(subjects))
//!         .build()?;
//!     generator.set_api_key("sk-your-key").await?;
//!
//!     let editor = Requester::new(7, ["editor"]);
//!     let generation = generator.generate(&editor, 42).await?;
//!     println!("{} ({} tokens)", generation.content, generation.tokens_used);
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod error;
pub mod generator;
pub mod hooks;
pub mod keystore;
pub mod prompt;
pub mod providers;
pub mod ratelimit;
pub mod rpc;
#[cfg(feature = "server")]
pub mod server;
pub mod store;
pub mod subjects;
pub mod telemetry;
pub mod traits;
pub mod types;
pub mod usage;
pub mod version;

// Re-export main types at crate root
pub use error::{Result, ScrivenerError};
pub use generator::{Generator, Scrivener, ScrivenerBuilder};
pub use hooks::Hooks;
pub use keystore::{ApiKey, CredentialStore, KeyStore};
pub use providers::{CompletionProvider, OpenAiClient};
pub use store::{ExpiringStore, MemoryStore};
pub use traits::{AccessPolicy, AllowAll, SubjectRepository};
pub use usage::{DailyStats, UsageLog, UsageLogEntry, UsageStatus};
pub use version::{PKG_VERSION, version_string};

// Re-export all types
pub use types::{
    ChatResponse, Generation, GenerationRequest, Message, Model, Outcome, Requester, RequesterId,
    Role, Settings, Subject, SubjectId, Usage,
};
