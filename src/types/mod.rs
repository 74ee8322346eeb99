//! Public types for the Scrivener API.

mod generate;
mod message;
mod response;
mod settings;
mod subject;

pub use generate::{Generation, GenerationRequest, Outcome};
pub use message::{Message, Role};
pub use response::{ChatResponse, Usage};
pub use settings::{
    CONTENT_PLACEHOLDER, DEFAULT_PROMPT_TEMPLATE, MAX_CACHE_TTL_SECS, MAX_RATE_LIMIT,
    MAX_TOKENS_RANGE, Model, PENALTY_RANGE, Settings, TEMPERATURE_RANGE,
};
pub use subject::{ADMIN_ROLE, Requester, RequesterId, Subject, SubjectId};
