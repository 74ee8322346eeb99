//! Provider trait for the outbound chat-completion call.
//!
//! The generator talks to the provider through [`CompletionProvider`] only,
//! so tests and hosts can substitute their own transport. The decrypted
//! credential is handed in per call and never stored by the provider.

use async_trait::async_trait;

use crate::Result;
use crate::keystore::ApiKey;
use crate::types::{ChatResponse, GenerationRequest, Message};

/// Provider for non-streaming chat completions.
///
/// Errors map onto the upstream variants of [`ScrivenerError`](crate::ScrivenerError):
/// - `UpstreamTransport`: the request never produced a response
/// - `UpstreamApi`: non-2xx status or an error payload from the provider
/// - `MalformedUpstreamResponse`: a 2xx body without `choices[0].message.content`
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Provider name for logging/debugging.
    fn name(&self) -> &str;

    /// Send `messages` with the generation parameters of `request`.
    async fn complete(
        &self,
        api_key: &ApiKey,
        messages: &[Message],
        request: &GenerationRequest,
    ) -> Result<ChatResponse>;
}
