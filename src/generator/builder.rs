//! Builder for configuring generator instances

use std::sync::Arc;
use std::time::Duration;

use super::Generator;
use crate::cache::ResponseCache;
use crate::hooks::Hooks;
use crate::keystore::{CredentialStore, KeyStore, MemoryCredentialStore};
use crate::providers::{CompletionProvider, OpenAiClient, openai};
use crate::ratelimit::{self, RateLimiter};
use crate::store::{ExpiringStore, MemoryStore};
use crate::traits::{AccessPolicy, AllowAll, SubjectRepository};
use crate::types::Settings;
use crate::usage::{MemoryUsageLog, UsageLog};
use crate::{Result, ScrivenerError};

/// Main entry point for creating generator instances.
pub struct Scrivener;

impl Scrivener {
    /// Create a new builder for configuring the generator.
    pub fn builder() -> ScrivenerBuilder {
        ScrivenerBuilder::new()
    }
}

/// Builder for configuring generator instances.
///
/// Only the key-store secret and a [`SubjectRepository`] are required.
/// Everything else defaults to an in-process implementation and the public
/// OpenAI endpoint.
pub struct ScrivenerBuilder {
    settings: Settings,
    secret: Option<String>,
    subjects: Option<Arc<dyn SubjectRepository>>,
    access: Arc<dyn AccessPolicy>,
    credentials: Option<Arc<dyn CredentialStore>>,
    usage: Option<Arc<dyn UsageLog>>,
    provider: Option<Arc<dyn CompletionProvider>>,
    base_url: Option<String>,
    timeout: Duration,
    cache_store: Option<Arc<dyn ExpiringStore>>,
    rate_store: Option<Arc<dyn ExpiringStore>>,
    rate_window: Duration,
    hooks: Hooks,
}

impl ScrivenerBuilder {
    pub fn new() -> Self {
        Self {
            settings: Settings::default(),
            secret: None,
            subjects: None,
            access: Arc::new(AllowAll),
            credentials: None,
            usage: None,
            provider: None,
            base_url: None,
            timeout: openai::DEFAULT_TIMEOUT,
            cache_store: None,
            rate_store: None,
            rate_window: ratelimit::WINDOW,
            hooks: Hooks::default(),
        }
    }

    /// Initial settings (validated by [`build`](Self::build)).
    pub fn settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    /// Process-wide secret the credential cipher key is derived from.
    pub fn secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = Some(secret.into());
        self
    }

    /// Where subjects are read from and generated text is appended to.
    pub fn subjects(mut self, repository: Arc<dyn SubjectRepository>) -> Self {
        self.subjects = Some(repository);
        self
    }

    /// Per-subject edit check (default: [`AllowAll`]).
    pub fn access_policy(mut self, policy: Arc<dyn AccessPolicy>) -> Self {
        self.access = policy;
        self
    }

    /// Persistence for the encrypted API key (default: in memory).
    pub fn credentials(mut self, store: Arc<dyn CredentialStore>) -> Self {
        self.credentials = Some(store);
        self
    }

    /// Usage log sink (default: [`MemoryUsageLog`]).
    pub fn usage_log(mut self, log: Arc<dyn UsageLog>) -> Self {
        self.usage = Some(log);
        self
    }

    /// Replace the outbound provider entirely.
    ///
    /// Takes precedence over [`base_url`](Self::base_url) and [`timeout`](Self::timeout).
    pub fn provider(mut self, provider: Arc<dyn CompletionProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Base URL of an OpenAI-compatible endpoint.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Timeout for one outbound call (default: 120 seconds).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Backing store for cached responses.
    pub fn cache_store(mut self, store: Arc<dyn ExpiringStore>) -> Self {
        self.cache_store = Some(store);
        self
    }

    /// Backing store for rate-limit windows.
    pub fn rate_store(mut self, store: Arc<dyn ExpiringStore>) -> Self {
        self.rate_store = Some(store);
        self
    }

    /// Length of a rate-limit window (default: one hour).
    pub fn rate_window(mut self, window: Duration) -> Self {
        self.rate_window = window;
        self
    }

    /// Extension callbacks.
    pub fn hooks(mut self, hooks: Hooks) -> Self {
        self.hooks = hooks;
        self
    }

    /// Build the generator.
    ///
    /// Fails with `Configuration` when settings are out of range, the secret
    /// or the subject repository is missing, or the HTTP client cannot be built.
    pub fn build(self) -> Result<Generator> {
        self.settings.validate()?;

        let secret = self
            .secret
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ScrivenerError::Configuration("key store secret is not set".into()))?;
        let subjects = self
            .subjects
            .ok_or_else(|| ScrivenerError::Configuration("no subject repository configured".into()))?;

        let provider = match self.provider {
            Some(provider) => provider,
            None => {
                let base_url = self
                    .base_url
                    .unwrap_or_else(|| openai::DEFAULT_BASE_URL.to_string());
                Arc::new(OpenAiClient::with_timeout(base_url, self.timeout)?)
            }
        };

        // Rate windows get their own unbounded backend: evicting one would
        // reset that requester's quota.
        let cache_store = self
            .cache_store
            .unwrap_or_else(|| Arc::new(MemoryStore::new().namespace("cache")));
        let rate_store = self
            .rate_store
            .unwrap_or_else(|| Arc::new(MemoryStore::unbounded().namespace("rate")));

        Ok(Generator::new(
            self.settings,
            KeyStore::new(&secret),
            self.credentials
                .unwrap_or_else(|| Arc::new(MemoryCredentialStore::new())),
            provider,
            ResponseCache::new(cache_store),
            RateLimiter::new(rate_store).with_window(self.rate_window),
            self.usage.unwrap_or_else(|| Arc::new(MemoryUsageLog::new())),
            subjects,
            self.access,
            self.hooks,
        ))
    }
}

impl Default for ScrivenerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
