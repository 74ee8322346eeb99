//! Generator - runs one generation attempt end to end

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;

use chrono::NaiveDate;
use tracing::{debug, info, instrument, warn};

use crate::cache::ResponseCache;
use crate::hooks::Hooks;
use crate::keystore::{ApiKey, CredentialStore, KeyStore};
use crate::prompt::PromptBuilder;
use crate::providers::CompletionProvider;
use crate::ratelimit::RateLimiter;
use crate::telemetry;
use crate::traits::{AccessPolicy, SubjectRepository};
use crate::types::{
    Generation, GenerationRequest, MAX_TOKENS_RANGE, Message, Requester, Settings, SubjectId,
};
use crate::usage::{DailyStats, UsageLog, UsageLogEntry, UsageStatus};
use crate::{Result, ScrivenerError};

/// System message sent ahead of every prompt.
pub const SYSTEM_INSTRUCTION: &str = "You are a professional content writer. Write clear, \
well-structured and engaging text based on the material you are given.";

/// Token cap for free-form chat.
pub const CHAT_MAX_TOKENS: u32 = 100;

/// Subject id recorded for requests not tied to a subject (chat, connection test).
pub const CHAT_SUBJECT_ID: SubjectId = 0;

/// Prompt sent by [`Generator::test_connection`].
pub const TEST_PROMPT: &str = "Reply with the single word: connected.";

/// One pass through cache, quota and provider.
struct Attempt {
    operation: &'static str,
    request: GenerationRequest,
    ceiling: u32,
    cache_ttl_secs: u64,
    cacheable: bool,
    /// Subject that receives the text before the attempt counts as a success.
    merge_into: Option<SubjectId>,
}

/// The generation service.
///
/// Built by [`Scrivener::builder`](crate::Scrivener::builder); share it
/// behind an `Arc`. All methods take `&self`.
pub struct Generator {
    settings: RwLock<Settings>,
    keys: KeyStore,
    credentials: Arc<dyn CredentialStore>,
    provider: Arc<dyn CompletionProvider>,
    cache: ResponseCache,
    limiter: RateLimiter,
    usage: Arc<dyn UsageLog>,
    subjects: Arc<dyn SubjectRepository>,
    access: Arc<dyn AccessPolicy>,
    hooks: Hooks,
}

impl Generator {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        settings: Settings,
        keys: KeyStore,
        credentials: Arc<dyn CredentialStore>,
        provider: Arc<dyn CompletionProvider>,
        cache: ResponseCache,
        limiter: RateLimiter,
        usage: Arc<dyn UsageLog>,
        subjects: Arc<dyn SubjectRepository>,
        access: Arc<dyn AccessPolicy>,
        hooks: Hooks,
    ) -> Self {
        Self {
            settings: RwLock::new(settings),
            keys,
            credentials,
            provider,
            cache,
            limiter,
            usage,
            subjects,
            access,
            hooks,
        }
    }

    // ========================================================================
    // Generation
    // ========================================================================

    /// Generate text for a subject and append it to the subject's body.
    ///
    /// Permission, unknown-subject and disallowed-type rejections return
    /// before anything is logged. Every other outcome leaves exactly one
    /// usage log entry.
    #[instrument(skip(self, requester), fields(operation = "generate", requester = requester.id))]
    pub async fn generate(&self, requester: &Requester, subject_id: SubjectId) -> Result<Generation> {
        let settings = self.settings();
        if !requester.has_any_role(&settings.allowed_roles) {
            debug!("requester has no allowed role");
            return Err(ScrivenerError::PermissionDenied);
        }

        let subject = self
            .subjects
            .get(subject_id)
            .await?
            .ok_or(ScrivenerError::SubjectNotFound(subject_id))?;
        if !self.access.can_edit(requester, &subject) {
            debug!("access policy denied edit");
            return Err(ScrivenerError::PermissionDenied);
        }
        if !settings.allows_subject_type(&subject.kind) {
            return Err(ScrivenerError::SubjectTypeNotAllowed(subject.kind));
        }

        let prompt = PromptBuilder::new(settings.prompt_template.as_str())
            .build(&subject, &subject.content);
        let request = GenerationRequest::from_settings(subject.id, requester.id, prompt, &settings);

        if subject.content.trim().is_empty() {
            let err = ScrivenerError::EmptySubjectContent;
            self.log_failure("generate", &request, &err).await;
            return Err(err);
        }

        self.run(Attempt {
            operation: "generate",
            request,
            ceiling: settings.rate_limit,
            cache_ttl_secs: settings.cache_ttl_secs,
            cacheable: true,
            merge_into: Some(subject.id),
        })
        .await
    }

    /// Free-form chat capped at [`CHAT_MAX_TOKENS`]; never cached.
    #[instrument(skip(self, requester, message), fields(operation = "chat", requester = requester.id))]
    pub async fn chat(&self, requester: &Requester, message: &str) -> Result<Generation> {
        let settings = self.settings();
        if !requester.has_any_role(&settings.allowed_roles) {
            return Err(ScrivenerError::PermissionDenied);
        }

        let request =
            GenerationRequest::from_settings(CHAT_SUBJECT_ID, requester.id, message.trim(), &settings)
                .max_tokens(CHAT_MAX_TOKENS);
        if request.prompt.is_empty() {
            let err = ScrivenerError::InvalidInput("message must not be empty".into());
            self.log_failure("chat", &request, &err).await;
            return Err(err);
        }

        self.run(Attempt {
            operation: "chat",
            request,
            ceiling: settings.rate_limit,
            cache_ttl_secs: 0,
            cacheable: false,
            merge_into: None,
        })
        .await
    }

    /// Admin action: send [`TEST_PROMPT`] to the provider.
    ///
    /// Never answered from the cache, so a replaced or revoked key shows up
    /// on the next test.
    #[instrument(skip(self, requester), fields(operation = "test_connection", requester = requester.id))]
    pub async fn test_connection(&self, requester: &Requester) -> Result<Generation> {
        require_admin(requester)?;
        let settings = self.settings();
        let request =
            GenerationRequest::from_settings(CHAT_SUBJECT_ID, requester.id, TEST_PROMPT, &settings)
                .max_tokens(*MAX_TOKENS_RANGE.start());

        self.run(Attempt {
            operation: "test_connection",
            request,
            ceiling: settings.rate_limit,
            cache_ttl_secs: 0,
            cacheable: false,
            merge_into: None,
        })
        .await
    }

    async fn run(&self, attempt: Attempt) -> Result<Generation> {
        let outcome = self.attempt(&attempt).await;
        if let Err(e) = &outcome {
            warn!(operation = attempt.operation, error = %e, "generation failed");
            self.log_failure(attempt.operation, &attempt.request, e).await;
        }
        self.hooks.after_generate(&attempt.request, &outcome);
        outcome
    }

    async fn attempt(&self, attempt: &Attempt) -> Result<Generation> {
        let request = &attempt.request;
        let model = request.model.as_str();

        if attempt.cacheable {
            match self.cache.lookup(&request.prompt).await {
                Ok(Some(content)) => {
                    debug!("cache hit");
                    self.merge(attempt, &content).await?;
                    record_request(attempt.operation, UsageStatus::Cache);
                    self.append_log(UsageLogEntry::cache_hit(
                        request.requester_id,
                        request.subject_id,
                        request.prompt.as_str(),
                        content.as_str(),
                        model,
                    ))
                    .await;
                    return Ok(Generation::cached(content));
                }
                Ok(None) => {}
                Err(e) => warn!(error = %e, "cache lookup failed, treating as miss"),
            }
        }

        if !self
            .limiter
            .check_allowed(request.requester_id, attempt.ceiling)
            .await?
        {
            metrics::counter!(telemetry::RATE_LIMITED_TOTAL).increment(1);
            return Err(ScrivenerError::RateLimitExceeded {
                limit: attempt.ceiling,
            });
        }

        let api_key = self.api_key().await?;
        let messages = [
            Message::system(SYSTEM_INSTRUCTION),
            Message::user(request.prompt.as_str()),
        ];

        self.hooks.before_generate(request);
        let start = Instant::now();
        let response = self.provider.complete(&api_key, &messages, request).await;
        metrics::histogram!(telemetry::UPSTREAM_DURATION_SECONDS, "model" => model)
            .record(start.elapsed().as_secs_f64());
        let response = response?;

        let content = response.content.trim().to_string();
        let tokens = response.usage.total_tokens;
        metrics::counter!(telemetry::TOKENS_TOTAL, "model" => model).increment(u64::from(tokens));

        self.merge(attempt, &content).await?;

        if attempt.cacheable
            && let Err(e) = self
                .cache
                .store(&request.prompt, &content, attempt.cache_ttl_secs)
                .await
        {
            warn!(error = %e, "failed to cache response");
        }
        if let Err(e) = self.limiter.record_request(request.requester_id).await {
            warn!(error = %e, "failed to record rate usage");
        }

        record_request(attempt.operation, UsageStatus::Success);
        self.append_log(UsageLogEntry::success(
            request.requester_id,
            request.subject_id,
            request.prompt.as_str(),
            content.as_str(),
            tokens,
            model,
        ))
        .await;
        info!(tokens, provider = self.provider.name(), "generated");

        Ok(Generation::fresh(content, tokens))
    }

    /// Append `content` to the attempt's subject, if it has one.
    async fn merge(&self, attempt: &Attempt, content: &str) -> Result<()> {
        let Some(subject_id) = attempt.merge_into else {
            return Ok(());
        };
        self.subjects
            .append_content(subject_id, content)
            .await
            .map_err(|e| match e {
                ScrivenerError::Storage(_) => e,
                other => ScrivenerError::Storage(other.to_string()),
            })
    }

    async fn api_key(&self) -> Result<ApiKey> {
        let opaque = self
            .credentials
            .load()
            .await?
            .ok_or(ScrivenerError::MissingCredential)?;
        self.keys.retrieve(&opaque)
    }

    async fn log_failure(
        &self,
        operation: &'static str,
        request: &GenerationRequest,
        err: &ScrivenerError,
    ) {
        record_request(operation, UsageStatus::Error);
        self.append_log(UsageLogEntry::error(
            request.requester_id,
            request.subject_id,
            request.prompt.as_str(),
            request.model.as_str(),
            err.to_string(),
        ))
        .await;
    }

    /// Best effort: a failed write never fails the request.
    async fn append_log(&self, entry: UsageLogEntry) {
        if let Err(e) = self.usage.append(entry).await {
            metrics::counter!(telemetry::USAGE_LOG_FAILURES_TOTAL).increment(1);
            warn!(error = %e, "failed to write usage log entry");
        }
    }

    // ========================================================================
    // Administration
    // ========================================================================

    /// Admin action: drop every cached response.
    pub async fn clear_cache(&self, requester: &Requester) -> Result<()> {
        require_admin(requester)?;
        self.cache.clear_all().await?;
        info!(requester = requester.id, "response cache cleared");
        Ok(())
    }

    /// Aggregate of `date`'s successful requests.
    pub async fn daily_stats(&self, requester: &Requester, date: NaiveDate) -> Result<DailyStats> {
        require_admin(requester)?;
        self.usage.daily_stats(date).await
    }

    /// The newest `limit` failed attempts, newest first.
    pub async fn recent_errors(
        &self,
        requester: &Requester,
        limit: usize,
    ) -> Result<Vec<UsageLogEntry>> {
        require_admin(requester)?;
        self.usage.recent_errors(limit).await
    }

    /// Requests left in the requester's current window, `None` when unlimited.
    pub async fn remaining_quota(&self, requester: &Requester) -> Result<Option<u32>> {
        let ceiling = self.settings().rate_limit;
        self.limiter.remaining(requester.id, ceiling).await
    }

    // ========================================================================
    // Settings
    // ========================================================================

    /// Snapshot of the active settings.
    pub fn settings(&self) -> Settings {
        self.settings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Validate and activate new settings. Requests already running keep
    /// the snapshot they started with.
    pub fn update_settings(&self, settings: Settings) -> Result<()> {
        settings.validate()?;
        *self
            .settings
            .write()
            .unwrap_or_else(PoisonError::into_inner) = settings.clone();
        info!(model = %settings.model, "settings updated");
        self.hooks.settings_saved(&settings);
        Ok(())
    }

    /// Encrypt and persist a new provider API key.
    pub async fn set_api_key(&self, plaintext: &str) -> Result<()> {
        let plaintext = plaintext.trim();
        if plaintext.is_empty() {
            return Err(ScrivenerError::InvalidInput("API key must not be empty".into()));
        }
        let opaque = self.keys.store(plaintext)?;
        self.credentials.save(opaque).await?;
        info!("API key updated");
        self.hooks.settings_saved(&self.settings());
        Ok(())
    }

    /// Whether a decryptable API key is stored.
    pub async fn has_api_key(&self) -> Result<bool> {
        match self.api_key().await {
            Ok(_) => Ok(true),
            Err(ScrivenerError::MissingCredential) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// `template` (or the active template) rendered against sample content.
    pub fn preview_prompt(&self, template: Option<&str>) -> String {
        match template {
            Some(template) => PromptBuilder::preview(template),
            None => PromptBuilder::preview(&self.settings().prompt_template),
        }
    }
}

fn require_admin(requester: &Requester) -> Result<()> {
    if requester.is_admin() {
        Ok(())
    } else {
        Err(ScrivenerError::PermissionDenied)
    }
}

fn record_request(operation: &'static str, status: UsageStatus) {
    metrics::counter!(telemetry::REQUESTS_TOTAL,
        "operation" => operation,
        "status" => status.as_str(),
    )
    .increment(1);
}
