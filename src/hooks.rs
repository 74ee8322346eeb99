//! Typed extension points.
//!
//! Hosts register plain closures for the three events the generator emits.
//! Callbacks run inline on the request task, in registration order, and
//! cannot alter the outcome.

use std::fmt;
use std::sync::Arc;

use crate::types::{GenerationRequest, Outcome, Settings};

type SettingsSaved = Arc<dyn Fn(&Settings) + Send + Sync>;
type BeforeGenerate = Arc<dyn Fn(&GenerationRequest) + Send + Sync>;
type AfterGenerate = Arc<dyn Fn(&GenerationRequest, &Outcome) + Send + Sync>;

/// Registered callbacks, grouped by event.
#[derive(Clone, Default)]
pub struct Hooks {
    settings_saved: Vec<SettingsSaved>,
    before_generate: Vec<BeforeGenerate>,
    after_generate: Vec<AfterGenerate>,
}

impl Hooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called after settings or the API key were replaced.
    pub fn on_settings_saved(mut self, f: impl Fn(&Settings) + Send + Sync + 'static) -> Self {
        self.settings_saved.push(Arc::new(f));
        self
    }

    /// Called right before the outbound completion call.
    pub fn on_before_generate(
        mut self,
        f: impl Fn(&GenerationRequest) + Send + Sync + 'static,
    ) -> Self {
        self.before_generate.push(Arc::new(f));
        self
    }

    /// Called with the outcome of every attempt that reached the cache stage.
    pub fn on_after_generate(
        mut self,
        f: impl Fn(&GenerationRequest, &Outcome) + Send + Sync + 'static,
    ) -> Self {
        self.after_generate.push(Arc::new(f));
        self
    }

    pub(crate) fn settings_saved(&self, settings: &Settings) {
        for hook in &self.settings_saved {
            hook(settings);
        }
    }

    pub(crate) fn before_generate(&self, request: &GenerationRequest) {
        for hook in &self.before_generate {
            hook(request);
        }
    }

    pub(crate) fn after_generate(&self, request: &GenerationRequest, outcome: &Outcome) {
        for hook in &self.after_generate {
            hook(request, outcome);
        }
    }
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("settings_saved", &self.settings_saved.len())
            .field("before_generate", &self.before_generate.len())
            .field("after_generate", &self.after_generate.len())
            .finish()
    }
}
