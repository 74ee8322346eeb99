//! Prompt construction from templates and subject content.

use crate::types::{CONTENT_PLACEHOLDER, Subject};

/// Text substituted by [`PromptBuilder::preview`].
pub const SAMPLE_CONTENT: &str = "This is sample content from your post. It demonstrates how \
your prompt template will look with actual content.";

/// Merges a template with subject content.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    default_template: String,
}

impl PromptBuilder {
    pub fn new(default_template: impl Into<String>) -> Self {
        Self {
            default_template: default_template.into(),
        }
    }

    /// Build the prompt for `subject` from `raw_content`.
    ///
    /// The subject's own template wins over the default one. Only the first
    /// `{content}` is replaced and the content is inserted verbatim.
    pub fn build(&self, subject: &Subject, raw_content: &str) -> String {
        let template = subject
            .prompt_override
            .as_deref()
            .unwrap_or(&self.default_template);
        substitute(template, raw_content)
    }

    /// Render `template` against [`SAMPLE_CONTENT`].
    pub fn preview(template: &str) -> String {
        substitute(template, SAMPLE_CONTENT)
    }
}

fn substitute(template: &str, content: &str) -> String {
    template.replacen(CONTENT_PLACEHOLDER, content, 1)
}
