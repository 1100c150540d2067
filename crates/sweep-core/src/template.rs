//! System prompt templates.
//!
//! A template is plain text with zero or more `{user_message}` placeholders.
//! Resolution is a single literal pass: no escaping, no trimming, and text
//! introduced by the message is never expanded again.

pub const USER_MESSAGE_PLACEHOLDER: &str = "{user_message}";

pub const DEFAULT_TEMPLATE: &str = USER_MESSAGE_PLACEHOLDER;

/// Replace every `{user_message}` in `template` with `user_message`.
pub fn resolve(template: &str, user_message: &str) -> String {
    template.replace(USER_MESSAGE_PLACEHOLDER, user_message)
}

/// Resolves templates, falling back to a configured default when a prompt
/// has no content.
#[derive(Debug, Clone)]
pub struct TemplateEngine {
    default_template: String,
}

impl Default for TemplateEngine {
    fn default() -> Self {
        Self::new(DEFAULT_TEMPLATE)
    }
}

impl TemplateEngine {
    pub fn new(default_template: impl Into<String>) -> Self {
        Self {
            default_template: default_template.into(),
        }
    }

    pub fn default_template(&self) -> &str {
        &self.default_template
    }

    pub fn resolve(&self, template: Option<&str>, user_message: &str) -> String {
        match template {
            Some(t) if !t.is_empty() => resolve(t, user_message),
            _ => resolve(&self.default_template, user_message),
        }
    }
}
