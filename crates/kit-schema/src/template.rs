//! Artifact URL templates.
//!
//! A descriptor stores its download location as a template such as
//! `https://example.com/releases/download/{version}/tool_{version}.zip`.
//! The version therefore appears exactly once in the descriptor, and the
//! concrete URL is always derived from it.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{PackageName, Version};

const PLACEHOLDERS: &[&str] = &["version", "name"];

/// Errors raised while validating a URL template.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    /// The template never references `{version}`, so it cannot follow version bumps.
    #[error("URL template '{0}' does not contain the {{version}} placeholder")]
    MissingVersion(String),

    /// A `{...}` placeholder other than `{version}` or `{name}`.
    #[error("Unknown placeholder '{{{placeholder}}}' in URL template '{template}'")]
    UnknownPlaceholder {
        /// Name found between the braces.
        placeholder: String,
        /// The rejected template.
        template: String,
    },

    /// A `{` without a matching `}` (or the reverse).
    #[error("Unbalanced braces in URL template '{0}'")]
    Unbalanced(String),

    /// The template is not an http(s) URL.
    #[error("URL template '{0}' must start with http:// or https://")]
    Scheme(String),
}

/// A validated artifact URL template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UrlTemplate(String);

impl UrlTemplate {
    /// Validate and wrap a template string.
    ///
    /// # Errors
    ///
    /// See [`TemplateError`] for the individual checks.
    pub fn new(template: impl Into<String>) -> Result<Self, TemplateError> {
        let template = template.into();

        if !(template.starts_with("https://") || template.starts_with("http://")) {
            return Err(TemplateError::Scheme(template));
        }

        let placeholders = scan_placeholders(&template)?;
        if let Some(unknown) = placeholders.iter().find(|p| !PLACEHOLDERS.contains(p)) {
            return Err(TemplateError::UnknownPlaceholder {
                placeholder: (*unknown).to_string(),
                template: template.clone(),
            });
        }
        if !placeholders.contains(&"version") {
            return Err(TemplateError::MissingVersion(template));
        }

        Ok(Self(template))
    }

    /// Substitute the descriptor's fields into the template.
    pub fn render(&self, name: &PackageName, version: &Version) -> String {
        self.0
            .replace("{version}", version.as_str())
            .replace("{name}", name.as_str())
    }

    /// The raw template text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn scan_placeholders(template: &str) -> Result<Vec<&str>, TemplateError> {
    let mut found = Vec::new();
    let mut rest = template;

    while let Some(open) = rest.find(['{', '}']) {
        if rest[open..].starts_with('}') {
            return Err(TemplateError::Unbalanced(template.to_string()));
        }
        let after = &rest[open + 1..];
        let close = after
            .find('}')
            .ok_or_else(|| TemplateError::Unbalanced(template.to_string()))?;
        let inner = &after[..close];
        if inner.contains('{') {
            return Err(TemplateError::Unbalanced(template.to_string()));
        }
        found.push(inner);
        rest = &after[close + 1..];
    }

    Ok(found)
}

impl TryFrom<String> for UrlTemplate {
    type Error = TemplateError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<UrlTemplate> for String {
    fn from(t: UrlTemplate) -> Self {
        t.0
    }
}

impl std::fmt::Display for UrlTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
