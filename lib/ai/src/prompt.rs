//! Prompt templates.
//!
//! Templates use `{{variable}}` placeholders. Rendering is strict: every
//! placeholder must have a value, otherwise rendering fails instead of
//! sending a half-filled prompt.

use crate::error::PromptError;

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

/// A named prompt template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    /// Template name, used in error messages.
    pub name: String,
    /// Template content with placeholders.
    pub content: String,
    /// Optional system prompt template.
    pub system_prompt: Option<String>,
}

impl PromptTemplate {
    /// Creates a new prompt template.
    #[must_use]
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
            system_prompt: None,
        }
    }

    /// Sets the system prompt template.
    #[must_use]
    pub fn with_system_prompt(mut self, system: impl Into<String>) -> Self {
        self.system_prompt = Some(system.into());
        self
    }

    /// Returns the placeholder names in order of first appearance.
    #[must_use]
    pub fn variables(&self) -> Vec<&str> {
        let mut names = Vec::new();
        for text in std::iter::once(self.content.as_str()).chain(self.system_prompt.as_deref()) {
            let mut rest = text;
            while let Some(start) = rest.find(OPEN) {
                let after = &rest[start + OPEN.len()..];
                let Some(end) = after.find(CLOSE) else { break };
                let name = after[..end].trim();
                if !names.contains(&name) {
                    names.push(name);
                }
                rest = &after[end + CLOSE.len()..];
            }
        }
        names
    }

    /// Renders the template content.
    ///
    /// # Errors
    ///
    /// Returns `PromptError::MissingVariable` if a placeholder has no value,
    /// and `PromptError::Unterminated` if a placeholder
    /// is never closed.
    pub fn render(&self, variables: &[(&str, &str)]) -> Result<String, PromptError> {
        self.substitute(&self.content, variables)
    }

    /// Renders the system prompt, if any.
    ///
    /// # Errors
    ///
    /// Same as [`PromptTemplate::render`].
    pub fn render_system_prompt(
        &self,
        variables: &[(&str, &str)],
    ) -> Result<Option<String>, PromptError> {
        self.system_prompt
            .as_deref()
            .map(|system| self.substitute(system, variables))
            .transpose()
    }

    fn substitute(&self, text: &str, variables: &[(&str, &str)]) -> Result<String, PromptError> {
        let mut out = String::with_capacity(text.len());
        let mut rest = text;

        while let Some(start) = rest.find(OPEN) {
            out.push_str(&rest[..start]);
            let after = &rest[start + OPEN.len()..];
            let end = after.find(CLOSE).ok_or_else(|| PromptError::Unterminated {
                template: self.name.clone(),
            })?;
            let name = after[..end].trim();

            let value = variables
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| *value)
                .ok_or_else(|| PromptError::MissingVariable {
                    template: self.name.clone(),
                    variable: name.to_string(),
                })?;

            out.push_str(value);
            rest = &after[end + CLOSE.len()..];
        }

        out.push_str(rest);
        Ok(out)
    }
}
