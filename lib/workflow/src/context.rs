//! Pipeline context.
//!
//! Everything a pipeline needs besides its input: the backend handle, the
//! model, sampling, the confidence policy, the reference date and the
//! assistant's signature. Tests swap in a scripted backend and a fixed date.

use crate::policy::ConfidencePolicy;
use chrono::{Local, NaiveDate};
use llm_flows_ai::{Extracted, LlmBackend, LlmCall, PromptError, PromptTemplate, Sampling};
use rootcause::Report;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Default signature for confirmation messages.
pub const DEFAULT_SIGNATURE: &str = "Skynet";

/// Pipeline settings loaded from configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Minimum confidence for classification results.
    #[serde(default)]
    pub confidence_threshold: ConfidencePolicy,
    /// Sampling temperature; provider default when unset.
    #[serde(default)]
    pub temperature: Option<f32>,
    /// Nucleus sampling cutoff; provider default when unset.
    #[serde(default)]
    pub top_p: Option<f32>,
    /// Completion length cap per call; provider default when unset.
    #[serde(default)]
    pub max_tokens: Option<u32>,
    /// Name used to sign confirmation messages.
    #[serde(default = "default_signature")]
    pub signature: String,
}

fn default_signature() -> String {
    DEFAULT_SIGNATURE.to_string()
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: ConfidencePolicy::default(),
            temperature: None,
            top_p: None,
            max_tokens: None,
            signature: default_signature(),
        }
    }
}

/// Shared context threaded into every pipeline.
#[derive(Clone)]
pub struct PipelineContext {
    backend: Arc<dyn LlmBackend>,
    model: String,
    sampling: Sampling,
    max_tokens: Option<u32>,
    policy: ConfidencePolicy,
    today: Option<NaiveDate>,
    signature: String,
}

impl fmt::Debug for PipelineContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineContext")
            .field("provider", &self.backend.provider())
            .field("model", &self.model)
            .field("sampling", &self.sampling)
            .field("max_tokens", &self.max_tokens)
            .field("policy", &self.policy)
            .field("today", &self.today)
            .field("signature", &self.signature)
            .finish()
    }
}

impl PipelineContext {
    /// Creates a context with default policy, sampling and signature.
    #[must_use]
    pub fn new(backend: Arc<dyn LlmBackend>, model: impl Into<String>) -> Self {
        Self {
            backend,
            model: model.into(),
            sampling: Sampling::default(),
            max_tokens: None,
            policy: ConfidencePolicy::default(),
            today: None,
            signature: default_signature(),
        }
    }

    /// Applies pipeline configuration.
    #[must_use]
    pub fn with_config(self, config: &PipelineConfig) -> Self {
        self.with_policy(config.confidence_threshold)
            .with_sampling(Sampling {
                temperature: config.temperature,
                top_p: config.top_p,
            })
            .with_max_tokens(config.max_tokens)
            .with_signature(config.signature.clone())
    }

    /// Sets the sampling parameters.
    #[must_use]
    pub fn with_sampling(mut self, sampling: Sampling) -> Self {
        self.sampling = sampling;
        self
    }

    /// Caps the completion length of every call; `None` leaves it to the
    /// provider.
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Sets the confidence policy.
    #[must_use]
    pub fn with_policy(mut self, policy: ConfidencePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Fixes the reference date instead of reading the clock.
    #[must_use]
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    /// Sets the confirmation signature.
    #[must_use]
    pub fn with_signature(mut self, signature: impl Into<String>) -> Self {
        self.signature = signature.into();
        self
    }

    /// Returns the backend.
    #[must_use]
    pub fn backend(&self) -> &dyn LlmBackend {
        self.backend.as_ref()
    }

    /// Returns the model identifier.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Returns the sampling parameters.
    #[must_use]
    pub fn sampling(&self) -> Sampling {
        self.sampling
    }

    /// Returns the confidence policy.
    #[must_use]
    pub fn policy(&self) -> ConfidencePolicy {
        self.policy
    }

    /// Returns the confirmation signature.
    #[must_use]
    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// Returns the reference date.
    #[must_use]
    pub fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Local::now().date_naive())
    }

    /// Returns the sentence that anchors relative dates,
    /// e.g. `Today is Monday, March 3, 2025.`
    #[must_use]
    pub fn date_context(&self) -> String {
        format!("Today is {}.", self.today().format("%A, %B %-d, %Y"))
    }

    /// Starts a call on this context's model and sampling.
    #[must_use]
    pub fn call(&self, input: impl Into<String>) -> LlmCall {
        let call = LlmCall::new(self.model.clone(), input).with_sampling(self.sampling);
        match self.max_tokens {
            Some(max_tokens) => call.with_max_tokens(max_tokens),
            None => call,
        }
    }

    /// Renders a template into a call. The template content becomes the
    /// input and its system prompt the instructions.
    ///
    /// # Errors
    ///
    /// Returns the template's rendering error.
    pub fn templated_call(
        &self,
        template: &PromptTemplate,
        variables: &[(&str, &str)],
    ) -> Result<LlmCall, PromptError> {
        let call = self.call(template.render(variables)?);
        Ok(match template.render_system_prompt(variables)? {
            Some(instructions) => call.with_instructions(instructions),
            None => call,
        })
    }

    /// Renders a template and runs it as a structured call.
    ///
    /// # Errors
    ///
    /// Returns a rendering, transport or schema validation error.
    pub async fn extract<T>(
        &self,
        template: &PromptTemplate,
        variables: &[(&str, &str)],
    ) -> Result<Extracted<T>, Report>
    where
        T: JsonSchema + DeserializeOwned,
    {
        let call = self.templated_call(template, variables)?;
        Ok(call.extract::<T>(self.backend()).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use llm_flows_ai::testing::ScriptedBackend;
    use serde_json::Value as JsonValue;

    fn context() -> PipelineContext {
        PipelineContext::new(Arc::new(ScriptedBackend::new()), "llama")
            .with_today(NaiveDate::from_ymd_opt(2025, 3, 3).expect("date"))
    }

    #[test]
    fn date_context_uses_fixed_date() {
        assert_eq!(context().date_context(), "Today is Monday, March 3, 2025.");
    }

    #[test]
    fn applies_config() {
        let config = PipelineConfig {
            confidence_threshold: ConfidencePolicy::new(0.9).expect("policy"),
            temperature: Some(0.2),
            top_p: None,
            max_tokens: Some(512),
            signature: "Ops".to_string(),
        };
        let ctx = context().with_config(&config);

        assert_eq!(ctx.policy().threshold(), 0.9);
        assert_eq!(ctx.sampling().temperature, Some(0.2));
        assert_eq!(ctx.signature(), "Ops");
        let request = ctx.call("hi").request().clone();
        assert_eq!(request.temperature, Some(0.2));
        assert_eq!(request.max_tokens, Some(512));
    }

    #[test]
    fn config_defaults() {
        let config: PipelineConfig = serde_json::from_str("{}").expect("config");
        assert_eq!(config.confidence_threshold.threshold(), 0.7);
        assert_eq!(config.signature, "Skynet");
        assert!(config.temperature.is_none());
        assert!(config.max_tokens.is_none());
        assert_eq!(context().call("hi").request().max_tokens, None);
    }

    #[test]
    fn template_becomes_input_and_instructions() {
        let template = PromptTemplate::new("t", "{{date_context}} Classify.")
            .with_system_prompt("Analyze this input: '{{input}}'");
        let ctx = context();
        let date_context = ctx.date_context();
        let call = ctx
            .templated_call(&template, &[("date_context", date_context.as_str()), ("input", "lunch")])
            .expect("call");

        assert_eq!(call.request().input, "Today is Monday, March 3, 2025. Classify.");
        assert_eq!(
            call.request().instructions.as_deref(),
            Some("Analyze this input: 'lunch'")
        );
    }

    #[tokio::test]
    async fn max_tokens_reaches_the_backend() {
        let backend = Arc::new(ScriptedBackend::new().with_text(r#"{"answer": "ok"}"#));
        let ctx = PipelineContext::new(backend.clone(), "llama").with_max_tokens(Some(64));
        let template = PromptTemplate::new("t", "Answer: {{input}}");

        let _ = ctx
            .extract::<JsonValue>(&template, &[("input", "ping")])
            .await;

        assert_eq!(backend.requests()[0].max_tokens, Some(64));
    }
}
