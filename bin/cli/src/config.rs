//! Centralized CLI configuration.
//!
//! Loaded via the `config` crate from `LLM_FLOWS__`-prefixed environment
//! variables, e.g. `LLM_FLOWS__BACKEND__API_KEY` or
//! `LLM_FLOWS__PIPELINE__CONFIDENCE_THRESHOLD`.

use llm_flows_ai::LlmBackendConfig;
use llm_flows_market::MarketConfig;
use llm_flows_workflow::PipelineConfig;
use serde::Deserialize;

/// Application configuration composed from library configs.
#[derive(Debug, Default, Deserialize)]
pub struct AppConfig {
    /// Completion service connection.
    #[serde(default)]
    pub backend: LlmBackendConfig,

    /// Pipeline thresholds, sampling and signature.
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Market data provider.
    #[serde(default)]
    pub market: MarketConfig,
}

impl AppConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is present but invalid.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(
                config::Environment::with_prefix("LLM_FLOWS")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_environment() {
        let config: AppConfig = config::Config::builder()
            .build()
            .expect("empty config")
            .try_deserialize()
            .expect("defaults");

        assert_eq!(config.backend.base_url, "https://api.groq.com/openai/v1");
        assert_eq!(config.backend.timeout_seconds, 60);
        assert!(config.backend.api_key.is_none());
        assert!((config.pipeline.confidence_threshold.threshold() - 0.7).abs() < f64::EPSILON);
        assert_eq!(config.pipeline.signature, "Skynet");
        assert!(config.pipeline.max_tokens.is_none());
        assert_eq!(config.market.base_url, "https://query1.finance.yahoo.com");
    }

    #[test]
    fn nested_keys_override_defaults() {
        let config: AppConfig = config::Config::builder()
            .set_override("backend.model", "llama-3.3-70b-versatile")
            .expect("override")
            .set_override("pipeline.confidence_threshold", 0.8)
            .expect("override")
            .set_override("pipeline.signature", "Calendar Bot")
            .expect("override")
            .set_override("pipeline.max_tokens", 512)
            .expect("override")
            .build()
            .expect("config")
            .try_deserialize()
            .expect("deserialize");

        assert_eq!(config.backend.model, "llama-3.3-70b-versatile");
        assert!((config.pipeline.confidence_threshold.threshold() - 0.8).abs() < f64::EPSILON);
        assert_eq!(config.pipeline.signature, "Calendar Bot");
        assert_eq!(config.pipeline.max_tokens, Some(512));
    }

    #[test]
    fn out_of_range_threshold_is_rejected() {
        let result: Result<AppConfig, _> = config::Config::builder()
            .set_override("pipeline.confidence_threshold", 1.5)
            .expect("override")
            .build()
            .expect("config")
            .try_deserialize();

        assert!(result.is_err());
    }
}
