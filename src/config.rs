//! Configuration for the extraction side of a handover run.
//!
//! Only the network-facing stages read [`HandoverConfig`]: rasterisation,
//! the model call and its fallback chain. Grouping, normalisation and naming
//! are configuration-free; their limits are crate constants.
//!
//! The config is a plain value built once by the caller and passed down
//! explicitly. Nothing in the library reads global state apart from the
//! provider API keys, which `edgequake_llm::ProviderFactory` takes from the
//! environment.

use crate::error::HandoverError;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use std::fmt;
use std::sync::Arc;

/// Default model priority list, best first.
pub const DEFAULT_MODELS: &[&str] = &[
    "gemini-2.5-pro",
    "gemini-2.5-flash",
    "gemini-2.5-flash-lite",
    "gemini-2.0-flash",
];

/// Provider used when neither the config nor `EDGEQUAKE_LLM_PROVIDER` names one.
pub const DEFAULT_PROVIDER: &str = "gemini";

/// Upper bound for [`HandoverConfig::max_retries`] set through the builder.
pub const MAX_RETRIES: u32 = 10;

/// Configuration for extracting a handover record.
///
/// Built via [`HandoverConfig::builder()`] or [`HandoverConfig::default()`].
///
/// # Example
/// ```rust
/// use handover_docx::HandoverConfig;
///
/// let config = HandoverConfig::builder()
///     .models(["gemini-2.5-flash", "gemini-2.0-flash"])
///     .max_retries(2)
///     .build()
///     .unwrap();
/// assert_eq!(config.models.len(), 2);
/// ```
#[derive(Clone)]
pub struct HandoverConfig {
    /// Models to try, in order. The first one that returns a usable JSON
    /// object wins. Ignored when [`provider`](Self::provider) is set.
    pub models: Vec<String>,

    /// Provider name for `ProviderFactory` (e.g. "gemini", "openai").
    /// If None, `EDGEQUAKE_LLM_PROVIDER` is read, then [`DEFAULT_PROVIDER`].
    pub provider_name: Option<String>,

    /// Pre-constructed provider. Used for a single attempt, bypassing the
    /// model list.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature. Default: 0.1.
    pub temperature: f32,

    /// Maximum output tokens. Default: 8192.
    ///
    /// Answers cut off by this limit are not valid JSON and count as a failed
    /// attempt.
    pub max_tokens: usize,

    /// Retries per model on a transient failure, before moving to the next
    /// model. Default: 1. The builder caps it at [`MAX_RETRIES`].
    pub max_retries: u32,

    /// Initial retry delay in milliseconds, doubled after each retry. Default: 500.
    pub retry_backoff_ms: u64,

    /// Per-call timeout in seconds. Default: 120.
    pub api_timeout_secs: u64,

    /// Custom system instruction. If None, uses the built-in one.
    pub system_prompt: Option<String>,

    /// Longest edge, in pixels, of a rasterised PDF page. Default: 2000.
    pub max_rendered_pixels: u32,

    /// Pages of a PDF sent to the model. Default: 10. Later pages are dropped
    /// with a warning.
    pub max_pages: usize,

    /// Receives extraction progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for HandoverConfig {
    fn default() -> Self {
        Self {
            models: DEFAULT_MODELS.iter().map(|m| m.to_string()).collect(),
            provider_name: None,
            provider: None,
            temperature: 0.1,
            max_tokens: 8192,
            max_retries: 1,
            retry_backoff_ms: 500,
            api_timeout_secs: 120,
            system_prompt: None,
            max_rendered_pixels: 2000,
            max_pages: 10,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for HandoverConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandoverConfig")
            .field("models", &self.models)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("max_pages", &self.max_pages)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl HandoverConfig {
    /// Create a new builder for `HandoverConfig`.
    pub fn builder() -> HandoverConfigBuilder {
        HandoverConfigBuilder {
            config: Self::default(),
        }
    }

    /// Provider name to build per-model providers with.
    pub fn resolved_provider_name(&self) -> String {
        self.provider_name
            .clone()
            .or_else(|| std::env::var("EDGEQUAKE_LLM_PROVIDER").ok())
            .filter(|p| !p.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_PROVIDER.to_string())
    }
}

/// Builder for [`HandoverConfig`].
#[derive(Debug)]
pub struct HandoverConfigBuilder {
    config: HandoverConfig,
}

impl HandoverConfigBuilder {
    /// Replace the model priority list.
    pub fn models<I, S>(mut self, models: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.models = models.into_iter().map(Into::into).collect();
        self
    }

    /// Use a single model.
    pub fn model(self, model: impl Into<String>) -> Self {
        self.models([model.into()])
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n.min(MAX_RETRIES);
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn max_pages(mut self, n: usize) -> Self {
        self.config.max_pages = n;
        self
    }

    pub fn progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.config.progress_callback = Some(callback);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<HandoverConfig, HandoverError> {
        let c = &self.config;
        if c.provider.is_none() && c.models.iter().all(|m| m.trim().is_empty()) {
            return Err(HandoverError::InvalidConfig(
                "At least one model is required".into(),
            ));
        }
        if c.max_tokens == 0 {
            return Err(HandoverError::InvalidConfig(
                "max_tokens must be ≥ 1".into(),
            ));
        }
        if c.max_pages == 0 {
            return Err(HandoverError::InvalidConfig("max_pages must be ≥ 1".into()));
        }
        if c.api_timeout_secs == 0 {
            return Err(HandoverError::InvalidConfig(
                "api_timeout_secs must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}
