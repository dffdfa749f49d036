//! Extraction call: send the record pages to a vision model, with fallback.
//!
//! Models are tried in priority order. Each model gets `max_retries` retries
//! for transient failures (`retry_backoff_ms * 2^(n-1)` between them, so
//! 500 ms → 1 s → 2 s). An answer that is not a JSON object is not retried on
//! the same model; the next model is tried instead. The first usable answer
//! wins.
//!
//! Prompt text lives in [`crate::prompts`]; this module owns only the control
//! flow.

use crate::config::HandoverConfig;
use crate::error::{AttemptError, HandoverError};
use crate::pipeline::parse::parse_response;
use crate::progress::ProgressCallback;
use crate::prompts::{DEFAULT_SYSTEM_PROMPT, EXTRACTION_PROMPT};
use crate::record::ExtractedRecord;
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider, ProviderFactory};
use std::future::Future;
use std::sync::Arc;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, info, warn};

/// A usable answer from one model.
#[derive(Debug, Clone)]
pub struct ModelAnswer {
    pub record: ExtractedRecord,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// Result of the whole fallback chain.
#[derive(Debug, Clone)]
pub struct ExtractionOutcome {
    pub answer: ModelAnswer,
    /// Model that produced `answer`.
    pub model: String,
    /// Models tried, including the successful one.
    pub attempts: usize,
    pub failed_attempts: Vec<AttemptError>,
}

/// Run the extraction over the page images.
pub async fn extract_record(
    images: Vec<ImageData>,
    source: &str,
    config: &HandoverConfig,
) -> Result<ExtractionOutcome, HandoverError> {
    let messages = build_messages(images, config);
    let options = build_options(config);
    let callback = config.progress_callback.as_ref();

    if let Some(provider) = &config.provider {
        let label = config
            .models
            .first()
            .cloned()
            .unwrap_or_else(|| "custom".to_string());
        return run_with_fallback(&[label], source, callback, |model| {
            let provider = Arc::clone(provider);
            let messages = &messages;
            let options = &options;
            async move { call_model(&provider, &model, messages, options, config).await }
        })
        .await;
    }

    let provider_name = config.resolved_provider_name();
    let models: Vec<String> = config
        .models
        .iter()
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty())
        .collect();

    let mut unavailable = 0usize;
    let outcome = run_with_fallback(&models, source, callback, |model| {
        let messages = &messages;
        let options = &options;
        let provider = ProviderFactory::create_llm_provider(&provider_name, &model);
        if provider.is_err() {
            unavailable += 1;
        }
        async move {
            let provider = provider.map_err(|e| AttemptError::ProviderUnavailable {
                model: model.clone(),
                detail: e.to_string(),
            })?;
            call_model(&provider, &model, messages, options, config).await
        }
    })
    .await;

    match outcome {
        Err(HandoverError::AllModelsFailed { last_error, .. })
            if unavailable == models.len() =>
        {
            Err(HandoverError::ProviderNotConfigured {
                provider: provider_name.clone(),
                hint: format!(
                    "{}\nSet the API key for '{}' (e.g. GEMINI_API_KEY) or choose another provider with --provider.",
                    last_error, provider_name
                ),
            })
        }
        other => other,
    }
}

/// Try `models` in order with `attempt`, stopping at the first success.
///
/// Every failure is reported to `callback` and collected; when all fail the
/// last error is returned inside [`HandoverError::AllModelsFailed`].
pub async fn run_with_fallback<F, Fut>(
    models: &[String],
    source: &str,
    callback: Option<&ProgressCallback>,
    mut attempt: F,
) -> Result<ExtractionOutcome, HandoverError>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<ModelAnswer, AttemptError>>,
{
    let mut failed: Vec<AttemptError> = Vec::new();

    for (i, model) in models.iter().enumerate() {
        info!("{}: extracting with {} ({}/{})", source, model, i + 1, models.len());
        if let Some(cb) = callback {
            cb.on_model_attempt(source, model, i + 1, models.len());
        }

        match attempt(model.clone()).await {
            Ok(answer) => {
                if let Some(cb) = callback {
                    cb.on_extraction_complete(source, model, answer.record.devices.len());
                }
                return Ok(ExtractionOutcome {
                    answer,
                    model: model.clone(),
                    attempts: i + 1,
                    failed_attempts: failed,
                });
            }
            Err(e) => {
                warn!("{}: {}", source, e);
                if let Some(cb) = callback {
                    cb.on_model_failed(source, model, &e.to_string());
                }
                failed.push(e);
            }
        }
    }

    Err(HandoverError::AllModelsFailed {
        attempts: failed.len(),
        last_error: failed
            .last()
            .map(ToString::to_string)
            .unwrap_or_else(|| "no model configured".to_string()),
    })
}

/// Delay before retry `attempt` (1-based): `base`, doubled per retry, saturating.
fn backoff_ms(base: u64, attempt: u32) -> u64 {
    let factor = 2u64.saturating_pow(attempt.saturating_sub(1));
    base.saturating_mul(factor)
}

/// One model: call with retry and back-off, then parse the answer.
async fn call_model(
    provider: &Arc<dyn LLMProvider>,
    model: &str,
    messages: &[ChatMessage],
    options: &CompletionOptions,
    config: &HandoverConfig,
) -> Result<ModelAnswer, AttemptError> {
    let mut last_err: Option<AttemptError> = None;

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            let backoff = backoff_ms(config.retry_backoff_ms, attempt);
            warn!(
                "{}: retry {}/{} after {}ms",
                model, attempt, config.max_retries, backoff
            );
            sleep(Duration::from_millis(backoff)).await;
        }

        let call = provider.chat(messages, Some(options));
        match timeout(Duration::from_secs(config.api_timeout_secs), call).await {
            Ok(Ok(response)) => {
                debug!(
                    "{}: {} input tokens, {} output tokens",
                    model, response.prompt_tokens, response.completion_tokens
                );
                let record = parse_response(&response.content).map_err(|detail| {
                    AttemptError::InvalidResponse {
                        model: model.to_string(),
                        detail,
                    }
                })?;
                return Ok(ModelAnswer {
                    record,
                    input_tokens: response.prompt_tokens as u64,
                    output_tokens: response.completion_tokens as u64,
                });
            }
            Ok(Err(e)) => {
                warn!("{}: attempt {} failed: {}", model, attempt + 1, e);
                last_err = Some(AttemptError::CallFailed {
                    model: model.to_string(),
                    retries: attempt,
                    detail: e.to_string(),
                });
            }
            Err(_) => {
                warn!("{}: attempt {} timed out", model, attempt + 1);
                last_err = Some(AttemptError::Timeout {
                    model: model.to_string(),
                    secs: config.api_timeout_secs,
                });
            }
        }
    }

    Err(last_err.unwrap_or_else(|| AttemptError::CallFailed {
        model: model.to_string(),
        retries: config.max_retries,
        detail: "Unknown error".to_string(),
    }))
}

/// System instruction + one user turn carrying the prompt and every page.
fn build_messages(images: Vec<ImageData>, config: &HandoverConfig) -> Vec<ChatMessage> {
    let system_prompt = config
        .system_prompt
        .as_deref()
        .unwrap_or(DEFAULT_SYSTEM_PROMPT);

    vec![
        ChatMessage::system(system_prompt),
        ChatMessage::user_with_images(EXTRACTION_PROMPT, images),
    ]
}

fn build_options(config: &HandoverConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}
