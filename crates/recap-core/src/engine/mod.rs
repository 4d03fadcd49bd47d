pub mod extractive;
pub mod huggingface;

use serde_json::Value;

use crate::{EngineError, EngineFault};

pub const DEFAULT_BART_MODEL: &str = "facebook/bart-large-cnn";
pub const DEFAULT_T5_MODEL: &str = "t5-small";

/// A summarization backend.
///
/// Implementations are built once at startup and shared across requests, so
/// `summarize` takes `&self` and must not keep per-call state. The returned
/// value is the engine's native response; classification happens in
/// [`crate::invoke`].
pub trait SummarizeEngine: Send + Sync {
    fn name(&self) -> &'static str;
    fn summarize(&self, text: &str, max_length: usize, min_length: usize)
    -> Result<Value, EngineFault>;
}

/// Create an engine by provider name.
///
/// - `"huggingface"` calls a Hugging Face style inference endpoint; `model`
///   defaults to `facebook/bart-large-cnn` and `base_url` to the public API.
/// - `"extractive"` is a local frequency-based sentence extractor and ignores
///   the remaining arguments.
pub fn create_engine(
    provider: &str,
    model: Option<&str>,
    api_key: Option<&str>,
    base_url: Option<&str>,
) -> Result<Box<dyn SummarizeEngine>, EngineError> {
    match provider {
        "huggingface" => Ok(Box::new(huggingface::HuggingFaceEngine::new(
            model.unwrap_or(DEFAULT_BART_MODEL),
            api_key,
            base_url,
        )?)),
        "extractive" => Ok(Box::new(extractive::ExtractiveEngine::new())),
        other => Err(EngineError::UnknownProvider(other.to_string())),
    }
}
