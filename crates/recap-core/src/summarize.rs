use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::chunk::{chunk_words, first_words, word_count};
use crate::invoke::safe_invoke;
use crate::registry::{EngineEntry, ModelRegistry};
use crate::transcript::is_fetch_failure;
use crate::{Strategy, SummarizeError, SummarizeOptions, Summary, SummaryRequest, Truncation};

/// Top-level summarization policy.
///
/// Single pass over the whole transcript first, cutting to the engine's input
/// ceiling when it declares one. Any engine failure triggers exactly one retry
/// on the first `fallback_words` words; if that retry fails too, the first
/// failure is returned.
///
/// The summary length is bounded by the engine's own `max_length` parameter.
/// It is not re-checked here beyond a warning when an engine overshoots.
#[derive(Clone)]
pub struct Summarizer {
    registry: Arc<ModelRegistry>,
    options: SummarizeOptions,
}

impl Summarizer {
    pub fn new(registry: Arc<ModelRegistry>, options: SummarizeOptions) -> Self {
        Self { registry, options }
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    pub fn options(&self) -> &SummarizeOptions {
        &self.options
    }

    /// Summarize with the configured length bounds.
    pub fn summarize(&self, transcript: &str, model: &str) -> Result<Summary, SummarizeError> {
        self.run(
            transcript,
            model,
            self.options.max_length,
            self.options.min_length,
        )
    }

    pub fn summarize_request(&self, request: &SummaryRequest) -> Result<Summary, SummarizeError> {
        self.run(
            &request.transcript,
            &request.model,
            request.max_length,
            request.min_length,
        )
    }

    /// Always-a-string form: the summary text, or the failure description.
    pub fn summarize_to_string(&self, transcript: &str, model: &str) -> String {
        match self.summarize(transcript, model) {
            Ok(summary) => summary.text,
            Err(err) => err.to_string(),
        }
    }

    fn run(
        &self,
        transcript: &str,
        model: &str,
        max_length: usize,
        min_length: usize,
    ) -> Result<Summary, SummarizeError> {
        if transcript.trim().is_empty() {
            return Err(SummarizeError::InvalidInput);
        }
        if is_fetch_failure(transcript) {
            return Err(SummarizeError::TranscriptUnavailable(
                transcript.trim().to_string(),
            ));
        }
        let entry = self.registry.lookup(model)?;
        let min_length = min_length.min(max_length);

        let summary = match self.options.strategy {
            Strategy::Single => self.single_pass(entry, transcript, max_length, min_length)?,
            Strategy::Chunked => self.chunked(entry, transcript, max_length, min_length)?,
        };

        let produced = word_count(&summary.text);
        if produced > max_length {
            warn!(
                model = %entry.selector(),
                produced,
                max_length,
                "engine returned a summary longer than requested"
            );
        }
        Ok(summary)
    }

    fn single_pass(
        &self,
        entry: &EngineEntry,
        transcript: &str,
        max_length: usize,
        min_length: usize,
    ) -> Result<Summary, SummarizeError> {
        let total_words = word_count(transcript);
        let (input, truncation) = match entry.input_ceiling() {
            Some(ceiling) if total_words > ceiling => {
                info!(
                    model = %entry.selector(),
                    words = total_words,
                    ceiling,
                    "truncating transcript to model input ceiling"
                );
                (
                    first_words(transcript, ceiling),
                    Some(Truncation::Ceiling {
                        kept_words: ceiling,
                        total_words,
                    }),
                )
            }
            _ => (transcript.to_string(), None),
        };

        debug!(model = %entry.selector(), words = total_words, "single-pass summarization");
        let primary = match safe_invoke(entry, &input, max_length, min_length) {
            Ok(text) => {
                return Ok(Summary {
                    text,
                    model: entry.selector(),
                    truncation,
                });
            }
            Err(failure) => failure,
        };

        let fallback_words = match entry.input_ceiling() {
            Some(ceiling) => self.options.fallback_words.min(ceiling),
            None => self.options.fallback_words,
        };
        info!(
            model = %entry.selector(),
            error = %primary,
            fallback_words,
            "retrying on truncated transcript"
        );
        let fallback_input = first_words(transcript, fallback_words);
        match safe_invoke(entry, &fallback_input, max_length, min_length) {
            Ok(text) => Ok(Summary {
                text,
                model: entry.selector(),
                truncation: Some(Truncation::Fallback {
                    kept_words: word_count(&fallback_input),
                    total_words,
                }),
            }),
            Err(fallback) => {
                warn!(
                    model = %entry.selector(),
                    primary = %primary,
                    fallback = %fallback,
                    "fallback summarization failed"
                );
                Err(SummarizeError::Engine(primary))
            }
        }
    }

    /// Summarize each chunk in order and concatenate the partial summaries.
    ///
    /// Length bounds are split evenly across chunks. A failing chunk fails the
    /// whole request with its index; partial output is never returned.
    fn chunked(
        &self,
        entry: &EngineEntry,
        transcript: &str,
        max_length: usize,
        min_length: usize,
    ) -> Result<Summary, SummarizeError> {
        let budget = match entry.input_ceiling() {
            Some(ceiling) => self.options.chunk_words.min(ceiling),
            None => self.options.chunk_words,
        };
        let chunks = chunk_words(transcript, budget);
        let count = chunks.clone().count();
        let chunk_max = (max_length / count).max(1);
        let chunk_min = (min_length / count).min(chunk_max);
        debug!(model = %entry.selector(), chunks = count, chunk_max, "chunked summarization");

        let mut partials = Vec::with_capacity(count);
        for (index, chunk) in chunks.enumerate() {
            let partial = safe_invoke(entry, &chunk, chunk_max, chunk_min)
                .map_err(|source| SummarizeError::Chunk { index, source })?;
            partials.push(partial);
        }

        Ok(Summary {
            text: partials.join(" "),
            model: entry.selector(),
            truncation: None,
        })
    }
}
