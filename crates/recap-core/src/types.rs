use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::SummarizeError;

/// Identifies a summarization engine in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelSelector {
    Bart,
    T5,
}

impl ModelSelector {
    pub const ALL: [ModelSelector; 2] = [ModelSelector::Bart, ModelSelector::T5];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelSelector::Bart => "bart",
            ModelSelector::T5 => "t5",
        }
    }
}

impl fmt::Display for ModelSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelSelector {
    type Err = SummarizeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "bart" => Ok(ModelSelector::Bart),
            "t5" => Ok(ModelSelector::T5),
            _ => Err(SummarizeError::UnknownModel(value.to_string())),
        }
    }
}

/// A single caption fragment as delivered by the transcript source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptFragment {
    pub start_ms: i64,
    pub duration_ms: i64,
    pub text: String,
}

/// Ordered caption fragments for one video.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Transcript {
    pub video_id: String,
    pub fragments: Vec<TranscriptFragment>,
}

impl Transcript {
    /// Joined transcript text with whitespace collapsed and empty fragments dropped.
    pub fn text(&self) -> String {
        self.fragments
            .iter()
            .flat_map(|fragment| fragment.text.split_whitespace())
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn is_empty(&self) -> bool {
        self.fragments
            .iter()
            .all(|fragment| fragment.text.trim().is_empty())
    }
}

/// How the orchestrator spends engine calls on a transcript.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    #[default]
    Single,
    Chunked,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Single => f.write_str("single"),
            Strategy::Chunked => f.write_str("chunked"),
        }
    }
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "single" => Ok(Strategy::Single),
            "chunked" => Ok(Strategy::Chunked),
            other => Err(format!("strategy must be single or chunked (got {other})")),
        }
    }
}

/// Tunables for a summarization run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SummarizeOptions {
    pub max_length: usize,
    pub min_length: usize,
    pub fallback_words: usize,
    pub chunk_words: usize,
    pub strategy: Strategy,
}

impl Default for SummarizeOptions {
    fn default() -> Self {
        Self {
            max_length: 300,
            min_length: 100,
            fallback_words: 500,
            chunk_words: 300,
            strategy: Strategy::Single,
        }
    }
}

/// One summarization call: transcript text, selector and output bounds.
#[derive(Debug, Clone)]
pub struct SummaryRequest {
    pub transcript: String,
    pub model: String,
    pub max_length: usize,
    pub min_length: usize,
}

impl SummaryRequest {
    pub fn new(transcript: impl Into<String>, model: impl Into<String>) -> Self {
        let defaults = SummarizeOptions::default();
        Self {
            transcript: transcript.into(),
            model: model.into(),
            max_length: defaults.max_length,
            min_length: defaults.min_length,
        }
    }

    pub fn with_bounds(mut self, max_length: usize, min_length: usize) -> Self {
        self.max_length = max_length;
        self.min_length = min_length;
        self
    }
}

/// Records input that was cut before reaching the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Truncation {
    /// Input exceeded the engine's ceiling and was cut before the first call.
    Ceiling { kept_words: usize, total_words: usize },
    /// The first call failed and the retry ran on a prefix of the input.
    Fallback { kept_words: usize, total_words: usize },
}

impl fmt::Display for Truncation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Truncation::Ceiling {
                kept_words,
                total_words,
            } => write!(
                f,
                "transcript truncated to the first {kept_words} of {total_words} words to fit the model input limit"
            ),
            Truncation::Fallback {
                kept_words,
                total_words,
            } => write!(
                f,
                "full transcript could not be summarized; summary covers the first {kept_words} of {total_words} words"
            ),
        }
    }
}

/// A successful summarization outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub text: String,
    pub model: ModelSelector,
    pub truncation: Option<Truncation>,
}
