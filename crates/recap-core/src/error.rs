use thiserror::Error;

/// Fixed message returned for an empty or whitespace-only transcript.
pub const NOTHING_TO_SUMMARIZE: &str = "No transcript available to summarize.";

/// Classified outcome of a failed engine invocation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineFailure {
    #[error("engine returned no usable output")]
    EmptyResult,

    #[error("engine returned an unexpected result shape: {0}")]
    MalformedResult(String),

    #[error("engine hit an internal index fault: {0}")]
    InternalIndex(String),

    #[error("engine failed: {0}")]
    Other(String),
}

/// Raw fault raised by an engine before classification.
#[derive(Debug, Error)]
pub enum EngineFault {
    #[error("network error: {0}")]
    Network(String),

    #[error("engine responded with status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("{0}")]
    Model(String),
}

/// Errors surfaced by the summarization orchestrator.
#[derive(Debug, Error)]
pub enum SummarizeError {
    #[error("No transcript available to summarize.")]
    InvalidInput,

    #[error("Unknown model: {0} (expected bart or t5)")]
    UnknownModel(String),

    #[error("{0}")]
    TranscriptUnavailable(String),

    #[error("Summarization failed: {0}")]
    Engine(#[from] EngineFailure),

    #[error("Summarization failed on chunk {index}: {source}")]
    Chunk {
        index: usize,
        #[source]
        source: EngineFailure,
    },
}

/// Errors from engine construction.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("unknown engine provider: {0}")]
    UnknownProvider(String),

    #[error("engine configuration error: {0}")]
    Config(String),
}

/// Errors from the transcript fetch layer.
#[derive(Debug, Error)]
pub enum TranscriptError {
    #[error("Invalid YouTube URL: {0}")]
    InvalidUrl(String),

    #[error("No transcript available for video {0}")]
    NoTranscript(String),

    #[error("Transcript error: {0}")]
    Fetch(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_strings_carry_recognized_prefixes() {
        assert_eq!(SummarizeError::InvalidInput.to_string(), NOTHING_TO_SUMMARIZE);
        assert!(
            SummarizeError::UnknownModel("gpt4".into())
                .to_string()
                .starts_with("Unknown model: gpt4")
        );
        assert!(
            SummarizeError::Engine(EngineFailure::EmptyResult)
                .to_string()
                .starts_with("Summarization failed")
        );
        assert!(
            TranscriptError::Fetch("timeout".into())
                .to_string()
                .starts_with("Transcript error")
        );
        assert!(
            TranscriptError::NoTranscript("abc".into())
                .to_string()
                .starts_with("No transcript")
        );
    }
}
