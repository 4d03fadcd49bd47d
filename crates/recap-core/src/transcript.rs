use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use tracing::{debug, info};

use crate::http::{default_agent, error_message};
use crate::{Transcript, TranscriptError, TranscriptFragment};

const DEFAULT_BASE_URL: &str = "https://www.youtube.com";
const DEFAULT_LANGUAGE: &str = "en";

/// Prefixes the fetch layer uses for failure text handed to the summarizer.
pub const FETCH_FAILURE_PREFIXES: [&str; 2] = ["No transcript", "Transcript error"];

static BARE_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_-]{11}$").expect("valid video id pattern"));
static URL_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:[?&]v=|youtu\.be/|youtube\.com/(?:embed|shorts|live)/)([a-zA-Z0-9_-]{11})")
        .expect("valid video url pattern")
});

/// Whether `text` is a fetch-layer failure message rather than a transcript.
pub fn is_fetch_failure(text: &str) -> bool {
    let text = text.trim_start();
    FETCH_FAILURE_PREFIXES
        .iter()
        .any(|prefix| text.starts_with(prefix))
}

/// Extract the 11-character video id from a YouTube URL or bare id.
pub fn extract_video_id(input: &str) -> Result<String, TranscriptError> {
    let input = input.trim();
    if BARE_ID.is_match(input) {
        return Ok(input.to_string());
    }
    URL_ID
        .captures(input)
        .map(|caps| caps[1].to_string())
        .ok_or_else(|| TranscriptError::InvalidUrl(input.to_string()))
}

/// Source of caption transcripts.
pub trait TranscriptSource: Send + Sync {
    fn name(&self) -> &'static str;
    fn fetch(&self, video_id: &str) -> Result<Transcript, TranscriptError>;
}

/// Resolve a URL to the joined transcript text.
pub fn fetch_transcript_text(
    source: &dyn TranscriptSource,
    url: &str,
) -> Result<String, TranscriptError> {
    let video_id = extract_video_id(url)?;
    let transcript = source.fetch(&video_id)?;
    if transcript.is_empty() {
        return Err(TranscriptError::NoTranscript(video_id));
    }
    let text = transcript.text();
    info!(
        source = source.name(),
        video_id = %video_id,
        fragments = transcript.fragments.len(),
        words = text.split_whitespace().count(),
        "fetched transcript"
    );
    Ok(text)
}

/// Caption fetcher for YouTube's timed-text endpoint.
///
/// Asks for the uploaded caption track first and falls back to the
/// auto-generated (`kind=asr`) track when that is empty.
pub struct YoutubeCaptions {
    base_url: String,
    language: String,
    agent: ureq::Agent,
}

impl YoutubeCaptions {
    pub fn new(base_url: Option<&str>, language: Option<&str>) -> Self {
        let base_url = base_url
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/')
            .to_string();
        let language = language
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(DEFAULT_LANGUAGE)
            .to_string();
        Self {
            base_url,
            language,
            agent: default_agent(),
        }
    }

    fn fetch_track(&self, video_id: &str, kind: Option<&str>) -> Result<String, TranscriptError> {
        let url = format!("{}/api/timedtext", self.base_url);
        let mut request = self
            .agent
            .get(&url)
            .query("v", video_id)
            .query("lang", &self.language)
            .query("fmt", "json3");
        if let Some(kind) = kind {
            request = request.query("kind", kind);
        }

        let response = request
            .call()
            .map_err(|e| TranscriptError::Fetch(format!("{e}")))?;
        let status = response.status().as_u16();
        let body = response
            .into_body()
            .read_to_string()
            .map_err(|e| TranscriptError::Fetch(format!("{e}")))?;

        match status {
            200..=299 => Ok(body),
            404 => Err(TranscriptError::NoTranscript(video_id.to_string())),
            _ => Err(TranscriptError::Fetch(format!(
                "status {status}: {}",
                error_message(&body)
            ))),
        }
    }
}

impl TranscriptSource for YoutubeCaptions {
    fn name(&self) -> &'static str {
        "youtube"
    }

    fn fetch(&self, video_id: &str) -> Result<Transcript, TranscriptError> {
        for kind in [None, Some("asr")] {
            let body = self.fetch_track(video_id, kind)?;
            let fragments = parse_timed_text(&body)?;
            if fragments.iter().any(|fragment| !fragment.text.trim().is_empty()) {
                return Ok(Transcript {
                    video_id: video_id.to_string(),
                    fragments,
                });
            }
            debug!(video_id, kind = kind.unwrap_or("uploaded"), "caption track empty");
        }
        Err(TranscriptError::NoTranscript(video_id.to_string()))
    }
}

#[derive(Deserialize)]
struct TimedText {
    #[serde(default)]
    events: Vec<TimedTextEvent>,
}

#[derive(Deserialize)]
struct TimedTextEvent {
    #[serde(rename = "tStartMs", default)]
    start_ms: i64,
    #[serde(rename = "dDurationMs", default)]
    duration_ms: i64,
    #[serde(default)]
    segs: Vec<TimedTextSeg>,
}

#[derive(Deserialize)]
struct TimedTextSeg {
    #[serde(default)]
    utf8: String,
}

/// Parse a `fmt=json3` timed-text body. An empty body means no track.
fn parse_timed_text(body: &str) -> Result<Vec<TranscriptFragment>, TranscriptError> {
    if body.trim().is_empty() {
        return Ok(Vec::new());
    }
    let parsed: TimedText = serde_json::from_str(body)
        .map_err(|e| TranscriptError::Fetch(format!("invalid caption payload: {e}")))?;
    Ok(parsed
        .events
        .into_iter()
        .filter_map(|event| {
            let text: String = event.segs.iter().map(|seg| seg.utf8.as_str()).collect();
            let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
            if text.is_empty() {
                return None;
            }
            Some(TranscriptFragment {
                start_ms: event.start_ms,
                duration_ms: event.duration_ms,
                text,
            })
        })
        .collect())
}
