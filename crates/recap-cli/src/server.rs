use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use recap_core::transcript::{TranscriptSource, fetch_transcript_text};
use recap_core::{SummarizeError, Summarizer, TranscriptError};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::io;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::{error, info, info_span, warn};
use uuid::Uuid;

const DEFAULT_MODEL: &str = "bart";

#[derive(Clone)]
pub struct AppState {
    summarizer: Arc<Summarizer>,
    transcripts: Arc<dyn TranscriptSource>,
}

impl AppState {
    pub fn new(summarizer: Arc<Summarizer>, transcripts: Arc<dyn TranscriptSource>) -> Self {
        Self {
            summarizer,
            transcripts,
        }
    }
}

#[derive(Deserialize)]
struct SummarizeBody {
    url: String,
    #[serde(default = "default_model")]
    model: String,
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

#[derive(Serialize)]
struct SummarizeResponse {
    summary: String,
    model_used: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    note: Option<String>,
}

/// Failure rendered as `{"error": "..."}`.
#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<SummarizeError> for ApiError {
    fn from(err: SummarizeError) -> Self {
        let status = match &err {
            SummarizeError::InvalidInput => StatusCode::UNPROCESSABLE_ENTITY,
            SummarizeError::UnknownModel(_) => StatusCode::BAD_REQUEST,
            SummarizeError::TranscriptUnavailable(_) => StatusCode::NOT_FOUND,
            SummarizeError::Engine(_) | SummarizeError::Chunk { .. } => StatusCode::BAD_GATEWAY,
        };
        Self::new(status, err.to_string())
    }
}

impl From<TranscriptError> for ApiError {
    fn from(err: TranscriptError) -> Self {
        let status = match &err {
            TranscriptError::InvalidUrl(_) => StatusCode::BAD_REQUEST,
            TranscriptError::NoTranscript(_) => StatusCode::NOT_FOUND,
            TranscriptError::Fetch(_) => StatusCode::BAD_GATEWAY,
        };
        Self::new(status, err.to_string())
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handle_root))
        .route("/summarize", post(handle_summarize))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind `host:port` and serve until ctrl-c or SIGTERM.
pub async fn serve(host: &str, port: u16, state: AppState) -> io::Result<()> {
    let listener = TcpListener::bind((host, port)).await?;
    info!(addr = %listener.local_addr()?, "listening");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn handle_root() -> Json<serde_json::Value> {
    Json(json!({ "message": "recap backend is running" }))
}

async fn handle_summarize(
    State(state): State<AppState>,
    payload: Result<Json<SummarizeBody>, JsonRejection>,
) -> Result<Json<SummarizeResponse>, ApiError> {
    let Json(body) = payload.map_err(|rejection| {
        warn!(error = %rejection.body_text(), "rejected summarize request");
        ApiError::new(StatusCode::BAD_REQUEST, rejection.body_text())
    })?;

    let request_id = Uuid::now_v7();
    let span = info_span!("summarize", %request_id, model = %body.model);

    // Fetching and summarizing both block on ureq and the engines.
    let task_span = span.clone();
    let outcome = tokio::task::spawn_blocking(move || {
        task_span.in_scope(|| summarize_url(&state, &body.url, &body.model))
    })
    .await;

    span.in_scope(|| match outcome {
        Ok(Ok(response)) => {
            info!(
                words = response.summary.split_whitespace().count(),
                truncated = response.note.is_some(),
                "summary ready"
            );
            Ok(Json(response))
        }
        Ok(Err(err)) => {
            warn!(status = err.status.as_u16(), error = %err.message, "summarize request failed");
            Err(err)
        }
        Err(join_err) => {
            error!(error = %join_err, "summarize task aborted");
            Err(ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Summarization failed: internal error while processing the request",
            ))
        }
    })
}

fn summarize_url(state: &AppState, url: &str, model: &str) -> Result<SummarizeResponse, ApiError> {
    // Reject unknown selectors before spending a transcript fetch on them.
    state.summarizer.registry().lookup(model)?;
    let transcript = fetch_transcript_text(state.transcripts.as_ref(), url)?;
    let summary = state.summarizer.summarize(&transcript, model)?;
    Ok(SummarizeResponse {
        summary: summary.text,
        model_used: summary.model.to_string(),
        note: summary.truncation.map(|truncation| truncation.to_string()),
    })
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use recap_core::engine::extractive::ExtractiveEngine;
    use recap_core::{
        EngineEntry, ModelRegistry, ModelSelector, SummarizeOptions, Transcript,
        TranscriptFragment,
    };
    use serde_json::Value;
    use std::net::SocketAddr;

    const VIDEO_ID: &str = "dQw4w9WgXcQ";
    const SILENT_ID: &str = "aaaaaaaaaaa";
    const PANIC_ID: &str = "bbbbbbbbbbb";

    struct FakeCaptions;

    impl TranscriptSource for FakeCaptions {
        fn name(&self) -> &'static str {
            "fake"
        }

        fn fetch(&self, video_id: &str) -> Result<Transcript, TranscriptError> {
            match video_id {
                VIDEO_ID => Ok(Transcript {
                    video_id: video_id.to_string(),
                    fragments: [
                        "Rust programs compile to fast native code.",
                        "The borrow checker keeps memory access safe.",
                        "Cargo builds Rust programs and fetches crates.",
                        "Many teams ship Rust programs in production.",
                    ]
                    .into_iter()
                    .map(|text| TranscriptFragment {
                        start_ms: 0,
                        duration_ms: 0,
                        text: text.to_string(),
                    })
                    .collect(),
                }),
                PANIC_ID => panic!("caption parser crashed"),
                _ => Err(TranscriptError::NoTranscript(video_id.to_string())),
            }
        }
    }

    async fn spawn_server() -> SocketAddr {
        let mut registry = ModelRegistry::new();
        registry.register(EngineEntry::with_defaults(
            ModelSelector::Bart,
            Arc::new(ExtractiveEngine::new()),
        ));
        let options = SummarizeOptions {
            max_length: 20,
            min_length: 5,
            ..SummarizeOptions::default()
        };
        let summarizer = Summarizer::new(Arc::new(registry), options);
        let state = AppState::new(Arc::new(summarizer), Arc::new(FakeCaptions));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router(state)).await.unwrap();
        });
        addr
    }

    async fn post(addr: SocketAddr, body: Value) -> (u16, Value) {
        tokio::task::spawn_blocking(move || {
            let agent = recap_core::http::default_agent();
            let response = agent
                .post(&format!("http://{addr}/summarize"))
                .send_json(body)
                .unwrap();
            let status = response.status().as_u16();
            let body: Value = response.into_body().read_json().unwrap();
            (status, body)
        })
        .await
        .unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn root_reports_running_with_cors() {
        let addr = spawn_server().await;
        let (origin, body) = tokio::task::spawn_blocking(move || {
            let response = recap_core::http::default_agent()
                .get(&format!("http://{addr}/"))
                .header("Origin", "http://localhost:3000")
                .call()
                .unwrap();
            let origin = response
                .headers()
                .get("access-control-allow-origin")
                .and_then(|value| value.to_str().ok())
                .map(str::to_string);
            let body: Value = response.into_body().read_json().unwrap();
            (origin, body)
        })
        .await
        .unwrap();

        assert_eq!(origin.as_deref(), Some("*"));
        assert_eq!(body["message"], "recap backend is running");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn summarizes_with_default_model() {
        let addr = spawn_server().await;
        let (status, body) = post(
            addr,
            json!({ "url": format!("https://www.youtube.com/watch?v={VIDEO_ID}") }),
        )
        .await;

        assert_eq!(status, 200);
        assert_eq!(body["model_used"], "bart");
        let summary = body["summary"].as_str().unwrap();
        assert!(!summary.is_empty());
        assert!(summary.split_whitespace().count() <= 20);
        assert!(body.get("note").is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn unknown_and_unloaded_models_are_rejected() {
        let addr = spawn_server().await;
        let (status, body) = post(addr, json!({ "url": VIDEO_ID, "model": "gpt4" })).await;
        assert_eq!(status, 400);
        assert!(body["error"].as_str().unwrap().starts_with("Unknown model: gpt4"));

        let (status, _) = post(addr, json!({ "url": VIDEO_ID, "model": "t5" })).await;
        assert_eq!(status, 400);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn transcript_failures_become_errors() {
        let addr = spawn_server().await;
        let (status, body) = post(addr, json!({ "url": "https://example.com/video" })).await;
        assert_eq!(status, 400);
        assert!(body["error"].as_str().unwrap().starts_with("Invalid YouTube URL"));

        let (status, body) = post(addr, json!({ "url": SILENT_ID })).await;
        assert_eq!(status, 404);
        assert!(body["error"].as_str().unwrap().starts_with("No transcript"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn malformed_body_is_a_json_error() {
        let addr = spawn_server().await;
        let (status, body) = post(addr, json!({ "link": VIDEO_ID })).await;
        assert!((400..500).contains(&status));
        assert!(body["error"].is_string());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn panicking_task_is_reported_as_error() {
        let addr = spawn_server().await;
        let (status, body) = post(addr, json!({ "url": PANIC_ID })).await;
        assert_eq!(status, 500);
        assert!(body["error"].as_str().unwrap().starts_with("Summarization failed"));
    }
}
