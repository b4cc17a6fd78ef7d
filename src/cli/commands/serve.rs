//! HTTP API server for the transcript front end.
//!
//! Provides REST endpoints for caption and diarized transcript acquisition.

use crate::cli::Output;
use crate::config::{Settings, TranscriptSource};
use crate::error::TekstError;
use crate::orchestrator::{AcquireOptions, Orchestrator};
use crate::transcript::Segment;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::warn;

/// Shared application state.
struct AppState {
    orchestrator: Orchestrator,
}

/// Run the HTTP API server.
pub async fn run_serve(host: &str, port: u16, settings: Settings) -> anyhow::Result<()> {
    let orchestrator = Orchestrator::new(settings)?;
    if !orchestrator.can_refine() {
        Output::warning("Refinement disabled (OPENAI_API_KEY not set or refinement.enabled = false).");
    }
    if !orchestrator.can_diarize() {
        Output::warning(&format!(
            "Diarized transcription disabled ({} not set).",
            orchestrator.settings().diarization.api_key_env
        ));
    }

    let app = router(Arc::new(AppState { orchestrator }));

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("Tekst API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET  /health");
    Output::kv("Transcript", "GET  /api/transcript?videoId=...&lang=...");
    Output::kv("Transcribe", "POST /api/transcribe (alias /api/assemblyai/transcribe)");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app).await?;

    Ok(())
}

fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/api/transcript", get(transcript))
        .route("/api/transcribe", post(transcribe))
        .route("/api/assemblyai/transcribe", post(transcribe))
        .layer(cors)
        .with_state(state)
}

// === Request/Response Types ===

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TranscriptQuery {
    video_id: Option<String>,
    lang: Option<String>,
    refine: Option<bool>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TranscriptResponse {
    video_id: String,
    language: String,
    raw_text: String,
    segments: Vec<Segment>,
    word_count: usize,
    is_demo: bool,
    from_cache: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TranscribeRequest {
    video_id: String,
    #[serde(default)]
    language_code: Option<String>,
}

#[derive(Serialize)]
struct TranscribeResponse {
    segments: Vec<Segment>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    kind: &'static str,
}

/// HTTP status for an acquisition error.
fn error_status(error: &TekstError) -> StatusCode {
    match error {
        TekstError::NoCaptionsAvailable(_) => StatusCode::NOT_FOUND,
        TekstError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        TekstError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        TekstError::Config(_) | TekstError::ToolNotFound(_) => StatusCode::SERVICE_UNAVAILABLE,
        TekstError::AudioExtractionFailed(_)
        | TekstError::UploadFailed(_)
        | TekstError::TranscriptionServiceError(_)
        | TekstError::Http(_)
        | TekstError::OpenAI(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(error: TekstError) -> axum::response::Response {
    warn!("Request failed: {}", error);
    (
        error_status(&error),
        Json(ErrorResponse {
            error: error.to_string(),
            kind: error.kind(),
        }),
    )
        .into_response()
}

// === Handlers ===

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn transcript(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TranscriptQuery>,
) -> impl IntoResponse {
    let Some(video_id) = query.video_id.filter(|id| !id.trim().is_empty()) else {
        return error_response(TekstError::InvalidInput(
            "videoId query parameter is required".to_string(),
        ));
    };

    let mut options = AcquireOptions::from_settings(state.orchestrator.settings());
    if let Some(refine) = query.refine {
        options.refine = refine;
    }

    match state
        .orchestrator
        .acquire(&video_id, query.lang.as_deref(), options)
        .await
    {
        Ok(acquisition) => {
            let transcript = acquisition.transcript;
            Json(TranscriptResponse {
                video_id: transcript.media_id.clone(),
                language: transcript.language.clone(),
                raw_text: transcript.raw_text(),
                word_count: transcript.word_count(),
                is_demo: transcript.is_demo,
                from_cache: acquisition.from_cache,
                segments: transcript.segments,
            })
            .into_response()
        }
        Err(e) => error_response(e),
    }
}

async fn transcribe(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TranscribeRequest>,
) -> impl IntoResponse {
    let options = AcquireOptions::from_settings(state.orchestrator.settings())
        .with_source(TranscriptSource::Diarized);

    match state
        .orchestrator
        .acquire(&req.video_id, req.language_code.as_deref(), options)
        .await
    {
        Ok(acquisition) => Json(TranscribeResponse {
            segments: acquisition.transcript.segments,
        })
        .into_response(),
        Err(e) => error_response(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::captions::CaptionSource;
    use crate::transcript::Transcript;
    use async_trait::async_trait;

    struct StaticCaptions;

    #[async_trait]
    impl CaptionSource for StaticCaptions {
        async fn extract(&self, media_id: &str, language: &str) -> crate::Result<Transcript> {
            if media_id == "nocaptions1" {
                return Err(TekstError::NoCaptionsAvailable(media_id.to_string()));
            }
            Ok(Transcript::new(
                media_id,
                language,
                vec![
                    Segment::new("hallo zusammen", 0.0, 2.0),
                    Segment::new("wie geht's", 2.0, 2.0),
                ],
            ))
        }
    }

    fn state(demo_fallback: bool) -> Arc<AppState> {
        let mut settings = Settings::default();
        settings.captions.demo_fallback = demo_fallback;
        Arc::new(AppState {
            orchestrator: Orchestrator::with_components(
                settings,
                Arc::new(MemoryCache::default()),
                Arc::new(StaticCaptions),
                None,
                None,
            ),
        })
    }

    fn query(video_id: Option<&str>) -> Query<TranscriptQuery> {
        Query(TranscriptQuery {
            video_id: video_id.map(String::from),
            lang: Some("de".to_string()),
            refine: Some(false),
        })
    }

    #[test]
    fn test_error_status() {
        assert_eq!(
            error_status(&TekstError::NoCaptionsAvailable("x".into())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            error_status(&TekstError::Timeout("x".into())),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            error_status(&TekstError::UploadFailed("x".into())),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            error_status(&TekstError::InvalidInput("x".into())),
            StatusCode::BAD_REQUEST
        );
    }

    #[tokio::test]
    async fn test_transcript_requires_video_id() {
        let response = transcript(State(state(true)), query(None)).await.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_transcript_ok_then_cached() {
        let state = state(true);
        let first = transcript(State(state.clone()), query(Some("abcdefghijk")))
            .await
            .into_response();
        assert_eq!(first.status(), StatusCode::OK);

        let cached = state
            .orchestrator
            .cache()
            .get("abcdefghijk", "de+raw")
            .await
            .unwrap();
        assert_eq!(cached.map(|t| t.len()), Some(2));
    }

    #[tokio::test]
    async fn test_transcript_without_captions() {
        let response = transcript(State(state(false)), query(Some("nocaptions1")))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = transcript(State(state(true)), query(Some("nocaptions1")))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_transcribe_without_key_is_unavailable() {
        let response = transcribe(
            State(state(true)),
            Json(TranscribeRequest {
                video_id: "abcdefghijk".to_string(),
                language_code: None,
            }),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_transcribe_routes_over_http() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router(state(true))).await.unwrap();
        });

        let client = reqwest::Client::new();
        for path in ["/api/transcribe", "/api/assemblyai/transcribe"] {
            let response = client
                .post(format!("http://{}{}", addr, path))
                .json(&serde_json::json!({ "videoId": "abcdefghijk" }))
                .send()
                .await
                .unwrap();
            assert_eq!(response.status().as_u16(), 503, "{}", path);

            let body: serde_json::Value = response.json().await.unwrap();
            assert_eq!(body["kind"], "Config");
        }
    }
}
