//! AssemblyAI REST client for speaker-diarized transcription.

use super::{ServiceTranscript, TranscriptStatus};
use crate::config::DiarizationSettings;
use crate::error::{Result, TekstError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, instrument};
use url::Url;

/// Floor for the status polling interval; `poll_interval_seconds = 0` polls at this rate.
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Minimal AssemblyAI v2 client: upload, submit, poll.
pub struct AssemblyAiClient {
    http: reqwest::Client,
    base_url: Url,
    api_key: String,
    poll_interval: Duration,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    upload_url: String,
}

#[derive(Debug, Serialize)]
struct TranscriptRequest<'a> {
    audio_url: &'a str,
    speaker_labels: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    language_code: Option<&'a str>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    language_detection: bool,
}

impl AssemblyAiClient {
    pub fn new(settings: &DiarizationSettings, api_key: String) -> Result<Self> {
        let base_url = Url::parse(&settings.base_url).map_err(|e| {
            TekstError::Config(format!("Invalid diarization base URL '{}': {}", settings.base_url, e))
        })?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.transcription_timeout_seconds.max(1)))
            .build()?;

        Ok(Self {
            http,
            base_url,
            api_key,
            poll_interval: Duration::from_secs(settings.poll_interval_seconds)
                .max(MIN_POLL_INTERVAL),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| TekstError::Config(format!("Invalid endpoint {}: {}", path, e)))
    }

    /// Upload a local audio file, returning the service-side URL.
    #[instrument(skip(self), fields(audio_path = %audio_path.display()))]
    pub async fn upload(&self, audio_path: &Path) -> Result<String> {
        let bytes = tokio::fs::read(audio_path)
            .await
            .map_err(|e| TekstError::UploadFailed(format!("cannot read audio file: {}", e)))?;

        info!("Uploading {} bytes of audio", bytes.len());

        let response = self
            .http
            .post(self.endpoint("/v2/upload")?)
            .header(reqwest::header::AUTHORIZATION, &self.api_key)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(bytes)
            .send()
            .await
            .map_err(|e| TekstError::UploadFailed(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(TekstError::UploadFailed(format!("{}: {}", status, body.trim())));
        }

        let upload: UploadResponse = response
            .json()
            .await
            .map_err(|e| TekstError::UploadFailed(format!("invalid upload response: {}", e)))?;

        Ok(upload.upload_url)
    }

    /// Submit an uploaded file for diarized transcription, returning the job ID.
    pub async fn submit(&self, audio_url: &str, language: Option<&str>) -> Result<String> {
        let request = TranscriptRequest {
            audio_url,
            speaker_labels: true,
            language_code: language,
            language_detection: language.is_none(),
        };

        let response = self
            .http
            .post(self.endpoint("/v2/transcript")?)
            .header(reqwest::header::AUTHORIZATION, &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| TekstError::TranscriptionServiceError(e.to_string()))?;

        let transcript = Self::read_transcript(response).await?;
        debug!("Submitted transcript job {}", transcript.id);
        Ok(transcript.id)
    }

    /// Fetch the current state of a transcript job.
    pub async fn fetch(&self, id: &str) -> Result<ServiceTranscript> {
        let response = self
            .http
            .get(self.endpoint(&format!("/v2/transcript/{}", id))?)
            .header(reqwest::header::AUTHORIZATION, &self.api_key)
            .send()
            .await
            .map_err(|e| TekstError::TranscriptionServiceError(e.to_string()))?;

        Self::read_transcript(response).await
    }

    /// Poll a job until it completes or reports an error.
    pub async fn wait_for_completion(&self, id: &str) -> Result<ServiceTranscript> {
        loop {
            let transcript = self.fetch(id).await?;
            match transcript.status {
                TranscriptStatus::Completed => return Ok(transcript),
                TranscriptStatus::Error => {
                    return Err(TekstError::TranscriptionServiceError(
                        transcript
                            .error
                            .unwrap_or_else(|| "transcription failed without a message".to_string()),
                    ));
                }
                TranscriptStatus::Queued | TranscriptStatus::Processing => {
                    debug!("Transcript {} is {:?}", id, transcript.status);
                    tokio::time::sleep(self.poll_interval).await;
                }
            }
        }
    }

    async fn read_transcript(response: reqwest::Response) -> Result<ServiceTranscript> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(TekstError::TranscriptionServiceError(format!(
                "{}: {}",
                status,
                body.trim()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| TekstError::TranscriptionServiceError(format!("invalid response: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_shape_with_language() {
        let request = TranscriptRequest {
            audio_url: "https://cdn.test/a",
            speaker_labels: true,
            language_code: Some("de"),
            language_detection: false,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["speaker_labels"], true);
        assert_eq!(json["language_code"], "de");
        assert!(json.get("language_detection").is_none());
    }

    #[test]
    fn test_request_shape_without_language() {
        let request = TranscriptRequest {
            audio_url: "https://cdn.test/a",
            speaker_labels: true,
            language_code: None,
            language_detection: true,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("language_code").is_none());
        assert_eq!(json["language_detection"], true);
    }

    #[test]
    fn test_endpoint_join() {
        let client =
            AssemblyAiClient::new(&DiarizationSettings::default(), "key".to_string()).unwrap();
        assert_eq!(
            client.endpoint("/v2/transcript/abc").unwrap().as_str(),
            "https://api.assemblyai.com/v2/transcript/abc"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        let settings = DiarizationSettings {
            base_url: "not a url".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            AssemblyAiClient::new(&settings, "key".to_string()),
            Err(TekstError::Config(_))
        ));
    }

    mod service {
        use super::*;
        use crate::config::DiarizationSettings;
        use crate::diarization::assemblyai::AssemblyAiClient;
        use crate::diarization::TranscriptStatus;
        use crate::error::TekstError;
        use crate::diarization::DiarizedTranscriber;
        use axum::extract::Path as UrlPath;
        use axum::http::{HeaderMap, StatusCode};
        use axum::routing::{get, post};
        use axum::{Json, Router};
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        /// Serve `router` on an ephemeral local port, returning its base URL.
        async fn spawn_service(router: Router) -> String {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            tokio::spawn(async move {
                axum::serve(listener, router).await.unwrap();
            });
            format!("http://{}", addr)
        }

        fn settings(base_url: String) -> DiarizationSettings {
            DiarizationSettings {
                base_url,
                poll_interval_seconds: 0,
                transcription_timeout_seconds: 5,
                ..Default::default()
            }
        }

        fn audio_file() -> tempfile::NamedTempFile {
            let file = tempfile::NamedTempFile::new().unwrap();
            std::fs::write(file.path(), b"not really audio").unwrap();
            file
        }

        fn client(base_url: String) -> AssemblyAiClient {
            AssemblyAiClient::new(&settings(base_url), "test-key".to_string()).unwrap()
        }

        #[tokio::test]
        async fn test_upload_server_error() {
            let router = Router::new().route(
                "/v2/upload",
                post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "storage offline") }),
            );
            let client = client(spawn_service(router).await);
            let audio = audio_file();

            let err = client.upload(audio.path()).await.unwrap_err();
            match err {
                TekstError::UploadFailed(message) => {
                    assert!(message.contains("500"));
                    assert!(message.contains("storage offline"));
                }
                other => panic!("expected UploadFailed, got {:?}", other),
            }
        }

        #[tokio::test]
        async fn test_upload_missing_file() {
            let client = client("http://127.0.0.1:9".to_string());
            let err = client
                .upload(std::path::Path::new("/nonexistent/tekst/audio.m4a"))
                .await
                .unwrap_err();
            assert!(matches!(err, TekstError::UploadFailed(_)));
        }

        #[tokio::test]
        async fn test_upload_sends_key_and_returns_url() {
            let router = Router::new().route(
                "/v2/upload",
                post(|headers: HeaderMap| async move {
                    if headers.get("authorization").and_then(|v| v.to_str().ok()) != Some("test-key") {
                        return (StatusCode::UNAUTHORIZED, Json(serde_json::json!({"error": "bad key"})));
                    }
                    (
                        StatusCode::OK,
                        Json(serde_json::json!({"upload_url": "https://cdn.test/audio-1"})),
                    )
                }),
            );
            let client = client(spawn_service(router).await);
            let audio = audio_file();

            let url = client.upload(audio.path()).await.unwrap();
            assert_eq!(url, "https://cdn.test/audio-1");
        }

        #[tokio::test]
        async fn test_submit_rejected() {
            let router = Router::new().route(
                "/v2/transcript",
                post(|| async { (StatusCode::UNAUTHORIZED, "Invalid API key") }),
            );
            let client = client(spawn_service(router).await);

            let err = client.submit("https://cdn.test/a", None).await.unwrap_err();
            match err {
                TekstError::TranscriptionServiceError(message) => {
                    assert!(message.contains("401"));
                    assert!(message.contains("Invalid API key"));
                }
                other => panic!("expected TranscriptionServiceError, got {:?}", other),
            }
        }

        #[tokio::test]
        async fn test_submit_requests_speaker_labels() {
            let router = Router::new().route(
                "/v2/transcript",
                post(|Json(body): Json<serde_json::Value>| async move {
                    if body["speaker_labels"] != true || body["language_code"] != "de" {
                        return (StatusCode::BAD_REQUEST, Json(serde_json::json!({"error": "bad body"})));
                    }
                    (StatusCode::OK, Json(serde_json::json!({"id": "job-7", "status": "queued"})))
                }),
            );
            let client = client(spawn_service(router).await);

            let id = client.submit("https://cdn.test/a", Some("de")).await.unwrap();
            assert_eq!(id, "job-7");
        }

        #[tokio::test]
        async fn test_malformed_status_response() {
            let router = Router::new().route(
                "/v2/transcript/{id}",
                get(|| async { "<html>maintenance</html>" }),
            );
            let client = client(spawn_service(router).await);

            let err = client.fetch("job-1").await.unwrap_err();
            assert!(matches!(err, TekstError::TranscriptionServiceError(_)));
        }

        #[tokio::test]
        async fn test_poll_until_service_error() {
            let polls = Arc::new(AtomicUsize::new(0));
            let counter = polls.clone();
            let router = Router::new().route(
                "/v2/transcript/{id}",
                get(move |UrlPath(id): UrlPath<String>| {
                    let counter = counter.clone();
                    async move {
                        let status = match counter.fetch_add(1, Ordering::SeqCst) {
                            0 => "queued",
                            1 => "processing",
                            _ => "error",
                        };
                        Json(serde_json::json!({
                            "id": id,
                            "status": status,
                            "error": "Audio duration is too short."
                        }))
                    }
                }),
            );
            let client = client(spawn_service(router).await);

            let err = client.wait_for_completion("job-1").await.unwrap_err();
            match err {
                TekstError::TranscriptionServiceError(message) => {
                    assert_eq!(message, "Audio duration is too short.");
                }
                other => panic!("expected TranscriptionServiceError, got {:?}", other),
            }
            assert_eq!(polls.load(Ordering::SeqCst), 3);
        }

        #[tokio::test]
        async fn test_poll_until_completed() {
            let polls = Arc::new(AtomicUsize::new(0));
            let counter = polls.clone();
            let router = Router::new().route(
                "/v2/transcript/{id}",
                get(move |UrlPath(id): UrlPath<String>| {
                    let counter = counter.clone();
                    async move {
                        let body = if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                            serde_json::json!({"id": id, "status": "processing"})
                        } else {
                            serde_json::json!({
                                "id": id,
                                "status": "completed",
                                "language_code": "de",
                                "utterances": [
                                    {"speaker": "A", "text": "Guten Tag.", "start": 0, "end": 900}
                                ]
                            })
                        };
                        Json(body)
                    }
                }),
            );
            let client = client(spawn_service(router).await);

            let transcript = client.wait_for_completion("job-2").await.unwrap();
            assert_eq!(transcript.status, TranscriptStatus::Completed);
            assert_eq!(transcript.language_code.as_deref(), Some("de"));
            assert_eq!(transcript.utterances.map(|u| u.len()), Some(1));
        }

        #[tokio::test]
        async fn test_stalled_job_times_out() {
            let router = Router::new()
                .route(
                    "/v2/upload",
                    post(|| async { Json(serde_json::json!({"upload_url": "https://cdn.test/a"})) }),
                )
                .route(
                    "/v2/transcript",
                    post(|| async { Json(serde_json::json!({"id": "job-3", "status": "queued"})) }),
                )
                .route(
                    "/v2/transcript/{id}",
                    get(|UrlPath(id): UrlPath<String>| async move {
                        Json(serde_json::json!({"id": id, "status": "queued"}))
                    }),
                );
            let base_url = spawn_service(router).await;

            std::env::set_var("TEKST_TEST_STALLED_JOB_KEY", "test-key");
            let settings = DiarizationSettings {
                api_key_env: "TEKST_TEST_STALLED_JOB_KEY".to_string(),
                transcription_timeout_seconds: 1,
                ..settings(base_url)
            };
            let dir = tempfile::tempdir().unwrap();
            let transcriber = DiarizedTranscriber::new(&settings, dir.path().to_path_buf()).unwrap();
            let audio = audio_file();

            let err = transcriber.transcribe_audio(audio.path(), Some("de")).await.unwrap_err();
            assert!(matches!(err, TekstError::Timeout(_)));
        }
    }
}
