//! Client for the hosted LlamaParse document parsing service.

use std::path::Path;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, info};

use super::{DocumentTextExtractor, Result};
use crate::error::{ConfigError, DocumentError, service_detail};
use crate::models::config::ParserConfig;

/// Extracts text by uploading the document to LlamaParse and polling the
/// resulting job.
pub struct LlamaParseExtractor {
    client: Client,
    endpoint: String,
    api_key: String,
    result_type: String,
    poll_interval: Duration,
    timeout: Duration,
    request_timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct JobResponse {
    status: String,
    #[serde(default)]
    error_message: Option<String>,
}

/// State of a parsing job as reported by the service.
#[derive(Debug, PartialEq, Eq)]
enum JobState {
    Pending,
    Done,
    Failed(String),
}

impl JobResponse {
    fn state(&self) -> JobState {
        match self.status.to_ascii_uppercase().as_str() {
            "SUCCESS" => JobState::Done,
            "ERROR" | "CANCELED" | "CANCELLED" => JobState::Failed(
                self.error_message
                    .clone()
                    .unwrap_or_else(|| format!("parsing job ended with status {}", self.status)),
            ),
            _ => JobState::Pending,
        }
    }
}

impl LlamaParseExtractor {
    pub fn new(config: &ParserConfig, api_key: impl Into<String>) -> std::result::Result<Self, ConfigError> {
        let request_timeout = Duration::from_secs(config.request_timeout_secs);
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| ConfigError::Client(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            result_type: config.result_type.clone(),
            poll_interval: Duration::from_millis(config.poll_interval_ms.max(50)),
            timeout: Duration::from_secs(config.timeout_secs),
            request_timeout,
        })
    }

    fn transport(&self, e: reqwest::Error) -> DocumentError {
        if e.is_timeout() {
            DocumentError::Transport(format!(
                "parsing service did not answer within {}s",
                self.request_timeout.as_secs()
            ))
        } else if e.is_connect() {
            DocumentError::Transport(format!("parsing service unreachable: {}", e))
        } else {
            DocumentError::Transport(e.to_string())
        }
    }

    async fn upload(&self, path: &Path) -> Result<String> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| DocumentError::Transport(format!("failed to read staged document: {}", e)))?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document.pdf".to_string());

        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("application/pdf")
            .map_err(|e| self.transport(e))?;
        let form = Form::new().part("file", part);

        let response = self
            .client
            .post(format!("{}/upload", self.endpoint))
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| self.transport(e))?;
        let response = check_status(response).await?;
        let upload: UploadResponse = response.json().await.map_err(|e| self.transport(e))?;

        debug!("Uploaded {} as parsing job {}", path.display(), upload.id);
        Ok(upload.id)
    }

    async fn wait_for_job(&self, job_id: &str) -> Result<()> {
        let deadline = Instant::now() + self.timeout;

        loop {
            let response = self
                .client
                .get(format!("{}/job/{}", self.endpoint, job_id))
                .bearer_auth(&self.api_key)
                .send()
                .await
                .map_err(|e| self.transport(e))?;
            let job: JobResponse = check_status(response)
                .await?
                .json()
                .await
                .map_err(|e| self.transport(e))?;

            match job.state() {
                JobState::Done => return Ok(()),
                JobState::Failed(reason) => return Err(DocumentError::UnsupportedFormat(reason)),
                JobState::Pending => {}
            }

            if Instant::now() >= deadline {
                return Err(DocumentError::Transport(format!(
                    "parsing job {} did not finish within {}s",
                    job_id,
                    self.timeout.as_secs()
                )));
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn fetch_result(&self, job_id: &str) -> Result<String> {
        let response = self
            .client
            .get(format!("{}/job/{}/result/{}", self.endpoint, job_id, self.result_type))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| self.transport(e))?;
        let body: serde_json::Value = check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| self.transport(e))?;

        result_text(&body, &self.result_type).ok_or_else(|| {
            DocumentError::Transport(format!("parsing result has no `{}` content", self.result_type))
        })
    }
}

#[async_trait]
impl DocumentTextExtractor for LlamaParseExtractor {
    async fn extract(&self, path: &Path) -> Result<String> {
        let start = Instant::now();

        let job_id = self.upload(path).await?;
        self.wait_for_job(&job_id).await?;
        let text = self.fetch_result(&job_id).await?;

        info!(
            "Parsed document into {} characters in {}ms",
            text.len(),
            start.elapsed().as_millis()
        );
        Ok(text)
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(classify_failure(status, &body))
}

/// Map a non-success HTTP status to a document error.
fn classify_failure(status: StatusCode, body: &str) -> DocumentError {
    let detail = if body.trim().is_empty() {
        status.canonical_reason().unwrap_or("no details").to_string()
    } else {
        service_detail(body)
    };

    match status {
        StatusCode::BAD_REQUEST
        | StatusCode::UNSUPPORTED_MEDIA_TYPE
        | StatusCode::UNPROCESSABLE_ENTITY
        | StatusCode::PAYLOAD_TOO_LARGE => DocumentError::UnsupportedFormat(detail),
        _ => DocumentError::Transport(format!("parsing service returned {}: {}", status, detail)),
    }
}

/// Pull the text of the requested result type out of a result payload.
fn result_text(body: &serde_json::Value, result_type: &str) -> Option<String> {
    body.get(result_type)
        .or_else(|| body.get("text"))
        .and_then(|v| v.as_str())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_job_states() {
        let job = |status: &str| JobResponse {
            status: status.to_string(),
            error_message: None,
        };

        assert_eq!(job("PENDING").state(), JobState::Pending);
        assert_eq!(job("SUCCESS").state(), JobState::Done);
        assert!(matches!(job("ERROR").state(), JobState::Failed(_)));

        let failed = JobResponse {
            status: "ERROR".to_string(),
            error_message: Some("file is password protected".to_string()),
        };
        assert_eq!(
            failed.state(),
            JobState::Failed("file is password protected".to_string())
        );
    }

    #[test]
    fn test_classify_failure() {
        assert!(matches!(
            classify_failure(StatusCode::UNSUPPORTED_MEDIA_TYPE, "bad file"),
            DocumentError::UnsupportedFormat(msg) if msg == "bad file"
        ));
        assert!(matches!(
            classify_failure(StatusCode::UNAUTHORIZED, ""),
            DocumentError::Transport(msg) if msg.contains("401")
        ));
    }

    #[test]
    fn test_result_text() {
        let body = json!({"markdown": "# Invoice SEFZE-1471", "job_metadata": {}});
        assert_eq!(
            result_text(&body, "markdown"),
            Some("# Invoice SEFZE-1471".to_string())
        );
        assert_eq!(result_text(&json!({"text": "plain"}), "markdown"), Some("plain".to_string()));
        assert_eq!(result_text(&json!({}), "markdown"), None);
    }

    #[test]
    fn test_error_page_is_cut_short() {
        let page = "y".repeat(40_000);
        assert!(matches!(
            classify_failure(StatusCode::PAYLOAD_TOO_LARGE, &page),
            DocumentError::UnsupportedFormat(msg) if msg.len() < 1_000
        ));
    }

    #[test]
    fn test_request_timeout_from_config() {
        let config = ParserConfig {
            request_timeout_secs: 7,
            ..Default::default()
        };
        let extractor = LlamaParseExtractor::new(&config, "llx-test").unwrap();
        assert_eq!(extractor.request_timeout, Duration::from_secs(7));
    }

    fn extractor_for(server: &mockito::Server, timeout_secs: u64) -> LlamaParseExtractor {
        let config = ParserConfig {
            endpoint: server.url(),
            poll_interval_ms: 1,
            timeout_secs,
            ..Default::default()
        };
        LlamaParseExtractor::new(&config, "llx-test").unwrap()
    }

    fn staged_pdf(dir: &tempfile::TempDir) -> std::path::PathBuf {
        let path = dir.path().join("invoice.pdf");
        std::fs::write(&path, b"%PDF-1.4").unwrap();
        path
    }

    async fn mock_upload(server: &mut mockito::Server) -> mockito::Mock {
        server
            .mock("POST", "/upload")
            .match_header("authorization", "Bearer llx-test")
            .with_status(200)
            .with_body(r#"{"id": "job-1", "status": "PENDING"}"#)
            .expect(1)
            .create_async()
            .await
    }

    async fn mock_job(server: &mut mockito::Server, body: &str, hits: usize) -> mockito::Mock {
        server
            .mock("GET", "/job/job-1")
            .match_header("authorization", "Bearer llx-test")
            .with_status(200)
            .with_body(body)
            .expect(hits)
            .create_async()
            .await
    }

    #[tokio::test]
    async fn test_upload_poll_and_fetch() {
        let dir = tempfile::tempdir().unwrap();
        let mut server = mockito::Server::new_async().await;
        let upload = mock_upload(&mut server).await;
        let pending = mock_job(&mut server, r#"{"status": "PENDING"}"#, 1).await;
        let done = mock_job(&mut server, r#"{"status": "SUCCESS"}"#, 1).await;
        let result = server
            .mock("GET", "/job/job-1/result/markdown")
            .with_status(200)
            .with_body(r##"{"markdown": "# Invoice SEFZE-1471"}"##)
            .expect(1)
            .create_async()
            .await;

        let text = extractor_for(&server, 30).extract(&staged_pdf(&dir)).await.unwrap();

        assert_eq!(text, "# Invoice SEFZE-1471");
        upload.assert_async().await;
        pending.assert_async().await;
        done.assert_async().await;
        result.assert_async().await;
    }

    #[tokio::test]
    async fn test_failed_job_is_unsupported_format() {
        let dir = tempfile::tempdir().unwrap();
        let mut server = mockito::Server::new_async().await;
        let _upload = mock_upload(&mut server).await;
        let _job = mock_job(
            &mut server,
            r#"{"status": "ERROR", "error_message": "file is password protected"}"#,
            1,
        )
        .await;
        let result = server
            .mock("GET", "/job/job-1/result/markdown")
            .expect(0)
            .create_async()
            .await;

        let err = extractor_for(&server, 30).extract(&staged_pdf(&dir)).await.unwrap_err();

        assert!(matches!(
            &err,
            DocumentError::UnsupportedFormat(msg) if msg == "file is password protected"
        ));
        result.assert_async().await;
    }

    #[tokio::test]
    async fn test_job_deadline_is_transport_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut server = mockito::Server::new_async().await;
        let _upload = mock_upload(&mut server).await;
        let pending = mock_job(&mut server, r#"{"status": "PENDING"}"#, 1).await;

        let err = extractor_for(&server, 0).extract(&staged_pdf(&dir)).await.unwrap_err();

        assert!(matches!(
            &err,
            DocumentError::Transport(msg) if msg.contains("did not finish within 0s")
        ));
        pending.assert_async().await;
    }

    #[tokio::test]
    async fn test_rejected_upload() {
        let dir = tempfile::tempdir().unwrap();
        let mut server = mockito::Server::new_async().await;
        let _upload = server
            .mock("POST", "/upload")
            .with_status(401)
            .with_body(r#"{"detail": "Invalid API key"}"#)
            .create_async()
            .await;

        let err = extractor_for(&server, 30).extract(&staged_pdf(&dir)).await.unwrap_err();

        assert!(matches!(
            &err,
            DocumentError::Transport(msg) if msg.contains("401") && msg.contains("Invalid API key")
        ));
    }
}
