//! Video-generation provider spoken to over HTTP.

use crate::error::ProviderError;
use crate::ports::provider::{
    GenerationRequest, JobHandle, PollResult, ProviderStatus, Submission, VideoGenerationProvider,
};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct HttpProviderConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    /// Transport timeout per request. Must cover a submit that answers only
    /// once the clip is rendered; polls are bounded by the worker.
    pub timeout: Duration,
}

impl Default for HttpProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3001".to_string(),
            api_key: None,
            timeout: Duration::from_secs(600),
        }
    }
}

/// Body of both `/generate-video` and `/jobs/{id}` responses.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobResponse {
    job_id: Option<String>,
    status: Option<String>,
    video_url: Option<String>,
    duration: Option<f64>,
    error: Option<String>,
}

impl JobResponse {
    fn status(&self) -> ProviderStatus {
        match self.status.as_deref().map(str::to_ascii_lowercase).as_deref() {
            Some("completed" | "succeeded" | "success") => ProviderStatus::Completed,
            Some("failed" | "error") => ProviderStatus::Failed,
            Some("cancelled" | "canceled") => ProviderStatus::Cancelled,
            Some("pending" | "queued") => ProviderStatus::Pending,
            Some(_) => ProviderStatus::Processing,
            None if self.video_url.is_some() => ProviderStatus::Completed,
            None => ProviderStatus::Pending,
        }
    }

    fn into_result(self) -> PollResult {
        PollResult {
            status: self.status(),
            output_url: self.video_url,
            duration_seconds: self.duration,
            error: self.error,
        }
    }
}

pub struct HttpVideoProvider {
    http: Client,
    config: HttpProviderConfig,
}

impl HttpVideoProvider {
    pub fn new(config: HttpProviderConfig) -> Result<Self, reqwest::Error> {
        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { http, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.config.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<JobResponse, ProviderError> {
        let response = self
            .authorized(request)
            .send()
            .await
            .map_err(|e| ProviderError::retryable(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify(status, &body));
        }

        response
            .json::<JobResponse>()
            .await
            .map_err(|e| ProviderError::retryable(format!("malformed provider response: {}", e)))
    }
}

/// Client errors are the provider refusing the job; anything else may pass.
fn classify(status: StatusCode, body: &str) -> ProviderError {
    let message = if body.is_empty() {
        format!("provider returned {}", status)
    } else {
        format!("provider returned {}: {}", status, body)
    };
    let transient = matches!(status, StatusCode::REQUEST_TIMEOUT | StatusCode::TOO_MANY_REQUESTS);
    if status.is_client_error() && !transient {
        ProviderError::Terminal(message)
    } else {
        ProviderError::Retryable(message)
    }
}

#[async_trait]
impl VideoGenerationProvider for HttpVideoProvider {
    async fn submit(&self, request: &GenerationRequest) -> Result<Submission, ProviderError> {
        let response = self
            .send(self.http.post(self.url("generate-video")).json(request))
            .await?;

        let status = response.status();
        match response.job_id.clone() {
            Some(job_id) if matches!(status, ProviderStatus::Pending | ProviderStatus::Processing) => {
                debug!(job_id = %job_id, "Provider accepted job");
                Ok(Submission::Pending(JobHandle(job_id)))
            }
            _ => Ok(Submission::Ready(response.into_result())),
        }
    }

    async fn poll(&self, handle: &JobHandle) -> Result<PollResult, ProviderError> {
        let response = self
            .send(self.http.get(self.url(&format!("jobs/{}", handle.0))))
            .await?;
        Ok(response.into_result())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(server: &MockServer) -> HttpVideoProvider {
        HttpVideoProvider::new(HttpProviderConfig {
            base_url: server.uri(),
            api_key: Some("secret".into()),
            timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    fn request() -> GenerationRequest {
        GenerationRequest {
            image: "data:image/png;base64,AAAA".into(),
            prompt: "A person walking in a park".into(),
            duration_seconds: 5,
        }
    }

    #[tokio::test]
    async fn test_immediate_video_is_ready() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/generate-video"))
            .and(header("authorization", "Bearer secret"))
            .and(body_json(json!({
                "image": "data:image/png;base64,AAAA",
                "prompt": "A person walking in a park",
                "duration": 5
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "completed",
                "videoUrl": "https://gen.test/v.mp4",
                "duration": 5.0
            })))
            .expect(1)
            .mount(&server)
            .await;

        let submission = provider(&server).submit(&request()).await.unwrap();
        assert_eq!(
            submission,
            Submission::Ready(PollResult::completed("https://gen.test/v.mp4", Some(5.0)))
        );
    }

    #[tokio::test]
    async fn test_async_job_is_polled_by_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/generate-video"))
            .respond_with(ResponseTemplate::new(202).set_body_json(json!({
                "jobId": "job-42",
                "status": "processing"
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/jobs/job-42"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jobId": "job-42",
                "status": "failed",
                "error": "nsfw content"
            })))
            .mount(&server)
            .await;

        let provider = provider(&server);
        let handle = match provider.submit(&request()).await.unwrap() {
            Submission::Pending(handle) => handle,
            other => panic!("expected pending job, got {:?}", other),
        };
        assert_eq!(handle, JobHandle("job-42".into()));

        let result = provider.poll(&handle).await.unwrap();
        assert_eq!(result.status, ProviderStatus::Failed);
        assert_eq!(result.error.as_deref(), Some("nsfw content"));
    }

    #[tokio::test]
    async fn test_bad_request_is_terminal() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_string("image too large"))
            .mount(&server)
            .await;

        let err = provider(&server).submit(&request()).await.unwrap_err();
        assert_eq!(
            err,
            ProviderError::Terminal("provider returned 400 Bad Request: image too large".into())
        );
    }

    #[tokio::test]
    async fn test_rate_limit_and_server_errors_are_retryable() {
        for code in [429u16, 408, 500, 503] {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .respond_with(ResponseTemplate::new(code))
                .mount(&server)
                .await;

            let err = provider(&server).submit(&request()).await.unwrap_err();
            assert!(err.is_retryable(), "{} should be retryable", code);
        }
    }

    #[tokio::test]
    async fn test_unreachable_provider_is_retryable() {
        let provider = HttpVideoProvider::new(HttpProviderConfig {
            base_url: "http://127.0.0.1:9".into(),
            api_key: None,
            timeout: Duration::from_secs(1),
        })
        .unwrap();
        let err = provider.submit(&request()).await.unwrap_err();
        assert!(matches!(err, ProviderError::Retryable(_)));
    }

    #[test]
    fn test_status_mapping() {
        let parse = |v: serde_json::Value| serde_json::from_value::<JobResponse>(v).unwrap().status();
        assert_eq!(parse(json!({"status": "SUCCEEDED"})), ProviderStatus::Completed);
        assert_eq!(parse(json!({"status": "canceled"})), ProviderStatus::Cancelled);
        assert_eq!(parse(json!({"status": "rendering"})), ProviderStatus::Processing);
        assert_eq!(parse(json!({"videoUrl": "https://gen.test/x.mp4"})), ProviderStatus::Completed);
        assert_eq!(parse(json!({})), ProviderStatus::Pending);
    }
}
