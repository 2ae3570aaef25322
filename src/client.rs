use std::env;
use std::time::{Duration, Instant};

use futures::stream::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client as ReqwestClient, Response, header};
use url::Url;

use crate::error::{Error, Result};
use crate::observability::{CLIENT_REQUEST_ERRORS, CLIENT_REQUESTS, CLIENT_TTFB};
use crate::stream::ByteStream;
use crate::types::ChatStreamRequest;

const DEFAULT_API_URL: &str = "http://localhost:8000/api/v1";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// A backend that answers tutoring turns with a streamed body.
///
/// The chat session talks to this trait rather than to HTTP directly, so it
/// can be driven by an in-memory backend in tests.
#[async_trait::async_trait]
pub trait ChatBackend: Send + Sync {
    /// Starts one turn and returns the response body as a byte stream.
    ///
    /// Fails with a transport error if the request cannot be sent or the
    /// backend answers with a non-success status.
    async fn stream_chat(
        &self,
        request: &ChatStreamRequest,
        token: Option<&str>,
    ) -> Result<ByteStream>;
}

/// HTTP client for the tutoring backend.
#[derive(Debug, Clone)]
pub struct TutorClient {
    client: ReqwestClient,
    base_url: String,
    timeout: Duration,
}

impl TutorClient {
    /// Create a new client.
    ///
    /// The base URL can be provided directly or read from the TUTOR_API_URL
    /// environment variable, falling back to a local development server.
    pub fn new(base_url: Option<String>) -> Result<Self> {
        Self::with_options(base_url, None)
    }

    /// Create a new client with custom settings.
    pub fn with_options(base_url: Option<String>, timeout: Option<Duration>) -> Result<Self> {
        let base_url = match base_url {
            Some(url) => url,
            None => env::var("TUTOR_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string()),
        };
        let parsed = Url::parse(&base_url)?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::validation(
                format!("base URL must use http or https, got {}", parsed.scheme()),
                Some("base_url".to_string()),
            ));
        }

        let timeout = timeout.unwrap_or(DEFAULT_TIMEOUT);
        let client = ReqwestClient::builder()
            .timeout(timeout)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT.min(timeout))
            .build()
            .map_err(|e| {
                Error::http_client(
                    format!("Failed to build HTTP client: {}", e),
                    Some(Box::new(e)),
                )
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    /// The base URL requests are sent to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The endpoint for streamed chat turns.
    pub fn chat_stream_url(&self) -> String {
        format!("{}/chat/stream", self.base_url)
    }

    /// Create and return default headers for API requests.
    fn default_headers(&self, token: Option<&str>) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.insert(header::ACCEPT, HeaderValue::from_static("text/plain, */*"));
        if let Some(token) = token.map(str::trim).filter(|t| !t.is_empty()) {
            let value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|_| {
                Error::authentication("stored token contains characters not allowed in a header")
            })?;
            headers.insert(header::AUTHORIZATION, value);
        }
        Ok(headers)
    }

    /// Process API response errors and convert to our Error type
    async fn process_error_response(response: Response) -> Error {
        let status = response.status();
        let status_code = status.as_u16();

        let request_id = response
            .headers()
            .get("x-request-id")
            .and_then(|val| val.to_str().ok())
            .map(String::from);

        let error_body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                return Error::http_client(
                    format!("Failed to read error response: {}", e),
                    Some(Box::new(e)),
                );
            }
        };

        // FastAPI reports errors as {"detail": "..."}; anything else is passed through.
        let error_message = serde_json::from_str::<serde_json::Value>(&error_body)
            .ok()
            .and_then(|body| match body.get("detail") {
                Some(serde_json::Value::String(detail)) => Some(detail.clone()),
                Some(detail) => Some(detail.to_string()),
                None => None,
            })
            .unwrap_or_else(|| {
                if error_body.is_empty() {
                    status
                        .canonical_reason()
                        .unwrap_or("request failed")
                        .to_string()
                } else {
                    error_body.clone()
                }
            });

        match status_code {
            401 => Error::authentication(error_message),
            _ => Error::api(status_code, error_message, request_id),
        }
    }
}

#[async_trait::async_trait]
impl ChatBackend for TutorClient {
    async fn stream_chat(
        &self,
        request: &ChatStreamRequest,
        token: Option<&str>,
    ) -> Result<ByteStream> {
        let url = self.chat_stream_url();
        let headers = self.default_headers(token)?;
        CLIENT_REQUESTS.click();
        tracing::debug!(
            url = %url,
            history = request.session_history.len(),
            documents = request.selected_documents.len(),
            "starting chat stream"
        );

        let start = Instant::now();
        let response = self
            .client
            .post(&url)
            .headers(headers)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                CLIENT_REQUEST_ERRORS.click();
                if e.is_timeout() {
                    Error::timeout(
                        format!("Request timed out: {}", e),
                        Some(self.timeout.as_secs_f64()),
                    )
                } else if e.is_connect() {
                    Error::connection(format!("Connection error: {}", e), Some(Box::new(e)))
                } else {
                    Error::http_client(format!("Request failed: {}", e), Some(Box::new(e)))
                }
            })?;
        CLIENT_TTFB.add(start.elapsed().as_secs_f64());

        if !response.status().is_success() {
            CLIENT_REQUEST_ERRORS.click();
            return Err(Self::process_error_response(response).await);
        }

        let timeout = self.timeout;
        let stream = response.bytes_stream().map(move |result| {
            result.map_err(|e| {
                if e.is_timeout() {
                    Error::timeout(
                        format!("Stream timed out: {}", e),
                        Some(timeout.as_secs_f64()),
                    )
                } else {
                    Error::streaming(format!("Error in HTTP stream: {}", e), Some(Box::new(e)))
                }
            })
        });

        Ok(Box::pin(stream))
    }
}
