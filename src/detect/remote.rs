//! Hosted camera-trap specialist reached over HTTPS.

use super::retry::{RetryPolicy, TransportError};
use super::{BackendIdentity, BoundingBox, Detector, RawDetection};
use crate::config::{BackendKind, RemoteConfig};
use crate::error::{Error, Result};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tokio::runtime::Runtime;
use tracing::debug;

/// One upload of image bytes to the remote endpoint.
///
/// Implementations classify failures so the retry loop can decide whether
/// another attempt is worthwhile.
pub trait RemoteTransport: Send + Sync {
    /// Upload `image` and return the response body.
    fn post_image(&self, image: &[u8]) -> std::result::Result<String, TransportError>;
}

/// HTTPS transport with bearer authentication and bounded timeouts.
pub struct HttpTransport {
    client: Client,
    runtime: Runtime,
    endpoint: String,
    api_key: String,
}

impl HttpTransport {
    /// Create a transport for `endpoint`.
    pub fn new(
        endpoint: String,
        api_key: String,
        timeout: Duration,
        connect_timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(timeout)
            .build()
            .map_err(|e| Error::BackendInit {
                reason: format!("failed to create HTTP client: {e}"),
            })?;

        let runtime = Runtime::new().map_err(|e| Error::BackendInit {
            reason: format!("failed to create async runtime: {e}"),
        })?;

        Ok(Self {
            client,
            runtime,
            endpoint,
            api_key,
        })
    }
}

impl RemoteTransport for HttpTransport {
    fn post_image(&self, image: &[u8]) -> std::result::Result<String, TransportError> {
        let content_type =
            image::guess_format(image).map_or("application/octet-stream", |f| f.to_mime_type());

        self.runtime.block_on(async {
            let response = self
                .client
                .post(&self.endpoint)
                .bearer_auth(&self.api_key)
                .header(reqwest::header::CONTENT_TYPE, content_type)
                .body(image.to_vec())
                .send()
                .await
                .map_err(|e| classify_request_error(&e))?;

            if let Some(err) = classify_status(response.status()) {
                return Err(err);
            }

            response
                .text()
                .await
                .map_err(|e| TransportError::Transient(format!("failed to read body: {e}")))
        })
    }
}

/// Classify a response status: `None` for success, otherwise whether another
/// attempt could help. Rate limiting and server errors are transient.
pub fn classify_status(status: StatusCode) -> Option<TransportError> {
    if status.is_success() {
        None
    } else if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        Some(TransportError::Transient(format!("HTTP {status}")))
    } else {
        Some(TransportError::Rejected(format!("HTTP {status}")))
    }
}

fn classify_request_error(e: &reqwest::Error) -> TransportError {
    if e.is_builder() {
        TransportError::Rejected(e.to_string())
    } else if e.is_timeout() {
        TransportError::Transient(format!("request timed out: {e}"))
    } else {
        TransportError::Transient(e.to_string())
    }
}

#[derive(Debug, Deserialize)]
struct RemoteResponse {
    #[serde(default)]
    model: Option<String>,
    detections: Vec<RemoteDetection>,
}

#[derive(Debug, Deserialize)]
struct RemoteDetection {
    label: String,
    confidence: f32,
    bbox: [f32; 4],
}

/// Parse a response body into raw detections, preserving emission order.
///
/// Malformed bodies are rejected rather than retried.
pub fn parse_response(body: &str) -> Result<Vec<RawDetection>> {
    let response: RemoteResponse =
        serde_json::from_str(body).map_err(|e| Error::BackendRejected {
            reason: format!("malformed response: {e}"),
        })?;

    if let Some(model) = &response.model {
        debug!("Remote model reported: {model}");
    }

    response
        .detections
        .into_iter()
        .map(|d| {
            if !d.confidence.is_finite() {
                return Err(Error::BackendRejected {
                    reason: format!("non-finite confidence for '{}'", d.label),
                });
            }
            let [x1, y1, x2, y2] = d.bbox;
            Ok(RawDetection {
                label: d.label,
                confidence: d.confidence.clamp(0.0, 1.0),
                bbox: BoundingBox { x1, y1, x2, y2 },
            })
        })
        .collect()
}

/// Remote specialist backend.
pub struct RemoteDetector {
    transport: Box<dyn RemoteTransport>,
    policy: RetryPolicy,
    identity: BackendIdentity,
}

impl RemoteDetector {
    /// Create a detector over an arbitrary transport.
    pub fn new(transport: Box<dyn RemoteTransport>, policy: RetryPolicy, model: String) -> Self {
        Self {
            transport,
            policy,
            identity: BackendIdentity {
                kind: BackendKind::Remote,
                model,
            },
        }
    }

    /// Create an HTTPS-backed detector from remote settings.
    pub fn from_config(config: &RemoteConfig) -> Result<Self> {
        let endpoint = config.endpoint.clone().ok_or_else(|| Error::BackendInit {
            reason: "no remote endpoint configured".to_string(),
        })?;
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| Error::BackendInit {
                reason: "no remote credential configured".to_string(),
            })?;

        let transport = HttpTransport::new(
            endpoint,
            api_key,
            Duration::from_secs(config.timeout_secs),
            Duration::from_secs(config.connect_timeout_secs),
        )?;

        Ok(Self::new(
            Box::new(transport),
            RetryPolicy::from_config(config),
            config.model.clone(),
        ))
    }
}

impl Detector for RemoteDetector {
    fn identity(&self) -> &BackendIdentity {
        &self.identity
    }

    fn detect(&self, image: &[u8]) -> Result<Vec<RawDetection>> {
        let body = self.policy.run(|attempt| {
            debug!("Remote detection attempt {attempt}/{}", self.policy.max_attempts);
            self.transport.post_image(image)
        })?;
        parse_response(&body)
    }
}
