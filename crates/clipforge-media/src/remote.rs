//! HTTP client for a remote render service.
//!
//! The service exposes `POST /render` and `POST /concatenate`, both answering
//! `{"artifact": "<relative key>"}`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

use clipforge_models::ArtifactKey;

use crate::backend::{ConcatRequest, RenderBackend, RenderRequest};
use crate::error::{MediaError, MediaResult};

#[derive(Debug, Deserialize)]
struct ArtifactResponse {
    artifact: String,
}

pub struct RemoteRenderer {
    client: Client,
    base_url: Url,
}

impl RemoteRenderer {
    pub fn new(base_url: &str, timeout: Duration) -> MediaResult<Self> {
        // A trailing slash makes `join` append instead of replacing the last segment.
        let normalized = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalized)
            .map_err(|e| MediaError::config(format!("invalid RENDER_SERVICE_URL {base_url}: {e}")))?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MediaError::config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, base_url })
    }

    fn endpoint(&self, path: &str) -> MediaResult<Url> {
        self.base_url
            .join(path)
            .map_err(|e| MediaError::internal(format!("bad endpoint {path}: {e}")))
    }

    async fn post_for_artifact<B: serde::Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> MediaResult<ArtifactKey> {
        let url = self.endpoint(path)?;
        debug!(url = %url, "Calling render service");

        let response = self.client.post(url).json(body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(classify_status(status, message));
        }

        let parsed: ArtifactResponse = response
            .json()
            .await
            .map_err(|e| MediaError::InvalidResponse(format!("unreadable body: {e}")))?;
        ArtifactKey::new(parsed.artifact).map_err(|e| {
            warn!(error = %e, "Render service returned an unusable artifact key");
            MediaError::InvalidResponse(e.to_string())
        })
    }
}

fn classify_status(status: StatusCode, message: String) -> MediaError {
    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        MediaError::service(Some(status.as_u16()), message)
    } else {
        MediaError::invalid_input(format!("render service rejected request ({status}): {message}"))
    }
}

#[async_trait]
impl RenderBackend for RemoteRenderer {
    fn name(&self) -> &'static str {
        "remote"
    }

    async fn render(&self, request: &RenderRequest) -> MediaResult<ArtifactKey> {
        request.window()?;
        self.post_for_artifact("render", request).await
    }

    async fn concatenate(&self, request: &ConcatRequest) -> MediaResult<ArtifactKey> {
        if request.inputs.is_empty() {
            return Err(MediaError::invalid_input("no inputs to concatenate"));
        }
        self.post_for_artifact("concatenate", request).await
    }

    async fn health_check(&self) -> MediaResult<()> {
        let url = self.endpoint("health")?;
        let response = self.client.get(url).send().await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(MediaError::service(
                Some(response.status().as_u16()),
                "render service unhealthy",
            ))
        }
    }
}
