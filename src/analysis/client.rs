use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Semaphore;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::analysis::request::AnalysisRequest;
use crate::analysis::result::AnalysisResult;
use crate::config::AnalysisSettings;
use crate::error::{AnalysisError, ConfigError};

// Upstream error bodies are truncated before they reach logs.
const MAX_ERROR_BODY: usize = 2000;

/// Submits one encoded frame and returns the parsed result. Implementations
/// must not retry; the gate's next tick is the retry policy.
#[async_trait]
pub trait AnalysisClient: Send + Sync {
    async fn submit(&self, request: AnalysisRequest) -> Result<AnalysisResult, AnalysisError>;

    /// Liveness of the remote endpoint. Defaults to "unknown, assume up".
    async fn health(&self) -> Result<bool, AnalysisError> {
        Ok(true)
    }
}

/// JSON-over-HTTP client for the skin analysis endpoint.
///
/// A POST abandoned by a caller-side timeout keeps running on its blocking
/// thread until ureq gives up. The next submission waits for it, so at most
/// one POST is ever on the wire.
#[derive(Clone)]
pub struct HttpAnalysisClient {
    agent: ureq::Agent,
    endpoint: Url,
    origin: Url,
    api_key: Option<String>,
    transport: Arc<Semaphore>,
}

impl HttpAnalysisClient {
    pub fn new(settings: &AnalysisSettings) -> Result<Self, ConfigError> {
        let endpoint = Url::parse(&settings.endpoint).map_err(|e| ConfigError::Invalid {
            field: "analysis.endpoint",
            reason: e.to_string(),
        })?;
        let origin = match &settings.origin {
            Some(origin) => Url::parse(origin).map_err(|e| ConfigError::Invalid {
                field: "analysis.origin",
                reason: e.to_string(),
            })?,
            None => endpoint.join("/").map_err(|e| ConfigError::Invalid {
                field: "analysis.endpoint",
                reason: e.to_string(),
            })?,
        };

        Ok(Self {
            agent: build_agent(settings.request_timeout()),
            endpoint,
            origin,
            api_key: settings.api_key.clone(),
            transport: Arc::new(Semaphore::new(1)),
        })
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }

    fn post_json(&self, body: String) -> Result<String, AnalysisError> {
        let mut request = self
            .agent
            .post(self.endpoint.as_str())
            .set("Content-Type", "application/json");
        if let Some(key) = &self.api_key {
            request = request.set("Authorization", &format!("Bearer {key}"));
        }

        match request.send_string(&body) {
            Ok(response) => response
                .into_string()
                .map_err(|e| AnalysisError::Network(e.to_string())),
            Err(ureq::Error::Status(status, response)) => {
                let mut body = response.into_string().unwrap_or_default();
                truncate(&mut body, MAX_ERROR_BODY);
                Err(AnalysisError::Server { status, body })
            }
            Err(ureq::Error::Transport(transport)) => {
                Err(AnalysisError::Network(transport.to_string()))
            }
        }
    }

    fn get_health(&self) -> Result<bool, AnalysisError> {
        let url = self
            .origin
            .join("health")
            .map_err(|e| AnalysisError::Network(e.to_string()))?;
        match self.agent.get(url.as_str()).call() {
            Ok(response) => {
                let body = response
                    .into_string()
                    .map_err(|e| AnalysisError::Network(e.to_string()))?;
                let value: serde_json::Value = serde_json::from_str(&body)
                    .map_err(|e| AnalysisError::MalformedResponse(e.to_string()))?;
                Ok(value.get("ok").and_then(|ok| ok.as_bool()).unwrap_or(false))
            }
            Err(ureq::Error::Status(status, _)) => {
                warn!("Health probe answered with status {}", status);
                Ok(false)
            }
            Err(ureq::Error::Transport(transport)) => {
                Err(AnalysisError::Network(transport.to_string()))
            }
        }
    }
}

fn build_agent(timeout: Duration) -> ureq::Agent {
    ureq::AgentBuilder::new().timeout(timeout).build()
}

// Counts characters, not bytes.
fn truncate(body: &mut String, max: usize) {
    if let Some((cut, _)) = body.char_indices().nth(max) {
        body.truncate(cut);
    }
}

#[async_trait]
impl AnalysisClient for HttpAnalysisClient {
    #[instrument(skip(self, request), fields(sequence = request.sequence, frame_id = %request.frame_id))]
    async fn submit(&self, request: AnalysisRequest) -> Result<AnalysisResult, AnalysisError> {
        let body = request.to_json()?;
        debug!("Posting {} byte payload to {}", body.len(), self.endpoint);

        let permit = self
            .transport
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| AnalysisError::Network(e.to_string()))?;

        // ureq is blocking; keep it off the runtime threads.
        let client = self.clone();
        let response = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            client.post_json(body)
        })
        .await
            .map_err(|e| AnalysisError::Network(e.to_string()))??;

        let mut result = AnalysisResult::parse(&response, request.frame_id, request.sequence)?;
        result.resolve_audio_url(&self.origin)?;
        Ok(result)
    }

    async fn health(&self) -> Result<bool, AnalysisError> {
        let client = self.clone();
        tokio::task::spawn_blocking(move || client.get_health())
            .await
            .map_err(|e| AnalysisError::Network(e.to_string()))?
    }
}
