use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::redirect::Policy;
use shared::error::ProbeError;
use shared::probe::{classify_http_response, ProbeVerdict};
use tracing::info;
use url::Url;

/// A transport that can check one endpoint for Internet reachability.
///
/// The engine drives whichever implementation it is given; embedders can
/// substitute probes speaking other protocols (DNS, QUIC, a test double).
#[async_trait]
pub trait TransportProbe: Send + Sync {
    async fn probe(&self, url: &Url) -> Result<ProbeVerdict, ProbeError>;
}

/// Production probe: one GET per attempt with redirects disabled, so portal
/// redirects surface as 3xx statuses instead of being followed to a 200.
pub struct HttpProbe {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpProbe {
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, ProbeError> {
        let client = reqwest::Client::builder()
            .redirect(Policy::none())
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .map_err(|err| ProbeError::Http(err.to_string()))?;
        Ok(Self { client, timeout })
    }
}

#[async_trait]
impl TransportProbe for HttpProbe {
    async fn probe(&self, url: &Url) -> Result<ProbeVerdict, ProbeError> {
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ProbeError::InvalidUrl(url.to_string()));
        }

        let started = Instant::now();
        let response = self.client.get(url.clone()).send().await.map_err(|err| {
            if err.is_timeout() {
                ProbeError::Timeout { after: self.timeout }
            } else if err.is_connect() {
                ProbeError::Connect(err.to_string())
            } else {
                ProbeError::Http(err.to_string())
            }
        })?;

        let status = response.status().as_u16();
        let content_length = response.content_length();
        let verdict = classify_http_response(status, content_length);
        info!(
            %url,
            status,
            content_length,
            elapsed_ms = started.elapsed().as_millis() as u64,
            verdict = ?verdict,
            "http probe completed"
        );
        Ok(verdict)
    }
}
