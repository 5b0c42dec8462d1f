use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::config::ApiConfig;
use crate::error::{Result, SyncError};
use crate::feeds::source::DataSource;
use crate::models::activity::ActivityLog;
use crate::models::chat::{ChatMessage, ChatRequest};
use crate::models::envelope::TickResponse;
use crate::models::portfolio::PortfolioSnapshot;
use crate::models::position::Position;
use crate::models::stats::DecisionStats;
use crate::models::trade::Trade;
use crate::telemetry::latency::LatencyTracker;

pub const TICK: &str = "/api/tick";
pub const POSITIONS: &str = "/api/positions";
pub const PORTFOLIO_HISTORY: &str = "/api/portfolio/history";
pub const TRADES: &str = "/api/trades";
pub const ACTIVITY: &str = "/api/activity";
pub const CHAT_HISTORY: &str = "/api/chat/history";
pub const DECISION_STATS: &str = "/api/decisions/stats";
pub const CHAT: &str = "/api/chat";

/// The bot is usually reached through an ngrok tunnel, which serves an HTML
/// interstitial unless this header is present.
const NGROK_SKIP_WARNING: &str = "ngrok-skip-browser-warning";

/// JSON client for the bot's REST surface.
pub struct HttpSource {
    base: Url,
    http: reqwest::Client,
    latency: Arc<LatencyTracker>,
}

impl HttpSource {
    pub fn new(config: &ApiConfig, latency: Arc<LatencyTracker>) -> Result<Self> {
        let base = Url::parse(&config.base_url)?;

        let mut headers = HeaderMap::new();
        headers.insert(NGROK_SKIP_WARNING, HeaderValue::from_static("true"));

        let mut builder = reqwest::Client::builder()
            .default_headers(headers)
            .pool_max_idle_per_host(4)
            .tcp_keepalive(Some(Duration::from_secs(30)));
        if let Some(secs) = config.http_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        Ok(Self {
            base,
            http: builder.build()?,
            latency,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base.join(path)?)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &'static str) -> Result<T> {
        let url = self.endpoint(path)?;
        let _timer = self.latency.start(path);
        let result = self.http.get(url).send().await;
        self.decode(path, result).await
    }

    async fn decode<T: DeserializeOwned>(
        &self,
        path: &'static str,
        result: std::result::Result<reqwest::Response, reqwest::Error>,
    ) -> Result<T> {
        let outcome = read_json(path, result).await;
        if outcome.is_err() {
            self.latency.record_failure(path);
        }
        outcome
    }
}

async fn read_json<T: DeserializeOwned>(
    path: &'static str,
    result: std::result::Result<reqwest::Response, reqwest::Error>,
) -> Result<T> {
    let resp = result?;
    let status = resp.status();
    if !status.is_success() {
        return Err(SyncError::Status { path, status });
    }
    let body = resp.bytes().await?;
    debug!("{} -> {} bytes", path, body.len());
    serde_json::from_slice(&body).map_err(|source| SyncError::Decode { path, source })
}

#[async_trait]
impl DataSource for HttpSource {
    async fn tick(&self) -> Result<TickResponse> {
        self.get_json(TICK).await
    }

    async fn positions(&self) -> Result<Vec<Position>> {
        self.get_json(POSITIONS).await
    }

    async fn portfolio_history(&self) -> Result<Vec<PortfolioSnapshot>> {
        self.get_json(PORTFOLIO_HISTORY).await
    }

    async fn trades(&self) -> Result<Vec<Trade>> {
        self.get_json(TRADES).await
    }

    async fn activity(&self) -> Result<Vec<ActivityLog>> {
        self.get_json(ACTIVITY).await
    }

    async fn chat_history(&self) -> Result<Vec<ChatMessage>> {
        self.get_json(CHAT_HISTORY).await
    }

    async fn decision_stats(&self) -> Result<DecisionStats> {
        self.get_json(DECISION_STATS).await
    }

    async fn send_chat(&self, message: &str) -> Result<ChatMessage> {
        let url = self.endpoint(CHAT)?;
        let _timer = self.latency.start(CHAT);
        let result = self.http.post(url).json(&ChatRequest { message }).send().await;
        self.decode(CHAT, result).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api(base_url: &str) -> ApiConfig {
        ApiConfig {
            base_url: base_url.to_string(),
            http_timeout_secs: None,
        }
    }

    #[test]
    fn test_endpoint_join_keeps_host() {
        let source = HttpSource::new(&api("https://abc.ngrok-free.app"), Arc::new(LatencyTracker::new(8))).unwrap();
        assert_eq!(
            source.endpoint(TICK).unwrap().as_str(),
            "https://abc.ngrok-free.app/api/tick"
        );
        assert_eq!(
            source.endpoint(DECISION_STATS).unwrap().as_str(),
            "https://abc.ngrok-free.app/api/decisions/stats"
        );
    }

    #[tokio::test]
    async fn test_latency_includes_body_read() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 2048];
            let _ = sock.read(&mut buf).await;
            sock.write_all(b"HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: 2\r\n\r\n")
                .await
                .unwrap();
            sock.flush().await.unwrap();
            // Headers are out; the body trails behind.
            tokio::time::sleep(Duration::from_millis(300)).await;
            sock.write_all(b"[]").await.unwrap();
            sock.flush().await.unwrap();
        });

        let latency = Arc::new(LatencyTracker::new(8));
        let source = HttpSource::new(&api(&format!("http://{addr}")), latency.clone()).unwrap();
        assert!(source.positions().await.unwrap().is_empty());

        let (p50, _, _) = latency.percentiles(POSITIONS).unwrap();
        assert!(p50 >= Duration::from_millis(250), "sample {p50:?} stops at the headers");
        assert_eq!(latency.failures(POSITIONS), 0);
    }

    #[test]
    fn test_rejects_unparseable_base() {
        let err = HttpSource::new(&api("not a url"), Arc::new(LatencyTracker::new(8)));
        assert!(matches!(err, Err(SyncError::InvalidUrl(_))));
    }
}
