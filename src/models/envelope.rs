//! Wire envelope for incremental updates and the `/api/tick` response shape.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::warn;

use super::activity::ActivityLog;
use super::chat::ChatMessage;
use super::market::Market;
use super::portfolio::PortfolioSnapshot;
use super::position::Position;
use super::stats::DashboardStats;
use super::status::BotStatus;
use super::trade::Trade;
use crate::error::EnvelopeError;

/// One incremental update; the variant decides the payload shape.
#[derive(Debug, Clone, PartialEq)]
pub enum TunnelEvent {
    TradeExecuted(Trade),
    PortfolioUpdate(PortfolioSnapshot),
    BotStatus(BotStatus),
    ChatResponse(ChatMessage),
    ActivityLog(ActivityLog),
    MarketUpdate(Market),
}

impl TunnelEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            TunnelEvent::TradeExecuted(_) => "TRADE_EXECUTED",
            TunnelEvent::PortfolioUpdate(_) => "PORTFOLIO_UPDATE",
            TunnelEvent::BotStatus(_) => "BOT_STATUS",
            TunnelEvent::ChatResponse(_) => "CHAT_RESPONSE",
            TunnelEvent::ActivityLog(_) => "ACTIVITY_LOG",
            TunnelEvent::MarketUpdate(_) => "MARKET_UPDATE",
        }
    }

    /// Decode a payload according to its type tag.
    pub fn decode(kind: &str, payload: serde_json::Value) -> Result<Self, EnvelopeError> {
        fn payload_of<T: DeserializeOwned>(
            kind: &str,
            payload: serde_json::Value,
        ) -> Result<T, EnvelopeError> {
            serde_json::from_value(payload).map_err(|source| EnvelopeError::Payload {
                kind: kind.to_string(),
                source,
            })
        }

        Ok(match kind {
            "TRADE_EXECUTED" => TunnelEvent::TradeExecuted(payload_of(kind, payload)?),
            "PORTFOLIO_UPDATE" => TunnelEvent::PortfolioUpdate(payload_of(kind, payload)?),
            "BOT_STATUS" => TunnelEvent::BotStatus(payload_of(kind, payload)?),
            "CHAT_RESPONSE" => TunnelEvent::ChatResponse(payload_of(kind, payload)?),
            "ACTIVITY_LOG" => TunnelEvent::ActivityLog(payload_of(kind, payload)?),
            "MARKET_UPDATE" => TunnelEvent::MarketUpdate(payload_of(kind, payload)?),
            other => return Err(EnvelopeError::UnknownType(other.to_string())),
        })
    }
}

/// `{ type, payload, timestamp }` as delivered by the tick endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "WireEnvelope")]
pub struct TunnelMessage {
    pub event: TunnelEvent,
    pub timestamp: DateTime<Utc>,
}

impl TunnelMessage {
    pub fn now(event: TunnelEvent) -> Self {
        Self {
            event,
            timestamp: Utc::now(),
        }
    }
}

#[derive(Deserialize)]
struct WireEnvelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    payload: serde_json::Value,
    #[serde(default = "Utc::now")]
    timestamp: DateTime<Utc>,
}

impl TryFrom<WireEnvelope> for TunnelMessage {
    type Error = EnvelopeError;

    fn try_from(wire: WireEnvelope) -> Result<Self, Self::Error> {
        Ok(Self {
            event: TunnelEvent::decode(&wire.kind, wire.payload)?,
            timestamp: wire.timestamp,
        })
    }
}

impl Serialize for TunnelMessage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut st = serializer.serialize_struct("TunnelMessage", 3)?;
        st.serialize_field("type", self.event.kind())?;
        match &self.event {
            TunnelEvent::TradeExecuted(p) => st.serialize_field("payload", p)?,
            TunnelEvent::PortfolioUpdate(p) => st.serialize_field("payload", p)?,
            TunnelEvent::BotStatus(p) => st.serialize_field("payload", p)?,
            TunnelEvent::ChatResponse(p) => st.serialize_field("payload", p)?,
            TunnelEvent::ActivityLog(p) => st.serialize_field("payload", p)?,
            TunnelEvent::MarketUpdate(p) => st.serialize_field("payload", p)?,
        }
        st.serialize_field("timestamp", &self.timestamp)?;
        st.end()
    }
}

/// Body of `GET /api/tick`. Every field is optional on the wire; a field
/// that fails to decode is dropped rather than failing the whole tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TickResponse {
    #[serde(default, deserialize_with = "lenient_events")]
    pub events: Vec<TunnelMessage>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub stats: Option<DashboardStats>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub positions: Option<Vec<Position>>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub markets: Option<Vec<Market>>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub portfolio_history: Option<Vec<PortfolioSnapshot>>,
}

fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let Some(value) = Option::<serde_json::Value>::deserialize(deserializer)? else {
        return Ok(None);
    };
    match serde_json::from_value(value) {
        Ok(v) => Ok(Some(v)),
        Err(e) => {
            warn!("Dropping malformed tick field: {e}");
            Ok(None)
        }
    }
}

fn lenient_events<'de, D>(deserializer: D) -> Result<Vec<TunnelMessage>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Vec<serde_json::Value>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(raw
        .into_iter()
        .filter_map(|v| match serde_json::from_value::<TunnelMessage>(v) {
            Ok(msg) => Some(msg),
            Err(e) => {
                warn!("Skipping malformed envelope: {e}");
                None
            }
        })
        .collect())
}
