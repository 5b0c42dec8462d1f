use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::market::Side;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeAction {
    Buy,
    Sell,
    Hold,
}

impl TradeAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeAction::Buy => "BUY",
            TradeAction::Sell => "SELL",
            TradeAction::Hold => "HOLD",
        }
    }
}

/// An executed (or held) bot decision. Append-only history record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trade {
    pub id: String,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    pub market_id: String,
    pub market_question: String,
    pub action: TradeAction,
    pub side: Side,
    /// Share count. The backend sends fractional counts for sized buys.
    pub quantity: f64,
    pub price: f64,
    pub total_cost: f64,
    pub confidence: u8,
    pub reasoning: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profit_loss: Option<f64>,
}

impl Trade {
    pub fn is_win(&self) -> Option<bool> {
        self.profit_loss.map(|pnl| pnl > 0.0)
    }
}

/// Round to cents, the precision every currency field is reported in.
pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trade_decodes_with_null_pnl() {
        let json = r#"{
            "id": "trade_1a2b3c4d",
            "timestamp": "2026-02-07T14:30:00.123456Z",
            "marketId": "mkt_mars",
            "marketQuestion": "Will humans land on Mars before 2030?",
            "action": "BUY",
            "side": "NO",
            "quantity": 543.48,
            "price": 0.092,
            "totalCost": 50.0,
            "confidence": 81,
            "reasoning": "Volume spike detected indicating institutional interest.",
            "profitLoss": null
        }"#;
        let t: Trade = serde_json::from_str(json).unwrap();
        assert_eq!(t.action, TradeAction::Buy);
        assert_eq!(t.side, Side::No);
        assert_eq!(t.is_win(), None);
    }

    #[test]
    fn test_trade_without_timestamp_defaults_to_now() {
        let before = Utc::now();
        let json = r#"{"id":"t","marketId":"m","marketQuestion":"q","action":"SELL","side":"YES",
            "quantity":10,"price":0.5,"totalCost":5,"confidence":70,"reasoning":"r","profitLoss":-3.5}"#;
        let t: Trade = serde_json::from_str(json).unwrap();
        assert!(t.timestamp >= before);
        assert_eq!(t.is_win(), Some(false));
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(12.345_6), 12.35);
        assert_eq!(round2(-0.004), -0.0);
    }
}
