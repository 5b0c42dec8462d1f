use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketCategory {
    Politics,
    Crypto,
    Sports,
    Entertainment,
    Science,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Yes,
    No,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Yes => "YES",
            Side::No => "NO",
        }
    }
}

/// A binary prediction market as the bot tracks it.
///
/// `current_price` is the YES probability in [0, 1].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Market {
    pub id: String,
    pub question: String,
    pub category: MarketCategory,
    pub current_price: f64,
    #[serde(default)]
    pub volume_24h: f64,
    #[serde(default)]
    pub liquidity: f64,
    /// Empty for markets the backend only knows from price snapshots.
    #[serde(default)]
    pub end_date: String,
    #[serde(default)]
    pub resolved: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<Side>,
}

impl Market {
    pub fn new(id: &str, question: &str, category: MarketCategory, current_price: f64) -> Self {
        Self {
            id: id.to_string(),
            question: question.to_string(),
            category,
            current_price: clamp_probability(current_price),
            volume_24h: 0.0,
            liquidity: 0.0,
            end_date: String::new(),
            resolved: false,
            outcome: None,
        }
    }

    /// Price in range and, once resolved, an outcome recorded.
    pub fn is_consistent(&self) -> bool {
        (0.0..=1.0).contains(&self.current_price) && (!self.resolved || self.outcome.is_some())
    }

    /// Price of the given side's token.
    pub fn price_of(&self, side: Side) -> f64 {
        match side {
            Side::Yes => self.current_price,
            Side::No => 1.0 - self.current_price,
        }
    }
}

pub fn clamp_probability(p: f64) -> f64 {
    if p.is_nan() {
        return 0.0;
    }
    p.clamp(0.0, 1.0)
}
