use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;

use crate::models::chat::{ChatMessage, Sender};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatTopic {
    Strategy,
    Performance,
    Risk,
    Market,
}

// Checked in order; first topic with a matching keyword wins.
const TOPIC_KEYWORDS: [(ChatTopic, &[&str]); 4] = [
    (ChatTopic::Strategy, &["strategy", "stratégie", "strategie"]),
    (ChatTopic::Performance, &["performance", "profit", "pnl", "rendement"]),
    (ChatTopic::Risk, &["risk", "risque", "drawdown"]),
    (ChatTopic::Market, &["market", "marché", "marche"]),
];

const STRATEGY_REPLIES: &[&str] = &[
    "I combine sentiment analysis on news and social feeds with a probability model. When the model's fair value diverges from the market price by more than 8%, I take a position.",
    "My current approach is momentum plus mean reversion: I follow strong moves early and fade overreactions once volume dries up.",
    "I size every position with a fractional Kelly criterion, capped at 5% of the portfolio per market.",
];

const PERFORMANCE_REPLIES: &[&str] = &[
    "Performance is tracked against the 10,000 USDC starting balance. The dashboard shows total P&L, daily change and the Sharpe ratio over the period.",
    "Most of the profit this week came from crypto markets. Politics positions are roughly flat.",
    "Win rate on closed trades is holding above 60%, with the average winner larger than the average loser.",
];

const RISK_REPLIES: &[&str] = &[
    "Risk management: no more than 5% of capital per market, a stop-loss at 15% below entry, and a hard cap of 60% total exposure.",
    "I watch drawdown continuously. Past 10% from the peak I halve position sizes until the equity curve recovers.",
    "Correlated markets share one exposure budget so a single event cannot hit several positions at once.",
];

const MARKET_REPLIES: &[&str] = &[
    "I'm tracking crypto, politics, science and sports markets. Crypto markets currently have the most volume.",
    "The Bitcoin $150k market moved the most today. I'm watching it for an entry.",
    "Spreads are tight on the large markets and wide on the long-dated ones, so I focus on the liquid end.",
];

const DEFAULT_REPLIES: &[&str] = &[
    "I'm monitoring the markets. Ask me about my strategy, performance, risk management or the markets I'm tracking.",
    "Everything is running normally. What would you like to know?",
    "Good question. I'm analyzing the data and will adjust positions if anything changes.",
];

/// First topic whose keywords appear in the message, case-insensitively.
pub fn route(message: &str) -> Option<ChatTopic> {
    let lower = message.to_lowercase();
    TOPIC_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| lower.contains(k)))
        .map(|(topic, _)| *topic)
}

pub fn reply_pool(topic: Option<ChatTopic>) -> &'static [&'static str] {
    match topic {
        Some(ChatTopic::Strategy) => STRATEGY_REPLIES,
        Some(ChatTopic::Performance) => PERFORMANCE_REPLIES,
        Some(ChatTopic::Risk) => RISK_REPLIES,
        Some(ChatTopic::Market) => MARKET_REPLIES,
        None => DEFAULT_REPLIES,
    }
}

/// Bot reply chosen from the pool of the message's topic.
pub fn canned_reply<R: Rng + ?Sized>(
    rng: &mut R,
    message: &str,
    timestamp: DateTime<Utc>,
) -> ChatMessage {
    let content = reply_pool(route(message))
        .choose(rng)
        .copied()
        .unwrap_or_default();
    ChatMessage {
        id: format!("bot_{:08x}", rng.gen::<u32>()),
        timestamp,
        sender: Sender::Bot,
        content: content.to_string(),
        is_typing: None,
    }
}
