//! Randomized but self-consistent domain objects for offline development.
//!
//! Every function takes its random source explicitly so seeded runs are
//! reproducible; ids are drawn from the same source. Nothing here is derived
//! from anything else: each call is statistically independent.

use chrono::{DateTime, Duration, Utc};
use rand::seq::SliceRandom;
use rand::Rng;

use crate::models::activity::{ActivityLog, LogType, Severity};
use crate::models::market::{Market, Side};
use crate::models::portfolio::{PortfolioSnapshot, INITIAL_BALANCE};
use crate::models::position::Position;
use crate::models::stats::{DashboardStats, DecisionStats};
use crate::models::status::{BotMode, BotStatus};
use crate::models::trade::{round2, Trade, TradeAction};

pub const MIN_TRADE_PRICE: f64 = 0.01;
pub const MAX_TRADE_PRICE: f64 = 0.99;

const BUY_REASONS: &[&str] = &[
    "Sentiment on X turned positive, entry at {price} looks underpriced.",
    "Unusual volume spike detected, buying at {price}.",
    "Probability model puts fair value 15% above {price}.",
    "Major news picked up by the NLP module, filled at {price}.",
    "RSI and MACD converging, entry at {price}.",
];

const SELL_REASONS: &[&str] = &[
    "Take-profit target reached at {price}, realized {pnl}.",
    "Trend reversing, defensive exit at {price} ({pnl}).",
    "Volatility above the allowed threshold, closed for {pnl}.",
    "Contradicting information detected, sold at {price}.",
    "Portfolio rebalancing, realized {pnl}.",
];

const HOLD_REASONS: &[&str] = &[
    "No clear signal at {price}, keeping the market under watch.",
    "Spread too wide around {price}, waiting for liquidity.",
    "Confidence below threshold, holding.",
];

struct LogTemplate {
    log_type: LogType,
    severity: Severity,
    messages: &'static [&'static str],
    details: &'static [&'static str],
}

static LOG_TEMPLATES: [LogTemplate; 4] = [
    LogTemplate {
        log_type: LogType::Trade,
        severity: Severity::Success,
        messages: &[
            "Order filled: BUY YES on Bitcoin $150k",
            "Order filled: SELL NO on FED rate cut",
            "Position increased on GPT-6 release",
            "Position closed on Ethereum $10k",
        ],
        details: &["Filled at mid, no slippage", "Partial fill completed"],
    },
    LogTemplate {
        log_type: LogType::Alert,
        severity: Severity::Warning,
        messages: &[
            "Volatility spike on crypto markets",
            "Liquidity dropped below threshold",
            "Exposure approaching configured limit",
            "Price gap detected on politics market",
        ],
        details: &["Monitoring closely", "Position sizing reduced"],
    },
    LogTemplate {
        log_type: LogType::System,
        severity: Severity::Info,
        messages: &[
            "Heartbeat OK",
            "Market data refreshed",
            "Portfolio snapshot saved",
            "Connected to Polymarket API",
        ],
        details: &[],
    },
    LogTemplate {
        log_type: LogType::Analysis,
        severity: Severity::Info,
        messages: &[
            "Scanned 48 active markets",
            "Sentiment model updated",
            "3 markets flagged as mispriced",
            "Correlation matrix recomputed",
        ],
        details: &["Confidence scores refreshed", "No action required"],
    },
];

fn pick<R: Rng + ?Sized>(rng: &mut R, pool: &'static [&'static str]) -> &'static str {
    pool.choose(rng).copied().unwrap_or_default()
}

fn hex_id<R: Rng + ?Sized>(rng: &mut R, prefix: &str, digits: usize) -> String {
    let raw = format!("{:016x}", rng.gen::<u64>());
    format!("{prefix}_{}", &raw[..digits.min(16)])
}

/// One random trade against a market drawn from `markets`.
///
/// Returns None only when `markets` is empty.
pub fn random_trade<R: Rng + ?Sized>(
    rng: &mut R,
    markets: &[Market],
    timestamp: DateTime<Utc>,
) -> Option<Trade> {
    let market = markets.choose(rng)?;

    let action = match rng.gen_range(0..10) {
        0..=5 => TradeAction::Buy,
        6..=8 => TradeAction::Sell,
        _ => TradeAction::Hold,
    };
    let side = if rng.gen_bool(0.5) { Side::Yes } else { Side::No };
    let quantity = rng.gen_range(10..=500) as f64;
    let jitter = rng.gen_range(-0.1..=0.1);
    let price = round2(market.current_price + jitter).clamp(MIN_TRADE_PRICE, MAX_TRADE_PRICE);
    let confidence = rng.gen_range(45..=98);
    let profit_loss = (action == TradeAction::Sell).then(|| round2(rng.gen_range(-50.0..=200.0)));

    let pool = match action {
        TradeAction::Buy => BUY_REASONS,
        TradeAction::Sell => SELL_REASONS,
        TradeAction::Hold => HOLD_REASONS,
    };
    let reasoning = pick(rng, pool)
        .replace("{price}", &format!("{price:.2}"))
        .replace("{pnl}", &format!("{:+.2}", profit_loss.unwrap_or(0.0)));

    Some(Trade {
        id: hex_id(rng, "trade", 8),
        timestamp,
        market_id: market.id.clone(),
        market_question: market.question.clone(),
        action,
        side,
        quantity,
        price,
        total_cost: round2(quantity * price),
        confidence,
        reasoning,
        profit_loss,
    })
}

/// `count` trades spaced 10 minutes to 2 hours apart going back from `now`,
/// newest first.
pub fn trade_history<R: Rng + ?Sized>(
    rng: &mut R,
    markets: &[Market],
    count: usize,
    now: DateTime<Utc>,
) -> Vec<Trade> {
    let mut cursor = now;
    let mut trades = Vec::with_capacity(count);
    for _ in 0..count {
        cursor -= Duration::seconds(rng.gen_range(600..=7200));
        match random_trade(rng, markets, cursor) {
            Some(trade) => trades.push(trade),
            None => break,
        }
    }
    trades.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    trades
}

/// Daily snapshots from `days` ago through today (days + 1 entries), oldest first.
///
/// Random walk with a daily return in [-3%, +3.5%] starting from the initial
/// balance; cumulative P&L is always measured against that balance.
pub fn portfolio_history<R: Rng + ?Sized>(
    rng: &mut R,
    days: u32,
    now: DateTime<Utc>,
) -> Vec<PortfolioSnapshot> {
    let mut value = INITIAL_BALANCE;
    let mut previous = INITIAL_BALANCE;
    let mut history = Vec::with_capacity(days as usize + 1);

    for days_back in (0..=days).rev() {
        value *= 1.0 + rng.gen_range(-0.03..=0.035);
        let total = round2(value);
        let cash = round2(total * rng.gen_range(0.2..=0.6));

        history.push(PortfolioSnapshot {
            timestamp: now - Duration::days(days_back as i64),
            total_value: total,
            cash_balance: cash,
            invested_value: round2(total - cash),
            daily_pnl: round2(total - previous),
            total_pnl: round2(total - INITIAL_BALANCE),
        });
        previous = total;
    }
    history
}

/// 3 to 6 open positions on distinct catalog markets.
pub fn open_positions<R: Rng + ?Sized>(rng: &mut R, catalog: &[Market]) -> Vec<Position> {
    let count = rng.gen_range(3..=6).min(catalog.len());
    let chosen: Vec<&Market> = catalog.choose_multiple(rng, count).collect();

    chosen
        .into_iter()
        .map(|market| {
            let side = if rng.gen_bool(0.6) { Side::Yes } else { Side::No };
            let current = (market.price_of(side) * 1000.0).round() / 1000.0;
            let entry = ((current + rng.gen_range(-0.15..=0.10)) * 1000.0).round() / 1000.0;
            let entry = entry.clamp(MIN_TRADE_PRICE, MAX_TRADE_PRICE);
            let shares = rng.gen_range(50..=1000) as f64;
            Position::new(&market.id, &market.question, side, shares, entry, current)
        })
        .collect()
}

pub fn bot_status<R: Rng + ?Sized>(rng: &mut R, now: DateTime<Utc>) -> BotStatus {
    BotStatus {
        is_connected: true,
        last_heartbeat: now,
        uptime: rng.gen_range(3_600..=604_800),
        total_trades: rng.gen_range(50..=500),
        win_rate: (rng.gen_range(52.0..=78.0_f64) * 10.0).round() / 10.0,
        active_positions: rng.gen_range(3..=6),
        mode: BotMode::Paper,
        version: "1.0.0".to_string(),
    }
}

pub fn dashboard_stats<R: Rng + ?Sized>(rng: &mut R) -> DashboardStats {
    let portfolio_value = round2(rng.gen_range(9_500.0..=13_500.0));
    let daily_change = round2(rng.gen_range(-300.0..=450.0));
    let yesterday = portfolio_value - daily_change;
    let total_pnl = round2(portfolio_value - INITIAL_BALANCE);

    DashboardStats {
        portfolio_value,
        daily_change,
        daily_change_percent: round2(daily_change / yesterday * 100.0),
        total_pnl,
        total_pnl_percent: round2(total_pnl / INITIAL_BALANCE * 100.0),
        total_trades: rng.gen_range(50..=500),
        win_rate: (rng.gen_range(52.0..=78.0_f64) * 10.0).round() / 10.0,
        active_positions: rng.gen_range(3..=6),
        sharpe_ratio: round2(rng.gen_range(0.5..=2.5)),
        max_drawdown: round2(rng.gen_range(2.0..=15.0)),
    }
}

pub fn decision_stats<R: Rng + ?Sized>(rng: &mut R) -> DecisionStats {
    let total_decisions: u64 = rng.gen_range(100..=600);
    let buys = (total_decisions as f64 * rng.gen_range(0.10..=0.25)) as u64;
    let sells = (total_decisions as f64 * rng.gen_range(0.05..=0.15)) as u64;
    DecisionStats {
        total_decisions,
        buys,
        sells,
        holds: total_decisions - buys - sells,
        executed: rng.gen_range(0..=buys + sells),
    }
}

/// `count` activity entries spaced 30s to 10min apart going back from `now`,
/// newest first.
pub fn activity_logs<R: Rng + ?Sized>(
    rng: &mut R,
    count: usize,
    now: DateTime<Utc>,
) -> Vec<ActivityLog> {
    let mut cursor = now;
    let mut logs = Vec::with_capacity(count);
    for _ in 0..count {
        cursor -= Duration::seconds(rng.gen_range(30..=600));
        let template = &LOG_TEMPLATES[rng.gen_range(0..LOG_TEMPLATES.len())];
        let details = template.details.choose(rng).map(|d| d.to_string());
        logs.push(ActivityLog {
            id: hex_id(rng, "log", 6),
            timestamp: cursor,
            log_type: template.log_type,
            severity: template.severity,
            message: pick(rng, template.messages).to_string(),
            details,
        });
    }
    logs.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    logs
}
