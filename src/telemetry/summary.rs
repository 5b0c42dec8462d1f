use tracing::info;

use crate::models::stats::DecisionStats;
use crate::sync::state::LiveState;

/// One-line overview of the mirrored bot, plus the decision tally.
pub fn log_summary(state: &LiveState) {
    let stats = state.effective_stats();
    let invested = state.portfolio().map(|p| p.invested_ratio()).unwrap_or(0.0);
    info!(
        "=== BOT SUMMARY === connected={} value={:.2} invested={:.1}% daily={:+.2} ({:+.2}%) total_pnl={:+.2} trades={} win_rate={:.1}% positions={} markets={}",
        state.is_connected(),
        stats.portfolio_value,
        invested * 100.0,
        stats.daily_change,
        stats.daily_change_percent,
        stats.total_pnl,
        stats.total_trades,
        stats.win_rate,
        stats.active_positions,
        state.markets().len(),
    );

    let (decisions, origin) = decision_tally(state);
    if decisions.total_decisions > 0 {
        info!(
            "  Decisions ({}): total={} buy={} sell={} hold={} executed={} ({:.0}%)",
            origin,
            decisions.total_decisions,
            decisions.buys,
            decisions.sells,
            decisions.holds,
            decisions.executed,
            decisions.execution_rate() * 100.0,
        );
    }

    for trade in state.trades().iter().take(3) {
        info!(
            "  Recent: {} {} {:.0} @ {:.2} on {}",
            trade.action.as_str(),
            trade.side.as_str(),
            trade.quantity,
            trade.price,
            trade.market_question,
        );
    }
}

/// Backend counts when the poller has delivered them, otherwise a tally of
/// the trades held locally.
fn decision_tally(state: &LiveState) -> (DecisionStats, &'static str) {
    match state.decision_stats() {
        Some(remote) => (remote.clone(), "backend"),
        None => (DecisionStats::from_trades(state.trades()), "recent trades"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::envelope::TunnelEvent;
    use crate::models::market::Side;
    use crate::models::trade::{Trade, TradeAction};
    use crate::sync::state::Windows;
    use chrono::Utc;

    fn trade(id: &str, action: TradeAction) -> Trade {
        Trade {
            id: id.to_string(),
            timestamp: Utc::now(),
            market_id: "m1".into(),
            market_question: "q".into(),
            action,
            side: Side::Yes,
            quantity: 10.0,
            price: 0.5,
            total_cost: 5.0,
            confidence: 70,
            reasoning: String::new(),
            profit_loss: None,
        }
    }

    #[test]
    fn test_tally_falls_back_to_local_trades() {
        let mut state = LiveState::new(Windows::default());
        state.apply_event(TunnelEvent::TradeExecuted(trade("t1", TradeAction::Buy)));
        state.apply_event(TunnelEvent::TradeExecuted(trade("t2", TradeAction::Sell)));

        let (local, origin) = decision_tally(&state);
        assert_eq!(origin, "recent trades");
        assert_eq!((local.total_decisions, local.buys, local.sells, local.executed), (2, 1, 1, 2));

        let remote = DecisionStats {
            total_decisions: 10,
            buys: 4,
            sells: 2,
            holds: 4,
            executed: 6,
        };
        state.set_decision_stats(remote.clone());
        assert_eq!(decision_tally(&state), (remote, "backend"));
    }
}
