use async_trait::async_trait;

use crate::error::Result;
use crate::models::activity::ActivityLog;
use crate::models::chat::ChatMessage;
use crate::models::envelope::TickResponse;
use crate::models::portfolio::PortfolioSnapshot;
use crate::models::position::Position;
use crate::models::stats::DecisionStats;
use crate::models::trade::Trade;

/// Where the bot's state comes from: the HTTP backend or the in-process
/// simulation. Calls are independent and may run concurrently.
#[async_trait]
pub trait DataSource: Send + Sync + 'static {
    /// `GET /api/tick`
    async fn tick(&self) -> Result<TickResponse>;

    /// `GET /api/positions`
    async fn positions(&self) -> Result<Vec<Position>>;

    /// `GET /api/portfolio/history`
    async fn portfolio_history(&self) -> Result<Vec<PortfolioSnapshot>>;

    /// `GET /api/trades`
    async fn trades(&self) -> Result<Vec<Trade>>;

    /// `GET /api/activity`
    async fn activity(&self) -> Result<Vec<ActivityLog>>;

    /// `GET /api/chat/history`
    async fn chat_history(&self) -> Result<Vec<ChatMessage>>;

    /// `GET /api/decisions/stats`
    async fn decision_stats(&self) -> Result<DecisionStats>;

    /// `POST /api/chat`, returns the bot's reply.
    async fn send_chat(&self, message: &str) -> Result<ChatMessage>;
}
