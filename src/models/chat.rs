use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Sender {
    User,
    Bot,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    pub sender: Sender,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_typing: Option<bool>,
}

impl ChatMessage {
    /// A locally authored message, id `user_<8 hex>` like the backend's.
    pub fn from_user(content: &str) -> Self {
        let id = uuid::Uuid::new_v4().simple().to_string();
        Self {
            id: format!("user_{}", &id[..8]),
            timestamp: Utc::now(),
            sender: Sender::User,
            content: content.to_string(),
            is_typing: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest<'a> {
    pub message: &'a str,
}
