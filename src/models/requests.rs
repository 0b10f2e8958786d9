use serde::{Deserialize, Serialize};
use validator::Validate;
use crate::models::domain::FeedMode;

/// Query string for the discovery feed
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct FeedQuery {
    #[serde(default = "default_page")]
    #[validate(range(min = 1))]
    pub page: u32,
    /// Falls back to the configured default page size
    #[serde(default)]
    #[validate(range(min = 1))]
    pub limit: Option<u32>,
    #[serde(default)]
    pub mode: Option<FeedMode>,
    /// Legacy flag from older clients; `true` selects precomputed mode
    #[serde(default)]
    pub precomputed: Option<bool>,
}

impl FeedQuery {
    pub fn resolved_mode(&self) -> FeedMode {
        match (self.mode, self.precomputed) {
            (Some(mode), _) => mode,
            (None, Some(true)) => FeedMode::Precomputed,
            _ => FeedMode::Realtime,
        }
    }
}

fn default_page() -> u32 {
    1
}

/// Request to like another user
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LikeRequest {
    #[validate(length(min = 1))]
    #[serde(alias = "target_id", rename = "targetId")]
    pub target_id: String,
}

/// Request to block another user
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct BlockRequest {
    #[validate(length(min = 1))]
    #[serde(alias = "user_id", rename = "userId")]
    pub user_id: String,
    #[validate(length(max = 500))]
    #[serde(default)]
    pub reason: Option<String>,
}

/// Request to send a message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendMessageRequest {
    pub content: String,
}

/// Request to run one scoring engine refresh
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RefreshRankingsRequest {
    #[serde(default = "default_batch_size", alias = "batch_size", rename = "batchSize")]
    #[validate(range(min = 1, max = 1000))]
    pub batch_size: u32,
    #[serde(default = "default_top_n", alias = "top_n", rename = "topN")]
    #[validate(range(min = 1, max = 1000))]
    pub top_n: u32,
}

fn default_batch_size() -> u32 {
    50
}

fn default_top_n() -> u32 {
    100
}
