use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::models::domain::{Conversation, Match, MatchSummary};
use crate::services::CacheStats;

/// Response for the like endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LikeResponse {
    pub liked: bool,
    pub matched: bool,
    /// True only for the call that created the match
    #[serde(rename = "newMatch")]
    pub new_match: bool,
    #[serde(rename = "matchId")]
    pub match_id: Option<Uuid>,
    #[serde(rename = "conversationId")]
    pub conversation_id: Option<Uuid>,
}

/// Response for the mutual-match check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MutualMatchResponse {
    pub matched: bool,
    #[serde(rename = "match")]
    pub match_record: Option<Match>,
}

/// Response for opening a conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationResponse {
    pub conversation: Conversation,
}

/// Response listing the caller's matches
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchListResponse {
    pub matches: Vec<MatchSummary>,
    pub total: usize,
}

/// Response for marking a conversation read
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkReadResponse {
    pub updated: u64,
}

/// Response for a ranking refresh
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshRankingsResponse {
    #[serde(rename = "usersRefreshed")]
    pub users_refreshed: usize,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    #[serde(rename = "activeSubscriptions")]
    pub active_subscriptions: usize,
    pub cache: CacheStats,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}
