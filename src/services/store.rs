use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;
use crate::models::{Block, Conversation, Like, Match, Message, Profile, UserPair};

/// Errors that can occur in a storage backend
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLx error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrateError(#[from] sqlx::migrate::MigrateError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Corrupt row: {0}")]
    Corrupt(String),

    #[error("Invalid profile: {0}")]
    InvalidProfile(String),
}

/// Result of a create-if-absent insert.
///
/// `Existing` is how a lost uniqueness race is reported: the row the winner
/// inserted is returned instead of an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateOutcome<T> {
    Created(T),
    Existing(T),
}

impl<T> CreateOutcome<T> {
    pub fn is_created(&self) -> bool {
        matches!(self, CreateOutcome::Created(_))
    }

    pub fn get(&self) -> &T {
        match self {
            CreateOutcome::Created(value) | CreateOutcome::Existing(value) => value,
        }
    }

    pub fn into_inner(self) -> T {
        match self {
            CreateOutcome::Created(value) | CreateOutcome::Existing(value) => value,
        }
    }
}

/// Durable state behind the match and conversation core.
///
/// Every `*_if_absent` / `insert_*` method must be atomic with respect to its
/// uniqueness key: concurrent callers with the same key observe exactly one
/// `Created` between them.
#[async_trait]
pub trait MatchStore: Send + Sync {
    // Profiles

    async fn get_profile(&self, user_id: &str) -> Result<Option<Profile>, StoreError>;

    async fn get_profiles(&self, user_ids: &[String]) -> Result<Vec<Profile>, StoreError>;

    async fn active_profiles(&self) -> Result<Vec<Profile>, StoreError>;

    async fn upsert_profile(&self, profile: &Profile) -> Result<(), StoreError>;

    async fn touch_last_active(&self, user_id: &str, at: DateTime<Utc>) -> Result<(), StoreError>;

    // Likes

    /// Insert the directed like, or return the existing one for the pair
    async fn insert_like(&self, liker_id: &str, likee_id: &str) -> Result<CreateOutcome<Like>, StoreError>;

    async fn like_exists(&self, liker_id: &str, likee_id: &str) -> Result<bool, StoreError>;

    /// Ids of every user `liker_id` has liked
    async fn liked_by(&self, liker_id: &str) -> Result<Vec<String>, StoreError>;

    // Blocks

    async fn insert_block(
        &self,
        blocker_id: &str,
        blocked_id: &str,
        reason: Option<&str>,
    ) -> Result<CreateOutcome<Block>, StoreError>;

    /// Whether a block exists in either direction between the two users
    async fn blocked_between(&self, a: &str, b: &str) -> Result<bool, StoreError>;

    /// Ids of every user that blocked, or was blocked by, `user_id`
    async fn blocks_involving(&self, user_id: &str) -> Result<Vec<String>, StoreError>;

    // Matches

    async fn create_match_if_absent(&self, pair: &UserPair) -> Result<CreateOutcome<Match>, StoreError>;

    async fn find_match(&self, pair: &UserPair) -> Result<Option<Match>, StoreError>;

    async fn get_match(&self, match_id: Uuid) -> Result<Option<Match>, StoreError>;

    /// Matches involving `user_id`, newest first
    async fn matches_for_user(&self, user_id: &str) -> Result<Vec<Match>, StoreError>;

    // Conversations

    async fn create_conversation_if_absent(&self, m: &Match) -> Result<CreateOutcome<Conversation>, StoreError>;

    async fn get_conversation(&self, conversation_id: Uuid) -> Result<Option<Conversation>, StoreError>;

    async fn conversation_for_match(&self, match_id: Uuid) -> Result<Option<Conversation>, StoreError>;

    // Messages

    /// Append a message, assigning the next sequence number and a creation
    /// time strictly after the previous message, and bump the conversation's
    /// `updated_at`
    async fn append_message(
        &self,
        conversation_id: Uuid,
        sender_id: &str,
        content: &str,
    ) -> Result<Message, StoreError>;

    /// All messages in sequence order
    async fn messages(&self, conversation_id: Uuid) -> Result<Vec<Message>, StoreError>;

    /// Messages with `seq > after_seq`, in sequence order
    async fn messages_after(&self, conversation_id: Uuid, after_seq: i64) -> Result<Vec<Message>, StoreError>;

    /// Highest assigned sequence number (0 for an empty conversation)
    async fn last_seq(&self, conversation_id: Uuid) -> Result<i64, StoreError>;

    /// Mark every unread message not sent by `reader_id` as read
    async fn mark_read(&self, conversation_id: Uuid, reader_id: &str) -> Result<u64, StoreError>;

    async fn health_check(&self) -> Result<bool, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_outcome_accessors() {
        let created = CreateOutcome::Created(5);
        let existing = CreateOutcome::Existing(5);

        assert!(created.is_created());
        assert!(!existing.is_created());
        assert_eq!(*existing.get(), 5);
        assert_eq!(created.into_inner(), 5);
    }
}
