use std::sync::Arc;
use uuid::Uuid;
use crate::core::error::{CoreError, CoreResult};
use crate::models::{Conversation, Match};
use crate::services::{CreateOutcome, MatchStore};

/// Maps each match to exactly one conversation
#[derive(Clone)]
pub struct ConversationRegistry {
    store: Arc<dyn MatchStore>,
}

impl ConversationRegistry {
    pub fn new(store: Arc<dyn MatchStore>) -> Self {
        Self { store }
    }

    /// Return the conversation for a match, creating it if absent
    ///
    /// Repeated and concurrent calls for the same match return the same
    /// conversation id.
    pub async fn ensure_conversation(&self, match_id: Uuid) -> CoreResult<Conversation> {
        let m = self
            .store
            .get_match(match_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("match {}", match_id)))?;

        self.ensure_for_match(&m).await
    }

    /// Same as [`ensure_conversation`](Self::ensure_conversation) when the
    /// match is already loaded
    pub async fn ensure_for_match(&self, m: &Match) -> CoreResult<Conversation> {
        match self.store.create_conversation_if_absent(m).await? {
            CreateOutcome::Created(conversation) => {
                tracing::info!(
                    "Created conversation {} for match {}",
                    conversation.id,
                    m.id
                );
                Ok(conversation)
            }
            CreateOutcome::Existing(conversation) => Ok(conversation),
        }
    }

    /// Open the conversation of a match on behalf of one of its members
    pub async fn open(&self, match_id: Uuid, requester: &str) -> CoreResult<Conversation> {
        let m = self
            .store
            .get_match(match_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("match {}", match_id)))?;

        if !m.involves(requester) {
            return Err(CoreError::Unauthorized(format!(
                "{} is not part of match {}",
                requester, match_id
            )));
        }

        self.ensure_for_match(&m).await
    }

    /// Load a conversation, checking that `requester` participates in it
    pub async fn participant_view(&self, conversation_id: Uuid, requester: &str) -> CoreResult<Conversation> {
        let conversation = self
            .store
            .get_conversation(conversation_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("conversation {}", conversation_id)))?;

        if !conversation.is_participant(requester) {
            return Err(CoreError::Unauthorized(format!(
                "{} is not a participant of conversation {}",
                requester, conversation_id
            )));
        }

        Ok(conversation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserPair;
    use crate::services::MemoryStore;

    async fn seeded_match(store: &MemoryStore) -> Match {
        let pair = UserPair::new("ana", "ben").unwrap();
        store.create_match_if_absent(&pair).await.unwrap().into_inner()
    }

    #[tokio::test]
    async fn test_ensure_is_idempotent() {
        let store = Arc::new(MemoryStore::default());
        let m = seeded_match(&store).await;
        let registry = ConversationRegistry::new(store.clone());

        let first = registry.ensure_conversation(m.id).await.unwrap();
        let second = registry.ensure_conversation(m.id).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(store.conversation_count(), 1);
    }

    #[tokio::test]
    async fn test_unknown_match() {
        let registry = ConversationRegistry::new(Arc::new(MemoryStore::default()));
        let result = registry.ensure_conversation(Uuid::new_v4()).await;

        assert!(matches!(result, Err(CoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_open_requires_membership() {
        let store = Arc::new(MemoryStore::default());
        let m = seeded_match(&store).await;
        let registry = ConversationRegistry::new(store);

        assert!(registry.open(m.id, "ana").await.is_ok());
        assert!(matches!(
            registry.open(m.id, "mallory").await,
            Err(CoreError::Unauthorized(_))
        ));
    }
}
