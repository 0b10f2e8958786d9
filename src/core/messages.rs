use std::sync::Arc;
use uuid::Uuid;
use crate::core::conversations::ConversationRegistry;
use crate::core::dispatcher::RealtimeDispatcher;
use crate::core::error::{CoreError, CoreResult};
use crate::core::likes::touch;
use crate::models::Message;
use crate::services::MatchStore;

/// Ordered, durable per-conversation message log
#[derive(Clone)]
pub struct MessageBus {
    store: Arc<dyn MatchStore>,
    conversations: ConversationRegistry,
    dispatcher: Arc<RealtimeDispatcher>,
}

impl MessageBus {
    pub fn new(
        store: Arc<dyn MatchStore>,
        conversations: ConversationRegistry,
        dispatcher: Arc<RealtimeDispatcher>,
    ) -> Self {
        Self {
            store,
            conversations,
            dispatcher,
        }
    }

    /// Append a message as `sender_id` and fan it out to live subscribers
    pub async fn append(&self, conversation_id: Uuid, sender_id: &str, content: &str) -> CoreResult<Message> {
        let conversation = self
            .conversations
            .participant_view(conversation_id, sender_id)
            .await?;

        let content = content.trim();
        if content.is_empty() {
            return Err(CoreError::InvalidArgument("message content is empty".to_string()));
        }

        if let Some(other) = conversation.other_participant(sender_id) {
            if self.store.blocked_between(sender_id, other).await? {
                return Err(CoreError::Unauthorized(format!(
                    "conversation {} is blocked",
                    conversation_id
                )));
            }
        }

        let message = self
            .store
            .append_message(conversation_id, sender_id, content)
            .await?;

        let delivered = self.dispatcher.publish(&message);
        tracing::debug!(
            "Message {} (seq {}) in {} handed to {} subscribers",
            message.id,
            message.seq,
            conversation_id,
            delivered
        );

        touch(self.store.as_ref(), sender_id).await;

        Ok(message)
    }

    /// Full history in creation order
    pub async fn list(&self, conversation_id: Uuid, requester: &str) -> CoreResult<Vec<Message>> {
        self.conversations
            .participant_view(conversation_id, requester)
            .await?;

        Ok(self.store.messages(conversation_id).await?)
    }

    /// Mark the other participant's messages as read
    pub async fn mark_read(&self, conversation_id: Uuid, reader: &str) -> CoreResult<u64> {
        self.conversations
            .participant_view(conversation_id, reader)
            .await?;

        Ok(self.store.mark_read(conversation_id, reader).await?)
    }
}
