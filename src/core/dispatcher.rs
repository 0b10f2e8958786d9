use dashmap::DashMap;
use futures::Stream;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use uuid::Uuid;
use crate::core::error::{CoreError, CoreResult};
use crate::models::Message;
use crate::services::MatchStore;

type Channels = DashMap<Uuid, broadcast::Sender<Message>>;

/// Per-conversation publish/subscribe fan-out of appended messages
///
/// One broadcast channel exists per conversation that has at least one live
/// subscription. Publishing to a conversation nobody watches is a no-op.
pub struct RealtimeDispatcher {
    store: Arc<dyn MatchStore>,
    channels: Arc<Channels>,
    capacity: usize,
    active: Arc<AtomicUsize>,
}

impl RealtimeDispatcher {
    pub fn new(store: Arc<dyn MatchStore>, capacity: usize) -> Self {
        Self {
            store,
            channels: Arc::new(DashMap::new()),
            capacity: capacity.max(1),
            active: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Fan a stored message out to the conversation's subscribers
    ///
    /// Returns the number of subscriptions it was handed to.
    pub fn publish(&self, message: &Message) -> usize {
        match self.channels.get(&message.conversation_id) {
            Some(tx) => tx.send(message.clone()).unwrap_or(0),
            None => 0,
        }
    }

    /// Start receiving messages appended to `conversation_id` from now on
    pub async fn subscribe(&self, conversation_id: Uuid, subscriber_id: &str) -> CoreResult<Subscription> {
        let conversation = self
            .store
            .get_conversation(conversation_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("conversation {}", conversation_id)))?;

        if !conversation.is_participant(subscriber_id) {
            return Err(CoreError::Unauthorized(format!(
                "{} is not a participant of conversation {}",
                subscriber_id, conversation_id
            )));
        }

        // Join the channel before reading the watermark: anything stored after
        // the watermark is then either received or back-filled.
        let receiver = self
            .channels
            .entry(conversation_id)
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe();
        self.active.fetch_add(1, Ordering::Relaxed);

        let mut subscription = Subscription {
            conversation_id,
            subscriber_id: subscriber_id.to_string(),
            receiver: Some(receiver),
            last_seq: 0,
            pending: VecDeque::new(),
            store: self.store.clone(),
            channels: self.channels.clone(),
            active: self.active.clone(),
        };
        subscription.last_seq = self.store.last_seq(conversation_id).await?;

        tracing::debug!(
            "{} subscribed to conversation {} at seq {}",
            subscriber_id,
            conversation_id,
            subscription.last_seq
        );
        Ok(subscription)
    }

    /// Number of live subscriptions across all conversations
    pub fn active_subscriptions(&self) -> usize {
        self.active.load(Ordering::Relaxed)
    }

    /// Number of conversations with an open channel
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Close every channel; live subscriptions end after draining
    pub fn shutdown(&self) {
        let closed = self.channels.len();
        self.channels.clear();
        tracing::info!("Realtime dispatcher closed {} channels", closed);
    }
}

/// A live subscription to one conversation
///
/// Messages are yielded in sequence order without gaps, starting after the
/// last message stored when the subscription was made. Dropping the
/// subscription releases it.
pub struct Subscription {
    conversation_id: Uuid,
    subscriber_id: String,
    receiver: Option<broadcast::Receiver<Message>>,
    last_seq: i64,
    pending: VecDeque<Message>,
    store: Arc<dyn MatchStore>,
    channels: Arc<Channels>,
    active: Arc<AtomicUsize>,
}

impl Subscription {
    pub fn conversation_id(&self) -> Uuid {
        self.conversation_id
    }

    pub fn subscriber_id(&self) -> &str {
        &self.subscriber_id
    }

    /// Sequence number of the last message handed out
    pub fn last_seq(&self) -> i64 {
        self.last_seq
    }

    /// Wait for the next message; `Ok(None)` once the subscription has ended
    pub async fn recv(&mut self) -> CoreResult<Option<Message>> {
        loop {
            if let Some(message) = self.pending.pop_front() {
                if message.seq <= self.last_seq {
                    continue;
                }
                self.last_seq = message.seq;
                return Ok(Some(message));
            }

            let Some(receiver) = self.receiver.as_mut() else {
                return Ok(None);
            };

            match receiver.recv().await {
                Ok(message) => {
                    if message.seq <= self.last_seq {
                        continue;
                    }
                    if message.seq == self.last_seq + 1 {
                        self.last_seq = message.seq;
                        return Ok(Some(message));
                    }

                    // A concurrent append was published out of order
                    self.backfill().await?;
                    if self.pending.back().map_or(true, |last| last.seq < message.seq) {
                        self.pending.push_back(message);
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(
                        "Subscriber {} lagged by {} messages on conversation {}",
                        self.subscriber_id,
                        skipped,
                        self.conversation_id
                    );
                    self.backfill().await?;
                }
                Err(RecvError::Closed) => {
                    self.release();
                    return Ok(None);
                }
            }
        }
    }

    /// Stop receiving and release the server-side channel if unused
    pub fn unsubscribe(mut self) {
        self.release();
    }

    /// Adapt the subscription into a stream that ends with the subscription
    pub fn into_stream(self) -> impl Stream<Item = CoreResult<Message>> {
        let mut subscription = self;
        async_stream::stream! {
            loop {
                match subscription.recv().await {
                    Ok(Some(message)) => yield Ok(message),
                    Ok(None) => break,
                    Err(e) => {
                        yield Err(e);
                        break;
                    }
                }
            }
        }
    }

    async fn backfill(&mut self) -> CoreResult<()> {
        let missed = self
            .store
            .messages_after(self.conversation_id, self.last_seq)
            .await?;
        tracing::debug!(
            "Back-filled {} messages for {} on conversation {}",
            missed.len(),
            self.subscriber_id,
            self.conversation_id
        );
        self.pending.clear();
        self.pending.extend(missed);
        Ok(())
    }

    fn release(&mut self) {
        if let Some(receiver) = self.receiver.take() {
            drop(receiver);
            self.channels
                .remove_if(&self.conversation_id, |_, tx| tx.receiver_count() == 0);
            self.active.fetch_sub(1, Ordering::Relaxed);
            tracing::debug!(
                "{} unsubscribed from conversation {}",
                self.subscriber_id,
                self.conversation_id
            );
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}
