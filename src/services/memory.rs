use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use uuid::Uuid;
use crate::models::{Block, Conversation, Like, Match, Message, Profile, UserPair};
use crate::services::store::{CreateOutcome, MatchStore, StoreError};

struct ConversationLog {
    conversation: Conversation,
    messages: Vec<Message>,
}

/// In-process store backed by sharded concurrent maps.
///
/// Uniqueness is enforced through the map entry API: the shard lock held by
/// `entry()` makes each create-if-absent a single atomic step.
#[derive(Default)]
pub struct MemoryStore {
    profiles: DashMap<String, Profile>,
    likes: DashMap<(String, String), Like>,
    blocks: DashMap<(String, String), Block>,
    matches: DashMap<UserPair, Match>,
    match_ids: DashMap<Uuid, UserPair>,
    conversations: DashMap<Uuid, ConversationLog>,
    conversation_by_match: DashMap<Uuid, Uuid>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of like rows, for tests and diagnostics
    pub fn like_count(&self) -> usize {
        self.likes.len()
    }

    pub fn match_count(&self) -> usize {
        self.matches.len()
    }

    pub fn conversation_count(&self) -> usize {
        self.conversations.len()
    }
}

#[async_trait]
impl MatchStore for MemoryStore {
    async fn get_profile(&self, user_id: &str) -> Result<Option<Profile>, StoreError> {
        Ok(self.profiles.get(user_id).map(|p| p.clone()))
    }

    async fn get_profiles(&self, user_ids: &[String]) -> Result<Vec<Profile>, StoreError> {
        Ok(user_ids
            .iter()
            .filter_map(|id| self.profiles.get(id).map(|p| p.clone()))
            .collect())
    }

    async fn active_profiles(&self) -> Result<Vec<Profile>, StoreError> {
        Ok(self
            .profiles
            .iter()
            .filter(|p| p.is_active)
            .map(|p| p.clone())
            .collect())
    }

    async fn upsert_profile(&self, profile: &Profile) -> Result<(), StoreError> {
        profile.check_invariants().map_err(StoreError::InvalidProfile)?;
        self.profiles.insert(profile.id.clone(), profile.clone());
        Ok(())
    }

    async fn touch_last_active(&self, user_id: &str, at: DateTime<Utc>) -> Result<(), StoreError> {
        if let Some(mut profile) = self.profiles.get_mut(user_id) {
            if profile.last_active < at {
                profile.last_active = at;
            }
        }
        Ok(())
    }

    async fn insert_like(&self, liker_id: &str, likee_id: &str) -> Result<CreateOutcome<Like>, StoreError> {
        match self.likes.entry((liker_id.to_string(), likee_id.to_string())) {
            Entry::Occupied(existing) => Ok(CreateOutcome::Existing(existing.get().clone())),
            Entry::Vacant(slot) => {
                let like = Like {
                    id: Uuid::new_v4(),
                    liker_id: liker_id.to_string(),
                    likee_id: likee_id.to_string(),
                    created_at: Utc::now(),
                };
                slot.insert(like.clone());
                Ok(CreateOutcome::Created(like))
            }
        }
    }

    async fn like_exists(&self, liker_id: &str, likee_id: &str) -> Result<bool, StoreError> {
        Ok(self
            .likes
            .contains_key(&(liker_id.to_string(), likee_id.to_string())))
    }

    async fn liked_by(&self, liker_id: &str) -> Result<Vec<String>, StoreError> {
        Ok(self
            .likes
            .iter()
            .filter(|entry| entry.key().0 == liker_id)
            .map(|entry| entry.key().1.clone())
            .collect())
    }

    async fn insert_block(
        &self,
        blocker_id: &str,
        blocked_id: &str,
        reason: Option<&str>,
    ) -> Result<CreateOutcome<Block>, StoreError> {
        match self.blocks.entry((blocker_id.to_string(), blocked_id.to_string())) {
            Entry::Occupied(existing) => Ok(CreateOutcome::Existing(existing.get().clone())),
            Entry::Vacant(slot) => {
                let block = Block {
                    blocker_id: blocker_id.to_string(),
                    blocked_id: blocked_id.to_string(),
                    reason: reason.map(str::to_string),
                    created_at: Utc::now(),
                };
                slot.insert(block.clone());
                Ok(CreateOutcome::Created(block))
            }
        }
    }

    async fn blocked_between(&self, a: &str, b: &str) -> Result<bool, StoreError> {
        Ok(self.blocks.contains_key(&(a.to_string(), b.to_string()))
            || self.blocks.contains_key(&(b.to_string(), a.to_string())))
    }

    async fn blocks_involving(&self, user_id: &str) -> Result<Vec<String>, StoreError> {
        Ok(self
            .blocks
            .iter()
            .filter_map(|entry| {
                let (blocker, blocked) = entry.key();
                if blocker == user_id {
                    Some(blocked.clone())
                } else if blocked == user_id {
                    Some(blocker.clone())
                } else {
                    None
                }
            })
            .collect())
    }

    async fn create_match_if_absent(&self, pair: &UserPair) -> Result<CreateOutcome<Match>, StoreError> {
        match self.matches.entry(pair.clone()) {
            Entry::Occupied(existing) => Ok(CreateOutcome::Existing(existing.get().clone())),
            Entry::Vacant(slot) => {
                let record = Match {
                    id: Uuid::new_v4(),
                    user1_id: pair.low.clone(),
                    user2_id: pair.high.clone(),
                    created_at: Utc::now(),
                };
                self.match_ids.insert(record.id, pair.clone());
                slot.insert(record.clone());
                Ok(CreateOutcome::Created(record))
            }
        }
    }

    async fn find_match(&self, pair: &UserPair) -> Result<Option<Match>, StoreError> {
        Ok(self.matches.get(pair).map(|m| m.clone()))
    }

    async fn get_match(&self, match_id: Uuid) -> Result<Option<Match>, StoreError> {
        let pair = match self.match_ids.get(&match_id) {
            Some(pair) => pair.clone(),
            None => return Ok(None),
        };
        Ok(self.matches.get(&pair).map(|m| m.clone()))
    }

    async fn matches_for_user(&self, user_id: &str) -> Result<Vec<Match>, StoreError> {
        let mut found: Vec<Match> = self
            .matches
            .iter()
            .filter(|m| m.involves(user_id))
            .map(|m| m.clone())
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(found)
    }

    async fn create_conversation_if_absent(&self, m: &Match) -> Result<CreateOutcome<Conversation>, StoreError> {
        match self.conversation_by_match.entry(m.id) {
            Entry::Occupied(existing) => {
                let conversation_id = *existing.get();
                self.conversations
                    .get(&conversation_id)
                    .map(|log| CreateOutcome::Existing(log.conversation.clone()))
                    .ok_or_else(|| StoreError::Corrupt(format!("dangling conversation {}", conversation_id)))
            }
            Entry::Vacant(slot) => {
                let now = Utc::now();
                let conversation = Conversation {
                    id: Uuid::new_v4(),
                    match_id: m.id,
                    user1_id: m.user1_id.clone(),
                    user2_id: m.user2_id.clone(),
                    created_at: now,
                    updated_at: now,
                };
                self.conversations.insert(
                    conversation.id,
                    ConversationLog {
                        conversation: conversation.clone(),
                        messages: Vec::new(),
                    },
                );
                slot.insert(conversation.id);
                Ok(CreateOutcome::Created(conversation))
            }
        }
    }

    async fn get_conversation(&self, conversation_id: Uuid) -> Result<Option<Conversation>, StoreError> {
        Ok(self
            .conversations
            .get(&conversation_id)
            .map(|log| log.conversation.clone()))
    }

    async fn conversation_for_match(&self, match_id: Uuid) -> Result<Option<Conversation>, StoreError> {
        let conversation_id = match self.conversation_by_match.get(&match_id) {
            Some(id) => *id,
            None => return Ok(None),
        };
        self.get_conversation(conversation_id).await
    }

    async fn append_message(
        &self,
        conversation_id: Uuid,
        sender_id: &str,
        content: &str,
    ) -> Result<Message, StoreError> {
        let mut log = self
            .conversations
            .get_mut(&conversation_id)
            .ok_or_else(|| StoreError::NotFound(format!("conversation {}", conversation_id)))?;

        let now = Utc::now();
        let created_at = match log.messages.last() {
            Some(last) if last.created_at >= now => last.created_at + Duration::microseconds(1),
            _ => now,
        };

        let message = Message {
            id: Uuid::new_v4(),
            conversation_id,
            seq: log.messages.len() as i64 + 1,
            sender_id: sender_id.to_string(),
            content: content.to_string(),
            read: false,
            created_at,
        };

        log.messages.push(message.clone());
        log.conversation.updated_at = created_at;

        Ok(message)
    }

    async fn messages(&self, conversation_id: Uuid) -> Result<Vec<Message>, StoreError> {
        Ok(self
            .conversations
            .get(&conversation_id)
            .map(|log| log.messages.clone())
            .unwrap_or_default())
    }

    async fn messages_after(&self, conversation_id: Uuid, after_seq: i64) -> Result<Vec<Message>, StoreError> {
        Ok(self
            .conversations
            .get(&conversation_id)
            .map(|log| {
                log.messages
                    .iter()
                    .filter(|m| m.seq > after_seq)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn last_seq(&self, conversation_id: Uuid) -> Result<i64, StoreError> {
        Ok(self
            .conversations
            .get(&conversation_id)
            .map(|log| log.messages.len() as i64)
            .unwrap_or(0))
    }

    async fn mark_read(&self, conversation_id: Uuid, reader_id: &str) -> Result<u64, StoreError> {
        let mut log = match self.conversations.get_mut(&conversation_id) {
            Some(log) => log,
            None => return Ok(0),
        };

        let mut updated = 0;
        for message in log.messages.iter_mut() {
            if message.sender_id != reader_id && !message.read {
                message.read = true;
                updated += 1;
            }
        }
        Ok(updated)
    }

    async fn health_check(&self) -> Result<bool, StoreError> {
        Ok(true)
    }
}
