use std::sync::Arc;
use crate::core::conversations::ConversationRegistry;
use crate::core::error::{CoreError, CoreResult};
use crate::models::{Conversation, Match, MatchSummary, UserPair};
use crate::services::{CreateOutcome, MatchStore};

/// Result of a reciprocity check
#[derive(Debug, Clone)]
pub struct Reciprocity {
    /// A match exists for the pair, new or old
    pub matched: bool,
    /// This call inserted the match
    pub created: bool,
    pub match_record: Option<Match>,
    pub conversation: Option<Conversation>,
}

impl Reciprocity {
    fn none() -> Self {
        Self {
            matched: false,
            created: false,
            match_record: None,
            conversation: None,
        }
    }
}

/// Turns reciprocal likes into a match, exactly once per pair
#[derive(Clone)]
pub struct MatchDetector {
    store: Arc<dyn MatchStore>,
    conversations: ConversationRegistry,
}

impl MatchDetector {
    pub fn new(store: Arc<dyn MatchStore>, conversations: ConversationRegistry) -> Self {
        Self { store, conversations }
    }

    /// Check whether `a` and `b` like each other and create their match if so
    ///
    /// Creation goes through the store's create-if-absent primitive, so two
    /// racing checks for the same pair observe one `created == true` between
    /// them. A new match always gets its conversation before returning.
    pub async fn check_reciprocity(&self, a: &str, b: &str) -> CoreResult<Reciprocity> {
        let pair = UserPair::new(a, b)
            .ok_or_else(|| CoreError::InvalidArgument("a user cannot match with themself".to_string()))?;

        // Existing matches survive later deactivation or blocking
        if let Some(existing) = self.store.find_match(&pair).await? {
            let conversation = self.conversations.ensure_for_match(&existing).await?;
            return Ok(Reciprocity {
                matched: true,
                created: false,
                match_record: Some(existing),
                conversation: Some(conversation),
            });
        }

        let (forward, backward) = tokio::try_join!(
            self.store.like_exists(a, b),
            self.store.like_exists(b, a)
        )?;
        if !(forward && backward) {
            return Ok(Reciprocity::none());
        }

        if self.store.blocked_between(a, b).await? {
            tracing::debug!("Reciprocal likes between {} and {} ignored: blocked", a, b);
            return Ok(Reciprocity::none());
        }

        let profiles = self.store.get_profiles(&[pair.low.clone(), pair.high.clone()]).await?;
        if profiles.len() != 2 || profiles.iter().any(|p| !p.is_active) {
            tracing::debug!("Reciprocal likes between {} and {} ignored: inactive profile", a, b);
            return Ok(Reciprocity::none());
        }

        let (m, created) = match self.store.create_match_if_absent(&pair).await? {
            CreateOutcome::Created(m) => {
                tracing::info!("New match {} between {} and {}", m.id, m.user1_id, m.user2_id);
                (m, true)
            }
            CreateOutcome::Existing(m) => (m, false),
        };

        let conversation = self.conversations.ensure_for_match(&m).await?;

        Ok(Reciprocity {
            matched: true,
            created,
            match_record: Some(m),
            conversation: Some(conversation),
        })
    }

    /// Every match the viewer is in, newest first
    pub async fn list_matches(&self, viewer_id: &str) -> CoreResult<Vec<MatchSummary>> {
        let matches = self.store.matches_for_user(viewer_id).await?;
        let mut summaries = Vec::with_capacity(matches.len());

        for m in matches {
            let conversation = self.conversations.ensure_for_match(&m).await?;
            let other = if m.user1_id == viewer_id { &m.user2_id } else { &m.user1_id };
            summaries.push(MatchSummary {
                match_id: m.id,
                conversation_id: conversation.id,
                other_user_id: other.clone(),
                created_at: m.created_at,
            });
        }

        Ok(summaries)
    }
}
