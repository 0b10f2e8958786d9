use chrono::Utc;
use std::sync::Arc;
use crate::core::error::{CoreError, CoreResult};
use crate::core::matches::{MatchDetector, Reciprocity};
use crate::models::{Block, Like};
use crate::services::MatchStore;

/// Outcome of a like action
#[derive(Debug, Clone)]
pub struct LikeOutcome {
    pub like: Like,
    /// False when the like already existed
    pub created: bool,
    pub reciprocity: Reciprocity,
}

/// Append-only record of likes and blocks
#[derive(Clone)]
pub struct LikeLedger {
    store: Arc<dyn MatchStore>,
    detector: MatchDetector,
}

impl LikeLedger {
    pub fn new(store: Arc<dyn MatchStore>, detector: MatchDetector) -> Self {
        Self { store, detector }
    }

    /// Record `liker -> likee` and run the mutual-match check for the pair
    ///
    /// Liking twice is a no-op success. The reciprocity check runs on every
    /// successful call, so a retry after a failed check still creates the
    /// match.
    pub async fn record_like(&self, liker_id: &str, likee_id: &str) -> CoreResult<LikeOutcome> {
        if liker_id == likee_id {
            return Err(CoreError::InvalidArgument("cannot like yourself".to_string()));
        }

        let profiles = self
            .store
            .get_profiles(&[liker_id.to_string(), likee_id.to_string()])
            .await?;
        for id in [liker_id, likee_id] {
            let active = profiles.iter().any(|p| p.id == id && p.is_active);
            if !active {
                return Err(CoreError::NotFound(format!("profile {}", id)));
            }
        }

        // A block looks the same as a missing profile to the liker
        if self.store.blocked_between(liker_id, likee_id).await? {
            return Err(CoreError::NotFound(format!("profile {}", likee_id)));
        }

        let outcome = self.store.insert_like(liker_id, likee_id).await?;
        let created = outcome.is_created();
        let like = outcome.into_inner();
        if created {
            tracing::debug!("Recorded like {} -> {}", liker_id, likee_id);
        }

        touch(self.store.as_ref(), liker_id).await;

        let reciprocity = self.detector.check_reciprocity(liker_id, likee_id).await?;

        Ok(LikeOutcome {
            like,
            created,
            reciprocity,
        })
    }

    /// Block `blocked_id` on behalf of `blocker_id`; idempotent
    pub async fn block_user(
        &self,
        blocker_id: &str,
        blocked_id: &str,
        reason: Option<&str>,
    ) -> CoreResult<Block> {
        if blocker_id == blocked_id {
            return Err(CoreError::InvalidArgument("cannot block yourself".to_string()));
        }

        if self.store.get_profile(blocker_id).await?.is_none() {
            return Err(CoreError::PreconditionFailed(format!(
                "no profile for {}",
                blocker_id
            )));
        }

        if self.store.get_profile(blocked_id).await?.is_none() {
            return Err(CoreError::NotFound(format!("profile {}", blocked_id)));
        }

        let outcome = self.store.insert_block(blocker_id, blocked_id, reason).await?;
        if outcome.is_created() {
            tracing::info!("{} blocked {}", blocker_id, blocked_id);
        }

        Ok(outcome.into_inner())
    }
}

/// Bump an actor's last-active time; failures only cost feed freshness
pub(crate) async fn touch(store: &dyn MatchStore, user_id: &str) {
    if let Err(e) = store.touch_last_active(user_id, Utc::now()).await {
        tracing::warn!("Failed to update last_active for {}: {}", user_id, e);
    }
}
