use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use crate::core::error::{CoreError, CoreResult};
use crate::core::filters::{is_eligible, Exclusions};
use crate::models::{CandidateProfile, FeedEntry, FeedMode, FeedPage, Profile};
use crate::services::{CacheManager, MatchStore};

/// Per-request limits for feed building
#[derive(Debug, Clone)]
pub struct FeedSettings {
    pub default_limit: u32,
    pub max_limit: u32,
    pub deadline: Duration,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            default_limit: 20,
            max_limit: 100,
            deadline: Duration::from_millis(5000),
        }
    }
}

/// Builds the paginated discovery feed for a viewer
///
/// # Modes
/// - `Realtime`: every eligible active profile, most recently active first
/// - `Precomputed`: the scoring engine's cached ranking for the viewer,
///   re-validated against current likes, blocks, activity and preferences
#[derive(Clone)]
pub struct DiscoveryFeedBuilder {
    store: Arc<dyn MatchStore>,
    cache: Arc<CacheManager>,
    settings: FeedSettings,
}

impl DiscoveryFeedBuilder {
    pub fn new(store: Arc<dyn MatchStore>, cache: Arc<CacheManager>, settings: FeedSettings) -> Self {
        Self { store, cache, settings }
    }

    pub fn settings(&self) -> &FeedSettings {
        &self.settings
    }

    /// Build one page of the feed
    ///
    /// `limit` is capped at the configured maximum. The whole build is bounded
    /// by the configured deadline and fails with `Timeout` past it.
    pub async fn build_feed(
        &self,
        viewer_id: &str,
        page: u32,
        limit: u32,
        mode: FeedMode,
    ) -> CoreResult<FeedPage> {
        if page == 0 {
            return Err(CoreError::InvalidArgument("page must be at least 1".to_string()));
        }
        if limit == 0 {
            return Err(CoreError::InvalidArgument("limit must be at least 1".to_string()));
        }
        let limit = limit.min(self.settings.max_limit);

        let deadline = self.settings.deadline;
        let (entries, total) = tokio::time::timeout(deadline, self.eligible_entries(viewer_id, mode))
            .await
            .map_err(|_| {
                tracing::warn!("Feed build for {} exceeded {:?}", viewer_id, deadline);
                CoreError::Timeout(deadline)
            })??;

        let matches = paginate(entries, page, limit);

        tracing::debug!(
            "Feed for {} ({} mode): page {} has {} of {} candidates",
            viewer_id,
            mode,
            page,
            matches.len(),
            total
        );

        Ok(FeedPage {
            matches,
            page,
            limit,
            total,
            mode,
        })
    }

    /// Every eligible entry in feed order, plus the eligible count
    async fn eligible_entries(&self, viewer_id: &str, mode: FeedMode) -> CoreResult<(Vec<FeedEntry>, usize)> {
        let viewer = self
            .store
            .get_profile(viewer_id)
            .await?
            .ok_or_else(|| CoreError::PreconditionFailed("complete your profile first".to_string()))?;
        if !viewer.is_active {
            return Err(CoreError::PreconditionFailed("profile is not active".to_string()));
        }

        let (liked, blocked) = tokio::try_join!(
            self.store.liked_by(viewer_id),
            self.store.blocks_involving(viewer_id)
        )?;
        let exclusions = Exclusions::new(viewer_id, liked, blocked);

        let entries = match mode {
            FeedMode::Realtime => self.realtime(&viewer, &exclusions).await?,
            FeedMode::Precomputed => self.precomputed(&viewer, &exclusions).await?,
        };
        let total = entries.len();

        Ok((entries, total))
    }

    async fn realtime(&self, viewer: &Profile, exclusions: &Exclusions) -> CoreResult<Vec<FeedEntry>> {
        let mut candidates: Vec<Profile> = self
            .store
            .active_profiles()
            .await?
            .into_iter()
            .filter(|candidate| is_eligible(viewer, candidate, exclusions))
            .collect();

        // Most recently active first; id keeps pages stable on ties
        candidates.sort_by(|a, b| {
            b.last_active
                .cmp(&a.last_active)
                .then_with(|| a.id.cmp(&b.id))
        });

        Ok(candidates
            .iter()
            .map(|candidate| FeedEntry {
                id: candidate.id.clone(),
                score: None,
                reasons: Vec::new(),
                profile: CandidateProfile::from(candidate),
            })
            .collect())
    }

    async fn precomputed(&self, viewer: &Profile, exclusions: &Exclusions) -> CoreResult<Vec<FeedEntry>> {
        let Some(rankings) = self.cache.get_rankings(&viewer.id).await? else {
            tracing::debug!("No cached rankings for {}", viewer.id);
            return Ok(Vec::new());
        };

        let ids: Vec<String> = rankings
            .candidates
            .iter()
            .map(|c| c.candidate_id.clone())
            .collect();
        let profiles: HashMap<String, Profile> = self
            .store
            .get_profiles(&ids)
            .await?
            .into_iter()
            .map(|p| (p.id.clone(), p))
            .collect();

        let mut seen = HashSet::new();
        let mut entries: Vec<FeedEntry> = Vec::with_capacity(rankings.candidates.len());
        for ranked in rankings.candidates {
            if !ranked.score.is_finite() || !seen.insert(ranked.candidate_id.clone()) {
                continue;
            }
            // Stale cache rows are dropped against current state
            let Some(candidate) = profiles.get(&ranked.candidate_id) else {
                continue;
            };
            if !is_eligible(viewer, candidate, exclusions) {
                continue;
            }

            entries.push(FeedEntry {
                id: candidate.id.clone(),
                score: Some(clamp_score(ranked.score)),
                reasons: ranked.reasons,
                profile: CandidateProfile::from(candidate),
            });
        }

        // Stable: cache order breaks ties
        entries.sort_by(|a, b| b.score.cmp(&a.score));

        Ok(entries)
    }
}

/// Clamp a raw engine score into 0..=100
#[inline]
fn clamp_score(score: f64) -> u8 {
    score.clamp(0.0, 100.0).round() as u8
}

fn paginate<T>(items: Vec<T>, page: u32, limit: u32) -> Vec<T> {
    let start = (page as usize - 1).saturating_mul(limit as usize);
    items.into_iter().skip(start).take(limit as usize).collect()
}
