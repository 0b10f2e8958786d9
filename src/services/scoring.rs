use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use crate::models::{RankedCandidate, UserRankings};
use crate::services::cache::{CacheError, CacheManager};

/// Errors that can occur when talking to the scoring engine
#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned error: {0}")]
    ApiError(String),

    #[error("Unauthorized: invalid API key")]
    Unauthorized,

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),

    #[error("Scoring engine did not answer within {0:?}")]
    Timeout(Duration),

    #[error("Failed to store rankings: {0}")]
    CacheError(#[from] CacheError),
}

/// External collaborator that ranks candidates for precomputed mode.
///
/// Given a batch size and a top-N, it returns the rankings for every viewer it
/// processed. How scores are computed is the engine's business.
#[async_trait]
pub trait ScoringEngine: Send + Sync {
    async fn compute(&self, batch_size: u32, top_n: u32) -> Result<Vec<UserRankings>, ScoringError>;
}

#[derive(Debug, Serialize)]
struct ComputeRequest {
    #[serde(rename = "batchSize")]
    batch_size: u32,
    #[serde(rename = "topN")]
    top_n: u32,
}

#[derive(Debug, Deserialize)]
struct ComputeResponse {
    #[serde(default)]
    rankings: Vec<WireRanking>,
}

#[derive(Debug, Deserialize)]
struct WireRanking {
    #[serde(rename = "userId")]
    user_id: String,
    #[serde(default)]
    candidates: Vec<RankedCandidate>,
    #[serde(rename = "computedAt", default)]
    computed_at: Option<DateTime<Utc>>,
}

/// HTTP client for a scoring engine exposing `POST /compute-matches`
pub struct HttpScoringEngine {
    endpoint: String,
    api_key: Option<String>,
    client: Client,
}

impl HttpScoringEngine {
    pub fn new(endpoint: String, api_key: Option<String>, timeout: Duration) -> Result<Self, ScoringError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            endpoint,
            api_key,
            client,
        })
    }
}

#[async_trait]
impl ScoringEngine for HttpScoringEngine {
    async fn compute(&self, batch_size: u32, top_n: u32) -> Result<Vec<UserRankings>, ScoringError> {
        let url = format!("{}/compute-matches", self.endpoint.trim_end_matches('/'));

        tracing::debug!("Requesting rankings from {} (batch {}, top {})", url, batch_size, top_n);

        let mut request = self
            .client
            .post(&url)
            .json(&ComputeRequest { batch_size, top_n });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => return Err(ScoringError::Unauthorized),
            status if !status.is_success() => {
                return Err(ScoringError::ApiError(format!("Failed to compute matches: {}", status)));
            }
            _ => {}
        }

        let body: ComputeResponse = response
            .json()
            .await
            .map_err(|e| ScoringError::InvalidResponse(e.to_string()))?;

        let now = Utc::now();
        Ok(body
            .rankings
            .into_iter()
            .map(|r| UserRankings {
                user_id: r.user_id,
                candidates: r.candidates,
                computed_at: r.computed_at.unwrap_or(now),
            })
            .collect())
    }
}

/// Pulls rankings from the scoring engine into the ranking cache
pub struct RankingRefresher {
    engine: Arc<dyn ScoringEngine>,
    cache: Arc<CacheManager>,
    batch_size: u32,
    top_n: u32,
    timeout: Duration,
}

impl RankingRefresher {
    pub fn new(
        engine: Arc<dyn ScoringEngine>,
        cache: Arc<CacheManager>,
        batch_size: u32,
        top_n: u32,
        timeout: Duration,
    ) -> Self {
        Self {
            engine,
            cache,
            batch_size,
            top_n,
            timeout,
        }
    }

    /// Run one refresh; returns the number of viewers whose rankings were stored
    pub async fn refresh(&self, batch_size: u32, top_n: u32) -> Result<usize, ScoringError> {
        let rankings = tokio::time::timeout(self.timeout, self.engine.compute(batch_size, top_n))
            .await
            .map_err(|_| ScoringError::Timeout(self.timeout))?
            .map_err(|e| match e {
                ScoringError::RequestError(err) if err.is_timeout() => ScoringError::Timeout(self.timeout),
                other => other,
            })?;

        for user_rankings in &rankings {
            self.cache.put_rankings(user_rankings).await?;
        }

        tracing::info!("Refreshed rankings for {} users", rankings.len());
        Ok(rankings.len())
    }

    /// Refresh with the configured batch size and top-N
    pub async fn refresh_default(&self) -> Result<usize, ScoringError> {
        self.refresh(self.batch_size, self.top_n).await
    }

    /// Refresh on a fixed cadence until the task is aborted
    pub fn spawn(self: Arc<Self>, every: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(e) = self.refresh_default().await {
                    tracing::warn!("Ranking refresh failed: {}", e);
                }
            }
        })
    }
}
