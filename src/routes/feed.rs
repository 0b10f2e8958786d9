use actix_web::{web, HttpResponse};
use validator::Validate;
use crate::core::CoreError;
use crate::models::{FeedQuery, RefreshRankingsRequest, RefreshRankingsResponse};
use crate::routes::{validation_error, AppState, AuthenticatedUser};

/// Configure discovery feed routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/feed", web::get().to(get_feed))
        .route("/rankings/refresh", web::post().to(refresh_rankings));
}

/// Discovery feed
///
/// GET /api/v1/feed?page=1&limit=20&mode=realtime|precomputed
async fn get_feed(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    query: web::Query<FeedQuery>,
) -> Result<HttpResponse, CoreError> {
    if let Err(errors) = query.validate() {
        return Ok(validation_error(errors));
    }

    let limit = query.limit.unwrap_or(state.feed.settings().default_limit);
    let mode = query.resolved_mode();

    tracing::debug!("Building {} feed for {}", mode, user.user_id);

    let page = state
        .feed
        .build_feed(&user.user_id, query.page, limit, mode)
        .await?;

    Ok(HttpResponse::Ok().json(page))
}

/// Run one scoring engine refresh now
///
/// POST /api/v1/rankings/refresh
///
/// Request body:
/// ```json
/// { "batchSize": 50, "topN": 100 }
/// ```
async fn refresh_rankings(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    req: web::Json<RefreshRankingsRequest>,
) -> Result<HttpResponse, CoreError> {
    if let Err(errors) = req.validate() {
        return Ok(validation_error(errors));
    }

    let refresher = state
        .refresher
        .as_ref()
        .ok_or_else(|| CoreError::Unavailable("scoring engine is not configured".to_string()))?;

    tracing::info!(
        "Ranking refresh requested by {} (batch {}, top {})",
        user.user_id,
        req.batch_size,
        req.top_n
    );

    let users_refreshed = refresher.refresh(req.batch_size, req.top_n).await?;

    Ok(HttpResponse::Ok().json(RefreshRankingsResponse { users_refreshed }))
}
