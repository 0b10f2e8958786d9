use actix_web::{web, HttpResponse};
use validator::Validate;
use crate::core::CoreError;
use crate::models::{BlockRequest, LikeRequest, LikeResponse, MutualMatchResponse};
use crate::routes::{validation_error, AppState, AuthenticatedUser};

/// Configure like and block routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/likes", web::post().to(record_like))
        .route("/likes/{target_id}/mutual", web::get().to(check_mutual))
        .route("/blocks", web::post().to(block_user));
}

/// Like another user
///
/// POST /api/v1/likes
///
/// Request body:
/// ```json
/// { "targetId": "string" }
/// ```
async fn record_like(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    req: web::Json<LikeRequest>,
) -> Result<HttpResponse, CoreError> {
    if let Err(errors) = req.validate() {
        return Ok(validation_error(errors));
    }

    let outcome = state.likes.record_like(&user.user_id, &req.target_id).await?;
    let reciprocity = outcome.reciprocity;

    if reciprocity.created {
        tracing::info!("It's a match: {} and {}", user.user_id, req.target_id);
    }

    Ok(HttpResponse::Ok().json(LikeResponse {
        liked: true,
        matched: reciprocity.matched,
        new_match: reciprocity.created,
        match_id: reciprocity.match_record.map(|m| m.id),
        conversation_id: reciprocity.conversation.map(|c| c.id),
    }))
}

/// Whether the caller and `target_id` like each other
///
/// GET /api/v1/likes/{target_id}/mutual
async fn check_mutual(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<String>,
) -> Result<HttpResponse, CoreError> {
    let target_id = path.into_inner();
    let reciprocity = state
        .matches
        .check_reciprocity(&user.user_id, &target_id)
        .await?;

    Ok(HttpResponse::Ok().json(MutualMatchResponse {
        matched: reciprocity.matched,
        match_record: reciprocity.match_record,
    }))
}

/// Block another user
///
/// POST /api/v1/blocks
async fn block_user(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    req: web::Json<BlockRequest>,
) -> Result<HttpResponse, CoreError> {
    if let Err(errors) = req.validate() {
        return Ok(validation_error(errors));
    }

    let block = state
        .likes
        .block_user(&user.user_id, &req.user_id, req.reason.as_deref())
        .await?;

    Ok(HttpResponse::Ok().json(block))
}
