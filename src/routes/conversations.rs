use actix_web::{web, HttpResponse};
use uuid::Uuid;
use crate::core::CoreError;
use crate::models::{ConversationResponse, MatchListResponse};
use crate::routes::{AppState, AuthenticatedUser};

/// Configure match and conversation routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/matches", web::get().to(list_matches))
        .route("/matches/{match_id}/conversation", web::post().to(open_conversation));
}

/// GET /api/v1/matches
async fn list_matches(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, CoreError> {
    let matches = state.matches.list_matches(&user.user_id).await?;
    let total = matches.len();

    Ok(HttpResponse::Ok().json(MatchListResponse { matches, total }))
}

/// Return the conversation for a match, creating it on first use
///
/// POST /api/v1/matches/{match_id}/conversation
async fn open_conversation(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, CoreError> {
    let conversation = state
        .conversations
        .open(path.into_inner(), &user.user_id)
        .await?;

    Ok(HttpResponse::Ok().json(ConversationResponse { conversation }))
}
