use actix_web::http::header;
use actix_web::{web, HttpResponse};
use futures::StreamExt;
use std::convert::Infallible;
use uuid::Uuid;
use crate::core::CoreError;
use crate::models::{MarkReadResponse, Message, SendMessageRequest};
use crate::routes::{AppState, AuthenticatedUser};

/// Configure message routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/conversations/{id}/messages", web::get().to(list_messages))
        .route("/conversations/{id}/messages", web::post().to(send_message))
        .route("/conversations/{id}/read", web::post().to(mark_read))
        .route("/conversations/{id}/stream", web::get().to(stream_messages));
}

/// GET /api/v1/conversations/{id}/messages
async fn list_messages(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, CoreError> {
    let messages = state.messages.list(path.into_inner(), &user.user_id).await?;
    Ok(HttpResponse::Ok().json(messages))
}

/// POST /api/v1/conversations/{id}/messages
async fn send_message(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
    req: web::Json<SendMessageRequest>,
) -> Result<HttpResponse, CoreError> {
    let message = state
        .messages
        .append(path.into_inner(), &user.user_id, &req.content)
        .await?;

    Ok(HttpResponse::Created().json(message))
}

/// POST /api/v1/conversations/{id}/read
async fn mark_read(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, CoreError> {
    let updated = state.messages.mark_read(path.into_inner(), &user.user_id).await?;
    Ok(HttpResponse::Ok().json(MarkReadResponse { updated }))
}

/// Server-sent events for messages appended after the connection opens
///
/// GET /api/v1/conversations/{id}/stream
///
/// Disconnecting drops the subscription.
async fn stream_messages(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, CoreError> {
    let subscription = state
        .dispatcher
        .subscribe(path.into_inner(), &user.user_id)
        .await?;

    let events = subscription
        .into_stream()
        .map(|item| Ok::<_, Infallible>(web::Bytes::from(sse_frame(item))));

    Ok(HttpResponse::Ok()
        .content_type("text/event-stream")
        .insert_header((header::CACHE_CONTROL, "no-cache"))
        .streaming(events))
}

fn sse_frame(item: Result<Message, CoreError>) -> String {
    match item {
        Ok(message) => match serde_json::to_string(&message) {
            Ok(json) => format!("id: {}\nevent: message\ndata: {}\n\n", message.seq, json),
            Err(e) => format!("event: error\ndata: {}\n\n", e),
        },
        Err(e) => {
            tracing::warn!("Realtime stream ended with error: {}", e);
            format!("event: error\ndata: {}\n\n", e)
        }
    }
}
