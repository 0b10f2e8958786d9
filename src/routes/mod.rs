// Route exports
pub mod auth;
pub mod conversations;
pub mod feed;
pub mod likes;
pub mod messages;

use actix_web::{http::StatusCode, web, HttpResponse, Responder, ResponseError};
use std::sync::Arc;
use crate::core::{
    ConversationRegistry, CoreError, DiscoveryFeedBuilder, FeedSettings, LikeLedger, MatchDetector,
    MessageBus, RealtimeDispatcher,
};
use crate::models::{ErrorResponse, HealthResponse};
use crate::services::{CacheManager, MatchStore, RankingRefresher};

pub use auth::AuthenticatedUser;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn MatchStore>,
    pub cache: Arc<CacheManager>,
    pub feed: DiscoveryFeedBuilder,
    pub likes: LikeLedger,
    pub matches: MatchDetector,
    pub conversations: ConversationRegistry,
    pub messages: MessageBus,
    pub dispatcher: Arc<RealtimeDispatcher>,
    pub refresher: Option<Arc<RankingRefresher>>,
    pub jwt_secret: Arc<str>,
}

impl AppState {
    /// Wire the core components over one store and cache
    pub fn new(
        store: Arc<dyn MatchStore>,
        cache: Arc<CacheManager>,
        feed_settings: FeedSettings,
        channel_capacity: usize,
        refresher: Option<Arc<RankingRefresher>>,
        jwt_secret: &str,
    ) -> Self {
        let conversations = ConversationRegistry::new(store.clone());
        let matches = MatchDetector::new(store.clone(), conversations.clone());
        let likes = LikeLedger::new(store.clone(), matches.clone());
        let dispatcher = Arc::new(RealtimeDispatcher::new(store.clone(), channel_capacity));
        let messages = MessageBus::new(store.clone(), conversations.clone(), dispatcher.clone());
        let feed = DiscoveryFeedBuilder::new(store.clone(), cache.clone(), feed_settings);

        Self {
            store,
            cache,
            feed,
            likes,
            matches,
            conversations,
            messages,
            dispatcher,
            refresher,
            jwt_secret: Arc::from(jwt_secret),
        }
    }
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .route("/health", web::get().to(health_check))
            .configure(feed::configure)
            .configure(likes::configure)
            .configure(conversations::configure)
            .configure(messages::configure),
    );
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let store_healthy = match state.store.health_check().await {
        Ok(healthy) => healthy,
        Err(e) => {
            tracing::warn!("Store health check failed: {}", e);
            false
        }
    };

    let status = if store_healthy { "healthy" } else { "degraded" };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
        active_subscriptions: state.dispatcher.active_subscriptions(),
        cache: state.cache.stats(),
    })
}

impl ResponseError for CoreError {
    fn status_code(&self) -> StatusCode {
        match self {
            CoreError::Unauthorized(_) => StatusCode::FORBIDDEN,
            CoreError::PreconditionFailed(_) => StatusCode::PRECONDITION_FAILED,
            CoreError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            CoreError::NotFound(_) => StatusCode::NOT_FOUND,
            CoreError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            CoreError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let mut builder = HttpResponse::build(status);
        if self.is_retryable() {
            builder.insert_header(("Retry-After", "1"));
        }

        builder.json(ErrorResponse {
            error: self.kind().to_string(),
            message: self.to_string(),
            status_code: status.as_u16(),
        })
    }
}

/// 400 response for a request that failed field validation
pub(crate) fn validation_error(errors: validator::ValidationErrors) -> HttpResponse {
    tracing::info!("Validation failed: field_errors={:?}", errors);
    HttpResponse::BadRequest().json(ErrorResponse {
        error: "Validation failed".to_string(),
        message: errors.to_string(),
        status_code: 400,
    })
}
