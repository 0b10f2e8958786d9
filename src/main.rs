use actix_cors::Cors;
use actix_web::{error, http::StatusCode, middleware, web, App, HttpResponse, HttpServer};
use crotchet_core::config::{LoggingSettings, Settings};
use crotchet_core::routes::{self, AppState};
use crotchet_core::services::{
    CacheManager, HttpScoringEngine, MatchStore, MemoryStore, PostgresStore, RankingRefresher,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// JSON error response for JSON payload errors
#[derive(Debug, serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

impl std::fmt::Display for JsonError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

impl std::error::Error for JsonError {}

impl error::ResponseError for JsonError {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::BAD_REQUEST))
            .json(self)
    }
}

/// Handle JSON payload errors
pub fn handle_json_payload_error(err: error::JsonPayloadError, req: &actix_web::HttpRequest) -> actix_web::Error {
    tracing::info!("JSON payload error on {}: {}", req.path(), err);
    JsonError {
        error: "invalid_json".to_string(),
        message: format!("Invalid JSON: {}", err),
        status_code: 400,
    }
    .into()
}

/// Handle query payload errors
pub fn handle_query_payload_error(err: error::QueryPayloadError, _req: &actix_web::HttpRequest) -> actix_web::Error {
    JsonError {
        error: "invalid_query".to_string(),
        message: format!("Invalid query: {}", err),
        status_code: 400,
    }
    .into()
}

/// Handle path parameter errors (e.g. a malformed conversation id)
pub fn handle_path_error(err: error::PathError, _req: &actix_web::HttpRequest) -> actix_web::Error {
    JsonError {
        error: "invalid_path".to_string(),
        message: format!("Invalid path: {}", err),
        status_code: 400,
    }
    .into()
}

fn init_tracing(logging: &LoggingSettings) {
    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    if logging.format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.compact().init();
    }
}

fn io_error(context: &str, e: impl std::fmt::Display) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::Other, format!("{}: {}", context, e))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    let settings = Settings::load().map_err(|e| io_error("Configuration error", e))?;

    init_tracing(&settings.logging);

    info!("Starting Crotchet match and conversation core...");

    if settings.auth.uses_dev_secret() {
        warn!("auth.jwt_secret is the development default; tokens can be forged by anyone");
    }

    // Storage
    let store: Arc<dyn MatchStore> = match &settings.database.url {
        Some(url) => {
            let postgres = PostgresStore::from_settings(
                url,
                settings.database.max_connections,
                settings.database.min_connections,
                settings.database.acquire_timeout_secs,
            )
            .await
            .map_err(|e| {
                error!("Failed to connect to PostgreSQL: {}", e);
                io_error("PostgreSQL connection error", e)
            })?;
            info!("PostgreSQL store initialized");
            Arc::new(postgres)
        }
        None => {
            warn!("No database url configured, using the in-process store");
            Arc::new(MemoryStore::new())
        }
    };

    // Ranking cache (Redis is optional)
    let cache_ttl = settings.cache.ttl_secs;
    let l1_cache_size = settings.cache.l1_cache_size;

    let cache = match &settings.cache.redis_url {
        Some(redis_url) => match CacheManager::new(redis_url, l1_cache_size, cache_ttl).await {
            Ok(c) => {
                info!("Cache manager initialized (L1: {} entries, TTL: {}s)", l1_cache_size, cache_ttl);
                c
            }
            Err(e) => {
                warn!("Failed to connect to Redis ({}), running with the in-process cache only", e);
                CacheManager::local(l1_cache_size, cache_ttl)
            }
        },
        None => CacheManager::local(l1_cache_size, cache_ttl),
    };
    let cache = Arc::new(cache);

    // Scoring engine refresh
    let refresher = match &settings.scoring.endpoint {
        Some(endpoint) => {
            let timeout = Duration::from_secs(settings.scoring.timeout_secs);
            let engine = HttpScoringEngine::new(endpoint.clone(), settings.scoring.api_key.clone(), timeout)
                .map_err(|e| io_error("Scoring engine client error", e))?;
            let refresher = Arc::new(RankingRefresher::new(
                Arc::new(engine),
                cache.clone(),
                settings.scoring.batch_size,
                settings.scoring.top_n,
                timeout,
            ));

            let every = Duration::from_secs(settings.scoring.refresh_interval_secs.max(1));
            refresher.clone().spawn(every);
            info!("Ranking refresh scheduled every {:?} from {}", every, endpoint);
            Some(refresher)
        }
        None => {
            info!("No scoring engine configured, precomputed feeds serve cached rankings only");
            None
        }
    };

    let app_state = AppState::new(
        store,
        cache,
        settings.feed.to_settings(),
        settings.realtime.channel_capacity,
        refresher,
        &settings.auth.jwt_secret,
    );
    let dispatcher = app_state.dispatcher.clone();

    // Configure HTTP server
    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    let result = HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::JsonConfig::default().error_handler(handle_json_payload_error))
            .app_data(web::QueryConfig::default().error_handler(handle_query_payload_error))
            .app_data(web::PathConfig::default().error_handler(handle_path_error))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .configure(routes::configure_routes)
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await;

    dispatcher.shutdown();
    result
}
