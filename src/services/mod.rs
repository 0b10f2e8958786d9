// Service exports
pub mod cache;
pub mod memory;
pub mod postgres;
pub mod scoring;
pub mod store;

pub use cache::{CacheError, CacheKey, CacheManager, CacheStats};
pub use memory::MemoryStore;
pub use postgres::PostgresStore;
pub use scoring::{HttpScoringEngine, RankingRefresher, ScoringEngine, ScoringError};
pub use store::{CreateOutcome, MatchStore, StoreError};
