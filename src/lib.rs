//! Crotchet Core - match and conversation core for the Crotchet dating app
//!
//! This library records likes, turns reciprocal likes into matches exactly
//! once, provisions one conversation per match, stores ordered messages and
//! fans them out to realtime subscribers. It also builds the discovery feed in
//! realtime and precomputed modes.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use self::core::{
    ConversationRegistry, CoreError, CoreResult, DiscoveryFeedBuilder, FeedSettings, LikeLedger,
    MatchDetector, MessageBus, RealtimeDispatcher, Subscription,
};
pub use models::{Conversation, FeedMode, FeedPage, Gender, Like, Match, Message, Profile, UserPair};
pub use services::{CacheManager, MatchStore, MemoryStore};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_exports() {
        // Verify that the library exports work correctly
        let pair = UserPair::new("b", "a").unwrap();
        assert_eq!(pair.low, "a");
        assert!(CoreError::Timeout(std::time::Duration::from_secs(1)).is_retryable());
    }
}
