// Match and conversation core exports
pub mod conversations;
pub mod dispatcher;
pub mod error;
pub mod feed;
pub mod filters;
pub mod likes;
pub mod matches;
pub mod messages;

pub use conversations::ConversationRegistry;
pub use dispatcher::{RealtimeDispatcher, Subscription};
pub use error::{CoreError, CoreResult};
pub use feed::{DiscoveryFeedBuilder, FeedSettings};
pub use filters::{is_eligible, is_mutually_compatible, Exclusions};
pub use likes::{LikeLedger, LikeOutcome};
pub use matches::{MatchDetector, Reciprocity};
pub use messages::MessageBus;
