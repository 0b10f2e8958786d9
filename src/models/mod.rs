// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    Block, CandidateProfile, Conversation, FeedEntry, FeedMode, FeedPage, Gender, Like, Match,
    MatchSummary, Message, Profile, RankedCandidate, UserPair, UserRankings,
};
pub use requests::{BlockRequest, FeedQuery, LikeRequest, RefreshRankingsRequest, SendMessageRequest};
pub use responses::{
    ConversationResponse, ErrorResponse, HealthResponse, LikeResponse, MarkReadResponse,
    MatchListResponse, MutualMatchResponse, RefreshRankingsResponse,
};
