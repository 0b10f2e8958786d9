// Integration tests for the match and conversation core

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, Utc};
use crotchet_core::core::{
    ConversationRegistry, CoreError, DiscoveryFeedBuilder, FeedSettings, LikeLedger, MatchDetector,
    MessageBus, RealtimeDispatcher,
};
use crotchet_core::models::{
    Block, Conversation, FeedMode, Gender, Like, Match, Message, Profile, RankedCandidate, UserPair,
    UserRankings,
};
use crotchet_core::services::{CacheManager, CreateOutcome, MatchStore, MemoryStore, StoreError};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Barrier;
use tokio_test::{assert_err, assert_ok};
use uuid::Uuid;

fn create_test_profile(id: &str, gender: Gender, looking_for: Vec<Gender>) -> Profile {
    Profile {
        id: id.to_string(),
        display_name: format!("User {}", id),
        date_of_birth: NaiveDate::from_ymd_opt(1995, 5, 20).unwrap(),
        gender,
        looking_for,
        bio: "Coffee and climbing".to_string(),
        location: "Lisbon".to_string(),
        interests: vec!["Climbing".to_string()],
        photos: vec![],
        is_active: true,
        last_active: Utc::now() - ChronoDuration::hours(1),
    }
}

/// All core components over one in-process store
struct Harness {
    store: Arc<MemoryStore>,
    cache: Arc<CacheManager>,
    likes: LikeLedger,
    matches: MatchDetector,
    conversations: ConversationRegistry,
    messages: MessageBus,
    dispatcher: Arc<RealtimeDispatcher>,
    feed: DiscoveryFeedBuilder,
}

impl Harness {
    fn new() -> Self {
        Self::with_store(Arc::new(MemoryStore::new()))
    }

    fn with_store(store: Arc<MemoryStore>) -> Self {
        let cache = Arc::new(CacheManager::local(1000, 300));
        let conversations = ConversationRegistry::new(store.clone());
        let matches = MatchDetector::new(store.clone(), conversations.clone());
        let likes = LikeLedger::new(store.clone(), matches.clone());
        let dispatcher = Arc::new(RealtimeDispatcher::new(store.clone(), 64));
        let messages = MessageBus::new(store.clone(), conversations.clone(), dispatcher.clone());
        let feed = DiscoveryFeedBuilder::new(store.clone(), cache.clone(), FeedSettings::default());

        Self {
            store,
            cache,
            likes,
            matches,
            conversations,
            messages,
            dispatcher,
            feed,
        }
    }

    async fn add(&self, profile: Profile) {
        self.store.upsert_profile(&profile).await.unwrap();
    }

    /// Two users who like each other, with their conversation
    async fn matched_pair(&self, a: &str, b: &str) -> Conversation {
        self.add(create_test_profile(a, Gender::Male, vec![Gender::Female])).await;
        self.add(create_test_profile(b, Gender::Female, vec![Gender::Male])).await;
        self.likes.record_like(a, b).await.unwrap();
        let outcome = self.likes.record_like(b, a).await.unwrap();
        outcome.reciprocity.conversation.unwrap()
    }
}

#[tokio::test]
async fn test_integration_duplicate_like_single_row() {
    let h = Harness::new();
    h.add(create_test_profile("a", Gender::Male, vec![Gender::Female])).await;
    h.add(create_test_profile("b", Gender::Female, vec![Gender::Male])).await;

    assert_ok!(h.likes.record_like("a", "b").await);
    assert_ok!(h.likes.record_like("a", "b").await);

    assert_eq!(h.store.like_count(), 1);
    assert_eq!(h.store.match_count(), 0);
}

#[tokio::test]
async fn test_integration_match_iff_reciprocal() {
    for (first, second) in [("a", "b"), ("b", "a")] {
        let h = Harness::new();
        h.add(create_test_profile("a", Gender::Male, vec![Gender::Female])).await;
        h.add(create_test_profile("b", Gender::Female, vec![Gender::Male])).await;
        let pair = UserPair::new("a", "b").unwrap();

        h.likes.record_like(first, second).await.unwrap();
        assert!(h.store.find_match(&pair).await.unwrap().is_none());

        h.likes.record_like(second, first).await.unwrap();
        assert!(h.store.find_match(&pair).await.unwrap().is_some());
        assert_eq!(h.store.match_count(), 1);
    }
}

#[tokio::test]
async fn test_integration_reciprocity_reports_creation_once() {
    let h = Harness::new();
    h.add(create_test_profile("a", Gender::Male, vec![Gender::Female])).await;
    h.add(create_test_profile("b", Gender::Female, vec![Gender::Male])).await;

    let first = h.likes.record_like("a", "b").await.unwrap();
    assert!(!first.reciprocity.matched);
    assert_eq!(h.store.match_count(), 0);

    let second = h.likes.record_like("b", "a").await.unwrap();
    assert!(second.reciprocity.matched);
    assert!(second.reciprocity.created);
    assert_eq!(h.store.conversation_count(), 1);

    for _ in 0..3 {
        let again = h.matches.check_reciprocity("a", "b").await.unwrap();
        assert!(again.matched);
        assert!(!again.created);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_integration_concurrent_reciprocal_likes() {
    for round in 0..50 {
        let h = Arc::new(Harness::new());
        let a = format!("a{}", round);
        let b = format!("b{}", round);
        h.add(create_test_profile(&a, Gender::Male, vec![Gender::Female])).await;
        h.add(create_test_profile(&b, Gender::Female, vec![Gender::Male])).await;

        let barrier = Arc::new(Barrier::new(2));
        let spawn_like = |liker: String, likee: String| {
            let h = h.clone();
            let barrier = barrier.clone();
            tokio::spawn(async move {
                barrier.wait().await;
                h.likes.record_like(&liker, &likee).await
            })
        };

        let left = spawn_like(a.clone(), b.clone());
        let right = spawn_like(b.clone(), a.clone());
        let left = left.await.unwrap().unwrap();
        let right = right.await.unwrap().unwrap();

        // The like inserted second is checked after both rows exist
        let created = [&left, &right]
            .iter()
            .filter(|o| o.reciprocity.created)
            .count();
        assert_eq!(created, 1);

        let check = h.matches.check_reciprocity(&a, &b).await.unwrap();
        assert!(check.matched);
        assert_eq!(h.store.match_count(), 1);
        assert_eq!(h.store.conversation_count(), 1);

        let conversation_ids: Vec<Uuid> = [left, right]
            .into_iter()
            .filter_map(|o| o.reciprocity.conversation.map(|c| c.id))
            .collect();
        assert!(conversation_ids.iter().all(|id| Some(*id) == check.conversation.as_ref().map(|c| c.id)));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_integration_concurrent_ensure_conversation() {
    let h = Arc::new(Harness::new());
    let pair = UserPair::new("x", "y").unwrap();
    let match_id = h.store.create_match_if_absent(&pair).await.unwrap().into_inner().id;

    let mut handles = Vec::new();
    for _ in 0..16 {
        let h = h.clone();
        handles.push(tokio::spawn(async move { h.conversations.ensure_conversation(match_id).await }));
    }

    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap().unwrap().id);
    }
    ids.dedup();
    assert_eq!(ids.len(), 1);
    assert_eq!(h.store.conversation_count(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_integration_message_order() {
    let h = Arc::new(Harness::new());
    let conversation = h.matched_pair("ana", "ben").await;

    let mut handles = Vec::new();
    for i in 0..40 {
        let h = h.clone();
        let sender = if i % 2 == 0 { "ana" } else { "ben" };
        handles.push(tokio::spawn(async move {
            h.messages
                .append(conversation.id, sender, &format!("message {}", i))
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let last = h.messages.append(conversation.id, "ana", "last word").await.unwrap();
    let history = h.messages.list(conversation.id, "ben").await.unwrap();

    assert_eq!(history.len(), 41);
    for window in history.windows(2) {
        assert!(window[0].created_at < window[1].created_at);
        assert_eq!(window[0].seq + 1, window[1].seq);
    }
    assert_eq!(history.last().unwrap().id, last.id);
}

#[tokio::test]
async fn test_integration_gender_preference_scenario() {
    let h = Harness::new();
    h.add(create_test_profile("A", Gender::Male, vec![Gender::Female])).await;
    h.add(create_test_profile("B", Gender::Female, vec![Gender::Male])).await;

    let a_feed = h.feed.build_feed("A", 1, 20, FeedMode::Realtime).await.unwrap();
    let b_feed = h.feed.build_feed("B", 1, 20, FeedMode::Realtime).await.unwrap();
    assert!(a_feed.matches.iter().any(|e| e.id == "B"));
    assert!(b_feed.matches.iter().any(|e| e.id == "A"));

    // B stops seeking men
    h.add(create_test_profile("B", Gender::Female, vec![Gender::Female])).await;
    let b_feed = h.feed.build_feed("B", 1, 20, FeedMode::Realtime).await.unwrap();
    assert!(b_feed.matches.iter().all(|e| e.id != "A"));
    assert_eq!(b_feed.total, 0);
}

#[tokio::test]
async fn test_integration_gender_scenario_one_sided() {
    let h = Harness::new();
    h.add(create_test_profile("A", Gender::Male, vec![Gender::Female])).await;
    h.add(create_test_profile("B", Gender::Female, vec![Gender::Male])).await;

    // B's looking_for stays [Male] but A stops seeking women
    h.add(create_test_profile("A", Gender::Male, vec![Gender::Male])).await;
    let b_feed = h.feed.build_feed("B", 1, 20, FeedMode::Realtime).await.unwrap();
    assert!(b_feed.matches.is_empty());
}

#[tokio::test]
async fn test_integration_precomputed_never_violates_preferences() {
    let h = Harness::new();
    h.add(create_test_profile("viewer", Gender::Male, vec![Gender::Female])).await;
    h.add(create_test_profile("ok", Gender::Female, vec![Gender::Male])).await;
    h.add(create_test_profile("wrong", Gender::Male, vec![Gender::Male])).await;
    h.add(create_test_profile("blocked", Gender::Female, vec![Gender::Male])).await;
    let mut inactive = create_test_profile("inactive", Gender::Female, vec![Gender::Male]);
    inactive.is_active = false;
    h.add(inactive).await;

    h.cache
        .put_rankings(&UserRankings {
            user_id: "viewer".to_string(),
            candidates: ["wrong", "blocked", "inactive", "ok"]
                .iter()
                .enumerate()
                .map(|(i, id)| RankedCandidate {
                    candidate_id: id.to_string(),
                    score: 95.0 - i as f64,
                    reasons: vec!["Mutual like".to_string()],
                })
                .collect(),
            computed_at: Utc::now(),
        })
        .await
        .unwrap();
    h.likes.block_user("blocked", "viewer", Some("not interested")).await.unwrap();

    let page = h.feed.build_feed("viewer", 1, 20, FeedMode::Precomputed).await.unwrap();
    let ids: Vec<&str> = page.matches.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, vec!["ok"]);
    assert_eq!(page.total, 1);
    assert_eq!(page.matches[0].score, Some(92));
}

#[tokio::test]
async fn test_integration_non_participant_send() {
    let h = Harness::new();
    let conversation = h.matched_pair("ana", "ben").await;
    h.add(create_test_profile("eve", Gender::Female, vec![Gender::Male])).await;

    let result = h.messages.append(conversation.id, "eve", "let me in").await;
    assert!(matches!(result, Err(CoreError::Unauthorized(_))));

    let history = h.messages.list(conversation.id, "ana").await.unwrap();
    assert!(history.iter().all(|m| m.content != "let me in"));
    assert_err!(h.messages.list(conversation.id, "eve").await);
}

#[tokio::test]
async fn test_integration_subscriber_before_and_after() {
    let h = Harness::new();
    let conversation = h.matched_pair("ana", "ben").await;

    let mut early = h.dispatcher.subscribe(conversation.id, "ben").await.unwrap();
    let sent = h.messages.append(conversation.id, "ana", "hello").await.unwrap();
    let mut late = h.dispatcher.subscribe(conversation.id, "ana").await.unwrap();

    let received = tokio::time::timeout(Duration::from_secs(1), early.recv())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(received.id, sent.id);

    // The late subscriber only sees what comes after it joined
    let follow_up = h.messages.append(conversation.id, "ben", "hi!").await.unwrap();
    let first_late = tokio::time::timeout(Duration::from_secs(1), late.recv())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(first_late.id, follow_up.id);

    let history = h.messages.list(conversation.id, "ana").await.unwrap();
    assert!(history.iter().any(|m| m.id == sent.id));

    early.unsubscribe();
    late.unsubscribe();
    assert_eq!(h.dispatcher.active_subscriptions(), 0);
    assert_eq!(h.dispatcher.channel_count(), 0);
}

#[tokio::test]
async fn test_integration_match_survives_block() {
    let h = Harness::new();
    let conversation = h.matched_pair("ana", "ben").await;
    h.messages.append(conversation.id, "ana", "hey").await.unwrap();

    h.likes.block_user("ben", "ana", None).await.unwrap();

    assert!(h.matches.check_reciprocity("ana", "ben").await.unwrap().matched);
    assert_eq!(h.matches.list_matches("ana").await.unwrap().len(), 1);
    assert_eq!(h.messages.list(conversation.id, "ana").await.unwrap().len(), 1);
    assert!(matches!(
        h.messages.append(conversation.id, "ana", "still there?").await,
        Err(CoreError::Unauthorized(_))
    ));
}

/// Store wrapper whose profile scan takes longer than any feed deadline
struct SlowStore {
    inner: MemoryStore,
    delay: Duration,
}

#[async_trait]
impl MatchStore for SlowStore {
    async fn get_profile(&self, user_id: &str) -> Result<Option<Profile>, StoreError> {
        self.inner.get_profile(user_id).await
    }

    async fn get_profiles(&self, user_ids: &[String]) -> Result<Vec<Profile>, StoreError> {
        self.inner.get_profiles(user_ids).await
    }

    async fn active_profiles(&self) -> Result<Vec<Profile>, StoreError> {
        tokio::time::sleep(self.delay).await;
        self.inner.active_profiles().await
    }

    async fn upsert_profile(&self, profile: &Profile) -> Result<(), StoreError> {
        self.inner.upsert_profile(profile).await
    }

    async fn touch_last_active(&self, user_id: &str, at: DateTime<Utc>) -> Result<(), StoreError> {
        self.inner.touch_last_active(user_id, at).await
    }

    async fn insert_like(&self, liker_id: &str, likee_id: &str) -> Result<CreateOutcome<Like>, StoreError> {
        self.inner.insert_like(liker_id, likee_id).await
    }

    async fn like_exists(&self, liker_id: &str, likee_id: &str) -> Result<bool, StoreError> {
        self.inner.like_exists(liker_id, likee_id).await
    }

    async fn liked_by(&self, liker_id: &str) -> Result<Vec<String>, StoreError> {
        self.inner.liked_by(liker_id).await
    }

    async fn insert_block(
        &self,
        blocker_id: &str,
        blocked_id: &str,
        reason: Option<&str>,
    ) -> Result<CreateOutcome<Block>, StoreError> {
        self.inner.insert_block(blocker_id, blocked_id, reason).await
    }

    async fn blocked_between(&self, a: &str, b: &str) -> Result<bool, StoreError> {
        self.inner.blocked_between(a, b).await
    }

    async fn blocks_involving(&self, user_id: &str) -> Result<Vec<String>, StoreError> {
        self.inner.blocks_involving(user_id).await
    }

    async fn create_match_if_absent(&self, pair: &UserPair) -> Result<CreateOutcome<Match>, StoreError> {
        self.inner.create_match_if_absent(pair).await
    }

    async fn find_match(&self, pair: &UserPair) -> Result<Option<Match>, StoreError> {
        self.inner.find_match(pair).await
    }

    async fn get_match(&self, match_id: Uuid) -> Result<Option<Match>, StoreError> {
        self.inner.get_match(match_id).await
    }

    async fn matches_for_user(&self, user_id: &str) -> Result<Vec<Match>, StoreError> {
        self.inner.matches_for_user(user_id).await
    }

    async fn create_conversation_if_absent(&self, m: &Match) -> Result<CreateOutcome<Conversation>, StoreError> {
        self.inner.create_conversation_if_absent(m).await
    }

    async fn get_conversation(&self, conversation_id: Uuid) -> Result<Option<Conversation>, StoreError> {
        self.inner.get_conversation(conversation_id).await
    }

    async fn conversation_for_match(&self, match_id: Uuid) -> Result<Option<Conversation>, StoreError> {
        self.inner.conversation_for_match(match_id).await
    }

    async fn append_message(
        &self,
        conversation_id: Uuid,
        sender_id: &str,
        content: &str,
    ) -> Result<Message, StoreError> {
        self.inner.append_message(conversation_id, sender_id, content).await
    }

    async fn messages(&self, conversation_id: Uuid) -> Result<Vec<Message>, StoreError> {
        self.inner.messages(conversation_id).await
    }

    async fn messages_after(&self, conversation_id: Uuid, after_seq: i64) -> Result<Vec<Message>, StoreError> {
        self.inner.messages_after(conversation_id, after_seq).await
    }

    async fn last_seq(&self, conversation_id: Uuid) -> Result<i64, StoreError> {
        self.inner.last_seq(conversation_id).await
    }

    async fn mark_read(&self, conversation_id: Uuid, reader_id: &str) -> Result<u64, StoreError> {
        self.inner.mark_read(conversation_id, reader_id).await
    }

    async fn health_check(&self) -> Result<bool, StoreError> {
        self.inner.health_check().await
    }
}

#[tokio::test]
async fn test_integration_feed_deadline() {
    let store = Arc::new(SlowStore {
        inner: MemoryStore::new(),
        delay: Duration::from_secs(30),
    });
    store
        .upsert_profile(&create_test_profile("viewer", Gender::Male, vec![Gender::Female]))
        .await
        .unwrap();

    let feed = DiscoveryFeedBuilder::new(
        store,
        Arc::new(CacheManager::local(10, 60)),
        FeedSettings {
            deadline: Duration::from_millis(200),
            ..FeedSettings::default()
        },
    );

    let result = feed.build_feed("viewer", 1, 20, FeedMode::Realtime).await;
    match result {
        Err(e @ CoreError::Timeout(_)) => assert!(e.is_retryable()),
        other => panic!("expected timeout, got {:?}", other.map(|p| p.total)),
    }
}
