use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Self-reported gender, from the closed set offered during onboarding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
    #[serde(rename = "Non-binary")]
    NonBinary,
    Other,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
            Gender::NonBinary => "Non-binary",
            Gender::Other => "Other",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "male" => Ok(Gender::Male),
            "female" => Ok(Gender::Female),
            "non-binary" | "non_binary" | "nonbinary" => Ok(Gender::NonBinary),
            "other" => Ok(Gender::Other),
            other => Err(format!("unknown gender: {}", other)),
        }
    }
}

/// User profile as supplied by the profile store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    #[serde(rename = "displayName")]
    pub display_name: String,
    #[serde(rename = "dateOfBirth")]
    pub date_of_birth: NaiveDate,
    pub gender: Gender,
    #[serde(rename = "lookingFor", default)]
    pub looking_for: Vec<Gender>,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub interests: Vec<String>,
    #[serde(default)]
    pub photos: Vec<String>,
    #[serde(rename = "isActive", default = "default_true")]
    pub is_active: bool,
    #[serde(rename = "lastActive")]
    pub last_active: DateTime<Utc>,
}

fn default_true() -> bool { true }

impl Profile {
    /// Whether this profile is looking for someone of `gender`
    #[inline]
    pub fn seeks(&self, gender: Gender) -> bool {
        self.looking_for.contains(&gender)
    }

    /// Age in whole years on the given date
    pub fn age_on(&self, today: NaiveDate) -> u32 {
        let dob = self.date_of_birth;
        let mut age = today.year() - dob.year();
        if (today.month(), today.day()) < (dob.month(), dob.day()) {
            age -= 1;
        }
        age.max(0) as u32
    }

    pub fn age(&self) -> u32 {
        self.age_on(Utc::now().date_naive())
    }

    /// Check the rules a stored profile must satisfy
    ///
    /// An active profile with an empty `looking_for` could never pass the
    /// mutual compatibility filter, so it is rejected rather than stored.
    pub fn check_invariants(&self) -> Result<(), String> {
        if self.id.trim().is_empty() {
            return Err("profile id is empty".to_string());
        }
        if self.is_active && self.looking_for.is_empty() {
            return Err(format!("active profile {} has an empty looking_for", self.id));
        }
        Ok(())
    }

    /// Profile completeness score (0-100) derived from the filled-in fields
    pub fn completeness(&self) -> u8 {
        let mut score = 0u8;
        if !self.display_name.trim().is_empty() {
            score += 15;
        }
        if !self.bio.trim().is_empty() {
            score += 20;
        }
        if !self.location.trim().is_empty() {
            score += 15;
        }
        if !self.interests.is_empty() {
            score += 15;
        }
        if !self.photos.is_empty() {
            score += 25;
        }
        if !self.looking_for.is_empty() {
            score += 10;
        }
        score
    }
}

/// Directed like from `liker_id` to `likee_id`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Like {
    pub id: Uuid,
    #[serde(rename = "likerId")]
    pub liker_id: String,
    #[serde(rename = "likeeId")]
    pub likee_id: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

/// Directed block record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    #[serde(rename = "blockerId")]
    pub blocker_id: String,
    #[serde(rename = "blockedId")]
    pub blocked_id: String,
    pub reason: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

/// Unordered pair of user ids, normalized so that `low < high`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserPair {
    pub low: String,
    pub high: String,
}

impl UserPair {
    /// Returns `None` for a pair of identical ids
    pub fn new(a: &str, b: &str) -> Option<Self> {
        match a.cmp(b) {
            std::cmp::Ordering::Less => Some(Self { low: a.to_string(), high: b.to_string() }),
            std::cmp::Ordering::Greater => Some(Self { low: b.to_string(), high: a.to_string() }),
            std::cmp::Ordering::Equal => None,
        }
    }

    pub fn contains(&self, user_id: &str) -> bool {
        self.low == user_id || self.high == user_id
    }

    /// The member of the pair that is not `user_id`
    pub fn other(&self, user_id: &str) -> Option<&str> {
        if self.low == user_id {
            Some(&self.high)
        } else if self.high == user_id {
            Some(&self.low)
        } else {
            None
        }
    }
}

/// Mutual like between two users
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    pub id: Uuid,
    #[serde(rename = "user1Id")]
    pub user1_id: String,
    #[serde(rename = "user2Id")]
    pub user2_id: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl Match {
    pub fn pair(&self) -> UserPair {
        UserPair { low: self.user1_id.clone(), high: self.user2_id.clone() }
    }

    pub fn involves(&self, user_id: &str) -> bool {
        self.user1_id == user_id || self.user2_id == user_id
    }
}

/// Message thread owned by exactly one match
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: Uuid,
    #[serde(rename = "matchId")]
    pub match_id: Uuid,
    #[serde(rename = "user1Id")]
    pub user1_id: String,
    #[serde(rename = "user2Id")]
    pub user2_id: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    pub fn is_participant(&self, user_id: &str) -> bool {
        self.user1_id == user_id || self.user2_id == user_id
    }

    pub fn other_participant(&self, user_id: &str) -> Option<&str> {
        if self.user1_id == user_id {
            Some(&self.user2_id)
        } else if self.user2_id == user_id {
            Some(&self.user1_id)
        } else {
            None
        }
    }
}

/// Stored chat message; immutable apart from `read`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    #[serde(rename = "conversationId")]
    pub conversation_id: Uuid,
    /// Position within the conversation, starting at 1
    pub seq: i64,
    #[serde(rename = "senderId")]
    pub sender_id: String,
    pub content: String,
    pub read: bool,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

/// Feed mode requested by the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedMode {
    #[default]
    Realtime,
    Precomputed,
}

impl fmt::Display for FeedMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedMode::Realtime => f.write_str("realtime"),
            FeedMode::Precomputed => f.write_str("precomputed"),
        }
    }
}

/// One candidate in the ranking cache produced by the scoring engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedCandidate {
    #[serde(rename = "candidateId")]
    pub candidate_id: String,
    pub score: f64,
    #[serde(default)]
    pub reasons: Vec<String>,
}

/// All cached rankings for one viewer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRankings {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub candidates: Vec<RankedCandidate>,
    #[serde(rename = "computedAt")]
    pub computed_at: DateTime<Utc>,
}

/// Public view of a candidate profile shown in the feed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateProfile {
    pub id: String,
    #[serde(rename = "displayName")]
    pub display_name: String,
    pub age: u32,
    pub gender: Gender,
    pub bio: String,
    pub location: String,
    pub interests: Vec<String>,
    pub photos: Vec<String>,
    #[serde(rename = "profileCompleteness")]
    pub profile_completeness: u8,
    #[serde(rename = "lastActive")]
    pub last_active: DateTime<Utc>,
}

impl From<&Profile> for CandidateProfile {
    fn from(profile: &Profile) -> Self {
        Self {
            id: profile.id.clone(),
            display_name: profile.display_name.clone(),
            age: profile.age(),
            gender: profile.gender,
            bio: profile.bio.clone(),
            location: profile.location.clone(),
            interests: profile.interests.clone(),
            photos: profile.photos.clone(),
            profile_completeness: profile.completeness(),
            last_active: profile.last_active,
        }
    }
}

/// Feed entry; `score` is only present in precomputed mode
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedEntry {
    pub id: String,
    pub score: Option<u8>,
    pub reasons: Vec<String>,
    pub profile: CandidateProfile,
}

/// A page of the discovery feed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedPage {
    pub matches: Vec<FeedEntry>,
    pub page: u32,
    pub limit: u32,
    pub total: usize,
    pub mode: FeedMode,
}

/// A viewer's match together with its conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchSummary {
    #[serde(rename = "matchId")]
    pub match_id: Uuid,
    #[serde(rename = "conversationId")]
    pub conversation_id: Uuid,
    #[serde(rename = "otherUserId")]
    pub other_user_id: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}
