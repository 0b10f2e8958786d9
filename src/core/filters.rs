use std::collections::HashSet;
use crate::models::Profile;

/// Check the mutual gender-preference filter
///
/// Both directions are evaluated separately: the candidate must seek the
/// viewer's gender and the viewer must seek the candidate's gender.
#[inline]
pub fn is_mutually_compatible(viewer: &Profile, candidate: &Profile) -> bool {
    candidate.seeks(viewer.gender) && viewer.seeks(candidate.gender)
}

/// Ids the viewer must never see: themself, everyone they liked, and
/// everyone on either side of a block with them
#[derive(Debug, Default, Clone)]
pub struct Exclusions {
    ids: HashSet<String>,
}

impl Exclusions {
    pub fn new(viewer_id: &str, liked: Vec<String>, blocked: Vec<String>) -> Self {
        let mut ids: HashSet<String> = liked.into_iter().chain(blocked).collect();
        ids.insert(viewer_id.to_string());
        Self { ids }
    }

    #[inline]
    pub fn contains(&self, user_id: &str) -> bool {
        self.ids.contains(user_id)
    }
}

/// Full eligibility check for one candidate against current state
#[inline]
pub fn is_eligible(viewer: &Profile, candidate: &Profile, exclusions: &Exclusions) -> bool {
    // Inactive profiles never appear
    if !candidate.is_active {
        return false;
    }

    if exclusions.contains(&candidate.id) {
        return false;
    }

    is_mutually_compatible(viewer, candidate)
}
