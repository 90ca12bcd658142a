use serde::{Deserialize, Serialize};

/// A release and the koji tags its builds move through.
///
/// Only `pending_testing_tag` matters for signing: builds land there once
/// the signing service has signed them and written them out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    pub id: i64,
    pub name: String,
    pub pending_signing_tag: String,
    pub pending_testing_tag: String,
    pub testing_tag: String,
    pub stable_tag: String,
}

/// Release data before it has been assigned a row id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRelease {
    pub name: String,
    pub pending_signing_tag: String,
    pub pending_testing_tag: String,
    pub testing_tag: String,
    pub stable_tag: String,
}

impl NewRelease {
    /// Derive the usual tag names from a dist tag such as `f26`.
    #[must_use]
    pub fn from_dist_tag(name: &str, dist_tag: &str) -> Self {
        Self {
            name: name.to_string(),
            pending_signing_tag: format!("{dist_tag}-signing-pending"),
            pending_testing_tag: format!("{dist_tag}-updates-testing-pending"),
            testing_tag: format!("{dist_tag}-updates-testing"),
            stable_tag: format!("{dist_tag}-updates"),
        }
    }
}

impl Release {
    #[must_use]
    pub fn is_pending_testing_tag(&self, tag: &str) -> bool {
        self.pending_testing_tag == tag
    }
}
