use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedLabelUrl {
    pub url: String,
    pub expires_at: DateTime<Utc>,
}

/// Issues time-limited download links for files in the label store.
pub trait LabelUrlSigner {
    fn sign(&self, path: &str) -> Option<SignedLabelUrl>;
}
