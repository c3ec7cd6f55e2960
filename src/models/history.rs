use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An append-only log entry recording something that happened in the
/// scrap directory.
///
/// Events outlive the entries they mention: restoring or purging an item
/// removes it from the index, but its history stays.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEvent {
    pub id: Uuid,
    pub action: HistoryAction,
    /// Name inside the scrap directory at the time of the event.
    pub name: String,
    pub original_path: String,
    /// Free-form extra information, e.g. the restore target.
    pub detail: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// What happened to an item.
///
/// - `Scrapped`: moved into the scrap directory
/// - `Restored`: moved back out
/// - `Purged`: deleted permanently on request
/// - `Cleaned`: deleted permanently by age-based cleanup
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HistoryAction {
    Scrapped,
    Restored,
    Purged,
    Cleaned,
}

impl HistoryAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scrapped => "scrapped",
            Self::Restored => "restored",
            Self::Purged => "purged",
            Self::Cleaned => "cleaned",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "scrapped" => Some(Self::Scrapped),
            "restored" => Some(Self::Restored),
            "purged" => Some(Self::Purged),
            "cleaned" => Some(Self::Cleaned),
            _ => None,
        }
    }
}

/// Input for appending a history event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateHistoryInput {
    pub action: HistoryAction,
    pub name: String,
    pub original_path: String,
    pub detail: Option<String>,
}
