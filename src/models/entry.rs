use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An item living in the scrap directory.
///
/// `name` is the file name inside the scrap directory. It is unique and can
/// differ from the original file name when a collision forced a numeric
/// suffix. `original_path` is relative to the working root whenever the item
/// came from inside it, absolute otherwise.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScrapEntry {
    pub id: Uuid,
    pub name: String,
    pub original_path: String,
    pub kind: EntryKind,
    pub size_bytes: u64,
    pub scrapped_at: DateTime<Utc>,
}

/// What kind of filesystem object was scrapped.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    File,
    Dir,
    Symlink,
}

impl EntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Dir => "dir",
            Self::Symlink => "symlink",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "file" => Some(Self::File),
            "dir" => Some(Self::Dir),
            "symlink" => Some(Self::Symlink),
            _ => None,
        }
    }

    /// Classify a path without following symlinks.
    pub fn of(path: &Path) -> std::io::Result<Self> {
        let meta = fs::symlink_metadata(path)?;
        let ft = meta.file_type();
        Ok(if ft.is_symlink() {
            Self::Symlink
        } else if ft.is_dir() {
            Self::Dir
        } else {
            Self::File
        })
    }
}

/// Input for recording a newly scrapped item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateEntryInput {
    pub name: String,
    pub original_path: String,
    pub kind: EntryKind,
    pub size_bytes: u64,
}
