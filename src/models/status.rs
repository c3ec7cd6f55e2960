use serde::{Deserialize, Serialize};

/// Summary of a scrap directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapStatus {
    /// Path of the scrap directory.
    pub scrap_dir: String,
    /// Items tracked by the index.
    pub entries: usize,
    /// Sum of tracked item sizes.
    pub total_bytes: u64,
    /// Items sitting in the scrap directory that the index does not know about.
    pub untracked: Vec<String>,
    /// Whether the scrap directory is listed in `.gitignore`.
    pub gitignored: bool,
}
