//! Idempotent insertion of the scrap directory into `.gitignore`.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ScrapError};

/// What [`ensure_ignored`] did to the `.gitignore` file.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GitignoreChange {
    Created,
    Appended,
    Unchanged,
}

/// Make sure `dir_name` (e.g. `.scrap`) is ignored by `<root>/.gitignore`.
///
/// Existing content is never rewritten; the entry is appended as `dir_name/`
/// on its own line when no equivalent line is present.
pub fn ensure_ignored(root: &Path, dir_name: &str) -> Result<GitignoreChange> {
    let path = root.join(".gitignore");
    let entry = format!("{}/", dir_name.trim_matches('/'));

    let existing = match fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            fs::write(&path, format!("{}\n", entry)).map_err(|e| ScrapError::io(&path, e))?;
            tracing::debug!("Created {} with {}", path.display(), entry);
            return Ok(GitignoreChange::Created);
        }
        Err(e) => return Err(ScrapError::io(&path, e)),
    };

    if contains_entry(&existing, dir_name) {
        return Ok(GitignoreChange::Unchanged);
    }

    let mut updated = existing;
    if !updated.is_empty() && !updated.ends_with('\n') {
        updated.push('\n');
    }
    updated.push_str(&entry);
    updated.push('\n');

    fs::write(&path, updated).map_err(|e| ScrapError::io(&path, e))?;
    tracing::debug!("Appended {} to {}", entry, path.display());
    Ok(GitignoreChange::Appended)
}

/// Whether `<root>/.gitignore` already ignores `dir_name`.
pub fn is_ignored(root: &Path, dir_name: &str) -> Result<bool> {
    let path = root.join(".gitignore");
    match fs::read_to_string(&path) {
        Ok(content) => Ok(contains_entry(&content, dir_name)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(ScrapError::io(&path, e)),
    }
}

/// `.scrap`, `.scrap/`, `/.scrap` and `/.scrap/` all count as the same entry.
fn contains_entry(content: &str, dir_name: &str) -> bool {
    let wanted = dir_name.trim_matches('/');
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.starts_with('#'))
        .any(|line| line.trim_start_matches('/').trim_end_matches('/') == wanted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_creates_gitignore_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let change = ensure_ignored(dir.path(), ".scrap").unwrap();

        assert_eq!(change, GitignoreChange::Created);
        let content = fs::read_to_string(dir.path().join(".gitignore")).unwrap();
        assert_eq!(content, ".scrap/\n");
    }

    #[test]
    fn test_appends_after_existing_lines() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(".gitignore"), "target/\n*.log\n").unwrap();

        let change = ensure_ignored(dir.path(), ".scrap").unwrap();

        assert_eq!(change, GitignoreChange::Appended);
        let content = fs::read_to_string(dir.path().join(".gitignore")).unwrap();
        assert_eq!(content, "target/\n*.log\n.scrap/\n");
    }

    #[test]
    fn test_adds_missing_trailing_newline() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(".gitignore"), "target/").unwrap();

        ensure_ignored(dir.path(), ".scrap").unwrap();

        let content = fs::read_to_string(dir.path().join(".gitignore")).unwrap();
        assert_eq!(content, "target/\n.scrap/\n");
    }

    #[test]
    fn test_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        ensure_ignored(dir.path(), ".scrap").unwrap();
        let change = ensure_ignored(dir.path(), ".scrap").unwrap();

        assert_eq!(change, GitignoreChange::Unchanged);
        let content = fs::read_to_string(dir.path().join(".gitignore")).unwrap();
        assert_eq!(content.matches(".scrap").count(), 1);
    }

    #[test]
    fn test_equivalent_forms_are_recognized() {
        for form in [".scrap", ".scrap/", "/.scrap", "/.scrap/", "  .scrap/  "] {
            assert!(contains_entry(&format!("target\n{}\n", form), ".scrap"), "{form}");
        }
    }

    #[test]
    fn test_comments_and_similar_names_do_not_match() {
        assert!(!contains_entry("# .scrap/\n", ".scrap"));
        assert!(!contains_entry(".scrapbook/\n", ".scrap"));
        assert!(!contains_entry("foo/.scrap\n", ".scrap"));
    }

    #[test]
    fn test_is_ignored_without_gitignore() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!is_ignored(dir.path(), ".scrap").unwrap());
        ensure_ignored(dir.path(), ".scrap").unwrap();
        assert!(is_ignored(dir.path(), ".scrap").unwrap());
    }
}
