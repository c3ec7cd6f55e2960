//! The scrap directory and the operations on it.
//!
//! A [`Scrapyard`] is bound to a working root. Items scrapped from the root
//! are moved (never copied, unless the move crosses filesystems) into
//! `<root>/<scrap_dir>/` under a collision-free name, and recorded in the
//! index so they can be listed, restored to where they came from, or deleted
//! for good.

use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use chrono::{DateTime, Duration, Utc};

use crate::config::Config;
use crate::db::{Database, INDEX_FILE, RESERVED_NAMES};
use crate::error::{Result, ScrapError};
use crate::gitignore;
use crate::models::*;
use crate::naming::{reserve_name, Placeholder};

pub struct Scrapyard {
    root: PathBuf,
    dir_name: String,
    scrap_dir: PathBuf,
    db: Database,
}

impl Scrapyard {
    /// Open (creating if needed) the scrap directory under `root`.
    ///
    /// When `config.update_gitignore` is set, the scrap directory is added to
    /// `<root>/.gitignore` if it is not already listed there.
    pub fn open(root: &Path, config: &Config) -> Result<Self> {
        let (root, dir_name, scrap_dir) = Self::locate(root, config)?;
        fs::create_dir_all(&scrap_dir).map_err(|e| ScrapError::io(&scrap_dir, e))?;

        let db = Database::open(&scrap_dir.join(INDEX_FILE))?;
        db.migrate()?;

        if config.update_gitignore {
            let change = gitignore::ensure_ignored(&root, &dir_name)?;
            tracing::debug!(?change, "Checked .gitignore for {}", dir_name);
        }

        Ok(Self {
            root,
            dir_name,
            scrap_dir,
            db,
        })
    }

    /// Open for queries only. Nothing is created and `.gitignore` is never
    /// touched; a missing scrap directory reads as empty.
    pub fn open_read_only(root: &Path, config: &Config) -> Result<Self> {
        let (root, dir_name, scrap_dir) = Self::locate(root, config)?;

        let db = if scrap_dir.is_dir() {
            Database::open(&scrap_dir.join(INDEX_FILE))?
        } else {
            tracing::debug!("{} does not exist yet", scrap_dir.display());
            Database::open_memory()?
        };
        db.migrate()?;

        Ok(Self {
            root,
            dir_name,
            scrap_dir,
            db,
        })
    }

    fn locate(root: &Path, config: &Config) -> Result<(PathBuf, String, PathBuf)> {
        let root = root.canonicalize().map_err(|e| match e.kind() {
            ErrorKind::NotFound => ScrapError::NotFound(root.to_path_buf()),
            _ => ScrapError::io(root, e),
        })?;
        let dir_name = config.scrap_dir.trim_matches('/').to_string();
        let scrap_dir = root.join(&dir_name);
        Ok((root, dir_name, scrap_dir))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn scrap_dir(&self) -> &Path {
        &self.scrap_dir
    }

    /// Where a scrapped entry currently lives.
    pub fn path_of(&self, entry: &ScrapEntry) -> PathBuf {
        self.scrap_dir.join(&entry.name)
    }

    // ============================================================
    // Scrapping
    // ============================================================

    /// Move `path` into the scrap directory.
    ///
    /// Relative paths are resolved against the working root.
    pub fn scrap(&self, path: &Path) -> Result<ScrapEntry> {
        let joined = self.root.join(path);
        if joined.symlink_metadata().is_err() {
            return Err(ScrapError::NotFound(path.to_path_buf()));
        }
        let source = absolutize(&joined)?;

        if self.root.starts_with(&source) {
            return Err(ScrapError::IsRoot(source));
        }
        if source.starts_with(&self.scrap_dir) {
            return Err(ScrapError::InsideScrap(source));
        }

        let file_name = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| ScrapError::NotFound(path.to_path_buf()))?;

        let kind = EntryKind::of(&source).map_err(|e| ScrapError::io(&source, e))?;
        let size_bytes = disk_usage(&source);

        // Names still in the index are taken even if their file is gone.
        let tracked: Vec<String> = self.list()?.into_iter().map(|e| e.name).collect();
        let mut taken: Vec<&str> = RESERVED_NAMES.to_vec();
        taken.extend(tracked.iter().map(String::as_str));

        let placeholder = match kind {
            EntryKind::Dir => Placeholder::Dir,
            EntryKind::File | EntryKind::Symlink => Placeholder::File,
        };
        let name = reserve_name(&self.scrap_dir, &file_name, &taken, placeholder)
            .map_err(|e| ScrapError::io(&self.scrap_dir, e))?;
        let dest = self.scrap_dir.join(&name);
        if let Err(e) = move_onto_placeholder(&source, &dest) {
            let _ = remove_path(&dest);
            return Err(e);
        }

        let original_path = self.display_relative(&source);
        let created = self.db.create_entry(CreateEntryInput {
            name: name.clone(),
            original_path: original_path.clone(),
            kind,
            size_bytes,
        });
        let entry = match created {
            Ok(entry) => entry,
            Err(e) => {
                if let Err(undo) = move_path(&dest, &source) {
                    tracing::error!(
                        "Could not move {} back to {}: {}",
                        dest.display(),
                        source.display(),
                        undo
                    );
                }
                return Err(e.into());
            }
        };
        self.db.create_history_event(CreateHistoryInput {
            action: HistoryAction::Scrapped,
            name,
            original_path,
            detail: None,
        })?;

        if entry.name != file_name {
            tracing::info!("Scrapped {} as {}", entry.original_path, entry.name);
        } else {
            tracing::info!("Scrapped {}", entry.original_path);
        }
        Ok(entry)
    }

    /// Scrap each path in turn. A failure does not stop the remaining paths.
    pub fn scrap_many<P: AsRef<Path>>(&self, paths: &[P]) -> Vec<(PathBuf, Result<ScrapEntry>)> {
        paths
            .iter()
            .map(|p| {
                let p = p.as_ref();
                (p.to_path_buf(), self.scrap(p))
            })
            .collect()
    }

    // ============================================================
    // Queries
    // ============================================================

    /// Tracked entries, oldest first.
    pub fn list(&self) -> Result<Vec<ScrapEntry>> {
        Ok(self.db.get_all_entries()?)
    }

    pub fn get(&self, name: &str) -> Result<ScrapEntry> {
        self.db
            .get_entry_by_name(name)?
            .ok_or_else(|| ScrapError::EntryNotFound(name.to_string()))
    }

    pub fn find(&self, query: &str) -> Result<Vec<ScrapEntry>> {
        Ok(self.db.search_entries(query)?)
    }

    /// Names present in the scrap directory that the index does not track.
    pub fn untracked(&self) -> Result<Vec<String>> {
        let tracked: Vec<String> = self.list()?.into_iter().map(|e| e.name).collect();

        let read = match fs::read_dir(&self.scrap_dir) {
            Ok(read) => read,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(ScrapError::io(&self.scrap_dir, e)),
        };
        let mut names = Vec::new();
        for item in read {
            let item = item.map_err(|e| ScrapError::io(&self.scrap_dir, e))?;
            let name = item.file_name().to_string_lossy().into_owned();
            if RESERVED_NAMES.contains(&name.as_str()) || tracked.contains(&name) {
                continue;
            }
            names.push(name);
        }
        names.sort();
        Ok(names)
    }

    pub fn history(&self, limit: Option<usize>) -> Result<Vec<HistoryEvent>> {
        Ok(self.db.get_history(limit)?)
    }

    pub fn status(&self) -> Result<ScrapStatus> {
        let entries = self.list()?;
        Ok(ScrapStatus {
            scrap_dir: self.scrap_dir.display().to_string(),
            entries: entries.len(),
            total_bytes: entries.iter().map(|e| e.size_bytes).sum(),
            untracked: self.untracked()?,
            gitignored: gitignore::is_ignored(&self.root, &self.dir_name)?,
        })
    }

    // ============================================================
    // Restoring
    // ============================================================

    /// Move a scrapped item back out of the scrap directory.
    ///
    /// The target is `to` when given (relative paths resolve against the
    /// working root), otherwise the path the item was scrapped from. An
    /// existing target is only replaced when `force` is set. Neither the
    /// working root nor its ancestors are ever valid targets, and neither is
    /// anything inside the scrap directory.
    pub fn restore(&self, name: &str, to: Option<&Path>, force: bool) -> Result<ScrapEntry> {
        let entry = self.get(name)?;
        let source = self.path_of(&entry);
        if source.symlink_metadata().is_err() {
            return Err(ScrapError::NotFound(source));
        }

        let dest = self.resolve_target(match to {
            Some(to) => to,
            None => Path::new(&entry.original_path),
        })?;
        if dest.starts_with(&self.scrap_dir) {
            return Err(ScrapError::InsideScrap(dest));
        }
        if self.root.starts_with(&dest) {
            return Err(ScrapError::IsRoot(dest));
        }

        if dest.symlink_metadata().is_ok() {
            if !force {
                return Err(ScrapError::DestinationExists(dest));
            }
            tracing::warn!("Overwriting {}", dest.display());
            remove_path(&dest)?;
        }

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(|e| ScrapError::io(parent, e))?;
        }
        move_path(&source, &dest)?;

        self.db.delete_entry(entry.id)?;
        self.db.create_history_event(CreateHistoryInput {
            action: HistoryAction::Restored,
            name: entry.name.clone(),
            original_path: entry.original_path.clone(),
            detail: Some(self.display_relative(&dest)),
        })?;

        tracing::info!("Restored {} to {}", entry.name, dest.display());
        Ok(entry)
    }

    // ============================================================
    // Deleting
    // ============================================================

    /// Permanently delete one scrapped item.
    pub fn purge(&self, name: &str) -> Result<ScrapEntry> {
        let entry = self.get(name)?;
        self.delete_entry(&entry, HistoryAction::Purged)?;
        Ok(entry)
    }

    /// Permanently delete items scrapped more than `older_than` ago.
    pub fn clean(&self, older_than: Duration) -> Result<Vec<ScrapEntry>> {
        let cutoff = Utc::now()
            .checked_sub_signed(older_than)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        self.clean_before(cutoff)
    }

    /// Permanently delete items scrapped before `cutoff`.
    pub fn clean_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<ScrapEntry>> {
        let expired = self.db.get_entries_before(cutoff)?;
        for entry in &expired {
            self.delete_entry(entry, HistoryAction::Cleaned)?;
        }
        tracing::info!("Cleaned {} item(s) scrapped before {}", expired.len(), cutoff);
        Ok(expired)
    }

    /// Permanently delete everything in the scrap directory, tracked or not.
    /// Returns the number of items removed.
    pub fn empty(&self) -> Result<usize> {
        let entries = self.list()?;
        let untracked = self.untracked()?;

        for entry in &entries {
            self.delete_entry(entry, HistoryAction::Purged)?;
        }
        for name in &untracked {
            remove_path(&self.scrap_dir.join(name))?;
            self.db.create_history_event(CreateHistoryInput {
                action: HistoryAction::Purged,
                name: name.clone(),
                original_path: String::new(),
                detail: Some("untracked".to_string()),
            })?;
        }

        Ok(entries.len() + untracked.len())
    }

    fn delete_entry(&self, entry: &ScrapEntry, action: HistoryAction) -> Result<()> {
        let path = self.path_of(entry);
        match remove_path(&path) {
            Ok(()) => {}
            Err(ScrapError::Io { source, .. }) if source.kind() == ErrorKind::NotFound => {
                tracing::warn!("{} was already gone from the scrap directory", entry.name);
            }
            Err(e) => return Err(e),
        }

        self.db.delete_entry(entry.id)?;
        self.db.create_history_event(CreateHistoryInput {
            action,
            name: entry.name.clone(),
            original_path: entry.original_path.clone(),
            detail: None,
        })?;
        tracing::debug!("{} {}", action.as_str(), entry.name);
        Ok(())
    }

    /// Absolute form of a restore target with `.` and `..` folded away and the
    /// parent canonicalized when it exists.
    fn resolve_target(&self, path: &Path) -> Result<PathBuf> {
        let joined = self.root.join(path);
        let mut dest = PathBuf::new();
        for component in joined.components() {
            match component {
                Component::CurDir => {}
                Component::ParentDir => {
                    dest.pop();
                }
                other => dest.push(other.as_os_str()),
            }
        }
        match dest.parent() {
            Some(parent) if dest.file_name().is_some() && parent.is_dir() => absolutize(&dest),
            _ => Ok(dest),
        }
    }

    /// Path relative to the working root when inside it, absolute otherwise.
    fn display_relative(&self, path: &Path) -> String {
        match path.strip_prefix(&self.root) {
            Ok(rel) => rel.to_string_lossy().into_owned(),
            Err(_) => path.to_string_lossy().into_owned(),
        }
    }
}

/// The nearest ancestor of `start` (inclusive) containing `.git`, or `start`
/// itself when there is none.
pub fn find_root(start: &Path) -> PathBuf {
    start
        .ancestors()
        .find(|dir| dir.join(".git").exists())
        .unwrap_or(start)
        .to_path_buf()
}

// ============================================================
// Filesystem helpers
// ============================================================

/// Canonicalize the parent but keep the final component as given, so a
/// symlink is scrapped as a link rather than as its target.
fn absolutize(path: &Path) -> Result<PathBuf> {
    match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) if !parent.as_os_str().is_empty() => {
            let parent = parent.canonicalize().map_err(|e| ScrapError::io(parent, e))?;
            Ok(parent.join(name))
        }
        _ => path.canonicalize().map_err(|e| ScrapError::io(path, e)),
    }
}

/// Rename, falling back to copy-then-remove across filesystems.
fn move_path(from: &Path, to: &Path) -> Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::CrossesDevices => {
            tracing::debug!("{} is on another filesystem, copying", to.display());
            if let Err(copy_err) = copy_recursive(from, to) {
                let _ = remove_path(to);
                return Err(ScrapError::io(from, copy_err));
            }
            remove_path(from)
        }
        Err(e) => Err(ScrapError::io(from, e)),
    }
}

/// Move onto a placeholder claimed by `reserve_name`. Rename replaces the
/// placeholder in one step; the copy fallback has to clear it first.
fn move_onto_placeholder(from: &Path, to: &Path) -> Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::CrossesDevices => {
            let cleared = if to.is_dir() {
                fs::remove_dir(to)
            } else {
                fs::remove_file(to)
            };
            cleared.map_err(|e| ScrapError::io(to, e))?;
            move_path(from, to)
        }
        Err(e) => Err(ScrapError::io(from, e)),
    }
}

fn copy_recursive(from: &Path, to: &Path) -> std::io::Result<()> {
    let meta = fs::symlink_metadata(from)?;
    let ft = meta.file_type();
    if ft.is_symlink() {
        copy_symlink(from, to)
    } else if ft.is_dir() {
        fs::create_dir(to)?;
        for item in fs::read_dir(from)? {
            let item = item?;
            copy_recursive(&item.path(), &to.join(item.file_name()))?;
        }
        fs::set_permissions(to, meta.permissions())
    } else {
        fs::copy(from, to).map(|_| ())
    }
}

#[cfg(unix)]
fn copy_symlink(from: &Path, to: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(fs::read_link(from)?, to)
}

#[cfg(not(unix))]
fn copy_symlink(from: &Path, to: &Path) -> std::io::Result<()> {
    fs::copy(from, to).map(|_| ())
}

fn remove_path(path: &Path) -> Result<()> {
    let meta = fs::symlink_metadata(path).map_err(|e| ScrapError::io(path, e))?;
    let result = if meta.file_type().is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    result.map_err(|e| ScrapError::io(path, e))
}

/// Apparent size in bytes. Symlinks are not followed; unreadable children
/// are skipped.
fn disk_usage(path: &Path) -> u64 {
    let Ok(meta) = fs::symlink_metadata(path) else {
        return 0;
    };
    if !meta.file_type().is_dir() {
        return meta.len();
    }
    fs::read_dir(path)
        .map(|read| {
            read.filter_map(|item| item.ok())
                .map(|item| disk_usage(&item.path()))
                .sum()
        })
        .unwrap_or(0)
}
