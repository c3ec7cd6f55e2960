//! Collision-free names for items moved into the scrap directory.

use std::fs::{self, OpenOptions};
use std::io::{self, ErrorKind};
use std::path::Path;

/// What to create under `dir` to claim a name before moving into it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder {
    /// An empty file, replaced by the incoming file or symlink.
    File,
    /// An empty directory, replaced by the incoming directory.
    Dir,
}

/// Claim a free name under `dir` by creating a placeholder there.
///
/// Candidates are tried in order: `notes.txt`, `notes_1.txt`, `notes_2.txt`...
/// Only the last extension is split off, and a leading dot never starts an
/// extension (`.env` becomes `.env_1`). Reserved names are skipped. Creation
/// is exclusive, so two concurrent callers never get the same name.
pub fn reserve_name(
    dir: &Path,
    file_name: &str,
    reserved: &[&str],
    placeholder: Placeholder,
) -> io::Result<String> {
    let (stem, ext) = split_extension(file_name);
    let mut n: u64 = 0;
    loop {
        let candidate = match (n, ext) {
            (0, _) => file_name.to_string(),
            (_, Some(ext)) => format!("{}_{}.{}", stem, n, ext),
            (_, None) => format!("{}_{}", stem, n),
        };
        n += 1;

        if reserved.contains(&candidate.as_str()) {
            continue;
        }

        let path = dir.join(&candidate);
        let created = match placeholder {
            Placeholder::File => OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .map(|_| ()),
            Placeholder::Dir => fs::create_dir(&path),
        };
        match created {
            Ok(()) => return Ok(candidate),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e),
        }
    }
}

/// Split `name` into stem and last extension.
fn split_extension(name: &str) -> (&str, Option<&str>) {
    match name.rfind('.') {
        Some(0) | None => (name, None),
        Some(i) if i + 1 == name.len() => (name, None),
        Some(i) => (&name[..i], Some(&name[i + 1..])),
    }
}
