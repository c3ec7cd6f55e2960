//! Terminal rendering for scrap listings.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};

use crate::models::{EntryKind, HistoryEvent, ScrapEntry};

/// A directory tree read from disk, used by `scrap list --tree`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeNode {
    pub name: String,
    pub kind: EntryKind,
    pub children: Vec<TreeNode>,
}

/// Read `path` into a [`TreeNode`], descending at most `max_depth` levels.
/// Children are sorted by name; symlinks are not followed.
pub fn read_tree(path: &Path, name: &str, max_depth: usize) -> TreeNode {
    let kind = EntryKind::of(path).unwrap_or(EntryKind::File);
    let mut children = Vec::new();

    if kind == EntryKind::Dir && max_depth > 0 {
        if let Ok(read) = fs::read_dir(path) {
            children = read
                .filter_map(|item| item.ok())
                .map(|item| {
                    let child_name = item.file_name().to_string_lossy().into_owned();
                    read_tree(&item.path(), &child_name, max_depth - 1)
                })
                .collect();
            children.sort_by(|a, b| a.name.cmp(&b.name));
        }
    }

    TreeNode {
        name: name.to_string(),
        kind,
        children,
    }
}

fn display_name(node: &TreeNode) -> String {
    match node.kind {
        EntryKind::Dir => format!("{}/", node.name),
        EntryKind::Symlink => format!("{}@", node.name),
        EntryKind::File => node.name.clone(),
    }
}

/// Render trees as ASCII art.
///
/// Example output:
/// ```text
/// old_build/
/// ├── assets/
/// │   └── logo.png
/// └── index.html
/// notes.txt
/// ```
pub fn render_tree(nodes: &[TreeNode]) -> String {
    let mut output = String::new();
    for node in nodes {
        render_node(&mut output, node, "", false, true);
    }
    output
}

fn render_node(output: &mut String, node: &TreeNode, prefix: &str, is_last: bool, is_root: bool) {
    if is_root {
        output.push_str(&display_name(node));
        output.push('\n');
    } else {
        let branch = if is_last { "└── " } else { "├── " };
        output.push_str(prefix);
        output.push_str(branch);
        output.push_str(&display_name(node));
        output.push('\n');
    }

    let child_prefix = if is_root {
        String::new()
    } else {
        let continuation = if is_last { "    " } else { "│   " };
        format!("{}{}", prefix, continuation)
    };

    for (i, child) in node.children.iter().enumerate() {
        let child_is_last = i == node.children.len() - 1;
        render_node(output, child, &child_prefix, child_is_last, false);
    }
}

/// Render entries as an aligned table: name, kind, size, age, original path.
pub fn render_entries(entries: &[ScrapEntry], now: DateTime<Utc>) -> String {
    let rows: Vec<[String; 5]> = entries
        .iter()
        .map(|e| {
            [
                e.name.clone(),
                e.kind.as_str().to_string(),
                human_size(e.size_bytes),
                human_age(e.scrapped_at, now),
                e.original_path.clone(),
            ]
        })
        .collect();

    let mut widths = [0usize; 4];
    for row in &rows {
        for (w, cell) in widths.iter_mut().zip(row.iter()) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let mut output = String::new();
    for row in &rows {
        let line = format!(
            "{:<w0$}  {:<w1$}  {:>w2$}  {:<w3$}  {}",
            row[0],
            row[1],
            row[2],
            row[3],
            row[4],
            w0 = widths[0],
            w1 = widths[1],
            w2 = widths[2],
            w3 = widths[3],
        );
        output.push_str(line.trim_end());
        output.push('\n');
    }
    output
}

pub fn render_history(events: &[HistoryEvent]) -> String {
    let mut output = String::new();
    for event in events {
        output.push_str(&format!(
            "{}  {:<8}  {}",
            event.created_at.format("%Y-%m-%d %H:%M:%S"),
            event.action.as_str(),
            event.name
        ));
        if !event.original_path.is_empty() && event.original_path != event.name {
            output.push_str(&format!("  ({})", event.original_path));
        }
        if let Some(ref detail) = event.detail {
            output.push_str(&format!("  -> {}", detail));
        }
        output.push('\n');
    }
    output
}

/// Binary-prefixed size with one decimal above bytes: `512 B`, `1.5 KiB`.
pub fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KiB", "MiB", "GiB", "TiB"];
    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}

/// Coarse age: `just now`, `5m ago`, `3h ago`, `12d ago`.
pub fn human_age(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (now - then).num_seconds().max(0);
    match secs {
        0..=59 => "just now".to_string(),
        60..=3599 => format!("{}m ago", secs / 60),
        3600..=86_399 => format!("{}h ago", secs / 3600),
        _ => format!("{}d ago", secs / 86_400),
    }
}
