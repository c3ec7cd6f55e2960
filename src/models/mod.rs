//! Domain models for scrap.
//!
//! # Core Concepts
//!
//! - [`ScrapEntry`]: A file or directory that has been moved into the scrap
//!   directory, together with where it came from.
//! - [`HistoryEvent`]: Append-only log of what happened to scrapped items
//!   (scrapped, restored, purged, cleaned). Survives the entry it describes.
//! - [`ScrapStatus`]: Summary of the scrap directory for `scrap status`.

mod entry;
mod history;
mod status;

pub use entry::*;
pub use history::*;
pub use status::*;
