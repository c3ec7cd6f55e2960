//! Move files and directories out of the working tree into a git-ignored
//! `.scrap/` holding area, and get them back later.

pub mod config;
pub mod db;
pub mod error;
pub mod gitignore;
pub mod models;
pub mod naming;
pub mod render;
pub mod scrapyard;

pub use config::Config;
pub use error::{Result, ScrapError};
pub use scrapyard::Scrapyard;
