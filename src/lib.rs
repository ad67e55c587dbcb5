//! Listing ordering engine for a PG finder directory page.
//!
//! Pinned listings are held at the front of the page in priority order; a
//! rotating handful of the remaining listings is featured right after them.

pub mod config;
pub mod error;
pub mod identity;
pub mod models;
pub mod page;
pub mod pins;
pub mod rotation;
pub mod site;
pub mod storage;
pub mod sync;

#[cfg(test)]
mod test_utils;

pub use config::{BackupPolicy, Config, RotationConfig};
pub use error::{Error, Result};
pub use site::{Scheduling, Site};
