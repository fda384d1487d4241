//! # `race_checklist`
//!
//! Race-day checklist and GO / NO GO status board over a shared document store.

pub mod board;
pub mod checklist;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod error;
pub mod paths;
pub mod poll;
pub mod staff;
pub mod storage;
pub mod templates;
pub mod testing;
pub mod traits;

pub use error::{Error, Result};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
