//! # Wargame Development Tools
//!
//! Command-line tools for development:
//! - Region generation, single chunks or ranges
//! - RON scenario runner
//! - Saved world inspection

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod generate;
pub mod inspect;
pub mod render;
pub mod scenario;
