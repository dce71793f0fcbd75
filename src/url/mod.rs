//! URL handling module for the Knot crawler
//!
//! This module provides hyperlink resolution against a page address, target
//! normalization and random target generation.

mod resolve;
mod target;

// Re-export main functions
pub use resolve::resolve;
pub use target::{generate_ips, has_http_scheme, normalize_target};
