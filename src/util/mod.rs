//! Utility functions and helpers
//!
//! ## Modules
//!
//! - [`tempfile`] - Scoped temporary files for uploads
//! - [`timing`] - Timed execution of async operations

pub mod tempfile;
pub mod timing;
