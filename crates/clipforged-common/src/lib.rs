//! Clipforged-Common: shared identifiers and path utilities.
//!
//! - **Typed IDs**: UUID wrappers for jobs and diagnostic logs
//! - **Path Utilities**: extension classification, the upload allow-list and
//!   bare-filename sanitizing
//!
//! # Examples
//!
//! ```
//! use clipforged_common::{DiagnosticId, JobId};
//! use clipforged_common::paths::{is_allowed_upload, sanitize_filename};
//!
//! let job = JobId::new();
//! let diag = DiagnosticId::new();
//! assert_ne!(job.to_string(), diag.to_string());
//!
//! assert!(is_allowed_upload("clip.MP4"));
//! assert_eq!(sanitize_filename("../etc/passwd"), None);
//! ```

pub mod ids;
pub mod paths;

pub use ids::*;
