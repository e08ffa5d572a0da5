//! Kubeconfig collection manager.
//!
//! Splits a multi-context kubeconfig into one file per cluster and
//! namespace, and lists, renames and deletes the resulting files.
//!
//! ## Modules
//! - `cli` — Command-line handlers
//! - `core` — Store, splitter, journal, path and settings resolution
//! - `error` — Typed store errors
//! - `models` — Data structures
//! - `util` — Filesystem helpers

pub mod cli;
pub mod constants;
pub mod core;
pub mod error;
pub mod models;
pub mod util;
