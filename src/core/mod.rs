//! Core business logic modules.

pub mod audit_log;
pub mod paths;
pub mod settings;
pub mod splitter;
pub mod store;
