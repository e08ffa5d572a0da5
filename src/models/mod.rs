//! Data structures.

pub mod key;
pub mod kubeconfig;
pub mod settings;
