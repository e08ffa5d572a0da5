//! Settings file model (`kcc.toml`).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub split: SplitSection,
    #[serde(default)]
    pub audit: AuditSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitSection {
    /// Also store every non-default-namespace context under `default`.
    #[serde(default = "default_true")]
    pub duplicate_to_default: bool,
}

impl Default for SplitSection {
    fn default() -> Self {
        Self {
            duplicate_to_default: default_true(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditSection {
    /// Append mutating operations to the journal.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for AuditSection {
    fn default() -> Self {
        Self {
            enabled: default_true(),
        }
    }
}

fn default_true() -> bool {
    true
}
