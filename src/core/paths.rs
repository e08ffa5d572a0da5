//! Base directory resolution and the files kept inside it.

use crate::constants;
use anyhow::{bail, Result};
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct StorePaths {
    pub root: PathBuf,
    pub source_config: PathBuf,
    pub settings: PathBuf,
    pub audit_log: PathBuf,
}

impl StorePaths {
    /// Resolve the base directory from CLI arg, env var, or `$HOME/.kube`.
    pub fn resolve(root_arg: Option<PathBuf>) -> Result<Self> {
        if let Some(root) = root_arg {
            return Ok(Self::from_root(root));
        }
        if let Ok(root) = env::var(constants::KUBE_DIR_ENV) {
            if !root.is_empty() {
                return Ok(Self::from_root(PathBuf::from(root)));
            }
        }
        match dirs::home_dir() {
            Some(home) => Ok(Self::from_root(home.join(constants::DEFAULT_KUBE_DIR_NAME))),
            None => bail!(
                "cannot determine home directory; pass --kube-dir or set {}",
                constants::KUBE_DIR_ENV
            ),
        }
    }

    pub fn from_root(root: PathBuf) -> Self {
        let source_config = root.join(constants::SOURCE_CONFIG_NAME);
        let settings = root.join(constants::SETTINGS_FILE_NAME);
        let audit_log = root.join(constants::AUDIT_LOG_NAME);
        Self {
            root,
            source_config,
            settings,
            audit_log,
        }
    }
}

impl std::fmt::Display for StorePaths {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "store@{}", self.root.display())
    }
}
