//! Centralized constants for file naming, permissions, and defaults.

/// Directory under `$HOME` used when no base directory is configured.
pub const DEFAULT_KUBE_DIR_NAME: &str = ".kube";

/// Environment variable overriding the base directory.
pub const KUBE_DIR_ENV: &str = "KCC_KUBE_DIR";

/// Fixed prefix of every stored config file name.
pub const FILE_PREFIX: &str = "config";

/// Separator between prefix, cluster and namespace in a file name.
pub const KEY_DELIMITER: char = '|';

/// Namespace assumed when a context does not name one.
pub const DEFAULT_NAMESPACE: &str = "default";

/// Name of the monolithic source document inside the base directory.
pub const SOURCE_CONFIG_NAME: &str = "config";

/// Name of the settings file inside the base directory.
pub const SETTINGS_FILE_NAME: &str = "kcc.toml";

/// Name of the operation journal inside the base directory.
pub const AUDIT_LOG_NAME: &str = "kcc-audit.log";

/// Permission mode for the base directory.
pub const KUBE_DIR_MODE: u32 = 0o700;

/// Permission mode for stored config files (they carry credentials).
pub const CONFIG_FILE_MODE: u32 = 0o600;

/// Permission mode for the operation journal.
pub const AUDIT_LOG_MODE: u32 = 0o600;

/// `apiVersion` written into every stored document.
pub const KUBECONFIG_API_VERSION: &str = "v1";

/// `kind` written into every stored document.
pub const KUBECONFIG_KIND: &str = "Config";
