//! Store keys and their file-name encoding.
//!
//! Cluster and namespace are percent-escaped inside the file name so names
//! holding `/` or `|` (EKS ARNs, for one) still map to a single file.

use crate::constants::{FILE_PREFIX, KEY_DELIMITER};
use crate::error::{Result, StoreError};
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use std::fmt;

/// Bytes that cannot appear verbatim in a key component of a file name.
const COMPONENT_ESCAPE: &AsciiSet = &CONTROLS.add(b'%').add(b'/').add(b'\\').add(b'|');

/// Identifies one stored file: `config|{cluster}|{namespace}`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StoreKey {
    pub cluster: String,
    pub namespace: String,
}

impl StoreKey {
    pub fn new(cluster: impl Into<String>, namespace: impl Into<String>) -> Result<Self> {
        let cluster = cluster.into();
        let namespace = namespace.into();
        validate_component(&cluster)?;
        validate_component(&namespace)?;
        Ok(Self { cluster, namespace })
    }

    pub fn file_name(&self) -> String {
        format!(
            "{}{d}{}{d}{}",
            FILE_PREFIX,
            escape(&self.cluster),
            escape(&self.namespace),
            d = KEY_DELIMITER
        )
    }

    /// Decode a file name. Anything that is not exactly
    /// `config|<cluster>|<namespace>` with valid, canonically escaped
    /// components yields `None`.
    pub fn from_file_name(name: &str) -> Option<Self> {
        let mut parts = name.split(KEY_DELIMITER);
        let prefix = parts.next()?;
        let cluster = unescape(parts.next()?)?;
        let namespace = unescape(parts.next()?)?;
        if prefix != FILE_PREFIX || parts.next().is_some() {
            return None;
        }
        let key = Self::new(cluster, namespace).ok()?;
        // `%41` and `A` would otherwise both decode to the same key.
        (key.file_name() == name).then_some(key)
    }

    /// Whether a file name claims to be a store entry (prefix + delimiter),
    /// regardless of whether it decodes.
    pub fn looks_like_entry(name: &str) -> bool {
        name.strip_prefix(FILE_PREFIX)
            .map(|rest| rest.starts_with(KEY_DELIMITER))
            .unwrap_or(false)
    }
}

impl fmt::Display for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.cluster, self.namespace)
    }
}

fn escape(component: &str) -> String {
    utf8_percent_encode(component, COMPONENT_ESCAPE).to_string()
}

fn unescape(encoded: &str) -> Option<String> {
    percent_decode_str(encoded)
        .decode_utf8()
        .ok()
        .map(|s| s.into_owned())
}

pub fn validate_component(value: &str) -> Result<()> {
    let reason = if value.is_empty() {
        Some("cannot be empty")
    } else if value.chars().any(|c| c.is_control()) {
        Some("control characters are not allowed")
    } else {
        None
    };
    match reason {
        Some(reason) => Err(StoreError::InvalidKey {
            value: value.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}

/// clap value parser for cluster and namespace arguments.
pub fn parse_key_component(s: &str) -> std::result::Result<String, String> {
    validate_component(s).map_err(|e| match e {
        StoreError::InvalidKey { reason, .. } => reason.to_string(),
        other => other.to_string(),
    })?;
    Ok(s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_name() {
        let key = StoreKey::new("prod", "kube-system").unwrap();
        assert_eq!(key.file_name(), "config|prod|kube-system");
    }

    #[test]
    fn test_from_file_name() {
        let key = StoreKey::from_file_name("config|c1|dev").unwrap();
        assert_eq!(key.cluster, "c1");
        assert_eq!(key.namespace, "dev");
        assert_eq!(StoreKey::from_file_name(&key.file_name()), Some(key));
    }

    #[test]
    fn test_eks_arn_cluster_is_escaped() {
        let arn = "arn:aws:eks:eu-west-1:123456789012:cluster/prod";
        let key = StoreKey::new(arn, "dev").unwrap();
        let name = key.file_name();
        assert_eq!(name, "config|arn:aws:eks:eu-west-1:123456789012:cluster%2Fprod|dev");
        assert!(!name.contains('/'));
        assert_eq!(StoreKey::from_file_name(&name), Some(key));
    }

    #[test]
    fn test_delimiter_and_percent_are_escaped() {
        let key = StoreKey::new("a|b", "100%").unwrap();
        assert_eq!(key.file_name(), "config|a%7Cb|100%25");
        assert_eq!(StoreKey::from_file_name(&key.file_name()), Some(key));
    }

    #[test]
    fn test_from_file_name_rejects_foreign() {
        assert!(StoreKey::from_file_name("config").is_none());
        assert!(StoreKey::from_file_name("config|c1").is_none());
        assert!(StoreKey::from_file_name("config|c1|dev|extra").is_none());
        assert!(StoreKey::from_file_name("other|c1|dev").is_none());
        assert!(StoreKey::from_file_name("config||dev").is_none());
        assert!(StoreKey::from_file_name("kcc.toml").is_none());
    }

    #[test]
    fn test_from_file_name_rejects_non_canonical_escapes() {
        assert!(StoreKey::from_file_name("config|%41|dev").is_none());
        assert!(StoreKey::from_file_name("config|a%2fb|dev").is_none());
        assert!(StoreKey::from_file_name("config|%FF|dev").is_none());
    }

    #[test]
    fn test_looks_like_entry() {
        assert!(StoreKey::looks_like_entry("config|c1"));
        assert!(StoreKey::looks_like_entry("config|c1|dev"));
        assert!(!StoreKey::looks_like_entry("config"));
        assert!(!StoreKey::looks_like_entry("config.bak"));
    }

    #[test]
    fn test_validate_component() {
        assert!(validate_component("my-cluster.example.com").is_ok());
        assert!(validate_component("arn:aws:eks:eu-west-1:1:cluster/x").is_ok());
        assert!(validate_component("a|b").is_ok());
        assert!(validate_component("").is_err());
        assert!(validate_component("a\nb").is_err());
    }

    #[test]
    fn test_parse_key_component_message() {
        assert_eq!(parse_key_component("").unwrap_err(), "cannot be empty");
        assert_eq!(parse_key_component("dev").unwrap(), "dev");
    }
}
