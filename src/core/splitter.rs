//! Turn one multi-context kubeconfig into single-context documents keyed by
//! cluster and namespace.

use crate::constants;
use crate::error::{ReferenceKind, Result, StoreError};
use crate::models::key::StoreKey;
use crate::models::kubeconfig::{KubeConfig, NamedCluster, NamedContext};
use base64::{engine::general_purpose, Engine as _};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct SplitOptions {
    /// Store every non-default-namespace context under `default` as well.
    pub duplicate_to_default: bool,
    /// Directory relative `certificate-authority` paths resolve against.
    pub base_dir: Option<PathBuf>,
}

impl Default for SplitOptions {
    fn default() -> Self {
        Self {
            duplicate_to_default: true,
            base_dir: None,
        }
    }
}

pub struct Splitter {
    options: SplitOptions,
}

impl Splitter {
    pub fn new(options: SplitOptions) -> Self {
        Self { options }
    }

    /// Produce one document per key. When two contexts land on the same key
    /// the later one wins.
    pub fn split(&self, source: &KubeConfig) -> Result<Vec<(StoreKey, KubeConfig)>> {
        let mut clusters: HashMap<&str, NamedCluster> = HashMap::new();
        let mut out: Vec<(StoreKey, KubeConfig)> = Vec::new();

        for ctx in &source.contexts {
            let cluster = match clusters.get(ctx.context.cluster.as_str()) {
                Some(cluster) => cluster.clone(),
                None => {
                    let found = source
                        .find_cluster(&ctx.context.cluster)
                        .ok_or_else(|| missing(ctx, ReferenceKind::Cluster, &ctx.context.cluster))?;
                    let resolved = self.resolve_cluster(found)?;
                    clusters.insert(found.name.as_str(), resolved.clone());
                    resolved
                }
            };
            let user = source
                .find_user(&ctx.context.user)
                .ok_or_else(|| missing(ctx, ReferenceKind::User, &ctx.context.user))?;

            let namespace = ctx.context.namespace();
            let mut namespaces = Vec::with_capacity(2);
            if self.options.duplicate_to_default && namespace != constants::DEFAULT_NAMESPACE {
                namespaces.push(constants::DEFAULT_NAMESPACE);
            }
            namespaces.push(namespace);

            for ns in namespaces {
                let key = StoreKey::new(cluster.name.as_str(), ns)?;
                let mut doc = KubeConfig::single(cluster.clone(), user.clone(), &ctx.name, ns);
                if let Some(single) = doc.contexts.first_mut() {
                    single.context.extra = ctx.context.extra.clone();
                }
                match out.iter_mut().find(|(k, _)| *k == key) {
                    Some(slot) => {
                        warn!(key = %key, context = %ctx.name, "context replaces an earlier one for the same key");
                        slot.1 = doc;
                    }
                    None => {
                        debug!(key = %key, context = %ctx.name, "split context");
                        out.push((key, doc));
                    }
                }
            }
        }
        Ok(out)
    }

    fn resolve_cluster(&self, cluster: &NamedCluster) -> Result<NamedCluster> {
        let mut resolved = cluster.clone();
        if let Some(ca_path) = resolved.cluster.certificate_authority.take() {
            let path = self.resolve_path(&ca_path);
            let data = fs::read(&path).map_err(|e| StoreError::io("read certificate authority", &path, e))?;
            resolved.cluster.certificate_authority_data = Some(general_purpose::STANDARD.encode(data));
            debug!(cluster = %resolved.name, path = %path.display(), "inlined certificate authority");
        }
        Ok(resolved)
    }

    fn resolve_path(&self, raw: &str) -> PathBuf {
        let path = Path::new(raw);
        match &self.options.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }
}

fn missing(ctx: &NamedContext, kind: ReferenceKind, name: &str) -> StoreError {
    StoreError::MissingReference {
        context: ctx.name.clone(),
        kind,
        name: name.to_string(),
    }
}

/// Read and parse a multi-context source document.
pub fn load_source(path: &Path) -> Result<KubeConfig> {
    let content = fs::read_to_string(path).map_err(|e| StoreError::io("read", path, e))?;
    serde_yaml::from_str(&content).map_err(|e| StoreError::parse(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::store::ConfigStore;
    use tempfile::TempDir;

    const FIXTURE: &str = include_str!("../../tests/fixtures/kubeconfig.yaml");

    const EXAMPLE: &str = r#"
clusters:
- name: c1
  cluster:
    server: https://h:6443
    certificate-authority-data: Q0E=
users:
- name: u1
  user:
    token: t
contexts:
- name: ctx1
  context:
    cluster: c1
    user: u1
    namespace: dev
"#;

    fn parse(yaml: &str) -> KubeConfig {
        serde_yaml::from_str(yaml).unwrap()
    }

    fn keys(out: &[(StoreKey, KubeConfig)]) -> Vec<String> {
        out.iter().map(|(k, _)| k.file_name()).collect()
    }

    #[test]
    fn test_non_default_namespace_yields_two_documents() {
        let out = Splitter::new(SplitOptions::default()).split(&parse(EXAMPLE)).unwrap();
        assert_eq!(keys(&out), vec!["config|c1|default", "config|c1|dev"]);
        for (key, doc) in &out {
            assert!(doc.is_single_context());
            assert_eq!(doc.current_context.as_deref(), Some("ctx1"));
            assert_eq!(doc.clusters[0].cluster.server, "https://h:6443");
            assert_eq!(doc.contexts[0].context.namespace(), key.namespace);
        }
    }

    #[test]
    fn test_duplicate_policy_off_yields_one_document() {
        let options = SplitOptions {
            duplicate_to_default: false,
            ..Default::default()
        };
        let out = Splitter::new(options).split(&parse(EXAMPLE)).unwrap();
        assert_eq!(keys(&out), vec!["config|c1|dev"]);
    }

    #[test]
    fn test_fixture_split() {
        let out = Splitter::new(SplitOptions::default()).split(&parse(FIXTURE)).unwrap();
        assert_eq!(
            keys(&out),
            vec!["config|c1|default", "config|c1|dev", "config|c2|default"]
        );
        let (_, c2) = &out[2];
        assert_eq!(c2.users[0].name, "u2");
        assert_eq!(c2.clusters[0].cluster.extra.len(), 1);
    }

    #[test]
    fn test_missing_cluster_reference() {
        let yaml = EXAMPLE.replace("cluster: c1\n    user", "cluster: nope\n    user");
        let err = Splitter::new(SplitOptions::default()).split(&parse(&yaml)).unwrap_err();
        assert!(matches!(
            err,
            StoreError::MissingReference { kind: ReferenceKind::Cluster, ref name, .. } if name == "nope"
        ));
    }

    #[test]
    fn test_missing_user_reference() {
        let yaml = EXAMPLE.replace("user: u1", "user: ghost");
        let err = Splitter::new(SplitOptions::default()).split(&parse(&yaml)).unwrap_err();
        assert!(matches!(
            err,
            StoreError::MissingReference { kind: ReferenceKind::User, ref name, .. } if name == "ghost"
        ));
    }

    #[test]
    fn test_ca_file_is_inlined() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("ca.crt"), b"CA").unwrap();
        let yaml = EXAMPLE.replace("certificate-authority-data: Q0E=", "certificate-authority: ca.crt");
        let options = SplitOptions {
            duplicate_to_default: false,
            base_dir: Some(dir.path().to_path_buf()),
        };
        let out = Splitter::new(options).split(&parse(&yaml)).unwrap();
        let cluster = &out[0].1.clusters[0].cluster;
        assert_eq!(cluster.certificate_authority_data.as_deref(), Some("Q0E="));
        assert!(cluster.certificate_authority.is_none());
    }

    #[test]
    fn test_missing_ca_file_is_io_error() {
        let yaml = EXAMPLE.replace(
            "certificate-authority-data: Q0E=",
            "certificate-authority: /nonexistent/ca.crt",
        );
        let err = Splitter::new(SplitOptions::default()).split(&parse(&yaml)).unwrap_err();
        assert!(matches!(err, StoreError::Io { .. }));
    }

    #[test]
    fn test_later_context_wins_on_same_key() {
        let yaml = format!(
            "{}- name: ctx1b\n  context:\n    cluster: c1\n    user: u1\n    namespace: dev\n",
            EXAMPLE
        );
        let out = Splitter::new(SplitOptions::default()).split(&parse(&yaml)).unwrap();
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|(_, d)| d.current_context.as_deref() == Some("ctx1b")));
    }

    #[test]
    fn test_split_then_store() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("config");
        fs::write(&source, EXAMPLE).unwrap();
        let store = ConfigStore::new(dir.path());

        let doc = load_source(&source).unwrap();
        for (key, single) in Splitter::new(SplitOptions::default()).split(&doc).unwrap() {
            store.write(&key, &single).unwrap();
        }

        let index = store.list(None).unwrap();
        let ns: Vec<_> = index["c1"].iter().cloned().collect();
        assert_eq!(ns, vec!["default", "dev"]);
        let text = fs::read_to_string(dir.path().join("config|c1|dev")).unwrap();
        assert!(text.contains("current-context: ctx1"));
    }

    #[test]
    fn test_load_source_parse_error() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("config");
        fs::write(&source, "contexts: {not: [a list").unwrap();
        assert!(matches!(load_source(&source), Err(StoreError::Parse { .. })));
    }
}
