//! Directory-backed store of single-context kubeconfig files.
//!
//! Every file is named `config|{cluster}|{namespace}` and lives directly in
//! the base directory. Listing works from file names only.

use crate::constants;
use crate::error::{Result, StoreError};
use crate::models::key::StoreKey;
use crate::models::kubeconfig::KubeConfig;
use crate::util::fs as store_fs;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Cluster name to the namespaces stored for it.
pub type ClusterIndex = BTreeMap<String, BTreeSet<String>>;

#[derive(Debug, Clone)]
pub struct ConfigStore {
    root: PathBuf,
}

impl ConfigStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, key: &StoreKey) -> PathBuf {
        self.root.join(key.file_name())
    }

    pub fn exists(&self, key: &StoreKey) -> bool {
        self.path_for(key).is_file()
    }

    /// Serialize `doc` to the keyed file, replacing any existing one.
    pub fn write(&self, key: &StoreKey, doc: &KubeConfig) -> Result<PathBuf> {
        store_fs::ensure_dir(&self.root, constants::KUBE_DIR_MODE)?;
        let content = serde_yaml::to_string(doc)?;
        let path = self.path_for(key);
        store_fs::write_atomic(&path, content.as_bytes(), constants::CONFIG_FILE_MODE)?;
        debug!(key = %key, path = %path.display(), "wrote config");
        Ok(path)
    }

    pub fn load(&self, key: &StoreKey) -> Result<KubeConfig> {
        let path = self.path_for(key);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StoreError::NotFound(format!("no config stored for {}", key)));
            }
            Err(e) => return Err(StoreError::io("read", &path, e)),
        };
        let doc: KubeConfig =
            serde_yaml::from_str(&content).map_err(|e| StoreError::parse(&path, e))?;
        if !doc.is_single_context() {
            return Err(StoreError::parse(
                &path,
                "expected exactly one cluster, one user and one context",
            ));
        }
        Ok(doc)
    }

    pub fn delete(&self, key: &StoreKey) -> Result<()> {
        let path = self.path_for(key);
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!(key = %key, "removed config");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(StoreError::NotFound(format!("no config stored for {}", key)))
            }
            Err(e) => Err(StoreError::io("remove", &path, e)),
        }
    }

    /// All stored keys, optionally restricted to one cluster.
    pub fn list(&self, cluster: Option<&str>) -> Result<ClusterIndex> {
        let mut index = ClusterIndex::new();
        for key in self.keys()? {
            if cluster.is_some_and(|c| c != key.cluster) {
                continue;
            }
            index.entry(key.cluster).or_default().insert(key.namespace);
        }
        Ok(index)
    }

    /// Namespaces stored under `cluster`; `NotFound` when there are none.
    pub fn namespaces(&self, cluster: &str) -> Result<BTreeSet<String>> {
        self.list(Some(cluster))?
            .remove(cluster)
            .ok_or_else(|| StoreError::NotFound(format!("cluster '{}' has no stored configs", cluster)))
    }

    /// Move every namespace file of `old` under `new`, rewriting the cluster
    /// name inside each document. Files already moved stay moved if a later
    /// one fails.
    pub fn rename(&self, old: &str, new: &str) -> Result<Vec<StoreKey>> {
        if old == new {
            return Err(StoreError::Conflict(format!(
                "cluster '{}' cannot be renamed to itself",
                old
            )));
        }
        let namespaces = self.namespaces(old)?;
        if self.list(Some(new))?.contains_key(new) {
            return Err(StoreError::Conflict(format!(
                "cluster '{}' already has stored configs",
                new
            )));
        }

        let mut moved = Vec::with_capacity(namespaces.len());
        for namespace in namespaces {
            let old_key = StoreKey::new(old, namespace.as_str())?;
            let new_key = StoreKey::new(new, namespace.as_str())?;
            let mut doc = self.load(&old_key)?;
            rename_cluster_in(&mut doc, new);
            self.write(&new_key, &doc)?;
            self.delete(&old_key)?;
            info!(from = %old_key, to = %new_key, "renamed config");
            moved.push(new_key);
        }
        Ok(moved)
    }

    /// Remove every namespace file of `cluster`.
    pub fn delete_cluster(&self, cluster: &str) -> Result<Vec<StoreKey>> {
        let namespaces = self.namespaces(cluster)?;
        let mut removed = Vec::with_capacity(namespaces.len());
        for namespace in namespaces {
            let key = StoreKey::new(cluster, namespace)?;
            self.delete(&key)?;
            removed.push(key);
        }
        Ok(removed)
    }

    /// Store a copy of the cluster's config bound to `namespace`. The
    /// `default` namespace file is the template when present, otherwise the
    /// first stored namespace.
    pub fn add_namespace(&self, cluster: &str, namespace: &str) -> Result<StoreKey> {
        let key = StoreKey::new(cluster, namespace)?;
        let namespaces = self.namespaces(cluster)?;
        let template = if namespaces.contains(constants::DEFAULT_NAMESPACE) {
            constants::DEFAULT_NAMESPACE
        } else {
            namespaces
                .iter()
                .next()
                .map(String::as_str)
                .unwrap_or(constants::DEFAULT_NAMESPACE)
        };
        let mut doc = self.load(&StoreKey::new(cluster, template)?)?;
        if let Some(ctx) = doc.contexts.first_mut() {
            ctx.context.namespace = Some(namespace.to_string());
        }
        if self.exists(&key) {
            debug!(key = %key, "overwriting existing namespace config");
        }
        self.write(&key, &doc)?;
        Ok(key)
    }

    /// File names that carry the store prefix but do not decode to a key.
    pub fn stray_entries(&self) -> Result<Vec<String>> {
        let mut stray: Vec<String> = self
            .file_names()?
            .into_iter()
            .filter(|name| StoreKey::looks_like_entry(name) && StoreKey::from_file_name(name).is_none())
            .collect();
        stray.sort();
        Ok(stray)
    }

    /// Every decodable key in the base directory, in order.
    pub fn keys(&self) -> Result<Vec<StoreKey>> {
        let mut keys = Vec::new();
        for name in self.file_names()? {
            match StoreKey::from_file_name(&name) {
                Some(key) => keys.push(key),
                None if StoreKey::looks_like_entry(&name) => {
                    warn!(file = %name, "ignoring file with malformed store name");
                }
                None => {}
            }
        }
        keys.sort();
        Ok(keys)
    }

    fn file_names(&self) -> Result<Vec<String>> {
        let dir = match fs::read_dir(&self.root) {
            Ok(dir) => dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io("open directory", &self.root, e)),
        };
        let mut names = Vec::new();
        for entry in dir {
            let entry = entry.map_err(|e| StoreError::io("read directory", &self.root, e))?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            if let Some(name) = path.file_name().and_then(|s| s.to_str()) {
                names.push(name.to_string());
            }
        }
        Ok(names)
    }
}

/// Point a single-context document at a new cluster name. The context takes
/// the cluster's name too.
fn rename_cluster_in(doc: &mut KubeConfig, new: &str) {
    for cluster in &mut doc.clusters {
        cluster.name = new.to_string();
    }
    for ctx in &mut doc.contexts {
        ctx.context.cluster = new.to_string();
        ctx.name = new.to_string();
    }
    doc.current_context = Some(new.to_string());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::kubeconfig::{ClusterRef, NamedCluster, NamedUser};
    use serde_yaml::Mapping;
    use tempfile::TempDir;

    fn test_store() -> (TempDir, ConfigStore) {
        let dir = TempDir::new().unwrap();
        let store = ConfigStore::new(dir.path().join(".kube"));
        (dir, store)
    }

    fn doc(cluster: &str, context: &str, namespace: &str) -> KubeConfig {
        let mut user = Mapping::new();
        user.insert("token".into(), "secret".into());
        KubeConfig::single(
            NamedCluster {
                name: cluster.to_string(),
                cluster: ClusterRef {
                    certificate_authority_data: Some("Q0E=".into()),
                    server: "https://h:6443".into(),
                    ..Default::default()
                },
            },
            NamedUser {
                name: "u1".into(),
                user,
            },
            context,
            namespace,
        )
    }

    fn put(store: &ConfigStore, cluster: &str, namespace: &str) -> StoreKey {
        let key = StoreKey::new(cluster, namespace).unwrap();
        store.write(&key, &doc(cluster, "ctx1", namespace)).unwrap();
        key
    }

    #[test]
    fn test_write_then_load_roundtrip() {
        let (_dir, store) = test_store();
        let key = StoreKey::new("c1", "dev").unwrap();
        let original = doc("c1", "ctx1", "dev");
        let path = store.write(&key, &original).unwrap();
        assert!(path.ends_with("config|c1|dev"));
        assert_eq!(store.load(&key).unwrap(), original);
    }

    #[test]
    fn test_write_overwrites() {
        let (_dir, store) = test_store();
        let key = StoreKey::new("c1", "dev").unwrap();
        store.write(&key, &doc("c1", "first", "dev")).unwrap();
        store.write(&key, &doc("c1", "second", "dev")).unwrap();
        let loaded = store.load(&key).unwrap();
        assert_eq!(loaded.current_context.as_deref(), Some("second"));
    }

    #[test]
    fn test_load_missing_is_not_found() {
        let (_dir, store) = test_store();
        let err = store.load(&StoreKey::new("c1", "dev").unwrap()).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_load_rejects_multi_context_file() {
        let (_dir, store) = test_store();
        let key = put(&store, "c1", "dev");
        let mut two = doc("c1", "ctx1", "dev");
        two.contexts.push(two.contexts[0].clone());
        fs::write(store.path_for(&key), serde_yaml::to_string(&two).unwrap()).unwrap();
        assert!(matches!(store.load(&key), Err(StoreError::Parse { .. })));
    }

    #[test]
    fn test_load_malformed_is_parse_error() {
        let (_dir, store) = test_store();
        let key = put(&store, "c1", "dev");
        fs::write(store.path_for(&key), "clusters: [unterminated").unwrap();
        assert!(matches!(store.load(&key), Err(StoreError::Parse { .. })));
    }

    #[test]
    fn test_delete_missing_is_not_found() {
        let (_dir, store) = test_store();
        put(&store, "c1", "dev");
        let err = store.delete(&StoreKey::new("c1", "prod").unwrap()).unwrap_err();
        assert!(err.is_not_found());
        store.delete(&StoreKey::new("c1", "dev").unwrap()).unwrap();
        assert!(store.list(None).unwrap().is_empty());
    }

    #[test]
    fn test_list_groups_by_cluster() {
        let (_dir, store) = test_store();
        put(&store, "X", "b");
        put(&store, "Y", "default");
        put(&store, "X", "a");

        let all = store.list(None).unwrap();
        assert_eq!(all.len(), 2);
        let x: Vec<_> = all["X"].iter().cloned().collect();
        assert_eq!(x, vec!["a", "b"]);

        let only_x = store.list(Some("X")).unwrap();
        assert_eq!(only_x.len(), 1);
        assert!(only_x.contains_key("X"));
    }

    #[test]
    fn test_list_missing_dir_is_empty() {
        let (_dir, store) = test_store();
        assert!(store.list(None).unwrap().is_empty());
    }

    #[test]
    fn test_list_ignores_foreign_files() {
        let (_dir, store) = test_store();
        put(&store, "X", "a");
        fs::write(store.root().join("config"), "apiVersion: v1\n").unwrap();
        fs::write(store.root().join("config|broken"), "").unwrap();
        fs::write(store.root().join("kcc.toml"), "").unwrap();
        fs::create_dir(store.root().join("config|dir|ns")).unwrap();

        let all = store.list(None).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(store.stray_entries().unwrap(), vec!["config|broken".to_string()]);
    }

    #[test]
    fn test_rename_moves_all_namespaces() {
        let (_dir, store) = test_store();
        put(&store, "X", "default");
        put(&store, "X", "dev");
        put(&store, "Z", "default");

        let moved = store.rename("X", "Y").unwrap();
        assert_eq!(moved.len(), 2);

        let all = store.list(None).unwrap();
        assert!(!all.contains_key("X"));
        let y: Vec<_> = all["Y"].iter().cloned().collect();
        assert_eq!(y, vec!["default", "dev"]);
        assert!(all.contains_key("Z"));

        let loaded = store.load(&StoreKey::new("Y", "dev").unwrap()).unwrap();
        assert_eq!(loaded.clusters[0].name, "Y");
        assert_eq!(loaded.contexts[0].context.cluster, "Y");
        assert_eq!(loaded.contexts[0].context.namespace(), "dev");
        assert_eq!(loaded.current_context.as_deref(), Some("Y"));
        assert_eq!(loaded.users[0].name, "u1");
    }

    #[test]
    fn test_rename_unknown_cluster_is_not_found() {
        let (_dir, store) = test_store();
        assert!(store.rename("X", "Y").unwrap_err().is_not_found());
    }

    #[test]
    fn test_rename_onto_existing_cluster_conflicts() {
        let (_dir, store) = test_store();
        put(&store, "X", "default");
        put(&store, "Y", "default");
        assert!(matches!(store.rename("X", "Y"), Err(StoreError::Conflict(_))));
        assert!(matches!(store.rename("X", "X"), Err(StoreError::Conflict(_))));
        assert_eq!(store.list(None).unwrap().len(), 2);
    }

    #[test]
    fn test_rename_rejects_invalid_name() {
        let (_dir, store) = test_store();
        put(&store, "X", "default");
        assert!(matches!(store.rename("X", "bad\nname"), Err(StoreError::InvalidKey { .. })));
        assert!(store.list(None).unwrap().contains_key("X"));
    }

    #[test]
    fn test_cluster_name_with_slash_roundtrips() {
        let (_dir, store) = test_store();
        let arn = "arn:aws:eks:eu-west-1:123456789012:cluster/prod";
        let key = put(&store, arn, "dev");
        assert!(store.path_for(&key).parent() == Some(store.root()));
        let all = store.list(None).unwrap();
        assert!(all[arn].contains("dev"));
        assert_eq!(store.load(&key).unwrap().clusters[0].name, arn);

        store.rename(arn, "prod").unwrap();
        let all = store.list(None).unwrap();
        assert!(!all.contains_key(arn));
        assert!(all["prod"].contains("dev"));
    }

    #[test]
    fn test_delete_cluster() {
        let (_dir, store) = test_store();
        put(&store, "X", "default");
        put(&store, "X", "dev");
        put(&store, "Y", "dev");
        let removed = store.delete_cluster("X").unwrap();
        assert_eq!(removed.len(), 2);
        let all = store.list(None).unwrap();
        assert!(!all.contains_key("X"));
        assert!(all.contains_key("Y"));
        assert!(store.delete_cluster("X").unwrap_err().is_not_found());
    }

    #[test]
    fn test_add_namespace_uses_default_template() {
        let (_dir, store) = test_store();
        put(&store, "X", "default");
        let key = store.add_namespace("X", "staging").unwrap();
        assert_eq!(key, StoreKey::new("X", "staging").unwrap());
        let loaded = store.load(&key).unwrap();
        assert_eq!(loaded.contexts[0].context.namespace(), "staging");
        assert_eq!(loaded.contexts[0].name, "ctx1");
        assert_eq!(loaded.clusters[0].name, "X");
    }

    #[test]
    fn test_add_namespace_falls_back_to_first_namespace() {
        let (_dir, store) = test_store();
        put(&store, "X", "dev");
        store.add_namespace("X", "qa").unwrap();
        let ns: Vec<_> = store.namespaces("X").unwrap().into_iter().collect();
        assert_eq!(ns, vec!["dev", "qa"]);
    }

    #[test]
    fn test_add_namespace_unknown_cluster() {
        let (_dir, store) = test_store();
        assert!(store.add_namespace("X", "dev").unwrap_err().is_not_found());
    }
}
