//! Kubeconfig document model.
//!
//! Only the fields the store needs are typed; everything else on clusters,
//! users and contexts is carried through untouched.

use crate::constants;
use serde::{Deserialize, Deserializer, Serialize};
use serde_yaml::Mapping;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct KubeConfig {
    #[serde(rename = "apiVersion", default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub preferences: Mapping,
    #[serde(default, deserialize_with = "null_as_default")]
    pub clusters: Vec<NamedCluster>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub users: Vec<NamedUser>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub contexts: Vec<NamedContext>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_context: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedCluster {
    pub name: String,
    pub cluster: ClusterRef,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ClusterRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate_authority_data: Option<String>,
    /// Path to a CA file; replaced by inline data when splitting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate_authority: Option<String>,
    #[serde(default)]
    pub server: String,
    #[serde(flatten)]
    pub extra: Mapping,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedUser {
    pub name: String,
    /// Credential payload, never inspected.
    #[serde(default, deserialize_with = "null_as_default")]
    pub user: Mapping,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedContext {
    pub name: String,
    pub context: ContextRef,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextRef {
    pub cluster: String,
    pub user: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(flatten)]
    pub extra: Mapping,
}

impl ContextRef {
    /// Namespace of the context, `default` when unset or empty.
    pub fn namespace(&self) -> &str {
        match self.namespace.as_deref() {
            Some(ns) if !ns.is_empty() => ns,
            _ => constants::DEFAULT_NAMESPACE,
        }
    }
}

impl KubeConfig {
    /// Build a document holding exactly one cluster, user and context, with
    /// `current-context` pointing at that context.
    pub fn single(
        cluster: NamedCluster,
        user: NamedUser,
        context_name: &str,
        namespace: &str,
    ) -> Self {
        let context = NamedContext {
            name: context_name.to_string(),
            context: ContextRef {
                cluster: cluster.name.clone(),
                user: user.name.clone(),
                namespace: Some(namespace.to_string()),
                extra: Mapping::new(),
            },
        };
        Self {
            api_version: Some(constants::KUBECONFIG_API_VERSION.to_string()),
            kind: Some(constants::KUBECONFIG_KIND.to_string()),
            preferences: Mapping::new(),
            clusters: vec![cluster],
            users: vec![user],
            current_context: Some(context.name.clone()),
            contexts: vec![context],
        }
    }

    pub fn find_cluster(&self, name: &str) -> Option<&NamedCluster> {
        self.clusters.iter().find(|c| c.name == name)
    }

    pub fn find_user(&self, name: &str) -> Option<&NamedUser> {
        self.users.iter().find(|u| u.name == name)
    }

    /// Whether this is a stored single-context document.
    pub fn is_single_context(&self) -> bool {
        self.clusters.len() == 1 && self.users.len() == 1 && self.contexts.len() == 1
    }

    /// The context a single-context document describes.
    pub fn context(&self) -> Option<&NamedContext> {
        self.contexts.first()
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
