use pkg_types::query::QueryConfig;
use pkg_types::rbac::{Binding, NamespacedName, Permissions, Role, Rule, Subject, SubjectKind};
use serde::Deserialize;
use serde_json::Value;
use std::io::Read;
use thiserror::Error;
use tracing::warn;

/// Errors that abort a load. Malformed RBAC input is an unrecoverable input
/// problem; only unrecognized resource kinds are skipped.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("input is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("expected kind=List, but found {found}")]
    NotAList { found: String },
    #[error("List has no items array")]
    MissingItems,
    #[error("item {index} has no kind")]
    MissingKind { index: usize },
    #[error("item {index} has malformed metadata: {source}")]
    Metadata {
        index: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("{kind} {name} is malformed: {source}")]
    Item {
        kind: String,
        name: String,
        #[source]
        source: serde_json::Error,
    },
}

// Wire shapes of the fields we consume from the standard Kubernetes
// resource JSON. `Option` mirrors fields that may be absent or null;
// everything else is required and a decode failure is fatal.

#[derive(Deserialize)]
struct Metadata {
    name: String,
    namespace: Option<String>,
}

#[derive(Deserialize)]
struct RoleManifest {
    rules: Vec<RuleManifest>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RuleManifest {
    verbs: Option<Vec<String>>,
    resources: Option<Vec<String>>,
    resource_names: Option<Vec<String>>,
    #[serde(rename = "nonResourceURLs")]
    non_resource_urls: Option<Vec<String>>,
    api_groups: Option<Vec<String>>,
}

impl From<RuleManifest> for Rule {
    fn from(manifest: RuleManifest) -> Self {
        Rule {
            verbs: manifest.verbs.unwrap_or_default(),
            resources: manifest.resources.unwrap_or_default(),
            resource_names: manifest.resource_names.unwrap_or_default(),
            non_resource_urls: manifest.non_resource_urls.unwrap_or_default(),
            api_groups: manifest.api_groups.unwrap_or_default(),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BindingManifest {
    role_ref: RoleRefManifest,
    subjects: Option<Vec<SubjectManifest>>,
}

#[derive(Deserialize)]
struct RoleRefManifest {
    name: String,
    namespace: Option<String>,
}

#[derive(Deserialize)]
struct SubjectManifest {
    kind: SubjectKind,
    name: String,
    namespace: Option<String>,
}

impl From<SubjectManifest> for Subject {
    fn from(manifest: SubjectManifest) -> Self {
        Subject {
            kind: manifest.kind,
            namespace: manifest.namespace.unwrap_or_default(),
            name: manifest.name,
        }
    }
}

/// Parse a Kubernetes `List` document into the permission model. Resources
/// (and binding subjects) whose names match an ignored prefix never enter
/// the model; downstream code does not need to re-apply the filter.
pub fn load<R: Read>(reader: R, config: &QueryConfig) -> Result<Permissions, LoadError> {
    let doc: Value = serde_json::from_reader(reader)?;
    parse_document(doc, config)
}

pub fn load_str(input: &str, config: &QueryConfig) -> Result<Permissions, LoadError> {
    let doc: Value = serde_json::from_str(input)?;
    parse_document(doc, config)
}

fn parse_document(doc: Value, config: &QueryConfig) -> Result<Permissions, LoadError> {
    let kind = doc.get("kind").cloned().unwrap_or(Value::Null);
    if kind.as_str() != Some("List") {
        let found = match kind {
            Value::String(s) => s,
            other => other.to_string(),
        };
        return Err(LoadError::NotAList { found });
    }

    let items = doc
        .get("items")
        .and_then(Value::as_array)
        .ok_or(LoadError::MissingItems)?;

    let mut permissions = Permissions::default();
    for (index, item) in items.iter().enumerate() {
        let kind = item
            .get("kind")
            .and_then(Value::as_str)
            .ok_or(LoadError::MissingKind { index })?;

        let metadata: Metadata =
            serde_json::from_value(item.get("metadata").cloned().unwrap_or(Value::Null))
                .map_err(|source| LoadError::Metadata { index, source })?;
        let namespace = metadata.namespace.unwrap_or_default();
        let name = metadata.name;

        if config.ignored(&name) {
            continue;
        }

        match kind {
            "ServiceAccount" => {
                permissions
                    .service_accounts
                    .entry(namespace)
                    .or_default()
                    .insert(name, item.clone());
            }
            "Role" | "ClusterRole" => {
                let manifest: RoleManifest =
                    serde_json::from_value(item.clone()).map_err(|source| LoadError::Item {
                        kind: kind.to_string(),
                        name: name.clone(),
                        source,
                    })?;
                let role = Role {
                    namespace: namespace.clone(),
                    name: name.clone(),
                    rules: manifest.rules.into_iter().map(Rule::from).collect(),
                };
                permissions
                    .roles
                    .entry(namespace)
                    .or_default()
                    .insert(name, role);
            }
            "RoleBinding" | "ClusterRoleBinding" => {
                let manifest: BindingManifest =
                    serde_json::from_value(item.clone()).map_err(|source| LoadError::Item {
                        kind: kind.to_string(),
                        name: name.clone(),
                        source,
                    })?;
                let subjects = manifest
                    .subjects
                    .unwrap_or_default()
                    .into_iter()
                    .map(Subject::from)
                    .filter(|subject| !config.ignored(&subject.name))
                    .collect();
                let binding = Binding {
                    namespace: namespace.clone(),
                    name: name.clone(),
                    role: NamespacedName::new(
                        manifest.role_ref.namespace.unwrap_or_default(),
                        manifest.role_ref.name,
                    ),
                    subjects,
                };
                permissions
                    .role_bindings
                    .entry(namespace)
                    .or_default()
                    .insert(name, binding);
            }
            other => warn!("ignoring resource kind {other}"),
        }
    }
    Ok(permissions)
}
