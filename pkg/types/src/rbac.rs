use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

// --- Identity ---

/// Namespace + name identity. An empty namespace means cluster scope.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NamespacedName {
    #[serde(default)]
    pub namespace: String,
    pub name: String,
}

impl NamespacedName {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    pub fn cluster_scoped(name: impl Into<String>) -> Self {
        Self {
            namespace: String::new(),
            name: name.into(),
        }
    }

    pub fn is_cluster_scoped(&self) -> bool {
        self.namespace.is_empty()
    }
}

impl fmt::Display for NamespacedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}/{}", self.namespace, self.name)
        }
    }
}

// --- Subject ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubjectKind {
    ServiceAccount,
    User,
    Group,
}

impl fmt::Display for SubjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubjectKind::ServiceAccount => write!(f, "ServiceAccount"),
            SubjectKind::User => write!(f, "User"),
            SubjectKind::Group => write!(f, "Group"),
        }
    }
}

/// A binding subject: an identity a role can be granted to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub kind: SubjectKind,
    #[serde(default)]
    pub namespace: String,
    pub name: String,
}

// --- Access rule ---

/// A single grant of verbs over resources. An empty list means the field is
/// unspecified, which is not the same as a `"*"` entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub verbs: Vec<String>,
    pub resources: Vec<String>,
    pub resource_names: Vec<String>,
    pub non_resource_urls: Vec<String>,
    pub api_groups: Vec<String>,
}

impl fmt::Display for Rule {
    /// Human-readable form, e.g. `get,list pods "db" (apps)`: verbs, then
    /// resources, quoted resource names, non-resource URLs, and
    /// parenthesized API groups, each clause omitted when empty. The
    /// core-group marker `[""]` counts as empty.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.verbs.join(","))?;
        if !self.resources.is_empty() {
            write!(f, " {}", self.resources.join(","))?;
        }
        if !self.resource_names.is_empty() {
            write!(f, " \"{}\"", self.resource_names.join(","))?;
        }
        if !self.non_resource_urls.is_empty() {
            write!(f, " {}", self.non_resource_urls.join(","))?;
        }
        let core_group_only = self.api_groups.len() == 1 && self.api_groups[0].is_empty();
        if !self.api_groups.is_empty() && !core_group_only {
            write!(f, " ({})", self.api_groups.join(","))?;
        }
        Ok(())
    }
}

// --- Role ---

/// A Role or ClusterRole; cluster scope is an empty namespace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Role {
    pub namespace: String,
    pub name: String,
    pub rules: Vec<Rule>,
}

impl Role {
    pub fn id(&self) -> NamespacedName {
        NamespacedName::new(&self.namespace, &self.name)
    }
}

// --- Binding ---

/// A RoleBinding or ClusterRoleBinding. An empty `role.namespace` means the
/// binding references a ClusterRole, even when the binding itself is
/// namespaced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Binding {
    pub namespace: String,
    pub name: String,
    pub role: NamespacedName,
    pub subjects: Vec<Subject>,
}

impl Binding {
    pub fn is_cluster_scoped(&self) -> bool {
        self.namespace.is_empty()
    }
}

// --- Loaded model ---

/// Everything loaded from one input snapshot. Cluster-scoped entries live
/// under the `""` namespace key. Built once per run, read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct Permissions {
    /// Raw ServiceAccount manifests; only existence is ever consulted.
    pub service_accounts: BTreeMap<String, BTreeMap<String, Value>>,
    pub roles: BTreeMap<String, BTreeMap<String, Role>>,
    pub role_bindings: BTreeMap<String, BTreeMap<String, Binding>>,
}

impl Permissions {
    pub fn role(&self, id: &NamespacedName) -> Option<&Role> {
        self.roles.get(&id.namespace)?.get(&id.name)
    }

    /// A binding may reference a role that was never loaded; existence is
    /// pure map membership.
    pub fn role_exists(&self, id: &NamespacedName) -> bool {
        self.role(id).is_some()
    }

    pub fn service_account_exists(&self, namespace: &str, name: &str) -> bool {
        self.service_accounts
            .get(namespace)
            .is_some_and(|sas| sas.contains_key(name))
    }

    /// Users and groups are assumed to exist; only ServiceAccounts are
    /// checked against the loaded model.
    pub fn subject_exists(&self, subject: &Subject) -> bool {
        match subject.kind {
            SubjectKind::ServiceAccount => {
                self.service_account_exists(&subject.namespace, &subject.name)
            }
            SubjectKind::User | SubjectKind::Group => true,
        }
    }
}
