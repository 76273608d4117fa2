pub mod matcher;

use pkg_types::query::{KindFilter, QueryConfig, ResourceKind};
use pkg_types::rbac::{Binding, NamespacedName, Permissions, SubjectKind};

/// Stateless predicates over the loaded model and the query configuration,
/// deciding what is rendered and what is highlighted. Total functions; a
/// selection can never fail.
pub struct Selection<'a> {
    config: &'a QueryConfig,
    permissions: &'a Permissions,
}

impl<'a> Selection<'a> {
    pub fn new(config: &'a QueryConfig, permissions: &'a Permissions) -> Self {
        Self {
            config,
            permissions,
        }
    }

    /// The `{""}` namespace set is the "unset/all" sentinel. Any other set,
    /// including the empty one, is an explicit selection.
    pub fn all_namespaces(&self) -> bool {
        self.config.namespaces.len() == 1 && self.config.namespaces.contains("")
    }

    pub fn all_resource_names(&self) -> bool {
        self.config.resource_names.is_empty()
    }

    pub fn namespace_selected(&self, namespace: &str) -> bool {
        self.all_namespaces() || self.config.namespaces.contains(namespace)
    }

    pub fn resource_name_selected(&self, name: &str) -> bool {
        self.all_resource_names() || self.config.resource_names.contains(name)
    }

    /// The central filtering contract: whether a binding (and everything
    /// hanging off it) appears in the graph under the active kind filter.
    pub fn should_render_binding(&self, binding: &Binding) -> bool {
        let kind = match &self.config.kind_filter {
            KindFilter::Any => return self.namespace_selected(&binding.namespace),
            KindFilter::Kind(kind) => *kind,
            // Fail closed on kind strings that never resolved.
            KindFilter::Unrecognized(_) => return false,
        };
        match kind {
            ResourceKind::RoleBinding => {
                self.namespace_selected(&binding.namespace)
                    && self.resource_name_selected(&binding.name)
            }
            ResourceKind::ClusterRoleBinding => {
                binding.is_cluster_scoped() && self.resource_name_selected(&binding.name)
            }
            ResourceKind::ServiceAccount => binding.subjects.iter().any(|subject| {
                subject.kind == SubjectKind::ServiceAccount
                    && self.namespace_selected(&subject.namespace)
                    && self.resource_name_selected(&subject.name)
                    && self.permissions.subject_exists(subject)
            }),
            ResourceKind::User => binding
                .subjects
                .iter()
                .any(|s| s.kind == SubjectKind::User && self.resource_name_selected(&s.name)),
            ResourceKind::Group => binding
                .subjects
                .iter()
                .any(|s| s.kind == SubjectKind::Group && self.resource_name_selected(&s.name)),
            ResourceKind::Role => {
                !binding.role.is_cluster_scoped()
                    && self.namespace_selected(&binding.role.namespace)
                    && self.resource_name_selected(&binding.role.name)
                    && self.permissions.role_exists(&binding.role)
            }
            ResourceKind::ClusterRole => {
                binding.role.is_cluster_scoped()
                    && self.resource_name_selected(&binding.role.name)
                    && self.permissions.role_exists(&binding.role)
            }
            ResourceKind::Rule => {
                self.rule_matches_selection(&binding.role)
                    && (binding.role.is_cluster_scoped()
                        || self.namespace_selected(&binding.role.namespace))
            }
        }
    }

    /// Highlight predicate. Purely cosmetic; never affects existence or
    /// inclusion.
    pub fn is_focused(&self, kind: ResourceKind, namespace: &str, name: &str) -> bool {
        if kind == ResourceKind::Rule {
            return self.rule_matches_selection(&NamespacedName::new(namespace, name));
        }
        self.config.kind_filter.is(kind)
            && self.namespace_selected(namespace)
            && self.resource_name_selected(name)
    }

    /// True when the active filter is the who-can query and the referenced
    /// role has at least one matching rule. Dangling references never match.
    pub fn rule_matches_selection(&self, role_ref: &NamespacedName) -> bool {
        self.config.kind_filter.is(ResourceKind::Rule)
            && self
                .permissions
                .role(role_ref)
                .is_some_and(|role| matcher::role_matches(&self.config.who_can, role))
    }
}
