use pkg_select::{Selection, matcher};
use pkg_types::query::{QueryConfig, ResourceKind};
use pkg_types::rbac::{Binding, NamespacedName, Permissions, Subject, SubjectKind};

use crate::legend;
use crate::{EdgeKind, Graph, Node, NodeId, NodeKey, NodeLabel, RuleLine};

/// The abstract output of one run: an optional legend plus the model graph.
/// A rendering collaborator turns this into concrete graph syntax.
#[derive(Debug, Clone)]
pub struct RbacGraph {
    pub legend: Option<Graph>,
    pub graph: Graph,
}

/// Build the graph for one loaded model under one query configuration.
pub fn build(config: &QueryConfig, permissions: &Permissions) -> RbacGraph {
    let builder = GraphBuilder {
        config,
        permissions,
        selection: Selection::new(config, permissions),
        graph: Graph::default(),
    };
    builder.build()
}

struct GraphBuilder<'a> {
    config: &'a QueryConfig,
    permissions: &'a Permissions,
    selection: Selection<'a>,
    graph: Graph,
}

impl GraphBuilder<'_> {
    fn build(mut self) -> RbacGraph {
        // The three passes are independent; the graph is their union, with
        // the identity index collapsing anything drawn more than once.
        self.render_bindings();
        self.render_standalone_service_accounts();
        self.render_standalone_roles();
        RbacGraph {
            legend: self
                .config
                .show_legend
                .then(|| legend::build(self.config.show_rules)),
            graph: self.graph,
        }
    }

    /// Pass 1: every selected binding, its role (and rules), its subjects.
    fn render_bindings(&mut self) {
        for bindings in self.permissions.role_bindings.values() {
            for binding in bindings.values() {
                if !self.selection.should_render_binding(binding) {
                    continue;
                }
                let binding_node = self.binding_node(binding);
                let role_node =
                    self.role_and_rules(&binding.namespace, &binding.namespace, &binding.role);
                self.graph
                    .edge(binding_node, role_node, EdgeKind::BindingToRole);

                let mut subject_nodes = Vec::new();
                for subject in &binding.subjects {
                    // Subjects are already filtered at load; keep the check
                    // so a hand-built model cannot leak ignored names.
                    if self.config.ignored(&subject.name) {
                        continue;
                    }
                    let wanted = !self.config.kind_filter.is(ResourceKind::ServiceAccount)
                        || (self.selection.namespace_selected(&subject.namespace)
                            && self.selection.resource_name_selected(&subject.name)
                            && self.permissions.subject_exists(subject));
                    if wanted {
                        subject_nodes.push(self.subject_node(subject));
                    }
                }
                for subject_node in subject_nodes {
                    self.graph
                        .edge(subject_node, binding_node, EdgeKind::SubjectToBinding);
                }
            }
        }
    }

    /// Pass 2: ServiceAccounts no binding referenced.
    fn render_standalone_service_accounts(&mut self) {
        let filter = &self.config.kind_filter;
        if !(filter.is_any() || filter.is(ResourceKind::ServiceAccount)) {
            return;
        }
        for (namespace, accounts) in &self.permissions.service_accounts {
            if !self.selection.namespace_selected(namespace) {
                continue;
            }
            for name in accounts.keys() {
                let wanted = self.config.kind_filter.is_any()
                    || (self.selection.namespace_selected(namespace)
                        && self.selection.resource_name_selected(name));
                if wanted {
                    self.subject_node(&Subject {
                        kind: SubjectKind::ServiceAccount,
                        namespace: namespace.clone(),
                        name: name.clone(),
                    });
                }
            }
        }
    }

    /// Pass 3: Roles and ClusterRoles no binding referenced.
    fn render_standalone_roles(&mut self) {
        let filter = &self.config.kind_filter;
        for (namespace, roles) in &self.permissions.roles {
            let cluster_scope = namespace.is_empty();
            let wanted = if cluster_scope {
                (filter.is_any() || filter.is(ResourceKind::ClusterRole))
                    && self.selection.all_namespaces()
            } else {
                (filter.is_any() || filter.is(ResourceKind::Role))
                    && self.selection.namespace_selected(namespace)
            };
            if !wanted {
                continue;
            }
            for name in roles.keys() {
                if self.selection.namespace_selected(namespace)
                    && self.selection.resource_name_selected(name)
                {
                    self.role_and_rules(namespace, "", &NamespacedName::new(namespace, name));
                }
            }
        }
    }

    fn binding_node(&mut self, binding: &Binding) -> NodeId {
        let cluster = binding.is_cluster_scoped();
        let focus_kind = if cluster {
            ResourceKind::ClusterRoleBinding
        } else {
            ResourceKind::RoleBinding
        };
        let highlighted = self
            .selection
            .is_focused(focus_kind, &binding.namespace, &binding.name);
        self.graph.insert(Node {
            key: NodeKey::Binding {
                cluster,
                namespace: binding.namespace.clone(),
                name: binding.name.clone(),
            },
            label: NodeLabel::Text(binding.name.clone()),
            namespace: binding.namespace.clone(),
            exists: true,
            highlighted,
        })
    }

    fn subject_node(&mut self, subject: &Subject) -> NodeId {
        let exists = self.permissions.subject_exists(subject);
        let highlighted =
            self.selection
                .is_focused(subject.kind.into(), &subject.namespace, &subject.name);
        self.graph.insert(Node {
            key: NodeKey::Subject {
                kind: subject.kind.to_string(),
                namespace: subject.namespace.clone(),
                name: subject.name.clone(),
            },
            label: NodeLabel::Text(format!("{}\n({})", subject.name, subject.kind)),
            namespace: subject.namespace.clone(),
            exists,
            highlighted,
        })
    }

    /// Role node plus, when rules are shown and the role has any, its rules
    /// note. `placement` is the namespace cluster the pair is drawn in;
    /// `anchor` is the namespace a cluster role is keyed under when reached
    /// through a namespaced binding (scope classification follows the
    /// binding, not the role).
    fn role_and_rules(
        &mut self,
        placement: &str,
        anchor: &str,
        role_ref: &NamespacedName,
    ) -> NodeId {
        let cluster = role_ref.is_cluster_scoped();
        let exists = self.permissions.role_exists(role_ref);
        let (key_namespace, focus_kind) = if cluster {
            (anchor.to_string(), ResourceKind::ClusterRole)
        } else {
            (role_ref.namespace.clone(), ResourceKind::Role)
        };
        let highlighted =
            self.selection
                .is_focused(focus_kind, &role_ref.namespace, &role_ref.name);
        let role_node = self.graph.insert(Node {
            key: NodeKey::Role {
                cluster,
                namespace: key_namespace,
                name: role_ref.name.clone(),
            },
            label: NodeLabel::Text(role_ref.name.clone()),
            namespace: placement.to_string(),
            exists,
            highlighted,
        });

        if self.config.show_rules {
            let focused =
                self.selection
                    .is_focused(ResourceKind::Rule, &role_ref.namespace, &role_ref.name);
            let lines = self.rule_lines(role_ref, focused);
            if !lines.is_empty() {
                let rules_node = self.graph.insert(Node {
                    key: NodeKey::Rules {
                        namespace: role_ref.namespace.clone(),
                        name: role_ref.name.clone(),
                    },
                    label: NodeLabel::Rules(lines),
                    namespace: placement.to_string(),
                    exists: true,
                    highlighted: focused,
                });
                self.graph.edge(role_node, rules_node, EdgeKind::RoleToRules);
            }
        }
        role_node
    }

    /// One line per rule, in input order. A line is matched (bold) when the
    /// who-can query is active, the role is focused, and the rule itself
    /// matches. With show_matched_only, a run of non-matching rules
    /// collapses into a single `...` line.
    fn rule_lines(&self, role_ref: &NamespacedName, focused: bool) -> Vec<RuleLine> {
        let Some(role) = self.permissions.role(role_ref) else {
            return Vec::new();
        };
        let who = &self.config.who_can;
        let mut lines: Vec<RuleLine> = Vec::new();
        for rule in &role.rules {
            let matched = self.config.kind_filter.is(ResourceKind::Rule)
                && focused
                && matcher::rule_matches(who, rule);
            if matched {
                lines.push(RuleLine {
                    text: rule.to_string(),
                    matched: true,
                });
            } else if who.show_matched_only {
                let collapsed = lines
                    .last()
                    .is_some_and(|line| !line.matched && line.text == "...");
                if !collapsed {
                    lines.push(RuleLine {
                        text: "...".to_string(),
                        matched: false,
                    });
                }
            } else {
                lines.push(RuleLine {
                    text: rule.to_string(),
                    matched: false,
                });
            }
        }
        lines
    }
}
