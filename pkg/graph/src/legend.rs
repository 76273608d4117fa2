use crate::{EdgeKind, Graph, Node, NodeId, NodeKey, NodeLabel};

const NAMESPACE: &str = "Namespace";

/// Fixed legend showing one example of each node and edge kind,
/// independent of the loaded model.
pub fn build(show_rules: bool) -> Graph {
    let mut graph = Graph::default();

    let subject = subject_node(&mut graph, "Subject", true);
    let missing_subject = subject_node(&mut graph, "Missing Subject", false);

    let role = role_node(&mut graph, false, "ns", NAMESPACE, "Role");
    // A ClusterRole granted through a namespaced RoleBinding.
    let bound_cluster_role = role_node(&mut graph, true, "ns", NAMESPACE, "ClusterRole");
    let cluster_role = role_node(&mut graph, true, "", "", "ClusterRole");

    let role_binding = binding_node(&mut graph, false, "RoleBinding", "RoleBinding");
    graph.edge(subject, role_binding, EdgeKind::SubjectToBinding);
    graph.edge(missing_subject, role_binding, EdgeKind::SubjectToBinding);
    graph.edge(role_binding, role, EdgeKind::BindingToRole);

    let to_cluster_role = binding_node(&mut graph, false, "RoleBinding-to-ClusterRole", "RoleBinding");
    graph.edge(subject, to_cluster_role, EdgeKind::SubjectToBinding);
    graph.edge(to_cluster_role, bound_cluster_role, EdgeKind::BindingToRole);

    let cluster_role_binding = binding_node(&mut graph, true, "ClusterRoleBinding", "ClusterRoleBinding");
    graph.edge(subject, cluster_role_binding, EdgeKind::SubjectToBinding);
    graph.edge(cluster_role_binding, cluster_role, EdgeKind::BindingToRole);

    if show_rules {
        let namespace_rules = rules_note(
            &mut graph,
            "ns",
            "Role",
            NAMESPACE,
            "Namespace-scoped\naccess rules",
        );
        graph.edge(role, namespace_rules, EdgeKind::RoleToRules);

        let cluster_role_rules = rules_note(
            &mut graph,
            "ns",
            "ClusterRole",
            NAMESPACE,
            "Namespace-scoped\naccess rules",
        );
        graph.edge(bound_cluster_role, cluster_role_rules, EdgeKind::RoleToRules);

        let cluster_rules = rules_note(
            &mut graph,
            "",
            "ClusterRole",
            "",
            "Cluster-scoped\naccess rules",
        );
        graph.edge(cluster_role, cluster_rules, EdgeKind::RoleToRules);
    }

    graph
}

fn subject_node(graph: &mut Graph, name: &str, exists: bool) -> NodeId {
    graph.insert(Node {
        key: NodeKey::Subject {
            kind: "Kind".to_string(),
            namespace: String::new(),
            name: name.to_string(),
        },
        label: NodeLabel::Text(format!("{name}\n(Kind)")),
        namespace: NAMESPACE.to_string(),
        exists,
        highlighted: false,
    })
}

fn role_node(graph: &mut Graph, cluster: bool, key_ns: &str, placement: &str, name: &str) -> NodeId {
    graph.insert(Node {
        key: NodeKey::Role {
            cluster,
            namespace: key_ns.to_string(),
            name: name.to_string(),
        },
        label: NodeLabel::Text(name.to_string()),
        namespace: placement.to_string(),
        exists: true,
        highlighted: false,
    })
}

fn binding_node(graph: &mut Graph, cluster: bool, name: &str, label: &str) -> NodeId {
    let (namespace, placement) = if cluster {
        (String::new(), String::new())
    } else {
        ("ns".to_string(), NAMESPACE.to_string())
    };
    graph.insert(Node {
        key: NodeKey::Binding {
            cluster,
            namespace,
            name: name.to_string(),
        },
        label: NodeLabel::Text(label.to_string()),
        namespace: placement,
        exists: true,
        highlighted: false,
    })
}

fn rules_note(graph: &mut Graph, key_ns: &str, name: &str, placement: &str, label: &str) -> NodeId {
    graph.insert(Node {
        key: NodeKey::Rules {
            namespace: key_ns.to_string(),
            name: name.to_string(),
        },
        label: NodeLabel::Text(label.to_string()),
        namespace: placement.to_string(),
        exists: true,
        highlighted: false,
    })
}
