//! Graphviz rendering of the abstract graph. This is the only place
//! concrete output syntax, shapes, and colors live; the core crates know
//! nothing about DOT.

use pkg_graph::builder::RbacGraph;
use pkg_graph::{EdgeKind, Graph, Node, NodeKey, NodeLabel};

pub fn render(rbac: &RbacGraph) -> String {
    let mut out = String::new();
    // Global ranking keeps the rules notes in one row at the bottom
    // instead of ranking each cluster on its own.
    out.push_str("digraph {\n");
    out.push_str("  newrank=\"true\";\n");

    let mut role_rank = Vec::new();
    if let Some(legend) = &rbac.legend {
        render_graph(&mut out, legend, "legend-", Some("LEGEND"), &mut role_rank);
    }
    render_graph(&mut out, &rbac.graph, "", None, &mut role_rank);

    // All role nodes share one rank so roles line up across namespaces.
    if !role_rank.is_empty() {
        out.push_str("  {rank=same;");
        for id in &role_rank {
            out.push(' ');
            out.push_str(&quote(id));
            out.push(';');
        }
        out.push_str("}\n");
    }

    out.push_str("}\n");
    out
}

/// Emit one abstract graph: a dashed cluster per namespace, top-level nodes,
/// then the edges. `prefix` keeps legend identities disjoint from model
/// identities.
fn render_graph(
    out: &mut String,
    graph: &Graph,
    prefix: &str,
    wrapper: Option<&str>,
    role_rank: &mut Vec<String>,
) {
    if let Some(label) = wrapper {
        out.push_str(&format!("  subgraph {} {{\n", quote(&format!("cluster_{label}"))));
        out.push_str(&format!("    label={};\n", quote(label)));
    }

    for namespace in graph.namespaces() {
        out.push_str(&format!(
            "  subgraph {} {{\n",
            quote(&format!("cluster_{prefix}{namespace}"))
        ));
        out.push_str(&format!("    label={};\n", quote(namespace)));
        out.push_str("    style=\"dashed\";\n");
        for (_, node) in graph.iter().filter(|(_, n)| n.namespace == namespace) {
            render_node(out, node, prefix, role_rank);
        }
        out.push_str("  }\n");
    }
    for (_, node) in graph.iter().filter(|(_, n)| n.namespace.is_empty()) {
        render_node(out, node, prefix, role_rank);
    }

    if wrapper.is_some() {
        out.push_str("  }\n");
    }

    for edge in graph.edges() {
        let from = node_id(prefix, &graph.node(edge.from).key);
        let to = node_id(prefix, &graph.node(edge.to).key);
        match edge.kind {
            EdgeKind::SubjectToBinding => out.push_str(&format!(
                "  {} -> {} [dir=\"back\"];\n",
                quote(&from),
                quote(&to)
            )),
            EdgeKind::BindingToRole | EdgeKind::RoleToRules => {
                out.push_str(&format!("  {} -> {};\n", quote(&from), quote(&to)))
            }
        }
    }
}

fn render_node(out: &mut String, node: &Node, prefix: &str, role_rank: &mut Vec<String>) {
    let id = node_id(prefix, &node.key);
    if matches!(node.key, NodeKey::Role { .. }) {
        role_rank.push(id.clone());
    }
    out.push_str(&format!(
        "    {} [{}{}];\n",
        quote(&id),
        label_attr(node),
        style_attrs(node)
    ));
}

fn node_id(prefix: &str, key: &NodeKey) -> String {
    match key {
        NodeKey::Subject {
            kind,
            namespace,
            name,
        } => format!("{prefix}{kind}-{namespace}/{name}"),
        NodeKey::Binding {
            cluster: false,
            namespace,
            name,
        } => format!("{prefix}rb-{namespace}/{name}"),
        NodeKey::Binding {
            cluster: true, name, ..
        } => format!("{prefix}crb-{name}"),
        NodeKey::Role {
            cluster: false,
            namespace,
            name,
        } => format!("{prefix}r-{namespace}/{name}"),
        NodeKey::Role {
            cluster: true,
            namespace,
            name,
        } => format!("{prefix}cr-{namespace}/{name}"),
        NodeKey::Rules { namespace, name } => format!("{prefix}rules-{namespace}/{name}"),
    }
}

fn label_attr(node: &Node) -> String {
    match &node.label {
        NodeLabel::Rules(lines) => {
            let mut html = String::new();
            for line in lines {
                if line.matched {
                    html.push_str(&format!(
                        "<b>{}</b><br align=\"left\"/>",
                        escape_html(&line.text)
                    ));
                } else {
                    html.push_str(&format!("{}<br align=\"left\"/>", escape_html(&line.text)));
                }
            }
            format!("label=<{html}>")
        }
        NodeLabel::Text(text) if node.highlighted => {
            format!("label=<<b>{}</b>>", escape_html(text))
        }
        NodeLabel::Text(text) => format!("label={}", quote(text)),
    }
}

fn style_attrs(node: &Node) -> String {
    let highlight_pen = if node.highlighted { "2.0" } else { "1.0" };
    let missing_pen = if node.highlighted || !node.exists {
        "2.0"
    } else {
        "1.0"
    };
    match &node.key {
        NodeKey::Subject { .. } => format!(
            ", shape=\"box\", style=\"{}\", color=\"{}\", penwidth=\"{}\", fillcolor=\"#2f6de1\", fontcolor=\"{}\"",
            if node.exists { "filled" } else { "dotted" },
            if node.exists { "black" } else { "red" },
            missing_pen,
            if node.exists { "#f0f0f0" } else { "#030303" },
        ),
        NodeKey::Binding { cluster, .. } => format!(
            ", shape=\"{}\", style=\"filled\", penwidth=\"{}\", fillcolor=\"#ffcc00\", fontcolor=\"#030303\"",
            if *cluster { "doubleoctagon" } else { "octagon" },
            highlight_pen,
        ),
        NodeKey::Role {
            cluster, namespace, ..
        } => {
            // A ClusterRole anchored in a namespace (granted by a local
            // RoleBinding) renders dashed to set it apart from one bound
            // at cluster scope.
            let style = if !node.exists {
                "dotted"
            } else if *cluster && !namespace.is_empty() {
                "filled,dashed"
            } else {
                "filled"
            };
            format!(
                ", shape=\"{}\", style=\"{}\", color=\"{}\", penwidth=\"{}\", fillcolor=\"#ff9900\", fontcolor=\"#030303\"",
                if *cluster { "doubleoctagon" } else { "octagon" },
                style,
                if node.exists { "black" } else { "red" },
                missing_pen,
            )
        }
        NodeKey::Rules { .. } => format!(", shape=\"note\", penwidth=\"{}\"", highlight_pen),
    }
}

fn quote(s: &str) -> String {
    format!(
        "\"{}\"",
        s.replace('\\', "\\\\")
            .replace('"', "\\\"")
            .replace('\n', "\\n")
    )
}

fn escape_html(s: &str) -> String {
    s.replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace(' ', "&nbsp;")
        .replace('\n', "<br/>")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pkg_graph::builder;
    use pkg_types::query::{KindFilter, QueryConfig, ResourceKind, WhoCan};
    use pkg_types::rbac::{Binding, NamespacedName, Permissions, Role, Rule, Subject, SubjectKind};
    use std::collections::BTreeSet;

    fn make_model() -> Permissions {
        let mut permissions = Permissions::default();
        permissions
            .service_accounts
            .entry("ns".to_string())
            .or_default()
            .insert("alice".to_string(), serde_json::json!({}));
        permissions.roles.entry("ns".to_string()).or_default().insert(
            "reader".to_string(),
            Role {
                namespace: "ns".to_string(),
                name: "reader".to_string(),
                rules: vec![Rule {
                    verbs: vec!["get".to_string()],
                    resources: vec!["pods".to_string()],
                    ..Rule::default()
                }],
            },
        );
        permissions
            .role_bindings
            .entry("ns".to_string())
            .or_default()
            .insert(
                "binding1".to_string(),
                Binding {
                    namespace: "ns".to_string(),
                    name: "binding1".to_string(),
                    role: NamespacedName::new("ns", "reader"),
                    subjects: vec![Subject {
                        kind: SubjectKind::ServiceAccount,
                        namespace: "ns".to_string(),
                        name: "alice".to_string(),
                    }],
                },
            );
        permissions
    }

    #[test]
    fn renders_clusters_nodes_and_edges() {
        let config = QueryConfig {
            show_legend: false,
            ..QueryConfig::default()
        };
        let out = render(&builder::build(&config, &make_model()));

        assert!(out.starts_with("digraph {\n"));
        assert!(out.contains("newrank=\"true\""));
        assert!(out.contains("subgraph \"cluster_ns\""));
        assert!(out.contains("\"ServiceAccount-ns/alice\""));
        assert!(out.contains("label=\"alice\\n(ServiceAccount)\""));
        assert!(out.contains("\"ServiceAccount-ns/alice\" -> \"rb-ns/binding1\" [dir=\"back\"];"));
        assert!(out.contains("\"rb-ns/binding1\" -> \"r-ns/reader\";"));
        assert!(out.contains("\"r-ns/reader\" -> \"rules-ns/reader\";"));
        // The rules note carries an HTML label with left-aligned lines.
        assert!(out.contains("label=<get&nbsp;pods<br align=\"left\"/>>"));
        assert!(out.contains("shape=\"note\""));
        // Role nodes share one rank.
        assert!(out.contains("{rank=same; \"r-ns/reader\";}"));
    }

    #[test]
    fn legend_ids_are_prefixed() {
        let out = render(&builder::build(&QueryConfig::default(), &make_model()));
        assert!(out.contains("subgraph \"cluster_LEGEND\""));
        assert!(out.contains("subgraph \"cluster_legend-Namespace\""));
        assert!(out.contains("\"legend-Kind-/Subject\""));
        assert!(out.contains("\"legend-crb-ClusterRoleBinding\""));
        // Legend roles join the shared rank with model roles.
        assert!(out.contains("\"legend-r-ns/Role\";"));
    }

    #[test]
    fn highlighted_nodes_get_bold_html_labels() {
        let config = QueryConfig {
            kind_filter: KindFilter::Kind(ResourceKind::Role),
            resource_names: BTreeSet::from(["reader".to_string()]),
            show_legend: false,
            ..QueryConfig::default()
        };
        let out = render(&builder::build(&config, &make_model()));
        assert!(out.contains("label=<<b>reader</b>>"));
    }

    #[test]
    fn matched_rule_lines_render_bold() {
        let config = QueryConfig {
            kind_filter: KindFilter::Kind(ResourceKind::Rule),
            who_can: WhoCan {
                verb: "get".to_string(),
                resource: "pods".to_string(),
                ..WhoCan::default()
            },
            show_legend: false,
            ..QueryConfig::default()
        };
        let out = render(&builder::build(&config, &make_model()));
        assert!(out.contains("<b>get&nbsp;pods</b><br align=\"left\"/>"));
    }

    #[test]
    fn missing_roles_render_dotted_and_anchored_cluster_roles_dashed() {
        let mut permissions = make_model();
        permissions.roles.entry(String::new()).or_default().insert(
            "admin".to_string(),
            Role {
                namespace: String::new(),
                name: "admin".to_string(),
                rules: vec![],
            },
        );
        permissions
            .role_bindings
            .entry("ns".to_string())
            .or_default()
            .insert(
                "dangling".to_string(),
                Binding {
                    namespace: "ns".to_string(),
                    name: "dangling".to_string(),
                    role: NamespacedName::new("ns", "ghost"),
                    subjects: vec![],
                },
            );
        permissions
            .role_bindings
            .entry("ns".to_string())
            .or_default()
            .insert(
                "to-admin".to_string(),
                Binding {
                    namespace: "ns".to_string(),
                    name: "to-admin".to_string(),
                    role: NamespacedName::cluster_scoped("admin"),
                    subjects: vec![],
                },
            );

        let config = QueryConfig {
            show_legend: false,
            ..QueryConfig::default()
        };
        let out = render(&builder::build(&config, &permissions));

        let ghost_line = out
            .lines()
            .find(|l| l.contains("\"r-ns/ghost\" ["))
            .unwrap();
        assert!(ghost_line.contains("style=\"dotted\""));
        assert!(ghost_line.contains("color=\"red\""));
        assert!(ghost_line.contains("penwidth=\"2.0\""));

        let anchored_line = out
            .lines()
            .find(|l| l.contains("\"cr-ns/admin\" ["))
            .unwrap();
        assert!(anchored_line.contains("style=\"filled,dashed\""));
        assert!(anchored_line.contains("shape=\"doubleoctagon\""));
    }

    #[test]
    fn escaping() {
        assert_eq!(escape_html("a <b> c"), "a&nbsp;&lt;b&gt;&nbsp;c");
        assert_eq!(escape_html("x\ny"), "x<br/>y");
        assert_eq!(quote("a\"b\nc"), "\"a\\\"b\\nc\"");
    }
}
