use crate::rbac::SubjectKind;
use std::collections::BTreeSet;

// --- Resource kinds ---

/// The kinds a graph query can filter on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    ServiceAccount,
    RoleBinding,
    ClusterRoleBinding,
    Role,
    ClusterRole,
    User,
    Group,
    Rule,
}

/// Shorthand and plural spellings accepted on the command line.
const KIND_ALIASES: &[(&str, &str)] = &[
    ("sa", "serviceaccount"),
    ("serviceaccounts", "serviceaccount"),
    ("rb", "rolebinding"),
    ("rolebindings", "rolebinding"),
    ("crb", "clusterrolebinding"),
    ("clusterrolebindings", "clusterrolebinding"),
    ("r", "role"),
    ("roles", "role"),
    ("cr", "clusterrole"),
    ("clusterroles", "clusterrole"),
];

/// Lowercase `kind` and resolve shorthand/plural spellings to the canonical
/// singular form. Unknown spellings come back unchanged (lowercased).
pub fn normalize_kind(kind: &str) -> String {
    let kind = kind.to_lowercase();
    for (alias, canonical) in KIND_ALIASES {
        if kind == *alias {
            return (*canonical).to_string();
        }
    }
    kind
}

impl ResourceKind {
    /// Parse a user-supplied kind, accepting aliases. `None` for anything
    /// unrecognized.
    pub fn parse(kind: &str) -> Option<Self> {
        match normalize_kind(kind).as_str() {
            "serviceaccount" => Some(Self::ServiceAccount),
            "rolebinding" => Some(Self::RoleBinding),
            "clusterrolebinding" => Some(Self::ClusterRoleBinding),
            "role" => Some(Self::Role),
            "clusterrole" => Some(Self::ClusterRole),
            "user" => Some(Self::User),
            "group" => Some(Self::Group),
            "rule" => Some(Self::Rule),
            _ => None,
        }
    }
}

impl From<SubjectKind> for ResourceKind {
    fn from(kind: SubjectKind) -> Self {
        match kind {
            SubjectKind::ServiceAccount => Self::ServiceAccount,
            SubjectKind::User => Self::User,
            SubjectKind::Group => Self::Group,
        }
    }
}

// --- Kind filter ---

/// What the positional KIND argument resolved to. An unrecognized spelling
/// is carried along and selects nothing rather than erroring.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum KindFilter {
    #[default]
    Any,
    Kind(ResourceKind),
    Unrecognized(String),
}

impl KindFilter {
    pub fn parse(kind: &str) -> Self {
        match ResourceKind::parse(kind) {
            Some(kind) => Self::Kind(kind),
            None => Self::Unrecognized(normalize_kind(kind)),
        }
    }

    pub fn is(&self, kind: ResourceKind) -> bool {
        *self == Self::Kind(kind)
    }

    pub fn is_any(&self) -> bool {
        matches!(self, Self::Any)
    }
}

// --- Who-can query ---

/// A "who can VERB RESOURCE [NAME]" query. An empty `resource_name` matches
/// any name. The default value is the inactive query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WhoCan {
    pub verb: String,
    pub resource: String,
    pub resource_name: String,
    /// Collapse non-matching rules to `...` in rules notes.
    pub show_matched_only: bool,
}

// --- Query configuration ---

/// Everything the caller decides; the core never reads flags or the
/// environment. The namespace set `{""}` is the "all namespaces" sentinel,
/// and an empty resource-name set means "all names".
#[derive(Debug, Clone)]
pub struct QueryConfig {
    pub namespaces: BTreeSet<String>,
    pub ignored_prefixes: Vec<String>,
    pub kind_filter: KindFilter,
    pub resource_names: BTreeSet<String>,
    pub show_rules: bool,
    pub show_legend: bool,
    pub who_can: WhoCan,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            namespaces: BTreeSet::from([String::new()]),
            ignored_prefixes: vec!["system:".to_string()],
            kind_filter: KindFilter::Any,
            resource_names: BTreeSet::new(),
            show_rules: true,
            show_legend: true,
            who_can: WhoCan::default(),
        }
    }
}

impl QueryConfig {
    /// True when `name` starts with any of the ignored prefixes.
    pub fn ignored(&self, name: &str) -> bool {
        self.ignored_prefixes
            .iter()
            .any(|prefix| name.starts_with(prefix))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_aliases_resolve() {
        assert_eq!(ResourceKind::parse("sa"), Some(ResourceKind::ServiceAccount));
        assert_eq!(ResourceKind::parse("ServiceAccounts"), Some(ResourceKind::ServiceAccount));
        assert_eq!(ResourceKind::parse("rb"), Some(ResourceKind::RoleBinding));
        assert_eq!(ResourceKind::parse("crb"), Some(ResourceKind::ClusterRoleBinding));
        assert_eq!(ResourceKind::parse("r"), Some(ResourceKind::Role));
        assert_eq!(ResourceKind::parse("CLUSTERROLES"), Some(ResourceKind::ClusterRole));
        assert_eq!(ResourceKind::parse("user"), Some(ResourceKind::User));
        assert_eq!(ResourceKind::parse("group"), Some(ResourceKind::Group));
        assert_eq!(ResourceKind::parse("rule"), Some(ResourceKind::Rule));
    }

    #[test]
    fn unknown_kind_is_carried_not_rejected() {
        assert_eq!(ResourceKind::parse("pod"), None);
        assert_eq!(
            KindFilter::parse("Pod"),
            KindFilter::Unrecognized("pod".to_string())
        );
        assert!(!KindFilter::parse("pod").is(ResourceKind::Role));
    }

    #[test]
    fn ignored_prefixes() {
        let config = QueryConfig::default();
        assert!(config.ignored("system:controller"));
        assert!(!config.ignored("my-sa"));

        let open = QueryConfig {
            ignored_prefixes: vec![],
            ..QueryConfig::default()
        };
        assert!(!open.ignored("system:controller"));
    }

    #[test]
    fn default_config_selects_everything() {
        let config = QueryConfig::default();
        assert_eq!(config.namespaces, BTreeSet::from([String::new()]));
        assert!(config.resource_names.is_empty());
        assert!(config.kind_filter.is_any());
        assert!(config.show_rules);
        assert!(config.show_legend);
    }
}
