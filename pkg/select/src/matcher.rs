use pkg_types::query::WhoCan;
use pkg_types::rbac::{Role, Rule};

/// Whether a single rule grants the queried (verb, resource, name). API
/// groups are not consulted; the query matches on verb, resource, and
/// resource name only.
pub fn rule_matches(who: &WhoCan, rule: &Rule) -> bool {
    let verb_granted = rule.verbs.iter().any(|v| v == "*" || *v == who.verb);
    let resource_granted = rule
        .resources
        .iter()
        .any(|r| r == "*" || *r == who.resource);
    // An unnamed query matches name-restricted rules, and an unrestricted
    // rule matches any queried name.
    let name_granted = who.resource_name.is_empty()
        || rule.resource_names.is_empty()
        || rule.resource_names.contains(&who.resource_name);
    verb_granted && resource_granted && name_granted
}

/// A role satisfies the query when any of its rules does.
pub fn role_matches(who: &WhoCan, role: &Role) -> bool {
    role.rules.iter().any(|rule| rule_matches(who, rule))
}
