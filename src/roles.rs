//! C6 -- Role Classifier. Assigns at most one role per class by scanning
//! role definitions in `(priority DESC, roleId ASC)` order and taking the
//! first whose matcher accepts.

use std::collections::BTreeMap;

use crate::config::schema::Config;
use crate::facts::{FactIndex, RoleAssignments};
use crate::matcher::{self, CompiledMatcher};

/// Classify every class in `facts` and return the role assignments to
/// attach to the index (C2's job is merging; classification itself never
/// mutates `FactIndex` directly so it stays a pure function of its inputs).
pub fn classify(config: &Config, facts: &FactIndex) -> RoleAssignments {
    let mut roles_in_order: Vec<(&str, i32)> =
        config.roles.iter().map(|(id, def)| (id.as_str(), def.priority)).collect();
    roles_in_order.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

    let compiled: BTreeMap<&str, CompiledMatcher> = config
        .roles
        .iter()
        .filter_map(|(id, def)| matcher::compile(&def.matcher).ok().map(|m| (id.as_str(), m)))
        .collect();

    let mut class_to_role: BTreeMap<String, String> = BTreeMap::new();
    let mut roles: BTreeMap<String, Vec<String>> = BTreeMap::new();

    let mut classes: Vec<_> = facts.classes().collect();
    classes.sort_by_key(|c| c.fq_name());

    for class in classes {
        for (role_id, _priority) in &roles_in_order {
            let Some(compiled_matcher) = compiled.get(role_id) else { continue };
            if compiled_matcher.evaluate(class, facts) {
                class_to_role.insert(class.fq_name(), role_id.to_string());
                roles.entry(role_id.to_string()).or_default().push(class.fq_name());
                break;
            }
        }
    }

    RoleAssignments { class_to_role, roles }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::*;
    use crate::extract::PartialFacts;
    use crate::matcher::MatcherSpec;
    use crate::model::{Access, ClassFact, SourceLocation, TypeRef};
    use std::collections::BTreeSet;

    fn class(name: &str) -> ClassFact {
        ClassFact {
            type_ref: TypeRef::from_internal(name).unwrap(),
            access: Access::default(),
            super_type: None,
            interfaces: BTreeSet::new(),
            annotations_fqns: BTreeSet::new(),
            has_main_method: false,
            location: SourceLocation::default(),
        }
    }

    fn config_with_roles(roles: Vec<(&str, i32, MatcherSpec)>) -> Config {
        let mut map = BTreeMap::new();
        for (id, priority, matcher) in roles {
            map.insert(id.to_string(), RoleDef { priority, description: None, matcher });
        }
        Config {
            version: 1,
            project: ProjectConfig {
                root_package: RootPackageConfig { mode: RootPackageMode::Auto, value: None },
                source_globs: SourceGlobsConfig::default(),
                validation: ValidationConfig { unknown_rule: UnknownRulePolicy::Warn },
                scan_limits: ScanLimits::default(),
                bytecode_roots: Vec::new(),
            },
            roles: map,
            rules: Vec::new(),
            exceptions: Vec::new(),
        }
    }

    #[test]
    fn higher_priority_role_wins_on_overlap() {
        let config = config_with_roles(vec![
            ("data", 1, MatcherSpec::ClassNameEndsWith("Dao".into())),
            ("repository", 2, MatcherSpec::ClassNameEndsWithAny(vec!["Dao".into(), "Repository".into()])),
        ]);
        let facts = FactIndex::build([PartialFacts {
            classes: vec![class("com/pit/app/data/UserDao")],
            ..Default::default()
        }]);
        let assignments = classify(&config, &facts);
        assert_eq!(
            assignments.class_to_role.get("com.pit.app.data.UserDao").map(String::as_str),
            Some("repository")
        );
    }

    #[test]
    fn unmatched_class_has_no_role() {
        let config = config_with_roles(vec![("service", 1, MatcherSpec::ClassNameEndsWith("Service".into()))]);
        let facts = FactIndex::build([PartialFacts {
            classes: vec![class("com/pit/app/Unrelated")],
            ..Default::default()
        }]);
        let assignments = classify(&config, &facts);
        assert!(assignments.class_to_role.is_empty());
    }
}
