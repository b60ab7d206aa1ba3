//! C4 -- Semantic Validator: cross-reference and matcher-compile checks over
//! an already shape-bound [`Config`]. Produces [`ValidationIssue`]s; callers
//! decide whether any ERROR rejects the config (they always do, per the
//! fail-closed policy in spec §7).

use regex::Regex;

use crate::error::ValidationIssue;
use crate::matcher;
use crate::rules::RuleRegistry;

use super::schema::{Config, UnknownRulePolicy};

pub fn validate(config: &Config, registry: &RuleRegistry) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    if config.version != 1 {
        issues.push(ValidationIssue::error("$.version", "only version 1 is supported"));
        return issues; // abort further checks, matching spec's "else ERROR, abort"
    }

    for (role_id, role) in &config.roles {
        let path = format!("$.roles.{role_id}.match");
        if let Err(message) = matcher::compile(&role.matcher) {
            issues.push(ValidationIssue::error(path, message));
        }
    }

    for (i, rule) in config.rules.iter().enumerate() {
        validate_rule(config, registry, i, rule, &mut issues);
    }

    for (i, exception) in config.exceptions.iter().enumerate() {
        validate_exception(config, i, exception, &mut issues);
    }

    issues
}

fn validate_rule(
    config: &Config,
    registry: &RuleRegistry,
    index: usize,
    rule: &super::schema::RuleDef,
    issues: &mut Vec<ValidationIssue>,
) {
    let path = format!("$.rules[{index}]");

    if rule.rule_type.trim().is_empty() {
        issues.push(ValidationIssue::error(format!("{path}.type"), "must not be empty"));
    }
    if rule.name.trim().is_empty() {
        issues.push(ValidationIssue::error(format!("{path}.name"), "must not be empty"));
    }

    if let Some(scope) = &rule.scope {
        for (field_name, patterns) in
            [("includePackages", &scope.include_packages), ("excludePackages", &scope.exclude_packages)]
        {
            for (j, pattern) in patterns.iter().enumerate() {
                if let Err(e) = Regex::new(&format!("^(?:{pattern})$")) {
                    issues.push(ValidationIssue::error(
                        format!("{path}.scope.{field_name}[{j}]"),
                        e.to_string(),
                    ));
                }
            }
        }
        if let Some(roles) = &scope.include_roles {
            for (j, role_id) in roles.iter().enumerate() {
                if !config.roles.contains_key(role_id) {
                    issues.push(ValidationIssue::error(
                        format!("{path}.scope.includeRoles[{j}]"),
                        format!("unknown role '{role_id}'"),
                    ));
                }
            }
        }
    }

    if !rule.enabled {
        return; // disabled rules skip everything below basic shape
    }

    if let Some(roles) = &rule.roles {
        for (j, role_id) in roles.iter().enumerate() {
            if !config.roles.contains_key(role_id) {
                issues.push(ValidationIssue::error(
                    format!("{path}.roles[{j}]"),
                    format!("unknown role '{role_id}'"),
                ));
            }
        }
    }

    let base_id = rule.base_id();
    match registry.get(&base_id) {
        Some(implementation) => {
            for issue in implementation.validate_params(&rule.params, &format!("{path}.params")) {
                issues.push(issue);
            }
        }
        None => match config.project.validation.unknown_rule {
            UnknownRulePolicy::Ignore => {}
            UnknownRulePolicy::Warn => issues.push(ValidationIssue::warning(
                format!("{path}.type"),
                format!("unknown rule '{base_id}'"),
            )),
            UnknownRulePolicy::Error => issues.push(ValidationIssue::error(
                format!("{path}.type"),
                format!("unknown rule '{base_id}'"),
            )),
        },
    }
}

fn validate_exception(
    config: &Config,
    index: usize,
    exception: &super::schema::ExceptionDef,
    issues: &mut Vec<ValidationIssue>,
) {
    let path = format!("$.exceptions[{index}]");

    if exception.id.trim().is_empty() {
        issues.push(ValidationIssue::error(format!("{path}.id"), "must not be empty"));
    }
    if exception.reason.trim().is_empty() {
        issues.push(ValidationIssue::error(format!("{path}.reason"), "must not be empty"));
    }
    if exception.suppress.is_empty() {
        issues.push(ValidationIssue::error(format!("{path}.suppress"), "must not be empty"));
    }
    for (j, rule_id) in exception.suppress.iter().enumerate() {
        if rule_id == "*" || rule_id == "all" {
            continue;
        }
        let known = config
            .rules
            .iter()
            .any(|r| r.base_id() == *rule_id || rule_id.starts_with(&format!("{}.", r.base_id())));
        if !known {
            issues.push(ValidationIssue::warning(
                format!("{path}.suppress[{j}]"),
                format!("'{rule_id}' does not match any configured rule"),
            ));
        }
    }

    if !exception.matcher.has_any_field() {
        issues.push(ValidationIssue::error(format!("{path}.match"), "at least one match field is required"));
    }
    for (field_name, pattern) in [
        ("classNameRegex", &exception.matcher.class_name_regex),
        ("packageRegex", &exception.matcher.package_regex),
    ] {
        if let Some(pattern) = pattern {
            if let Err(e) = Regex::new(&format!("^(?:{pattern})$")) {
                issues.push(ValidationIssue::error(format!("{path}.match.{field_name}"), e.to_string()));
            }
        }
    }
    if let Some(role) = &exception.matcher.role {
        if !config.roles.contains_key(role) {
            issues.push(ValidationIssue::error(
                format!("{path}.match.role"),
                format!("unknown role '{role}'"),
            ));
        }
    }
}
