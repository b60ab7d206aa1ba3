//! C9 -- Rule Registry & Executor. Each rule implementation lives in its own
//! submodule, grouped the way the wire ids are grouped (`arch.*`,
//! `metrics.*`, `naming.*`, `packages.*`, `deadcode.*`).

pub mod arch;
pub mod deadcode;
pub mod metrics;
pub mod naming;
pub mod packages;

use std::collections::BTreeMap;

use crate::cancel::CancellationToken;
use crate::config::raw::RawValue;
use crate::config::schema::{Config, RuleDef, RuleScope};
use crate::error::ValidationIssue;
use crate::facts::FactIndex;
use crate::model::{ClassFact, Finding};

/// Everything a rule's `evaluate` needs: the fact index, its own
/// already-bound definition, and the whole config (for role lookups).
pub struct EvalContext<'a> {
    pub facts: &'a FactIndex,
    pub config: &'a Config,
    pub token: &'a CancellationToken,
}

pub trait Rule: Send + Sync {
    /// `"type.name"`, the registry key and the canonical id absent role
    /// expansion.
    fn id(&self) -> &'static str;

    /// Shape/value-check this rule's `params` map; unknown keys are always
    /// an error regardless of what else the rule checks.
    fn validate_params(&self, params: &BTreeMap<String, RawValue>, path: &str) -> Vec<ValidationIssue>;

    /// Evaluate once. When `rule_def.roles` is `Some`, the executor calls
    /// this once per role and attaches `.{role}` to the canonical id itself.
    fn evaluate(&self, ctx: &EvalContext, rule_def: &RuleDef, role: Option<&str>) -> Vec<Finding>;
}

pub struct RuleRegistry {
    rules: BTreeMap<&'static str, Box<dyn Rule>>,
}

impl Default for RuleRegistry {
    fn default() -> Self {
        let mut rules: BTreeMap<&'static str, Box<dyn Rule>> = BTreeMap::new();
        let all: Vec<Box<dyn Rule>> = vec![
            Box::new(arch::ForbiddenRoleDependencies),
            Box::new(arch::LayerCycle),
            Box::new(metrics::MaxFanIn),
            Box::new(metrics::MaxFanOut),
            Box::new(metrics::MaxPackageSpread),
            Box::new(metrics::MaxMethodsByRole),
            Box::new(naming::BannedSuffixes),
            Box::new(packages::RolePlacement),
            Box::new(packages::RootPackage),
            Box::new(deadcode::UnusedPrivateMembers),
        ];
        for rule in all {
            rules.insert(rule.id(), rule);
        }
        RuleRegistry { rules }
    }
}

impl RuleRegistry {
    pub fn get(&self, id: &str) -> Option<&dyn Rule> {
        self.rules.get(id).map(|b| b.as_ref())
    }
}

/// Execute every enabled rule in `(type, name, role?)` ascending order,
/// expanding by role where `roles` is a list, and freeze the result sorted
/// per spec.md §4.9. Checks `token` between rules so a cancellation request
/// lands promptly.
pub fn execute(
    registry: &RuleRegistry,
    config: &Config,
    facts: &FactIndex,
    token: &CancellationToken,
) -> crate::error::Result<Vec<Finding>> {
    let ctx = EvalContext { facts, config, token };
    let mut ordered: Vec<&RuleDef> = config.rules.iter().filter(|r| r.enabled).collect();
    ordered.sort_by(|a, b| (a.rule_type.as_str(), a.name.as_str()).cmp(&(b.rule_type.as_str(), b.name.as_str())));

    let mut findings = Vec::new();

    for rule_def in ordered {
        if token.is_cancelled() {
            return Err(crate::error::ShamashError::Cancelled);
        }

        let base_id = rule_def.base_id();
        let Some(implementation) = registry.get(&base_id) else { continue };

        let outcome = match &rule_def.roles {
            None => std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                implementation.evaluate(&ctx, rule_def, None)
            })),
            Some(roles) => {
                let mut per_role = Vec::new();
                let mut roles_sorted = roles.clone();
                roles_sorted.sort();
                for role in &roles_sorted {
                    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                        implementation.evaluate(&ctx, rule_def, Some(role))
                    }));
                    match result {
                        Ok(mut fs) => per_role.append(&mut fs),
                        Err(_) => {
                            tracing::error!(rule_id = %base_id, %role, "rule panicked during evaluation, skipping");
                            per_role.push(engine_rule_error(&format!("{base_id}.{role}")));
                        }
                    }
                }
                Ok(per_role)
            }
        };

        match outcome {
            Ok(mut fs) => findings.append(&mut fs),
            Err(_) => {
                tracing::error!(rule_id = %base_id, "rule panicked during evaluation, skipping");
                findings.push(engine_rule_error(&base_id));
            }
        }
    }

    findings.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
    Ok(findings)
}

fn engine_rule_error(rule_id: &str) -> Finding {
    Finding {
        rule_id: "engine.ruleError".to_string(),
        message: format!("rule '{rule_id}' failed during evaluation and was skipped"),
        file_path: String::new(),
        severity: crate::config::schema::Severity::Error,
        class_fqn: None,
        member_name: None,
        line: None,
        data: BTreeMap::from([("failedRuleId".to_string(), rule_id.to_string())]),
    }
}

/// Compile a rule's scope (if present) plus its `roles` list (if present)
/// into one predicate, per C7 + the role-AND clause in spec.md §4.7.
pub fn compile_scope<'a>(
    rule_def: &'a RuleDef,
    role_override: Option<&'a str>,
) -> Box<dyn Fn(&ClassFact, &Config, &FactIndex) -> bool + 'a> {
    let scope = rule_def.scope.clone();
    let roles_filter: Option<Vec<String>> = role_override
        .map(|r| vec![r.to_string()])
        .or_else(|| rule_def.roles.clone());

    Box::new(move |class: &ClassFact, config: &Config, facts: &FactIndex| {
        let _ = config;
        let role = facts.class_to_role(&class.type_ref);

        if let Some(roles) = &roles_filter {
            match &role {
                Some(r) if roles.contains(r) => {}
                _ => return false,
            }
        }

        let Some(scope) = &scope else { return true };

        if let Some(include_roles) = &scope.include_roles {
            match &role {
                Some(r) if include_roles.contains(r) => {}
                _ => return false,
            }
        }
        if let Some(r) = &role {
            if scope.exclude_roles.contains(r) {
                return false;
            }
        }
        if !match_any_regex(&scope.include_packages, &class.type_ref.package_name(), true) {
            return false;
        }
        if match_any_regex(&scope.exclude_packages, &class.type_ref.package_name(), false) {
            return false;
        }
        if !match_any_glob(&scope.include_globs, &class.location.file_path(), true) {
            return false;
        }
        if match_any_glob(&scope.exclude_globs, &class.location.file_path(), false) {
            return false;
        }
        true
    })
}

fn match_any_regex(patterns: &[String], value: &str, empty_default: bool) -> bool {
    if patterns.is_empty() {
        return empty_default;
    }
    patterns.iter().any(|p| {
        regex::Regex::new(&format!("^(?:{p})$"))
            .map(|re| re.is_match(value))
            .unwrap_or(false)
    })
}

fn match_any_glob(patterns: &[String], value: &str, empty_default: bool) -> bool {
    if patterns.is_empty() {
        return empty_default;
    }
    patterns.iter().any(|p| crate::scope::glob_match(p, value))
}

pub(crate) fn param_i64(params: &BTreeMap<String, RawValue>, key: &str) -> Option<i64> {
    params.get(key).and_then(RawValue::as_i64)
}

pub(crate) fn param_bool(params: &BTreeMap<String, RawValue>, key: &str) -> Option<bool> {
    params.get(key).and_then(RawValue::as_bool)
}

pub(crate) fn param_str_list(params: &BTreeMap<String, RawValue>, key: &str) -> Vec<String> {
    params
        .get(key)
        .and_then(RawValue::as_list)
        .map(|items| items.iter().filter_map(RawValue::as_scalar_string).collect())
        .unwrap_or_default()
}

pub(crate) fn unknown_keys(
    params: &BTreeMap<String, RawValue>,
    known: &[&str],
    path: &str,
) -> Vec<ValidationIssue> {
    params
        .keys()
        .filter(|k| !known.contains(&k.as_str()))
        .map(|k| ValidationIssue::error(format!("{path}.{k}"), format!("unknown parameter '{k}'")))
        .collect()
}
