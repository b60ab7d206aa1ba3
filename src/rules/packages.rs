//! `packages.*` rules: package placement constraints.

use std::collections::BTreeMap;

use crate::config::raw::RawValue;
use crate::config::schema::{RootPackageMode, RuleDef};
use crate::error::ValidationIssue;
use crate::model::Finding;

use super::{compile_scope, param_str_list, unknown_keys, EvalContext, Rule};

fn canonical_id(base: &str, role: Option<&str>) -> String {
    match role {
        Some(r) => format!("{base}.{r}"),
        None => base.to_string(),
    }
}

fn compile_full_match(patterns: &[String]) -> Vec<regex::Regex> {
    patterns.iter().filter_map(|p| regex::Regex::new(&format!("^(?:{p})$")).ok()).collect()
}

pub struct RolePlacement;

impl Rule for RolePlacement {
    fn id(&self) -> &'static str {
        "packages.rolePlacement"
    }

    fn validate_params(&self, params: &BTreeMap<String, RawValue>, path: &str) -> Vec<ValidationIssue> {
        let mut issues = unknown_keys(params, &["allowed"], path);
        match params.get("allowed").and_then(RawValue::as_list) {
            Some(items) if !items.is_empty() => {
                for (i, item) in items.iter().enumerate() {
                    let Some(s) = item.as_scalar_string() else {
                        issues.push(ValidationIssue::error(format!("{path}.allowed[{i}]"), "expected a string"));
                        continue;
                    };
                    if regex::Regex::new(&s).is_err() {
                        issues.push(ValidationIssue::error(format!("{path}.allowed[{i}]"), format!("invalid regex '{s}'")));
                    }
                }
            }
            _ => issues.push(ValidationIssue::error(format!("{path}.allowed"), "required non-empty list")),
        }
        issues
    }

    fn evaluate(&self, ctx: &EvalContext, rule_def: &RuleDef, role: Option<&str>) -> Vec<Finding> {
        let allowed = compile_full_match(&param_str_list(&rule_def.params, "allowed"));
        let scope = compile_scope(rule_def, role);

        let mut findings = Vec::new();
        let mut classes: Vec<_> = ctx.facts.classes().filter(|c| scope(c, ctx.config, ctx.facts)).collect();
        classes.sort_by_key(|c| c.fq_name());

        for class in classes {
            let pkg = class.type_ref.package_name();
            if allowed.iter().any(|re| re.is_match(&pkg)) {
                continue;
            }
            let mut data = BTreeMap::new();
            data.insert("package".to_string(), pkg.clone());
            findings.push(Finding {
                rule_id: canonical_id(self.id(), role),
                message: format!("package '{pkg}' is not among the packages allowed for this role"),
                file_path: class.location.file_path(),
                severity: rule_def.severity,
                class_fqn: Some(class.fq_name()),
                member_name: None,
                line: class.location.line,
                data,
            });
        }
        findings
    }
}

pub struct RootPackage;

impl RootPackage {
    /// `AUTO` mode has no configured value; derive one as the longest
    /// package prefix shared by every known class. Falls back to `None`
    /// (yielding zero findings) when the scan has no classes, or the
    /// classes share no non-empty common prefix.
    fn derive_auto_root(ctx: &EvalContext) -> Option<String> {
        let mut packages = ctx.facts.classes().map(|c| c.type_ref.package_name()).filter(|p| !p.is_empty());
        let first = packages.next()?;
        let mut prefix: Vec<&str> = first.split('.').collect();
        for pkg in packages {
            let segments: Vec<&str> = pkg.split('.').collect();
            let common = prefix.iter().zip(segments.iter()).take_while(|(a, b)| a == b).count();
            prefix.truncate(common);
            if prefix.is_empty() {
                return None;
            }
        }
        Some(prefix.join("."))
    }
}

impl Rule for RootPackage {
    fn id(&self) -> &'static str {
        "packages.rootPackage"
    }

    fn validate_params(&self, params: &BTreeMap<String, RawValue>, path: &str) -> Vec<ValidationIssue> {
        let mut issues = unknown_keys(params, &["value"], path);
        if let Some(v) = params.get("value") {
            if v.as_scalar_string().is_none() {
                issues.push(ValidationIssue::error(format!("{path}.value"), "expected a string"));
            }
        }
        issues
    }

    fn evaluate(&self, ctx: &EvalContext, rule_def: &RuleDef, role: Option<&str>) -> Vec<Finding> {
        let configured = rule_def.params.get("value").and_then(RawValue::as_scalar_string);
        let root = match configured {
            Some(v) => Some(v),
            None => match ctx.config.project.root_package.mode {
                RootPackageMode::Explicit => ctx.config.project.root_package.value.clone(),
                RootPackageMode::Auto => ctx.config.project.root_package.value.clone().or_else(|| Self::derive_auto_root(ctx)),
            },
        };
        let Some(root) = root.filter(|r| !r.is_empty()) else { return Vec::new() };

        let scope = compile_scope(rule_def, role);
        let mut findings = Vec::new();
        let mut classes: Vec<_> = ctx.facts.classes().filter(|c| scope(c, ctx.config, ctx.facts)).collect();
        classes.sort_by_key(|c| c.fq_name());

        for class in classes {
            let pkg = class.type_ref.package_name();
            let in_root = pkg == root || pkg.starts_with(&format!("{root}."));
            if in_root {
                continue;
            }
            let mut data = BTreeMap::new();
            data.insert("package".to_string(), pkg.clone());
            data.insert("root".to_string(), root.clone());
            findings.push(Finding {
                rule_id: canonical_id(self.id(), role),
                message: format!("package '{pkg}' is outside root package '{root}'"),
                file_path: class.location.file_path(),
                severity: rule_def.severity,
                class_fqn: Some(class.fq_name()),
                member_name: None,
                line: class.location.line,
                data,
            });
        }
        findings
    }
}
