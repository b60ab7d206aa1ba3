//! `naming.*` rules: surface-level checks on class names.

use std::collections::BTreeMap;

use crate::config::raw::RawValue;
use crate::config::schema::RuleDef;
use crate::error::ValidationIssue;
use crate::model::Finding;

use super::{compile_scope, param_str_list, unknown_keys, EvalContext, Rule};

fn canonical_id(base: &str, role: Option<&str>) -> String {
    match role {
        Some(r) => format!("{base}.{r}"),
        None => base.to_string(),
    }
}

fn simple_name(fq_name: &str) -> &str {
    fq_name.rsplit('.').next().unwrap_or(fq_name)
}

pub struct BannedSuffixes;

impl Rule for BannedSuffixes {
    fn id(&self) -> &'static str {
        "naming.bannedSuffixes"
    }

    fn validate_params(&self, params: &BTreeMap<String, RawValue>, path: &str) -> Vec<ValidationIssue> {
        let mut issues = unknown_keys(params, &["suffixes"], path);
        match params.get("suffixes").and_then(RawValue::as_list) {
            Some(items) if !items.is_empty() => {
                for (i, item) in items.iter().enumerate() {
                    if item.as_scalar_string().is_none() {
                        issues.push(ValidationIssue::error(format!("{path}.suffixes[{i}]"), "expected a string"));
                    }
                }
            }
            _ => issues.push(ValidationIssue::error(format!("{path}.suffixes"), "required non-empty list")),
        }
        issues
    }

    fn evaluate(&self, ctx: &EvalContext, rule_def: &RuleDef, role: Option<&str>) -> Vec<Finding> {
        let suffixes = param_str_list(&rule_def.params, "suffixes");
        let scope = compile_scope(rule_def, role);

        let mut findings = Vec::new();
        let mut classes: Vec<_> = ctx.facts.classes().filter(|c| scope(c, ctx.config, ctx.facts)).collect();
        classes.sort_by_key(|c| c.fq_name());

        for class in classes {
            let name = simple_name(&class.fq_name());
            let Some(matched) = suffixes.iter().find(|s| name.ends_with(s.as_str())) else { continue };
            let mut data = BTreeMap::new();
            data.insert("suffix".to_string(), matched.clone());
            findings.push(Finding {
                rule_id: canonical_id(self.id(), role),
                message: format!("class name '{name}' uses banned suffix '{matched}'"),
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
