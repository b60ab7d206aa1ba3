//! `deadcode.*` rules: private members with no in-class reference.

use std::collections::{BTreeMap, BTreeSet};

use crate::config::raw::RawValue;
use crate::config::schema::RuleDef;
use crate::error::ValidationIssue;
use crate::model::{DependencyKind, Finding};

use super::{compile_scope, unknown_keys, EvalContext, Rule};

fn canonical_id(base: &str, role: Option<&str>) -> String {
    match role {
        Some(r) => format!("{base}.{r}"),
        None => base.to_string(),
    }
}

/// `detail` tokens of edges that reference a member of their own owning
/// class: field accesses key on the field name, method calls key on
/// `name:descriptor` (see `extract::emit_instruction_edge`).
fn referenced_details<'a>(ctx: &'a EvalContext, owner_internal: &str) -> BTreeSet<&'a str> {
    ctx.facts
        .edges()
        .iter()
        .filter(|e| e.from.internal_name() == owner_internal)
        .filter(|e| matches!(e.kind, DependencyKind::FieldAccess | DependencyKind::MethodCall))
        .filter_map(|e| e.detail.as_deref())
        .collect()
}

pub struct UnusedPrivateMembers;

impl Rule for UnusedPrivateMembers {
    fn id(&self) -> &'static str {
        "deadcode.unusedPrivateMembers"
    }

    fn validate_params(&self, params: &BTreeMap<String, RawValue>, path: &str) -> Vec<ValidationIssue> {
        unknown_keys(params, &[], path)
    }

    fn evaluate(&self, ctx: &EvalContext, rule_def: &RuleDef, role: Option<&str>) -> Vec<Finding> {
        let scope = compile_scope(rule_def, role);
        let mut findings = Vec::new();

        let mut classes: Vec<_> = ctx.facts.classes().filter(|c| scope(c, ctx.config, ctx.facts)).collect();
        classes.sort_by_key(|c| c.fq_name());

        for class in classes {
            let owner = class.type_ref.internal_name();
            let referenced = referenced_details(ctx, owner);

            for field in ctx.facts.fields_of(&class.type_ref) {
                if !field.access.is_private() || field.name.starts_with('_') {
                    continue;
                }
                if referenced.contains(field.name.as_str()) {
                    continue;
                }
                findings.push(member_finding(self.id(), role, rule_def, class, &field.name, "field", field.location.line));
            }

            for method in ctx.facts.methods_of(&class.type_ref) {
                if !method.access.is_private() || method.is_constructor || method.name.starts_with('_') {
                    continue;
                }
                let key = format!("{}:{}", method.name, method.descriptor);
                if referenced.contains(key.as_str()) {
                    continue;
                }
                findings.push(member_finding(self.id(), role, rule_def, class, &method.name, "method", method.location.line));
            }
        }
        findings
    }
}

fn member_finding(
    base_id: &str,
    role: Option<&str>,
    rule_def: &RuleDef,
    class: &crate::model::ClassFact,
    member_name: &str,
    kind: &str,
    line: Option<u32>,
) -> Finding {
    let mut data = BTreeMap::new();
    data.insert("memberKind".to_string(), kind.to_string());
    Finding {
        rule_id: canonical_id(base_id, role),
        message: format!("private {kind} '{member_name}' is never referenced within its declaring class"),
        file_path: class.location.file_path(),
        severity: rule_def.severity,
        class_fqn: Some(class.fq_name()),
        member_name: Some(member_name.to_string()),
        line: line.or(class.location.line),
        data,
    }
}
