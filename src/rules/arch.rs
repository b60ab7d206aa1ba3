//! `arch.*` rules: structural dependency constraints over role membership
//! and over the cyclic structure of the dependency graph.

use std::collections::BTreeMap;

use crate::config::raw::RawValue;
use crate::config::schema::RuleDef;
use crate::error::ValidationIssue;
use crate::graph::scc;
use crate::model::{DependencyKind, Finding};

use super::{compile_scope, unknown_keys, EvalContext, Rule};

struct ForbiddenEntry {
    from: String,
    to: Vec<String>,
    message: Option<String>,
}

fn parse_forbidden(params: &BTreeMap<String, RawValue>) -> Vec<ForbiddenEntry> {
    params
        .get("forbidden")
        .and_then(RawValue::as_list)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| {
                    let map = item.as_map()?;
                    let from = map.get("from")?.as_scalar_string()?;
                    let to = map.get("to")?.as_list()?.iter().filter_map(RawValue::as_scalar_string).collect();
                    let message = map.get("message").and_then(RawValue::as_scalar_string);
                    Some(ForbiddenEntry { from, to, message })
                })
                .collect()
        })
        .unwrap_or_default()
}

fn parse_kinds(params: &BTreeMap<String, RawValue>) -> Option<Vec<DependencyKind>> {
    let list = params.get("kinds")?.as_list()?;
    Some(list.iter().filter_map(RawValue::as_scalar_string).filter_map(|s| DependencyKind::from_camel_alias(&s)).collect())
}

pub struct ForbiddenRoleDependencies;

impl Rule for ForbiddenRoleDependencies {
    fn id(&self) -> &'static str {
        "arch.forbiddenRoleDependencies"
    }

    fn validate_params(&self, params: &BTreeMap<String, RawValue>, path: &str) -> Vec<ValidationIssue> {
        let mut issues = unknown_keys(params, &["kinds", "forbidden"], path);
        match params.get("forbidden").and_then(RawValue::as_list) {
            Some(items) if !items.is_empty() => {
                for (i, item) in items.iter().enumerate() {
                    let item_path = format!("{path}.forbidden[{i}]");
                    let Some(map) = item.as_map() else {
                        issues.push(ValidationIssue::error(&item_path, "expected a map"));
                        continue;
                    };
                    if !map.get("from").and_then(RawValue::as_scalar_string).is_some() {
                        issues.push(ValidationIssue::error(format!("{item_path}.from"), "required"));
                    }
                    match map.get("to").and_then(RawValue::as_list) {
                        Some(to) if !to.is_empty() => {}
                        _ => issues.push(ValidationIssue::error(format!("{item_path}.to"), "required non-empty list")),
                    }
                }
            }
            _ => issues.push(ValidationIssue::error(format!("{path}.forbidden"), "required non-empty list")),
        }
        if let Some(kinds) = params.get("kinds").and_then(RawValue::as_list) {
            for (i, k) in kinds.iter().enumerate() {
                let Some(s) = k.as_scalar_string() else {
                    issues.push(ValidationIssue::error(format!("{path}.kinds[{i}]"), "expected a string"));
                    continue;
                };
                if DependencyKind::from_camel_alias(&s).is_none() {
                    issues.push(ValidationIssue::error(format!("{path}.kinds[{i}]"), format!("unknown dependency kind '{s}'")));
                }
            }
        }
        issues
    }

    fn evaluate(&self, ctx: &EvalContext, rule_def: &RuleDef, role: Option<&str>) -> Vec<Finding> {
        let forbidden = parse_forbidden(&rule_def.params);
        let kinds = parse_kinds(&rule_def.params);
        let scope = compile_scope(rule_def, role);

        let mut findings = Vec::new();
        for edge in ctx.facts.edges() {
            if let Some(kinds) = &kinds {
                if !kinds.contains(&edge.kind) {
                    continue;
                }
            }
            let Some(from_class) = ctx.facts.class(&edge.from) else { continue };
            if !scope(from_class, ctx.config, ctx.facts) {
                continue;
            }
            let Some(from_role) = ctx.facts.class_to_role(&edge.from) else { continue };
            let to_role = ctx.facts.class_to_role(&edge.to);

            for entry in &forbidden {
                if entry.from != from_role {
                    continue;
                }
                let matches_to = to_role.as_deref().map(|r| entry.to.iter().any(|t| t == r)).unwrap_or(false);
                if !matches_to {
                    continue;
                }
                let message = entry.message.clone().unwrap_or_else(|| {
                    format!("class in role '{from_role}' must not depend on role '{}'", to_role.clone().unwrap_or_default())
                });
                let mut data = BTreeMap::new();
                data.insert("toTypeFqn".to_string(), edge.to.fq_name());
                findings.push(Finding {
                    rule_id: canonical_id(self.id(), role),
                    message,
                    file_path: from_class.location.file_path(),
                    severity: rule_def.severity,
                    class_fqn: Some(from_class.fq_name()),
                    member_name: None,
                    line: edge.location.line,
                    data,
                });
                break;
            }
        }
        findings
    }
}

fn canonical_id(base: &str, role: Option<&str>) -> String {
    match role {
        Some(r) => format!("{base}.{r}"),
        None => base.to_string(),
    }
}

pub struct LayerCycle;

impl Rule for LayerCycle {
    fn id(&self) -> &'static str {
        "arch.layerCycle"
    }

    fn validate_params(&self, params: &BTreeMap<String, RawValue>, path: &str) -> Vec<ValidationIssue> {
        let mut issues = unknown_keys(params, &["granularity", "includeExternal"], path);
        if let Some(g) = params.get("granularity").and_then(RawValue::as_scalar_string) {
            if !["class", "package", "module"].contains(&g.to_ascii_lowercase().as_str()) {
                issues.push(ValidationIssue::error(format!("{path}.granularity"), "must be one of: class, package, module"));
            }
        }
        issues
    }

    fn evaluate(&self, ctx: &EvalContext, rule_def: &RuleDef, role: Option<&str>) -> Vec<Finding> {
        let granularity = granularity_param(&rule_def.params);
        let include_external = super::param_bool(&rule_def.params, "includeExternal").unwrap_or(false);
        let graph = crate::graph::Graph::build(ctx.facts, granularity, include_external);

        if ctx.token.is_cancelled() {
            return Vec::new();
        }

        let mut findings = Vec::new();
        for component in scc::strongly_connected_components(&graph) {
            if !scc::is_cyclic(&component) {
                continue;
            }
            let mut members: Vec<&str> = component.iter().map(|&idx| graph.node_id(idx)).collect();
            members.sort();
            let cycle = scc::representative_cycle(&graph, &component);
            let cycle_path: Vec<&str> = cycle.iter().map(|&idx| graph.node_id(idx)).collect();
            let anchor = cycle_path.first().copied().unwrap_or_default();
            let mut data = BTreeMap::new();
            data.insert("members".to_string(), members.join(","));
            data.insert("size".to_string(), members.len().to_string());
            data.insert("representativeCycle".to_string(), cycle_path.join(" -> "));
            findings.push(Finding {
                rule_id: canonical_id(self.id(), role),
                message: format!("cyclic dependency across {} nodes, e.g. {} -> {}", members.len(), cycle_path.join(" -> "), anchor),
                file_path: String::new(),
                severity: rule_def.severity,
                class_fqn: None,
                member_name: None,
                line: None,
                data,
            });
        }
        findings
    }
}

fn granularity_param(params: &BTreeMap<String, RawValue>) -> crate::graph::Granularity {
    use crate::graph::Granularity;
    match params.get("granularity").and_then(RawValue::as_scalar_string).as_deref().map(str::to_ascii_lowercase).as_deref() {
        Some("class") => Granularity::Class,
        Some("module") => Granularity::Module,
        _ => Granularity::Package,
    }
}
