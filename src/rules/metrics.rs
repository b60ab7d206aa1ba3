//! `metrics.*` rules: aggregate thresholds over the dependency graph and
//! per-class method counts.

use std::collections::BTreeMap;

use crate::config::raw::RawValue;
use crate::config::schema::RuleDef;
use crate::error::ValidationIssue;
use crate::graph::{Granularity, Graph};
use crate::model::Finding;

use super::{compile_scope, param_bool, param_i64, unknown_keys, EvalContext, Rule};

fn granularity_param(params: &BTreeMap<String, RawValue>, default: Granularity) -> Granularity {
    match params
        .get("granularity")
        .and_then(RawValue::as_scalar_string)
        .as_deref()
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("class") => Granularity::Class,
        Some("package") => Granularity::Package,
        Some("module") => Granularity::Module,
        _ => default,
    }
}

fn anchor_class<'a>(
    ctx: &'a EvalContext,
    rule_def: &RuleDef,
    role: Option<&str>,
) -> Option<&'a crate::model::ClassFact> {
    let scope = compile_scope(rule_def, role);
    let mut classes: Vec<_> = ctx
        .facts
        .classes()
        .filter(|c| scope(c, ctx.config, ctx.facts))
        .collect();
    classes.sort_by_key(|c| c.fq_name());
    classes.into_iter().next()
}

fn validate_common(
    params: &BTreeMap<String, RawValue>,
    path: &str,
    known: &[&str],
) -> Vec<ValidationIssue> {
    let mut issues = unknown_keys(params, known, path);
    match params.get("max").and_then(RawValue::as_i64) {
        Some(v) if v >= 0 => {}
        Some(_) => issues.push(ValidationIssue::error(format!("{path}.max"), "must be >= 0")),
        None => issues.push(ValidationIssue::error(format!("{path}.max"), "required")),
    }
    if let Some(top) = params.get("top").and_then(RawValue::as_i64) {
        if top < 0 {
            issues.push(ValidationIssue::error(format!("{path}.top"), "must be >= 0"));
        }
    }
    issues
}

fn top_violators(
    graph: &Graph,
    metric: impl Fn(&Graph, usize) -> usize,
    max: i64,
    top: usize,
) -> (Vec<(String, usize)>, usize) {
    let mut violators: Vec<(String, usize)> = (0..graph.node_count())
        .map(|idx| (graph.node_id(idx).to_string(), metric(graph, idx)))
        .filter(|(_, v)| *v as i64 > max)
        .collect();
    violators.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    let total = violators.len();
    violators.truncate(top);
    (violators, total)
}

fn aggregate_finding(
    rule_id: String,
    rule_def: &RuleDef,
    anchor: Option<&crate::model::ClassFact>,
    violators: &[(String, usize)],
    total: usize,
    top: usize,
    metric_key: &str,
) -> Vec<Finding> {
    if violators.is_empty() {
        return Vec::new();
    }
    let examples = violators.iter().map(|(id, v)| format!("{id}:{v}")).collect::<Vec<_>>().join(",");
    let mut data = BTreeMap::new();
    data.insert("violators".to_string(), total.to_string());
    data.insert("examples".to_string(), examples);
    data.insert("truncated".to_string(), (total > top).to_string());
    vec![Finding {
        rule_id,
        message: format!("{} violator(s) exceed the configured {}", total, metric_key),
        file_path: anchor.map(|c| c.location.file_path()).unwrap_or_default(),
        severity: rule_def.severity,
        class_fqn: None,
        member_name: None,
        line: anchor.and_then(|c| c.location.line),
        data,
    }]
}

fn canonical_id(base: &str, role: Option<&str>) -> String {
    match role {
        Some(r) => format!("{base}.{r}"),
        None => base.to_string(),
    }
}

pub struct MaxFanIn;

impl Rule for MaxFanIn {
    fn id(&self) -> &'static str {
        "metrics.maxFanIn"
    }

    fn validate_params(&self, params: &BTreeMap<String, RawValue>, path: &str) -> Vec<ValidationIssue> {
        validate_common(params, path, &["max", "granularity", "includeExternal", "top"])
    }

    fn evaluate(&self, ctx: &EvalContext, rule_def: &RuleDef, role: Option<&str>) -> Vec<Finding> {
        let max = param_i64(&rule_def.params, "max").unwrap_or(0);
        let top = param_i64(&rule_def.params, "top").unwrap_or(10).max(0) as usize;
        let include_external = param_bool(&rule_def.params, "includeExternal").unwrap_or(false);
        let granularity = granularity_param(&rule_def.params, Granularity::Package);

        let graph = Graph::build(ctx.facts, granularity, include_external);
        let (violators, total) = top_violators(&graph, Graph::fan_in, max, top);
        aggregate_finding(
            canonical_id(self.id(), role),
            rule_def,
            anchor_class(ctx, rule_def, role),
            &violators,
            total,
            top,
            "maximum fan-in",
        )
    }
}

pub struct MaxFanOut;

impl Rule for MaxFanOut {
    fn id(&self) -> &'static str {
        "metrics.maxFanOut"
    }

    fn validate_params(&self, params: &BTreeMap<String, RawValue>, path: &str) -> Vec<ValidationIssue> {
        validate_common(params, path, &["max", "granularity", "includeExternal", "top"])
    }

    fn evaluate(&self, ctx: &EvalContext, rule_def: &RuleDef, role: Option<&str>) -> Vec<Finding> {
        let max = param_i64(&rule_def.params, "max").unwrap_or(0);
        let top = param_i64(&rule_def.params, "top").unwrap_or(10).max(0) as usize;
        let include_external = param_bool(&rule_def.params, "includeExternal").unwrap_or(false);
        let granularity = granularity_param(&rule_def.params, Granularity::Package);

        let graph = Graph::build(ctx.facts, granularity, include_external);
        let (violators, total) = top_violators(&graph, Graph::fan_out, max, top);
        aggregate_finding(
            canonical_id(self.id(), role),
            rule_def,
            anchor_class(ctx, rule_def, role),
            &violators,
            total,
            top,
            "maximum fan-out",
        )
    }
}

pub struct MaxPackageSpread;

impl Rule for MaxPackageSpread {
    fn id(&self) -> &'static str {
        "metrics.maxPackageSpread"
    }

    fn validate_params(&self, params: &BTreeMap<String, RawValue>, path: &str) -> Vec<ValidationIssue> {
        validate_common(params, path, &["max", "includeExternal", "includeSelf", "top"])
    }

    fn evaluate(&self, ctx: &EvalContext, rule_def: &RuleDef, role: Option<&str>) -> Vec<Finding> {
        let max = param_i64(&rule_def.params, "max").unwrap_or(0);
        let top = param_i64(&rule_def.params, "top").unwrap_or(20).max(0) as usize;
        let include_external = param_bool(&rule_def.params, "includeExternal").unwrap_or(false);
        let include_self = param_bool(&rule_def.params, "includeSelf").unwrap_or(false);

        let mut packages: Vec<String> =
            ctx.facts.classes().map(|c| c.type_ref.package_name()).collect::<std::collections::BTreeSet<_>>().into_iter().collect();
        packages.sort();

        let mut violators: Vec<(String, usize)> = packages
            .into_iter()
            .map(|pkg| {
                let spread = crate::graph::package_spread(ctx.facts, &pkg, include_external, include_self);
                (pkg, spread)
            })
            .filter(|(_, spread)| *spread as i64 > max)
            .collect();
        violators.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        let total = violators.len();
        violators.truncate(top);

        aggregate_finding(
            canonical_id(self.id(), role),
            rule_def,
            anchor_class(ctx, rule_def, role),
            &violators,
            total,
            top,
            "maximum package spread",
        )
    }
}

pub struct MaxMethodsByRole;

impl Rule for MaxMethodsByRole {
    fn id(&self) -> &'static str {
        "metrics.maxMethodsByRole"
    }

    fn validate_params(&self, params: &BTreeMap<String, RawValue>, path: &str) -> Vec<ValidationIssue> {
        let mut issues = unknown_keys(params, &["max", "includeInherited"], path);
        match params.get("max").and_then(RawValue::as_i64) {
            Some(v) if v >= 0 => {}
            Some(_) => issues.push(ValidationIssue::error(format!("{path}.max"), "must be >= 0")),
            None => issues.push(ValidationIssue::error(format!("{path}.max"), "required")),
        }
        issues
    }

    fn evaluate(&self, ctx: &EvalContext, rule_def: &RuleDef, role: Option<&str>) -> Vec<Finding> {
        let max = param_i64(&rule_def.params, "max").unwrap_or(0);
        let include_inherited = param_bool(&rule_def.params, "includeInherited").unwrap_or(false);
        let scope = compile_scope(rule_def, role);

        let mut findings = Vec::new();
        let mut classes: Vec<_> = ctx.facts.classes().filter(|c| scope(c, ctx.config, ctx.facts)).collect();
        classes.sort_by_key(|c| c.fq_name());

        for class in classes {
            let mut count = declared_method_count(ctx, &class.type_ref);
            if include_inherited {
                let mut current = class.super_type.clone();
                let mut seen = std::collections::BTreeSet::new();
                while let Some(t) = current {
                    if !seen.insert(t.internal_name().to_string()) {
                        break;
                    }
                    count += declared_method_count(ctx, &t);
                    current = ctx.facts.class(&t).and_then(|c| c.super_type.clone());
                }
            }
            if count as i64 > max {
                let role_id = ctx.facts.class_to_role(&class.type_ref).unwrap_or_default();
                let mut data = BTreeMap::new();
                data.insert("actual".to_string(), count.to_string());
                data.insert("role".to_string(), role_id);
                findings.push(Finding {
                    rule_id: canonical_id(self.id(), role),
                    message: format!("class declares {count} methods, exceeding the configured maximum"),
                    file_path: class.location.file_path(),
                    severity: rule_def.severity,
                    class_fqn: Some(class.fq_name()),
                    member_name: None,
                    line: class.location.line,
                    data,
                });
            }
        }
        findings
    }
}

fn declared_method_count(ctx: &EvalContext, owner: &crate::model::TypeRef) -> usize {
    ctx.facts.methods_of(owner).filter(|m| !m.is_constructor).count()
}
