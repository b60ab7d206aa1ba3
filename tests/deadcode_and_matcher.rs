//! Coverage for the pieces the six headline scenarios don't touch directly:
//! transitive `implements` role matching and `deadcode.unusedPrivateMembers`
//! against the self-edge policy `extract::PartialFacts::push_edge` enforces.

mod support;

use shamash_asm::cancel::CancellationToken;
use shamash_asm::model::{Access, DependencyKind};
use shamash_asm::rules::RuleRegistry;

use support::*;
use std::collections::BTreeSet;

/// `Runnable` is implemented by `Worker`, which is extended by `FastWorker`;
/// the `worker` role's `implements` matcher must walk both the interface set
/// and the superclass chain to classify `FastWorker`.
#[test]
fn implements_matcher_walks_superclass_chain() {
    let config = config_from_yaml(
        r#"
version: 1
project: {}
roles:
  worker:
    priority: 1
    match: { type: implements, fqn: com.pit.app.Runnable }
"#,
    );

    let mut worker = class("com.pit.app.Worker");
    worker.interfaces.insert(type_ref_for_test("com.pit.app.Runnable"));
    let runnable = class("com.pit.app.Runnable");
    let mut fast_worker = class("com.pit.app.FastWorker");
    fast_worker.super_type = Some(type_ref_for_test("com.pit.app.Worker"));

    let facts = fact_index(vec![worker, runnable, fast_worker], vec![], vec![], vec![]);
    let assignments = shamash_asm::roles::classify(&config, &facts);

    assert_eq!(
        assignments.class_to_role.get("com.pit.app.FastWorker").map(String::as_str),
        Some("worker")
    );
}

fn type_ref_for_test(fqn: &str) -> shamash_asm::model::TypeRef {
    shamash_asm::model::TypeRef::from_internal(&fqn.replace('.', "/")).unwrap()
}

/// A private field/method referenced only by a sibling class is still
/// unused; one referenced from within its own declaring class (a
/// self-edge, kept by `push_edge`'s member-usage exception) is not.
#[test]
fn unused_private_members_respects_self_reference_edges() {
    let config = config_from_yaml(
        r#"
version: 1
project: {}
rules:
  - type: deadcode
    name: unusedPrivateMembers
"#,
    );

    let owner = "com.pit.app.service.Worker";
    let mut class_fact = class(owner);
    class_fact.access = Access(Access::PUBLIC);

    let used_field = private_field(owner, "cache");
    let dead_field = private_field(owner, "scratch");
    let used_method = {
        let mut m = private_method(owner, "helper");
        m.location = loc_at(42);
        m
    };
    let dead_method = private_method(owner, "unreachable");

    let self_field_ref = edge_detail(owner, owner, DependencyKind::FieldAccess, "cache");
    let self_method_call =
        edge_detail(owner, owner, DependencyKind::MethodCall, "helper:()V");

    let facts = fact_index(
        vec![class_fact],
        vec![used_method, dead_method],
        vec![used_field, dead_field],
        vec![self_field_ref, self_method_call],
    );

    let registry = RuleRegistry::default();
    let findings =
        shamash_asm::rules::execute(&registry, &config, &facts, &CancellationToken::new()).unwrap();

    let dead_names: BTreeSet<&str> =
        findings.iter().filter_map(|f| f.member_name.as_deref()).collect();

    assert_eq!(dead_names, BTreeSet::from(["scratch", "unreachable"]));
    assert!(!dead_names.contains("cache"));
    assert!(!dead_names.contains("helper"));
}
