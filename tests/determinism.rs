//! Determinism and idempotence properties that aren't tied to any one rule:
//! shuffled input order must not change the frozen finding list, and
//! re-applying suppression over its own output must be a no-op.

mod support;

use shamash_asm::cancel::CancellationToken;
use shamash_asm::extract::PartialFacts;
use shamash_asm::facts::FactIndex;
use shamash_asm::model::DependencyKind;
use shamash_asm::rules::RuleRegistry;

use support::*;

fn today() -> chrono::NaiveDate {
    chrono::NaiveDate::from_ymd_opt(2026, 7, 26).unwrap()
}

fn fan_in_config() -> shamash_asm::config::schema::Config {
    config_from_yaml(
        r#"
version: 1
project: {}
rules:
  - type: metrics
    name: maxFanIn
    params:
      max: 1
      granularity: class
"#,
    )
}

/// Running the same facts through the pipeline twice, with the unit's
/// underlying classes/edges supplied in reverse order the second time,
/// produces byte-identical findings -- C2's merge and C9's final sort must
/// both be order-independent.
#[test]
fn finding_order_is_independent_of_input_order() {
    let config = fan_in_config();
    let hub = class("com.example.Hub");
    let a = class("com.example.A");
    let b = class("com.example.B");
    let edges = vec![
        edge("com.example.A", "com.example.Hub", DependencyKind::MethodCall),
        edge("com.example.B", "com.example.Hub", DependencyKind::MethodCall),
    ];

    let forward = run(&config, vec![hub.clone(), a.clone(), b.clone()], edges.clone());
    let mut reversed_edges = edges.clone();
    reversed_edges.reverse();
    let reversed = run(&config, vec![b, a, hub], reversed_edges);

    assert_eq!(forward, reversed);
}

/// `suppression::apply` re-run over its own output must not accumulate a
/// second `engine.exceptionExpired` diagnostic for the same expired exception.
#[test]
fn suppression_apply_is_idempotent_over_its_own_output() {
    let config = config_from_yaml(
        r#"
version: 1
project: {}
roles:
  service:
    priority: 1
    match: { type: classNameEndsWith, suffix: Service }
rules:
  - type: metrics
    name: maxMethodsByRole
    roles: [service]
    params:
      max: 0
exceptions:
  - id: stale-suppression
    reason: no longer relevant
    expiresOn: "2020-01-01"
    match:
      classNameRegex: "com\\.pit\\.app\\..*"
    suppress: ["all"]
"#,
    );

    let svc = class("com.pit.app.UserService");
    let m = public_method("com.pit.app.UserService", "compute");
    let facts = fact_index(vec![svc], vec![m], vec![], vec![]);
    let registry = RuleRegistry::default();
    let findings = shamash_asm::rules::execute(&registry, &config, &facts, &CancellationToken::new()).unwrap();

    let once = shamash_asm::suppression::apply(findings, &config, &facts, today(), None);
    let twice = shamash_asm::suppression::apply(once.clone(), &config, &facts, today(), None);

    assert_eq!(once, twice);
    assert_eq!(once.iter().filter(|f| f.rule_id == "engine.exceptionExpired").count(), 1);
}

fn run(
    config: &shamash_asm::config::schema::Config,
    classes: Vec<shamash_asm::model::ClassFact>,
    edges: Vec<shamash_asm::model::DependencyEdge>,
) -> Vec<shamash_asm::model::Finding> {
    let facts = FactIndex::build([PartialFacts { classes, edges, ..Default::default() }]);
    let registry = RuleRegistry::default();
    shamash_asm::rules::execute(&registry, config, &facts, &CancellationToken::new()).unwrap()
}
