//! End-to-end scenarios, one per concrete example walked through the rule
//! catalog's design prose: a single role/rule/fact combination exercised
//! through `pipeline::run_scan` the way a real project's config would hit it.

mod support;

use shamash_asm::cancel::CancellationToken;
use shamash_asm::model::DependencyKind;
use shamash_asm::pipeline::run_scan;
use shamash_asm::rules::RuleRegistry;

use support::*;

fn today() -> chrono::NaiveDate {
    chrono::NaiveDate::from_ymd_opt(2026, 7, 26).unwrap()
}

fn scan(
    config: &shamash_asm::config::schema::Config,
    facts_parts: (
        Vec<shamash_asm::model::ClassFact>,
        Vec<shamash_asm::model::MethodRef>,
        Vec<shamash_asm::model::FieldRef>,
        Vec<shamash_asm::model::DependencyEdge>,
    ),
) -> shamash_asm::pipeline::ScanOutcome {
    use shamash_asm::extract::PartialFacts;
    let (classes, methods, fields, edges) = facts_parts;
    let parts = vec![PartialFacts { classes, methods, fields, edges, ..Default::default() }];
    let facts = shamash_asm::facts::FactIndex::build(parts);
    let assignments = shamash_asm::roles::classify(config, &facts);
    let mut facts = facts;
    facts.attach_roles(assignments);

    let registry = RuleRegistry::default();
    let findings = shamash_asm::rules::execute(&registry, config, &facts, &CancellationToken::new()).unwrap();
    let findings = shamash_asm::suppression::apply(findings, config, &facts, today(), None);
    shamash_asm::pipeline::ScanOutcome { facts, findings }
}

/// Scenario 1: a `service`-role class calling into a `controller`-role
/// class trips `arch.forbiddenRoleDependencies`.
#[test]
fn forbidden_dependency_from_service_to_controller() {
    let config = config_from_yaml(
        r#"
version: 1
project: {}
roles:
  service:
    priority: 1
    match: { type: classNameEndsWith, suffix: Service }
  controller:
    priority: 1
    match: { type: classNameEndsWith, suffix: Controller }
rules:
  - type: arch
    name: forbiddenRoleDependencies
    params:
      forbidden:
        - from: service
          to: [controller]
"#,
    );

    let service = class("com.pit.app.service.UserService");
    let controller = class("com.pit.app.web.UserController");
    let call = edge_detail(
        "com.pit.app.service.UserService",
        "com.pit.app.web.UserController",
        DependencyKind::MethodCall,
        "handle:()V",
    );

    let outcome = scan(&config, (vec![service, controller], vec![], vec![], vec![call]));

    assert_eq!(outcome.findings.len(), 1);
    let finding = &outcome.findings[0];
    assert_eq!(finding.rule_id, "arch.forbiddenRoleDependencies");
    assert_eq!(finding.class_fqn.as_deref(), Some("com.pit.app.service.UserService"));
    assert_eq!(finding.data.get("toTypeFqn").map(String::as_str), Some("com.pit.app.web.UserController"));
}

/// Scenario 2: `UserDao` matches `repository` (higher priority than `data`)
/// via `classNameEndsWithAny`, and its package isn't under `dao`/`repository`.
#[test]
fn role_placement_flags_dao_outside_allowed_packages() {
    let config = config_from_yaml(
        r#"
version: 1
project: {}
roles:
  data:
    priority: 1
    match: { type: classNameEndsWithAny, suffixes: [Dao, Repository] }
  repository:
    priority: 2
    match: { type: classNameEndsWithAny, suffixes: [Dao, Repository] }
rules:
  - type: packages
    name: rolePlacement
    roles: [repository]
    params:
      allowed: ["^com\\.pit\\.app\\.(dao|repository)(\\..*)?$"]
"#,
    );

    let dao = class("com.pit.app.data.UserDao");
    let outcome = scan(&config, (vec![dao], vec![], vec![], vec![]));

    assert_eq!(outcome.findings.len(), 1);
    let finding = &outcome.findings[0];
    assert_eq!(finding.rule_id, "packages.rolePlacement.repository");
    assert_eq!(finding.class_fqn.as_deref(), Some("com.pit.app.data.UserDao"));
}

/// Scenario 3: `UserService` declares two non-constructor methods against a
/// `max: 1` scoped to the `service` role.
#[test]
fn max_methods_by_role_counts_declared_methods() {
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
      max: 1
"#,
    );

    let svc = class("com.pit.app.service.UserService");
    let compute = public_method("com.pit.app.service.UserService", "compute");
    let helper = public_method("com.pit.app.service.UserService", "helper");

    let outcome = scan(&config, (vec![svc], vec![compute, helper], vec![], vec![]));

    assert_eq!(outcome.findings.len(), 1);
    let finding = &outcome.findings[0];
    assert_eq!(finding.data.get("actual").map(String::as_str), Some("2"));
    assert_eq!(finding.data.get("role").map(String::as_str), Some("service"));
}

/// Scenario 4: five classes all depend on `com.example.Hub`; `maxFanIn: 3`
/// at class granularity yields one aggregate finding over the violating hub.
#[test]
fn fan_in_violation_aggregates_into_one_finding() {
    let config = config_from_yaml(
        r#"
version: 1
project: {}
rules:
  - type: metrics
    name: maxFanIn
    params:
      max: 3
      granularity: class
"#,
    );

    let hub = class("com.example.Hub");
    let callers: Vec<_> = ["A", "B", "C", "D", "E"].iter().map(|n| class(&format!("com.example.{n}"))).collect();
    let edges: Vec<_> = ["A", "B", "C", "D", "E"]
        .iter()
        .map(|n| edge(&format!("com.example.{n}"), "com.example.Hub", DependencyKind::MethodCall))
        .collect();

    let mut classes = vec![hub];
    classes.extend(callers);

    let outcome = scan(&config, (classes, vec![], vec![], edges));

    assert_eq!(outcome.findings.len(), 1);
    let finding = &outcome.findings[0];
    assert_eq!(finding.data.get("violators").map(String::as_str), Some("1"));
    assert!(finding.data.get("examples").unwrap().contains("com.example.Hub:5"));
}

/// Scenario 5: `A -> B -> A` forms a two-node cycle caught by `arch.layerCycle`.
#[test]
fn cycle_between_two_classes_is_reported() {
    let config = config_from_yaml(
        r#"
version: 1
project: {}
rules:
  - type: arch
    name: layerCycle
    params:
      granularity: class
"#,
    );

    let a = class("com.example.A");
    let b = class("com.example.B");
    let a_to_b = edge("com.example.A", "com.example.B", DependencyKind::MethodCall);
    let b_to_a = edge("com.example.B", "com.example.A", DependencyKind::MethodCall);

    let outcome = scan(&config, (vec![a, b], vec![], vec![], vec![a_to_b, b_to_a]));

    assert_eq!(outcome.findings.len(), 1);
    let finding = &outcome.findings[0];
    assert_eq!(finding.rule_id, "arch.layerCycle");
    assert_eq!(finding.data.get("members").map(String::as_str), Some("com.example.A,com.example.B"));
}

/// Scenario 6: scenario 1's forbidden-dependency finding is fully suppressed
/// by a matching exception.
#[test]
fn exception_suppresses_forbidden_dependency_finding() {
    let config = config_from_yaml(
        r#"
version: 1
project: {}
roles:
  service:
    priority: 1
    match: { type: classNameEndsWith, suffix: Service }
  controller:
    priority: 1
    match: { type: classNameEndsWith, suffix: Controller }
rules:
  - type: arch
    name: forbiddenRoleDependencies
    params:
      forbidden:
        - from: service
          to: [controller]
exceptions:
  - id: legacy-service-controller-call
    reason: scheduled for removal in the next quarter
    match:
      classNameRegex: "com\\.pit\\.app\\.service\\..*"
    suppress: ["arch.forbiddenRoleDependencies"]
"#,
    );

    let service = class("com.pit.app.service.UserService");
    let controller = class("com.pit.app.web.UserController");
    let call = edge_detail(
        "com.pit.app.service.UserService",
        "com.pit.app.web.UserController",
        DependencyKind::MethodCall,
        "handle:()V",
    );

    let outcome = scan(&config, (vec![service, controller], vec![], vec![], vec![call]));

    assert!(outcome.findings.is_empty());
}
