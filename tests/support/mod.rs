//! Fixture helpers shared across the integration test files. Builds fact
//! tuples and configs directly in Rust rather than real `.class` bytes,
//! since nothing in this crate's test story compiles Java.

use std::collections::BTreeSet;

use shamash_asm::config::schema::Config;
use shamash_asm::config::{bind, raw::RawValue};
use shamash_asm::extract::PartialFacts;
use shamash_asm::facts::FactIndex;
use shamash_asm::model::{
    Access, ClassFact, DependencyEdge, DependencyKind, FieldRef, MethodRef, SourceLocation,
    TypeRef,
};

pub fn type_ref(fqn: &str) -> TypeRef {
    TypeRef::from_internal(&fqn.replace('.', "/")).unwrap()
}

pub fn loc() -> SourceLocation {
    SourceLocation::default()
}

pub fn loc_at(line: u32) -> SourceLocation {
    SourceLocation { line: Some(line), ..SourceLocation::default() }
}

pub fn class(fqn: &str) -> ClassFact {
    ClassFact {
        type_ref: type_ref(fqn),
        access: Access(Access::PUBLIC),
        super_type: None,
        interfaces: BTreeSet::new(),
        annotations_fqns: BTreeSet::new(),
        has_main_method: false,
        location: loc(),
    }
}

pub fn private_method(owner: &str, name: &str) -> MethodRef {
    MethodRef {
        owner: type_ref(owner),
        name: name.to_string(),
        descriptor: "()V".to_string(),
        signature: None,
        access: Access(Access::PRIVATE),
        return_type: None,
        parameter_types: Vec::new(),
        throws_types: Vec::new(),
        is_constructor: false,
        annotations_fqns: BTreeSet::new(),
        location: loc(),
    }
}

pub fn public_method(owner: &str, name: &str) -> MethodRef {
    let mut m = private_method(owner, name);
    m.access = Access(Access::PUBLIC);
    m
}

pub fn private_field(owner: &str, name: &str) -> FieldRef {
    FieldRef {
        owner: type_ref(owner),
        name: name.to_string(),
        descriptor: "I".to_string(),
        signature: None,
        access: Access(Access::PRIVATE),
        annotations_fqns: BTreeSet::new(),
        location: loc(),
    }
}

pub fn edge(from: &str, to: &str, kind: DependencyKind) -> DependencyEdge {
    DependencyEdge { from: type_ref(from), to: type_ref(to), kind, detail: None, location: loc() }
}

pub fn edge_detail(from: &str, to: &str, kind: DependencyKind, detail: &str) -> DependencyEdge {
    let mut e = edge(from, to, kind);
    e.detail = Some(detail.to_string());
    e
}

/// Build a `FactIndex` from one unit's worth of facts, as if C1 had
/// extracted all of it from a single bytecode artifact.
pub fn fact_index(
    classes: Vec<ClassFact>,
    methods: Vec<MethodRef>,
    fields: Vec<FieldRef>,
    edges: Vec<DependencyEdge>,
) -> FactIndex {
    FactIndex::build([PartialFacts { classes, methods, fields, edges, ..Default::default() }])
}

/// Bind a YAML document into a typed `Config`, panicking (with the bind
/// error) on malformed fixtures -- test setup, not behavior under test.
pub fn config_from_yaml(yaml: &str) -> Config {
    let value: serde_yaml::Value = serde_yaml::from_str(yaml).expect("fixture is valid YAML");
    let raw = RawValue::from(value);
    bind(&raw).expect("fixture config binds")
}
