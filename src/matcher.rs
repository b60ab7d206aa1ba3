//! C5 -- Matcher DSL: a tagged variant tree (bound by the config layer),
//! compiled once into regexes, then evaluated as a pure predicate over a
//! `ClassFact` plus the fact index (needed for `Implements`/`Extends`
//! transitive lookups).

use std::collections::VecDeque;

use regex::Regex;

use crate::facts::FactIndex;
use crate::model::{ClassFact, TypeRef};

/// The shape-bound, not-yet-compiled matcher tree. Produced by the config
/// binder (C3); regexes inside are still plain strings.
#[derive(Debug, Clone, PartialEq)]
pub enum MatcherSpec {
    AnyOf(Vec<MatcherSpec>),
    AllOf(Vec<MatcherSpec>),
    Not(Box<MatcherSpec>),
    Annotation(String),
    AnnotationPrefix(String),
    PackageRegex(String),
    PackageContainsSegment(String),
    ClassNameRegex(String),
    ClassNameEndsWith(String),
    ClassNameEndsWithAny(Vec<String>),
    HasMainMethod(bool),
    Implements(String),
    Extends(String),
}

/// A compiled, evaluation-ready matcher. Regex compilation happens exactly
/// once here; a failure is surfaced by the semantic validator (C4), never at
/// evaluation time.
#[derive(Debug, Clone)]
pub enum CompiledMatcher {
    AnyOf(Vec<CompiledMatcher>),
    AllOf(Vec<CompiledMatcher>),
    Not(Box<CompiledMatcher>),
    Annotation(String),
    AnnotationPrefix(String),
    PackageRegex(Regex),
    PackageContainsSegment(String),
    ClassNameRegex(Regex),
    ClassNameEndsWith(String),
    ClassNameEndsWithAny(Vec<String>),
    HasMainMethod(bool),
    Implements(String),
    Extends(String),
}

/// Compile a matcher spec, full-match-anchoring every regex per spec
/// semantics ("full-match regex against the package name" / simple name).
pub fn compile(spec: &MatcherSpec) -> Result<CompiledMatcher, String> {
    Ok(match spec {
        MatcherSpec::AnyOf(items) => {
            CompiledMatcher::AnyOf(items.iter().map(compile).collect::<Result<_, _>>()?)
        }
        MatcherSpec::AllOf(items) => {
            CompiledMatcher::AllOf(items.iter().map(compile).collect::<Result<_, _>>()?)
        }
        MatcherSpec::Not(inner) => CompiledMatcher::Not(Box::new(compile(inner)?)),
        MatcherSpec::Annotation(fqn) => CompiledMatcher::Annotation(fqn.clone()),
        MatcherSpec::AnnotationPrefix(prefix) => CompiledMatcher::AnnotationPrefix(prefix.clone()),
        MatcherSpec::PackageRegex(rx) => CompiledMatcher::PackageRegex(full_match_regex(rx)?),
        MatcherSpec::PackageContainsSegment(seg) => {
            CompiledMatcher::PackageContainsSegment(seg.clone())
        }
        MatcherSpec::ClassNameRegex(rx) => CompiledMatcher::ClassNameRegex(full_match_regex(rx)?),
        MatcherSpec::ClassNameEndsWith(suffix) => CompiledMatcher::ClassNameEndsWith(suffix.clone()),
        MatcherSpec::ClassNameEndsWithAny(suffixes) => {
            if suffixes.is_empty() || suffixes.iter().any(|s| s.is_empty()) {
                return Err("classNameEndsWithAny requires a non-empty list of non-empty strings".into());
            }
            CompiledMatcher::ClassNameEndsWithAny(suffixes.clone())
        }
        MatcherSpec::HasMainMethod(b) => CompiledMatcher::HasMainMethod(*b),
        MatcherSpec::Implements(fqn) => CompiledMatcher::Implements(fqn.clone()),
        MatcherSpec::Extends(fqn) => CompiledMatcher::Extends(fqn.clone()),
    })
}

fn full_match_regex(pattern: &str) -> Result<Regex, String> {
    Regex::new(&format!("^(?:{pattern})$")).map_err(|e| e.to_string())
}

impl CompiledMatcher {
    pub fn evaluate(&self, class: &ClassFact, index: &FactIndex) -> bool {
        match self {
            CompiledMatcher::AnyOf(items) => items.iter().any(|m| m.evaluate(class, index)),
            CompiledMatcher::AllOf(items) => items.iter().all(|m| m.evaluate(class, index)),
            CompiledMatcher::Not(inner) => !inner.evaluate(class, index),
            CompiledMatcher::Annotation(fqn) => class.annotations_fqns.contains(fqn),
            CompiledMatcher::AnnotationPrefix(prefix) => {
                class.annotations_fqns.iter().any(|a| a.starts_with(prefix))
            }
            CompiledMatcher::PackageRegex(rx) => rx.is_match(&class.type_ref.package_name()),
            CompiledMatcher::PackageContainsSegment(seg) => class
                .type_ref
                .package_name()
                .split('.')
                .any(|s| s == seg),
            CompiledMatcher::ClassNameRegex(rx) => rx.is_match(&class.type_ref.simple_name()),
            CompiledMatcher::ClassNameEndsWith(suffix) => {
                class.type_ref.simple_name().ends_with(suffix.as_str())
            }
            CompiledMatcher::ClassNameEndsWithAny(suffixes) => {
                let name = class.type_ref.simple_name();
                suffixes.iter().any(|s| name.ends_with(s.as_str()))
            }
            CompiledMatcher::HasMainMethod(want) => class.has_main_method == *want,
            CompiledMatcher::Implements(fqn) => implements_transitively(class, index, fqn),
            CompiledMatcher::Extends(fqn) => extends_transitively(class, index, fqn),
        }
    }
}

fn implements_transitively(class: &ClassFact, index: &FactIndex, target_fqn: &str) -> bool {
    let mut seen: std::collections::BTreeSet<String> = std::collections::BTreeSet::new();
    let mut queue: VecDeque<TypeRef> = class.interfaces.iter().cloned().collect();
    if let Some(sup) = &class.super_type {
        queue.push_back(sup.clone());
    }

    while let Some(t) = queue.pop_front() {
        if !seen.insert(t.internal_name().to_string()) {
            continue;
        }
        if t.fq_name() == target_fqn {
            return true;
        }
        if let Some(c) = index.class(&t) {
            for iface in &c.interfaces {
                queue.push_back(iface.clone());
            }
            if let Some(sup) = &c.super_type {
                queue.push_back(sup.clone());
            }
        }
    }
    false
}

fn extends_transitively(class: &ClassFact, index: &FactIndex, target_fqn: &str) -> bool {
    let mut current = class.super_type.clone();
    let mut seen: std::collections::BTreeSet<String> = std::collections::BTreeSet::new();
    while let Some(t) = current {
        if !seen.insert(t.internal_name().to_string()) {
            break; // cycle guard; malformed hierarchies never loop forever
        }
        if t.fq_name() == target_fqn {
            return true;
        }
        current = index.class(&t).and_then(|c| c.super_type.clone());
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Access;
    use std::collections::BTreeSet;

    fn class(name: &str) -> ClassFact {
        ClassFact {
            type_ref: TypeRef::from_internal(name).unwrap(),
            access: Access::default(),
            super_type: None,
            interfaces: BTreeSet::new(),
            annotations_fqns: BTreeSet::new(),
            has_main_method: false,
            location: crate::model::SourceLocation::default(),
        }
    }

    #[test]
    fn class_name_ends_with_any_matches() {
        let spec = MatcherSpec::ClassNameEndsWithAny(vec!["Dao".into(), "Repository".into()]);
        let compiled = compile(&spec).unwrap();
        let index = FactIndex::default();
        assert!(compiled.evaluate(&class("com/pit/app/data/UserDao"), &index));
        assert!(!compiled.evaluate(&class("com/pit/app/data/UserService"), &index));
    }

    #[test]
    fn package_regex_is_full_match_anchored() {
        let spec = MatcherSpec::PackageRegex("com\\.pit\\.app\\.service".into());
        let compiled = compile(&spec).unwrap();
        let index = FactIndex::default();
        assert!(compiled.evaluate(&class("com/pit/app/service/UserService"), &index));
        assert!(!compiled.evaluate(&class("com/pit/app/service/sub/UserService"), &index));
    }

    #[test]
    fn class_name_ends_with_any_rejects_empty_list() {
        let spec = MatcherSpec::ClassNameEndsWithAny(vec![]);
        assert!(compile(&spec).is_err());
    }
}
