//! C2 -- Fact aggregation, deduplication, and stabilization.
//!
//! Merges the [`PartialFacts`](crate::extract::PartialFacts) produced per
//! unit into one [`FactIndex`], applying the merge and dedupe rules that let
//! every later stage assume a clean, deterministically-ordered fact set.

use std::collections::BTreeMap;

use crate::extract::{FactsError, PartialFacts};
use crate::model::{ClassFact, DependencyEdge, FieldRef, MethodRef, TypeRef};

/// Role assignments computed once by C6 and attached to the index.
#[derive(Debug, Default, Clone)]
pub struct RoleAssignments {
    pub class_to_role: BTreeMap<String, String>,
    pub roles: BTreeMap<String, Vec<String>>,
}

/// The aggregated, deduplicated, deterministically-sorted fact set the rest
/// of the pipeline operates over.
#[derive(Debug, Default)]
pub struct FactIndex {
    /// Keyed by `(internalName, originPath, entryPath)` per spec so that the
    /// same class reached through two distinct artifacts (a shaded jar, a
    /// duplicate on the classpath) survives as two facts instead of one
    /// silently clobbering the other.
    classes: BTreeMap<(String, String, String), ClassFact>,
    fields: BTreeMap<String, FieldRef>,
    methods: BTreeMap<String, MethodRef>,
    edges: Vec<DependencyEdge>,
    pub errors: Vec<FactsError>,
    role_assignments: RoleAssignments,
}

impl FactIndex {
    /// Fold every unit's partial facts into one index. Later units win ties
    /// on classes/fields/methods (last non-empty wins, matching "the most
    /// recently scanned artifact for a given signature supersedes earlier
    /// ones"); edges are deduplicated by their full key regardless of order.
    pub fn build(parts: impl IntoIterator<Item = PartialFacts>) -> Self {
        let mut index = FactIndex::default();
        let mut edge_keys = std::collections::BTreeSet::new();

        for part in parts {
            for class in part.classes {
                index.classes.insert(class.dedupe_key(), class);
            }
            for field in part.fields {
                index.fields.insert(field.signature_key(), field);
            }
            for method in part.methods {
                index.methods.insert(method.signature_key(), method);
            }
            for edge in part.edges {
                if edge_keys.insert(edge.dedupe_key()) {
                    index.edges.push(edge);
                }
            }
            index.errors.extend(part.errors);
        }

        index.edges.sort_by(|a, b| a.dedupe_key().cmp(&b.dedupe_key()));
        index.errors.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        index
    }

    /// Every `ClassFact` sharing `internal_name`, in ascending
    /// `(originPath, entryPath)` order. A `TypeRef` can't itself distinguish
    /// which origin it means, so lookups that need exactly one
    /// (`class`/`class_by_internal_name`/`is_known_class`) take the first of
    /// these -- deterministic, but not meaningful as a disambiguator.
    fn classes_with_internal_name(&self, internal_name: &str) -> impl Iterator<Item = &ClassFact> {
        let lower = (internal_name.to_string(), String::new(), String::new());
        self.classes
            .range(lower..)
            .take_while(move |((name, _, _), _)| name == internal_name)
            .map(|(_, v)| v)
    }

    pub fn class(&self, type_ref: &TypeRef) -> Option<&ClassFact> {
        self.classes_with_internal_name(type_ref.internal_name()).next()
    }

    pub fn class_by_internal_name(&self, internal_name: &str) -> Option<&ClassFact> {
        self.classes_with_internal_name(internal_name).next()
    }

    /// Classes in ascending `(internalName, originPath, entryPath)` order,
    /// which sorts by internal name first -- distinct-origin duplicates of
    /// the same class are both yielded, back to back.
    pub fn classes(&self) -> impl Iterator<Item = &ClassFact> {
        self.classes.values()
    }

    pub fn classes_len(&self) -> usize {
        self.classes.len()
    }

    pub fn fields(&self) -> impl Iterator<Item = &FieldRef> {
        self.fields.values()
    }

    pub fn methods(&self) -> impl Iterator<Item = &MethodRef> {
        self.methods.values()
    }

    pub fn methods_of(&self, owner: &TypeRef) -> impl Iterator<Item = &MethodRef> {
        let prefix = format!("{}#", owner.internal_name());
        self.methods
            .range(prefix.clone()..)
            .take_while(move |(k, _)| k.starts_with(&prefix))
            .map(|(_, v)| v)
    }

    pub fn fields_of(&self, owner: &TypeRef) -> impl Iterator<Item = &FieldRef> {
        let prefix = format!("{}#", owner.internal_name());
        self.fields
            .range(prefix.clone()..)
            .take_while(move |(k, _)| k.starts_with(&prefix))
            .map(|(_, v)| v)
    }

    /// All edges, deduplicated and sorted by their dedupe key.
    pub fn edges(&self) -> &[DependencyEdge] {
        &self.edges
    }

    pub fn edges_from(&self, from: &TypeRef) -> impl Iterator<Item = &DependencyEdge> {
        self.edges.iter().filter(move |e| e.from.internal_name() == from.internal_name())
    }

    pub fn edges_to(&self, to: &TypeRef) -> impl Iterator<Item = &DependencyEdge> {
        self.edges.iter().filter(move |e| e.to.internal_name() == to.internal_name())
    }

    /// Types referenced by an edge endpoint but never extracted as a class
    /// (typically JDK/third-party library types). Still valid matcher/scope
    /// targets; just never have a `ClassFact`.
    pub fn is_known_class(&self, type_ref: &TypeRef) -> bool {
        self.classes_with_internal_name(type_ref.internal_name()).next().is_some()
    }

    /// Attach C6's output. Called exactly once per scan, after C3/C4 have
    /// produced a validated config.
    pub fn attach_roles(&mut self, assignments: RoleAssignments) {
        self.role_assignments = assignments;
    }

    pub fn class_to_role(&self, type_ref: &TypeRef) -> Option<String> {
        self.role_assignments.class_to_role.get(&type_ref.fq_name()).cloned()
    }

    pub fn classes_in_role(&self, role_id: &str) -> &[String] {
        self.role_assignments
            .roles
            .get(role_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn role_assignments(&self) -> &RoleAssignments {
        &self.role_assignments
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Access, DependencyKind, SourceLocation};
    use std::collections::BTreeSet;

    fn loc() -> SourceLocation {
        SourceLocation::default()
    }

    #[test]
    fn later_unit_supersedes_class_with_same_signature() {
        let t = TypeRef::from_internal("com/example/A").unwrap();
        let first = ClassFact {
            type_ref: t.clone(),
            access: Access::default(),
            super_type: None,
            interfaces: BTreeSet::new(),
            annotations_fqns: BTreeSet::new(),
            has_main_method: false,
            location: loc(),
        };
        let mut second = first.clone();
        second.has_main_method = true;

        let index = FactIndex::build([
            PartialFacts { classes: vec![first], ..Default::default() },
            PartialFacts { classes: vec![second], ..Default::default() },
        ]);

        assert_eq!(index.classes_len(), 1);
        assert!(index.class(&t).unwrap().has_main_method);
    }

    #[test]
    fn same_internal_name_different_origin_both_survive() {
        let t = TypeRef::from_internal("com/example/A").unwrap();
        let mut first = ClassFact {
            type_ref: t.clone(),
            access: Access::default(),
            super_type: None,
            interfaces: BTreeSet::new(),
            annotations_fqns: BTreeSet::new(),
            has_main_method: false,
            location: loc(),
        };
        first.location.origin_path = "app.jar".to_string();
        let mut second = first.clone();
        second.location.origin_path = "app-shaded.jar".to_string();

        let index = FactIndex::build([
            PartialFacts { classes: vec![first], ..Default::default() },
            PartialFacts { classes: vec![second], ..Default::default() },
        ]);

        assert_eq!(index.classes_len(), 2);
        assert_eq!(index.classes().filter(|c| c.type_ref == t).count(), 2);
        // TypeRef alone can't pick a side; `class` deterministically returns one of them.
        assert!(index.class(&t).is_some());
    }

    #[test]
    fn duplicate_edges_across_units_collapse() {
        let a = TypeRef::from_internal("com/example/A").unwrap();
        let b = TypeRef::from_internal("com/example/B").unwrap();
        let edge = DependencyEdge {
            from: a,
            to: b,
            kind: DependencyKind::Extends,
            detail: None,
            location: loc(),
        };
        let index = FactIndex::build([
            PartialFacts { edges: vec![edge.clone()], ..Default::default() },
            PartialFacts { edges: vec![edge], ..Default::default() },
        ]);
        assert_eq!(index.edges().len(), 1);
    }
}
