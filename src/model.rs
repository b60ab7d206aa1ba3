//! The structural data model shared by every pipeline stage: `TypeRef`,
//! `ClassFact`, `MethodRef`/`FieldRef`, `DependencyEdge`, and `SourceLocation`.
//!
//! Everything here is plain data. Equality/hashing rules (e.g. `TypeRef` on
//! `internalName` only) are invariants the rest of the engine relies on.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// An internal JVM-form type name (`pkg/sub/Name`), with its FQN and package
/// derived lazily from that form. Equality and hashing are on `internalName`
/// alone, per the data model invariant in spec.md §3.
#[derive(Debug, Clone, Eq)]
pub struct TypeRef {
    internal_name: String,
}

impl TypeRef {
    /// Build from a JVM internal name (`pkg/sub/Name`). Returns `None` for
    /// primitives, `void`, and descriptors that don't denote an object type;
    /// array element references decay to their component object type, same
    /// as `extract::descriptor::parse_one`'s `L`...`;` unwrap.
    pub fn from_internal(internal_name: &str) -> Option<Self> {
        if internal_name.is_empty() {
            return None;
        }
        let stripped = internal_name.trim_start_matches('[');
        let name = match stripped.strip_prefix('L').and_then(|s| s.strip_suffix(';')) {
            Some(inner) => inner,
            None => stripped,
        };
        if name.is_empty() {
            return None;
        }
        Some(Self { internal_name: name.to_string() })
    }

    pub fn internal_name(&self) -> &str {
        &self.internal_name
    }

    /// `pkg.sub.Name` form.
    pub fn fq_name(&self) -> String {
        self.internal_name.replace('/', ".")
    }

    /// Package portion of the FQN (substring before the last dot), or empty
    /// string for the default package.
    pub fn package_name(&self) -> String {
        let fq = self.fq_name();
        match fq.rfind('.') {
            Some(idx) => fq[..idx].to_string(),
            None => String::new(),
        }
    }

    /// Simple class name (substring after the last dot).
    pub fn simple_name(&self) -> String {
        let fq = self.fq_name();
        match fq.rfind('.') {
            Some(idx) => fq[idx + 1..].to_string(),
            None => fq,
        }
    }
}

impl PartialEq for TypeRef {
    fn eq(&self, other: &Self) -> bool {
        self.internal_name == other.internal_name
    }
}

impl std::hash::Hash for TypeRef {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.internal_name.hash(state);
    }
}

impl Ord for TypeRef {
    fn cmp(&self, other: &Self) -> Ordering {
        self.internal_name.cmp(&other.internal_name)
    }
}

impl PartialOrd for TypeRef {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.fq_name())
    }
}

/// Where a fact or edge was observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OriginKind {
    DirClass,
    JarEntry,
    Other,
}

/// Best-effort provenance. Never affects rule decisions except when a rule
/// surfaces `filePath` in a finding.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SourceLocation {
    pub origin_kind: Option<OriginKind>,
    pub origin_path: String,
    pub container_path: Option<String>,
    pub entry_path: Option<String>,
    pub source_file: Option<String>,
    pub line: Option<u32>,
}

impl SourceLocation {
    pub fn location_key(&self) -> String {
        format!(
            "{:?}|{}|{}|{}|{}|{}",
            self.origin_kind,
            self.origin_path,
            self.container_path.as_deref().unwrap_or(""),
            self.entry_path.as_deref().unwrap_or(""),
            self.source_file.as_deref().unwrap_or(""),
            self.line.map(|l| l.to_string()).unwrap_or_default(),
        )
    }

    /// The path a rule should surface for IDE navigation: the jar entry path
    /// when present, else the origin path.
    pub fn file_path(&self) -> String {
        self.entry_path
            .clone()
            .unwrap_or_else(|| self.origin_path.clone())
    }
}

/// A minimal bitflags-style macro, avoiding a dependency the donor crate
/// never needed for a handful of JVM access masks.
macro_rules! bitflags_like_access {
    (
        $(#[$meta:meta])*
        pub struct $name:ident(u16);
        $(pub const $flag:ident = $value:expr;)*
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
        pub struct $name(pub u16);

        impl $name {
            $(pub const $flag: u16 = $value;)*

            pub fn has(self, mask: u16) -> bool {
                self.0 & mask == mask
            }

            pub fn is_public(self) -> bool { self.has(Self::PUBLIC) }
            pub fn is_private(self) -> bool { self.has(Self::PRIVATE) }
            pub fn is_static(self) -> bool { self.has(Self::STATIC) }
        }
    };
}

bitflags_like_access!(
    /// JVM access_flags bitmask, shared across class/method/field facts.
    pub struct Access(u16);
    pub const PUBLIC = 0x0001;
    pub const PRIVATE = 0x0002;
    pub const PROTECTED = 0x0004;
    pub const STATIC = 0x0008;
    pub const FINAL = 0x0010;
    pub const INTERFACE = 0x0200;
    pub const ABSTRACT = 0x0400;
    pub const ANNOTATION = 0x2000;
    pub const ENUM = 0x4000;
);

/// One per class file accepted by the extractor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassFact {
    pub type_ref: TypeRef,
    pub access: Access,
    pub super_type: Option<TypeRef>,
    pub interfaces: BTreeSet<TypeRef>,
    pub annotations_fqns: BTreeSet<String>,
    pub has_main_method: bool,
    pub location: SourceLocation,
}

impl ClassFact {
    pub fn fq_name(&self) -> String {
        self.type_ref.fq_name()
    }

    pub fn dedupe_key(&self) -> (String, String, String) {
        (
            self.type_ref.internal_name().to_string(),
            self.location.origin_path.clone(),
            self.location.entry_path.clone().unwrap_or_default(),
        )
    }
}

/// A method or field signature, shared prefix for `MethodRef`/`FieldRef`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRef {
    pub owner: TypeRef,
    pub name: String,
    pub descriptor: String,
    pub signature: Option<String>,
    pub access: Access,
    pub annotations_fqns: BTreeSet<String>,
    pub location: SourceLocation,
}

impl FieldRef {
    /// `owner#name:desc`, the dedupe/sort key used by C2.
    pub fn signature_key(&self) -> String {
        format!("{}#{}:{}", self.owner.internal_name(), self.name, self.descriptor)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodRef {
    pub owner: TypeRef,
    pub name: String,
    pub descriptor: String,
    pub signature: Option<String>,
    pub access: Access,
    pub return_type: Option<TypeRef>,
    pub parameter_types: Vec<TypeRef>,
    pub throws_types: Vec<TypeRef>,
    pub is_constructor: bool,
    pub annotations_fqns: BTreeSet<String>,
    pub location: SourceLocation,
}

impl MethodRef {
    pub fn signature_key(&self) -> String {
        format!("{}#{}:{}", self.owner.internal_name(), self.name, self.descriptor)
    }
}

/// The dependency kinds an extracted edge can carry. Wire form is the
/// uppercase variant name, per spec.md §6.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DependencyKind {
    Extends,
    Implements,
    FieldType,
    FieldAccess,
    MethodParamType,
    MethodReturnType,
    ThrowsType,
    MethodCall,
    TypeInstruction,
    AnnotationType,
    ConstType,
}

impl DependencyKind {
    pub const ALL: [DependencyKind; 11] = [
        DependencyKind::Extends,
        DependencyKind::Implements,
        DependencyKind::FieldType,
        DependencyKind::FieldAccess,
        DependencyKind::MethodParamType,
        DependencyKind::MethodReturnType,
        DependencyKind::ThrowsType,
        DependencyKind::MethodCall,
        DependencyKind::TypeInstruction,
        DependencyKind::AnnotationType,
        DependencyKind::ConstType,
    ];

    pub fn as_wire_str(self) -> &'static str {
        match self {
            DependencyKind::Extends => "EXTENDS",
            DependencyKind::Implements => "IMPLEMENTS",
            DependencyKind::FieldType => "FIELD_TYPE",
            DependencyKind::FieldAccess => "FIELD_ACCESS",
            DependencyKind::MethodParamType => "METHOD_PARAM_TYPE",
            DependencyKind::MethodReturnType => "METHOD_RETURN_TYPE",
            DependencyKind::ThrowsType => "THROWS_TYPE",
            DependencyKind::MethodCall => "METHOD_CALL",
            DependencyKind::TypeInstruction => "TYPE_INSTRUCTION",
            DependencyKind::AnnotationType => "ANNOTATION_TYPE",
            DependencyKind::ConstType => "CONST_TYPE",
        }
    }

    /// camelCase aliases accepted in rule params, normalized by the validator.
    pub fn from_camel_alias(alias: &str) -> Option<DependencyKind> {
        match alias {
            "extends" => Some(DependencyKind::Extends),
            "implements" => Some(DependencyKind::Implements),
            "fieldType" => Some(DependencyKind::FieldType),
            "fieldAccess" => Some(DependencyKind::FieldAccess),
            "parameterType" => Some(DependencyKind::MethodParamType),
            "returnType" => Some(DependencyKind::MethodReturnType),
            "throwsType" => Some(DependencyKind::ThrowsType),
            "methodCall" => Some(DependencyKind::MethodCall),
            "typeInstruction" => Some(DependencyKind::TypeInstruction),
            "annotationType" => Some(DependencyKind::AnnotationType),
            "constType" => Some(DependencyKind::ConstType),
            _ => None,
        }
    }

    pub fn from_wire_str(s: &str) -> Option<DependencyKind> {
        DependencyKind::ALL.into_iter().find(|k| k.as_wire_str() == s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyEdge {
    pub from: TypeRef,
    pub to: TypeRef,
    pub kind: DependencyKind,
    pub detail: Option<String>,
    pub location: SourceLocation,
}

impl DependencyEdge {
    pub fn dedupe_key(&self) -> (String, String, DependencyKind, String, String) {
        (
            self.from.internal_name().to_string(),
            self.to.internal_name().to_string(),
            self.kind,
            self.detail.clone().unwrap_or_default(),
            self.location.location_key(),
        )
    }

    /// Self-edges must never exist after extraction; callers rely on this.
    pub fn is_self_edge(&self) -> bool {
        self.from.internal_name() == self.to.internal_name()
    }
}

/// A deterministic, addressable statement that a location violates a rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub rule_id: String,
    pub message: String,
    pub file_path: String,
    pub severity: crate::config::schema::Severity,
    pub class_fqn: Option<String>,
    pub member_name: Option<String>,
    /// Source line the finding anchors to, when the underlying fact carried
    /// one. Used by the suppression engine to resolve inline
    /// `shamash:ignore` directives; absent for graph-level aggregates that
    /// have no single anchor line (cycles, fan-in/out rollups).
    pub line: Option<u32>,
    pub data: BTreeMap<String, String>,
}

impl Finding {
    /// `(ruleId, filePath, classFqn, memberName, message)`, the sort key
    /// the rule executor freezes findings by before returning them.
    pub fn sort_key(&self) -> (String, String, String, String, String) {
        (
            self.rule_id.clone(),
            self.file_path.clone(),
            self.class_fqn.clone().unwrap_or_default(),
            self.member_name.clone().unwrap_or_default(),
            self.message.clone(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_ref_decays_array_component() {
        let t = TypeRef::from_internal("[[Lcom/example/Foo;").unwrap();
        assert_eq!(t.internal_name(), "com/example/Foo");
    }

    #[test]
    fn type_ref_fq_and_package() {
        let t = TypeRef::from_internal("com/example/sub/Foo").unwrap();
        assert_eq!(t.fq_name(), "com.example.sub.Foo");
        assert_eq!(t.package_name(), "com.example.sub");
        assert_eq!(t.simple_name(), "Foo");
    }

    #[test]
    fn type_ref_default_package() {
        let t = TypeRef::from_internal("Foo").unwrap();
        assert_eq!(t.package_name(), "");
        assert_eq!(t.simple_name(), "Foo");
    }

    #[test]
    fn self_edge_detected() {
        let t = TypeRef::from_internal("com/example/A").unwrap();
        let edge = DependencyEdge {
            from: t.clone(),
            to: t,
            kind: DependencyKind::MethodCall,
            detail: None,
            location: SourceLocation::default(),
        };
        assert!(edge.is_self_edge());
    }
}
