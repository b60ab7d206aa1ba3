//! C1 -- Bytecode Fact Extractor.
//!
//! Visits one [`BytecodeUnit`] at a time and yields partial facts: classes,
//! methods, fields, and dependency edges. Never panics on malformed input --
//! every fallible step is wrapped so a single bad class records a
//! [`FactsError`] and extraction continues with the next element.

pub mod annotation;
pub mod class_reader;
pub mod code;
pub mod descriptor;

use std::collections::BTreeSet;
use std::panic::{catch_unwind, AssertUnwindSafe};

use crate::model::{
    Access, ClassFact, DependencyEdge, DependencyKind, FieldRef, MethodRef, OriginKind,
    SourceLocation, TypeRef,
};

use class_reader::{read_class, ClassAttribute, ConstantPool, CpEntry, RawClass, RawField, RawMethod};
use code::{class_attribute_info, const_load_type_name, decode_code_attribute, line_for_offset, InstructionEvent};

/// A single class file buffer plus its provenance.
#[derive(Debug, Clone)]
pub struct BytecodeUnit {
    pub origin_id: String,
    pub location: SourceLocation,
    pub bytes: Vec<u8>,
}

/// A structured, non-fatal extraction failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactsError {
    pub origin_id: String,
    pub phase: String,
    pub message: String,
    pub throwable_class: Option<String>,
}

impl FactsError {
    pub fn sort_key(&self) -> (String, String, String, String) {
        (
            self.phase.clone(),
            self.message.clone(),
            self.throwable_class.clone().unwrap_or_default(),
            self.origin_id.clone(),
        )
    }
}

/// The partial result of extracting a single unit.
#[derive(Debug, Default)]
pub struct PartialFacts {
    pub classes: Vec<ClassFact>,
    pub methods: Vec<MethodRef>,
    pub fields: Vec<FieldRef>,
    pub edges: Vec<DependencyEdge>,
    pub errors: Vec<FactsError>,
}

impl PartialFacts {
    /// Structural edges (extends/implements/type references) collapse to
    /// nothing useful when they loop back to their own class, so those are
    /// dropped here. Member-usage edges (field access, method call) are kept
    /// even when self-referential -- a class calling its own private method
    /// is exactly the signal `deadcode.unusedPrivateMembers` depends on.
    fn push_edge(&mut self, edge: DependencyEdge) {
        let drop_self = edge.is_self_edge()
            && matches!(
                edge.kind,
                DependencyKind::Extends
                    | DependencyKind::Implements
                    | DependencyKind::FieldType
                    | DependencyKind::MethodParamType
                    | DependencyKind::MethodReturnType
                    | DependencyKind::ThrowsType
                    | DependencyKind::AnnotationType
            );
        if !drop_self {
            self.edges.push(edge);
        }
    }

    fn push_error(&mut self, phase: &str, origin_id: &str, message: impl Into<String>) {
        self.errors.push(FactsError {
            origin_id: origin_id.to_string(),
            phase: phase.to_string(),
            message: message.into(),
            throwable_class: None,
        });
    }
}

/// Extract one unit. Wrapped in `catch_unwind` as a last line of defense: the
/// reader itself is written to never panic, but this keeps the "must not
/// throw" contract even if a future change introduces an indexing bug.
pub fn extract_unit(unit: &BytecodeUnit) -> PartialFacts {
    match catch_unwind(AssertUnwindSafe(|| extract_unit_inner(unit))) {
        Ok(facts) => facts,
        Err(_) => {
            let mut facts = PartialFacts::default();
            facts.push_error(
                "extract",
                &unit.origin_id,
                "internal panic during extraction (recovered)",
            );
            facts
        }
    }
}

fn extract_unit_inner(unit: &BytecodeUnit) -> PartialFacts {
    let mut facts = PartialFacts::default();

    let raw = match read_class(&unit.bytes) {
        Ok(raw) => raw,
        Err(e) => {
            facts.push_error("parse", &unit.origin_id, e.to_string());
            return facts;
        }
    };

    let this_type = match TypeRef::from_internal(&raw.this_class) {
        Some(t) => t,
        None => {
            facts.push_error("parse", &unit.origin_id, "class has no usable this_class name");
            return facts;
        }
    };

    let source_file = class_attribute_info(&raw.attributes, "SourceFile")
        .and_then(|info| parse_source_file(info, &raw.constant_pool));

    let mut location = unit.location.clone();
    if location.origin_kind.is_none() {
        location.origin_kind = Some(OriginKind::Other);
    }
    location.source_file = source_file;

    let super_type = raw
        .super_class
        .as_deref()
        .and_then(TypeRef::from_internal);

    let interfaces: BTreeSet<TypeRef> = raw
        .interfaces
        .iter()
        .filter_map(|s| TypeRef::from_internal(s))
        .collect();

    let class_annotations = collect_annotation_fqns(&raw.attributes, &raw.constant_pool, &mut facts, &unit.origin_id, "class-annotations");

    let has_main_method = raw.methods.iter().any(|m| is_main_method(m));

    if let Some(super_t) = &super_type {
        facts.push_edge(DependencyEdge {
            from: this_type.clone(),
            to: super_t.clone(),
            kind: DependencyKind::Extends,
            detail: None,
            location: location.clone(),
        });
    }
    for iface in &interfaces {
        facts.push_edge(DependencyEdge {
            from: this_type.clone(),
            to: iface.clone(),
            kind: DependencyKind::Implements,
            detail: None,
            location: location.clone(),
        });
    }
    for fqn in &class_annotations {
        if let Some(t) = TypeRef::from_internal(&fqn.replace('.', "/")) {
            facts.push_edge(DependencyEdge {
                from: this_type.clone(),
                to: t,
                kind: DependencyKind::AnnotationType,
                detail: None,
                location: location.clone(),
            });
        }
    }

    facts.classes.push(ClassFact {
        type_ref: this_type.clone(),
        access: Access(raw.access_flags),
        super_type,
        interfaces,
        annotations_fqns: class_annotations.into_iter().collect(),
        has_main_method,
        location: location.clone(),
    });

    for field in &raw.fields {
        extract_field(field, &this_type, &raw.constant_pool, &location, &mut facts, &unit.origin_id);
    }

    let bootstrap_methods = class_attribute_info(&raw.attributes, "BootstrapMethods")
        .and_then(|info| parse_bootstrap_methods(info).ok())
        .unwrap_or_default();

    for method in &raw.methods {
        extract_method(
            method,
            &this_type,
            &raw.constant_pool,
            &bootstrap_methods,
            &location,
            &mut facts,
            &unit.origin_id,
        );
    }

    facts
}

fn is_main_method(m: &RawMethod) -> bool {
    let access = Access(m.access_flags);
    m.name == "main"
        && m.descriptor == "([Ljava/lang/String;)V"
        && access.has(Access::PUBLIC | Access::STATIC)
}

fn parse_source_file(info: &[u8], cp: &ConstantPool) -> Option<String> {
    if info.len() < 2 {
        return None;
    }
    let idx = u16::from_be_bytes([info[0], info[1]]);
    cp.utf8(idx).map(str::to_string)
}

struct BootstrapMethod {
    method_ref: u16,
    arguments: Vec<u16>,
}

fn parse_bootstrap_methods(info: &[u8]) -> class_reader::ReadResult<Vec<BootstrapMethod>> {
    use byteorder::{ReadBytesExt, BE};
    use std::io::Cursor;
    let mut cur = Cursor::new(info);
    let count = cur.read_u16::<BE>()?;
    let mut out = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let method_ref = cur.read_u16::<BE>()?;
        let arg_count = cur.read_u16::<BE>()?;
        let mut arguments = Vec::with_capacity(arg_count as usize);
        for _ in 0..arg_count {
            arguments.push(cur.read_u16::<BE>()?);
        }
        out.push(BootstrapMethod { method_ref, arguments });
    }
    Ok(out)
}

fn collect_annotation_fqns(
    attrs: &[ClassAttribute],
    cp: &ConstantPool,
    facts: &mut PartialFacts,
    origin_id: &str,
    phase: &str,
) -> Vec<String> {
    let mut out = Vec::new();
    for name in ["RuntimeVisibleAnnotations", "RuntimeInvisibleAnnotations"] {
        if let Some(info) = class_attribute_info(attrs, name) {
            match annotation::parse_annotation_fqns(info, cp) {
                Ok(mut fqns) => out.append(&mut fqns),
                Err(e) => facts.push_error(phase, origin_id, e.to_string()),
            }
        }
    }
    out
}

fn extract_field(
    field: &RawField,
    owner: &TypeRef,
    cp: &ConstantPool,
    location: &SourceLocation,
    facts: &mut PartialFacts,
    origin_id: &str,
) {
    let annotations = collect_annotation_fqns(&field.attributes, cp, facts, origin_id, "field-annotations");
    let declared_type = descriptor::parse_field_descriptor(&field.descriptor);

    if let Some(ty) = &declared_type {
        if ty.internal_name() != owner.internal_name() {
            facts.push_edge(DependencyEdge {
                from: owner.clone(),
                to: ty.clone(),
                kind: DependencyKind::FieldType,
                detail: Some(field.name.clone()),
                location: location.clone(),
            });
        }
    }
    for fqn in &annotations {
        if let Some(t) = TypeRef::from_internal(&fqn.replace('.', "/")) {
            facts.push_edge(DependencyEdge {
                from: owner.clone(),
                to: t,
                kind: DependencyKind::AnnotationType,
                detail: Some(field.name.clone()),
                location: location.clone(),
            });
        }
    }

    facts.fields.push(FieldRef {
        owner: owner.clone(),
        name: field.name.clone(),
        descriptor: field.descriptor.clone(),
        signature: class_attribute_info(&field.attributes, "Signature")
            .and_then(|info| parse_signature(info, cp)),
        access: Access(field.access_flags),
        annotations_fqns: annotations.into_iter().collect(),
        location: location.clone(),
    });
}

fn parse_signature(info: &[u8], cp: &ConstantPool) -> Option<String> {
    if info.len() < 2 {
        return None;
    }
    let idx = u16::from_be_bytes([info[0], info[1]]);
    cp.utf8(idx).map(str::to_string)
}

#[allow(clippy::too_many_arguments)]
fn extract_method(
    method: &RawMethod,
    owner: &TypeRef,
    cp: &ConstantPool,
    bootstrap_methods: &[BootstrapMethod],
    location: &SourceLocation,
    facts: &mut PartialFacts,
    origin_id: &str,
) {
    let annotations = collect_annotation_fqns(&method.attributes, cp, facts, origin_id, "method-annotations");
    let (parameter_types, return_type) = descriptor::parse_method_descriptor(&method.descriptor);
    let is_constructor = method.name == "<init>" || method.name == "<clinit>";

    let mut throws_types: Vec<TypeRef> = Vec::new();
    if let Some(info) = class_attribute_info(&method.attributes, "Exceptions") {
        match parse_exceptions_attribute(info, cp) {
            Ok(types) => throws_types = types,
            Err(e) => facts.push_error("method-exceptions", origin_id, e.to_string()),
        }
    }

    for ty in &parameter_types {
        facts.push_edge(DependencyEdge {
            from: owner.clone(),
            to: ty.clone(),
            kind: DependencyKind::MethodParamType,
            detail: Some(format!("{}:{}", method.name, method.descriptor)),
            location: location.clone(),
        });
    }
    if let Some(ty) = &return_type {
        facts.push_edge(DependencyEdge {
            from: owner.clone(),
            to: ty.clone(),
            kind: DependencyKind::MethodReturnType,
            detail: Some(format!("{}:{}", method.name, method.descriptor)),
            location: location.clone(),
        });
    }
    for ty in &throws_types {
        facts.push_edge(DependencyEdge {
            from: owner.clone(),
            to: ty.clone(),
            kind: DependencyKind::ThrowsType,
            detail: Some(format!("declared:{}:{}", method.name, method.descriptor)),
            location: location.clone(),
        });
    }
    for fqn in &annotations {
        if let Some(t) = TypeRef::from_internal(&fqn.replace('.', "/")) {
            facts.push_edge(DependencyEdge {
                from: owner.clone(),
                to: t,
                kind: DependencyKind::AnnotationType,
                detail: Some(format!("{}:{}", method.name, method.descriptor)),
                location: location.clone(),
            });
        }
    }

    if let Some(code_info) = class_attribute_info(&method.attributes, "Code") {
        match decode_code_attribute(code_info, cp) {
            Ok(decoded) => {
                for entry in &decoded.exception_table {
                    if entry.catch_type_index == 0 {
                        continue; // `finally`/any handler, no declared type
                    }
                    if let Some(ty) = cp
                        .class_internal_name(entry.catch_type_index)
                        .and_then(TypeRef::from_internal)
                    {
                        let line = line_for_offset(&decoded.line_table, entry.start_pc as usize);
                        facts.push_edge(DependencyEdge {
                            from: owner.clone(),
                            to: ty,
                            kind: DependencyKind::ThrowsType,
                            detail: Some(format!("catch:{}:{}", method.name, method.descriptor)),
                            location: with_line(location, line),
                        });
                    }
                }

                for (offset, event) in &decoded.events {
                    let line = line_for_offset(&decoded.line_table, *offset);
                    emit_instruction_edge(
                        *event,
                        owner,
                        method,
                        cp,
                        bootstrap_methods,
                        &with_line(location, line),
                        facts,
                    );
                }
            }
            Err(e) => facts.push_error("method-code", origin_id, e.to_string()),
        }
    }

    facts.methods.push(MethodRef {
        owner: owner.clone(),
        name: method.name.clone(),
        descriptor: method.descriptor.clone(),
        signature: class_attribute_info(&method.attributes, "Signature")
            .and_then(|info| parse_signature(info, cp)),
        access: Access(method.access_flags),
        return_type,
        parameter_types,
        throws_types,
        is_constructor,
        annotations_fqns: annotations.into_iter().collect(),
        location: location.clone(),
    });
}

fn with_line(location: &SourceLocation, line: Option<u32>) -> SourceLocation {
    let mut loc = location.clone();
    loc.line = line.or(loc.line);
    loc
}

fn parse_exceptions_attribute(info: &[u8], cp: &ConstantPool) -> class_reader::ReadResult<Vec<TypeRef>> {
    use byteorder::{ReadBytesExt, BE};
    use std::io::Cursor;
    let mut cur = Cursor::new(info);
    let count = cur.read_u16::<BE>()?;
    let mut out = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let idx = cur.read_u16::<BE>()?;
        if let Some(t) = cp.class_internal_name(idx).and_then(TypeRef::from_internal) {
            out.push(t);
        }
    }
    Ok(out)
}

fn emit_instruction_edge(
    event: InstructionEvent,
    owner: &TypeRef,
    method: &RawMethod,
    cp: &ConstantPool,
    bootstrap_methods: &[BootstrapMethod],
    location: &SourceLocation,
    facts: &mut PartialFacts,
) {
    match event {
        InstructionEvent::TypeInstruction { cp_index } => {
            if let Some(t) = cp.class_internal_name(cp_index).and_then(TypeRef::from_internal) {
                facts.push_edge(DependencyEdge {
                    from: owner.clone(),
                    to: t,
                    kind: DependencyKind::TypeInstruction,
                    detail: Some(format!("{}:{}", method.name, method.descriptor)),
                    location: location.clone(),
                });
            }
        }
        InstructionEvent::FieldAccess { cp_index } => {
            if let Some((field_owner, name, _desc)) = cp.ref_triplet(cp_index) {
                if let Some(t) = TypeRef::from_internal(field_owner) {
                    facts.push_edge(DependencyEdge {
                        from: owner.clone(),
                        to: t,
                        kind: DependencyKind::FieldAccess,
                        detail: Some(name.to_string()),
                        location: location.clone(),
                    });
                }
            }
        }
        InstructionEvent::MethodCall { cp_index } => {
            if let Some(CpEntry::InvokeDynamic { bootstrap_method_attr_index, name_and_type_index }) =
                cp.get(cp_index)
            {
                let (name, desc) = cp.name_and_type(*name_and_type_index).unwrap_or(("", ""));
                if let Some(bm) = bootstrap_methods.get(*bootstrap_method_attr_index as usize) {
                    if let Some((handle_owner, _, _)) = cp.ref_triplet(bm.method_ref) {
                        if let Some(t) = TypeRef::from_internal(handle_owner) {
                            facts.push_edge(DependencyEdge {
                                from: owner.clone(),
                                to: t,
                                kind: DependencyKind::MethodCall,
                                detail: Some(format!("{name}:{desc}")),
                                location: location.clone(),
                            });
                        }
                    }
                    for arg in &bm.arguments {
                        if let Some(name) = const_load_type_name(cp, *arg) {
                            if let Some(t) = TypeRef::from_internal(name) {
                                facts.push_edge(DependencyEdge {
                                    from: owner.clone(),
                                    to: t,
                                    kind: DependencyKind::ConstType,
                                    detail: Some("bootstrapArg".to_string()),
                                    location: location.clone(),
                                });
                            }
                        }
                    }
                }
            } else if let Some((call_owner, name, desc)) = cp.ref_triplet(cp_index) {
                if let Some(t) = TypeRef::from_internal(call_owner) {
                    facts.push_edge(DependencyEdge {
                        from: owner.clone(),
                        to: t,
                        kind: DependencyKind::MethodCall,
                        detail: Some(format!("{name}:{desc}")),
                        location: location.clone(),
                    });
                }
            }
        }
        InstructionEvent::ConstLoad { cp_index } => {
            if let Some(name) = const_load_type_name(cp, cp_index) {
                if let Some(t) = TypeRef::from_internal(name) {
                    facts.push_edge(DependencyEdge {
                        from: owner.clone(),
                        to: t,
                        kind: DependencyKind::ConstType,
                        detail: Some("ldc".to_string()),
                        location: location.clone(),
                    });
                }
            }
        }
    }
}
