//! Low-level JVM class-file reader: constant pool, access flags, and the
//! outer `class`, `field_info`, `method_info`, `attribute_info` structures,
//! per the JVM class file format (JVMS §4). No bytecode semantics here --
//! see `code.rs` for the `Code` attribute instruction walker.
//!
//! Every read goes through `Cursor` + `byteorder` and returns `Result`; there
//! is no `unwrap`/`panic!` on attacker-controlled input, matching the
//! extractor's "must not throw for malformed bytecode" contract.

use byteorder::{ReadBytesExt, BE};
use std::io::Cursor;

pub type ReadResult<T> = Result<T, ReadError>;

#[derive(Debug, Clone)]
pub struct ReadError(pub String);

impl std::fmt::Display for ReadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
impl std::error::Error for ReadError {}

impl From<std::io::Error> for ReadError {
    fn from(e: std::io::Error) -> Self {
        ReadError(format!("unexpected end of class file: {e}"))
    }
}

fn err(msg: impl Into<String>) -> ReadError {
    ReadError(msg.into())
}

#[derive(Debug, Clone)]
pub enum CpEntry {
    Utf8(String),
    Integer(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    Class { name_index: u16 },
    String { string_index: u16 },
    Fieldref { class_index: u16, name_and_type_index: u16 },
    Methodref { class_index: u16, name_and_type_index: u16 },
    InterfaceMethodref { class_index: u16, name_and_type_index: u16 },
    NameAndType { name_index: u16, descriptor_index: u16 },
    MethodHandle { reference_kind: u8, reference_index: u16 },
    MethodType { descriptor_index: u16 },
    Dynamic { bootstrap_method_attr_index: u16, name_and_type_index: u16 },
    InvokeDynamic { bootstrap_method_attr_index: u16, name_and_type_index: u16 },
    Module { name_index: u16 },
    Package { name_index: u16 },
    /// The unused second slot of a Long/Double entry, or an unrecognized tag.
    Unusable,
}

#[derive(Debug, Default)]
pub struct ConstantPool {
    /// 1-indexed; index 0 and the second half of 8-byte constants are `Unusable`.
    entries: Vec<CpEntry>,
}

impl ConstantPool {
    pub fn get(&self, index: u16) -> Option<&CpEntry> {
        self.entries.get(index as usize)
    }

    pub fn utf8(&self, index: u16) -> Option<&str> {
        match self.get(index)? {
            CpEntry::Utf8(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Internal name (`pkg/sub/Name`) referenced by a `Class` constant pool entry.
    pub fn class_internal_name(&self, index: u16) -> Option<&str> {
        match self.get(index)? {
            CpEntry::Class { name_index } => self.utf8(*name_index),
            _ => None,
        }
    }

    pub fn name_and_type(&self, index: u16) -> Option<(&str, &str)> {
        match self.get(index)? {
            CpEntry::NameAndType { name_index, descriptor_index } => {
                Some((self.utf8(*name_index)?, self.utf8(*descriptor_index)?))
            }
            _ => None,
        }
    }

    /// Owning class internal name + (name, descriptor) for a Fieldref/Methodref/
    /// InterfaceMethodref entry.
    pub fn ref_triplet(&self, index: u16) -> Option<(&str, &str, &str)> {
        let (class_index, nat_index) = match self.get(index)? {
            CpEntry::Fieldref { class_index, name_and_type_index }
            | CpEntry::Methodref { class_index, name_and_type_index }
            | CpEntry::InterfaceMethodref { class_index, name_and_type_index } => {
                (*class_index, *name_and_type_index)
            }
            _ => return None,
        };
        let owner = self.class_internal_name(class_index)?;
        let (name, desc) = self.name_and_type(nat_index)?;
        Some((owner, name, desc))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

pub struct ClassAttribute {
    pub name: String,
    pub info: Vec<u8>,
}

pub struct RawField {
    pub access_flags: u16,
    pub name: String,
    pub descriptor: String,
    pub attributes: Vec<ClassAttribute>,
}

pub struct RawMethod {
    pub access_flags: u16,
    pub name: String,
    pub descriptor: String,
    pub attributes: Vec<ClassAttribute>,
}

pub struct RawClass {
    pub constant_pool: ConstantPool,
    pub access_flags: u16,
    pub this_class: String,
    pub super_class: Option<String>,
    pub interfaces: Vec<String>,
    pub fields: Vec<RawField>,
    pub methods: Vec<RawMethod>,
    pub attributes: Vec<ClassAttribute>,
}

/// Parse a full `.class` file buffer into its raw structural form.
pub fn read_class(bytes: &[u8]) -> ReadResult<RawClass> {
    let mut cur = Cursor::new(bytes);

    let magic = cur.read_u32::<BE>()?;
    if magic != 0xCAFEBABE {
        return Err(err(format!("bad magic: {magic:#010x}")));
    }
    let _minor = cur.read_u16::<BE>()?;
    let _major = cur.read_u16::<BE>()?;

    let constant_pool = read_constant_pool(&mut cur)?;

    let access_flags = cur.read_u16::<BE>()?;
    let this_class_idx = cur.read_u16::<BE>()?;
    let this_class = constant_pool
        .class_internal_name(this_class_idx)
        .ok_or_else(|| err("this_class does not resolve to a Class entry"))?
        .to_string();

    let super_class_idx = cur.read_u16::<BE>()?;
    let super_class = if super_class_idx == 0 {
        None
    } else {
        constant_pool.class_internal_name(super_class_idx).map(str::to_string)
    };

    let interfaces_count = cur.read_u16::<BE>()?;
    let mut interfaces = Vec::with_capacity(interfaces_count as usize);
    for _ in 0..interfaces_count {
        let idx = cur.read_u16::<BE>()?;
        if let Some(name) = constant_pool.class_internal_name(idx) {
            interfaces.push(name.to_string());
        }
    }

    let fields_count = cur.read_u16::<BE>()?;
    let mut fields = Vec::with_capacity(fields_count as usize);
    for _ in 0..fields_count {
        fields.push(read_field(&mut cur, &constant_pool)?);
    }

    let methods_count = cur.read_u16::<BE>()?;
    let mut methods = Vec::with_capacity(methods_count as usize);
    for _ in 0..methods_count {
        methods.push(read_method(&mut cur, &constant_pool)?);
    }

    let attributes = read_attributes(&mut cur, &constant_pool)?;

    Ok(RawClass {
        constant_pool,
        access_flags,
        this_class,
        super_class,
        interfaces,
        fields,
        methods,
        attributes,
    })
}

fn read_constant_pool(cur: &mut Cursor<&[u8]>) -> ReadResult<ConstantPool> {
    let count = cur.read_u16::<BE>()?;
    let mut entries = Vec::with_capacity(count as usize);
    entries.push(CpEntry::Unusable); // index 0 unused

    let mut i = 1u16;
    while i < count {
        let tag = cur.read_u8()?;
        let entry = match tag {
            1 => {
                let len = cur.read_u16::<BE>()? as usize;
                let mut buf = vec![0u8; len];
                std::io::Read::read_exact(cur, &mut buf)?;
                CpEntry::Utf8(modified_utf8_to_string(&buf))
            }
            3 => CpEntry::Integer(cur.read_i32::<BE>()?),
            4 => CpEntry::Float(cur.read_f32::<BE>()?),
            5 => CpEntry::Long(cur.read_i64::<BE>()?),
            6 => CpEntry::Double(cur.read_f64::<BE>()?),
            7 => CpEntry::Class { name_index: cur.read_u16::<BE>()? },
            8 => CpEntry::String { string_index: cur.read_u16::<BE>()? },
            9 => CpEntry::Fieldref {
                class_index: cur.read_u16::<BE>()?,
                name_and_type_index: cur.read_u16::<BE>()?,
            },
            10 => CpEntry::Methodref {
                class_index: cur.read_u16::<BE>()?,
                name_and_type_index: cur.read_u16::<BE>()?,
            },
            11 => CpEntry::InterfaceMethodref {
                class_index: cur.read_u16::<BE>()?,
                name_and_type_index: cur.read_u16::<BE>()?,
            },
            12 => CpEntry::NameAndType {
                name_index: cur.read_u16::<BE>()?,
                descriptor_index: cur.read_u16::<BE>()?,
            },
            15 => CpEntry::MethodHandle {
                reference_kind: cur.read_u8()?,
                reference_index: cur.read_u16::<BE>()?,
            },
            16 => CpEntry::MethodType { descriptor_index: cur.read_u16::<BE>()? },
            17 => CpEntry::Dynamic {
                bootstrap_method_attr_index: cur.read_u16::<BE>()?,
                name_and_type_index: cur.read_u16::<BE>()?,
            },
            18 => CpEntry::InvokeDynamic {
                bootstrap_method_attr_index: cur.read_u16::<BE>()?,
                name_and_type_index: cur.read_u16::<BE>()?,
            },
            19 => CpEntry::Module { name_index: cur.read_u16::<BE>()? },
            20 => CpEntry::Package { name_index: cur.read_u16::<BE>()? },
            other => return Err(err(format!("unknown constant pool tag {other} at index {i}"))),
        };
        let wide = matches!(entry, CpEntry::Long(_) | CpEntry::Double(_));
        entries.push(entry);
        i += 1;
        if wide {
            entries.push(CpEntry::Unusable);
            i += 1;
        }
    }

    Ok(ConstantPool { entries })
}

/// JVM "modified UTF-8" differs from standard UTF-8 only in the encoding of
/// NUL and supplementary characters; for our purposes (class/member names,
/// descriptors, annotation values) a lossy standard decode is sufficient.
fn modified_utf8_to_string(buf: &[u8]) -> String {
    String::from_utf8_lossy(buf).into_owned()
}

fn read_field(cur: &mut Cursor<&[u8]>, cp: &ConstantPool) -> ReadResult<RawField> {
    let access_flags = cur.read_u16::<BE>()?;
    let name_index = cur.read_u16::<BE>()?;
    let descriptor_index = cur.read_u16::<BE>()?;
    let attributes = read_attributes(cur, cp)?;
    Ok(RawField {
        access_flags,
        name: cp.utf8(name_index).unwrap_or_default().to_string(),
        descriptor: cp.utf8(descriptor_index).unwrap_or_default().to_string(),
        attributes,
    })
}

fn read_method(cur: &mut Cursor<&[u8]>, cp: &ConstantPool) -> ReadResult<RawMethod> {
    let access_flags = cur.read_u16::<BE>()?;
    let name_index = cur.read_u16::<BE>()?;
    let descriptor_index = cur.read_u16::<BE>()?;
    let attributes = read_attributes(cur, cp)?;
    Ok(RawMethod {
        access_flags,
        name: cp.utf8(name_index).unwrap_or_default().to_string(),
        descriptor: cp.utf8(descriptor_index).unwrap_or_default().to_string(),
        attributes,
    })
}

fn read_attributes(cur: &mut Cursor<&[u8]>, cp: &ConstantPool) -> ReadResult<Vec<ClassAttribute>> {
    let count = cur.read_u16::<BE>()?;
    let mut out = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let name_index = cur.read_u16::<BE>()?;
        let len = cur.read_u32::<BE>()? as usize;
        let mut info = vec![0u8; len];
        std::io::Read::read_exact(cur, &mut info)?;
        let name = cp.utf8(name_index).unwrap_or("").to_string();
        out.push(ClassAttribute { name, info });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_bad_magic() {
        let bytes = [0u8, 1, 2, 3];
        assert!(read_class(&bytes).is_err());
    }
}
