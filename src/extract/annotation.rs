//! Parses `RuntimeVisible/InvisibleAnnotations` attribute bodies (JVMS
//! §4.7.16) far enough to collect each annotation's type FQN. Element values
//! are walked only to know how many bytes to skip.

use byteorder::{ReadBytesExt, BE};
use std::io::Cursor;

use super::class_reader::{ConstantPool, ReadResult};

/// Parse an annotations attribute body into the FQNs of each annotation type.
pub fn parse_annotation_fqns(body: &[u8], cp: &ConstantPool) -> ReadResult<Vec<String>> {
    let mut cur = Cursor::new(body);
    let count = cur.read_u16::<BE>()?;
    let mut out = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let type_index = cur.read_u16::<BE>()?;
        if let Some(desc) = cp.utf8(type_index) {
            if let Some(fqn) = descriptor_to_fqn(desc) {
                out.push(fqn);
            }
        }
        skip_element_value_pairs(&mut cur)?;
    }
    Ok(out)
}

/// `Lcom/example/Foo;` -> `com.example.Foo`.
fn descriptor_to_fqn(desc: &str) -> Option<String> {
    let inner = desc.strip_prefix('L')?.strip_suffix(';')?;
    Some(inner.replace('/', "."))
}

fn skip_element_value_pairs(cur: &mut Cursor<&[u8]>) -> ReadResult<()> {
    let num_pairs = cur.read_u16::<BE>()?;
    for _ in 0..num_pairs {
        let _element_name_index = cur.read_u16::<BE>()?;
        skip_element_value(cur)?;
    }
    Ok(())
}

fn skip_element_value(cur: &mut Cursor<&[u8]>) -> ReadResult<()> {
    let tag = cur.read_u8()?;
    match tag as char {
        'B' | 'C' | 'D' | 'F' | 'I' | 'J' | 'S' | 'Z' | 's' => {
            let _const_value_index = cur.read_u16::<BE>()?;
        }
        'e' => {
            let _type_name_index = cur.read_u16::<BE>()?;
            let _const_name_index = cur.read_u16::<BE>()?;
        }
        'c' => {
            let _class_info_index = cur.read_u16::<BE>()?;
        }
        '@' => {
            let _type_index = cur.read_u16::<BE>()?;
            skip_element_value_pairs(cur)?;
        }
        '[' => {
            let num_values = cur.read_u16::<BE>()?;
            for _ in 0..num_values {
                skip_element_value(cur)?;
            }
        }
        other => {
            return Err(super::class_reader::ReadError(format!(
                "unknown element_value tag '{other}'"
            )))
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_to_fqn_roundtrip() {
        assert_eq!(
            descriptor_to_fqn("Lcom/example/Foo;"),
            Some("com.example.Foo".to_string())
        );
    }
}
