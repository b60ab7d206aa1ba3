//! Walks the bytecode inside a `Code` attribute and yields the handful of
//! instruction-level events the extractor cares about: type references from
//! `new`/`checkcast`/`instanceof`/`anewarray`, field accesses, method calls,
//! and `ldc`-loaded type/method-handle constants. Everything else is decoded
//! only far enough to know how many bytes to skip, so the cursor never loses
//! sync with a real instruction stream.

use byteorder::{ReadBytesExt, BE};
use std::io::{Cursor, Read};

use super::class_reader::{ClassAttribute, ConstantPool, CpEntry};

#[derive(Debug)]
pub struct ExceptionTableEntry {
    pub start_pc: u16,
    pub end_pc: u16,
    pub handler_pc: u16,
    pub catch_type_index: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstructionEvent {
    /// new / anewarray / checkcast / instanceof referencing a Class entry.
    TypeInstruction { cp_index: u16 },
    /// getfield / putfield / getstatic / putstatic referencing a Fieldref.
    FieldAccess { cp_index: u16 },
    /// invoke* referencing a Methodref / InterfaceMethodref / InvokeDynamic.
    MethodCall { cp_index: u16 },
    /// ldc / ldc_w / ldc2_w referencing a Class / MethodHandle / MethodType / Dynamic.
    ConstLoad { cp_index: u16 },
}

pub struct DecodedCode {
    pub exception_table: Vec<ExceptionTableEntry>,
    pub events: Vec<(usize, InstructionEvent)>,
    /// start_pc -> line, sorted ascending by start_pc.
    pub line_table: Vec<(u16, u32)>,
}

/// Parse a `Code` attribute's raw `info` bytes. Needs the constant pool only
/// to recognize nested `LineNumberTable` attributes by name.
pub fn decode_code_attribute(
    info: &[u8],
    cp: &ConstantPool,
) -> super::class_reader::ReadResult<DecodedCode> {
    let mut cur = Cursor::new(info);
    let _max_stack = cur.read_u16::<BE>()?;
    let _max_locals = cur.read_u16::<BE>()?;
    let code_length = cur.read_u32::<BE>()? as usize;
    let mut code = vec![0u8; code_length];
    cur.read_exact(&mut code)?;

    let exc_count = cur.read_u16::<BE>()?;
    let mut exception_table = Vec::with_capacity(exc_count as usize);
    for _ in 0..exc_count {
        exception_table.push(ExceptionTableEntry {
            start_pc: cur.read_u16::<BE>()?,
            end_pc: cur.read_u16::<BE>()?,
            handler_pc: cur.read_u16::<BE>()?,
            catch_type_index: cur.read_u16::<BE>()?,
        });
    }

    let nested_count = cur.read_u16::<BE>()?;
    let mut line_table = Vec::new();
    for _ in 0..nested_count {
        let name_index = cur.read_u16::<BE>()?;
        let len = cur.read_u32::<BE>()? as usize;
        let mut body = vec![0u8; len];
        cur.read_exact(&mut body)?;
        if cp.utf8(name_index) == Some("LineNumberTable") {
            line_table.extend(parse_line_number_table(&body));
        }
    }
    line_table.sort_by_key(|(pc, _)| *pc);

    let events = walk_instructions(&code);

    Ok(DecodedCode {
        exception_table,
        events,
        line_table,
    })
}

fn parse_line_number_table(body: &[u8]) -> Vec<(u16, u32)> {
    let mut c = Cursor::new(body);
    let mut out = Vec::new();
    let count = match c.read_u16::<BE>() {
        Ok(n) => n,
        Err(_) => return out,
    };
    for _ in 0..count {
        let start_pc = match c.read_u16::<BE>() {
            Ok(v) => v,
            Err(_) => break,
        };
        let line = match c.read_u16::<BE>() {
            Ok(v) => v as u32,
            Err(_) => break,
        };
        out.push((start_pc, line));
    }
    out
}

/// Given a sorted line table and an instruction offset, find the line
/// attributed to it: the greatest `start_pc <= offset`.
pub fn line_for_offset(line_table: &[(u16, u32)], offset: usize) -> Option<u32> {
    let mut best = None;
    for (pc, line) in line_table {
        if (*pc as usize) <= offset {
            best = Some(*line);
        } else {
            break;
        }
    }
    best
}

pub fn class_attribute_info<'a>(attrs: &'a [ClassAttribute], name: &str) -> Option<&'a [u8]> {
    attrs.iter().find(|a| a.name == name).map(|a| a.info.as_slice())
}

enum OperandLen {
    Fixed(usize),
    TableSwitch,
    LookupSwitch,
    Wide,
}

fn operand_len(opcode: u8) -> OperandLen {
    use OperandLen::*;
    match opcode {
        0x10 | 0x12 | 0x15..=0x19 | 0x36..=0x3a | 0xa9 | 0xbc => Fixed(1),
        0x11 | 0x13 | 0x14 | 0x17..=0x18 | 0x99..=0xa8 | 0xb2..=0xb8 | 0xbb | 0xbd | 0xc0 | 0xc1
        | 0xc6 | 0xc7 => Fixed(2),
        0x84 => Fixed(2), // iinc
        0xb9 | 0xba => Fixed(4), // invokeinterface, invokedynamic
        0xc5 => Fixed(3), // multianewarray
        0xc8 | 0xc9 => Fixed(4), // goto_w, jsr_w
        0xaa => TableSwitch,
        0xab => LookupSwitch,
        0xc4 => Wide,
        _ => Fixed(0),
    }
}

/// Two-byte big-endian constant pool index immediately following the opcode,
/// for the handful of opcodes we care about.
fn cp_index_operand(code: &[u8], operand_start: usize) -> Option<u16> {
    let hi = *code.get(operand_start)? as u16;
    let lo = *code.get(operand_start + 1)? as u16;
    Some((hi << 8) | lo)
}

fn walk_instructions(code: &[u8]) -> Vec<(usize, InstructionEvent)> {
    let mut events = Vec::new();
    let mut pc = 0usize;

    while pc < code.len() {
        let opcode = code[pc];
        let instr_start = pc;
        let operand_start = pc + 1;

        match operand_len(opcode) {
            OperandLen::Fixed(n) => {
                if let Some(ev) = classify(opcode, code, operand_start) {
                    events.push((instr_start, ev));
                }
                pc = operand_start + n;
            }
            OperandLen::TableSwitch => {
                let mut p = align4(operand_start);
                p += 4; // default
                let low = read_i32(code, p).unwrap_or(0);
                p += 4;
                let high = read_i32(code, p).unwrap_or(low);
                p += 4;
                let n = (high - low + 1).max(0) as usize;
                p += n.saturating_mul(4);
                pc = p;
            }
            OperandLen::LookupSwitch => {
                let mut p = align4(operand_start);
                p += 4; // default
                let npairs = read_i32(code, p).unwrap_or(0).max(0) as usize;
                p += 4;
                p += npairs.saturating_mul(8);
                pc = p;
            }
            OperandLen::Wide => {
                let sub = *code.get(operand_start).unwrap_or(&0);
                pc = if sub == 0x84 {
                    operand_start + 1 + 4 // iinc: sub-opcode + index(2) + const(2)
                } else {
                    operand_start + 1 + 2 // index(2)
                };
            }
        }

        if pc <= instr_start {
            // Guard against malformed streams that would otherwise spin forever.
            pc = instr_start + 1;
        }
    }

    events
}

fn classify(opcode: u8, code: &[u8], operand_start: usize) -> Option<InstructionEvent> {
    let cp_index = cp_index_operand(code, operand_start)?;
    match opcode {
        0xbb | 0xbd | 0xc0 | 0xc1 => Some(InstructionEvent::TypeInstruction { cp_index }),
        0xb2 | 0xb3 | 0xb4 | 0xb5 => Some(InstructionEvent::FieldAccess { cp_index }),
        0xb6 | 0xb7 | 0xb8 | 0xb9 | 0xba => Some(InstructionEvent::MethodCall { cp_index }),
        0x12 | 0x13 | 0x14 => Some(InstructionEvent::ConstLoad { cp_index }),
        _ => None,
    }
}

fn align4(offset: usize) -> usize {
    (offset + 3) & !3
}

fn read_i32(code: &[u8], offset: usize) -> Option<i32> {
    let b = code.get(offset..offset + 4)?;
    Some(i32::from_be_bytes([b[0], b[1], b[2], b[3]]))
}

/// Resolve the constant-pool entry targeted by a `ConstLoad` to a type
/// reference internal name, or `None` for non-type constants (String,
/// Integer, ...).
pub fn const_load_type_name<'a>(cp: &'a ConstantPool, cp_index: u16) -> Option<&'a str> {
    match cp.get(cp_index)? {
        CpEntry::Class { name_index } => cp.utf8(*name_index),
        CpEntry::MethodHandle { reference_index, .. } => {
            // A handle to a field or method: surface the owner's name.
            cp.ref_triplet(*reference_index).map(|(owner, _, _)| owner)
        }
        CpEntry::MethodType { .. } => None,
        _ => None,
    }
}
