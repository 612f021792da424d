// regcomp.rs - Bytecode buffer and emission helpers.
// The parser emits single-pass into a BytecodeBuffer. Groups, iterators,
// alternatives and lookaheads are wrapped after their body is emitted by
// inserting a header in front of it once the body length is known.

use crate::regenc::CodePoint;
use crate::regint::*;
use crate::regparse_types::{ClassSet, Quantifier};

// ============================================================================
// Bytecode Buffer
// ============================================================================

/// Growable byte sequence with insertion and random-address overwrite.
#[derive(Clone, Debug, Default)]
pub struct BytecodeBuffer {
    bytes: Vec<u8>,
}

impl BytecodeBuffer {
    pub fn new() -> Self {
        BytecodeBuffer { bytes: Vec::with_capacity(64) }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    #[inline]
    pub fn push_op(&mut self, op: OpCode) {
        self.bytes.push(op as u8);
    }

    #[inline]
    pub fn push_u8(&mut self, v: u8) {
        self.bytes.push(v);
    }

    #[inline]
    pub fn push_u32(&mut self, v: u32) {
        self.bytes.extend_from_slice(&v.to_le_bytes());
    }

    /// Overwrite the u32 operand at `at`.
    pub fn write_u32_at(&mut self, at: usize, v: u32) {
        self.bytes[at..at + OPSIZE_U32].copy_from_slice(&v.to_le_bytes());
    }

    /// Insert `data` at `at`, shifting everything after it.
    pub fn insert_bytes(&mut self, at: usize, data: &[u8]) {
        self.bytes.splice(at..at, data.iter().copied());
    }

    /// Freeze into the immutable program representation.
    pub fn into_bytes(self) -> Box<[u8]> {
        self.bytes.into_boxed_slice()
    }
}

// ============================================================================
// Atom Emission
// ============================================================================

pub fn emit_char(buf: &mut BytecodeBuffer, cp: CodePoint) {
    buf.push_op(OpCode::Char);
    buf.push_u32(cp);
}

pub fn emit_class_escape(buf: &mut BytecodeBuffer, mask: ClassEscapes) {
    buf.push_op(OpCode::ClassEscape);
    buf.push_u8(mask.bits());
}

pub fn emit_char_class(buf: &mut BytecodeBuffer, set: &ClassSet) {
    buf.push_op(OpCode::CharClass);
    buf.push_u8(if set.inverted { CLASS_FLAG_INVERTED } else { 0 });
    buf.push_u8(set.escapes.bits());
    buf.push_u32(set.ranges.len() as u32);
    for &(lo, hi) in &set.ranges {
        buf.push_u32(lo);
        buf.push_u32(hi);
    }
    buf.push_u32(set.chars.len() as u32);
    for &c in &set.chars {
        buf.push_u32(c);
    }
}

/// Emit a backreference and return the offset of its index operand.
pub fn emit_backreference(buf: &mut BytecodeBuffer, index: u32) -> usize {
    buf.push_op(OpCode::Backreference);
    let at = buf.len();
    buf.push_u32(index);
    at
}

// ============================================================================
// Wrapping (insertion once the body length is known)
// ============================================================================

fn op_with_u32(op: OpCode, v: u32) -> [u8; 1 + OPSIZE_U32] {
    let b = v.to_le_bytes();
    [op as u8, b[0], b[1], b[2], b[3]]
}

/// Insert an AlternativeStart header in front of the first alternative,
/// whose body spans `start..buf.len()`. Returns the number of bytes inserted.
pub fn insert_alternative_start(buf: &mut BytecodeBuffer, start: usize) -> usize {
    let len = (buf.len() - start) as u32;
    buf.insert_bytes(start, &op_with_u32(OpCode::AlternativeStart, len));
    OPSIZE_ALTERNATIVE
}

/// Reserve an AlternativeNext header; patched by `finish_alternative_next`.
pub fn begin_alternative_next(buf: &mut BytecodeBuffer) -> usize {
    let at = buf.len();
    buf.push_op(OpCode::AlternativeNext);
    buf.push_u32(0);
    at
}

pub fn finish_alternative_next(buf: &mut BytecodeBuffer, header: usize) {
    let len = (buf.len() - header - OPSIZE_ALTERNATIVE) as u32;
    buf.write_u32_at(header + 1, len);
}

/// Wrap `start..buf.len()` in a group. `header.skip` is filled in here.
/// Returns the number of bytes inserted in front of the body.
pub fn wrap_group(buf: &mut BytecodeBuffer, start: usize, mut header: GroupHeader) -> usize {
    let body_len = buf.len() - start;
    header.skip = (body_len + OPSIZE_GROUP_END) as u32;
    let mut head = Vec::with_capacity(OPSIZE_GROUP_START);
    head.push(OpCode::GroupStart as u8);
    head.extend_from_slice(&header.encode());
    buf.insert_bytes(start, &head);
    let back = (OPSIZE_GROUP_START + body_len) as u32;
    buf.push_op(OpCode::GroupEnd);
    buf.push_u32(back);
    OPSIZE_GROUP_START
}

/// Wrap the single-character atom at `start` in a simple iterator.
pub fn wrap_iterator(buf: &mut BytecodeBuffer, start: usize, q: &Quantifier) -> usize {
    let atom_len = (buf.len() - start) as u32;
    let op = if q.lazy {
        OpCode::LazyIterator
    } else {
        OpCode::GreedyIterator
    };
    let mut head = Vec::with_capacity(OPSIZE_ITERATOR);
    head.push(op as u8);
    for v in [q.min, q.max, atom_len] {
        head.extend_from_slice(&v.to_le_bytes());
    }
    buf.insert_bytes(start, &head);
    OPSIZE_ITERATOR
}

/// Terminate the lookahead body at `start..` and insert its header.
pub fn wrap_lookahead(buf: &mut BytecodeBuffer, start: usize, negative: bool) -> usize {
    buf.push_op(OpCode::AssertEnd);
    let len = (buf.len() - start) as u32;
    let op = if negative {
        OpCode::LookaheadNeg
    } else {
        OpCode::LookaheadPos
    };
    buf.insert_bytes(start, &op_with_u32(op, len));
    OPSIZE_LOOKAHEAD
}

/// True when `start..buf.len()` is exactly one single-character atom.
pub fn is_single_simple_atom(buf: &BytecodeBuffer, start: usize) -> bool {
    let bc = buf.as_slice();
    if start >= bc.len() {
        return false;
    }
    match OpCode::from_byte(bc[start]) {
        Some(op) if op.is_simple_atom() => start + op_len(bc, start) == bc.len(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_shifts_body() {
        let mut buf = BytecodeBuffer::new();
        emit_char(&mut buf, 'a' as u32);
        let inserted = wrap_iterator(
            &mut buf,
            0,
            &Quantifier { min: 0, max: INFINITE_REPEAT, lazy: false },
        );
        let bc = buf.as_slice();
        assert_eq!(inserted, OPSIZE_ITERATOR);
        assert_eq!(bc[0], OpCode::GreedyIterator as u8);
        assert_eq!(read_u32(bc, 1), 0);
        assert_eq!(read_u32(bc, 5), INFINITE_REPEAT);
        assert_eq!(read_u32(bc, 9), 5);
        assert_eq!(bc[OPSIZE_ITERATOR], OpCode::Char as u8);
    }

    #[test]
    fn group_end_points_back_to_start() {
        let mut buf = BytecodeBuffer::new();
        buf.push_op(OpCode::Period);
        emit_char(&mut buf, 'b' as u32);
        let header = GroupHeader {
            capturing: true,
            lazy: false,
            group: 1,
            first_capture: 1,
            capture_count: 1,
            min: 1,
            max: 1,
            skip: 0,
        };
        wrap_group(&mut buf, 0, header);
        let bc = buf.as_slice();
        let h = GroupHeader::decode(bc, 1);
        assert_eq!(h.skip as usize, 6 + OPSIZE_GROUP_END);
        let end = OPSIZE_GROUP_START + 6;
        assert_eq!(bc[end], OpCode::GroupEnd as u8);
        assert_eq!(end - read_u32(bc, end + 1) as usize, 0);
        assert_eq!(OPSIZE_GROUP_START + h.skip as usize, bc.len());
    }

    #[test]
    fn write_u32_overwrites_in_place() {
        let mut buf = BytecodeBuffer::new();
        let at = emit_backreference(&mut buf, 0);
        buf.write_u32_at(at, 7);
        assert_eq!(read_u32(buf.as_slice(), at), 7);
        assert_eq!(buf.len(), 5);
    }

    #[test]
    fn single_atom_detection() {
        let mut buf = BytecodeBuffer::new();
        emit_class_escape(&mut buf, ClassEscapes::DIGIT);
        assert!(is_single_simple_atom(&buf, 0));
        emit_char(&mut buf, 'x' as u32);
        assert!(!is_single_simple_atom(&buf, 0));
        assert!(is_single_simple_atom(&buf, 2));
    }
}
