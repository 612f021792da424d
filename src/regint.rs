// regint.rs - Internal types shared by the compiler and the matcher.
// Flags, OpCode, bytecode layouts, GroupHeader and the frozen Program.

use std::fmt::Write as _;

use bitflags::bitflags;

use crate::regenc::CodePoint;
use crate::regerror::SyntaxErrorKind;

// === Config Constants ===
pub const DEFAULT_PARSE_DEPTH_LIMIT: u32 = 256;
pub const DEFAULT_DEPTH_LIMIT: u32 = 2000;
/// Native stack the matcher may use below its entry frame, in bytes.
/// Applies even when the depth limit is disabled.
pub const MATCH_STACK_LIMIT: usize = 1024 * 1024;
pub const DEFAULT_STEP_LIMIT: u64 = 10_000_000;
pub const DEFAULT_CACHE_CAPACITY: usize = 8;
pub const MAX_CAPTURE_NUM: u32 = 65535;

// === Internal Constants ===
pub const INFINITE_REPEAT: u32 = u32::MAX;

#[inline]
pub fn is_infinite_repeat(n: u32) -> bool {
    n == INFINITE_REPEAT
}

// === Flags ===

bitflags! {
    /// RegExp flags (`g i m s u y`).
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct RegexFlags: u8 {
        const GLOBAL = 1 << 0;
        const IGNORE_CASE = 1 << 1;
        const MULTILINE = 1 << 2;
        const DOT_ALL = 1 << 3;
        const UNICODE = 1 << 4;
        const STICKY = 1 << 5;
    }
}

// Canonical order used when rendering a flag string.
const FLAG_LETTERS: [(char, RegexFlags); 6] = [
    ('g', RegexFlags::GLOBAL),
    ('i', RegexFlags::IGNORE_CASE),
    ('m', RegexFlags::MULTILINE),
    ('s', RegexFlags::DOT_ALL),
    ('u', RegexFlags::UNICODE),
    ('y', RegexFlags::STICKY),
];

impl RegexFlags {
    /// Parse a flag string. Unknown or repeated letters are rejected.
    pub fn parse(text: &str) -> Result<RegexFlags, SyntaxErrorKind> {
        let mut flags = RegexFlags::empty();
        for c in text.chars() {
            let flag = FLAG_LETTERS
                .iter()
                .find(|(letter, _)| *letter == c)
                .map(|(_, flag)| *flag)
                .ok_or(SyntaxErrorKind::InvalidFlags)?;
            if flags.contains(flag) {
                return Err(SyntaxErrorKind::InvalidFlags);
            }
            flags |= flag;
        }
        Ok(flags)
    }

    /// Render as a flag string in canonical order.
    pub fn to_flag_string(self) -> String {
        FLAG_LETTERS
            .iter()
            .filter(|(_, flag)| self.contains(*flag))
            .map(|(letter, _)| *letter)
            .collect()
    }

    #[inline]
    pub fn ignore_case(self) -> bool {
        self.contains(RegexFlags::IGNORE_CASE)
    }

    #[inline]
    pub fn unicode(self) -> bool {
        self.contains(RegexFlags::UNICODE)
    }

    /// Global or sticky: exec reads and writes lastIndex.
    #[inline]
    pub fn uses_last_index(self) -> bool {
        self.intersects(RegexFlags::GLOBAL | RegexFlags::STICKY)
    }
}

bitflags! {
    /// Class escapes (`\d \D \w \W \s \S`) folded into one mask.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct ClassEscapes: u8 {
        const DIGIT = 1 << 0;
        const NOT_DIGIT = 1 << 1;
        const WORD = 1 << 2;
        const NOT_WORD = 1 << 3;
        const SPACE = 1 << 4;
        const NOT_SPACE = 1 << 5;
    }
}

impl ClassEscapes {
    /// The escape class named by the letter after a backslash.
    pub fn from_letter(c: CodePoint) -> Option<ClassEscapes> {
        match char::from_u32(c)? {
            'd' => Some(ClassEscapes::DIGIT),
            'D' => Some(ClassEscapes::NOT_DIGIT),
            'w' => Some(ClassEscapes::WORD),
            'W' => Some(ClassEscapes::NOT_WORD),
            's' => Some(ClassEscapes::SPACE),
            'S' => Some(ClassEscapes::NOT_SPACE),
            _ => None,
        }
    }
}

// CharClass flag byte
pub const CLASS_FLAG_INVERTED: u8 = 1 << 0;

// GroupHeader kind byte
pub const GROUP_KIND_CAPTURING: u8 = 1 << 0;
pub const GROUP_KIND_LAZY: u8 = 1 << 1;

// === OpCode Enum ===
//
// Operand layout (little-endian u32 unless noted), following the opcode byte:
//   AlternativeStart/Next  len            length of this alternative's body
//   GroupStart             GroupHeader
//   GroupEnd               back           distance back to the GroupStart opcode
//   Greedy/LazyIterator    min max len    followed by one single-character atom
//   Backreference          index
//   LookaheadPos/Neg       len            body length including AssertEnd
//   ClassEscape            mask:u8
//   CharClass              flags:u8 escapes:u8 nranges (lo hi)* nchars (c)*
//   Char                   code point
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum OpCode {
    Eof = 0,
    AssertEnd = 1,
    AlternativeStart = 2,
    AlternativeNext = 3,
    GroupStart = 4,
    GroupEnd = 5,
    GreedyIterator = 6,
    LazyIterator = 7,
    Backreference = 8,
    AssertLineStart = 9,
    AssertLineEnd = 10,
    AssertWordBoundary = 11,
    AssertNotWordBoundary = 12,
    LookaheadPos = 13,
    LookaheadNeg = 14,
    ClassEscape = 15,
    CharClass = 16,
    Period = 17,
    Char = 18,
}

impl OpCode {
    pub fn from_byte(b: u8) -> Option<OpCode> {
        let op = match b {
            0 => OpCode::Eof,
            1 => OpCode::AssertEnd,
            2 => OpCode::AlternativeStart,
            3 => OpCode::AlternativeNext,
            4 => OpCode::GroupStart,
            5 => OpCode::GroupEnd,
            6 => OpCode::GreedyIterator,
            7 => OpCode::LazyIterator,
            8 => OpCode::Backreference,
            9 => OpCode::AssertLineStart,
            10 => OpCode::AssertLineEnd,
            11 => OpCode::AssertWordBoundary,
            12 => OpCode::AssertNotWordBoundary,
            13 => OpCode::LookaheadPos,
            14 => OpCode::LookaheadNeg,
            15 => OpCode::ClassEscape,
            16 => OpCode::CharClass,
            17 => OpCode::Period,
            18 => OpCode::Char,
            _ => return None,
        };
        Some(op)
    }

    /// Single-character atoms the simple iterator can loop over.
    #[inline]
    pub fn is_simple_atom(self) -> bool {
        matches!(
            self,
            OpCode::Char | OpCode::Period | OpCode::ClassEscape | OpCode::CharClass
        )
    }
}

// === Operand sizes ===
pub const OPSIZE_U32: usize = 4;
pub const OPSIZE_ALTERNATIVE: usize = 1 + OPSIZE_U32;
pub const OPSIZE_GROUP_END: usize = 1 + OPSIZE_U32;
pub const OPSIZE_ITERATOR: usize = 1 + 3 * OPSIZE_U32;
pub const OPSIZE_LOOKAHEAD: usize = 1 + OPSIZE_U32;
pub const GROUP_HEADER_SIZE: usize = 1 + 6 * OPSIZE_U32;
pub const OPSIZE_GROUP_START: usize = 1 + GROUP_HEADER_SIZE;

#[inline]
pub fn read_u32(bc: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bc[at], bc[at + 1], bc[at + 2], bc[at + 3]])
}

/// Total length (opcode byte included) of the instruction at `p`.
pub fn op_len(bc: &[u8], p: usize) -> usize {
    match OpCode::from_byte(bc[p]) {
        Some(OpCode::AlternativeStart | OpCode::AlternativeNext) => OPSIZE_ALTERNATIVE,
        Some(OpCode::GroupStart) => OPSIZE_GROUP_START,
        Some(OpCode::GroupEnd) => OPSIZE_GROUP_END,
        Some(OpCode::GreedyIterator | OpCode::LazyIterator) => OPSIZE_ITERATOR,
        Some(OpCode::Backreference | OpCode::Char) => 1 + OPSIZE_U32,
        Some(OpCode::LookaheadPos | OpCode::LookaheadNeg) => OPSIZE_LOOKAHEAD,
        Some(OpCode::ClassEscape) => 2,
        Some(OpCode::CharClass) => {
            let nranges = read_u32(bc, p + 3) as usize;
            let chars_at = p + 3 + OPSIZE_U32 + nranges * 2 * OPSIZE_U32;
            let nchars = read_u32(bc, chars_at) as usize;
            chars_at + OPSIZE_U32 + nchars * OPSIZE_U32 - p
        }
        _ => 1,
    }
}

// === GroupHeader ===

/// Operands of a GroupStart instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GroupHeader {
    pub capturing: bool,
    pub lazy: bool,
    /// Capture index when capturing, else the non-capturing record index.
    pub group: u32,
    /// First capture nested inside the body (the group itself when capturing).
    pub first_capture: u32,
    /// Number of captures cleared at the start of every iteration.
    pub capture_count: u32,
    pub min: u32,
    pub max: u32,
    /// Distance from the end of the header to the end of the GroupEnd.
    pub skip: u32,
}

impl GroupHeader {
    pub fn encode(&self) -> [u8; GROUP_HEADER_SIZE] {
        let mut out = [0u8; GROUP_HEADER_SIZE];
        let mut kind = 0;
        if self.capturing {
            kind |= GROUP_KIND_CAPTURING;
        }
        if self.lazy {
            kind |= GROUP_KIND_LAZY;
        }
        out[0] = kind;
        let fields = [
            self.group,
            self.first_capture,
            self.capture_count,
            self.min,
            self.max,
            self.skip,
        ];
        for (i, v) in fields.iter().enumerate() {
            let at = 1 + i * OPSIZE_U32;
            out[at..at + OPSIZE_U32].copy_from_slice(&v.to_le_bytes());
        }
        out
    }

    /// Decode the header that starts at `at` (just after the opcode byte).
    pub fn decode(bc: &[u8], at: usize) -> GroupHeader {
        let kind = bc[at];
        let field = |i: usize| read_u32(bc, at + 1 + i * OPSIZE_U32);
        GroupHeader {
            capturing: kind & GROUP_KIND_CAPTURING != 0,
            lazy: kind & GROUP_KIND_LAZY != 0,
            group: field(0),
            first_capture: field(1),
            capture_count: field(2),
            min: field(3),
            max: field(4),
            skip: field(5),
        }
    }
}

// === Program ===

/// A compiled, immutable regular expression.
///
/// Programs are shared through `Rc` by the cache, every `RegExp` built from
/// them and every in-flight match.
#[derive(Clone, PartialEq, Eq)]
pub struct Program {
    /// Pattern text as given to the compiler.
    pub(crate) pattern: String,
    /// `source` rendering of the pattern.
    pub(crate) source: String,
    pub(crate) flags: RegexFlags,
    /// Capturing groups including the implicit group 0.
    pub(crate) capture_count: u32,
    pub(crate) non_capture_count: u32,
    /// Group names indexed by capture number.
    pub(crate) group_names: Vec<Option<String>>,
    pub(crate) bytecode: Box<[u8]>,
}

impl Program {
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn flags(&self) -> RegexFlags {
        self.flags
    }

    /// The flag string in canonical order.
    pub fn flag_string(&self) -> String {
        self.flags.to_flag_string()
    }

    /// Number of capture slots, group 0 included.
    pub fn capture_count(&self) -> usize {
        self.capture_count as usize
    }

    pub fn non_capture_count(&self) -> usize {
        self.non_capture_count as usize
    }

    pub fn has_named_groups(&self) -> bool {
        self.group_names.iter().any(Option::is_some)
    }

    pub fn group_names(&self) -> &[Option<String>] {
        &self.group_names
    }

    /// Capture index of the group called `name`.
    pub fn group_index(&self, name: &str) -> Option<usize> {
        self.group_names
            .iter()
            .position(|n| n.as_deref() == Some(name))
    }

    pub fn bytecode(&self) -> &[u8] {
        &self.bytecode
    }

    /// Human-readable listing of the bytecode, one instruction per line.
    pub fn dump(&self) -> String {
        let bc = &self.bytecode[..];
        let mut out = String::new();
        let mut p = 0;
        while p < bc.len() {
            let len = op_len(bc, p);
            let _ = write!(out, "{:04} ", p);
            match OpCode::from_byte(bc[p]) {
                Some(OpCode::GroupStart) => {
                    let h = GroupHeader::decode(bc, p + 1);
                    let _ = write!(
                        out,
                        "GroupStart {}{} group={} captures={}..{} min={} max={} skip={}",
                        if h.capturing { "capturing" } else { "non-capturing" },
                        if h.lazy { " lazy" } else { "" },
                        h.group,
                        h.first_capture,
                        h.first_capture + h.capture_count,
                        h.min,
                        if is_infinite_repeat(h.max) { "inf".to_string() } else { h.max.to_string() },
                        h.skip
                    );
                }
                Some(op @ (OpCode::GreedyIterator | OpCode::LazyIterator)) => {
                    let max = read_u32(bc, p + 5);
                    let _ = write!(
                        out,
                        "{:?} min={} max={} len={}",
                        op,
                        read_u32(bc, p + 1),
                        if is_infinite_repeat(max) { "inf".to_string() } else { max.to_string() },
                        read_u32(bc, p + 9)
                    );
                }
                Some(OpCode::Char) => {
                    let cp = read_u32(bc, p + 1);
                    match char::from_u32(cp) {
                        Some(c) if !c.is_control() => {
                            let _ = write!(out, "Char {:?}", c);
                        }
                        _ => {
                            let _ = write!(out, "Char U+{:04X}", cp);
                        }
                    }
                }
                Some(OpCode::ClassEscape) => {
                    let mask = ClassEscapes::from_bits_truncate(bc[p + 1]);
                    let _ = write!(out, "ClassEscape {:?}", mask);
                }
                Some(OpCode::CharClass) => {
                    let nranges = read_u32(bc, p + 3);
                    let nchars = read_u32(bc, p + 7 + nranges as usize * 8);
                    let _ = write!(
                        out,
                        "CharClass{} ranges={} chars={}",
                        if bc[p + 1] & CLASS_FLAG_INVERTED != 0 { " inverted" } else { "" },
                        nranges,
                        nchars
                    );
                }
                Some(
                    op @ (OpCode::AlternativeStart
                    | OpCode::AlternativeNext
                    | OpCode::GroupEnd
                    | OpCode::Backreference
                    | OpCode::LookaheadPos
                    | OpCode::LookaheadNeg),
                ) => {
                    let _ = write!(out, "{:?} {}", op, read_u32(bc, p + 1));
                }
                Some(op) => {
                    let _ = write!(out, "{:?}", op);
                }
                None => {
                    let _ = write!(out, "?? {:#04x}", bc[p]);
                }
            }
            out.push('\n');
            p += len;
        }
        out
    }
}

impl std::fmt::Debug for Program {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Program")
            .field("pattern", &self.pattern)
            .field("flags", &self.flag_string())
            .field("capture_count", &self.capture_count)
            .field("non_capture_count", &self.non_capture_count)
            .field("bytecode_len", &self.bytecode.len())
            .finish()
    }
}
