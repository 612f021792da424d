// regexec.rs - Backtracking bytecode matcher.
// Recursive interpreter over a compiled Program. Straight-line code falls
// through inside one frame; every choice point recurses for its preferred
// branch and falls through to the last one.
//
// All mutable match state (capture slots, group iteration counters and
// iteration entry positions) lives in one flat register file. Writes are
// recorded on an undo trail, and a failing branch rolls the trail back to
// the mark taken at its choice point.

use std::ops::Range;

use smallvec::SmallVec;
use tracing::{debug, trace};

use crate::config::MatchLimits;
use crate::encodings::Utf16View;
use crate::regenc::CodePoint;
use crate::regerror::LimitKind;
use crate::regint::*;
use crate::unicode::*;

const EXEC_TARGET: &str = "ecma_regexp::regexec";

/// Register value of an unset capture slot.
const UNSET: usize = usize::MAX;

/// Failure that aborts the whole match, as opposed to a plain non-match.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecError {
    Limit(LimitKind),
    InvalidBytecode { at: usize },
}

/// Capture spans in code units, indexed by group number.
pub type CaptureSpans = Vec<Option<Range<usize>>>;

type ExecResult = Result<Option<usize>, ExecError>;

/// Outcome of one instruction handler.
enum Step {
    /// Continue at (pc, position) in the current frame.
    Goto(usize, usize),
    /// Return from the current frame.
    Done(Option<usize>),
}

// ============================================================================
// Match Context
// ============================================================================

/// Per-invocation matcher state. Owned by one search.
pub struct MatchContext<'a> {
    bc: &'a [u8],
    input: Utf16View<'a>,
    ignore_case: bool,
    unicode: bool,
    multiline: bool,
    dot_all: bool,
    capture_count: usize,
    // [start, end] per capture, then [iterations, entry] per group record
    regs: Vec<usize>,
    trail: Vec<(u32, usize)>,
    depth: u32,
    steps: u64,
    // address of a local in the `match_at` frame
    stack_base: usize,
    limits: MatchLimits,
}

impl<'a> MatchContext<'a> {
    pub fn new(program: &'a Program, input: &'a [u16], limits: MatchLimits) -> Self {
        let flags = program.flags();
        let capture_count = program.capture_count();
        let records = capture_count + program.non_capture_count();
        MatchContext {
            bc: program.bytecode(),
            input: Utf16View::new(input, flags.unicode()),
            ignore_case: flags.ignore_case(),
            unicode: flags.unicode(),
            multiline: flags.contains(RegexFlags::MULTILINE),
            dot_all: flags.contains(RegexFlags::DOT_ALL),
            capture_count,
            regs: vec![UNSET; 2 * capture_count + 2 * records],
            trail: Vec::new(),
            depth: 0,
            steps: 0,
            stack_base: 0,
            limits,
        }
    }

    /// Try to match with the program anchored at `start`.
    /// Returns the end of the match.
    pub fn match_at(&mut self, start: usize) -> ExecResult {
        self.regs.fill(UNSET);
        self.trail.clear();
        self.depth = 0;
        self.steps = 0;
        self.stack_base = stack_address();
        let result = self.run(0, start);
        if let Err(err) = &result {
            debug!(target: EXEC_TARGET, start, error = ?err, steps = self.steps, "match aborted");
        }
        result
    }

    /// Capture spans of the last successful `match_at`.
    pub fn captures(&self) -> CaptureSpans {
        (0..self.capture_count)
            .map(|i| {
                let (s, e) = (self.regs[2 * i], self.regs[2 * i + 1]);
                (s != UNSET && e != UNSET).then_some(s..e)
            })
            .collect()
    }

    // --- registers ---

    #[inline]
    fn record_of(&self, h: &GroupHeader) -> usize {
        if h.capturing {
            h.group as usize
        } else {
            self.capture_count + h.group as usize
        }
    }

    #[inline]
    fn iterations_reg(&self, record: usize) -> usize {
        2 * self.capture_count + 2 * record
    }

    #[inline]
    fn entry_reg(&self, record: usize) -> usize {
        2 * self.capture_count + 2 * record + 1
    }

    #[inline]
    fn set(&mut self, reg: usize, value: usize) {
        let old = self.regs[reg];
        if old != value {
            self.trail.push((reg as u32, old));
            self.regs[reg] = value;
        }
    }

    #[inline]
    fn mark(&self) -> usize {
        self.trail.len()
    }

    fn undo_to(&mut self, mark: usize) {
        while self.trail.len() > mark {
            if let Some((reg, old)) = self.trail.pop() {
                self.regs[reg as usize] = old;
            }
        }
    }

    // --- budgets ---

    #[inline]
    fn tick(&mut self) -> Result<(), ExecError> {
        self.steps += 1;
        if self.limits.steps_exceeded(self.steps) {
            return Err(ExecError::Limit(LimitKind::Steps));
        }
        Ok(())
    }

    // ========================================================================
    // Interpreter Loop
    // ========================================================================

    fn run(&mut self, pc: usize, pos: usize) -> ExecResult {
        self.depth += 1;
        if self.limits.depth_exceeded(self.depth)
            || self.stack_base.abs_diff(stack_address()) > MATCH_STACK_LIMIT
        {
            return Err(ExecError::Limit(LimitKind::Depth));
        }
        let result = self.dispatch(pc, pos);
        self.depth -= 1;
        result
    }

    fn dispatch(&mut self, mut pc: usize, mut pos: usize) -> ExecResult {
        loop {
            self.tick()?;
            let byte = *self
                .bc
                .get(pc)
                .ok_or(ExecError::InvalidBytecode { at: pc })?;
            let op = OpCode::from_byte(byte).ok_or(ExecError::InvalidBytecode { at: pc })?;
            let step = match op {
                OpCode::Eof | OpCode::AssertEnd => Step::Done(Some(pos)),
                OpCode::Char | OpCode::Period | OpCode::ClassEscape | OpCode::CharClass => {
                    match self.match_atom(pc, pos) {
                        Some(next) => Step::Goto(pc + op_len(self.bc, pc), next),
                        None => Step::Done(None),
                    }
                }
                OpCode::AssertLineStart => self.assert(self.at_line_start(pos), pc, pos),
                OpCode::AssertLineEnd => self.assert(self.at_line_end(pos), pc, pos),
                OpCode::AssertWordBoundary => self.assert(self.at_word_boundary(pos), pc, pos),
                OpCode::AssertNotWordBoundary => {
                    self.assert(!self.at_word_boundary(pos), pc, pos)
                }
                OpCode::Backreference => {
                    let index = read_u32(self.bc, pc + 1) as usize;
                    match self.match_backreference(index, pos) {
                        Some(next) => Step::Goto(pc + 1 + OPSIZE_U32, next),
                        None => Step::Done(None),
                    }
                }
                OpCode::AlternativeStart => self.alternatives(pc, pos)?,
                OpCode::AlternativeNext => Step::Goto(self.skip_alternatives(pc), pos),
                OpCode::GroupStart => self.group_start(pc, pos)?,
                OpCode::GroupEnd => self.group_end(pc, pos)?,
                OpCode::GreedyIterator => self.greedy_iterator(pc, pos)?,
                OpCode::LazyIterator => self.lazy_iterator(pc, pos)?,
                OpCode::LookaheadPos => self.lookahead(pc, pos, false)?,
                OpCode::LookaheadNeg => self.lookahead(pc, pos, true)?,
            };
            match step {
                Step::Goto(next_pc, next_pos) => {
                    pc = next_pc;
                    pos = next_pos;
                }
                Step::Done(result) => return Ok(result),
            }
        }
    }

    #[inline]
    fn assert(&self, holds: bool, pc: usize, pos: usize) -> Step {
        if holds {
            Step::Goto(pc + 1, pos)
        } else {
            Step::Done(None)
        }
    }

    // ========================================================================
    // Alternatives
    // ========================================================================

    #[inline(never)]
    fn alternatives(&mut self, pc: usize, pos: usize) -> Result<Step, ExecError> {
        let mut at = pc;
        loop {
            let body = at + OPSIZE_ALTERNATIVE;
            let next = body + read_u32(self.bc, at + 1) as usize;
            if self.bc.get(next) != Some(&(OpCode::AlternativeNext as u8)) {
                // last alternative
                return Ok(Step::Goto(body, pos));
            }
            let mark = self.mark();
            if let Some(end) = self.run(body, pos)? {
                return Ok(Step::Done(Some(end)));
            }
            self.undo_to(mark);
            at = next;
        }
    }

    /// End of a non-last alternative: jump past the rest of the chain.
    fn skip_alternatives(&self, mut at: usize) -> usize {
        while self.bc.get(at) == Some(&(OpCode::AlternativeNext as u8)) {
            at += OPSIZE_ALTERNATIVE + read_u32(self.bc, at + 1) as usize;
        }
        at
    }

    // ========================================================================
    // Groups
    // ========================================================================

    /// Clear the captures nested in the group and record the entry position.
    fn begin_iteration(&mut self, h: &GroupHeader, record: usize, pos: usize) {
        let first = h.first_capture as usize;
        for i in first..first + h.capture_count as usize {
            self.set(2 * i, UNSET);
            self.set(2 * i + 1, UNSET);
        }
        if h.capturing {
            self.set(2 * h.group as usize, pos);
        }
        let entry = self.entry_reg(record);
        self.set(entry, pos);
    }

    #[inline(never)]
    fn group_start(&mut self, pc: usize, pos: usize) -> Result<Step, ExecError> {
        let h = GroupHeader::decode(self.bc, pc + 1);
        let body = pc + OPSIZE_GROUP_START;
        let after = body + h.skip as usize;
        if h.max == 0 {
            return Ok(Step::Goto(after, pos));
        }
        let record = self.record_of(&h);
        let iterations = self.iterations_reg(record);
        self.set(iterations, 0);
        if h.min > 0 {
            self.begin_iteration(&h, record, pos);
            return Ok(Step::Goto(body, pos));
        }
        let mark = self.mark();
        if h.lazy {
            if let Some(end) = self.run(after, pos)? {
                return Ok(Step::Done(Some(end)));
            }
            self.undo_to(mark);
            self.begin_iteration(&h, record, pos);
            Ok(Step::Goto(body, pos))
        } else {
            self.begin_iteration(&h, record, pos);
            if let Some(end) = self.run(body, pos)? {
                return Ok(Step::Done(Some(end)));
            }
            self.undo_to(mark);
            Ok(Step::Goto(after, pos))
        }
    }

    #[inline(never)]
    fn group_end(&mut self, pc: usize, pos: usize) -> Result<Step, ExecError> {
        let start = pc
            .checked_sub(read_u32(self.bc, pc + 1) as usize)
            .ok_or(ExecError::InvalidBytecode { at: pc })?;
        let h = GroupHeader::decode(self.bc, start + 1);
        let body = start + OPSIZE_GROUP_START;
        let after = pc + OPSIZE_GROUP_END;
        let record = self.record_of(&h);
        let iterations = self.iterations_reg(record);
        let done = self.regs[iterations] as u32;

        // an empty iteration past the minimum can never make progress
        if done >= h.min && self.regs[self.entry_reg(record)] == pos {
            return Ok(Step::Done(None));
        }
        if h.capturing {
            self.set(2 * h.group as usize + 1, pos);
        }
        let count = done + 1;
        self.set(iterations, count as usize);

        if count < h.min {
            self.begin_iteration(&h, record, pos);
            return Ok(Step::Goto(body, pos));
        }
        if count >= h.max {
            return Ok(Step::Goto(after, pos));
        }
        let mark = self.mark();
        if h.lazy {
            if let Some(end) = self.run(after, pos)? {
                return Ok(Step::Done(Some(end)));
            }
            self.undo_to(mark);
            self.begin_iteration(&h, record, pos);
            Ok(Step::Goto(body, pos))
        } else {
            self.begin_iteration(&h, record, pos);
            if let Some(end) = self.run(body, pos)? {
                return Ok(Step::Done(Some(end)));
            }
            self.undo_to(mark);
            Ok(Step::Goto(after, pos))
        }
    }

    // ========================================================================
    // Simple Iterators
    // ========================================================================

    #[inline(never)]
    fn greedy_iterator(&mut self, pc: usize, pos: usize) -> Result<Step, ExecError> {
        let min = read_u32(self.bc, pc + 1) as usize;
        let max = read_u32(self.bc, pc + 5);
        let atom = pc + OPSIZE_ITERATOR;
        let after = atom + read_u32(self.bc, pc + 9) as usize;

        // Every atom is one code unit wide outside unicode mode, so the
        // positions only need recording when surrogate pairs can occur.
        let mut positions: SmallVec<[usize; 16]> = SmallVec::new();
        let track = self.unicode;
        if track {
            positions.push(pos);
        }
        let mut cur = pos;
        let mut count = 0usize;
        while is_infinite_repeat(max) || count < max as usize {
            match self.match_atom(atom, cur) {
                Some(next) => {
                    cur = next;
                    count += 1;
                    if track {
                        positions.push(cur);
                    }
                }
                None => break,
            }
        }
        if count < min {
            return Ok(Step::Done(None));
        }
        let position = |k: usize| if track { positions[k] } else { pos + k };
        for k in (min + 1..=count).rev() {
            let mark = self.mark();
            if let Some(end) = self.run(after, position(k))? {
                return Ok(Step::Done(Some(end)));
            }
            self.undo_to(mark);
        }
        Ok(Step::Goto(after, position(min)))
    }

    #[inline(never)]
    fn lazy_iterator(&mut self, pc: usize, pos: usize) -> Result<Step, ExecError> {
        let min = read_u32(self.bc, pc + 1);
        let max = read_u32(self.bc, pc + 5);
        let atom = pc + OPSIZE_ITERATOR;
        let after = atom + read_u32(self.bc, pc + 9) as usize;

        let mut cur = pos;
        let mut count = 0u32;
        while count < min {
            match self.match_atom(atom, cur) {
                Some(next) => cur = next,
                None => return Ok(Step::Done(None)),
            }
            count += 1;
        }
        loop {
            if count >= max {
                return Ok(Step::Goto(after, cur));
            }
            let mark = self.mark();
            if let Some(end) = self.run(after, cur)? {
                return Ok(Step::Done(Some(end)));
            }
            self.undo_to(mark);
            match self.match_atom(atom, cur) {
                Some(next) => cur = next,
                None => return Ok(Step::Done(None)),
            }
            count += 1;
        }
    }

    // ========================================================================
    // Lookahead
    // ========================================================================

    #[inline(never)]
    fn lookahead(&mut self, pc: usize, pos: usize, negative: bool) -> Result<Step, ExecError> {
        let body = pc + OPSIZE_LOOKAHEAD;
        let after = body + read_u32(self.bc, pc + 1) as usize;
        let mark = self.mark();
        let matched = self.run(body, pos)?.is_some();
        if negative {
            self.undo_to(mark);
            return Ok(if matched {
                Step::Done(None)
            } else {
                Step::Goto(after, pos)
            });
        }
        if matched {
            Ok(Step::Goto(after, pos))
        } else {
            self.undo_to(mark);
            Ok(Step::Done(None))
        }
    }

    // ========================================================================
    // Character Tests
    // ========================================================================

    /// Match the single-character atom at `pc`, returning the new position.
    fn match_atom(&self, pc: usize, pos: usize) -> Option<usize> {
        let (cp, width) = self.input.decode_next(pos)?;
        let hit = match OpCode::from_byte(self.bc[pc])? {
            OpCode::Char => {
                let want = read_u32(self.bc, pc + 1);
                cp == want || (self.ignore_case && canonicalize(cp, self.unicode) == want)
            }
            OpCode::Period => self.dot_all || !is_line_terminator(cp),
            OpCode::ClassEscape => {
                self.class_escape_matches(ClassEscapes::from_bits_truncate(self.bc[pc + 1]), cp)
            }
            OpCode::CharClass => self.char_class_matches(pc, cp),
            _ => false,
        };
        hit.then_some(pos + width)
    }

    #[inline]
    fn is_word(&self, cp: CodePoint) -> bool {
        is_word_char_ic(cp, self.unicode && self.ignore_case)
    }

    fn class_escape_matches(&self, mask: ClassEscapes, cp: CodePoint) -> bool {
        if mask.intersects(ClassEscapes::DIGIT | ClassEscapes::NOT_DIGIT) {
            let digit = is_decimal_digit(cp);
            if mask.contains(if digit { ClassEscapes::DIGIT } else { ClassEscapes::NOT_DIGIT }) {
                return true;
            }
        }
        if mask.intersects(ClassEscapes::WORD | ClassEscapes::NOT_WORD) {
            let word = self.is_word(cp);
            if mask.contains(if word { ClassEscapes::WORD } else { ClassEscapes::NOT_WORD }) {
                return true;
            }
        }
        if mask.intersects(ClassEscapes::SPACE | ClassEscapes::NOT_SPACE) {
            let space = is_whitespace(cp);
            if mask.contains(if space { ClassEscapes::SPACE } else { ClassEscapes::NOT_SPACE }) {
                return true;
            }
        }
        false
    }

    fn char_class_matches(&self, pc: usize, cp: CodePoint) -> bool {
        let bc = self.bc;
        let inverted = bc[pc + 1] & CLASS_FLAG_INVERTED != 0;
        let escapes = ClassEscapes::from_bits_truncate(bc[pc + 2]);
        let nranges = read_u32(bc, pc + 3) as usize;
        let ranges_at = pc + 3 + OPSIZE_U32;
        let chars_at = ranges_at + nranges * 2 * OPSIZE_U32;
        let nchars = read_u32(bc, chars_at) as usize;

        let key = if self.ignore_case {
            canonicalize(cp, self.unicode)
        } else {
            cp
        };
        // a range matches when one of its members shares the canonical form
        let equivalents: SmallVec<[CodePoint; 8]> = if self.ignore_case && nranges > 0 {
            case_equivalents(cp, self.unicode)
        } else {
            SmallVec::new()
        };
        let hit = (!escapes.is_empty() && self.class_escape_matches(escapes, cp))
            || (0..nchars).any(|i| read_u32(bc, chars_at + OPSIZE_U32 * (i + 1)) == key)
            || (0..nranges).any(|i| {
                let lo = read_u32(bc, ranges_at + 2 * OPSIZE_U32 * i);
                let hi = read_u32(bc, ranges_at + 2 * OPSIZE_U32 * i + OPSIZE_U32);
                let within = |c: CodePoint| lo <= c && c <= hi;
                within(cp) || equivalents.iter().any(|&v| within(v))
            });
        hit != inverted
    }

    fn match_backreference(&self, index: usize, pos: usize) -> Option<usize> {
        if index >= self.capture_count {
            return Some(pos);
        }
        let (s, e) = (self.regs[2 * index], self.regs[2 * index + 1]);
        if s == UNSET || e == UNSET {
            return Some(pos);
        }
        let units = self.input.units();
        if !self.ignore_case {
            let len = e - s;
            let candidate = units.get(pos..pos + len)?;
            return (candidate == &units[s..e]).then_some(pos + len);
        }
        let (mut a, mut b) = (s, pos);
        while a < e {
            let (ca, wa) = self.input.decode_next(a)?;
            let (cb, wb) = self.input.decode_next(b)?;
            if ca != cb && canonicalize(ca, self.unicode) != canonicalize(cb, self.unicode) {
                return None;
            }
            a += wa;
            b += wb;
        }
        Some(b)
    }

    fn at_line_start(&self, pos: usize) -> bool {
        pos == 0
            || (self.multiline && self.input.unit_at(pos - 1).is_some_and(is_line_terminator))
    }

    fn at_line_end(&self, pos: usize) -> bool {
        pos >= self.input.len()
            || (self.multiline && self.input.unit_at(pos).is_some_and(is_line_terminator))
    }

    fn at_word_boundary(&self, pos: usize) -> bool {
        let before = self.input.peek_prev(pos).is_some_and(|c| self.is_word(c));
        let after = self.input.peek_next(pos).is_some_and(|c| self.is_word(c));
        before != after
    }
}

/// Address of a fresh local in the caller's frame.
#[inline(always)]
fn stack_address() -> usize {
    let marker = 0u8;
    std::hint::black_box(&marker) as *const u8 as usize
}

// ============================================================================
// Search
// ============================================================================

/// Search `input` from `start`. Sticky programs only try `start` itself;
/// otherwise every position up to and including the end of input is tried.
pub fn search(
    program: &Program,
    input: &[u16],
    start: usize,
    limits: MatchLimits,
) -> Result<Option<CaptureSpans>, ExecError> {
    trace!(target: EXEC_TARGET, pattern = program.pattern(), start, len = input.len(), "search");
    let sticky = program.flags().contains(RegexFlags::STICKY);
    let mut ctx = MatchContext::new(program, input, limits);
    let view = ctx.input;
    let mut pos = start;
    while pos <= input.len() {
        if ctx.match_at(pos)?.is_some() {
            return Ok(Some(ctx.captures()));
        }
        if sticky {
            break;
        }
        pos = view.advance(pos);
    }
    Ok(None)
}
