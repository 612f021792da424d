// regparse.rs - Pattern parser.
// Recursive descent over the ECMAScript pattern grammar, emitting bytecode
// in a single pass:
//
//   Disjunction → Alternative ('|' Alternative)*
//   Alternative → Term*
//   Term        → Assertion | Atom Quantifier?
//
// A pre-scan counts capturing groups first so that `\N` can be told apart
// from a legacy octal escape before the group it names has been parsed.

use tracing::debug;

use crate::encodings::Utf16View;
use crate::error::RegexError;
use crate::regcomp::*;
use crate::regenc::*;
use crate::regerror::SyntaxErrorKind;
use crate::regint::*;
use crate::regparse_types::*;
use crate::unicode::*;

const PARSE_TARGET: &str = "ecma_regexp::regparse";

type ParseResult<T> = Result<T, SyntaxErrorKind>;

// ============================================================================
// Entry Points
// ============================================================================

/// Compile `pattern` with a flag string such as `"gi"`.
pub fn compile(pattern: &str, flags: &str) -> Result<Program, RegexError> {
    let flags = RegexFlags::parse(flags).map_err(|kind| RegexError::syntax(kind, pattern))?;
    compile_with_flags(pattern, flags)
}

pub fn compile_with_flags(pattern: &str, flags: RegexFlags) -> Result<Program, RegexError> {
    compile_with_depth_limit(pattern, flags, DEFAULT_PARSE_DEPTH_LIMIT)
}

/// Compile with an explicit limit on group nesting.
pub fn compile_with_depth_limit(
    pattern: &str,
    flags: RegexFlags,
    depth_limit: u32,
) -> Result<Program, RegexError> {
    let units = to_utf16(pattern);
    match Parser::new(pattern, &units, flags, depth_limit).parse_program() {
        Ok(program) => {
            debug!(
                target: PARSE_TARGET,
                pattern,
                flags = %flags.to_flag_string(),
                captures = program.capture_count,
                bytes = program.bytecode.len(),
                "compiled pattern"
            );
            Ok(program)
        }
        Err(kind) => {
            debug!(target: PARSE_TARGET, pattern, error = %kind, "pattern rejected");
            Err(RegexError::syntax(kind, pattern))
        }
    }
}

/// The `source` rendering of a pattern: `/` and line terminators escaped,
/// `(?:)` for the empty pattern.
pub fn escape_source(pattern: &str) -> String {
    if pattern.is_empty() {
        return "(?:)".to_string();
    }
    let mut out = String::with_capacity(pattern.len());
    let mut in_class = false;
    let mut escaped = false;
    for c in pattern.chars() {
        if escaped {
            escaped = false;
            match c {
                '\n' => out.push('n'),
                '\r' => out.push('r'),
                '\u{2028}' => out.push_str("u2028"),
                '\u{2029}' => out.push_str("u2029"),
                _ => out.push(c),
            }
            continue;
        }
        match c {
            '\\' => {
                escaped = true;
                out.push(c);
            }
            '[' => {
                in_class = true;
                out.push(c);
            }
            ']' => {
                in_class = false;
                out.push(c);
            }
            '/' if !in_class => out.push_str("\\/"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            _ => out.push(c),
        }
    }
    out
}

// ============================================================================
// Parser State
// ============================================================================

const U_BACKSLASH: u16 = b'\\' as u16;
const U_LBRACKET: u16 = b'[' as u16;
const U_RBRACKET: u16 = b']' as u16;
const U_LPAREN: u16 = b'(' as u16;
const U_QUESTION: u16 = b'?' as u16;
const U_LT: u16 = b'<' as u16;
const U_EQ: u16 = b'=' as u16;
const U_BANG: u16 = b'!' as u16;

/// A `\k<name>` whose index operand is patched once all names are known.
struct NamedRef {
    operand: usize,
    name: String,
}

struct Parser<'a> {
    pattern: &'a str,
    view: Utf16View<'a>,
    pos: usize,
    flags: RegexFlags,
    ignore_case: bool,
    unicode: bool,
    buf: BytecodeBuffer,
    // capturing groups found by the pre-scan
    total_captures: u32,
    has_named_groups: bool,
    next_capture: u32,
    non_capture_count: u32,
    group_names: Vec<Option<String>>,
    named_refs: Vec<NamedRef>,
    max_backref: u32,
    depth: u32,
    depth_limit: u32,
}

impl<'a> Parser<'a> {
    fn new(pattern: &'a str, units: &'a [u16], flags: RegexFlags, depth_limit: u32) -> Self {
        let unicode = flags.unicode();
        Parser {
            pattern,
            view: Utf16View::new(units, unicode),
            pos: 0,
            flags,
            ignore_case: flags.ignore_case(),
            unicode,
            buf: BytecodeBuffer::new(),
            total_captures: 0,
            has_named_groups: false,
            next_capture: 1,
            non_capture_count: 0,
            group_names: vec![None],
            named_refs: Vec::new(),
            max_backref: 0,
            depth: 0,
            depth_limit,
        }
    }

    // --- cursor helpers ---

    #[inline]
    fn unit(&self) -> Option<CodePoint> {
        self.view.unit_at(self.pos)
    }

    #[inline]
    fn unit_is(&self, at: usize, c: char) -> bool {
        self.view.unit_at(at) == Some(c as CodePoint)
    }

    #[inline]
    fn current_is(&self, c: char) -> bool {
        self.unit_is(self.pos, c)
    }

    #[inline]
    fn peek(&self) -> Option<CodePoint> {
        self.view.peek_next(self.pos)
    }

    #[inline]
    fn next(&mut self) -> Option<CodePoint> {
        let (cp, width) = self.view.decode_next(self.pos)?;
        self.pos += width;
        Some(cp)
    }

    #[inline]
    fn eat(&mut self, c: char) -> bool {
        if self.current_is(c) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn looking_at(&self, s: &str) -> bool {
        s.bytes()
            .enumerate()
            .all(|(i, b)| self.view.unit_at(self.pos + i) == Some(b as CodePoint))
    }

    /// Next code point with surrogate pairs combined regardless of mode.
    fn next_code_point(&mut self) -> Option<CodePoint> {
        let first = self.view.unit_at(self.pos)?;
        self.pos += 1;
        if is_lead_surrogate(first) {
            if let Some(second) = self.view.unit_at(self.pos) {
                if is_trail_surrogate(second) {
                    self.pos += 1;
                    return Some(combine_surrogates(first, second));
                }
            }
        }
        Some(first)
    }

    // ========================================================================
    // Pre-scan
    // ========================================================================

    /// Count capturing groups, skipping escaped characters and class bodies.
    fn prescan(&mut self) {
        let units = self.view.units();
        let mut count = 0u32;
        let mut in_class = false;
        let mut i = 0;
        while i < units.len() {
            match units[i] {
                U_BACKSLASH => i += 1,
                U_LBRACKET => in_class = true,
                U_RBRACKET => in_class = false,
                U_LPAREN if !in_class => {
                    if units.get(i + 1) == Some(&U_QUESTION) {
                        if units.get(i + 2) == Some(&U_LT)
                            && !matches!(units.get(i + 3), Some(&U_EQ) | Some(&U_BANG))
                        {
                            count = count.saturating_add(1);
                            self.has_named_groups = true;
                        }
                    } else {
                        count = count.saturating_add(1);
                    }
                }
                _ => {}
            }
            i += 1;
        }
        self.total_captures = count;
    }

    // ========================================================================
    // Program
    // ========================================================================

    fn parse_program(mut self) -> ParseResult<Program> {
        self.prescan();
        if self.total_captures >= MAX_CAPTURE_NUM {
            return Err(SyntaxErrorKind::TooManyCaptures);
        }

        self.parse_disjunction()?;
        if self.pos < self.view.len() {
            // the only thing that stops a top-level disjunction early
            return Err(SyntaxErrorKind::UnmatchedParenthesis);
        }
        if self.max_backref >= self.next_capture {
            return Err(SyntaxErrorKind::InvalidBackreference);
        }

        let capture_count = self.next_capture;
        let header = GroupHeader {
            capturing: true,
            lazy: false,
            group: 0,
            first_capture: 0,
            capture_count,
            min: 1,
            max: 1,
            skip: 0,
        };
        self.wrap_group_at(0, header);
        self.resolve_named_refs()?;
        self.buf.push_op(OpCode::Eof);

        self.group_names.resize(capture_count as usize, None);
        Ok(Program {
            pattern: self.pattern.to_string(),
            source: escape_source(self.pattern),
            flags: self.flags,
            capture_count,
            non_capture_count: self.non_capture_count,
            group_names: self.group_names,
            bytecode: self.buf.into_bytes(),
        })
    }

    fn resolve_named_refs(&mut self) -> ParseResult<()> {
        for r in std::mem::take(&mut self.named_refs) {
            let index = self
                .group_names
                .iter()
                .position(|n| n.as_deref() == Some(r.name.as_str()))
                .ok_or(SyntaxErrorKind::InvalidNamedReference)?;
            self.buf.write_u32_at(r.operand, index as u32);
        }
        Ok(())
    }

    // --- insertion wrappers that keep pending operand offsets valid ---

    fn shift_refs(&mut self, at: usize, inserted: usize) {
        for r in &mut self.named_refs {
            if r.operand >= at {
                r.operand += inserted;
            }
        }
    }

    fn wrap_group_at(&mut self, start: usize, header: GroupHeader) {
        let n = wrap_group(&mut self.buf, start, header);
        self.shift_refs(start, n);
    }

    fn wrap_non_capturing(&mut self, start: usize, first_capture: u32, capture_count: u32, q: Quantifier) {
        let group = self.non_capture_count;
        self.non_capture_count += 1;
        self.wrap_group_at(
            start,
            GroupHeader {
                capturing: false,
                lazy: q.lazy,
                group,
                first_capture,
                capture_count,
                min: q.min,
                max: q.max,
                skip: 0,
            },
        );
    }

    fn enter_group(&mut self) -> ParseResult<()> {
        self.depth += 1;
        if self.depth > self.depth_limit {
            return Err(SyntaxErrorKind::PatternTooDeep);
        }
        Ok(())
    }

    // ========================================================================
    // Disjunction / Alternative / Term
    // ========================================================================

    /// Returns true when the disjunction has more than one alternative.
    fn parse_disjunction(&mut self) -> ParseResult<bool> {
        let start = self.buf.len();
        self.parse_alternative()?;
        if !self.current_is('|') {
            return Ok(false);
        }
        let n = insert_alternative_start(&mut self.buf, start);
        self.shift_refs(start, n);
        while self.eat('|') {
            let header = begin_alternative_next(&mut self.buf);
            self.parse_alternative()?;
            finish_alternative_next(&mut self.buf, header);
        }
        Ok(true)
    }

    fn parse_alternative(&mut self) -> ParseResult<()> {
        while let Some(u) = self.unit() {
            if u == '|' as CodePoint || u == ')' as CodePoint {
                break;
            }
            self.parse_term()?;
        }
        Ok(())
    }

    fn parse_term(&mut self) -> ParseResult<()> {
        let start = self.buf.len();
        let kind = if self.eat('^') {
            self.buf.push_op(OpCode::AssertLineStart);
            AtomKind::Assertion
        } else if self.eat('$') {
            self.buf.push_op(OpCode::AssertLineEnd);
            AtomKind::Assertion
        } else if self.looking_at("\\b") {
            self.pos += 2;
            self.buf.push_op(OpCode::AssertWordBoundary);
            AtomKind::Assertion
        } else if self.looking_at("\\B") {
            self.pos += 2;
            self.buf.push_op(OpCode::AssertNotWordBoundary);
            AtomKind::Assertion
        } else if self.looking_at("(?=") || self.looking_at("(?!") {
            self.parse_lookahead(start)?
        } else {
            self.parse_atom()?
        };
        let quantifier = self.parse_quantifier()?;
        self.finish_term(start, kind, quantifier)
    }

    /// Apply the quantifier (if any) to the body emitted at `start..`.
    fn finish_term(&mut self, start: usize, kind: AtomKind, q: Option<Quantifier>) -> ParseResult<()> {
        match kind {
            AtomKind::Assertion => {
                if q.is_some() {
                    return Err(SyntaxErrorKind::NothingToRepeat);
                }
            }
            AtomKind::Simple => {
                if let Some(q) = q.filter(|q| !q.is_once()) {
                    let n = wrap_iterator(&mut self.buf, start, &q);
                    self.shift_refs(start, n);
                }
            }
            AtomKind::Backreference => {
                if let Some(q) = q.filter(|q| !q.is_once()) {
                    self.wrap_non_capturing(start, 0, 0, q);
                }
            }
            AtomKind::Lookahead {
                first_capture,
                capture_count,
            } => {
                if let Some(q) = q {
                    if self.unicode {
                        return Err(SyntaxErrorKind::NothingToRepeat);
                    }
                    if !q.is_once() {
                        self.wrap_non_capturing(start, first_capture, capture_count, q);
                    }
                }
            }
            AtomKind::Group(info) => self.finish_group(start, info, q),
        }
        Ok(())
    }

    fn finish_group(&mut self, start: usize, info: GroupInfo, q: Option<Quantifier>) {
        let q = q.unwrap_or(Quantifier::ONCE);
        match info.capture {
            Some(index) => self.wrap_group_at(
                start,
                GroupHeader {
                    capturing: true,
                    lazy: q.lazy,
                    group: index,
                    first_capture: info.first_capture,
                    capture_count: info.capture_count,
                    min: q.min,
                    max: q.max,
                    skip: 0,
                },
            ),
            None if q.is_once() && !info.has_alternation => {
                // plain (?:...) is inlined
            }
            None if info.simple_body && !q.is_once() => {
                let n = wrap_iterator(&mut self.buf, start, &q);
                self.shift_refs(start, n);
            }
            None => self.wrap_non_capturing(start, info.first_capture, info.capture_count, q),
        }
    }

    // ========================================================================
    // Quantifiers
    // ========================================================================

    fn parse_quantifier(&mut self) -> ParseResult<Option<Quantifier>> {
        let quantifier = match self.unit().and_then(char::from_u32) {
            Some('*') => {
                self.pos += 1;
                Quantifier::star(self.eat('?'))
            }
            Some('+') => {
                self.pos += 1;
                Quantifier::plus(self.eat('?'))
            }
            Some('?') => {
                self.pos += 1;
                Quantifier::optional(self.eat('?'))
            }
            Some('{') => match self.scan_braced_quantifier() {
                Some((min, max, end)) => {
                    self.pos = end;
                    let lazy = self.eat('?');
                    if min > max {
                        return Err(SyntaxErrorKind::QuantifierOutOfOrder);
                    }
                    Quantifier {
                        min: repeat_bound(min),
                        max: repeat_bound(max),
                        lazy,
                    }
                }
                None if self.unicode => return Err(SyntaxErrorKind::IncompleteQuantifier),
                None => return Ok(None),
            },
            _ => return Ok(None),
        };
        Ok(Some(quantifier))
    }

    /// Scan `{m}`, `{m,}` or `{m,n}` at the cursor without consuming it.
    /// Returns the bounds (`u64::MAX` for unbounded) and the end position.
    fn scan_braced_quantifier(&self) -> Option<(u64, u64, usize)> {
        let (min, mut i) = self.scan_decimal(self.pos + 1)?;
        let max = if self.unit_is(i, ',') {
            i += 1;
            match self.scan_decimal(i) {
                Some((max, j)) => {
                    i = j;
                    max
                }
                None => u64::MAX,
            }
        } else {
            min
        };
        if !self.unit_is(i, '}') {
            return None;
        }
        Some((min, max, i + 1))
    }

    /// Decimal digits at `at`, saturating below `u64::MAX`.
    fn scan_decimal(&self, mut at: usize) -> Option<(u64, usize)> {
        let begin = at;
        let mut value: u64 = 0;
        while let Some(u) = self.view.unit_at(at) {
            if !is_decimal_digit(u) {
                break;
            }
            value = value
                .saturating_mul(10)
                .saturating_add((u - '0' as CodePoint) as u64)
                .min(u64::MAX - 1);
            at += 1;
        }
        (at > begin).then_some((value, at))
    }

    // ========================================================================
    // Atoms
    // ========================================================================

    fn emit_literal(&mut self, cp: CodePoint) {
        let cp = if self.ignore_case {
            canonicalize(cp, self.unicode)
        } else {
            cp
        };
        emit_char(&mut self.buf, cp);
    }

    fn parse_atom(&mut self) -> ParseResult<AtomKind> {
        let Some(cp) = self.peek() else {
            return Err(SyntaxErrorKind::NothingToRepeat);
        };
        match char::from_u32(cp) {
            Some('.') => {
                self.pos += 1;
                self.buf.push_op(OpCode::Period);
                Ok(AtomKind::Simple)
            }
            Some('(') => self.parse_group(),
            Some('[') => {
                self.pos += 1;
                self.parse_class()?;
                Ok(AtomKind::Simple)
            }
            Some('\\') => self.parse_atom_escape(),
            Some('*' | '+' | '?') => Err(SyntaxErrorKind::NothingToRepeat),
            Some('{') => {
                if self.scan_braced_quantifier().is_some() {
                    Err(SyntaxErrorKind::NothingToRepeat)
                } else if self.unicode {
                    Err(SyntaxErrorKind::LoneQuantifierBracket)
                } else {
                    self.pos += 1;
                    self.emit_literal(cp);
                    Ok(AtomKind::Simple)
                }
            }
            Some('}' | ']') if self.unicode => Err(SyntaxErrorKind::LoneQuantifierBracket),
            _ => {
                self.next();
                self.emit_literal(cp);
                Ok(AtomKind::Simple)
            }
        }
    }

    fn parse_group(&mut self) -> ParseResult<AtomKind> {
        self.pos += 1;
        let mut name = None;
        let capturing = if self.eat('?') {
            if self.eat(':') {
                false
            } else if self.current_is('<') {
                if self.unit_is(self.pos + 1, '=') || self.unit_is(self.pos + 1, '!') {
                    // lookbehind
                    return Err(SyntaxErrorKind::InvalidGroup);
                }
                self.pos += 1;
                name = Some(self.parse_group_name(SyntaxErrorKind::InvalidCaptureGroupName)?);
                true
            } else {
                return Err(SyntaxErrorKind::InvalidGroup);
            }
        } else {
            true
        };

        self.enter_group()?;
        let first_capture = self.next_capture;
        let capture = if capturing {
            let index = self.next_capture;
            self.next_capture += 1;
            if let Some(name) = name {
                if self.group_names.iter().any(|n| n.as_deref() == Some(name.as_str())) {
                    return Err(SyntaxErrorKind::DuplicateCaptureGroupName);
                }
                self.group_names.resize(index as usize + 1, None);
                self.group_names[index as usize] = Some(name);
            }
            Some(index)
        } else {
            None
        };

        let body = self.buf.len();
        let has_alternation = self.parse_disjunction()?;
        if !self.eat(')') {
            return Err(SyntaxErrorKind::UnterminatedGroup);
        }
        self.depth -= 1;

        Ok(AtomKind::Group(GroupInfo {
            capture,
            first_capture,
            capture_count: self.next_capture - first_capture,
            has_alternation,
            simple_body: capture.is_none()
                && !has_alternation
                && is_single_simple_atom(&self.buf, body),
        }))
    }

    fn parse_lookahead(&mut self, start: usize) -> ParseResult<AtomKind> {
        let negative = self.unit_is(self.pos + 2, '!');
        self.pos += 3;
        self.enter_group()?;
        let first_capture = self.next_capture;
        self.parse_disjunction()?;
        if !self.eat(')') {
            return Err(SyntaxErrorKind::UnterminatedGroup);
        }
        self.depth -= 1;
        let n = wrap_lookahead(&mut self.buf, start, negative);
        self.shift_refs(start, n);
        Ok(AtomKind::Lookahead {
            first_capture,
            capture_count: self.next_capture - first_capture,
        })
    }

    /// Group name after `<`, through the closing `>`.
    fn parse_group_name(&mut self, error: SyntaxErrorKind) -> ParseResult<String> {
        let mut name = String::new();
        loop {
            let cp = match self.next_code_point() {
                None => return Err(error),
                Some(c) if c == '>' as CodePoint => break,
                Some(c) if c == '\\' as CodePoint => {
                    if !self.eat('u') {
                        return Err(error);
                    }
                    self.parse_name_unicode_escape().ok_or(error)?
                }
                Some(c) => c,
            };
            let valid = if name.is_empty() {
                is_id_start(cp)
            } else {
                is_id_continue(cp)
            };
            match char::from_u32(cp) {
                Some(c) if valid => name.push(c),
                _ => return Err(error),
            }
        }
        if name.is_empty() {
            return Err(error);
        }
        Ok(name)
    }

    /// `\u` escape inside a group name; braces are accepted in every mode.
    fn parse_name_unicode_escape(&mut self) -> Option<CodePoint> {
        if self.eat('{') {
            let (v, end) = self.scan_hex_braced(self.pos)?;
            self.pos = end;
            return Some(v);
        }
        let v = self.scan_hex_fixed(4)?;
        if is_lead_surrogate(v) && self.looking_at("\\u") {
            let save = self.pos;
            self.pos += 2;
            match self.scan_hex_fixed(4) {
                Some(t) if is_trail_surrogate(t) => return Some(combine_surrogates(v, t)),
                _ => self.pos = save,
            }
        }
        Some(v)
    }

    // ========================================================================
    // Escapes
    // ========================================================================

    fn parse_atom_escape(&mut self) -> ParseResult<AtomKind> {
        self.pos += 1;
        let Some(c) = self.peek() else {
            return Err(SyntaxErrorKind::EscapeAtEndOfPattern);
        };
        if let Some(mask) = ClassEscapes::from_letter(c) {
            self.pos += 1;
            emit_class_escape(&mut self.buf, mask);
            return Ok(AtomKind::Simple);
        }
        match char::from_u32(c) {
            Some('1'..='9') => {
                let save = self.pos;
                let (n, end) = self.scan_decimal(self.pos).unwrap_or((0, self.pos));
                if self.unicode || n <= self.total_captures as u64 {
                    self.pos = end;
                    let index = n.min(MAX_CAPTURE_NUM as u64) as u32;
                    self.max_backref = self.max_backref.max(index);
                    emit_backreference(&mut self.buf, index);
                    return Ok(AtomKind::Backreference);
                }
                self.pos = save;
                let cp = self.parse_legacy_octal();
                self.emit_literal(cp);
                Ok(AtomKind::Simple)
            }
            Some('0') if self.view.unit_at(self.pos + 1).is_some_and(is_decimal_digit) => {
                if self.unicode {
                    return Err(SyntaxErrorKind::InvalidDecimalEscape);
                }
                let cp = self.parse_legacy_octal();
                self.emit_literal(cp);
                Ok(AtomKind::Simple)
            }
            Some('k') if self.unicode || self.has_named_groups => {
                self.pos += 1;
                if !self.eat('<') {
                    return Err(SyntaxErrorKind::InvalidNamedReference);
                }
                let name = self.parse_group_name(SyntaxErrorKind::InvalidNamedReference)?;
                let operand = emit_backreference(&mut self.buf, 0);
                self.named_refs.push(NamedRef { operand, name });
                Ok(AtomKind::Backreference)
            }
            _ => {
                let cp = self.parse_character_escape(false)?;
                self.emit_literal(cp);
                Ok(AtomKind::Simple)
            }
        }
    }

    /// Annex B octal escape at the cursor; `\8` and `\9` are identity escapes.
    fn parse_legacy_octal(&mut self) -> CodePoint {
        let Some(first) = self.unit() else {
            return 0;
        };
        self.pos += 1;
        if first == '8' as CodePoint || first == '9' as CodePoint {
            return first;
        }
        let mut value = first - '0' as CodePoint;
        let max_digits = if first <= '3' as CodePoint { 3 } else { 2 };
        for _ in 1..max_digits {
            match self.unit() {
                Some(d) if ('0' as CodePoint..='7' as CodePoint).contains(&d) => {
                    value = value * 8 + (d - '0' as CodePoint);
                    self.pos += 1;
                }
                _ => break,
            }
        }
        value
    }

    /// Character escape after the backslash, shared by atoms and classes.
    fn parse_character_escape(&mut self, in_class: bool) -> ParseResult<CodePoint> {
        let Some(c) = self.peek() else {
            return Err(SyntaxErrorKind::EscapeAtEndOfPattern);
        };
        let control = match char::from_u32(c) {
            Some('t') => Some(0x09),
            Some('n') => Some(0x0A),
            Some('v') => Some(0x0B),
            Some('f') => Some(0x0C),
            Some('r') => Some(0x0D),
            Some('0') => Some(0x00),
            _ => None,
        };
        if let Some(v) = control {
            self.pos += 1;
            return Ok(v);
        }
        match char::from_u32(c) {
            Some('c') => {
                let letter = self.view.unit_at(self.pos + 1).and_then(char::from_u32);
                match letter {
                    Some(l) if l.is_ascii_alphabetic() => {
                        self.pos += 2;
                        Ok(l as CodePoint % 32)
                    }
                    Some(l) if in_class && !self.unicode && (l.is_ascii_digit() || l == '_') => {
                        self.pos += 2;
                        Ok(l as CodePoint % 32)
                    }
                    _ if self.unicode => Err(SyntaxErrorKind::InvalidEscape),
                    // the backslash stands for itself and `c` is parsed next
                    _ => Ok('\\' as CodePoint),
                }
            }
            Some('x') => {
                self.pos += 1;
                match self.scan_hex_fixed(2) {
                    Some(v) => Ok(v),
                    None if self.unicode => Err(SyntaxErrorKind::InvalidEscape),
                    None => Ok('x' as CodePoint),
                }
            }
            Some('u') => {
                self.pos += 1;
                match self.parse_unicode_escape()? {
                    Some(v) => Ok(v),
                    None => Ok('u' as CodePoint),
                }
            }
            _ => {
                self.next();
                if !self.unicode
                    || is_syntax_char(c)
                    || c == '/' as CodePoint
                    || (in_class && c == '-' as CodePoint)
                {
                    Ok(c)
                } else {
                    Err(SyntaxErrorKind::InvalidEscape)
                }
            }
        }
    }

    /// Body of a `\u` escape. `None` means "not an escape" (legacy identity).
    fn parse_unicode_escape(&mut self) -> ParseResult<Option<CodePoint>> {
        if self.unicode && self.current_is('{') {
            let (v, end) = self
                .scan_hex_braced(self.pos + 1)
                .ok_or(SyntaxErrorKind::InvalidUnicodeEscape)?;
            self.pos = end;
            return Ok(Some(v));
        }
        let Some(v) = self.scan_hex_fixed(4) else {
            if self.unicode {
                return Err(SyntaxErrorKind::InvalidUnicodeEscape);
            }
            return Ok(None);
        };
        if self.unicode && is_lead_surrogate(v) && self.looking_at("\\u") {
            let save = self.pos;
            self.pos += 2;
            match self.scan_hex_fixed(4) {
                Some(t) if is_trail_surrogate(t) => return Ok(Some(combine_surrogates(v, t))),
                _ => self.pos = save,
            }
        }
        Ok(Some(v))
    }

    /// Exactly `n` hex digits at the cursor; consumed only on success.
    fn scan_hex_fixed(&mut self, n: usize) -> Option<CodePoint> {
        let mut value = 0;
        for i in 0..n {
            let d = self.view.unit_at(self.pos + i).and_then(hex_value)?;
            value = value * 16 + d;
        }
        self.pos += n;
        Some(value)
    }

    /// `H...}` starting at `at`, at most U+10FFFF. Returns value and end.
    fn scan_hex_braced(&self, mut at: usize) -> Option<(CodePoint, usize)> {
        let begin = at;
        let mut value: CodePoint = 0;
        while let Some(d) = self.view.unit_at(at).and_then(hex_value) {
            value = value * 16 + d;
            if value > MAX_CODE_POINT {
                return None;
            }
            at += 1;
        }
        if at == begin || !self.unit_is(at, '}') {
            return None;
        }
        Some((value, at + 1))
    }

    // ========================================================================
    // Character Classes
    // ========================================================================

    fn parse_class(&mut self) -> ParseResult<()> {
        let mut set = ClassSet {
            inverted: self.eat('^'),
            ..ClassSet::default()
        };
        loop {
            match self.unit() {
                None => return Err(SyntaxErrorKind::UnterminatedCharacterClass),
                Some(u) if u == ']' as CodePoint => {
                    self.pos += 1;
                    break;
                }
                Some(_) => {}
            }
            let first = self.parse_class_atom()?;
            let forms_range = self.current_is('-')
                && self.view.unit_at(self.pos + 1).is_some()
                && !self.unit_is(self.pos + 1, ']');
            if !forms_range {
                set.add_atom(first, self.ignore_case, self.unicode);
                continue;
            }
            self.pos += 1;
            let second = self.parse_class_atom()?;
            match (first, second) {
                (ClassAtom::Char(lo), ClassAtom::Char(hi)) => {
                    if lo > hi {
                        return Err(SyntaxErrorKind::ClassRangeOutOfOrder);
                    }
                    set.add_range(lo, hi);
                }
                _ if self.unicode => return Err(SyntaxErrorKind::InvalidClassRange),
                _ => {
                    set.add_atom(first, self.ignore_case, self.unicode);
                    set.add_char('-' as CodePoint, self.ignore_case, self.unicode);
                    set.add_atom(second, self.ignore_case, self.unicode);
                }
            }
        }
        emit_char_class(&mut self.buf, &set);
        Ok(())
    }

    fn parse_class_atom(&mut self) -> ParseResult<ClassAtom> {
        let Some(c) = self.next() else {
            return Err(SyntaxErrorKind::UnterminatedCharacterClass);
        };
        if c != '\\' as CodePoint {
            return Ok(ClassAtom::Char(c));
        }
        let Some(e) = self.peek() else {
            return Err(SyntaxErrorKind::EscapeAtEndOfPattern);
        };
        if let Some(mask) = ClassEscapes::from_letter(e) {
            self.pos += 1;
            return Ok(ClassAtom::Escape(mask));
        }
        match char::from_u32(e) {
            Some('b') => {
                self.pos += 1;
                Ok(ClassAtom::Char(0x08))
            }
            Some('0'..='9') if self.unicode => {
                let next_is_digit = self.view.unit_at(self.pos + 1).is_some_and(is_decimal_digit);
                if e == '0' as CodePoint && !next_is_digit {
                    self.pos += 1;
                    Ok(ClassAtom::Char(0))
                } else {
                    Err(SyntaxErrorKind::InvalidClassEscape)
                }
            }
            Some('0'..='9') => Ok(ClassAtom::Char(self.parse_legacy_octal())),
            _ => Ok(ClassAtom::Char(self.parse_character_escape(true)?)),
        }
    }
}

/// Clamp a parsed repeat bound into the bytecode's u32 range.
fn repeat_bound(v: u64) -> u32 {
    if v == u64::MAX {
        INFINITE_REPEAT
    } else {
        v.min(INFINITE_REPEAT as u64 - 1) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kind_of(pattern: &str, flags: &str) -> SyntaxErrorKind {
        compile(pattern, flags)
            .unwrap_err()
            .syntax_kind()
            .expect("syntax error")
    }

    #[test]
    fn compile_is_deterministic() {
        let a = compile("(a|b)*c{2,3}?[x-z\\d]\\1", "i").unwrap();
        let b = compile("(a|b)*c{2,3}?[x-z\\d]\\1", "i").unwrap();
        assert_eq!(a.bytecode(), b.bytecode());
    }

    #[test]
    fn program_metadata() {
        let p = compile("(a)(?:b)(?<year>c)*", "gu").unwrap();
        assert_eq!(p.capture_count(), 3);
        assert_eq!(p.non_capture_count(), 0);
        assert_eq!(p.group_index("year"), Some(2));
        assert!(p.has_named_groups());
        assert_eq!(p.flag_string(), "gu");
    }

    #[test]
    fn quantified_non_capturing_group_gets_a_record() {
        let p = compile("(?:ab)*(?:a|b)", "").unwrap();
        assert_eq!(p.non_capture_count(), 2);
        // a single-atom body uses the simple iterator instead
        let p = compile("(?:a)*", "").unwrap();
        assert_eq!(p.non_capture_count(), 0);
    }

    #[test]
    fn quantifier_shapes_reach_the_iterator() {
        let iterator = |pattern: &str| {
            let p = compile(pattern, "").unwrap();
            let bc = p.bytecode();
            let at = OPSIZE_GROUP_START;
            (bc[at], read_u32(bc, at + 1), read_u32(bc, at + 1 + OPSIZE_U32))
        };
        let greedy = OpCode::GreedyIterator as u8;
        let lazy = OpCode::LazyIterator as u8;
        assert_eq!(iterator("a*"), (greedy, 0, INFINITE_REPEAT));
        assert_eq!(iterator("a+?"), (lazy, 1, INFINITE_REPEAT));
        assert_eq!(iterator("a??"), (lazy, 0, 1));
        assert_eq!(iterator("a{2,3}?"), (lazy, 2, 3));
        assert_eq!(kind_of("a{3,2}?", ""), SyntaxErrorKind::QuantifierOutOfOrder);
    }

    #[test]
    fn program_starts_with_group_zero() {
        let p = compile("a", "").unwrap();
        let bc = p.bytecode();
        assert_eq!(bc[0], OpCode::GroupStart as u8);
        let h = GroupHeader::decode(bc, 1);
        assert!(h.capturing);
        assert_eq!(h.group, 0);
        assert_eq!(*bc.last().unwrap(), OpCode::Eof as u8);
    }

    #[test]
    fn syntax_errors() {
        assert_eq!(kind_of("(a", ""), SyntaxErrorKind::UnterminatedGroup);
        assert_eq!(kind_of("a)", ""), SyntaxErrorKind::UnmatchedParenthesis);
        assert_eq!(kind_of("[a", ""), SyntaxErrorKind::UnterminatedCharacterClass);
        assert_eq!(kind_of("*a", ""), SyntaxErrorKind::NothingToRepeat);
        assert_eq!(kind_of("a**", ""), SyntaxErrorKind::NothingToRepeat);
        assert_eq!(kind_of("^*", ""), SyntaxErrorKind::NothingToRepeat);
        assert_eq!(kind_of("a{3,2}", ""), SyntaxErrorKind::QuantifierOutOfOrder);
        assert_eq!(kind_of("[z-a]", ""), SyntaxErrorKind::ClassRangeOutOfOrder);
        assert_eq!(kind_of("a\\", ""), SyntaxErrorKind::EscapeAtEndOfPattern);
        assert_eq!(kind_of("(?<=a)b", ""), SyntaxErrorKind::InvalidGroup);
        assert_eq!(kind_of("(?x)", ""), SyntaxErrorKind::InvalidGroup);
        assert_eq!(kind_of("a", "gg"), SyntaxErrorKind::InvalidFlags);
        assert_eq!(kind_of("a", "q"), SyntaxErrorKind::InvalidFlags);
    }

    #[test]
    fn unicode_mode_is_strict() {
        assert_eq!(kind_of("\\1", "u"), SyntaxErrorKind::InvalidBackreference);
        assert_eq!(kind_of("(a)\\2", "u"), SyntaxErrorKind::InvalidBackreference);
        assert_eq!(kind_of("a{", "u"), SyntaxErrorKind::IncompleteQuantifier);
        assert_eq!(kind_of("{", "u"), SyntaxErrorKind::LoneQuantifierBracket);
        assert_eq!(kind_of("]", "u"), SyntaxErrorKind::LoneQuantifierBracket);
        assert_eq!(kind_of("\\q", "u"), SyntaxErrorKind::InvalidEscape);
        assert_eq!(kind_of("[\\d-z]", "u"), SyntaxErrorKind::InvalidClassRange);
        assert_eq!(kind_of("\\u{110000}", "u"), SyntaxErrorKind::InvalidUnicodeEscape);
        assert_eq!(kind_of("(?=a)*", "u"), SyntaxErrorKind::NothingToRepeat);
        assert_eq!(kind_of("\\00", "u"), SyntaxErrorKind::InvalidDecimalEscape);
    }

    #[test]
    fn legacy_mode_is_lenient() {
        for pattern in ["\\1", "a{", "a{,5}", "}", "]", "\\q", "[\\d-z]", "(?=a)*", "\\c", "\\u{41}"] {
            assert!(compile(pattern, "").is_ok(), "{pattern}");
        }
    }

    #[test]
    fn named_groups() {
        assert!(compile("(?<a>x)\\k<a>", "").is_ok());
        assert!(compile("\\k<a>(?<a>x)", "").is_ok());
        assert_eq!(kind_of("(?<a>x)(?<a>y)", ""), SyntaxErrorKind::DuplicateCaptureGroupName);
        assert_eq!(kind_of("(?<a>x)\\k<b>", ""), SyntaxErrorKind::InvalidNamedReference);
        assert_eq!(kind_of("(?<1a>x)", ""), SyntaxErrorKind::InvalidCaptureGroupName);
        assert_eq!(kind_of("(?<>x)", ""), SyntaxErrorKind::InvalidCaptureGroupName);
        // without named groups \k is an identity escape
        assert!(compile("\\k", "").is_ok());
        assert_eq!(kind_of("\\k", "u"), SyntaxErrorKind::InvalidNamedReference);
    }

    #[test]
    fn named_reference_survives_later_insertions() {
        let p = compile("(?:\\k<n>|x)(?<n>y)", "").unwrap();
        let dump = p.dump();
        assert!(dump.contains("Backreference 1"), "{dump}");
    }

    #[test]
    fn prescan_ignores_escaped_and_class_parens() {
        let p = compile("\\((a)[(]", "").unwrap();
        assert_eq!(p.capture_count(), 2);
        // \2 exceeds the group count and is an octal escape
        let p = compile("(a)\\2", "").unwrap();
        assert!(p.dump().contains("Char U+0002"));
    }

    #[test]
    fn parse_depth_limit() {
        let deep = "(".repeat(40) + &")".repeat(40);
        assert!(compile_with_depth_limit(&deep, RegexFlags::empty(), 64).is_ok());
        let err = compile_with_depth_limit(&deep, RegexFlags::empty(), 16).unwrap_err();
        assert_eq!(err.syntax_kind(), Some(SyntaxErrorKind::PatternTooDeep));
    }

    #[test]
    fn source_escaping() {
        assert_eq!(escape_source(""), "(?:)");
        assert_eq!(escape_source("a/b"), "a\\/b");
        assert_eq!(escape_source("a\\/b"), "a\\/b");
        assert_eq!(escape_source("[/]"), "[/]");
        assert_eq!(escape_source("a\nb"), "a\\nb");
    }

    #[test]
    fn ignore_case_literals_are_canonicalized() {
        let p = compile("a", "i").unwrap();
        assert!(p.dump().contains("Char 'A'"));
        let p = compile("A", "iu").unwrap();
        assert!(p.dump().contains("Char 'a'"));
    }
}
