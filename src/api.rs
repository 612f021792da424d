// api.rs - Host-facing API.
//
// Engine (owns the pattern cache and configuration), RegExp (a compiled
// program plus lastIndex), MatchResult and the exec helper that drives the
// matcher with global/sticky lastIndex bookkeeping.

use std::ops::Range;
use std::rc::Rc;

use tracing::trace;

use crate::config::{EngineConfig, MatchLimits};
use crate::encodings::Utf16View;
use crate::error::RegexError;
use crate::regcache::PatternCache;
use crate::regenc::{from_utf16, to_utf16};
use crate::regexec::{search, CaptureSpans};
use crate::regint::{Program, RegexFlags};
use crate::regparse::compile_with_depth_limit;
use crate::replace::{replace, RegExpObject, Replacement};

const API_TARGET: &str = "ecma_regexp::api";

// === Engine ===

/// Owns the pattern cache and the limits handed to every RegExp it creates.
///
/// # Examples
///
/// ```
/// use ecma_regexp::api::Engine;
///
/// let mut engine = Engine::new();
/// let mut re = engine.regexp(r"(\d+)-(\d+)", "g").unwrap();
/// let m = re.exec("pages 10-12").unwrap().unwrap();
/// assert_eq!(m.get(0), Some("10-12"));
/// assert_eq!(m.index(), 6);
/// assert_eq!(re.last_index(), 11);
/// ```
#[derive(Debug)]
pub struct Engine {
    cache: PatternCache,
    config: EngineConfig,
}

impl Engine {
    pub fn new() -> Self {
        Engine::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Engine {
            cache: PatternCache::new(config.cache_capacity),
            config,
        }
    }

    /// Create an [`EngineBuilder`] for fine-grained configuration.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn cache(&self) -> &PatternCache {
        &self.cache
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    /// Compile through the cache. Equal (pattern, flags) pairs share one program.
    pub fn compile(&mut self, pattern: &str, flags: &str) -> Result<Rc<Program>, RegexError> {
        let flags = RegexFlags::parse(flags).map_err(|kind| RegexError::syntax(kind, pattern))?;
        self.compile_with_flags(pattern, flags)
    }

    pub fn compile_with_flags(
        &mut self,
        pattern: &str,
        flags: RegexFlags,
    ) -> Result<Rc<Program>, RegexError> {
        self.cache
            .get_or_compile(pattern, flags, self.config.parse_depth_limit)
    }

    /// A fresh RegExp (lastIndex 0) over the cached program.
    pub fn regexp(&mut self, pattern: &str, flags: &str) -> Result<RegExp, RegexError> {
        let program = self.compile(pattern, flags)?;
        Ok(RegExp::from_program(program, self.config.limits))
    }
}

impl Default for Engine {
    fn default() -> Self {
        Engine::new()
    }
}

// === EngineBuilder ===

/// Builder for an [`Engine`].
///
/// ```
/// use ecma_regexp::api::Engine;
///
/// let engine = Engine::builder()
///     .cache_capacity(16)
///     .step_limit(1_000_000)
///     .build();
/// assert_eq!(engine.cache().capacity(), 16);
/// ```
#[derive(Clone, Debug, Default)]
pub struct EngineBuilder {
    config: EngineConfig,
}

impl EngineBuilder {
    pub fn new() -> Self {
        EngineBuilder::default()
    }

    /// Number of programs kept by the cache. Zero disables caching.
    pub fn cache_capacity(mut self, capacity: usize) -> Self {
        self.config.cache_capacity = capacity;
        self
    }

    /// Maximum backtracking recursion depth. Zero disables the limit.
    pub fn depth_limit(mut self, depth: u32) -> Self {
        self.config.limits.depth = depth;
        self
    }

    /// Maximum matcher steps per start position. Zero disables the limit.
    pub fn step_limit(mut self, steps: u64) -> Self {
        self.config.limits.steps = steps;
        self
    }

    /// Maximum group nesting accepted by the parser.
    pub fn parse_depth_limit(mut self, depth: u32) -> Self {
        self.config.parse_depth_limit = depth;
        self
    }

    pub fn limits(mut self, limits: MatchLimits) -> Self {
        self.config.limits = limits;
        self
    }

    pub fn build(self) -> Engine {
        Engine::with_config(self.config)
    }
}

// === RegExp ===

/// A compiled pattern with its `lastIndex` cursor.
///
/// # Examples
///
/// ```
/// use ecma_regexp::api::RegExp;
///
/// let mut re = RegExp::new(r"^\d+$", "").unwrap();
/// assert!(re.test("123").unwrap());
/// assert!(!re.test("12a").unwrap());
/// ```
#[derive(Clone, Debug)]
pub struct RegExp {
    program: Rc<Program>,
    last_index: usize,
    limits: MatchLimits,
}

impl RegExp {
    /// Compile without a cache, using default limits.
    pub fn new(pattern: &str, flags: &str) -> Result<RegExp, RegexError> {
        let flags = RegexFlags::parse(flags).map_err(|kind| RegexError::syntax(kind, pattern))?;
        RegExp::builder(pattern).flags(flags).build()
    }

    pub fn builder(pattern: &str) -> RegExpBuilder {
        RegExpBuilder::new(pattern)
    }

    pub fn from_program(program: Rc<Program>, limits: MatchLimits) -> Self {
        RegExp {
            program,
            last_index: 0,
            limits,
        }
    }

    pub fn program(&self) -> &Rc<Program> {
        &self.program
    }

    pub fn source(&self) -> &str {
        self.program.source()
    }

    /// The flag string in canonical order, e.g. `"gimsuy"`.
    pub fn flags(&self) -> String {
        self.program.flag_string()
    }

    pub fn flag_bits(&self) -> RegexFlags {
        self.program.flags()
    }

    pub fn global(&self) -> bool {
        self.program.flags().contains(RegexFlags::GLOBAL)
    }

    pub fn sticky(&self) -> bool {
        self.program.flags().contains(RegexFlags::STICKY)
    }

    pub fn unicode(&self) -> bool {
        self.program.flags().unicode()
    }

    pub fn last_index(&self) -> usize {
        self.last_index
    }

    pub fn set_last_index(&mut self, last_index: usize) {
        self.last_index = last_index;
    }

    pub fn limits(&self) -> MatchLimits {
        self.limits
    }

    /// Run the pattern against `input`, updating lastIndex when global or
    /// sticky. `Ok(None)` is a non-match.
    pub fn exec(&mut self, input: &str) -> Result<Option<MatchResult>, RegexError> {
        let units = to_utf16(input);
        self.exec_with(&units, || (Rc::from(units.as_slice()), Rc::from(input)))
    }

    /// `exec` over UTF-16 code units, which may hold lone surrogates.
    /// [`MatchResult::get_utf16`] returns the captured units unchanged.
    pub fn exec_utf16(&mut self, input: &[u16]) -> Result<Option<MatchResult>, RegexError> {
        self.exec_with(input, || (Rc::from(input), Rc::from(from_utf16(input))))
    }

    pub fn test(&mut self, input: &str) -> Result<bool, RegexError> {
        let units = to_utf16(input);
        Ok(self.exec_spans(&units)?.is_some())
    }

    /// Replace matches in `input`; every match when global, else the first.
    ///
    /// ```
    /// use ecma_regexp::api::RegExp;
    /// use ecma_regexp::replace::Replacement;
    ///
    /// let mut re = RegExp::new(r"(\w+)@(\w+)", "g").unwrap();
    /// let out = re.replace("a@b c@d", Replacement::Template("$2@$1")).unwrap();
    /// assert_eq!(out, "b@a d@c");
    /// ```
    pub fn replace(&mut self, input: &str, replacement: Replacement<'_>) -> Result<String, RegexError> {
        replace(self, input, replacement)
    }

    /// Iterate over every match of a global RegExp from position 0.
    /// The receiver's own lastIndex is left alone.
    pub fn match_all(&self, input: &str) -> Result<MatchAll, RegexError> {
        if !self.global() {
            return Err(RegexError::type_error("matchAll requires a global RegExp"));
        }
        let mut regexp = self.clone();
        regexp.last_index = 0;
        Ok(MatchAll {
            regexp,
            units: Rc::from(to_utf16(input)),
            input: Rc::from(input),
            done: false,
        })
    }

    fn exec_with(
        &mut self,
        units: &[u16],
        shared: impl FnOnce() -> (Rc<[u16]>, Rc<str>),
    ) -> Result<Option<MatchResult>, RegexError> {
        Ok(self.exec_spans(units)?.map(|spans| {
            let (units, input) = shared();
            MatchResult::from_spans(spans, units, input, Rc::clone(&self.program))
        }))
    }

    /// The exec helper: pick the start from lastIndex, search, write lastIndex back.
    /// A fatal error leaves lastIndex untouched.
    pub(crate) fn exec_spans(&mut self, units: &[u16]) -> Result<Option<CaptureSpans>, RegexError> {
        let uses_last_index = self.program.flags().uses_last_index();
        let start = if uses_last_index { self.last_index } else { 0 };
        trace!(target: API_TARGET, pattern = self.program.pattern(), start, "exec");
        if start > units.len() {
            if uses_last_index {
                self.last_index = 0;
            }
            return Ok(None);
        }
        let found = search(&self.program, units, start, self.limits)?;
        if uses_last_index {
            self.last_index = match &found {
                Some(spans) => spans[0].as_ref().map_or(start, |r| r.end),
                None => 0,
            };
        }
        Ok(found)
    }
}

impl RegExpObject for RegExp {
    fn program(&self) -> &Rc<Program> {
        &self.program
    }

    fn limits(&self) -> MatchLimits {
        self.limits
    }

    fn last_index(&self) -> usize {
        self.last_index
    }

    fn set_last_index(&mut self, value: usize) -> Result<(), RegexError> {
        self.last_index = value;
        Ok(())
    }

    fn exec(&mut self, input: &str) -> Result<Option<MatchResult>, RegexError> {
        RegExp::exec(self, input)
    }
}

// === RegExpBuilder ===

/// Builder for compiling a [`RegExp`] with individual flags and limits.
///
/// ```
/// use ecma_regexp::api::RegExp;
///
/// let mut re = RegExp::builder("hello world")
///     .ignore_case(true)
///     .build()
///     .unwrap();
/// assert!(re.test("Hello World").unwrap());
/// ```
#[derive(Clone, Debug)]
pub struct RegExpBuilder {
    pattern: String,
    flags: RegexFlags,
    limits: MatchLimits,
    parse_depth_limit: u32,
}

impl RegExpBuilder {
    pub fn new(pattern: &str) -> Self {
        let config = EngineConfig::default();
        RegExpBuilder {
            pattern: pattern.to_string(),
            flags: RegexFlags::empty(),
            limits: config.limits,
            parse_depth_limit: config.parse_depth_limit,
        }
    }

    fn flag(mut self, flag: RegexFlags, yes: bool) -> Self {
        self.flags.set(flag, yes);
        self
    }

    pub fn global(self, yes: bool) -> Self {
        self.flag(RegexFlags::GLOBAL, yes)
    }

    pub fn ignore_case(self, yes: bool) -> Self {
        self.flag(RegexFlags::IGNORE_CASE, yes)
    }

    /// `^` and `$` match at line terminators.
    pub fn multiline(self, yes: bool) -> Self {
        self.flag(RegexFlags::MULTILINE, yes)
    }

    /// `.` matches line terminators.
    pub fn dot_all(self, yes: bool) -> Self {
        self.flag(RegexFlags::DOT_ALL, yes)
    }

    pub fn unicode(self, yes: bool) -> Self {
        self.flag(RegexFlags::UNICODE, yes)
    }

    pub fn sticky(self, yes: bool) -> Self {
        self.flag(RegexFlags::STICKY, yes)
    }

    /// Replace all flags at once.
    pub fn flags(mut self, flags: RegexFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn limits(mut self, limits: MatchLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn parse_depth_limit(mut self, depth: u32) -> Self {
        self.parse_depth_limit = depth;
        self
    }

    pub fn build(self) -> Result<RegExp, RegexError> {
        let program = compile_with_depth_limit(&self.pattern, self.flags, self.parse_depth_limit)?;
        Ok(RegExp::from_program(Rc::new(program), self.limits))
    }
}

// === MatchResult ===

/// A successful match: capture strings and spans, the match index and the input.
///
/// Spans are UTF-16 code-unit offsets into the input. The string accessors
/// decode lossily, so a lone surrogate reads as U+FFFD; the `_utf16`
/// accessors return the exact code units.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MatchResult {
    spans: CaptureSpans,
    captures: Vec<Option<String>>,
    units: Rc<[u16]>,
    input: Rc<str>,
    program: Rc<Program>,
}

impl MatchResult {
    pub(crate) fn from_spans(
        spans: CaptureSpans,
        units: Rc<[u16]>,
        input: Rc<str>,
        program: Rc<Program>,
    ) -> Self {
        let captures = spans
            .iter()
            .map(|span| span.as_ref().map(|r| from_utf16(&units[r.clone()])))
            .collect();
        MatchResult {
            spans,
            captures,
            units,
            input,
            program,
        }
    }

    /// Start of the match.
    pub fn index(&self) -> usize {
        self.spans[0].as_ref().map_or(0, |r| r.start)
    }

    /// End of the match (exclusive).
    pub fn end(&self) -> usize {
        self.spans[0].as_ref().map_or(0, |r| r.end)
    }

    /// Text of group `i`, or `None` if it did not participate.
    pub fn get(&self, i: usize) -> Option<&str> {
        self.captures.get(i)?.as_deref()
    }

    /// Code units of group `i`, lone surrogates included.
    pub fn get_utf16(&self, i: usize) -> Option<&[u16]> {
        let span = self.spans.get(i)?.clone()?;
        self.units.get(span)
    }

    pub fn span(&self, i: usize) -> Option<Range<usize>> {
        self.spans.get(i)?.clone()
    }

    /// The whole match.
    pub fn as_str(&self) -> &str {
        self.get(0).unwrap_or("")
    }

    /// Text of the group called `name`.
    pub fn name(&self, name: &str) -> Option<&str> {
        self.get(self.program.group_index(name)?)
    }

    /// Named groups in pattern order, or `None` if the pattern has none.
    pub fn groups(&self) -> Option<Vec<(&str, Option<&str>)>> {
        if !self.program.has_named_groups() {
            return None;
        }
        Some(
            self.program
                .group_names()
                .iter()
                .enumerate()
                .filter_map(|(i, n)| n.as_deref().map(|n| (n, self.get(i))))
                .collect(),
        )
    }

    /// Number of groups, group 0 included.
    pub fn len(&self) -> usize {
        self.captures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.captures.is_empty()
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = Option<&str>> + '_ {
        self.captures.iter().map(|c| c.as_deref())
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn input_utf16(&self) -> &[u16] {
        &self.units
    }

    pub fn program(&self) -> &Rc<Program> {
        &self.program
    }
}

// === MatchAll ===

/// Iterator over successive matches of a global RegExp.
#[derive(Debug)]
pub struct MatchAll {
    regexp: RegExp,
    units: Rc<[u16]>,
    input: Rc<str>,
    done: bool,
}

impl Iterator for MatchAll {
    type Item = Result<MatchResult, RegexError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let spans = match self.regexp.exec_spans(&self.units) {
            Ok(Some(spans)) => spans,
            Ok(None) => {
                self.done = true;
                return None;
            }
            Err(err) => {
                self.done = true;
                return Some(Err(err));
            }
        };
        let m = MatchResult::from_spans(
            spans,
            Rc::clone(&self.units),
            Rc::clone(&self.input),
            Rc::clone(&self.regexp.program),
        );
        if m.index() == m.end() {
            // step over an empty match so the scan makes progress
            let view = Utf16View::new(&self.units, self.regexp.unicode());
            self.regexp.last_index = view.advance(self.regexp.last_index);
        }
        Some(Ok(m))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exec_captures() {
        let mut re = RegExp::new(r"(a)(b)?", "").unwrap();
        let m = re.exec("a").unwrap().unwrap();
        let items: Vec<_> = m.iter().collect();
        assert_eq!(items, vec![Some("a"), Some("a"), None]);
        assert_eq!(m.len(), 3);
        assert_eq!(m.index(), 0);
        assert_eq!(m.input(), "a");
    }

    #[test]
    fn exec_empty_pattern_on_empty_input() {
        let mut re = RegExp::new("a*", "").unwrap();
        let m = re.exec("").unwrap().unwrap();
        assert_eq!(m.as_str(), "");
        assert_eq!(m.index(), 0);
    }

    #[test]
    fn non_global_ignores_last_index() {
        let mut re = RegExp::new("a", "").unwrap();
        re.set_last_index(5);
        let m = re.exec("aa").unwrap().unwrap();
        assert_eq!(m.index(), 0);
        assert_eq!(re.last_index(), 5);
    }

    #[test]
    fn global_advances_and_resets_last_index() {
        let mut re = RegExp::new("o", "g").unwrap();
        assert_eq!(re.exec("foo").unwrap().unwrap().index(), 1);
        assert_eq!(re.last_index(), 2);
        assert_eq!(re.exec("foo").unwrap().unwrap().index(), 2);
        assert_eq!(re.last_index(), 3);
        assert!(re.exec("foo").unwrap().is_none());
        assert_eq!(re.last_index(), 0);
    }

    #[test]
    fn last_index_past_end_resets() {
        let mut re = RegExp::new("", "g").unwrap();
        re.set_last_index(4);
        assert!(re.exec("abc").unwrap().is_none());
        assert_eq!(re.last_index(), 0);
        // exactly at the end an empty match still succeeds
        re.set_last_index(3);
        assert_eq!(re.exec("abc").unwrap().unwrap().index(), 3);
    }

    #[test]
    fn sticky_matches_only_at_last_index() {
        let mut re = RegExp::new("b", "y").unwrap();
        assert!(re.exec("ab").unwrap().is_none());
        assert_eq!(re.last_index(), 0);
        re.set_last_index(1);
        assert_eq!(re.exec("ab").unwrap().unwrap().index(), 1);
        assert_eq!(re.last_index(), 2);
    }

    #[test]
    fn unicode_global_steps_over_surrogate_pairs() {
        let mut re = RegExp::new("", "gu").unwrap();
        re.set_last_index(0);
        let all: Vec<usize> = re
            .match_all("\u{1F600}x")
            .unwrap()
            .map(|m| m.unwrap().index())
            .collect();
        assert_eq!(all, vec![0, 2, 3]);
    }

    #[test]
    fn fatal_error_leaves_last_index() {
        let mut re = RegExp::builder("(a+)+b")
            .global(true)
            .limits(MatchLimits::new(0, 10_000))
            .build()
            .unwrap();
        re.set_last_index(1);
        let err = re.exec(&"a".repeat(28)).unwrap_err();
        assert!(err.is_range());
        assert_eq!(re.last_index(), 1);
    }

    #[test]
    fn named_groups_in_result() {
        let mut re = RegExp::new(r"(?<year>\d{4})-(?<month>\d{2})", "").unwrap();
        let m = re.exec("on 2026-02").unwrap().unwrap();
        assert_eq!(m.name("year"), Some("2026"));
        assert_eq!(m.name("month"), Some("02"));
        assert_eq!(m.name("day"), None);
        assert_eq!(
            m.groups().unwrap(),
            vec![("year", Some("2026")), ("month", Some("02"))]
        );
        let mut plain = RegExp::new("(a)", "").unwrap();
        assert!(plain.exec("a").unwrap().unwrap().groups().is_none());
    }

    #[test]
    fn exec_utf16_reports_code_unit_offsets() {
        let mut re = RegExp::new("b", "").unwrap();
        let input: Vec<u16> = "\u{1F600}b".encode_utf16().collect();
        let m = re.exec_utf16(&input).unwrap().unwrap();
        assert_eq!(m.index(), 2);
        assert_eq!(m.span(0), Some(2..3));
    }

    #[test]
    fn exec_utf16_keeps_lone_surrogates() {
        let mut re = RegExp::new("(.)b", "").unwrap();
        let input = [0xD800, b'b' as u16];
        let m = re.exec_utf16(&input).unwrap().unwrap();
        assert_eq!(m.get_utf16(1), Some(&[0xD800][..]));
        assert_eq!(m.get_utf16(0), Some(&input[..]));
        assert_eq!(m.input_utf16(), &input[..]);
        // the string view is lossy
        assert_eq!(m.get(1), Some("\u{FFFD}"));
        assert_eq!(m.input(), "\u{FFFD}b");
    }

    #[test]
    fn engine_caches_programs() {
        let mut engine = Engine::new();
        let a = engine.regexp("x+", "g").unwrap();
        let b = engine.regexp("x+", "g").unwrap();
        assert!(Rc::ptr_eq(a.program(), b.program()));
        assert_eq!(engine.cache().len(), 1);
        engine.clear_cache();
        assert!(engine.cache().is_empty());
    }

    #[test]
    fn engine_builder_limits_flow_into_regexps() {
        let mut engine = Engine::builder().depth_limit(50).step_limit(500).build();
        let re = engine.regexp("a", "").unwrap();
        assert_eq!(re.limits(), MatchLimits::new(50, 500));
    }

    #[test]
    fn source_and_flags() {
        let re = RegExp::new("a/b", "yg").unwrap();
        assert_eq!(re.source(), "a\\/b");
        assert_eq!(re.flags(), "gy");
        assert!(re.global() && re.sticky());
    }

    #[test]
    fn match_all_requires_global() {
        let re = RegExp::new("a", "").unwrap();
        assert!(matches!(re.match_all("a"), Err(RegexError::Type { .. })));
    }

    #[test]
    fn invalid_flags_are_syntax_errors() {
        let err = RegExp::new("a", "gig").unwrap_err();
        assert!(err.is_syntax());
    }
}
