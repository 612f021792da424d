// regerror.rs - Error kinds and their messages.
//
// Compile-time failures are classified by `SyntaxErrorKind`, match-time
// budget failures by `LimitKind`. Both map to a fixed message.

use std::fmt;

/// Why a pattern or flag string was rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SyntaxErrorKind {
    InvalidFlags,
    UnterminatedGroup,
    UnmatchedParenthesis,
    UnterminatedCharacterClass,
    NothingToRepeat,
    QuantifierOutOfOrder,
    IncompleteQuantifier,
    LoneQuantifierBracket,
    EscapeAtEndOfPattern,
    InvalidEscape,
    InvalidUnicodeEscape,
    InvalidDecimalEscape,
    InvalidClassEscape,
    ClassRangeOutOfOrder,
    InvalidClassRange,
    InvalidBackreference,
    InvalidGroup,
    InvalidCaptureGroupName,
    DuplicateCaptureGroupName,
    InvalidNamedReference,
    TooManyCaptures,
    PatternTooDeep,
}

impl SyntaxErrorKind {
    pub fn message(self) -> &'static str {
        match self {
            SyntaxErrorKind::InvalidFlags => "invalid regular expression flags",
            SyntaxErrorKind::UnterminatedGroup => "unterminated group",
            SyntaxErrorKind::UnmatchedParenthesis => "unmatched ')'",
            SyntaxErrorKind::UnterminatedCharacterClass => "unterminated character class",
            SyntaxErrorKind::NothingToRepeat => "nothing to repeat",
            SyntaxErrorKind::QuantifierOutOfOrder => "numbers out of order in {} quantifier",
            SyntaxErrorKind::IncompleteQuantifier => "incomplete quantifier",
            SyntaxErrorKind::LoneQuantifierBracket => "lone quantifier brackets",
            SyntaxErrorKind::EscapeAtEndOfPattern => "\\ at end of pattern",
            SyntaxErrorKind::InvalidEscape => "invalid escape",
            SyntaxErrorKind::InvalidUnicodeEscape => "invalid Unicode escape",
            SyntaxErrorKind::InvalidDecimalEscape => "invalid decimal escape",
            SyntaxErrorKind::InvalidClassEscape => "invalid class escape",
            SyntaxErrorKind::ClassRangeOutOfOrder => "range out of order in character class",
            SyntaxErrorKind::InvalidClassRange => "invalid character class range",
            SyntaxErrorKind::InvalidBackreference => "invalid backreference",
            SyntaxErrorKind::InvalidGroup => "invalid group",
            SyntaxErrorKind::InvalidCaptureGroupName => "invalid capture group name",
            SyntaxErrorKind::DuplicateCaptureGroupName => "duplicate capture group name",
            SyntaxErrorKind::InvalidNamedReference => "invalid named reference",
            SyntaxErrorKind::TooManyCaptures => "too many captures",
            SyntaxErrorKind::PatternTooDeep => "pattern nested too deeply",
        }
    }
}

impl fmt::Display for SyntaxErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Which match budget was exhausted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LimitKind {
    /// Backtracking recursion went deeper than the depth limit.
    Depth,
    /// The matcher took more steps than the step limit.
    Steps,
}

impl LimitKind {
    pub fn message(self) -> &'static str {
        match self {
            LimitKind::Depth => "regular expression recursion limit exceeded",
            LimitKind::Steps => "regular expression step limit exceeded",
        }
    }
}

impl fmt::Display for LimitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}
