// error.rs - Error type for compilation and matching.
//
// Mirrors the three error classes an ECMAScript host raises from this
// subsystem: SyntaxError, RangeError and TypeError.

use thiserror::Error;

use crate::regerror::{LimitKind, SyntaxErrorKind};
use crate::regexec::ExecError;

/// Error type for regex compilation and matching operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegexError {
    /// Malformed pattern or flags, detected at compile time.
    #[error("Invalid regular expression: /{pattern}/: {kind}")]
    Syntax {
        kind: SyntaxErrorKind,
        pattern: String,
    },
    /// A match budget was exhausted. The whole exec/replace call is aborted.
    #[error("{kind}")]
    Range { kind: LimitKind },
    /// The host object rejected an operation.
    #[error("{message}")]
    Type { message: String },
    /// Malformed bytecode reached the matcher (should not occur).
    #[error("internal error: {message}")]
    InternalBug { message: String },
}

impl RegexError {
    pub fn syntax(kind: SyntaxErrorKind, pattern: &str) -> Self {
        RegexError::Syntax {
            kind,
            pattern: pattern.to_string(),
        }
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        RegexError::Type {
            message: message.into(),
        }
    }

    /// Name of the host error class this maps to.
    pub fn name(&self) -> &'static str {
        match self {
            RegexError::Syntax { .. } => "SyntaxError",
            RegexError::Range { .. } => "RangeError",
            RegexError::Type { .. } => "TypeError",
            RegexError::InternalBug { .. } => "InternalError",
        }
    }

    pub fn is_syntax(&self) -> bool {
        matches!(self, RegexError::Syntax { .. })
    }

    pub fn is_range(&self) -> bool {
        matches!(self, RegexError::Range { .. })
    }

    /// The syntax error kind, if this is a compile-time failure.
    pub fn syntax_kind(&self) -> Option<SyntaxErrorKind> {
        match self {
            RegexError::Syntax { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

impl From<LimitKind> for RegexError {
    fn from(kind: LimitKind) -> Self {
        RegexError::Range { kind }
    }
}

impl From<ExecError> for RegexError {
    fn from(err: ExecError) -> Self {
        match err {
            ExecError::Limit(kind) => RegexError::Range { kind },
            ExecError::InvalidBytecode { at } => RegexError::InternalBug {
                message: format!("invalid opcode at offset {at}"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn syntax_error_display() {
        let err = RegexError::syntax(SyntaxErrorKind::UnterminatedGroup, "(a");
        assert!(err.is_syntax());
        assert_eq!(err.name(), "SyntaxError");
        assert_eq!(
            err.to_string(),
            "Invalid regular expression: /(a/: unterminated group"
        );
        assert_eq!(err.syntax_kind(), Some(SyntaxErrorKind::UnterminatedGroup));
    }

    #[test]
    fn range_error_from_limit() {
        let err = RegexError::from(LimitKind::Depth);
        assert!(err.is_range());
        assert_eq!(err.name(), "RangeError");
        assert_eq!(err.syntax_kind(), None);
    }

    #[test]
    fn exec_errors_convert() {
        let err = RegexError::from(ExecError::Limit(LimitKind::Depth));
        assert!(err.is_range());
        let err = RegexError::from(ExecError::InvalidBytecode { at: 7 });
        assert_eq!(err.name(), "InternalError");
        assert_eq!(err.to_string(), "internal error: invalid opcode at offset 7");
    }

    #[test]
    fn type_error_display() {
        let err = RegexError::type_error("lastIndex is not writable");
        assert_eq!(err.to_string(), "lastIndex is not writable");
    }

    #[test]
    fn error_trait() {
        let err: Box<dyn std::error::Error> = Box::new(RegexError::from(LimitKind::Steps));
        assert_eq!(err.to_string(), "regular expression step limit exceeded");
    }
}
