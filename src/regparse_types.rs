// regparse_types.rs - Types shared by the parser and the emitter.
// Quantifiers, character-class sets and the per-term atom descriptor the
// parser uses to decide how a quantifier wraps the emitted body.

use crate::regenc::CodePoint;
use crate::regint::{ClassEscapes, INFINITE_REPEAT};
use crate::unicode::canonicalize;

// === Quantifier ===

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Quantifier {
    pub min: u32,
    /// `INFINITE_REPEAT` when unbounded.
    pub max: u32,
    pub lazy: bool,
}

impl Quantifier {
    pub const ONCE: Quantifier = Quantifier {
        min: 1,
        max: 1,
        lazy: false,
    };

    pub fn star(lazy: bool) -> Self {
        Quantifier { min: 0, max: INFINITE_REPEAT, lazy }
    }

    pub fn plus(lazy: bool) -> Self {
        Quantifier { min: 1, max: INFINITE_REPEAT, lazy }
    }

    pub fn optional(lazy: bool) -> Self {
        Quantifier { min: 0, max: 1, lazy }
    }

    #[inline]
    pub fn is_once(&self) -> bool {
        self.min == 1 && self.max == 1
    }
}

// === Character Classes ===

/// One element of a class body before range formation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClassAtom {
    Char(CodePoint),
    Escape(ClassEscapes),
}

/// A parsed character class, in emission order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClassSet {
    pub inverted: bool,
    pub escapes: ClassEscapes,
    /// Inclusive ranges, stored as written.
    pub ranges: Vec<(CodePoint, CodePoint)>,
    /// Explicit characters, canonicalized under ignoreCase.
    pub chars: Vec<CodePoint>,
}

impl ClassSet {
    pub fn add_atom(&mut self, atom: ClassAtom, ignore_case: bool, unicode: bool) {
        match atom {
            ClassAtom::Char(cp) => self.add_char(cp, ignore_case, unicode),
            ClassAtom::Escape(mask) => self.escapes |= mask,
        }
    }

    pub fn add_char(&mut self, cp: CodePoint, ignore_case: bool, unicode: bool) {
        let cp = if ignore_case {
            canonicalize(cp, unicode)
        } else {
            cp
        };
        if !self.chars.contains(&cp) {
            self.chars.push(cp);
        }
    }

    pub fn add_range(&mut self, lo: CodePoint, hi: CodePoint) {
        self.ranges.push((lo, hi));
    }
}

// === Atom Descriptor ===

/// What the last parsed term emitted, which decides how a following
/// quantifier is applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AtomKind {
    /// One single-character instruction (Char, Period, class).
    Simple,
    /// A parenthesized group whose body has been emitted but not wrapped.
    Group(GroupInfo),
    Backreference,
    /// A lookahead, already wrapped. Carries the captures it contains.
    Lookahead { first_capture: u32, capture_count: u32 },
    /// `^ $ \b \B`; never quantifiable.
    Assertion,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GroupInfo {
    /// Capture index when capturing.
    pub capture: Option<u32>,
    pub first_capture: u32,
    pub capture_count: u32,
    pub has_alternation: bool,
    /// The body is a single simple atom and may use the simple iterator.
    pub simple_body: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_chars_are_canonicalized_under_ignore_case() {
        let mut set = ClassSet::default();
        set.add_char('a' as u32, true, false);
        set.add_char('A' as u32, true, false);
        assert_eq!(set.chars, vec!['A' as u32]);

        let mut set = ClassSet::default();
        set.add_char('A' as u32, true, true);
        assert_eq!(set.chars, vec!['a' as u32]);
    }

    #[test]
    fn class_escape_atoms_merge() {
        let mut set = ClassSet::default();
        set.add_atom(ClassAtom::Escape(ClassEscapes::DIGIT), false, false);
        set.add_atom(ClassAtom::Escape(ClassEscapes::SPACE), false, false);
        assert_eq!(set.escapes, ClassEscapes::DIGIT | ClassEscapes::SPACE);
        assert!(set.chars.is_empty());
    }

    #[test]
    fn quantifier_shapes() {
        assert!(Quantifier::ONCE.is_once());
        assert_eq!(Quantifier::star(false).max, INFINITE_REPEAT);
        assert_eq!(Quantifier::plus(true).min, 1);
        assert!(Quantifier::optional(true).lazy);
    }
}
