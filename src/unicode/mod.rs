// unicode/mod.rs - Character classification and case canonicalization.
// Pure functions over code points: word/digit/whitespace/line-terminator
// tests and the ECMAScript Canonicalize operation.

use smallvec::SmallVec;

use crate::regenc::*;

// === Line Terminators ===

pub const CP_LF: CodePoint = 0x0A;
pub const CP_CR: CodePoint = 0x0D;
pub const CP_LS: CodePoint = 0x2028;
pub const CP_PS: CodePoint = 0x2029;

#[inline]
pub fn is_line_terminator(cp: CodePoint) -> bool {
    cp == CP_LF || cp == CP_CR || cp == CP_LS || cp == CP_PS
}

// === White Space ===
// WhiteSpace and LineTerminator productions, as inclusive ranges.

static WHITE_SPACE_RANGES: [(CodePoint, CodePoint); 10] = [
    (0x0009, 0x000D),
    (0x0020, 0x0020),
    (0x00A0, 0x00A0),
    (0x1680, 0x1680),
    (0x2000, 0x200A),
    (0x2028, 0x2029),
    (0x202F, 0x202F),
    (0x205F, 0x205F),
    (0x3000, 0x3000),
    (0xFEFF, 0xFEFF),
];

pub fn is_whitespace(cp: CodePoint) -> bool {
    if cp <= ASCII_LIMIT {
        return cp == 0x20 || (0x09..=0x0D).contains(&cp);
    }
    WHITE_SPACE_RANGES
        .iter()
        .any(|&(lo, hi)| cp >= lo && cp <= hi)
}

// === Digits and Word Characters ===

#[inline]
pub fn is_decimal_digit(cp: CodePoint) -> bool {
    (b'0' as CodePoint..=b'9' as CodePoint).contains(&cp)
}

#[inline]
pub fn hex_value(cp: CodePoint) -> Option<u32> {
    char::from_u32(cp).and_then(|c| c.to_digit(16))
}

/// `[A-Za-z0-9_]`
#[inline]
pub fn is_word_char(cp: CodePoint) -> bool {
    cp <= ASCII_LIMIT && ((cp as u8).is_ascii_alphanumeric() || cp == b'_' as CodePoint)
}

/// Word characters under `/iu`, which also admit characters whose
/// canonical form is a word character (U+017F, U+212A).
#[inline]
pub fn is_word_char_ic(cp: CodePoint, unicode_ignore_case: bool) -> bool {
    is_word_char(cp) || (unicode_ignore_case && is_word_char(canonicalize(cp, true)))
}

/// `^ $ \ . * + ? ( ) [ ] { } |`
#[inline]
pub fn is_syntax_char(cp: CodePoint) -> bool {
    matches!(
        char::from_u32(cp),
        Some('^' | '$' | '\\' | '.' | '*' | '+' | '?' | '(' | ')' | '[' | ']' | '{' | '}' | '|')
    )
}

// === Group Name Characters ===

pub fn is_id_start(cp: CodePoint) -> bool {
    match char::from_u32(cp) {
        Some(c) => c == '$' || c == '_' || c.is_alphabetic(),
        None => false,
    }
}

pub fn is_id_continue(cp: CodePoint) -> bool {
    match char::from_u32(cp) {
        Some(c) => {
            c == '$' || c == '_' || c == '\u{200C}' || c == '\u{200D}' || c.is_alphanumeric()
        }
        None => false,
    }
}

// === Case Canonicalization ===

// Simple case foldings that differ from the single-character lowercase
// mapping. Sorted by source code point.
static FOLD_EXCEPTIONS: [(CodePoint, CodePoint); 13] = [
    (0x00B5, 0x03BC),
    (0x017F, 0x0073),
    (0x0345, 0x03B9),
    (0x03C2, 0x03C3),
    (0x03D0, 0x03B2),
    (0x03D1, 0x03B8),
    (0x03D5, 0x03C6),
    (0x03D6, 0x03C0),
    (0x03F0, 0x03BA),
    (0x03F1, 0x03C1),
    (0x03F5, 0x03B5),
    (0x1E9B, 0x1E61),
    (0x1FBE, 0x03B9),
];

fn single_lower(c: char) -> Option<CodePoint> {
    let mut it = c.to_lowercase();
    match (it.next(), it.next()) {
        (Some(l), None) => Some(l as CodePoint),
        _ => None,
    }
}

fn single_upper(c: char) -> Option<CodePoint> {
    let mut it = c.to_uppercase();
    match (it.next(), it.next()) {
        (Some(u), None) => Some(u as CodePoint),
        _ => None,
    }
}

fn simple_case_fold(c: char) -> CodePoint {
    let cp = c as CodePoint;
    if let Ok(i) = FOLD_EXCEPTIONS.binary_search_by_key(&cp, |&(from, _)| from) {
        return FOLD_EXCEPTIONS[i].1;
    }
    single_lower(c).unwrap_or(cp)
}

/// ECMAScript `Canonicalize(ch)`.
///
/// Unicode mode uses simple case folding. Legacy mode uppercases, keeping
/// the character when the mapping is not one-to-one or would map a
/// non-ASCII character into ASCII.
pub fn canonicalize(cp: CodePoint, unicode: bool) -> CodePoint {
    if cp <= ASCII_LIMIT {
        let b = cp as u8;
        let mapped = if unicode {
            b.to_ascii_lowercase()
        } else {
            b.to_ascii_uppercase()
        };
        return mapped as CodePoint;
    }
    let Some(c) = char::from_u32(cp) else {
        return cp;
    };
    if unicode {
        return simple_case_fold(c);
    }
    match single_upper(c) {
        Some(u) if u > ASCII_LIMIT => u,
        _ => cp,
    }
}

// Characters whose simple lowercase is a letter that does not uppercase
// back to them. Sorted by source code point.
static LOWER_EXTRAS: [(CodePoint, CodePoint); 36] = [
    (0x01C5, 0x01C6),
    (0x01C8, 0x01C9),
    (0x01CB, 0x01CC),
    (0x01F2, 0x01F3),
    (0x03F4, 0x03B8),
    (0x1E9E, 0x00DF),
    (0x1F88, 0x1F80),
    (0x1F89, 0x1F81),
    (0x1F8A, 0x1F82),
    (0x1F8B, 0x1F83),
    (0x1F8C, 0x1F84),
    (0x1F8D, 0x1F85),
    (0x1F8E, 0x1F86),
    (0x1F8F, 0x1F87),
    (0x1F98, 0x1F90),
    (0x1F99, 0x1F91),
    (0x1F9A, 0x1F92),
    (0x1F9B, 0x1F93),
    (0x1F9C, 0x1F94),
    (0x1F9D, 0x1F95),
    (0x1F9E, 0x1F96),
    (0x1F9F, 0x1F97),
    (0x1FA8, 0x1FA0),
    (0x1FA9, 0x1FA1),
    (0x1FAA, 0x1FA2),
    (0x1FAB, 0x1FA3),
    (0x1FAC, 0x1FA4),
    (0x1FAD, 0x1FA5),
    (0x1FAE, 0x1FA6),
    (0x1FAF, 0x1FA7),
    (0x1FBC, 0x1FB3),
    (0x1FCC, 0x1FC3),
    (0x1FFC, 0x1FF3),
    (0x2126, 0x03C9),
    (0x212A, 0x006B),
    (0x212B, 0x00E5),
];

/// `cp` with its single-character lower and upper case partners.
pub fn case_variants(cp: CodePoint) -> [CodePoint; 3] {
    match char::from_u32(cp) {
        Some(c) => [
            cp,
            single_lower(c).unwrap_or(cp),
            single_upper(c).unwrap_or(cp),
        ],
        None => [cp, cp, cp],
    }
}

/// Every code point `m` with `canonicalize(m) == canonicalize(cp)`,
/// starting with `cp` itself. Used to test ignore-case class ranges, where
/// a range matches when any of its members shares the input's canonical
/// form.
pub fn case_equivalents(cp: CodePoint, unicode: bool) -> SmallVec<[CodePoint; 8]> {
    let key = canonicalize(cp, unicode);
    let mut seeds: SmallVec<[CodePoint; 8]> = SmallVec::new();
    seeds.extend(case_variants(cp));
    seeds.extend(case_variants(key));
    let linked: SmallVec<[CodePoint; 4]> = FOLD_EXCEPTIONS
        .iter()
        .chain(LOWER_EXTRAS.iter())
        .filter(|(_, to)| seeds.contains(to))
        .map(|&(from, _)| from)
        .collect();
    seeds.extend(linked);

    let mut out: SmallVec<[CodePoint; 8]> = SmallVec::new();
    for v in seeds {
        if !out.contains(&v) && canonicalize(v, unicode) == key {
            out.push(v);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fold_exceptions_sorted() {
        assert!(FOLD_EXCEPTIONS.windows(2).all(|w| w[0].0 < w[1].0));
    }

    #[test]
    fn line_terminators() {
        assert!(is_line_terminator('\n' as u32));
        assert!(is_line_terminator(0x2029));
        assert!(!is_line_terminator(' ' as u32));
    }

    #[test]
    fn whitespace() {
        assert!(is_whitespace('\t' as u32));
        assert!(is_whitespace(0xFEFF));
        assert!(is_whitespace(0x3000));
        assert!(!is_whitespace('a' as u32));
        assert!(!is_whitespace(0x200B));
    }

    #[test]
    fn word_chars() {
        assert!(is_word_char('_' as u32));
        assert!(!is_word_char(0xE9));
        assert!(!is_word_char_ic(0x017F, false));
        assert!(is_word_char_ic(0x017F, true));
        assert!(is_word_char_ic(0x212A, true));
    }

    #[test]
    fn canonicalize_legacy() {
        assert_eq!(canonicalize('a' as u32, false), 'A' as u32);
        assert_eq!(canonicalize(0xE9, false), 0xC9);
        // long s maps to ASCII 'S' and is therefore kept
        assert_eq!(canonicalize(0x017F, false), 0x017F);
        // sharp s uppercases to two characters
        assert_eq!(canonicalize(0xDF, false), 0xDF);
    }

    #[test]
    fn canonicalize_unicode() {
        assert_eq!(canonicalize('A' as u32, true), 'a' as u32);
        assert_eq!(canonicalize(0x212A, true), 'k' as u32);
        assert_eq!(canonicalize(0x03C2, true), 0x03C3);
        assert_eq!(canonicalize(0x1F600, true), 0x1F600);
        assert_eq!(canonicalize(0xD800, true), 0xD800);
    }

    #[test]
    fn extra_tables_sorted() {
        assert!(LOWER_EXTRAS.windows(2).all(|w| w[0].0 < w[1].0));
    }

    #[test]
    fn variants() {
        assert_eq!(case_variants('a' as u32), ['a' as u32, 'a' as u32, 'A' as u32]);
    }

    #[test]
    fn lower_extras_fold_to_their_partner() {
        for &(from, to) in LOWER_EXTRAS.iter() {
            assert_eq!(canonicalize(from, true), to, "U+{from:04X}");
        }
    }

    #[test]
    fn equivalents_legacy() {
        let s = case_equivalents('s' as u32, false);
        assert_eq!(s.as_slice(), &['s' as u32, 'S' as u32]);
        // long s and the Kelvin sign stay apart from ASCII
        assert_eq!(case_equivalents(0x017F, false).as_slice(), &[0x017F]);
        assert_eq!(case_equivalents(0x212A, false).as_slice(), &[0x212A]);
        let sigma = case_equivalents(0x03A3, false);
        assert!(sigma.contains(&0x03C3) && sigma.contains(&0x03C2));
    }

    #[test]
    fn equivalents_unicode() {
        let s = case_equivalents('s' as u32, true);
        assert!(s.contains(&('S' as u32)) && s.contains(&0x017F));
        let k = case_equivalents(0x212A, true);
        assert!(k.contains(&('k' as u32)) && k.contains(&('K' as u32)));
        assert!(case_equivalents('k' as u32, true).contains(&0x212A));
        assert_eq!(case_equivalents(0x1F600, true).as_slice(), &[0x1F600]);
    }
}
