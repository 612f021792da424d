// compat_ecma.rs - Match-position tests for ECMAScript pattern semantics.
//
// Offsets are UTF-16 code units. Each helper compiles a fresh RegExp with
// the given flags and runs exec from lastIndex 0.

use ecma_regexp::api::RegExp;
use ecma_regexp::regerror::SyntaxErrorKind;
use rstest::rstest;

fn compile(pattern: &str, flags: &str) -> RegExp {
    RegExp::new(pattern, flags)
        .unwrap_or_else(|e| panic!("compile failed for /{pattern}/{flags}: {e}"))
}

fn x2(pattern: &str, flags: &str, input: &str, from: usize, to: usize) {
    let m = compile(pattern, flags)
        .exec(input)
        .unwrap()
        .unwrap_or_else(|| panic!("x2: expected match for /{pattern}/{flags} against {input:?}"));
    assert_eq!(
        m.span(0),
        Some(from..to),
        "x2: wrong span for /{pattern}/{flags} against {input:?}"
    );
}

fn x3(pattern: &str, flags: &str, input: &str, from: usize, to: usize, group: usize) {
    let m = compile(pattern, flags)
        .exec(input)
        .unwrap()
        .unwrap_or_else(|| panic!("x3: expected match for /{pattern}/{flags} against {input:?}"));
    assert_eq!(
        m.span(group),
        Some(from..to),
        "x3: wrong span of group {group} for /{pattern}/{flags} against {input:?}"
    );
}

fn n(pattern: &str, flags: &str, input: &str) {
    let m = compile(pattern, flags).exec(input).unwrap();
    assert!(
        m.is_none(),
        "n: expected no match for /{pattern}/{flags} against {input:?}, got {:?}",
        m.map(|m| m.span(0))
    );
}

fn e(pattern: &str, flags: &str, kind: SyntaxErrorKind) {
    let err = RegExp::new(pattern, flags)
        .err()
        .unwrap_or_else(|| panic!("e: expected SyntaxError for /{pattern}/{flags}"));
    assert_eq!(err.syntax_kind(), Some(kind), "e: /{pattern}/{flags}: {err}");
}

// === Literals and search ===

#[test]
fn literals() {
    x2("", "", "", 0, 0);
    x2("a", "", "a", 0, 1);
    x2("b", "", "ab", 1, 2);
    x2("abc", "", "xxabcabc", 2, 5);
    n("abd", "", "abcabc");
    x2("\\x41", "", "A", 0, 1);
    x2("\\u0041", "", "A", 0, 1);
    x2("\\cJ", "", "\n", 0, 1);
    x2("\\0", "", "\0", 0, 1);
    x2("\\t\\v\\f", "", " \t\u{b}\u{c}", 1, 4);
}

#[test]
fn legacy_escapes() {
    // out-of-range backreference is an octal escape
    x2("\\101", "", "A", 0, 1);
    // identity escape
    x2("\\q", "", "q", 0, 1);
    // lone braces and brackets are literal
    x2("a{", "", "a{", 0, 2);
    x2("}]", "", "}]", 0, 2);
    // \u{..} without the u flag is u repeated
    x2("\\u{2}", "", "uu", 0, 2);
}

#[test]
fn dot() {
    x2(".", "", "\n a", 1, 2);
    n(".", "", "\n\r\u{2028}\u{2029}");
    x2(".", "s", "\n", 0, 1);
    x2("^.$", "u", "\u{1F600}", 0, 2);
    n("^.$", "", "\u{1F600}");
    x2("^..$", "", "\u{1F600}", 0, 2);
}

#[test]
fn unicode_escapes() {
    x2("\\u{1F600}", "u", "x\u{1F600}", 1, 3);
    x2("\\uD83D\\uDE00", "u", "\u{1F600}", 0, 2);
    x2("[\\u{1F600}-\\u{1F64F}]", "u", "a\u{1F601}", 1, 3);
}

// === Alternation and repetition ===

#[test]
fn alternation() {
    x2("a|b", "", "b", 0, 1);
    x2("a|ab", "", "abc", 0, 1);
    x2("ab|a", "", "abc", 0, 2);
    x2("((a)|b)+", "", "ab", 0, 2);
    x2("(aa|aabaac|ba|b|c)*", "", "aabaac", 0, 4);
    x3("(aa|aabaac|ba|b|c)*", "", "aabaac", 2, 4, 1);
}

#[test]
fn quantifiers() {
    x2("a*", "", "", 0, 0);
    x2("a{2}", "", "aaa", 0, 2);
    x2("a{2,}", "", "aaaa", 0, 4);
    x2("a{1,2}?", "", "aa", 0, 1);
    x2("a[a-z]{2,4}", "", "abcdefghi", 0, 5);
    x2("a[a-z]{2,4}?", "", "abcdefghi", 0, 3);
    x2("(?:ab)+", "", "ababx", 0, 4);
    x2("(?:a|b)*?c", "", "abc", 0, 3);
    x2("x{0}", "", "x", 0, 0);
    x2("(a*)*b", "", "aab", 0, 3);
}

#[test]
fn empty_iteration_terminates() {
    x2("(a*)*", "", "b", 0, 0);
    x3("(a*)+", "", "b", 0, 0, 1);
    x2("(?:a?)*?b", "", "ab", 0, 2);
    x2("(?:(?=a))*a", "", "a", 0, 1);
}

// === Captures ===

#[test]
fn captures_reset_per_iteration() {
    let m = compile("(z)((a+)?(b+)?(c))*", "")
        .exec("zaacbbbcac")
        .unwrap()
        .unwrap();
    let groups: Vec<_> = m.iter().collect();
    assert_eq!(
        groups,
        vec![Some("zaacbbbcac"), Some("z"), Some("ac"), Some("a"), None, Some("c")]
    );
}

#[test]
fn capture_from_leftmost_alternative() {
    x3("(a|ab)(c|bcd)(d*)", "", "abcd", 0, 1, 1);
    x3("(a|ab)(c|bcd)(d*)", "", "abcd", 1, 4, 2);
    x3("(a|ab)(c|bcd)(d*)", "", "abcd", 4, 4, 3);
}

// === Backreferences ===

#[test]
fn backreferences() {
    x2("(a)\\1", "", "aa", 0, 2);
    n("(a)\\1", "", "ab");
    x2("(a)\\1", "i", "aA", 0, 2);
    // unset group matches empty
    x2("\\1(a)", "", "a", 0, 1);
    x2("(a*)b\\1+", "", "baaaac", 0, 1);
    x2("(?<x>b)\\k<x>", "", "abb", 1, 3);
    x2("\\k<x>(?<x>b)", "", "b", 0, 1);
}

// === Assertions ===

#[test]
fn anchors() {
    x2("^b", "m", "a\nb", 2, 3);
    n("^b", "", "a\nb");
    x2("a$", "m", "a\nb", 0, 1);
    n("a$", "", "a\nb");
    x2("$", "", "ab", 2, 2);
}

#[test]
fn word_boundaries() {
    x2("\\bfoo\\b", "", "a foo b", 2, 5);
    n("\\bfoo\\b", "", "afoo");
    x2("\\Boo", "", "foo", 1, 3);
    n("\\b", "", "");
}

#[test]
fn lookahead() {
    x2("a(?=b)", "", "ab", 0, 1);
    n("a(?=b)", "", "ac");
    x2("a(?!b)", "", "abac", 2, 3);
    x3("(?=(a+))", "", "baaabac", 1, 4, 1);
    x2("(?=(a+))a*b\\1", "", "baaabac", 3, 6);
    x3("(.*?)a(?!(a+)b\\2c)\\2(.*)", "", "baaabaac", 3, 8, 3);
    // negative lookahead leaves no captures behind
    let m = compile("(?!(a))b", "").exec("b").unwrap().unwrap();
    assert_eq!(m.get(1), None);
}

// === Classes ===

#[test]
fn classes() {
    x2("[a-c]+", "", "xxabcz", 2, 5);
    x2("[^a-c]", "", "abcd", 3, 4);
    x2("[\\b]", "", "a\u{8}", 1, 2);
    x2("[-a]", "", "-", 0, 1);
    x2("[a-]", "", "-", 0, 1);
    x2("[\\d-z]", "", "-", 0, 1);
    // [] is an empty class and never matches
    n("[]a]", "", "a]");
}

#[test]
fn class_escapes() {
    x2("\\d+", "", "ab123", 2, 5);
    x2("\\D", "", "1a", 1, 2);
    x2("\\s", "", "a\u{a0}b", 1, 2);
    x2("\\s", "", "a\u{feff}", 1, 2);
    x2("\\S", "", " x", 1, 2);
    x2("\\w+", "", "--a_1--", 2, 5);
    x2("\\W", "", "ab-", 2, 3);
    x2("[\\s\\d]+", "", "a1 2b", 1, 4);
}

// === Case-insensitivity ===

#[test]
fn ignore_case() {
    x2("abc", "i", "xABC", 1, 4);
    x2("[A-Z]", "iu", "a", 0, 1);
    x2("[a-z]", "i", "Q", 0, 1);
    x2("[^a]", "i", "Ab", 1, 2);
    n("[^a]", "i", "A");
    x2("\\u00e9", "i", "\u{c9}", 0, 1);
}

#[test]
fn ignore_case_ranges() {
    // legacy canonicalization keeps long s and the Kelvin sign out of ASCII
    n("[A-Z]", "i", "\u{17F}");
    n("[a-z]", "i", "\u{212A}");
    x2("^[^A-Z]$", "i", "\u{17F}", 0, 1);
    // simple case folding links them under /iu
    x2("[\\u017F-\\u0180]", "iu", "s", 0, 1);
    x2("[a-z]", "iu", "\u{212A}", 0, 1);
    x2("[\\u0390-\\u03A9]", "i", "\u{3C2}", 0, 1);
}

// === Errors ===

#[test]
fn syntax_errors() {
    e("(", "", SyntaxErrorKind::UnterminatedGroup);
    e("a{2,1}", "", SyntaxErrorKind::QuantifierOutOfOrder);
    e("[b-a]", "", SyntaxErrorKind::ClassRangeOutOfOrder);
    e("(a)\\2", "u", SyntaxErrorKind::InvalidBackreference);
    e("+", "", SyntaxErrorKind::NothingToRepeat);
    e("a", "x", SyntaxErrorKind::InvalidFlags);
    e("(?<a>.)(?<a>.)", "", SyntaxErrorKind::DuplicateCaptureGroupName);
}

// === Table-driven ===

#[rstest]
#[case(r"^\d+$", "123", true)]
#[case(r"^\d+$", "12a", false)]
#[case(r"^[\w.]+@\w+\.\w+$", "a.b@c.de", true)]
#[case(r"^(?:\d{1,3}\.){3}\d{1,3}$", "10.0.0.255", true)]
#[case(r"^(?:\d{1,3}\.){3}\d{1,3}$", "10.0.0", false)]
#[case(r"colou?r", "The color", true)]
#[case(r"^$", "", true)]
fn test_truth_table(#[case] pattern: &str, #[case] input: &str, #[case] expected: bool) {
    assert_eq!(compile(pattern, "").test(input).unwrap(), expected);
}

#[rstest]
#[case("", "")]
#[case("yg", "gy")]
#[case("uimsgy", "gimsuy")]
#[case("s", "s")]
fn flags_render_in_canonical_order(#[case] flags: &str, #[case] expected: &str) {
    assert_eq!(compile("a", flags).flags(), expected);
}
