// replace.rs - String replacement driven by a RegExp.
//
// Two strategies. When the receiver uses the built-in exec and its
// lastIndex is writable, the matcher is called directly in a loop. Otherwise
// every match goes through the receiver's exec, results are collected first
// and substituted afterwards.

use std::rc::Rc;

use memchr::memchr;
use tracing::trace;

use crate::api::MatchResult;
use crate::config::MatchLimits;
use crate::encodings::Utf16View;
use crate::error::RegexError;
use crate::regenc::{from_utf16, to_utf16};
use crate::regexec::search;
use crate::regint::{Program, RegexFlags};

const REPLACE_TARGET: &str = "ecma_regexp::replace";

/// The object a replacement runs against.
///
/// [`RegExp`](crate::api::RegExp) implements this with the built-in exec.
/// Hosts whose regexp objects override `exec` or freeze `lastIndex` report it
/// through the two capability methods, which forces every match through
/// [`RegExpObject::exec`].
pub trait RegExpObject {
    fn program(&self) -> &Rc<Program>;

    fn limits(&self) -> MatchLimits {
        MatchLimits::default()
    }

    fn last_index(&self) -> usize;

    /// Fails with a TypeError when lastIndex is read-only.
    fn set_last_index(&mut self, value: usize) -> Result<(), RegexError>;

    fn exec(&mut self, input: &str) -> Result<Option<MatchResult>, RegexError>;

    fn has_builtin_exec(&self) -> bool {
        true
    }

    fn is_last_index_writable(&self) -> bool {
        true
    }
}

/// What each match is replaced with.
pub enum Replacement<'r> {
    /// Template text with `$` substitutions (`$$ $& $` $' $n $nn $<name>`).
    Template(&'r str),
    /// Called with every match; returns the replacement text.
    Function(&'r mut dyn FnMut(&MatchResult) -> String),
}

impl std::fmt::Debug for Replacement<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Replacement::Template(t) => f.debug_tuple("Template").field(t).finish(),
            Replacement::Function(_) => f.write_str("Function(..)"),
        }
    }
}

/// Replace the first match of `regexp` in `input`, or every match when the
/// program is global.
pub fn replace<R: RegExpObject + ?Sized>(
    regexp: &mut R,
    input: &str,
    mut replacement: Replacement<'_>,
) -> Result<String, RegexError> {
    let units = to_utf16(input);
    let out = if regexp.has_builtin_exec() && regexp.is_last_index_writable() {
        trace!(target: REPLACE_TARGET, pattern = regexp.program().pattern(), "fast path");
        replace_direct(regexp, &units, input, &mut replacement)?
    } else {
        trace!(target: REPLACE_TARGET, pattern = regexp.program().pattern(), "slow path");
        replace_via_exec(regexp, &units, input, &mut replacement)?
    };
    Ok(from_utf16(&out))
}

fn replace_direct<R: RegExpObject + ?Sized>(
    regexp: &mut R,
    units: &[u16],
    input: &str,
    replacement: &mut Replacement<'_>,
) -> Result<Vec<u16>, RegexError> {
    let program = Rc::clone(regexp.program());
    let limits = regexp.limits();
    let flags = program.flags();
    let global = flags.contains(RegexFlags::GLOBAL);
    let sticky = flags.contains(RegexFlags::STICKY);
    let view = Utf16View::new(units, flags.unicode());
    // built lazily for callbacks
    let mut shared_input: Option<(Rc<[u16]>, Rc<str>)> = None;

    let mut from = if global {
        regexp.set_last_index(0)?;
        0
    } else if sticky {
        regexp.last_index()
    } else {
        0
    };
    let mut out = Vec::with_capacity(units.len());
    let mut copied = 0;
    loop {
        let found = if from > units.len() {
            None
        } else {
            search(&program, units, from, limits)?
        };
        let Some(spans) = found else {
            if global || sticky {
                regexp.set_last_index(0)?;
            }
            break;
        };
        let whole = spans[0].clone().unwrap_or(from..from);
        out.extend_from_slice(&units[copied..whole.start]);
        match replacement {
            Replacement::Template(template) => {
                let captures: Vec<Option<&[u16]>> = spans[1..]
                    .iter()
                    .map(|s| s.as_ref().map(|r| &units[r.clone()]))
                    .collect();
                let sub = Substitution {
                    input: units,
                    position: whole.start,
                    matched: &units[whole.clone()],
                    captures,
                    program: &program,
                };
                expand_template(*template, &sub, &mut out);
            }
            Replacement::Function(f) => {
                let (shared_units, shared_str) =
                    shared_input.get_or_insert_with(|| (Rc::from(units), Rc::from(input)));
                let m = MatchResult::from_spans(
                    spans,
                    Rc::clone(shared_units),
                    Rc::clone(shared_str),
                    Rc::clone(&program),
                );
                out.extend((**f)(&m).encode_utf16());
            }
        }
        copied = whole.end;
        if !global {
            if sticky {
                regexp.set_last_index(whole.end)?;
            }
            break;
        }
        from = if whole.is_empty() {
            view.advance(whole.end)
        } else {
            whole.end
        };
    }
    out.extend_from_slice(&units[copied.min(units.len())..]);
    Ok(out)
}

fn replace_via_exec<R: RegExpObject + ?Sized>(
    regexp: &mut R,
    units: &[u16],
    input: &str,
    replacement: &mut Replacement<'_>,
) -> Result<Vec<u16>, RegexError> {
    let program = Rc::clone(regexp.program());
    let flags = program.flags();
    let global = flags.contains(RegexFlags::GLOBAL);
    let view = Utf16View::new(units, flags.unicode());

    if global {
        regexp.set_last_index(0)?;
    }
    let mut results = Vec::new();
    while let Some(m) = regexp.exec(input)? {
        let empty = m.as_str().is_empty();
        results.push(m);
        if !global {
            break;
        }
        if empty {
            let next = view.advance(regexp.last_index());
            regexp.set_last_index(next)?;
        }
    }

    let mut out = Vec::with_capacity(units.len());
    let mut next_source = 0;
    for m in &results {
        let matched = to_utf16(m.as_str());
        let position = m.index().min(units.len());
        let replaced = match replacement {
            Replacement::Template(template) => {
                let owned: Vec<Option<Vec<u16>>> = m.iter().skip(1).map(|c| c.map(to_utf16)).collect();
                let sub = Substitution {
                    input: units,
                    position,
                    matched: &matched,
                    captures: owned.iter().map(|c| c.as_deref()).collect(),
                    program: m.program(),
                };
                let mut text = Vec::new();
                expand_template(*template, &sub, &mut text);
                text
            }
            Replacement::Function(f) => (**f)(m).encode_utf16().collect(),
        };
        // results that overlap an earlier replacement are dropped
        if position >= next_source {
            out.extend_from_slice(&units[next_source..position]);
            out.extend_from_slice(&replaced);
            next_source = position + matched.len();
        }
    }
    if next_source < units.len() {
        out.extend_from_slice(&units[next_source..]);
    }
    Ok(out)
}

// === Template expansion ===

/// One match as seen by a replacement template.
struct Substitution<'a> {
    input: &'a [u16],
    position: usize,
    matched: &'a [u16],
    /// Groups 1.. of the match.
    captures: Vec<Option<&'a [u16]>>,
    program: &'a Program,
}

impl Substitution<'_> {
    fn push_capture(&self, n: usize, out: &mut Vec<u16>) {
        if let Some(Some(text)) = self.captures.get(n - 1) {
            out.extend_from_slice(text);
        }
    }
}

fn expand_template(template: &str, sub: &Substitution<'_>, out: &mut Vec<u16>) {
    let bytes = template.as_bytes();
    let mut i = 0;
    while let Some(offset) = memchr(b'$', &bytes[i..]) {
        let dollar = i + offset;
        out.extend(template[i..dollar].encode_utf16());
        let rest = &bytes[dollar + 1..];
        let consumed = match rest.first() {
            Some(b'$') => {
                out.push(b'$' as u16);
                2
            }
            Some(b'&') => {
                out.extend_from_slice(sub.matched);
                2
            }
            Some(b'`') => {
                out.extend_from_slice(&sub.input[..sub.position]);
                2
            }
            Some(b'\'') => {
                let tail = (sub.position + sub.matched.len()).min(sub.input.len());
                out.extend_from_slice(&sub.input[tail..]);
                2
            }
            Some(d) if d.is_ascii_digit() => match group_reference(rest, sub.captures.len()) {
                Some((n, digits)) => {
                    sub.push_capture(n, out);
                    1 + digits
                }
                None => {
                    out.push(b'$' as u16);
                    1
                }
            },
            Some(b'<') if sub.program.has_named_groups() => {
                match memchr(b'>', &rest[1..]) {
                    Some(close) => {
                        let name = &template[dollar + 2..dollar + 2 + close];
                        if let Some(n) = sub.program.group_index(name) {
                            sub.push_capture(n, out);
                        }
                        3 + close
                    }
                    None => {
                        out.push(b'$' as u16);
                        1
                    }
                }
            }
            _ => {
                out.push(b'$' as u16);
                1
            }
        };
        i = dollar + consumed;
    }
    out.extend(template[i..].encode_utf16());
}

/// Resolve `$n` / `$nn` against `groups` captures. A two-digit reference wins
/// when it names an existing group. Returns (group, digits consumed).
fn group_reference(rest: &[u8], groups: usize) -> Option<(usize, usize)> {
    let first = usize::from(rest[0] - b'0');
    if let Some(&second) = rest.get(1).filter(|b| b.is_ascii_digit()) {
        let two = first * 10 + usize::from(second - b'0');
        if (1..=groups).contains(&two) {
            return Some((two, 2));
        }
    }
    (1..=groups).contains(&first).then_some((first, 1))
}
