// encodings/utf16.rs - UTF-16 string view
// Code-point decoding over UTF-16 code units. In unicode mode a valid
// surrogate pair decodes as one code point; otherwise every code unit is a
// character of its own.

use crate::regenc::*;

/// Read-only code-point view over UTF-16 code units.
///
/// All positions are code-unit offsets.
#[derive(Clone, Copy, Debug)]
pub struct Utf16View<'a> {
    units: &'a [u16],
    unicode: bool,
}

impl<'a> Utf16View<'a> {
    pub fn new(units: &'a [u16], unicode: bool) -> Self {
        Utf16View { units, unicode }
    }

    /// Length in code units.
    #[inline]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    #[inline]
    pub fn is_unicode(&self) -> bool {
        self.unicode
    }

    #[inline]
    pub fn units(&self) -> &'a [u16] {
        self.units
    }

    /// Raw code unit at `pos`.
    #[inline]
    pub fn unit_at(&self, pos: usize) -> Option<CodePoint> {
        self.units.get(pos).map(|&u| u as CodePoint)
    }

    /// Decode the character starting at `pos`, returning it with its width
    /// in code units.
    #[inline]
    pub fn decode_next(&self, pos: usize) -> Option<(CodePoint, usize)> {
        let first = self.unit_at(pos)?;
        if self.unicode && is_lead_surrogate(first) {
            if let Some(second) = self.unit_at(pos + 1) {
                if is_trail_surrogate(second) {
                    return Some((combine_surrogates(first, second), 2));
                }
            }
        }
        Some((first, 1))
    }

    /// The character starting at `pos`, without its width.
    #[inline]
    pub fn peek_next(&self, pos: usize) -> Option<CodePoint> {
        self.decode_next(pos).map(|(cp, _)| cp)
    }

    /// The character ending at `pos`.
    pub fn peek_prev(&self, pos: usize) -> Option<CodePoint> {
        if pos == 0 || pos > self.units.len() {
            return None;
        }
        let last = self.units[pos - 1] as CodePoint;
        if self.unicode && is_trail_surrogate(last) && pos >= 2 {
            let lead = self.units[pos - 2] as CodePoint;
            if is_lead_surrogate(lead) {
                return Some(combine_surrogates(lead, last));
            }
        }
        Some(last)
    }

    /// Position of the character following the one at `pos`.
    ///
    /// At or past the end this still moves forward by one unit so that
    /// search loops terminate.
    #[inline]
    pub fn advance(&self, pos: usize) -> usize {
        match self.decode_next(pos) {
            Some((_, width)) => pos + width,
            None => pos + 1,
        }
    }

    /// ASCII fast-path test for the code unit at `pos`.
    #[inline]
    pub fn is_ascii_at(&self, pos: usize) -> bool {
        matches!(self.units.get(pos), Some(&u) if u as CodePoint <= ASCII_LIMIT)
    }
}
