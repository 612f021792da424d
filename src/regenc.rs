// regenc.rs - Shared text-model helpers.
// Code point type, surrogate arithmetic and UTF-16 conversion used by the
// parser, the matcher and the exec/replace helpers.

/// A Unicode code point, or a lone surrogate code unit.
pub type CodePoint = u32;

pub const MAX_CODE_POINT: CodePoint = 0x10FFFF;
pub const ASCII_LIMIT: CodePoint = 0x7F;

const LEAD_SURROGATE_MIN: CodePoint = 0xD800;
const LEAD_SURROGATE_MAX: CodePoint = 0xDBFF;
const TRAIL_SURROGATE_MIN: CodePoint = 0xDC00;
const TRAIL_SURROGATE_MAX: CodePoint = 0xDFFF;

#[inline]
pub fn is_lead_surrogate(unit: CodePoint) -> bool {
    (LEAD_SURROGATE_MIN..=LEAD_SURROGATE_MAX).contains(&unit)
}

#[inline]
pub fn is_trail_surrogate(unit: CodePoint) -> bool {
    (TRAIL_SURROGATE_MIN..=TRAIL_SURROGATE_MAX).contains(&unit)
}

/// Combine a lead/trail surrogate pair into a supplementary code point.
#[inline]
pub fn combine_surrogates(lead: CodePoint, trail: CodePoint) -> CodePoint {
    0x10000 + ((lead - LEAD_SURROGATE_MIN) << 10) + (trail - TRAIL_SURROGATE_MIN)
}

/// Encode a Rust string as UTF-16 code units.
#[inline]
pub fn to_utf16(s: &str) -> Vec<u16> {
    s.encode_utf16().collect()
}

/// Decode UTF-16 code units to a Rust string, replacing lone surrogates.
#[inline]
pub fn from_utf16(units: &[u16]) -> String {
    String::from_utf16_lossy(units)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn surrogate_pair_roundtrip() {
        let out = to_utf16("\u{1F600}");
        assert_eq!(out, vec![0xD83D, 0xDE00]);
        assert!(is_lead_surrogate(out[0] as u32));
        assert!(is_trail_surrogate(out[1] as u32));
        assert_eq!(combine_surrogates(out[0] as u32, out[1] as u32), 0x1F600);
    }

    #[test]
    fn lone_surrogate_decodes_lossily() {
        assert_eq!(from_utf16(&[0xD800]), "\u{FFFD}");
    }
}
