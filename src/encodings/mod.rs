// encodings/mod.rs - Text encodings understood by the matcher.
// Pattern and subject text are both handled as UTF-16 code units.

pub mod utf16;

pub use utf16::Utf16View;
