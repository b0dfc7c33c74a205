use serde::Serialize;
use std::ops::Range;

use crate::error::{CoreError, Result};

/// Half-open `[start, end)` span over a source buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ByteRange {
    pub start: usize,
    pub end: usize,
}

impl ByteRange {
    #[inline]
    #[must_use]
    pub const fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end);
        Self { start, end }
    }

    /// Builds a range and checks it against a buffer of `len` bytes.
    pub fn within(start: usize, end: usize, len: usize) -> Result<Self> {
        if start > end || end > len {
            return Err(CoreError::InvalidRange { start, end, len });
        }
        Ok(Self { start, end })
    }

    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.end - self.start
    }

    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.start == self.end
    }

    #[inline]
    #[must_use]
    pub fn as_range(&self) -> Range<usize> {
        self.start..self.end
    }

    /// Returns the bytes this range covers, or `None` when it falls outside `buf`.
    #[inline]
    #[must_use]
    pub fn slice<'a>(&self, buf: &'a [u8]) -> Option<&'a [u8]> {
        buf.get(self.start..self.end)
    }
}

impl std::fmt::Display for ByteRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{:06X}..0x{:06X}", self.start, self.end)
    }
}

/// Byte alignment at which 16-bit code units are assumed to start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Alignment {
    Even,
    Odd,
}

impl Alignment {
    pub const BOTH: [Alignment; 2] = [Alignment::Even, Alignment::Odd];

    #[inline]
    #[must_use]
    pub const fn offset(self) -> usize {
        match self {
            Self::Even => 0,
            Self::Odd => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Endian {
    Little,
    Big,
}

/// Width of the character-count prefix in length-prefixed records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PrefixWidth {
    U16,
    U32,
}

impl PrefixWidth {
    #[inline]
    #[must_use]
    pub const fn bytes(self) -> usize {
        match self {
            Self::U16 => 2,
            Self::U32 => 4,
        }
    }
}

/// How a byte range was interpreted as text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum EncodingHypothesis {
    Ascii8,
    Utf16Le(Alignment),
    Utf16Be,
    LengthPrefixedUtf16 { prefix: PrefixWidth, max_len: usize },
    LengthPrefixedAscii,
}

impl EncodingHypothesis {
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::Ascii8 => "ascii".to_string(),
            Self::Utf16Le(Alignment::Even) => "utf16le@0".to_string(),
            Self::Utf16Le(Alignment::Odd) => "utf16le@1".to_string(),
            Self::Utf16Be => "utf16be".to_string(),
            Self::LengthPrefixedUtf16 { prefix, .. } => {
                format!("prefixed-utf16/u{}", prefix.bytes() * 8)
            }
            Self::LengthPrefixedAscii => "prefixed-ascii/u16".to_string(),
        }
    }
}

impl std::fmt::Display for EncodingHypothesis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CandidateString {
    pub text: String,
    pub range: ByteRange,
    pub hypothesis: EncodingHypothesis,
}

impl CandidateString {
    #[must_use]
    pub fn new(text: String, range: ByteRange, hypothesis: EncodingHypothesis) -> Self {
        Self {
            text,
            range,
            hypothesis,
        }
    }

    /// Share of characters in the printable ASCII range. Empty text scores 1.0.
    #[must_use]
    pub fn printable_ratio(&self) -> f32 {
        printable_ratio(&self.text)
    }
}

pub(crate) fn printable_ratio(text: &str) -> f32 {
    let mut total = 0usize;
    let mut printable = 0usize;
    for ch in text.chars() {
        total += 1;
        if (' '..='~').contains(&ch) {
            printable += 1;
        }
    }
    if total == 0 {
        return 1.0;
    }
    printable as f32 / total as f32
}

/// A compressed payload recovered from inside a larger buffer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CarvedSegment {
    pub magic_offset: usize,
    pub end_offset: usize,
    pub compressed_len: usize,
    #[serde(skip)]
    pub plaintext: Vec<u8>,
}

impl CarvedSegment {
    #[must_use]
    pub fn new(magic_offset: usize, end_offset: usize, plaintext: Vec<u8>) -> Self {
        Self {
            magic_offset,
            end_offset,
            compressed_len: end_offset - magic_offset,
            plaintext,
        }
    }

    #[inline]
    #[must_use]
    pub fn range(&self) -> ByteRange {
        ByteRange::new(self.magic_offset, self.end_offset)
    }
}
