//! Fixed-width readers and printable-run accumulation over raw byte buffers.

use crate::error::{CoreError, Result};
use crate::types::{ByteRange, CandidateString, EncodingHypothesis};

pub const PRINTABLE_MIN: u8 = 0x20;
pub const PRINTABLE_MAX: u8 = 0x7E;

#[inline]
#[must_use]
pub const fn is_printable(byte: u8) -> bool {
    byte >= PRINTABLE_MIN && byte <= PRINTABLE_MAX
}

#[inline]
fn window<const N: usize>(buf: &[u8], offset: usize) -> Result<[u8; N]> {
    let out_of_bounds = || CoreError::OutOfBounds {
        offset,
        width: N,
        len: buf.len(),
    };
    let end = offset.checked_add(N).ok_or_else(out_of_bounds)?;
    buf.get(offset..end)
        .and_then(|s| s.try_into().ok())
        .ok_or_else(out_of_bounds)
}

#[inline]
pub fn read_u16_le(buf: &[u8], offset: usize) -> Result<u16> {
    window::<2>(buf, offset).map(u16::from_le_bytes)
}

#[inline]
pub fn read_u32_le(buf: &[u8], offset: usize) -> Result<u32> {
    window::<4>(buf, offset).map(u32::from_le_bytes)
}

/// Reads up to `max_count` consecutive u16 LE words from the start of `buf`,
/// tagged with their byte offsets.
#[must_use]
pub fn le_u16_words(buf: &[u8], max_count: usize) -> Vec<(usize, u16)> {
    buf.chunks_exact(2)
        .take(max_count)
        .enumerate()
        .map(|(i, w)| (i * 2, u16::from_le_bytes([w[0], w[1]])))
        .collect()
}

#[must_use]
pub fn le_u32_words(buf: &[u8], max_count: usize) -> Vec<(usize, u32)> {
    buf.chunks_exact(4)
        .take(max_count)
        .enumerate()
        .map(|(i, w)| (i * 4, u32::from_le_bytes([w[0], w[1], w[2], w[3]])))
        .collect()
}

/// Reads `buf` as a table of `(u32, u32)` LE pairs.
#[must_use]
pub fn u32_pairs(buf: &[u8], max_pairs: usize) -> Vec<(usize, u32, u32)> {
    buf.chunks_exact(8)
        .take(max_pairs)
        .enumerate()
        .map(|(i, p)| {
            (
                i * 8,
                u32::from_le_bytes([p[0], p[1], p[2], p[3]]),
                u32::from_le_bytes([p[4], p[5], p[6], p[7]]),
            )
        })
        .collect()
}

#[derive(Debug)]
enum RunState {
    Idle,
    InRun {
        start: usize,
        end: usize,
        chars: usize,
        text: String,
    },
}

/// Collects printable runs into candidate strings.
///
/// Each accepted character extends the current run; a break flushes it if
/// it reached `min_len` characters. Runs shorter than that are discarded.
#[derive(Debug)]
pub struct RunAccumulator {
    state: RunState,
    min_len: usize,
    hypothesis: EncodingHypothesis,
    out: Vec<CandidateString>,
}

impl RunAccumulator {
    #[must_use]
    pub fn new(min_len: usize, hypothesis: EncodingHypothesis) -> Self {
        Self {
            state: RunState::Idle,
            min_len,
            hypothesis,
            out: Vec::new(),
        }
    }

    /// Accepts `ch`, which occupied `width` bytes starting at `offset`.
    #[inline]
    pub fn accept(&mut self, offset: usize, width: usize, ch: char) {
        match &mut self.state {
            RunState::Idle => {
                let mut text = String::new();
                text.push(ch);
                self.state = RunState::InRun {
                    start: offset,
                    end: offset + width,
                    chars: 1,
                    text,
                };
            }
            RunState::InRun {
                end, chars, text, ..
            } => {
                text.push(ch);
                *chars += 1;
                *end = offset + width;
            }
        }
    }

    #[inline]
    pub fn flush(&mut self) {
        if let RunState::InRun {
            start,
            end,
            chars,
            text,
        } = std::mem::replace(&mut self.state, RunState::Idle)
        {
            if chars >= self.min_len {
                self.out.push(CandidateString::new(
                    text,
                    ByteRange::new(start, end),
                    self.hypothesis,
                ));
            }
        }
    }

    #[must_use]
    pub fn finish(mut self) -> Vec<CandidateString> {
        self.flush();
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn printable_bounds() {
        assert!(is_printable(b' '));
        assert!(is_printable(b'~'));
        assert!(!is_printable(0x1F));
        assert!(!is_printable(0x7F));
        assert!(!is_printable(0x00));
    }

    #[test]
    fn reads_little_endian() {
        let buf = [0x34, 0x12, 0x78, 0x56, 0xFF];
        assert_eq!(read_u16_le(&buf, 0).unwrap(), 0x1234);
        assert_eq!(read_u32_le(&buf, 0).unwrap(), 0x5678_1234);
        assert_eq!(read_u16_le(&buf, 3).unwrap(), 0xFF56);
    }

    #[test]
    fn reads_past_end_are_out_of_bounds() {
        let buf = [0u8; 5];
        assert_eq!(
            read_u32_le(&buf, 2),
            Err(CoreError::OutOfBounds {
                offset: 2,
                width: 4,
                len: 5
            })
        );
        assert!(read_u16_le(&buf, 4).is_err());
        assert!(read_u16_le(&buf, usize::MAX).is_err());
        assert!(read_u32_le(&[], 0).is_err());
    }

    #[test]
    fn word_tables() {
        let buf = [1, 0, 0, 0, 2, 0, 0, 0, 3];
        assert_eq!(le_u32_words(&buf, 16), vec![(0, 1), (4, 2)]);
        assert_eq!(le_u16_words(&buf, 2), vec![(0, 1), (2, 0)]);
        assert_eq!(u32_pairs(&buf, 4), vec![(0, 1, 2)]);
    }

    #[test]
    fn accumulator_flushes_on_break_and_filters_short_runs() {
        let mut acc = RunAccumulator::new(3, EncodingHypothesis::Ascii8);
        for (i, ch) in "ab".chars().enumerate() {
            acc.accept(i, 1, ch);
        }
        acc.flush();
        for (i, ch) in "wxyz".chars().enumerate() {
            acc.accept(10 + i, 1, ch);
        }
        let out = acc.finish();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].text, "wxyz");
        assert_eq!(out[0].range, ByteRange::new(10, 14));
    }

    #[test]
    fn accumulator_tracks_wide_units() {
        let mut acc = RunAccumulator::new(1, EncodingHypothesis::Utf16Be);
        acc.accept(4, 2, 'A');
        acc.accept(6, 2, 'B');
        let out = acc.finish();
        assert_eq!(out[0].range, ByteRange::new(4, 8));
    }
}
