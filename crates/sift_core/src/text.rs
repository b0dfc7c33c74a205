//! Multi-hypothesis text recovery from raw bytes.
//!
//! Each mode reads the same buffer under a different assumption about how
//! text was written into it. Modes never merge their results; the caller
//! picks which hypotheses fit the stream being decoded.

use std::collections::HashSet;

use crate::scanner::{RunAccumulator, is_printable, read_u16_le, read_u32_le};
use crate::types::{
    Alignment, ByteRange, CandidateString, EncodingHypothesis, Endian, PrefixWidth,
};

pub const DEFAULT_MIN_RUN_LEN: usize = 4;
pub const DEFAULT_MAX_RECORD_CHARS: usize = 4096;
pub const PREFIXED_ASCII_MIN_LEN: usize = 3;
pub const PREFIXED_ASCII_MAX_LEN: usize = 128;

#[derive(Debug, Clone)]
pub struct DecoderConfig {
    /// Shortest run, in characters, reported by the run-based modes.
    pub min_run_len: usize,
    /// Sanity bound on length-prefixed record sizes, in characters.
    pub max_record_chars: usize,
    /// Full-buffer decodes replace everything outside printable ASCII
    /// with a space before collapsing whitespace.
    pub ascii_only_lines: bool,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            min_run_len: DEFAULT_MIN_RUN_LEN,
            max_record_chars: DEFAULT_MAX_RECORD_CHARS,
            ascii_only_lines: false,
        }
    }
}

/// Output of a full-buffer UTF-16 decode.
#[derive(Debug, Clone, Default)]
pub struct DecodedText {
    pub lines: Vec<CandidateString>,
    /// Unpaired surrogates that were dropped during decoding.
    pub dropped_units: usize,
    /// Printable ASCII and ASCII whitespace over all non-NUL decoded characters.
    /// Zero when nothing decoded.
    pub printable_ratio: f32,
}

impl DecodedText {
    /// True when undecodable units were silently dropped.
    #[inline]
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.dropped_units > 0
    }

    #[must_use]
    pub fn texts(&self) -> Vec<&str> {
        self.lines.iter().map(|l| l.text.as_str()).collect()
    }
}

#[derive(Default)]
struct LineBuilder {
    text: String,
    start: usize,
    end: usize,
    pending_space: bool,
}

impl LineBuilder {
    fn push(&mut self, offset: usize, width: usize, ch: char) {
        if self.text.is_empty() {
            self.start = offset;
        } else if self.pending_space {
            self.text.push(' ');
        }
        self.pending_space = false;
        self.text.push(ch);
        self.end = offset + width;
    }

    fn space(&mut self) {
        if !self.text.is_empty() {
            self.pending_space = true;
        }
    }

    fn take(&mut self, hypothesis: EncodingHypothesis) -> Option<CandidateString> {
        let line = std::mem::take(self);
        if line.text.is_empty() {
            return None;
        }
        Some(CandidateString::new(
            line.text,
            ByteRange::new(line.start, line.end),
            hypothesis,
        ))
    }
}

#[derive(Debug, Clone, Default)]
pub struct TextDecoder {
    config: DecoderConfig,
}

impl TextDecoder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_config(config: DecoderConfig) -> Self {
        Self { config }
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Printable 8-bit runs.
    #[must_use]
    pub fn ascii_runs(&self, buf: &[u8]) -> Vec<CandidateString> {
        let mut acc = RunAccumulator::new(self.config.min_run_len, EncodingHypothesis::Ascii8);
        for (offset, &byte) in buf.iter().enumerate() {
            if is_printable(byte) {
                acc.accept(offset, 1, char::from(byte));
            } else {
                acc.flush();
            }
        }
        acc.finish()
    }

    /// ASCII stored as UTF-16LE: a unit joins the run only when its low
    /// byte is printable and its high byte is zero.
    #[must_use]
    pub fn utf16le_runs(&self, buf: &[u8], alignment: Alignment) -> Vec<CandidateString> {
        let mut acc = RunAccumulator::new(
            self.config.min_run_len,
            EncodingHypothesis::Utf16Le(alignment),
        );
        let mut offset = alignment.offset();
        while offset + 1 < buf.len() {
            let (low, high) = (buf[offset], buf[offset + 1]);
            if is_printable(low) && high == 0 {
                acc.accept(offset, 2, char::from(low));
            } else {
                acc.flush();
            }
            offset += 2;
        }
        acc.finish()
    }

    /// Runs both alignments and keeps the first occurrence of each text,
    /// even-aligned hits first.
    #[must_use]
    pub fn utf16le_runs_all_alignments(&self, buf: &[u8]) -> Vec<CandidateString> {
        let mut seen = HashSet::new();
        Alignment::BOTH
            .iter()
            .flat_map(|&a| self.utf16le_runs(buf, a))
            .filter(|c| seen.insert(c.text.clone()))
            .collect()
    }

    /// Decodes the whole buffer as UTF-16 and splits it into clean lines.
    ///
    /// Undecodable units are dropped and counted, NULs vanish, CR and LF
    /// break lines, other whitespace and control runs collapse to one space.
    #[must_use]
    pub fn decode_utf16_lines(&self, buf: &[u8], endian: Endian) -> DecodedText {
        let hypothesis = match endian {
            Endian::Little => EncodingHypothesis::Utf16Le(Alignment::Even),
            Endian::Big => EncodingHypothesis::Utf16Be,
        };
        let units = buf.chunks_exact(2).map(|u| match endian {
            Endian::Little => u16::from_le_bytes([u[0], u[1]]),
            Endian::Big => u16::from_be_bytes([u[0], u[1]]),
        });

        let mut out = DecodedText::default();
        let mut line = LineBuilder::default();
        let mut decoded_chars = 0usize;
        let mut printable_chars = 0usize;
        let mut offset = 0usize;

        for unit in char::decode_utf16(units) {
            let ch = match unit {
                Ok(ch) => ch,
                Err(_) => {
                    out.dropped_units += 1;
                    offset += 2;
                    continue;
                }
            };
            let width = ch.len_utf16() * 2;
            let ascii_printable = (' '..='~').contains(&ch);
            if ch != '\0' {
                decoded_chars += 1;
                printable_chars += usize::from(ascii_printable || ch.is_ascii_whitespace());
            }

            match ch {
                '\0' => {}
                '\r' | '\n' => out.lines.extend(line.take(hypothesis)),
                c if c.is_whitespace() || c.is_control() => line.space(),
                _ if self.config.ascii_only_lines && !ascii_printable => line.space(),
                c => line.push(offset, width, c),
            }
            offset += width;
        }
        out.lines.extend(line.take(hypothesis));

        if decoded_chars > 0 {
            out.printable_ratio = printable_chars as f32 / decoded_chars as f32;
        }
        out
    }

    /// Counted UTF-16LE records: a character count, then `count * 2` bytes.
    ///
    /// A count above `max_record_chars`, or one that runs off the end of the
    /// buffer, ends the scan. A zero count yields an empty record.
    #[must_use]
    pub fn length_prefixed_utf16(&self, buf: &[u8], prefix: PrefixWidth) -> Vec<CandidateString> {
        let hypothesis = EncodingHypothesis::LengthPrefixedUtf16 {
            prefix,
            max_len: self.config.max_record_chars,
        };
        let mut records = Vec::new();
        let mut cursor = 0usize;

        loop {
            let count = match prefix {
                PrefixWidth::U16 => read_u16_le(buf, cursor).map(usize::from),
                PrefixWidth::U32 => read_u32_le(buf, cursor).map(|v| v as usize),
            };
            let Ok(count) = count else { break };
            cursor += prefix.bytes();

            if count > self.config.max_record_chars {
                break;
            }
            let end = cursor + count * 2;
            if end > buf.len() {
                break;
            }
            let units = buf[cursor..end]
                .chunks_exact(2)
                .map(|u| u16::from_le_bytes([u[0], u[1]]));
            let text: String = char::decode_utf16(units).filter_map(|r| r.ok()).collect();
            records.push(CandidateString::new(
                text,
                ByteRange::new(cursor, end),
                hypothesis,
            ));
            cursor = end;
        }
        records
    }

    /// Printable ASCII strings behind a u16 LE byte count, probed at every
    /// offset. Texts are deduplicated, first offset wins.
    #[must_use]
    pub fn length_prefixed_ascii(&self, buf: &[u8]) -> Vec<CandidateString> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for offset in 0..buf.len().saturating_sub(2) {
            let Ok(len) = read_u16_le(buf, offset) else {
                break;
            };
            let len = usize::from(len);
            if !(PREFIXED_ASCII_MIN_LEN..=PREFIXED_ASCII_MAX_LEN).contains(&len) {
                continue;
            }
            let start = offset + 2;
            let Some(chunk) = buf.get(start..start + len) else {
                continue;
            };
            if !chunk.iter().copied().all(is_printable) {
                continue;
            }
            let text: String = chunk.iter().copied().map(char::from).collect();
            if seen.insert(text.clone()) {
                out.push(CandidateString::new(
                    text,
                    ByteRange::new(start, start + len),
                    EncodingHypothesis::LengthPrefixedAscii,
                ));
            }
        }
        out
    }
}
