mod gzip;
mod inflate;
mod probe;
mod signature;

pub use gzip::{
    FLAG_COMMENT, FLAG_EXTRA, FLAG_HCRC, FLAG_NAME, FLAG_TEXT, GZIP_MAGIC, GzipHeader,
    GzipTrailer, HeaderCarve, TRAILER_LEN, parse_header, parse_member,
};
pub use probe::{EmbeddedStream, StreamWrapper, probe_wrappers, scan_embedded_streams};
pub use signature::{Signature, SignatureHit, SignatureIndex};

use std::io::Read;

use flate2::bufread::GzDecoder;
use memchr::memmem::Finder;
use serde::Serialize;
use tracing::debug;

use crate::error::Result;
use crate::types::CarvedSegment;

/// Smallest distance from the magic to a candidate end.
pub const MIN_SEGMENT_LEN: usize = 10;

#[derive(Debug, Clone)]
pub struct CarverConfig {
    pub min_segment_len: usize,
    /// Move on to later magic occurrences when the leftmost one fails.
    pub try_later_signatures: bool,
    /// Locate the end with one lenient decode before the backward search.
    pub trailer_probe: bool,
}

impl Default for CarverConfig {
    fn default() -> Self {
        Self {
            min_segment_len: MIN_SEGMENT_LEN,
            try_later_signatures: false,
            trailer_probe: false,
        }
    }
}

impl CarverConfig {
    #[must_use]
    pub fn with_try_later_signatures(mut self, enabled: bool) -> Self {
        self.try_later_signatures = enabled;
        self
    }

    #[must_use]
    pub fn with_trailer_probe(mut self, enabled: bool) -> Self {
        self.trailer_probe = enabled;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CarveOutcome {
    Carved(CarvedSegment),
    NoSegmentFound,
    /// A magic was present but no candidate end decoded.
    CarveFailed { magic_offset: usize },
}

impl CarveOutcome {
    #[inline]
    #[must_use]
    pub fn segment(&self) -> Option<&CarvedSegment> {
        match self {
            Self::Carved(seg) => Some(seg),
            _ => None,
        }
    }

    #[must_use]
    pub fn into_segment(self) -> Option<CarvedSegment> {
        match self {
            Self::Carved(seg) => Some(seg),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_carved(&self) -> bool {
        matches!(self, Self::Carved(_))
    }

    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Carved(_) => "carved",
            Self::NoSegmentFound => "no segment",
            Self::CarveFailed { .. } => "carve failed",
        }
    }
}

/// Recovers a gzip member embedded at an unknown position inside a buffer.
#[derive(Debug, Clone)]
pub struct SegmentCarver {
    config: CarverConfig,
    finder: Finder<'static>,
}

impl Default for SegmentCarver {
    fn default() -> Self {
        Self::new()
    }
}

impl SegmentCarver {
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(CarverConfig::default())
    }

    #[must_use]
    pub fn with_config(config: CarverConfig) -> Self {
        Self {
            config,
            finder: Finder::new(&GZIP_MAGIC),
        }
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &CarverConfig {
        &self.config
    }

    #[must_use]
    pub fn magic_offsets(&self, data: &[u8]) -> Vec<usize> {
        self.finder.find_iter(data).collect()
    }

    /// Backward-search carve from the leftmost magic.
    ///
    /// Candidate ends run from the end of the buffer down to
    /// `magic + min_segment_len`; the first one whose slice decodes as
    /// exactly one complete member wins.
    #[must_use]
    pub fn carve(&self, data: &[u8]) -> CarveOutcome {
        let mut magics = self.finder.find_iter(data);
        let Some(first) = magics.next() else {
            return CarveOutcome::NoSegmentFound;
        };

        if let Some(segment) = self.carve_at(data, first) {
            return CarveOutcome::Carved(segment);
        }
        if self.config.try_later_signatures {
            for magic in magics {
                if let Some(segment) = self.carve_at(data, magic) {
                    return CarveOutcome::Carved(segment);
                }
            }
        }
        debug!(magic_offset = first, len = data.len(), "no candidate end decoded");
        CarveOutcome::CarveFailed { magic_offset: first }
    }

    /// Carves the member assumed to start at `magic_offset`.
    #[must_use]
    pub fn carve_at(&self, data: &[u8], magic_offset: usize) -> Option<CarvedSegment> {
        if magic_offset >= data.len() {
            return None;
        }
        if self.config.trailer_probe {
            if let Some(segment) = self.probe_end(data, magic_offset) {
                return Some(segment);
            }
            debug!(magic_offset, "trailer probe failed, falling back to backward search");
        }
        self.search_backward(data, magic_offset)
    }

    fn search_backward(&self, data: &[u8], magic_offset: usize) -> Option<CarvedSegment> {
        let floor = magic_offset.saturating_add(self.config.min_segment_len);
        debug!(magic_offset, floor, len = data.len(), "backward search");
        (floor..=data.len()).rev().find_map(|end| {
            decode_exact(&data[magic_offset..end])
                .map(|plaintext| CarvedSegment::new(magic_offset, end, plaintext))
        })
    }

    fn probe_end(&self, data: &[u8], magic_offset: usize) -> Option<CarvedSegment> {
        let tail = &data[magic_offset..];
        let mut decoder = GzDecoder::new(tail);
        let mut sink = Vec::new();
        decoder.read_to_end(&mut sink).ok()?;
        let end = magic_offset + tail.len() - decoder.into_inner().len();
        if end < magic_offset.saturating_add(self.config.min_segment_len) {
            return None;
        }
        debug!(magic_offset, end, "trailer probe located member end");
        decode_exact(&data[magic_offset..end])
            .map(|plaintext| CarvedSegment::new(magic_offset, end, plaintext))
    }

    /// Header-parse carve from the leftmost magic. `Ok(None)` when the
    /// buffer holds no magic at all.
    pub fn carve_with_header(&self, data: &[u8]) -> Result<Option<HeaderCarve>> {
        let Some(magic_offset) = self.finder.find(data) else {
            return Ok(None);
        };
        debug!(magic_offset, "header-parse carve");
        parse_member(data, magic_offset).map(Some)
    }
}

/// Decodes `segment` as one gzip member that must use every byte.
/// The decoder checks the trailer CRC-32 and length.
fn decode_exact(segment: &[u8]) -> Option<Vec<u8>> {
    let mut decoder = GzDecoder::new(segment);
    let mut plaintext = Vec::new();
    decoder.read_to_end(&mut plaintext).ok()?;
    decoder.into_inner().is_empty().then_some(plaintext)
}

/// Everything from the first occurrence of `signature` to the end of `data`.
#[must_use]
pub fn carve_tail(data: &[u8], signature: Signature) -> Option<CarvedSegment> {
    let start = memchr::memmem::find(data, signature.header_bytes())?;
    Some(CarvedSegment::new(start, data.len(), data[start..].to_vec()))
}
