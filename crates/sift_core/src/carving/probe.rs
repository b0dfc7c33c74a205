//! Best-effort discovery of small compressed streams in leftover bytes.

use std::io::Read;

use flate2::bufread::GzDecoder;
use serde::Serialize;
use tracing::debug;

use super::inflate::inflate_stream;

const PROBE_LIMIT: usize = 16 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum StreamWrapper {
    Zlib,
    RawDeflate,
    Gzip,
}

impl StreamWrapper {
    pub const ALL: [StreamWrapper; 3] = [Self::Zlib, Self::RawDeflate, Self::Gzip];

    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Zlib => "zlib",
            Self::RawDeflate => "deflate",
            Self::Gzip => "gzip",
        }
    }

    /// Decodes one stream from the front of `data`, tolerating trailing
    /// bytes. Returns the plaintext and the input length used.
    #[must_use]
    pub fn decode(&self, data: &[u8]) -> Option<(Vec<u8>, usize)> {
        match self {
            Self::Zlib => inflate_stream(data, true, PROBE_LIMIT)
                .ok()
                .map(|i| (i.plaintext, i.consumed)),
            Self::RawDeflate => inflate_stream(data, false, PROBE_LIMIT)
                .ok()
                .map(|i| (i.plaintext, i.consumed)),
            Self::Gzip => {
                let mut decoder = GzDecoder::new(data);
                let mut out = Vec::new();
                decoder
                    .by_ref()
                    .take(PROBE_LIMIT as u64 + 1)
                    .read_to_end(&mut out)
                    .ok()?;
                if out.len() > PROBE_LIMIT {
                    return None;
                }
                let consumed = data.len() - decoder.into_inner().len();
                Some((out, consumed))
            }
        }
    }
}

impl std::fmt::Display for StreamWrapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmbeddedStream {
    pub offset: usize,
    pub wrapper: StreamWrapper,
    pub consumed: usize,
    pub plaintext_len: usize,
    #[serde(skip)]
    pub plaintext: Vec<u8>,
}

/// Tries each wrapper against the whole of `data`.
#[must_use]
pub fn probe_wrappers(data: &[u8]) -> Vec<EmbeddedStream> {
    StreamWrapper::ALL
        .iter()
        .filter_map(|&wrapper| {
            wrapper.decode(data).map(|(plaintext, consumed)| EmbeddedStream {
                offset: 0,
                wrapper,
                consumed,
                plaintext_len: plaintext.len(),
                plaintext,
            })
        })
        .collect()
}

/// Tries every wrapper at every offset, keeping decodes that yield at least
/// `min_out_len` bytes. A hit skips the scan past the input it consumed.
#[must_use]
pub fn scan_embedded_streams(data: &[u8], min_out_len: usize) -> Vec<EmbeddedStream> {
    let mut found = Vec::new();
    let mut offset = 0;

    while offset < data.len() {
        let window = &data[offset..];
        let hit = StreamWrapper::ALL.iter().find_map(|&wrapper| {
            wrapper
                .decode(window)
                .filter(|(plaintext, _)| plaintext.len() >= min_out_len.max(1))
                .map(|(plaintext, consumed)| EmbeddedStream {
                    offset,
                    wrapper,
                    consumed,
                    plaintext_len: plaintext.len(),
                    plaintext,
                })
        });

        match hit {
            Some(stream) => {
                debug!(
                    offset = stream.offset,
                    wrapper = %stream.wrapper,
                    plaintext_len = stream.plaintext_len,
                    "embedded stream"
                );
                offset += stream.consumed.max(1);
                found.push(stream);
            }
            None => offset += 1,
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::{GzEncoder, ZlibEncoder};
    use std::io::Write;

    fn zlib(data: &[u8]) -> Vec<u8> {
        let mut enc = ZlibEncoder::new(Vec::new(), Compression::default());
        enc.write_all(data).unwrap();
        enc.finish().unwrap()
    }

    #[test]
    fn probe_identifies_zlib_framing() {
        let hits = probe_wrappers(&zlib(b"element table element table"));
        assert!(hits.iter().any(|h| h.wrapper == StreamWrapper::Zlib
            && h.plaintext == b"element table element table"));
    }

    #[test]
    fn probe_identifies_gzip_framing() {
        let mut enc = GzEncoder::new(Vec::new(), Compression::default());
        enc.write_all(b"gzip payload").unwrap();
        let data = enc.finish().unwrap();
        let hits = probe_wrappers(&data);
        let gz = hits.iter().find(|h| h.wrapper == StreamWrapper::Gzip).unwrap();
        assert_eq!(gz.plaintext, b"gzip payload");
        assert_eq!(gz.consumed, data.len());
    }

    #[test]
    fn scan_finds_zlib_at_nonzero_offset() {
        let payload: Vec<u8> = b"ContentDocument ".repeat(32);
        let mut data = vec![0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF];
        data.extend(zlib(&payload));
        data.extend([0xFF; 5]);

        let found = scan_embedded_streams(&data, 64);
        let stream = found
            .iter()
            .find(|s| s.plaintext == payload)
            .expect("embedded zlib stream");
        assert_eq!(stream.offset, 7);
        assert_eq!(stream.wrapper, StreamWrapper::Zlib);
    }

    #[test]
    fn nothing_in_empty_or_noise() {
        assert!(scan_embedded_streams(&[], 1).is_empty());
        assert!(probe_wrappers(&[0xFF; 16]).is_empty());
    }
}
