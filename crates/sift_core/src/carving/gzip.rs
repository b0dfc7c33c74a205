//! Deterministic gzip member parsing.
//!
//! Walks the RFC 1952 framing field by field instead of guessing where the
//! member ends: header, raw deflate body, then the 8-byte trailer.

use serde::Serialize;

use super::inflate::inflate_stream;
use crate::error::{CoreError, Result};
use crate::types::{ByteRange, CarvedSegment};

pub const GZIP_MAGIC: [u8; 3] = [0x1F, 0x8B, 0x08];
pub const METHOD_DEFLATE: u8 = 8;
pub const TRAILER_LEN: usize = 8;

pub const FLAG_TEXT: u8 = 0x01;
pub const FLAG_HCRC: u8 = 0x02;
pub const FLAG_EXTRA: u8 = 0x04;
pub const FLAG_NAME: u8 = 0x08;
pub const FLAG_COMMENT: u8 = 0x10;
const FLAG_RESERVED: u8 = 0xE0;

const FIXED_HEADER_LEN: usize = 10;
const MAX_PLAINTEXT: usize = 1 << 30;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GzipHeader {
    pub offset: usize,
    pub method: u8,
    pub flags: u8,
    /// Seconds since the Unix epoch, zero when the writer left it unset.
    pub mtime: u32,
    pub extra_flags: u8,
    pub os: u8,
    pub extra: Option<Vec<u8>>,
    pub file_name: Option<String>,
    pub comment: Option<String>,
    pub header_crc: Option<u16>,
    /// Bytes from the magic to the start of the deflate body.
    pub header_len: usize,
}

impl GzipHeader {
    #[inline]
    #[must_use]
    pub fn is_text(&self) -> bool {
        self.flags & FLAG_TEXT != 0
    }

    #[must_use]
    pub fn os_name(&self) -> &'static str {
        match self.os {
            0 => "FAT",
            1 => "Amiga",
            2 => "VMS",
            3 => "Unix",
            4 => "VM/CMS",
            5 => "Atari TOS",
            6 => "HPFS",
            7 => "Macintosh",
            8 => "Z-System",
            9 => "CP/M",
            10 => "TOPS-20",
            11 => "NTFS",
            12 => "QDOS",
            13 => "Acorn RISCOS",
            255 => "unknown",
            _ => "reserved",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GzipTrailer {
    pub crc32: u32,
    /// Plaintext length modulo 2^32.
    pub isize: u32,
}

/// A member carved by walking its framing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeaderCarve {
    pub header: GzipHeader,
    pub segment: CarvedSegment,
    pub trailer: GzipTrailer,
    pub computed_crc: u32,
    /// Whatever follows the trailer in the source buffer.
    pub unused: ByteRange,
}

impl HeaderCarve {
    /// Whether the stored trailer agrees with the inflated plaintext.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.trailer.crc32 == self.computed_crc
            && self.trailer.isize == self.segment.plaintext.len() as u32
    }

    #[must_use]
    pub fn unused_bytes<'a>(&self, data: &'a [u8]) -> &'a [u8] {
        self.unused.slice(data).unwrap_or(&[])
    }
}

struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
    origin: usize,
}

impl<'a> Cursor<'a> {
    fn take(&mut self, n: usize, what: &str) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.buf.len())
            .ok_or_else(|| CoreError::header(self.origin, format!("{what} overruns the buffer")))?;
        let bytes = &self.buf[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    fn u16_le(&mut self, what: &str) -> Result<u16> {
        let b = self.take(2, what)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    fn u32_le(&mut self, what: &str) -> Result<u32> {
        let b = self.take(4, what)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Latin-1 text up to a NUL, which is consumed.
    fn zero_terminated(&mut self, what: &str) -> Result<String> {
        let rest = &self.buf[self.pos..];
        let len = memchr::memchr(0, rest)
            .ok_or_else(|| CoreError::header(self.origin, format!("{what} is unterminated")))?;
        let text = rest[..len].iter().copied().map(char::from).collect();
        self.pos += len + 1;
        Ok(text)
    }
}

/// Parses the header of the member whose magic sits at `magic_offset`.
pub fn parse_header(data: &[u8], magic_offset: usize) -> Result<GzipHeader> {
    let mut cur = Cursor {
        buf: data,
        pos: magic_offset,
        origin: magic_offset,
    };

    let fixed = cur.take(FIXED_HEADER_LEN, "fixed header")?;
    if fixed[..2] != GZIP_MAGIC[..2] {
        return Err(CoreError::header(magic_offset, "missing gzip magic"));
    }
    let method = fixed[2];
    if method != METHOD_DEFLATE {
        return Err(CoreError::header(
            magic_offset,
            format!("unsupported compression method {method}"),
        ));
    }
    let flags = fixed[3];
    if flags & FLAG_RESERVED != 0 {
        return Err(CoreError::header(
            magic_offset,
            format!("reserved flag bits set ({flags:#04x})"),
        ));
    }
    let mtime = u32::from_le_bytes([fixed[4], fixed[5], fixed[6], fixed[7]]);
    let extra_flags = fixed[8];
    let os = fixed[9];

    let extra = if flags & FLAG_EXTRA != 0 {
        let len = usize::from(cur.u16_le("extra field length")?);
        Some(cur.take(len, "extra field")?.to_vec())
    } else {
        None
    };
    let file_name = if flags & FLAG_NAME != 0 {
        Some(cur.zero_terminated("file name")?)
    } else {
        None
    };
    let comment = if flags & FLAG_COMMENT != 0 {
        Some(cur.zero_terminated("comment")?)
    } else {
        None
    };
    let header_crc = if flags & FLAG_HCRC != 0 {
        let expected = crc32fast::hash(&data[magic_offset..cur.pos]) as u16;
        let stored = cur.u16_le("header crc")?;
        if stored != expected {
            return Err(CoreError::header(
                magic_offset,
                format!("header crc {stored:#06x} != computed {expected:#06x}"),
            ));
        }
        Some(stored)
    } else {
        None
    };

    Ok(GzipHeader {
        offset: magic_offset,
        method,
        flags,
        mtime,
        extra_flags,
        os,
        extra,
        file_name,
        comment,
        header_crc,
        header_len: cur.pos - magic_offset,
    })
}

/// Parses header, body and trailer of the member at `magic_offset`.
pub fn parse_member(data: &[u8], magic_offset: usize) -> Result<HeaderCarve> {
    let header = parse_header(data, magic_offset)?;
    let body_start = magic_offset + header.header_len;

    let inflated = inflate_stream(&data[body_start..], false, MAX_PLAINTEXT).map_err(|message| {
        CoreError::Inflate {
            offset: body_start,
            message,
        }
    })?;

    let mut cur = Cursor {
        buf: data,
        pos: body_start + inflated.consumed,
        origin: magic_offset,
    };
    let trailer = GzipTrailer {
        crc32: cur.u32_le("trailer crc")?,
        isize: cur.u32_le("trailer size")?,
    };
    let end_offset = cur.pos;
    let computed_crc = crc32fast::hash(&inflated.plaintext);

    Ok(HeaderCarve {
        header,
        segment: CarvedSegment::new(magic_offset, end_offset, inflated.plaintext),
        trailer,
        computed_crc,
        unused: ByteRange::new(end_offset, data.len()),
    })
}
