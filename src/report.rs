use chrono::DateTime;
use humansize::{BINARY, format_size};

use sift_core::hexdump::hex_dump_lines;

use crate::analysis::{CarveMode, HeaderDetails, StreamAnalysis};
use sift_core::CarveOutcome;

pub const DEFAULT_HEX_LIMIT: usize = 64;
pub const DEFAULT_MAX_STRINGS: usize = 50;

#[derive(Debug, Clone)]
pub struct ReportOptions {
    /// Bytes of the stream head shown in the hex dump.
    pub hex_limit: usize,
    /// Strings listed per candidate group.
    pub max_strings: usize,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            hex_limit: DEFAULT_HEX_LIMIT,
            max_strings: DEFAULT_MAX_STRINGS,
        }
    }
}

/// Human-readable rendering of one stream analysis.
#[must_use]
pub fn render(analysis: &StreamAnalysis, options: &ReportOptions) -> Vec<String> {
    let mut out = Vec::new();
    out.push(format!("== {} ({}) ==", analysis.name, analysis.profile));
    out.push(format!(
        "size: {} ({} bytes)",
        format_size(analysis.size, BINARY),
        analysis.size
    ));
    out.push(format!("sha256: {}", analysis.sha256));

    if !analysis.head.is_empty() && options.hex_limit > 0 {
        out.push(String::new());
        out.push(format!("head ({} bytes):", options.hex_limit.min(analysis.head.len())));
        out.extend(
            hex_dump_lines(&analysis.head, options.hex_limit)
                .into_iter()
                .map(|l| format!("  {l}")),
        );
    }

    if !analysis.leading_words.is_empty() {
        let words: Vec<String> = analysis
            .leading_words
            .iter()
            .take(8)
            .map(|(_, w)| format!("{w:08X}"))
            .collect();
        out.push(format!("leading u32 LE: {}", words.join(" ")));
    }

    if !analysis.census.is_empty() {
        let hits: Vec<String> = analysis
            .census
            .iter()
            .map(|h| format!("{}@0x{:X}", h.signature, h.offset))
            .collect();
        out.push(format!("signatures: {}", hits.join(" ")));
    }

    render_carve(analysis, &mut out);

    if !analysis.embedded.is_empty() {
        out.push(String::new());
        out.push("embedded streams:".to_string());
        for stream in &analysis.embedded {
            out.push(format!(
                "  {}@0x{:X}: {} bytes in, {} bytes out",
                stream.wrapper, stream.offset, stream.consumed, stream.plaintext_len
            ));
        }
    }

    if !analysis.pairs.is_empty() {
        out.push(String::new());
        out.push("u32 pairs:".to_string());
        for (offset, a, b) in analysis.pairs.iter().take(options.max_strings) {
            out.push(format!("  0x{offset:06X}: {a:>10} {b:>10}"));
        }
    }

    if let Some(author) = &analysis.author {
        out.push(String::new());
        out.push(format!("author candidate: {author}"));
    }

    for group in &analysis.groups {
        if group.strings.is_empty() {
            continue;
        }
        out.push(String::new());
        out.push(format!(
            "strings [{} / {}]: {}",
            group.label,
            group.source,
            group.strings.len()
        ));
        for c in group.strings.iter().take(options.max_strings) {
            out.push(format!("  0x{:06X} {}", c.range.start, c.text));
        }
        if group.strings.len() > options.max_strings {
            out.push(format!("  ... {} more", group.strings.len() - options.max_strings));
        }
    }

    if let Some(record) = &analysis.metadata {
        if !record.fields.is_empty() {
            out.push(String::new());
            out.push("fields:".to_string());
            for (key, value) in &record.fields {
                out.push(format!("  {key} = {value}"));
            }
        }
        let hints = &record.hints;
        if !hints.is_empty() {
            out.push(String::new());
            out.push("hints:".to_string());
            if let Some(build) = &hints.build {
                out.push(format!("  build: {build}"));
            }
            if let Some(bits) = hints.platform_bits {
                out.push(format!("  platform: {bits}-bit"));
            }
            if let Some(version) = &hints.format_version {
                out.push(format!("  format version: {version}"));
            }
            for path in &hints.paths {
                out.push(format!("  path: {path}"));
            }
        }
        if !record.identifiers.is_empty() {
            out.push(String::new());
            out.push("identifiers:".to_string());
            for id in &record.identifiers {
                out.push(format!("  {id}"));
            }
        }
    }

    if let Some(preview) = &analysis.preview {
        out.push(String::new());
        let dims = match (preview.width, preview.height) {
            (Some(w), Some(h)) => format!("{w}x{h}"),
            _ => "unknown size".to_string(),
        };
        out.push(format!(
            "preview: PNG {dims}, {} at {}",
            format_size(preview.range.len(), BINARY),
            preview.range
        ));
    }

    if !analysis.notes.is_empty() {
        out.push(String::new());
        out.push("notes:".to_string());
        for note in &analysis.notes {
            out.push(format!("  - {note}"));
        }
    }
    out
}

fn render_carve(analysis: &StreamAnalysis, out: &mut Vec<String>) {
    let Some(outcome) = &analysis.carve else {
        return;
    };
    out.push(String::new());
    let mode = match analysis.carve_mode {
        Some(CarveMode::BackwardSearch) => "backward search",
        Some(CarveMode::HeaderParse) => "header parse",
        Some(CarveMode::HeaderFallback) => "backward search after header failure",
        None => "n/a",
    };
    out.push(format!("carve: {} ({mode})", outcome.label()));

    if let CarveOutcome::Carved(seg) = outcome {
        out.push(format!(
            "  segment: {} ({} compressed, {} plaintext)",
            seg.range(),
            format_size(seg.compressed_len, BINARY),
            format_size(seg.plaintext.len(), BINARY)
        ));
        if let Some(digest) = &analysis.plaintext_sha256 {
            out.push(format!("  plaintext sha256: {digest}"));
        }
    }
    if let Some(details) = &analysis.header {
        render_header(details, out);
    }
    if let Some(unused) = analysis.unused.filter(|r| !r.is_empty()) {
        out.push(format!("  unused after segment: {} bytes at {unused}", unused.len()));
    }
}

fn render_header(details: &HeaderDetails, out: &mut Vec<String>) {
    let header = &details.header;
    let mtime = if header.mtime == 0 {
        "unset".to_string()
    } else {
        DateTime::from_timestamp(i64::from(header.mtime), 0)
            .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
            .unwrap_or_else(|| header.mtime.to_string())
    };
    out.push(format!(
        "  gzip header: flags 0x{:02X}, mtime {mtime}, xfl {}, os {} ({}), {} bytes",
        header.flags,
        header.extra_flags,
        header.os,
        header.os_name(),
        header.header_len
    ));
    if let Some(name) = &header.file_name {
        out.push(format!("  name: {name}"));
    }
    if let Some(comment) = &header.comment {
        out.push(format!("  comment: {comment}"));
    }
    if let Some(extra) = &header.extra {
        out.push(format!("  extra: {}", hex::encode(extra)));
    }
    out.push(format!(
        "  trailer: crc {:08X} size {} / computed crc {:08X} [{}]",
        details.trailer.crc32,
        details.trailer.isize,
        details.computed_crc,
        if details.consistent { "ok" } else { "MISMATCH" }
    ));
}
