use std::io::Write;

use flate2::write::{GzEncoder, ZlibEncoder};
use flate2::{Compression, GzBuilder};

use sift::analysis::{CarveMode, TextSource};
use sift::{Analyzer, AnalyzerConfig, ReportOptions, StreamProfile, render};
use sift_core::CarveOutcome;
use sift_io::NamedStream;

fn utf16le(s: &str) -> Vec<u8> {
    s.encode_utf16().flat_map(u16::to_le_bytes).collect()
}

fn utf16be(s: &str) -> Vec<u8> {
    s.encode_utf16().flat_map(u16::to_be_bytes).collect()
}

fn gzip(payload: &[u8]) -> Vec<u8> {
    let mut enc = GzEncoder::new(Vec::new(), Compression::default());
    enc.write_all(payload).unwrap();
    enc.finish().unwrap()
}

fn minimal_png(width: u32, height: u32) -> Vec<u8> {
    let mut png = vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
    let mut ihdr = b"IHDR".to_vec();
    ihdr.extend(width.to_be_bytes());
    ihdr.extend(height.to_be_bytes());
    ihdr.extend([8, 6, 0, 0, 0]);
    png.extend(13u32.to_be_bytes());
    png.extend(&ihdr);
    png.extend(crc32fast::hash(&ihdr).to_be_bytes());
    png.extend([0, 0, 0, 0]);
    png.extend(b"IEND");
    png.extend(crc32fast::hash(b"IEND").to_be_bytes());
    png
}

#[test]
fn contents_yields_author_and_identifiers() {
    let mut plaintext = vec![0x04, 0x00, 0x00, 0x00];
    plaintext.extend(utf16le("mkowalski"));
    plaintext.extend([0x00, 0x00, 0x02, 0x00]);
    plaintext.extend(utf16le("7d9c0b1e-2f3a-4b5c-9d6e-7f8091a2b3c4"));

    let mut stream = vec![0x0Au8; 40];
    stream.extend(gzip(&plaintext));
    stream.extend([0x00, 0x11, 0x22, 0x33]);

    let analysis = Analyzer::new().analyze("Contents", &stream);
    assert_eq!(analysis.profile, StreamProfile::Contents);
    assert_eq!(analysis.carve_mode, Some(CarveMode::BackwardSearch));
    let seg = analysis.carve.as_ref().and_then(CarveOutcome::segment).unwrap();
    assert_eq!(seg.magic_offset, 40);
    assert_eq!(seg.plaintext, plaintext);
    assert_eq!(analysis.author.as_deref(), Some("mkowalski"));
    assert_eq!(
        analysis.metadata.as_ref().and_then(|m| m.primary_identifier()),
        Some("7d9c0b1e-2f3a-4b5c-9d6e-7f8091a2b3c4")
    );
    assert!(analysis.group("utf16le", TextSource::Plaintext).is_some());
    assert!(analysis.plaintext_sha256.is_some());
}

#[test]
fn contents_without_member_falls_back_to_raw_strings() {
    let mut stream = vec![0xFFu8; 8];
    stream.extend(utf16le("Raw Author"));
    let analysis = Analyzer::new().analyze("Contents", &stream);
    assert_eq!(analysis.carve, Some(CarveOutcome::NoSegmentFound));
    assert_eq!(analysis.author.as_deref(), Some("Raw Author"));
    assert!(analysis.group("utf16le", TextSource::Raw).is_some());
}

#[test]
fn basic_file_info_fields_and_hints() {
    let mut stream = utf16le("20210224_1515(x64) 64$ C:\\Projects\\Tower Core.rvt ");
    stream.extend([0u8; 4]);
    stream.extend(utf16be(
        "Worksharing: Not enabled\nUsername: alee\nLast Save Path: C:\\Projects\\Tower Core.rvt\n\
         Unique Document GUID: 0a1b2c3d-4e5f-6071-8293-a4b5c6d7e8f9\n",
    ));

    let analysis = Analyzer::new().analyze("BasicFileInfo", &stream);
    assert!(analysis.carve.is_none());
    let record = analysis.metadata.as_ref().unwrap();
    assert_eq!(record.field("worksharing"), Some("Not enabled"));
    assert_eq!(record.field("username"), Some("alee"));
    assert_eq!(record.field("last_save_path"), Some("C:\\Projects\\Tower Core.rvt"));
    assert_eq!(
        record.primary_identifier(),
        Some("0a1b2c3d-4e5f-6071-8293-a4b5c6d7e8f9")
    );
    assert_eq!(record.hints.build.as_deref(), Some("20210224_1515(x64)"));
    assert_eq!(record.hints.platform_bits, Some(64));
    assert_eq!(
        record.hints.original_path(),
        Some("C:\\Projects\\Tower Core.rvt")
    );
}

#[test]
fn content_documents_parse_header_and_probe_leftover() {
    let mut enc = GzBuilder::new()
        .filename("ContentDocuments")
        .write(Vec::new(), Compression::default());
    enc.write_all(&utf16le("DocumentSchema")).unwrap();
    let member = enc.finish().unwrap();

    let mut zlib = ZlibEncoder::new(Vec::new(), Compression::default());
    zlib.write_all(&utf16le("EmbeddedPartName").repeat(4)).unwrap();
    let zlib = zlib.finish().unwrap();

    let mut stream = vec![0x05, 0x00, 0x00, 0x00];
    stream.extend(&member);
    let leftover_at = stream.len();
    stream.extend([0xFF, 0xFF]);
    stream.extend(&zlib);

    let analysis = Analyzer::new().analyze("Global/ContentDocuments", &stream);
    assert_eq!(analysis.carve_mode, Some(CarveMode::HeaderParse));
    let details = analysis.header.as_ref().unwrap();
    assert!(details.consistent);
    assert_eq!(details.header.file_name.as_deref(), Some("ContentDocuments"));
    assert_eq!(analysis.unused.unwrap().start, leftover_at);

    assert_eq!(analysis.embedded.len(), 1);
    let offset = analysis.embedded[0].offset;
    assert_eq!(offset, leftover_at + 2);
    let embedded = analysis
        .group("utf16le", TextSource::Embedded { offset })
        .unwrap();
    assert!(embedded.strings.iter().any(|c| c.text.contains("EmbeddedPartName")));
    let plain = analysis.group("utf16le", TextSource::Plaintext).unwrap();
    assert_eq!(plain.strings[0].text, "DocumentSchema");
}

#[test]
fn truncated_member_falls_back_then_fails() {
    let member = gzip(b"Metre Millimetre Centimetre Kilometre");
    let mut stream = b"lead".to_vec();
    stream.extend(&member[..member.len() - 12]);

    let analysis = Analyzer::new().analyze("Formats/Latest", &stream);
    assert_eq!(analysis.carve_mode, Some(CarveMode::HeaderFallback));
    assert!(analysis.notes.iter().any(|n| n.starts_with("header parse failed")));
    assert_eq!(
        analysis.carve,
        Some(CarveOutcome::CarveFailed { magic_offset: 4 })
    );
    assert!(analysis.header.is_none());
}

#[test]
fn formats_lists_prefixed_names() {
    let mut plaintext = Vec::new();
    for name in ["Metre", "Square Metre", "Degree"] {
        plaintext.extend((name.len() as u16).to_le_bytes());
        plaintext.extend(name.as_bytes());
    }
    let stream = gzip(&plaintext);

    let analysis = Analyzer::new().analyze("Formats/Latest", &stream);
    assert_eq!(analysis.carve_mode, Some(CarveMode::HeaderParse));
    let names: Vec<_> = analysis
        .group("prefixed-ascii/u16", TextSource::Plaintext)
        .unwrap()
        .strings
        .iter()
        .map(|c| c.text.as_str())
        .collect();
    assert_eq!(names, vec!["Metre", "Square Metre", "Degree"]);
}

#[test]
fn preview_reports_dimensions() {
    let mut stream = vec![0u8; 300];
    stream.extend(minimal_png(128, 96));

    let analysis = Analyzer::new().analyze("RevitPreview4.0", &stream);
    let preview = analysis.preview.as_ref().unwrap();
    assert_eq!(preview.range.start, 300);
    assert_eq!((preview.width, preview.height), (Some(128), Some(96)));
    assert_eq!(preview.bytes, minimal_png(128, 96));

    let lines = render(&analysis, &ReportOptions::default());
    assert!(lines.iter().any(|l| l.starts_with("preview: PNG 128x96")));
}

#[test]
fn increment_table_pairs() {
    let mut plaintext = Vec::new();
    for (a, b) in [(1u32, 10u32), (2, 20), (3, 30)] {
        plaintext.extend(a.to_le_bytes());
        plaintext.extend(b.to_le_bytes());
    }
    let analysis = Analyzer::new().analyze("Global/DocumentIncrementTable", &gzip(&plaintext));
    assert_eq!(analysis.pairs, vec![(0, 1, 10), (8, 2, 20), (16, 3, 30)]);
}

#[test]
fn analyze_all_preserves_order() {
    let streams: Vec<NamedStream> = (0..24)
        .map(|i| NamedStream::new(format!("Partitions/{i}"), gzip(format!("part {i}").as_bytes())))
        .collect();
    let analyses = Analyzer::with_config(AnalyzerConfig::default()).analyze_all(&streams);
    assert_eq!(analyses.len(), streams.len());
    for (stream, analysis) in streams.iter().zip(&analyses) {
        assert_eq!(stream.name, analysis.name);
        assert_eq!(analysis.stub, stream.stub());
        assert!(analysis.carve.as_ref().is_some_and(CarveOutcome::is_carved));
    }
}

#[test]
fn json_omits_raw_buffers() {
    let analysis = Analyzer::new().analyze("Contents", &gzip(&utf16le("someone")));
    let json = serde_json::to_value(&analysis).unwrap();
    assert_eq!(json["profile"], "Contents");
    assert_eq!(json["carve"]["status"], "carved");
    assert!(json.get("head").is_none());
    assert!(json["carve"].get("plaintext").is_none());
}
