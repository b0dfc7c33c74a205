#![no_main]

use libfuzzer_sys::fuzz_target;

use sift_core::{Endian, PrefixWidth, TextDecoder};

fuzz_target!(|data: &[u8]| {
    let decoder = TextDecoder::new();

    for c in decoder.ascii_runs(data) {
        assert!(c.range.end <= data.len());
        assert_eq!(c.text.len(), c.range.len());
    }
    for c in decoder.utf16le_runs_all_alignments(data) {
        assert!(c.range.end <= data.len());
        assert_eq!(c.text.len() * 2, c.range.len());
    }
    for endian in [Endian::Little, Endian::Big] {
        let decoded = decoder.decode_utf16_lines(data, endian);
        assert!(decoded.lines.iter().all(|l| !l.text.is_empty()));
        assert!((0.0..=1.0).contains(&decoded.printable_ratio));
    }
    for prefix in [PrefixWidth::U16, PrefixWidth::U32] {
        for c in decoder.length_prefixed_utf16(data, prefix) {
            assert!(c.range.end <= data.len());
        }
    }
    let _ = decoder.length_prefixed_ascii(data);
});
