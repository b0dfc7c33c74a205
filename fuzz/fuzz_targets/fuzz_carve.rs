#![no_main]

use libfuzzer_sys::fuzz_target;

use sift_core::carving::scan_embedded_streams;
use sift_core::{CarveOutcome, CarverConfig, SegmentCarver};

// Byte 0 selects the carver options, the rest is the stream.
fuzz_target!(|data: &[u8]| {
    let Some((&flags, stream)) = data.split_first() else {
        return;
    };
    let config = CarverConfig::default()
        .with_trailer_probe(flags & 1 != 0)
        .with_try_later_signatures(flags & 2 != 0);
    let carver = SegmentCarver::with_config(config);

    if let CarveOutcome::Carved(seg) = carver.carve(stream) {
        assert!(seg.magic_offset < seg.end_offset);
        assert!(seg.end_offset <= stream.len());
        assert_eq!(seg.compressed_len, seg.end_offset - seg.magic_offset);
    }

    if let Ok(Some(carve)) = carver.carve_with_header(stream) {
        assert!(carve.segment.end_offset <= stream.len());
        assert_eq!(carve.unused.end, stream.len());
        let _ = scan_embedded_streams(carve.unused_bytes(stream), 1);
    }
});
