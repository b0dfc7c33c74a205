use std::io::Write;

use flate2::write::GzEncoder;
use flate2::{Compression, GzBuilder};
use proptest::prelude::*;

use sift_core::carving::{StreamWrapper, carve_tail, scan_embedded_streams};
use sift_core::{
    CarveOutcome, CarverConfig, CoreError, MetadataExtractor, SegmentCarver, Signature,
    SignatureIndex,
};

fn gzip(payload: &[u8]) -> Vec<u8> {
    let mut enc = GzEncoder::new(Vec::new(), Compression::default());
    enc.write_all(payload).unwrap();
    enc.finish().unwrap()
}

fn create_garbage(size: usize, seed: u8) -> Vec<u8> {
    let mut data = Vec::with_capacity(size);
    let mut state = seed as u32;
    for _ in 0..size {
        state = state.wrapping_mul(1103515245).wrapping_add(12345);
        data.push((state >> 16) as u8);
    }
    data
}

/// Bytes that can never form the gzip magic.
fn magic_free_strategy(max: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>().prop_filter("no 0x1F", |b| *b != 0x1F), 0..max)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn carve_recovers_embedded_member(
        prefix in magic_free_strategy(64),
        payload in prop::collection::vec(any::<u8>(), 0..512),
        suffix in prop::collection::vec(any::<u8>(), 0..64),
    ) {
        let member = gzip(&payload);
        let mut data = prefix.clone();
        data.extend(&member);
        data.extend(&suffix);

        let outcome = SegmentCarver::new().carve(&data);
        let seg = outcome.segment().expect("member carved");
        prop_assert_eq!(seg.magic_offset, prefix.len());
        prop_assert_eq!(seg.end_offset, prefix.len() + member.len());
        prop_assert_eq!(&seg.plaintext, &payload);
    }

    #[test]
    fn trailer_probe_never_changes_the_result(
        prefix in magic_free_strategy(32),
        payload in prop::collection::vec(any::<u8>(), 1..256),
        suffix in prop::collection::vec(any::<u8>(), 0..32),
    ) {
        let mut data = prefix;
        data.extend(gzip(&payload));
        data.extend(suffix);

        let plain = SegmentCarver::new().carve(&data);
        let probed = SegmentCarver::with_config(CarverConfig::default().with_trailer_probe(true))
            .carve(&data);
        prop_assert_eq!(plain, probed);
    }

    #[test]
    fn carving_is_deterministic(
        prefix in prop::collection::vec(any::<u8>(), 0..48),
        payload in prop::collection::vec(any::<u8>(), 0..256),
        suffix in prop::collection::vec(any::<u8>(), 0..48),
    ) {
        let mut data = prefix;
        data.extend(gzip(&payload));
        data.extend(suffix);

        let carver = SegmentCarver::new();
        let first = carver.carve(&data);
        let second = carver.carve(&data);
        prop_assert_eq!(first.segment(), second.segment());
        prop_assert_eq!(first, second);
    }

    #[test]
    fn carving_arbitrary_bytes_never_panics(data in prop::collection::vec(any::<u8>(), 0..256)) {
        let carver = SegmentCarver::new();
        let _ = carver.carve(&data);
        let _ = carver.carve_with_header(&data);
    }
}

#[test]
fn carve_inside_garbage() {
    let payload = b"Autodesk Revit family content".repeat(8);
    let mut data: Vec<u8> = create_garbage(300, 7)
        .into_iter()
        .map(|b| if b == 0x1F { 0 } else { b })
        .collect();
    let start = data.len();
    data.extend(gzip(&payload));
    data.extend(create_garbage(200, 9));

    let seg = SegmentCarver::new().carve(&data).into_segment().unwrap();
    assert_eq!(seg.magic_offset, start);
    assert_eq!(seg.plaintext, payload);
}

#[test]
fn truncated_member_fails_in_both_modes() {
    let member = gzip(&create_garbage(2048, 3));
    let mut data = vec![0u8; 12];
    data.extend(&member[..member.len() - 20]);

    let carver = SegmentCarver::new();
    assert_eq!(carver.carve(&data), CarveOutcome::CarveFailed { magic_offset: 12 });
    assert!(matches!(
        carver.carve_with_header(&data),
        Err(CoreError::Inflate { .. })
    ));
}

#[test]
fn header_mode_recovers_name_and_comment() {
    let mut enc = GzBuilder::new()
        .filename("Contents.xml")
        .comment("sift fixture")
        .mtime(1_262_304_000)
        .write(Vec::new(), Compression::best());
    enc.write_all(b"<contents/>").unwrap();
    let member = enc.finish().unwrap();

    let mut data = b"\x00\x01\x02\x03".to_vec();
    data.extend(&member);
    data.extend(b"tail");

    let carve = SegmentCarver::new().carve_with_header(&data).unwrap().unwrap();
    assert_eq!(carve.header.file_name.as_deref(), Some("Contents.xml"));
    assert_eq!(carve.header.comment.as_deref(), Some("sift fixture"));
    assert_eq!(carve.header.mtime, 1_262_304_000);
    assert!(carve.is_consistent());
    assert_eq!(carve.segment.plaintext, b"<contents/>");
    assert_eq!(carve.unused_bytes(&data), b"tail");
}

#[test]
fn reserved_flag_bit_is_malformed() {
    let mut member = gzip(b"flagged");
    member[3] |= 0x80;
    assert!(matches!(
        SegmentCarver::new().carve_with_header(&member),
        Err(CoreError::HeaderMalformed { offset: 0, .. })
    ));
}

#[test]
fn leftover_after_trailer_holds_embedded_zlib() {
    let mut zlib = flate2::write::ZlibEncoder::new(Vec::new(), Compression::default());
    zlib.write_all(&b"element ".repeat(40)).unwrap();
    let zlib = zlib.finish().unwrap();

    let mut data = gzip(b"primary");
    data.extend([0xFF, 0xFF, 0xFF]);
    data.extend(&zlib);

    let carve = SegmentCarver::new().carve_with_header(&data).unwrap().unwrap();
    let unused = carve.unused_bytes(&data);
    let found = scan_embedded_streams(unused, 32);
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].offset, 3);
    assert_eq!(found[0].wrapper, StreamWrapper::Zlib);
    assert_eq!(found[0].plaintext, b"element ".repeat(40));
}

#[test]
fn census_and_tail_carve_agree_on_preview() {
    let mut data = vec![0u8; 32];
    data.extend(Signature::Png.header_bytes());
    data.extend(create_garbage(64, 1));

    let hits = SignatureIndex::new(&[Signature::Png]).find_all(&data);
    assert_eq!(hits.len(), 1);
    let seg = carve_tail(&data, Signature::Png).unwrap();
    assert_eq!(seg.magic_offset, hits[0].offset);
    assert_eq!(seg.plaintext.len(), data.len() - 32);
}

#[test]
fn fields_from_member_followed_by_garbage() {
    let mut data = gzip(b"A:1\nB:2");
    data.extend(create_garbage(96, 5));

    let seg = SegmentCarver::new().carve(&data).into_segment().unwrap();
    assert_eq!(seg.magic_offset, 0);
    let text = String::from_utf8(seg.plaintext).unwrap();
    let record = MetadataExtractor::new().extract(text.lines());
    assert_eq!(record.fields.len(), 2);
    assert_eq!(record.field("a"), Some("1"));
    assert_eq!(record.field("b"), Some("2"));
    assert!(record.residual.is_empty());
}
