#![no_main]

use libfuzzer_sys::fuzz_target;

use sift_core::MetadataExtractor;

fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data);
    let record = MetadataExtractor::new().extract(text.lines());

    let mut sorted = record.identifiers.clone();
    sorted.sort();
    sorted.dedup();
    assert_eq!(sorted, record.identifiers);
    assert!(record.fields.keys().all(|k| !k.is_empty()));
});
