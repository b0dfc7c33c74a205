pub mod carving;
mod error;
pub mod hexdump;
pub mod metadata;
pub mod scanner;
pub mod text;
mod types;

pub use carving::{CarveOutcome, CarverConfig, SegmentCarver, Signature, SignatureIndex};
pub use error::{CoreError, Result};
pub use metadata::{ExtractorConfig, MetadataExtractor, MetadataRecord, RecognizedHints};
pub use text::{DecodedText, DecoderConfig, TextDecoder};
pub use types::{
    Alignment, ByteRange, CandidateString, CarvedSegment, EncodingHypothesis, Endian, PrefixWidth,
};
