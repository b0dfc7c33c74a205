//! Per-stream recovery pipeline.
//!
//! Each stream runs through the steps of its [`StreamProfile`]; streams are
//! independent of one another and are analyzed in parallel.

use rayon::prelude::*;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use sift_core::carving::{
    EmbeddedStream, GzipHeader, GzipTrailer, HeaderCarve, SignatureHit, carve_tail,
    scan_embedded_streams,
};
use sift_core::scanner::{le_u32_words, u32_pairs};
use sift_core::{
    ByteRange, CandidateString, CarveOutcome, CarverConfig, DecodedText, DecoderConfig, Endian,
    ExtractorConfig, MetadataExtractor, MetadataRecord, PrefixWidth, SegmentCarver, Signature,
    SignatureIndex, TextDecoder,
};
use sift_io::NamedStream;

use crate::profile::StreamProfile;

pub const DEFAULT_MAX_CARVE_INPUT: usize = 4 * 1024 * 1024;
pub const DEFAULT_EMBEDDED_MIN_OUT: usize = 16;
const HEAD_LEN: usize = 256;
const LEADING_WORDS: usize = 16;
const MAX_PAIRS: usize = 64;
const MAX_CENSUS_HITS: usize = 256;

#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    pub decoder: DecoderConfig,
    pub carver: CarverConfig,
    pub extractor: ExtractorConfig,
    /// Streams larger than this are not carved.
    pub max_carve_input: usize,
    /// Smallest plaintext reported by embedded-stream probing.
    pub embedded_min_out: usize,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            decoder: DecoderConfig::default(),
            carver: CarverConfig::default(),
            extractor: ExtractorConfig::default(),
            max_carve_input: DEFAULT_MAX_CARVE_INPUT,
            embedded_min_out: DEFAULT_EMBEDDED_MIN_OUT,
        }
    }
}

impl AnalyzerConfig {
    #[must_use]
    pub fn with_min_run_len(mut self, min_run_len: usize) -> Self {
        self.decoder.min_run_len = min_run_len;
        self
    }

    #[must_use]
    pub fn with_carver(mut self, carver: CarverConfig) -> Self {
        self.carver = carver;
        self
    }

    #[must_use]
    pub fn with_max_carve_input(mut self, max_carve_input: usize) -> Self {
        self.max_carve_input = max_carve_input;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CarveMode {
    BackwardSearch,
    HeaderParse,
    /// Header parsing failed and the backward search ran instead.
    HeaderFallback,
}

/// Gzip framing recovered by header-parse carving.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeaderDetails {
    pub header: GzipHeader,
    pub trailer: GzipTrailer,
    pub computed_crc: u32,
    pub consistent: bool,
}

impl From<&HeaderCarve> for HeaderDetails {
    fn from(carve: &HeaderCarve) -> Self {
        Self {
            header: carve.header.clone(),
            trailer: carve.trailer,
            computed_crc: carve.computed_crc,
            consistent: carve.is_consistent(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TextSource {
    Raw,
    Plaintext,
    Embedded { offset: usize },
}

impl std::fmt::Display for TextSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Raw => f.write_str("raw"),
            Self::Plaintext => f.write_str("plaintext"),
            Self::Embedded { offset } => write!(f, "embedded@0x{offset:X}"),
        }
    }
}

/// Strings recovered under one hypothesis from one buffer.
#[derive(Debug, Clone, Serialize)]
pub struct CandidateGroup {
    pub label: String,
    pub source: TextSource,
    pub strings: Vec<CandidateString>,
}

impl CandidateGroup {
    fn new(label: impl Into<String>, source: TextSource, strings: Vec<CandidateString>) -> Self {
        Self {
            label: label.into(),
            source,
            strings,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PreviewInfo {
    pub range: ByteRange,
    pub width: Option<usize>,
    pub height: Option<usize>,
    #[serde(skip)]
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StreamAnalysis {
    pub name: String,
    pub stub: String,
    pub profile: StreamProfile,
    pub size: usize,
    pub sha256: String,
    #[serde(skip)]
    pub head: Vec<u8>,
    pub leading_words: Vec<(usize, u32)>,
    pub census: Vec<SignatureHit>,
    pub carve: Option<CarveOutcome>,
    pub carve_mode: Option<CarveMode>,
    pub header: Option<HeaderDetails>,
    pub unused: Option<ByteRange>,
    pub plaintext_sha256: Option<String>,
    pub embedded: Vec<EmbeddedStream>,
    pub pairs: Vec<(usize, u32, u32)>,
    pub groups: Vec<CandidateGroup>,
    pub author: Option<String>,
    pub metadata: Option<MetadataRecord>,
    pub preview: Option<PreviewInfo>,
    pub notes: Vec<String>,
}

impl StreamAnalysis {
    fn new(name: &str, profile: StreamProfile, data: &[u8]) -> Self {
        Self {
            name: name.to_string(),
            stub: sift_io::stream_stub(name),
            profile,
            size: data.len(),
            sha256: sha256_hex(data),
            head: data[..data.len().min(HEAD_LEN)].to_vec(),
            leading_words: le_u32_words(data, LEADING_WORDS),
            census: Vec::new(),
            carve: None,
            carve_mode: None,
            header: None,
            unused: None,
            plaintext_sha256: None,
            embedded: Vec::new(),
            pairs: Vec::new(),
            groups: Vec::new(),
            author: None,
            metadata: None,
            preview: None,
            notes: Vec::new(),
        }
    }

    #[must_use]
    pub fn plaintext(&self) -> Option<&[u8]> {
        self.carve
            .as_ref()
            .and_then(CarveOutcome::segment)
            .map(|seg| seg.plaintext.as_slice())
    }

    #[must_use]
    pub fn string_count(&self) -> usize {
        self.groups.iter().map(|g| g.strings.len()).sum()
    }

    #[must_use]
    pub fn group(&self, label: &str, source: TextSource) -> Option<&CandidateGroup> {
        self.groups
            .iter()
            .find(|g| g.label == label && g.source == source)
    }
}

pub struct Analyzer {
    config: AnalyzerConfig,
    decoder: TextDecoder,
    line_decoder: TextDecoder,
    carver: SegmentCarver,
    extractor: MetadataExtractor,
    index: SignatureIndex,
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer {
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(AnalyzerConfig::default())
    }

    #[must_use]
    pub fn with_config(config: AnalyzerConfig) -> Self {
        let line_config = DecoderConfig {
            ascii_only_lines: true,
            ..config.decoder.clone()
        };
        Self {
            decoder: TextDecoder::with_config(config.decoder.clone()),
            line_decoder: TextDecoder::with_config(line_config),
            carver: SegmentCarver::with_config(config.carver.clone()),
            extractor: MetadataExtractor::with_config(config.extractor.clone()),
            index: SignatureIndex::all(),
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Analyzes every stream in parallel; results keep the input order.
    #[must_use]
    pub fn analyze_all(&self, streams: &[NamedStream]) -> Vec<StreamAnalysis> {
        streams
            .par_iter()
            .map(|stream| self.analyze(&stream.name, &stream.data))
            .collect()
    }

    #[must_use]
    pub fn analyze(&self, name: &str, data: &[u8]) -> StreamAnalysis {
        let profile = StreamProfile::for_name(name);
        let mut analysis = StreamAnalysis::new(name, profile, data);
        debug!(stream = name, %profile, len = data.len(), "analyzing");

        let mut hits = self.index.find_all(data);
        if hits.len() > MAX_CENSUS_HITS {
            analysis
                .notes
                .push(format!("{} signature hits, first {MAX_CENSUS_HITS} kept", hits.len()));
            hits.truncate(MAX_CENSUS_HITS);
        }
        analysis.census = hits;

        if profile.carves() {
            self.carve_stream(&mut analysis, data);
        }

        match profile {
            StreamProfile::BasicFileInfo => self.basic_file_info(&mut analysis, data),
            StreamProfile::Contents => self.contents(&mut analysis, data),
            StreamProfile::IncrementTable => self.increment_table(&mut analysis, data),
            StreamProfile::ContentDocuments => self.content_documents(&mut analysis, data),
            StreamProfile::Formats => self.formats(&mut analysis, data),
            StreamProfile::Preview => self.preview(&mut analysis, data),
            StreamProfile::Generic => self.generic(&mut analysis, data),
        }

        info!(
            stream = name,
            %profile,
            carve = analysis.carve.as_ref().map_or("skipped", CarveOutcome::label),
            strings = analysis.string_count(),
            "analyzed"
        );
        analysis
    }

    fn carve_stream(&self, analysis: &mut StreamAnalysis, data: &[u8]) {
        if data.len() > self.config.max_carve_input {
            analysis.notes.push(format!(
                "carving skipped: {} bytes exceeds the {} byte ceiling",
                data.len(),
                self.config.max_carve_input
            ));
            return;
        }

        let (outcome, mode) = if analysis.profile.parses_header() {
            self.carve_header_first(analysis, data)
        } else {
            (self.carver.carve(data), CarveMode::BackwardSearch)
        };

        match &outcome {
            CarveOutcome::Carved(seg) => {
                analysis.plaintext_sha256 = Some(sha256_hex(&seg.plaintext));
                if analysis.unused.is_none() {
                    analysis.unused = Some(ByteRange::new(seg.end_offset, data.len()));
                }
            }
            CarveOutcome::NoSegmentFound => analysis.notes.push("no gzip signature".to_string()),
            CarveOutcome::CarveFailed { magic_offset } => analysis.notes.push(format!(
                "gzip signature at 0x{magic_offset:X} but no candidate end decoded"
            )),
        }
        analysis.carve = Some(outcome);
        analysis.carve_mode = Some(mode);
    }

    fn carve_header_first(
        &self,
        analysis: &mut StreamAnalysis,
        data: &[u8],
    ) -> (CarveOutcome, CarveMode) {
        match self.carver.carve_with_header(data) {
            Ok(Some(carve)) => {
                let details = HeaderDetails::from(&carve);
                if !details.consistent {
                    analysis.notes.push(format!(
                        "trailer crc {:08X}/size {} disagrees with computed {:08X}/{}",
                        carve.trailer.crc32,
                        carve.trailer.isize,
                        carve.computed_crc,
                        carve.segment.plaintext.len()
                    ));
                }
                analysis.header = Some(details);
                analysis.unused = Some(carve.unused);
                (CarveOutcome::Carved(carve.segment), CarveMode::HeaderParse)
            }
            Ok(None) => (CarveOutcome::NoSegmentFound, CarveMode::HeaderParse),
            Err(err) => {
                warn!(
                    stream = %analysis.name,
                    error = %err,
                    "header-parse carve failed, falling back to backward search"
                );
                analysis.notes.push(format!("header parse failed: {err}"));
                (self.carver.carve(data), CarveMode::HeaderFallback)
            }
        }
    }

    fn string_groups(&self, buf: &[u8], source: TextSource) -> [CandidateGroup; 2] {
        [
            CandidateGroup::new("utf16le", source, self.decoder.utf16le_runs_all_alignments(buf)),
            CandidateGroup::new("ascii", source, self.decoder.ascii_runs(buf)),
        ]
    }

    /// Plaintext when the carve succeeded, the raw stream otherwise.
    fn text_target<'a>(analysis: &'a StreamAnalysis, data: &'a [u8]) -> (&'a [u8], TextSource) {
        match analysis.plaintext() {
            Some(plaintext) => (plaintext, TextSource::Plaintext),
            None => (data, TextSource::Raw),
        }
    }

    fn basic_file_info(&self, analysis: &mut StreamAnalysis, data: &[u8]) {
        let le = self.decoder.decode_utf16_lines(data, Endian::Little);
        let be = self.line_decoder.decode_utf16_lines(data, Endian::Big);
        for (label, decoded) in [("utf16le-lines", &le), ("utf16be-lines", &be)] {
            if decoded.is_degraded() {
                analysis.notes.push(format!(
                    "{label}: {} undecodable units dropped",
                    decoded.dropped_units
                ));
            }
        }

        let (cleaner, other) = if be.printable_ratio >= le.printable_ratio {
            (&be, &le)
        } else {
            (&le, &be)
        };
        analysis.metadata = Some(self.metadata_from(cleaner, other));

        let prefixed: Vec<CandidateString> = self
            .decoder
            .length_prefixed_utf16(data, PrefixWidth::U32)
            .into_iter()
            .filter(|c| !c.text.is_empty())
            .collect();

        analysis
            .groups
            .push(CandidateGroup::new("utf16le-lines", TextSource::Raw, le.lines));
        analysis
            .groups
            .push(CandidateGroup::new("utf16be-lines", TextSource::Raw, be.lines));
        analysis
            .groups
            .push(CandidateGroup::new("prefixed-utf16/u32", TextSource::Raw, prefixed));
    }

    fn metadata_from(&self, primary: &DecodedText, secondary: &DecodedText) -> MetadataRecord {
        let mut record = self.extractor.extract(primary.texts());
        record.merge_hints_from(&self.extractor.extract(secondary.texts()));
        record
    }

    fn contents(&self, analysis: &mut StreamAnalysis, data: &[u8]) {
        let (buf, source) = Self::text_target(analysis, data);
        let utf16 = self.decoder.utf16le_runs_all_alignments(buf);
        let ascii = self.decoder.ascii_runs(buf);
        analysis.author = utf16.first().map(|c| c.text.clone());
        analysis.metadata = Some(
            self.extractor
                .extract(utf16.iter().chain(&ascii).map(|c| c.text.as_str())),
        );
        analysis.groups.push(CandidateGroup::new("utf16le", source, utf16));
        analysis.groups.push(CandidateGroup::new("ascii", source, ascii));
    }

    fn increment_table(&self, analysis: &mut StreamAnalysis, data: &[u8]) {
        let (buf, source) = Self::text_target(analysis, data);
        let pairs = u32_pairs(buf, MAX_PAIRS);
        let groups = self.string_groups(buf, source);
        analysis.pairs = pairs;
        analysis.groups.extend(groups);
        analysis.metadata = Some(self.extract_groups(analysis));
    }

    fn content_documents(&self, analysis: &mut StreamAnalysis, data: &[u8]) {
        if let Some(unused) = analysis.unused.filter(|r| !r.is_empty()) {
            let leftover = unused.slice(data).unwrap_or_default();
            for stream in scan_embedded_streams(leftover, self.config.embedded_min_out) {
                let offset = unused.start + stream.offset;
                let groups = self.string_groups(&stream.plaintext, TextSource::Embedded { offset });
                analysis.groups.extend(groups);
                analysis.embedded.push(EmbeddedStream { offset, ..stream });
            }
        }

        let (buf, source) = Self::text_target(analysis, data);
        let groups = self.string_groups(buf, source);
        analysis.groups.extend(groups);
        analysis.metadata = Some(self.extract_groups(analysis));
    }

    fn formats(&self, analysis: &mut StreamAnalysis, data: &[u8]) {
        let (buf, source) = Self::text_target(analysis, data);
        let names = CandidateGroup::new(
            "prefixed-ascii/u16",
            source,
            self.decoder.length_prefixed_ascii(buf),
        );
        let groups = self.string_groups(buf, source);
        analysis.groups.push(names);
        analysis.groups.extend(groups);
    }

    fn preview(&self, analysis: &mut StreamAnalysis, data: &[u8]) {
        let Some(seg) = carve_tail(data, Signature::Png) else {
            analysis.notes.push("no PNG signature".to_string());
            return;
        };
        let dimensions = imagesize::blob_size(&seg.plaintext)
            .ok()
            .map(|size| (size.width, size.height));
        if dimensions.is_none() {
            analysis.notes.push("PNG header unreadable".to_string());
        }
        analysis.preview = Some(PreviewInfo {
            range: seg.range(),
            width: dimensions.map(|(w, _)| w),
            height: dimensions.map(|(_, h)| h),
            bytes: seg.plaintext,
        });
    }

    fn generic(&self, analysis: &mut StreamAnalysis, data: &[u8]) {
        let (buf, source) = Self::text_target(analysis, data);
        let groups = self.string_groups(buf, source);
        analysis.groups.extend(groups);
    }

    fn extract_groups(&self, analysis: &StreamAnalysis) -> MetadataRecord {
        self.extractor.extract(
            analysis
                .groups
                .iter()
                .flat_map(|g| g.strings.iter().map(|c| c.text.as_str())),
        )
    }
}

fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}
