//! Key/value and heuristic metadata recovery from decoded text lines.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

static IDENTIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)([0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12})\$?",
    )
    .expect("identifier pattern is valid")
});

/// Upper bound on how many tokens one path may span.
const MAX_PATH_TOKENS: usize = 32;

#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    /// Lowercase extensions, dot included, that terminate a path.
    pub path_extensions: Vec<String>,
    /// Character that closes a platform bit-width token such as `64$`.
    pub bit_width_marker: char,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            path_extensions: [".rfa", ".rvt", ".rte", ".rft"]
                .into_iter()
                .map(String::from)
                .collect(),
            bit_width_marker: '$',
        }
    }
}

impl ExtractorConfig {
    #[must_use]
    pub fn with_path_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.path_extensions = extensions
            .into_iter()
            .map(|e| e.into().to_ascii_lowercase())
            .collect();
        self
    }

    #[must_use]
    pub fn with_bit_width_marker(mut self, marker: char) -> Self {
        self.bit_width_marker = marker;
        self
    }
}

/// Heuristic finds kept apart from explicit key/value fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RecognizedHints {
    pub build: Option<String>,
    pub paths: Vec<String>,
    pub platform_bits: Option<u32>,
    pub format_version: Option<String>,
}

impl RecognizedHints {
    #[must_use]
    pub fn original_path(&self) -> Option<&str> {
        self.paths.first().map(String::as_str)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.build.is_none()
            && self.paths.is_empty()
            && self.platform_bits.is_none()
            && self.format_version.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetadataRecord {
    pub fields: BTreeMap<String, String>,
    pub residual: Vec<String>,
    /// Sorted, deduplicated, casing as found.
    pub identifiers: Vec<String>,
    pub hints: RecognizedHints,
}

impl MetadataRecord {
    #[must_use]
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    #[must_use]
    pub fn primary_identifier(&self) -> Option<&str> {
        self.identifiers.first().map(String::as_str)
    }

    #[must_use]
    pub fn secondary_identifier(&self) -> Option<&str> {
        self.identifiers.get(1).map(String::as_str)
    }

    /// Folds identifiers and hints recovered from another decode of the
    /// same stream into this record. Existing hints are kept.
    pub fn merge_hints_from(&mut self, other: &MetadataRecord) {
        self.identifiers.extend(other.identifiers.iter().cloned());
        self.identifiers.sort();
        self.identifiers.dedup();

        let hints = &mut self.hints;
        if hints.build.is_none() {
            hints.build.clone_from(&other.hints.build);
        }
        if hints.platform_bits.is_none() {
            hints.platform_bits = other.hints.platform_bits;
        }
        if hints.format_version.is_none() {
            hints.format_version.clone_from(&other.hints.format_version);
        }
        for path in &other.hints.paths {
            if !hints.paths.contains(path) {
                hints.paths.push(path.clone());
            }
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
            && self.residual.is_empty()
            && self.identifiers.is_empty()
            && self.hints.is_empty()
    }
}

/// Lowercases `name` and folds every run of non-alphanumeric characters
/// into a single `_`, trimming underscores from both ends.
#[must_use]
pub fn normalize_field_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending = false;
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending && !out.is_empty() {
                out.push('_');
            }
            pending = false;
            out.push(ch.to_ascii_lowercase());
        } else {
            pending = true;
        }
    }
    out
}

#[derive(Debug, Clone, Default)]
pub struct MetadataExtractor {
    config: ExtractorConfig,
}

impl MetadataExtractor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_config(config: ExtractorConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn extract<I, S>(&self, lines: I) -> MetadataRecord
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut record = MetadataRecord::default();
        let mut joined = String::new();

        for line in lines {
            let line = line.as_ref();
            if !joined.is_empty() {
                joined.push('\n');
            }
            joined.push_str(line);

            let Some((key, value)) = line.split_once(':') else {
                record.residual.push(line.to_string());
                continue;
            };
            let key = normalize_field_name(key);
            if key.is_empty() {
                record.residual.push(line.to_string());
                continue;
            }
            record.fields.insert(key, value.trim().to_string());
        }

        record.identifiers = find_identifiers(&joined);
        record.hints = self.recognize(&joined);
        record
    }

    /// Runs the token heuristics alone over free text.
    #[must_use]
    pub fn recognize(&self, text: &str) -> RecognizedHints {
        let tokens: Vec<&str> = text.split_whitespace().collect();
        RecognizedHints {
            build: tokens.iter().find(|t| is_build_token(t)).map(|t| t.to_string()),
            paths: self.find_paths(&tokens),
            platform_bits: tokens.iter().find_map(|t| self.bit_width(t)),
            format_version: tokens
                .iter()
                .find(|t| t.len() == 4 && t.bytes().all(|b| b.is_ascii_digit()))
                .map(|t| t.to_string()),
        }
    }

    fn find_paths(&self, tokens: &[&str]) -> Vec<String> {
        let mut paths = Vec::new();
        let mut i = 0;
        while i < tokens.len() {
            let token = tokens[i];
            if !(token.contains(':') && (token.contains('\\') || token.contains('/'))) {
                i += 1;
                continue;
            }
            let span_end = tokens[i..]
                .iter()
                .take(MAX_PATH_TOKENS)
                .position(|t| self.has_path_extension(t))
                .map(|p| i + p + 1);
            match span_end {
                Some(end) => {
                    paths.push(tokens[i..end].join(" "));
                    i = end;
                }
                None => {
                    paths.push(token.to_string());
                    i += 1;
                }
            }
        }
        paths
    }

    fn has_path_extension(&self, token: &str) -> bool {
        let lower = token.to_ascii_lowercase();
        self.config
            .path_extensions
            .iter()
            .any(|ext| lower.ends_with(ext.as_str()))
    }

    /// Digits and nothing else before the marker, as in `64$`.
    fn bit_width(&self, token: &str) -> Option<u32> {
        let body = token.strip_suffix(self.config.bit_width_marker)?;
        if body.is_empty() || !body.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        body.parse().ok()
    }
}

fn is_build_token(token: &str) -> bool {
    token.contains('_') && token.contains('(') && token.ends_with(')')
}

fn find_identifiers(text: &str) -> Vec<String> {
    let mut ids: Vec<String> = IDENTIFIER
        .captures_iter(text)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .collect();
    ids.sort();
    ids.dedup();
    ids
}
