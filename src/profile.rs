use serde::Serialize;

/// Which recovery steps a stream gets, chosen from its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum StreamProfile {
    BasicFileInfo,
    Contents,
    IncrementTable,
    ContentDocuments,
    Formats,
    Preview,
    Generic,
}

impl StreamProfile {
    pub const ALL: [StreamProfile; 7] = [
        Self::BasicFileInfo,
        Self::Contents,
        Self::IncrementTable,
        Self::ContentDocuments,
        Self::Formats,
        Self::Preview,
        Self::Generic,
    ];

    /// Matches on the last path component, ignoring ASCII case. `_` counts
    /// as a separator so dumps named by stub still resolve.
    #[must_use]
    pub fn for_name(name: &str) -> Self {
        let mut parts = name.rsplit(['/', '_']);
        let base = parts.next().unwrap_or(name);
        let parent = parts.next().unwrap_or_default();
        let matches = |candidate: &str| base.eq_ignore_ascii_case(candidate);

        if matches("BasicFileInfo") {
            Self::BasicFileInfo
        } else if matches("Contents") {
            Self::Contents
        } else if matches("DocumentIncrementTable") {
            Self::IncrementTable
        } else if matches("ContentDocuments") {
            Self::ContentDocuments
        } else if matches("Latest") && parent.eq_ignore_ascii_case("Formats") {
            Self::Formats
        } else if base.to_ascii_lowercase().starts_with("revitpreview") {
            Self::Preview
        } else {
            Self::Generic
        }
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::BasicFileInfo => "basic-file-info",
            Self::Contents => "contents",
            Self::IncrementTable => "increment-table",
            Self::ContentDocuments => "content-documents",
            Self::Formats => "formats",
            Self::Preview => "preview",
            Self::Generic => "generic",
        }
    }

    /// Whether the stream is expected to hold a gzip member.
    #[must_use]
    pub const fn carves(&self) -> bool {
        !matches!(self, Self::BasicFileInfo | Self::Preview)
    }

    /// Profiles whose members are walked header-first.
    #[must_use]
    pub const fn parses_header(&self) -> bool {
        matches!(self, Self::ContentDocuments | Self::Formats)
    }
}

impl std::fmt::Display for StreamProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
