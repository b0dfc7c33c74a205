use aho_corasick::AhoCorasick;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Signature {
    Gzip,
    Png,
    CompoundFile,
}

impl Signature {
    pub const ALL: [Signature; 3] = [Signature::Gzip, Signature::Png, Signature::CompoundFile];

    #[must_use]
    pub const fn header_bytes(&self) -> &'static [u8] {
        match self {
            Self::Gzip => &[0x1F, 0x8B, 0x08],
            Self::Png => &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A],
            Self::CompoundFile => &[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1],
        }
    }

    #[must_use]
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Gzip => "gz",
            Self::Png => "png",
            Self::CompoundFile => "cfb",
        }
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Gzip => "GZIP",
            Self::Png => "PNG",
            Self::CompoundFile => "CFB",
        }
    }
}

impl std::fmt::Display for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SignatureHit {
    pub offset: usize,
    pub signature: Signature,
}

/// Every occurrence of a set of signatures, found in one pass.
#[derive(Debug, Clone)]
pub struct SignatureIndex {
    matcher: Option<AhoCorasick>,
    signatures: Vec<Signature>,
}

impl SignatureIndex {
    #[must_use]
    pub fn new(signatures: &[Signature]) -> Self {
        let patterns: Vec<&[u8]> = signatures.iter().map(Signature::header_bytes).collect();
        Self {
            matcher: AhoCorasick::new(&patterns).ok(),
            signatures: signatures.to_vec(),
        }
    }

    #[must_use]
    pub fn all() -> Self {
        Self::new(&Signature::ALL)
    }

    /// Hits in offset order. Overlapping occurrences are all reported.
    #[must_use]
    pub fn find_all(&self, data: &[u8]) -> Vec<SignatureHit> {
        let Some(matcher) = &self.matcher else {
            return Vec::new();
        };
        let mut hits: Vec<SignatureHit> = matcher
            .find_overlapping_iter(data)
            .filter_map(|mat| {
                self.signatures
                    .get(mat.pattern().as_usize())
                    .map(|&signature| SignatureHit {
                        offset: mat.start(),
                        signature,
                    })
            })
            .collect();
        hits.sort_by_key(|h| (h.offset, h.signature));
        hits
    }

    /// Occurrence count per signature, in index order. Absent signatures count zero.
    #[must_use]
    pub fn counts(&self, data: &[u8]) -> Vec<(Signature, usize)> {
        let hits = self.find_all(data);
        self.signatures
            .iter()
            .map(|&sig| (sig, hits.iter().filter(|h| h.signature == sig).count()))
            .collect()
    }
}

impl Default for SignatureIndex {
    fn default() -> Self {
        Self::all()
    }
}
