use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("Read of {width} bytes at offset {offset} is out of bounds (len: {len})")]
    OutOfBounds {
        offset: usize,
        width: usize,
        len: usize,
    },

    #[error("Invalid range {start}..{end} for a buffer of {len} bytes")]
    InvalidRange { start: usize, end: usize, len: usize },

    /// The gzip framing at `offset` does not hold together. Only raised by
    /// header-parse carving; callers are expected to retry with the
    /// backward search.
    #[error("Malformed gzip header at offset {offset}: {reason}")]
    HeaderMalformed { offset: usize, reason: String },

    #[error("Deflate payload at offset {offset} failed to inflate: {message}")]
    Inflate { offset: usize, message: String },
}

impl CoreError {
    pub(crate) fn header(offset: usize, reason: impl Into<String>) -> Self {
        Self::HeaderMalformed {
            offset,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
