use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use sift_core::CarvedSegment;
use tracing::debug;

use crate::error::Result;

/// Writes per-stream artifacts under one output directory.
///
/// Every artifact is named after the stream stub (see
/// [`stream_stub`](crate::stream_stub)); the directory is created on first write.
#[derive(Debug, Clone)]
pub struct ResultWriter {
    output_dir: PathBuf,
}

impl ResultWriter {
    #[must_use]
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn write_raw(&self, stub: &str, bytes: &[u8]) -> Result<PathBuf> {
        self.write_file(format!("{stub}.bin"), bytes)
    }

    pub fn write_plaintext(&self, stub: &str, bytes: &[u8]) -> Result<PathBuf> {
        self.write_file(format!("{stub}_decompressed.bin"), bytes)
    }

    pub fn write_segment(&self, stub: &str, segment: &CarvedSegment) -> Result<PathBuf> {
        self.write_plaintext(stub, &segment.plaintext)
    }

    pub fn write_preview(&self, stub: &str, extension: &str, bytes: &[u8]) -> Result<PathBuf> {
        self.write_file(format!("{stub}.{extension}"), bytes)
    }

    pub fn write_json<T: Serialize>(&self, stub: &str, value: &T) -> Result<PathBuf> {
        let json = serde_json::to_vec_pretty(value)?;
        self.write_file(format!("{stub}.json"), &json)
    }

    pub fn write_report<S: AsRef<str>>(&self, stub: &str, lines: &[S]) -> Result<PathBuf> {
        let mut text = String::new();
        for line in lines {
            text.push_str(line.as_ref());
            text.push('\n');
        }
        self.write_file(format!("{stub}_report.txt"), text.as_bytes())
    }

    fn write_file(&self, file_name: String, bytes: &[u8]) -> Result<PathBuf> {
        fs::create_dir_all(&self.output_dir)?;
        let path = self.output_dir.join(file_name);
        fs::write(&path, bytes)?;
        debug!(path = %path.display(), len = bytes.len(), "wrote artifact");
        Ok(path)
    }
}
