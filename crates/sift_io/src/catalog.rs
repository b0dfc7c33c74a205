use std::io::{Cursor, Read};
use std::path::{Component, Path, PathBuf};

use tracing::{debug, info};

use crate::blob::read_blob;
use crate::error::{IoError, Result};

pub const STREAM_DUMP_EXTENSION: &str = "bin";

/// One stream, named by its slash-joined hierarchical path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedStream {
    pub name: String,
    pub data: Vec<u8>,
}

impl NamedStream {
    #[must_use]
    pub fn new(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }

    /// Last path component, the part profiles match on.
    #[must_use]
    pub fn base_name(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }

    /// File-system friendly stub: `/` becomes `_`.
    #[must_use]
    pub fn stub(&self) -> String {
        stream_stub(&self.name)
    }
}

#[must_use]
pub fn stream_stub(name: &str) -> String {
    name.replace('/', "_")
}

pub trait StreamCatalog {
    fn streams(&mut self) -> Result<Vec<NamedStream>>;
}

/// Streams of an OLE compound document.
pub struct CompoundFileCatalog {
    path: PathBuf,
    container: cfb::CompoundFile<Cursor<Vec<u8>>>,
}

impl CompoundFileCatalog {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let bytes = read_blob(&path)?;
        let container =
            cfb::CompoundFile::open(Cursor::new(bytes)).map_err(|source| IoError::Container {
                path: path.clone(),
                source,
            })?;
        info!(path = %path.display(), "opened compound file");
        Ok(Self { path, container })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StreamCatalog for CompoundFileCatalog {
    fn streams(&mut self) -> Result<Vec<NamedStream>> {
        let paths: Vec<PathBuf> = self
            .container
            .walk()
            .filter(|entry| entry.is_stream())
            .map(|entry| entry.path().to_path_buf())
            .collect();

        let mut streams = Vec::with_capacity(paths.len());
        for entry_path in paths {
            let mut data = Vec::new();
            self.container
                .open_stream(&entry_path)
                .and_then(|mut stream| stream.read_to_end(&mut data))
                .map_err(|source| IoError::Container {
                    path: self.path.clone(),
                    source,
                })?;
            let name = slash_joined(&entry_path);
            debug!(stream = %name, len = data.len(), "read stream");
            streams.push(NamedStream::new(name, data));
        }
        Ok(streams)
    }
}

fn slash_joined(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// A directory of per-stream `.bin` dumps; each file stem names a stream.
pub struct DirectoryCatalog {
    dir: PathBuf,
}

impl DirectoryCatalog {
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        if !dir.is_dir() {
            return Err(IoError::NotADirectory(dir));
        }
        Ok(Self { dir })
    }
}

impl StreamCatalog for DirectoryCatalog {
    fn streams(&mut self) -> Result<Vec<NamedStream>> {
        let mut streams = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            let is_dump = path.is_file()
                && path
                    .extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case(STREAM_DUMP_EXTENSION));
            if !is_dump {
                continue;
            }
            let Some(stem) = path.file_stem() else {
                continue;
            };
            let name = stem.to_string_lossy().into_owned();
            streams.push(NamedStream::new(name, read_blob(&path)?));
        }
        streams.sort_by(|a, b| a.name.cmp(&b.name));
        info!(dir = %self.dir.display(), count = streams.len(), "loaded stream dumps");
        Ok(streams)
    }
}

/// Picks the catalog for `input`: a directory of dumps or a compound file.
pub fn open_catalog(input: impl AsRef<Path>) -> Result<Box<dyn StreamCatalog>> {
    let input = input.as_ref();
    if input.is_dir() {
        Ok(Box::new(DirectoryCatalog::open(input)?))
    } else {
        Ok(Box::new(CompoundFileCatalog::open(input)?))
    }
}
