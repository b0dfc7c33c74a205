mod blob;
mod catalog;
mod error;
mod writer;

pub use blob::read_blob;
pub use catalog::{
    CompoundFileCatalog, DirectoryCatalog, NamedStream, STREAM_DUMP_EXTENSION, StreamCatalog,
    open_catalog, stream_stub,
};
pub use error::{IoError, Result};
pub use writer::ResultWriter;
