use std::fs::File;
use std::path::Path;

use memmap2::Mmap;

use crate::error::Result;

/// Reads a whole file through a read-only mapping.
pub fn read_blob(path: impl AsRef<Path>) -> Result<Vec<u8>> {
    let file = File::open(path.as_ref())?;
    if file.metadata()?.len() == 0 {
        return Ok(Vec::new());
    }

    // SAFETY: the mapping is read-only and copied out before it is dropped.
    let mmap = unsafe { Mmap::map(&file) }?;

    #[cfg(target_os = "linux")]
    {
        let _ = mmap.advise(memmap2::Advice::Sequential);
    }

    Ok(mmap.to_vec())
}
