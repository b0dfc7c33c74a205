use flate2::{Decompress, FlushDecompress, Status};

const INFLATE_CHUNK: usize = 64 * 1024;

/// Plaintext produced by a streaming inflate, plus how much input it used.
pub(crate) struct Inflated {
    pub plaintext: Vec<u8>,
    pub consumed: usize,
}

/// Inflates a single deflate stream from the front of `input`.
///
/// `zlib_header` selects zlib framing over raw deflate. Bytes after the end
/// of the stream are left untouched. Fails on corrupt or truncated input, and
/// when the plaintext would exceed `limit` bytes.
pub(crate) fn inflate_stream(
    input: &[u8],
    zlib_header: bool,
    limit: usize,
) -> Result<Inflated, String> {
    let mut inflater = Decompress::new(zlib_header);
    let mut out = Vec::with_capacity(input.len().saturating_mul(2).min(limit).max(64));

    loop {
        if out.len() == out.capacity() {
            if out.len() >= limit {
                return Err(format!("plaintext exceeds {limit} bytes"));
            }
            out.reserve(INFLATE_CHUNK);
        }
        let before = (inflater.total_in(), inflater.total_out());
        let start = usize::try_from(inflater.total_in())
            .unwrap_or(input.len())
            .min(input.len());

        let status = inflater
            .decompress_vec(&input[start..], &mut out, FlushDecompress::None)
            .map_err(|e| e.to_string())?;

        match status {
            Status::StreamEnd => break,
            Status::Ok | Status::BufError => {
                if (inflater.total_in(), inflater.total_out()) == before
                    && out.len() < out.capacity()
                {
                    return Err("deflate stream is truncated".to_string());
                }
            }
        }
    }

    if out.len() > limit {
        return Err(format!("plaintext exceeds {limit} bytes"));
    }
    let consumed = usize::try_from(inflater.total_in()).unwrap_or(input.len());
    Ok(Inflated {
        plaintext: out,
        consumed,
    })
}
