use crate::error::{constants, ProtocolError, Result};
use flate2::read::{ZlibDecoder, ZlibEncoder};
use flate2::Compression;
use std::io::Read;

/// Maximum declared size of an inflated frame body (8 MiB).
/// Checked before inflating so a hostile size claim cannot drive allocation.
pub const MAX_UNCOMPRESSED_SIZE: usize = 8 * 1024 * 1024;

/// Compresses data with zlib at the default level
///
/// # Errors
/// Returns `ProtocolError::CompressionFailure` if the encoder fails
pub fn compress(data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(data.len() / 2);
    ZlibEncoder::new(data, Compression::default())
        .read_to_end(&mut out)
        .map_err(|_| ProtocolError::CompressionFailure)?;
    Ok(out)
}

/// Inflates a zlib stream that must produce exactly `expected_len` bytes.
///
/// The output is capped one byte past `expected_len`, so an overlong stream is
/// detected without inflating all of it.
///
/// # Errors
/// Returns `ProtocolError::MalformedFrame` if:
/// - `expected_len` exceeds `MAX_UNCOMPRESSED_SIZE`
/// - the stream is corrupt
/// - the inflated size differs from `expected_len`
pub fn decompress(data: &[u8], expected_len: usize) -> Result<Vec<u8>> {
    if expected_len > MAX_UNCOMPRESSED_SIZE {
        return Err(ProtocolError::malformed(constants::ERR_UNCOMPRESSED_TOO_LARGE));
    }

    let mut out = Vec::with_capacity(expected_len);
    ZlibDecoder::new(data)
        .take(expected_len as u64 + 1)
        .read_to_end(&mut out)
        .map_err(|_| ProtocolError::malformed(constants::ERR_INFLATE_FAILED))?;

    if out.len() != expected_len {
        return Err(ProtocolError::malformed(constants::ERR_SIZE_MISMATCH));
    }
    Ok(out)
}

/// Compress data if it meets the threshold, otherwise return it unchanged.
/// Returns the output bytes and a flag indicating whether compression was applied.
pub fn maybe_compress(data: &[u8], threshold: usize) -> Result<(Vec<u8>, bool)> {
    if data.len() < threshold {
        Ok((data.to_vec(), false))
    } else {
        Ok((compress(data)?, true))
    }
}

/// Undo `maybe_compress` given the frame's declared uncompressed size
/// (`0` meaning the body was sent raw).
///
/// A compressed body that declares a size below `threshold` could never have
/// been produced by a conforming sender and is rejected.
pub fn maybe_decompress(data: &[u8], declared_len: usize, threshold: usize) -> Result<Vec<u8>> {
    if declared_len == 0 {
        return Ok(data.to_vec());
    }
    if declared_len < threshold {
        return Err(ProtocolError::malformed(constants::ERR_BELOW_THRESHOLD));
    }
    decompress(data, declared_len)
}
