//! Payload compression wrapper used by the NWSync store.
//!
//! ```text
//! magic[4]  u32 version (=3)  u32 algorithm  u32 uncompressed_size
//! algorithm 0: raw payload
//! algorithm 1: u32 version (=1), zlib stream
//! algorithm 2: u32 version (=1), u32 dictionary (=0), zstd frame
//! ```

use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use rollkit_shared::ByteArray;

const HEADER_SIZE: usize = 16;
const WRAPPER_VERSION: u32 = 3;
/// Upper bound on the buffer reserved from the header's declared size.
const PREALLOC_LIMIT: usize = 16 * 1024 * 1024;

/// Magic tag used by NWSync shard payloads.
pub const NWSYNC_MAGIC: &[u8; 4] = b"NSYC";

/// Compression algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    None = 0,
    Zlib = 1,
    Zstd = 2,
}

/// Unwraps a compressed payload. Any malformed input logs an error and
/// returns empty bytes.
pub fn decompress(bytes: &[u8], magic: &[u8; 4]) -> ByteArray {
    if bytes.len() < HEADER_SIZE {
        tracing::error!("compression header invalid");
        return ByteArray::new();
    }
    if &bytes[0..4] != magic {
        tracing::error!("mismatched magic bytes");
        return ByteArray::new();
    }

    let mut header = &bytes[4..HEADER_SIZE];
    let (version, algorithm, size) = match (
        header.read_u32::<LittleEndian>(),
        header.read_u32::<LittleEndian>(),
        header.read_u32::<LittleEndian>(),
    ) {
        (Ok(v), Ok(a), Ok(s)) => (v, a, s as usize),
        _ => return ByteArray::new(),
    };
    if version != WRAPPER_VERSION {
        tracing::error!(version, "unsupported compression wrapper version");
        return ByteArray::new();
    }

    let payload = &bytes[HEADER_SIZE..];
    let result = match algorithm {
        0 => Some(payload.to_vec()),
        1 => zlib_decompress(payload, size),
        2 => zstd_decompress(payload, size),
        other => {
            tracing::error!(algorithm = other, "invalid compression algorithm");
            None
        }
    };
    result.map(ByteArray::from).unwrap_or_default()
}

fn zlib_decompress(payload: &[u8], size: usize) -> Option<Vec<u8>> {
    let mut cursor = payload;
    let version = cursor.read_u32::<LittleEndian>().ok()?;
    if version != 1 {
        tracing::error!(version, "invalid zlib version");
        return None;
    }
    let mut out = Vec::with_capacity(size.min(PREALLOC_LIMIT));
    let decoder = flate2::read::ZlibDecoder::new(cursor);
    if let Err(e) = decoder.take(size as u64 + 1).read_to_end(&mut out) {
        tracing::error!("zlib failed to decompress: {e}");
        return None;
    }
    if out.len() != size {
        tracing::error!(expected = size, actual = out.len(), "zlib size mismatch");
        return None;
    }
    Some(out)
}

fn zstd_decompress(payload: &[u8], size: usize) -> Option<Vec<u8>> {
    let mut cursor = payload;
    let version = cursor.read_u32::<LittleEndian>().ok()?;
    let _dictionary = cursor.read_u32::<LittleEndian>().ok()?;
    if version != 1 {
        tracing::error!(version, "invalid zstd version");
        return None;
    }
    let mut out = Vec::with_capacity(size.min(PREALLOC_LIMIT));
    let read = zstd::stream::read::Decoder::new(cursor)
        .and_then(|decoder| decoder.take(size as u64 + 1).read_to_end(&mut out));
    if let Err(e) = read {
        tracing::error!("zstd failed to decompress: {e}");
        return None;
    }
    if out.len() != size {
        tracing::error!(expected = size, actual = out.len(), "zstd size mismatch");
        return None;
    }
    Some(out)
}

/// Wraps a payload with the given algorithm.
pub fn compress(bytes: &[u8], magic: &[u8; 4], algorithm: Algorithm) -> std::io::Result<Vec<u8>> {
    let mut out = Vec::with_capacity(HEADER_SIZE + bytes.len());
    out.extend_from_slice(magic);
    out.write_u32::<LittleEndian>(WRAPPER_VERSION)?;
    out.write_u32::<LittleEndian>(algorithm as u32)?;
    out.write_u32::<LittleEndian>(bytes.len() as u32)?;
    match algorithm {
        Algorithm::None => out.extend_from_slice(bytes),
        Algorithm::Zlib => {
            out.write_u32::<LittleEndian>(1)?;
            let mut encoder =
                flate2::write::ZlibEncoder::new(&mut out, flate2::Compression::default());
            encoder.write_all(bytes)?;
            encoder.finish()?;
        }
        Algorithm::Zstd => {
            out.write_u32::<LittleEndian>(1)?;
            out.write_u32::<LittleEndian>(0)?;
            out.extend_from_slice(&zstd::bulk::compress(bytes, 0)?);
        }
    }
    Ok(out)
}
