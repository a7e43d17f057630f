//! Decompression entry points and signature probing

use flate2::read::{DeflateDecoder, GzDecoder, ZlibDecoder};
use std::io::Read;
use tracing::{trace, warn};

use crate::framed::FrameHeader;
use crate::{Codec, Error, GZIP_MAGIC, LZ4_FRAME_MAGIC, Result, ZSTD_FRAME_MAGIC};

/// Decompress `data` with the given algorithm.
///
/// `expected_size` is a hint from archive metadata; because several layouts
/// only record sector-rounded sizes it is not enforced, just logged when the
/// output disagrees. The framed variants verify against the exact size in
/// their own header and fail hard on mismatch.
pub fn decompress(data: &[u8], codec: Codec, expected_size: Option<usize>) -> Result<Vec<u8>> {
    trace!("decompressing {} bytes with {codec}", data.len());

    let out = match codec {
        Codec::Zlib => decompress_zlib(data)?,
        Codec::Gzip => decompress_gzip(data)?,
        Codec::Deflate => decompress_deflate(data)?,
        Codec::Lz4 => decompress_lz4(data)?,
        Codec::Zstd => decompress_zstd(data)?,
        Codec::FramedZlib => decompress_framed(data, decompress_zlib)?,
        Codec::FramedLz4 => decompress_framed(data, decompress_lz4)?,
    };

    if let Some(expected) = expected_size {
        if out.len() != expected {
            warn!(
                "{codec} output is {} bytes, metadata said {expected}",
                out.len()
            );
        }
    }

    Ok(out)
}

/// Lenient top-level convenience: on any codec failure, log and hand back
/// the input unchanged.
///
/// This mirrors long-standing tool behavior for display/preview contexts and
/// exists only at this boundary; nothing that persists data may use it.
pub fn decompress_or_original(data: &[u8], codec: Codec, expected_size: Option<usize>) -> Vec<u8> {
    match decompress(data, codec, expected_size) {
        Ok(out) => out,
        Err(e) => {
            warn!("{codec} decompression failed, returning original bytes: {e}");
            data.to_vec()
        }
    }
}

/// Guess the algorithm from payload signatures.
///
/// Used only when provenance metadata is missing. No recognizable signature
/// deliberately falls back to zlib rather than "stored" — unmarked
/// compressed payloads in the wild are overwhelmingly deflate streams.
pub fn probe(data: &[u8]) -> Option<Codec> {
    if data.is_empty() {
        return None;
    }

    if data.len() >= 4 {
        if data[..4] == LZ4_FRAME_MAGIC {
            return Some(Codec::Lz4);
        }
        if data[..4] == ZSTD_FRAME_MAGIC {
            return Some(Codec::Zstd);
        }
    }
    if data.len() >= 2 {
        if data[..2] == GZIP_MAGIC {
            return Some(Codec::Gzip);
        }
        if data[0] == 0x78 && matches!(data[1], 0x01 | 0x9C | 0xDA) {
            return Some(Codec::Zlib);
        }
    }

    Some(Codec::Zlib)
}

fn decompress_zlib(data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    ZlibDecoder::new(data)
        .read_to_end(&mut out)
        .map_err(|e| Error::DecompressionFailed(format!("zlib: {e}")))?;
    Ok(out)
}

fn decompress_gzip(data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    GzDecoder::new(data)
        .read_to_end(&mut out)
        .map_err(|e| Error::DecompressionFailed(format!("gzip: {e}")))?;
    Ok(out)
}

fn decompress_deflate(data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    DeflateDecoder::new(data)
        .read_to_end(&mut out)
        .map_err(|e| Error::DecompressionFailed(format!("deflate: {e}")))?;
    Ok(out)
}

fn decompress_lz4(data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    lz4_flex::frame::FrameDecoder::new(data)
        .read_to_end(&mut out)
        .map_err(|e| Error::DecompressionFailed(format!("LZ4 frame: {e}")))?;
    Ok(out)
}

fn decompress_zstd(data: &[u8]) -> Result<Vec<u8>> {
    zstd::stream::decode_all(data).map_err(|e| Error::DecompressionFailed(format!("zstd: {e}")))
}

/// Strip the fastman92 frame, decode the body, verify the recorded size.
fn decompress_framed(data: &[u8], inner: fn(&[u8]) -> Result<Vec<u8>>) -> Result<Vec<u8>> {
    let header = FrameHeader::parse(data)?;
    let out = inner(header.body(data)?)?;

    if out.len() != header.original_size as usize {
        return Err(Error::SizeMismatch {
            expected: header.original_size as usize,
            actual: out.len(),
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compress::compress;
    use pretty_assertions::assert_eq;

    const ALL_CODECS: [Codec; 7] = [
        Codec::Zlib,
        Codec::Gzip,
        Codec::Deflate,
        Codec::Lz4,
        Codec::Zstd,
        Codec::FramedZlib,
        Codec::FramedLz4,
    ];

    #[test]
    fn round_trips_empty_input() {
        for codec in ALL_CODECS {
            let packed = compress(&[], codec, None).unwrap();
            let out = decompress(&packed.data, codec, Some(0)).unwrap();
            assert_eq!(out, Vec::<u8>::new(), "codec {codec}");
        }
    }

    #[test]
    fn round_trips_small_input() {
        let payload = b"a small payload under a hundred bytes";
        for codec in ALL_CODECS {
            let packed = compress(payload, codec, Some(6)).unwrap();
            let out = decompress(&packed.data, codec, Some(payload.len())).unwrap();
            assert_eq!(out, payload.to_vec(), "codec {codec}");
        }
    }

    #[test]
    fn round_trips_large_repetitive_input() {
        let payload: Vec<u8> = (0..1_048_576u32).map(|i| (i % 7) as u8).collect();
        for codec in ALL_CODECS {
            let packed = compress(&payload, codec, None).unwrap();
            assert!(packed.compressed_size() < payload.len(), "codec {codec}");
            let out = decompress(&packed.data, codec, Some(payload.len())).unwrap();
            assert_eq!(out, payload, "codec {codec}");
        }
    }

    #[test]
    fn probe_recognizes_signatures() {
        assert_eq!(probe(&[0x78, 0x9C, 0, 0]), Some(Codec::Zlib));
        assert_eq!(probe(&[0x78, 0xDA]), Some(Codec::Zlib));
        assert_eq!(probe(&[0x1F, 0x8B, 0x08, 0x00]), Some(Codec::Gzip));
        assert_eq!(probe(&[0x04, 0x22, 0x4D, 0x18, 0x60]), Some(Codec::Lz4));
        assert_eq!(probe(&[0x28, 0xB5, 0x2F, 0xFD, 0x00]), Some(Codec::Zstd));
    }

    #[test]
    fn probe_falls_back_to_zlib() {
        // Deliberate policy: unknown signatures assume deflate, not stored.
        assert_eq!(probe(b"DFF model data"), Some(Codec::Zlib));
        assert_eq!(probe(&[]), None);
    }

    #[test]
    fn corrupt_stream_is_an_error() {
        let err = decompress(&[0x78, 0x9C, 0xFF, 0xFF, 0xFF], Codec::Zlib, None).unwrap_err();
        assert!(matches!(err, Error::DecompressionFailed(_)));
    }

    #[test]
    fn lenient_wrapper_returns_input_on_failure() {
        let garbage = [0x78, 0x9C, 0xFF, 0xFF, 0xFF];
        let out = decompress_or_original(&garbage, Codec::Zlib, None);
        assert_eq!(out, garbage.to_vec());
    }

    #[test]
    fn framed_detects_size_lies() {
        let packed = compress(b"hello world", Codec::FramedZlib, None).unwrap();
        let mut bytes = packed.data;
        // Corrupt the recorded original size.
        bytes[0] = 0xFF;
        let err = decompress(&bytes, Codec::FramedZlib, None).unwrap_err();
        assert!(matches!(err, Error::SizeMismatch { .. }));
    }
}
