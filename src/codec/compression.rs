//! Built-in compression codecs.
//!
//! Grounded in the teacher's `innodb::compression` module, which already
//! knew how to decompress zlib (`flate2`) and LZ4 (`lz4_flex`) InnoDB
//! pages. Here both directions are needed, since this crate is the one
//! producing the compressed extents, not just reading ones MySQL wrote.

use std::io::{Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;

use super::CompressionCodec;

/// zlib/deflate, via `flate2`.
pub struct ZlibCodec;

impl CompressionCodec for ZlibCodec {
    fn name(&self) -> &'static str {
        "zlib"
    }

    fn max_output_size(&self, src_len: usize) -> usize {
        // zlib's documented worst case: input + 0.1% + 12 bytes, rounded up.
        src_len + (src_len / 1000) + 64
    }

    fn compress(&self, src: &[u8], level: i32) -> Option<Vec<u8>> {
        let level = level.clamp(0, 9) as u32;
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::new(level));
        encoder.write_all(src).ok()?;
        encoder.finish().ok()
    }

    fn decompress(&self, src: &[u8], dst_len: usize) -> Option<Vec<u8>> {
        let mut decoder = ZlibDecoder::new(src);
        let mut out = Vec::with_capacity(dst_len);
        decoder.read_to_end(&mut out).ok()?;
        Some(out)
    }
}

/// LZ4 block format, via `lz4_flex`.
pub struct Lz4Codec;

impl CompressionCodec for Lz4Codec {
    fn name(&self) -> &'static str {
        "lz4"
    }

    fn max_output_size(&self, src_len: usize) -> usize {
        lz4_flex::block::get_maximum_output_size(src_len)
    }

    fn compress(&self, src: &[u8], _level: i32) -> Option<Vec<u8>> {
        Some(lz4_flex::compress(src))
    }

    fn decompress(&self, src: &[u8], dst_len: usize) -> Option<Vec<u8>> {
        lz4_flex::decompress(src, dst_len).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zlib_roundtrips_compressible_data() {
        let codec = ZlibCodec;
        let src = vec![b'a'; 4096];
        let compressed = codec.compress(&src, 6).unwrap();
        assert!(compressed.len() < src.len());
        let decompressed = codec.decompress(&compressed, src.len()).unwrap();
        assert_eq!(decompressed, src);
    }

    #[test]
    fn zlib_roundtrips_incompressible_data() {
        let codec = ZlibCodec;
        let src: Vec<u8> = (0..=255u8).cycle().take(4096).collect();
        let compressed = codec.compress(&src, 6).unwrap();
        let decompressed = codec.decompress(&compressed, src.len()).unwrap();
        assert_eq!(decompressed, src);
    }

    #[test]
    fn lz4_roundtrips_compressible_data() {
        let codec = Lz4Codec;
        let src = vec![b'b'; 4096];
        let compressed = codec.compress(&src, 0).unwrap();
        assert!(compressed.len() < src.len());
        let decompressed = codec.decompress(&compressed, src.len()).unwrap();
        assert_eq!(decompressed, src);
    }

    #[test]
    fn max_output_size_is_an_upper_bound() {
        let zlib = ZlibCodec;
        let lz4 = Lz4Codec;
        let src = vec![0x42u8; 8192];
        assert!(zlib.compress(&src, 6).unwrap().len() <= zlib.max_output_size(src.len()));
        assert!(lz4.compress(&src, 0).unwrap().len() <= lz4.max_output_size(src.len()));
    }
}
