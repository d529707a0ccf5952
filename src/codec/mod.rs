//! Codec plug-in contract and registry (C2).
//!
//! Compression and encryption are modeled as capability sets (§6.4 /
//! §9 "Polymorphism over codecs"): a trait each, with a name, a worst-case
//! output size, and encode/decode. The registry is a plain value built at
//! container-construction time — no process-wide singleton, per the
//! Design Notes' guidance against global mutable state.

pub mod compression;
pub mod encryption;

use std::collections::HashMap;
use std::sync::Arc;

/// A compression codec, matching the §6.4 compression contract.
pub trait CompressionCodec: Send + Sync {
    /// Bounded name stored in the container header (≤ 16 bytes, NUL-padded).
    fn name(&self) -> &'static str;
    /// Upper bound on compressed output size for a `src_len`-byte input.
    fn max_output_size(&self, src_len: usize) -> usize;
    /// Compress `src` into a fresh buffer. Returns `None` on internal codec
    /// failure (never used to signal "didn't shrink" — that's the caller's
    /// job in the codec pipeline).
    fn compress(&self, src: &[u8], level: i32) -> Option<Vec<u8>>;
    /// Decompress `src`, whose decoded length is expected to be `dst_len`.
    fn decompress(&self, src: &[u8], dst_len: usize) -> Option<Vec<u8>>;
}

/// An encryption codec, matching the §6.4 encryption contract.
pub trait EncryptionCodec: Send + Sync {
    /// Bounded name stored in the container header (≤ 16 bytes, NUL-padded).
    fn name(&self) -> &'static str;
    /// Nominal key size in bytes.
    fn key_size(&self) -> usize;
    /// Upper bound on the worst-case per-call overhead (IV + padding) added
    /// on top of the plaintext length.
    fn max_overhead(&self) -> usize;
    fn encrypt(&self, key: &[u8], src: &[u8]) -> Option<Vec<u8>>;
    fn decrypt(&self, key: &[u8], src: &[u8]) -> Option<Vec<u8>>;
}

/// Name → implementation lookup, built once at container-construction
/// time and held for the life of a handle.
#[derive(Clone)]
pub struct CodecRegistry {
    compressors: HashMap<&'static str, Arc<dyn CompressionCodec>>,
    encryptors: HashMap<&'static str, Arc<dyn EncryptionCodec>>,
}

impl CodecRegistry {
    /// An empty registry (no compression, no encryption available).
    pub fn empty() -> Self {
        Self {
            compressors: HashMap::new(),
            encryptors: HashMap::new(),
        }
    }

    /// A registry carrying the two built-in compression codecs (`zlib`,
    /// `lz4`) and the one built-in encryption codec (`aes256-cbc`).
    pub fn with_defaults() -> Self {
        let mut reg = Self::empty();
        reg.register_compression(Arc::new(compression::ZlibCodec));
        reg.register_compression(Arc::new(compression::Lz4Codec));
        reg.register_encryption(Arc::new(encryption::Aes256CbcCodec));
        reg
    }

    pub fn register_compression(&mut self, codec: Arc<dyn CompressionCodec>) {
        self.compressors.insert(codec.name(), codec);
    }

    pub fn register_encryption(&mut self, codec: Arc<dyn EncryptionCodec>) {
        self.encryptors.insert(codec.name(), codec);
    }

    pub fn compression(&self, name: &str) -> Option<Arc<dyn CompressionCodec>> {
        self.compressors.get(name).cloned()
    }

    pub fn encryption(&self, name: &str) -> Option<Arc<dyn EncryptionCodec>> {
        self.encryptors.get(name).cloned()
    }
}

impl Default for CodecRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_has_builtin_codecs() {
        let reg = CodecRegistry::with_defaults();
        assert!(reg.compression("zlib").is_some());
        assert!(reg.compression("lz4").is_some());
        assert!(reg.encryption("aes256-cbc").is_some());
        assert!(reg.compression("bogus").is_none());
    }

    #[test]
    fn empty_registry_has_nothing() {
        let reg = CodecRegistry::empty();
        assert!(reg.compression("zlib").is_none());
        assert!(reg.encryption("aes256-cbc").is_none());
    }
}
