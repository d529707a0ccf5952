//! Built-in encryption codec.
//!
//! Grounded in the teacher's `innodb::decryption::DecryptionContext`, which
//! decrypts AES-256-CBC page bodies given a tablespace key and IV. That
//! module only ever decrypts (it's a forensics reader); the page store
//! needs both directions, so encryption is added here. A fresh random IV
//! is generated per call and prepended to the ciphertext, since (unlike
//! the teacher's per-tablespace fixed IV) each page write must be able to
//! fail over to a new extent independently.

use aes::cipher::block_padding::Pkcs7;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use aes::Aes256;
use rand::RngCore;

use super::EncryptionCodec;

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

const BLOCK_SIZE: usize = 16;
const IV_SIZE: usize = 16;
const KEY_SIZE: usize = 32;

/// AES-256-CBC with a random per-call IV prefixed to the ciphertext.
pub struct Aes256CbcCodec;

impl EncryptionCodec for Aes256CbcCodec {
    fn name(&self) -> &'static str {
        "aes256-cbc"
    }

    fn key_size(&self) -> usize {
        KEY_SIZE
    }

    fn max_overhead(&self) -> usize {
        // IV prefix plus worst-case PKCS7 padding (a full extra block).
        IV_SIZE + BLOCK_SIZE
    }

    fn encrypt(&self, key: &[u8], src: &[u8]) -> Option<Vec<u8>> {
        if key.len() != KEY_SIZE {
            return None;
        }
        let mut iv = [0u8; IV_SIZE];
        rand::thread_rng().fill_bytes(&mut iv);

        let encryptor = Aes256CbcEnc::new_from_slices(key, &iv).ok()?;
        let ciphertext = encryptor.encrypt_padded_vec_mut::<Pkcs7>(src);

        let mut out = Vec::with_capacity(IV_SIZE + ciphertext.len());
        out.extend_from_slice(&iv);
        out.extend_from_slice(&ciphertext);
        Some(out)
    }

    fn decrypt(&self, key: &[u8], src: &[u8]) -> Option<Vec<u8>> {
        if key.len() != KEY_SIZE || src.len() < IV_SIZE {
            return None;
        }
        let (iv, ciphertext) = src.split_at(IV_SIZE);
        let decryptor = Aes256CbcDec::new_from_slices(key, iv).ok()?;
        decryptor.decrypt_padded_vec_mut::<Pkcs7>(ciphertext).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: [u8; KEY_SIZE] = [7u8; KEY_SIZE];

    #[test]
    fn encrypt_then_decrypt_recovers_plaintext() {
        let codec = Aes256CbcCodec;
        let plaintext = b"the quick brown fox jumps over the lazy dog".to_vec();
        let ciphertext = codec.encrypt(&KEY, &plaintext).unwrap();
        let decrypted = codec.decrypt(&KEY, &ciphertext).unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn two_encrypt_calls_produce_different_ciphertext() {
        let codec = Aes256CbcCodec;
        let plaintext = vec![0x41u8; 64];
        let c1 = codec.encrypt(&KEY, &plaintext).unwrap();
        let c2 = codec.encrypt(&KEY, &plaintext).unwrap();
        // Random IV means decrypt(encrypt(x)) == x but ciphertexts differ.
        assert_ne!(c1, c2);
        assert_eq!(codec.decrypt(&KEY, &c1).unwrap(), plaintext);
        assert_eq!(codec.decrypt(&KEY, &c2).unwrap(), plaintext);
    }

    #[test]
    fn wrong_key_length_is_rejected() {
        let codec = Aes256CbcCodec;
        assert!(codec.encrypt(&[0u8; 10], b"data").is_none());
    }

    #[test]
    fn decrypt_with_wrong_key_does_not_recover_plaintext() {
        let codec = Aes256CbcCodec;
        let plaintext = b"secret page contents".to_vec();
        let ciphertext = codec.encrypt(&KEY, &plaintext).unwrap();
        let wrong_key = [9u8; KEY_SIZE];
        // Either padding validation fails (None) or garbage comes out; in
        // neither case do we recover the original plaintext.
        if let Some(decrypted) = codec.decrypt(&wrong_key, &ciphertext) {
            assert_ne!(decrypted, plaintext);
        }
    }
}
