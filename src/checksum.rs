//! CRC-32 checksum primitive (C1).
//!
//! A single function computing CRC-32C over an arbitrary byte range. Used
//! both for the header's self-checksum (excluding the checksum field
//! itself) and for the per-extent `checksum` recorded in the page index.

/// Compute the CRC-32C of `data`.
pub fn crc32(data: &[u8]) -> u32 {
    crc32c::crc32c(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_has_known_crc() {
        assert_eq!(crc32(&[]), 0);
    }

    #[test]
    fn same_bytes_same_crc() {
        let a = crc32(b"hello world");
        let b = crc32(b"hello world");
        assert_eq!(a, b);
    }

    #[test]
    fn different_bytes_usually_differ() {
        assert_ne!(crc32(b"hello world"), crc32(b"hello worle"));
    }

    #[test]
    fn crc_is_sensitive_to_range() {
        let full = b"0123456789";
        let whole = crc32(full);
        let partial = crc32(&full[0..9]);
        assert_ne!(whole, partial);
    }
}
