//! On-disk entry encoding.
//!
//! Every value in the entries table is an 8-byte header followed by the
//! payload:
//!
//! ```text
//! +----------------+----------------+------------------+
//! | expiration u32 | flags u32      | payload ...      |
//! | big-endian     | big-endian     |                  |
//! +----------------+----------------+------------------+
//! 0                4                8
//! ```
//!
//! The expiration sits at a fixed offset so it can be read without touching
//! the payload (reaper scans) and rewritten in place (touch, get-and-touch).

use crate::error::{Error, Result};

use super::expiry;

/// Size of the fixed header preceding the payload.
pub const HEADER_LEN: usize = 8;

const EXPIRATION: std::ops::Range<usize> = 0..4;
const FLAGS: std::ops::Range<usize> = 4..8;

/// Decoded value stored under a key.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Entry {
    /// Absolute expiration in epoch seconds, `0` for never.
    pub expiration: u32,
    /// Opaque client flags.
    pub flags: u32,
    /// Stored bytes.
    pub payload: Vec<u8>,
}

impl Entry {
    pub fn new(expiration: u32, flags: u32, payload: Vec<u8>) -> Self {
        Self {
            expiration,
            flags,
            payload,
        }
    }

    /// Encodes the entry as header + payload.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(HEADER_LEN + self.payload.len());
        buf.extend_from_slice(&self.expiration.to_be_bytes());
        buf.extend_from_slice(&self.flags.to_be_bytes());
        buf.extend_from_slice(&self.payload);
        buf
    }

    /// Decodes a stored record, copying the payload out.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CorruptEntry`] if `buf` is shorter than the header.
    pub fn decode(buf: &[u8]) -> Result<Self> {
        check_len(buf)?;
        Ok(Self {
            expiration: read_u32(buf, EXPIRATION),
            flags: read_u32(buf, FLAGS),
            payload: buf[HEADER_LEN..].to_vec(),
        })
    }

    /// Whether the entry is expired at `now`.
    #[must_use]
    pub fn is_expired(&self, now: u32) -> bool {
        expiry::is_expired(self.expiration, now)
    }
}

/// Reads only the expiration from a stored record.
///
/// # Errors
///
/// Returns [`Error::CorruptEntry`] if `buf` is shorter than the header.
pub fn decode_expiration(buf: &[u8]) -> Result<u32> {
    check_len(buf)?;
    Ok(read_u32(buf, EXPIRATION))
}

/// Overwrites the expiration of an encoded record, leaving flags and payload
/// untouched.
///
/// # Errors
///
/// Returns [`Error::CorruptEntry`] if `buf` is shorter than the header.
pub fn rewrite_expiration(buf: &mut [u8], expiration: u32) -> Result<()> {
    check_len(buf)?;
    buf[EXPIRATION].copy_from_slice(&expiration.to_be_bytes());
    Ok(())
}

fn check_len(buf: &[u8]) -> Result<()> {
    if buf.len() < HEADER_LEN {
        return Err(Error::CorruptEntry { len: buf.len() });
    }
    Ok(())
}

fn read_u32(buf: &[u8], range: std::ops::Range<usize>) -> u32 {
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&buf[range]);
    u32::from_be_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_encode_layout() {
        let entry = Entry::new(0x0102_0304, 0xAABB_CCDD, b"hi".to_vec());
        assert_eq!(
            entry.encode(),
            vec![0x01, 0x02, 0x03, 0x04, 0xAA, 0xBB, 0xCC, 0xDD, b'h', b'i']
        );
    }

    #[test]
    fn test_empty_payload_is_header_only() {
        let entry = Entry::new(0, 7, Vec::new());
        let buf = entry.encode();
        assert_eq!(buf.len(), HEADER_LEN);
        assert_eq!(Entry::decode(&buf).unwrap(), entry);
    }

    #[test]
    fn test_short_record_is_corrupt() {
        assert!(matches!(
            Entry::decode(&[0, 0, 0]),
            Err(Error::CorruptEntry { len: 3 })
        ));
        assert!(matches!(
            decode_expiration(&[0; 7]),
            Err(Error::CorruptEntry { len: 7 })
        ));
        assert!(rewrite_expiration(&mut [0; 2], 1).is_err());
    }

    #[test]
    fn test_decode_expiration_ignores_payload() {
        let buf = Entry::new(42, 1, vec![9; 4096]).encode();
        assert_eq!(decode_expiration(&buf).unwrap(), 42);
    }

    #[test]
    fn test_rewrite_expiration_keeps_rest() {
        let original = Entry::new(10, 99, b"payload".to_vec());
        let mut buf = original.encode();

        rewrite_expiration(&mut buf, 12345).unwrap();

        let decoded = Entry::decode(&buf).unwrap();
        assert_eq!(decoded.expiration, 12345);
        assert_eq!(decoded.flags, 99);
        assert_eq!(decoded.payload, b"payload");
    }

    proptest! {
        #[test]
        fn prop_decode_inverts_encode(
            expiration in any::<u32>(),
            flags in any::<u32>(),
            payload in prop::collection::vec(any::<u8>(), 0..512),
        ) {
            let entry = Entry::new(expiration, flags, payload);
            prop_assert_eq!(Entry::decode(&entry.encode()).unwrap(), entry);
        }

        #[test]
        fn prop_header_readable_without_payload(
            expiration in any::<u32>(),
            payload in prop::collection::vec(any::<u8>(), 0..64),
        ) {
            let buf = Entry::new(expiration, 0, payload).encode();
            prop_assert_eq!(decode_expiration(&buf[..HEADER_LEN]).unwrap(), expiration);
        }
    }
}
