//! Fuzz target for the stored entry codec.
//!
//! Arbitrary bytes read back from the database must never panic the decoder:
//! short records are rejected, anything else decodes and re-encodes to the
//! same bytes.
//!
//! Run with: `cargo +nightly fuzz run fuzz_entry_decode`

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use ttlcache::store::entry::{Entry, HEADER_LEN, decode_expiration, rewrite_expiration};

#[derive(Arbitrary, Debug)]
struct EntryInput {
    /// Raw stored value
    raw: Vec<u8>,
    /// Expiration to write back in place
    new_expiration: u32,
}

fuzz_target!(|input: EntryInput| {
    let EntryInput { mut raw, new_expiration } = input;

    match Entry::decode(&raw) {
        Ok(entry) => {
            assert!(raw.len() >= HEADER_LEN);
            assert_eq!(entry.encode(), raw, "decode/encode must be lossless");
            assert_eq!(decode_expiration(&raw).ok(), Some(entry.expiration));

            rewrite_expiration(&mut raw, new_expiration).expect("header present");
            let rewritten = Entry::decode(&raw).expect("still decodable");
            assert_eq!(rewritten.expiration, new_expiration);
            assert_eq!(rewritten.flags, entry.flags);
            assert_eq!(rewritten.payload, entry.payload);
        },
        Err(_) => {
            assert!(raw.len() < HEADER_LEN);
            assert!(decode_expiration(&raw).is_err());
            assert!(rewrite_expiration(&mut raw, new_expiration).is_err());
        },
    }
});
