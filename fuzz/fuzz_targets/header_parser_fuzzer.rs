//! Fuzz target for wire-format header parsing
//!
//! # Strategy
//!
//! - Random bytes: arbitrary header prefixes (general malformation)
//! - Both schemes: the same bytes parsed under each scheme's rules
//!
//! # Invariants
//!
//! - Parsing NEVER panics on arbitrary input
//! - A header that parses re-encodes to bytes that parse to equal fields

#![no_main]

use ece_codec::header::HeaderFields;
use ece_codec::Scheme;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    for scheme in [Scheme::AesGcm, Scheme::Aes128Gcm] {
        let Ok((fields, offset)) = HeaderFields::parse(scheme, data) else {
            continue;
        };
        assert!(offset <= data.len());

        let encoded = fields.encode().expect("parsed fields must re-encode");
        assert_eq!(&encoded[..], &data[..offset]);

        let (reparsed, reparsed_offset) =
            HeaderFields::parse(scheme, &encoded).expect("re-encoded header must parse");
        assert_eq!(reparsed_offset, encoded.len());
        assert_eq!(reparsed.salt, fields.salt);
        assert_eq!(reparsed.record_size, fields.record_size);
        assert_eq!(reparsed.key_id, fields.key_id);
    }
});
