//! Fuzz target for the full decrypt path
//!
//! # Strategy
//!
//! - Arbitrary payload bytes under both schemes, with and without an
//!   authentication secret
//!
//! # Invariants
//!
//! - Decryption completes quickly and NEVER panics
//! - Failures always surface as a specific error, never as plaintext from
//!   unauthenticated data

#![no_main]

use arbitrary::Arbitrary;
use ece_codec::{decrypt, AuthSecret, LocalKeyPair, Scheme};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct DecryptInput {
    use_aes128gcm: bool,
    with_auth: bool,
    payload: Vec<u8>,
}

fuzz_target!(|input: DecryptInput| {
    // Fixed keys; the interesting surface is the payload parser
    let local = LocalKeyPair::from_raw_scalar(&[0x17; 32]).expect("fixed scalar is valid");
    let sender = LocalKeyPair::from_raw_scalar(&[0x29; 32]).expect("fixed scalar is valid");
    let sender_public = sender.public_key();
    let auth = AuthSecret::from_bytes(&[0x33; 16]).expect("fixed secret is valid");

    let scheme = if input.use_aes128gcm { Scheme::Aes128Gcm } else { Scheme::AesGcm };
    let auth = input.with_auth.then_some(&auth);

    let _ = decrypt(scheme, &input.payload, &local, Some(&sender_public), auth);
});
