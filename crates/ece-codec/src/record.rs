//! Per-record AEAD sealing and padding framing
//!
//! A record's plaintext carries scheme-specific framing around the content:
//! `aesgcm` suffixes a one-byte delimiter (`0x00` interior, `0x01` final),
//! `aes128gcm` prefixes a two-byte padding length followed by that many zero
//! bytes. The tag is always verified before the framing is inspected, so a
//! padding failure can never act as an oracle over unauthenticated data.

use aes_gcm::{
    Aes128Gcm, Nonce,
    aead::{Aead, KeyInit},
};

use crate::derivation::DerivedKeys;
use crate::error::EceError;
use crate::scheme::Scheme;

/// Delimiter byte of an interior `aesgcm` record
const DELIMITER_INTERIOR: u8 = 0x00;

/// Delimiter byte of the final `aesgcm` record
const DELIMITER_FINAL: u8 = 0x01;

/// AES-128-GCM cipher bound to one message's derived keys.
///
/// Consumes the [`DerivedKeys`] so a key schedule drives exactly one record
/// sequence; restarting would reuse nonces.
pub(crate) struct RecordCipher {
    cipher: Aes128Gcm,
    keys: DerivedKeys,
}

impl RecordCipher {
    pub(crate) fn new(keys: DerivedKeys) -> Self {
        let cipher = Aes128Gcm::new(keys.cek().into());
        Self { cipher, keys }
    }

    /// Encrypt one framed plaintext record under the nonce for `seq`.
    pub(crate) fn seal(&self, seq: u64, plain_record: &[u8]) -> Vec<u8> {
        let nonce = self.keys.record_nonce(seq);
        let Ok(ciphertext) = self.cipher.encrypt(&Nonce::from(nonce), plain_record) else {
            unreachable!("AES-128-GCM encryption cannot fail with valid inputs");
        };
        ciphertext
    }

    /// Decrypt and authenticate one ciphertext record.
    ///
    /// # Errors
    ///
    /// - `AuthenticationFailed`: the tag does not verify
    pub(crate) fn open(&self, seq: u64, cipher_record: &[u8]) -> Result<Vec<u8>, EceError> {
        let nonce = self.keys.record_nonce(seq);
        self.cipher
            .decrypt(&Nonce::from(nonce), cipher_record)
            .map_err(|_| EceError::AuthenticationFailed)
    }
}

/// Frame one chunk of content as a plaintext record.
pub(crate) fn encode_record(scheme: Scheme, content: &[u8], is_final: bool) -> Vec<u8> {
    match scheme {
        Scheme::AesGcm => {
            let mut record = Vec::with_capacity(content.len() + 1);
            record.extend_from_slice(content);
            record.push(if is_final { DELIMITER_FINAL } else { DELIMITER_INTERIOR });
            record
        },
        Scheme::Aes128Gcm => {
            // Encoding always writes pad length zero; decoding accepts any
            // valid pad length.
            let mut record = Vec::with_capacity(content.len() + 2);
            record.extend_from_slice(&0u16.to_be_bytes());
            record.extend_from_slice(content);
            record
        },
    }
}

/// Strip the framing from an authenticated plaintext record.
///
/// # Errors
///
/// - `Padding`: the delimiter byte is wrong for the record's position, the
///   declared padding length overruns the record, or a pad byte is nonzero
pub(crate) fn decode_record(
    scheme: Scheme,
    plain_record: &[u8],
    is_final: bool,
) -> Result<Vec<u8>, EceError> {
    match scheme {
        Scheme::AesGcm => {
            let Some((&delimiter, content)) = plain_record.split_last() else {
                return Err(padding("record has no delimiter byte".to_string()));
            };
            let expected = if is_final { DELIMITER_FINAL } else { DELIMITER_INTERIOR };
            if delimiter != expected {
                return Err(padding(format!(
                    "expected delimiter {expected:#04x}, got {delimiter:#04x}"
                )));
            }
            Ok(content.to_vec())
        },
        Scheme::Aes128Gcm => {
            if plain_record.len() < 2 {
                return Err(padding("record too short for a padding length".to_string()));
            }
            let pad_len = u16::from_be_bytes([plain_record[0], plain_record[1]]) as usize;
            let rest = &plain_record[2..];
            if pad_len > rest.len() {
                return Err(padding(format!(
                    "padding length {pad_len} exceeds {} remaining bytes",
                    rest.len()
                )));
            }
            if rest[..pad_len].iter().any(|&b| b != 0) {
                return Err(padding("padding bytes must be zero".to_string()));
            }
            Ok(rest[pad_len..].to_vec())
        },
    }
}

fn padding(reason: String) -> EceError {
    EceError::Padding { reason }
}
