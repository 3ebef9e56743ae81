//! Message-level encrypt and decrypt
//!
//! One call processes one whole message: write or parse the header, derive
//! the per-message keys, then run the record sequence. Each call is a pure
//! function of its inputs apart from [`encrypt`] drawing a fresh salt;
//! independent messages may be processed concurrently with no coordination.

use rand::RngCore;
use rand::rngs::OsRng;
use tracing::debug;

use crate::derivation::derive_keys;
use crate::error::EceError;
use crate::header::HeaderFields;
use crate::keys::{AuthSecret, LocalKeyPair, RemotePublicKey, shared_secret};
use crate::record::{RecordCipher, decode_record, encode_record};
use crate::scheme::{DEFAULT_RECORD_SIZE, SALT_LEN, Scheme, TAG_LEN};

/// Key id written by [`encrypt`] for `aesgcm` payloads.
///
/// Names the Diffie-Hellman entry of the out-of-band `Crypto-Key` header in
/// the originating protocol; `aesgcm` headers require a non-empty label.
const DEFAULT_KEY_ID: &[u8] = b"dh";

/// Encrypt `plaintext` into a self-delimiting payload (header plus records).
///
/// A fresh 16-byte salt is drawn from OS entropy, so encrypting the same
/// plaintext twice yields different payloads. The key id is empty for
/// `aes128gcm` and the label `dh` for `aesgcm`; use [`encrypt_with_salt`]
/// to set one or to control the salt.
///
/// `local` is the sender's key pair and `peer_public` the receiver's key.
/// `record_size` defaults to 4096 when `None`.
///
/// # Errors
///
/// - `MalformedHeader`: `record_size` outside the scheme's valid range
/// - `KeyDerivation`: `aes128gcm` without an authentication secret
pub fn encrypt(
    scheme: Scheme,
    plaintext: &[u8],
    local: &LocalKeyPair,
    peer_public: &RemotePublicKey,
    auth_secret: Option<&AuthSecret>,
    record_size: Option<u32>,
) -> Result<Vec<u8>, EceError> {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    let key_id = match scheme {
        Scheme::AesGcm => DEFAULT_KEY_ID,
        Scheme::Aes128Gcm => &[],
    };
    encrypt_with_salt(scheme, plaintext, local, peer_public, auth_secret, record_size, key_id, salt)
}

/// Encrypt with a caller-provided salt and key id.
///
/// Deterministic for fixed inputs, which keeps tests reproducible; the
/// caller owns salt freshness. A salt must never be reused with the same
/// key pair, or record nonces repeat across messages.
///
/// # Errors
///
/// - `MalformedHeader`: `record_size` out of range, or a key id that is
///   over 255 bytes (either scheme) or not a non-empty printable ASCII
///   label (`aesgcm`)
/// - `KeyDerivation`: `aes128gcm` without an authentication secret
#[allow(clippy::too_many_arguments)]
pub fn encrypt_with_salt(
    scheme: Scheme,
    plaintext: &[u8],
    local: &LocalKeyPair,
    peer_public: &RemotePublicKey,
    auth_secret: Option<&AuthSecret>,
    record_size: Option<u32>,
    key_id: &[u8],
    salt: [u8; SALT_LEN],
) -> Result<Vec<u8>, EceError> {
    let record_size = record_size.unwrap_or(DEFAULT_RECORD_SIZE);
    let sender_public = local.public_key();

    let header = HeaderFields {
        scheme,
        salt,
        record_size,
        key_id: key_id.to_vec(),
        sender_public: match scheme {
            Scheme::AesGcm => None,
            Scheme::Aes128Gcm => Some(sender_public),
        },
    };
    // Validates record size and key id before any key material is touched
    let mut payload = header.encode()?;

    let shared = shared_secret(local, peer_public);
    let keys = derive_keys(scheme, &shared, peer_public, &sender_public, auth_secret, &salt)?;
    let cipher = RecordCipher::new(keys);

    let capacity = scheme.record_capacity(record_size);
    let records = record_count(plaintext.len(), capacity);
    payload.reserve(plaintext.len() + records as usize * (record_size as usize - capacity));

    for seq in 0..records {
        let start = seq as usize * capacity;
        let end = plaintext.len().min(start + capacity);
        let is_final = seq == records - 1;

        let framed = encode_record(scheme, &plaintext[start..end], is_final);
        payload.extend_from_slice(&cipher.seal(seq, &framed));
    }

    debug!(scheme = scheme.label(), records, payload_len = payload.len(), "sealed message");
    Ok(payload)
}

/// Decrypt a payload produced by [`encrypt`] under the same scheme.
///
/// `local` is the receiver's key pair. For `aesgcm` the sender's public key
/// travels out-of-band and must be passed as `sender_public`; for
/// `aes128gcm` it is read from the header and the parameter is ignored.
///
/// # Errors
///
/// - `MalformedHeader`: header truncated or out of range
/// - `KeyDerivation`: missing sender key (`aesgcm`) or missing
///   authentication secret (`aes128gcm`)
/// - `Truncated`: no records, or a final record with no room past the tag
/// - `AuthenticationFailed`: any record's tag fails to verify
/// - `Padding`: delimiter or padding-length violations after a record
///   authenticates
pub fn decrypt(
    scheme: Scheme,
    payload: &[u8],
    local: &LocalKeyPair,
    sender_public: Option<&RemotePublicKey>,
    auth_secret: Option<&AuthSecret>,
) -> Result<Vec<u8>, EceError> {
    let (header, body_start) = HeaderFields::parse(scheme, payload)?;
    let body = &payload[body_start..];

    let sender = match scheme {
        Scheme::Aes128Gcm => {
            let Some(sender) = header.sender_public else {
                unreachable!("aes128gcm parser always yields a sender key");
            };
            sender
        },
        Scheme::AesGcm => *sender_public.ok_or_else(|| EceError::KeyDerivation {
            reason: "aesgcm carries the sender public key out-of-band; none was supplied"
                .to_string(),
        })?,
    };

    let receiver_public = local.public_key();
    let shared = shared_secret(local, &sender);
    let keys = derive_keys(scheme, &shared, &receiver_public, &sender, auth_secret, &header.salt)?;
    let cipher = RecordCipher::new(keys);

    if body.is_empty() {
        return Err(EceError::Truncated { reason: "payload contains no records".to_string() });
    }

    let record_size = header.record_size as usize;
    let records = body.len().div_ceil(record_size);
    let mut plaintext = Vec::with_capacity(body.len());

    for (seq, record) in body.chunks(record_size).enumerate() {
        // Only the final record may be short; chunking guarantees the rest
        if record.len() <= TAG_LEN {
            return Err(EceError::Truncated {
                reason: format!(
                    "final record is {} bytes, too short to hold content past the tag",
                    record.len()
                ),
            });
        }

        let is_final = seq == records - 1;
        let framed = cipher.open(seq as u64, record)?;
        let content = decode_record(scheme, &framed, is_final)?;
        plaintext.extend_from_slice(&content);
    }

    debug!(scheme = scheme.label(), records, plaintext_len = plaintext.len(), "opened message");
    Ok(plaintext)
}

/// Number of records a plaintext occupies.
///
/// A plaintext that exactly fills its records (including the empty one)
/// still gets a final record with empty content, so the receiver always
/// sees a properly terminated sequence.
fn record_count(plaintext_len: usize, capacity: usize) -> u64 {
    // The final record holds the remainder, which may be empty; an exact
    // multiple therefore still rolls over into one more record.
    (plaintext_len / capacity) as u64 + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Endpoints {
        sender: LocalKeyPair,
        receiver: LocalKeyPair,
        auth: AuthSecret,
    }

    fn endpoints() -> Endpoints {
        Endpoints {
            sender: LocalKeyPair::generate(),
            receiver: LocalKeyPair::generate(),
            auth: AuthSecret::from_bytes(&[0xA5; 16]).unwrap(),
        }
    }

    fn round_trip(scheme: Scheme, plaintext: &[u8], record_size: Option<u32>) {
        let e = endpoints();
        let payload = encrypt(
            scheme,
            plaintext,
            &e.sender,
            &e.receiver.public_key(),
            Some(&e.auth),
            record_size,
        )
        .unwrap();

        let sender_public = e.sender.public_key();
        let decrypted =
            decrypt(scheme, &payload, &e.receiver, Some(&sender_public), Some(&e.auth)).unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn round_trip_both_schemes() {
        for scheme in [Scheme::AesGcm, Scheme::Aes128Gcm] {
            round_trip(scheme, b"hello, push payload", None);
        }
    }

    #[test]
    fn round_trip_empty_plaintext() {
        for scheme in [Scheme::AesGcm, Scheme::Aes128Gcm] {
            round_trip(scheme, b"", None);
        }
    }

    #[test]
    fn round_trip_multi_record() {
        for scheme in [Scheme::AesGcm, Scheme::Aes128Gcm] {
            // Small records force many of them
            round_trip(scheme, &vec![0x5Au8; 10_000], Some(64));
        }
    }

    #[test]
    fn round_trip_exact_capacity_multiple() {
        // 64-byte records: capacities 47 (aesgcm) and 46 (aes128gcm)
        for scheme in [Scheme::AesGcm, Scheme::Aes128Gcm] {
            let capacity = scheme.record_capacity(64);
            for multiple in 1..=3 {
                round_trip(scheme, &vec![0xC3u8; capacity * multiple], Some(64));
            }
        }
    }

    #[test]
    fn exact_multiple_appends_empty_final_record() {
        let e = endpoints();
        let capacity = Scheme::Aes128Gcm.record_capacity(64);
        let plaintext = vec![1u8; capacity * 2];

        let payload = encrypt(
            Scheme::Aes128Gcm,
            &plaintext,
            &e.sender,
            &e.receiver.public_key(),
            Some(&e.auth),
            Some(64),
        )
        .unwrap();

        // Two full records plus a padding-only final record (2 + 16 bytes)
        let header_len = 21 + 65;
        assert_eq!(payload.len(), header_len + 2 * 64 + 2 + TAG_LEN);
    }

    #[test]
    fn encrypt_salts_are_fresh_per_message() {
        let e = endpoints();
        let a = encrypt(
            Scheme::Aes128Gcm,
            b"same plaintext",
            &e.sender,
            &e.receiver.public_key(),
            Some(&e.auth),
            None,
        )
        .unwrap();
        let b = encrypt(
            Scheme::Aes128Gcm,
            b"same plaintext",
            &e.sender,
            &e.receiver.public_key(),
            Some(&e.auth),
            None,
        )
        .unwrap();
        assert_ne!(a, b);
        assert_ne!(a[..16], b[..16], "salts must differ");
    }

    #[test]
    fn encrypt_with_salt_is_deterministic() {
        let e = endpoints();
        let salt = [0x77; SALT_LEN];
        let seal = || {
            encrypt_with_salt(
                Scheme::AesGcm,
                b"deterministic",
                &e.sender,
                &e.receiver.public_key(),
                None,
                None,
                b"k0",
                salt,
            )
            .unwrap()
        };
        assert_eq!(seal(), seal());
    }

    #[test]
    fn aesgcm_decrypt_requires_sender_key() {
        let e = endpoints();
        let payload = encrypt(
            Scheme::AesGcm,
            b"payload",
            &e.sender,
            &e.receiver.public_key(),
            None,
            None,
        )
        .unwrap();

        let result = decrypt(Scheme::AesGcm, &payload, &e.receiver, None, None);
        assert!(matches!(result, Err(EceError::KeyDerivation { .. })));
    }

    #[test]
    fn aes128gcm_encrypt_requires_auth_secret() {
        let e = endpoints();
        let result =
            encrypt(Scheme::Aes128Gcm, b"payload", &e.sender, &e.receiver.public_key(), None, None);
        assert!(matches!(result, Err(EceError::KeyDerivation { .. })));
    }

    #[test]
    fn record_size_out_of_range_is_rejected_before_encryption() {
        let e = endpoints();
        for record_size in [0, 17, u32::MAX] {
            let result = encrypt(
                Scheme::AesGcm,
                b"payload",
                &e.sender,
                &e.receiver.public_key(),
                None,
                Some(record_size),
            );
            assert!(
                matches!(result, Err(EceError::MalformedHeader { .. })),
                "record size {record_size} must be rejected"
            );
        }
    }

    #[test]
    fn wrong_receiver_key_fails_authentication() {
        let e = endpoints();
        let payload = encrypt(
            Scheme::Aes128Gcm,
            b"payload",
            &e.sender,
            &e.receiver.public_key(),
            Some(&e.auth),
            None,
        )
        .unwrap();

        let intruder = LocalKeyPair::generate();
        let result = decrypt(Scheme::Aes128Gcm, &payload, &intruder, None, Some(&e.auth));
        assert!(matches!(result, Err(EceError::AuthenticationFailed)));
    }

    #[test]
    fn wrong_auth_secret_fails_authentication() {
        let e = endpoints();
        let payload = encrypt(
            Scheme::Aes128Gcm,
            b"payload",
            &e.sender,
            &e.receiver.public_key(),
            Some(&e.auth),
            None,
        )
        .unwrap();

        let other = AuthSecret::from_bytes(&[0x5A; 16]).unwrap();
        let result = decrypt(Scheme::Aes128Gcm, &payload, &e.receiver, None, Some(&other));
        assert!(matches!(result, Err(EceError::AuthenticationFailed)));
    }

    #[test]
    fn empty_body_is_truncated() {
        let e = endpoints();
        let payload = encrypt(
            Scheme::Aes128Gcm,
            b"payload",
            &e.sender,
            &e.receiver.public_key(),
            Some(&e.auth),
            None,
        )
        .unwrap();

        // Keep only the header (21-byte prefix + 65-byte sender key)
        let header_only = &payload[..21 + 65];
        let result = decrypt(Scheme::Aes128Gcm, header_only, &e.receiver, None, Some(&e.auth));
        assert!(matches!(result, Err(EceError::Truncated { .. })));
    }

    #[test]
    fn body_cut_inside_the_tag_is_truncated() {
        let e = endpoints();
        let payload = encrypt(
            Scheme::Aes128Gcm,
            b"payload",
            &e.sender,
            &e.receiver.public_key(),
            Some(&e.auth),
            None,
        )
        .unwrap();

        // Leave 10 bytes of body, less than one tag
        let cut = &payload[..21 + 65 + 10];
        let result = decrypt(Scheme::Aes128Gcm, cut, &e.receiver, None, Some(&e.auth));
        assert!(matches!(result, Err(EceError::Truncated { .. })));
    }

    #[test]
    fn dropping_the_final_aesgcm_record_is_detected() {
        let e = endpoints();
        let capacity = Scheme::AesGcm.record_capacity(64);
        let plaintext = vec![9u8; capacity * 2 + 5];

        let sender_public = e.sender.public_key();
        let payload = encrypt(
            Scheme::AesGcm,
            &plaintext,
            &e.sender,
            &e.receiver.public_key(),
            None,
            Some(64),
        )
        .unwrap();

        // Remove the short final record; the preceding record now ends the
        // message with an interior delimiter
        let cut = &payload[..payload.len() - (5 + 1 + TAG_LEN)];
        let result = decrypt(Scheme::AesGcm, cut, &e.receiver, Some(&sender_public), None);
        assert!(matches!(result, Err(EceError::Padding { .. })));
    }

    #[test]
    fn record_counts() {
        assert_eq!(record_count(0, 10), 1);
        assert_eq!(record_count(1, 10), 1);
        assert_eq!(record_count(9, 10), 1);
        assert_eq!(record_count(10, 10), 2);
        assert_eq!(record_count(11, 10), 2);
        assert_eq!(record_count(20, 10), 3);
    }
}
