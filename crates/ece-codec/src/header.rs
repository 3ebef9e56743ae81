//! Wire-format header parsing and serialization
//!
//! Both schemes open with the same 21-byte prefix:
//!
//! ```text
//! salt(16) || record_size_be32(4) || keyid_len(1)
//! ```
//!
//! `aesgcm` follows with `keyid(keyid_len)` and nothing else; the sender
//! public key travels out-of-band. `aes128gcm` follows with
//! `sender_pubkey(65) || keyid(keyid_len)` and is fully self-contained.

use crate::error::EceError;
use crate::keys::RemotePublicKey;
use crate::scheme::{MAX_RECORD_SIZE, PUBLIC_KEY_LEN, SALT_LEN, Scheme};

/// Fixed prefix shared by both schemes: salt, record size, key-id length.
const PREFIX_LEN: usize = SALT_LEN + 4 + 1;

/// Parsed header metadata for one message.
#[derive(Debug, Clone)]
pub struct HeaderFields {
    /// Scheme the header was parsed or will be written under
    pub scheme: Scheme,
    /// Per-message salt
    pub salt: [u8; SALT_LEN],
    /// Ciphertext record size in bytes
    pub record_size: u32,
    /// Key identifier; a printable ASCII label for `aesgcm`, opaque bytes
    /// for `aes128gcm`
    pub key_id: Vec<u8>,
    /// Sender public key; present only for `aes128gcm`
    pub sender_public: Option<RemotePublicKey>,
}

impl HeaderFields {
    /// Parse the header prefix of `payload`, returning the fields and the
    /// offset at which the record body begins.
    ///
    /// # Errors
    ///
    /// - `MalformedHeader`: any field truncated or out of range
    pub fn parse(scheme: Scheme, payload: &[u8]) -> Result<(Self, usize), EceError> {
        if payload.len() < PREFIX_LEN {
            return Err(malformed(format!(
                "need at least {PREFIX_LEN} bytes of header, got {}",
                payload.len()
            )));
        }

        let mut salt = [0u8; SALT_LEN];
        salt.copy_from_slice(&payload[..SALT_LEN]);

        let mut rs_bytes = [0u8; 4];
        rs_bytes.copy_from_slice(&payload[SALT_LEN..SALT_LEN + 4]);
        let record_size = u32::from_be_bytes(rs_bytes);
        validate_record_size(scheme, record_size)?;

        let key_id_len = payload[SALT_LEN + 4] as usize;
        let mut offset = PREFIX_LEN;

        let sender_public = match scheme {
            Scheme::AesGcm => None,
            Scheme::Aes128Gcm => {
                let Some(point) = payload.get(offset..offset + PUBLIC_KEY_LEN) else {
                    return Err(malformed("sender public key truncated".to_string()));
                };
                let key = RemotePublicKey::from_uncompressed_bytes(point)
                    .map_err(|_| malformed("sender public key is not a valid point".to_string()))?;
                offset += PUBLIC_KEY_LEN;
                Some(key)
            },
        };

        let Some(key_id) = payload.get(offset..offset + key_id_len) else {
            return Err(malformed(format!(
                "key id truncated: declared {key_id_len} bytes"
            )));
        };
        if scheme == Scheme::AesGcm {
            validate_key_id_label(key_id)?;
        }
        offset += key_id_len;

        let fields = Self {
            scheme,
            salt,
            record_size,
            key_id: key_id.to_vec(),
            sender_public,
        };
        Ok((fields, offset))
    }

    /// Serialize the header in the scheme's fixed byte order.
    ///
    /// # Errors
    ///
    /// - `MalformedHeader`: a field violates the same range rules `parse`
    ///   enforces (oversized key id, out-of-range record size, missing
    ///   sender key for `aes128gcm`)
    pub fn encode(&self) -> Result<Vec<u8>, EceError> {
        validate_record_size(self.scheme, self.record_size)?;
        if self.key_id.len() > u8::MAX as usize {
            return Err(malformed(format!(
                "key id too long: {} bytes, maximum 255",
                self.key_id.len()
            )));
        }
        if self.scheme == Scheme::AesGcm {
            validate_key_id_label(&self.key_id)?;
        }

        let mut out = Vec::with_capacity(self.encoded_len());
        out.extend_from_slice(&self.salt);
        out.extend_from_slice(&self.record_size.to_be_bytes());
        out.push(self.key_id.len() as u8);

        if self.scheme == Scheme::Aes128Gcm {
            let Some(sender) = &self.sender_public else {
                return Err(malformed("aes128gcm header requires a sender public key".to_string()));
            };
            out.extend_from_slice(&sender.to_uncompressed_bytes());
        }

        out.extend_from_slice(&self.key_id);
        Ok(out)
    }

    /// Byte length of the serialized header.
    pub fn encoded_len(&self) -> usize {
        let key_len = match self.scheme {
            Scheme::AesGcm => 0,
            Scheme::Aes128Gcm => PUBLIC_KEY_LEN,
        };
        PREFIX_LEN + key_len + self.key_id.len()
    }
}

fn validate_record_size(scheme: Scheme, record_size: u32) -> Result<(), EceError> {
    if record_size < scheme.min_record_size() {
        return Err(malformed(format!(
            "record size {record_size} below minimum {} for {}",
            scheme.min_record_size(),
            scheme.label()
        )));
    }
    if record_size > MAX_RECORD_SIZE {
        return Err(malformed(format!(
            "record size {record_size} above maximum {MAX_RECORD_SIZE}"
        )));
    }
    Ok(())
}

/// The `aesgcm` key id is a label from the out-of-band `Crypto-Key` /
/// `Encryption` header pair, so it must be non-empty printable ASCII. This
/// also keeps an `aes128gcm` payload from being silently misparsed under
/// `aesgcm` rules: its bytes at this offset are either a zero key-id length
/// or a SEC1 point starting with 0x04, and both fail here.
fn validate_key_id_label(key_id: &[u8]) -> Result<(), EceError> {
    if key_id.is_empty() {
        return Err(malformed("key id label must not be empty".to_string()));
    }
    if key_id.iter().any(|&b| !(0x20..=0x7E).contains(&b)) {
        return Err(malformed("key id is not a printable ASCII label".to_string()));
    }
    Ok(())
}

fn malformed(reason: String) -> EceError {
    EceError::MalformedHeader { reason }
}
