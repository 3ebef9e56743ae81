//! HKDF key schedule for both content encodings
//!
//! Expands the ECDH shared secret into the 16-byte content-encryption key
//! and 12-byte nonce base used for every record of one message. The info
//! strings are protocol constants; they are the primary thing that
//! distinguishes the two schemes.

use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::Zeroize;

use crate::error::EceError;
use crate::keys::{AuthSecret, RemotePublicKey, SharedSecret};
use crate::scheme::{PUBLIC_KEY_LEN, SALT_LEN, Scheme};

/// Length of the content-encryption key
pub const CEK_LEN: usize = 16;

/// Length of the per-message nonce base
pub const NONCE_LEN: usize = 12;

const AUTH_INFO: &[u8] = b"Content-Encoding: auth\0";
const AESGCM_KEY_INFO: &[u8] = b"Content-Encoding: aesgcm\0";
const AES128GCM_KEY_INFO: &[u8] = b"Content-Encoding: aes128gcm\0";
const NONCE_INFO: &[u8] = b"Content-Encoding: nonce\0";
const WEBPUSH_INFO: &[u8] = b"WebPush: info\0";
const CURVE_LABEL: &[u8] = b"P-256\0";

/// Per-message keys derived once from the shared secret and salt.
///
/// Used for every record of the message, then discarded. Zeroized on drop.
pub struct DerivedKeys {
    cek: [u8; CEK_LEN],
    nonce_base: [u8; NONCE_LEN],
}

impl DerivedKeys {
    /// 16-byte AES-128-GCM content-encryption key.
    pub(crate) fn cek(&self) -> &[u8; CEK_LEN] {
        &self.cek
    }

    /// Nonce for record `seq`: the nonce base XORed with the big-endian
    /// record counter.
    ///
    /// `seq` is a `u64`, far below the 96-bit nonce space, so the counter
    /// cannot wrap and nonces within a message are pairwise distinct.
    pub(crate) fn record_nonce(&self, seq: u64) -> [u8; NONCE_LEN] {
        let mut nonce = self.nonce_base;
        let counter = seq.to_be_bytes();
        for (n, c) in nonce[NONCE_LEN - 8..].iter_mut().zip(counter) {
            *n ^= c;
        }
        nonce
    }
}

impl Drop for DerivedKeys {
    fn drop(&mut self) {
        self.cek.zeroize();
        self.nonce_base.zeroize();
    }
}

/// Derive the content-encryption key and nonce base for one message.
///
/// `receiver_public` is the key of the party that will decrypt and
/// `sender_public` the key of the party that encrypted; both sides must
/// present them in that order for the HKDF context to agree.
///
/// # Errors
///
/// - `KeyDerivation`: `aes128gcm` requires an authentication secret and
///   none was supplied
pub(crate) fn derive_keys(
    scheme: Scheme,
    shared: &SharedSecret,
    receiver_public: &RemotePublicKey,
    sender_public: &RemotePublicKey,
    auth_secret: Option<&AuthSecret>,
    salt: &[u8; SALT_LEN],
) -> Result<DerivedKeys, EceError> {
    let mut ikm = input_key_material(scheme, shared, receiver_public, sender_public, auth_secret)?;

    let context = match scheme {
        Scheme::AesGcm => aesgcm_context(receiver_public, sender_public),
        Scheme::Aes128Gcm => Vec::new(),
    };
    let key_info = match scheme {
        Scheme::AesGcm => [AESGCM_KEY_INFO, context.as_slice()].concat(),
        Scheme::Aes128Gcm => AES128GCM_KEY_INFO.to_vec(),
    };
    let nonce_info = [NONCE_INFO, context.as_slice()].concat();

    let hkdf = Hkdf::<Sha256>::new(Some(salt), &ikm);
    ikm.zeroize();

    let mut cek = [0u8; CEK_LEN];
    let Ok(()) = hkdf.expand(&key_info, &mut cek) else {
        unreachable!("16 bytes is a valid HKDF-SHA256 output length");
    };

    let mut nonce_base = [0u8; NONCE_LEN];
    let Ok(()) = hkdf.expand(&nonce_info, &mut nonce_base) else {
        unreachable!("12 bytes is a valid HKDF-SHA256 output length");
    };

    Ok(DerivedKeys { cek, nonce_base })
}

/// Mix the authentication secret into the raw ECDH secret.
///
/// `aes128gcm` binds both public keys into this step and refuses to operate
/// without an authentication secret; legacy `aesgcm` mixes it in when
/// present and otherwise uses the ECDH secret directly.
fn input_key_material(
    scheme: Scheme,
    shared: &SharedSecret,
    receiver_public: &RemotePublicKey,
    sender_public: &RemotePublicKey,
    auth_secret: Option<&AuthSecret>,
) -> Result<[u8; 32], EceError> {
    let mut ikm = [0u8; 32];
    match scheme {
        Scheme::AesGcm => {
            if let Some(auth) = auth_secret {
                expand_with_salt(auth.as_bytes(), shared.as_bytes(), AUTH_INFO, &mut ikm);
            } else {
                ikm.copy_from_slice(shared.as_bytes());
            }
        },
        Scheme::Aes128Gcm => {
            let Some(auth) = auth_secret else {
                return Err(EceError::KeyDerivation {
                    reason: "aes128gcm requires an authentication secret".to_string(),
                });
            };
            // Capacity: 14 (label) + 65 + 65 = 144
            let mut info = Vec::with_capacity(144);
            info.extend_from_slice(WEBPUSH_INFO);
            info.extend_from_slice(&receiver_public.to_uncompressed_bytes());
            info.extend_from_slice(&sender_public.to_uncompressed_bytes());
            expand_with_salt(auth.as_bytes(), shared.as_bytes(), &info, &mut ikm);
        },
    }
    Ok(ikm)
}

/// Legacy `aesgcm` context: curve label plus both length-prefixed keys.
fn aesgcm_context(receiver_public: &RemotePublicKey, sender_public: &RemotePublicKey) -> Vec<u8> {
    // Capacity: 6 (label) + 2 + 65 + 2 + 65 = 140
    let mut context = Vec::with_capacity(140);
    context.extend_from_slice(CURVE_LABEL);
    context.extend_from_slice(&(PUBLIC_KEY_LEN as u16).to_be_bytes());
    context.extend_from_slice(&receiver_public.to_uncompressed_bytes());
    context.extend_from_slice(&(PUBLIC_KEY_LEN as u16).to_be_bytes());
    context.extend_from_slice(&sender_public.to_uncompressed_bytes());
    context
}

fn expand_with_salt(salt: &[u8], ikm: &[u8], info: &[u8], out: &mut [u8; 32]) {
    let hkdf = Hkdf::<Sha256>::new(Some(salt), ikm);
    let Ok(()) = hkdf.expand(info, out) else {
        unreachable!("32 bytes is a valid HKDF-SHA256 output length");
    };
}
