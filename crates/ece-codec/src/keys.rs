//! Key material for a single message exchange
//!
//! Wraps the P-256 types so the rest of the codec deals in fixed-size byte
//! representations. Key material lives for one encrypt/decrypt call and is
//! never persisted; shared secrets are zeroized on drop.

use p256::elliptic_curve::sec1::ToEncodedPoint;
use rand::rngs::OsRng;
use zeroize::Zeroize;

use crate::error::EceError;
use crate::scheme::PUBLIC_KEY_LEN;

/// Length of the pre-shared authentication secret
pub const AUTH_SECRET_LEN: usize = 16;

/// Local P-256 key pair (the private half of the exchange).
///
/// On encrypt this is the sender's ephemeral key; on decrypt it is the
/// receiver's subscription key. The underlying `p256::SecretKey` zeroizes
/// its scalar on drop.
pub struct LocalKeyPair {
    secret: p256::SecretKey,
}

impl LocalKeyPair {
    /// Generate a fresh key pair from OS entropy.
    ///
    /// Callers must generate a fresh pair (or at minimum a fresh salt) per
    /// message; reusing both across messages reuses nonces.
    pub fn generate() -> Self {
        Self { secret: p256::SecretKey::random(&mut OsRng) }
    }

    /// Reconstruct a key pair from a raw 32-byte P-256 scalar.
    ///
    /// # Errors
    ///
    /// - `KeyDerivation`: the bytes are not a valid non-zero scalar
    pub fn from_raw_scalar(bytes: &[u8]) -> Result<Self, EceError> {
        let secret = p256::SecretKey::from_slice(bytes).map_err(|_| EceError::KeyDerivation {
            reason: "invalid private scalar".to_string(),
        })?;
        Ok(Self { secret })
    }

    /// The public half of this key pair.
    pub fn public_key(&self) -> RemotePublicKey {
        RemotePublicKey { point: self.secret.public_key() }
    }

    pub(crate) fn secret(&self) -> &p256::SecretKey {
        &self.secret
    }
}

// LocalKeyPair does not implement Clone/Debug to prevent leakage.

/// A peer's P-256 public key.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct RemotePublicKey {
    point: p256::PublicKey,
}

impl RemotePublicKey {
    /// Parse a 65-byte uncompressed SEC1 point.
    ///
    /// # Errors
    ///
    /// - `KeyDerivation`: wrong length, wrong point tag, or not a point on
    ///   the curve (the identity is rejected here, so ECDH can never land
    ///   on the point at infinity)
    pub fn from_uncompressed_bytes(bytes: &[u8]) -> Result<Self, EceError> {
        if bytes.len() != PUBLIC_KEY_LEN || bytes[0] != 0x04 {
            return Err(EceError::KeyDerivation {
                reason: format!(
                    "public key must be a {PUBLIC_KEY_LEN}-byte uncompressed point, got {} bytes",
                    bytes.len()
                ),
            });
        }
        let point = p256::PublicKey::from_sec1_bytes(bytes).map_err(|_| {
            EceError::KeyDerivation { reason: "public key is not a valid P-256 point".to_string() }
        })?;
        Ok(Self { point })
    }

    /// Uncompressed SEC1 encoding (65 bytes, `0x04 || x || y`).
    pub fn to_uncompressed_bytes(&self) -> [u8; PUBLIC_KEY_LEN] {
        let encoded = self.point.to_encoded_point(false);
        let mut bytes = [0u8; PUBLIC_KEY_LEN];
        bytes.copy_from_slice(encoded.as_bytes());
        bytes
    }
}

impl std::fmt::Debug for RemotePublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Public material, safe to show
        f.debug_struct("RemotePublicKey").finish_non_exhaustive()
    }
}

/// Pre-shared 16-byte authentication secret.
///
/// Required by `aes128gcm`, optional for legacy `aesgcm`.
#[derive(Clone)]
pub struct AuthSecret {
    bytes: [u8; AUTH_SECRET_LEN],
}

impl AuthSecret {
    /// Generate a fresh secret from OS entropy.
    pub fn generate() -> Self {
        use rand::RngCore;

        let mut bytes = [0u8; AUTH_SECRET_LEN];
        OsRng.fill_bytes(&mut bytes);
        Self { bytes }
    }

    /// Wrap an existing 16-byte secret.
    ///
    /// # Errors
    ///
    /// - `KeyDerivation`: the slice is not exactly 16 bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, EceError> {
        let bytes: [u8; AUTH_SECRET_LEN] =
            bytes.try_into().map_err(|_| EceError::KeyDerivation {
                reason: format!("auth secret must be {AUTH_SECRET_LEN} bytes"),
            })?;
        Ok(Self { bytes })
    }

    pub(crate) fn as_bytes(&self) -> &[u8; AUTH_SECRET_LEN] {
        &self.bytes
    }
}

impl Drop for AuthSecret {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

/// Raw ECDH shared secret (32 bytes), zeroized on drop.
///
/// Only ever fed into HKDF; never used as a key directly.
pub(crate) struct SharedSecret {
    bytes: [u8; 32],
}

impl SharedSecret {
    pub(crate) fn as_bytes(&self) -> &[u8; 32] {
        &self.bytes
    }
}

impl Drop for SharedSecret {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

/// Perform P-256 ECDH between the local private scalar and the peer point.
///
/// Both sides of the exchange derive the identical secret. The scalar is
/// non-zero and the point is on the prime-order curve, so the product cannot
/// be the point at infinity.
pub(crate) fn shared_secret(local: &LocalKeyPair, peer: &RemotePublicKey) -> SharedSecret {
    let shared = p256::ecdh::diffie_hellman(
        local.secret().to_nonzero_scalar(),
        peer.point.as_affine(),
    );

    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(shared.raw_secret_bytes());
    SharedSecret { bytes }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ecdh_agrees_in_both_directions() {
        let a = LocalKeyPair::generate();
        let b = LocalKeyPair::generate();

        let ab = shared_secret(&a, &b.public_key());
        let ba = shared_secret(&b, &a.public_key());

        assert_eq!(ab.as_bytes(), ba.as_bytes());
    }

    #[test]
    fn public_key_round_trips_through_sec1() {
        let pair = LocalKeyPair::generate();
        let bytes = pair.public_key().to_uncompressed_bytes();

        assert_eq!(bytes.len(), PUBLIC_KEY_LEN);
        assert_eq!(bytes[0], 0x04);

        let parsed = RemotePublicKey::from_uncompressed_bytes(&bytes).unwrap();
        assert_eq!(parsed.to_uncompressed_bytes(), bytes);
    }

    #[test]
    fn compressed_point_is_rejected() {
        // 33-byte compressed encoding is valid SEC1 but not this wire format
        let result = RemotePublicKey::from_uncompressed_bytes(&[0x02; 33]);
        assert!(matches!(result, Err(EceError::KeyDerivation { .. })));
    }

    #[test]
    fn off_curve_point_is_rejected() {
        let mut bytes = [0u8; PUBLIC_KEY_LEN];
        bytes[0] = 0x04;
        bytes[64] = 0x01; // x = 0, y = 1 is not on P-256
        let result = RemotePublicKey::from_uncompressed_bytes(&bytes);
        assert!(matches!(result, Err(EceError::KeyDerivation { .. })));
    }

    #[test]
    fn zero_scalar_is_rejected() {
        let result = LocalKeyPair::from_raw_scalar(&[0u8; 32]);
        assert!(matches!(result, Err(EceError::KeyDerivation { .. })));
    }

    #[test]
    fn scalar_round_trips() {
        let mut scalar = [0u8; 32];
        scalar[31] = 7;
        let pair = LocalKeyPair::from_raw_scalar(&scalar).unwrap();
        let again = LocalKeyPair::from_raw_scalar(&scalar).unwrap();
        assert_eq!(
            pair.public_key().to_uncompressed_bytes(),
            again.public_key().to_uncompressed_bytes()
        );
    }

    #[test]
    fn auth_secret_length_is_enforced() {
        assert!(AuthSecret::from_bytes(&[0u8; 16]).is_ok());
        assert!(matches!(
            AuthSecret::from_bytes(&[0u8; 15]),
            Err(EceError::KeyDerivation { .. })
        ));
        assert!(matches!(
            AuthSecret::from_bytes(&[0u8; 32]),
            Err(EceError::KeyDerivation { .. })
        ));
    }

    #[test]
    fn different_pairs_disagree() {
        let a = LocalKeyPair::generate();
        let b = LocalKeyPair::generate();
        let c = LocalKeyPair::generate();

        let ac = shared_secret(&a, &c.public_key());
        let bc = shared_secret(&b, &c.public_key());
        assert_ne!(ac.as_bytes(), bc.as_bytes());
    }
}
