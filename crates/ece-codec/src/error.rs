//! Error types for codec operations

use thiserror::Error;

/// Errors from encrypt/decrypt operations.
///
/// Every failure aborts processing of the current message at the point of
/// detection. None of these are retriable with the same inputs; recovery
/// means the caller obtains correct key material or an intact payload and
/// calls again.
#[derive(Debug, Error)]
pub enum EceError {
    /// A header field is truncated or out of range
    #[error("malformed header: {reason}")]
    MalformedHeader {
        /// Which field failed validation and how
        reason: String,
    },

    /// ECDH or HKDF input material is unusable
    #[error("key derivation failed: {reason}")]
    KeyDerivation {
        /// Why the key material could not be derived
        reason: String,
    },

    /// An AEAD tag did not verify.
    ///
    /// Deliberately fieldless: the failure carries no detail derived from
    /// record contents, so tag mismatches are indistinguishable from each
    /// other.
    #[error("authentication failed")]
    AuthenticationFailed,

    /// A record's padding delimiter or padding length is invalid
    #[error("invalid record padding: {reason}")]
    Padding {
        /// Which padding rule was violated
        reason: String,
    },

    /// The ciphertext body is missing records or cut mid-record
    #[error("truncated message: {reason}")]
    Truncated {
        /// What was missing from the body
        reason: String,
    },

    /// The content-coding name is not one this codec implements
    #[error("unsupported scheme: {name}")]
    UnsupportedScheme {
        /// The unrecognized content-coding name
        name: String,
    },
}
