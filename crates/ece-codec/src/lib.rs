//! Encrypted Content Encoding Codec
//!
//! Encrypts a plaintext payload into one of two wire formats (`aesgcm`, the
//! legacy per-record scheme, and `aes128gcm`, the newer self-contained
//! scheme) and decrypts payloads of either, as used for secure
//! push-notification payloads. Pure functions with deterministic outputs;
//! [`encrypt_with_salt`] lets callers provide the salt for deterministic
//! testing.
//!
//! # Pipeline
//!
//! Each message runs the same self-contained pipeline in both directions:
//!
//! ```text
//! Header (salt, record size, key id [, sender key])
//!        │
//!        ▼
//! P-256 ECDH → shared secret
//!        │
//!        ▼
//! HKDF-SHA256 → content-encryption key (16B) + nonce base (12B)
//!        │
//!        ▼
//! AES-128-GCM record loop (nonce = base XOR record counter)
//! ```
//!
//! Derived keys are used for all records of one message and then discarded;
//! they are never persisted and never shared across messages.
//!
//! # Security
//!
//! Nonce Uniqueness:
//! - Per-record nonce is the nonce base XORed with the big-endian record
//!   counter, so the records of one message never share a nonce
//! - Fresh salt per message gives each message its own nonce base
//! - Key schedules are consumed per message and cannot be restarted
//!
//! Authenticity:
//! - Every record is AES-128-GCM authenticated; a failed tag rejects the
//!   message before any padding or content is inspected
//! - `aes128gcm` binds both parties' public keys and the shared
//!   authentication secret into the key schedule
//!
//! Concurrency:
//! - No shared or static cryptographic state; each call owns its inputs, so
//!   independent messages may be processed on independent threads

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod error;
pub mod header;
pub mod keys;
pub mod message;
pub mod scheme;

mod derivation;
mod record;

pub use error::EceError;
pub use header::HeaderFields;
pub use keys::{AUTH_SECRET_LEN, AuthSecret, LocalKeyPair, RemotePublicKey};
pub use message::{decrypt, encrypt, encrypt_with_salt};
pub use scheme::{
    DEFAULT_RECORD_SIZE, MAX_RECORD_SIZE, PUBLIC_KEY_LEN, SALT_LEN, Scheme, TAG_LEN,
};
