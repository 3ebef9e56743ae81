//! Wire-format schemes and their fixed parameters

use crate::error::EceError;

/// Length of the per-message salt (both schemes)
pub const SALT_LEN: usize = 16;

/// Length of the AES-GCM authentication tag
pub const TAG_LEN: usize = 16;

/// Length of an uncompressed SEC1 P-256 point
pub const PUBLIC_KEY_LEN: usize = 65;

/// Record size used when the caller does not specify one
pub const DEFAULT_RECORD_SIZE: u32 = 4096;

/// Upper bound on the record size a header may declare.
///
/// Keeps a hostile header from driving record buffers to gigabyte sizes.
pub const MAX_RECORD_SIZE: u32 = 1 << 20;

/// Content-encoding scheme a payload is framed under.
///
/// Both schemes share the AEAD record concept; they differ in header layout,
/// HKDF context strings, and padding encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scheme {
    /// Legacy per-record scheme; salt/record-size header is binary but the
    /// sender public key travels out-of-band
    AesGcm,
    /// Self-contained scheme; the header carries the sender public key
    Aes128Gcm,
}

impl Scheme {
    /// The content-coding label this scheme is registered under.
    pub fn label(self) -> &'static str {
        match self {
            Self::AesGcm => "aesgcm",
            Self::Aes128Gcm => "aes128gcm",
        }
    }

    /// Resolve a content-coding label to a scheme.
    ///
    /// # Errors
    ///
    /// - `UnsupportedScheme`: the label names no scheme this codec implements
    pub fn from_label(label: &str) -> Result<Self, EceError> {
        match label {
            "aesgcm" => Ok(Self::AesGcm),
            "aes128gcm" => Ok(Self::Aes128Gcm),
            other => Err(EceError::UnsupportedScheme { name: other.to_string() }),
        }
    }

    /// Bytes of each plaintext record consumed by padding framing.
    ///
    /// `aesgcm` suffixes a one-byte delimiter; `aes128gcm` prefixes a
    /// two-byte explicit padding length.
    pub fn padding_overhead(self) -> usize {
        match self {
            Self::AesGcm => 1,
            Self::Aes128Gcm => 2,
        }
    }

    /// Smallest record size that still fits the tag, the padding framing,
    /// and at least one byte of headroom for content.
    pub fn min_record_size(self) -> u32 {
        (TAG_LEN + self.padding_overhead() + 1) as u32
    }

    /// Plaintext content capacity of one full record.
    ///
    /// `record_size` must already satisfy
    /// [`min_record_size`](Self::min_record_size).
    pub fn record_capacity(self, record_size: u32) -> usize {
        record_size as usize - TAG_LEN - self.padding_overhead()
    }
}
