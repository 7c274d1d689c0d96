use std::io;

use thiserror::Error;

/// Typed error surface of the key core.
///
/// Messages never carry private key bytes or mnemonic words; callers that
/// need detail get the variant, not the secret.
#[derive(Debug, Error)]
pub enum KeyError {
    // Input errors
    #[error("bad usage: {0}")]
    BadUsage(String),
    #[error("invalid mnemonic phrase")]
    InvalidMnemonic,
    #[error("bad key length for {algorithm}: expected {expected}, got {actual}")]
    BadKeyLength {
        algorithm: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("bad address encoding")]
    BadAddress,
    #[error("legacy key file exists but cannot be decoded: {0}")]
    InvalidLegacy(String),

    // State errors
    #[error("key set not found: {0}")]
    NotFound(String),
    #[error("key set name already in use: {0}")]
    NameTaken(String),
    #[error("key set is locked: {0}")]
    Locked(String),
    #[error("session expired for key set: {0}")]
    Expired(String),
    #[error("key set is busy (concurrent operation in progress): {0}")]
    Busy(String),
    #[error("keystore envelope is corrupt")]
    CorruptKeystore,

    // Authn errors
    #[error("invalid password")]
    InvalidPassword,
    #[error("password required but no terminal available")]
    PasswordRequired,

    // Crypto errors
    #[error("signer key is not a member of the ring")]
    SignerNotInRing,
    #[error("ring must contain at least two members")]
    RingTooSmall,
    #[error("ring member is not a valid public key")]
    BadRingMember,
    #[error("signature verification failed")]
    VerifyFailed,

    // I/O errors
    #[error("file error: {0}")]
    FileError(String),
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    // Network errors
    #[error("threshold service unreachable: {0}")]
    ServiceUnreachable(String),
    #[error("operation timed out")]
    Timeout,

    // Fatal
    #[error("internal invariant violated: {0}")]
    InternalInvariant(String),
}

pub type Result<T> = std::result::Result<T, KeyError>;

impl From<io::Error> for KeyError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::PermissionDenied => KeyError::PermissionDenied(err.to_string()),
            io::ErrorKind::TimedOut => KeyError::Timeout,
            _ => KeyError::FileError(err.to_string()),
        }
    }
}

impl From<postcard::Error> for KeyError {
    fn from(_: postcard::Error) -> Self {
        KeyError::CorruptKeystore
    }
}

impl From<serde_json::Error> for KeyError {
    fn from(err: serde_json::Error) -> Self {
        KeyError::FileError(err.to_string())
    }
}
