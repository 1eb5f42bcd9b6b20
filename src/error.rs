use crate::common::platform::Platform;
use rand::rand_core::OsError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BincodeError {
    #[error("Encode error: {0}")]
    Enc(#[source] Box<bincode::error::EncodeError>),
    #[error("Decode error: {0}")]
    Dec(#[source] Box<bincode::error::DecodeError>),
}

impl From<bincode::error::EncodeError> for BincodeError {
    fn from(err: bincode::error::EncodeError) -> Self {
        BincodeError::Enc(Box::from(err))
    }
}

impl From<bincode::error::DecodeError> for BincodeError {
    fn from(err: bincode::error::DecodeError) -> Self {
        BincodeError::Dec(Box::from(err))
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("OS-level random number generation failed: {0}")]
    OsRng(#[from] OsError),

    #[error("I/O failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("envelope serialization failed: {0}")]
    Bincode(#[from] BincodeError),

    #[error("configuration parse error: {0}")]
    ConfigParse(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("key '{0}' not found")]
    KeyNotFound(String),

    #[error("alias '{0}' is not bound to any key")]
    AliasNotFound(String),

    #[error("key '{0}' already exists")]
    KeyAlreadyExists(String),

    #[error("key '{key_id}' has no version {version}")]
    VersionNotFound { key_id: String, version: u32 },

    #[error("version {version} of key '{key_id}' has been destroyed")]
    VersionDestroyed { key_id: String, version: u32 },

    #[error(
        "version {version} of key '{key_id}' is below the minimum decryption version {min_version}"
    )]
    VersionBelowMinimum {
        key_id: String,
        version: u32,
        min_version: u32,
    },

    #[error("key '{0}' is disabled")]
    KeyDisabled(String),

    #[error("key '{0}' is scheduled for deletion")]
    KeyPendingDeletion(String),

    #[error("no adapter registered for platform '{0}'")]
    ProviderNotRegistered(Platform),

    #[error("ciphertext was produced by '{expected}', but this adapter serves '{actual}'")]
    ProviderMismatch { expected: Platform, actual: Platform },

    #[error("unknown platform '{0}'")]
    UnknownPlatform(String),

    #[error("invalid key handle '{0}'")]
    InvalidKeyHandle(String),

    #[error("ciphertext envelope is invalid or truncated")]
    InvalidEnvelope,

    #[error("unsupported envelope format version {0}")]
    UnsupportedEnvelopeVersion(u16),

    #[error("key material does not match the requested algorithm")]
    InvalidKeyMaterial,

    #[error("encryption failed")]
    EncryptionFailed,

    #[error("decryption failed: data may have been tampered with or the key does not match")]
    DecryptionFailed,

    #[error("'{platform}' does not support {operation}")]
    UnsupportedOperation {
        platform: Platform,
        operation: &'static str,
    },
}

impl From<bincode::error::EncodeError> for Error {
    fn from(err: bincode::error::EncodeError) -> Self {
        Error::from(BincodeError::Enc(Box::from(err)))
    }
}

impl From<bincode::error::DecodeError> for Error {
    fn from(err: bincode::error::DecodeError) -> Self {
        Error::from(BincodeError::Dec(Box::from(err)))
    }
}

// 定义一个统一的 Result 类型
pub type Result<T> = std::result::Result<T, Error>;
