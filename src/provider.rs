//! Defines the adapter seam between the unified manager and concrete
//! key-management backends.
//!
//! Each provider family (transit engine, AWS-style, GCP-style) implements
//! [`KmsProvider`] so that higher-level code can route encrypt, decrypt and
//! rotate calls without knowing which service holds the key.

use crate::common::algorithms::SymmetricAlgorithm;
use crate::common::handle::KeyHandle;
use crate::common::platform::Platform;
use crate::error::{Error, Result};

/// Lifecycle state of a managed key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyState {
    /// The key can encrypt and decrypt.
    Enabled,
    /// The key refuses both directions until re-enabled.
    Disabled,
    /// The key is awaiting deletion and refuses both directions.
    PendingDeletion,
}

/// A point-in-time description of a managed key.
#[derive(Debug, Clone)]
pub struct KeyInfo {
    /// Handle naming the latest version.
    pub handle: KeyHandle,
    pub algorithm: SymmetricAlgorithm,
    pub state: KeyState,
    /// Ciphertext below this version is refused on decryption.
    pub min_decryption_version: u32,
    /// Live (non-destroyed) versions, ascending.
    pub versions: Vec<u32>,
    /// Unix millis at key creation.
    pub created_at_ms: i64,
}

/// One key-management backend behind the unified API.
///
/// Implementations guarantee the key-handle invariants: identifiers are
/// unique within the platform, rotation appends a new version under the
/// same identifier, and previously produced ciphertext keeps decrypting
/// unless a version is destroyed or fenced off.
///
/// Not every platform supports every operation; unsupported calls return
/// [`Error::UnsupportedOperation`] rather than pretending to succeed.
pub trait KmsProvider: Send + Sync {
    /// The platform this adapter serves.
    fn platform(&self) -> Platform;

    /// Creates a new key under the caller-chosen identifier.
    ///
    /// For AWS-style backends the identifier is the alias to bind; the
    /// service generates the real key id. Fails with
    /// [`Error::KeyAlreadyExists`] if the identifier is taken.
    fn create_key(&self, key_id: &str, algorithm: SymmetricAlgorithm) -> Result<KeyHandle>;

    /// Creates the key if absent, otherwise returns the existing handle.
    fn ensure_key(&self, key_id: &str, algorithm: SymmetricAlgorithm) -> Result<KeyHandle> {
        match self.create_key(key_id, algorithm) {
            Err(Error::KeyAlreadyExists(_)) => Ok(self.describe_key(key_id)?.handle),
            other => other,
        }
    }

    /// Encrypts `plaintext` under the named key, returning an
    /// envelope-framed ciphertext that records which key version was used.
    fn encrypt(&self, key_id: &str, plaintext: &[u8], aad: Option<&[u8]>) -> Result<Vec<u8>>;

    /// Decrypts an envelope-framed ciphertext.
    ///
    /// The envelope names the key and version; the caller supplies nothing
    /// but the optional AAD. Ciphertext produced by another platform is
    /// refused with [`Error::ProviderMismatch`].
    fn decrypt(&self, ciphertext: &[u8], aad: Option<&[u8]>) -> Result<Vec<u8>>;

    /// Rotates the named key, returning a handle for the new version.
    ///
    /// Prior versions remain valid for decryption of previously produced
    /// ciphertext.
    fn rotate_key(&self, key_id: &str) -> Result<KeyHandle>;

    /// Describes the named key.
    fn describe_key(&self, key_id: &str) -> Result<KeyInfo>;

    /// Lists the identifiers of all keys this backend holds, sorted.
    fn list_keys(&self) -> Result<Vec<String>>;

    /// Refuses future decryption of ciphertext below `version`
    /// (transit-style fencing).
    fn set_min_decryption_version(&self, key_id: &str, version: u32) -> Result<()>;

    /// Re-enables a disabled key.
    fn enable_key(&self, key_id: &str) -> Result<()>;

    /// Disables a key; both directions are refused until re-enabled.
    fn disable_key(&self, key_id: &str) -> Result<()>;
}
