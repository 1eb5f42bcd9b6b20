//! An in-process model of a transit secrets engine.
//!
//! Keys are caller-named, rotate without bound, and support the transit
//! engine's minimum-decryption-version fencing. There is no disable state;
//! a transit key is either present or it is not.

use std::collections::HashMap;

use log::{debug, info};
use parking_lot::RwLock;

use crate::backend::keyring::VersionedKey;
use crate::common::algorithms::SymmetricAlgorithm;
use crate::common::envelope::Envelope;
use crate::common::handle::KeyHandle;
use crate::common::platform::Platform;
use crate::crypto;
use crate::error::{Error, Result};
use crate::provider::{KeyInfo, KmsProvider};

/// Cryptography-as-a-service over named, versioned keys.
pub struct TransitBackend {
    mount: String,
    keys: RwLock<HashMap<String, VersionedKey>>,
}

impl TransitBackend {
    /// Creates an empty engine under the given mount path
    /// (conventionally `"transit"`).
    pub fn new(mount: impl Into<String>) -> Self {
        Self {
            mount: mount.into(),
            keys: RwLock::new(HashMap::new()),
        }
    }

    pub fn mount(&self) -> &str {
        &self.mount
    }
}

impl KmsProvider for TransitBackend {
    fn platform(&self) -> Platform {
        Platform::Vault
    }

    fn create_key(&self, key_id: &str, algorithm: SymmetricAlgorithm) -> Result<KeyHandle> {
        let mut keys = self.keys.write();
        if keys.contains_key(key_id) {
            return Err(Error::KeyAlreadyExists(key_id.to_string()));
        }
        keys.insert(key_id.to_string(), VersionedKey::new(algorithm)?);
        info!(
            "created transit key '{key_id}' ({algorithm}) under mount '{}'",
            self.mount
        );
        Ok(KeyHandle::new(Platform::Vault, key_id, 1))
    }

    fn encrypt(&self, key_id: &str, plaintext: &[u8], aad: Option<&[u8]>) -> Result<Vec<u8>> {
        let keys = self.keys.read();
        let key = keys
            .get(key_id)
            .ok_or_else(|| Error::KeyNotFound(key_id.to_string()))?;
        let (version, material) = key.material_for_encrypt(key_id)?;

        let nonce = crypto::generate_nonce()?;
        let body = crypto::seal(key.algorithm(), material, &nonce, plaintext, aad)?;
        debug!("transit encrypt under '{key_id}' v{version}");
        Envelope::new(Platform::Vault, key_id, version, key.algorithm(), nonce).seal(&body)
    }

    fn decrypt(&self, ciphertext: &[u8], aad: Option<&[u8]>) -> Result<Vec<u8>> {
        let (envelope, body) = Envelope::decode_from_prefixed_slice(ciphertext)?;
        if envelope.platform != Platform::Vault {
            return Err(Error::ProviderMismatch {
                expected: envelope.platform,
                actual: Platform::Vault,
            });
        }
        let keys = self.keys.read();
        let key = keys
            .get(&envelope.key_id)
            .ok_or_else(|| Error::KeyNotFound(envelope.key_id.clone()))?;
        let material = key.material_for_decrypt(&envelope.key_id, envelope.key_version)?;
        debug!(
            "transit decrypt under '{}' v{}",
            envelope.key_id, envelope.key_version
        );
        crypto::open(key.algorithm(), material, &envelope.nonce, body, aad)
    }

    fn rotate_key(&self, key_id: &str) -> Result<KeyHandle> {
        let mut keys = self.keys.write();
        let key = keys
            .get_mut(key_id)
            .ok_or_else(|| Error::KeyNotFound(key_id.to_string()))?;
        let version = key.rotate(key_id)?;
        info!("rotated transit key '{key_id}' to v{version}");
        Ok(KeyHandle::new(Platform::Vault, key_id, version))
    }

    fn describe_key(&self, key_id: &str) -> Result<KeyInfo> {
        let keys = self.keys.read();
        let key = keys
            .get(key_id)
            .ok_or_else(|| Error::KeyNotFound(key_id.to_string()))?;
        Ok(key.info(Platform::Vault, key_id))
    }

    fn list_keys(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self.keys.read().keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    fn set_min_decryption_version(&self, key_id: &str, version: u32) -> Result<()> {
        let mut keys = self.keys.write();
        let key = keys
            .get_mut(key_id)
            .ok_or_else(|| Error::KeyNotFound(key_id.to_string()))?;
        key.set_min_decryption_version(key_id, version)?;
        info!("transit key '{key_id}' now refuses ciphertext below v{version}");
        Ok(())
    }

    fn enable_key(&self, _key_id: &str) -> Result<()> {
        Err(Error::UnsupportedOperation {
            platform: Platform::Vault,
            operation: "enabling keys",
        })
    }

    fn disable_key(&self, _key_id: &str) -> Result<()> {
        Err(Error::UnsupportedOperation {
            platform: Platform::Vault,
            operation: "disabling keys",
        })
    }
}
