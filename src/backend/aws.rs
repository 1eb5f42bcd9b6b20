//! An in-process model of an AWS-KMS-style service.
//!
//! Key ids are service-generated UUIDs; callers work through aliases.
//! Rotation is transparent: encryption always uses the newest backing
//! version, and the envelope records which version to decrypt with. Keys
//! can be disabled or scheduled for deletion.

use std::collections::HashMap;

use log::{debug, info};
use parking_lot::RwLock;
use uuid::Uuid;

use crate::backend::keyring::VersionedKey;
use crate::common::algorithms::SymmetricAlgorithm;
use crate::common::envelope::Envelope;
use crate::common::handle::KeyHandle;
use crate::common::platform::Platform;
use crate::crypto;
use crate::error::{Error, Result};
use crate::provider::{KeyInfo, KmsProvider};

struct AwsState {
    /// Keys by service-generated id.
    keys: HashMap<String, VersionedKey>,
    /// Alias -> key id.
    aliases: HashMap<String, String>,
}

/// AWS-style key management with aliases and key states.
pub struct AwsBackend {
    region: String,
    state: RwLock<AwsState>,
}

impl AwsBackend {
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            state: RwLock::new(AwsState {
                keys: HashMap::new(),
                aliases: HashMap::new(),
            }),
        }
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    /// Binds an additional alias to an existing key.
    pub fn create_alias(&self, alias: &str, key_id: &str) -> Result<()> {
        let mut state = self.state.write();
        if !state.keys.contains_key(key_id) {
            return Err(Error::KeyNotFound(key_id.to_string()));
        }
        if state.aliases.contains_key(alias) {
            return Err(Error::KeyAlreadyExists(alias.to_string()));
        }
        state.aliases.insert(alias.to_string(), key_id.to_string());
        info!("bound alias '{alias}' to key {key_id}");
        Ok(())
    }

    /// Marks a key for deletion; it refuses all use until then.
    pub fn schedule_key_deletion(&self, key_id: &str) -> Result<()> {
        let mut state = self.state.write();
        let id = resolve(&state, key_id)?;
        if let Some(key) = state.keys.get_mut(&id) {
            key.schedule_deletion();
            info!("scheduled key {id} for deletion");
        }
        Ok(())
    }
}

/// Resolves an alias or key id to the backing key id.
fn resolve(state: &AwsState, key_or_alias: &str) -> Result<String> {
    if state.keys.contains_key(key_or_alias) {
        return Ok(key_or_alias.to_string());
    }
    if let Some(id) = state.aliases.get(key_or_alias) {
        return Ok(id.clone());
    }
    if key_or_alias.starts_with("alias/") {
        Err(Error::AliasNotFound(key_or_alias.to_string()))
    } else {
        Err(Error::KeyNotFound(key_or_alias.to_string()))
    }
}

impl KmsProvider for AwsBackend {
    fn platform(&self) -> Platform {
        Platform::Aws
    }

    /// `key_id` is the alias to bind; the service generates the real id.
    fn create_key(&self, key_id: &str, algorithm: SymmetricAlgorithm) -> Result<KeyHandle> {
        let mut state = self.state.write();
        if state.aliases.contains_key(key_id) {
            return Err(Error::KeyAlreadyExists(key_id.to_string()));
        }
        let id = Uuid::new_v4().to_string();
        state.keys.insert(id.clone(), VersionedKey::new(algorithm)?);
        state.aliases.insert(key_id.to_string(), id.clone());
        info!(
            "created key {id} ({algorithm}) in {} with alias '{key_id}'",
            self.region
        );
        Ok(KeyHandle::new(Platform::Aws, id, 1))
    }

    fn encrypt(&self, key_id: &str, plaintext: &[u8], aad: Option<&[u8]>) -> Result<Vec<u8>> {
        let state = self.state.read();
        let id = resolve(&state, key_id)?;
        let key = state
            .keys
            .get(&id)
            .ok_or_else(|| Error::KeyNotFound(id.clone()))?;
        let (version, material) = key.material_for_encrypt(&id)?;

        let nonce = crypto::generate_nonce()?;
        let body = crypto::seal(key.algorithm(), material, &nonce, plaintext, aad)?;
        debug!("encrypt under key {id} v{version}");
        Envelope::new(Platform::Aws, id, version, key.algorithm(), nonce).seal(&body)
    }

    fn decrypt(&self, ciphertext: &[u8], aad: Option<&[u8]>) -> Result<Vec<u8>> {
        let (envelope, body) = Envelope::decode_from_prefixed_slice(ciphertext)?;
        if envelope.platform != Platform::Aws {
            return Err(Error::ProviderMismatch {
                expected: envelope.platform,
                actual: Platform::Aws,
            });
        }
        let state = self.state.read();
        let key = state
            .keys
            .get(&envelope.key_id)
            .ok_or_else(|| Error::KeyNotFound(envelope.key_id.clone()))?;
        let material = key.material_for_decrypt(&envelope.key_id, envelope.key_version)?;
        debug!(
            "decrypt under key {} v{}",
            envelope.key_id, envelope.key_version
        );
        crypto::open(key.algorithm(), material, &envelope.nonce, body, aad)
    }

    fn rotate_key(&self, key_id: &str) -> Result<KeyHandle> {
        let mut state = self.state.write();
        let id = resolve(&state, key_id)?;
        let key = state
            .keys
            .get_mut(&id)
            .ok_or_else(|| Error::KeyNotFound(id.clone()))?;
        let version = key.rotate(&id)?;
        info!("rotated key {id} to v{version}");
        Ok(KeyHandle::new(Platform::Aws, id, version))
    }

    fn describe_key(&self, key_id: &str) -> Result<KeyInfo> {
        let state = self.state.read();
        let id = resolve(&state, key_id)?;
        let key = state
            .keys
            .get(&id)
            .ok_or_else(|| Error::KeyNotFound(id.clone()))?;
        Ok(key.info(Platform::Aws, &id))
    }

    fn list_keys(&self) -> Result<Vec<String>> {
        let mut ids: Vec<String> = self.state.read().keys.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }

    fn set_min_decryption_version(&self, _key_id: &str, _version: u32) -> Result<()> {
        Err(Error::UnsupportedOperation {
            platform: Platform::Aws,
            operation: "minimum decryption versions",
        })
    }

    fn enable_key(&self, key_id: &str) -> Result<()> {
        let mut state = self.state.write();
        let id = resolve(&state, key_id)?;
        if let Some(key) = state.keys.get_mut(&id) {
            key.enable();
            info!("enabled key {id}");
        }
        Ok(())
    }

    fn disable_key(&self, key_id: &str) -> Result<()> {
        let mut state = self.state.write();
        let id = resolve(&state, key_id)?;
        if let Some(key) = state.keys.get_mut(&id) {
            key.disable();
            info!("disabled key {id}");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALIAS: &str = "alias/multi-cloud-key";

    fn backend_with_key() -> (AwsBackend, KeyHandle) {
        let backend = AwsBackend::new("us-east-1");
        let handle = backend
            .create_key(ALIAS, SymmetricAlgorithm::Aes256Gcm)
            .unwrap();
        (backend, handle)
    }

    #[test]
    fn test_encrypt_by_alias_decrypt_by_envelope() {
        let (backend, handle) = backend_with_key();

        let ciphertext = backend.encrypt(ALIAS, b"Secret data", None).unwrap();
        let (envelope, _) = Envelope::decode_from_prefixed_slice(&ciphertext).unwrap();
        assert_eq!(envelope.key_id, handle.key_id);

        assert_eq!(backend.decrypt(&ciphertext, None).unwrap(), b"Secret data");
    }

    #[test]
    fn test_alias_and_id_describe_same_key() {
        let (backend, handle) = backend_with_key();

        let by_alias = backend.describe_key(ALIAS).unwrap();
        let by_id = backend.describe_key(&handle.key_id).unwrap();
        assert_eq!(by_alias.handle, by_id.handle);
    }

    #[test]
    fn test_unknown_alias_vs_unknown_id() {
        let (backend, _) = backend_with_key();
        assert!(matches!(
            backend.encrypt("alias/other", b"x", None),
            Err(Error::AliasNotFound(_))
        ));
        assert!(matches!(
            backend.encrypt("no-such-id", b"x", None),
            Err(Error::KeyNotFound(_))
        ));
    }

    #[test]
    fn test_rotation_backward_compatible() {
        let (backend, _) = backend_with_key();

        let old = backend.encrypt(ALIAS, b"before rotation", None).unwrap();
        backend.rotate_key(ALIAS).unwrap();

        assert_eq!(backend.decrypt(&old, None).unwrap(), b"before rotation");
        let fresh = backend.encrypt(ALIAS, b"after", None).unwrap();
        let (envelope, _) = Envelope::decode_from_prefixed_slice(&fresh).unwrap();
        assert_eq!(envelope.key_version, 2);
    }

    #[test]
    fn test_disabled_key_refuses_use() {
        let (backend, _) = backend_with_key();
        let ciphertext = backend.encrypt(ALIAS, b"data", None).unwrap();

        backend.disable_key(ALIAS).unwrap();
        assert!(matches!(
            backend.encrypt(ALIAS, b"x", None),
            Err(Error::KeyDisabled(_))
        ));
        assert!(matches!(
            backend.decrypt(&ciphertext, None),
            Err(Error::KeyDisabled(_))
        ));

        backend.enable_key(ALIAS).unwrap();
        assert_eq!(backend.decrypt(&ciphertext, None).unwrap(), b"data");
    }

    #[test]
    fn test_scheduled_deletion_refuses_use() {
        let (backend, handle) = backend_with_key();
        backend.schedule_key_deletion(&handle.key_id).unwrap();
        assert!(matches!(
            backend.encrypt(ALIAS, b"x", None),
            Err(Error::KeyPendingDeletion(_))
        ));
    }

    #[test]
    fn test_extra_alias() {
        let (backend, handle) = backend_with_key();
        backend.create_alias("alias/backup", &handle.key_id).unwrap();

        let ciphertext = backend.encrypt("alias/backup", b"data", None).unwrap();
        let (envelope, _) = Envelope::decode_from_prefixed_slice(&ciphertext).unwrap();
        assert_eq!(envelope.key_id, handle.key_id);
    }
}
