//! An in-process model of a GCP-KMS-style service.
//!
//! Keys live in a hierarchy (`projects/{p}/locations/{l}/keyRings/{r}/
//! cryptoKeys/{k}`) and carry a primary version pointer: rotation creates a
//! new primary, encryption always uses the primary, and individual versions
//! can be destroyed without touching the rest of the key.

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

/// Key management under one key ring of one project.
pub struct GcpBackend {
    project: String,
    location: String,
    key_ring: String,
    /// The `.../cryptoKeys/` prefix shared by every key in this ring.
    path_prefix: String,
    keys: RwLock<HashMap<String, VersionedKey>>,
}

impl GcpBackend {
    pub fn new(
        project: impl Into<String>,
        location: impl Into<String>,
        key_ring: impl Into<String>,
    ) -> Self {
        let project = project.into();
        let location = location.into();
        let key_ring = key_ring.into();
        let path_prefix =
            format!("projects/{project}/locations/{location}/keyRings/{key_ring}/cryptoKeys/");
        Self {
            project,
            location,
            key_ring,
            path_prefix,
            keys: RwLock::new(HashMap::new()),
        }
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn key_ring(&self) -> &str {
        &self.key_ring
    }

    /// The fully-qualified resource path of a key in this ring.
    pub fn key_path(&self, name: &str) -> String {
        format!("{}{name}", self.path_prefix)
    }

    /// Accepts either a short key name or a full path in this ring.
    /// A path into a different ring resolves to nothing.
    fn short_name<'a>(&self, key_id: &'a str) -> &'a str {
        key_id.strip_prefix(&self.path_prefix).unwrap_or(key_id)
    }

    /// Permanently destroys one version. Ciphertext produced under it is
    /// gone for good; other versions keep working.
    pub fn destroy_version(&self, key_id: &str, version: u32) -> Result<()> {
        let name = self.short_name(key_id);
        let mut keys = self.keys.write();
        let key = keys
            .get_mut(name)
            .ok_or_else(|| Error::KeyNotFound(key_id.to_string()))?;
        key.destroy_version(name, version)?;
        info!("destroyed version v{version} of '{}'", self.key_path(name));
        Ok(())
    }

    /// Points encryption at an existing live version without rotating.
    pub fn set_primary_version(&self, key_id: &str, version: u32) -> Result<()> {
        let name = self.short_name(key_id);
        let mut keys = self.keys.write();
        let key = keys
            .get_mut(name)
            .ok_or_else(|| Error::KeyNotFound(key_id.to_string()))?;
        key.set_primary(name, version)?;
        info!("primary version of '{}' is now v{version}", self.key_path(name));
        Ok(())
    }
}

impl KmsProvider for GcpBackend {
    fn platform(&self) -> Platform {
        Platform::Gcp
    }

    fn create_key(&self, key_id: &str, algorithm: SymmetricAlgorithm) -> Result<KeyHandle> {
        let name = self.short_name(key_id).to_string();
        let mut keys = self.keys.write();
        if keys.contains_key(&name) {
            return Err(Error::KeyAlreadyExists(self.key_path(&name)));
        }
        keys.insert(name.clone(), VersionedKey::new(algorithm)?);
        let path = self.key_path(&name);
        info!("created crypto key '{path}' ({algorithm})");
        Ok(KeyHandle::new(Platform::Gcp, path, 1))
    }

    fn encrypt(&self, key_id: &str, plaintext: &[u8], aad: Option<&[u8]>) -> Result<Vec<u8>> {
        let name = self.short_name(key_id);
        let keys = self.keys.read();
        let key = keys
            .get(name)
            .ok_or_else(|| Error::KeyNotFound(key_id.to_string()))?;
        let (version, material) = key.material_for_encrypt(name)?;

        let nonce = crypto::generate_nonce()?;
        let body = crypto::seal(key.algorithm(), material, &nonce, plaintext, aad)?;
        let path = self.key_path(name);
        debug!("encrypt under '{path}' v{version}");
        Envelope::new(Platform::Gcp, path, version, key.algorithm(), nonce).seal(&body)
    }

    fn decrypt(&self, ciphertext: &[u8], aad: Option<&[u8]>) -> Result<Vec<u8>> {
        let (envelope, body) = Envelope::decode_from_prefixed_slice(ciphertext)?;
        if envelope.platform != Platform::Gcp {
            return Err(Error::ProviderMismatch {
                expected: envelope.platform,
                actual: Platform::Gcp,
            });
        }
        // A path into a different ring does not resolve here.
        let name = match envelope.key_id.strip_prefix(&self.path_prefix) {
            Some(name) => name,
            None => return Err(Error::KeyNotFound(envelope.key_id.clone())),
        };
        let keys = self.keys.read();
        let key = keys
            .get(name)
            .ok_or_else(|| Error::KeyNotFound(envelope.key_id.clone()))?;
        let material = key.material_for_decrypt(name, envelope.key_version)?;
        debug!("decrypt under '{}' v{}", envelope.key_id, envelope.key_version);
        crypto::open(key.algorithm(), material, &envelope.nonce, body, aad)
    }

    fn rotate_key(&self, key_id: &str) -> Result<KeyHandle> {
        let name = self.short_name(key_id);
        let mut keys = self.keys.write();
        let key = keys
            .get_mut(name)
            .ok_or_else(|| Error::KeyNotFound(key_id.to_string()))?;
        let version = key.rotate(name)?;
        let path = self.key_path(name);
        info!("rotated '{path}', primary is now v{version}");
        Ok(KeyHandle::new(Platform::Gcp, path, version))
    }

    fn describe_key(&self, key_id: &str) -> Result<KeyInfo> {
        let name = self.short_name(key_id);
        let keys = self.keys.read();
        let key = keys
            .get(name)
            .ok_or_else(|| Error::KeyNotFound(key_id.to_string()))?;
        Ok(key.info(Platform::Gcp, &self.key_path(name)))
    }

    fn list_keys(&self) -> Result<Vec<String>> {
        let mut paths: Vec<String> = self
            .keys
            .read()
            .keys()
            .map(|name| self.key_path(name))
            .collect();
        paths.sort();
        Ok(paths)
    }

    fn set_min_decryption_version(&self, _key_id: &str, _version: u32) -> Result<()> {
        Err(Error::UnsupportedOperation {
            platform: Platform::Gcp,
            operation: "minimum decryption versions",
        })
    }

    fn enable_key(&self, key_id: &str) -> Result<()> {
        let name = self.short_name(key_id);
        let mut keys = self.keys.write();
        let key = keys
            .get_mut(name)
            .ok_or_else(|| Error::KeyNotFound(key_id.to_string()))?;
        key.enable();
        info!("enabled '{}'", self.key_path(name));
        Ok(())
    }

    fn disable_key(&self, key_id: &str) -> Result<()> {
        let name = self.short_name(key_id);
        let mut keys = self.keys.write();
        let key = keys
            .get_mut(name)
            .ok_or_else(|| Error::KeyNotFound(key_id.to_string()))?;
        key.disable();
        info!("disabled '{}'", self.key_path(name));
        Ok(())
    }
}
