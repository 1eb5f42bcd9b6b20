//! Versioned key bookkeeping shared by the reference backends.
//!
//! Every decrypt-side invariant lives here: version fencing, destroyed
//! versions, and key state are enforced in one place so the three backends
//! only differ in naming and lifecycle surface.

use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::common::algorithms::SymmetricAlgorithm;
use crate::common::handle::KeyHandle;
use crate::common::platform::Platform;
use crate::error::{Error, Result};
use crate::keys::SymmetricKey;
use crate::provider::{KeyInfo, KeyState};

pub(crate) fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

/// One key version. Material is dropped on destruction but the version
/// number stays reserved so it can never be reused.
struct KeyVersion {
    material: Option<SymmetricKey>,
}

/// A named key with its full version history.
pub(crate) struct VersionedKey {
    algorithm: SymmetricAlgorithm,
    state: KeyState,
    min_decryption_version: u32,
    primary_version: u32,
    versions: BTreeMap<u32, KeyVersion>,
    created_at_ms: i64,
}

impl VersionedKey {
    /// Creates the key with an initial version 1.
    pub fn new(algorithm: SymmetricAlgorithm) -> Result<Self> {
        let mut versions = BTreeMap::new();
        versions.insert(
            1,
            KeyVersion {
                material: Some(SymmetricKey::generate(algorithm.key_size())?),
            },
        );
        Ok(Self {
            algorithm,
            state: KeyState::Enabled,
            min_decryption_version: 1,
            primary_version: 1,
            versions,
            created_at_ms: now_ms(),
        })
    }

    pub fn algorithm(&self) -> SymmetricAlgorithm {
        self.algorithm
    }

    pub fn state(&self) -> KeyState {
        self.state
    }

    pub fn latest_version(&self) -> u32 {
        // A key always holds at least version 1.
        self.versions.keys().next_back().copied().unwrap_or(1)
    }

    pub fn primary_version(&self) -> u32 {
        self.primary_version
    }

    pub fn live_versions(&self) -> Vec<u32> {
        self.versions
            .iter()
            .filter(|(_, v)| v.material.is_some())
            .map(|(n, _)| *n)
            .collect()
    }

    fn check_usable(&self, key_id: &str) -> Result<()> {
        match self.state {
            KeyState::Enabled => Ok(()),
            KeyState::Disabled => Err(Error::KeyDisabled(key_id.to_string())),
            KeyState::PendingDeletion => Err(Error::KeyPendingDeletion(key_id.to_string())),
        }
    }

    /// Appends a new version and makes it primary.
    pub fn rotate(&mut self, key_id: &str) -> Result<u32> {
        self.check_usable(key_id)?;
        let next = self.latest_version() + 1;
        self.versions.insert(
            next,
            KeyVersion {
                material: Some(SymmetricKey::generate(self.algorithm.key_size())?),
            },
        );
        self.primary_version = next;
        Ok(next)
    }

    /// Points encryption at an existing live version.
    pub fn set_primary(&mut self, key_id: &str, version: u32) -> Result<()> {
        match self.versions.get(&version) {
            None => Err(Error::VersionNotFound {
                key_id: key_id.to_string(),
                version,
            }),
            Some(v) if v.material.is_none() => Err(Error::VersionDestroyed {
                key_id: key_id.to_string(),
                version,
            }),
            Some(_) => {
                self.primary_version = version;
                Ok(())
            }
        }
    }

    /// Irreversibly drops one version's material. Other versions keep
    /// working; the version number is never reused.
    pub fn destroy_version(&mut self, key_id: &str, version: u32) -> Result<()> {
        let entry = self
            .versions
            .get_mut(&version)
            .ok_or_else(|| Error::VersionNotFound {
                key_id: key_id.to_string(),
                version,
            })?;
        if entry.material.is_none() {
            return Err(Error::VersionDestroyed {
                key_id: key_id.to_string(),
                version,
            });
        }
        entry.material = None;
        Ok(())
    }

    /// Fences off decryption of ciphertext older than `version`.
    pub fn set_min_decryption_version(&mut self, key_id: &str, version: u32) -> Result<()> {
        if version == 0 || version > self.latest_version() {
            return Err(Error::VersionNotFound {
                key_id: key_id.to_string(),
                version,
            });
        }
        self.min_decryption_version = version;
        Ok(())
    }

    pub fn enable(&mut self) {
        self.state = KeyState::Enabled;
    }

    pub fn disable(&mut self) {
        self.state = KeyState::Disabled;
    }

    pub fn schedule_deletion(&mut self) {
        self.state = KeyState::PendingDeletion;
    }

    /// Resolves the material used for a fresh encryption.
    pub fn material_for_encrypt(&self, key_id: &str) -> Result<(u32, &SymmetricKey)> {
        self.check_usable(key_id)?;
        let version = self.primary_version;
        let material = self
            .versions
            .get(&version)
            .and_then(|v| v.material.as_ref())
            .ok_or(Error::VersionDestroyed {
                key_id: key_id.to_string(),
                version,
            })?;
        Ok((version, material))
    }

    /// Resolves the material named by a ciphertext envelope.
    pub fn material_for_decrypt(&self, key_id: &str, version: u32) -> Result<&SymmetricKey> {
        self.check_usable(key_id)?;
        if version < self.min_decryption_version {
            return Err(Error::VersionBelowMinimum {
                key_id: key_id.to_string(),
                version,
                min_version: self.min_decryption_version,
            });
        }
        let entry = self
            .versions
            .get(&version)
            .ok_or_else(|| Error::VersionNotFound {
                key_id: key_id.to_string(),
                version,
            })?;
        entry.material.as_ref().ok_or(Error::VersionDestroyed {
            key_id: key_id.to_string(),
            version,
        })
    }

    /// Snapshot for `describe_key`, with the handle naming the latest
    /// version under the platform's identifier scheme.
    pub fn info(&self, platform: Platform, key_id: &str) -> KeyInfo {
        KeyInfo {
            handle: KeyHandle::new(platform, key_id, self.latest_version()),
            algorithm: self.algorithm,
            state: self.state,
            min_decryption_version: self.min_decryption_version,
            versions: self.live_versions(),
            created_at_ms: self.created_at_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> VersionedKey {
        VersionedKey::new(SymmetricAlgorithm::Aes256Gcm).unwrap()
    }

    #[test]
    fn test_new_key_starts_at_version_one() {
        let k = key();
        assert_eq!(k.latest_version(), 1);
        assert_eq!(k.primary_version(), 1);
        assert_eq!(k.live_versions(), vec![1]);
    }

    #[test]
    fn test_rotation_is_strictly_increasing() {
        let mut k = key();
        assert_eq!(k.rotate("k").unwrap(), 2);
        assert_eq!(k.rotate("k").unwrap(), 3);
        assert_eq!(k.latest_version(), 3);
        assert_eq!(k.primary_version(), 3);
        assert_eq!(k.live_versions(), vec![1, 2, 3]);
    }

    #[test]
    fn test_rotation_keeps_old_material() {
        let mut k = key();
        let v1_bytes = k.material_for_decrypt("k", 1).unwrap().as_bytes().to_vec();
        k.rotate("k").unwrap();

        assert_eq!(k.material_for_decrypt("k", 1).unwrap().as_bytes(), v1_bytes);
        let (version, v2) = k.material_for_encrypt("k").unwrap();
        assert_eq!(version, 2);
        assert_ne!(v2.as_bytes(), v1_bytes.as_slice());
    }

    #[test]
    fn test_min_decryption_version_fences() {
        let mut k = key();
        k.rotate("k").unwrap();
        k.rotate("k").unwrap();
        k.set_min_decryption_version("k", 2).unwrap();

        assert!(matches!(
            k.material_for_decrypt("k", 1),
            Err(Error::VersionBelowMinimum { min_version: 2, .. })
        ));
        assert!(k.material_for_decrypt("k", 2).is_ok());
    }

    #[test]
    fn test_min_decryption_version_bounds() {
        let mut k = key();
        assert!(k.set_min_decryption_version("k", 0).is_err());
        assert!(k.set_min_decryption_version("k", 5).is_err());
    }

    #[test]
    fn test_destroyed_version_refuses_decryption() {
        let mut k = key();
        k.rotate("k").unwrap();
        k.destroy_version("k", 1).unwrap();

        assert!(matches!(
            k.material_for_decrypt("k", 1),
            Err(Error::VersionDestroyed { version: 1, .. })
        ));
        assert!(k.material_for_decrypt("k", 2).is_ok());
        assert_eq!(k.live_versions(), vec![2]);
        // Version numbers are never reused.
        assert_eq!(k.rotate("k").unwrap(), 3);
    }

    #[test]
    fn test_destroying_twice_fails() {
        let mut k = key();
        k.rotate("k").unwrap();
        k.destroy_version("k", 1).unwrap();
        assert!(matches!(
            k.destroy_version("k", 1),
            Err(Error::VersionDestroyed { .. })
        ));
    }

    #[test]
    fn test_destroyed_primary_refuses_encryption() {
        let mut k = key();
        k.destroy_version("k", 1).unwrap();
        assert!(matches!(
            k.material_for_encrypt("k"),
            Err(Error::VersionDestroyed { .. })
        ));
    }

    #[test]
    fn test_set_primary_to_older_version() {
        let mut k = key();
        k.rotate("k").unwrap();
        k.set_primary("k", 1).unwrap();
        let (version, _) = k.material_for_encrypt("k").unwrap();
        assert_eq!(version, 1);

        assert!(k.set_primary("k", 9).is_err());
    }

    #[test]
    fn test_disabled_key_refuses_both_directions() {
        let mut k = key();
        k.disable();
        assert!(matches!(
            k.material_for_encrypt("k"),
            Err(Error::KeyDisabled(_))
        ));
        assert!(matches!(
            k.material_for_decrypt("k", 1),
            Err(Error::KeyDisabled(_))
        ));

        k.enable();
        assert!(k.material_for_encrypt("k").is_ok());
    }

    #[test]
    fn test_pending_deletion_refuses_rotation() {
        let mut k = key();
        k.schedule_deletion();
        assert!(matches!(
            k.rotate("k"),
            Err(Error::KeyPendingDeletion(_))
        ));
    }
}
