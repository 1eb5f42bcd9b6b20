//! The unified multi-cloud facade.
//!
//! `MultiCloudKms` owns one adapter per platform plus a default key binding
//! for each, and routes every call: encryption goes to the primary platform
//! (or an explicitly named one), decryption follows the ciphertext's own
//! envelope back to the platform that produced it.

use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, info};

use crate::backend::{aws::AwsBackend, gcp::GcpBackend, transit::TransitBackend};
use crate::common::algorithms::SymmetricAlgorithm;
use crate::common::envelope::Envelope;
use crate::common::handle::KeyHandle;
use crate::common::platform::Platform;
use crate::config::KmsConfig;
use crate::error::{Error, Result};
use crate::provider::{KeyInfo, KmsProvider};

/// One registered platform: the adapter plus the key it encrypts under.
struct Binding {
    provider: Arc<dyn KmsProvider>,
    key_id: String,
    algorithm: SymmetricAlgorithm,
}

/// The unified wrapper over all registered key-management platforms.
pub struct MultiCloudKms {
    primary: Platform,
    bindings: HashMap<Platform, Binding>,
}

/// Builder for [`MultiCloudKms`].
#[derive(Default)]
pub struct MultiCloudKmsBuilder {
    primary: Option<Platform>,
    bindings: Vec<(Arc<dyn KmsProvider>, String, SymmetricAlgorithm)>,
}

impl MultiCloudKmsBuilder {
    /// Registers an adapter together with the key id it encrypts under.
    /// The first registered platform becomes primary unless one is named.
    pub fn register(
        mut self,
        provider: Arc<dyn KmsProvider>,
        key_id: impl Into<String>,
        algorithm: SymmetricAlgorithm,
    ) -> Self {
        self.bindings.push((provider, key_id.into(), algorithm));
        self
    }

    pub fn primary(mut self, platform: Platform) -> Self {
        self.primary = Some(platform);
        self
    }

    pub fn build(self) -> Result<MultiCloudKms> {
        let mut bindings = HashMap::new();
        let mut first = None;
        for (provider, key_id, algorithm) in self.bindings {
            let platform = provider.platform();
            first.get_or_insert(platform);
            if bindings
                .insert(
                    platform,
                    Binding {
                        provider,
                        key_id,
                        algorithm,
                    },
                )
                .is_some()
            {
                return Err(Error::Config(format!(
                    "platform '{platform}' registered twice"
                )));
            }
        }

        let primary = self
            .primary
            .or(first)
            .ok_or_else(|| Error::Config("no platforms registered".to_string()))?;
        if !bindings.contains_key(&primary) {
            return Err(Error::ProviderNotRegistered(primary));
        }

        Ok(MultiCloudKms { primary, bindings })
    }
}

impl MultiCloudKms {
    pub fn builder() -> MultiCloudKmsBuilder {
        MultiCloudKmsBuilder::default()
    }

    /// Builds reference backends for every configured platform, provisions
    /// their bound keys, and wires them behind one facade.
    pub fn from_config(config: &KmsConfig) -> Result<Self> {
        config.validate()?;
        let mut builder = Self::builder().primary(config.primary);

        if let Some(vault) = &config.vault {
            builder = builder.register(
                Arc::new(TransitBackend::new(vault.mount.clone())),
                vault.key_name.clone(),
                vault.key_type,
            );
        }
        if let Some(aws) = &config.aws {
            builder = builder.register(
                Arc::new(AwsBackend::new(aws.region.clone())),
                aws.key_alias.clone(),
                aws.key_type,
            );
        }
        if let Some(gcp) = &config.gcp {
            builder = builder.register(
                Arc::new(GcpBackend::new(
                    gcp.project.clone(),
                    gcp.location.clone(),
                    gcp.key_ring.clone(),
                )),
                gcp.crypto_key.clone(),
                gcp.key_type,
            );
        }

        let manager = builder.build()?;
        manager.sync_keys()?;
        Ok(manager)
    }

    pub fn primary(&self) -> Platform {
        self.primary
    }

    /// The registered platforms, sorted.
    pub fn platforms(&self) -> Vec<Platform> {
        let mut platforms: Vec<Platform> = self.bindings.keys().copied().collect();
        platforms.sort();
        platforms
    }

    /// Direct access to one platform's adapter.
    pub fn provider(&self, platform: Platform) -> Result<&Arc<dyn KmsProvider>> {
        self.binding(platform).map(|b| &b.provider)
    }

    fn binding(&self, platform: Platform) -> Result<&Binding> {
        self.bindings
            .get(&platform)
            .ok_or(Error::ProviderNotRegistered(platform))
    }

    /// Ensures every registered platform has its bound key provisioned,
    /// returning the handles.
    pub fn sync_keys(&self) -> Result<Vec<KeyHandle>> {
        let mut handles = Vec::new();
        for platform in self.platforms() {
            let binding = self.binding(platform)?;
            let handle = binding
                .provider
                .ensure_key(&binding.key_id, binding.algorithm)?;
            debug!("'{platform}' serves {handle}");
            handles.push(handle);
        }
        Ok(handles)
    }

    /// Encrypts on the primary platform.
    pub fn encrypt(&self, plaintext: &[u8], aad: Option<&[u8]>) -> Result<Vec<u8>> {
        self.encrypt_on(self.primary, plaintext, aad)
    }

    /// Encrypts on an explicitly named platform.
    pub fn encrypt_on(
        &self,
        platform: Platform,
        plaintext: &[u8],
        aad: Option<&[u8]>,
    ) -> Result<Vec<u8>> {
        let binding = self.binding(platform)?;
        debug!("routing encrypt to '{platform}'");
        binding.provider.encrypt(&binding.key_id, plaintext, aad)
    }

    /// Decrypts by routing the ciphertext back to the platform named in its
    /// envelope. Ciphertext from an unregistered platform is refused.
    pub fn decrypt(&self, ciphertext: &[u8], aad: Option<&[u8]>) -> Result<Vec<u8>> {
        let handle = self.inspect(ciphertext)?;
        debug!("routing decrypt of {handle} to '{}'", handle.platform);
        let binding = self.binding(handle.platform)?;
        binding.provider.decrypt(ciphertext, aad)
    }

    /// Reads which key produced a ciphertext without decrypting it.
    pub fn inspect(&self, ciphertext: &[u8]) -> Result<KeyHandle> {
        let (envelope, _) = Envelope::decode_from_prefixed_slice(ciphertext)?;
        Ok(envelope.handle())
    }

    /// Rotates one platform's bound key.
    pub fn rotate(&self, platform: Platform) -> Result<KeyHandle> {
        let binding = self.binding(platform)?;
        let handle = binding.provider.rotate_key(&binding.key_id)?;
        info!("rotated '{platform}' to {handle}");
        Ok(handle)
    }

    /// Rotates the bound key on every registered platform.
    pub fn rotate_all(&self) -> Result<Vec<KeyHandle>> {
        self.platforms()
            .into_iter()
            .map(|platform| self.rotate(platform))
            .collect()
    }

    /// Describes every platform's bound key, for operational visibility.
    pub fn describe_all(&self) -> Result<Vec<KeyInfo>> {
        self.platforms()
            .into_iter()
            .map(|platform| {
                let binding = self.binding(platform)?;
                binding.provider.describe_key(&binding.key_id)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> MultiCloudKms {
        let config = KmsConfig::from_json_str(
            r#"{
                "primary": "vault",
                "vault": { "key_name": "demo-key" },
                "aws": { "region": "us-east-1", "key_alias": "alias/multi-cloud-key" },
                "gcp": {
                    "project": "my-project",
                    "location": "global",
                    "key_ring": "multi-cloud-ring",
                    "crypto_key": "app-encryption-key"
                }
            }"#,
        )
        .unwrap();
        MultiCloudKms::from_config(&config).unwrap()
    }

    #[test]
    fn test_encrypt_routes_to_primary() {
        let kms = manager();
        let ciphertext = kms.encrypt(b"data", None).unwrap();
        assert_eq!(kms.inspect(&ciphertext).unwrap().platform, Platform::Vault);
    }

    #[test]
    fn test_decrypt_routes_by_envelope() {
        let kms = manager();
        for platform in Platform::ALL {
            let ciphertext = kms.encrypt_on(platform, b"payload", None).unwrap();
            assert_eq!(kms.inspect(&ciphertext).unwrap().platform, platform);
            assert_eq!(kms.decrypt(&ciphertext, None).unwrap(), b"payload");
        }
    }

    #[test]
    fn test_unregistered_platform_refused() {
        let config = KmsConfig::from_json_str(
            r#"{ "primary": "vault", "vault": { "key_name": "k" } }"#,
        )
        .unwrap();
        let vault_only = MultiCloudKms::from_config(&config).unwrap();

        let foreign = manager().encrypt_on(Platform::Aws, b"data", None).unwrap();
        assert!(matches!(
            vault_only.decrypt(&foreign, None),
            Err(Error::ProviderNotRegistered(Platform::Aws))
        ));
    }

    #[test]
    fn test_sync_keys_is_idempotent() {
        let kms = manager();
        let first = kms.sync_keys().unwrap();
        let second = kms.sync_keys().unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 3);
    }

    #[test]
    fn test_rotate_all_advances_every_platform() {
        let kms = manager();
        let handles = kms.rotate_all().unwrap();
        assert_eq!(handles.len(), 3);
        assert!(handles.iter().all(|h| h.version == 2));
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let result = MultiCloudKms::builder()
            .register(
                Arc::new(TransitBackend::new("transit")),
                "a",
                SymmetricAlgorithm::Aes256Gcm,
            )
            .register(
                Arc::new(TransitBackend::new("other")),
                "b",
                SymmetricAlgorithm::Aes256Gcm,
            )
            .build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_first_registered_is_default_primary() {
        let kms = MultiCloudKms::builder()
            .register(
                Arc::new(AwsBackend::new("us-east-1")),
                "alias/k",
                SymmetricAlgorithm::Aes256Gcm,
            )
            .build()
            .unwrap();
        assert_eq!(kms.primary(), Platform::Aws);
    }
}
