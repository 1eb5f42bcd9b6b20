//! Deployment configuration for the unified manager.
//!
//! Mirrors the per-platform sections an operator would write:
//!
//! ```json
//! {
//!   "primary": "vault",
//!   "vault": { "mount": "transit", "key_name": "demo-key" },
//!   "aws":   { "region": "us-east-1", "key_alias": "alias/multi-cloud-key" },
//!   "gcp":   { "project": "my-project", "location": "global",
//!              "key_ring": "multi-cloud-ring", "crypto_key": "app-key" }
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::common::algorithms::SymmetricAlgorithm;
use crate::common::platform::Platform;
use crate::error::{Error, Result};

/// Top-level configuration: a primary platform plus one section per
/// registered platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KmsConfig {
    /// The platform `encrypt` routes to when none is named.
    pub primary: Platform,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vault: Option<VaultConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aws: Option<AwsConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gcp: Option<GcpConfig>,
}

/// Transit engine section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultConfig {
    #[serde(default = "default_mount")]
    pub mount: String,
    /// The key this platform encrypts under.
    pub key_name: String,
    #[serde(default)]
    pub key_type: SymmetricAlgorithm,
}

fn default_mount() -> String {
    "transit".to_string()
}

/// AWS-style section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AwsConfig {
    pub region: String,
    /// The alias this platform encrypts under.
    pub key_alias: String,
    #[serde(default)]
    pub key_type: SymmetricAlgorithm,
}

/// GCP-style section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GcpConfig {
    pub project: String,
    pub location: String,
    pub key_ring: String,
    /// The crypto key this platform encrypts under.
    pub crypto_key: String,
    #[serde(default)]
    pub key_type: SymmetricAlgorithm,
}

impl KmsConfig {
    pub fn from_json_str(s: &str) -> Result<Self> {
        let config: KmsConfig = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// The platforms with a configuration section, in declaration order.
    pub fn platforms(&self) -> Vec<Platform> {
        let mut platforms = Vec::new();
        if self.vault.is_some() {
            platforms.push(Platform::Vault);
        }
        if self.aws.is_some() {
            platforms.push(Platform::Aws);
        }
        if self.gcp.is_some() {
            platforms.push(Platform::Gcp);
        }
        platforms
    }

    pub fn validate(&self) -> Result<()> {
        if self.platforms().is_empty() {
            return Err(Error::Config(
                "no platform sections configured".to_string(),
            ));
        }
        if !self.platforms().contains(&self.primary) {
            return Err(Error::Config(format!(
                "primary platform '{}' has no configuration section",
                self.primary
            )));
        }
        Ok(())
    }
}
