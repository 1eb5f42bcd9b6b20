use bincode::{Decode, Encode};
use std::fmt;
use std::str::FromStr;

use crate::common::platform::Platform;
use crate::error::Error;

/// A fully-qualified name for one version of one key inside one provider.
///
/// A handle never names a key in a different provider: ciphertext produced
/// under one platform's key is only ever decryptable by that same
/// platform/key, and rotation produces a new version under the same
/// identifier while prior versions remain valid for decryption.
///
/// 命名某个提供商内部某个密钥的某个版本的完全限定句柄。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Decode, Encode)]
pub struct KeyHandle {
    pub platform: Platform,
    pub key_id: String,
    pub version: u32,
}

impl KeyHandle {
    pub fn new(platform: Platform, key_id: impl Into<String>, version: u32) -> Self {
        Self {
            platform,
            key_id: key_id.into(),
            version,
        }
    }
}

impl fmt::Display for KeyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:v{}", self.platform, self.key_id, self.version)
    }
}

impl FromStr for KeyHandle {
    type Err = Error;

    /// Parses the `platform:key_id:vN` form produced by `Display`.
    ///
    /// The key id may itself contain `:` (GCP paths, aliases), so the
    /// version is split off from the right.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::InvalidKeyHandle(s.to_string());

        let (platform, rest) = s.split_once(':').ok_or_else(invalid)?;
        let platform: Platform = platform.parse().map_err(|_| invalid())?;
        let (key_id, version) = rest.rsplit_once(":v").ok_or_else(invalid)?;
        if key_id.is_empty() {
            return Err(invalid());
        }
        let version: u32 = version.parse().map_err(|_| invalid())?;

        Ok(KeyHandle::new(platform, key_id, version))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_parse_round_trip() {
        let handles = [
            KeyHandle::new(Platform::Vault, "demo-key", 1),
            KeyHandle::new(Platform::Aws, "alias/multi-cloud-key", 3),
            KeyHandle::new(
                Platform::Gcp,
                "projects/p/locations/global/keyRings/r/cryptoKeys/k",
                7,
            ),
        ];
        for handle in handles {
            let parsed: KeyHandle = handle.to_string().parse().unwrap();
            assert_eq!(parsed, handle);
        }
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for s in [
            "",
            "vault",
            "vault:key",
            "vault:key:v",
            "vault:key:vx",
            "azure:key:v1",
            "vault::v1",
        ] {
            assert!(
                s.parse::<KeyHandle>().is_err(),
                "should have rejected {s:?}"
            );
        }
    }
}
