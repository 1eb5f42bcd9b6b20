use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// The provider family a key lives in.
///
/// 密钥所属的提供商平台。
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Decode, Encode, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// A transit secrets engine (Vault-style cryptography-as-a-service).
    Vault,
    /// An AWS-KMS-style service.
    Aws,
    /// A GCP-KMS-style service.
    Gcp,
}

impl Platform {
    pub const ALL: [Platform; 3] = [Platform::Vault, Platform::Aws, Platform::Gcp];

    /// The stable string form used in key handles and configuration.
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Vault => "vault",
            Platform::Aws => "aws",
            Platform::Gcp => "gcp",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "vault" => Ok(Platform::Vault),
            "aws" => Ok(Platform::Aws),
            "gcp" => Ok(Platform::Gcp),
            other => Err(Error::UnknownPlatform(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_forms_round_trip() {
        for platform in Platform::ALL {
            assert_eq!(platform.as_str().parse::<Platform>().unwrap(), platform);
        }
    }

    #[test]
    fn test_unknown_platform_rejected() {
        assert!(matches!(
            "azure".parse::<Platform>(),
            Err(Error::UnknownPlatform(_))
        ));
    }
}
