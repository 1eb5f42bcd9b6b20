use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 对称加密算法枚举
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Decode, Encode, Serialize, Deserialize)]
pub enum SymmetricAlgorithm {
    /// AES-256-GCM with 96-bit nonces. The transit engine calls this `aes256-gcm96`.
    #[serde(rename = "aes256-gcm96")]
    Aes256Gcm,
    /// ChaCha20-Poly1305 with 96-bit nonces.
    #[serde(rename = "chacha20-poly1305")]
    ChaCha20Poly1305,
}

impl SymmetricAlgorithm {
    /// Key length in bytes.
    pub const fn key_size(&self) -> usize {
        match self {
            SymmetricAlgorithm::Aes256Gcm => 32,
            SymmetricAlgorithm::ChaCha20Poly1305 => 32,
        }
    }

    /// Nonce length in bytes. Both ciphers use the standard 96-bit nonce.
    pub const fn nonce_size(&self) -> usize {
        12
    }

    /// The configuration string form, matching the transit engine's key types.
    pub fn as_str(&self) -> &'static str {
        match self {
            SymmetricAlgorithm::Aes256Gcm => "aes256-gcm96",
            SymmetricAlgorithm::ChaCha20Poly1305 => "chacha20-poly1305",
        }
    }
}

impl Default for SymmetricAlgorithm {
    fn default() -> Self {
        SymmetricAlgorithm::Aes256Gcm
    }
}

impl fmt::Display for SymmetricAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_sizes() {
        assert_eq!(SymmetricAlgorithm::Aes256Gcm.key_size(), 32);
        assert_eq!(SymmetricAlgorithm::ChaCha20Poly1305.key_size(), 32);
    }

    #[test]
    fn test_config_string_forms() {
        let alg: SymmetricAlgorithm = serde_json::from_str("\"aes256-gcm96\"").unwrap();
        assert_eq!(alg, SymmetricAlgorithm::Aes256Gcm);
        let alg: SymmetricAlgorithm = serde_json::from_str("\"chacha20-poly1305\"").unwrap();
        assert_eq!(alg, SymmetricAlgorithm::ChaCha20Poly1305);
    }
}
