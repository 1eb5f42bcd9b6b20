//! This module defines byte wrappers for cryptographic keys.
//!
//! 这个模块为加密密钥定义了字节包装器。
use zeroize::Zeroizing;

use crate::error::Result;

/// A byte wrapper for a symmetric encryption key.
///
/// This struct stores raw key bytes that are zeroized on drop. Backends
/// convert it to a concrete cipher key only at the point of use, which
/// keeps version bookkeeping independent of the algorithm.
///
/// 对称加密密钥的字节包装器。
#[derive(Debug, Clone)]
pub struct SymmetricKey(pub Zeroizing<Vec<u8>>);

impl SymmetricKey {
    /// Create a new symmetric key from bytes
    ///
    /// 从字节创建一个新的对称密钥
    pub fn new(bytes: impl Into<Zeroizing<Vec<u8>>>) -> Self {
        Self(bytes.into())
    }

    /// Generates a new random symmetric key of the specified length.
    ///
    /// This is what backends call when creating or rotating a key. It uses
    /// the operating system's cryptographically secure random number
    /// generator.
    ///
    /// 生成一个指定长度的新的随机对称密钥。
    ///
    /// # Arguments
    ///
    /// * `len` - The desired length of the key in bytes.
    pub fn generate(len: usize) -> Result<Self> {
        use rand::{rngs::OsRng, TryRngCore};
        let mut key_bytes = vec![0; len];
        OsRng.try_fill_bytes(&mut key_bytes)?;
        Ok(Self::new(key_bytes))
    }

    /// Get a reference to the raw bytes of the key
    ///
    /// 获取密钥原始字节的引用
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Consume the key and return the inner bytes
    ///
    /// 消耗密钥并返回内部字节
    pub fn into_bytes(self) -> Zeroizing<Vec<u8>> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symmetric_key_generate() {
        let key1 = SymmetricKey::generate(32).unwrap();
        let key2 = SymmetricKey::generate(32).unwrap();

        assert_eq!(key1.len(), 32);
        assert_eq!(key2.len(), 32);
        assert_ne!(
            key1.as_bytes(),
            key2.as_bytes(),
            "Generated keys should be unique"
        );
    }

    #[test]
    fn test_symmetric_key_from_bytes() {
        let key_bytes = vec![0u8; 32];
        let key = SymmetricKey::new(key_bytes.clone());

        assert_eq!(key.as_bytes(), key_bytes.as_slice());
    }
}
