//! AEAD primitives shared by the reference backends.

use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes256Gcm, Nonce,
};
use chacha20poly1305::ChaCha20Poly1305;

use crate::common::algorithms::SymmetricAlgorithm;
use crate::error::{Error, Result};
use crate::keys::SymmetricKey;

/// 12-byte nonce for both ciphers (96 bits is the standard).
pub const NONCE_SIZE: usize = 12;

/// Generates a fresh random nonce from the OS RNG.
pub fn generate_nonce() -> Result<[u8; NONCE_SIZE]> {
    use rand::{rngs::OsRng, TryRngCore};
    let mut nonce = [0u8; NONCE_SIZE];
    OsRng.try_fill_bytes(&mut nonce)?;
    Ok(nonce)
}

fn payload<'a>(msg: &'a [u8], aad: Option<&'a [u8]>) -> Payload<'a, 'a> {
    Payload {
        msg,
        aad: aad.unwrap_or(&[]),
    }
}

/// Encrypts `plaintext` under `key` with the given algorithm and nonce.
pub fn seal(
    algorithm: SymmetricAlgorithm,
    key: &SymmetricKey,
    nonce: &[u8; NONCE_SIZE],
    plaintext: &[u8],
    aad: Option<&[u8]>,
) -> Result<Vec<u8>> {
    let nonce = Nonce::from_slice(nonce);
    match algorithm {
        SymmetricAlgorithm::Aes256Gcm => {
            let cipher =
                Aes256Gcm::new_from_slice(key.as_bytes()).map_err(|_| Error::InvalidKeyMaterial)?;
            cipher
                .encrypt(nonce, payload(plaintext, aad))
                .map_err(|_| Error::EncryptionFailed)
        }
        SymmetricAlgorithm::ChaCha20Poly1305 => {
            let cipher = ChaCha20Poly1305::new_from_slice(key.as_bytes())
                .map_err(|_| Error::InvalidKeyMaterial)?;
            cipher
                .encrypt(nonce, payload(plaintext, aad))
                .map_err(|_| Error::EncryptionFailed)
        }
    }
}

/// Decrypts `ciphertext` under `key`.
///
/// Failure is deliberately opaque: a tampered body and a mismatched key are
/// indistinguishable to the caller.
pub fn open(
    algorithm: SymmetricAlgorithm,
    key: &SymmetricKey,
    nonce: &[u8; NONCE_SIZE],
    ciphertext: &[u8],
    aad: Option<&[u8]>,
) -> Result<Vec<u8>> {
    let nonce = Nonce::from_slice(nonce);
    match algorithm {
        SymmetricAlgorithm::Aes256Gcm => {
            let cipher =
                Aes256Gcm::new_from_slice(key.as_bytes()).map_err(|_| Error::InvalidKeyMaterial)?;
            cipher
                .decrypt(nonce, payload(ciphertext, aad))
                .map_err(|_| Error::DecryptionFailed)
        }
        SymmetricAlgorithm::ChaCha20Poly1305 => {
            let cipher = ChaCha20Poly1305::new_from_slice(key.as_bytes())
                .map_err(|_| Error::InvalidKeyMaterial)?;
            cipher
                .decrypt(nonce, payload(ciphertext, aad))
                .map_err(|_| Error::DecryptionFailed)
        }
    }
}
