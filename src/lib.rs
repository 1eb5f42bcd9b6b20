//! `kms-flow` is a unified multi-cloud key-management workflow library.
//! It provides one interface over several key-management platforms
//! (a Vault-transit-style engine, an AWS-KMS-style service, and a
//! GCP-KMS-style service), with self-describing ciphertext that routes
//! back to the key that produced it and key rotation that keeps old
//! ciphertext decryptable.

pub mod backend;
pub mod common;
pub mod config;
pub mod crypto;
pub mod error;
pub mod keys;
pub mod manager;
pub mod provider;

pub use common::algorithms::SymmetricAlgorithm;
pub use common::handle::KeyHandle;
pub use common::platform::Platform;
pub use config::KmsConfig;
pub use error::{Error, Result};
pub use manager::MultiCloudKms;
pub use provider::{KeyInfo, KeyState, KmsProvider};
