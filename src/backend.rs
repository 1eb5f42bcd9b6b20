//! In-process reference backends modelling the key-handle semantics of the
//! three provider families.
//!
//! Each backend enforces the same invariants behind [`crate::provider::KmsProvider`]:
//! rotation appends versions, old ciphertext keeps decrypting, and
//! ciphertext never crosses providers. What differs is naming and lifecycle
//! surface: transit keys are caller-named and fence by minimum decryption
//! version, AWS-style keys hide behind aliases and can be disabled, and
//! GCP-style keys live in a resource hierarchy with destroyable versions.

pub mod aws;
pub mod gcp;
pub mod transit;

pub(crate) mod keyring;
