//! Community content encryption
//!
//! No plaintext content is ever persisted: every authored text field passes
//! through [`EncryptionService`] before a row is written, sealed under a key
//! owned by exactly one community.

pub mod cipher;
pub mod keystore;
pub mod service;

pub use keystore::KeyStore;
pub use service::EncryptionService;
