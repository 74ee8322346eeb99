//! Encrypted-at-rest storage of the provider API key.
//!
//! The key is sealed with AES-256-GCM under a key derived (SHA-256) from a
//! process-wide secret. Each call to [`KeyStore::store`] draws a fresh
//! 96-bit nonce; the opaque form is `base64(nonce || ciphertext)`.
//! Tampered or foreign ciphertext fails authentication on
//! [`KeyStore::retrieve`].

use std::fmt;

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose};
use rand::RngCore;
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;

use crate::{Result, ScrivenerError};

const NONCE_LEN: usize = 12;

/// A decrypted API key. `Debug` output is redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

/// Symmetric sealing of the provider credential.
pub struct KeyStore {
    cipher: Aes256Gcm,
}

impl KeyStore {
    /// Create a key store keyed from the given process-wide secret.
    pub fn new(secret: &str) -> Self {
        let key = Sha256::digest(secret.as_bytes());
        Self {
            cipher: Aes256Gcm::new(&key),
        }
    }

    /// Encrypt `plaintext` into its opaque, base64-encoded form.
    pub fn store(&self, plaintext: &str) -> Result<String> {
        let mut nonce = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce);

        let ciphertext = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext.as_bytes())
            .map_err(|e| ScrivenerError::Configuration(format!("encryption failed: {e}")))?;

        let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        sealed.extend_from_slice(&nonce);
        sealed.extend_from_slice(&ciphertext);
        Ok(general_purpose::STANDARD.encode(sealed))
    }

    /// Decode and decrypt an opaque value produced by [`KeyStore::store`].
    ///
    /// Any failure (bad encoding, wrong secret, tampering) is reported as
    /// [`ScrivenerError::MissingCredential`].
    pub fn retrieve(&self, opaque: &str) -> Result<ApiKey> {
        let sealed = general_purpose::STANDARD
            .decode(opaque.trim())
            .map_err(|_| ScrivenerError::MissingCredential)?;
        if sealed.len() <= NONCE_LEN {
            return Err(ScrivenerError::MissingCredential);
        }
        let (nonce, ciphertext) = sealed.split_at(NONCE_LEN);

        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| ScrivenerError::MissingCredential)?;

        String::from_utf8(plaintext)
            .map(ApiKey)
            .map_err(|_| ScrivenerError::MissingCredential)
    }
}

/// Host-side persistence of the opaque credential.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// The stored opaque value, or `None` if no key was ever saved.
    async fn load(&self) -> Result<Option<String>>;

    /// Overwrite the stored opaque value.
    async fn save(&self, opaque: String) -> Result<()>;
}

/// In-process [`CredentialStore`].
#[derive(Default)]
pub struct MemoryCredentialStore {
    value: RwLock<Option<String>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn load(&self) -> Result<Option<String>> {
        Ok(self.value.read().await.clone())
    }

    async fn save(&self, opaque: String) -> Result<()> {
        *self.value.write().await = Some(opaque);
        Ok(())
    }
}

/// [`CredentialStore`] keeping the opaque value in a single file.
pub struct FileCredentialStore {
    path: std::path::PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<std::path::PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn load(&self) -> Result<Option<String>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(s) if s.trim().is_empty() => Ok(None),
            Ok(s) => Ok(Some(s.trim().to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ScrivenerError::Storage(format!(
                "failed to read credential {:?}: {e}",
                self.path
            ))),
        }
    }

    async fn save(&self, opaque: String) -> Result<()> {
        tokio::fs::write(&self.path, opaque).await.map_err(|e| {
            ScrivenerError::Storage(format!("failed to write credential {:?}: {e}", self.path))
        })
    }
}
