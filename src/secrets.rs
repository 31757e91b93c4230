//! Credential encryption for persisted action metadata.
//!
//! Declared API keys and OAuth client secrets are never written to the store
//! as plaintext. The `Cipher` port keeps the reconcilers independent of the
//! primitive; the default adapter is passphrase-based AGE encryption with
//! ciphertexts carried as `age:`-prefixed base64 strings.

use crate::error::SyncError;
use std::io::{Read, Write};

const AGE_PREFIX: &str = "age:";

/// Encryption port consumed by the action reconciler.
pub trait Cipher: Send + Sync {
    fn encrypt(&self, plaintext: &str) -> Result<String, SyncError>;
    fn decrypt(&self, ciphertext: &str) -> Result<String, SyncError>;
}

/// Check whether a value carries the AGE ciphertext marker.
pub fn is_encrypted(value: &str) -> bool {
    value.starts_with(AGE_PREFIX)
}

/// Passphrase-based AGE cipher.
pub struct AgeCipher {
    passphrase: String,
}

impl AgeCipher {
    pub fn new(passphrase: impl Into<String>) -> Self {
        Self {
            passphrase: passphrase.into(),
        }
    }

    fn secret(&self) -> age::secrecy::SecretString {
        age::secrecy::SecretString::from(self.passphrase.clone())
    }
}

impl Cipher for AgeCipher {
    fn encrypt(&self, plaintext: &str) -> Result<String, SyncError> {
        let encryptor = age::Encryptor::with_user_passphrase(self.secret());

        let mut encrypted = vec![];
        let mut writer = encryptor
            .wrap_output(&mut encrypted)
            .map_err(|e| SyncError::Encryption(e.to_string()))?;
        writer
            .write_all(plaintext.as_bytes())
            .map_err(|e| SyncError::Encryption(e.to_string()))?;
        writer
            .finish()
            .map_err(|e| SyncError::Encryption(e.to_string()))?;

        let encoded = base64::Engine::encode(&base64::engine::general_purpose::STANDARD, &encrypted);
        Ok(format!("{}{}", AGE_PREFIX, encoded))
    }

    fn decrypt(&self, ciphertext: &str) -> Result<String, SyncError> {
        let encoded = ciphertext.strip_prefix(AGE_PREFIX).ok_or_else(|| {
            SyncError::Encryption("value is not an age ciphertext".to_string())
        })?;

        let encrypted = base64::Engine::decode(&base64::engine::general_purpose::STANDARD, encoded)
            .map_err(|e| SyncError::Encryption(format!("invalid base64: {}", e)))?;

        let decryptor = match age::Decryptor::new(&encrypted[..])
            .map_err(|e| SyncError::Encryption(e.to_string()))?
        {
            age::Decryptor::Passphrase(d) => d,
            _ => {
                return Err(SyncError::Encryption(
                    "unsupported recipient type".to_string(),
                ))
            }
        };

        let mut decrypted = vec![];
        let mut reader = decryptor
            .decrypt(&self.secret(), None)
            .map_err(|e| SyncError::Encryption(e.to_string()))?;
        reader
            .read_to_end(&mut decrypted)
            .map_err(|e| SyncError::Encryption(e.to_string()))?;

        String::from_utf8(decrypted)
            .map_err(|_| SyncError::Encryption("plaintext is not valid UTF-8".to_string()))
    }
}
