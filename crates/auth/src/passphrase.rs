//! Where the private key passphrase comes from.

use std::fs;
use std::path::{Path, PathBuf};

use fernet::Fernet;
use secrecy::{ExposeSecret, SecretString};

use crate::error::AuthError;

/// Passphrase for an encrypted private key.
#[derive(Debug, Default)]
pub enum PassphraseSource {
    /// Key is not encrypted.
    #[default]
    None,
    /// Passphrase given directly.
    Plain(SecretString),
    /// Passphrase stored as a Fernet token in `secret_file`, decryptable with
    /// the Fernet key held in `key_file`.
    SealedFiles { key_file: PathBuf, secret_file: PathBuf },
}

impl Clone for PassphraseSource {
    fn clone(&self) -> Self {
        match self {
            Self::None => Self::None,
            Self::Plain(secret) => Self::plain(secret.expose_secret()),
            Self::SealedFiles {
                key_file,
                secret_file,
            } => Self::SealedFiles {
                key_file: key_file.clone(),
                secret_file: secret_file.clone(),
            },
        }
    }
}

impl PassphraseSource {
    pub fn plain(passphrase: impl Into<String>) -> Self {
        Self::Plain(SecretString::from(passphrase.into()))
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Produces the passphrase, decrypting sealed files if needed.
    pub fn resolve(&self) -> Result<Option<SecretString>, AuthError> {
        match self {
            Self::None => Ok(None),
            Self::Plain(secret) => Ok(Some(SecretString::from(secret.expose_secret().to_owned()))),
            Self::SealedFiles {
                key_file,
                secret_file,
            } => unseal(key_file, secret_file).map(Some),
        }
    }
}

fn unseal(key_file: &Path, secret_file: &Path) -> Result<SecretString, AuthError> {
    let key = read_trimmed(key_file)?;
    let token = read_trimmed(secret_file)?;

    let fernet = Fernet::new(&key).ok_or_else(|| {
        AuthError::SecretDecryption(format!("invalid key in {}", key_file.display()))
    })?;
    let plain = fernet.decrypt(&token).map_err(|_| {
        AuthError::SecretDecryption(format!(
            "{} cannot be decrypted with {}",
            secret_file.display(),
            key_file.display()
        ))
    })?;
    let text = String::from_utf8(plain)
        .map_err(|_| AuthError::SecretDecryption("passphrase is not valid UTF-8".into()))?;
    Ok(SecretString::from(text))
}

fn read_trimmed(path: &Path) -> Result<String, AuthError> {
    let bytes = fs::read(path)
        .map_err(|e| AuthError::SecretDecryption(format!("cannot read {}: {e}", path.display())))?;
    let text = String::from_utf8(bytes)
        .map_err(|_| AuthError::SecretDecryption(format!("{} is not text", path.display())))?;
    Ok(text.trim().to_string())
}
