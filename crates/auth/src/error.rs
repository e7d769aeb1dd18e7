use std::io;
use std::path::PathBuf;

use planlink_protocol::ErrorKind;

/// Errors from loading credentials or exchanging them for a token.
///
/// Messages never contain key material or passphrases.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("cannot read certificate {path}: {source}")]
    CertificateUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed certificate: {0}")]
    MalformedCertificate(String),

    #[error("cannot read private key {path}: {source}")]
    KeyUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed private key: {0}")]
    MalformedKey(String),

    #[error("private key is encrypted but no passphrase was provided")]
    PassphraseRequired,

    #[error("passphrase does not decrypt the private key")]
    WrongPassphrase,

    #[error("legacy PEM encryption (Proc-Type) is not supported, convert the key to encrypted PKCS#8")]
    UnsupportedKeyEncryption,

    #[error("cannot decrypt stored passphrase: {0}")]
    SecretDecryption(String),

    #[error("signing failed: {0}")]
    Signing(String),

    #[error("authentication rejected: {0}")]
    Rejected(String),

    #[error("malformed authentication response: {0}")]
    MalformedResponse(String),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

impl AuthError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Transport(_) => ErrorKind::Transport,
            Self::MalformedResponse(_) => ErrorKind::Protocol,
            _ => ErrorKind::Authentication,
        }
    }
}
