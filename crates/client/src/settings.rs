use planlink_auth::PassphraseSource;

/// Where the certificate, key and passphrase come from.
///
/// `certificate` and `private_key` are file paths or PEM text.
#[derive(Debug, Clone, Default)]
pub struct AuthSettings {
    pub certificate: String,
    pub private_key: String,
    pub passphrase: PassphraseSource,
}

impl AuthSettings {
    pub fn new(certificate: impl Into<String>, private_key: impl Into<String>) -> Self {
        Self {
            certificate: certificate.into(),
            private_key: private_key.into(),
            passphrase: PassphraseSource::None,
        }
    }

    pub fn with_passphrase(mut self, passphrase: PassphraseSource) -> Self {
        self.passphrase = passphrase;
        self
    }
}
