//! Certificate authentication.
//!
//! Loads an X.509 certificate and RSA private key, signs a random nonce with
//! the key and exchanges the signature for an [`AuthToken`](planlink_protocol::AuthToken).

pub mod authenticator;
pub mod error;
pub mod material;
pub mod passphrase;
pub mod signer;

pub use authenticator::{Authenticator, authenticate};
pub use error::AuthError;
pub use material::CredentialMaterial;
pub use passphrase::PassphraseSource;
