//! Nonce generation and signing.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use planlink_protocol::AuthRequest;
use planlink_protocol::constants::NONCE_LEN;
use rand::RngCore;
use rand::rngs::OsRng;
use rsa::RsaPrivateKey;
use rsa::pkcs1v15::SigningKey;
use rsa::signature::{SignatureEncoding, Signer};
use sha2::Sha512;

use crate::error::AuthError;

/// Fresh random bytes for one authentication attempt.
pub fn new_nonce() -> [u8; NONCE_LEN] {
    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);
    nonce
}

/// RSA PKCS#1 v1.5 signature over `data` with SHA-512.
pub fn sign(key: &RsaPrivateKey, data: &[u8]) -> Result<Vec<u8>, AuthError> {
    let signing_key = SigningKey::<Sha512>::new(key.clone());
    let signature = signing_key
        .try_sign(data)
        .map_err(|e| AuthError::Signing(e.to_string()))?;
    Ok(signature.to_vec())
}

/// Builds the authentication body for `nonce`.
pub fn sign_request(key: &RsaPrivateKey, nonce: &[u8]) -> Result<AuthRequest, AuthError> {
    let signature = sign(key, nonce)?;
    Ok(AuthRequest {
        encoded_data: STANDARD.encode(nonce),
        encoded_signed_data: STANDARD.encode(signature),
    })
}
