//! Login encryption handshake.
//!
//! The server sends its RSA public key and a random verify token. The client
//! picks a fresh 16 byte secret, encrypts both the secret and the untouched
//! token under the server key (PKCS#1 v1.5), and answers with an
//! `EncryptionResponse`. The secret then keys AES-128-CFB8 in both directions,
//! installed only once the response has been written.
//!
//! Every failure here is fatal for the login: a handshake is bound to the
//! server's nonce and cannot be retried on the same connection.

use crate::core::cipher::{SharedSecret, SECRET_LEN};
use crate::error::{constants, ProtocolError, Result};
use crate::protocol::login;
use rand_core::{OsRng, RngCore};
use rsa::pkcs8::DecodePublicKey;
use rsa::{Pkcs1v15Encrypt, RsaPublicKey};
use sha1::{Digest, Sha1};
use tracing::{debug, instrument};

/// Outcome of answering an encryption request: the packet to send and the
/// secret to install once it is on the wire.
#[derive(Debug)]
pub struct KeyExchange {
    pub response: login::Serverbound,
    pub secret: SharedSecret,
}

/// Generate a fresh session secret from the OS RNG.
pub fn generate_secret() -> SharedSecret {
    let mut bytes = [0u8; SECRET_LEN];
    OsRng.fill_bytes(&mut bytes);
    SharedSecret::new(bytes)
}

/// Parse a DER encoded SubjectPublicKeyInfo.
///
/// # Errors
/// `CryptoFailure` if the bytes are not an RSA public key.
pub fn parse_public_key(der: &[u8]) -> Result<RsaPublicKey> {
    RsaPublicKey::from_public_key_der(der)
        .map_err(|e| ProtocolError::CryptoFailure(format!("{}: {e}", constants::ERR_PUBLIC_KEY)))
}

fn encrypt(key: &RsaPublicKey, data: &[u8]) -> Result<Vec<u8>> {
    key.encrypt(&mut OsRng, Pkcs1v15Encrypt, data)
        .map_err(|e| ProtocolError::CryptoFailure(format!("{}: {e}", constants::ERR_RSA_ENCRYPT)))
}

/// Answer an `EncryptionRequest` with a newly generated secret.
#[instrument(skip_all, fields(key_len = public_key.len(), token_len = verify_token.len()))]
pub fn respond_to_encryption_request(
    server_id: &str,
    public_key: &[u8],
    verify_token: &[u8],
) -> Result<KeyExchange> {
    respond_with_secret(server_id, public_key, verify_token, generate_secret())
}

/// Answer an `EncryptionRequest` using a caller-chosen secret.
pub fn respond_with_secret(
    server_id: &str,
    public_key: &[u8],
    verify_token: &[u8],
    secret: SharedSecret,
) -> Result<KeyExchange> {
    let key = parse_public_key(public_key)?;
    let shared_secret = encrypt(&key, secret.as_bytes())?;
    let verify_token = encrypt(&key, verify_token)?;

    debug!(
        server_hash = %minecraft_digest(server_id, &secret, public_key),
        "Prepared encryption response"
    );

    Ok(KeyExchange {
        response: login::Serverbound::EncryptionResponse {
            shared_secret,
            verify_token,
        },
        secret,
    })
}

/// Server hash used by the session server's join endpoint: SHA-1 over
/// `server_id ++ secret ++ public_key`, printed as a signed big-endian
/// hexadecimal number without leading zeros.
pub fn minecraft_digest(server_id: &str, secret: &SharedSecret, public_key: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(server_id.as_bytes());
    hasher.update(secret.as_bytes());
    hasher.update(public_key);
    signed_hex(hasher.finalize().into())
}

fn signed_hex(mut digest: [u8; 20]) -> String {
    let negative = digest[0] & 0x80 != 0;
    if negative {
        // Two's complement magnitude.
        let mut carry = true;
        for byte in digest.iter_mut().rev() {
            *byte = !*byte;
            if carry {
                let (sum, overflow) = byte.overflowing_add(1);
                *byte = sum;
                carry = overflow;
            }
        }
    }

    let hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
    let trimmed = hex.trim_start_matches('0');
    let magnitude = if trimmed.is_empty() { "0" } else { trimmed };
    if negative {
        format!("-{magnitude}")
    } else {
        magnitude.to_string()
    }
}
