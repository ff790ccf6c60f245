//! # Stream Cipher
//!
//! AES-128 in CFB8 mode, keyed and IV'd with the 16 byte shared secret
//! negotiated during login. CFB8 works byte-at-a-time, so it can be applied to
//! an arbitrary slice of the byte stream without any padding or framing of its
//! own; encrypt and decrypt keep independent state, one per direction.

use crate::error::{constants, ProtocolError, Result};
use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use zeroize::{Zeroize, ZeroizeOnDrop};

type Aes128Cfb8Enc = cfb8::Encryptor<aes::Aes128>;
type Aes128Cfb8Dec = cfb8::Decryptor<aes::Aes128>;

/// Length of the shared secret in bytes.
pub const SECRET_LEN: usize = 16;

/// Symmetric key material for the session cipher.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SharedSecret([u8; SECRET_LEN]);

impl SharedSecret {
    pub fn new(bytes: [u8; SECRET_LEN]) -> Self {
        Self(bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let array: [u8; SECRET_LEN] = bytes
            .try_into()
            .map_err(|_| ProtocolError::CryptoFailure(constants::ERR_SECRET_LENGTH.into()))?;
        Ok(Self(array))
    }

    pub fn as_bytes(&self) -> &[u8; SECRET_LEN] {
        &self.0
    }
}

impl std::fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SharedSecret(..)")
    }
}

/// Outbound half of the session cipher.
pub struct StreamEncryptor(Aes128Cfb8Enc);

impl StreamEncryptor {
    pub fn new(secret: &SharedSecret) -> Self {
        let key = secret.as_bytes();
        Self(Aes128Cfb8Enc::new(key.into(), key.into()))
    }

    /// Encrypt `data` in place, advancing the stream state.
    pub fn apply(&mut self, data: &mut [u8]) {
        for byte in data.chunks_mut(1) {
            self.0.encrypt_block_mut(GenericArray::from_mut_slice(byte));
        }
    }
}

/// Inbound half of the session cipher.
pub struct StreamDecryptor(Aes128Cfb8Dec);

impl StreamDecryptor {
    pub fn new(secret: &SharedSecret) -> Self {
        let key = secret.as_bytes();
        Self(Aes128Cfb8Dec::new(key.into(), key.into()))
    }

    /// Decrypt `data` in place, advancing the stream state.
    pub fn apply(&mut self, data: &mut [u8]) {
        for byte in data.chunks_mut(1) {
            self.0.decrypt_block_mut(GenericArray::from_mut_slice(byte));
        }
    }
}
