//! # Frame Codec
//!
//! Tokio codecs that turn a byte stream into frame bodies (`[packet id][fields]`)
//! and back. The read and write halves of a connection each own one side so
//! they can be driven from different tasks.
//!
//! ## Wire Format
//! ```text
//! plain:       [VarInt frame length] [body]
//! compressed:  [VarInt frame length] [VarInt data length (0 = raw)] [zlib(body) | body]
//! encrypted:   every byte above, length prefix included, through AES-128-CFB8
//! ```
//!
//! Compression and encryption are write-once switches flipped mid-stream
//! during login. Bytes that were already decoded are never touched again;
//! bytes still sitting in the read buffer when encryption is switched on are
//! treated as ciphertext, since the peer only encrypts after it has seen our
//! key.

use crate::core::cipher::{SharedSecret, StreamDecryptor, StreamEncryptor};
use crate::core::types::{peek_varint, read_length, varint_len, write_varint};
use crate::error::{constants, ProtocolError, Result};
use crate::utils::compression::{maybe_compress, maybe_decompress, MAX_UNCOMPRESSED_SIZE};
use bytes::{Buf, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::trace;

/// Largest frame length expressible in a three byte VarInt.
pub const MAX_FRAME_LEN: usize = 2_097_151;

/// Inbound side: length-prefix splitting, decryption, inflation.
#[derive(Default)]
pub struct FrameDecoder {
    compression: Option<usize>,
    cipher: Option<StreamDecryptor>,
    /// Prefix of the read buffer that has already been decrypted.
    decrypted: usize,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// # Errors
    /// `AlreadyConfigured` if compression was enabled before.
    pub fn enable_compression(&mut self, threshold: usize) -> Result<()> {
        if self.compression.is_some() {
            return Err(ProtocolError::AlreadyConfigured(constants::SLOT_COMPRESSION));
        }
        self.compression = Some(threshold);
        Ok(())
    }

    /// # Errors
    /// `AlreadyConfigured` if encryption was enabled before.
    pub fn enable_encryption(&mut self, secret: &SharedSecret) -> Result<()> {
        if self.cipher.is_some() {
            return Err(ProtocolError::AlreadyConfigured(constants::SLOT_CIPHER));
        }
        self.cipher = Some(StreamDecryptor::new(secret));
        self.decrypted = 0;
        Ok(())
    }

    pub fn compression_threshold(&self) -> Option<usize> {
        self.compression
    }

    pub fn is_encrypted(&self) -> bool {
        self.cipher.is_some()
    }
}

impl Decoder for FrameDecoder {
    type Item = Bytes;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Bytes>> {
        if let Some(cipher) = self.cipher.as_mut() {
            if self.decrypted < src.len() {
                cipher.apply(&mut src[self.decrypted..]);
                self.decrypted = src.len();
            }
        }

        let Some((len, prefix)) = peek_varint(src)? else {
            return Ok(None);
        };
        let len = usize::try_from(len)
            .map_err(|_| ProtocolError::malformed(constants::ERR_NEGATIVE_LENGTH))?;
        if len == 0 {
            return Err(ProtocolError::malformed("Empty frame"));
        }
        if len > MAX_FRAME_LEN {
            return Err(ProtocolError::malformed(constants::ERR_FRAME_TOO_LARGE));
        }

        let total = prefix + len;
        if src.len() < total {
            src.reserve(total - src.len());
            return Ok(None);
        }

        src.advance(prefix);
        let mut body = src.split_to(len).freeze();
        if self.cipher.is_some() {
            self.decrypted -= total;
        }
        trace!(frame_len = len, "Frame received");

        let Some(threshold) = self.compression else {
            return Ok(Some(body));
        };
        let declared = read_length(&mut body)?;
        if declared == 0 {
            return Ok(Some(body));
        }
        let inflated = maybe_decompress(&body, declared, threshold)?;
        Ok(Some(Bytes::from(inflated)))
    }
}

/// Outbound side: optional deflate, length prefix, encryption.
#[derive(Default)]
pub struct FrameEncoder {
    compression: Option<usize>,
    cipher: Option<StreamEncryptor>,
}

impl FrameEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// # Errors
    /// `AlreadyConfigured` if compression was enabled before.
    pub fn enable_compression(&mut self, threshold: usize) -> Result<()> {
        if self.compression.is_some() {
            return Err(ProtocolError::AlreadyConfigured(constants::SLOT_COMPRESSION));
        }
        self.compression = Some(threshold);
        Ok(())
    }

    /// # Errors
    /// `AlreadyConfigured` if encryption was enabled before.
    pub fn enable_encryption(&mut self, secret: &SharedSecret) -> Result<()> {
        if self.cipher.is_some() {
            return Err(ProtocolError::AlreadyConfigured(constants::SLOT_CIPHER));
        }
        self.cipher = Some(StreamEncryptor::new(secret));
        Ok(())
    }

    pub fn compression_threshold(&self) -> Option<usize> {
        self.compression
    }

    pub fn is_encrypted(&self) -> bool {
        self.cipher.is_some()
    }
}

impl Encoder<Bytes> for FrameEncoder {
    type Error = ProtocolError;

    fn encode(&mut self, body: Bytes, dst: &mut BytesMut) -> Result<()> {
        if body.len() > MAX_UNCOMPRESSED_SIZE {
            return Err(ProtocolError::malformed(constants::ERR_UNCOMPRESSED_TOO_LARGE));
        }
        let start = dst.len();

        match self.compression {
            None => {
                if body.len() > MAX_FRAME_LEN {
                    return Err(ProtocolError::malformed(constants::ERR_FRAME_TOO_LARGE));
                }
                dst.reserve(varint_len(body.len() as i32) + body.len());
                write_varint(dst, body.len() as i32);
                dst.extend_from_slice(&body);
            }
            Some(threshold) => {
                let (payload, compressed) = maybe_compress(&body, threshold)?;
                let declared = if compressed { body.len() as i32 } else { 0 };
                let frame_len = varint_len(declared) + payload.len();
                if frame_len > MAX_FRAME_LEN {
                    return Err(ProtocolError::malformed(constants::ERR_FRAME_TOO_LARGE));
                }
                dst.reserve(varint_len(frame_len as i32) + frame_len);
                write_varint(dst, frame_len as i32);
                write_varint(dst, declared);
                dst.extend_from_slice(&payload);
            }
        }

        if let Some(cipher) = self.cipher.as_mut() {
            cipher.apply(&mut dst[start..]);
        }
        trace!(frame_len = dst.len() - start, "Frame encoded");
        Ok(())
    }
}
