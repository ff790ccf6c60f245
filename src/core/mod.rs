//! # Core Wire Components
//!
//! Low-level framing, field encoding, and the stream cipher.
//!
//! ## Components
//! - **Types**: VarInt, string, byte array and UUID field codecs
//! - **Codec**: Tokio codec for length-prefixed frames with optional
//!   compression and encryption
//! - **Cipher**: AES-128-CFB8 stream state for each direction
//!
//! ## Wire Format
//! ```text
//! plain:       [VarInt len] [VarInt id] [fields]
//! compressed:  [VarInt len] [VarInt data len, 0 = raw] [zlib(id + fields) | id + fields]
//! encrypted:   every byte above, length prefix included, through AES-128-CFB8
//! ```
//!
//! ## Security
//! - Maximum frame size: 2 097 151 bytes (three byte VarInt)
//! - Maximum inflated size: 8 MiB (prevents decompression bombs)
//! - Length validation before allocation

pub mod cipher;
pub mod codec;
pub mod types;
