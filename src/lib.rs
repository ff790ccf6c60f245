//! # mcproto-client
//!
//! Async client for the Minecraft Java Edition protocol (version 754, 1.16.5).
//!
//! A [`Session`] connects, announces a login in the handshake, logs in
//! (switching the connection to AES-128-CFB8 and zlib compression when the
//! server asks for it), and then hands every game packet to an
//! [`EventSink`]. Subscribers can answer through a [`PacketSender`].
//!
//! ## Quick Start
//! ```rust,no_run
//! use mcproto_client::{ClientConfig, EventSink, Session};
//! use mcproto_client::protocol::game;
//! use std::sync::Arc;
//!
//! # async fn demo() -> mcproto_client::error::Result<()> {
//! let sink = Arc::new(EventSink::new());
//! sink.subscribe(|_, packet| {
//!     if let game::Clientbound::ChatMessage { json, .. } = packet {
//!         println!("{json}");
//!     }
//! })?;
//!
//! let config = ClientConfig::new("localhost", 25565).with_username("Nick");
//! let end = Session::new(config, sink)?.connect().await?;
//! println!("session ended: {end:?}");
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//! - [`core`]: frame codec, field codecs, stream cipher
//! - [`protocol`]: packet vocabulary, registries, key exchange, event sink
//! - [`transport`]: framed byte stream with write-once cipher and compression
//! - [`service`]: packet channels and the session state machine
//! - [`config`], [`error`], [`utils`]: configuration, errors, logging, metrics

pub mod config;
pub mod core;
pub mod error;
pub mod protocol;
pub mod service;
pub mod transport;
pub mod utils;

pub use config::{ClientConfig, NetworkConfig, UnknownPacketPolicy};
pub use error::{ProtocolError, Result};
pub use protocol::dispatcher::{EventSink, SubscriptionId};
pub use protocol::state::{Direction, Phase};
pub use service::{PacketChannel, PacketSender, Session, SessionEnd};
