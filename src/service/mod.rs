//! # Client Services
//!
//! Packet channels over a transport and the session that drives them.

pub mod channel;
pub mod client;

pub use channel::PacketChannel;
pub use client::{PacketSender, Session, SessionEnd};
