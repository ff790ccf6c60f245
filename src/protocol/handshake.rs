//! Handshake phase vocabulary.
//!
//! The phase consists of a single server-bound packet announcing the protocol
//! version, the address the client dialled and the phase it wants next. The
//! server never answers in this phase.

use crate::core::types::{read_string, read_u16, read_varint, write_string, write_varint};
use crate::error::{ProtocolError, Result};
use crate::protocol::packet::Packet;
use crate::protocol::registry::PacketRegistry;
use crate::protocol::state::{Direction, NextState};
use bytes::{BufMut, BytesMut};

/// Longest server address the vanilla server accepts.
pub const MAX_ADDRESS_LEN: usize = 255;

pub mod ids {
    pub const HANDSHAKE: i32 = 0x00;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Serverbound {
    Handshake {
        protocol_version: i32,
        server_address: String,
        server_port: u16,
        next_state: NextState,
    },
}

impl Serverbound {
    pub fn id(&self) -> i32 {
        match self {
            Serverbound::Handshake { .. } => ids::HANDSHAKE,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Serverbound::Handshake { .. } => "Handshake",
        }
    }

    pub fn write(&self, buf: &mut BytesMut) {
        match self {
            Serverbound::Handshake {
                protocol_version,
                server_address,
                server_port,
                next_state,
            } => {
                write_varint(buf, *protocol_version);
                write_string(buf, server_address);
                buf.put_u16(*server_port);
                write_varint(buf, next_state.id());
            }
        }
    }
}

pub(crate) fn register(registry: &mut PacketRegistry) {
    registry.register(Direction::ServerBound, ids::HANDSHAKE, "Handshake", |buf| {
        let protocol_version = read_varint(buf)?;
        let server_address = read_string(buf, MAX_ADDRESS_LEN)?;
        let server_port = read_u16(buf)?;
        let next_state = NextState::from_id(read_varint(buf)?)?;
        Ok(Packet::from(Serverbound::Handshake {
            protocol_version,
            server_address,
            server_port,
            next_state,
        }))
    });
}

/// Build the handshake announcing a login on `host:port`.
pub fn login_intent(protocol_version: i32, host: &str, port: u16) -> Result<Serverbound> {
    if host.chars().count() > MAX_ADDRESS_LEN {
        return Err(ProtocolError::ConfigError(format!(
            "server address longer than {MAX_ADDRESS_LEN} characters"
        )));
    }
    Ok(Serverbound::Handshake {
        protocol_version,
        server_address: host.to_string(),
        server_port: port,
        next_state: NextState::Login,
    })
}
