//! Game phase vocabulary.
//!
//! The game phase is open ended; only the packets a headless client needs to
//! stay connected and talk are registered here. Anything else the server sends
//! surfaces as `UnknownPacket` and is handled per `UnknownPacketPolicy`.

use crate::core::types::{
    read_f32, read_f64, read_i64, read_string, read_u8, read_uuid, read_varint, write_string,
    write_uuid, write_varint, MAX_CHAT_JSON_LEN,
};
use crate::protocol::packet::Packet;
use crate::protocol::registry::PacketRegistry;
use crate::protocol::state::Direction;
use bytes::{BufMut, BytesMut};
use uuid::Uuid;

/// Longest chat line a client may send.
pub const MAX_CHAT_LEN: usize = 256;

pub mod ids {
    pub mod clientbound {
        pub const CHAT_MESSAGE: i32 = 0x0E;
        pub const DISCONNECT: i32 = 0x19;
        pub const KEEP_ALIVE: i32 = 0x1F;
        pub const PLAYER_POSITION_AND_LOOK: i32 = 0x34;
    }

    pub mod serverbound {
        pub const TELEPORT_CONFIRM: i32 = 0x00;
        pub const CHAT_MESSAGE: i32 = 0x03;
        pub const KEEP_ALIVE: i32 = 0x10;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Clientbound {
    ChatMessage {
        json: String,
        position: u8,
        sender: Uuid,
    },
    Disconnect {
        reason: String,
    },
    /// Must be echoed back with the identical id.
    KeepAlive {
        id: i64,
    },
    PlayerPositionAndLook {
        x: f64,
        y: f64,
        z: f64,
        yaw: f32,
        pitch: f32,
        flags: u8,
        teleport_id: i32,
    },
}

impl Clientbound {
    pub fn id(&self) -> i32 {
        use ids::clientbound::*;
        match self {
            Clientbound::ChatMessage { .. } => CHAT_MESSAGE,
            Clientbound::Disconnect { .. } => DISCONNECT,
            Clientbound::KeepAlive { .. } => KEEP_ALIVE,
            Clientbound::PlayerPositionAndLook { .. } => PLAYER_POSITION_AND_LOOK,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Clientbound::ChatMessage { .. } => "ServerChatMessage",
            Clientbound::Disconnect { .. } => "GameDisconnect",
            Clientbound::KeepAlive { .. } => "ServerKeepAlive",
            Clientbound::PlayerPositionAndLook { .. } => "PlayerPositionAndLook",
        }
    }

    pub fn write(&self, buf: &mut BytesMut) {
        match self {
            Clientbound::ChatMessage {
                json,
                position,
                sender,
            } => {
                write_string(buf, json);
                buf.put_u8(*position);
                write_uuid(buf, sender);
            }
            Clientbound::Disconnect { reason } => write_string(buf, reason),
            Clientbound::KeepAlive { id } => buf.put_i64(*id),
            Clientbound::PlayerPositionAndLook {
                x,
                y,
                z,
                yaw,
                pitch,
                flags,
                teleport_id,
            } => {
                buf.put_f64(*x);
                buf.put_f64(*y);
                buf.put_f64(*z);
                buf.put_f32(*yaw);
                buf.put_f32(*pitch);
                buf.put_u8(*flags);
                write_varint(buf, *teleport_id);
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Serverbound {
    TeleportConfirm { teleport_id: i32 },
    ChatMessage { message: String },
    KeepAlive { id: i64 },
}

impl Serverbound {
    pub fn id(&self) -> i32 {
        use ids::serverbound::*;
        match self {
            Serverbound::TeleportConfirm { .. } => TELEPORT_CONFIRM,
            Serverbound::ChatMessage { .. } => CHAT_MESSAGE,
            Serverbound::KeepAlive { .. } => KEEP_ALIVE,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Serverbound::TeleportConfirm { .. } => "TeleportConfirm",
            Serverbound::ChatMessage { .. } => "ClientChatMessage",
            Serverbound::KeepAlive { .. } => "ClientKeepAlive",
        }
    }

    pub fn write(&self, buf: &mut BytesMut) {
        match self {
            Serverbound::TeleportConfirm { teleport_id } => write_varint(buf, *teleport_id),
            Serverbound::ChatMessage { message } => write_string(buf, message),
            Serverbound::KeepAlive { id } => buf.put_i64(*id),
        }
    }
}

pub(crate) fn register(registry: &mut PacketRegistry) {
    use ids::{clientbound, serverbound};

    registry.register(
        Direction::ClientBound,
        clientbound::CHAT_MESSAGE,
        "ServerChatMessage",
        |buf| {
            let json = read_string(buf, MAX_CHAT_JSON_LEN)?;
            let position = read_u8(buf)?;
            let sender = read_uuid(buf)?;
            Ok(Packet::from(Clientbound::ChatMessage {
                json,
                position,
                sender,
            }))
        },
    );
    registry.register(
        Direction::ClientBound,
        clientbound::DISCONNECT,
        "GameDisconnect",
        |buf| {
            let reason = read_string(buf, MAX_CHAT_JSON_LEN)?;
            Ok(Packet::from(Clientbound::Disconnect { reason }))
        },
    );
    registry.register(
        Direction::ClientBound,
        clientbound::KEEP_ALIVE,
        "ServerKeepAlive",
        |buf| {
            let id = read_i64(buf)?;
            Ok(Packet::from(Clientbound::KeepAlive { id }))
        },
    );
    registry.register(
        Direction::ClientBound,
        clientbound::PLAYER_POSITION_AND_LOOK,
        "PlayerPositionAndLook",
        |buf| {
            Ok(Packet::from(Clientbound::PlayerPositionAndLook {
                x: read_f64(buf)?,
                y: read_f64(buf)?,
                z: read_f64(buf)?,
                yaw: read_f32(buf)?,
                pitch: read_f32(buf)?,
                flags: read_u8(buf)?,
                teleport_id: read_varint(buf)?,
            }))
        },
    );

    registry.register(
        Direction::ServerBound,
        serverbound::TELEPORT_CONFIRM,
        "TeleportConfirm",
        |buf| {
            let teleport_id = read_varint(buf)?;
            Ok(Packet::from(Serverbound::TeleportConfirm { teleport_id }))
        },
    );
    registry.register(
        Direction::ServerBound,
        serverbound::CHAT_MESSAGE,
        "ClientChatMessage",
        |buf| {
            let message = read_string(buf, MAX_CHAT_LEN)?;
            Ok(Packet::from(Serverbound::ChatMessage { message }))
        },
    );
    registry.register(
        Direction::ServerBound,
        serverbound::KEEP_ALIVE,
        "ClientKeepAlive",
        |buf| {
            let id = read_i64(buf)?;
            Ok(Packet::from(Serverbound::KeepAlive { id }))
        },
    );
}
