//! Login phase vocabulary.
//!
//! The server may interleave an encryption request and a compression switch
//! before it either accepts (`LoginSuccess`) or rejects (`Disconnect`) the
//! client.

use crate::core::types::{
    read_bool, read_byte_array, read_remaining, read_string, read_uuid, read_varint,
    write_byte_array, write_string, write_uuid, write_varint, MAX_CHAT_JSON_LEN,
};
use crate::protocol::packet::Packet;
use crate::protocol::registry::PacketRegistry;
use crate::protocol::state::Direction;
use bytes::{BufMut, BytesMut};
use uuid::Uuid;

/// Longest player name the server accepts.
pub const MAX_NAME_LEN: usize = 16;

/// Longest `server_id` in an encryption request.
pub const MAX_SERVER_ID_LEN: usize = 20;

/// Longest plugin channel identifier.
pub const MAX_CHANNEL_LEN: usize = 32767;

pub mod ids {
    pub mod clientbound {
        pub const DISCONNECT: i32 = 0x00;
        pub const ENCRYPTION_REQUEST: i32 = 0x01;
        pub const LOGIN_SUCCESS: i32 = 0x02;
        pub const SET_COMPRESSION: i32 = 0x03;
        pub const PLUGIN_REQUEST: i32 = 0x04;
    }

    pub mod serverbound {
        pub const LOGIN_START: i32 = 0x00;
        pub const ENCRYPTION_RESPONSE: i32 = 0x01;
        pub const PLUGIN_RESPONSE: i32 = 0x02;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Clientbound {
    /// Server refused the login; `reason` is a JSON chat component.
    Disconnect { reason: String },
    EncryptionRequest {
        server_id: String,
        /// DER encoded SubjectPublicKeyInfo.
        public_key: Vec<u8>,
        verify_token: Vec<u8>,
    },
    LoginSuccess { uuid: Uuid, username: String },
    /// Negative thresholds disable compression.
    SetCompression { threshold: i32 },
    PluginRequest {
        message_id: i32,
        channel: String,
        data: Vec<u8>,
    },
}

impl Clientbound {
    pub fn id(&self) -> i32 {
        use ids::clientbound::*;
        match self {
            Clientbound::Disconnect { .. } => DISCONNECT,
            Clientbound::EncryptionRequest { .. } => ENCRYPTION_REQUEST,
            Clientbound::LoginSuccess { .. } => LOGIN_SUCCESS,
            Clientbound::SetCompression { .. } => SET_COMPRESSION,
            Clientbound::PluginRequest { .. } => PLUGIN_REQUEST,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Clientbound::Disconnect { .. } => "LoginDisconnect",
            Clientbound::EncryptionRequest { .. } => "EncryptionRequest",
            Clientbound::LoginSuccess { .. } => "LoginSuccess",
            Clientbound::SetCompression { .. } => "SetCompression",
            Clientbound::PluginRequest { .. } => "LoginPluginRequest",
        }
    }

    pub fn write(&self, buf: &mut BytesMut) {
        match self {
            Clientbound::Disconnect { reason } => write_string(buf, reason),
            Clientbound::EncryptionRequest {
                server_id,
                public_key,
                verify_token,
            } => {
                write_string(buf, server_id);
                write_byte_array(buf, public_key);
                write_byte_array(buf, verify_token);
            }
            Clientbound::LoginSuccess { uuid, username } => {
                write_uuid(buf, uuid);
                write_string(buf, username);
            }
            Clientbound::SetCompression { threshold } => write_varint(buf, *threshold),
            Clientbound::PluginRequest {
                message_id,
                channel,
                data,
            } => {
                write_varint(buf, *message_id);
                write_string(buf, channel);
                buf.put_slice(data);
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Serverbound {
    LoginStart { name: String },
    /// Both fields are RSA encrypted under the server's public key.
    EncryptionResponse {
        shared_secret: Vec<u8>,
        verify_token: Vec<u8>,
    },
    /// `data: None` tells the server the channel was not understood.
    PluginResponse {
        message_id: i32,
        data: Option<Vec<u8>>,
    },
}

impl Serverbound {
    pub fn id(&self) -> i32 {
        use ids::serverbound::*;
        match self {
            Serverbound::LoginStart { .. } => LOGIN_START,
            Serverbound::EncryptionResponse { .. } => ENCRYPTION_RESPONSE,
            Serverbound::PluginResponse { .. } => PLUGIN_RESPONSE,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Serverbound::LoginStart { .. } => "LoginStart",
            Serverbound::EncryptionResponse { .. } => "EncryptionResponse",
            Serverbound::PluginResponse { .. } => "LoginPluginResponse",
        }
    }

    pub fn write(&self, buf: &mut BytesMut) {
        match self {
            Serverbound::LoginStart { name } => write_string(buf, name),
            Serverbound::EncryptionResponse {
                shared_secret,
                verify_token,
            } => {
                write_byte_array(buf, shared_secret);
                write_byte_array(buf, verify_token);
            }
            Serverbound::PluginResponse { message_id, data } => {
                write_varint(buf, *message_id);
                match data {
                    Some(data) => {
                        buf.put_u8(1);
                        buf.put_slice(data);
                    }
                    None => buf.put_u8(0),
                }
            }
        }
    }
}

pub(crate) fn register(registry: &mut PacketRegistry) {
    use ids::{clientbound, serverbound};

    registry.register(
        Direction::ClientBound,
        clientbound::DISCONNECT,
        "LoginDisconnect",
        |buf| {
            let reason = read_string(buf, MAX_CHAT_JSON_LEN)?;
            Ok(Packet::from(Clientbound::Disconnect { reason }))
        },
    );
    registry.register(
        Direction::ClientBound,
        clientbound::ENCRYPTION_REQUEST,
        "EncryptionRequest",
        |buf| {
            let server_id = read_string(buf, MAX_SERVER_ID_LEN)?;
            let public_key = read_byte_array(buf)?;
            let verify_token = read_byte_array(buf)?;
            Ok(Packet::from(Clientbound::EncryptionRequest {
                server_id,
                public_key,
                verify_token,
            }))
        },
    );
    registry.register(
        Direction::ClientBound,
        clientbound::LOGIN_SUCCESS,
        "LoginSuccess",
        |buf| {
            let uuid = read_uuid(buf)?;
            let username = read_string(buf, MAX_NAME_LEN)?;
            Ok(Packet::from(Clientbound::LoginSuccess { uuid, username }))
        },
    );
    registry.register(
        Direction::ClientBound,
        clientbound::SET_COMPRESSION,
        "SetCompression",
        |buf| {
            let threshold = read_varint(buf)?;
            Ok(Packet::from(Clientbound::SetCompression { threshold }))
        },
    );
    registry.register(
        Direction::ClientBound,
        clientbound::PLUGIN_REQUEST,
        "LoginPluginRequest",
        |buf| {
            let message_id = read_varint(buf)?;
            let channel = read_string(buf, MAX_CHANNEL_LEN)?;
            let data = read_remaining(buf);
            Ok(Packet::from(Clientbound::PluginRequest {
                message_id,
                channel,
                data,
            }))
        },
    );

    registry.register(
        Direction::ServerBound,
        serverbound::LOGIN_START,
        "LoginStart",
        |buf| {
            let name = read_string(buf, MAX_NAME_LEN)?;
            Ok(Packet::from(Serverbound::LoginStart { name }))
        },
    );
    registry.register(
        Direction::ServerBound,
        serverbound::ENCRYPTION_RESPONSE,
        "EncryptionResponse",
        |buf| {
            let shared_secret = read_byte_array(buf)?;
            let verify_token = read_byte_array(buf)?;
            Ok(Packet::from(Serverbound::EncryptionResponse {
                shared_secret,
                verify_token,
            }))
        },
    );
    registry.register(
        Direction::ServerBound,
        serverbound::PLUGIN_RESPONSE,
        "LoginPluginResponse",
        |buf| {
            let message_id = read_varint(buf)?;
            let data = if read_bool(buf)? {
                Some(read_remaining(buf))
            } else {
                None
            };
            Ok(Packet::from(Serverbound::PluginResponse { message_id, data }))
        },
    );
}
