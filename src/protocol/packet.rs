use crate::protocol::state::{Direction, Phase};
use crate::protocol::{game, handshake, login};
use bytes::BytesMut;

/// Every packet the client knows, tagged by phase and direction.
///
/// Wire identity is `(phase, direction, id)`; the variant carries the same
/// information at the type level so the state machine can match exhaustively.
#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    Handshake(handshake::Serverbound),
    LoginClientbound(login::Clientbound),
    LoginServerbound(login::Serverbound),
    GameClientbound(game::Clientbound),
    GameServerbound(game::Serverbound),
}

impl Packet {
    pub fn phase(&self) -> Phase {
        match self {
            Packet::Handshake(_) => Phase::Handshake,
            Packet::LoginClientbound(_) | Packet::LoginServerbound(_) => Phase::Login,
            Packet::GameClientbound(_) | Packet::GameServerbound(_) => Phase::Game,
        }
    }

    pub fn direction(&self) -> Direction {
        match self {
            Packet::LoginClientbound(_) | Packet::GameClientbound(_) => Direction::ClientBound,
            Packet::Handshake(_) | Packet::LoginServerbound(_) | Packet::GameServerbound(_) => {
                Direction::ServerBound
            }
        }
    }

    /// Numeric id within the packet's phase and direction.
    pub fn id(&self) -> i32 {
        match self {
            Packet::Handshake(p) => p.id(),
            Packet::LoginClientbound(p) => p.id(),
            Packet::LoginServerbound(p) => p.id(),
            Packet::GameClientbound(p) => p.id(),
            Packet::GameServerbound(p) => p.id(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Packet::Handshake(p) => p.name(),
            Packet::LoginClientbound(p) => p.name(),
            Packet::LoginServerbound(p) => p.name(),
            Packet::GameClientbound(p) => p.name(),
            Packet::GameServerbound(p) => p.name(),
        }
    }

    /// Write the packet's fields, without the id.
    pub fn write_fields(&self, buf: &mut BytesMut) {
        match self {
            Packet::Handshake(p) => p.write(buf),
            Packet::LoginClientbound(p) => p.write(buf),
            Packet::LoginServerbound(p) => p.write(buf),
            Packet::GameClientbound(p) => p.write(buf),
            Packet::GameServerbound(p) => p.write(buf),
        }
    }
}

impl From<handshake::Serverbound> for Packet {
    fn from(packet: handshake::Serverbound) -> Self {
        Packet::Handshake(packet)
    }
}

impl From<login::Clientbound> for Packet {
    fn from(packet: login::Clientbound) -> Self {
        Packet::LoginClientbound(packet)
    }
}

impl From<login::Serverbound> for Packet {
    fn from(packet: login::Serverbound) -> Self {
        Packet::LoginServerbound(packet)
    }
}

impl From<game::Clientbound> for Packet {
    fn from(packet: game::Clientbound) -> Self {
        Packet::GameClientbound(packet)
    }
}

impl From<game::Serverbound> for Packet {
    fn from(packet: game::Serverbound) -> Self {
        Packet::GameServerbound(packet)
    }
}
