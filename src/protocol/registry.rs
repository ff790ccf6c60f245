use crate::core::types::{read_varint, write_varint};
use crate::error::{constants, ProtocolError, Result};
use crate::protocol::packet::Packet;
use crate::protocol::state::{Direction, Phase};
use crate::protocol::{game, handshake, login};
use bytes::{Buf, Bytes, BytesMut};
use std::collections::HashMap;

/// Decodes the fields that follow a packet id.
pub type DecodeFn = fn(&mut Bytes) -> Result<Packet>;

/// One registered packet shape.
#[derive(Clone, Copy)]
pub struct Entry {
    pub name: &'static str,
    pub decode: DecodeFn,
}

impl std::fmt::Debug for Entry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Entry").field("name", &self.name).finish()
    }
}

/// Packet vocabulary of a single phase, for both directions.
///
/// Built once per phase and shared read-only; registries of different phases
/// never see each other's ids.
#[derive(Debug)]
pub struct PacketRegistry {
    phase: Phase,
    entries: HashMap<(Direction, i32), Entry>,
}

impl PacketRegistry {
    fn empty(phase: Phase) -> Self {
        Self {
            phase,
            entries: HashMap::new(),
        }
    }

    pub fn handshake() -> Self {
        let mut registry = Self::empty(Phase::Handshake);
        handshake::register(&mut registry);
        registry
    }

    pub fn login() -> Self {
        let mut registry = Self::empty(Phase::Login);
        login::register(&mut registry);
        registry
    }

    pub fn game() -> Self {
        let mut registry = Self::empty(Phase::Game);
        game::register(&mut registry);
        registry
    }

    pub fn for_phase(phase: Phase) -> Self {
        match phase {
            Phase::Handshake => Self::handshake(),
            Phase::Login => Self::login(),
            Phase::Game => Self::game(),
        }
    }

    pub(crate) fn register(
        &mut self,
        direction: Direction,
        id: i32,
        name: &'static str,
        decode: DecodeFn,
    ) {
        let previous = self.entries.insert((direction, id), Entry { name, decode });
        debug_assert!(previous.is_none(), "duplicate packet id 0x{id:02X}");
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// # Errors
    /// `UnknownPacket` if nothing is registered under `(direction, id)`.
    pub fn lookup(&self, direction: Direction, id: i32) -> Result<&Entry> {
        self.entries
            .get(&(direction, id))
            .ok_or(ProtocolError::UnknownPacket {
                phase: self.phase,
                direction,
                id,
            })
    }

    /// Registered ids for one direction, ascending.
    pub fn ids(&self, direction: Direction) -> Vec<i32> {
        let mut ids: Vec<i32> = self
            .entries
            .keys()
            .filter(|(dir, _)| *dir == direction)
            .map(|(_, id)| *id)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Decode a frame body (`[VarInt id][fields]`).
    ///
    /// # Errors
    /// - `MalformedFrame` if the id or fields are truncated, or bytes remain
    ///   after the last field
    /// - `UnknownPacket` if the id is not registered for `direction`
    pub fn decode(&self, direction: Direction, mut body: Bytes) -> Result<Packet> {
        let id = read_varint(&mut body)?;
        let entry = self.lookup(direction, id)?;
        let packet = (entry.decode)(&mut body)?;
        if body.has_remaining() {
            return Err(ProtocolError::MalformedFrame(format!(
                "{}: {} ({} bytes)",
                entry.name,
                constants::ERR_TRAILING_BYTES,
                body.remaining()
            )));
        }
        Ok(packet)
    }

    /// Append `[VarInt id][fields]` for `packet` to `dst`.
    ///
    /// # Errors
    /// `WrongPhase` if the packet is not part of this registry.
    pub fn encode(&self, packet: &Packet, dst: &mut BytesMut) -> Result<()> {
        if packet.phase() != self.phase
            || !self.entries.contains_key(&(packet.direction(), packet.id()))
        {
            return Err(ProtocolError::WrongPhase {
                phase: self.phase,
                name: packet.name(),
            });
        }
        write_varint(dst, packet.id());
        packet.write_fields(dst);
        Ok(())
    }

    pub fn encode_to_bytes(&self, packet: &Packet) -> Result<Bytes> {
        let mut dst = BytesMut::new();
        self.encode(packet, &mut dst)?;
        Ok(dst.freeze())
    }
}
