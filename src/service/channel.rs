use crate::core::cipher::SharedSecret;
use crate::error::{ProtocolError, Result};
use crate::protocol::packet::Packet;
use crate::protocol::registry::PacketRegistry;
use crate::protocol::state::{Direction, Phase};
use crate::transport::Transport;
use crate::utils::timeout::maybe_with_timeout;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, trace};

/// Packet-level duplex over a [`Transport`] for one phase.
///
/// Cloning is cheap and clones share the transport, so one clone can sit in
/// `receive` while another sends. Dropping a channel releases its registry
/// but never closes the transport; the session owns that.
#[derive(Clone)]
pub struct PacketChannel {
    transport: Arc<Transport>,
    registry: Arc<PacketRegistry>,
    inbound: Direction,
    read_timeout: Option<Duration>,
}

impl PacketChannel {
    /// Client-side channel: reads client-bound packets, sends server-bound ones.
    pub fn new(transport: Arc<Transport>, registry: Arc<PacketRegistry>) -> Self {
        Self::with_inbound(transport, registry, Direction::ClientBound)
    }

    /// Channel reading packets that travel `inbound`.
    pub fn with_inbound(
        transport: Arc<Transport>,
        registry: Arc<PacketRegistry>,
        inbound: Direction,
    ) -> Self {
        Self {
            transport,
            registry,
            inbound,
            read_timeout: None,
        }
    }

    /// Fail `receive` with `Timeout` when no frame arrives within `timeout`.
    pub fn with_read_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn phase(&self) -> Phase {
        self.registry.phase()
    }

    pub fn transport(&self) -> &Arc<Transport> {
        &self.transport
    }

    /// Encode `packet` with this phase's registry and write it as one frame.
    ///
    /// # Errors
    /// - `WrongPhase` / `WrongDirection` if the packet is not ours to send
    /// - `Cancelled` once the transport is closed
    #[instrument(skip_all, fields(phase = %self.phase()))]
    pub async fn send(&self, packet: impl Into<Packet>) -> Result<()> {
        let packet = packet.into();
        if packet.direction() == self.inbound {
            return Err(ProtocolError::WrongDirection {
                direction: packet.direction(),
                name: packet.name(),
            });
        }
        let body = self.registry.encode_to_bytes(&packet)?;
        debug!(packet = packet.name(), len = body.len(), "Sending packet");
        self.transport.write_frame(body).await
    }

    /// Read and decode the next packet.
    ///
    /// # Errors
    /// - `MalformedFrame` if framing or fields are inconsistent
    /// - `UnknownPacket` if the id is not registered for this phase; the
    ///   frame has been consumed, so the channel stays usable
    /// - `Cancelled`, `ConnectionClosed`, `Timeout`
    pub async fn receive(&self) -> Result<Packet> {
        let body = maybe_with_timeout(self.transport.read_frame(), self.read_timeout).await?;
        let packet = self.registry.decode(self.inbound, body)?;
        trace!(packet = packet.name(), phase = %self.phase(), "Received packet");
        Ok(packet)
    }

    /// Write-once; see [`Transport::install_cipher`].
    pub async fn install_cipher(&self, secret: &SharedSecret) -> Result<()> {
        self.transport.install_cipher(secret).await
    }

    /// Write-once; see [`Transport::install_compression`].
    pub async fn install_compression(&self, threshold: usize) -> Result<()> {
        self.transport.install_compression(threshold).await
    }
}

impl std::fmt::Debug for PacketChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PacketChannel")
            .field("phase", &self.phase())
            .field("inbound", &self.inbound)
            .finish()
    }
}
