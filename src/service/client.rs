//! # Session State Machine
//!
//! Drives one connection through Handshake, Login and Game.
//!
//! Each phase gets its own [`PacketChannel`] over the shared transport, built
//! on that phase's registry. Cipher and compression installed during Login
//! live in the transport's framing, so the Game channel inherits them.
//!
//! ## Outcome
//! [`Session::run`] returns exactly once:
//! - `Ok(SessionEnd::Cancelled)` after the cancellation token fired
//! - `Ok(SessionEnd::Closed)` when the server closed the stream
//! - `Ok(SessionEnd::Kicked(reason))` on a Game-phase disconnect
//! - `Err(LoginRejected(reason))` on a Login-phase disconnect
//! - any other `Err` for fatal protocol, crypto or I/O failures
//!
//! The transport is closed on every one of these paths.

use crate::config::{ClientConfig, UnknownPacketPolicy};
use crate::error::{ProtocolError, Result};
use crate::protocol::dispatcher::EventSink;
use crate::protocol::packet::Packet;
use crate::protocol::registry::PacketRegistry;
use crate::protocol::security::{self, KeyExchange};
use crate::protocol::state::Phase;
use crate::protocol::{game, handshake, login};
use crate::service::channel::PacketChannel;
use crate::transport::Transport;
use crate::utils::metrics::SessionMetrics;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, watch, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// How a session that did not fail came to an end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEnd {
    Cancelled,
    Closed,
    Kicked(String),
}

/// Cloneable handle for sending Game packets while the session runs.
///
/// Sending only enqueues; the game loop writes queued packets in order before
/// it reads the next frame. This makes it safe to call from inside an
/// [`EventSink`] handler.
///
/// With `auto_keep_alive` on, the session has already answered a keep-alive
/// by the time handlers see it. A handler that echoes the same id anyway has
/// its reply dropped, since the server disconnects on an unexpected one.
#[derive(Debug, Clone)]
pub struct PacketSender {
    tx: mpsc::UnboundedSender<game::Serverbound>,
    cancel: CancellationToken,
}

impl PacketSender {
    /// Detached sender and its queue, for driving handlers outside a session.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<game::Serverbound>) {
        Self::with_cancel(CancellationToken::new())
    }

    fn with_cancel(
        cancel: CancellationToken,
    ) -> (Self, mpsc::UnboundedReceiver<game::Serverbound>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx, cancel }, rx)
    }

    /// Queue `packet` for the server.
    ///
    /// # Errors
    /// `Cancelled` once the session is cancelled or over.
    pub fn send(&self, packet: game::Serverbound) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(ProtocolError::Cancelled);
        }
        self.tx.send(packet).map_err(|_| ProtocolError::Cancelled)
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled() || self.tx.is_closed()
    }
}

/// One client connection from handshake to disconnect.
///
/// Grab the handles you need (`cancel_token`, `sender`, `phase_watcher`,
/// `metrics`) before calling [`Session::run`] or [`Session::connect`], which
/// consume the session.
pub struct Session {
    config: ClientConfig,
    sink: Arc<EventSink>,
    cancel: CancellationToken,
    phase: watch::Sender<Phase>,
    sender: PacketSender,
    outbound: Mutex<mpsc::UnboundedReceiver<game::Serverbound>>,
    metrics: Arc<SessionMetrics>,
}

enum Step {
    Cancelled,
    Outbound(game::Serverbound),
    Inbound(Result<Packet>),
}

impl Session {
    /// # Errors
    /// `ConfigError` if `config` does not validate.
    pub fn new(config: ClientConfig, sink: Arc<EventSink>) -> Result<Self> {
        let errors = config.validate();
        if !errors.is_empty() {
            return Err(ProtocolError::ConfigError(errors.join("; ")));
        }

        let cancel = CancellationToken::new();
        let (sender, outbound) = PacketSender::with_cancel(cancel.clone());
        let (phase, _) = watch::channel(Phase::Handshake);
        Ok(Self {
            config,
            sink,
            cancel,
            phase,
            sender,
            outbound: Mutex::new(outbound),
            metrics: Arc::new(SessionMetrics::new()),
        })
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn sender(&self) -> PacketSender {
        self.sender.clone()
    }

    pub fn phase(&self) -> Phase {
        *self.phase.borrow()
    }

    /// Observe phase transitions while the session runs.
    pub fn phase_watcher(&self) -> watch::Receiver<Phase> {
        self.phase.subscribe()
    }

    pub fn metrics(&self) -> Arc<SessionMetrics> {
        Arc::clone(&self.metrics)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Connect over TCP to the configured server and run the session.
    ///
    /// # Errors
    /// `ConnectFailure` if the server cannot be reached, otherwise as
    /// [`Session::run`].
    pub async fn connect(self) -> Result<SessionEnd> {
        let connecting = Transport::connect(
            &self.config.host,
            self.config.port,
            self.config.connect_timeout,
            self.cancel.clone(),
        );
        let transport = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Ok(SessionEnd::Cancelled),
            transport = connecting => transport?,
        };
        self.run_transport(transport).await
    }

    /// Run the session over an already connected byte stream.
    pub async fn run<S>(self, stream: S) -> Result<SessionEnd>
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let transport = Transport::new(stream, self.cancel.clone());
        self.run_transport(transport).await
    }

    async fn run_transport(self, transport: Transport) -> Result<SessionEnd> {
        let transport = Arc::new(transport.with_metrics(Arc::clone(&self.metrics)));
        let result = self.drive(&transport).await;
        transport.close().await;
        self.metrics.log_summary();

        match result {
            Err(ProtocolError::Cancelled) => Ok(SessionEnd::Cancelled),
            Err(ProtocolError::ConnectionClosed) => Ok(SessionEnd::Closed),
            other => {
                match &other {
                    Ok(end) => info!(?end, "Session ended"),
                    Err(e) => warn!(error = %e, phase = %self.phase(), "Session failed"),
                }
                other
            }
        }
    }

    async fn drive(&self, transport: &Arc<Transport>) -> Result<SessionEnd> {
        self.handshake(transport).await?;
        self.advance(Phase::Login)?;
        self.login(transport).await?;
        self.advance(Phase::Game)?;
        self.play(transport).await
    }

    fn advance(&self, to: Phase) -> Result<()> {
        let from = self.phase();
        let next = from.advance(to)?;
        self.phase.send_replace(next);
        info!(%from, to = %next, "Phase transition");
        Ok(())
    }

    #[instrument(skip_all, fields(host = %self.config.host, port = self.config.port))]
    async fn handshake(&self, transport: &Arc<Transport>) -> Result<()> {
        let channel = PacketChannel::new(Arc::clone(transport), Arc::new(PacketRegistry::handshake()));
        let intent = handshake::login_intent(
            self.config.protocol_version,
            &self.config.host,
            self.config.port,
        )?;
        channel.send(intent).await
    }

    #[instrument(skip_all, fields(username = %self.config.username))]
    async fn login(&self, transport: &Arc<Transport>) -> Result<()> {
        let channel = PacketChannel::new(Arc::clone(transport), Arc::new(PacketRegistry::login()))
            .with_read_timeout(self.config.read_timeout);

        channel
            .send(login::Serverbound::LoginStart {
                name: self.config.username.clone(),
            })
            .await?;

        loop {
            let packet = match channel.receive().await? {
                Packet::LoginClientbound(packet) => packet,
                other => {
                    return Err(ProtocolError::WrongPhase {
                        phase: Phase::Login,
                        name: other.name(),
                    })
                }
            };

            match packet {
                login::Clientbound::EncryptionRequest {
                    server_id,
                    public_key,
                    verify_token,
                } => {
                    let KeyExchange { response, secret } = security::respond_to_encryption_request(
                        &server_id,
                        &public_key,
                        &verify_token,
                    )?;
                    channel.send(response).await?;
                    channel.install_cipher(&secret).await?;
                    info!("Encryption enabled");
                }
                login::Clientbound::SetCompression { threshold } => {
                    match usize::try_from(threshold) {
                        Ok(threshold) => {
                            channel.install_compression(threshold).await?;
                            info!(threshold, "Compression enabled");
                        }
                        Err(_) => debug!(threshold, "Server disabled compression"),
                    }
                }
                login::Clientbound::LoginSuccess { uuid, username } => {
                    info!(%uuid, %username, "Login succeeded");
                    return Ok(());
                }
                login::Clientbound::Disconnect { reason } => {
                    warn!(%reason, "Login rejected");
                    return Err(ProtocolError::LoginRejected(reason));
                }
                other => debug!(packet = other.name(), "Ignoring login packet"),
            }
        }
    }

    #[instrument(skip_all)]
    async fn play(&self, transport: &Arc<Transport>) -> Result<SessionEnd> {
        let channel = PacketChannel::new(Arc::clone(transport), Arc::new(PacketRegistry::game()))
            .with_read_timeout(self.config.read_timeout);
        let mut outbound = self.outbound.lock().await;
        // Id of the last keep-alive the loop answered on its own.
        let mut answered: Option<i64> = None;

        loop {
            let step = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => Step::Cancelled,
                Some(packet) = outbound.recv() => Step::Outbound(packet),
                received = channel.receive() => Step::Inbound(received),
            };

            let packet = match step {
                Step::Cancelled => return Ok(SessionEnd::Cancelled),
                Step::Outbound(game::Serverbound::KeepAlive { id }) if answered == Some(id) => {
                    debug!(id, "Dropping duplicate keep-alive reply");
                    answered = None;
                    continue;
                }
                Step::Outbound(packet) => {
                    channel.send(packet).await?;
                    continue;
                }
                Step::Inbound(Ok(Packet::GameClientbound(packet))) => packet,
                Step::Inbound(Ok(other)) => {
                    return Err(ProtocolError::WrongPhase {
                        phase: Phase::Game,
                        name: other.name(),
                    })
                }
                Step::Inbound(Err(err @ ProtocolError::UnknownPacket { .. })) => {
                    match self.config.unknown_game_packets {
                        UnknownPacketPolicy::Skip => {
                            self.metrics.unknown_packet_skipped();
                            warn!(error = %err, "Skipping unknown packet");
                            continue;
                        }
                        UnknownPacketPolicy::Fail => return Err(err),
                    }
                }
                Step::Inbound(Err(err)) => return Err(err),
            };

            if let game::Clientbound::KeepAlive { id } = packet {
                if self.config.auto_keep_alive {
                    channel.send(game::Serverbound::KeepAlive { id }).await?;
                    self.metrics.keep_alive_answered();
                    answered = Some(id);
                }
            }

            self.sink.dispatch(&self.sender, &packet)?;

            if let game::Clientbound::Disconnect { reason } = packet {
                info!(%reason, "Disconnected by server");
                return Ok(SessionEnd::Kicked(reason));
            }
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("host", &self.config.host)
            .field("port", &self.config.port)
            .field("phase", &self.phase())
            .finish()
    }
}
