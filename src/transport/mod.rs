//! # Byte Transport
//!
//! A bidirectional byte stream split into a framed read half and a framed
//! write half, each behind its own async mutex so one task can sit in a read
//! while another writes.
//!
//! The framing codecs carry the connection-level cipher and compression
//! switches; packet channels for different phases come and go on top of the
//! same transport and inherit whatever is installed.
//!
//! ## Teardown
//! Every suspending call races the transport's cancellation token. Closing
//! cancels the token and shuts the write half down exactly once; further
//! closes are no-ops.

use crate::core::cipher::SharedSecret;
use crate::core::codec::{FrameDecoder, FrameEncoder};
use crate::error::{constants, ProtocolError, Result};
use crate::utils::metrics::SessionMetrics;
use crate::utils::timeout::with_timeout_error;
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_util::codec::{FramedRead, FramedWrite};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

pub type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;
pub type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

pub struct Transport {
    reader: Mutex<FramedRead<BoxedReader, FrameDecoder>>,
    writer: Mutex<FramedWrite<BoxedWriter, FrameEncoder>>,
    cancel: CancellationToken,
    closed: AtomicBool,
    metrics: Arc<SessionMetrics>,
}

impl Transport {
    /// Wrap an already connected stream.
    pub fn new<S>(stream: S, cancel: CancellationToken) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (read_half, write_half) = tokio::io::split(stream);
        let reader: BoxedReader = Box::new(read_half);
        let writer: BoxedWriter = Box::new(write_half);
        Self {
            reader: Mutex::new(FramedRead::new(reader, FrameDecoder::new())),
            writer: Mutex::new(FramedWrite::new(writer, FrameEncoder::new())),
            cancel,
            closed: AtomicBool::new(false),
            metrics: Arc::new(SessionMetrics::new()),
        }
    }

    /// Open a TCP connection to `host:port`.
    ///
    /// # Errors
    /// `ConnectFailure` if the address does not resolve, refuses, or does
    /// not answer within `timeout`.
    #[instrument(skip(cancel))]
    pub async fn connect(
        host: &str,
        port: u16,
        timeout: Duration,
        cancel: CancellationToken,
    ) -> Result<Self> {
        let addr = format!("{host}:{port}");
        let connecting = async {
            TcpStream::connect((host, port))
                .await
                .map_err(ProtocolError::Io)
        };
        let stream = match with_timeout_error(connecting, timeout).await {
            Ok(stream) => stream,
            Err(ProtocolError::Io(source)) => {
                return Err(ProtocolError::ConnectFailure { addr, source })
            }
            Err(ProtocolError::Timeout) => {
                return Err(ProtocolError::ConnectFailure {
                    addr,
                    source: io::Error::new(io::ErrorKind::TimedOut, "connect timed out"),
                })
            }
            Err(other) => return Err(other),
        };
        stream.set_nodelay(true)?;
        debug!(%addr, "Connected");
        Ok(Self::new(stream, cancel))
    }

    /// Count traffic into `metrics` instead of a private set.
    pub fn with_metrics(mut self, metrics: Arc<SessionMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn metrics(&self) -> Arc<SessionMetrics> {
        Arc::clone(&self.metrics)
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Read the next frame body, suspending until it is complete.
    ///
    /// # Errors
    /// - `Cancelled` if the token fires first
    /// - `ConnectionClosed` on a clean end of stream
    /// - `MalformedFrame` / `Io` from the codec
    pub async fn read_frame(&self) -> Result<Bytes> {
        let mut reader = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(ProtocolError::Cancelled),
            guard = self.reader.lock() => guard,
        };

        let frame = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(ProtocolError::Cancelled),
            frame = reader.next() => frame,
        };

        match frame {
            Some(Ok(body)) => {
                self.metrics.frame_received(body.len());
                Ok(body)
            }
            Some(Err(e)) => Err(e),
            None => Err(ProtocolError::ConnectionClosed),
        }
    }

    /// Write one frame body and flush it.
    ///
    /// # Errors
    /// `Cancelled` once the transport is closed or its token fired.
    pub async fn write_frame(&self, body: Bytes) -> Result<()> {
        if self.is_closed() || self.cancel.is_cancelled() {
            return Err(ProtocolError::Cancelled);
        }
        let len = body.len();

        let mut writer = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(ProtocolError::Cancelled),
            guard = self.writer.lock() => guard,
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(ProtocolError::Cancelled),
            sent = writer.send(body) => sent?,
        }
        self.metrics.frame_sent(len);
        Ok(())
    }

    /// Switch both directions to AES-CFB8. Write-once.
    ///
    /// # Errors
    /// `AlreadyConfigured` if a cipher is already installed; neither
    /// direction is modified in that case.
    pub async fn install_cipher(&self, secret: &SharedSecret) -> Result<()> {
        let mut reader = self.reader.lock().await;
        let mut writer = self.writer.lock().await;
        if reader.decoder().is_encrypted() || writer.encoder().is_encrypted() {
            return Err(ProtocolError::AlreadyConfigured(constants::SLOT_CIPHER));
        }
        reader.decoder_mut().enable_encryption(secret)?;
        writer.encoder_mut().enable_encryption(secret)?;
        debug!("Cipher installed");
        Ok(())
    }

    /// Switch both directions to compressed framing. Write-once.
    ///
    /// # Errors
    /// `AlreadyConfigured` if compression is already installed.
    pub async fn install_compression(&self, threshold: usize) -> Result<()> {
        let mut reader = self.reader.lock().await;
        let mut writer = self.writer.lock().await;
        if reader.decoder().compression_threshold().is_some()
            || writer.encoder().compression_threshold().is_some()
        {
            return Err(ProtocolError::AlreadyConfigured(
                constants::SLOT_COMPRESSION,
            ));
        }
        reader.decoder_mut().enable_compression(threshold)?;
        writer.encoder_mut().enable_compression(threshold)?;
        debug!(threshold, "Compression installed");
        Ok(())
    }

    pub async fn is_encrypted(&self) -> bool {
        self.writer.lock().await.encoder().is_encrypted()
    }

    pub async fn compression_threshold(&self) -> Option<usize> {
        self.writer.lock().await.encoder().compression_threshold()
    }

    /// Release the transport. Returns `true` for the call that actually
    /// closed it; every later call is a no-op returning `false`.
    pub async fn close(&self) -> bool {
        self.cancel.cancel();
        if self.closed.swap(true, Ordering::AcqRel) {
            return false;
        }

        let mut writer = self.writer.lock().await;
        if let Err(e) = writer.get_mut().shutdown().await {
            debug!(error = %e, "Shutdown of write half failed");
        }
        debug!("Transport closed");
        true
    }
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport")
            .field("closed", &self.is_closed())
            .finish()
    }
}
