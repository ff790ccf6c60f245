use crate::error::{ProtocolError, Result};
use crate::protocol::game;
use crate::service::client::PacketSender;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

type HandlerFn = dyn Fn(&PacketSender, &game::Clientbound) + Send + Sync + 'static;

const ERR_WRITE_LOCK: &str = "Failed to acquire write lock on event sink";
const ERR_READ_LOCK: &str = "Failed to acquire read lock on event sink";

/// Handle returned by [`EventSink::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Observer list for game-phase packets.
///
/// Owned by the session and handed to it at construction. Subscribers run
/// synchronously on the receive loop, in subscription order, once per packet.
/// They get a [`PacketSender`] so they can answer immediately; the list is
/// snapshotted before each dispatch, so a handler may also (un)subscribe.
///
/// Keep-alives are delivered here after the session has echoed them (unless
/// `auto_keep_alive` is off); handlers need not answer them.
pub struct EventSink {
    handlers: RwLock<Vec<(SubscriptionId, Arc<HandlerFn>)>>,
    next_id: AtomicU64,
}

impl Default for EventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink {
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(0),
        }
    }

    pub fn subscribe<F>(&self, handler: F) -> Result<SubscriptionId>
    where
        F: Fn(&PacketSender, &game::Clientbound) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut handlers = self
            .handlers
            .write()
            .map_err(|_| ProtocolError::Custom(ERR_WRITE_LOCK.to_string()))?;
        handlers.push((id, Arc::new(handler)));
        Ok(id)
    }

    /// Returns false if `id` was not subscribed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> Result<bool> {
        let mut handlers = self
            .handlers
            .write()
            .map_err(|_| ProtocolError::Custom(ERR_WRITE_LOCK.to_string()))?;
        let before = handlers.len();
        handlers.retain(|(sub, _)| *sub != id);
        Ok(handlers.len() != before)
    }

    pub fn len(&self) -> usize {
        self.handlers.read().map(|h| h.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Hand `packet` to every subscriber. Returns how many were invoked.
    pub fn dispatch(&self, sender: &PacketSender, packet: &game::Clientbound) -> Result<usize> {
        let snapshot: Vec<Arc<HandlerFn>> = {
            let handlers = self
                .handlers
                .read()
                .map_err(|_| ProtocolError::Custom(ERR_READ_LOCK.to_string()))?;
            handlers.iter().map(|(_, h)| Arc::clone(h)).collect()
        };

        for handler in &snapshot {
            handler(sender, packet);
        }
        Ok(snapshot.len())
    }
}

impl std::fmt::Debug for EventSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventSink")
            .field("subscribers", &self.len())
            .finish()
    }
}
