//! Bidirectional control channel.
//!
//! The transport behind the channel is a black box; this module fixes the
//! contract: typed directives in, typed commands out, and a first-class
//! disconnected state instead of a nullable handle.

use crate::error::{GatewayError, Result};
use async_trait::async_trait;
use botdeck_core::{Directive, MusicCommand};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tracing::debug;

const LOG_TARGET: &str = "botdeck::gateway::control";

const DIRECTIVE_BUFFER: usize = 64;

/// Client side of the control channel.
#[async_trait]
pub trait ControlChannel: Send + Sync {
    /// Send a command to the server.
    ///
    /// # Errors
    ///
    /// Fails with [`GatewayError::Disconnected`] when the channel is down;
    /// callers fall back to the request/response API, which carries the
    /// same intent.
    async fn send(&self, command: &MusicCommand) -> Result<()>;

    /// Server-initiated directives, in arrival order.
    fn directives(&self) -> broadcast::Receiver<Directive>;

    fn is_connected(&self) -> bool;

    /// Close both directions. Idempotent; never panics.
    fn close(&self);
}

/// In-process control channel: the client half used by the dashboard and a
/// peer half standing in for the socket endpoint.
pub struct PairedChannel {
    directive_tx: broadcast::Sender<Directive>,
    command_tx: mpsc::UnboundedSender<MusicCommand>,
    connected: Arc<AtomicBool>,
}

impl PairedChannel {
    /// Create a connected channel/peer pair.
    #[must_use]
    pub fn new() -> (Arc<Self>, ControlPeer) {
        let (directive_tx, _) = broadcast::channel(DIRECTIVE_BUFFER);
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let connected = Arc::new(AtomicBool::new(true));

        let channel = Arc::new(Self {
            directive_tx: directive_tx.clone(),
            command_tx,
            connected: connected.clone(),
        });
        let peer = ControlPeer {
            directive_tx,
            command_rx,
            connected,
        };
        (channel, peer)
    }
}

#[async_trait]
impl ControlChannel for PairedChannel {
    async fn send(&self, command: &MusicCommand) -> Result<()> {
        if !self.is_connected() {
            return Err(GatewayError::Disconnected);
        }
        self.command_tx
            .send(command.clone())
            .map_err(|_| GatewayError::Disconnected)
    }

    fn directives(&self) -> broadcast::Receiver<Directive> {
        self.directive_tx.subscribe()
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn close(&self) {
        if self.connected.swap(false, Ordering::SeqCst) {
            debug!(target: LOG_TARGET, "control channel closed");
        }
    }
}

/// Server half of a [`PairedChannel`].
pub struct ControlPeer {
    directive_tx: broadcast::Sender<Directive>,
    command_rx: mpsc::UnboundedReceiver<MusicCommand>,
    connected: Arc<AtomicBool>,
}

impl ControlPeer {
    /// Inject a server-initiated directive toward the client.
    pub fn deliver(&self, directive: Directive) {
        let _ = self.directive_tx.send(directive);
    }

    /// Next command issued by the client.
    pub async fn next_command(&mut self) -> Option<MusicCommand> {
        self.command_rx.recv().await
    }

    /// Drop the connection from the server side.
    pub fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }
}

impl Drop for ControlPeer {
    fn drop(&mut self) {
        self.connected.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use botdeck_core::{ControlAction, Directive};

    #[tokio::test]
    async fn test_commands_reach_the_peer() {
        let (channel, mut peer) = PairedChannel::new();
        channel.send(&MusicCommand::skip(3)).await.unwrap();

        let command = peer.next_command().await.unwrap();
        assert_eq!(command, MusicCommand::skip(3));
    }

    #[tokio::test]
    async fn test_directives_reach_the_client() {
        let (channel, peer) = PairedChannel::new();
        let mut rx = channel.directives();
        peer.deliver(Directive::Control {
            action: ControlAction::Stop,
        });

        let directive = rx.recv().await.unwrap();
        assert_eq!(
            directive,
            Directive::Control {
                action: ControlAction::Stop
            }
        );
    }

    #[tokio::test]
    async fn test_send_after_close_is_disconnected() {
        let (channel, _peer) = PairedChannel::new();
        channel.close();
        // close twice: must stay a no-op
        channel.close();

        let err = channel.send(&MusicCommand::skip(1)).await.unwrap_err();
        assert!(matches!(err, GatewayError::Disconnected));
        assert!(!channel.is_connected());
    }

    #[tokio::test]
    async fn test_peer_drop_disconnects() {
        let (channel, peer) = PairedChannel::new();
        drop(peer);
        assert!(!channel.is_connected());
    }
}
