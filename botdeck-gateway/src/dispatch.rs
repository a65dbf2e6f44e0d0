//! Command dispatch: control channel first, request/response fallback.

use crate::control::ControlChannel;
use crate::error::{GatewayError, Result};
use async_trait::async_trait;
use botdeck_core::MusicCommand;
use std::sync::Arc;
use tracing::debug;

const LOG_TARGET: &str = "botdeck::gateway::dispatch";

/// The request/response path for a command when the control channel is
/// unavailable. Both paths carry identical intent.
#[async_trait]
pub trait CommandFallback: Send + Sync {
    /// Deliver the command over HTTP.
    ///
    /// # Errors
    ///
    /// Fails on transport errors or a non-success status.
    async fn send_command(&self, command: &MusicCommand) -> Result<()>;
}

/// Routes user commands over the control channel when connected, otherwise
/// over the equivalent HTTP endpoint.
pub struct CommandDispatcher<F: CommandFallback> {
    channel: Arc<dyn ControlChannel>,
    fallback: Arc<F>,
}

impl<F: CommandFallback> CommandDispatcher<F> {
    pub fn new(channel: Arc<dyn ControlChannel>, fallback: Arc<F>) -> Self {
        Self { channel, fallback }
    }

    /// Ask the server to play whatever `query` resolves to.
    ///
    /// # Errors
    ///
    /// Fails when both the channel and the fallback path fail.
    pub async fn play(&self, guild_id: i64, query: impl Into<String> + Send) -> Result<()> {
        self.dispatch(MusicCommand::play(guild_id, query)).await
    }

    /// Ask the server to skip the current track.
    ///
    /// # Errors
    ///
    /// Fails when both the channel and the fallback path fail.
    pub async fn skip(&self, guild_id: i64) -> Result<()> {
        self.dispatch(MusicCommand::skip(guild_id)).await
    }

    async fn dispatch(&self, command: MusicCommand) -> Result<()> {
        if self.channel.is_connected() {
            match self.channel.send(&command).await {
                Ok(()) => return Ok(()),
                // The channel dropped between the check and the send; the
                // HTTP path carries the same intent.
                Err(GatewayError::Disconnected) => {
                    debug!(target: LOG_TARGET, "channel dropped mid-send, using fallback");
                }
                Err(e) => return Err(e),
            }
        } else {
            debug!(target: LOG_TARGET, "channel disconnected, using fallback");
        }
        self.fallback.send_command(&command).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::PairedChannel;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingFallback {
        sent: Mutex<Vec<MusicCommand>>,
    }

    #[async_trait]
    impl CommandFallback for RecordingFallback {
        async fn send_command(&self, command: &MusicCommand) -> Result<()> {
            self.sent.lock().unwrap().push(command.clone());
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_connected_channel_is_preferred() {
        let (channel, mut peer) = PairedChannel::new();
        let fallback = Arc::new(RecordingFallback::default());
        let dispatcher = CommandDispatcher::new(channel, fallback.clone());

        dispatcher.play(1, "some song").await.unwrap();

        assert_eq!(
            peer.next_command().await,
            Some(MusicCommand::play(1, "some song"))
        );
        assert!(fallback.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_disconnected_channel_falls_back() {
        let (channel, _peer) = PairedChannel::new();
        channel.close();
        let fallback = Arc::new(RecordingFallback::default());
        let dispatcher = CommandDispatcher::new(channel, fallback.clone());

        dispatcher.skip(2).await.unwrap();

        let sent = fallback.sent.lock().unwrap();
        assert_eq!(sent.as_slice(), &[MusicCommand::skip(2)]);
    }
}
