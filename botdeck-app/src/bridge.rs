//! Tasks bridging the gateway to the core engines.

use botdeck_core::{
    AudioTransport, DashboardEngine, DashboardEvent, PlayerEngine, StreamEvent,
};
use botdeck_gateway::{ControlChannel, Subscription};
use botdeck_visualizer::AudioDevice;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

const LOG_TARGET: &str = "botdeck::bridge";

/// Stand-in audio element for headless runs: the transport surface logs
/// what a playing element would do, and the element's output side owns the
/// signal ring the visualizer taps (silent without a real device).
pub struct LoggingTransport {
    _output: rtrb::Producer<f32>,
}

impl LoggingTransport {
    /// Create the transport and the consumer half of its signal tee.
    #[must_use]
    pub fn new(signal_capacity: usize) -> (Self, rtrb::Consumer<f32>) {
        let (producer, consumer) = rtrb::RingBuffer::new(signal_capacity.max(1));
        (Self { _output: producer }, consumer)
    }
}

impl AudioTransport for LoggingTransport {
    fn bind_source(&mut self, url: &str) {
        info!(target: LOG_TARGET, "audio source bound to {url}");
    }

    fn seek(&mut self, position: Duration) {
        info!(target: LOG_TARGET, "audio seek to {:.1}s", position.as_secs_f64());
    }

    fn play(&mut self) {
        info!(target: LOG_TARGET, "audio playing");
    }

    fn pause(&mut self) {
        info!(target: LOG_TARGET, "audio paused");
    }
}

pub type SharedPlayer = Arc<Mutex<PlayerEngine<LoggingTransport>>>;

/// Device handle for the headless audio context.
pub struct HeadlessDevice;

impl AudioDevice for HeadlessDevice {
    fn release(&mut self) {
        info!(target: LOG_TARGET, "audio context released");
    }
}

/// Fold push events into the dashboard engine; playback directives carried
/// on the push stream are routed to the player instead.
pub async fn fold_events(
    mut subscription: Subscription,
    engine: Arc<DashboardEngine>,
    player: SharedPlayer,
    cancel_token: CancellationToken,
) {
    loop {
        tokio::select! {
            () = cancel_token.cancelled() => break,
            event = subscription.recv() => {
                let Some(event) = event else {
                    warn!(target: LOG_TARGET, "push stream shut down; widgets keep their last state");
                    break;
                };
                match event {
                    StreamEvent::Music(directive) => player.lock().await.apply(directive),
                    other => engine.apply(other).await,
                }
            }
        }
    }
    subscription.unsubscribe();
}

/// Apply control-channel directives to the player.
pub async fn run_player(
    channel: Arc<dyn ControlChannel>,
    player: SharedPlayer,
    cancel_token: CancellationToken,
) {
    let mut directives = channel.directives();
    loop {
        tokio::select! {
            () = cancel_token.cancelled() => break,
            result = directives.recv() => match result {
                Ok(directive) => player.lock().await.apply(directive),
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                Err(tokio::sync::broadcast::error::RecvError::Lagged(missed)) => {
                    warn!(target: LOG_TARGET, "missed {missed} control directives");
                }
            },
        }
    }
}

/// Log dashboard state changes to the console.
pub async fn log_dashboard_events(engine: Arc<DashboardEngine>, cancel_token: CancellationToken) {
    let mut rx = engine.subscribe();
    loop {
        tokio::select! {
            () = cancel_token.cancelled() => break,
            result = rx.recv() => match result {
                Ok(event) => log_event(&event),
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                Err(tokio::sync::broadcast::error::RecvError::Lagged(missed)) => {
                    info!(target: LOG_TARGET, "missed {missed} dashboard events");
                }
            },
        }
    }
}

fn log_event(event: &DashboardEvent) {
    match event {
        DashboardEvent::ChatAppended { entry } => {
            info!(
                target: LOG_TARGET,
                "chat #{}: {} ({} tokens, {}ms)",
                entry.channel_id.unwrap_or_default(),
                entry.user_name.as_deref().unwrap_or("unknown"),
                entry.tokens,
                entry.latency_ms
            );
        }
        DashboardEvent::NetworkAppended { sample } => {
            info!(
                target: LOG_TARGET,
                "network {}: rx={} tx={}", sample.label, sample.rx, sample.tx
            );
        }
        DashboardEvent::ChannelsChanged => {
            info!(target: LOG_TARGET, "channel listing changed");
        }
        DashboardEvent::UsageUpdated { usage } => {
            info!(
                target: LOG_TARGET,
                "usage: tokens={} quota={:?} uptime={:?}s",
                usage.tokens_used,
                usage.quota,
                usage.uptime
            );
        }
    }
}
