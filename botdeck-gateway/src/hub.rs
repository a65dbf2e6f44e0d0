//! Shared push-channel hub.
//!
//! One process-wide connection serves every widget: subscriptions share the
//! decode pump, and the underlying transport is closed only when the last
//! subscriber detaches. Frames that fail to decode are dropped per-message;
//! the pump keeps running.

use crate::transport::PushTransport;
use botdeck_core::StreamEvent;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const LOG_TARGET: &str = "botdeck::gateway::hub";

/// Broadcast depth for decoded events. Slow subscribers lag (and are told
/// so) instead of blocking the pump.
const EVENT_BUFFER: usize = 256;

struct HubShared {
    event_tx: broadcast::Sender<StreamEvent>,
    subscribers: AtomicUsize,
    cancel: CancellationToken,
}

/// Reference-counted owner of the single push connection.
pub struct EventHub {
    shared: Arc<HubShared>,
    transport: Mutex<Option<Box<dyn PushTransport>>>,
}

impl EventHub {
    /// Wrap a transport. The connection is not pumped until the first
    /// subscriber arrives.
    #[must_use]
    pub fn new(transport: Box<dyn PushTransport>) -> Arc<Self> {
        let (event_tx, _) = broadcast::channel(EVENT_BUFFER);
        Arc::new(Self {
            shared: Arc::new(HubShared {
                event_tx,
                subscribers: AtomicUsize::new(0),
                cancel: CancellationToken::new(),
            }),
            transport: Mutex::new(Some(transport)),
        })
    }

    /// Subscribe to the decoded event stream, starting the shared pump on
    /// first use. A subscription created after the hub has shut down yields
    /// no events.
    pub async fn subscribe(&self) -> Subscription {
        let events = self.shared.event_tx.subscribe();
        let previous = self.shared.subscribers.fetch_add(1, Ordering::SeqCst);

        if previous == 0 {
            if let Some(transport) = self.transport.lock().await.take() {
                let shared = self.shared.clone();
                tokio::spawn(pump(transport, shared));
            }
        }

        Subscription {
            events,
            guard: SubscriptionGuard {
                shared: self.shared.clone(),
                released: false,
            },
        }
    }

    /// Whether the pump has shut down (stream ended or every subscriber
    /// left).
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.shared.cancel.is_cancelled()
    }
}

async fn pump(mut transport: Box<dyn PushTransport>, shared: Arc<HubShared>) {
    info!(target: LOG_TARGET, "push pump started");
    loop {
        tokio::select! {
            () = shared.cancel.cancelled() => {
                debug!(target: LOG_TARGET, "last subscriber detached");
                break;
            }
            frame = transport.next_frame() => {
                let Some(frame) = frame else {
                    info!(target: LOG_TARGET, "push stream ended");
                    break;
                };
                // Decode failures drop the frame; the stream stays open.
                if let Some(event) = StreamEvent::decode(&frame) {
                    let _ = shared.event_tx.send(event);
                }
            }
        }
    }
    transport.close().await;
    // Wake any subscriber still waiting so it can observe the shutdown.
    shared.cancel.cancel();
}

/// One live subscription against the shared hub.
pub struct Subscription {
    events: broadcast::Receiver<StreamEvent>,
    guard: SubscriptionGuard,
}

impl Subscription {
    /// Next decoded event in arrival order; `None` once the hub shuts down
    /// or the subscription was revoked. Buffered events are drained before
    /// a shutdown is reported.
    pub async fn recv(&mut self) -> Option<StreamEvent> {
        loop {
            if self.guard.released {
                return None;
            }
            match self.events.try_recv() {
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Empty) => {}
                Err(broadcast::error::TryRecvError::Closed) => return None,
                Err(broadcast::error::TryRecvError::Lagged(missed)) => {
                    warn!(target: LOG_TARGET, "subscriber lagged, missed {missed} events");
                    continue;
                }
            }
            if self.guard.shared.cancel.is_cancelled() {
                return None;
            }
            tokio::select! {
                () = self.guard.shared.cancel.cancelled() => {
                    // Loop once more to drain anything already buffered.
                }
                result = self.events.recv() => match result {
                    Ok(event) => return Some(event),
                    Err(broadcast::error::RecvError::Closed) => return None,
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        warn!(target: LOG_TARGET, "subscriber lagged, missed {missed} events");
                    }
                },
            }
        }
    }

    /// Revoke the subscription. Idempotent; also performed on drop.
    pub fn unsubscribe(&mut self) {
        self.guard.release();
    }
}

struct SubscriptionGuard {
    shared: Arc<HubShared>,
    released: bool,
}

impl SubscriptionGuard {
    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        if self.shared.subscribers.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.shared.cancel.cancel();
        }
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        self.release();
    }
}
