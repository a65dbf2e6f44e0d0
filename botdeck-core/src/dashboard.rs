//! Dashboard state engine.
//!
//! Folds demultiplexed push events through the bounded reducers and fans
//! change notifications out to widgets over a broadcast channel. All
//! mutation of dashboard state goes through this engine, so interleavings
//! across sources (push events, polls, user actions) stay coherent.

use crate::activity::{ActivityScore, ChannelActivity};
use crate::chat::ChatLog;
use crate::event::{ChatLogEntry, ChannelRecord, NetworkSample, ResourceUsage, StreamEvent};
use crate::network::NetworkHistory;
use crate::registry::ChannelRegistry;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

/// Events emitted after a state transition.
#[derive(Debug, Clone)]
pub enum DashboardEvent {
    /// A chat exchange was appended (activity scores moved with it).
    ChatAppended { entry: ChatLogEntry },
    /// A throughput sample was appended.
    NetworkAppended { sample: NetworkSample },
    /// The channel listing changed (create, delete, archive, or reload).
    ChannelsChanged,
    /// A fresh resource usage reading arrived.
    UsageUpdated { usage: ResourceUsage },
}

struct Inner {
    chat: ChatLog,
    activity: ChannelActivity,
    network: NetworkHistory,
    channels: ChannelRegistry,
    usage: ResourceUsage,
}

/// Engine holding all bounded dashboard state.
pub struct DashboardEngine {
    inner: RwLock<Inner>,
    event_tx: broadcast::Sender<DashboardEvent>,
}

impl DashboardEngine {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Subscribe to state-change notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<DashboardEvent> {
        self.event_tx.subscribe()
    }

    /// Fold one push event into the dashboard state.
    ///
    /// Playback directives are not dashboard state; they belong to the
    /// player and are ignored here.
    pub async fn apply(&self, event: StreamEvent) {
        match event {
            StreamEvent::Chat(entry) => {
                let mut inner = self.inner.write().await;
                if let Some(channel_id) = entry.channel_id {
                    inner
                        .activity
                        .observe(channel_id, entry.channel_name.as_deref());
                }
                inner.chat.record(entry.clone());
                drop(inner);
                let _ = self.event_tx.send(DashboardEvent::ChatAppended { entry });
            }
            StreamEvent::ChannelCreated(record) => {
                self.inner.write().await.channels.insert(record);
                let _ = self.event_tx.send(DashboardEvent::ChannelsChanged);
            }
            StreamEvent::ChannelDeleted { channel_id } => {
                let removed = self.inner.write().await.channels.remove(channel_id);
                if removed {
                    let _ = self.event_tx.send(DashboardEvent::ChannelsChanged);
                }
            }
            StreamEvent::Network(reading) => {
                let sample = NetworkSample::from(&reading);
                self.inner.write().await.network.record(sample.clone());
                let _ = self.event_tx.send(DashboardEvent::NetworkAppended { sample });
            }
            StreamEvent::Music(_) => {}
        }
    }

    /// Seed the chat log from the bulk fetch.
    pub async fn load_chat(&self, items: Vec<ChatLogEntry>) {
        self.inner.write().await.chat.load(items);
    }

    /// Seed the channel listing from the listing endpoint.
    pub async fn load_channels(&self, public: Vec<ChannelRecord>, private: Vec<ChannelRecord>) {
        self.inner.write().await.channels.load(public, private);
        let _ = self.event_tx.send(DashboardEvent::ChannelsChanged);
    }

    /// Drop a channel locally after a confirmed archive.
    pub async fn remove_channel(&self, channel_id: i64) {
        let removed = self.inner.write().await.channels.remove(channel_id);
        if removed {
            let _ = self.event_tx.send(DashboardEvent::ChannelsChanged);
        }
    }

    /// Record the latest resource usage reading.
    pub async fn set_usage(&self, usage: ResourceUsage) {
        self.inner.write().await.usage = usage.clone();
        let _ = self.event_tx.send(DashboardEvent::UsageUpdated { usage });
    }

    /// Chat entries, newest first.
    pub async fn chat_log(&self) -> Vec<ChatLogEntry> {
        self.inner.read().await.chat.iter().cloned().collect()
    }

    /// Activity scores, newest insert first.
    pub async fn activity(&self) -> Vec<ActivityScore> {
        self.inner.read().await.activity.scores().to_vec()
    }

    /// Throughput samples in arrival order.
    pub async fn network(&self) -> Vec<NetworkSample> {
        self.inner.read().await.network.iter().cloned().collect()
    }

    /// Current channel listing as `(public, private)`.
    pub async fn channels(&self) -> (Vec<ChannelRecord>, Vec<ChannelRecord>) {
        let inner = self.inner.read().await;
        (
            inner.channels.public().to_vec(),
            inner.channels.private().to_vec(),
        )
    }

    /// Latest resource usage reading.
    pub async fn usage(&self) -> ResourceUsage {
        self.inner.read().await.usage.clone()
    }
}

impl Default for DashboardEngine {
    fn default() -> Self {
        let (event_tx, _) = broadcast::channel(64);
        Self {
            inner: RwLock::new(Inner {
                chat: ChatLog::new(),
                activity: ChannelActivity::new(),
                network: NetworkHistory::new(),
                channels: ChannelRegistry::new(),
                usage: ResourceUsage::default(),
            }),
            event_tx,
        }
    }
}
