pub mod activity;
pub mod chat;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod event;
pub mod network;
pub mod player;
pub mod registry;
pub mod time;

pub use activity::{ActivityScore, ChannelActivity, ACTIVITY_CAPACITY};
pub use chat::{ChatLog, CHAT_LOG_CAPACITY};
pub use config::{
    DeckConfig, GatewayConfig, LoggingConfig, MonitorConfig, VisualizerConfig, CONFIG_TEMPLATE,
};
pub use dashboard::{DashboardEngine, DashboardEvent};
pub use error::CoreError;
pub use event::{
    ChannelKind, ChannelRecord, ChatLogEntry, CommandAction, ControlAction, Directive,
    MusicCommand, NetworkReading, NetworkSample, PlayDirective, ResourceUsage, StreamEvent, Track,
};
pub use network::{NetworkHistory, NETWORK_WINDOW};
pub use player::{AudioTransport, PlayerEngine, PlayerPhase, PlayerState};
pub use registry::ChannelRegistry;
pub use time::{parse_server_timestamp, start_offset, DurationExt};
