pub mod api;
pub mod control;
pub mod dispatch;
pub mod error;
pub mod hub;
pub mod monitor;
pub mod transport;

pub use api::{ApiClient, ChannelListing};
pub use control::{ControlChannel, ControlPeer, PairedChannel};
pub use dispatch::{CommandDispatcher, CommandFallback};
pub use error::GatewayError;
pub use hub::{EventHub, Subscription};
pub use monitor::MonitorPoller;
pub use transport::{PushTransport, SseTransport};
