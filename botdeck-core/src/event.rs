//! Wire model for the push channel and the bidirectional control channel.
//!
//! The push channel delivers JSON envelopes `{type, payload}`. Decoding is
//! total: unknown types are skipped and malformed payloads are dropped
//! per-message, so a single bad frame never terminates the stream.

use chrono::Local;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

const LOG_TARGET: &str = "botdeck::event";

/// One exchange between a user and the bot, as served by the chat log API
/// and the `chat` push event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatLogEntry {
    pub id: i64,
    #[serde(default)]
    pub guild_id: Option<i64>,
    #[serde(default)]
    pub channel_id: Option<i64>,
    #[serde(default)]
    pub channel_name: Option<String>,
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub user_avatar: Option<String>,
    pub user_message: String,
    #[serde(default)]
    pub bot_response: Option<String>,
    #[serde(default)]
    pub tokens: f64,
    #[serde(default)]
    pub latency_ms: f64,
    /// Server-side creation timestamp, kept verbatim for display.
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Visibility of a managed channel. Anything the server doesn't tag as
/// `public` is treated as private, matching the service's grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    #[default]
    Public,
    Private,
}

impl<'de> Deserialize<'de> for ChannelKind {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(if raw == "public" {
            Self::Public
        } else {
            Self::Private
        })
    }
}

/// A channel registered with the bot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelRecord {
    pub id: i64,
    pub guild_id: i64,
    pub channel_id: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: ChannelKind,
    #[serde(default)]
    pub owner_id: Option<i64>,
    #[serde(default)]
    pub owner_name: Option<String>,
    #[serde(default)]
    pub owner_avatar: Option<String>,
}

/// Raw throughput reading carried by a `network` push event.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NetworkReading {
    /// Server timestamp, kept raw; an unparseable value degrades to being
    /// used as the label verbatim.
    pub timestamp: String,
    #[serde(default)]
    pub rx: f64,
    #[serde(default)]
    pub tx: f64,
}

/// One point of the throughput chart: the reading labeled with the local
/// time it was taken.
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkSample {
    pub label: String,
    pub rx: f64,
    pub tx: f64,
}

impl From<&NetworkReading> for NetworkSample {
    fn from(reading: &NetworkReading) -> Self {
        let label = crate::time::parse_server_timestamp(&reading.timestamp).map_or_else(
            || reading.timestamp.clone(),
            |ts| ts.with_timezone(&Local).format("%H:%M:%S").to_string(),
        );
        Self {
            label,
            rx: reading.rx,
            tx: reading.tx,
        }
    }
}

/// Resource usage summary from the monitor endpoint.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ResourceUsage {
    #[serde(default)]
    pub tokens_used: f64,
    #[serde(default)]
    pub quota: Option<f64>,
    /// Bytes of memory in use, when the server can measure it.
    #[serde(default)]
    pub memory: Option<u64>,
    #[serde(default)]
    pub uptime: Option<u64>,
}

/// A playable track reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub thumbnail: Option<String>,
    /// Track length in seconds, when known.
    #[serde(default)]
    pub duration: Option<f64>,
}

/// A `music:play` directive: the track to play and the authoritative moment
/// playback started, so every listener converges on the same position.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PlayDirective {
    #[serde(default)]
    pub guild_id: i64,
    #[serde(default)]
    pub track: Option<Track>,
    /// ISO-8601 start timestamp; parsed with
    /// [`parse_server_timestamp`](crate::time::parse_server_timestamp).
    #[serde(default)]
    pub started_at: Option<String>,
}

/// Action carried by a `music_control` directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlAction {
    Play,
    Pause,
    Skip,
    Stop,
}

/// Server-initiated playback directive.
#[derive(Debug, Clone, PartialEq)]
pub enum Directive {
    Play(PlayDirective),
    /// Authoritative queue snapshot; always replaces, never merges.
    QueueUpdate { guild_id: i64, queue: Vec<Track> },
    Control { action: ControlAction },
}

impl Directive {
    /// Decode a directive from its event name and payload. Unknown names
    /// and malformed payloads yield `None`.
    #[must_use]
    pub fn decode(name: &str, payload: Value) -> Option<Self> {
        let decoded = match name {
            "music:play" => serde_json::from_value(payload).map(Self::Play),
            "music:queue_update" => {
                serde_json::from_value::<QueueUpdatePayload>(payload).map(|p| Self::QueueUpdate {
                    guild_id: p.guild_id,
                    queue: p.queue,
                })
            }
            "music:control" | "music_control" => {
                serde_json::from_value::<ControlPayload>(payload)
                    .map(|p| Self::Control { action: p.action })
            }
            other => {
                debug!(target: LOG_TARGET, "ignoring directive {other}");
                return None;
            }
        };
        match decoded {
            Ok(directive) => Some(directive),
            Err(e) => {
                debug!(target: LOG_TARGET, "dropping malformed {name} payload: {e}");
                None
            }
        }
    }
}

#[derive(Deserialize)]
struct QueueUpdatePayload {
    #[serde(default)]
    guild_id: i64,
    #[serde(default)]
    queue: Vec<Track>,
}

#[derive(Deserialize)]
struct ControlPayload {
    action: ControlAction,
}

/// Outbound user command for the control channel, mirrored by the
/// request/response music endpoints.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MusicCommand {
    pub action: CommandAction,
    pub guild_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandAction {
    Play,
    Skip,
}

impl MusicCommand {
    /// Request playback of whatever the query resolves to.
    #[must_use]
    pub fn play(guild_id: i64, query: impl Into<String>) -> Self {
        Self {
            action: CommandAction::Play,
            guild_id,
            query: Some(query.into()),
        }
    }

    /// Skip the current track.
    #[must_use]
    pub const fn skip(guild_id: i64) -> Self {
        Self {
            action: CommandAction::Skip,
            guild_id,
            query: None,
        }
    }
}

/// One demultiplexed event off the push channel.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Chat(ChatLogEntry),
    ChannelCreated(ChannelRecord),
    ChannelDeleted { channel_id: i64 },
    Network(NetworkReading),
    /// Playback directives are also broadcast on the push channel so
    /// listeners without a control connection stay in sync.
    Music(Directive),
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    payload: Value,
}

#[derive(Deserialize)]
struct ChannelDeletedPayload {
    channel_id: i64,
}

impl StreamEvent {
    /// Decode one raw frame into a typed event.
    ///
    /// Returns `None` for unknown event types and for malformed envelopes
    /// or payloads; the caller keeps the stream open either way.
    #[must_use]
    pub fn decode(frame: &str) -> Option<Self> {
        let envelope: Envelope = match serde_json::from_str(frame) {
            Ok(envelope) => envelope,
            Err(e) => {
                debug!(target: LOG_TARGET, "dropping malformed envelope: {e}");
                return None;
            }
        };

        let decoded = match envelope.kind.as_str() {
            "chat" => serde_json::from_value(envelope.payload).map(Self::Chat),
            "channel:created" => {
                serde_json::from_value(envelope.payload).map(Self::ChannelCreated)
            }
            "channel:deleted" => serde_json::from_value::<ChannelDeletedPayload>(envelope.payload)
                .map(|p| Self::ChannelDeleted {
                    channel_id: p.channel_id,
                }),
            "network" => serde_json::from_value(envelope.payload).map(Self::Network),
            name @ ("music:play" | "music:queue_update" | "music:control" | "music_control") => {
                return Directive::decode(name, envelope.payload).map(Self::Music);
            }
            other => {
                debug!(target: LOG_TARGET, "ignoring event type {other}");
                return None;
            }
        };

        match decoded {
            Ok(event) => Some(event),
            Err(e) => {
                debug!(
                    target: LOG_TARGET,
                    "dropping malformed {} payload: {e}", envelope.kind
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_chat_event() {
        let frame = r#"{"type":"chat","payload":{"id":1,"channel_id":7,"user_message":"hi","tokens":12.0,"latency_ms":120.0}}"#;
        let Some(StreamEvent::Chat(entry)) = StreamEvent::decode(frame) else {
            panic!("expected chat event");
        };
        assert_eq!(entry.id, 1);
        assert_eq!(entry.channel_id, Some(7));
        assert_eq!(entry.user_message, "hi");
    }

    #[test]
    fn test_decode_channel_created() {
        let frame = r#"{"type":"channel:created","payload":{"id":3,"guild_id":10,"channel_id":42,"name":"general","type":"public"}}"#;
        let Some(StreamEvent::ChannelCreated(record)) = StreamEvent::decode(frame) else {
            panic!("expected channel:created event");
        };
        assert_eq!(record.channel_id, 42);
        assert_eq!(record.kind, ChannelKind::Public);
    }

    #[test]
    fn test_decode_channel_deleted() {
        let frame = r#"{"type":"channel:deleted","payload":{"channel_id":42}}"#;
        assert_eq!(
            StreamEvent::decode(frame),
            Some(StreamEvent::ChannelDeleted { channel_id: 42 })
        );
    }

    #[test]
    fn test_decode_network_event() {
        let frame = r#"{"type":"network","payload":{"timestamp":"2026-08-06T12:00:00Z","rx":10.5,"tx":3.25}}"#;
        let Some(StreamEvent::Network(reading)) = StreamEvent::decode(frame) else {
            panic!("expected network event");
        };
        assert!((reading.rx - 10.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_decode_play_directive() {
        let frame = r#"{"type":"music:play","payload":{"guild_id":1,"track":{"id":5,"title":"song"},"started_at":"2026-08-06T12:00:00"}}"#;
        let Some(StreamEvent::Music(Directive::Play(play))) = StreamEvent::decode(frame) else {
            panic!("expected play directive");
        };
        assert_eq!(play.track.as_ref().map(|t| t.id), Some(5));
    }

    #[test]
    fn test_decode_stop_control() {
        let frame = r#"{"type":"music_control","payload":{"action":"stop","guild_id":1}}"#;
        assert_eq!(
            StreamEvent::decode(frame),
            Some(StreamEvent::Music(Directive::Control {
                action: ControlAction::Stop
            }))
        );
    }

    #[test]
    fn test_unknown_type_is_ignored() {
        let frame = r#"{"type":"telemetry:gc","payload":{"pause_ms":3}}"#;
        assert_eq!(StreamEvent::decode(frame), None);
    }

    #[test]
    fn test_malformed_envelope_is_dropped() {
        assert_eq!(StreamEvent::decode("{not json"), None);
        assert_eq!(StreamEvent::decode(r#"{"payload":{}}"#), None);
    }

    #[test]
    fn test_malformed_payload_is_dropped() {
        // chat payload missing required fields
        let frame = r#"{"type":"chat","payload":{"tokens":"not a number"}}"#;
        assert_eq!(StreamEvent::decode(frame), None);
    }

    #[test]
    fn test_unrecognized_channel_kind_is_private() {
        let frame = r#"{"type":"channel:created","payload":{"id":3,"guild_id":10,"channel_id":42,"type":"personal"}}"#;
        let Some(StreamEvent::ChannelCreated(record)) = StreamEvent::decode(frame) else {
            panic!("expected channel:created event");
        };
        assert_eq!(record.kind, ChannelKind::Private);
    }

    #[test]
    fn test_queue_update_replaces_queue() {
        let frame = r#"{"type":"music:queue_update","payload":{"guild_id":1,"queue":[{"id":1,"title":"a"},{"id":2,"title":"b"}]}}"#;
        let Some(StreamEvent::Music(Directive::QueueUpdate { queue, .. })) =
            StreamEvent::decode(frame)
        else {
            panic!("expected queue update");
        };
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_music_command_wire_shape() {
        let play = MusicCommand::play(9, "lofi beats");
        let value = serde_json::to_value(&play).unwrap();
        assert_eq!(value["action"], "play");
        assert_eq!(value["guild_id"], 9);
        assert_eq!(value["query"], "lofi beats");

        let skip = serde_json::to_value(MusicCommand::skip(9)).unwrap();
        assert_eq!(skip["action"], "skip");
        assert!(skip.get("query").is_none());
    }

    #[test]
    fn test_network_sample_label_from_reading() {
        let reading = NetworkReading {
            timestamp: "2026-08-06T12:00:00Z".to_owned(),
            rx: 1.0,
            tx: 2.0,
        };
        let sample = NetworkSample::from(&reading);
        assert_eq!(sample.label.len(), 8); // HH:MM:SS
        assert!((sample.tx - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_network_sample_keeps_unparseable_timestamp() {
        let reading = NetworkReading {
            timestamp: "t+40".to_owned(),
            rx: 0.0,
            tx: 0.0,
        };
        assert_eq!(NetworkSample::from(&reading).label, "t+40");
    }
}
