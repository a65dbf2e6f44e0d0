//! Playback synchronizer.
//!
//! Applies server directives to a local audio transport so that every
//! listener converges on the same position in the track: a `music:play`
//! directive carries the authoritative start time, and the local offset is
//! the wall time elapsed since then.

use crate::event::{ControlAction, Directive, PlayDirective, Track};
use crate::time::{parse_server_timestamp, start_offset};
use chrono::Utc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

const LOG_TARGET: &str = "botdeck::player";

/// Transport surface of the audio element.
///
/// Only the synchronizer drives the transport; the visualization pipeline
/// reads the signal and never touches it. Implementations swallow their own
/// failures (a refused `play()` degrades to staying paused).
pub trait AudioTransport: Send {
    /// Point the element at a new stream source.
    fn bind_source(&mut self, url: &str);
    /// Seek to an absolute position in the current source.
    fn seek(&mut self, position: Duration);
    fn play(&mut self);
    fn pause(&mut self);
}

/// Transport state machine of the synchronizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerPhase {
    Stopped,
    Loading,
    Playing,
    Paused,
}

/// Snapshot of the player's authoritative state.
#[derive(Debug, Clone)]
pub struct PlayerState {
    pub current: Option<Track>,
    pub queue: Vec<Track>,
    pub phase: PlayerPhase,
    /// Offset into the track at the last transport action; never negative.
    pub offset: Duration,
}

impl Default for PlayerState {
    fn default() -> Self {
        Self {
            current: None,
            queue: Vec::new(),
            phase: PlayerPhase::Stopped,
            offset: Duration::ZERO,
        }
    }
}

/// Drives an [`AudioTransport`] from playback directives.
pub struct PlayerEngine<T: AudioTransport> {
    transport: T,
    stream_endpoint: String,
    state: PlayerState,
    /// Set while `Playing`; anchors [`position`](Self::position).
    resumed_at: Option<Instant>,
}

impl<T: AudioTransport> PlayerEngine<T> {
    /// Create an engine binding tracks against `stream_endpoint`
    /// (e.g. `http://host/api/music/stream`).
    pub fn new(transport: T, stream_endpoint: impl Into<String>) -> Self {
        Self {
            transport,
            stream_endpoint: stream_endpoint.into(),
            state: PlayerState::default(),
            resumed_at: None,
        }
    }

    /// Apply one server directive.
    pub fn apply(&mut self, directive: Directive) {
        match directive {
            Directive::Play(play) => self.handle_play(play),
            Directive::QueueUpdate { queue, .. } => {
                debug!(target: LOG_TARGET, "queue replaced ({} tracks)", queue.len());
                self.state.queue = queue;
            }
            Directive::Control {
                action: ControlAction::Stop,
            } => self.stop(),
            Directive::Control { action } => {
                debug!(target: LOG_TARGET, "ignoring control action {action:?}");
            }
        }
    }

    fn handle_play(&mut self, play: PlayDirective) {
        // A missing or zero track id must never bind a stream source.
        let Some(track) = play.track.filter(|t| t.id != 0) else {
            debug!(target: LOG_TARGET, "play directive without a usable track");
            self.state.current = None;
            self.state.phase = PlayerPhase::Stopped;
            self.resumed_at = None;
            return;
        };

        self.state.phase = PlayerPhase::Loading;
        let url = format!("{}?track_id={}", self.stream_endpoint, track.id);
        self.transport.bind_source(&url);

        let offset = play
            .started_at
            .as_deref()
            .and_then(parse_server_timestamp)
            .map_or(Duration::ZERO, |started| start_offset(started, Utc::now()));

        info!(
            target: LOG_TARGET,
            "playing {} at offset {:.1}s",
            track.title,
            offset.as_secs_f64()
        );
        self.transport.seek(offset);
        self.transport.play();

        self.state.current = Some(track);
        self.state.offset = offset;
        self.state.phase = PlayerPhase::Playing;
        self.resumed_at = Some(Instant::now());
    }

    /// Stop playback. The source stays bound until the next play directive.
    fn stop(&mut self) {
        info!(target: LOG_TARGET, "playback stopped");
        self.transport.pause();
        self.freeze_offset();
        self.state.phase = PlayerPhase::Stopped;
    }

    /// Local play/pause toggle; only meaningful while a track is current.
    pub fn toggle(&mut self) {
        match self.state.phase {
            PlayerPhase::Playing => {
                self.transport.pause();
                self.freeze_offset();
                self.state.phase = PlayerPhase::Paused;
            }
            PlayerPhase::Paused => {
                self.transport.play();
                self.resumed_at = Some(Instant::now());
                self.state.phase = PlayerPhase::Playing;
            }
            PlayerPhase::Stopped | PlayerPhase::Loading => {}
        }
    }

    fn freeze_offset(&mut self) {
        if let Some(resumed_at) = self.resumed_at.take() {
            self.state.offset += resumed_at.elapsed();
        }
    }

    /// Current position in the track, interpolated while playing.
    #[must_use]
    pub fn position(&self) -> Duration {
        match self.resumed_at {
            Some(resumed_at) if self.state.phase == PlayerPhase::Playing => {
                self.state.offset + resumed_at.elapsed()
            }
            _ => self.state.offset,
        }
    }

    #[must_use]
    pub fn state(&self) -> &PlayerState {
        &self.state
    }
}
