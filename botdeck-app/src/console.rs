//! Interactive console commands.
//!
//! The same intents a dashboard UI would issue: play-by-query and skip go
//! through the command dispatcher (control channel with HTTP fallback),
//! archiving asks for explicit confirmation before the DELETE is sent.

use crate::bridge::SharedPlayer;
use botdeck_core::DashboardEngine;
use botdeck_gateway::{ApiClient, CommandDispatcher};
use botdeck_visualizer::{Polyline, WaveformPipeline};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::warn;

const LOG_TARGET: &str = "botdeck::console";

const HELP: &str = "commands:
  play <query>          queue and play whatever the query resolves to
  skip                  skip the current track
  toggle                pause/resume local playback
  status                print a dashboard summary
  archive <id>          archive a channel (asks for confirmation)
  archive <id> confirm  archive without asking again
  quit                  shut down";

pub struct Console {
    pub engine: Arc<DashboardEngine>,
    pub player: SharedPlayer,
    pub dispatcher: CommandDispatcher<ApiClient>,
    pub api: Arc<ApiClient>,
    pub pipeline: Arc<Mutex<WaveformPipeline>>,
    pub guild_id: i64,
}

impl Console {
    /// Read commands from stdin until cancelled or EOF.
    pub async fn run(self, cancel_token: CancellationToken) {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        println!("{HELP}");

        loop {
            tokio::select! {
                () = cancel_token.cancelled() => break,
                line = lines.next_line() => {
                    match line {
                        Ok(Some(line)) => {
                            if !self.handle(line.trim()).await {
                                cancel_token.cancel();
                                break;
                            }
                        }
                        Ok(None) => break,
                        Err(e) => {
                            warn!(target: LOG_TARGET, "stdin error: {e}");
                            break;
                        }
                    }
                }
            }
        }
    }

    /// Handle one command line; returns `false` on quit.
    async fn handle(&self, line: &str) -> bool {
        let mut parts = line.splitn(2, ' ');
        let command = parts.next().unwrap_or_default();
        let rest = parts.next().unwrap_or_default().trim();

        match command {
            "" => {}
            "help" => println!("{HELP}"),
            "play" => {
                if rest.is_empty() {
                    println!("usage: play <query>");
                } else if let Err(e) = self.dispatcher.play(self.guild_id, rest).await {
                    println!("play failed: {e}");
                }
            }
            "skip" => {
                if let Err(e) = self.dispatcher.skip(self.guild_id).await {
                    println!("skip failed: {e}");
                }
            }
            "toggle" => self.player.lock().await.toggle(),
            "status" => self.print_status().await,
            "archive" => self.archive(rest).await,
            "quit" | "exit" => return false,
            other => println!("unknown command: {other} (try 'help')"),
        }
        true
    }

    async fn archive(&self, rest: &str) {
        let mut parts = rest.split_whitespace();
        let Some(Ok(channel_id)) = parts.next().map(str::parse::<i64>) else {
            println!("usage: archive <channel_id> [confirm]");
            return;
        };

        // Destructive: require explicit confirmation before the request.
        if parts.next() != Some("confirm") {
            println!("archiving removes channel {channel_id}; run 'archive {channel_id} confirm'");
            return;
        }

        match self.api.archive_channel(channel_id).await {
            Ok(()) => {
                // Remove locally only after the server accepted the archive.
                self.engine.remove_channel(channel_id).await;
                println!("archived channel {channel_id}");
            }
            Err(e) => println!("archive failed, channel kept: {e}"),
        }
    }

    async fn print_status(&self) {
        let (public, private) = self.engine.channels().await;
        let usage = self.engine.usage().await;
        let chat = self.engine.chat_log().await;
        let player = self.player.lock().await;
        let state = player.state();

        println!(
            "channels: {} public, {} private | chat entries: {} | tokens used: {}",
            public.len(),
            private.len(),
            chat.len(),
            usage.tokens_used
        );
        match &state.current {
            Some(track) => println!(
                "player: {:?} '{}' at {:.1}s | queue: {} tracks",
                state.phase,
                track.title,
                player.position().as_secs_f64(),
                state.queue.len()
            ),
            None => println!("player: nothing current | queue: {} tracks", state.queue.len()),
        }
        for activity in self.engine.activity().await.iter().take(5) {
            println!("  activity {}: {:.0}", activity.name, activity.score);
        }

        let mut pipeline = self.pipeline.lock().await;
        let height = pipeline.canvas().height();
        if let Some(line) = pipeline.frame() {
            println!("  waveform: {}", sparkline(&line, height));
        }
    }
}

/// Render a traced polyline as a one-line unicode sparkline, downsampled to
/// a terminal-friendly width.
fn sparkline(line: &Polyline, height: f32) -> String {
    const LEVELS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];
    const COLUMNS: usize = 48;
    if height <= 0.0 || line.is_empty() {
        return String::new();
    }
    let stride = (line.len() / COLUMNS).max(1);
    line.points
        .iter()
        .step_by(stride)
        .map(|&(_, y)| {
            let normalized = (y / height).clamp(0.0, 1.0);
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let level = ((normalized * 7.0).round() as usize).min(7);
            LEVELS[level]
        })
        .collect()
}
