//! Push-channel transports.
//!
//! A transport is a black box producing ordered raw frames; the hub decodes
//! them. The production transport reads the platform's server-sent event
//! stream, but anything that yields frames in order works.

use crate::error::{GatewayError, Result};
use async_trait::async_trait;
use futures::stream::{Stream, StreamExt};
use reqwest_middleware::ClientWithMiddleware;
use std::pin::Pin;
use tracing::{debug, warn};

const LOG_TARGET: &str = "botdeck::gateway::transport";

/// An ordered source of raw push frames.
#[async_trait]
pub trait PushTransport: Send {
    /// Next frame in arrival order; `None` once the stream has ended.
    async fn next_frame(&mut self) -> Option<String>;

    /// Close the underlying connection. Idempotent.
    async fn close(&mut self);
}

type ByteStream = Pin<Box<dyn Stream<Item = reqwest::Result<Vec<u8>>> + Send>>;

/// Server-sent-events transport over the `/api/stream` endpoint.
///
/// Frames are the `data:` lines of the SSE protocol; everything else
/// (comments, event names, blank keep-alives) is skipped. There is no
/// automatic reconnection: when the connection drops the stream ends.
pub struct SseTransport {
    stream: ByteStream,
    buffer: String,
    closed: bool,
}

impl SseTransport {
    /// Open the push stream.
    ///
    /// # Errors
    ///
    /// Returns an error when the connection cannot be established or the
    /// server refuses the stream.
    pub async fn connect(client: &ClientWithMiddleware, base_url: &str) -> Result<Self> {
        let url = format!("{base_url}/api/stream");
        let response = client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(GatewayError::Status {
                endpoint: url,
                status: response.status(),
            });
        }
        debug!(target: LOG_TARGET, "push stream connected");
        let stream = response.bytes_stream().map(|chunk| chunk.map(|b| b.to_vec()));
        Ok(Self {
            stream: Box::pin(stream),
            buffer: String::new(),
            closed: false,
        })
    }

    fn take_line(&mut self) -> Option<String> {
        let newline = self.buffer.find('\n')?;
        let line: String = self.buffer.drain(..=newline).collect();
        Some(line.trim_end_matches(['\n', '\r']).to_owned())
    }
}

#[async_trait]
impl PushTransport for SseTransport {
    async fn next_frame(&mut self) -> Option<String> {
        loop {
            if let Some(line) = self.take_line() {
                if let Some(data) = line.strip_prefix("data:") {
                    return Some(data.trim_start().to_owned());
                }
                continue;
            }

            if self.closed {
                return None;
            }

            match self.stream.next().await {
                Some(Ok(chunk)) => {
                    self.buffer.push_str(&String::from_utf8_lossy(&chunk));
                }
                Some(Err(e)) => {
                    warn!(target: LOG_TARGET, "push stream error: {e}");
                    self.closed = true;
                    return None;
                }
                None => {
                    debug!(target: LOG_TARGET, "push stream ended");
                    self.closed = true;
                    return None;
                }
            }
        }
    }

    async fn close(&mut self) {
        self.closed = true;
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::PushTransport;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    /// Transport yielding a fixed sequence of frames, then ending.
    pub struct ScriptedTransport {
        frames: std::vec::IntoIter<String>,
        closed: Arc<AtomicBool>,
    }

    impl ScriptedTransport {
        pub fn new(frames: Vec<&str>) -> (Self, Arc<AtomicBool>) {
            let closed = Arc::new(AtomicBool::new(false));
            (
                Self {
                    frames: frames
                        .into_iter()
                        .map(str::to_owned)
                        .collect::<Vec<_>>()
                        .into_iter(),
                    closed: closed.clone(),
                },
                closed,
            )
        }
    }

    #[async_trait]
    impl PushTransport for ScriptedTransport {
        async fn next_frame(&mut self) -> Option<String> {
            if self.closed.load(Ordering::SeqCst) {
                return None;
            }
            self.frames.next()
        }

        async fn close(&mut self) {
            self.closed.store(true, Ordering::SeqCst);
        }
    }
}
