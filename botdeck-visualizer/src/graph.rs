//! Audio analysis graph.
//!
//! The graph taps a playable element's live signal without touching its
//! transport: the element's output is teed into a lock-free ring buffer by
//! the audio thread and read back here one display frame at a time. The
//! graph owns the device handle it was given and releases it exactly once
//! on teardown.

use tracing::debug;

const LOG_TARGET: &str = "botdeck::visualizer::graph";

/// Default time-domain transform window, in samples.
pub const DEFAULT_WINDOW: usize = 2048;

/// Normalized amplitude representing silence; samples live in `[0, 2)`.
pub const SILENCE: f32 = 1.0;

/// Source of time-domain samples from the live signal.
///
/// Implementations only read the signal; they never drive the transport.
pub trait SignalTap: Send {
    /// Copy the most recent window into `out`, oldest sample first,
    /// normalized so that [`SILENCE`] is a flat line. Fills with silence
    /// while no signal is flowing.
    fn fill_time_domain(&mut self, out: &mut [f32]);
}

/// Handle to the device audio context backing the graph.
pub trait AudioDevice: Send {
    /// Release the context. Called at most once per graph; implementations
    /// tolerate release after a partial failure and must not panic.
    fn release(&mut self);
}

/// A tap fed by an `rtrb` producer on the audio thread.
///
/// The consumer side keeps a rolling window of the newest samples; raw PCM
/// in `[-1, 1]` is shifted into the `[0, 2)` display range on read.
pub struct RingTap {
    consumer: rtrb::Consumer<f32>,
    window: Vec<f32>,
    cursor: usize,
}

impl RingTap {
    #[must_use]
    pub fn new(consumer: rtrb::Consumer<f32>, window: usize) -> Self {
        Self {
            consumer,
            window: vec![0.0; window.max(1)],
            cursor: 0,
        }
    }

    /// Pull everything the producer has written, keeping only the newest
    /// window.
    fn drain(&mut self) {
        while let Ok(sample) = self.consumer.pop() {
            self.window[self.cursor] = sample;
            self.cursor = (self.cursor + 1) % self.window.len();
        }
    }
}

impl SignalTap for RingTap {
    fn fill_time_domain(&mut self, out: &mut [f32]) {
        self.drain();
        let len = self.window.len();
        for (i, slot) in out.iter_mut().enumerate() {
            let raw = if i < len {
                self.window[(self.cursor + i) % len]
            } else {
                0.0
            };
            *slot = (SILENCE + raw).clamp(0.0, 2.0);
        }
    }
}

/// The assembled analysis graph: tap, fixed window buffer, and the device
/// handle it must release.
pub struct AnalysisGraph {
    tap: Box<dyn SignalTap>,
    device: Option<Box<dyn AudioDevice>>,
    buffer: Vec<f32>,
}

impl AnalysisGraph {
    /// Wire a tap and device into a graph with the given transform window.
    #[must_use]
    pub fn new(tap: Box<dyn SignalTap>, device: Box<dyn AudioDevice>, window: usize) -> Self {
        Self {
            tap,
            device: Some(device),
            buffer: vec![SILENCE; window.max(1)],
        }
    }

    /// Number of samples per analysis window.
    #[must_use]
    pub fn window(&self) -> usize {
        self.buffer.len()
    }

    /// Read the current time-domain window.
    pub fn sample(&mut self) -> &[f32] {
        self.tap.fill_time_domain(&mut self.buffer);
        &self.buffer
    }

    /// Disconnect the graph and release the device context.
    ///
    /// Safe to call more than once: the device is taken out of the graph on
    /// the first call, so a second teardown (or teardown after a partial
    /// failure) has nothing left to release.
    pub fn teardown(&mut self) {
        if let Some(mut device) = self.device.take() {
            debug!(target: LOG_TARGET, "releasing audio device context");
            device.release();
        }
    }
}

impl Drop for AnalysisGraph {
    fn drop(&mut self) {
        self.teardown();
    }
}
