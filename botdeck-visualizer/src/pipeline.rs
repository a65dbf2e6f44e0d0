//! The waveform pipeline: graph lifecycle plus the self-rescheduling frame
//! loop.
//!
//! Each frame books its own successor before drawing, and detaching cancels
//! the pending callback so nothing fires afterwards. Teardown releases the
//! graph and the device exactly once, in any order relative to frame
//! callbacks.

use crate::canvas::{trace_waveform, CanvasSpec, Polyline};
use crate::graph::{AnalysisGraph, AudioDevice, SignalTap};
use tracing::debug;

const LOG_TARGET: &str = "botdeck::visualizer::pipeline";

/// Handle to one booked display-frame callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameTicket(pub u64);

/// Source of display-frame callbacks.
///
/// Hosts with a real display link implement this against their vsync
/// callback; timer-driven hosts and tests use [`TicketClock`].
pub trait FrameScheduler: Send {
    /// Book the next frame callback.
    fn schedule(&mut self) -> FrameTicket;

    /// Cancel a pending ticket. Idempotent; cancelling a ticket that
    /// already fired (or was never booked) is a no-op and must not panic.
    fn cancel(&mut self, ticket: FrameTicket);
}

/// Ticket allocator for hosts that poll [`WaveformPipeline::frame`] on
/// their own cadence. Tracks the single outstanding ticket so cancellation
/// on detach is observable.
#[derive(Debug, Default)]
pub struct TicketClock {
    next: u64,
    booked: Option<u64>,
}

impl TicketClock {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a frame callback is currently booked.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.booked.is_some()
    }
}

impl FrameScheduler for TicketClock {
    fn schedule(&mut self) -> FrameTicket {
        self.next += 1;
        self.booked = Some(self.next);
        FrameTicket(self.next)
    }

    fn cancel(&mut self, ticket: FrameTicket) {
        if self.booked == Some(ticket.0) {
            self.booked = None;
        }
    }
}

/// Continuously updating waveform of a playable element's live signal.
pub struct WaveformPipeline {
    scheduler: Box<dyn FrameScheduler>,
    canvas: CanvasSpec,
    graph: Option<AnalysisGraph>,
    pending: Option<FrameTicket>,
}

impl WaveformPipeline {
    #[must_use]
    pub fn new(scheduler: Box<dyn FrameScheduler>, canvas: CanvasSpec) -> Self {
        Self {
            scheduler,
            canvas,
            graph: None,
            pending: None,
        }
    }

    /// Attach to an element's signal: build the analysis graph and book the
    /// first frame. An existing attachment is torn down first, so
    /// re-attaching never leaks a graph or a pending callback.
    pub fn attach(&mut self, tap: Box<dyn SignalTap>, device: Box<dyn AudioDevice>, window: usize) {
        self.detach();
        debug!(target: LOG_TARGET, "attaching analysis graph (window {window})");
        self.graph = Some(AnalysisGraph::new(tap, device, window));
        self.pending = Some(self.scheduler.schedule());
    }

    /// One display frame: book the successor, sample the window, and trace
    /// the polyline. Returns `None` when detached (and books nothing).
    pub fn frame(&mut self) -> Option<Polyline> {
        self.graph.as_ref()?;
        // the loop is self-rescheduling: the successor is booked before
        // drawing so a detach mid-frame can still cancel it
        self.pending = Some(self.scheduler.schedule());
        let graph = self.graph.as_mut()?;
        let samples = graph.sample();
        Some(trace_waveform(&self.canvas, samples))
    }

    /// Track a viewport change. Idempotent.
    pub fn resize(&mut self, css_width: f32, css_height: f32, device_pixel_ratio: f32) {
        self.canvas.resize(css_width, css_height, device_pixel_ratio);
    }

    /// Cancel the pending frame, tear the graph down, and release the
    /// device. Idempotent; a failure releasing one resource never blocks
    /// the others.
    pub fn detach(&mut self) {
        if let Some(ticket) = self.pending.take() {
            self.scheduler.cancel(ticket);
        }
        if let Some(mut graph) = self.graph.take() {
            debug!(target: LOG_TARGET, "detaching analysis graph");
            graph.teardown();
        }
    }

    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.graph.is_some()
    }

    #[must_use]
    pub fn canvas(&self) -> &CanvasSpec {
        &self.canvas
    }
}

impl Drop for WaveformPipeline {
    fn drop(&mut self) {
        self.detach();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{RingTap, SILENCE};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    struct CountingDevice {
        releases: Arc<AtomicUsize>,
    }

    impl AudioDevice for CountingDevice {
        fn release(&mut self) {
            self.releases.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Scheduler recording every schedule/cancel call.
    #[derive(Clone, Default)]
    struct RecordingScheduler {
        next: Arc<AtomicUsize>,
        cancelled: Arc<Mutex<Vec<u64>>>,
    }

    impl FrameScheduler for RecordingScheduler {
        fn schedule(&mut self) -> FrameTicket {
            let id = self.next.fetch_add(1, Ordering::SeqCst) + 1;
            FrameTicket(id as u64)
        }
        fn cancel(&mut self, ticket: FrameTicket) {
            self.cancelled.lock().unwrap().push(ticket.0);
        }
    }

    fn tap(window: usize) -> (rtrb::Producer<f32>, Box<RingTap>) {
        let (producer, consumer) = rtrb::RingBuffer::new(window * 4);
        (producer, Box::new(RingTap::new(consumer, window)))
    }

    fn pipeline_with(
        scheduler: RecordingScheduler,
    ) -> (WaveformPipeline, rtrb::Producer<f32>, Arc<AtomicUsize>) {
        let mut pipeline = WaveformPipeline::new(
            Box::new(scheduler),
            CanvasSpec::new(100.0, 50.0, 1.0),
        );
        let releases = Arc::new(AtomicUsize::new(0));
        let (producer, ring) = tap(8);
        pipeline.attach(
            ring,
            Box::new(CountingDevice {
                releases: releases.clone(),
            }),
            8,
        );
        (pipeline, producer, releases)
    }

    #[test]
    fn test_frame_books_successor_and_traces() {
        let scheduler = RecordingScheduler::default();
        let (mut pipeline, mut producer, _releases) = pipeline_with(scheduler.clone());

        producer.push(0.5).unwrap();
        let line = pipeline.frame().unwrap();
        assert_eq!(line.len(), 9); // window + closing point

        // attach booked one frame, frame() booked its successor
        assert_eq!(scheduler.next.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_frame_when_detached_returns_none() {
        let scheduler = RecordingScheduler::default();
        let (mut pipeline, _producer, _releases) = pipeline_with(scheduler.clone());
        pipeline.detach();

        assert!(pipeline.frame().is_none());
        // no successor was booked after detach
        assert_eq!(scheduler.next.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_detach_cancels_pending_frame() {
        let scheduler = RecordingScheduler::default();
        let (mut pipeline, _producer, _releases) = pipeline_with(scheduler.clone());
        pipeline.detach();

        assert_eq!(scheduler.cancelled.lock().unwrap().as_slice(), &[1]);
        assert!(!pipeline.is_attached());
    }

    #[test]
    fn test_detach_then_reattach_releases_each_device_once() {
        let scheduler = RecordingScheduler::default();
        let (mut pipeline, _producer, first_releases) = pipeline_with(scheduler);

        pipeline.detach();
        pipeline.detach(); // idempotent

        let second_releases = Arc::new(AtomicUsize::new(0));
        let (_producer2, ring) = tap(8);
        pipeline.attach(
            ring,
            Box::new(CountingDevice {
                releases: second_releases.clone(),
            }),
            8,
        );
        drop(pipeline);

        assert_eq!(first_releases.load(Ordering::SeqCst), 1);
        assert_eq!(second_releases.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_reattach_without_detach_tears_down_previous_graph() {
        let scheduler = RecordingScheduler::default();
        let (mut pipeline, _producer, first_releases) = pipeline_with(scheduler);

        let second_releases = Arc::new(AtomicUsize::new(0));
        let (_producer2, ring) = tap(8);
        pipeline.attach(
            ring,
            Box::new(CountingDevice {
                releases: second_releases.clone(),
            }),
            8,
        );

        assert_eq!(first_releases.load(Ordering::SeqCst), 1);
        assert_eq!(second_releases.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_ticket_clock_tracks_pending() {
        let mut clock = TicketClock::new();
        let first = clock.schedule();
        assert!(clock.has_pending());

        // cancelling a stale ticket is a no-op
        let second = clock.schedule();
        clock.cancel(first);
        assert!(clock.has_pending());

        clock.cancel(second);
        assert!(!clock.has_pending());
        // double-cancel is safe
        clock.cancel(second);
        assert!(!clock.has_pending());
    }

    #[test]
    fn test_silent_pipeline_traces_centerline() {
        let mut pipeline = WaveformPipeline::new(
            Box::new(TicketClock::new()),
            CanvasSpec::new(100.0, 50.0, 1.0),
        );
        let (_producer, ring) = tap(4);
        let releases = Arc::new(AtomicUsize::new(0));
        pipeline.attach(ring, Box::new(CountingDevice { releases }), 4);

        let line = pipeline.frame().unwrap();
        let silence_y = SILENCE * 25.0;
        assert!(line
            .points
            .iter()
            .all(|&(_, y)| (y - silence_y).abs() < 1e-4));
    }

    #[test]
    fn test_resize_updates_trace_geometry() {
        let scheduler = RecordingScheduler::default();
        let (mut pipeline, _producer, _releases) = pipeline_with(scheduler);
        pipeline.resize(200.0, 100.0, 2.0);

        let line = pipeline.frame().unwrap();
        let (last_x, last_y) = *line.points.last().unwrap();
        assert!((last_x - 400.0).abs() < 1e-4);
        assert!((last_y - 100.0).abs() < 1e-4);
    }
}
