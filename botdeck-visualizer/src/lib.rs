pub mod canvas;
pub mod graph;
pub mod pipeline;

pub use canvas::{centerline, trace_waveform, CanvasSpec, Polyline};
pub use graph::{AnalysisGraph, AudioDevice, RingTap, SignalTap, DEFAULT_WINDOW, SILENCE};
pub use pipeline::{FrameScheduler, FrameTicket, TicketClock, WaveformPipeline};
