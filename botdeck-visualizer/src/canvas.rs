//! Canvas geometry and waveform tracing.

use crate::graph::SILENCE;

/// Backing-store geometry for the waveform canvas.
///
/// The backing resolution tracks the CSS size times the device pixel ratio
/// so the polyline stays crisp on high-density displays; `resize` is
/// idempotent and safe to call on every viewport event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanvasSpec {
    css_width: f32,
    css_height: f32,
    device_pixel_ratio: f32,
    width: f32,
    height: f32,
}

impl CanvasSpec {
    #[must_use]
    pub fn new(css_width: f32, css_height: f32, device_pixel_ratio: f32) -> Self {
        let mut spec = Self {
            css_width: 0.0,
            css_height: 0.0,
            device_pixel_ratio: 0.0,
            width: 0.0,
            height: 0.0,
        };
        spec.resize(css_width, css_height, device_pixel_ratio);
        spec
    }

    /// Recompute the backing resolution for a new viewport.
    pub fn resize(&mut self, css_width: f32, css_height: f32, device_pixel_ratio: f32) {
        self.css_width = css_width.max(0.0);
        self.css_height = css_height.max(0.0);
        self.device_pixel_ratio = device_pixel_ratio.max(0.0);
        self.width = self.css_width * self.device_pixel_ratio;
        self.height = self.css_height * self.device_pixel_ratio;
    }

    /// Backing width in device pixels.
    #[must_use]
    pub fn width(&self) -> f32 {
        self.width
    }

    /// Backing height in device pixels.
    #[must_use]
    pub fn height(&self) -> f32 {
        self.height
    }
}

/// A connected line in backing-store coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct Polyline {
    pub points: Vec<(f32, f32)>,
}

impl Polyline {
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Map one time-domain window across the canvas width.
///
/// Amplitude `v` in `[0, 2)` lands at `y = v * height / 2`, so silence
/// (1.0) traces the vertical center; the line always closes at the
/// horizontal midline on the right edge.
#[must_use]
pub fn trace_waveform(spec: &CanvasSpec, samples: &[f32]) -> Polyline {
    let width = spec.width();
    let half_height = spec.height() / 2.0;

    if samples.is_empty() {
        return Polyline {
            points: vec![(0.0, half_height), (width, half_height)],
        };
    }

    #[allow(clippy::cast_precision_loss)]
    let slice_width = width / samples.len() as f32;

    let mut points = Vec::with_capacity(samples.len() + 1);
    let mut x = 0.0;
    for &v in samples {
        points.push((x, v * half_height));
        x += slice_width;
    }
    points.push((width, half_height));

    Polyline { points }
}

/// A flat line across the center: what the canvas shows when no signal is
/// attached.
#[must_use]
pub fn centerline(spec: &CanvasSpec, samples: usize) -> Polyline {
    trace_waveform(spec, &vec![SILENCE; samples])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backing_resolution_tracks_pixel_ratio() {
        let spec = CanvasSpec::new(300.0, 100.0, 2.0);
        assert!((spec.width() - 600.0).abs() < f32::EPSILON);
        assert!((spec.height() - 200.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_resize_is_idempotent() {
        let mut spec = CanvasSpec::new(300.0, 100.0, 2.0);
        let before = spec;
        spec.resize(300.0, 100.0, 2.0);
        spec.resize(300.0, 100.0, 2.0);
        assert_eq!(spec, before);
    }

    #[test]
    fn test_silence_traces_the_centerline() {
        let spec = CanvasSpec::new(100.0, 50.0, 1.0);
        let line = trace_waveform(&spec, &[SILENCE; 10]);
        assert!(line.points.iter().all(|&(_, y)| (y - 25.0).abs() < 1e-4));
    }

    #[test]
    fn test_line_spans_the_canvas_and_closes_at_center() {
        let spec = CanvasSpec::new(100.0, 50.0, 1.0);
        let line = trace_waveform(&spec, &[0.0, 2.0, 1.0, 0.5]);
        assert_eq!(line.len(), 5);
        assert_eq!(line.points[0].0, 0.0);
        assert_eq!(line.points[4], (100.0, 25.0));
    }

    #[test]
    fn test_amplitude_maps_around_the_center() {
        let spec = CanvasSpec::new(100.0, 50.0, 1.0);
        let line = trace_waveform(&spec, &[0.0, 2.0]);
        assert!((line.points[0].1 - 0.0).abs() < 1e-4);
        assert!((line.points[1].1 - 50.0).abs() < 1e-4);
    }

    #[test]
    fn test_empty_window_degrades_to_centerline() {
        let spec = CanvasSpec::new(100.0, 50.0, 1.0);
        let line = trace_waveform(&spec, &[]);
        assert_eq!(line.points, vec![(0.0, 25.0), (100.0, 25.0)]);
    }

    #[test]
    fn test_centerline_is_flat() {
        let spec = CanvasSpec::new(100.0, 50.0, 1.0);
        let line = centerline(&spec, 4);
        assert_eq!(line.len(), 5);
        assert!(line.points.iter().all(|&(_, y)| (y - 25.0).abs() < 1e-4));
    }
}
