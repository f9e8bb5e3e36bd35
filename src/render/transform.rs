//! Buffer snapshot → plottable frame.
//!
//! `render_frame` is pure: the same snapshot and parameters always produce
//! the same frame. It windows the newest `C / zoom` samples, applies gain,
//! and when banding is on splits out warning and critical series whose
//! non-qualifying positions are gaps.

use super::params::ViewParameters;

/// One plottable series. Index `i` is the x coordinate; `None` is a gap.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Series {
    values: Vec<Option<f32>>,
}

impl Series {
    fn solid(values: &[f32]) -> Self {
        Self {
            values: values.iter().copied().map(Some).collect(),
        }
    }

    pub fn values(&self) -> &[Option<f32>] {
        &self.values
    }

    /// Non-gap `(index, value)` pairs in order.
    pub fn points(&self) -> impl Iterator<Item = (usize, f32)> + '_ {
        self.values
            .iter()
            .enumerate()
            .filter_map(|(i, v)| v.map(|v| (i, v)))
    }
}

/// Everything the display needs for one tick.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderFrame {
    /// Samples shown, which is also the x-axis extent.
    pub visible_samples: usize,
    pub base: Series,
    /// Empty when banding is disabled.
    pub warning: Series,
    /// Empty when banding is disabled.
    pub critical: Series,
    pub cursor: Option<usize>,
    /// Fixed vertical range, `[-1 - padding, 1 + padding]`.
    pub y_range: (f32, f32),
}

impl RenderFrame {
    pub fn x_range(&self) -> (f64, f64) {
        (0.0, self.visible_samples as f64)
    }
}

/// Number of trailing samples visible at `zoom` for a buffer of `capacity`.
pub fn visible_samples(capacity: usize, zoom: f32) -> usize {
    let zoom = if zoom.is_finite() { zoom.max(1.0) } else { 1.0 };
    let visible = (capacity as f64 / zoom as f64).floor() as usize;
    visible.clamp(1, capacity.max(1))
}

/// Builds the frame for one tick.
pub fn render_frame(snapshot: &[f32], params: &ViewParameters) -> RenderFrame {
    let padding = params.vertical_padding_factor();
    let y_range = (-1.0 - padding, 1.0 + padding);

    if snapshot.is_empty() {
        return RenderFrame {
            visible_samples: 0,
            base: Series::default(),
            warning: Series::default(),
            critical: Series::default(),
            cursor: None,
            y_range,
        };
    }

    let capacity = snapshot.len();
    let visible = visible_samples(capacity, params.time_zoom_factor());
    let start = capacity - visible;

    let gain = params.amplitude_factor();
    let scaled: Vec<f32> = snapshot[start..start + visible]
        .iter()
        .map(|&s| s * gain)
        .collect();

    let (warning, critical) = if params.banding_enabled {
        band_series(
            &scaled,
            params.threshold_warning(),
            params.threshold_critical(),
        )
    } else {
        (Series::default(), Series::default())
    };

    let cursor = params
        .cursor_enabled
        .then(|| visible.saturating_sub(params.cursor_gap()).min(visible - 1));

    RenderFrame {
        visible_samples: visible,
        base: Series::solid(&scaled),
        warning,
        critical,
        cursor,
        y_range,
    }
}

/// Splits scaled samples into warning (`warning <= |v| < critical`) and
/// critical (`|v| >= critical`) series.
fn band_series(scaled: &[f32], warning: f32, critical: f32) -> (Series, Series) {
    let mut warn = Vec::with_capacity(scaled.len());
    let mut crit = Vec::with_capacity(scaled.len());
    for &v in scaled {
        let level = v.abs();
        warn.push((level >= warning && level < critical).then_some(v));
        crit.push((level >= critical).then_some(v));
    }
    (Series { values: warn }, Series { values: crit })
}

#[cfg(test)]
impl Series {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value at `index`, or `None` for a gap or an out-of-range index.
    pub fn get(&self, index: usize) -> Option<f32> {
        self.values.get(index).copied().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> ViewParameters {
        ViewParameters::default()
    }

    #[test]
    fn zoom_one_shows_whole_buffer() {
        let snapshot: Vec<f32> = (0..100).map(|i| i as f32 / 100.0).collect();
        let frame = render_frame(&snapshot, &params());
        assert_eq!(frame.visible_samples, 100);
        assert_eq!(frame.base.get(0), Some(0.0));
        assert_eq!(frame.x_range(), (0.0, 100.0));
    }

    #[test]
    fn zoom_two_shows_newest_half() {
        let snapshot: Vec<f32> = (0..100).map(|i| i as f32).collect();
        let mut p = params();
        p.set_time_zoom_factor(2.0).unwrap();
        p.banding_enabled = false;
        let frame = render_frame(&snapshot, &p);
        assert_eq!(frame.visible_samples, 50);
        assert_eq!(frame.base.len(), 50);
        // first visible sample is snapshot[50]
        assert_eq!(frame.base.get(0), Some(50.0));
        assert_eq!(frame.base.get(49), Some(99.0));
    }

    #[test]
    fn visible_samples_is_clamped() {
        assert_eq!(visible_samples(100, 0.5), 100);
        assert_eq!(visible_samples(100, 1000.0), 1);
        assert_eq!(visible_samples(220_500, 3.0), 73_500);
        assert_eq!(visible_samples(100, f32::NAN), 100);
    }

    #[test]
    fn gain_is_not_clamped() {
        let mut p = params();
        p.set_amplitude_factor(4.0).unwrap();
        p.banding_enabled = false;
        let frame = render_frame(&[0.5, -0.5], &p);
        assert_eq!(frame.base.values(), &[Some(2.0), Some(-2.0)]);
        assert_eq!(frame.y_range, (-1.0, 1.0));
    }

    #[test]
    fn banding_disabled_emits_only_base() {
        let mut p = params();
        p.banding_enabled = false;
        let frame = render_frame(&[0.95, 0.1, -0.8], &p);
        assert_eq!(frame.base.len(), 3);
        assert!(frame.warning.is_empty());
        assert!(frame.critical.is_empty());
    }

    #[test]
    fn sample_between_thresholds_is_warning_only() {
        let mut p = params();
        p.set_thresholds(0.5, 0.8).unwrap();
        let frame = render_frame(&[0.1, 0.6, 0.9, -0.6, -0.85], &p);

        assert_eq!(frame.base.get(1), Some(0.6));
        assert_eq!(frame.warning.get(1), Some(0.6));
        assert_eq!(frame.critical.get(1), None);

        assert_eq!(frame.warning.get(2), None);
        assert_eq!(frame.critical.get(2), Some(0.9));
        assert_eq!(frame.warning.get(3), Some(-0.6));
        assert_eq!(frame.critical.get(4), Some(-0.85));

        assert_eq!(frame.warning.get(0), None);
        assert_eq!(frame.critical.get(0), None);
        assert_eq!(frame.base.points().count(), 5);
        assert_eq!(frame.warning.len(), frame.base.len());
    }

    #[test]
    fn thresholds_are_inclusive_at_lower_edge() {
        let mut p = params();
        p.set_thresholds(0.5, 0.8).unwrap();
        let frame = render_frame(&[0.5, 0.8], &p);
        assert_eq!(frame.warning.get(0), Some(0.5));
        assert_eq!(frame.warning.get(1), None);
        assert_eq!(frame.critical.get(1), Some(0.8));
    }

    #[test]
    fn bands_use_scaled_values() {
        let mut p = params();
        p.set_amplitude_factor(2.0).unwrap();
        // 0.4 and 0.5 are below the 0.7 warning threshold until doubled
        let frame = render_frame(&[0.4, 0.5, 0.2], &p);
        assert_eq!(frame.warning.get(0), Some(0.8));
        assert_eq!(frame.critical.get(0), None);
        assert_eq!(frame.critical.get(1), Some(1.0));
        assert_eq!(frame.warning.get(2), None);
        assert_eq!(frame.critical.get(2), None);
    }

    #[test]
    fn gaps_keep_band_points_apart() {
        let mut p = params();
        p.set_thresholds(0.5, 0.8).unwrap();
        let frame = render_frame(&[0.6, 0.7, 0.1, 0.6, 0.0, 0.0, 0.55], &p);
        let points: Vec<_> = frame.warning.points().collect();
        assert_eq!(points, vec![(0, 0.6), (1, 0.7), (3, 0.6), (6, 0.55)]);
        assert_eq!(
            frame.warning.values(),
            &[Some(0.6), Some(0.7), None, Some(0.6), None, None, Some(0.55)]
        );
        assert_eq!(frame.critical.points().count(), 0);
    }

    #[test]
    fn silent_buffer_is_flat_with_empty_bands() {
        let frame = render_frame(&[0.0; 64], &params());
        assert!(frame.base.points().all(|(_, v)| v == 0.0));
        assert_eq!(frame.warning.points().count(), 0);
        assert_eq!(frame.critical.points().count(), 0);
    }

    #[test]
    fn cursor_sits_gap_samples_before_newest() {
        let mut p = params();
        p.cursor_enabled = true;
        let frame = render_frame(&[0.0; 100], &p);
        assert_eq!(frame.cursor, Some(95));

        p.set_time_zoom_factor(50.0).unwrap();
        let frame = render_frame(&[0.0; 100], &p);
        assert_eq!(frame.visible_samples, 2);
        assert_eq!(frame.cursor, Some(0));

        p.set_cursor_gap(0);
        let frame = render_frame(&[0.0; 100], &p);
        assert_eq!(frame.cursor, Some(1));

        p.cursor_enabled = false;
        assert_eq!(render_frame(&[0.0; 100], &p).cursor, None);
    }

    #[test]
    fn padding_widens_vertical_range() {
        let mut p = params();
        p.set_vertical_padding_factor(0.5).unwrap();
        let frame = render_frame(&[0.3; 10], &p);
        assert_eq!(frame.y_range, (-1.5, 1.5));
    }

    #[test]
    fn transform_is_deterministic() {
        let snapshot: Vec<f32> = (0..257).map(|i| ((i * 37) % 101) as f32 / 50.0 - 1.0).collect();
        let mut p = params();
        p.set_time_zoom_factor(1.7).unwrap();
        p.cursor_enabled = true;
        assert_eq!(render_frame(&snapshot, &p), render_frame(&snapshot, &p));
    }
}
