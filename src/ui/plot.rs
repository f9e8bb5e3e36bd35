//! Reduces a render series to what a terminal chart can actually show.
//!
//! A five second buffer at 44.1 kHz is far wider than any terminal, so each
//! pixel column keeps only its lowest and highest sample. Peaks survive the
//! reduction and gaps stay gaps.

use crate::render::Series;

/// Braille cells are two dots wide.
pub const DOTS_PER_CELL: usize = 2;

/// Returns chart points for `series`, at most two per column.
///
/// Points keep their original sample index as x, so the chart bounds stay
/// `[0, visible_samples]` regardless of how much was dropped. Columns that
/// hold only gaps produce nothing.
pub fn decimate(series: &Series, columns: usize) -> Vec<(f64, f64)> {
    let values = series.values();
    if columns == 0 || values.len() <= columns * 2 {
        return series
            .points()
            .map(|(i, v)| (i as f64, v as f64))
            .collect();
    }

    let mut points = Vec::with_capacity(columns * 2);
    let len = values.len();
    for column in 0..columns {
        let start = column * len / columns;
        let end = ((column + 1) * len / columns).min(len);

        let mut low: Option<(usize, f32)> = None;
        let mut high: Option<(usize, f32)> = None;
        for (offset, value) in values[start..end].iter().enumerate() {
            let Some(v) = *value else { continue };
            let i = start + offset;
            if low.is_none_or(|(_, l)| v < l) {
                low = Some((i, v));
            }
            if high.is_none_or(|(_, h)| v > h) {
                high = Some((i, v));
            }
        }

        match (low, high) {
            (Some(l), Some(h)) if l.0 == h.0 => points.push((l.0 as f64, l.1 as f64)),
            (Some(l), Some(h)) => {
                let (first, second) = if l.0 < h.0 { (l, h) } else { (h, l) };
                points.push((first.0 as f64, first.1 as f64));
                points.push((second.0 as f64, second.1 as f64));
            }
            _ => {}
        }
    }
    points
}

/// Two points forming a vertical line at `x` across the whole y range.
pub fn vertical_line(x: usize, (y_min, y_max): (f32, f32)) -> Vec<(f64, f64)> {
    vec![(x as f64, y_min as f64), (x as f64, y_max as f64)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::transform::render_frame;
    use crate::render::ViewParameters;

    fn series(samples: &[f32]) -> Series {
        let mut params = ViewParameters::default();
        params.banding_enabled = false;
        render_frame(samples, &params).base
    }

    #[test]
    fn short_series_is_kept_whole() {
        let s = series(&[0.1, -0.2, 0.3]);
        assert_eq!(
            decimate(&s, 80),
            vec![(0.0, 0.1f32 as f64), (1.0, -0.2f32 as f64), (2.0, 0.3f32 as f64)]
        );
    }

    #[test]
    fn keeps_column_extremes_in_index_order() {
        let mut samples = vec![0.0f32; 1000];
        samples[10] = 0.9;
        samples[20] = -0.8;
        let points = decimate(&series(&samples), 10);

        assert!(points.len() <= 20);
        assert_eq!(points[0], (10.0, 0.9f32 as f64));
        assert_eq!(points[1], (20.0, -0.8f32 as f64));
        assert!(points.windows(2).all(|w| w[0].0 <= w[1].0));
    }

    #[test]
    fn flat_column_yields_one_point() {
        let points = decimate(&series(&[0.0; 400]), 4);
        assert_eq!(points.len(), 4);
        assert_eq!(points[1], (100.0, 0.0));
    }

    #[test]
    fn gap_only_columns_are_skipped() {
        let mut samples = vec![0.0f32; 400];
        samples[350] = 0.95;
        let frame = render_frame(&samples, &ViewParameters::default());
        let points = decimate(&frame.critical, 4);
        assert_eq!(points, vec![(350.0, 0.95f32 as f64)]);
        assert!(decimate(&frame.warning, 4).is_empty());
    }

    #[test]
    fn vertical_line_spans_range() {
        assert_eq!(vertical_line(7, (-1.5, 1.5)), vec![(7.0, -1.5), (7.0, 1.5)]);
    }
}
