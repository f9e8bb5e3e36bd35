//! View parameters consumed by the render transform.
//!
//! Values are validated where they are set, so the transform itself never
//! has to reject anything. The step helpers clamp to the ranges the
//! interactive controls expose.

use crate::error::{Result, VizError};

pub const AMPLITUDE_RANGE: (f32, f32) = (0.1, 20.0);
pub const AMPLITUDE_STEP: f32 = 0.1;
pub const ZOOM_RANGE: (f32, f32) = (1.0, 10.0);
pub const ZOOM_STEP: f32 = 0.1;
pub const PADDING_RANGE: (f32, f32) = (0.0, 1.0);
pub const PADDING_STEP: f32 = 0.01;

/// Samples between the newest sample and the cursor line.
pub const DEFAULT_CURSOR_GAP: usize = 5;

/// Gain, zoom, padding, band thresholds and overlay toggles for one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewParameters {
    amplitude_factor: f32,
    time_zoom_factor: f32,
    vertical_padding_factor: f32,
    threshold_warning: f32,
    threshold_critical: f32,
    pub banding_enabled: bool,
    pub cursor_enabled: bool,
    cursor_gap: usize,
}

impl Default for ViewParameters {
    fn default() -> Self {
        Self {
            amplitude_factor: 1.0,
            time_zoom_factor: 1.0,
            vertical_padding_factor: 0.0,
            threshold_warning: 0.7,
            threshold_critical: 0.9,
            banding_enabled: true,
            cursor_enabled: false,
            cursor_gap: DEFAULT_CURSOR_GAP,
        }
    }
}

impl ViewParameters {
    pub fn amplitude_factor(&self) -> f32 {
        self.amplitude_factor
    }

    pub fn time_zoom_factor(&self) -> f32 {
        self.time_zoom_factor
    }

    pub fn vertical_padding_factor(&self) -> f32 {
        self.vertical_padding_factor
    }

    pub fn threshold_warning(&self) -> f32 {
        self.threshold_warning
    }

    pub fn threshold_critical(&self) -> f32 {
        self.threshold_critical
    }

    pub fn cursor_gap(&self) -> usize {
        self.cursor_gap
    }

    /// # Errors
    /// - `InvalidParameter` unless the gain is finite and positive
    pub fn set_amplitude_factor(&mut self, value: f32) -> Result<()> {
        if !value.is_finite() || value <= 0.0 {
            return Err(VizError::InvalidParameter(format!(
                "amplitude factor must be positive, got {value}"
            )));
        }
        self.amplitude_factor = value;
        Ok(())
    }

    /// Sets the time zoom. Values below 1.0 are raised to 1.0.
    ///
    /// # Errors
    /// - `InvalidParameter` if the value is not finite
    pub fn set_time_zoom_factor(&mut self, value: f32) -> Result<()> {
        if !value.is_finite() {
            return Err(VizError::InvalidParameter(format!(
                "time zoom must be finite, got {value}"
            )));
        }
        self.time_zoom_factor = value.max(1.0);
        Ok(())
    }

    /// # Errors
    /// - `InvalidParameter` unless the padding is finite and non-negative
    pub fn set_vertical_padding_factor(&mut self, value: f32) -> Result<()> {
        if !value.is_finite() || value < 0.0 {
            return Err(VizError::InvalidParameter(format!(
                "vertical padding must be non-negative, got {value}"
            )));
        }
        self.vertical_padding_factor = value;
        Ok(())
    }

    /// Sets both band thresholds at once.
    ///
    /// # Errors
    /// - `InvalidParameter` unless `0 < warning < critical`
    pub fn set_thresholds(&mut self, warning: f32, critical: f32) -> Result<()> {
        if !warning.is_finite() || !critical.is_finite() || warning <= 0.0 || warning >= critical {
            return Err(VizError::InvalidParameter(format!(
                "thresholds must satisfy 0 < warning < critical, got {warning} / {critical}"
            )));
        }
        self.threshold_warning = warning;
        self.threshold_critical = critical;
        Ok(())
    }

    pub fn set_cursor_gap(&mut self, gap: usize) {
        self.cursor_gap = gap;
    }

    pub fn adjust_amplitude(&mut self, steps: i32) {
        self.amplitude_factor =
            step_clamped(self.amplitude_factor, steps, AMPLITUDE_STEP, AMPLITUDE_RANGE);
    }

    pub fn adjust_zoom(&mut self, steps: i32) {
        self.time_zoom_factor = step_clamped(self.time_zoom_factor, steps, ZOOM_STEP, ZOOM_RANGE);
    }

    pub fn adjust_padding(&mut self, steps: i32) {
        self.vertical_padding_factor =
            step_clamped(self.vertical_padding_factor, steps, PADDING_STEP, PADDING_RANGE);
    }
}

/// Moves `value` by whole steps, rounding to the step grid so repeated
/// presses do not accumulate float drift.
fn step_clamped(value: f32, steps: i32, step: f32, (min, max): (f32, f32)) -> f32 {
    let stepped = ((value / step).round() + steps as f32) * step;
    stepped.clamp(min, max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_configuration_defaults() {
        let params = ViewParameters::default();
        assert_eq!(params.amplitude_factor(), 1.0);
        assert_eq!(params.time_zoom_factor(), 1.0);
        assert_eq!(params.threshold_warning(), 0.7);
        assert_eq!(params.threshold_critical(), 0.9);
        assert_eq!(params.cursor_gap(), 5);
        assert!(params.banding_enabled);
        assert!(!params.cursor_enabled);
    }

    #[test]
    fn rejects_non_positive_gain() {
        let mut params = ViewParameters::default();
        assert!(params.set_amplitude_factor(0.0).is_err());
        assert!(params.set_amplitude_factor(-2.0).is_err());
        assert!(params.set_amplitude_factor(f32::NAN).is_err());
        assert_eq!(params.amplitude_factor(), 1.0);
        params.set_amplitude_factor(3.5).unwrap();
        assert_eq!(params.amplitude_factor(), 3.5);
    }

    #[test]
    fn zoom_below_one_is_raised() {
        let mut params = ViewParameters::default();
        params.set_time_zoom_factor(0.3).unwrap();
        assert_eq!(params.time_zoom_factor(), 1.0);
        assert!(params.set_time_zoom_factor(f32::INFINITY).is_err());
    }

    #[test]
    fn thresholds_must_be_ordered() {
        let mut params = ViewParameters::default();
        assert!(params.set_thresholds(0.9, 0.7).is_err());
        assert!(params.set_thresholds(0.5, 0.5).is_err());
        assert!(params.set_thresholds(0.0, 0.5).is_err());
        params.set_thresholds(0.5, 0.8).unwrap();
        assert_eq!(params.threshold_warning(), 0.5);
        assert_eq!(params.threshold_critical(), 0.8);
    }

    #[test]
    fn negative_padding_is_rejected() {
        let mut params = ViewParameters::default();
        assert!(params.set_vertical_padding_factor(-0.1).is_err());
        params.set_vertical_padding_factor(0.25).unwrap();
        assert_eq!(params.vertical_padding_factor(), 0.25);
    }

    #[test]
    fn steps_stay_in_range() {
        let mut params = ViewParameters::default();
        params.adjust_zoom(-5);
        assert_eq!(params.time_zoom_factor(), 1.0);
        params.adjust_zoom(10);
        assert!((params.time_zoom_factor() - 2.0).abs() < 1e-5);
        params.adjust_zoom(500);
        assert_eq!(params.time_zoom_factor(), 10.0);

        params.adjust_amplitude(-100);
        assert!((params.amplitude_factor() - 0.1).abs() < 1e-6);
        params.adjust_padding(3);
        assert!((params.vertical_padding_factor() - 0.03).abs() < 1e-6);
        params.adjust_padding(-10);
        assert_eq!(params.vertical_padding_factor(), 0.0);
    }
}
