//! Fixed-period render tick.
//!
//! The scheduler lives on the UI thread. The event loop asks it how long it
//! may wait for input, then calls `tick_if_due`. A tick runs to completion
//! before the next one can start, and deadlines missed while the loop was
//! busy are dropped instead of replayed.

use super::params::ViewParameters;
use super::transform::{render_frame, RenderFrame};
use super::DisplaySurface;
use crate::capture::RingBuffer;
use crate::error::{Result, VizError};
use std::time::{Duration, Instant};

pub const DEFAULT_TICK: Duration = Duration::from_millis(100);

pub struct RenderScheduler {
    period: Duration,
    next_tick: Instant,
    ticks: u64,
}

impl RenderScheduler {
    /// Creates a scheduler whose first tick is due immediately.
    ///
    /// # Errors
    /// - `InvalidParameter` if `period` is zero
    pub fn new(period: Duration) -> Result<Self> {
        Self::starting_at(period, Instant::now())
    }

    fn starting_at(period: Duration, now: Instant) -> Result<Self> {
        if period.is_zero() {
            return Err(VizError::InvalidParameter(
                "tick period must be positive".to_string(),
            ));
        }
        Ok(Self {
            period,
            next_tick: now,
            ticks: 0,
        })
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Ticks delivered so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn is_due(&self, now: Instant) -> bool {
        now >= self.next_tick
    }

    /// How long the caller may block before the next tick is due.
    pub fn time_until_tick(&self, now: Instant) -> Duration {
        self.next_tick.saturating_duration_since(now)
    }

    /// Runs a tick if one is due. Returns whether a frame was delivered.
    ///
    /// # Errors
    /// - Whatever the display surface returns from `present`
    pub fn tick_if_due<D: DisplaySurface + ?Sized>(
        &mut self,
        now: Instant,
        buffer: &RingBuffer,
        params: &ViewParameters,
        surface: &mut D,
    ) -> anyhow::Result<bool> {
        if !self.is_due(now) {
            return Ok(false);
        }
        self.tick(buffer, params, surface)?;
        self.advance(now);
        Ok(true)
    }

    /// Renders and presents one frame immediately, outside the cadence.
    ///
    /// # Errors
    /// - Whatever the display surface returns from `present`
    pub fn tick<D: DisplaySurface + ?Sized>(
        &mut self,
        buffer: &RingBuffer,
        params: &ViewParameters,
        surface: &mut D,
    ) -> anyhow::Result<()> {
        let frame = build_frame(buffer, params);
        surface.present(&frame)?;
        self.ticks += 1;
        if self.ticks.is_multiple_of(600) {
            tracing::debug!("Render ticks: {}", self.ticks);
        }
        Ok(())
    }

    /// Moves the deadline one period forward, skipping any missed periods.
    fn advance(&mut self, now: Instant) {
        self.next_tick += self.period;
        if self.next_tick <= now {
            self.next_tick = now + self.period;
        }
    }
}

/// Snapshot plus transform: the read-only half of a tick.
pub fn build_frame(buffer: &RingBuffer, params: &ViewParameters) -> RenderFrame {
    let snapshot = buffer.snapshot();
    render_frame(&snapshot, params)
}
