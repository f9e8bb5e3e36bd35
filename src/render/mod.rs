//! Waveform rendering: view parameters, the snapshot transform and the
//! periodic scheduler that feeds a display.

pub mod params;
pub mod scheduler;
pub mod transform;

pub use params::ViewParameters;
pub use scheduler::RenderScheduler;
pub use transform::{RenderFrame, Series};

/// Receives one frame per tick and does all the drawing.
pub trait DisplaySurface {
    /// # Errors
    /// - If the frame cannot be drawn
    fn present(&mut self, frame: &RenderFrame) -> anyhow::Result<()>;
}
