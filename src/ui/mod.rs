//! Terminal front end: the waveform view and the startup error screen.

pub mod error;
pub mod plot;
pub mod viz;

pub use error::show_error_screen;
pub use viz::{StatusLine, ViewCommand, VizTui};
