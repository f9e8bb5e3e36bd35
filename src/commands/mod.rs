//! Application command handlers for pcmviz.
//!
//! # Commands
//! - `view`: live waveform view (default)
//! - `list_devices`: list capture devices reported by ffmpeg
//! - `config`: open the configuration file in the user's editor
//! - `logs`: display recent log entries

pub mod config;
pub mod list_devices;
pub mod logs;
pub mod view;

pub use config::handle_config;
pub use list_devices::handle_list_devices;
pub use logs::handle_logs;
pub use view::{handle_view, ViewOptions};
