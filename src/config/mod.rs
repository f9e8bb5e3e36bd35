//! Configuration management for pcmviz.
//!
//! Loads the capture and display settings from a TOML file in the user's
//! config directory. Every field has a default, so a partial file is fine.

pub mod file;

pub use file::{get_config_path, AudioConfig, Palette, VizConfig};
