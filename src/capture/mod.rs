//! Live audio capture for pcmviz.
//!
//! An ffmpeg child process produces mono f32le frames, a worker thread reads
//! them in fixed blocks and pushes each block into a shared ring buffer that
//! the render tick snapshots.

pub mod devices;
pub mod ffmpeg;
pub mod ring_buffer;
pub mod source;
pub mod worker;

pub use devices::resolve_device;
pub use ffmpeg::{default_input_format, find_ffmpeg, FfmpegSource};
pub use ring_buffer::RingBuffer;
pub use worker::{CaptureExit, CaptureWorker};
