//! Capture source abstraction and the f32 block framing it produces.
//!
//! A capture source is anything that, given a device identifier and a sample
//! rate, yields a byte stream of little-endian 32-bit float mono frames. The
//! worker only depends on this trait; `FfmpegSource` is the production
//! implementation.

use crate::error::{Result, VizError};
use std::io::{ErrorKind, Read};
use std::sync::Arc;

/// Width of one mono f32 frame on the wire.
pub const BYTES_PER_SAMPLE: usize = 4;

/// Parameters handed to a capture source when a session starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureRequest {
    pub device_id: String,
    pub sample_rate: u32,
    /// Frames per read.
    pub block_size: usize,
}

impl CaptureRequest {
    /// Builds a request, rejecting zero rates and block sizes.
    ///
    /// # Errors
    /// - `InvalidParameter` if `sample_rate` or `block_size` is zero, or the device id is blank
    pub fn new(device_id: impl Into<String>, sample_rate: u32, block_size: usize) -> Result<Self> {
        let device_id = device_id.into();
        if device_id.trim().is_empty() {
            return Err(VizError::InvalidParameter(
                "device identifier must not be empty".to_string(),
            ));
        }
        if sample_rate == 0 {
            return Err(VizError::InvalidParameter(
                "sample rate must be positive".to_string(),
            ));
        }
        if block_size == 0 {
            return Err(VizError::InvalidParameter(
                "block size must be positive".to_string(),
            ));
        }
        Ok(Self {
            device_id,
            sample_rate,
            block_size,
        })
    }

    pub fn block_bytes(&self) -> usize {
        self.block_size * BYTES_PER_SAMPLE
    }
}

/// Out-of-band control over a running capture source.
///
/// `terminate` must be idempotent and must unblock a reader that is parked
/// inside `read`, typically by killing the producing process.
pub trait StreamControl: Send + Sync {
    fn terminate(&self);

    /// Human-readable detail about why the stream stopped, if any.
    fn diagnostics(&self) -> Option<String> {
        None
    }
}

/// A started capture source: the byte stream plus its control handle.
pub struct CaptureStream {
    pub reader: Box<dyn Read + Send>,
    pub control: Arc<dyn StreamControl>,
}

/// Something that can open a mono f32 byte stream for a device.
pub trait CaptureSource: Send + Sync {
    /// Starts the source.
    ///
    /// # Errors
    /// - `DeviceUnavailable` if the source cannot be started
    fn open(&self, request: &CaptureRequest) -> Result<CaptureStream>;
}

/// Fills `buf` completely from `reader`.
///
/// Returns the number of bytes read, which is less than `buf.len()` only
/// when the stream reached end-of-file first.
pub fn read_block(reader: &mut dyn Read, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Reads one full block and decodes it into a sample chunk.
///
/// # Errors
/// - `StreamEnded` if fewer than `buf.len()` bytes were available
/// - `Io` if the underlying read failed
pub fn read_chunk(reader: &mut dyn Read, buf: &mut [u8]) -> Result<Vec<f32>> {
    let filled = read_block(reader, buf)?;
    if filled < buf.len() {
        tracing::debug!("Short read: {} of {} bytes", filled, buf.len());
        return Err(VizError::StreamEnded);
    }
    Ok(decode_f32le(buf))
}

/// Decodes interleaved little-endian f32 frames. Trailing bytes that do not
/// form a whole frame are ignored.
pub fn decode_f32le(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(BYTES_PER_SAMPLE)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect()
}

#[cfg(test)]
pub(crate) fn encode_f32le(samples: &[f32]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// Hands out at most `step` bytes per read call, like a pipe under load.
    struct Trickle {
        data: Cursor<Vec<u8>>,
        step: usize,
    }

    impl Read for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            let n = buf.len().min(self.step);
            self.data.read(&mut buf[..n])
        }
    }

    #[test]
    fn request_validation() {
        assert!(CaptureRequest::new(":0", 44100, 1024).is_ok());
        assert!(matches!(
            CaptureRequest::new(":0", 0, 1024),
            Err(VizError::InvalidParameter(_))
        ));
        assert!(matches!(
            CaptureRequest::new(":0", 44100, 0),
            Err(VizError::InvalidParameter(_))
        ));
        assert!(CaptureRequest::new("  ", 44100, 1024).is_err());
        assert_eq!(
            CaptureRequest::new(":1", 48000, 1024).unwrap().block_bytes(),
            4096
        );
    }

    #[test]
    fn decodes_little_endian_floats() {
        let bytes = encode_f32le(&[0.5, -1.0, 0.0]);
        assert_eq!(decode_f32le(&bytes), vec![0.5, -1.0, 0.0]);
        assert_eq!(decode_f32le(&bytes[..5]), vec![0.5]);
    }

    #[test]
    fn read_block_assembles_split_reads() {
        let mut reader = Trickle {
            data: Cursor::new(encode_f32le(&[1.0, 2.0, 3.0, 4.0])),
            step: 3,
        };
        let mut buf = vec![0u8; 16];
        assert_eq!(read_chunk(&mut reader, &mut buf).unwrap(), vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn short_block_is_stream_end() {
        let mut reader = Cursor::new(vec![0u8; 2000]);
        let mut buf = vec![0u8; 4096];
        assert!(matches!(
            read_chunk(&mut reader, &mut buf),
            Err(VizError::StreamEnded)
        ));

        let mut empty = Cursor::new(Vec::new());
        assert!(matches!(
            read_chunk(&mut empty, &mut buf),
            Err(VizError::StreamEnded)
        ));
    }
}
