//! FFmpeg-backed capture source.
//!
//! Locates the ffmpeg binary, spawns it with the platform's capture demuxer
//! and exposes its stdout as a raw f32le byte stream. ffmpeg's stderr is
//! drained on a helper thread so a chatty device can never stall the pipe;
//! the last few lines are kept to explain failures.

use super::source::{CaptureRequest, CaptureSource, CaptureStream, StreamControl};
use crate::error::{Result, VizError};
use anyhow::anyhow;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::ffi::OsString;
use std::io::{BufRead, BufReader, ErrorKind};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStderr, Command, Stdio};
use std::sync::Arc;
use std::thread::JoinHandle;

/// Lines of ffmpeg stderr retained for diagnostics.
const STDERR_TAIL_LINES: usize = 8;

/// Locates the ffmpeg binary on the system.
///
/// Checks in this order:
/// 1. macOS homebrew locations: `/opt/homebrew/bin/ffmpeg`, `/usr/local/bin/ffmpeg`
/// 2. Linux standard locations: `/usr/bin/ffmpeg`, `/usr/local/bin/ffmpeg`, `/snap/bin/ffmpeg`
/// 3. Windows standard locations: `C:\ffmpeg\bin\ffmpeg.exe`
/// 4. Falls back to PATH search via `which` or `where` command
///
/// # Returns
/// The path to the ffmpeg binary, or an error if not found.
pub fn find_ffmpeg() -> anyhow::Result<PathBuf> {
    let candidates = if cfg!(target_os = "macos") {
        vec![
            PathBuf::from("/opt/homebrew/bin/ffmpeg"),      // Apple Silicon Homebrew
            PathBuf::from("/usr/local/bin/ffmpeg"),         // Intel Homebrew or manual install
            PathBuf::from("/usr/bin/ffmpeg"),
        ]
    } else if cfg!(target_os = "linux") {
        vec![
            PathBuf::from("/usr/bin/ffmpeg"),
            PathBuf::from("/usr/local/bin/ffmpeg"),
            PathBuf::from("/snap/bin/ffmpeg"),
        ]
    } else if cfg!(target_os = "windows") {
        vec![
            PathBuf::from("C:\\ffmpeg\\bin\\ffmpeg.exe"),
            PathBuf::from("C:\\Program Files\\ffmpeg\\bin\\ffmpeg.exe"),
        ]
    } else {
        vec![]
    };

    for path in candidates {
        if path.exists() {
            tracing::debug!("Found ffmpeg at: {}", path.display());
            return Ok(path);
        }
    }

    let ffmpeg_path = find_in_path("ffmpeg")?;
    tracing::debug!("Found ffmpeg in PATH at: {}", ffmpeg_path.display());
    Ok(ffmpeg_path)
}

/// Searches for a binary in the system PATH.
///
/// Uses `which` on Unix systems and `where` on Windows.
fn find_in_path(binary_name: &str) -> anyhow::Result<PathBuf> {
    let search_cmd = if cfg!(target_os = "windows") {
        "where"
    } else {
        "which"
    };

    let output = Command::new(search_cmd)
        .arg(binary_name)
        .output()
        .map_err(|e| anyhow!("Failed to search PATH for {binary_name}: {e}"))?;

    if output.status.success() {
        let path_str = String::from_utf8_lossy(&output.stdout);
        // `where` may print several matches; the first one wins.
        let first = path_str.lines().next().unwrap_or("").trim();
        if !first.is_empty() {
            return Ok(PathBuf::from(first));
        }
    }

    Err(anyhow!(
        "ffmpeg not found. Please install ffmpeg:\n\
         macOS: brew install ffmpeg\n\
         Linux: apt install ffmpeg (Debian/Ubuntu) or dnf install ffmpeg (Fedora)\n\
         Windows: Download from https://ffmpeg.org/download.html"
    ))
}

/// The ffmpeg demuxer used for live capture on this platform.
pub fn default_input_format() -> &'static str {
    if cfg!(target_os = "macos") {
        "avfoundation"
    } else if cfg!(target_os = "windows") {
        "dshow"
    } else {
        "pulse"
    }
}

/// Builds the ffmpeg argument list for a mono f32le capture to stdout.
pub fn capture_args(input_format: &str, request: &CaptureRequest) -> Vec<OsString> {
    let sample_rate = request.sample_rate.to_string();
    [
        "-hide_banner",
        "-nostdin",
        "-loglevel",
        "error",
        "-f",
        input_format,
        "-i",
        request.device_id.as_str(),
        "-ac",
        "1",
        "-ar",
        sample_rate.as_str(),
        "-f",
        "f32le",
        "pipe:1",
    ]
    .into_iter()
    .map(OsString::from)
    .collect()
}

/// Capture source that runs `ffmpeg` as a child process.
pub struct FfmpegSource {
    ffmpeg_path: PathBuf,
    input_format: String,
}

impl FfmpegSource {
    pub fn new(ffmpeg_path: PathBuf, input_format: impl Into<String>) -> Self {
        Self {
            ffmpeg_path,
            input_format: input_format.into(),
        }
    }

    /// Locates ffmpeg and uses the given demuxer.
    ///
    /// # Errors
    /// - `DeviceUnavailable` if no ffmpeg binary can be found
    pub fn locate(input_format: impl Into<String>) -> Result<Self> {
        let path = find_ffmpeg().map_err(|e| VizError::DeviceUnavailable(e.to_string()))?;
        Ok(Self::new(path, input_format))
    }

    pub fn ffmpeg_path(&self) -> &Path {
        &self.ffmpeg_path
    }

    pub fn input_format(&self) -> &str {
        &self.input_format
    }
}

impl CaptureSource for FfmpegSource {
    fn open(&self, request: &CaptureRequest) -> Result<CaptureStream> {
        let args = capture_args(&self.input_format, request);
        tracing::info!(
            "Starting capture: {} {}",
            self.ffmpeg_path.display(),
            args.iter()
                .map(|a| a.to_string_lossy())
                .collect::<Vec<_>>()
                .join(" ")
        );

        let mut child = Command::new(&self.ffmpeg_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => VizError::DeviceUnavailable(format!(
                    "ffmpeg not found at {}",
                    self.ffmpeg_path.display()
                )),
                ErrorKind::PermissionDenied => VizError::DeviceUnavailable(format!(
                    "permission denied running {}",
                    self.ffmpeg_path.display()
                )),
                _ => VizError::DeviceUnavailable(format!("failed to spawn ffmpeg: {e}")),
            })?;

        let stdout = match child.stdout.take() {
            Some(stdout) => stdout,
            None => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(VizError::DeviceUnavailable(
                    "ffmpeg stdout was not captured".to_string(),
                ));
            }
        };

        let stderr_tail = Arc::new(Mutex::new(VecDeque::with_capacity(STDERR_TAIL_LINES)));
        let drain = match child.stderr.take() {
            Some(stderr) => match spawn_stderr_drain(stderr, Arc::clone(&stderr_tail)) {
                Ok(handle) => Some(handle),
                Err(e) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(e);
                }
            },
            None => None,
        };

        let control = FfmpegControl {
            child: Mutex::new(Some(child)),
            drain: Mutex::new(drain),
            stderr_tail,
        };

        Ok(CaptureStream {
            reader: Box::new(stdout),
            control: Arc::new(control),
        })
    }
}

/// Copies ffmpeg's stderr into the log and a bounded tail buffer until the
/// process exits.
fn spawn_stderr_drain(
    stderr: ChildStderr,
    tail: Arc<Mutex<VecDeque<String>>>,
) -> Result<JoinHandle<()>> {
    let handle = std::thread::Builder::new()
        .name("ffmpeg-stderr".to_string())
        .spawn(move || {
            for line in BufReader::new(stderr).lines() {
                let Ok(line) = line else { break };
                let line = line.trim().to_string();
                if line.is_empty() {
                    continue;
                }
                tracing::warn!("ffmpeg: {}", line);
                let mut tail = tail.lock();
                if tail.len() == STDERR_TAIL_LINES {
                    tail.pop_front();
                }
                tail.push_back(line);
            }
        })?;
    Ok(handle)
}

/// Kill switch for a running ffmpeg child.
struct FfmpegControl {
    child: Mutex<Option<Child>>,
    drain: Mutex<Option<JoinHandle<()>>>,
    stderr_tail: Arc<Mutex<VecDeque<String>>>,
}

impl StreamControl for FfmpegControl {
    fn terminate(&self) {
        let Some(mut child) = self.child.lock().take() else {
            return;
        };
        match child.try_wait() {
            Ok(Some(status)) => tracing::debug!("ffmpeg already exited: {}", status),
            Ok(None) => {
                if let Err(e) = child.kill() {
                    tracing::debug!("Failed to kill ffmpeg: {}", e);
                }
                match child.wait() {
                    Ok(status) => tracing::debug!("ffmpeg terminated: {}", status),
                    Err(e) => tracing::warn!("Failed to reap ffmpeg: {}", e),
                }
            }
            Err(e) => {
                tracing::debug!("Failed to poll ffmpeg status: {}", e);
                let _ = child.kill();
                let _ = child.wait();
            }
        }

        // stderr closes once the process is gone, so this join is bounded.
        if let Some(drain) = self.drain.lock().take() {
            let _ = drain.join();
        }
    }

    fn diagnostics(&self) -> Option<String> {
        let tail = self.stderr_tail.lock();
        if tail.is_empty() {
            None
        } else {
            Some(tail.iter().cloned().collect::<Vec<_>>().join("\n"))
        }
    }
}

impl Drop for FfmpegControl {
    fn drop(&mut self) {
        self.terminate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_ffmpeg() {
        // This test will succeed if ffmpeg is installed
        match find_ffmpeg() {
            Ok(path) => println!("Found ffmpeg at: {}", path.display()),
            Err(e) => println!("ffmpeg not found (expected on CI): {e}"),
        }
    }

    #[test]
    fn capture_args_request_mono_f32le_on_stdout() {
        let request = CaptureRequest::new(":1", 48000, 1024).unwrap();
        let args: Vec<String> = capture_args("avfoundation", &request)
            .into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();

        let pos = |flag: &str| args.iter().position(|a| a == flag).unwrap();
        assert_eq!(args[pos("-i") + 1], ":1");
        assert_eq!(args[pos("-ac") + 1], "1");
        assert_eq!(args[pos("-ar") + 1], "48000");
        assert_eq!(args[args.len() - 3..], ["-f", "f32le", "pipe:1"]);
        assert_eq!(args[pos("-f") + 1], "avfoundation");
    }

    #[test]
    fn missing_binary_is_device_unavailable() {
        let source = FfmpegSource::new(PathBuf::from("/nonexistent/ffmpeg"), "pulse");
        let request = CaptureRequest::new("default", 44100, 1024).unwrap();
        assert!(matches!(
            source.open(&request),
            Err(VizError::DeviceUnavailable(_))
        ));
    }
}
