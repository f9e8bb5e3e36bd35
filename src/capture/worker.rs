//! Capture worker: owns one capture session and its read thread.
//!
//! The worker moves through `Idle → Starting → Capturing → Stopping → Idle`.
//! `start` returns as soon as the source is open and the read thread runs,
//! so the caller's render loop keeps ticking. A session counts as started
//! once the first full block has arrived. The owner learns about that from
//! `poll_startup`, which also tears the session down when no audio shows up
//! within the startup timeout. Each full block is decoded and pushed to the
//! ring buffer as one unit. A short read ends the session on its own and is
//! recorded as `CaptureExit::StreamEnded`.

use super::ring_buffer::RingBuffer;
use super::source::{read_chunk, CaptureRequest, CaptureSource, StreamControl};
use crate::error::{Result, VizError};
use parking_lot::Mutex;
use std::io::Read;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, TryRecvError};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Lifecycle state of the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    /// Waiting for the first block of a new session.
    Starting,
    Capturing,
    Stopping,
}

/// Why the most recent session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureExit {
    /// `stop()` was called.
    Stopped,
    /// The source delivered a short or empty block.
    StreamEnded,
    /// The read itself failed.
    Failed(String),
}

/// Snapshot of the worker's state, cheap to poll every tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureStatus {
    pub state: CaptureState,
    pub device_id: Option<String>,
    pub last_exit: Option<CaptureExit>,
}

impl CaptureStatus {
    fn idle() -> Self {
        Self {
            state: CaptureState::Idle,
            device_id: None,
            last_exit: None,
        }
    }
}

struct Session {
    handle: JoinHandle<()>,
    cancel: Arc<AtomicBool>,
    control: Arc<dyn StreamControl>,
    startup: Option<Startup>,
}

/// First-block handshake of a session that has not delivered audio yet.
struct Startup {
    started: mpsc::Receiver<Result<()>>,
    deadline: Instant,
    request: CaptureRequest,
}

/// Runs a capture source on a dedicated thread and feeds the ring buffer.
pub struct CaptureWorker<S: CaptureSource> {
    source: S,
    buffer: Arc<RingBuffer>,
    startup_timeout: Duration,
    status: Arc<Mutex<CaptureStatus>>,
    session: Option<Session>,
}

impl<S: CaptureSource> CaptureWorker<S> {
    pub fn new(source: S, buffer: Arc<RingBuffer>, startup_timeout: Duration) -> Self {
        Self {
            source,
            buffer,
            startup_timeout,
            status: Arc::new(Mutex::new(CaptureStatus::idle())),
            session: None,
        }
    }

    pub fn status(&self) -> CaptureStatus {
        self.status.lock().clone()
    }

    pub fn is_capturing(&self) -> bool {
        self.status.lock().state == CaptureState::Capturing
    }

    /// True while a session is waiting for audio or capturing.
    pub fn is_active(&self) -> bool {
        matches!(
            self.status.lock().state,
            CaptureState::Starting | CaptureState::Capturing
        )
    }

    /// Starts a capture session without waiting for audio.
    ///
    /// The worker is `Starting` until the first block lands. Call
    /// `poll_startup` to find out whether it did in time. The ring buffer is
    /// reset to zero just before that first block is pushed, so a session
    /// that never delivers audio leaves it untouched.
    ///
    /// # Errors
    /// - `InvalidParameter` for a zero sample rate or block size
    /// - `AlreadyCapturing` if a session is starting or running
    /// - `DeviceUnavailable` if the source cannot be opened
    pub fn start(&mut self, device_id: &str, sample_rate: u32, block_size: usize) -> Result<()> {
        let request = CaptureRequest::new(device_id, sample_rate, block_size)?;

        self.reap_finished();
        if self.session.is_some() {
            return Err(VizError::AlreadyCapturing);
        }

        let stream = self.source.open(&request)?;
        let control = Arc::clone(&stream.control);
        let cancel = Arc::new(AtomicBool::new(false));
        let (started_tx, started_rx) = mpsc::sync_channel(1);

        let loop_ctx = ReadLoop {
            reader: stream.reader,
            control: Arc::clone(&control),
            buffer: Arc::clone(&self.buffer),
            status: Arc::clone(&self.status),
            cancel: Arc::clone(&cancel),
            block_bytes: request.block_bytes(),
            device_id: request.device_id.clone(),
        };

        // Set before the thread exists so its first block cannot be overwritten.
        self.status.lock().state = CaptureState::Starting;

        let handle = match std::thread::Builder::new()
            .name("capture".to_string())
            .spawn(move || loop_ctx.run(started_tx))
        {
            Ok(handle) => handle,
            Err(e) => {
                control.terminate();
                self.status.lock().state = CaptureState::Idle;
                return Err(VizError::Io(e));
            }
        };

        tracing::debug!(
            "Capture thread spawned for {}, waiting up to {:?} for audio",
            request.device_id,
            self.startup_timeout
        );
        self.session = Some(Session {
            handle,
            cancel,
            control,
            startup: Some(Startup {
                started: started_rx,
                deadline: Instant::now() + self.startup_timeout,
                request,
            }),
        });
        Ok(())
    }

    /// Settles a pending start without blocking.
    ///
    /// Returns `None` while no session is starting or the first block is
    /// still inside its deadline. Otherwise returns the outcome exactly once:
    /// `Ok` when audio arrived, or `DeviceUnavailable` after the session was
    /// torn down (source closed early, or silent past `now`'s deadline).
    pub fn poll_startup(&mut self, now: Instant) -> Option<Result<()>> {
        let startup = self.session.as_ref()?.startup.as_ref()?;
        let expired = now >= startup.deadline;
        let received = match startup.started.try_recv() {
            Ok(result) => result,
            Err(TryRecvError::Disconnected) => Err(VizError::DeviceUnavailable(format!(
                "{}: capture thread exited before delivering audio",
                startup.request.device_id
            ))),
            Err(TryRecvError::Empty) if expired => return Some(self.expire_startup()),
            Err(TryRecvError::Empty) => return None,
        };
        Some(self.settle_startup(received))
    }

    fn settle_startup(&mut self, received: Result<()>) -> Result<()> {
        match received {
            Ok(()) => {
                if let Some(startup) = self.session.as_mut().and_then(|s| s.startup.take()) {
                    let request = startup.request;
                    tracing::info!(
                        "Capture started: device={}, sample_rate={}Hz, block_size={}",
                        request.device_id,
                        request.sample_rate,
                        request.block_size
                    );
                }
                Ok(())
            }
            Err(e) => {
                if let Some(session) = self.session.take() {
                    session.control.terminate();
                    let _ = session.handle.join();
                }
                self.status.lock().state = CaptureState::Idle;
                tracing::error!("Capture failed to start: {}", e);
                Err(e)
            }
        }
    }

    /// Tears down a session whose first block did not arrive in time.
    fn expire_startup(&mut self) -> Result<()> {
        // Cancellation is stored under the status lock, the same lock the
        // read loop holds while it resets the buffer for a first block.
        let expired = {
            let status = self.status.lock();
            if status.state == CaptureState::Capturing {
                None
            } else {
                let session = self.session.take();
                if let Some(session) = &session {
                    session.cancel.store(true, Ordering::SeqCst);
                }
                session
            }
        };
        let Some(session) = expired else {
            // The first block landed just before the deadline check.
            return self.settle_startup(Ok(()));
        };

        session.control.terminate();
        let _ = session.handle.join();
        self.status.lock().state = CaptureState::Idle;

        let detail = session
            .control
            .diagnostics()
            .unwrap_or_else(|| "no audio received".to_string());
        let device_id = session
            .startup
            .map(|startup| startup.request.device_id)
            .unwrap_or_default();
        tracing::error!(
            "Capture did not deliver audio within {:?}: {}",
            self.startup_timeout,
            detail
        );
        Err(VizError::DeviceUnavailable(format!(
            "no audio from '{device_id}' within {} ms: {detail}",
            self.startup_timeout.as_millis()
        )))
    }

    /// Stops the running or starting session, if any.
    ///
    /// The source is terminated and the read thread joined before this
    /// returns. Calling `stop` while idle is a no-op.
    pub fn stop(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };

        {
            let mut status = self.status.lock();
            if status.state == CaptureState::Capturing {
                status.state = CaptureState::Stopping;
            }
            // No first block can reset the buffer after this store.
            session.cancel.store(true, Ordering::SeqCst);
        }

        session.control.terminate();
        let joined = session.handle.join();

        let mut status = self.status.lock();
        if joined.is_err() {
            tracing::error!("Capture thread panicked");
            status.last_exit = Some(CaptureExit::Failed("capture thread panicked".to_string()));
        }
        status.state = CaptureState::Idle;
        tracing::info!("Capture stopped");
    }

    /// Joins a session whose read loop already ended on its own.
    fn reap_finished(&mut self) {
        // The loop marks the status idle as its last act, so an idle status
        // with a live session means the thread is exiting.
        let ended = self.status.lock().state == CaptureState::Idle;
        if self
            .session
            .as_ref()
            .is_some_and(|session| ended || session.handle.is_finished())
        {
            if let Some(session) = self.session.take() {
                let _ = session.handle.join();
            }
            let mut status = self.status.lock();
            if status.state == CaptureState::Starting {
                status.state = CaptureState::Idle;
            }
        }
    }
}

impl<S: CaptureSource> Drop for CaptureWorker<S> {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Everything the read thread owns.
struct ReadLoop {
    reader: Box<dyn Read + Send>,
    control: Arc<dyn StreamControl>,
    buffer: Arc<RingBuffer>,
    status: Arc<Mutex<CaptureStatus>>,
    cancel: Arc<AtomicBool>,
    block_bytes: usize,
    device_id: String,
}

impl ReadLoop {
    fn run(mut self, started: mpsc::SyncSender<Result<()>>) {
        let mut block = vec![0u8; self.block_bytes];
        let mut started = Some(started);

        let exit = loop {
            let result = read_chunk(self.reader.as_mut(), &mut block);
            if self.cancel.load(Ordering::SeqCst) {
                break CaptureExit::Stopped;
            }
            let chunk = match result {
                Ok(chunk) => chunk,
                Err(VizError::StreamEnded) => break CaptureExit::StreamEnded,
                Err(e) => break CaptureExit::Failed(e.to_string()),
            };

            if started.is_some() {
                {
                    let mut status = self.status.lock();
                    if self.cancel.load(Ordering::SeqCst) {
                        break CaptureExit::Stopped;
                    }
                    self.buffer.reset();
                    self.buffer.push(&chunk);
                    status.state = CaptureState::Capturing;
                    status.device_id = Some(self.device_id.clone());
                    status.last_exit = None;
                }
                if let Some(tx) = started.take() {
                    if tx.send(Ok(())).is_err() {
                        break CaptureExit::Stopped;
                    }
                }
                continue;
            }

            self.buffer.push(&chunk);
        };

        self.control.terminate();

        if let Some(tx) = started {
            let detail = self
                .control
                .diagnostics()
                .unwrap_or_else(|| match &exit {
                    CaptureExit::Failed(reason) => reason.clone(),
                    CaptureExit::Stopped => "capture cancelled before audio arrived".to_string(),
                    CaptureExit::StreamEnded => {
                        "capture source closed before delivering audio".to_string()
                    }
                });
            let _ = tx.send(Err(VizError::DeviceUnavailable(format!(
                "{}: {detail}",
                self.device_id
            ))));
            return;
        }

        tracing::info!(
            "Capture session on {} ended after {} samples",
            self.device_id,
            self.buffer.total_written()
        );
        match &exit {
            CaptureExit::StreamEnded => tracing::warn!("Capture stream ended: {}", self.device_id),
            CaptureExit::Failed(reason) => tracing::error!("Capture read failed: {}", reason),
            CaptureExit::Stopped => tracing::debug!("Capture loop cancelled"),
        }

        let mut status = self.status.lock();
        status.state = CaptureState::Idle;
        status.last_exit = Some(exit);
    }
}
