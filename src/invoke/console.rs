//! The process-wide console streams and their redirection.
//!
//! Target code writes its console output through [`stdout`] and [`stderr`]. Both return
//! whatever stream is currently installed: the real process streams normally, per-call
//! capture buffers while an invocation is running.
//!
//! Redirection changes process-global state, so it is tied to the single
//! [`InvocationPermit`]: an [`OutputRedirect`] can only be created from a permit and cannot
//! outlive it. Dropping the redirect (or calling [`OutputRedirect::finish`]) puts the
//! previous streams back exactly once, on every exit path including unwinding.

use std::{
    fmt,
    io::Write,
    sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError},
};

use crate::invoke::outcome::CapturedOutput;

static INVOCATION_LOCK: Mutex<()> = Mutex::new(());

/// Proof of holding the process-wide invocation lock.
///
/// At most one permit exists at any time. A second [`InvocationPermit::acquire`] waits until
/// the first permit is dropped.
pub struct InvocationPermit {
    _guard: MutexGuard<'static, ()>,
}

impl InvocationPermit {
    /// Waits for and takes the invocation lock.
    ///
    /// A lock poisoned by a panicking holder is taken over; the holder's redirect already put
    /// the console back while unwinding.
    #[must_use]
    pub fn acquire() -> Self {
        InvocationPermit {
            _guard: INVOCATION_LOCK
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        }
    }

    /// Takes the invocation lock if nobody holds it.
    #[must_use]
    pub fn try_acquire() -> Option<Self> {
        match INVOCATION_LOCK.try_lock() {
            Ok(guard) => Some(InvocationPermit { _guard: guard }),
            Err(std::sync::TryLockError::Poisoned(poisoned)) => Some(InvocationPermit {
                _guard: poisoned.into_inner(),
            }),
            Err(std::sync::TryLockError::WouldBlock) => None,
        }
    }
}

impl fmt::Debug for InvocationPermit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("InvocationPermit")
    }
}

#[derive(Debug, Default)]
struct CaptureBuffer {
    bytes: Vec<u8>,
    limit: usize,
    truncated: bool,
}

#[derive(Debug)]
enum Sink {
    ProcessStdout,
    ProcessStderr,
    Capture(Mutex<CaptureBuffer>),
}

/// A console stream. Clones refer to the same stream.
#[derive(Debug, Clone)]
pub struct ConsoleStream(Arc<Sink>);

impl ConsoleStream {
    /// A buffer keeping at most `limit` bytes.
    #[must_use]
    pub fn capture(limit: usize) -> Self {
        ConsoleStream(Arc::new(Sink::Capture(Mutex::new(CaptureBuffer {
            limit,
            ..CaptureBuffer::default()
        }))))
    }

    /// Writes raw bytes. Write failures of the process streams are ignored, like a console
    /// whose reader went away.
    pub fn write(&self, bytes: &[u8]) {
        match &*self.0 {
            Sink::ProcessStdout => {
                let _ = std::io::stdout().write_all(bytes);
            }
            Sink::ProcessStderr => {
                let _ = std::io::stderr().write_all(bytes);
            }
            Sink::Capture(buffer) => {
                let mut buffer = buffer.lock().unwrap_or_else(PoisonError::into_inner);
                let room = buffer.limit.saturating_sub(buffer.bytes.len());
                if bytes.len() > room {
                    buffer.truncated = true;
                }
                let kept = bytes.len().min(room);
                buffer.bytes.extend_from_slice(&bytes[..kept]);
            }
        }
    }

    /// Writes text.
    pub fn write_str(&self, text: &str) {
        self.write(text.as_bytes());
    }

    /// Writes text followed by a newline.
    pub fn write_line(&self, text: &str) {
        self.write_str(text);
        self.write(b"\n");
    }

    /// Whether both handles refer to the same stream.
    #[must_use]
    pub fn same_as(&self, other: &ConsoleStream) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// The text captured so far and whether anything was dropped. Process streams capture
    /// nothing.
    #[must_use]
    pub fn captured(&self) -> (String, bool) {
        match &*self.0 {
            Sink::Capture(buffer) => {
                let buffer = buffer.lock().unwrap_or_else(PoisonError::into_inner);
                (
                    String::from_utf8_lossy(&buffer.bytes).into_owned(),
                    buffer.truncated,
                )
            }
            Sink::ProcessStdout | Sink::ProcessStderr => (String::new(), false),
        }
    }
}

#[derive(Debug, Clone)]
struct Streams {
    stdout: ConsoleStream,
    stderr: ConsoleStream,
}

fn streams() -> MutexGuard<'static, Streams> {
    static STREAMS: OnceLock<Mutex<Streams>> = OnceLock::new();
    STREAMS
        .get_or_init(|| {
            Mutex::new(Streams {
                stdout: ConsoleStream(Arc::new(Sink::ProcessStdout)),
                stderr: ConsoleStream(Arc::new(Sink::ProcessStderr)),
            })
        })
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
}

/// The currently installed stdout.
#[must_use]
pub fn stdout() -> ConsoleStream {
    streams().stdout.clone()
}

/// The currently installed stderr.
#[must_use]
pub fn stderr() -> ConsoleStream {
    streams().stderr.clone()
}

/// Installs new console streams and returns the previous `(stdout, stderr)`.
pub fn replace_streams(
    _permit: &InvocationPermit,
    stdout: ConsoleStream,
    stderr: ConsoleStream,
) -> (ConsoleStream, ConsoleStream) {
    let mut current = streams();
    let previous = std::mem::replace(&mut *current, Streams { stdout, stderr });
    (previous.stdout, previous.stderr)
}

/// Console redirection into per-call capture buffers, scoped to one invocation.
///
/// ```rust
/// use dotprobe::invoke::console::{self, InvocationPermit, OutputRedirect};
///
/// let permit = InvocationPermit::acquire();
/// let before = console::stdout();
///
/// let redirect = OutputRedirect::install(&permit, 1024);
/// console::stdout().write_str("captured");
/// let output = redirect.finish();
///
/// assert_eq!(output.stdout, "captured");
/// assert!(console::stdout().same_as(&before));
/// ```
#[derive(Debug)]
pub struct OutputRedirect<'p> {
    permit: &'p InvocationPermit,
    stdout: ConsoleStream,
    stderr: ConsoleStream,
    previous: Option<(ConsoleStream, ConsoleStream)>,
}

impl<'p> OutputRedirect<'p> {
    /// Installs fresh capture buffers of `limit` bytes each.
    #[must_use]
    pub fn install(permit: &'p InvocationPermit, limit: usize) -> Self {
        let stdout = ConsoleStream::capture(limit);
        let stderr = ConsoleStream::capture(limit);
        let previous = replace_streams(permit, stdout.clone(), stderr.clone());

        OutputRedirect {
            permit,
            stdout,
            stderr,
            previous: Some(previous),
        }
    }

    /// Restores the previous streams and returns what was captured.
    #[must_use]
    pub fn finish(mut self) -> CapturedOutput {
        self.restore();

        let (stdout, out_truncated) = self.stdout.captured();
        let (stderr, err_truncated) = self.stderr.captured();
        CapturedOutput {
            stdout,
            stderr,
            truncated: out_truncated || err_truncated,
        }
    }

    fn restore(&mut self) {
        if let Some((stdout, stderr)) = self.previous.take() {
            let _ = replace_streams(self.permit, stdout, stderr);
        }
    }
}

impl Drop for OutputRedirect<'_> {
    fn drop(&mut self) {
        self.restore();
    }
}
