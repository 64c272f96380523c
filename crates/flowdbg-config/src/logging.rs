use std::collections::VecDeque;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Arc, Once, OnceLock};

use parking_lot::Mutex;
use tracing::Subscriber;
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt, TestWriter};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::prelude::*;

use crate::LoggingConfig;

/// Ring buffer of formatted log lines kept for diagnostics.
#[derive(Debug)]
pub struct LogBuffer {
    capacity: usize,
    lines: Mutex<VecDeque<String>>,
}

impl LogBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            lines: Mutex::new(VecDeque::with_capacity(capacity.min(1_024))),
        }
    }

    pub fn push_line(&self, line: String) {
        let mut lines = self.lines.lock();
        while lines.len() >= self.capacity {
            lines.pop_front();
        }
        lines.push_back(line);
    }

    /// The `n` most recent lines, oldest first.
    pub fn last_lines(&self, n: usize) -> Vec<String> {
        let lines = self.lines.lock();
        let skip = lines.len().saturating_sub(n);
        lines.iter().skip(skip).cloned().collect()
    }

    pub fn contents(&self) -> String {
        let lines = self.lines.lock();
        lines.iter().map(String::as_str).collect::<Vec<_>>().join("\n")
    }
}

/// `MakeWriter` feeding one formatted event at a time into a [`LogBuffer`].
struct BufferSink(Arc<LogBuffer>);

impl<'a> MakeWriter<'a> for BufferSink {
    type Writer = EventLines<'a>;

    fn make_writer(&'a self) -> Self::Writer {
        EventLines {
            buffer: &self.0,
            pending: Vec::new(),
        }
    }
}

/// Collects the bytes of one event and splits them into lines when dropped.
struct EventLines<'a> {
    buffer: &'a LogBuffer,
    pending: Vec<u8>,
}

impl Write for EventLines<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.pending.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for EventLines<'_> {
    fn drop(&mut self) {
        String::from_utf8_lossy(&self.pending)
            .lines()
            .filter(|line| !line.is_empty())
            .for_each(|line| self.buffer.push_line(line.to_owned()));
    }
}

/// A subscriber assembled from a [`LoggingConfig`] that has not been installed yet.
///
/// [`install`](Self::install) makes it the process-wide default; [`scoped`](Self::scoped)
/// only routes events emitted by the calling thread while a closure runs.
pub struct TracingSetup {
    subscriber: Box<dyn Subscriber + Send + Sync>,
    buffer: Arc<LogBuffer>,
    file_error: Option<(PathBuf, io::Error)>,
}

impl TracingSetup {
    pub fn new(config: &LoggingConfig, buffer: Arc<LogBuffer>) -> Self {
        let mut file_error = None;
        let file = config.file.as_ref().and_then(|path| {
            match OpenOptions::new().create(true).append(true).open(path) {
                Ok(file) => Some(Arc::new(file)),
                Err(err) => {
                    file_error = Some((path.clone(), err));
                    None
                }
            }
        });

        let mut writer = BoxMakeWriter::new(BufferSink(Arc::clone(&buffer)));
        if config.stderr {
            // Debug builds go through `TestWriter` so `cargo test` captures the output.
            writer = if cfg!(debug_assertions) {
                BoxMakeWriter::new(writer.and(TestWriter::with_stderr))
            } else {
                BoxMakeWriter::new(writer.and(io::stderr))
            };
        }
        if let Some(file) = file {
            writer = BoxMakeWriter::new(writer.and(file));
        }

        let fmt = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(writer);
        let layer = if config.json {
            fmt.json().boxed()
        } else {
            fmt.boxed()
        };

        Self {
            subscriber: Box::new(
                tracing_subscriber::registry()
                    .with(config.env_filter())
                    .with(layer),
            ),
            buffer,
            file_error,
        }
    }

    pub fn buffer(&self) -> &Arc<LogBuffer> {
        &self.buffer
    }

    /// The log file that could not be opened, if any. The other sinks stay active.
    pub fn file_error(&self) -> Option<&io::Error> {
        self.file_error.as_ref().map(|(_, err)| err)
    }

    /// Install as the global default subscriber.
    ///
    /// Returns `false` if another global subscriber was already set.
    pub fn install(self) -> bool {
        let Self {
            subscriber,
            file_error,
            ..
        } = self;
        let installed = tracing::subscriber::set_global_default(subscriber).is_ok();
        if installed {
            report_file_error(file_error.as_ref());
        }
        installed
    }

    /// Run `f` with this subscriber as the calling thread's default.
    pub fn scoped<T>(self, f: impl FnOnce() -> T) -> T {
        let Self {
            subscriber,
            file_error,
            ..
        } = self;
        tracing::subscriber::with_default(subscriber, || {
            report_file_error(file_error.as_ref());
            f()
        })
    }
}

fn report_file_error(file_error: Option<&(PathBuf, io::Error)>) {
    if let Some((path, err)) = file_error {
        tracing::warn!(
            target: "flowdbg.config",
            path = %path.display(),
            error = %err,
            "failed to open log file; file logging is disabled"
        );
    }
}

static TRACING_INIT: Once = Once::new();
static GLOBAL_LOG_BUFFER: OnceLock<Arc<LogBuffer>> = OnceLock::new();

/// The buffer behind the global subscriber, created on first use.
pub fn global_log_buffer() -> Arc<LogBuffer> {
    GLOBAL_LOG_BUFFER
        .get_or_init(|| Arc::new(LogBuffer::new(LoggingConfig::default_buffer_lines())))
        .clone()
}

/// Installs the global `tracing` subscriber described by `config`.
///
/// Only the first call installs anything; every call returns the global log buffer.
/// Debug sessions report through their own `tracing::Span`, so whichever subscriber is
/// installed here (or by the host application) receives their events.
pub fn init_tracing(config: &LoggingConfig) -> Arc<LogBuffer> {
    let buffer = GLOBAL_LOG_BUFFER
        .get_or_init(|| Arc::new(LogBuffer::new(config.buffer_lines)))
        .clone();

    TRACING_INIT.call_once(|| {
        TracingSetup::new(config, Arc::clone(&buffer)).install();
    });

    buffer
}
