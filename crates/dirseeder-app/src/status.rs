//! Periodic status lines for every active task.

use std::io::{self, Write};
use std::panic::{self, AssertUnwindSafe};
use std::time::Duration;

use dirseeder_core::{ContinuationRequest, DEFAULT_STATUS_INTERVAL, StatusCallback, TaskStatus};
use tracing::debug;

/// Line emitted in place of a status that could not be rendered.
pub const FALLBACK_LINE: &str = "<unrenderable status>";

/// Destination for rendered status lines.
pub trait LineSink: Send + Sync {
    /// Write one line; the sink appends the terminator.
    ///
    /// # Errors
    ///
    /// Returns the underlying IO error when the line cannot be written.
    fn write_line(&self, line: &str) -> io::Result<()>;
}

/// Writes lines to standard error.
#[derive(Debug, Clone, Copy, Default)]
pub struct StderrSink;

impl LineSink for StderrSink {
    fn write_line(&self, line: &str) -> io::Result<()> {
        let mut stderr = io::stderr().lock();
        writeln!(stderr, "{line}")
    }
}

/// Status callback printing one line per task snapshot.
#[derive(Debug)]
pub struct StatusAggregator<S = StderrSink> {
    sink: S,
    interval: Duration,
}

impl StatusAggregator<StderrSink> {
    /// Aggregator writing to standard error at `interval`.
    #[must_use]
    pub const fn new(interval: Duration) -> Self {
        Self::with_sink(StderrSink, interval)
    }
}

impl Default for StatusAggregator<StderrSink> {
    fn default() -> Self {
        Self::new(DEFAULT_STATUS_INTERVAL)
    }
}

impl<S: LineSink> StatusAggregator<S> {
    /// Aggregator writing to `sink` at `interval`.
    #[must_use]
    pub const fn with_sink(sink: S, interval: Duration) -> Self {
        Self { sink, interval }
    }

    /// Interval requested after every invocation.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    fn emit(&self, status: &TaskStatus) {
        let line = panic::catch_unwind(AssertUnwindSafe(|| render_line(status)))
            .unwrap_or_else(|_| FALLBACK_LINE.to_string());
        if let Err(err) = self.sink.write_line(&line) {
            debug!(error = %err, task_id = %status.id, "status line dropped");
        }
    }
}

impl<S: LineSink> StatusCallback for StatusAggregator<S> {
    fn on_status(&self, snapshots: &[TaskStatus]) -> ContinuationRequest {
        for status in snapshots {
            self.emit(status);
        }
        ContinuationRequest::keep_polling(self.interval)
    }
}

/// Render `status` as
/// `<name> <state> <progress>% [error=<text> ]up <rate>KB/s down <rate>KB/s`.
#[must_use]
pub fn render_line(status: &TaskStatus) -> String {
    let name = sanitize(&status.name);
    let name = if name.is_empty() {
        "<unnamed>".to_string()
    } else {
        name
    };
    let error = status
        .error
        .as_deref()
        .map(|text| format!("error={} ", sanitize(text)))
        .unwrap_or_default();
    format!(
        "{name} {state} {progress:6.2}% {error}up {up:8.2}KB/s down {down:8.2}KB/s",
        state = status.state,
        progress = percent(status.progress),
        up = finite_or_zero(status.rates.upload_kib_per_sec()),
        down = finite_or_zero(status.rates.download_kib_per_sec()),
    )
}

fn sanitize(text: &str) -> String {
    text.chars()
        .map(|ch| if ch.is_control() { ' ' } else { ch })
        .collect()
}

fn percent(progress: f64) -> f64 {
    finite_or_zero(progress * 100.0).clamp(0.0, 100.0)
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dirseeder_core::{TaskRates, TaskState};
    use std::sync::Mutex;
    use uuid::Uuid;

    #[derive(Default)]
    struct RecordingSink {
        lines: Mutex<Vec<String>>,
    }

    impl RecordingSink {
        fn lines(&self) -> Vec<String> {
            self.lines.lock().expect("sink lock").clone()
        }
    }

    impl LineSink for &RecordingSink {
        fn write_line(&self, line: &str) -> io::Result<()> {
            self.lines.lock().expect("sink lock").push(line.to_string());
            Ok(())
        }
    }

    struct FailingSink {
        attempts: Mutex<usize>,
    }

    impl LineSink for &FailingSink {
        fn write_line(&self, _line: &str) -> io::Result<()> {
            *self.attempts.lock().expect("sink lock") += 1;
            Err(io::Error::other("closed"))
        }
    }

    fn status(name: &str, state: TaskState, progress: f64) -> TaskStatus {
        TaskStatus {
            id: Uuid::new_v4(),
            name: name.to_string(),
            state,
            progress,
            error: None,
            rates: TaskRates::default(),
        }
    }

    #[test]
    fn renders_fixed_width_fields() {
        let mut snapshot = status("ubuntu.iso", TaskState::Seeding, 1.0);
        snapshot.rates = TaskRates {
            upload_bps: 2048,
            download_bps: 0,
        };
        assert_eq!(
            render_line(&snapshot),
            "ubuntu.iso seeding 100.00% up     2.00KB/s down     0.00KB/s"
        );
    }

    #[test]
    fn renders_error_and_sanitises_text() {
        let mut snapshot = status("bad\tname\n", TaskState::Error, 0.256);
        snapshot.error = Some("disk\nfull".to_string());
        assert_eq!(
            render_line(&snapshot),
            "bad name  error  25.60% error=disk full up     0.00KB/s down     0.00KB/s"
        );
    }

    #[test]
    fn clamps_unusual_progress_and_names() {
        let render = |progress| render_line(&status("", TaskState::Queued, progress));
        assert!(render(f64::NAN).starts_with("<unnamed> queued   0.00% "));
        assert!(render(f64::INFINITY).starts_with("<unnamed> queued   0.00% "));
        assert!(render(-3.0).starts_with("<unnamed> queued   0.00% "));
        assert!(render(7.5).starts_with("<unnamed> queued 100.00% "));
    }

    #[test]
    fn one_line_per_snapshot_and_always_continues() {
        let interval = Duration::from_millis(250);
        for count in [0_usize, 1, 5] {
            let sink = RecordingSink::default();
            let aggregator = StatusAggregator::with_sink(&sink, interval);
            let snapshots: Vec<_> = (0..count)
                .map(|idx| status(&format!("task-{idx}"), TaskState::Downloading, 0.5))
                .collect();

            let request = aggregator.on_status(&snapshots);
            assert_eq!(request, ContinuationRequest::keep_polling(interval));
            assert_eq!(sink.lines().len(), count);
        }
    }

    #[test]
    fn sink_failures_do_not_stop_remaining_lines() {
        let sink = FailingSink {
            attempts: Mutex::new(0),
        };
        let aggregator = StatusAggregator::with_sink(&sink, DEFAULT_STATUS_INTERVAL);
        let snapshots = vec![
            status("a", TaskState::Seeding, 1.0),
            status("b", TaskState::Seeding, 1.0),
            status("c", TaskState::Seeding, 1.0),
        ];
        let request = aggregator.on_status(&snapshots);
        assert!(!request.stop);
        assert_eq!(*sink.attempts.lock().expect("sink lock"), 3);
    }

    #[test]
    fn default_aggregator_uses_default_interval() {
        assert_eq!(
            StatusAggregator::<StderrSink>::default().interval(),
            DEFAULT_STATUS_INTERVAL
        );
    }
}
