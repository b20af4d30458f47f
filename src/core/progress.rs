//! Progress events, percentage policy and the sinks that consume them.

use std::ops::{Deref, DerefMut};

use log::info;

use crate::core::format::format_mebibytes;

/// Percentage of `total` covered by `current`, in `[0, 100]`.
///
/// A zero total reports no progress instead of dividing. Providers that
/// overshoot because of chunk rounding are clamped to 100.
pub fn percentage(current: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let pct = (current as f64 / total as f64) * 100.0;
    pct.min(100.0)
}

/// Point-in-time report of bytes moved versus bytes expected
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressEvent {
    pub transferred_bytes: u64,
    pub total_bytes: u64,
    pub percentage: f64,
}

impl ProgressEvent {
    pub fn new(transferred_bytes: u64, total_bytes: u64) -> Self {
        Self {
            transferred_bytes,
            total_bytes,
            percentage: percentage(transferred_bytes, total_bytes),
        }
    }
}

/// Consumer of progress events.
///
/// Called once per observed chunk, which can be very often on large
/// transfers; implementations must not grow without bound per call.
/// `close` is idempotent and valid even if no event was delivered.
pub trait ProgressSink: Send {
    fn on_progress(&mut self, event: &ProgressEvent);

    fn close(&mut self);
}

impl<S: ProgressSink + ?Sized> ProgressSink for &mut S {
    fn on_progress(&mut self, event: &ProgressEvent) {
        (**self).on_progress(event)
    }

    fn close(&mut self) {
        (**self).close()
    }
}

impl<S: ProgressSink + ?Sized> ProgressSink for Box<S> {
    fn on_progress(&mut self, event: &ProgressEvent) {
        (**self).on_progress(event)
    }

    fn close(&mut self) {
        (**self).close()
    }
}

/// Sink that discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl ProgressSink for NullSink {
    fn on_progress(&mut self, _event: &ProgressEvent) {}

    fn close(&mut self) {}
}

/// Sink that forwards every event to a closure
pub struct CallbackSink<F>
where
    F: FnMut(&ProgressEvent) + Send,
{
    f: F,
    closed: bool,
}

impl<F> CallbackSink<F>
where
    F: FnMut(&ProgressEvent) + Send,
{
    pub fn new(f: F) -> Self {
        Self { f, closed: false }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl<F> ProgressSink for CallbackSink<F>
where
    F: FnMut(&ProgressEvent) + Send,
{
    fn on_progress(&mut self, event: &ProgressEvent) {
        if !self.closed {
            (self.f)(event)
        }
    }

    fn close(&mut self) {
        self.closed = true;
    }
}

/// Sink that writes a log line each time the whole percentage advances.
///
/// Emits at most 101 lines per transfer no matter how many chunks arrive.
pub struct LogSink {
    label: String,
    last_logged: Option<u8>,
    lines: usize,
    closed: bool,
}

impl LogSink {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            last_logged: None,
            lines: 0,
            closed: false,
        }
    }

    /// Number of progress lines written so far
    pub fn lines_written(&self) -> usize {
        self.lines
    }
}

impl ProgressSink for LogSink {
    fn on_progress(&mut self, event: &ProgressEvent) {
        if self.closed {
            return;
        }
        let whole = event.percentage.floor() as u8;
        if self.last_logged.is_some_and(|last| whole <= last) {
            return;
        }
        self.last_logged = Some(whole);
        self.lines += 1;
        info!(
            "{}: {whole}% ({} of {})",
            self.label,
            format_mebibytes(event.transferred_bytes),
            format_mebibytes(event.total_bytes)
        );
    }

    fn close(&mut self) {
        self.closed = true;
    }
}

/// Borrows a sink for the length of one transfer and closes it on drop,
/// so success, error and early-return paths all release it exactly once.
pub struct SinkGuard<'a, S: ProgressSink + ?Sized> {
    sink: &'a mut S,
}

impl<'a, S: ProgressSink + ?Sized> SinkGuard<'a, S> {
    pub fn new(sink: &'a mut S) -> Self {
        Self { sink }
    }
}

impl<S: ProgressSink + ?Sized> Deref for SinkGuard<'_, S> {
    type Target = S;

    fn deref(&self) -> &S {
        self.sink
    }
}

impl<S: ProgressSink + ?Sized> DerefMut for SinkGuard<'_, S> {
    fn deref_mut(&mut self) -> &mut S {
        self.sink
    }
}

impl<S: ProgressSink + ?Sized> Drop for SinkGuard<'_, S> {
    fn drop(&mut self) {
        self.sink.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentage_zero_total() {
        assert_eq!(percentage(0, 0), 0.0);
        assert_eq!(percentage(12345, 0), 0.0);
    }

    #[test]
    fn test_percentage_full_and_partial() {
        assert_eq!(percentage(100, 100), 100.0);
        assert_eq!(percentage(81920, 81920), 100.0);
        assert_eq!(percentage(50, 200), 25.0);
        assert_eq!(percentage(0, 7), 0.0);
    }

    #[test]
    fn test_percentage_clamps_overshoot() {
        assert_eq!(percentage(101, 100), 100.0);
        assert_eq!(percentage(u64::MAX, 1), 100.0);
    }

    #[test]
    fn test_percentage_monotonic() {
        for total in [1u64, 3, 7, 1000, 81921] {
            let mut previous = 0.0;
            for current in 0..=total.min(2000) {
                let pct = percentage(current, total);
                assert!(pct >= previous, "{current}/{total} went backwards");
                assert!((0.0..=100.0).contains(&pct));
                previous = pct;
            }
        }
    }

    #[test]
    fn test_callback_sink_close_is_idempotent() {
        let mut seen = Vec::new();
        {
            let mut sink = CallbackSink::new(|e: &ProgressEvent| seen.push(e.transferred_bytes));
            sink.on_progress(&ProgressEvent::new(10, 20));
            sink.close();
            sink.close();
            assert!(sink.is_closed());
            sink.on_progress(&ProgressEvent::new(20, 20));
        }
        assert_eq!(seen, vec![10]);
    }

    #[test]
    fn test_log_sink_is_bounded() {
        let mut sink = LogSink::new("download big.iso");
        let total = 10 * 1024 * 1024;
        for transferred in (0..=total).step_by(1024) {
            sink.on_progress(&ProgressEvent::new(transferred, total));
        }
        assert!(sink.lines_written() <= 101);
        assert_eq!(sink.lines_written(), 101);
        sink.close();
        sink.close();
    }

    #[test]
    fn test_sink_guard_closes_on_drop() {
        let mut sink = CallbackSink::new(|_: &ProgressEvent| {});
        {
            let mut guard = SinkGuard::new(&mut sink);
            guard.on_progress(&ProgressEvent::new(1, 2));
        }
        assert!(sink.is_closed());
    }
}
