//! Completion notifications.
//!
//! A [`Notifier`] is poked when a query finishes, fails or times out, so a
//! person waiting on a long query gets a cue. It carries no payload and must
//! never block or fail.

use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Side-effect hook fired when a query run stops.
pub trait Notifier: Send + Sync {
    fn notify(&self);
}

/// Rings the terminal bell on stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct BellNotifier;

impl Notifier for BellNotifier {
    fn notify(&self) {
        let mut stderr = std::io::stderr();
        let _ = stderr.write_all(b"\x07");
        let _ = stderr.flush();
    }
}

/// Does nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify(&self) {}
}

/// Counts notifications; used by tests.
#[derive(Debug, Default)]
pub struct CountingNotifier {
    count: AtomicUsize,
}

impl CountingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

impl Notifier for CountingNotifier {
    fn notify(&self) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }
}

/// Picks the notifier for the `bell` setting.
pub fn from_setting(bell: bool) -> Arc<dyn Notifier> {
    if bell {
        Arc::new(BellNotifier)
    } else {
        Arc::new(NoopNotifier)
    }
}
