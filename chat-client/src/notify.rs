//! User notification sink.
//!
//! The engine never renders anything itself; every user-facing outcome is
//! pushed through a [`Notifier`] that the host application implements
//! (toast, banner, log line).

use std::sync::Mutex;

/// What kind of notice is being surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    /// An operation completed and the user should know.
    Success,
    /// An operation failed; state was left at its last-known-good value.
    Error,
}

/// Sink for transient user-facing notices.
pub trait Notifier: Send + Sync {
    /// Surface a notice to the user.
    fn notify(&self, kind: NoticeKind, text: &str);
}

/// Notifier that routes notices to the tracing subscriber.
#[derive(Debug, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, kind: NoticeKind, text: &str) {
        match kind {
            NoticeKind::Success => tracing::info!(notice = text, "notify"),
            NoticeKind::Error => tracing::warn!(notice = text, "notify"),
        }
    }
}

/// Notifier that records notices in memory, for tests.
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    notices: Mutex<Vec<(NoticeKind, String)>>,
}

impl MemoryNotifier {
    /// Create an empty recording notifier.
    pub fn new() -> Self {
        Self::default()
    }

    /// All notices recorded so far.
    pub fn notices(&self) -> Vec<(NoticeKind, String)> {
        self.notices.lock().unwrap().clone()
    }

    /// All error notices recorded so far.
    pub fn errors(&self) -> Vec<String> {
        self.notices
            .lock()
            .unwrap()
            .iter()
            .filter(|(kind, _)| *kind == NoticeKind::Error)
            .map(|(_, text)| text.clone())
            .collect()
    }
}

impl Notifier for MemoryNotifier {
    fn notify(&self, kind: NoticeKind, text: &str) {
        self.notices.lock().unwrap().push((kind, text.to_string()));
    }
}
