//! User-facing failure notifications.

use std::sync::{Arc, Mutex};

/// Sink for failure messages shown to the user.
///
/// The engine calls it for every caught store error and never on success.
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str);
}

/// Reports failures through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, message: &str) {
        tracing::warn!("{}", message);
    }
}

/// Keeps every message for later display.
#[derive(Debug, Clone, Default)]
pub struct CollectingNotifier {
    messages: Arc<Mutex<Vec<String>>>,
}

impl CollectingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .map(|messages| messages.clone())
            .unwrap_or_default()
    }

    /// Remove and return all collected messages.
    pub fn drain(&self) -> Vec<String> {
        self.messages
            .lock()
            .map(|mut messages| std::mem::take(&mut *messages))
            .unwrap_or_default()
    }
}

impl Notifier for CollectingNotifier {
    fn notify(&self, message: &str) {
        tracing::debug!("notify: {}", message);
        if let Ok(mut messages) = self.messages.lock() {
            messages.push(message.to_string());
        }
    }
}
