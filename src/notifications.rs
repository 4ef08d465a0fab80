use std::sync::Mutex;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::config::NotificationConfig;
use crate::core::{RiskLevel, RiskVerdict};

/// Desktop notification sender with cooldown to prevent spam.
///
/// Notifications are shown from background threads. Short-lived callers
/// must call [`Notifier::wait_pending`] before exiting or the process may
/// end before the notification reaches the desktop.
pub struct Notifier {
    enabled: bool,
    min_level: RiskLevel,
    cooldown: Duration,
    last_sent: Mutex<Option<Instant>>,
    pending: Mutex<Vec<JoinHandle<()>>>,
}

impl Notifier {
    pub fn new(config: &NotificationConfig) -> Self {
        Self {
            enabled: config.enabled,
            min_level: config.min_level,
            cooldown: Duration::from_secs(config.cooldown_seconds),
            last_sent: Mutex::new(None),
            pending: Mutex::new(Vec::new()),
        }
    }

    /// Try to send a desktop notification for a verdict about `subject`.
    /// Returns true if a notification was sent, false if skipped.
    pub fn notify(&self, subject: &str, verdict: &RiskVerdict) -> bool {
        if !self.enabled {
            return false;
        }
        if verdict.risk_level < self.min_level {
            return false;
        }
        if !self.check_cooldown() {
            return false;
        }

        self.send_notification(subject, verdict);
        true
    }

    /// Block until every notification sent so far has been handed to the
    /// desktop. Returns how many were waited on.
    pub fn wait_pending(&self) -> usize {
        let handles = std::mem::take(&mut *self.pending.lock().unwrap_or_else(|e| e.into_inner()));
        let count = handles.len();
        for handle in handles {
            if handle.join().is_err() {
                tracing::warn!("Desktop notification thread panicked");
            }
        }
        count
    }

    fn track(&self, handle: JoinHandle<()>) {
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        pending.retain(|h| !h.is_finished());
        pending.push(handle);
    }

    /// Check and update cooldown. Returns true if enough time has passed.
    fn check_cooldown(&self) -> bool {
        let mut last = self.last_sent.lock().unwrap_or_else(|e| e.into_inner());
        let now = Instant::now();
        if let Some(prev) = *last {
            if now.duration_since(prev) < self.cooldown {
                return false;
            }
        }
        *last = Some(now);
        true
    }

    /// Fire-and-forget: send the actual desktop notification.
    fn send_notification(&self, subject: &str, verdict: &RiskVerdict) {
        let title = format!("{} DengueRadar: {}", verdict.risk_level.emoji(), verdict.label);
        let mut body = format!("{} | {subject}", verdict.engine.as_str());
        if let Some(first) = verdict.recommendations.first() {
            body.push_str(" | ");
            body.push_str(first);
        }

        // Never block the caller on the desktop bus
        let handle = std::thread::spawn(move || {
            match notify_rust::Notification::new()
                .summary(&title)
                .body(&body)
                .show()
            {
                Ok(_) => tracing::debug!("Desktop notification shown: {title}"),
                Err(e) => tracing::warn!("Desktop notification failed: {e}"),
            }
        });
        self.track(handle);
    }
}
