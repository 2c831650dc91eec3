/// Notification delivery seam for the reminder scheduler
///
/// The scheduler synthesizes payloads and hands them to a Notifier; it never
/// talks to a platform notification API directly. A platform without
/// notification capability (or without permission) reports unavailable and
/// the whole evaluation pass degrades to a silent no-op while the scheduler
/// keeps its state consistent.

use tracing::info;

/// A rendered reminder notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub body: String,
    /// Stable per-habit tag so repeated deliveries replace each other
    pub tag: String,
    /// Whether the notification should stay until dismissed
    pub require_interaction: bool,
}

/// Delivery side effect for reminder notifications
pub trait Notifier: Send + Sync {
    /// Whether the platform can deliver notifications right now
    ///
    /// Checked once at the top of each evaluation pass; enabling permission
    /// later resumes correct behavior without re-configuration.
    fn is_available(&self) -> bool;

    /// Deliver a notification; must not block
    fn notify(&self, notification: Notification);
}

/// Notifier that writes reminders to the log
///
/// Used by the CLI, where there is no platform notification surface.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn is_available(&self) -> bool {
        true
    }

    fn notify(&self, notification: Notification) {
        info!(tag = %notification.tag, "{}: {}", notification.title, notification.body);
    }
}
