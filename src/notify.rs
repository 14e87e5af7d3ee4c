/// Severity of a user-facing notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

/// Sink for transient, dismissible user-facing notifications.
///
/// The core never prints; hosts decide how a failure surfaces. Malformed
/// stream records stay developer-log only and never reach this seam.
pub trait Notifier: Send + Sync + 'static {
    fn notify(&self, severity: Severity, title: &str, detail: &str);
}

/// Notifier that drops every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&self, _severity: Severity, _title: &str, _detail: &str) {}
}
