/// How loud a user-facing message is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Progress or success.
    Info,
    /// Something was skipped; the batch carries on.
    Warning,
    /// The batch stopped.
    Error,
}

/// Sink for messages meant for the person who submitted the batch.
///
/// A GUI host would show these as dialogs or toasts; the CLI logs them.
pub trait Reporter {
    /// Deliver one message.
    fn report(&mut self, severity: Severity, message: &str);
}

/// Forwards reports to `tracing` at the matching level.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn report(&mut self, severity: Severity, message: &str) {
        match severity {
            Severity::Info => tracing::info!(target: "framestack::report", "{message}"),
            Severity::Warning => tracing::warn!(target: "framestack::report", "{message}"),
            Severity::Error => tracing::error!(target: "framestack::report", "{message}"),
        }
    }
}

/// Collects reports in memory, in delivery order.
impl Reporter for Vec<(Severity, String)> {
    fn report(&mut self, severity: Severity, message: &str) {
        self.push((severity, message.to_owned()));
    }
}

impl<R: Reporter + ?Sized> Reporter for &mut R {
    fn report(&mut self, severity: Severity, message: &str) {
        (**self).report(severity, message);
    }
}
