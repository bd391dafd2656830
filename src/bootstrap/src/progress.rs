/// Progress reporting seam for the controller layer.
pub trait ProgressReporter: Send + Sync {
    fn emit(&self, percentage: u32, message: String);
}

/// Reporter that discards everything; the default when the caller does not
/// observe progress.
pub struct NoopProgressReporter;

impl ProgressReporter for NoopProgressReporter {
    fn emit(&self, _percentage: u32, _message: String) {}
}
