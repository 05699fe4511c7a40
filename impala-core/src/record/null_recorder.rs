use super::{AggregateRecorder, Record, Recorder};

/// A recorder that discards any record. Used as the default sink and in tests.
#[derive(Debug, Default)]
pub struct NullRecorder {}

impl NullRecorder {
    /// Creates a new [`NullRecorder`].
    pub fn new() -> Self {
        Self {}
    }
}

impl Recorder for NullRecorder {
    fn write(&mut self, _record: Record) {}
}

impl AggregateRecorder for NullRecorder {
    fn store(&mut self, _record: Record) {}

    fn flush(&mut self, _step: i64) {}
}
