use super::Record;

/// Writes a record to an output destination with [`Recorder::write`].
pub trait Recorder {
    /// Write a record to the [`Recorder`].
    fn write(&mut self, record: Record);
}

/// Stores records, then aggregates them and writes to an output destination.
///
/// Unlike [`Recorder`], an [`AggregateRecorder`] is expected to buffer
/// `store`d records and only emit aggregated output on `flush`, which
/// the Coordinator calls at the configured `log_interval_steps`
/// cadence rather than on every single training batch.
pub trait AggregateRecorder {
    /// Store the record.
    fn store(&mut self, record: Record);

    /// Writes values aggregated from the stored records, tagged with `step`.
    fn flush(&mut self, step: i64);
}
