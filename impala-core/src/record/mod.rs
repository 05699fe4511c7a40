//! Ambient metrics recording.
//!
//! The Coordinator publishes loss/throughput scalars through an
//! [`AggregateRecorder`] so a host binary can plug in whatever metrics
//! sink it likes (stdout, a file, TensorBoard, ...) without the
//! scheduler depending on any of those concretely. [`NullRecorder`] is
//! the default no-op sink used by tests and by `Server` when no
//! recorder is configured.
mod null_recorder;
mod recorder;

pub use null_recorder::NullRecorder;
pub use recorder::{AggregateRecorder, Recorder};

use std::collections::HashMap;

/// A single scalar value stored in a [`Record`].
#[derive(Debug, Clone, PartialEq)]
pub enum RecordValue {
    /// A floating-point scalar, e.g. a loss or a reward.
    Scalar(f64),
    /// An integer scalar, e.g. a step count.
    Integer(i64),
    /// A free-form string, e.g. an episode outcome tag.
    String(String),
}

/// A named set of scalar values produced at one point in time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    values: HashMap<String, RecordValue>,
}

impl Record {
    /// Creates an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or overwrites a value under `key`.
    pub fn insert(&mut self, key: impl Into<String>, value: RecordValue) {
        self.values.insert(key.into(), value);
    }

    /// Builder-style variant of [`Record::insert`].
    pub fn with(mut self, key: impl Into<String>, value: RecordValue) -> Self {
        self.insert(key, value);
        self
    }

    /// Looks up a value by key.
    pub fn get(&self, key: &str) -> Option<&RecordValue> {
        self.values.get(key)
    }

    /// Iterates over the record's key/value pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &RecordValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}
