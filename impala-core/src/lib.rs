#![warn(missing_docs)]
//! Core traits and data types for an IMPALA-style actor-learner runtime.
//!
//! This crate defines the collaborator-facing boundary consumed by the
//! concurrent batching scheduler in `impala-async-trainer`: the
//! [`Env`], [`DiscreteAction`] and [`Model`] traits, the [`Fragment`]
//! trajectory type, the [`ServerConfig`] record, and the ambient
//! logging/recording and error-handling infrastructure shared by both
//! crates.
pub mod action;
pub mod config;
pub mod env;
pub mod error;
pub mod fragment;
pub mod model;
pub mod record;
pub mod testing;

pub use action::DiscreteAction;
pub use config::ServerConfig;
pub use env::{Env, EnvStatus};
pub use error::{ImpalaError, Result};
pub use fragment::Fragment;
pub use model::{LossStats, Model};
pub use record::{AggregateRecorder, NullRecorder, Record, RecordValue, Recorder};
