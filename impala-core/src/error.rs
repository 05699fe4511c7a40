//! Error taxonomy.
//!
//! Configuration errors are recoverable — they are turned into an
//! [`ImpalaError`] and returned from `Server::build`. Everything else
//! in this enum corresponds to a runtime condition the scheduler
//! treats as fatal: the owning thread logs the error and aborts the
//! process rather than attempting to continue in a degraded state
//! (see the error-handling design notes for the rationale).
use thiserror::Error;

/// Errors raised while configuring or operating an IMPALA-style
/// actor-learner server.
#[derive(Debug, Error)]
pub enum ImpalaError {
    /// A [`ServerConfig`](crate::ServerConfig) violated one of its invariants
    /// (e.g. `min > max`, a zero worker count, or `t_max == 0`).
    #[error("invalid server configuration: {0}")]
    InvalidConfig(String),

    /// `Model::predict` returned a result vector whose length did not
    /// match the number of agents in the batch.
    #[error("model returned {got} predictions for a batch of {expected} agents")]
    PredictionArityMismatch {
        /// The batch's agent count.
        expected: usize,
        /// The length of the vector the model actually returned.
        got: usize,
    },

    /// `Model::predict` returned an action id outside `[0, num_actions)`.
    #[error("model predicted out-of-range action id {id} (num_actions = {num_actions})")]
    ActionIdOutOfRange {
        /// The out-of-range id the model returned.
        id: i64,
        /// The action set size the id was checked against.
        num_actions: i64,
    },

    /// `Env::step` or `Env::reset` failed.
    #[error("environment step failed: {0}")]
    Environment(#[source] anyhow::Error),

    /// `Model::predict`, `Model::train` or `Model::save` failed.
    #[error("model call failed: {0}")]
    Model(#[source] anyhow::Error),
}

/// Convenience alias for this crate's error type.
pub type Result<T> = std::result::Result<T, ImpalaError>;
