//! The model boundary consumed exclusively by the Coordinator thread.
use crate::env::Env;

/// The three scalar losses reported by [`Model::train`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LossStats {
    /// Value-function loss.
    pub v_loss: f64,
    /// Policy-gradient loss.
    pub pi_loss: f64,
    /// Entropy regularisation loss.
    pub entropy_loss: f64,
}

/// An opaque policy/value network, touched only by the Coordinator.
///
/// Implementors are expected to wrap an actual network and optimizer;
/// this crate never inspects their internals. `E` pins the model to
/// the environment whose `ObsBatch`/`Reward` types it consumes.
pub trait Model<E: Env> {
    /// Runs inference over a batch of observations.
    ///
    /// Returns one `(action_id, policy_prob)` pair per row of `states`,
    /// in the same order. The scheduler treats a returned vector whose
    /// length does not match the batch size as a fatal
    /// `ImpalaError::PredictionArityMismatch`, and an out-of-range
    /// `action_id` as a fatal `ImpalaError::ActionIdOutOfRange`.
    fn predict(&mut self, states: &E::ObsBatch) -> anyhow::Result<Vec<(i64, f32)>>;

    /// Runs one optimization step over a rectangular training batch.
    ///
    /// `actions`, `rewards` and `policies` are flat `T_MAX * B`
    /// time-major vectors; `data_sizes`/`observation_sizes` give the
    /// valid-prefix length of each time-step, as assembled by the
    /// scheduler's trainer workers.
    #[allow(clippy::too_many_arguments)]
    fn train(
        &mut self,
        states: &E::ObsBatch,
        actions: &[i64],
        rewards: &[E::Reward],
        policies: &[f32],
        data_sizes: &[i64],
        observation_sizes: &[i64],
    ) -> anyhow::Result<LossStats>;

    /// Persists model parameters, tagged with the current `trained_steps` count.
    fn save(&mut self, step: u64) -> anyhow::Result<()>;
}
