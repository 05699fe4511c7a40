//! The environment boundary consumed by the scheduler.
use std::fmt::Debug;

/// Status returned by [`Env::step`] at every transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvStatus {
    /// The episode has not terminated; the returned observation is the next step.
    Running,
    /// The episode terminated on this step.
    Finished,
}

impl EnvStatus {
    /// Returns `true` if the episode has finished.
    pub fn is_finished(self) -> bool {
        matches!(self, EnvStatus::Finished)
    }
}

/// An environment instance owned by exactly one [`Actor`](crate).
///
/// Implementors commonly wrap a simulator or a handle to an external
/// process. `reset`/`step` are synchronous and are always called from
/// the actor thread that owns this environment; no internal locking is
/// required.
pub trait Env {
    /// A deep-clonable snapshot of environment state.
    type Obs: Clone + Debug;
    /// A discrete action understood by the environment.
    type Act: Debug;
    /// The scalar reward type, usually `f32` or `f64`. `Into<f64>` lets
    /// the actor log a running episode-reward total without the
    /// scheduler needing to know the concrete type.
    type Reward: Clone + Default + Debug + Into<f64>;
    /// The dense, environment-specific batch representation consumed by the model.
    type ObsBatch;

    /// Starts a new episode and returns its initial observation.
    fn reset(&mut self) -> Self::Obs;

    /// Applies `act` and returns the resulting observation, reward and status.
    ///
    /// An `Err` return is fatal: per the error-handling design, the
    /// caller logs the failure and aborts the process. There is no
    /// retry path for a corrupt environment.
    fn step(&mut self, act: &Self::Act) -> anyhow::Result<(Self::Obs, Self::Reward, EnvStatus)>;

    /// Builds a dense batch from an ordered sequence of possibly-absent observations.
    ///
    /// A `None` slot must produce a zero-filled region in the batch at
    /// that position, so the model sees a consistent shape regardless
    /// of how many trailing rows are padding.
    fn make_batch<'a, I>(obs: I) -> Self::ObsBatch
    where
        Self::Obs: 'a,
        I: IntoIterator<Item = Option<&'a Self::Obs>>;
}
