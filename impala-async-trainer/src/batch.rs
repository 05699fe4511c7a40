//! Batch types handed from predictors/trainers to the Coordinator.
use crate::parking::{ActorPark, WorkerPark};
use impala_core::Env;
use std::sync::{Arc, Condvar, Mutex};

/// One actor's pending prediction request, as seen by a predictor.
///
/// `obs` is a raw pointer into the submitting actor's own stack frame
/// rather than an owned value: the actor parks on `actor` immediately
/// after pushing this entry and does not touch (or drop) its local
/// observation again until it wakes, and it only wakes after the
/// Coordinator has finished the predict call that consumed this
/// entry's batch — by which point the predictor that built that batch
/// has already copied out of `obs` via [`Env::make_batch`]. The
/// pointer is therefore valid for the entirety of this entry's
/// lifetime in the queue. This is the `unsafe` lifetime erasure this
/// crate allows at exactly this one site; see the crate-level design
/// notes.
pub(crate) struct PredictionEntry<O, Act> {
    obs: *const O,
    actor: Arc<ActorPark<Act>>,
}

// SAFETY: see the struct-level comment: `obs` outlives this entry by
// construction of the actor/predictor/coordinator handoff protocol.
unsafe impl<O, Act> Send for PredictionEntry<O, Act> {}

impl<O, Act> PredictionEntry<O, Act> {
    /// # Safety
    ///
    /// The caller must only call this while the actor that created
    /// `obs` remains parked waiting for its prediction result, i.e.
    /// strictly between this entry being pushed and the Coordinator
    /// delivering that actor's result.
    pub(crate) unsafe fn new(obs: &O, actor: Arc<ActorPark<Act>>) -> Self {
        Self { obs: obs as *const O, actor }
    }

    pub(crate) fn actor(&self) -> &Arc<ActorPark<Act>> {
        &self.actor
    }

    /// Dereferences the observation this entry was constructed with.
    ///
    /// # Safety
    ///
    /// Only sound while the owning actor is still parked; see
    /// [`PredictionEntry`]'s struct-level documentation.
    pub(crate) unsafe fn obs(&self) -> &O {
        &*self.obs
    }
}

/// A batch of observations ready for `Model::predict`, plus the
/// actors awaiting a result and a back-reference to the predictor that
/// assembled it.
pub struct PredictionBatch<E: Env> {
    /// The dense, environment-specific input built by `Env::make_batch`.
    pub states: E::ObsBatch,
    /// The actors that submitted each row of `states`, in order.
    pub(crate) agents: Vec<Arc<ActorPark<E::Act>>>,
    pub(crate) predictor: Arc<WorkerPark>,
}

/// A rectangular `(T_MAX+1, B)` batch ready for `Model::train`.
pub struct TrainingBatch<E: Env> {
    /// The dense, time-major observation batch, shape `(T_MAX+1, B)`.
    pub states: E::ObsBatch,
    /// Flat `T_MAX * B` time-major action ids, zero-padded.
    pub actions: Vec<i64>,
    /// Flat `T_MAX * B` time-major rewards, zero-padded.
    pub rewards: Vec<E::Reward>,
    /// Flat `T_MAX * B` time-major behaviour-policy probabilities, zero-padded.
    pub policies: Vec<f32>,
    /// `data_sizes[i]` = number of fragments whose action row at step `i` is valid.
    pub data_sizes: Vec<i64>,
    /// `observation_sizes[i]` = number of fragments whose observation row at step `i` is present.
    pub observation_sizes: Vec<i64>,
    pub(crate) trainer: Arc<WorkerPark>,
}

/// The Coordinator's two inboxes: completed prediction and training
/// batches, guarded by one mutex and one condvar (`server_event`).
pub(crate) struct BatchSink<E: Env> {
    state: Mutex<BatchSinkState<E>>,
    cond: Condvar,
}

struct BatchSinkState<E: Env> {
    predictions: Vec<PredictionBatch<E>>,
    trainings: Vec<TrainingBatch<E>>,
}

impl<E: Env> BatchSink<E> {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(BatchSinkState {
                predictions: Vec::new(),
                trainings: Vec::new(),
            }),
            cond: Condvar::new(),
        }
    }

    pub(crate) fn push_prediction(&self, batch: PredictionBatch<E>) {
        let mut s = self.state.lock().unwrap();
        s.predictions.push(batch);
        drop(s);
        self.cond.notify_one();
    }

    pub(crate) fn push_training(&self, batch: TrainingBatch<E>) {
        let mut s = self.state.lock().unwrap();
        s.trainings.push(batch);
        drop(s);
        self.cond.notify_one();
    }

    /// Waits until either bin is non-empty, then swaps both out locally.
    pub(crate) fn wait_and_swap(&self) -> (Vec<PredictionBatch<E>>, Vec<TrainingBatch<E>>) {
        let guard = self.state.lock().unwrap();
        let mut guard = self
            .cond
            .wait_while(guard, |s| s.predictions.is_empty() && s.trainings.is_empty())
            .unwrap();
        let predictions = std::mem::take(&mut guard.predictions);
        let trainings = std::mem::take(&mut guard.trainings);
        (predictions, trainings)
    }
}
