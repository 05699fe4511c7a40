//! The predictor: batches pending actor observations for inference.
use crate::{
    batch::{BatchSink, PredictionBatch, PredictionEntry},
    parking::WorkerPark,
    queue::SharedQueue,
};
use impala_core::Env;
use std::sync::Arc;

/// Drains [`PredictionEntry`](crate::batch::PredictionEntry)s off the
/// shared prediction queue, assembles a dense batch via
/// [`Env::make_batch`] and hands it to the Coordinator.
pub(crate) struct Predictor<E: Env> {
    pub(crate) id: usize,
    pub(crate) queue: Arc<SharedQueue<PredictionEntry<E::Obs, E::Act>>>,
    pub(crate) sink: Arc<BatchSink<E>>,
    pub(crate) park: Arc<WorkerPark>,
    pub(crate) min_batch: usize,
    pub(crate) max_batch: usize,
}

impl<E: Env> Predictor<E> {
    pub(crate) fn run(self) {
        loop {
            let exit = self.park.exit_flag();
            let (entries, remaining) = self.queue.wait_and_drain(self.min_batch, self.max_batch, exit);
            if entries.is_empty() {
                debug_assert!(exit.load(std::sync::atomic::Ordering::Acquire));
                return;
            }

            if remaining >= self.min_batch {
                self.queue.notify_one();
            }

            // SAFETY: every entry's submitting actor is still parked in
            // `wait_for_result`, waiting on exactly the `ActorPark` this
            // entry references, so its observation is still valid.
            let obs_refs: Vec<Option<&E::Obs>> =
                entries.iter().map(|e| Some(unsafe { e.obs() })).collect();
            let states = E::make_batch(obs_refs);
            let agents = entries.iter().map(|e| Arc::clone(e.actor())).collect();

            self.park.begin_processing();
            self.sink.push_prediction(PredictionBatch {
                states,
                agents,
                predictor: Arc::clone(&self.park),
            });

            if !self.park.wait_until_finished() {
                log::debug!("predictor {}: exiting after final batch", self.id);
                return;
            }
        }
    }
}
