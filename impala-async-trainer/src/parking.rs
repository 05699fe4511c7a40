//! Private per-worker parking cells.
//!
//! Every predictor, trainer and actor owns exactly one of these. The
//! protocol is identical across all three: a thread hands off a unit
//! of work, flips a "busy" bit under its own private lock, parks on
//! its own condvar until the bit is cleared by whoever consumes the
//! work (the Coordinator, for predictors/trainers) or an `exit` flag
//! is set. Re-check the predicate on every wake — spurious wakeups are
//! possible and `exit` can race with the busy bit clearing.
//!
//! `exit` is a plain [`AtomicBool`] rather than a field behind the
//! private mutex so that [`crate::queue::SharedQueue::wait_and_drain`]
//! can observe it without acquiring a second lock while already
//! holding the shared queue's lock — the private lock is never held
//! while acquiring a shared lock, and vice versa.
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Condvar, Mutex,
};

/// Parking cell for a [`Predictor`](crate::Predictor) or
/// [`Trainer`](crate::Trainer): carries no payload, only a "is the
/// Coordinator still working on my batch" bit.
pub(crate) struct WorkerPark {
    processing: Mutex<bool>,
    cond: Condvar,
    exit: AtomicBool,
}

impl WorkerPark {
    pub(crate) fn new() -> Self {
        Self {
            processing: Mutex::new(false),
            cond: Condvar::new(),
            exit: AtomicBool::new(false),
        }
    }

    pub(crate) fn exit_flag(&self) -> &AtomicBool {
        &self.exit
    }

    /// Marks a batch as handed off to the Coordinator.
    pub(crate) fn begin_processing(&self) {
        *self.processing.lock().unwrap() = true;
    }

    /// Parks until the Coordinator calls [`WorkerPark::process_finished`]
    /// or exit is requested. Returns `false` if woken due to exit.
    pub(crate) fn wait_until_finished(&self) -> bool {
        let guard = self.processing.lock().unwrap();
        let _guard = self
            .cond
            .wait_while(guard, |processing| *processing && !self.exit.load(Ordering::Acquire))
            .unwrap();
        !self.exit.load(Ordering::Acquire)
    }

    /// Called by the Coordinator once this worker's batch has been consumed.
    pub(crate) fn process_finished(&self) {
        *self.processing.lock().unwrap() = false;
        self.cond.notify_one();
    }

    /// Requests this worker to stop; wakes it if currently parked.
    pub(crate) fn request_exit(&self) {
        self.exit.store(true, Ordering::Release);
        self.cond.notify_one();
    }
}

/// Parking cell for an [`Actor`](crate::Actor): carries the
/// `(action, policy)` payload a Predictor/Coordinator delivers back.
pub(crate) struct ActorPark<Act> {
    state: Mutex<ActorParkState<Act>>,
    cond: Condvar,
    exit: AtomicBool,
}

struct ActorParkState<Act> {
    predicting: bool,
    result: Option<(Act, f32)>,
}

impl<Act> ActorPark<Act> {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(ActorParkState {
                predicting: false,
                result: None,
            }),
            cond: Condvar::new(),
            exit: AtomicBool::new(false),
        }
    }

    pub(crate) fn exit_flag(&self) -> &AtomicBool {
        &self.exit
    }

    /// Marks a prediction request as submitted.
    pub(crate) fn begin_predicting(&self) {
        self.state.lock().unwrap().predicting = true;
    }

    /// Parks until a result is delivered or exit is requested.
    /// Returns `None` if woken due to exit.
    pub(crate) fn wait_for_result(&self) -> Option<(Act, f32)> {
        let guard = self.state.lock().unwrap();
        let mut guard = self
            .cond
            .wait_while(guard, |s| s.predicting && !self.exit.load(Ordering::Acquire))
            .unwrap();
        if self.exit.load(Ordering::Acquire) {
            return None;
        }
        guard.result.take()
    }

    /// Called by the Coordinator to deliver this actor's prediction result.
    pub(crate) fn set_result(&self, action: Act, policy: f32) {
        {
            let mut s = self.state.lock().unwrap();
            s.result = Some((action, policy));
            s.predicting = false;
        }
        self.cond.notify_one();
    }

    /// Requests this actor to stop; wakes it if currently parked.
    pub(crate) fn request_exit(&self) {
        self.exit.store(true, Ordering::Release);
        self.cond.notify_one();
    }
}
