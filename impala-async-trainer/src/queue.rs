//! The shared FIFO underlying `prediction_queue` and `training_queue`.
use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicBool, Ordering},
        Condvar, Mutex,
    },
};

/// A bounded-growth FIFO guarded by a mutex, with a condition variable
/// notified whenever the queue crosses a caller-supplied threshold.
///
/// Shared by all workers of one kind (all predictors share one
/// `SharedQueue<PredictionEntry<..>>`, all trainers share one
/// `SharedQueue<Fragment<..>>`): a single [`Condvar`] wakes whichever
/// waiter the OS scheduler picks, which is how "notify one sibling
/// predictor/trainer" is realised.
pub(crate) struct SharedQueue<T> {
    queue: Mutex<VecDeque<T>>,
    cond: Condvar,
}

impl<T> SharedQueue<T> {
    pub(crate) fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            cond: Condvar::new(),
        }
    }

    /// Pushes `item` onto the back of the queue and returns the queue
    /// length immediately after the push, so the caller can decide
    /// whether to notify.
    pub(crate) fn push(&self, item: T) -> usize {
        let mut q = self.queue.lock().unwrap();
        q.push_back(item);
        q.len()
    }

    pub(crate) fn notify_one(&self) {
        self.cond.notify_one();
    }

    pub(crate) fn notify_all(&self) {
        self.cond.notify_all();
    }

    /// Waits until the queue holds at least `min` entries or `exit` is
    /// set, then drains up to `max` entries in FIFO order.
    ///
    /// Returns the drained entries (empty only if woken purely by
    /// `exit`) and the queue length left behind, so the caller can
    /// decide whether to wake a sibling for the remainder.
    pub(crate) fn wait_and_drain(&self, min: usize, max: usize, exit: &AtomicBool) -> (Vec<T>, usize) {
        let guard = self.queue.lock().unwrap();
        let mut guard = self
            .cond
            .wait_while(guard, |q| q.len() < min && !exit.load(Ordering::Acquire))
            .unwrap();

        let mut items = Vec::with_capacity(max.min(guard.len()));
        while items.len() < max {
            match guard.pop_front() {
                Some(item) => items.push(item),
                None => break,
            }
        }
        let remaining = guard.len();
        (items, remaining)
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.queue.lock().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn drains_up_to_max_and_reports_remaining() {
        let q = SharedQueue::new();
        for i in 0..10 {
            q.push(i);
        }
        let exit = AtomicBool::new(false);
        let (items, remaining) = q.wait_and_drain(1, 4, &exit);
        assert_eq!(items, vec![0, 1, 2, 3]);
        assert_eq!(remaining, 6);
    }

    #[test]
    fn wakes_on_exit_with_no_items() {
        let q: Arc<SharedQueue<i32>> = Arc::new(SharedQueue::new());
        let exit = Arc::new(AtomicBool::new(false));
        let q2 = Arc::clone(&q);
        let exit2 = Arc::clone(&exit);
        let handle = thread::spawn(move || q2.wait_and_drain(100, 10, &exit2));

        thread::sleep(Duration::from_millis(20));
        exit.store(true, Ordering::Release);
        q.notify_all();

        let (items, _) = handle.join().unwrap();
        assert!(items.is_empty());
    }
}
