//! The actor: drives one environment instance through its step loop.
use crate::{batch::PredictionEntry, parking::ActorPark, queue::SharedQueue};
use impala_core::{DiscreteAction, Env, Fragment, Record, RecordValue, Recorder};
use std::sync::{Arc, Mutex};

/// Drives one [`Env`] instance, turning its step loop into prediction
/// requests and trajectory fragments.
///
/// Constructed and spawned by `Server::build`; not constructed
/// directly by crate users.
pub(crate) struct Actor<E: Env> {
    pub(crate) id: usize,
    pub(crate) env: E,
    pub(crate) park: Arc<ActorPark<E::Act>>,
    pub(crate) prediction_queue: Arc<SharedQueue<PredictionEntry<E::Obs, E::Act>>>,
    pub(crate) training_queue: Arc<SharedQueue<Fragment<E::Obs, E::Act, E::Reward>>>,
    pub(crate) t_max: usize,
    pub(crate) max_episode_length: Option<usize>,
    pub(crate) min_prediction_batch: usize,
    pub(crate) min_training_batch: usize,
    /// Only the actor at index 0 logs completed episodes, mirroring
    /// the reference implementation's single-agent progress line.
    pub(crate) episode_recorder: Option<Arc<Mutex<dyn Recorder + Send>>>,
}

impl<E: Env> Actor<E>
where
    E::Act: DiscreteAction,
{
    pub(crate) fn run(mut self) {
        loop {
            if !self.run_episode() {
                return;
            }
        }
    }

    /// Plays one episode to completion. Returns `false` if shutdown was
    /// observed mid-episode (the caller must stop rather than reset).
    fn run_episode(&mut self) -> bool {
        let mut obs = self.env.reset();
        let mut prev_obs: Vec<E::Obs> = Vec::with_capacity(self.t_max + 1);
        let mut prev_act: Vec<E::Act> = Vec::with_capacity(self.t_max + 1);
        let mut prev_rew: Vec<E::Reward> = Vec::with_capacity(self.t_max + 1);
        let mut prev_pol: Vec<f32> = Vec::with_capacity(self.t_max + 1);
        let mut t: usize = 0;
        let mut episode_reward: f64 = 0.0;

        loop {
            if let Some(max_len) = self.max_episode_length {
                if t >= max_len {
                    return true;
                }
            }

            // a. submit a prediction request and park for the reply.
            //
            // SAFETY: `obs` lives on this stack frame and is not moved
            // or dropped again until `wait_for_result` returns, which
            // only happens after the Coordinator has delivered this
            // actor's result — and therefore after the predictor that
            // drained this entry has already copied out of `obs` via
            // `Env::make_batch`.
            let entry = unsafe { PredictionEntry::new(&obs, Arc::clone(&self.park)) };
            self.park.begin_predicting();
            let remaining = self.prediction_queue.push(entry);
            if remaining >= self.min_prediction_batch {
                self.prediction_queue.notify_one();
            }

            let (next_action, policy) = match self.park.wait_for_result() {
                Some(r) => r,
                None => return false,
            };

            let (next_obs, reward, status) = match self.env.step(&next_action) {
                Ok(v) => v,
                Err(err) => {
                    log::error!("actor {}: environment step failed: {:#}", self.id, err);
                    std::process::abort();
                }
            };
            t += 1;
            episode_reward += reward.clone().into();

            let cut = status.is_finished()
                || prev_obs.len() >= self.t_max
                || self.max_episode_length.map_or(false, |m| t >= m);

            if !cut {
                prev_obs.push(obs);
                prev_act.push(next_action);
                prev_rew.push(reward);
                prev_pol.push(policy);
                obs = next_obs;
                continue;
            }

            let mut fragment = Fragment {
                obs: prev_obs.drain(..).collect(),
                act: prev_act.drain(..).collect(),
                rew: prev_rew.drain(..).collect(),
                pol: prev_pol.drain(..).collect(),
            };

            let mut second_fragment = None;
            if status.is_finished() {
                if fragment.act.len() < self.t_max {
                    fragment.obs.push(obs);
                    fragment.act.push(next_action);
                    fragment.rew.push(reward);
                    fragment.pol.push(policy);
                } else {
                    fragment.obs.push(obs.clone());
                    second_fragment = Some(Fragment {
                        obs: vec![obs],
                        act: vec![next_action],
                        rew: vec![reward],
                        pol: vec![policy],
                    });
                }
            } else {
                // Non-terminal cut: bootstrap this fragment with a
                // clone of `obs`, then re-seed the cleared `prev_*`
                // buffers with the cut step's own transition so the
                // next fragment overlaps this one by one observation
                // and no action is dropped between fragments.
                fragment.obs.push(obs.clone());
                prev_obs.push(obs);
                prev_act.push(next_action);
                prev_rew.push(reward);
                prev_pol.push(policy);
            }

            fragment.debug_check_invariant();
            if let Some(ref f2) = second_fragment {
                f2.debug_check_invariant();
            }

            let mut remaining = self.training_queue.push(fragment);
            if let Some(f2) = second_fragment {
                remaining = self.training_queue.push(f2);
            }
            if remaining >= self.min_training_batch {
                self.training_queue.notify_one();
            }

            if status.is_finished() {
                self.log_episode_finished(t, episode_reward);
                return true;
            }

            obs = next_obs;
        }
    }

    fn log_episode_finished(&self, episode_len: usize, episode_reward: f64) {
        if self.id != 0 {
            return;
        }
        if let Some(recorder) = &self.episode_recorder {
            let record = Record::new()
                .with("episode_length", RecordValue::Integer(episode_len as i64))
                .with("episode_reward", RecordValue::Scalar(episode_reward));
            recorder.lock().unwrap().write(record);
        }
        log::info!(
            "actor 0: finished episode, length {}, reward {:.3}",
            episode_len,
            episode_reward
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use impala_core::{discrete_action, env::EnvStatus};
    use std::sync::atomic::AtomicBool;

    discrete_action!(TestAction, [Only]);

    #[derive(Debug, Clone, Default, PartialEq)]
    struct TestObs(u32);

    /// An environment that finishes exactly on step `finish_at`,
    /// reporting a constant reward on every step.
    struct FixedLenEnv {
        finish_at: usize,
        t: usize,
    }

    impl FixedLenEnv {
        fn new(finish_at: usize) -> Self {
            Self { finish_at, t: 0 }
        }
    }

    impl Env for FixedLenEnv {
        type Obs = TestObs;
        type Act = TestAction;
        type Reward = f32;
        type ObsBatch = Vec<Option<TestObs>>;

        fn reset(&mut self) -> Self::Obs {
            self.t = 0;
            TestObs(0)
        }

        fn step(&mut self, _act: &Self::Act) -> anyhow::Result<(Self::Obs, Self::Reward, EnvStatus)> {
            self.t += 1;
            let status = if self.t >= self.finish_at {
                EnvStatus::Finished
            } else {
                EnvStatus::Running
            };
            Ok((TestObs(self.t as u32), 1.0, status))
        }

        fn make_batch<'a, I>(obs: I) -> Self::ObsBatch
        where
            Self::Obs: 'a,
            I: IntoIterator<Item = Option<&'a Self::Obs>>,
        {
            obs.into_iter().map(|o| o.cloned()).collect()
        }
    }

    /// Runs one episode of `FixedLenEnv` through a real `Actor`,
    /// serving its prediction requests directly (bypassing the
    /// Predictor/Coordinator) and collecting the fragment(s) it pushes
    /// onto the training queue.
    fn run_one_episode(t_max: usize, finish_at: usize) -> Vec<Fragment<TestObs, TestAction, f32>> {
        let prediction_queue = Arc::new(SharedQueue::new());
        let training_queue = Arc::new(SharedQueue::new());
        let park = Arc::new(ActorPark::new());

        let actor = Actor {
            id: 0,
            env: FixedLenEnv::new(finish_at),
            park: Arc::clone(&park),
            prediction_queue: Arc::clone(&prediction_queue),
            training_queue: Arc::clone(&training_queue),
            t_max,
            max_episode_length: None,
            min_prediction_batch: 1,
            min_training_batch: 1,
            episode_recorder: None,
        };

        let handle = std::thread::spawn(move || actor.run());

        let never_exit = AtomicBool::new(false);
        for _ in 0..finish_at {
            let (entries, _) = prediction_queue.wait_and_drain(1, 1, &never_exit);
            for entry in &entries {
                entry.actor().set_result(TestAction::Only, 1.0);
            }
        }

        // The actor has started its next episode and is parked waiting
        // for a reply that will never come; stop it there.
        park.request_exit();
        handle.join().unwrap();

        let drain_all = AtomicBool::new(true);
        training_queue.wait_and_drain(0, usize::MAX, &drain_all).0
    }

    /// Episode length 1 (terminal on first step): one fragment with
    /// `|obs| = |act| = 1`.
    #[test]
    fn terminal_on_first_step_emits_single_step_fragment() {
        let fragments = run_one_episode(2, 1);
        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0].obs.len(), 1);
        assert_eq!(fragments[0].act.len(), 1);
    }

    /// Episode length exactly T_MAX, ending: one fragment with
    /// `|obs| = |act| = T_MAX`.
    #[test]
    fn episode_ending_exactly_at_t_max_emits_one_full_fragment() {
        let fragments = run_one_episode(2, 2);
        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0].obs.len(), 2);
        assert_eq!(fragments[0].act.len(), 2);
    }

    /// A non-terminal T_MAX cut immediately followed by termination on
    /// step T_MAX+1 emits two fragments from the same cut iteration:
    /// a full bootstrapped fragment, then a one-step terminal fragment.
    #[test]
    fn t_max_cut_followed_by_termination_emits_two_fragments() {
        let fragments = run_one_episode(2, 3);
        assert_eq!(fragments.len(), 2);
        assert_eq!(fragments[0].obs.len(), 3);
        assert_eq!(fragments[0].act.len(), 2);
        assert!(fragments[0].has_bootstrap_obs());
        assert_eq!(fragments[1].obs.len(), 1);
        assert_eq!(fragments[1].act.len(), 1);
        assert!(!fragments[1].has_bootstrap_obs());
    }

    /// An episode longer than `T_MAX + 1` spans multiple non-terminal
    /// cuts before the episode ends. Each fragment's `obs[i]` is the
    /// observation that preceded `act[i]`, so the multiset of those
    /// pairs across all emitted fragments must cover every step of the
    /// episode exactly once — no transition dropped at a cut boundary,
    /// none duplicated by the bootstrap/re-seed overlap.
    #[test]
    fn long_episode_does_not_drop_or_duplicate_transitions_across_cuts() {
        let t_max = 2;
        let finish_at = 5;
        let fragments = run_one_episode(t_max, finish_at);

        // three cuts: [a0,a1], [a2,a3], [a4] (the last split off the
        // terminating step of a full T_MAX fragment).
        assert_eq!(fragments.len(), 3);

        let mut covered: Vec<u32> = fragments
            .iter()
            .flat_map(|f| f.obs[..f.act.len()].iter().map(|o| o.0))
            .collect();
        covered.sort_unstable();
        assert_eq!(covered, (0..finish_at as u32).collect::<Vec<_>>());
    }
}
