//! The trainer: rectangularizes variable-length fragments into a batch.
use crate::{
    batch::{BatchSink, TrainingBatch},
    parking::WorkerPark,
    queue::SharedQueue,
};
use impala_core::{DiscreteAction, Env, Fragment};
use std::sync::{atomic::Ordering, Arc};

/// Drains fragments off the shared training queue, sorts and
/// transpose-pads them into a rectangular `(T_MAX+1, B)` batch, and
/// hands it to the Coordinator.
pub(crate) struct Trainer<E: Env> {
    pub(crate) id: usize,
    pub(crate) queue: Arc<SharedQueue<Fragment<E::Obs, E::Act, E::Reward>>>,
    pub(crate) sink: Arc<BatchSink<E>>,
    pub(crate) park: Arc<WorkerPark>,
    pub(crate) min_batch: usize,
    pub(crate) max_batch: usize,
    pub(crate) t_max: usize,
}

impl<E: Env> Trainer<E>
where
    E::Act: DiscreteAction,
{
    pub(crate) fn run(self) {
        loop {
            let exit = self.park.exit_flag();
            let (mut fragments, remaining) =
                self.queue.wait_and_drain(self.min_batch, self.max_batch, exit);
            if fragments.is_empty() {
                debug_assert!(exit.load(Ordering::Acquire));
                return;
            }
            if remaining >= self.min_batch {
                self.queue.notify_one();
            }

            sort_fragments_desc(&mut fragments);

            let t_max = self.t_max;
            let (actions, rewards, policies, obs_refs, data_sizes, observation_sizes) =
                assemble_batch::<E::Obs, E::Act, E::Reward>(&fragments, t_max);

            let states = E::make_batch(obs_refs);

            self.park.begin_processing();
            self.sink.push_training(TrainingBatch {
                states,
                actions,
                rewards,
                policies,
                data_sizes,
                observation_sizes,
                trainer: Arc::clone(&self.park),
            });

            if !self.park.wait_until_finished() {
                log::debug!("trainer {}: exiting after final batch", self.id);
                return;
            }
        }
    }
}

/// Sorts `fragments` descending by `|act|`, tie-break descending by
/// `|obs|`: makes `data_sizes`/`observation_sizes` monotonically
/// non-increasing prefixes, so the model can treat each time step's
/// valid rows as a contiguous slice with no per-sample mask.
fn sort_fragments_desc<O, A, R>(fragments: &mut [Fragment<O, A, R>]) {
    fragments.sort_by(|a, b| b.act.len().cmp(&a.act.len()).then(b.obs.len().cmp(&a.obs.len())));
}

/// Transposes already-sorted `fragments` into flat `T_MAX * B` action/
/// reward/policy vectors, a positional observation-reference list of
/// length `(T_MAX + 1) * B`, and the `data_sizes`/`observation_sizes`
/// valid-prefix counts.
///
/// Does not itself sort `fragments`; callers apply
/// [`sort_fragments_desc`] first so the returned sizes are
/// non-increasing.
fn assemble_batch<'a, O, A, R>(
    fragments: &'a [Fragment<O, A, R>],
    t_max: usize,
) -> (Vec<i64>, Vec<R>, Vec<f32>, Vec<Option<&'a O>>, Vec<i64>, Vec<i64>)
where
    A: DiscreteAction,
    R: Clone + Default,
{
    let batch_size = fragments.len();
    let mut actions = vec![0i64; t_max * batch_size];
    let mut rewards = vec![R::default(); t_max * batch_size];
    let mut policies = vec![0.0f32; t_max * batch_size];
    let mut obs_refs: Vec<Option<&O>> = Vec::with_capacity((t_max + 1) * batch_size);

    for i in 0..t_max {
        for (col, d) in fragments.iter().enumerate() {
            if i < d.act.len() {
                let idx = i * batch_size + col;
                actions[idx] = d.act[i].to_id();
                rewards[idx] = d.rew[i].clone();
                policies[idx] = d.pol[i];
            }
            obs_refs.push(if i < d.obs.len() { Some(&d.obs[i]) } else { None });
        }
    }
    for d in fragments {
        obs_refs.push(if d.obs.len() > t_max { Some(&d.obs[t_max]) } else { None });
    }

    let data_sizes: Vec<i64> = (0..t_max)
        .map(|i| fragments.iter().filter(|d| d.act.len() > i).count() as i64)
        .collect();
    let observation_sizes: Vec<i64> = (0..=t_max)
        .map(|i| fragments.iter().filter(|d| d.obs.len() > i).count() as i64)
        .collect();

    (actions, rewards, policies, obs_refs, data_sizes, observation_sizes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use impala_core::testing::SingleAction;

    fn fragment(act_len: usize, obs_len: usize) -> Fragment<i32, SingleAction, f32> {
        Fragment {
            obs: (0..obs_len as i32).collect(),
            act: vec![SingleAction::Noop; act_len],
            rew: vec![1.0; act_len],
            pol: vec![0.5; act_len],
        }
    }

    /// Fragments with `|act|` in `{2, 2, 1, 0, 2, 1}` (the `0`
    /// entry a degenerate obs-only bootstrap with `|obs| = 1`) sort
    /// descending to `{2, 2, 2, 1, 1, 0}`. By the `data_sizes[i] =
    /// |{d : |d.act| > i}|` invariant, `data_sizes = [5, 3]` for
    /// `T_MAX = 2`: five of the six fragments have a valid action row
    /// at `i = 0` (the degenerate one does not), three at `i = 1`.
    #[test]
    fn sorts_descending_by_action_length_and_computes_data_sizes() {
        let mut fragments = vec![
            fragment(2, 3),
            fragment(2, 2),
            fragment(1, 2),
            fragment(0, 1),
            fragment(2, 2),
            fragment(1, 1),
        ];
        sort_fragments_desc(&mut fragments);

        let lens: Vec<usize> = fragments.iter().map(|f| f.act.len()).collect();
        assert_eq!(lens, vec![2, 2, 2, 1, 1, 0]);

        let (_, _, _, _, data_sizes, _) = assemble_batch::<i32, SingleAction, f32>(&fragments, 2);
        assert_eq!(data_sizes, vec![5, 3]);
        for w in data_sizes.windows(2) {
            assert!(w[0] >= w[1]);
        }
    }

    /// A degenerate bootstrap fragment (`|act| = 0`, `|obs| = 1`)
    /// records `(obs[0], 0, 0, 0.0)` at row 0 and contributes to
    /// `observation_sizes[0]`.
    #[test]
    fn pads_degenerate_bootstrap_fragment() {
        let fragments = vec![fragment(0, 1)];
        let (actions, rewards, policies, obs_refs, data_sizes, observation_sizes) =
            assemble_batch::<i32, SingleAction, f32>(&fragments, 2);

        assert_eq!(actions, vec![0, 0]);
        assert_eq!(rewards, vec![0.0, 0.0]);
        assert_eq!(policies, vec![0.0, 0.0]);
        assert_eq!(data_sizes, vec![0, 0]);
        assert_eq!(observation_sizes, vec![1, 0, 0]);
        // row 0 (time step 0) is the only present observation.
        assert_eq!(obs_refs[0], Some(&0));
    }

    #[test]
    fn observation_sizes_are_non_increasing_and_include_bootstrap_row() {
        let mut fragments = vec![fragment(2, 3), fragment(2, 3), fragment(1, 1)];
        sort_fragments_desc(&mut fragments);
        let (_, _, _, _, _, observation_sizes) =
            assemble_batch::<i32, SingleAction, f32>(&fragments, 2);
        // T_MAX + 1 = 3 rows; all three fragments have an obs at row 0,
        // two have an obs at row 1, none have a bootstrap row 2 except
        // the two full-length fragments.
        assert_eq!(observation_sizes, vec![3, 2, 2]);
        for w in observation_sizes.windows(2) {
            assert!(w[0] >= w[1]);
        }
    }
}
