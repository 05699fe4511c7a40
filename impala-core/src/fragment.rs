//! Trajectory fragments produced by actors and consumed by trainers.

/// An ordered slice of a trajectory: up to `T_MAX` transitions plus one
/// bootstrap observation.
///
/// The invariant `obs.len() == act.len() || obs.len() == act.len() + 1`
/// holds for every fragment an [`Actor`](crate) emits: a fragment with
/// `obs.len() == act.len() + 1` is a non-terminal cut carrying a
/// bootstrap observation for the value function; a fragment with
/// `obs.len() == act.len()` ends an episode.
#[derive(Debug, Clone)]
pub struct Fragment<O, A, R> {
    /// Observations, length `act.len()` or `act.len() + 1`.
    pub obs: Vec<O>,
    /// Actions, length equal to `rew.len()` and `pol.len()`.
    pub act: Vec<A>,
    /// Per-step rewards.
    pub rew: Vec<R>,
    /// Behaviour-policy probability of the chosen action at each step.
    pub pol: Vec<f32>,
}

impl<O, A, R> Fragment<O, A, R> {
    /// Builds an empty fragment with capacity for `t_max + 1` observations.
    pub fn with_capacity(t_max: usize) -> Self {
        Self {
            obs: Vec::with_capacity(t_max + 1),
            act: Vec::with_capacity(t_max + 1),
            rew: Vec::with_capacity(t_max + 1),
            pol: Vec::with_capacity(t_max + 1),
        }
    }

    /// The number of transitions (`act.len()`), i.e. the row count this
    /// fragment contributes to a training batch's valid prefix.
    pub fn len(&self) -> usize {
        self.act.len()
    }

    /// Returns `true` if this fragment carries no transitions at all.
    pub fn is_empty(&self) -> bool {
        self.act.is_empty()
    }

    /// Returns `true` if `obs` carries one more element than `act`,
    /// i.e. this fragment is a bootstrapped, non-terminal cut.
    pub fn has_bootstrap_obs(&self) -> bool {
        self.obs.len() == self.act.len() + 1
    }

    /// Checks the fragment invariant: `obs.len() ∈ {act.len(), act.len()+1}`
    /// and `act.len() == rew.len() == pol.len()`.
    ///
    /// Debug builds assert this at every fragment emission site;
    /// release builds skip the check, matching the cost/benefit the
    /// rest of the scheduler gives to invariant checks that cannot be
    /// triggered by untrusted external input (only by a bug in this
    /// crate's own fragment assembly).
    pub fn debug_check_invariant(&self) {
        debug_assert!(
            self.obs.len() == self.act.len() || self.obs.len() == self.act.len() + 1,
            "fragment obs/act length invariant violated: obs={}, act={}",
            self.obs.len(),
            self.act.len()
        );
        debug_assert_eq!(self.act.len(), self.rew.len());
        debug_assert_eq!(self.act.len(), self.pol.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bootstrap_fragment_has_one_extra_observation() {
        let mut f = Fragment::<i32, i32, f32>::with_capacity(2);
        f.obs.extend([1, 2, 3]);
        f.act.extend([10, 20]);
        f.rew.extend([0.1, 0.2]);
        f.pol.extend([1.0, 1.0]);
        f.debug_check_invariant();
        assert_eq!(f.len(), 2);
        assert!(f.has_bootstrap_obs());
    }

    #[test]
    fn terminal_fragment_has_no_extra_observation() {
        let mut f = Fragment::<i32, i32, f32>::with_capacity(2);
        f.obs.push(1);
        f.act.push(10);
        f.rew.push(0.5);
        f.pol.push(1.0);
        f.debug_check_invariant();
        assert!(!f.has_bootstrap_obs());
    }
}
