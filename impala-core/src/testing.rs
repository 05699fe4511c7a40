//! Minimal stub [`Env`]/[`Model`] implementations used by this crate's
//! and `impala-async-trainer`'s test suites and doc examples.
//!
//! None of this module models a real environment or network; it exists
//! purely so the scheduler can be exercised end to end without an
//! external simulator or tensor library.
use crate::{
    discrete_action,
    env::{Env, EnvStatus},
    model::{LossStats, Model},
};

discrete_action!(SingleAction, [Noop]);

/// A scalar observation, deep-clonable trivially.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScalarObs(pub f32);

/// An environment whose episodes are exactly 3 steps long, with rewards
/// `0.1, 0.2, 0.5`, matching the reference scenario used to seed the
/// trainer's round-trip tests.
#[derive(Default)]
pub struct CycleEnv {
    t: usize,
}

impl Env for CycleEnv {
    type Obs = ScalarObs;
    type Act = SingleAction;
    type Reward = f32;
    type ObsBatch = Vec<Option<f32>>;

    fn reset(&mut self) -> Self::Obs {
        self.t = 0;
        ScalarObs(0.0)
    }

    fn step(&mut self, _act: &Self::Act) -> anyhow::Result<(Self::Obs, Self::Reward, EnvStatus)> {
        const REWARDS: [f32; 3] = [0.1, 0.2, 0.5];
        let reward = REWARDS[self.t % 3];
        self.t += 1;
        let status = if self.t % 3 == 0 {
            EnvStatus::Finished
        } else {
            EnvStatus::Running
        };
        Ok((ScalarObs(self.t as f32), reward, status))
    }

    fn make_batch<'a, I>(obs: I) -> Self::ObsBatch
    where
        Self::Obs: 'a,
        I: IntoIterator<Item = Option<&'a Self::Obs>>,
    {
        obs.into_iter().map(|o| o.map(|x| x.0)).collect()
    }
}

/// A model that always predicts action id 0 with policy probability 1.0,
/// and reports zero loss on every training step.
#[derive(Default)]
pub struct EchoModel;

impl<E> Model<E> for EchoModel
where
    E: Env<ObsBatch = Vec<Option<f32>>>,
{
    fn predict(&mut self, states: &E::ObsBatch) -> anyhow::Result<Vec<(i64, f32)>> {
        Ok(states.iter().map(|_| (0i64, 1.0f32)).collect())
    }

    fn train(
        &mut self,
        _states: &E::ObsBatch,
        _actions: &[i64],
        _rewards: &[E::Reward],
        _policies: &[f32],
        _data_sizes: &[i64],
        _observation_sizes: &[i64],
    ) -> anyhow::Result<LossStats> {
        Ok(LossStats::default())
    }

    fn save(&mut self, _step: u64) -> anyhow::Result<()> {
        Ok(())
    }
}
