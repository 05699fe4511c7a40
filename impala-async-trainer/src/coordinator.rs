//! The coordinator: the sole thread that touches the model.
use crate::batch::BatchSink;
use impala_core::{AggregateRecorder, DiscreteAction, Env, Model, Record, RecordValue};
use std::sync::{Arc, Mutex};

/// Owns the model exclusively and alternates between applying finished
/// training batches and serving finished prediction batches.
///
/// Training batches are drained before prediction batches within one
/// iteration: the model is updated before newer predictions are served.
pub(crate) struct Coordinator<E: Env, M: Model<E>> {
    pub(crate) sink: Arc<BatchSink<E>>,
    pub(crate) model: M,
    pub(crate) recorder: Arc<Mutex<dyn AggregateRecorder + Send>>,
    pub(crate) log_interval_steps: Option<usize>,
    pub(crate) save_interval_steps: Option<usize>,
}

impl<E: Env, M: Model<E>> Coordinator<E, M>
where
    E::Act: DiscreteAction,
{
    pub(crate) fn run(mut self, training_steps_target: u64) {
        let mut trained_steps: u64 = 0;
        let mut v_loss_ema = 0.0f64;
        let mut pi_loss_ema = 0.0f64;
        let mut entropy_loss_ema = 0.0f64;

        loop {
            let (predictions, trainings) = self.sink.wait_and_swap();

            for batch in trainings {
                let previous_steps = trained_steps;
                let loss = match self.model.train(
                    &batch.states,
                    &batch.actions,
                    &batch.rewards,
                    &batch.policies,
                    &batch.data_sizes,
                    &batch.observation_sizes,
                ) {
                    Ok(loss) => loss,
                    Err(err) => {
                        log::error!("coordinator: model training step failed: {:#}", err);
                        std::process::abort();
                    }
                };
                batch.trainer.process_finished();

                v_loss_ema = 0.99 * v_loss_ema + 0.01 * loss.v_loss;
                pi_loss_ema = 0.99 * pi_loss_ema + 0.01 * loss.pi_loss;
                entropy_loss_ema = 0.99 * entropy_loss_ema + 0.01 * loss.entropy_loss;

                let step_count: i64 = batch.data_sizes.iter().sum();
                trained_steps += step_count as u64;

                if let Some(interval) = self.log_interval_steps.filter(|i| *i > 0) {
                    let interval = interval as u64;
                    if previous_steps / interval != trained_steps / interval {
                        log::info!(
                            "steps {}, loss {:.4} {:.4} {:.4}",
                            trained_steps,
                            v_loss_ema,
                            pi_loss_ema,
                            entropy_loss_ema
                        );
                        let record = Record::new()
                            .with("trained_steps", RecordValue::Integer(trained_steps as i64))
                            .with("v_loss", RecordValue::Scalar(v_loss_ema))
                            .with("pi_loss", RecordValue::Scalar(pi_loss_ema))
                            .with("entropy_loss", RecordValue::Scalar(entropy_loss_ema));
                        let mut recorder = self.recorder.lock().unwrap();
                        recorder.store(record);
                        recorder.flush(trained_steps as i64);
                    }
                }

                if let Some(interval) = self.save_interval_steps.filter(|i| *i > 0) {
                    let interval = interval as u64;
                    if previous_steps / interval != trained_steps / interval {
                        if let Err(err) = self.model.save(trained_steps) {
                            log::error!("coordinator: model save failed: {:#}", err);
                            std::process::abort();
                        }
                    }
                }
            }

            for batch in predictions {
                let results = match self.model.predict(&batch.states) {
                    Ok(r) => r,
                    Err(err) => {
                        log::error!("coordinator: model prediction failed: {:#}", err);
                        std::process::abort();
                    }
                };
                if results.len() != batch.agents.len() {
                    log::error!(
                        "coordinator: model returned {} predictions for a batch of {} agents",
                        results.len(),
                        batch.agents.len()
                    );
                    std::process::abort();
                }
                batch.predictor.process_finished();

                for (agent, (action_id, policy)) in batch.agents.iter().zip(results) {
                    if action_id < 0 || action_id >= E::Act::NUM_ACTIONS {
                        log::error!(
                            "coordinator: model predicted out-of-range action id {} (num_actions = {})",
                            action_id,
                            E::Act::NUM_ACTIONS
                        );
                        std::process::abort();
                    }
                    agent.set_result(E::Act::from_id(action_id), policy);
                }
            }

            if trained_steps >= training_steps_target {
                log::info!("training finished at {} steps", trained_steps);
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::PredictionBatch;
    use impala_core::testing::{CycleEnv, SingleAction};
    use impala_core::{LossStats, NullRecorder};

    /// Records the order in which `predict`/`train` are invoked, so
    /// the test can assert that training batches are processed before
    /// prediction batches within one iteration.
    struct OrderModel {
        order: Arc<Mutex<Vec<&'static str>>>,
    }

    impl Model<CycleEnv> for OrderModel {
        fn predict(&mut self, states: &Vec<Option<f32>>) -> anyhow::Result<Vec<(i64, f32)>> {
            self.order.lock().unwrap().push("predict");
            Ok(states.iter().map(|_| (0i64, 1.0f32)).collect())
        }

        fn train(
            &mut self,
            _states: &Vec<Option<f32>>,
            _actions: &[i64],
            _rewards: &[f32],
            _policies: &[f32],
            _data_sizes: &[i64],
            _observation_sizes: &[i64],
        ) -> anyhow::Result<LossStats> {
            self.order.lock().unwrap().push("train");
            Ok(LossStats { v_loss: 1.0, pi_loss: 2.0, entropy_loss: 3.0 })
        }

        fn save(&mut self, _step: u64) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn processes_training_before_prediction_and_wakes_both_workers() {
        let sink = Arc::new(BatchSink::<CycleEnv>::new());

        let trainer_park = Arc::new(crate::parking::WorkerPark::new());
        trainer_park.begin_processing();
        sink.push_training(crate::batch::TrainingBatch {
            states: vec![Some(0.0)],
            actions: vec![0],
            rewards: vec![0.0f32],
            policies: vec![1.0],
            data_sizes: vec![1],
            observation_sizes: vec![1, 1],
            trainer: Arc::clone(&trainer_park),
        });

        let predictor_park = Arc::new(crate::parking::WorkerPark::new());
        predictor_park.begin_processing();
        let actor_park = Arc::new(crate::parking::ActorPark::new());
        actor_park.begin_predicting();
        sink.push_prediction(PredictionBatch {
            states: vec![Some(0.0)],
            agents: vec![Arc::clone(&actor_park)],
            predictor: Arc::clone(&predictor_park),
        });

        let order = Arc::new(Mutex::new(Vec::new()));
        let recorder: Arc<Mutex<dyn AggregateRecorder + Send>> =
            Arc::new(Mutex::new(NullRecorder::new()));
        let coordinator = Coordinator {
            sink: Arc::clone(&sink),
            model: OrderModel { order: Arc::clone(&order) },
            recorder,
            log_interval_steps: None,
            save_interval_steps: None,
        };

        // one training step is already enough to hit the target, so
        // the coordinator returns after exactly one iteration.
        coordinator.run(1);

        assert_eq!(*order.lock().unwrap(), vec!["train", "predict"]);

        // both workers were released (wait_until_finished no longer blocks).
        assert!(trainer_park.wait_until_finished());
        assert!(predictor_park.wait_until_finished());

        // the actor received its result, converted from the raw id.
        let result = actor_park.wait_for_result();
        assert_eq!(result, Some((SingleAction::Noop, 1.0)));
    }

    #[test]
    fn accumulates_steps_across_multiple_training_batches() {
        let sink = Arc::new(BatchSink::<CycleEnv>::new());

        for _ in 0..3 {
            let park = Arc::new(crate::parking::WorkerPark::new());
            park.begin_processing();
            sink.push_training(crate::batch::TrainingBatch {
                states: vec![Some(0.0)],
                actions: vec![0],
                rewards: vec![0.0f32],
                policies: vec![1.0],
                data_sizes: vec![2],
                observation_sizes: vec![1, 1],
                trainer: park,
            });
        }

        let order = Arc::new(Mutex::new(Vec::new()));
        let recorder: Arc<Mutex<dyn AggregateRecorder + Send>> =
            Arc::new(Mutex::new(NullRecorder::new()));
        let coordinator = Coordinator {
            sink: Arc::clone(&sink),
            model: OrderModel { order: Arc::clone(&order) },
            recorder,
            log_interval_steps: None,
            save_interval_steps: None,
        };

        // 3 batches * data_sizes.sum() == 2 each = 6 steps, target 5:
        // the coordinator must return after the first wait_and_swap
        // since all three batches are already queued before `run` is
        // called and get drained together.
        coordinator.run(5);
        assert_eq!(order.lock().unwrap().len(), 3);
    }
}
