//! Top-level assembly: spawns the worker population and owns shutdown.
use crate::{
    actor::Actor,
    batch::{BatchSink, PredictionEntry},
    coordinator::Coordinator,
    parking::{ActorPark, WorkerPark},
    predictor::Predictor,
    queue::SharedQueue,
    trainer::Trainer,
};
use impala_core::{AggregateRecorder, DiscreteAction, Env, Fragment, Model, NullRecorder, Recorder, ServerConfig};
use std::{
    sync::{Arc, Mutex},
    thread::{self, JoinHandle},
};

/// An assembled, running actor-learner scheduler.
///
/// `Server::build` validates the configuration, constructs one
/// environment per actor via `E::default()`, and spawns the full actor
/// / predictor / trainer population immediately. `Server::run` then
/// spawns the coordinator, blocks until it reaches the requested step
/// target, and performs a graceful shutdown before returning.
///
/// A `Server` is single-shot: `run` takes the model by value out of
/// `Self` and is not meant to be called twice.
pub struct Server<E: Env, M: Model<E>> {
    config: ServerConfig,
    prediction_queue: Arc<SharedQueue<PredictionEntry<E::Obs, E::Act>>>,
    training_queue: Arc<SharedQueue<Fragment<E::Obs, E::Act, E::Reward>>>,
    sink: Arc<BatchSink<E>>,
    actor_parks: Vec<Arc<ActorPark<E::Act>>>,
    predictor_parks: Vec<Arc<WorkerPark>>,
    trainer_parks: Vec<Arc<WorkerPark>>,
    actor_threads: Vec<JoinHandle<()>>,
    predictor_threads: Vec<JoinHandle<()>>,
    trainer_threads: Vec<JoinHandle<()>>,
    model: Option<M>,
    recorder: Arc<Mutex<dyn AggregateRecorder + Send>>,
    shut_down: bool,
}

impl<E, M> Server<E, M>
where
    E: Env + Default + Send + 'static,
    E::Obs: Send,
    E::Act: DiscreteAction + Send,
    E::Reward: Send,
    E::ObsBatch: Send,
    M: Model<E> + Send + 'static,
{
    /// Validates `config`, spawns `num_agents` actors (each with a
    /// fresh `E::default()`), `num_predictors` predictors and
    /// `num_trainers` trainers, and returns the assembled server.
    ///
    /// `episode_recorder`, if given, receives a record from actor 0
    /// whenever one of its episodes finishes. `recorder` receives the
    /// Coordinator's loss/throughput cadence records; defaults to a
    /// [`NullRecorder`] when omitted.
    pub fn build(
        config: ServerConfig,
        model: M,
        recorder: Option<Arc<Mutex<dyn AggregateRecorder + Send>>>,
        episode_recorder: Option<Arc<Mutex<dyn Recorder + Send>>>,
    ) -> impala_core::Result<Self> {
        config.validate()?;

        let prediction_queue = Arc::new(SharedQueue::new());
        let training_queue = Arc::new(SharedQueue::new());
        let sink = Arc::new(BatchSink::new());

        let mut actor_parks = Vec::with_capacity(config.num_agents);
        let mut actor_threads = Vec::with_capacity(config.num_agents);
        for id in 0..config.num_agents {
            let park = Arc::new(ActorPark::new());
            actor_parks.push(Arc::clone(&park));
            let actor = Actor {
                id,
                env: E::default(),
                park,
                prediction_queue: Arc::clone(&prediction_queue),
                training_queue: Arc::clone(&training_queue),
                t_max: config.t_max,
                max_episode_length: config.max_episode_length,
                min_prediction_batch: config.min_prediction_batch_size,
                min_training_batch: config.min_training_batch_size,
                episode_recorder: if id == 0 { episode_recorder.clone() } else { None },
            };
            actor_threads.push(thread::spawn(move || actor.run()));
        }

        let mut predictor_parks = Vec::with_capacity(config.num_predictors);
        let mut predictor_threads = Vec::with_capacity(config.num_predictors);
        for id in 0..config.num_predictors {
            let park = Arc::new(WorkerPark::new());
            predictor_parks.push(Arc::clone(&park));
            let predictor = Predictor {
                id,
                queue: Arc::clone(&prediction_queue),
                sink: Arc::clone(&sink),
                park,
                min_batch: config.min_prediction_batch_size,
                max_batch: config.max_prediction_batch_size,
            };
            predictor_threads.push(thread::spawn(move || predictor.run()));
        }

        let mut trainer_parks = Vec::with_capacity(config.num_trainers);
        let mut trainer_threads = Vec::with_capacity(config.num_trainers);
        for id in 0..config.num_trainers {
            let park = Arc::new(WorkerPark::new());
            trainer_parks.push(Arc::clone(&park));
            let trainer = Trainer {
                id,
                queue: Arc::clone(&training_queue),
                sink: Arc::clone(&sink),
                park,
                min_batch: config.min_training_batch_size,
                max_batch: config.max_training_batch_size,
                t_max: config.t_max,
            };
            trainer_threads.push(thread::spawn(move || trainer.run()));
        }

        Ok(Self {
            config,
            prediction_queue,
            training_queue,
            sink,
            actor_parks,
            predictor_parks,
            trainer_parks,
            actor_threads,
            predictor_threads,
            trainer_threads,
            model: Some(model),
            recorder: recorder.unwrap_or_else(|| Arc::new(Mutex::new(NullRecorder::default()))),
            shut_down: false,
        })
    }

    /// Spawns the coordinator and blocks until it has applied at least
    /// `training_steps_target` cumulative training steps, then performs
    /// a graceful shutdown (predictors, then trainers, then actors) and
    /// returns.
    ///
    /// # Panics
    ///
    /// Panics if called more than once on the same `Server`.
    pub fn run(&mut self, training_steps_target: u64) -> impala_core::Result<()> {
        let model = self.model.take().expect("Server::run called more than once");
        let coordinator = Coordinator {
            sink: Arc::clone(&self.sink),
            model,
            recorder: Arc::clone(&self.recorder),
            log_interval_steps: self.config.log_interval_steps,
            save_interval_steps: self.config.save_interval_steps,
        };
        let handle = thread::spawn(move || coordinator.run(training_steps_target));
        handle.join().expect("coordinator thread panicked");
        self.shutdown();
        Ok(())
    }
}

impl<E: Env, M: Model<E>> Server<E, M> {
    /// Requests every worker to exit and joins them all, in the order
    /// predictors, then trainers, then actors. Idempotent: a second
    /// call (or the one `Drop` performs) is a no-op.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }

        for park in &self.predictor_parks {
            park.request_exit();
        }
        self.prediction_queue.notify_all();
        for handle in self.predictor_threads.drain(..) {
            let _ = handle.join();
        }

        for park in &self.trainer_parks {
            park.request_exit();
        }
        self.training_queue.notify_all();
        for handle in self.trainer_threads.drain(..) {
            let _ = handle.join();
        }

        for park in &self.actor_parks {
            park.request_exit();
        }
        for handle in self.actor_threads.drain(..) {
            let _ = handle.join();
        }

        self.shut_down = true;
    }
}

impl<E: Env, M: Model<E>> Drop for Server<E, M> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
