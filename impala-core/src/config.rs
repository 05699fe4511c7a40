//! Configuration of the actor-learner server.
use crate::error::ImpalaError;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Configuration of a `Server`.
///
/// Worker counts and batch thresholds that the reference C++
/// implementation wires as compile-time template parameters are a
/// plain runtime record here; see the corresponding design note for
/// why that doesn't affect correctness.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct ServerConfig {
    /// Number of actor threads (`A`).
    pub num_agents: usize,

    /// Number of predictor threads (`P`).
    pub num_predictors: usize,

    /// Number of trainer threads (`L`).
    pub num_trainers: usize,

    /// Minimum number of entries a predictor drains before forming a batch.
    pub min_prediction_batch_size: usize,

    /// Maximum number of entries a predictor drains into one batch.
    pub max_prediction_batch_size: usize,

    /// Minimum number of fragments a trainer drains before forming a batch.
    pub min_training_batch_size: usize,

    /// Maximum number of fragments a trainer drains into one batch.
    pub max_training_batch_size: usize,

    /// Upper bound on fragment length; also the training batch's time dimension.
    pub t_max: usize,

    /// Optional hard cap on episode length, independent of `t_max` cuts.
    pub max_episode_length: Option<usize>,

    /// Interval, in trained steps, between cadence log lines. `None` disables logging.
    pub log_interval_steps: Option<usize>,

    /// Interval, in trained steps, between `Model::save` calls. `None` disables checkpointing.
    pub save_interval_steps: Option<usize>,
}

impl Default for ServerConfig {
    /// Mirrors the reference implementation's `DefaultServerParams`.
    fn default() -> Self {
        Self {
            num_agents: 2048,
            num_predictors: 2,
            num_trainers: 2,
            min_prediction_batch_size: 512,
            max_prediction_batch_size: 1024,
            min_training_batch_size: 512,
            max_training_batch_size: 1024,
            t_max: 5,
            max_episode_length: None,
            log_interval_steps: Some(10_000),
            save_interval_steps: Some(1_000_000),
        }
    }
}

impl ServerConfig {
    /// Sets the number of actor threads.
    pub fn num_agents(mut self, v: usize) -> Self {
        self.num_agents = v;
        self
    }

    /// Sets the number of predictor threads.
    pub fn num_predictors(mut self, v: usize) -> Self {
        self.num_predictors = v;
        self
    }

    /// Sets the number of trainer threads.
    pub fn num_trainers(mut self, v: usize) -> Self {
        self.num_trainers = v;
        self
    }

    /// Sets both prediction batch thresholds at once.
    pub fn prediction_batch_size(mut self, min: usize, max: usize) -> Self {
        self.min_prediction_batch_size = min;
        self.max_prediction_batch_size = max;
        self
    }

    /// Sets both training batch thresholds at once.
    pub fn training_batch_size(mut self, min: usize, max: usize) -> Self {
        self.min_training_batch_size = min;
        self.max_training_batch_size = max;
        self
    }

    /// Sets the fragment-length upper bound.
    pub fn t_max(mut self, v: usize) -> Self {
        self.t_max = v;
        self
    }

    /// Sets the hard episode-length cap.
    pub fn max_episode_length(mut self, v: usize) -> Self {
        self.max_episode_length = Some(v);
        self
    }

    /// Sets the cadence log interval.
    pub fn log_interval_steps(mut self, v: usize) -> Self {
        self.log_interval_steps = Some(v);
        self
    }

    /// Sets the checkpoint save interval.
    pub fn save_interval_steps(mut self, v: usize) -> Self {
        self.save_interval_steps = Some(v);
        self
    }

    /// Checks the invariants in §7 of the design (`min <= max`, non-zero
    /// worker counts, `t_max > 0`), returning `ImpalaError::InvalidConfig`
    /// on the first violation found.
    pub fn validate(&self) -> std::result::Result<(), ImpalaError> {
        if self.num_agents == 0 {
            return Err(ImpalaError::InvalidConfig("num_agents must be non-zero".into()));
        }
        if self.num_predictors == 0 {
            return Err(ImpalaError::InvalidConfig("num_predictors must be non-zero".into()));
        }
        if self.num_trainers == 0 {
            return Err(ImpalaError::InvalidConfig("num_trainers must be non-zero".into()));
        }
        if self.t_max == 0 {
            return Err(ImpalaError::InvalidConfig("t_max must be non-zero".into()));
        }
        if self.min_prediction_batch_size > self.max_prediction_batch_size {
            return Err(ImpalaError::InvalidConfig(format!(
                "min_prediction_batch_size ({}) > max_prediction_batch_size ({})",
                self.min_prediction_batch_size, self.max_prediction_batch_size
            )));
        }
        if self.max_prediction_batch_size == 0 {
            return Err(ImpalaError::InvalidConfig(
                "max_prediction_batch_size must be non-zero".into(),
            ));
        }
        if self.min_training_batch_size > self.max_training_batch_size {
            return Err(ImpalaError::InvalidConfig(format!(
                "min_training_batch_size ({}) > max_training_batch_size ({})",
                self.min_training_batch_size, self.max_training_batch_size
            )));
        }
        if self.max_training_batch_size == 0 {
            return Err(ImpalaError::InvalidConfig(
                "max_training_batch_size must be non-zero".into(),
            ));
        }
        if self.max_prediction_batch_size > self.num_agents {
            return Err(ImpalaError::InvalidConfig(format!(
                "max_prediction_batch_size ({}) cannot exceed num_agents ({}): \
                 at most one outstanding request per actor",
                self.max_prediction_batch_size, self.num_agents
            )));
        }
        Ok(())
    }

    /// Constructs a [`ServerConfig`] from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let cfg = serde_yaml::from_reader(rdr)?;
        Ok(cfg)
    }

    /// Saves this [`ServerConfig`] as YAML.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempdir::TempDir;

    #[test]
    fn default_config_validates() {
        ServerConfig::default().validate().unwrap();
    }

    #[test]
    fn rejects_inverted_batch_thresholds() {
        let cfg = ServerConfig::default().prediction_batch_size(100, 10);
        assert!(matches!(cfg.validate(), Err(ImpalaError::InvalidConfig(_))));
    }

    #[test]
    fn rejects_zero_t_max() {
        let cfg = ServerConfig::default().t_max(0);
        assert!(matches!(cfg.validate(), Err(ImpalaError::InvalidConfig(_))));
    }

    #[test]
    fn rejects_prediction_batch_larger_than_agents() {
        let cfg = ServerConfig::default().num_agents(4).prediction_batch_size(2, 8);
        assert!(matches!(cfg.validate(), Err(ImpalaError::InvalidConfig(_))));
    }

    #[test]
    fn round_trips_through_yaml() -> Result<()> {
        let cfg = ServerConfig::default()
            .num_agents(4)
            .num_predictors(1)
            .num_trainers(1)
            .t_max(2)
            .prediction_batch_size(4, 4)
            .training_batch_size(2, 2);

        let dir = TempDir::new("impala_server_config")?;
        let path = dir.path().join("server_config.yaml");

        cfg.save(&path)?;
        let cfg_ = ServerConfig::load(&path)?;
        assert_eq!(cfg, cfg_);
        Ok(())
    }
}
