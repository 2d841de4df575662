use crate::{
    env_factory::EnvFactory,
    error::Result,
    experiment::{DeviceId, ExperimentDescriptor},
    learners::LearnerRegistry,
    method::MethodDescriptor,
    resolver::resolve,
    storage::OutputLayout,
};
use r2l_core::{
    online_learning::{LearningSchedule, OnlineLearningOptions, online_learning},
    rng,
};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, sync::Arc};

/// Everything one run needs. Serializable so that it can be handed to a child process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunJob {
    pub exp_name: String,
    pub env_name: String,
    pub method: MethodDescriptor,
    pub run_index: usize,
    pub budget: LearningSchedule,
    pub record_period: usize,
    pub print_every_x_episodes: Option<usize>,
    pub print_every_x_steps: Option<usize>,
    pub device_id: DeviceId,
}

impl RunJob {
    pub fn new(
        experiment: &ExperimentDescriptor,
        method: &MethodDescriptor,
        run_index: usize,
    ) -> Self {
        Self {
            exp_name: experiment.exp_name.clone(),
            env_name: experiment.env_name.clone(),
            method: method.clone(),
            run_index,
            budget: experiment.budget,
            record_period: experiment.record_period,
            print_every_x_episodes: experiment.print_every_x_episodes,
            print_every_x_steps: experiment.print_every_x_steps,
            device_id: experiment.device_id,
        }
    }

    /// Every (method, run index) pair of the experiment, methods first.
    pub fn all(experiment: &ExperimentDescriptor) -> impl Iterator<Item = RunJob> + '_ {
        experiment.methods.iter().flat_map(move |method| {
            (0..experiment.num_runs).map(move |run_index| Self::new(experiment, method, run_index))
        })
    }

    pub fn options(&self) -> OnlineLearningOptions {
        OnlineLearningOptions {
            schedule: self.budget,
            print_every_x_episodes: self.print_every_x_episodes,
            print_every_x_steps: self.print_every_x_steps,
            learn_after_episode: self.method.learn_after_episode,
            learn_every_k_steps: self.method.learn_every_k_steps,
            seed: self.run_index as u64,
            record_period: self.record_period,
            learning_start_step: self.method.learning_start_step,
        }
    }
}

/// Performs a single run: seed, build, train, persist.
pub struct Executor {
    env_factory: Arc<dyn EnvFactory>,
    learners: LearnerRegistry,
    layout: OutputLayout,
}

impl Executor {
    pub fn new(
        env_factory: Arc<dyn EnvFactory>,
        learners: LearnerRegistry,
        layout: OutputLayout,
    ) -> Self {
        Self {
            env_factory,
            learners,
            layout,
        }
    }

    pub fn layout(&self) -> &OutputLayout {
        &self.layout
    }

    /// Returns the files the run wrote. Nothing is written unless training finished.
    pub fn execute(&self, job: &RunJob) -> Result<Vec<PathBuf>> {
        let span = tracing::info_span!(
            "run",
            env = %job.env_name,
            method = %job.method.name,
            run = job.run_index
        );
        let _guard = span.enter();
        tracing::info!(
            "Run #{} for {} in {}",
            job.run_index + 1,
            job.method.name,
            job.env_name
        );

        let seed = job.run_index as u64;
        rng::set_seed(seed);
        let device = job.device_id.to_device()?;
        if device.is_cuda() {
            device.set_seed(seed)?;
        }

        let mut env = self.env_factory.create_env(&job.env_name)?;
        let env_description = env.env_description();
        let resolved = resolve(&job.method, &env_description, &device)?;
        let mut agent = self.learners.build(&resolved)?;
        let info = online_learning(&mut agent, &mut env, &job.options())?;

        let files = self
            .layout
            .save_info(&job.env_name, &job.method.name, job.run_index, &info)?;
        tracing::info!(files = files.len(), "run finished");
        Ok(files)
    }
}
