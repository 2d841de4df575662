use crate::{agents::Agent, env::Env, rng::with_rng};
use anyhow::{Result, ensure};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const RETURN: &str = "return";
pub const RETURN_COST: &str = "return_cost";

/// Metric name to the samples recorded during training, one per record point.
pub type Info = BTreeMap<String, Vec<f32>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LearningSchedule {
    EpisodeBound { n_episodes: usize },
    StepBound { n_steps: usize },
}

impl LearningSchedule {
    pub fn episode_bound(n_episodes: usize) -> Self {
        Self::EpisodeBound { n_episodes }
    }

    pub fn step_bound(n_steps: usize) -> Self {
        Self::StepBound { n_steps }
    }

    pub fn is_step_bound(&self) -> bool {
        matches!(self, Self::StepBound { .. })
    }

    fn finished(&self, total_episodes: usize, total_steps: usize) -> bool {
        match self {
            Self::EpisodeBound { n_episodes } => total_episodes >= *n_episodes,
            Self::StepBound { n_steps } => total_steps >= *n_steps,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OnlineLearningOptions {
    pub schedule: LearningSchedule,
    pub print_every_x_episodes: Option<usize>,
    pub print_every_x_steps: Option<usize>,
    pub learn_after_episode: bool,
    pub learn_every_k_steps: usize,
    pub seed: u64,
    pub record_period: usize,
    pub learning_start_step: usize,
}

impl OnlineLearningOptions {
    pub fn new(schedule: LearningSchedule) -> Self {
        Self {
            schedule,
            print_every_x_episodes: None,
            print_every_x_steps: None,
            learn_after_episode: false,
            learn_every_k_steps: 1,
            seed: 0,
            record_period: 1,
            learning_start_step: 0,
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct EpisodeSummary {
    episode_return: f32,
    episode_cost: Option<f32>,
    steps: usize,
}

impl EpisodeSummary {
    fn record(&self, info: &mut Info) {
        info.entry(RETURN.to_owned())
            .or_default()
            .push(self.episode_return);
        if let Some(cost) = self.episode_cost {
            info.entry(RETURN_COST.to_owned()).or_default().push(cost);
        }
    }
}

fn run_episode<A: Agent + ?Sized, E: Env + ?Sized>(
    agent: &mut A,
    env: &mut E,
    options: &OnlineLearningOptions,
    mut total_steps: usize,
    seed: u64,
) -> Result<EpisodeSummary> {
    let observation = env.reset(seed)?;
    let action_space = env.env_description().action_space;
    agent.reset(&observation, &action_space)?;
    let mut summary = EpisodeSummary::default();
    loop {
        let action = agent.act(false)?;
        let snapshot = env.step(&action)?;
        agent.observe(&snapshot)?;
        summary.episode_return += snapshot.reward;
        if let Some(cost) = snapshot.cost {
            *summary.episode_cost.get_or_insert(0.) += cost;
        }
        summary.steps += 1;
        total_steps += 1;
        if !options.learn_after_episode
            && total_steps >= options.learning_start_step
            && total_steps % options.learn_every_k_steps == 0
        {
            agent.learn()?;
        }
        if snapshot.done() {
            break;
        }
    }
    if options.learn_after_episode {
        agent.learn()?;
    }
    Ok(summary)
}

/// Trains `agent` on `env` until the schedule runs out.
///
/// Episode bound schedules record every `record_period`-th episode, step bound schedules record
/// the episode that crosses a multiple of `record_period` steps. The first episode is reset with
/// `options.seed`, later ones draw their seeds from the thread local generator.
pub fn online_learning<A: Agent + ?Sized, E: Env + ?Sized>(
    agent: &mut A,
    env: &mut E,
    options: &OnlineLearningOptions,
) -> Result<Info> {
    ensure!(
        options.record_period > 0,
        "record period has to be positive"
    );
    ensure!(
        options.learn_every_k_steps > 0,
        "learn_every_k_steps has to be positive"
    );
    let record_period = options.record_period;
    let mut info = Info::new();
    let mut total_steps = 0;
    let mut total_episodes = 0;
    while !options.schedule.finished(total_episodes, total_steps) {
        let old_total_steps = total_steps;
        let seed = if total_episodes == 0 {
            options.seed
        } else {
            with_rng(|rng| rng.random::<u64>())
        };
        let episode = run_episode(agent, env, options, old_total_steps, seed)?;
        total_steps += episode.steps;
        total_episodes += 1;

        if options.schedule.is_step_bound() && episode.steps > record_period {
            tracing::warn!(
                episode_length = episode.steps,
                record_period,
                "an episode is longer than the record period, try to increase it"
            );
        }
        let print_steps = options
            .print_every_x_steps
            .is_some_and(|x| x > 0 && old_total_steps / x < total_steps / x);
        let print_episodes = options
            .print_every_x_episodes
            .is_some_and(|x| x > 0 && total_episodes % x == 0);
        if print_steps || print_episodes {
            tracing::info!(
                "episode {total_episodes}, step {total_steps}, return: {:.2}",
                episode.episode_return
            );
        }

        let should_record = match options.schedule {
            LearningSchedule::EpisodeBound { .. } => total_episodes % record_period == 0,
            LearningSchedule::StepBound { .. } => {
                old_total_steps / record_period < total_steps / record_period
            }
        };
        if should_record {
            episode.record(&mut info);
        }
    }
    Ok(info)
}

#[cfg(test)]
mod test {
    use super::{LearningSchedule, OnlineLearningOptions, RETURN, RETURN_COST, online_learning};
    use crate::{
        agents::Agent,
        env::{Env, EnvironmentDescription, SnapShot, Space},
    };
    use anyhow::Result;
    use candle_core::{DType, Device, Tensor};

    struct FixedLengthEnv {
        episode_length: usize,
        cost: Option<f32>,
        t: usize,
    }

    impl Env for FixedLengthEnv {
        fn reset(&mut self, _seed: u64) -> Result<Tensor> {
            self.t = 0;
            Ok(Tensor::zeros(2, DType::F32, &Device::Cpu)?)
        }

        fn step(&mut self, _action: &Tensor) -> Result<SnapShot> {
            self.t += 1;
            Ok(SnapShot {
                state: Tensor::zeros(2, DType::F32, &Device::Cpu)?,
                reward: 1.,
                cost: self.cost,
                terminated: self.t >= self.episode_length,
                truncated: false,
            })
        }

        fn env_description(&self) -> EnvironmentDescription {
            EnvironmentDescription::new(Space::continous_from_dims(vec![2]), Space::Discrete(2))
        }
    }

    #[derive(Default)]
    struct CountingAgent {
        resets: usize,
        observed: usize,
        learned: usize,
    }

    impl Agent for CountingAgent {
        fn reset(&mut self, _observation: &Tensor, _action_space: &Space) -> Result<()> {
            self.resets += 1;
            Ok(())
        }

        fn act(&mut self, _exploit: bool) -> Result<Tensor> {
            Ok(Tensor::zeros(1, DType::F32, &Device::Cpu)?)
        }

        fn observe(&mut self, _snapshot: &SnapShot) -> Result<()> {
            self.observed += 1;
            Ok(())
        }

        fn learn(&mut self) -> Result<()> {
            self.learned += 1;
            Ok(())
        }
    }

    fn env(episode_length: usize, cost: Option<f32>) -> FixedLengthEnv {
        FixedLengthEnv {
            episode_length,
            cost,
            t: 0,
        }
    }

    #[test]
    fn episode_bound_records_every_period() -> Result<()> {
        let mut agent = CountingAgent::default();
        let mut options = OnlineLearningOptions::new(LearningSchedule::episode_bound(6));
        options.record_period = 2;
        let info = online_learning(&mut agent, &mut env(5, None), &options)?;
        assert_eq!(info[RETURN], vec![5.; 3]);
        assert!(!info.contains_key(RETURN_COST));
        assert_eq!(agent.resets, 6);
        assert_eq!(agent.observed, 30);
        assert_eq!(agent.learned, 30);
        Ok(())
    }

    #[test]
    fn step_bound_records_on_period_crossing() -> Result<()> {
        let mut agent = CountingAgent::default();
        let mut options = OnlineLearningOptions::new(LearningSchedule::step_bound(40));
        options.record_period = 10;
        let info = online_learning(&mut agent, &mut env(4, Some(0.5)), &options)?;
        // 10 episodes of 4 steps cross a multiple of 10 at steps 12, 20, 32 and 40
        assert_eq!(info[RETURN], vec![4.; 4]);
        assert_eq!(info[RETURN_COST], vec![2.; 4]);
        Ok(())
    }

    #[test]
    fn learning_cadence() -> Result<()> {
        let mut agent = CountingAgent::default();
        let mut options = OnlineLearningOptions::new(LearningSchedule::episode_bound(2));
        options.learn_every_k_steps = 3;
        options.learning_start_step = 6;
        online_learning(&mut agent, &mut env(10, None), &options)?;
        // steps 6, 9, 12, 15 and 18 out of 20
        assert_eq!(agent.learned, 5);

        let mut agent = CountingAgent::default();
        options.learn_after_episode = true;
        online_learning(&mut agent, &mut env(10, None), &options)?;
        assert_eq!(agent.learned, 2);
        Ok(())
    }

    #[test]
    fn zero_record_period_is_rejected() {
        let mut agent = CountingAgent::default();
        let mut options = OnlineLearningOptions::new(LearningSchedule::episode_bound(1));
        options.record_period = 0;
        assert!(online_learning(&mut agent, &mut env(1, None), &options).is_err());
    }
}
