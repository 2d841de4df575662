use crate::{
    env_factory::EnvFactory,
    error::BenchError,
    executor::Executor,
    learners::LearnerRegistry,
    resolver::ResolvedMethod,
    storage::OutputLayout,
};
use anyhow::{Result, bail};
use candle_core::{DType, Device, Tensor};
use r2l_core::{
    agents::Agent,
    env::{Env, EnvironmentDescription, SnapShot, Space},
};
use std::{path::Path, sync::Arc};

pub const CHAIN_ENV: &str = "Chain-v0";
pub const PIXEL_ENV: &str = "Pixel-v0";
pub const COST_ENV: &str = "Cost-v0";

pub const FAILING_LEARNER: &str = "Failing";
pub const PANICKING_LEARNER: &str = "Panicking";

/// Walks along a chain of `length` states, action 1 is rewarded.
pub struct ChainEnv {
    length: usize,
    position: usize,
}

impl ChainEnv {
    pub fn new(length: usize) -> Self {
        Self {
            length,
            position: 0,
        }
    }

    fn observation(&self) -> Result<Tensor> {
        let mut state = vec![0f32; self.length];
        state[self.position.min(self.length - 1)] = 1.;
        Ok(Tensor::from_vec(state, self.length, &Device::Cpu)?)
    }
}

impl Env for ChainEnv {
    fn reset(&mut self, _seed: u64) -> Result<Tensor> {
        self.position = 0;
        self.observation()
    }

    fn step(&mut self, action: &Tensor) -> Result<SnapShot> {
        let action: Vec<f32> = action.flatten_all()?.to_vec1()?;
        let reward = if action.first() == Some(&1.) { 1. } else { 0. };
        self.position += 1;
        Ok(SnapShot {
            state: self.observation()?,
            reward,
            cost: None,
            terminated: self.position >= self.length,
            truncated: false,
        })
    }

    fn env_description(&self) -> EnvironmentDescription {
        EnvironmentDescription::new(
            Space::continous_from_dims(vec![self.length]),
            Space::Discrete(2),
        )
    }
}

/// Channel first 3x8x8 images, four discrete actions.
pub struct PixelEnv {
    t: usize,
}

impl PixelEnv {
    pub const SHAPE: [usize; 3] = [3, 8, 8];

    pub fn new() -> Self {
        Self { t: 0 }
    }
}

impl Default for PixelEnv {
    fn default() -> Self {
        Self::new()
    }
}

impl Env for PixelEnv {
    fn reset(&mut self, _seed: u64) -> Result<Tensor> {
        self.t = 0;
        Ok(Tensor::zeros(&Self::SHAPE, DType::F32, &Device::Cpu)?)
    }

    fn step(&mut self, _action: &Tensor) -> Result<SnapShot> {
        self.t += 1;
        Ok(SnapShot {
            state: Tensor::ones(&Self::SHAPE, DType::F32, &Device::Cpu)?,
            reward: 0.5,
            cost: None,
            terminated: false,
            truncated: self.t >= 5,
        })
    }

    fn env_description(&self) -> EnvironmentDescription {
        EnvironmentDescription::new(
            Space::continous_from_dims(Self::SHAPE.to_vec()),
            Space::Discrete(4),
        )
    }
}

/// Continuous actions, every step costs 0.5.
pub struct CostEnv {
    t: usize,
}

impl CostEnv {
    pub fn new() -> Self {
        Self { t: 0 }
    }
}

impl Default for CostEnv {
    fn default() -> Self {
        Self::new()
    }
}

impl Env for CostEnv {
    fn reset(&mut self, _seed: u64) -> Result<Tensor> {
        self.t = 0;
        Ok(Tensor::zeros(3, DType::F32, &Device::Cpu)?)
    }

    fn step(&mut self, _action: &Tensor) -> Result<SnapShot> {
        self.t += 1;
        Ok(SnapShot {
            state: Tensor::zeros(3, DType::F32, &Device::Cpu)?,
            reward: 1.,
            cost: Some(0.5),
            terminated: self.t >= 4,
            truncated: false,
        })
    }

    fn env_description(&self) -> EnvironmentDescription {
        EnvironmentDescription::new(
            Space::continous_from_dims(vec![3]),
            Space::Continous {
                min: Some(vec![-1., -1.]),
                max: Some(vec![1., 1.]),
                shape: vec![2],
            },
        )
    }
}

pub fn test_env_factory() -> Arc<dyn EnvFactory> {
    Arc::new(|env_name: &str| -> Result<Box<dyn Env>> {
        match env_name {
            CHAIN_ENV => Ok(Box::new(ChainEnv::new(4))),
            PIXEL_ENV => Ok(Box::new(PixelEnv::new())),
            COST_ENV => Ok(Box::new(CostEnv::new())),
            other => Err(BenchError::UnknownEnvironment(other.to_owned()).into()),
        }
    })
}

struct PanickingAgent;

impl Agent for PanickingAgent {
    fn reset(&mut self, _observation: &Tensor, _action_space: &Space) -> Result<()> {
        Ok(())
    }

    fn act(&mut self, _exploit: bool) -> Result<Tensor> {
        panic!("panicking agent asked for an action")
    }

    fn observe(&mut self, _snapshot: &SnapShot) -> Result<()> {
        Ok(())
    }

    fn learn(&mut self) -> Result<()> {
        Ok(())
    }
}

fn build_failing(method: &ResolvedMethod) -> Result<Box<dyn Agent>> {
    bail!("{} can not be built", method.name)
}

fn build_panicking(_method: &ResolvedMethod) -> Result<Box<dyn Agent>> {
    Ok(Box::new(PanickingAgent))
}

/// The built in learners plus one that can not be built and one that panics while acting.
pub fn test_learners() -> LearnerRegistry {
    LearnerRegistry::default()
        .with_learner(FAILING_LEARNER, build_failing)
        .with_learner(PANICKING_LEARNER, build_panicking)
}

pub fn test_executor(root: &Path) -> Executor {
    Executor::new(test_env_factory(), test_learners(), OutputLayout::new(root))
}
