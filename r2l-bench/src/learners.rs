use crate::{
    error::{BenchError, Result},
    resolver::ResolvedMethod,
};
use candle_core::{Device, Tensor};
use once_cell::sync::Lazy;
use r2l_core::{
    agents::Agent,
    env::{SnapShot, Space},
    rng::with_rng,
};
use rand::Rng;
use std::{collections::HashMap, sync::Arc};

/// Turns a resolved method into an agent ready for online learning.
pub trait AgentBuilder: Send + Sync {
    fn build_agent(&self, method: &ResolvedMethod) -> anyhow::Result<Box<dyn Agent>>;
}

impl<F> AgentBuilder for F
where
    F: Fn(&ResolvedMethod) -> anyhow::Result<Box<dyn Agent>> + Send + Sync,
{
    fn build_agent(&self, method: &ResolvedMethod) -> anyhow::Result<Box<dyn Agent>> {
        (self)(method)
    }
}

type Builder = fn(&ResolvedMethod) -> anyhow::Result<Box<dyn Agent>>;

static BUILTIN_LEARNERS: Lazy<HashMap<&'static str, Builder>> = Lazy::new(|| {
    let mut m: HashMap<&'static str, Builder> = HashMap::new();
    m.insert(RandomAgent::NAME, RandomAgent::build);
    m
});

/// Maps the `policy_learner` of a method descriptor to the builder of its agent.
#[derive(Clone)]
pub struct LearnerRegistry {
    builders: HashMap<String, Arc<dyn AgentBuilder>>,
}

impl Default for LearnerRegistry {
    fn default() -> Self {
        let mut registry = Self {
            builders: HashMap::new(),
        };
        for (name, builder) in BUILTIN_LEARNERS.iter() {
            registry.register(name, *builder);
        }
        registry
    }
}

impl LearnerRegistry {
    pub fn register(&mut self, name: &str, builder: impl AgentBuilder + 'static) {
        self.builders.insert(name.to_owned(), Arc::new(builder));
    }

    #[must_use]
    pub fn with_learner(mut self, name: &str, builder: impl AgentBuilder + 'static) -> Self {
        self.register(name, builder);
        self
    }

    pub fn build(&self, method: &ResolvedMethod) -> Result<Box<dyn Agent>> {
        let builder = self
            .builders
            .get(&method.policy_learner)
            .ok_or_else(|| BenchError::UnknownLearner(method.policy_learner.clone()))?;
        Ok(builder.build_agent(method)?)
    }
}

/// Picks uniformly random actions and never learns. Serves as the baseline every other method
/// should beat.
pub struct RandomAgent {
    action_space: Space,
    device: Device,
}

impl RandomAgent {
    pub const NAME: &'static str = "RandomPolicy";

    pub fn new(action_space: Space, device: Device) -> Self {
        Self {
            action_space,
            device,
        }
    }

    fn build(method: &ResolvedMethod) -> anyhow::Result<Box<dyn Agent>> {
        Ok(Box::new(Self::new(method.action_space.clone(), method.device.clone())))
    }
}

impl Agent for RandomAgent {
    fn reset(&mut self, _observation: &Tensor, action_space: &Space) -> anyhow::Result<()> {
        self.action_space = action_space.clone();
        Ok(())
    }

    fn act(&mut self, _exploit: bool) -> anyhow::Result<Tensor> {
        let action = match &self.action_space {
            Space::Discrete(n) => {
                let action = with_rng(|rng| rng.random_range(0..*n)) as f32;
                Tensor::new(&[action], &self.device)?
            }
            Space::Continous { min, max, shape } => {
                let size = shape.iter().product();
                let action: Vec<f32> = with_rng(|rng| {
                    (0..size)
                        .map(|i| {
                            let lo = min.as_ref().and_then(|m| m.get(i)).copied().unwrap_or(-1.);
                            let hi = max.as_ref().and_then(|m| m.get(i)).copied().unwrap_or(1.);
                            lo + (hi - lo) * rng.random::<f32>()
                        })
                        .collect()
                });
                Tensor::from_vec(action, shape.as_slice(), &self.device)?
            }
        };
        Ok(action)
    }

    fn observe(&mut self, _snapshot: &SnapShot) -> anyhow::Result<()> {
        Ok(())
    }

    fn learn(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}
