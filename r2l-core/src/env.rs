use anyhow::Result;
use candle_core::Tensor;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Space {
    Discrete(usize),
    Continous {
        min: Option<Vec<f32>>,
        max: Option<Vec<f32>>,
        shape: Vec<usize>,
    },
}

impl Space {
    pub fn continous_from_dims(dims: Vec<usize>) -> Self {
        Self::Continous {
            min: None,
            max: None,
            shape: dims,
        }
    }

    /// Shape of a single element of the space. Discrete elements are scalars stored in a
    /// single slot.
    pub fn shape(&self) -> Vec<usize> {
        match &self {
            Self::Discrete(_) => vec![1],
            Self::Continous { shape, .. } => shape.clone(),
        }
    }

    /// Number of actions, only defined for discrete spaces.
    pub fn n(&self) -> Option<usize> {
        match &self {
            Self::Discrete(n) => Some(*n),
            Self::Continous { .. } => None,
        }
    }

    /// Dimension of the tensor an action is encoded with.
    pub fn action_dim(&self) -> usize {
        match &self {
            Self::Discrete(_) => 1,
            Self::Continous { shape, .. } => shape.iter().product(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnvironmentDescription {
    pub observation_space: Space,
    pub action_space: Space,
}

impl EnvironmentDescription {
    pub fn new(observation_space: Space, action_space: Space) -> Self {
        Self {
            observation_space,
            action_space,
        }
    }

    pub fn observation_shape(&self) -> Vec<usize> {
        self.observation_space.shape()
    }

    /// The leading dimension of the observation, which is what flat networks take as input.
    pub fn observation_dim(&self) -> usize {
        self.observation_shape().first().copied().unwrap_or(1)
    }
}

pub struct SnapShot {
    pub state: Tensor,
    pub reward: f32,
    // only reported by environments with constraints
    pub cost: Option<f32>,
    pub terminated: bool,
    pub truncated: bool,
}

impl SnapShot {
    pub fn done(&self) -> bool {
        self.terminated || self.truncated
    }
}

pub trait Env {
    fn reset(&mut self, seed: u64) -> Result<Tensor>;
    fn step(&mut self, action: &Tensor) -> Result<SnapShot>;
    fn env_description(&self) -> EnvironmentDescription;
}

impl<E: Env + ?Sized> Env for Box<E> {
    fn reset(&mut self, seed: u64) -> Result<Tensor> {
        (**self).reset(seed)
    }

    fn step(&mut self, action: &Tensor) -> Result<SnapShot> {
        (**self).step(action)
    }

    fn env_description(&self) -> EnvironmentDescription {
        (**self).env_description()
    }
}
