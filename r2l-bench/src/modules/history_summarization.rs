use super::{Hyperparameters, ModuleSpec};
use enum_dispatch::enum_dispatch;
use serde::{Deserialize, Serialize};

pub const STACKING: &str = "StackingHistorySummarizationModule";
pub const LSTM: &str = "LSTMHistorySummarizationModule";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedHistorySummarization {
    pub name: String,
    pub observation_dim: Option<usize>,
    pub action_dim: Option<usize>,
    pub history_length: Option<usize>,
    pub hidden_dim: Option<usize>,
    pub num_layers: Option<usize>,
    pub args: Hyperparameters,
}

#[enum_dispatch]
pub trait HistorySummarization {
    fn summarize(&self, observation_dim: usize, action_dim: usize) -> ResolvedHistorySummarization;

    /// Dimension of the state the policy learner sees, `None` keeps the observation dimension.
    fn state_dim(&self, observation_dim: usize, action_dim: usize) -> Option<usize>;
}

/// Concatenates the last `history_length` (observation, action) pairs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stacking {
    pub history_length: usize,
    #[serde(default)]
    pub args: Hyperparameters,
}

impl HistorySummarization for Stacking {
    fn summarize(&self, observation_dim: usize, action_dim: usize) -> ResolvedHistorySummarization {
        ResolvedHistorySummarization {
            name: STACKING.to_owned(),
            observation_dim: Some(observation_dim),
            action_dim: Some(action_dim),
            history_length: Some(self.history_length),
            hidden_dim: None,
            num_layers: None,
            args: self.args.clone(),
        }
    }

    fn state_dim(&self, observation_dim: usize, action_dim: usize) -> Option<usize> {
        Some((observation_dim + action_dim) * self.history_length)
    }
}

fn one() -> usize {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lstm {
    pub hidden_dim: usize,
    #[serde(default = "one")]
    pub history_length: usize,
    #[serde(default = "one")]
    pub num_layers: usize,
    #[serde(default)]
    pub args: Hyperparameters,
}

impl HistorySummarization for Lstm {
    fn summarize(&self, observation_dim: usize, action_dim: usize) -> ResolvedHistorySummarization {
        ResolvedHistorySummarization {
            name: LSTM.to_owned(),
            observation_dim: Some(observation_dim),
            action_dim: Some(action_dim),
            history_length: Some(self.history_length),
            hidden_dim: Some(self.hidden_dim),
            num_layers: Some(self.num_layers),
            args: self.args.clone(),
        }
    }

    fn state_dim(&self, _observation_dim: usize, _action_dim: usize) -> Option<usize> {
        Some(self.hidden_dim)
    }
}

impl HistorySummarization for ModuleSpec {
    fn summarize(
        &self,
        _observation_dim: usize,
        _action_dim: usize,
    ) -> ResolvedHistorySummarization {
        ResolvedHistorySummarization {
            name: self.name.clone(),
            observation_dim: None,
            action_dim: None,
            history_length: None,
            hidden_dim: None,
            num_layers: None,
            args: self.args.clone(),
        }
    }

    fn state_dim(&self, _observation_dim: usize, _action_dim: usize) -> Option<usize> {
        None
    }
}

#[enum_dispatch(HistorySummarization)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum HistorySummarizationSpec {
    Stacking(Stacking),
    Lstm(Lstm),
    Custom(ModuleSpec),
}
