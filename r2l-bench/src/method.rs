use crate::modules::{
    action_representation::ActionRepresentationSpec,
    history_summarization::HistorySummarizationSpec, network::NetworkSpec,
};
use serde::{Deserialize, Serialize};

pub use crate::modules::{Hyperparameters, ModuleSpec};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplorationSpec {
    pub module: ModuleSpec,
    /// Wraps `module`, e.g. to warm start exploration.
    #[serde(default)]
    pub wrapper: Option<ModuleSpec>,
}

fn one() -> usize {
    1
}

/// One algorithm variant to benchmark. Absent optional modules mean the learner's defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodDescriptor {
    pub name: String,
    pub policy_learner: String,
    #[serde(default)]
    pub policy_learner_args: Hyperparameters,
    #[serde(default)]
    pub exploration_module: Option<ExplorationSpec>,
    #[serde(default)]
    pub replay_buffer: Option<ModuleSpec>,
    #[serde(default)]
    pub safety_module: Option<ModuleSpec>,
    #[serde(default)]
    pub action_representation_module: Option<ActionRepresentationSpec>,
    #[serde(default)]
    pub history_summarization_module: Option<HistorySummarizationSpec>,
    #[serde(default)]
    pub network_module: Option<NetworkSpec>,
    #[serde(default)]
    pub critic_network_module: Option<NetworkSpec>,
    #[serde(default)]
    pub actor_network_module: Option<NetworkSpec>,
    #[serde(default)]
    pub use_twin_critic: bool,
    #[serde(default)]
    pub actor_network_type: Option<String>,
    #[serde(default = "one")]
    pub learn_every_k_steps: usize,
    #[serde(default)]
    pub learn_after_episode: bool,
    #[serde(default)]
    pub learning_start_step: usize,
}

impl MethodDescriptor {
    pub fn new(name: &str, policy_learner: &str) -> Self {
        Self {
            name: name.to_owned(),
            policy_learner: policy_learner.to_owned(),
            policy_learner_args: Hyperparameters::new(),
            exploration_module: None,
            replay_buffer: None,
            safety_module: None,
            action_representation_module: None,
            history_summarization_module: None,
            network_module: None,
            critic_network_module: None,
            actor_network_module: None,
            use_twin_critic: false,
            actor_network_type: None,
            learn_every_k_steps: 1,
            learn_after_episode: false,
            learning_start_step: 0,
        }
    }

    #[must_use]
    pub fn with_arg(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.policy_learner_args
            .insert(key.to_owned(), value.into());
        self
    }

    #[must_use]
    pub fn with_exploration(mut self, module: ModuleSpec, wrapper: Option<ModuleSpec>) -> Self {
        self.exploration_module = Some(ExplorationSpec { module, wrapper });
        self
    }

    #[must_use]
    pub fn with_replay_buffer(mut self, replay_buffer: ModuleSpec) -> Self {
        self.replay_buffer = Some(replay_buffer);
        self
    }

    #[must_use]
    pub fn with_safety_module(mut self, safety_module: ModuleSpec) -> Self {
        self.safety_module = Some(safety_module);
        self
    }

    #[must_use]
    pub fn with_action_representation(
        mut self,
        module: impl Into<ActionRepresentationSpec>,
    ) -> Self {
        self.action_representation_module = Some(module.into());
        self
    }

    #[must_use]
    pub fn with_history_summarization(
        mut self,
        module: impl Into<HistorySummarizationSpec>,
    ) -> Self {
        self.history_summarization_module = Some(module.into());
        self
    }

    #[must_use]
    pub fn with_network(mut self, network: impl Into<NetworkSpec>) -> Self {
        self.network_module = Some(network.into());
        self
    }

    #[must_use]
    pub fn with_critic_network(mut self, network: impl Into<NetworkSpec>) -> Self {
        self.critic_network_module = Some(network.into());
        self
    }

    #[must_use]
    pub fn with_actor_network(mut self, network: impl Into<NetworkSpec>) -> Self {
        self.actor_network_module = Some(network.into());
        self
    }

    #[must_use]
    pub fn with_twin_critic(mut self) -> Self {
        self.use_twin_critic = true;
        self
    }

    #[must_use]
    pub fn with_actor_network_type(mut self, actor_network_type: &str) -> Self {
        self.actor_network_type = Some(actor_network_type.to_owned());
        self
    }

    #[must_use]
    pub fn with_learn_every_k_steps(mut self, learn_every_k_steps: usize) -> Self {
        self.learn_every_k_steps = learn_every_k_steps;
        self
    }

    #[must_use]
    pub fn with_learn_after_episode(mut self) -> Self {
        self.learn_after_episode = true;
        self
    }

    #[must_use]
    pub fn with_learning_start_step(mut self, learning_start_step: usize) -> Self {
        self.learning_start_step = learning_start_step;
        self
    }
}
