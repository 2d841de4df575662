use crate::{
    error::ResolveError,
    method::{ExplorationSpec, Hyperparameters, MethodDescriptor, ModuleSpec},
    modules::{
        action_representation::{ActionRepresentation, ResolvedActionRepresentation},
        history_summarization::{HistorySummarization, ResolvedHistorySummarization},
        network::{
            ConvHead, ConvNetwork, DenseNetwork, NetworkModule, NetworkSpec, ResolvedCritic,
            ResolvedNetwork,
        },
    },
};
use candle_core::Device;
use r2l_core::env::{EnvironmentDescription, Space};

/// Everything a policy learner needs to be constructed for one run on one environment. Built
/// fresh for every run, the descriptor it comes from is left untouched.
#[derive(Debug, Clone)]
pub struct ResolvedMethod {
    pub name: String,
    pub policy_learner: String,
    pub policy_learner_args: Hyperparameters,
    /// Missing when the learner works on an ensemble and derives it itself.
    pub state_dim: Option<usize>,
    pub exploration_module: Option<ExplorationSpec>,
    pub replay_buffer: Option<ModuleSpec>,
    pub safety_module: Option<ModuleSpec>,
    pub action_representation_module: ResolvedActionRepresentation,
    pub history_summarization_module: Option<ResolvedHistorySummarization>,
    pub network: Option<ResolvedNetwork>,
    pub q_ensemble_network: Option<ResolvedNetwork>,
    pub critic: Option<ResolvedCritic>,
    pub actor: Option<ResolvedNetwork>,
    pub use_twin_critic: bool,
    pub actor_network_type: Option<String>,
    pub action_space: Space,
    pub device: Device,
}

#[derive(Clone, Copy)]
enum Slot {
    Network,
    Critic,
    Actor,
}

impl Slot {
    fn name(&self) -> &'static str {
        match self {
            Self::Network => "network_module",
            Self::Critic => "critic_network_module",
            Self::Actor => "actor_network_module",
        }
    }

    fn accepts(&self, head: ConvHead) -> bool {
        matches!(
            (self, head),
            (Self::Network, ConvHead::QValue | ConvHead::QValueMultiHead)
                | (
                    Self::Critic,
                    ConvHead::QValue | ConvHead::QValueMultiHead | ConvHead::Value
                )
                | (Self::Actor, ConvHead::Actor)
        )
    }
}

fn conv_head_name(head: ConvHead) -> &'static str {
    match head {
        ConvHead::QValue => "CNNQValueNetwork",
        ConvHead::QValueMultiHead => "CNNQValueMultiHeadNetwork",
        ConvHead::Value => "CNNValueNetwork",
        ConvHead::Actor => "CNNActorNetwork",
    }
}

struct NetworkContext<'a> {
    method: &'a str,
    observation_shape: &'a [usize],
    action_dim: usize,
}

impl NetworkContext<'_> {
    fn build(&self, slot: Slot, spec: &NetworkSpec) -> Result<ResolvedNetwork, ResolveError> {
        let Some(head) = spec.conv_head() else {
            return Ok(ResolvedNetwork::Declared(ModuleSpec {
                name: spec.name().to_owned(),
                args: spec.args().clone(),
            }));
        };
        if !slot.accepts(head) {
            return Err(ResolveError::UnsupportedNetworkSlot {
                method: self.method.to_owned(),
                network: conv_head_name(head),
                slot: slot.name(),
            });
        }
        let [input_channels, input_height, input_width] = self.observation_shape else {
            return Err(ResolveError::ObservationRank {
                method: self.method.to_owned(),
                shape: self.observation_shape.to_vec(),
            });
        };
        let (action_dim, output_dim) = match head {
            ConvHead::QValue => (Some(self.action_dim), 1),
            ConvHead::QValueMultiHead => (Some(self.action_dim), self.action_dim),
            ConvHead::Value => (None, 1),
            ConvHead::Actor => (None, self.action_dim),
        };
        Ok(ResolvedNetwork::Conv(ConvNetwork {
            name: spec.name().to_owned(),
            input_channels: *input_channels,
            input_height: *input_height,
            input_width: *input_width,
            action_dim,
            output_dim,
            args: spec.args().clone(),
        }))
    }
}

// networks of the dueling and bootstrapped variants see the raw observation and actions
fn dense_network(
    method: &MethodDescriptor,
    env_description: &EnvironmentDescription,
) -> Result<ResolvedNetwork, ResolveError> {
    let spec = method
        .network_module
        .as_ref()
        .ok_or_else(|| ResolveError::MissingField {
            method: method.name.clone(),
            field: "network_module",
        })?;
    let action_dim = env_description
        .action_space
        .n()
        .ok_or_else(|| ResolveError::DiscreteActionSpaceRequired {
            method: method.name.clone(),
            module: "network_module",
        })?;
    Ok(ResolvedNetwork::Dense(DenseNetwork {
        name: spec.name().to_owned(),
        state_dim: env_description.observation_dim(),
        action_dim,
        args: spec.args().clone(),
    }))
}

/// Derives the constructor arguments of `method` from the shapes of the environment it is about
/// to run on.
pub fn resolve(
    method: &MethodDescriptor,
    env_description: &EnvironmentDescription,
    device: &Device,
) -> Result<ResolvedMethod, ResolveError> {
    let observation_shape = env_description.observation_shape();
    let observation_dim = env_description.observation_dim();
    let action_space = &env_description.action_space;

    let action_representation_module = match &method.action_representation_module {
        Some(spec) => spec.resolve(&method.name, action_space)?,
        None => ResolvedActionRepresentation::default(),
    };
    let action_dim = action_representation_module
        .representation_dim
        .unwrap_or_else(|| action_space.action_dim());

    let mut state_dim = Some(observation_dim);
    let history_summarization_module = method
        .history_summarization_module
        .as_ref()
        .map(|spec| {
            if let Some(summarized_dim) = spec.state_dim(observation_dim, action_dim) {
                state_dim = Some(summarized_dim);
            }
            spec.summarize(observation_dim, action_dim)
        });

    let context = NetworkContext {
        method: &method.name,
        observation_shape: &observation_shape,
        action_dim,
    };
    let mut network = method
        .network_module
        .as_ref()
        .map(|spec| context.build(Slot::Network, spec))
        .transpose()?;
    let critic = match &method.critic_network_module {
        Some(spec) => {
            let critic = context.build(Slot::Critic, spec)?;
            let q_value_critic = spec.conv_head().is_some_and(|h| h != ConvHead::Value);
            if method.use_twin_critic && q_value_critic {
                Some(ResolvedCritic::Twin(critic.clone(), critic))
            } else {
                Some(ResolvedCritic::Single(critic))
            }
        }
        None => None,
    };
    let actor = method
        .actor_network_module
        .as_ref()
        .map(|spec| context.build(Slot::Actor, spec))
        .transpose()?;

    let mut q_ensemble_network = None;
    if method.name.contains("DuelingDQN") {
        network = Some(dense_network(method, env_description)?);
    }
    // the ensemble replaces the network, it is the only one the learner gets
    if method.name.contains("BootstrappedDQN") {
        q_ensemble_network = Some(dense_network(method, env_description)?);
        network = None;
        state_dim = None;
    }

    if method.name.contains("dynamic") && method.actor_network_type.is_none() {
        return Err(ResolveError::MissingField {
            method: method.name.clone(),
            field: "actor_network_type",
        });
    }

    Ok(ResolvedMethod {
        name: method.name.clone(),
        policy_learner: method.policy_learner.clone(),
        policy_learner_args: method.policy_learner_args.clone(),
        state_dim,
        exploration_module: method.exploration_module.clone(),
        replay_buffer: method.replay_buffer.clone(),
        safety_module: method.safety_module.clone(),
        action_representation_module,
        history_summarization_module,
        network,
        q_ensemble_network,
        critic,
        actor,
        use_twin_critic: method.use_twin_critic,
        actor_network_type: method.actor_network_type.clone(),
        action_space: action_space.clone(),
        device: device.clone(),
    })
}
