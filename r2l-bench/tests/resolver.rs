use anyhow::Result;
use candle_core::Device;
use r2l_bench::{
    error::ResolveError,
    method::{MethodDescriptor, ModuleSpec},
    modules::{
        action_representation::{Identity, OneHot},
        history_summarization::{Lstm, Stacking},
        network::{
            CnnActor, CnnQValue, CnnQValueMultiHead, CnnValue, ConvNetwork, DenseNetwork,
            ResolvedCritic, ResolvedNetwork,
        },
    },
    resolver::resolve,
    test_utils::{ChainEnv, CostEnv, PixelEnv},
};
use r2l_core::env::{Env, EnvironmentDescription};

fn chain() -> EnvironmentDescription {
    ChainEnv::new(4).env_description()
}

fn pixels() -> EnvironmentDescription {
    PixelEnv::new().env_description()
}

fn dqn() -> MethodDescriptor {
    MethodDescriptor::new("DQN", "DeepQLearning")
}

fn stacking(history_length: usize) -> Stacking {
    Stacking {
        history_length,
        args: Default::default(),
    }
}

#[test]
fn state_dim_defaults_to_observation_dim() -> Result<()> {
    let resolved = resolve(&dqn(), &chain(), &Device::Cpu)?;
    assert_eq!(resolved.state_dim, Some(4));
    let representation = &resolved.action_representation_module;
    assert_eq!(representation.representation_dim, None);
    assert!(resolved.history_summarization_module.is_none());
    assert_eq!(resolved.action_space, chain().action_space);
    Ok(())
}

#[test]
fn stacking_uses_representation_dim() -> Result<()> {
    let method = MethodDescriptor::new("DQN", "DeepQLearning")
        .with_action_representation(OneHot::default())
        .with_history_summarization(stacking(3));
    let resolved = resolve(&method, &chain(), &Device::Cpu)?;
    assert_eq!(resolved.state_dim, Some((4 + 2) * 3));
    let history = resolved.history_summarization_module.unwrap();
    assert_eq!(history.observation_dim, Some(4));
    assert_eq!(history.action_dim, Some(2));
    assert_eq!(history.history_length, Some(3));
    Ok(())
}

#[test]
fn stacking_falls_back_to_action_dim() -> Result<()> {
    let method = dqn().with_history_summarization(stacking(2));
    let resolved = resolve(&method, &chain(), &Device::Cpu)?;
    assert_eq!(resolved.state_dim, Some((4 + 1) * 2));
    Ok(())
}

#[test]
fn lstm_state_dim_is_hidden_dim() -> Result<()> {
    let lstm = Lstm {
        hidden_dim: 32,
        history_length: 4,
        num_layers: 1,
        args: Default::default(),
    };
    let method = MethodDescriptor::new("SAC", "SoftActorCritic").with_history_summarization(lstm);
    let resolved = resolve(&method, &chain(), &Device::Cpu)?;
    assert_eq!(resolved.state_dim, Some(32));
    Ok(())
}

#[test]
fn identity_representation() -> Result<()> {
    let method = dqn().with_action_representation(Identity::default());
    let resolved = resolve(&method, &chain(), &Device::Cpu)?;
    let representation = resolved.action_representation_module;
    assert_eq!(representation.representation_dim, Some(1));
    assert_eq!(representation.max_number_actions, Some(2));
    Ok(())
}

#[test]
fn discrete_representations_need_discrete_actions() {
    let method = dqn().with_action_representation(OneHot::default());
    let err = resolve(&method, &CostEnv::new().env_description(), &Device::Cpu).unwrap_err();
    assert_eq!(
        err,
        ResolveError::DiscreteActionSpaceRequired {
            method: "DQN".to_owned(),
            module: "OneHotActionTensorRepresentationModule",
        }
    );
}

#[test]
fn bootstrapped_dqn_drops_state_dim() -> Result<()> {
    let method = MethodDescriptor::new("BootstrappedDQN", "BootstrappedDQN")
        .with_action_representation(OneHot::default())
        .with_network(ModuleSpec::new("EnsembleQValueNetwork").with_arg("ensemble_size", 10));
    let resolved = resolve(&method, &chain(), &Device::Cpu)?;
    assert_eq!(resolved.state_dim, None);
    assert_eq!(resolved.network, None);
    let Some(ResolvedNetwork::Dense(DenseNetwork {
        name,
        state_dim,
        action_dim,
        args,
    })) = resolved.q_ensemble_network
    else {
        panic!("expected a dense ensemble network");
    };
    assert_eq!(name, "EnsembleQValueNetwork");
    assert_eq!((state_dim, action_dim), (4, 2));
    assert_eq!(args["ensemble_size"], 10);
    Ok(())
}

#[test]
fn dueling_dqn_builds_network_from_raw_shapes() -> Result<()> {
    let method = MethodDescriptor::new("DuelingDQN", "DeepQLearning")
        .with_history_summarization(stacking(2))
        .with_network(ModuleSpec::new("DuelingQValueNetwork"));
    let resolved = resolve(&method, &chain(), &Device::Cpu)?;
    // history summarization still drives the state dimension of the learner
    assert_eq!(resolved.state_dim, Some(10));
    assert!(matches!(
        resolved.network,
        Some(ResolvedNetwork::Dense(DenseNetwork {
            state_dim: 4,
            action_dim: 2,
            ..
        }))
    ));

    let missing = MethodDescriptor::new("DuelingDQN", "DeepQLearning");
    assert!(matches!(
        resolve(&missing, &chain(), &Device::Cpu),
        Err(ResolveError::MissingField {
            field: "network_module",
            ..
        })
    ));
    Ok(())
}

#[test]
fn convolutional_networks() -> Result<()> {
    let method = MethodDescriptor::new("DQN", "DeepQLearning")
        .with_action_representation(OneHot::default())
        .with_network(CnnQValue::default())
        .with_critic_network(CnnQValueMultiHead::default())
        .with_actor_network(CnnActor::default())
        .with_twin_critic();
    let resolved = resolve(&method, &pixels(), &Device::Cpu)?;
    let expected = ConvNetwork {
        name: "CNNQValueNetwork".to_owned(),
        input_channels: 3,
        input_height: 8,
        input_width: 8,
        action_dim: Some(4),
        output_dim: 1,
        args: Default::default(),
    };
    assert_eq!(resolved.network, Some(ResolvedNetwork::Conv(expected)));

    let Some(ResolvedCritic::Twin(first, second)) = resolved.critic else {
        panic!("expected a twin critic");
    };
    assert_eq!(first, second);
    assert!(matches!(
        first,
        ResolvedNetwork::Conv(ConvNetwork {
            output_dim: 4,
            action_dim: Some(4),
            ..
        })
    ));
    assert!(matches!(
        resolved.actor,
        Some(ResolvedNetwork::Conv(ConvNetwork {
            output_dim: 4,
            action_dim: None,
            ..
        }))
    ));
    Ok(())
}

#[test]
fn value_critic_has_a_single_output() -> Result<()> {
    let method = MethodDescriptor::new("PPO", "ProximalPolicyOptimization")
        .with_critic_network(CnnValue::default())
        .with_twin_critic();
    let resolved = resolve(&method, &pixels(), &Device::Cpu)?;
    assert!(matches!(
        resolved.critic,
        Some(ResolvedCritic::Single(ResolvedNetwork::Conv(ConvNetwork {
            output_dim: 1,
            action_dim: None,
            ..
        })))
    ));
    Ok(())
}

#[test]
fn convolutional_network_errors() {
    let flat = dqn().with_network(CnnQValue::default());
    assert_eq!(
        resolve(&flat, &chain(), &Device::Cpu).unwrap_err(),
        ResolveError::ObservationRank {
            method: "DQN".to_owned(),
            shape: vec![4],
        }
    );

    let misplaced = dqn().with_network(CnnActor::default());
    assert!(matches!(
        resolve(&misplaced, &pixels(), &Device::Cpu),
        Err(ResolveError::UnsupportedNetworkSlot {
            network: "CNNActorNetwork",
            slot: "network_module",
            ..
        })
    ));
}

#[test]
fn declared_networks_pass_through() -> Result<()> {
    let critic = ModuleSpec::new("VanillaQValueNetwork").with_arg("hidden_dims", vec![64, 64]);
    let method = MethodDescriptor::new("TD3", "TD3")
        .with_critic_network(critic.clone())
        .with_twin_critic();
    let resolved = resolve(&method, &CostEnv::new().env_description(), &Device::Cpu)?;
    assert_eq!(
        resolved.critic,
        Some(ResolvedCritic::Single(ResolvedNetwork::Declared(critic)))
    );
    assert!(resolved.use_twin_critic);
    Ok(())
}

#[test]
fn dynamic_methods_forward_the_actor_type() -> Result<()> {
    let method = MethodDescriptor::new("PPO dynamic", "ProximalPolicyOptimization")
        .with_actor_network_type("DynamicActionActorNetwork");
    let resolved = resolve(&method, &chain(), &Device::Cpu)?;
    assert_eq!(
        resolved.actor_network_type.as_deref(),
        Some("DynamicActionActorNetwork")
    );

    let missing = MethodDescriptor::new("PPO dynamic", "ProximalPolicyOptimization");
    assert!(matches!(
        resolve(&missing, &chain(), &Device::Cpu),
        Err(ResolveError::MissingField {
            field: "actor_network_type",
            ..
        })
    ));
    Ok(())
}

#[test]
fn descriptors_are_left_untouched() -> Result<()> {
    let method = MethodDescriptor::new("DQN", "DeepQLearning")
        .with_action_representation(Identity::default())
        .with_history_summarization(stacking(2))
        .with_exploration(
            ModuleSpec::new("EGreedyExploration").with_arg("epsilon", 0.1),
            Some(ModuleSpec::new("Warmup").with_arg("warmup_steps", 100)),
        );
    let before = method.clone();
    let first = resolve(&method, &chain(), &Device::Cpu)?;
    let second = resolve(&method, &chain(), &Device::Cpu)?;
    assert_eq!(method, before);
    assert_eq!(first.state_dim, second.state_dim);
    assert_eq!(first.exploration_module, method.exploration_module);
    Ok(())
}
