// Named benchmark batches. Learners other than the random baseline come from the learner library
// the harness is linked against, a batch naming an unregistered learner fails run by run.

use crate::{
    error::{BenchError, Result},
    experiment::ExperimentDescriptor,
    learners::RandomAgent,
    method::{Hyperparameters, MethodDescriptor, ModuleSpec},
    modules::{
        action_representation::OneHot,
        history_summarization::Lstm,
        network::{CnnActor, CnnQValue, CnnValue},
    },
};
use once_cell::sync::Lazy;
use r2l_core::online_learning::LearningSchedule;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::{collections::BTreeMap, path::Path};

/// Experiments that are run and plotted together, with the metrics their charts show.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    pub experiments: Vec<ExperimentDescriptor>,
    #[serde(default = "default_metrics")]
    pub metrics: Vec<String>,
}

fn default_metrics() -> Vec<String> {
    vec!["return".to_owned()]
}

fn cost_metrics() -> Vec<String> {
    vec!["return".to_owned(), "return_cost".to_owned()]
}

impl Batch {
    fn new(experiments: Vec<ExperimentDescriptor>) -> Self {
        Self {
            experiments,
            metrics: default_metrics(),
        }
    }

    fn with_metrics(mut self, metrics: Vec<String>) -> Self {
        self.metrics = metrics;
        self
    }
}

fn e_greedy(epsilon: f64) -> ModuleSpec {
    ModuleSpec::new("EGreedyExploration").with_arg("epsilon", epsilon)
}

fn gaussian_exploration(max_action_value: f64, std_dev: f64) -> ModuleSpec {
    ModuleSpec::new("NormalDistributionExploration")
        .with_arg("max_action_value", max_action_value)
        .with_arg("std_dev", std_dev)
}

fn replay_buffer(name: &str, capacity: usize) -> ModuleSpec {
    ModuleSpec::new(name).with_arg("capacity", capacity)
}

fn value_based(name: &str, policy_learner: &str) -> MethodDescriptor {
    MethodDescriptor::new(name, policy_learner)
        .with_arg("hidden_dims", json!([64, 64]))
        .with_arg("learning_rate", 1e-3)
        .with_arg("discount_factor", 0.99)
        .with_arg("batch_size", 128)
        .with_arg("target_update_freq", 10)
        .with_arg("soft_update_tau", 0.75)
        .with_exploration(e_greedy(0.1), None)
        .with_replay_buffer(replay_buffer("BasicReplayBuffer", 50_000))
        .with_action_representation(OneHot::default())
}

fn policy_gradient(name: &str, policy_learner: &str) -> MethodDescriptor {
    MethodDescriptor::new(name, policy_learner)
        .with_arg("actor_hidden_dims", json!([64, 64]))
        .with_arg("critic_hidden_dims", json!([64, 64]))
        .with_arg("actor_learning_rate", 1e-4)
        .with_arg("critic_learning_rate", 1e-4)
        .with_arg("discount_factor", 0.99)
        .with_exploration(ModuleSpec::new("PropensityExploration"), None)
        .with_replay_buffer(replay_buffer("OnPolicyReplayBuffer", 10_000))
        .with_action_representation(OneHot::default())
        .with_learn_after_episode()
}

fn discrete_methods_part_1() -> Vec<MethodDescriptor> {
    let sarsa_buffer = replay_buffer("SARSAReplayBuffer", 50_000);
    let dueling = ModuleSpec::new("DuelingQValueNetwork")
        .with_arg("hidden_dims", json!([64, 64]))
        .with_arg("output_dim", 1);
    let ensemble = ModuleSpec::new("EnsembleQValueNetwork")
        .with_arg("hidden_dims", json!([64, 64]))
        .with_arg("output_dim", 1)
        .with_arg("ensemble_size", 10);
    let bootstrap_buffer = replay_buffer("BootstrapReplayBuffer", 50_000).with_arg("p", 1.0);
    vec![
        value_based("DQN", "DeepQLearning"),
        value_based("DoubleDQN", "DoubleDQN"),
        value_based("SARSA", "DeepSARSA").with_replay_buffer(sarsa_buffer),
        value_based("DuelingDQN", "DeepQLearning").with_network(dueling),
        value_based("BootstrappedDQN", "BootstrappedDQN")
            .with_network(ensemble)
            .with_replay_buffer(bootstrap_buffer),
    ]
}

fn discrete_methods_part_2() -> Vec<MethodDescriptor> {
    vec![
        policy_gradient("REINFORCE", "REINFORCE"),
        policy_gradient("PPO", "ProximalPolicyOptimization")
            .with_arg("epsilon", 0.1)
            .with_arg("trace_decay_param", 0.95)
            .with_arg("entropy_bonus_scaling", 0.01),
        policy_gradient("SAC", "SoftActorCritic")
            .with_arg("entropy_coef", 0.1)
            .with_replay_buffer(replay_buffer("BasicReplayBuffer", 50_000)),
        value_based("QRDQN", "QuantileRegressionDeepQLearning").with_arg("num_quantiles", 10),
    ]
}

fn classic_control(exp_name: &str, env_name: &str, methods: Vec<MethodDescriptor>) -> Batch {
    let budget = LearningSchedule::step_bound(100_000);
    let experiment = ExperimentDescriptor::new(exp_name, env_name, budget)
        .with_num_runs(5)
        .with_record_period(1000)
        .with_print_every_x_steps(1000);
    let experiment = methods
        .into_iter()
        .fold(experiment, ExperimentDescriptor::with_method);
    Batch::new(vec![experiment])
}

fn continuous_methods() -> Vec<MethodDescriptor> {
    let actor_critic = |name: &str, policy_learner: &str| {
        MethodDescriptor::new(name, policy_learner)
            .with_arg("actor_hidden_dims", json!([256, 256]))
            .with_arg("critic_hidden_dims", json!([256, 256]))
            .with_arg("actor_learning_rate", 1e-3)
            .with_arg("critic_learning_rate", 1e-3)
            .with_arg("batch_size", 256)
            .with_replay_buffer(replay_buffer("BasicReplayBuffer", 100_000))
            .with_learning_start_step(10_000)
    };
    vec![
        actor_critic("DDPG", "DeepDeterministicPolicyGradient")
            .with_exploration(gaussian_exploration(1., 0.1), None),
        actor_critic("TD3", "TD3").with_exploration(gaussian_exploration(1., 0.1), None),
        actor_critic("CSAC", "ContinuousSoftActorCritic").with_arg("entropy_coef", 0.05),
        actor_critic("IQL", "ImplicitQLearning").with_arg("expectile", 0.75),
    ]
}

fn mujoco(exp_name: &str, env_name: &str) -> Batch {
    let budget = LearningSchedule::step_bound(1_000_000);
    let experiment = ExperimentDescriptor::new(exp_name, env_name, budget)
        .with_num_runs(5)
        .with_record_period(1000)
        .with_print_every_x_steps(1000);
    let experiment = continuous_methods()
        .into_iter()
        .fold(experiment, ExperimentDescriptor::with_method);
    Batch::new(vec![experiment])
}

fn pendulum_lstm() -> Batch {
    let lstm = Lstm {
        hidden_dim: 128,
        history_length: 8,
        num_layers: 2,
        args: Default::default(),
    };
    let budget = LearningSchedule::step_bound(50_000);
    let mut experiment = ExperimentDescriptor::new("pendulum_v1_lstm", "Pendulum-v1", budget)
        .with_num_runs(5)
        .with_record_period(1000)
        .with_print_every_x_steps(1000);
    for method in continuous_methods().into_iter().take(3) {
        let method = method
            .with_history_summarization(lstm.clone())
            .with_learning_start_step(1000);
        experiment = experiment.with_method(method);
    }
    Batch::new(vec![experiment])
}

fn conv_args() -> Hyperparameters {
    let mut args = Hyperparameters::new();
    args.insert("kernel_sizes".to_owned(), json!([8, 4, 3]));
    args.insert("output_channels".to_owned(), json!([32, 64, 64]));
    args.insert("strides".to_owned(), json!([4, 2, 1]));
    args.insert("paddings".to_owned(), json!([0, 0, 0]));
    args.insert("hidden_dims_fully_connected".to_owned(), json!([512]));
    args
}

fn atari() -> Batch {
    let dqn = value_based("DQN", "DeepQLearning")
        .with_network(CnnQValue { args: conv_args() })
        .with_learning_start_step(50_000)
        .with_learn_every_k_steps(4);
    let ppo = policy_gradient("PPO", "ProximalPolicyOptimization")
        .with_actor_network(CnnActor { args: conv_args() })
        .with_critic_network(CnnValue { args: conv_args() });
    let budget = LearningSchedule::step_bound(10_000_000);
    let experiment = ExperimentDescriptor::new("atari", "BreakoutNoFrameskip-v4", budget)
        .with_num_runs(3)
        .with_record_period(10_000)
        .with_print_every_x_steps(10_000)
        .with_method(dqn)
        .with_method(ppo);
    Batch::new(vec![experiment])
}

fn dynamic_action_space(exp_name: &str) -> Batch {
    let dqn = value_based("DQN dynamic", "DeepQLearning")
        .with_actor_network_type("VanillaQValueNetwork");
    let ppo = policy_gradient("PPO dynamic", "ProximalPolicyOptimization")
        .with_actor_network_type("DynamicActionActorNetwork");
    let reinforce = policy_gradient("REINFORCE dynamic", "REINFORCE")
        .with_actor_network_type("DynamicActionActorNetwork");
    let budget = LearningSchedule::step_bound(100_000);
    let experiment = ExperimentDescriptor::new(exp_name, "CartPole-DynamicAction-v1", budget)
        .with_num_runs(5)
        .with_record_period(1000)
        .with_print_every_x_steps(1000)
        .with_method(dqn)
        .with_method(ppo)
        .with_method(reinforce);
    Batch::new(vec![experiment])
}

fn reward_constrained(method: MethodDescriptor, exp_name: &str, env_name: &str) -> Batch {
    let constraint = ModuleSpec::new("RCSafetyModuleCostConstraint")
        .with_arg("constraint_value", 0.1)
        .with_arg("lambda_constraint_ub_value", 20.)
        .with_arg("lr_lambda", 1e-3);
    let buffer = replay_buffer("RCOffPolicyReplayBuffer", 100_000);
    let method = method
        .with_safety_module(constraint)
        .with_replay_buffer(buffer);
    let budget = LearningSchedule::step_bound(1_000_000);
    let experiment = ExperimentDescriptor::new(exp_name, env_name, budget)
        .with_num_runs(5)
        .with_record_period(1000)
        .with_print_every_x_steps(1000)
        .with_method(method);
    Batch::new(vec![experiment]).with_metrics(cost_metrics())
}

fn random_baseline() -> Batch {
    let budget = LearningSchedule::episode_bound(100);
    let experiment = ExperimentDescriptor::new("random_baseline", "CartPole-v1", budget)
        .with_num_runs(3)
        .with_record_period(1)
        .with_print_every_x_episodes(10)
        .with_method(MethodDescriptor::new("Random", RandomAgent::NAME));
    Batch::new(vec![experiment])
}

static BATCHES: Lazy<BTreeMap<String, Batch>> = Lazy::new(|| {
    let mut m = BTreeMap::new();
    for (prefix, env_name) in [
        ("cartpole_v1", "CartPole-v1"),
        ("acrobot_v1", "Acrobot-v1"),
    ] {
        for (part, methods) in [
            (1, discrete_methods_part_1()),
            (2, discrete_methods_part_2()),
        ] {
            let name = format!("{prefix}_part_{part}");
            let batch = classic_control(&name, env_name, methods);
            m.insert(name, batch);
        }
    }
    for (name, env_name) in [
        ("halfcheetah_v4", "HalfCheetah-v4"),
        ("ant_v4", "Ant-v4"),
        ("hopper_v4", "Hopper-v4"),
        ("walker2d_v4", "Walker2d-v4"),
    ] {
        m.insert(name.to_owned(), mujoco(name, env_name));
    }
    m.insert("pendulum_v1_lstm".to_owned(), pendulum_lstm());
    m.insert("atari".to_owned(), atari());
    let dynamic = "test_dynamic_action_space";
    m.insert(dynamic.to_owned(), dynamic_action_space(dynamic));
    for (suffix, env_name) in [
        ("ant", "Ant-v4_w_dense_cost"),
        ("half_cheetah", "HalfCheetah-v4_w_dense_cost"),
        ("hopper", "Hopper-v4_w_dense_cost"),
        ("walker", "Walker2d-v4_w_dense_cost"),
    ] {
        let methods = continuous_methods();
        for (prefix, method) in ["rcddpg", "rctd3", "rccsac"].into_iter().zip(methods) {
            let name = format!("{prefix}_{suffix}");
            let batch = reward_constrained(method, &name, env_name);
            m.insert(name, batch);
        }
    }
    m.insert("random_baseline".to_owned(), random_baseline());
    m
});

pub fn names() -> impl Iterator<Item = &'static str> {
    BATCHES.keys().map(String::as_str)
}

pub fn batch(name: &str) -> Result<&'static Batch> {
    BATCHES
        .get(name)
        .ok_or_else(|| BenchError::UnknownBatch(name.to_owned()))
}

/// Batches declared in a json file, keyed by their name.
pub fn load_batch_file(path: &Path) -> Result<BTreeMap<String, Batch>> {
    let file = std::fs::File::open(path)?;
    Ok(serde_json::from_reader(std::io::BufReader::new(file))?)
}

/// Looks a batch up in the file batches first, then among the built in ones.
pub fn lookup(name: &str, file_batches: &BTreeMap<String, Batch>) -> Result<Batch> {
    match file_batches.get(name) {
        Some(batch) => Ok(batch.clone()),
        None => batch(name).cloned(),
    }
}
