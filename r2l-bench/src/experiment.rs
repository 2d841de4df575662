use crate::method::MethodDescriptor;
use candle_core::Device;
use r2l_core::online_learning::LearningSchedule;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceId {
    #[default]
    Cpu,
    Cuda(usize),
}

impl DeviceId {
    /// Falls back to the cpu when candle was built without cuda support.
    pub fn to_device(&self) -> candle_core::Result<Device> {
        match self {
            Self::Cpu => Ok(Device::Cpu),
            Self::Cuda(ordinal) => Device::cuda_if_available(*ordinal),
        }
    }
}

fn default_num_runs() -> usize {
    1
}

fn default_record_period() -> usize {
    1
}

/// One environment together with the methods benchmarked on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentDescriptor {
    pub exp_name: String,
    pub env_name: String,
    #[serde(default = "default_num_runs")]
    pub num_runs: usize,
    pub budget: LearningSchedule,
    #[serde(default = "default_record_period")]
    pub record_period: usize,
    #[serde(default)]
    pub print_every_x_episodes: Option<usize>,
    #[serde(default)]
    pub print_every_x_steps: Option<usize>,
    #[serde(default)]
    pub methods: Vec<MethodDescriptor>,
    #[serde(default)]
    pub device_id: DeviceId,
}

impl ExperimentDescriptor {
    pub fn new(exp_name: &str, env_name: &str, budget: LearningSchedule) -> Self {
        Self {
            exp_name: exp_name.to_owned(),
            env_name: env_name.to_owned(),
            num_runs: default_num_runs(),
            budget,
            record_period: default_record_period(),
            print_every_x_episodes: None,
            print_every_x_steps: None,
            methods: vec![],
            device_id: DeviceId::Cpu,
        }
    }

    #[must_use]
    pub fn with_num_runs(mut self, num_runs: usize) -> Self {
        self.num_runs = num_runs;
        self
    }

    #[must_use]
    pub fn with_record_period(mut self, record_period: usize) -> Self {
        self.record_period = record_period;
        self
    }

    #[must_use]
    pub fn with_print_every_x_episodes(mut self, print_every_x_episodes: usize) -> Self {
        self.print_every_x_episodes = Some(print_every_x_episodes);
        self
    }

    #[must_use]
    pub fn with_print_every_x_steps(mut self, print_every_x_steps: usize) -> Self {
        self.print_every_x_steps = Some(print_every_x_steps);
        self
    }

    #[must_use]
    pub fn with_method(mut self, method: MethodDescriptor) -> Self {
        self.methods.push(method);
        self
    }

    #[must_use]
    pub fn with_device(mut self, device_id: DeviceId) -> Self {
        self.device_id = device_id;
        self
    }

    /// Label of the x axis of the learning curves.
    pub fn x_label(&self) -> &'static str {
        if self.budget.is_step_bound() {
            "Steps"
        } else {
            "Episodes"
        }
    }
}
