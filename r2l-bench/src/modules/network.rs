use super::{Hyperparameters, ModuleSpec};
use enum_dispatch::enum_dispatch;
use serde::{Deserialize, Serialize};

/// The output heads the convolutional networks come with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvHead {
    QValue,
    QValueMultiHead,
    Value,
    Actor,
}

#[enum_dispatch]
pub trait NetworkModule {
    fn name(&self) -> &str;

    fn args(&self) -> &Hyperparameters;

    /// Convolutional networks need the image dimensions of the observation.
    fn conv_head(&self) -> Option<ConvHead> {
        None
    }
}

macro_rules! conv_network {
    ($ty:ident, $name:literal, $head:expr) => {
        #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
        pub struct $ty {
            #[serde(default)]
            pub args: Hyperparameters,
        }

        impl NetworkModule for $ty {
            fn name(&self) -> &str {
                $name
            }

            fn args(&self) -> &Hyperparameters {
                &self.args
            }

            fn conv_head(&self) -> Option<ConvHead> {
                Some($head)
            }
        }
    };
}

conv_network!(CnnQValue, "CNNQValueNetwork", ConvHead::QValue);
conv_network!(
    CnnQValueMultiHead,
    "CNNQValueMultiHeadNetwork",
    ConvHead::QValueMultiHead
);
conv_network!(CnnValue, "CNNValueNetwork", ConvHead::Value);
conv_network!(CnnActor, "CNNActorNetwork", ConvHead::Actor);

impl NetworkModule for ModuleSpec {
    fn name(&self) -> &str {
        &self.name
    }

    fn args(&self) -> &Hyperparameters {
        &self.args
    }
}

#[enum_dispatch(NetworkModule)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum NetworkSpec {
    CnnQValue(CnnQValue),
    CnnQValueMultiHead(CnnQValueMultiHead),
    CnnValue(CnnValue),
    CnnActor(CnnActor),
    Declared(ModuleSpec),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvNetwork {
    pub name: String,
    pub input_channels: usize,
    pub input_height: usize,
    pub input_width: usize,
    pub action_dim: Option<usize>,
    pub output_dim: usize,
    pub args: Hyperparameters,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseNetwork {
    pub name: String,
    pub state_dim: usize,
    pub action_dim: usize,
    pub args: Hyperparameters,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ResolvedNetwork {
    Conv(ConvNetwork),
    Dense(DenseNetwork),
    /// Passed through to the learner untouched.
    Declared(ModuleSpec),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ResolvedCritic {
    Single(ResolvedNetwork),
    /// Two independently initialized instances of the same network.
    Twin(ResolvedNetwork, ResolvedNetwork),
}
