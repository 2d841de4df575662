use super::Hyperparameters;
use crate::error::ResolveError;
use enum_dispatch::enum_dispatch;
use r2l_core::env::Space;
use serde::{Deserialize, Serialize};

pub const IDENTITY: &str = "IdentityActionRepresentationModule";
pub const ONE_HOT: &str = "OneHotActionTensorRepresentationModule";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedActionRepresentation {
    pub name: String,
    pub max_number_actions: Option<usize>,
    pub representation_dim: Option<usize>,
    pub args: Hyperparameters,
}

impl Default for ResolvedActionRepresentation {
    // used when a method does not ask for a representation, nothing gets injected
    fn default() -> Self {
        Self {
            name: IDENTITY.to_owned(),
            max_number_actions: None,
            representation_dim: None,
            args: Hyperparameters::new(),
        }
    }
}

fn number_of_actions(
    method: &str,
    module: &'static str,
    action_space: &Space,
) -> Result<usize, ResolveError> {
    action_space
        .n()
        .ok_or_else(|| ResolveError::DiscreteActionSpaceRequired {
            method: method.to_owned(),
            module,
        })
}

#[enum_dispatch]
pub trait ActionRepresentation {
    fn resolve(
        &self,
        method: &str,
        action_space: &Space,
    ) -> Result<ResolvedActionRepresentation, ResolveError>;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OneHot {
    #[serde(default)]
    pub args: Hyperparameters,
}

impl ActionRepresentation for OneHot {
    fn resolve(
        &self,
        method: &str,
        action_space: &Space,
    ) -> Result<ResolvedActionRepresentation, ResolveError> {
        let max_number_actions = number_of_actions(method, ONE_HOT, action_space)?;
        Ok(ResolvedActionRepresentation {
            name: ONE_HOT.to_owned(),
            max_number_actions: Some(max_number_actions),
            representation_dim: Some(max_number_actions),
            args: self.args.clone(),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    #[serde(default)]
    pub args: Hyperparameters,
}

impl ActionRepresentation for Identity {
    fn resolve(
        &self,
        method: &str,
        action_space: &Space,
    ) -> Result<ResolvedActionRepresentation, ResolveError> {
        let max_number_actions = number_of_actions(method, IDENTITY, action_space)?;
        Ok(ResolvedActionRepresentation {
            name: IDENTITY.to_owned(),
            max_number_actions: Some(max_number_actions),
            representation_dim: Some(action_space.action_dim()),
            args: self.args.clone(),
        })
    }
}

/// Any other representation, its dimension is whatever the descriptor says.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomRepresentation {
    pub name: String,
    #[serde(default)]
    pub representation_dim: Option<usize>,
    #[serde(default)]
    pub args: Hyperparameters,
}

impl ActionRepresentation for CustomRepresentation {
    fn resolve(
        &self,
        _method: &str,
        _action_space: &Space,
    ) -> Result<ResolvedActionRepresentation, ResolveError> {
        Ok(ResolvedActionRepresentation {
            name: self.name.clone(),
            max_number_actions: None,
            representation_dim: self.representation_dim,
            args: self.args.clone(),
        })
    }
}

#[enum_dispatch(ActionRepresentation)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum ActionRepresentationSpec {
    OneHot(OneHot),
    Identity(Identity),
    Custom(CustomRepresentation),
}

#[cfg(test)]
mod test {
    use super::{ActionRepresentation, ActionRepresentationSpec, Identity, OneHot};
    use crate::error::ResolveError;
    use r2l_core::env::Space;

    #[test]
    fn one_hot_uses_number_of_actions() {
        let spec = ActionRepresentationSpec::from(OneHot::default());
        let resolved = spec.resolve("DQN", &Space::Discrete(5)).unwrap();
        assert_eq!(resolved.max_number_actions, Some(5));
        assert_eq!(resolved.representation_dim, Some(5));
    }

    #[test]
    fn identity_needs_discrete_actions() {
        let spec = ActionRepresentationSpec::from(Identity::default());
        let err = spec
            .resolve("DQN", &Space::continous_from_dims(vec![2]))
            .unwrap_err();
        assert!(matches!(
            err,
            ResolveError::DiscreteActionSpaceRequired { .. }
        ));
    }

    #[test]
    fn deserialize_tagged() {
        let spec: ActionRepresentationSpec = serde_json::from_str(r#"{"kind": "OneHot"}"#).unwrap();
        assert_eq!(spec, ActionRepresentationSpec::OneHot(OneHot::default()));
    }
}
