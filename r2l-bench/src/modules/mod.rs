pub mod action_representation;
pub mod history_summarization;
pub mod network;

use serde::{Deserialize, Serialize};

/// Constructor arguments of a module, forwarded as is.
pub type Hyperparameters = serde_json::Map<String, serde_json::Value>;

/// A module given by the name of its constructor and the arguments it is called with. The
/// resolver never looks inside these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleSpec {
    pub name: String,
    #[serde(default)]
    pub args: Hyperparameters,
}

impl ModuleSpec {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            args: Hyperparameters::new(),
        }
    }

    #[must_use]
    pub fn with_arg(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.args.insert(key.to_owned(), value.into());
        self
    }
}
