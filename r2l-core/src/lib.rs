pub mod agents;
pub mod env;
pub mod online_learning;
pub mod rng;
