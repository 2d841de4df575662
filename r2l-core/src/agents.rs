use crate::env::{SnapShot, Space};
use anyhow::Result;
use candle_core::Tensor;

/// An online agent as driven by [`crate::online_learning::online_learning`].
pub trait Agent {
    /// Starts a new episode from the first observation.
    fn reset(&mut self, observation: &Tensor, action_space: &Space) -> Result<()>;

    /// Picks the next action. Exploration is skipped when `exploit` is set.
    fn act(&mut self, exploit: bool) -> Result<Tensor>;

    /// Records the outcome of the last action.
    fn observe(&mut self, snapshot: &SnapShot) -> Result<()>;

    /// Instruments learning with whatever the agent has observed so far
    fn learn(&mut self) -> Result<()>;
}

impl<A: Agent + ?Sized> Agent for Box<A> {
    fn reset(&mut self, observation: &Tensor, action_space: &Space) -> Result<()> {
        (**self).reset(observation, action_space)
    }

    fn act(&mut self, exploit: bool) -> Result<Tensor> {
        (**self).act(exploit)
    }

    fn observe(&mut self, snapshot: &SnapShot) -> Result<()> {
        (**self).observe(snapshot)
    }

    fn learn(&mut self) -> Result<()> {
        (**self).learn()
    }
}
