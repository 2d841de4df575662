use r2l_core::env::Env;
use std::sync::Arc;

/// Creates a fresh environment from its registered name.
pub trait EnvFactory: Send + Sync {
    fn create_env(&self, env_name: &str) -> anyhow::Result<Box<dyn Env>>;
}

impl<F> EnvFactory for F
where
    F: Fn(&str) -> anyhow::Result<Box<dyn Env>> + Send + Sync,
{
    fn create_env(&self, env_name: &str) -> anyhow::Result<Box<dyn Env>> {
        (self)(env_name)
    }
}

/// Gymnasium environments, looked up by their gymnasium id.
#[cfg(feature = "gym")]
pub struct GymEnvFactory;

#[cfg(feature = "gym")]
impl EnvFactory for GymEnvFactory {
    fn create_env(&self, env_name: &str) -> anyhow::Result<Box<dyn Env>> {
        Ok(Box::new(r2l_gym::GymEnv::new(env_name, None)?))
    }
}

#[cfg(feature = "gym")]
pub fn default_env_factory() -> Arc<dyn EnvFactory> {
    Arc::new(GymEnvFactory)
}

#[cfg(not(feature = "gym"))]
pub fn default_env_factory() -> Arc<dyn EnvFactory> {
    Arc::new(|env_name: &str| -> anyhow::Result<Box<dyn Env>> {
        anyhow::bail!("cannot create {env_name}: r2l-bench was built without the gym feature")
    })
}
