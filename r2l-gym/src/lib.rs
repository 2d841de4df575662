use anyhow::{Result, bail};
use candle_core::{Device, Tensor};
use pyo3::{
    Bound, PyAny, PyObject, Python,
    types::{PyAnyMethods, PyDict, PyDictMethods},
};
use r2l_core::env::{Env, EnvironmentDescription, SnapShot, Space};

pub struct GymEnv {
    env: PyObject,
    action_space: Space,
    observation_space: Space,
}

// Reads any array like observation as a flat f32 buffer together with its shape.
fn to_tensor(py: Python<'_>, value: &Bound<'_, PyAny>) -> Result<Tensor> {
    let np = py.import("numpy")?;
    let kwargs = PyDict::new(py);
    kwargs.set_item("dtype", "float32")?;
    let array = np.getattr("asarray")?.call((value,), Some(&kwargs))?;
    let shape: Vec<usize> = array.getattr("shape")?.extract()?;
    let data: Vec<f32> = array
        .call_method1("reshape", (-1,))?
        .call_method0("tolist")?
        .extract()?;
    if shape.is_empty() {
        return Ok(Tensor::from_vec(data, 1, &Device::Cpu)?);
    }
    Ok(Tensor::from_vec(data, shape, &Device::Cpu)?)
}

fn discrete_action(action: &Tensor) -> Result<usize> {
    let action = action.flatten_all()?;
    match action.dim(0)? {
        0 => bail!("empty action"),
        1 => Ok(action.to_vec1::<f32>()?[0] as usize),
        // one hot encoded
        _ => Ok(action.argmax(0)?.to_scalar::<u32>()? as usize),
    }
}

impl GymEnv {
    pub fn new(name: &str, render_mode: Option<String>) -> Result<GymEnv> {
        let env = Python::with_gil(|py| -> Result<GymEnv> {
            let gym = py.import("gymnasium")?;
            let kwargs = PyDict::new(py);
            if let Some(render_mode) = render_mode {
                kwargs.set_item("render_mode", render_mode)?;
            }
            let make = gym.getattr("make")?;
            let env = make.call((name,), Some(&kwargs))?;
            let action_space = env.getattr("action_space")?;
            let gym_spaces = py.import("gymnasium.spaces")?;
            let action_space = if action_space.is_instance(&gym_spaces.getattr("Discrete")?)? {
                let val = action_space.getattr("n")?.extract()?;
                Space::Discrete(val)
            } else if action_space.is_instance(&gym_spaces.getattr("Box")?)? {
                let shape: Vec<usize> = action_space.getattr("shape")?.extract()?;
                let low: Vec<f32> = action_space
                    .getattr("low")?
                    .call_method1("reshape", (-1,))?
                    .call_method0("tolist")?
                    .extract()?;
                let high: Vec<f32> = action_space
                    .getattr("high")?
                    .call_method1("reshape", (-1,))?
                    .call_method0("tolist")?
                    .extract()?;
                Space::Continous {
                    min: Some(low),
                    max: Some(high),
                    shape,
                }
            } else {
                bail!("{name}: only discrete and box action spaces are supported");
            };
            let observation_space = env.getattr("observation_space")?;
            let observation_space: Vec<usize> = observation_space.getattr("shape")?.extract()?;
            let observation_space = Space::continous_from_dims(observation_space);
            Ok(GymEnv {
                env: env.into(),
                action_space,
                observation_space,
            })
        })?;
        Ok(env)
    }
}

impl Env for GymEnv {
    fn reset(&mut self, seed: u64) -> Result<Tensor> {
        Python::with_gil(|py| -> Result<Tensor> {
            let kwargs = PyDict::new(py);
            kwargs.set_item("seed", seed)?;
            let state = self.env.call_method(py, "reset", (), Some(&kwargs))?;
            let state = state.bind(py).get_item(0)?;
            to_tensor(py, &state)
        })
    }

    fn step(&mut self, action: &Tensor) -> Result<SnapShot> {
        Python::with_gil(|py| -> Result<SnapShot> {
            let step = match &self.action_space {
                Space::Continous {
                    min: Some(min),
                    max: Some(max),
                    ..
                } => {
                    let action: Vec<f32> = action.flatten_all()?.to_vec1()?;
                    let clipped_action: Vec<f32> = action
                        .iter()
                        .zip(min.iter().zip(max))
                        .map(|(a, (lo, hi))| a.clamp(*lo, *hi))
                        .collect();
                    self.env.call_method(py, "step", (clipped_action,), None)?
                }
                Space::Continous { .. } => {
                    let action: Vec<f32> = action.flatten_all()?.to_vec1()?;
                    self.env.call_method(py, "step", (action,), None)?
                }
                Space::Discrete(_) => {
                    let action = discrete_action(action)?;
                    self.env.call_method(py, "step", (action,), None)?
                }
            };
            let step = step.bind(py);
            let state = to_tensor(py, &step.get_item(0)?)?;
            let reward: f32 = step.get_item(1)?.extract()?;
            let terminated: bool = step.get_item(2)?.extract()?;
            let truncated: bool = step.get_item(3)?.extract()?;
            let info = step.get_item(4)?;
            let cost = match info.downcast::<PyDict>() {
                Ok(info) => match info.get_item("cost")? {
                    Some(cost) => Some(cost.extract::<f32>()?),
                    None => None,
                },
                Err(_) => None,
            };
            Ok(SnapShot {
                state,
                reward,
                cost,
                terminated,
                truncated,
            })
        })
    }

    fn env_description(&self) -> EnvironmentDescription {
        EnvironmentDescription::new(self.observation_space.clone(), self.action_space.clone())
    }
}
