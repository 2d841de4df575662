use crate::error::Result;
use candle_core::{DType, Device, Tensor};
use r2l_core::online_learning::Info;
use std::path::{Path, PathBuf};

/// Naming scheme of everything the harness writes. Runs and charts have disjoint names, so
/// concurrent runs never touch the same file.
#[derive(Debug, Clone)]
pub struct OutputLayout {
    root: PathBuf,
}

impl Default for OutputLayout {
    fn default() -> Self {
        Self::new("outputs")
    }
}

impl OutputLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn run_dir(&self, env_name: &str, method_name: &str) -> PathBuf {
        self.root.join(env_name).join(method_name)
    }

    pub fn run_file(&self, env_name: &str, method_name: &str, run: usize, metric: &str) -> PathBuf {
        self.run_dir(env_name, method_name)
            .join(format!("{run}_{metric}.npy"))
    }

    pub fn plot_file(&self, exp_name: &str, env_name: &str, metric: &str) -> PathBuf {
        self.root
            .join(format!("{exp_name}_{env_name}_{metric}.svg"))
    }

    /// Writes every metric of a finished run, replacing earlier outputs of the same run.
    pub fn save_info(
        &self,
        env_name: &str,
        method_name: &str,
        run: usize,
        info: &Info,
    ) -> Result<Vec<PathBuf>> {
        std::fs::create_dir_all(self.run_dir(env_name, method_name))?;
        let mut files = vec![];
        for (metric, values) in info {
            let path = self.run_file(env_name, method_name, run, metric);
            Tensor::from_slice(values, values.len(), &Device::Cpu)?.write_npy(&path)?;
            files.push(path);
        }
        Ok(files)
    }

    /// `None` when the run never produced the metric.
    pub fn load_metric(
        &self,
        env_name: &str,
        method_name: &str,
        run: usize,
        metric: &str,
    ) -> Result<Option<Vec<f32>>> {
        let path = self.run_file(env_name, method_name, run, metric);
        if !path.is_file() {
            return Ok(None);
        }
        let values = Tensor::read_npy(&path)?
            .to_dtype(DType::F32)?
            .flatten_all()?
            .to_vec1()?;
        Ok(Some(values))
    }
}
