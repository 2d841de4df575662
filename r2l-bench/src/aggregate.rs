use crate::{error::Result, experiment::ExperimentDescriptor, storage::OutputLayout};
use candle_core::{Device, Tensor, shape::Dim};
use serde::{Deserialize, Serialize};

/// What the standard deviation of a point is divided by to get its standard error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum StdErrorDenominator {
    /// sqrt of the configured number of runs, even when some of them are missing
    #[default]
    ConfiguredRuns,
    /// sqrt of the number of runs that were actually found
    FoundRuns,
}

/// Mean and standard error of one metric of one method, one point per record.
#[derive(Debug, Clone, PartialEq)]
pub struct LearningCurve {
    pub method: String,
    pub xs: Vec<f32>,
    pub mean: Vec<f32>,
    pub std_error: Vec<f32>,
    /// Number of runs the curve was computed from.
    pub runs: usize,
}

impl LearningCurve {
    pub fn lower(&self) -> Vec<f32> {
        self.mean
            .iter()
            .zip(&self.std_error)
            .map(|(m, e)| m - e)
            .collect()
    }

    pub fn upper(&self) -> Vec<f32> {
        self.mean
            .iter()
            .zip(&self.std_error)
            .map(|(m, e)| m + e)
            .collect()
    }
}

/// Population variance along `dim`.
pub fn biased_var<D: Dim>(t: &Tensor, dim: D) -> candle_core::Result<Tensor> {
    let dim = dim.to_index(t.shape(), "var")?;
    let mean = t.mean_keepdim(dim)?;
    let squares = t.broadcast_sub(&mean)?.sqr()?;
    (squares.sum_keepdim(dim)? / t.dim(dim)? as f64)?.squeeze(dim)
}

/// Loads every run of `method_name` for `metric` and reduces them to a learning curve. Missing
/// runs are skipped, `None` is returned when none of the runs exists.
pub fn learning_curve(
    layout: &OutputLayout,
    experiment: &ExperimentDescriptor,
    method_name: &str,
    metric: &str,
    denominator: StdErrorDenominator,
) -> Result<Option<LearningCurve>> {
    let mut runs = vec![];
    for run in 0..experiment.num_runs {
        match layout.load_metric(&experiment.env_name, method_name, run, metric)? {
            Some(values) => runs.push(values),
            None => tracing::warn!(
                "File not found for {}",
                layout
                    .run_file(&experiment.env_name, method_name, run, metric)
                    .display()
            ),
        }
    }
    let Some(len) = runs.iter().map(Vec::len).min() else {
        tracing::warn!(method = method_name, metric, "no runs to aggregate");
        return Ok(None);
    };
    if runs.iter().any(|run| run.len() != len) {
        tracing::warn!(
            method = method_name,
            metric,
            "runs have different lengths, truncating them to {len} points"
        );
    }
    if len == 0 {
        return Ok(None);
    }

    let found = runs.len();
    let runs = runs
        .into_iter()
        .map(|mut run| {
            run.truncate(len);
            Tensor::from_vec(run, len, &Device::Cpu)
        })
        .collect::<candle_core::Result<Vec<_>>>()?;
    let data = Tensor::stack(&runs, 0)?;
    let mean = data.mean(0)?;
    let std = biased_var(&data, 0)?.sqrt()?;
    let d = match denominator {
        StdErrorDenominator::ConfiguredRuns => experiment.num_runs,
        StdErrorDenominator::FoundRuns => found,
    };
    let std_error = std.affine(1. / (d as f64).sqrt(), 0.)?;

    let record_period = experiment.record_period as f32;
    Ok(Some(LearningCurve {
        method: method_name.to_owned(),
        xs: (0..len).map(|i| record_period * i as f32).collect(),
        mean: mean.to_vec1()?,
        std_error: std_error.to_vec1()?,
        runs: found,
    }))
}

/// Learning curves of every method of the experiment that has at least one run of `metric`.
pub fn experiment_curves(
    layout: &OutputLayout,
    experiment: &ExperimentDescriptor,
    metric: &str,
    denominator: StdErrorDenominator,
) -> Result<Vec<LearningCurve>> {
    let mut curves = vec![];
    for method in &experiment.methods {
        let curve = learning_curve(layout, experiment, &method.name, metric, denominator)?;
        curves.extend(curve);
    }
    Ok(curves)
}
