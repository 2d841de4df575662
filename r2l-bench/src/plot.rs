use crate::{
    aggregate::{LearningCurve, StdErrorDenominator, experiment_curves},
    error::{BenchError, Result},
    experiment::ExperimentDescriptor,
    storage::OutputLayout,
};
use plotters::prelude::*;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy)]
pub struct PlotOptions {
    pub width: u32,
    pub height: u32,
    pub denominator: StdErrorDenominator,
}

impl Default for PlotOptions {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            denominator: StdErrorDenominator::default(),
        }
    }
}

/// Y axis label of a metric.
pub fn metric_title(metric: &str) -> &str {
    match metric {
        "return" => "return",
        "return_cost" => "cumulative cost",
        "risk_sa" => "risk_sa",
        other => other,
    }
}

pub fn chart_title(env_name: &str) -> String {
    env_name.replace('_', "-")
}

fn plot_error<E: std::fmt::Debug>(e: E) -> BenchError {
    BenchError::Plot(format!("{e:?}"))
}

fn bounds(curves: &[LearningCurve]) -> (f32, f32, f32) {
    let x_max = curves
        .iter()
        .flat_map(|curve| curve.xs.iter().copied())
        .fold(0f32, f32::max);
    let (mut y_min, mut y_max) = curves
        .iter()
        .flat_map(|curve| curve.lower().into_iter().chain(curve.upper()))
        .filter(|y| y.is_finite())
        .fold((f32::MAX, f32::MIN), |(lo, hi), y| (lo.min(y), hi.max(y)));
    if y_min > y_max {
        (y_min, y_max) = (0., 1.);
    }
    let padding = if y_max > y_min {
        (y_max - y_min) * 0.05
    } else {
        1.
    };
    let x_max = if x_max > 0. { x_max } else { 1. };
    (x_max, y_min - padding, y_max + padding)
}

/// Draws every curve with its standard error band into one svg chart.
pub fn render_curves(
    path: &Path,
    title: &str,
    x_label: &str,
    y_label: &str,
    curves: &[LearningCurve],
    options: &PlotOptions,
) -> Result<()> {
    let root = SVGBackend::new(path, (options.width, options.height)).into_drawing_area();
    root.fill(&WHITE).map_err(plot_error)?;
    let (x_max, y_min, y_max) = bounds(curves);

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 24))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(70)
        .build_cartesian_2d(0f32..x_max, y_min..y_max)
        .map_err(plot_error)?;
    chart
        .configure_mesh()
        .x_desc(x_label)
        .y_desc(y_label)
        .x_label_formatter(&|x| format!("{x:.1e}"))
        .y_label_formatter(&|y| format!("{y:.1e}"))
        .draw()
        .map_err(plot_error)?;

    for (idx, curve) in curves.iter().enumerate() {
        let color = Palette99::pick(idx).to_rgba();
        let band: Vec<(f32, f32)> = curve
            .xs
            .iter()
            .copied()
            .zip(curve.upper())
            .chain(curve.xs.iter().copied().zip(curve.lower()).rev())
            .collect();
        let area = Polygon::new(band, color.mix(0.2).filled());
        chart.draw_series([area]).map_err(plot_error)?;
        chart
            .draw_series(LineSeries::new(
                curve.xs.iter().copied().zip(curve.mean.iter().copied()),
                color.stroke_width(2),
            ))
            .map_err(plot_error)?
            .label(curve.method.as_str())
            .legend(move |(x, y)| {
                PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2))
            });
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(plot_error)?;
    root.present().map_err(plot_error)?;
    Ok(())
}

/// One chart per metric, every method of the experiment overlaid. Metrics without any run are
/// skipped.
pub fn render(
    layout: &OutputLayout,
    experiment: &ExperimentDescriptor,
    metrics: &[String],
    options: &PlotOptions,
) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(layout.root())?;
    let mut charts = vec![];
    for metric in metrics {
        let curves = experiment_curves(layout, experiment, metric, options.denominator)?;
        if curves.is_empty() {
            tracing::warn!(
                exp = %experiment.exp_name,
                metric = %metric,
                "nothing to plot"
            );
            continue;
        }
        let path = layout.plot_file(&experiment.exp_name, &experiment.env_name, metric);
        render_curves(
            &path,
            &chart_title(&experiment.env_name),
            experiment.x_label(),
            metric_title(metric),
            &curves,
            options,
        )?;
        tracing::info!("saved {}", path.display());
        charts.push(path);
    }
    Ok(charts)
}

#[cfg(test)]
mod test {
    use super::{chart_title, metric_title};

    #[test]
    fn titles() {
        assert_eq!(chart_title("Ant_v4"), "Ant-v4");
        assert_eq!(metric_title("return_cost"), "cumulative cost");
        assert_eq!(metric_title("success"), "success");
    }
}
