use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use r2l_bench::{
    aggregate::StdErrorDenominator,
    env_factory::default_env_factory,
    executor::{Executor, RunJob},
    launcher::{Isolation, Launcher},
    learners::LearnerRegistry,
    logging,
    plot::{PlotOptions, render},
    registry::{self, Batch},
    storage::OutputLayout,
};
use std::{collections::BTreeMap, io::Read, path::PathBuf, process::ExitCode};

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum IsolationKind {
    /// every run in a child process, a crash or abort only takes down its own run
    Process,
    /// every run on a worker thread of this process. Panics are contained but an abort is not,
    /// and with the gym feature all runs share one Python interpreter and its GIL
    Thread,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum StdError {
    /// divide by the configured number of runs
    Configured,
    /// divide by the number of runs found on disk
    Found,
}

impl From<StdError> for StdErrorDenominator {
    fn from(value: StdError) -> Self {
        match value {
            StdError::Configured => Self::ConfiguredRuns,
            StdError::Found => Self::FoundRuns,
        }
    }
}

#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the built in benchmark batches
    List,
    /// Run every experiment of the given batches
    Run {
        #[arg(required = true)]
        batches: Vec<String>,
        /// Json file with additional batches
        #[arg(long)]
        config: Option<PathBuf>,
        /// Number of runs executed at the same time
        #[arg(long)]
        workers: Option<usize>,
        /// How runs are kept apart from each other
        #[arg(long, value_enum, default_value_t = IsolationKind::Process)]
        isolation: IsolationKind,
        #[arg(long, default_value = "outputs")]
        output_dir: PathBuf,
    },
    /// Plot the learning curves of the given batches
    Plot {
        #[arg(required = true)]
        batches: Vec<String>,
        #[arg(long)]
        config: Option<PathBuf>,
        /// Overrides the metrics of the batch
        #[arg(long, value_delimiter = ',')]
        metrics: Vec<String>,
        #[arg(long, value_enum, default_value_t = StdError::Configured)]
        std_error: StdError,
        #[arg(long, default_value = "outputs")]
        output_dir: PathBuf,
    },
    /// Execute a single run read as json from stdin
    #[command(hide = true)]
    RunSingle {
        #[arg(long)]
        output_dir: PathBuf,
    },
}

fn batches(names: &[String], config: Option<&PathBuf>) -> Result<Vec<(String, Batch)>> {
    let file_batches = match config {
        Some(path) => registry::load_batch_file(path)?,
        None => BTreeMap::new(),
    };
    let batches = names
        .iter()
        .map(|name| Ok((name.clone(), registry::lookup(name, &file_batches)?)))
        .collect::<Result<Vec<_>>>()?;
    Ok(batches)
}

fn executor(output_dir: PathBuf) -> Executor {
    Executor::new(
        default_env_factory(),
        LearnerRegistry::default(),
        OutputLayout::new(output_dir),
    )
}

fn main() -> Result<ExitCode> {
    logging::init();
    let args = Args::parse();
    match args.command {
        Command::List => {
            for name in registry::names() {
                println!("{name}");
            }
        }
        Command::Run {
            batches: names,
            config,
            workers,
            isolation,
            output_dir,
        } => {
            let isolation = match isolation {
                IsolationKind::Thread => Isolation::Thread,
                IsolationKind::Process => Isolation::current_exe()?,
            };
            let mut launcher = Launcher::new(executor(output_dir)).with_isolation(isolation);
            if let Some(workers) = workers {
                launcher = launcher.with_workers(workers);
            }
            let mut all_succeeded = true;
            for (name, batch) in batches(&names, config.as_ref())? {
                tracing::info!(batch = %name, "running");
                let report = launcher.launch(&batch.experiments)?;
                for run in report.failed() {
                    println!(
                        "{} / {} / run {}: {}",
                        run.job.env_name, run.job.method.name, run.job.run_index, run.status
                    );
                }
                all_succeeded &= report.all_succeeded();
            }
            if !all_succeeded {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::Plot {
            batches: names,
            config,
            metrics,
            std_error,
            output_dir,
        } => {
            let layout = OutputLayout::new(output_dir);
            let options = PlotOptions {
                denominator: std_error.into(),
                ..Default::default()
            };
            for (_, batch) in batches(&names, config.as_ref())? {
                let metrics = if metrics.is_empty() {
                    &batch.metrics
                } else {
                    &metrics
                };
                for experiment in &batch.experiments {
                    render(&layout, experiment, metrics, &options)?;
                }
            }
        }
        Command::RunSingle { output_dir } => {
            let mut input = String::new();
            std::io::stdin().read_to_string(&mut input)?;
            let job: RunJob = serde_json::from_str(&input)?;
            executor(output_dir).execute(&job)?;
        }
    }
    Ok(ExitCode::SUCCESS)
}
