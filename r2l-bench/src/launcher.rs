use crate::{
    error::{BenchError, Result},
    executor::{Executor, RunJob},
    experiment::ExperimentDescriptor,
};
use crossbeam::channel::unbounded;
use derive_more::Display;
use std::{
    any::Any,
    io::Write,
    panic::{AssertUnwindSafe, catch_unwind},
    path::{Path, PathBuf},
    process::{Command, Stdio},
    sync::Arc,
    thread,
};

/// Where a single run executes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Isolation {
    /// On the worker thread itself. Panics are caught and reported as failures.
    Thread,
    /// In a child process, started as `program args.. run-single --output-dir <root>` with the
    /// job written to its stdin as json.
    Subprocess { program: PathBuf, args: Vec<String> },
}

impl Isolation {
    /// Runs every job in a child copy of the current executable.
    pub fn current_exe() -> Result<Self> {
        Ok(Self::Subprocess {
            program: std::env::current_exe()?,
            args: vec![],
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum RunStatus {
    #[display("succeeded")]
    Succeeded,
    #[display("failed: {reason}")]
    Failed { reason: String },
}

impl RunStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub job: RunJob,
    pub status: RunStatus,
}

/// Outcome of every job of a launch, in the order the jobs were queued.
#[derive(Debug, Clone, Default)]
pub struct LaunchReport {
    pub runs: Vec<RunReport>,
}

impl LaunchReport {
    pub fn succeeded(&self) -> impl Iterator<Item = &RunReport> {
        self.runs.iter().filter(|run| run.status.is_success())
    }

    pub fn failed(&self) -> impl Iterator<Item = &RunReport> {
        self.runs.iter().filter(|run| !run.status.is_success())
    }

    pub fn all_succeeded(&self) -> bool {
        self.runs.iter().all(|run| run.status.is_success())
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_owned()
    }
}

/// Runs every (experiment, method, run index) triple on a bounded pool of workers and waits for
/// all of them.
pub struct Launcher {
    executor: Arc<Executor>,
    workers: usize,
    isolation: Isolation,
}

impl Launcher {
    pub fn new(executor: Executor) -> Self {
        let workers = thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        Self {
            executor: Arc::new(executor),
            workers,
            isolation: Isolation::Thread,
        }
    }

    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    #[must_use]
    pub fn with_isolation(mut self, isolation: Isolation) -> Self {
        self.isolation = isolation;
        self
    }

    pub fn launch(&self, experiments: &[ExperimentDescriptor]) -> Result<LaunchReport> {
        if experiments.is_empty() {
            return Err(BenchError::NoExperiments);
        }
        let jobs: Vec<RunJob> = experiments.iter().flat_map(RunJob::all).collect();
        if jobs.is_empty() {
            tracing::warn!("the experiments do not contain any runs");
            return Ok(LaunchReport::default());
        }
        let workers = self.workers.clamp(1, jobs.len());
        tracing::info!(runs = jobs.len(), workers, "launching");

        let (job_tx, job_rx) = unbounded();
        for job in jobs.iter().enumerate() {
            job_tx.send(job).map_err(|_| BenchError::QueueClosed)?;
        }
        drop(job_tx);

        let (status_tx, status_rx) = unbounded();
        thread::scope(|s| {
            for _ in 0..workers {
                let job_rx = job_rx.clone();
                let status_tx = status_tx.clone();
                s.spawn(move || {
                    for (idx, job) in job_rx.iter() {
                        let status = self.run_isolated(job);
                        if let RunStatus::Failed { reason } = &status {
                            tracing::error!(
                                env = %job.env_name,
                                method = %job.method.name,
                                run = job.run_index,
                                "run failed: {reason}"
                            );
                        }
                        if status_tx.send((idx, status)).is_err() {
                            break;
                        }
                    }
                });
            }
        });
        drop(job_rx);
        drop(status_tx);

        let mut statuses: Vec<Option<RunStatus>> = vec![None; jobs.len()];
        for (idx, status) in status_rx.iter() {
            statuses[idx] = Some(status);
        }
        let runs: Vec<RunReport> = jobs
            .into_iter()
            .zip(statuses)
            .map(|(job, status)| RunReport {
                job,
                status: status.unwrap_or_else(|| RunStatus::Failed {
                    reason: "the worker stopped before reporting".to_owned(),
                }),
            })
            .collect();
        let report = LaunchReport { runs };
        tracing::info!(
            "{} of {} runs succeeded",
            report.succeeded().count(),
            report.runs.len()
        );
        Ok(report)
    }

    fn run_isolated(&self, job: &RunJob) -> RunStatus {
        match &self.isolation {
            Isolation::Thread => {
                match catch_unwind(AssertUnwindSafe(|| self.executor.execute(job))) {
                    Ok(Ok(_)) => RunStatus::Succeeded,
                    Ok(Err(e)) => RunStatus::Failed {
                        reason: e.to_string(),
                    },
                    Err(payload) => RunStatus::Failed {
                        reason: format!("panicked: {}", panic_message(payload)),
                    },
                }
            }
            Isolation::Subprocess { program, args } => {
                match self.run_subprocess(program, args, job) {
                    Ok(status) => status,
                    Err(e) => RunStatus::Failed {
                        reason: e.to_string(),
                    },
                }
            }
        }
    }

    fn run_subprocess(&self, program: &Path, args: &[String], job: &RunJob) -> Result<RunStatus> {
        let payload = serde_json::to_vec(job)?;
        let mut child = Command::new(program)
            .args(args)
            .arg("run-single")
            .arg("--output-dir")
            .arg(self.executor.layout().root())
            .stdin(Stdio::piped())
            .spawn()?;
        // the child may exit before reading the job, its exit status tells what happened
        let written = match child.stdin.take() {
            Some(mut stdin) => stdin.write_all(&payload),
            None => Ok(()),
        };
        let exit_status = child.wait()?;
        if !exit_status.success() {
            return Ok(RunStatus::Failed {
                reason: format!("child process exited with {exit_status}"),
            });
        }
        written?;
        Ok(RunStatus::Succeeded)
    }
}
