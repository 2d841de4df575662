use anyhow::Result;
use candle_core::{Device, Tensor};
use r2l_bench::{
    error::BenchError,
    executor::Executor,
    experiment::ExperimentDescriptor,
    launcher::{Isolation, Launcher, RunStatus},
    learners::{AgentBuilder, RandomAgent},
    method::MethodDescriptor,
    resolver::ResolvedMethod,
    storage::OutputLayout,
    test_utils::{
        CHAIN_ENV, COST_ENV, FAILING_LEARNER, PANICKING_LEARNER, test_env_factory, test_executor,
        test_learners,
    },
};
use r2l_core::{
    agents::Agent,
    env::{SnapShot, Space},
    online_learning::LearningSchedule,
};
use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    thread,
    time::Duration,
};

fn random_experiment(env_name: &str, num_runs: usize) -> ExperimentDescriptor {
    ExperimentDescriptor::new("test", env_name, LearningSchedule::episode_bound(5))
        .with_num_runs(num_runs)
        .with_method(MethodDescriptor::new("Random", RandomAgent::NAME))
}

#[test]
fn runs_every_job_and_persists_outputs() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let layout = OutputLayout::new(dir.path());
    let launcher = Launcher::new(test_executor(dir.path())).with_workers(2);
    let report = launcher.launch(&[random_experiment(CHAIN_ENV, 2)])?;

    assert_eq!(report.runs.len(), 2);
    assert!(report.all_succeeded());
    for run in 0..2 {
        assert_eq!(report.runs[run].job.run_index, run);
        let returns = layout
            .load_metric(CHAIN_ENV, "Random", run, "return")?
            .unwrap();
        assert_eq!(returns.len(), 5);
        assert!(returns.iter().all(|r| (0. ..=4.).contains(r)));
    }
    assert_eq!(layout.load_metric(CHAIN_ENV, "Random", 2, "return")?, None);
    assert_eq!(
        layout.load_metric(CHAIN_ENV, "Random", 0, "return_cost")?,
        None
    );
    Ok(())
}

#[test]
fn runs_are_reproducible() -> Result<()> {
    let first = tempfile::tempdir()?;
    let second = tempfile::tempdir()?;
    Launcher::new(test_executor(first.path())).launch(&[random_experiment(CHAIN_ENV, 2)])?;
    Launcher::new(test_executor(second.path()))
        .with_workers(1)
        .launch(&[random_experiment(CHAIN_ENV, 2)])?;
    for run in 0..2 {
        assert_eq!(
            OutputLayout::new(first.path()).load_metric(CHAIN_ENV, "Random", run, "return")?,
            OutputLayout::new(second.path()).load_metric(CHAIN_ENV, "Random", run, "return")?
        );
    }
    Ok(())
}

#[test]
fn cost_metric_is_recorded() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let launcher = Launcher::new(test_executor(dir.path()));
    let report = launcher.launch(&[random_experiment(COST_ENV, 1)])?;
    assert!(report.all_succeeded());
    let costs = OutputLayout::new(dir.path())
        .load_metric(COST_ENV, "Random", 0, "return_cost")?
        .unwrap();
    assert_eq!(costs, vec![2.; 5]);
    Ok(())
}

#[test]
fn failing_runs_do_not_affect_others() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let layout = OutputLayout::new(dir.path());
    let experiment = random_experiment(CHAIN_ENV, 1)
        .with_method(MethodDescriptor::new("Failing", FAILING_LEARNER))
        .with_method(MethodDescriptor::new("Panicking", PANICKING_LEARNER))
        .with_method(MethodDescriptor::new("Unknown", "NoSuchLearner"));
    let broken_env = random_experiment("NoSuchEnv-v0", 1);
    let report = Launcher::new(test_executor(dir.path()))
        .with_workers(3)
        .launch(&[experiment, broken_env])?;

    let statuses: Vec<_> = report
        .runs
        .iter()
        .map(|run| (run.job.method.name.as_str(), &run.status))
        .collect();
    assert_eq!(statuses.len(), 5);
    assert_eq!(statuses[0], ("Random", &RunStatus::Succeeded));
    let reason = |idx: usize| match statuses[idx].1 {
        RunStatus::Failed { reason } => reason.clone(),
        RunStatus::Succeeded => panic!("{} should have failed", statuses[idx].0),
    };
    assert!(reason(1).contains("can not be built"));
    assert!(reason(2).contains("panicked"));
    assert!(reason(3).contains("NoSuchLearner"));
    assert!(reason(4).contains("NoSuchEnv-v0"));
    assert_eq!(report.failed().count(), 4);

    assert!(layout.load_metric(CHAIN_ENV, "Random", 0, "return")?.is_some());
    assert!(layout.load_metric(CHAIN_ENV, "Failing", 0, "return")?.is_none());
    assert!(layout.load_metric(CHAIN_ENV, "Panicking", 0, "return")?.is_none());
    Ok(())
}

#[derive(Default)]
struct InFlight {
    running: AtomicUsize,
    peak: AtomicUsize,
}

// Counts itself as running from the moment it is built until the run drops it.
struct TrackedAgent(Arc<InFlight>);

impl Drop for TrackedAgent {
    fn drop(&mut self) {
        self.0.running.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Agent for TrackedAgent {
    fn reset(&mut self, _observation: &Tensor, _action_space: &Space) -> Result<()> {
        Ok(())
    }

    fn act(&mut self, _exploit: bool) -> Result<Tensor> {
        thread::sleep(Duration::from_millis(2));
        Ok(Tensor::new(&[1f32], &Device::Cpu)?)
    }

    fn observe(&mut self, _snapshot: &SnapShot) -> Result<()> {
        Ok(())
    }

    fn learn(&mut self) -> Result<()> {
        Ok(())
    }
}

struct TrackedLearner(Arc<InFlight>);

impl AgentBuilder for TrackedLearner {
    fn build_agent(&self, _method: &ResolvedMethod) -> Result<Box<dyn Agent>> {
        let running = self.0.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.0.peak.fetch_max(running, Ordering::SeqCst);
        Ok(Box::new(TrackedAgent(Arc::clone(&self.0))))
    }
}

#[test]
fn parallel_runs_are_capped_by_workers() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let in_flight = Arc::new(InFlight::default());
    let tracked = TrackedLearner(Arc::clone(&in_flight));
    let learners = test_learners().with_learner("Tracked", tracked);
    let executor = Executor::new(test_env_factory(), learners, OutputLayout::new(dir.path()));
    let budget = LearningSchedule::episode_bound(5);
    let experiment = ExperimentDescriptor::new("test", CHAIN_ENV, budget)
        .with_num_runs(6)
        .with_method(MethodDescriptor::new("Tracked", "Tracked"));

    let report = Launcher::new(executor)
        .with_workers(2)
        .launch(&[experiment])?;
    assert_eq!(report.runs.len(), 6);
    assert!(report.all_succeeded());
    assert_eq!(in_flight.running.load(Ordering::SeqCst), 0);
    let peak = in_flight.peak.load(Ordering::SeqCst);
    assert!((1..=2).contains(&peak), "{peak} runs were in flight at once");
    Ok(())
}

#[test]
fn nothing_to_launch() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let launcher = Launcher::new(test_executor(dir.path()));
    assert!(matches!(launcher.launch(&[]), Err(BenchError::NoExperiments)));
    let empty = ExperimentDescriptor::new("empty", CHAIN_ENV, LearningSchedule::episode_bound(1));
    let report = launcher.launch(&[empty])?;
    assert!(report.runs.is_empty());
    Ok(())
}

#[cfg(unix)]
#[test]
fn subprocess_exit_status_decides() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let isolation = |script: &str| Isolation::Subprocess {
        program: "sh".into(),
        args: vec!["-c".to_owned(), script.to_owned()],
    };

    let failing = Launcher::new(test_executor(dir.path()))
        .with_isolation(isolation("cat > /dev/null; exit 3"))
        .launch(&[random_experiment(CHAIN_ENV, 2)])?;
    assert_eq!(failing.failed().count(), 2);
    assert!(matches!(
        &failing.runs[0].status,
        RunStatus::Failed { reason } if reason.contains("exit")
    ));

    let succeeding = Launcher::new(test_executor(dir.path()))
        .with_isolation(isolation("cat > /dev/null"))
        .launch(&[random_experiment(CHAIN_ENV, 2)])?;
    assert!(succeeding.all_succeeded());
    Ok(())
}
