// Copyright (c) 2025 Felix Kahle.
//
// Permission is hereby granted, free of charge, to any person obtaining
// a copy of this software and associated documentation files (the
// "Software"), to deal in the Software without restriction, including
// without limitation the rights to use, copy, modify, merge, publish,
// distribute, sublicense, and/or sell copies of the Software, and to
// permit persons to whom the Software is furnished to do so, subject to
// the following conditions:
//
// The above copyright notice and this permission notice shall be
// included in all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND,
// EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF
// MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND
// NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE
// LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION
// OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION
// WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

//! # Monte Carlo Simulator
//!
//! Estimates the throughput distribution of a `ThroughputSystem` by drawing
//! random machine states and evaluating each with the fast evaluator.
//!
//! ## Execution model
//!
//! - The trial budget is split into fixed per-worker shares before any
//!   thread starts. Worker `w` draws from its own `ChaCha8Rng` seeded with
//!   `seed + w`, so a seeded run produces the same histogram no matter how
//!   the threads are scheduled.
//! - Workers run under `std::thread::scope` and borrow the system directly.
//! - Each worker owns a monitor stack (trial limit, optional interrupt,
//!   optional time limit, optional log) and consults it between batches.
//! - A worker that stops before finishing its share raises a shared stop
//!   flag so its peers stop at their next batch boundary.
//!
//! ## Usage
//!
//! ```rust
//! use blockflow_engine::system::ThroughputSystem;
//! use blockflow_model::{machine::Machine, topology::TopologyBuilder};
//! use blockflow_sim::simulator::SimulationBuilder;
//!
//! let mut builder = TopologyBuilder::<u32>::new();
//! builder
//!     .ordinary("Block1", [Machine::new("a1", 3, 0.9), Machine::new("a2", 3, 0.9)])
//!     .ordinary("Block2", [Machine::new("b1", 5, 0.8)]);
//! let system = ThroughputSystem::new(builder.build().unwrap()).unwrap();
//!
//! let simulator = SimulationBuilder::new()
//!     .with_trials(20_000)
//!     .with_seed(7)
//!     .build()
//!     .unwrap();
//! let outcome = simulator.run(&system).unwrap();
//!
//! let exact = system.distribution_all_in_service().mean();
//! assert!((outcome.mean() - exact).abs() < 6.0 * outcome.standard_error());
//! ```

use crate::{
    error::SimulationError,
    histogram::EmpiricalDistribution,
    monitor::{
        composite::CompositeMonitor,
        interrupt::InterruptMonitor,
        log::LogMonitor,
        simulation_monitor::{BatchProgress, SimulationCommand, SimulationMonitor},
        time_limit::TimeLimitMonitor,
        trial_limit::TrialLimitMonitor,
    },
    outcome::{SimulationOutcome, SimulationStatisticsBuilder, TerminationReason},
    sampler::MachineSampler,
};
use blockflow_core::num::throughput::Throughput;
use blockflow_engine::{error::EngineError, mask::MaintenancePlan, system::ThroughputSystem};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::{
    sync::atomic::{AtomicBool, Ordering},
    time::{Duration, Instant},
};

pub const DEFAULT_TRIALS: u64 = 100_000;
pub const DEFAULT_SEED: u64 = 0x5eed;
pub const DEFAULT_BATCH_SIZE: u64 = 1024;

const STOPPED_BY_PEER: &str = "stopped by another worker";

/// A configured Monte Carlo run, reusable across systems.
#[derive(Debug, Clone)]
pub struct Simulator<'a> {
    trials: u64,
    seed: u64,
    threads: usize,
    batch_size: u64,
    time_limit: Option<Duration>,
    log_interval: Option<Duration>,
    plan: Option<MaintenancePlan>,
    interrupt: Option<&'a AtomicBool>,
}

/// Everything one worker thread needs.
struct WorkerContext<'s, T> {
    worker: usize,
    quota: u64,
    system: &'s ThroughputSystem<T>,
    sampler: &'s MachineSampler,
    stop_signal: &'s AtomicBool,
}

struct WorkerReport<T> {
    histogram: EmpiricalDistribution<T>,
    batches: u64,
    completed: bool,
    reason: String,
}

impl<'a> Simulator<'a> {
    #[inline]
    pub fn trials(&self) -> u64 {
        self.trials
    }

    #[inline]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    #[inline]
    pub fn threads(&self) -> usize {
        self.threads
    }

    #[inline]
    pub fn batch_size(&self) -> u64 {
        self.batch_size
    }

    #[inline]
    pub fn time_limit(&self) -> Option<Duration> {
        self.time_limit
    }

    #[inline]
    pub fn maintenance_plan(&self) -> Option<&MaintenancePlan> {
        self.plan.as_ref()
    }

    /// Runs the simulation against `system`.
    ///
    /// # Errors
    ///
    /// Returns `SimulationError::Engine` if the maintenance plan does not fit
    /// the system's topology.
    pub fn run<T>(&self, system: &ThroughputSystem<T>) -> Result<SimulationOutcome<T>, SimulationError>
    where
        T: Throughput,
    {
        let topology = system.topology();
        let sampler = match &self.plan {
            Some(plan) => MachineSampler::with_plan(topology, plan).map_err(EngineError::from)?,
            None => MachineSampler::new(topology),
        };

        let threads = self.threads.min(usize::try_from(self.trials).unwrap_or(usize::MAX));
        let quotas = split_trials(self.trials, threads);
        let stop_signal = AtomicBool::new(false);
        let start_time = Instant::now();

        tracing::info!(
            trials = self.trials,
            threads,
            seed = self.seed,
            machines = topology.num_machines(),
            "starting simulation"
        );

        let reports = std::thread::scope(|scope| {
            let handles: Vec<_> = quotas
                .iter()
                .enumerate()
                .map(|(worker, &quota)| {
                    let ctx = WorkerContext {
                        worker,
                        quota,
                        system,
                        sampler: &sampler,
                        stop_signal: &stop_signal,
                    };
                    scope.spawn(move || self.run_worker(ctx, start_time))
                })
                .collect();

            handles
                .into_iter()
                .map(|handle| {
                    handle
                        .join()
                        .unwrap_or_else(|payload| std::panic::resume_unwind(payload))
                })
                .collect::<Result<Vec<_>, EngineError>>()
        })?;

        let outcome = construct_outcome(reports, threads, start_time);
        tracing::info!(
            trials = outcome.trials(),
            mean = outcome.mean(),
            standard_error = outcome.standard_error(),
            reason = %outcome.termination_reason(),
            "simulation finished"
        );
        Ok(outcome)
    }

    fn build_monitor<'s, T>(&'s self, quota: u64, start_time: Instant) -> CompositeMonitor<'s, T>
    where
        T: Throughput + 's,
    {
        let mut monitor = CompositeMonitor::with_capacity(4);
        monitor.add_monitor(TrialLimitMonitor::new(quota));
        if let Some(flag) = self.interrupt {
            monitor.add_monitor(InterruptMonitor::new(flag));
        }
        if let Some(limit) = self.time_limit {
            monitor.add_monitor(TimeLimitMonitor::starting_at(limit, start_time));
        }
        if let Some(interval) = self.log_interval {
            monitor.add_monitor(LogMonitor::new(interval));
        }
        monitor
    }

    fn run_worker<'s, T>(
        &'s self,
        ctx: WorkerContext<'s, T>,
        start_time: Instant,
    ) -> Result<WorkerReport<T>, EngineError>
    where
        T: Throughput,
    {
        let mut monitor: CompositeMonitor<'_, T> = self.build_monitor(ctx.quota, start_time);
        let fast = ctx.system.fast_evaluator();
        let mut scratch = fast.scratch();
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed.wrapping_add(ctx.worker as u64));
        let mut up = Vec::with_capacity(ctx.sampler.num_machines());
        let mut histogram = EmpiricalDistribution::new();
        let mut batches = 0u64;

        monitor.on_enter_simulation(ctx.system.topology());

        let reason = loop {
            if let SimulationCommand::Terminate(reason) = monitor.simulation_command() {
                break reason;
            }
            if ctx.stop_signal.load(Ordering::Relaxed) {
                break STOPPED_BY_PEER.to_string();
            }

            let batch_trials = self.batch_size.min(ctx.quota - histogram.trials());
            for _ in 0..batch_trials {
                ctx.sampler.sample_into(&mut rng, &mut up);
                histogram.record(fast.evaluate_with(&mut scratch, &up)?);
            }
            batches += 1;

            monitor.on_batch(&BatchProgress {
                worker: ctx.worker,
                batches,
                batch_trials,
                worker_trials: histogram.trials(),
                mean: histogram.mean(),
            });
        };

        monitor.on_exit_simulation();

        let completed = histogram.trials() >= ctx.quota;
        if !completed {
            ctx.stop_signal.store(true, Ordering::Relaxed);
        }

        tracing::debug!(
            worker = ctx.worker,
            trials = histogram.trials(),
            batches,
            reason = reason.as_str(),
            "worker finished"
        );

        Ok(WorkerReport {
            histogram,
            batches,
            completed,
            reason,
        })
    }
}

/// Splits `trials` into `threads` shares differing by at most one.
fn split_trials(trials: u64, threads: usize) -> Vec<u64> {
    let threads = threads.max(1) as u64;
    let base = trials / threads;
    let extra = trials % threads;
    (0..threads).map(|w| base + u64::from(w < extra)).collect()
}

fn construct_outcome<T>(
    reports: Vec<WorkerReport<T>>,
    used_threads: usize,
    start_time: Instant,
) -> SimulationOutcome<T>
where
    T: Throughput,
{
    let termination_reason = determine_termination_reason(&reports);

    let mut histogram = EmpiricalDistribution::new();
    let mut batches = 0u64;
    for report in &reports {
        histogram.merge(&report.histogram);
        batches += report.batches;
    }

    let statistics = SimulationStatisticsBuilder::new()
        .trials(histogram.trials())
        .batches(batches)
        .used_threads(used_threads)
        .duration(start_time.elapsed())
        .build();

    SimulationOutcome::new(histogram, termination_reason, statistics)
}

fn determine_termination_reason<T>(reports: &[WorkerReport<T>]) -> TerminationReason {
    if reports.iter().all(|r| r.completed) {
        return TerminationReason::TrialsCompleted;
    }

    // A worker that saw the real cause outranks one stopped by its peers.
    let reason = reports
        .iter()
        .filter(|r| !r.completed)
        .find(|r| r.reason != STOPPED_BY_PEER)
        .or_else(|| reports.iter().find(|r| !r.completed))
        .map(|r| r.reason.clone())
        .unwrap_or_default();
    TerminationReason::Aborted(reason)
}

/// Fluent configuration of a `Simulator`.
#[derive(Debug, Clone)]
pub struct SimulationBuilder<'a> {
    trials: u64,
    seed: u64,
    threads: usize,
    batch_size: u64,
    time_limit: Option<Duration>,
    log_interval: Option<Duration>,
    plan: Option<MaintenancePlan>,
    interrupt: Option<&'a AtomicBool>,
}

impl<'a> Default for SimulationBuilder<'a> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> SimulationBuilder<'a> {
    #[inline]
    pub fn new() -> Self {
        Self {
            trials: DEFAULT_TRIALS,
            seed: DEFAULT_SEED,
            threads: 1,
            batch_size: DEFAULT_BATCH_SIZE,
            time_limit: None,
            log_interval: None,
            plan: None,
            interrupt: None,
        }
    }

    #[inline]
    pub fn with_trials(mut self, trials: u64) -> Self {
        self.trials = trials;
        self
    }

    #[inline]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    #[inline]
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    /// Number of trials a worker runs between two monitor checks.
    #[inline]
    pub fn with_batch_size(mut self, batch_size: u64) -> Self {
        self.batch_size = batch_size;
        self
    }

    #[inline]
    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = Some(limit);
        self
    }

    /// Enables progress logging at most once per `interval` per worker.
    #[inline]
    pub fn with_log_interval(mut self, interval: Duration) -> Self {
        self.log_interval = Some(interval);
        self
    }

    /// Keeps the machines `plan` pulls for maintenance down in every trial.
    #[inline]
    pub fn with_maintenance_plan(mut self, plan: MaintenancePlan) -> Self {
        self.plan = Some(plan);
        self
    }

    /// Stops the run at the next batch boundary once `flag` is raised.
    #[inline]
    pub fn with_interrupt(mut self, flag: &'a AtomicBool) -> Self {
        self.interrupt = Some(flag);
        self
    }

    /// # Errors
    ///
    /// Returns `SimulationError::InvalidConfiguration` if the trial count,
    /// thread count or batch size is zero.
    pub fn build(self) -> Result<Simulator<'a>, SimulationError> {
        if self.trials == 0 {
            return Err(SimulationError::InvalidConfiguration("trials must be positive"));
        }
        if self.threads == 0 {
            return Err(SimulationError::InvalidConfiguration("threads must be positive"));
        }
        if self.batch_size == 0 {
            return Err(SimulationError::InvalidConfiguration("batch size must be positive"));
        }

        Ok(Simulator {
            trials: self.trials,
            seed: self.seed,
            threads: self.threads,
            batch_size: self.batch_size,
            time_limit: self.time_limit,
            log_interval: self.log_interval,
            plan: self.plan,
            interrupt: self.interrupt,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blockflow_engine::{error::MaskCardinalityError, mask::BlockMask};
    use blockflow_model::{index::BlockIndex, machine::Machine, topology::TopologyBuilder};

    fn conveyor_line() -> ThroughputSystem<u32> {
        let mut builder = TopologyBuilder::new();
        builder
            .ordinary("Feed", [Machine::new("f1", 6, 0.9), Machine::new("f2", 3, 0.8)])
            .skip_start("outer", "Bypass", [Machine::new("b1", 3, 0.7)])
            .ordinary("Stacker", [Machine::new("st1", 4, 0.85)])
            .ordinary("Stockpile_Yard", [Machine::new("y1", 5, 0.95)])
            .skip_start("inner", "Shortcut", [Machine::new("sc1", 2, 0.6)])
            .ordinary("Reclaimer", [Machine::new("r1", 3, 0.9), Machine::new("r2", 3, 0.9)])
            .skip_end("inner")
            .ordinary("Conveyor", [Machine::new("cv1", 6, 0.95)])
            .skip_end("outer")
            .ordinary("Sink", [Machine::new("k1", 9, 0.99)]);
        ThroughputSystem::new(builder.build().unwrap()).unwrap()
    }

    #[test]
    fn test_builder_defaults() {
        let simulator = SimulationBuilder::new().build().unwrap();
        assert_eq!(simulator.trials(), DEFAULT_TRIALS);
        assert_eq!(simulator.seed(), DEFAULT_SEED);
        assert_eq!(simulator.threads(), 1);
        assert_eq!(simulator.batch_size(), DEFAULT_BATCH_SIZE);
        assert_eq!(simulator.time_limit(), None);
        assert!(simulator.maintenance_plan().is_none());
    }

    #[test]
    fn test_builder_rejects_zero_settings() {
        assert_eq!(
            SimulationBuilder::new().with_trials(0).build().unwrap_err(),
            SimulationError::InvalidConfiguration("trials must be positive")
        );
        assert_eq!(
            SimulationBuilder::new().with_threads(0).build().unwrap_err(),
            SimulationError::InvalidConfiguration("threads must be positive")
        );
        assert_eq!(
            SimulationBuilder::new().with_batch_size(0).build().unwrap_err(),
            SimulationError::InvalidConfiguration("batch size must be positive")
        );
    }

    #[test]
    fn test_split_trials() {
        assert_eq!(split_trials(10, 3), vec![4, 3, 3]);
        assert_eq!(split_trials(2, 2), vec![1, 1]);
        assert_eq!(split_trials(7, 1), vec![7]);
    }

    #[test]
    fn test_mean_converges_to_exact_expectation() {
        let system = conveyor_line();
        let exact = system.distribution_all_in_service();
        let outcome = SimulationBuilder::new()
            .with_trials(200_000)
            .with_seed(11)
            .build()
            .unwrap()
            .run(&system)
            .unwrap();

        assert_eq!(outcome.termination_reason(), &TerminationReason::TrialsCompleted);
        assert_eq!(outcome.trials(), 200_000);
        let tolerance = 6.0 * outcome.standard_error() + 1e-9;
        assert!(
            (outcome.mean() - exact.mean()).abs() < tolerance,
            "simulated {} vs exact {}",
            outcome.mean(),
            exact.mean()
        );
        assert!((outcome.probability_of_zero() - exact.probability_of(0)).abs() < 0.01);
    }

    #[test]
    fn test_seeded_runs_are_reproducible_across_threads() {
        let system = conveyor_line();
        let simulator = SimulationBuilder::new()
            .with_trials(10_001)
            .with_threads(4)
            .with_batch_size(97)
            .with_seed(3)
            .build()
            .unwrap();

        let first = simulator.run(&system).unwrap();
        let second = simulator.run(&system).unwrap();
        assert_eq!(first.histogram(), second.histogram());
        assert_eq!(first.trials(), 10_001);
        assert_eq!(first.statistics().used_threads, 4);

        let reseeded = SimulationBuilder::new()
            .with_trials(10_001)
            .with_threads(4)
            .with_seed(4)
            .build()
            .unwrap()
            .run(&system)
            .unwrap();
        assert_ne!(first.histogram(), reseeded.histogram());
    }

    #[test]
    fn test_batch_size_does_not_change_samples() {
        let system = conveyor_line();
        let run = |batch_size| {
            SimulationBuilder::new()
                .with_trials(5_000)
                .with_batch_size(batch_size)
                .build()
                .unwrap()
                .run(&system)
                .unwrap()
        };
        let small = run(13);
        let large = run(5_000);
        assert_eq!(small.histogram(), large.histogram());
        assert_eq!(small.statistics().batches, 385);
        assert_eq!(large.statistics().batches, 1);
    }

    #[test]
    fn test_threads_capped_by_trials() {
        let system = conveyor_line();
        let outcome = SimulationBuilder::new()
            .with_trials(3)
            .with_threads(8)
            .build()
            .unwrap()
            .run(&system)
            .unwrap();
        assert_eq!(outcome.statistics().used_threads, 3);
        assert_eq!(outcome.trials(), 3);
    }

    #[test]
    fn test_maintenance_plan_matches_exact_expectation() {
        let system = conveyor_line();
        let mut plan = MaintenancePlan::all_in_service(system.topology());
        plan.set_mask(BlockIndex::new(0), BlockMask::from_bits(0b01));
        let exact = system.expected_throughput(&plan).unwrap();

        let outcome = SimulationBuilder::new()
            .with_trials(100_000)
            .with_threads(2)
            .with_maintenance_plan(plan)
            .build()
            .unwrap()
            .run(&system)
            .unwrap();
        assert!((outcome.mean() - exact).abs() < 6.0 * outcome.standard_error() + 1e-9);
        assert!(outcome.histogram().counts().iter().all(|&(v, _)| v <= 6));
    }

    #[test]
    fn test_plan_must_fit_topology() {
        let system = conveyor_line();
        let result = SimulationBuilder::new()
            .with_maintenance_plan(MaintenancePlan::new(vec![BlockMask::EMPTY]))
            .build()
            .unwrap()
            .run(&system);
        assert!(matches!(
            result,
            Err(SimulationError::Engine(EngineError::MaskCardinality(
                MaskCardinalityError::BlockCount { .. }
            )))
        ));
    }

    #[test]
    fn test_time_limit_aborts_before_first_batch() {
        let system = conveyor_line();
        let outcome = SimulationBuilder::new()
            .with_threads(2)
            .with_time_limit(Duration::ZERO)
            .build()
            .unwrap()
            .run(&system)
            .unwrap();
        assert_eq!(
            outcome.termination_reason(),
            &TerminationReason::Aborted("time limit reached".to_string())
        );
        assert_eq!(outcome.trials(), 0);
        assert_eq!(outcome.distribution(), Err(SimulationError::NoTrials));
    }

    #[test]
    fn test_interrupt_flag_aborts_run() {
        let system = conveyor_line();
        let flag = AtomicBool::new(true);
        let outcome = SimulationBuilder::new()
            .with_interrupt(&flag)
            .build()
            .unwrap()
            .run(&system)
            .unwrap();
        assert_eq!(
            outcome.termination_reason(),
            &TerminationReason::Aborted("interrupt signal received".to_string())
        );
    }

    #[test]
    fn test_peer_stop_reason_is_outranked() {
        let report = |completed, reason: &str| WorkerReport::<u32> {
            histogram: EmpiricalDistribution::new(),
            batches: 0,
            completed,
            reason: reason.to_string(),
        };
        let reports = [
            report(false, STOPPED_BY_PEER),
            report(false, "time limit reached"),
            report(true, "trial limit reached"),
        ];
        assert_eq!(
            determine_termination_reason(&reports),
            TerminationReason::Aborted("time limit reached".to_string())
        );
    }

    #[test]
    fn test_empirical_distribution_is_normalised() {
        let system = conveyor_line();
        let outcome = SimulationBuilder::new()
            .with_trials(2_000)
            .with_log_interval(Duration::from_millis(1))
            .build()
            .unwrap()
            .run(&system)
            .unwrap();
        let distribution = outcome.distribution().unwrap();
        assert!(distribution.is_normalised());
        assert!(distribution.max_value() <= 9);
    }
}
