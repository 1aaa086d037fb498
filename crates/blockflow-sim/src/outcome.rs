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

//! Results of a simulation run.

use crate::{error::SimulationError, histogram::EmpiricalDistribution};
use blockflow_core::num::throughput::Throughput;
use blockflow_engine::distribution::Distribution;
use std::time::Duration;

/// Why a simulation stopped.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TerminationReason {
    /// Every worker ran its full share of the trial budget.
    TrialsCompleted,
    /// A monitor stopped the run early. The string names the monitor's reason.
    Aborted(String),
}

impl std::fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TerminationReason::TrialsCompleted => write!(f, "Trials Completed"),
            TerminationReason::Aborted(reason) => write!(f, "Aborted: {}", reason),
        }
    }
}

/// Statistics collected during a simulation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationStatistics {
    /// Number of trials run across all workers.
    pub trials: u64,
    /// Number of batches run across all workers.
    pub batches: u64,
    /// Number of worker threads used.
    pub used_threads: usize,
    /// Wall-clock duration of the run.
    pub duration: Duration,
}

impl SimulationStatistics {
    /// Trials per second of wall-clock time.
    pub fn trials_per_second(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs > 0.0 {
            self.trials as f64 / secs
        } else {
            0.0
        }
    }
}

impl std::fmt::Display for SimulationStatistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Simulation Statistics:")?;
        writeln!(f, "  Trials: {}", self.trials)?;
        writeln!(f, "  Batches: {}", self.batches)?;
        writeln!(f, "  Used Threads: {}", self.used_threads)?;
        writeln!(f, "  Duration (secs): {:.3}", self.duration.as_secs_f64())
    }
}

/// Builder for `SimulationStatistics`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationStatisticsBuilder {
    trials: u64,
    batches: u64,
    used_threads: usize,
    duration: Duration,
}

impl Default for SimulationStatisticsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulationStatisticsBuilder {
    #[inline]
    pub fn new() -> Self {
        Self {
            trials: 0,
            batches: 0,
            used_threads: 1,
            duration: Duration::ZERO,
        }
    }

    #[inline]
    pub fn trials(mut self, trials: u64) -> Self {
        self.trials = trials;
        self
    }

    #[inline]
    pub fn batches(mut self, batches: u64) -> Self {
        self.batches = batches;
        self
    }

    #[inline]
    pub fn used_threads(mut self, used_threads: usize) -> Self {
        self.used_threads = used_threads;
        self
    }

    #[inline]
    pub fn duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    #[inline]
    pub fn build(self) -> SimulationStatistics {
        SimulationStatistics {
            trials: self.trials,
            batches: self.batches,
            used_threads: self.used_threads,
            duration: self.duration,
        }
    }
}

/// The empirical result of a simulation together with how the run ended.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationOutcome<T> {
    histogram: EmpiricalDistribution<T>,
    termination_reason: TerminationReason,
    statistics: SimulationStatistics,
}

impl<T> SimulationOutcome<T>
where
    T: Throughput,
{
    #[inline]
    pub fn new(
        histogram: EmpiricalDistribution<T>,
        termination_reason: TerminationReason,
        statistics: SimulationStatistics,
    ) -> Self {
        Self {
            histogram,
            termination_reason,
            statistics,
        }
    }

    #[inline]
    pub fn histogram(&self) -> &EmpiricalDistribution<T> {
        &self.histogram
    }

    #[inline]
    pub fn termination_reason(&self) -> &TerminationReason {
        &self.termination_reason
    }

    #[inline]
    pub fn statistics(&self) -> &SimulationStatistics {
        &self.statistics
    }

    #[inline]
    pub fn trials(&self) -> u64 {
        self.histogram.trials()
    }

    #[inline]
    pub fn mean(&self) -> f64 {
        self.histogram.mean()
    }

    #[inline]
    pub fn standard_error(&self) -> f64 {
        self.histogram.standard_error()
    }

    /// Fraction of trials in which the line delivered nothing.
    #[inline]
    pub fn probability_of_zero(&self) -> f64 {
        self.histogram.probability_of(T::zero())
    }

    /// The empirical throughput distribution.
    ///
    /// # Errors
    ///
    /// Returns `SimulationError::NoTrials` if the run recorded nothing.
    pub fn distribution(&self) -> Result<Distribution<T>, SimulationError> {
        if self.histogram.is_empty() {
            return Err(SimulationError::NoTrials);
        }
        self.histogram
            .to_distribution()
            .map_err(|e| SimulationError::Engine(e.into()))
    }
}

impl<T> std::fmt::Display for SimulationOutcome<T>
where
    T: Throughput,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Termination: {}", self.termination_reason)?;
        writeln!(
            f,
            "Mean throughput: {:.6} (standard error {:.6})",
            self.mean(),
            self.standard_error()
        )?;
        writeln!(f, "P(throughput = 0): {:.6}", self.probability_of_zero())?;
        write!(f, "{}", self.statistics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statistics_builder() {
        let stats = SimulationStatisticsBuilder::new()
            .trials(1000)
            .batches(4)
            .used_threads(2)
            .duration(Duration::from_millis(500))
            .build();
        assert_eq!(stats.trials, 1000);
        assert_eq!(stats.batches, 4);
        assert_eq!(stats.used_threads, 2);
        assert!((stats.trials_per_second() - 2000.0).abs() < 1e-9);

        let rendered = stats.to_string();
        assert!(rendered.contains("Simulation Statistics:"));
        assert!(rendered.contains("Used Threads: 2"));
        assert!(rendered.contains("Duration (secs): 0.500"));
    }

    #[test]
    fn test_termination_reason_display() {
        assert_eq!(TerminationReason::TrialsCompleted.to_string(), "Trials Completed");
        assert_eq!(
            TerminationReason::Aborted("time limit reached".to_string()).to_string(),
            "Aborted: time limit reached"
        );
    }

    #[test]
    fn test_outcome_accessors() {
        let mut histogram = EmpiricalDistribution::new();
        for v in [0u32, 0, 4, 4] {
            histogram.record(v);
        }
        let outcome = SimulationOutcome::new(
            histogram,
            TerminationReason::TrialsCompleted,
            SimulationStatisticsBuilder::new().trials(4).build(),
        );
        assert_eq!(outcome.trials(), 4);
        assert_eq!(outcome.probability_of_zero(), 0.5);
        assert!((outcome.mean() - 2.0).abs() < 1e-12);
        assert_eq!(outcome.distribution().unwrap().outcomes(), &[(0, 0.5), (4, 0.5)]);
    }

    #[test]
    fn test_empty_outcome_has_no_distribution() {
        let outcome = SimulationOutcome::<u32>::new(
            EmpiricalDistribution::new(),
            TerminationReason::Aborted("interrupt signal received".to_string()),
            SimulationStatisticsBuilder::new().build(),
        );
        assert_eq!(outcome.distribution(), Err(SimulationError::NoTrials));
        assert_eq!(outcome.mean(), 0.0);
    }
}
