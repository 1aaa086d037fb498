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

//! # Trial Limit Monitor
//!
//! Counts the trials a single worker has run and terminates the worker once
//! its quota is met. The quota is per worker: the simulator splits the total
//! trial budget into fixed shares up front so a seeded run does not depend on
//! thread scheduling.

use crate::monitor::simulation_monitor::{BatchProgress, SimulationCommand, SimulationMonitor};
use blockflow_core::num::throughput::Throughput;
use blockflow_model::topology::Topology;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrialLimitMonitor<T> {
    trials: u64,
    limit: u64,
    _phantom: std::marker::PhantomData<T>,
}

impl<T> TrialLimitMonitor<T> {
    #[inline]
    pub fn new(limit: u64) -> Self {
        Self {
            trials: 0,
            limit,
            _phantom: std::marker::PhantomData,
        }
    }

    #[inline]
    pub fn trials(&self) -> u64 {
        self.trials
    }

    #[inline]
    pub fn limit(&self) -> u64 {
        self.limit
    }

    /// Trials left before the quota is met.
    #[inline]
    pub fn remaining(&self) -> u64 {
        self.limit.saturating_sub(self.trials)
    }
}

impl<T> SimulationMonitor<T> for TrialLimitMonitor<T>
where
    T: Throughput,
{
    fn name(&self) -> &str {
        "TrialLimitMonitor"
    }

    fn on_enter_simulation(&mut self, _topology: &Topology<T>) {
        self.trials = 0;
    }

    fn on_exit_simulation(&mut self) {}

    fn on_batch(&mut self, progress: &BatchProgress) {
        self.trials = self.trials.saturating_add(progress.batch_trials);
    }

    fn simulation_command(&self) -> SimulationCommand {
        if self.trials >= self.limit {
            SimulationCommand::Terminate("trial limit reached".to_string())
        } else {
            SimulationCommand::Continue
        }
    }
}
