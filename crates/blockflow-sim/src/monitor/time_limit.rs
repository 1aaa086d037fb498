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

//! # Time Limit Monitor
//!
//! Enforces a wall-clock budget on a simulation. Workers consult their
//! monitors once per batch, so the clock is read at batch granularity and a
//! run overshoots its budget by at most one batch per worker.
//!
//! All workers of one run share the same start instant, so they agree on
//! when the budget is spent.

use crate::monitor::simulation_monitor::{BatchProgress, SimulationCommand, SimulationMonitor};
use blockflow_core::num::throughput::Throughput;
use blockflow_model::topology::Topology;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeLimitMonitor<T> {
    time_limit: Duration,
    start_time: Instant,
    _phantom: std::marker::PhantomData<T>,
}

impl<T> TimeLimitMonitor<T> {
    /// Creates a monitor whose budget starts now.
    #[inline]
    pub fn new(time_limit: Duration) -> Self {
        Self::starting_at(time_limit, Instant::now())
    }

    /// Creates a monitor whose budget started at `start_time`.
    #[inline]
    pub fn starting_at(time_limit: Duration, start_time: Instant) -> Self {
        Self {
            time_limit,
            start_time,
            _phantom: std::marker::PhantomData,
        }
    }

    #[inline]
    pub fn time_limit(&self) -> Duration {
        self.time_limit
    }

    #[inline]
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }
}

impl<T> SimulationMonitor<T> for TimeLimitMonitor<T>
where
    T: Throughput,
{
    fn name(&self) -> &str {
        "TimeLimitMonitor"
    }

    fn on_enter_simulation(&mut self, _topology: &Topology<T>) {}
    fn on_exit_simulation(&mut self) {}
    fn on_batch(&mut self, _progress: &BatchProgress) {}

    fn simulation_command(&self) -> SimulationCommand {
        if self.elapsed() >= self.time_limit {
            SimulationCommand::Terminate("time limit reached".to_string())
        } else {
            SimulationCommand::Continue
        }
    }
}
