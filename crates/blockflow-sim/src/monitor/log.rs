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

//! Periodic progress logging through `tracing`.

use crate::monitor::simulation_monitor::{BatchProgress, SimulationCommand, SimulationMonitor};
use blockflow_core::num::throughput::Throughput;
use blockflow_model::topology::Topology;
use std::time::{Duration, Instant};

/// Emits an `info` event with a worker's progress at most once per
/// `log_interval`. Never terminates the simulation.
#[derive(Debug, Clone)]
pub struct LogMonitor<T> {
    start_time: Instant,
    last_log_time: Instant,
    log_interval: Duration,
    lines: u64,
    _phantom: std::marker::PhantomData<T>,
}

impl<T> LogMonitor<T> {
    pub fn new(log_interval: Duration) -> Self {
        let now = Instant::now();
        Self {
            start_time: now,
            last_log_time: now,
            log_interval,
            lines: 0,
            _phantom: std::marker::PhantomData,
        }
    }

    /// Number of progress lines emitted so far.
    #[inline]
    pub fn lines(&self) -> u64 {
        self.lines
    }

    fn log_line(&mut self, progress: &BatchProgress) {
        let now = Instant::now();
        tracing::info!(
            worker = progress.worker,
            elapsed_secs = now.duration_since(self.start_time).as_secs_f32(),
            batches = progress.batches,
            trials = progress.worker_trials,
            mean = progress.mean,
            "simulation progress"
        );
        self.last_log_time = now;
        self.lines += 1;
    }
}

impl<T> Default for LogMonitor<T> {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

impl<T> std::fmt::Display for LogMonitor<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "LogMonitor(log_interval: {:.3}s)",
            self.log_interval.as_secs_f64()
        )
    }
}

impl<T> SimulationMonitor<T> for LogMonitor<T>
where
    T: Throughput,
{
    fn name(&self) -> &str {
        "LogMonitor"
    }

    fn on_enter_simulation(&mut self, topology: &Topology<T>) {
        self.start_time = Instant::now();
        self.last_log_time = self.start_time;
        self.lines = 0;
        tracing::debug!(
            blocks = topology.num_blocks(),
            machines = topology.num_machines(),
            "log monitor attached"
        );
    }

    fn on_exit_simulation(&mut self) {
        tracing::debug!(
            elapsed_secs = self.start_time.elapsed().as_secs_f32(),
            lines = self.lines,
            "log monitor detached"
        );
    }

    fn on_batch(&mut self, progress: &BatchProgress) {
        if self.last_log_time.elapsed() >= self.log_interval {
            self.log_line(progress);
        }
    }

    fn simulation_command(&self) -> SimulationCommand {
        SimulationCommand::Continue
    }
}
