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

//! The monitor interface of the simulation driver.
//!
//! Every worker thread owns one monitor stack. The worker reports to it after
//! each batch of trials and asks it whether to keep going; commands are only
//! consulted between batches, never inside one.

use blockflow_core::num::throughput::Throughput;
use blockflow_model::topology::Topology;

/// What a monitor asks the worker to do next.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub enum SimulationCommand {
    #[default]
    Continue,
    Terminate(String),
}

impl SimulationCommand {
    #[inline]
    pub fn is_terminate(&self) -> bool {
        matches!(self, SimulationCommand::Terminate(_))
    }
}

impl std::fmt::Display for SimulationCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SimulationCommand::Continue => write!(f, "Continue"),
            SimulationCommand::Terminate(reason) => write!(f, "Terminate: {}", reason),
        }
    }
}

/// Progress of one worker after a finished batch.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BatchProgress {
    /// Index of the reporting worker.
    pub worker: usize,
    /// Number of batches the worker has finished, this one included.
    pub batches: u64,
    /// Trials run in this batch.
    pub batch_trials: u64,
    /// Trials the worker has run so far.
    pub worker_trials: u64,
    /// Running mean throughput over the worker's trials.
    pub mean: f64,
}

pub trait SimulationMonitor<T>: Send
where
    T: Throughput,
{
    fn name(&self) -> &str;
    fn on_enter_simulation(&mut self, topology: &Topology<T>);
    fn on_exit_simulation(&mut self);
    fn on_batch(&mut self, progress: &BatchProgress);
    fn simulation_command(&self) -> SimulationCommand;
}

impl<T> std::fmt::Debug for dyn SimulationMonitor<T>
where
    T: Throughput,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SimulationMonitor({})", self.name())
    }
}

impl<T> std::fmt::Display for dyn SimulationMonitor<T>
where
    T: Throughput,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SimulationMonitor({})", self.name())
    }
}
