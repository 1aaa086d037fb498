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

use crate::monitor::simulation_monitor::{BatchProgress, SimulationCommand, SimulationMonitor};
use blockflow_core::num::throughput::Throughput;
use blockflow_model::topology::Topology;
use std::sync::atomic::{AtomicBool, Ordering};

/// Terminates the simulation once the shared flag is raised.
#[derive(Debug, Clone)]
pub struct InterruptMonitor<'a, T> {
    stop_flag: &'a AtomicBool,
    _phantom: std::marker::PhantomData<T>,
}

impl<'a, T> InterruptMonitor<'a, T> {
    #[inline(always)]
    pub fn new(stop_flag: &'a AtomicBool) -> Self {
        Self {
            stop_flag,
            _phantom: std::marker::PhantomData,
        }
    }
}

impl<'a, T> SimulationMonitor<T> for InterruptMonitor<'a, T>
where
    T: Throughput,
{
    fn name(&self) -> &str {
        "InterruptMonitor"
    }

    fn on_enter_simulation(&mut self, _topology: &Topology<T>) {}
    fn on_exit_simulation(&mut self) {}
    fn on_batch(&mut self, _progress: &BatchProgress) {}

    fn simulation_command(&self) -> SimulationCommand {
        if self.stop_flag.load(Ordering::Relaxed) {
            SimulationCommand::Terminate("interrupt signal received".to_string())
        } else {
            SimulationCommand::Continue
        }
    }
}

#[cfg(test)]
mod tests {
    use super::InterruptMonitor;
    use crate::monitor::simulation_monitor::{SimulationCommand, SimulationMonitor};
    use std::sync::atomic::{AtomicBool, Ordering};

    #[test]
    fn test_continues_while_flag_is_clear() {
        let flag = AtomicBool::new(false);
        let monitor = InterruptMonitor::<u32>::new(&flag);
        assert_eq!(monitor.simulation_command(), SimulationCommand::Continue);
    }

    #[test]
    fn test_terminates_once_flag_is_set() {
        let flag = AtomicBool::new(false);
        let monitor = InterruptMonitor::<u32>::new(&flag);
        flag.store(true, Ordering::Relaxed);

        match monitor.simulation_command() {
            SimulationCommand::Terminate(reason) => {
                assert_eq!(reason, "interrupt signal received")
            }
            other => panic!("expected Terminate, got {:?}", other),
        }
    }
}
