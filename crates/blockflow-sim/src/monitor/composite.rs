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

/// Forwards every event to a list of monitors and terminates as soon as any
/// of them does.
pub struct CompositeMonitor<'a, T> {
    monitors: Vec<Box<dyn SimulationMonitor<T> + 'a>>,
}

impl<'a, T> CompositeMonitor<'a, T>
where
    T: Throughput,
{
    fn names(&self) -> String {
        self.monitors
            .iter()
            .map(|m| m.name())
            .collect::<Vec<&str>>()
            .join(", ")
    }
}

impl<'a, T> std::fmt::Debug for CompositeMonitor<'a, T>
where
    T: Throughput,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositeMonitor")
            .field("monitors", &self.names())
            .finish()
    }
}

impl<'a, T> std::fmt::Display for CompositeMonitor<'a, T>
where
    T: Throughput,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CompositeMonitor([{}])", self.names())
    }
}

impl<'a, T> Default for CompositeMonitor<'a, T>
where
    T: Throughput,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, T> CompositeMonitor<'a, T>
where
    T: Throughput,
{
    #[inline]
    pub fn new() -> CompositeMonitor<'a, T> {
        CompositeMonitor {
            monitors: Vec::new(),
        }
    }

    #[inline]
    pub fn with_capacity(capacity: usize) -> CompositeMonitor<'a, T> {
        CompositeMonitor {
            monitors: Vec::with_capacity(capacity),
        }
    }

    #[inline]
    pub fn from_vec(monitors: Vec<Box<dyn SimulationMonitor<T> + 'a>>) -> CompositeMonitor<'a, T> {
        CompositeMonitor { monitors }
    }

    #[inline]
    pub fn add_monitor<M>(&mut self, monitor: M)
    where
        M: SimulationMonitor<T> + 'a,
    {
        self.monitors.push(Box::new(monitor));
    }

    #[inline]
    pub fn add_monitor_boxed(&mut self, monitor: Box<dyn SimulationMonitor<T> + 'a>) {
        self.monitors.push(monitor);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.monitors.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.monitors.is_empty()
    }
}

impl<'a, T> FromIterator<Box<dyn SimulationMonitor<T> + 'a>> for CompositeMonitor<'a, T>
where
    T: Throughput,
{
    fn from_iter<I: IntoIterator<Item = Box<dyn SimulationMonitor<T> + 'a>>>(iter: I) -> Self {
        Self::from_vec(iter.into_iter().collect())
    }
}

impl<'a, T> SimulationMonitor<T> for CompositeMonitor<'a, T>
where
    T: Throughput,
{
    fn name(&self) -> &str {
        "CompositeMonitor"
    }

    fn on_enter_simulation(&mut self, topology: &Topology<T>) {
        for monitor in self.monitors.iter_mut() {
            monitor.on_enter_simulation(topology);
        }
    }

    fn on_exit_simulation(&mut self) {
        for monitor in self.monitors.iter_mut() {
            monitor.on_exit_simulation();
        }
    }

    fn on_batch(&mut self, progress: &BatchProgress) {
        for monitor in self.monitors.iter_mut() {
            monitor.on_batch(progress);
        }
    }

    /// The first terminating monitor, in insertion order, wins.
    fn simulation_command(&self) -> SimulationCommand {
        self.monitors
            .iter()
            .map(|m| m.simulation_command())
            .find(SimulationCommand::is_terminate)
            .unwrap_or_default()
    }
}
