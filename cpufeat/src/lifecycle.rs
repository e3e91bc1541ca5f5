//! Arrival dispatch for the CPU lifecycle driver.
//!
//! The driver calls [`FeatureRegistry::cpu_arrived`] exactly once per
//! arriving CPU, serialized. Which verification path the CPU takes depends
//! only on where the engine is in its own lifecycle: the first arrival
//! defines the baseline, arrivals before close are merged, arrivals after
//! close are verified against the frozen capability set.

use crate::error::ConfigResult;
use crate::evaluate::Incompatible;
use crate::hooks::CpuReadings;
use crate::join::JoinReport;
use crate::registry::FeatureRegistry;

/// Which path an arriving CPU took, and how it went.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Arrival {
    /// First CPU; its readings are now the baseline.
    BootCpu,
    /// Merged into the baseline while the system was still open.
    Joined(JoinReport),
    /// Late arrival, verified against the active capability set.
    Verified,
    /// Late arrival, permanently excluded.
    Parked(Incompatible),
}

impl FeatureRegistry {
    /// Route one arriving CPU to boot initialization, join merging, or
    /// late verification.
    ///
    /// Only the boot path can fail with a configuration error (a baseline
    /// register missing from the first CPU's readings); a parked late CPU
    /// is a normal outcome, not an `Err`.
    pub fn cpu_arrived(&self, cpu: usize, readings: &CpuReadings<'_>) -> ConfigResult<Arrival> {
        if !self.boot_completed() {
            self.init_boot_cpu(cpu, readings)?;
            return Ok(Arrival::BootCpu);
        }
        if !self.system_closed() {
            return Ok(Arrival::Joined(self.join_cpu(cpu, readings)));
        }
        match self.verify_late_cpu(cpu, readings) {
            Ok(()) => Ok(Arrival::Verified),
            Err(incompatible) => Ok(Arrival::Parked(incompatible)),
        }
    }
}
