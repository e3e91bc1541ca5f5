//! What the platform supplies to the engine.
//!
//! The subsystem never touches hardware. Raw register access, the all-CPUs
//! activation barrier, and the "is the caller pinned" check all come from
//! the platform through the types here; the CPU lifecycle driver hands each
//! arriving CPU's readings over as a borrowed [`CpuReadings`] that is
//! dropped as soon as verification finishes.

use nimbus_lib::rendezvous::Rendezvous;

use crate::caps::ActivateFn;
use crate::schema::RegisterId;

/// Synchronous raw register access.
///
/// This is the *early* path: it must work for a CPU that is not yet part of
/// the scheduled set, reading the CPU's own hardware state. Once the boot
/// baseline exists, [`FeatureRegistry::read_cached`] can answer from the
/// merged system value instead.
///
/// [`FeatureRegistry::read_cached`]: crate::registry::FeatureRegistry::read_cached
pub trait RegisterReader {
    fn read(&self, cpu: usize, reg: RegisterId) -> u64;
}

/// Pause-apply-resume rendezvous over every known CPU.
///
/// `run_on_all_cpus` must not return until the hook has executed on every
/// CPU and all of them have been released together.
pub trait ActivationBarrier {
    fn run_on_all_cpus(&self, hook: ActivateFn);
}

/// Drives activation hooks through a [`Rendezvous`].
pub struct RendezvousBarrier<'a> {
    pub rendezvous: &'a Rendezvous,
    /// The CPU the engine is running on; served inline by the rendezvous.
    pub initiator: usize,
}

impl ActivationBarrier for RendezvousBarrier<'_> {
    fn run_on_all_cpus(&self, hook: ActivateFn) {
        self.rendezvous.run_on_all(self.initiator, hook);
    }
}

/// Returns whether the calling CPU is pinned/committed enough that a
/// per-CPU capability answer is meaningful.
pub type PinCheckFn = fn() -> bool;

/// One observed CPU's raw register readings, keyed by register id.
///
/// Ephemeral by contract: borrowed for the duration of one boot, join, or
/// late-verification call and never retained by the engine.
#[derive(Clone, Copy)]
pub struct CpuReadings<'a> {
    entries: &'a [(RegisterId, u64)],
}

impl<'a> CpuReadings<'a> {
    pub const fn new(entries: &'a [(RegisterId, u64)]) -> Self {
        Self { entries }
    }

    pub fn get(&self, id: RegisterId) -> Option<u64> {
        self.entries
            .iter()
            .find(|(reg, _)| *reg == id)
            .map(|(_, value)| *value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
