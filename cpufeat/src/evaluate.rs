//! Capability evaluation: system-wide detection at close, per-CPU
//! re-verification for late arrivals.

use core::fmt;
use core::sync::atomic::Ordering;

use nimbus_lib::{klog_debug, klog_info, klog_warn};

use crate::caps::{ActivateFn, CapScope, Capability, CapabilityId, MAX_CAPABILITIES};
use crate::error::{ConfigError, ConfigResult};
use crate::hooks::{ActivationBarrier, CpuReadings, RegisterReader};
use crate::registry::FeatureRegistry;

/// A late-arriving CPU lacks a capability the system already relies on.
/// Fatal for that CPU alone: it is parked and stays parked.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Incompatible {
    pub cpu: usize,
    pub capability: CapabilityId,
}

impl fmt::Display for Incompatible {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CPU{} lacks active capability {}",
            self.cpu, self.capability.0
        )
    }
}

impl FeatureRegistry {
    /// Append a capability to the ordered table.
    ///
    /// Registration happens during initialization only, before any CPU is
    /// observed; registering after the boot baseline exists is a lifecycle
    /// bug. The referenced register must already be in the catalog so that
    /// evaluation can never miss.
    pub fn register_capability(&self, cap: Capability) -> ConfigResult<()> {
        if self.boot_done.is_set() {
            panic!("cpufeat: capability registered after boot");
        }
        cap.validate()?;
        let known = self.catalog.lock().lookup(cap.register).is_some();
        if !known {
            return Err(ConfigError::UnknownRegister(cap.register));
        }
        self.caps.lock().push(cap)
    }

    /// Evaluate every capability against the post-boot state, fire
    /// activations, freeze the export masks, and close the system.
    ///
    /// `System`-scoped predicates read the merged system value;
    /// `LocalCpu`-scoped ones read the calling CPU's own register through
    /// the early path. Activation hooks run through the all-CPUs barrier,
    /// one capability at a time, and this call blocks until each barrier
    /// completes. Returns the number of active capabilities.
    pub fn finalize_system(
        &self,
        cpu: usize,
        reader: &dyn RegisterReader,
        barrier: &dyn ActivationBarrier,
    ) -> u32 {
        if !self.boot_done.is_set() {
            panic!("cpufeat: finalize before the boot baseline");
        }
        if !self.closed.init_once() {
            panic!("cpufeat: system finalized twice");
        }

        let mut pending: [Option<(&'static str, ActivateFn)>; MAX_CAPABILITIES] =
            [None; MAX_CAPABILITIES];
        let mut active_count = 0u32;

        {
            let caps = self.caps.lock();
            let catalog = self.catalog.lock();
            for (index, cap) in caps.as_slice().iter().enumerate() {
                let value = match cap.scope {
                    CapScope::System => match catalog.lookup(cap.register) {
                        Some(entry) => entry.system_value,
                        // Unreachable after registration-time validation.
                        None => continue,
                    },
                    CapScope::LocalCpu => reader.read(cpu, cap.register),
                };
                if !cap.matches(value) {
                    continue;
                }

                self.active[index].store(true, Ordering::Release);
                active_count += 1;
                klog_info!("FEAT: detected {}", cap.name);
                if let Some(hook) = cap.activate {
                    pending[index] = Some((cap.name, hook));
                }
            }
            self.compute_exports(&caps);
        }

        // Locks dropped: the barrier pauses every CPU, and a hook is free
        // to consult the registry.
        for entry in pending.iter().flatten() {
            let (name, hook) = *entry;
            klog_debug!("FEAT: enabling {} on all CPUs", name);
            barrier.run_on_all_cpus(hook);
        }

        klog_info!(
            "FEAT: capability set closed: {} active, {} joined CPUs",
            active_count,
            self.joined_cpus()
        );
        active_count
    }

    /// Re-verify every active capability against a late-arriving CPU's own
    /// raw readings.
    ///
    /// The system-wide capability set never changes here. A CPU that fails
    /// (or whose readings omit a required register) is parked permanently;
    /// the error names the first capability it lacked.
    pub fn verify_late_cpu(
        &self,
        cpu: usize,
        readings: &CpuReadings<'_>,
    ) -> Result<(), Incompatible> {
        if !self.closed.is_set() {
            panic!("cpufeat: late verification before system close");
        }

        self.cpus.observe(cpu);

        let caps = self.caps.lock();
        for (index, cap) in caps.as_slice().iter().enumerate() {
            if !self.active[index].load(Ordering::Acquire) {
                continue;
            }
            let holds = match readings.get(cap.register) {
                Some(raw) => cap.matches(raw),
                None => false,
            };
            if !holds {
                self.cpus.park(cpu);
                klog_warn!("FEAT: CPU{} parked: missing capability {}", cpu, cap.name);
                return Err(Incompatible {
                    cpu,
                    capability: cap.id,
                });
            }
        }
        drop(caps);

        self.cpus.mark_joined(cpu);
        klog_info!("FEAT: CPU{} verified against the active capability set", cpu);
        Ok(())
    }

    /// Point query: does the system have `id` active?
    ///
    /// Duplicate ids resolve to the first registered entry. The registered
    /// pin check is consulted first: answering from a context that could
    /// migrate between CPUs would be silently wrong, so the engine panics
    /// instead.
    pub fn cpu_has_capability(&self, id: CapabilityId) -> bool {
        self.assert_pinned();
        let caps = self.caps.lock();
        match caps.find_first(id) {
            Some(index) => self.active[index].load(Ordering::Acquire),
            None => false,
        }
    }
}
