//! Folding a joining CPU into the system-wide view.

use core::sync::atomic::Ordering;

use nimbus_lib::klog_warn;

use crate::hooks::CpuReadings;
use crate::reconcile::{extract_field, merge_field, pack_field};
use crate::registry::FeatureRegistry;

/// Outcome of one join: how many catalog registers the CPU reported, and
/// how many of them diverged on strict fields.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct JoinReport {
    pub registers: u32,
    pub mismatches: u32,
}

impl FeatureRegistry {
    /// Merge one joining CPU's readings into the baseline and check its
    /// strict fields against the boot CPU's values.
    ///
    /// Fields merge in schema order, each per its own policy, so outcomes
    /// are reproducible for a given join sequence. Strict divergence is
    /// reported and taints the system but never fails the join: the
    /// baseline value is retained (per field policy) and verification
    /// continues with the remaining registers.
    ///
    /// Calls are serialized by the CPU lifecycle driver; the engine does
    /// not arbitrate concurrent joins.
    pub fn join_cpu(&self, cpu: usize, readings: &CpuReadings<'_>) -> JoinReport {
        if !self.boot_done.is_set() {
            panic!("cpufeat: CPU join before the boot baseline");
        }
        if self.closed.is_set() {
            panic!("cpufeat: CPU join after system close; use late verification");
        }

        let mut report = JoinReport::default();
        let mut catalog = self.catalog.lock();
        for entry in catalog.entries_mut() {
            let Some(raw) = readings.get(entry.id) else {
                continue;
            };
            report.registers += 1;

            for field in entry.schema.iter() {
                let new = extract_field(field, raw);
                let current = extract_field(field, entry.system_value);
                let merged = merge_field(field, new, current);
                entry.system_value = pack_field(entry.system_value, field, merged);
            }

            if (raw ^ entry.boot_value) & entry.strict_mask != 0 {
                report.mismatches += 1;
                self.mismatches.fetch_add(1, Ordering::AcqRel);
                self.taint.set_active();
                klog_warn!(
                    "FEAT: CPU{}: {} ({}) diverges on strict fields: saw {:#018x}, boot {:#018x}",
                    cpu,
                    entry.name,
                    entry.id,
                    raw,
                    entry.boot_value
                );
            }
        }
        drop(catalog);

        self.cpus.observe(cpu);
        self.cpus.mark_joined(cpu);
        report
    }
}
