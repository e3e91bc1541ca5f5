//! Boot baseline: the first observed CPU defines the system-wide view.

use nimbus_lib::klog_info;

use crate::error::{ConfigError, ConfigResult};
use crate::hooks::CpuReadings;
use crate::reconcile::{extract_field, pack_field};
use crate::registry::FeatureRegistry;

impl FeatureRegistry {
    /// Seed every catalog register from the boot CPU's raw readings.
    ///
    /// No merging happens here: the first observation *is* the baseline.
    /// `system_value` is assembled field-by-field, so bits outside the
    /// schema read as zero, and `strict_mask` collects exactly the bit
    /// ranges of fields declared strict.
    ///
    /// A catalog register missing from `readings` is fatal: without it the
    /// engine has no baseline and every later comparison would be
    /// meaningless.
    ///
    /// Runs exactly once; a second call is a lifecycle bug and panics.
    pub fn init_boot_cpu(&self, cpu: usize, readings: &CpuReadings<'_>) -> ConfigResult<()> {
        if !self.boot_done.init_once() {
            panic!("cpufeat: boot baseline already established");
        }

        let mut catalog = self.catalog.lock();
        let registers = catalog.len();
        for entry in catalog.entries_mut() {
            let Some(raw) = readings.get(entry.id) else {
                return Err(ConfigError::MissingBootRegister(entry.id));
            };

            let mut system = 0u64;
            let mut strict = 0u64;
            for field in entry.schema.iter() {
                let value = extract_field(field, raw);
                system = pack_field(system, field, value);
                if field.strict {
                    strict |= field.field_mask();
                }
            }
            entry.system_value = system;
            entry.boot_value = system;
            entry.strict_mask = strict;
        }
        drop(catalog);

        self.cpus.observe(cpu);
        self.cpus.mark_joined(cpu);
        klog_info!(
            "FEAT: boot CPU{} defined the baseline for {} registers",
            cpu,
            registers
        );
        Ok(())
    }
}
