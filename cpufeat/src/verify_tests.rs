//! End-to-end suites for the boot/join/finalize/late-verify lifecycle.

use core::sync::atomic::{AtomicU32, Ordering};

use nimbus_abi::{NAMESPACE_COMPAT, NAMESPACE_PRIMARY};
use nimbus_lib::rendezvous::Rendezvous;

use crate::caps::{CapScope, Capability, CapabilityId};
use crate::catalog::RegisterDef;
use crate::error::ConfigError;
use crate::hooks::{ActivationBarrier, CpuReadings, RegisterReader, RendezvousBarrier};
use crate::lifecycle::Arrival;
use crate::registry::FeatureRegistry;
use crate::schema::{FieldDescriptor, FieldSign, MergePolicy, RegisterId, RegisterSchema};

const REG: RegisterId = RegisterId(0x10);

static STRICT_LOWER: [FieldDescriptor; 1] =
    [FieldDescriptor::unsigned(MergePolicy::LowerSafe, true, 0, 4)];

static LAX_LOWER: [FieldDescriptor; 1] =
    [FieldDescriptor::unsigned(MergePolicy::LowerSafe, false, 0, 4)];

fn registry_with(fields: &'static [FieldDescriptor]) -> FeatureRegistry {
    let defs = [RegisterDef::new(REG, "ISAR0", RegisterSchema::new(fields))];
    FeatureRegistry::new(&defs).unwrap()
}

fn readings(value: u64) -> [(RegisterId, u64); 1] {
    [(REG, value)]
}

/// Reader that reports the same raw value for every CPU and register.
struct FixedReader(u64);

impl RegisterReader for FixedReader {
    fn read(&self, _cpu: usize, _reg: RegisterId) -> u64 {
        self.0
    }
}

/// Barrier stand-in for tests that do not exercise activation: runs the
/// hook on the initiator alone.
struct InlineBarrier;

impl ActivationBarrier for InlineBarrier {
    fn run_on_all_cpus(&self, hook: crate::caps::ActivateFn) {
        hook(0);
    }
}

fn threshold_cap(id: u16, name: &'static str, min: i64) -> Capability {
    Capability::new(
        CapabilityId(id),
        name,
        CapScope::System,
        REG,
        0,
        4,
        FieldSign::Unsigned,
        min,
    )
}

#[test]
fn scenario_strict_divergence_taints() {
    let registry = registry_with(&STRICT_LOWER);
    let boot = readings(0x5);
    registry.init_boot_cpu(0, &CpuReadings::new(&boot)).unwrap();
    assert!(!registry.is_tainted());

    let join = readings(0x3);
    let report = registry.join_cpu(1, &CpuReadings::new(&join));

    assert_eq!(registry.read_sanitized(REG), Some(0x3));
    assert_eq!(report.mismatches, 1);
    assert!(registry.is_tainted());
}

#[test]
fn scenario_non_strict_divergence_merges_quietly() {
    let registry = registry_with(&LAX_LOWER);
    let boot = readings(0x5);
    registry.init_boot_cpu(0, &CpuReadings::new(&boot)).unwrap();

    let join = readings(0x3);
    let report = registry.join_cpu(1, &CpuReadings::new(&join));

    assert_eq!(registry.read_sanitized(REG), Some(0x3));
    assert_eq!(report.mismatches, 0);
    assert!(!registry.is_tainted());
}

#[test]
fn join_is_idempotent() {
    let registry = registry_with(&STRICT_LOWER);
    let boot = readings(0x5);
    registry.init_boot_cpu(0, &CpuReadings::new(&boot)).unwrap();

    let join = readings(0x3);
    registry.join_cpu(1, &CpuReadings::new(&join));
    let after_once = registry.read_sanitized(REG);
    registry.join_cpu(1, &CpuReadings::new(&join));
    assert_eq!(registry.read_sanitized(REG), after_once);
}

#[test]
fn exact_policy_pins_configured_default() {
    static EXACT: [FieldDescriptor; 1] =
        [FieldDescriptor::unsigned(MergePolicy::Exact, true, 0, 4).with_exact_default(0x7)];
    let registry = registry_with(&EXACT);
    let boot = readings(0x5);
    registry.init_boot_cpu(0, &CpuReadings::new(&boot)).unwrap();
    // The boot observation defines the baseline verbatim.
    assert_eq!(registry.read_sanitized(REG), Some(0x5));

    // Any join pins the field to the configured default, agreeing or not.
    let join = readings(0x5);
    registry.join_cpu(1, &CpuReadings::new(&join));
    assert_eq!(registry.read_sanitized(REG), Some(0x7));
}

#[test]
fn strict_mask_covers_only_strict_fields() {
    static MIXED: [FieldDescriptor; 2] = [
        FieldDescriptor::unsigned(MergePolicy::LowerSafe, true, 0, 4),
        FieldDescriptor::unsigned(MergePolicy::HigherSafe, false, 8, 4),
    ];
    let registry = registry_with(&MIXED);
    let boot = readings(0x305);
    registry.init_boot_cpu(0, &CpuReadings::new(&boot)).unwrap();

    let catalog = registry.catalog.lock();
    let entry = catalog.lookup(REG).unwrap();
    assert_eq!(entry.strict_mask, 0x0000_000F);
    // Schema'd bits only; the gap between the fields reads as zero.
    assert_eq!(entry.system_value, 0x305);
}

#[test]
fn missing_boot_register_is_fatal() {
    let defs = [
        RegisterDef::new(RegisterId(0x10), "ISAR0", RegisterSchema::new(&STRICT_LOWER)),
        RegisterDef::new(RegisterId(0x20), "MMFR0", RegisterSchema::new(&STRICT_LOWER)),
    ];
    let registry = FeatureRegistry::new(&defs).unwrap();
    let partial = [(RegisterId(0x10), 0x5u64)];
    assert_eq!(
        registry.cpu_arrived(0, &CpuReadings::new(&partial)).err(),
        Some(ConfigError::MissingBootRegister(RegisterId(0x20)))
    );
}

#[test]
fn scenario_late_cpu_parked_exports_unchanged() {
    static EXPORT: [(nimbus_abi::ExportNamespace, u64); 1] = [(NAMESPACE_PRIMARY, 1 << 2)];
    let registry = registry_with(&LAX_LOWER);
    registry
        .register_capability(threshold_cap(1, "atomics", 2).with_export(&EXPORT))
        .unwrap();

    let boot = readings(0x3);
    registry.init_boot_cpu(0, &CpuReadings::new(&boot)).unwrap();
    let active = registry.finalize_system(0, &FixedReader(0x3), &InlineBarrier);
    assert_eq!(active, 1);
    assert_eq!(registry.export_flags(NAMESPACE_PRIMARY), 1 << 2);

    let weak = readings(0x1);
    let outcome = registry.cpu_arrived(2, &CpuReadings::new(&weak)).unwrap();
    match outcome {
        Arrival::Parked(incompatible) => {
            assert_eq!(incompatible.cpu, 2);
            assert_eq!(incompatible.capability, CapabilityId(1));
        }
        other => panic!("expected parked CPU, got {:?}", other),
    }
    assert!(registry.is_cpu_parked(2));
    assert_eq!(registry.parked_cpus(), 1);

    // The system-wide set and its exports never retract.
    assert_eq!(registry.export_flags(NAMESPACE_PRIMARY), 1 << 2);

    // A conforming late CPU still verifies.
    let strong = readings(0xF);
    assert_eq!(
        registry.cpu_arrived(3, &CpuReadings::new(&strong)).unwrap(),
        Arrival::Verified
    );
}

#[test]
fn export_namespaces_are_independent() {
    static PRIMARY_ONLY: [(nimbus_abi::ExportNamespace, u64); 1] = [(NAMESPACE_PRIMARY, 1 << 0)];
    static COMPAT_ONLY: [(nimbus_abi::ExportNamespace, u64); 1] = [(NAMESPACE_COMPAT, 1 << 5)];
    static NEVER: [(nimbus_abi::ExportNamespace, u64); 2] =
        [(NAMESPACE_PRIMARY, 1 << 9), (NAMESPACE_COMPAT, 1 << 9)];

    let registry = registry_with(&LAX_LOWER);
    registry
        .register_capability(threshold_cap(1, "fp", 1).with_export(&PRIMARY_ONLY))
        .unwrap();
    registry
        .register_capability(threshold_cap(2, "fp-compat", 2).with_export(&COMPAT_ONLY))
        .unwrap();
    // Unsatisfiable threshold: must not leak into either namespace.
    registry
        .register_capability(threshold_cap(3, "sve", 9).with_export(&NEVER))
        .unwrap();

    let boot = readings(0x4);
    registry.init_boot_cpu(0, &CpuReadings::new(&boot)).unwrap();
    registry.finalize_system(0, &FixedReader(0x4), &InlineBarrier);

    assert_eq!(registry.export_flags(NAMESPACE_PRIMARY), 1 << 0);
    assert_eq!(registry.export_flags(NAMESPACE_COMPAT), 1 << 5);
}

static ACTIVATION_RUNS: AtomicU32 = AtomicU32::new(0);

fn count_activation(_cpu: usize) {
    ACTIVATION_RUNS.fetch_add(1, Ordering::SeqCst);
}

#[test]
fn activation_runs_through_the_barrier() {
    let registry = registry_with(&LAX_LOWER);
    registry
        .register_capability(threshold_cap(4, "atomics", 1).with_activate(count_activation))
        .unwrap();

    let boot = readings(0x2);
    registry.init_boot_cpu(0, &CpuReadings::new(&boot)).unwrap();

    let rendezvous = Rendezvous::new();
    rendezvous.register(0);
    let barrier = RendezvousBarrier {
        rendezvous: &rendezvous,
        initiator: 0,
    };
    let active = registry.finalize_system(0, &FixedReader(0x2), &barrier);
    assert_eq!(active, 1);
    assert_eq!(ACTIVATION_RUNS.load(Ordering::SeqCst), 1);
}

#[test]
fn local_scope_reads_the_cpu_not_the_baseline() {
    let registry = registry_with(&LAX_LOWER);
    let mut cap = threshold_cap(5, "local-only", 2);
    cap.scope = CapScope::LocalCpu;
    registry.register_capability(cap).unwrap();

    let boot = readings(0x3);
    registry.init_boot_cpu(0, &CpuReadings::new(&boot)).unwrap();

    // The merged baseline satisfies the threshold, but the boot CPU's raw
    // reading (through the early path) does not.
    let active = registry.finalize_system(0, &FixedReader(0x0), &InlineBarrier);
    assert_eq!(active, 0);
}

#[test]
fn duplicate_ids_resolve_to_first_registration() {
    let registry = registry_with(&LAX_LOWER);
    registry
        .register_capability(threshold_cap(7, "easy", 1))
        .unwrap();
    registry
        .register_capability(threshold_cap(7, "impossible", 0xF))
        .unwrap();

    let boot = readings(0x4);
    registry.init_boot_cpu(0, &CpuReadings::new(&boot)).unwrap();
    registry.finalize_system(0, &FixedReader(0x4), &InlineBarrier);

    // Both entries were evaluated; the point query answers from the first.
    assert!(registry.cpu_has_capability(CapabilityId(7)));
    assert!(!registry.cpu_has_capability(CapabilityId(8)));
}

#[test]
fn capability_against_unknown_register_rejected() {
    let registry = registry_with(&LAX_LOWER);
    let mut cap = threshold_cap(1, "ghost", 1);
    cap.register = RegisterId(0x99);
    assert_eq!(
        registry.register_capability(cap),
        Err(ConfigError::UnknownRegister(RegisterId(0x99)))
    );
}

#[test]
fn read_cached_prefers_the_merged_value() {
    let registry = registry_with(&LAX_LOWER);
    let reader = FixedReader(0xAB);

    // Before the baseline exists, only the early path can answer.
    assert_eq!(registry.read_cached(&reader, 0, REG), 0xAB);

    let boot = readings(0x5);
    registry.init_boot_cpu(0, &CpuReadings::new(&boot)).unwrap();
    assert_eq!(registry.read_cached(&reader, 0, REG), 0x5);

    // Untracked registers still go to hardware.
    assert_eq!(registry.read_cached(&reader, 0, RegisterId(0x77)), 0xAB);
}

#[test]
fn arrival_dispatch_follows_the_lifecycle() {
    let registry = registry_with(&LAX_LOWER);
    let boot = readings(0x4);
    assert_eq!(
        registry.cpu_arrived(0, &CpuReadings::new(&boot)).unwrap(),
        Arrival::BootCpu
    );
    let join = readings(0x4);
    match registry.cpu_arrived(1, &CpuReadings::new(&join)).unwrap() {
        Arrival::Joined(report) => assert_eq!(report.registers, 1),
        other => panic!("expected join, got {:?}", other),
    }
    assert_eq!(registry.joined_cpus(), 2);

    registry.finalize_system(0, &FixedReader(0x4), &InlineBarrier);
    assert_eq!(
        registry.cpu_arrived(2, &CpuReadings::new(&join)).unwrap(),
        Arrival::Verified
    );
    assert_eq!(registry.joined_cpus(), 3);
}

fn never_pinned() -> bool {
    false
}

#[test]
#[should_panic(expected = "unpinned context")]
fn unpinned_capability_query_panics() {
    let registry = registry_with(&LAX_LOWER);
    registry.register_pin_check(never_pinned);
    registry.cpu_has_capability(CapabilityId(1));
}

#[test]
#[should_panic(expected = "join before the boot baseline")]
fn join_before_boot_panics() {
    let registry = registry_with(&LAX_LOWER);
    let join = readings(0x1);
    registry.join_cpu(1, &CpuReadings::new(&join));
}

#[test]
#[should_panic(expected = "finalize before the boot baseline")]
fn finalize_before_boot_panics() {
    let registry = registry_with(&LAX_LOWER);
    registry.finalize_system(0, &FixedReader(0), &InlineBarrier);
}

#[test]
#[should_panic(expected = "finalized twice")]
fn double_finalize_panics() {
    let registry = registry_with(&LAX_LOWER);
    let boot = readings(0x1);
    registry.init_boot_cpu(0, &CpuReadings::new(&boot)).unwrap();
    registry.finalize_system(0, &FixedReader(0), &InlineBarrier);
    registry.finalize_system(0, &FixedReader(0), &InlineBarrier);
}

#[test]
#[should_panic(expected = "export mask read before system close")]
fn export_before_close_panics() {
    let registry = registry_with(&LAX_LOWER);
    registry.export_flags(NAMESPACE_PRIMARY);
}

#[test]
#[should_panic(expected = "capability registered after boot")]
fn late_capability_registration_panics() {
    let registry = registry_with(&LAX_LOWER);
    let boot = readings(0x1);
    registry.init_boot_cpu(0, &CpuReadings::new(&boot)).unwrap();
    let _ = registry.register_capability(threshold_cap(1, "late", 1));
}
