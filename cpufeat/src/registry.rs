//! The feature registry: all shared state of the subsystem in one object.
//!
//! One `FeatureRegistry` is constructed during early boot and passed by
//! reference to every collaborator; there is deliberately no global
//! instance. The register catalog and capability table sit behind spinlocks,
//! while everything read on hot paths (active flags, export masks, taint,
//! lifecycle gates) is plain atomics.
//!
//! Locking is not a concurrency license. The lifecycle contract is one
//! serialized call per arriving CPU: boot init first, then joins, then
//! finalize, then late verifications. The gates panic on out-of-order use
//! rather than let a caller act on a baseline that does not exist yet.

use core::sync::atomic::{AtomicBool, AtomicPtr, AtomicU32, AtomicU64, Ordering};

use nimbus_abi::{ExportNamespace, MAX_EXPORT_NAMESPACES};
use nimbus_lib::cpu_slots::{CpuSlots, CpuState};
use nimbus_lib::init_flag::{InitFlag, StateFlag};
use nimbus_lib::klog_info;
use spin::Mutex;

use crate::caps::{CapabilityTable, MAX_CAPABILITIES};
use crate::catalog::{RegisterCatalog, RegisterDef};
use crate::error::ConfigResult;
use crate::hooks::{PinCheckFn, RegisterReader};
use crate::schema::RegisterId;

pub struct FeatureRegistry {
    pub(crate) catalog: Mutex<RegisterCatalog>,
    pub(crate) caps: Mutex<CapabilityTable>,
    pub(crate) active: [AtomicBool; MAX_CAPABILITIES],
    pub(crate) exports: [AtomicU64; MAX_EXPORT_NAMESPACES],
    pub(crate) cpus: CpuSlots,
    pub(crate) taint: StateFlag,
    pub(crate) mismatches: AtomicU32,
    pub(crate) boot_done: InitFlag,
    pub(crate) closed: InitFlag,
    pin_check: AtomicPtr<()>,
}

impl FeatureRegistry {
    /// Build the registry from the platform's register definition table.
    ///
    /// The table must be sorted by id and carry well-formed field ranges;
    /// anything else is a fatal configuration error.
    pub fn new(defs: &[RegisterDef]) -> ConfigResult<Self> {
        const INACTIVE: AtomicBool = AtomicBool::new(false);
        const EMPTY: AtomicU64 = AtomicU64::new(0);

        let catalog = RegisterCatalog::new(defs)?;
        Ok(Self {
            catalog: Mutex::new(catalog),
            caps: Mutex::new(CapabilityTable::new()),
            active: [INACTIVE; MAX_CAPABILITIES],
            exports: [EMPTY; MAX_EXPORT_NAMESPACES],
            cpus: CpuSlots::new(),
            taint: StateFlag::new(),
            mismatches: AtomicU32::new(0),
            boot_done: InitFlag::new(),
            closed: InitFlag::new(),
            pin_check: AtomicPtr::new(core::ptr::null_mut()),
        })
    }

    /// Whether any CPU has ever diverged on a strict field. Monotonic;
    /// never cleared. What a tainted system does about it is caller policy.
    pub fn is_tainted(&self) -> bool {
        self.taint.is_active()
    }

    /// Strict-field divergences seen across all joins so far.
    pub fn mismatch_count(&self) -> u32 {
        self.mismatches.load(Ordering::Acquire)
    }

    /// Boot baseline established.
    pub fn boot_completed(&self) -> bool {
        self.boot_done.is_set()
    }

    /// Capability set evaluated and frozen.
    pub fn system_closed(&self) -> bool {
        self.closed.is_set()
    }

    /// Merged system-wide value of `reg`, once the baseline exists.
    pub fn read_sanitized(&self, reg: RegisterId) -> Option<u64> {
        if !self.boot_done.is_set() {
            return None;
        }
        self.catalog.lock().lookup(reg).map(|entry| entry.system_value)
    }

    /// Cached register read: the merged system value when available,
    /// falling back to the early hardware path for registers the catalog
    /// does not track or before the baseline exists.
    pub fn read_cached(&self, reader: &dyn RegisterReader, cpu: usize, reg: RegisterId) -> u64 {
        if let Some(value) = self.read_sanitized(reg) {
            return value;
        }
        reader.read(cpu, reg)
    }

    /// Register the platform's "is the calling CPU pinned" check, consulted
    /// by per-CPU capability queries.
    pub fn register_pin_check(&self, check: PinCheckFn) {
        self.pin_check.store(check as *mut (), Ordering::Release);
    }

    pub(crate) fn assert_pinned(&self) {
        let ptr = self.pin_check.load(Ordering::Acquire);
        if ptr.is_null() {
            return;
        }
        // SAFETY: stored by `register_pin_check` from a valid `PinCheckFn`;
        // fn pointers round-trip through `*mut ()`.
        let check: PinCheckFn = unsafe { core::mem::transmute(ptr) };
        if !check() {
            panic!("cpufeat: per-CPU capability query from an unpinned context");
        }
    }

    pub fn cpu_state(&self, cpu: usize) -> CpuState {
        self.cpus.state(cpu)
    }

    pub fn is_cpu_parked(&self, cpu: usize) -> bool {
        self.cpus.is_parked(cpu)
    }

    pub fn joined_cpus(&self) -> u32 {
        self.cpus.joined_count()
    }

    pub fn parked_cpus(&self) -> u32 {
        self.cpus.parked_count()
    }

    /// Log the catalog state: one line per register plus the CPU and taint
    /// summary. Diagnostic only.
    pub fn dump_catalog(&self) {
        let catalog = self.catalog.lock();
        klog_info!(
            "FEAT: catalog: {} registers, taint {}",
            catalog.len(),
            self.is_tainted()
        );
        for entry in catalog.entries() {
            klog_info!(
                "FEAT:   {} ({}): system {:#018x} strict {:#018x}",
                entry.name,
                entry.id,
                entry.system_value,
                entry.strict_mask
            );
        }
        klog_info!(
            "FEAT: CPUs: {} joined, {} parked, {} strict mismatches",
            self.joined_cpus(),
            self.parked_cpus(),
            self.mismatch_count()
        );
    }

    /// Exported capability bits for `namespace`. Only meaningful once the
    /// system is closed; asking earlier is a lifecycle bug.
    pub fn export_flags(&self, namespace: ExportNamespace) -> u64 {
        if !self.closed.is_set() {
            panic!("cpufeat: export mask read before system close");
        }
        if namespace.0 >= MAX_EXPORT_NAMESPACES {
            panic!("cpufeat: export namespace {} out of range", namespace.0);
        }
        self.exports[namespace.0].load(Ordering::Acquire)
    }
}
