//! Broadcast-execute-and-wait rendezvous over a fixed set of CPU slots.
//!
//! The initiator arms every registered slot with a hook, runs the hook for
//! its own slot, and spins until every other slot has executed it and
//! acknowledged. Only then are all slots released together, so no CPU
//! resumes normal execution before every CPU has applied the hook. This is
//! the synchronization shape needed when a hook flips global-enablement
//! state that every CPU must observe before any of them runs further code.
//!
//! Worker CPUs integrate by calling [`Rendezvous::poll`] from a context
//! where they are otherwise paused (an IPI handler on real hardware, a spin
//! loop on a test thread). `poll` runs the hook, acknowledges, and holds the
//! caller until the collective release.
//!
//! Contract: one initiator at a time. Broadcasts are serialized by the
//! caller; the structure does not arbitrate between concurrent initiators.

use core::hint::spin_loop;
use core::sync::atomic::{AtomicBool, AtomicPtr, Ordering};

use crate::cpu_slots::MAX_CPUS;

/// Hook executed on each CPU during a broadcast. Receives the CPU index.
pub type RendezvousHook = fn(usize);

/// Per-slot handshake state, cache-line separated to avoid false sharing
/// between spinning CPUs.
#[repr(align(64))]
struct Slot {
    registered: AtomicBool,
    armed: AtomicBool,
    acked: AtomicBool,
}

impl Slot {
    const fn new() -> Self {
        Self {
            registered: AtomicBool::new(false),
            armed: AtomicBool::new(false),
            acked: AtomicBool::new(false),
        }
    }
}

/// Broadcast-execute-and-wait barrier over registered CPU slots.
pub struct Rendezvous {
    slots: [Slot; MAX_CPUS],
    hook: AtomicPtr<()>,
    release: AtomicBool,
}

impl Rendezvous {
    pub const fn new() -> Self {
        const INIT: Slot = Slot::new();
        Self {
            slots: [INIT; MAX_CPUS],
            hook: AtomicPtr::new(core::ptr::null_mut()),
            release: AtomicBool::new(false),
        }
    }

    fn slot(&self, cpu: usize) -> &Slot {
        if cpu >= MAX_CPUS {
            panic!("cpu index {} out of range (max {})", cpu, MAX_CPUS);
        }
        &self.slots[cpu]
    }

    /// Add `cpu` to the broadcast set.
    pub fn register(&self, cpu: usize) {
        self.slot(cpu).registered.store(true, Ordering::Release);
    }

    /// Remove `cpu` from the broadcast set (a parked CPU must not be waited
    /// on).
    pub fn deregister(&self, cpu: usize) {
        self.slot(cpu).registered.store(false, Ordering::Release);
    }

    pub fn is_registered(&self, cpu: usize) -> bool {
        self.slot(cpu).registered.load(Ordering::Acquire)
    }

    /// Initiator side: run `hook` on every registered CPU and return once
    /// all of them have executed it and been released together.
    ///
    /// `initiator` is the calling CPU; its slot (registered or not) is
    /// served inline rather than waited on, since the caller cannot poll
    /// itself.
    pub fn run_on_all(&self, initiator: usize, hook: RendezvousHook) {
        if initiator >= MAX_CPUS {
            panic!("cpu index {} out of range (max {})", initiator, MAX_CPUS);
        }

        self.hook.store(hook as *mut (), Ordering::Release);
        self.release.store(false, Ordering::Release);

        for (cpu, slot) in self.slots.iter().enumerate() {
            if cpu != initiator && slot.registered.load(Ordering::Acquire) {
                slot.armed.store(true, Ordering::Release);
            }
        }

        hook(initiator);

        for (cpu, slot) in self.slots.iter().enumerate() {
            if cpu == initiator {
                continue;
            }
            while slot.armed.load(Ordering::Acquire) && !slot.acked.load(Ordering::Acquire) {
                spin_loop();
            }
        }

        self.release.store(true, Ordering::Release);

        // Wait for the slots to disarm so the next broadcast starts clean.
        for (cpu, slot) in self.slots.iter().enumerate() {
            if cpu == initiator {
                continue;
            }
            while slot.armed.load(Ordering::Acquire) {
                spin_loop();
            }
        }
    }

    /// Worker side: if a broadcast is pending for `cpu`, execute the hook,
    /// acknowledge, and spin until the collective release. Returns whether a
    /// hook was executed.
    pub fn poll(&self, cpu: usize) -> bool {
        let slot = self.slot(cpu);
        if !slot.armed.load(Ordering::Acquire) {
            return false;
        }

        let ptr = self.hook.load(Ordering::Acquire);
        if !ptr.is_null() {
            // SAFETY: the pointer was stored by `run_on_all` from a valid
            // `RendezvousHook`; fn pointers round-trip through `*mut ()`.
            let hook: RendezvousHook = unsafe { core::mem::transmute(ptr) };
            hook(cpu);
        }
        slot.acked.store(true, Ordering::Release);

        while !self.release.load(Ordering::Acquire) {
            spin_loop();
        }

        slot.acked.store(false, Ordering::Release);
        slot.armed.store(false, Ordering::Release);
        true
    }
}

impl Default for Rendezvous {
    fn default() -> Self {
        Self::new()
    }
}
