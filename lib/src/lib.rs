//! Ambient kernel utilities shared by the NimbusOS feature subsystem.
//!
//! Everything here is architecture-neutral: logging funnels through a
//! registered backend, CPU bookkeeping is a bounded slot table indexed by
//! CPU number, and cross-CPU synchronization is a broadcast rendezvous that
//! a platform driver wires to its pause mechanism of choice.

#![cfg_attr(not(test), no_std)]

pub mod cpu_slots;
pub mod init_flag;
pub mod klog;
pub mod rendezvous;

pub use cpu_slots::{CpuSlots, CpuState, MAX_CPUS};
pub use init_flag::{InitFlag, StateFlag};
pub use klog::{KlogBackend, KlogLevel, klog_level, klog_register_backend, klog_set_level};
pub use rendezvous::{Rendezvous, RendezvousHook};
