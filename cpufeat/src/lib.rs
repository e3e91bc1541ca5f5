//! Boot-time CPU feature reconciliation and capability matching.
//!
//! Every CPU in the system carries a set of read-only feature registers
//! describing what the core can do. Cores are sampled one at a time during
//! bring-up, and nothing guarantees they agree: a big.LITTLE-style system,
//! a hotplugged core from a newer stepping, or plain firmware misconfig can
//! all present divergent values. This crate folds those per-CPU readings
//! into one system-wide view and derives the kernel's capability set from
//! it.
//!
//! The moving parts:
//!
//! - [`schema`] describes how a register splits into bit-fields, each with
//!   a signedness, a merge policy, and a strictness flag.
//! - [`reconcile`] holds the pure extract/merge/pack field arithmetic.
//! - [`catalog`] is the id-sorted register table carrying the merged
//!   system-wide value and the strict-field mask per register.
//! - [`registry`] ties everything into one [`FeatureRegistry`] object: the
//!   boot CPU defines the baseline, joining CPUs are merged and checked
//!   against it, capabilities are evaluated once the set of boot-time CPUs
//!   is complete, and late-arriving CPUs are verified against the already
//!   frozen capability set.
//! - [`hooks`] declares what the platform supplies: raw register access,
//!   the all-CPUs activation barrier, and the pin check for local queries.
//!
//! Divergence on a strict field never takes the system down; it taints it.
//! A late CPU that lacks an active capability is parked, permanently. The
//! registry performs no internal locking beyond its own data structures:
//! boot and join calls must be serialized by the CPU lifecycle driver, one
//! call per arriving CPU.

#![cfg_attr(not(test), no_std)]

pub mod caps;
pub mod catalog;
pub mod error;
pub mod hooks;
pub mod reconcile;
pub mod registry;
pub mod schema;

mod boot;
mod evaluate;
mod export;
mod join;
mod lifecycle;

#[cfg(test)]
mod verify_tests;

pub use caps::{ActivateFn, CapScope, Capability, CapabilityId, MAX_CAPABILITIES};
pub use catalog::{MAX_REGISTERS, RegisterCatalog, RegisterDef, RegisterEntry};
pub use error::{ConfigError, ConfigResult};
pub use evaluate::Incompatible;
pub use hooks::{ActivationBarrier, CpuReadings, PinCheckFn, RegisterReader, RendezvousBarrier};
pub use join::JoinReport;
pub use lifecycle::Arrival;
pub use reconcile::{extract_field, merge_field, pack_field};
pub use registry::FeatureRegistry;
pub use schema::{FieldDescriptor, FieldSign, MergePolicy, RegisterId, RegisterSchema};
