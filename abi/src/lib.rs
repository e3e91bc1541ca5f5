//! NimbusOS Kernel-Userland ABI Types
//!
//! Canonical definitions for everything the kernel exposes to userland about
//! detected CPU capabilities. Userland never sees the feature-register
//! catalog itself; it sees one or more flat capability bitmasks whose bit
//! assignments are frozen here. Keeping the assignments in a single crate
//! shared by both sides eliminates drift between the kernel's export tables
//! and userland's decoding of them.

#![no_std]
#![forbid(unsafe_code)]

pub mod hwcap;

pub use hwcap::{
    CompatHwcap, ExportNamespace, MAX_EXPORT_NAMESPACES, NAMESPACE_COMPAT, NAMESPACE_PRIMARY,
    UserHwcap,
};
