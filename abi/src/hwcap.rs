//! Userland capability bitmask namespaces.
//!
//! The kernel projects its active capability set into independently consumed
//! bitmasks. Two namespaces are defined today: the primary mask handed to
//! native userland, and a compatibility mask kept bit-stable for programs
//! built against the previous ABI revision. A capability may appear in one,
//! both, or neither namespace; the bit positions below are ABI and must never
//! be renumbered.

use bitflags::bitflags;

/// Identifies one exported bitmask namespace.
///
/// The value is an index into the kernel's per-namespace export tables, so it
/// must stay below [`MAX_EXPORT_NAMESPACES`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExportNamespace(pub usize);

/// Primary capability mask, read by native userland.
pub const NAMESPACE_PRIMARY: ExportNamespace = ExportNamespace(0);

/// Compatibility capability mask for the previous ABI revision.
pub const NAMESPACE_COMPAT: ExportNamespace = ExportNamespace(1);

/// Upper bound on concurrently exported namespaces.
///
/// Two are assigned; the headroom lets a new revision be introduced without
/// an ABI bump in this crate.
pub const MAX_EXPORT_NAMESPACES: usize = 4;

bitflags! {
    /// Bits of the primary userland capability mask.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct UserHwcap: u64 {
        /// Hardware floating point unit.
        const FP = 1 << 0;
        /// SIMD vector unit.
        const SIMD = 1 << 1;
        /// Native atomic read-modify-write instructions.
        const ATOMICS = 1 << 2;
        /// CRC32 acceleration.
        const CRC32 = 1 << 3;
        /// SHA-2 acceleration.
        const SHA2 = 1 << 4;
        /// AES acceleration.
        const AES = 1 << 5;
        /// Scalable vector extension.
        const SVE = 1 << 6;
        /// Hardware random number generator.
        const RNG = 1 << 7;
        /// Pointer authentication.
        const PAUTH = 1 << 8;
        /// Speculation barrier instruction.
        const SB = 1 << 9;
    }
}

bitflags! {
    /// Bits of the compatibility capability mask.
    ///
    /// Assignments predate the primary mask and intentionally differ from it.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct CompatHwcap: u64 {
        const FP = 1 << 0;
        const SIMD = 1 << 1;
        const CRC32 = 1 << 2;
        const CRYPTO = 1 << 3;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn namespace_indices_in_range() {
        assert!(NAMESPACE_PRIMARY.0 < MAX_EXPORT_NAMESPACES);
        assert!(NAMESPACE_COMPAT.0 < MAX_EXPORT_NAMESPACES);
        assert_ne!(NAMESPACE_PRIMARY, NAMESPACE_COMPAT);
    }

    #[test]
    fn primary_bits_are_distinct() {
        let all = UserHwcap::all();
        assert_eq!(all.bits().count_ones(), 10);
    }
}
