//! Projection of the active capability set into the export namespaces.

use core::sync::atomic::Ordering;

use nimbus_abi::MAX_EXPORT_NAMESPACES;

use crate::caps::CapabilityTable;
use crate::registry::FeatureRegistry;

impl FeatureRegistry {
    /// Recompute every namespace mask as the OR of active capabilities'
    /// export bits. Called once, under the capability lock, as part of
    /// closing the system; the masks are immutable afterwards.
    pub(crate) fn compute_exports(&self, caps: &CapabilityTable) {
        for namespace in 0..MAX_EXPORT_NAMESPACES {
            let mut mask = 0u64;
            for (index, cap) in caps.as_slice().iter().enumerate() {
                if !self.active[index].load(Ordering::Acquire) {
                    continue;
                }
                for &(ns, bits) in cap.export {
                    if ns.0 == namespace {
                        mask |= bits;
                    }
                }
            }
            self.exports[namespace].store(mask, Ordering::Release);
        }
    }
}
