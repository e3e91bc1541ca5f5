//! Capability definitions.
//!
//! A capability is a boolean property derived from one register field
//! crossing a threshold. The table is append-only during initialization and
//! ordered: evaluation walks it in registration order, and point queries
//! return the first entry carrying the requested id even when several do.

use nimbus_abi::ExportNamespace;

use crate::error::{ConfigError, ConfigResult};
use crate::reconcile::extract_field;
use crate::schema::{FieldDescriptor, FieldSign, MergePolicy, RegisterId};

/// Upper bound on registered capabilities.
pub const MAX_CAPABILITIES: usize = 64;

/// Identifies one capability.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CapabilityId(pub u16);

/// Where a capability's predicate reads from at evaluation time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CapScope {
    /// The merged system-wide register value.
    System,
    /// The evaluating CPU's own raw register value.
    LocalCpu,
}

/// Hook run on every CPU when an active capability is enabled. Receives
/// the CPU index; executed inside the activation barrier, so no CPU resumes
/// until every CPU has run it.
pub type ActivateFn = fn(usize);

/// One capability predicate plus its activation and export metadata.
///
/// Immutable after registration; whether it ended up active is tracked
/// separately by the registry.
#[derive(Clone, Copy)]
pub struct Capability {
    pub id: CapabilityId,
    pub name: &'static str,
    pub scope: CapScope,
    pub register: RegisterId,
    pub field_shift: u32,
    pub field_width: u32,
    pub sign: FieldSign,
    /// The capability holds when the extracted field is at least this,
    /// compared per `sign`.
    pub min_value: i64,
    pub activate: Option<ActivateFn>,
    /// Bits this capability contributes to each export namespace.
    pub export: &'static [(ExportNamespace, u64)],
}

impl Capability {
    pub const fn new(
        id: CapabilityId,
        name: &'static str,
        scope: CapScope,
        register: RegisterId,
        field_shift: u32,
        field_width: u32,
        sign: FieldSign,
        min_value: i64,
    ) -> Self {
        Self {
            id,
            name,
            scope,
            register,
            field_shift,
            field_width,
            sign,
            min_value,
            activate: None,
            export: &[],
        }
    }

    pub const fn with_activate(mut self, hook: ActivateFn) -> Self {
        self.activate = Some(hook);
        self
    }

    pub const fn with_export(mut self, export: &'static [(ExportNamespace, u64)]) -> Self {
        self.export = export;
        self
    }

    /// Evaluate the predicate against a raw or merged register value.
    pub fn matches(&self, reg_value: u64) -> bool {
        let field = FieldDescriptor::new(
            self.sign,
            MergePolicy::Exact,
            false,
            self.field_shift,
            self.field_width,
            0,
        );
        let value = extract_field(&field, reg_value);
        match self.sign {
            FieldSign::Unsigned => (value as u64) >= (self.min_value as u64),
            FieldSign::Signed => value >= self.min_value,
        }
    }

    pub(crate) fn validate(&self) -> ConfigResult<()> {
        if self.field_width == 0
            || self.field_width > 64
            || self.field_shift > 63
            || self.field_shift + self.field_width > 64
        {
            return Err(ConfigError::BadFieldRange {
                register: self.register,
                shift: self.field_shift,
                width: self.field_width,
            });
        }
        Ok(())
    }
}

const VACANT: Capability = Capability::new(
    CapabilityId(0),
    "",
    CapScope::System,
    RegisterId(0),
    0,
    1,
    FieldSign::Unsigned,
    0,
);

/// Append-only, ordered capability table.
pub(crate) struct CapabilityTable {
    caps: [Capability; MAX_CAPABILITIES],
    len: usize,
}

impl CapabilityTable {
    pub(crate) const fn new() -> Self {
        Self {
            caps: [VACANT; MAX_CAPABILITIES],
            len: 0,
        }
    }

    pub(crate) fn push(&mut self, cap: Capability) -> ConfigResult<()> {
        if self.len == MAX_CAPABILITIES {
            return Err(ConfigError::TooManyCapabilities);
        }
        self.caps[self.len] = cap;
        self.len += 1;
        Ok(())
    }

    pub(crate) fn as_slice(&self) -> &[Capability] {
        &self.caps[..self.len]
    }

    /// Index of the first entry with `id`, in registration order.
    pub(crate) fn find_first(&self, id: CapabilityId) -> Option<usize> {
        self.as_slice().iter().position(|cap| cap.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsigned_threshold() {
        let cap = Capability::new(
            CapabilityId(1),
            "atomics",
            CapScope::System,
            RegisterId(0x10),
            4,
            4,
            FieldSign::Unsigned,
            2,
        );
        assert!(cap.matches(0x20));
        assert!(cap.matches(0xF0));
        assert!(!cap.matches(0x10));
    }

    #[test]
    fn signed_threshold_treats_negative_as_absent() {
        // A signed field of 0xF is -1, below a min of 0.
        let cap = Capability::new(
            CapabilityId(2),
            "pauth",
            CapScope::System,
            RegisterId(0x10),
            0,
            4,
            FieldSign::Signed,
            0,
        );
        assert!(cap.matches(0x0));
        assert!(cap.matches(0x7));
        assert!(!cap.matches(0xF));
    }

    #[test]
    fn first_match_wins_on_duplicate_ids() {
        let mut table = CapabilityTable::new();
        let mut a = VACANT;
        a.id = CapabilityId(9);
        a.name = "first";
        let mut b = VACANT;
        b.id = CapabilityId(9);
        b.name = "second";
        table.push(a).unwrap();
        table.push(b).unwrap();
        let index = table.find_first(CapabilityId(9)).unwrap();
        assert_eq!(table.as_slice()[index].name, "first");
    }

    #[test]
    fn table_capacity_enforced() {
        let mut table = CapabilityTable::new();
        for _ in 0..MAX_CAPABILITIES {
            table.push(VACANT).unwrap();
        }
        assert_eq!(table.push(VACANT), Err(ConfigError::TooManyCapabilities));
    }
}
