//! Register schemas: how a 64-bit feature register splits into fields.
//!
//! Schemas are data, not code. Each register kind carries an ordered table
//! of [`FieldDescriptor`] rows; reserved ranges are simply absent from the
//! table and read as zero. Tables are `const`-constructible so a platform
//! can declare its whole register layout as statics.

use crate::error::{ConfigError, ConfigResult};
use core::fmt;

/// Identifies one feature register kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct RegisterId(pub u32);

impl fmt::Display for RegisterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

/// Interpretation of a field's bit pattern.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldSign {
    Unsigned,
    Signed,
}

/// How a joining CPU's field value folds into the system-wide value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MergePolicy {
    /// The system-wide value is pinned to the descriptor's configured
    /// default, whatever the CPUs report.
    Exact,
    /// Smaller values are safer; keep the minimum seen.
    LowerSafe,
    /// Larger values are safer; keep the maximum seen.
    HigherSafe,
}

/// One bit-field of a register.
///
/// A `width` of zero is the end-of-table sentinel: schema iteration stops
/// there, which lets static tables carry an explicit terminator row.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub shift: u32,
    pub width: u32,
    pub sign: FieldSign,
    pub policy: MergePolicy,
    /// Strict fields must be identical on every CPU; divergence taints the
    /// system.
    pub strict: bool,
    /// System-wide value used by the `Exact` policy.
    pub exact_default: i64,
}

impl FieldDescriptor {
    /// Explicit end-of-table terminator row.
    pub const END: FieldDescriptor = FieldDescriptor {
        shift: 0,
        width: 0,
        sign: FieldSign::Unsigned,
        policy: MergePolicy::Exact,
        strict: false,
        exact_default: 0,
    };

    pub const fn new(
        sign: FieldSign,
        policy: MergePolicy,
        strict: bool,
        shift: u32,
        width: u32,
        exact_default: i64,
    ) -> Self {
        Self {
            shift,
            width,
            sign,
            policy,
            strict,
            exact_default,
        }
    }

    /// Unsigned field with a zero `Exact` default.
    pub const fn unsigned(policy: MergePolicy, strict: bool, shift: u32, width: u32) -> Self {
        Self::new(FieldSign::Unsigned, policy, strict, shift, width, 0)
    }

    /// Signed field with a zero `Exact` default.
    pub const fn signed(policy: MergePolicy, strict: bool, shift: u32, width: u32) -> Self {
        Self::new(FieldSign::Signed, policy, strict, shift, width, 0)
    }

    pub const fn with_exact_default(mut self, value: i64) -> Self {
        self.exact_default = value;
        self
    }

    pub const fn is_end(&self) -> bool {
        self.width == 0
    }

    /// Mask of this field's bits in register position.
    pub const fn field_mask(&self) -> u64 {
        let value_mask = if self.width >= 64 {
            u64::MAX
        } else {
            (1u64 << self.width) - 1
        };
        value_mask << self.shift
    }

    pub(crate) fn validate(&self, register: RegisterId) -> ConfigResult<()> {
        if self.width > 64 || self.shift > 63 || self.shift + self.width > 64 {
            return Err(ConfigError::BadFieldRange {
                register,
                shift: self.shift,
                width: self.width,
            });
        }
        Ok(())
    }
}

/// Ordered field table for one register kind.
#[derive(Clone, Copy, Debug)]
pub struct RegisterSchema {
    fields: &'static [FieldDescriptor],
}

impl RegisterSchema {
    pub const fn new(fields: &'static [FieldDescriptor]) -> Self {
        Self { fields }
    }

    /// Iterate the live rows, stopping at the first sentinel.
    pub fn iter(&self) -> impl Iterator<Item = &'static FieldDescriptor> {
        self.fields.iter().take_while(|field| !field.is_end())
    }

    pub(crate) fn validate(&self, register: RegisterId) -> ConfigResult<()> {
        for field in self.iter() {
            field.validate(register)?;
        }
        Ok(())
    }
}
