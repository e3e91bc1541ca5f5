//! Fatal configuration errors.
//!
//! Everything here is unrecoverable by design: binary-search lookup needs a
//! sorted catalog, the merge machinery needs well-formed field ranges, and
//! the engine has no meaningful baseline without the boot CPU's readings.
//! Callers abort initialization on any of these. Runtime divergence between
//! CPUs is deliberately *not* an error type; it is reported and tainted,
//! never propagated as `Err`.

use core::fmt;

use crate::schema::RegisterId;

pub type ConfigResult<T> = Result<T, ConfigError>;

/// A catalog or capability table that cannot be used as configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Register definitions are not in ascending id order.
    UnsortedCatalog { index: usize },
    /// The same register id appears twice.
    DuplicateRegister(RegisterId),
    /// A field does not fit in 64 bits.
    BadFieldRange {
        register: RegisterId,
        shift: u32,
        width: u32,
    },
    /// A catalog register was absent from the boot CPU's readings.
    MissingBootRegister(RegisterId),
    /// A capability references a register the catalog does not carry.
    UnknownRegister(RegisterId),
    /// More register definitions than the catalog can hold.
    TooManyRegisters,
    /// More capabilities than the table can hold.
    TooManyCapabilities,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsortedCatalog { index } => {
                write!(f, "register catalog unsorted at index {}", index)
            }
            Self::DuplicateRegister(id) => {
                write!(f, "register {} defined twice", id)
            }
            Self::BadFieldRange {
                register,
                shift,
                width,
            } => {
                write!(
                    f,
                    "field shift {} width {} of register {} exceeds 64 bits",
                    shift, width, register
                )
            }
            Self::MissingBootRegister(id) => {
                write!(f, "register {} missing from boot CPU readings", id)
            }
            Self::UnknownRegister(id) => {
                write!(f, "capability references unknown register {}", id)
            }
            Self::TooManyRegisters => write!(f, "register catalog capacity exceeded"),
            Self::TooManyCapabilities => write!(f, "capability table capacity exceeded"),
        }
    }
}
