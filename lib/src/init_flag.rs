//! One-shot initialization and monotonic state flags.
//!
//! [`InitFlag`] answers "has this phase run, and am I the caller that gets to
//! run it": the first `init_once()` wins, every later call is told it lost.
//! [`StateFlag`] is a plain observable boolean for conditions that flip at
//! runtime; raising it repeatedly is harmless.

use core::sync::atomic::{AtomicBool, Ordering};

/// A flag that can be set exactly once.
pub struct InitFlag {
    set: AtomicBool,
}

impl InitFlag {
    pub const fn new() -> Self {
        Self {
            set: AtomicBool::new(false),
        }
    }

    /// Attempt the one-time transition. Returns `true` for the single caller
    /// that performed it, `false` for everyone after.
    #[inline]
    pub fn init_once(&self) -> bool {
        self.set
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    #[inline]
    pub fn is_set(&self) -> bool {
        self.set.load(Ordering::Acquire)
    }
}

impl Default for InitFlag {
    fn default() -> Self {
        Self::new()
    }
}

/// An observable boolean condition.
pub struct StateFlag {
    active: AtomicBool,
}

impl StateFlag {
    pub const fn new() -> Self {
        Self {
            active: AtomicBool::new(false),
        }
    }

    #[inline]
    pub fn set_active(&self) {
        self.active.store(true, Ordering::Release);
    }

    #[inline]
    pub fn set_inactive(&self) {
        self.active.store(false, Ordering::Release);
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}

impl Default for StateFlag {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_once_single_winner() {
        let flag = InitFlag::new();
        assert!(!flag.is_set());
        assert!(flag.init_once());
        assert!(!flag.init_once());
        assert!(flag.is_set());
    }

    #[test]
    fn state_flag_flips() {
        let flag = StateFlag::new();
        assert!(!flag.is_active());
        flag.set_active();
        flag.set_active();
        assert!(flag.is_active());
        flag.set_inactive();
        assert!(!flag.is_active());
    }
}
