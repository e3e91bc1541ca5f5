//! Kernel logging funnel.
//!
//! Log output goes through a single registered **backend** function pointer.
//! Until a platform driver registers one, lines are dropped: this crate has
//! no hardware of its own to write to, and the subsystem's logging contract
//! is fire-and-forget, so losing early lines is preferable to buffering or
//! blocking the caller.
//!
//! The backend receives the level and the pre-formatted arguments for one
//! log line. It is responsible for writing the text atomically (no
//! interleaving between CPUs) and for the trailing newline. It must never
//! block the calling CPU for longer than its own output path requires.

use core::fmt;
use core::sync::atomic::{AtomicPtr, AtomicU8, Ordering};

/// Severity of a log line. Lower values are more severe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum KlogLevel {
    Error = 0,
    Warn = 1,
    Info = 2,
    Debug = 3,
}

impl KlogLevel {
    fn from_raw(raw: u8) -> Self {
        match raw {
            0 => KlogLevel::Error,
            1 => KlogLevel::Warn,
            2 => KlogLevel::Info,
            _ => KlogLevel::Debug,
        }
    }

    /// Short tag for backends that prefix lines.
    pub fn tag(self) -> &'static str {
        match self {
            KlogLevel::Error => "E",
            KlogLevel::Warn => "W",
            KlogLevel::Info => "I",
            KlogLevel::Debug => "D",
        }
    }
}

/// Signature of a log backend. Receives one complete line per call.
pub type KlogBackend = fn(KlogLevel, fmt::Arguments<'_>);

/// Null means "no backend registered yet"; lines are dropped.
static BACKEND: AtomicPtr<()> = AtomicPtr::new(core::ptr::null_mut());

static THRESHOLD: AtomicU8 = AtomicU8::new(KlogLevel::Info as u8);

/// Register the output backend, replacing any previous one.
pub fn klog_register_backend(backend: KlogBackend) {
    BACKEND.store(backend as *mut (), Ordering::Release);
}

/// Set the maximum level that will be emitted.
pub fn klog_set_level(level: KlogLevel) {
    THRESHOLD.store(level as u8, Ordering::Relaxed);
}

/// Current emission threshold.
pub fn klog_level() -> KlogLevel {
    KlogLevel::from_raw(THRESHOLD.load(Ordering::Relaxed))
}

#[inline]
fn enabled(level: KlogLevel) -> bool {
    level as u8 <= THRESHOLD.load(Ordering::Relaxed)
}

/// Emit one formatted line at `level`. Called by the macros below.
pub fn klog_emit(level: KlogLevel, args: fmt::Arguments<'_>) {
    if !enabled(level) {
        return;
    }
    let ptr = BACKEND.load(Ordering::Acquire);
    if ptr.is_null() {
        return;
    }
    // SAFETY: the pointer was produced by `klog_register_backend` from a
    // valid `KlogBackend`, and fn pointers round-trip through `*mut ()` on
    // every supported target.
    let backend: KlogBackend = unsafe { core::mem::transmute(ptr) };
    backend(level, args);
}

#[macro_export]
macro_rules! klog {
    ($level:expr, $($arg:tt)*) => {
        $crate::klog::klog_emit($level, ::core::format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! klog_error {
    ($($arg:tt)*) => {
        $crate::klog::klog_emit($crate::klog::KlogLevel::Error, ::core::format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! klog_warn {
    ($($arg:tt)*) => {
        $crate::klog::klog_emit($crate::klog::KlogLevel::Warn, ::core::format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! klog_info {
    ($($arg:tt)*) => {
        $crate::klog::klog_emit($crate::klog::KlogLevel::Info, ::core::format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! klog_debug {
    ($($arg:tt)*) => {
        $crate::klog::klog_emit($crate::klog::KlogLevel::Debug, ::core::format_args!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::sync::atomic::AtomicU32;

    static LINES: AtomicU32 = AtomicU32::new(0);

    fn counting_backend(_level: KlogLevel, _args: fmt::Arguments<'_>) {
        LINES.fetch_add(1, Ordering::Relaxed);
    }

    #[test]
    fn threshold_filters_debug() {
        klog_register_backend(counting_backend);
        klog_set_level(KlogLevel::Info);
        let before = LINES.load(Ordering::Relaxed);
        klog_debug!("dropped {}", 1);
        klog_info!("kept {}", 2);
        klog_warn!("kept {}", 3);
        assert_eq!(LINES.load(Ordering::Relaxed) - before, 2);
    }
}
