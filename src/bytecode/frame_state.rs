//! Bytecode index sentinels used by deoptimization frame states.
//!
//! Real bytecode indices are non-negative. Negative values mark positions that
//! do not correspond to an instruction.

/// Before the first instruction of a method (e.g. the method entry state)
pub const BEFORE_BCI: i32 = -1;

/// After the last instruction (e.g. the state at a normal return)
pub const AFTER_BCI: i32 = -2;

/// After an exception has been thrown out of the method
pub const AFTER_EXCEPTION_BCI: i32 = -3;

/// Unknown position
pub const UNKNOWN_BCI: i32 = -4;

/// Unwinding of the frame
pub const UNWIND_BCI: i32 = -5;

/// A frame state that must never be used for deoptimization
pub const INVALID_FRAMESTATE_BCI: i32 = -6;

/// Whether `bci` is one of the placeholder sentinels rather than a real index
#[inline]
pub fn is_placeholder_bci(bci: i32) -> bool {
    bci < 0
}
