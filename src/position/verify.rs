//! Verification of call chains against bytecode
//!
//! Each adjacent pair of frames in a chain claims "the caller frame's
//! instruction is a call to the callee frame's method". [`verify_link`]
//! checks that claim against the caller's bytecode. The declaring type of the
//! resolved target is not compared: an interface call site names the
//! interface, not the implementation that was inlined. Name and signature
//! match is enough.
//!
//! Links are accepted without a match when the caller bci is a placeholder,
//! when no static call target can be resolved at that bci, or when one of the
//! [`VerifyConfig`] exemptions applies.

use rayon::prelude::*;
use tracing::{debug, warn};

use crate::bytecode::{frame_state, BytecodeInfo, Opcode};
use crate::config::{self, VerifyConfig};
use crate::error::{PositionError, PositionResult};

use super::SourcePosition;

/// Check one caller/callee link
pub fn verify_link(
    callee: &SourcePosition,
    caller: &SourcePosition,
    bytecode: &dyn BytecodeInfo,
    config: &VerifyConfig,
) -> PositionResult<()> {
    if frame_state::is_placeholder_bci(caller.bci()) {
        return Ok(());
    }
    let Some(expected) = bytecode.invoked_method_at(caller.method(), caller.bci()) else {
        return Ok(());
    };
    if expected.matches_name_and_signature(callee.method()) {
        return Ok(());
    }

    let opcode = bytecode.opcode_at(caller.method(), caller.bci());
    if let Some(reason) = exemption(callee, caller, opcode, config) {
        debug!(
            target: "inline_provenance::verify",
            caller = %caller.method(),
            callee = %callee.method(),
            reason,
            "Accepting link by exemption"
        );
        return Ok(());
    }

    let e = PositionError::CallerMismatch {
        caller: caller.method().clone(),
        bci: caller.bci(),
        expected,
        found: callee.method().clone(),
    };
    warn!(target: "inline_provenance::verify", error = %e, "Rejecting link");
    Err(e)
}

fn exemption(
    callee: &SourcePosition,
    caller: &SourcePosition,
    opcode: Option<Opcode>,
    config: &VerifyConfig,
) -> Option<&'static str> {
    if config.exempt_dynamic_invokes && opcode == Some(Opcode::InvokeDynamic) {
        Some("dynamic invocation")
    } else if config.is_trampoline_caller(caller.method().name()) {
        Some("linkage trampoline caller")
    } else if config.is_generated_type(caller.method().declaring_type().name()) {
        Some("generated caller type")
    } else if config.is_inlining_trampoline(callee.method().name()) {
        Some("inlining trampoline callee")
    } else {
        None
    }
}

impl SourcePosition {
    /// Check every link of the chain with the process-wide exemptions
    pub fn check(&self, bytecode: &dyn BytecodeInfo) -> PositionResult<()> {
        self.check_with(bytecode, VerifyConfig::global())
    }

    /// Check every link of the chain, head to root, stopping at the first failure
    pub fn check_with(&self, bytecode: &dyn BytecodeInfo, config: &VerifyConfig) -> PositionResult<()> {
        let mut current = self;
        while let Some(caller) = current.caller() {
            verify_link(current, caller, bytecode, config)?;
            current = caller;
        }
        Ok(())
    }

    /// Assert that the chain agrees with the bytecode
    ///
    /// Always returns true; a failure is a compiler bug and panics. Outside
    /// verification mode nothing is checked.
    pub fn verify(&self, bytecode: &dyn BytecodeInfo) -> bool {
        if !config::verification_enabled() {
            return true;
        }
        if let Err(e) = self.check(bytecode) {
            panic!("{}\n{}", e, self.display(bytecode));
        }
        true
    }
}

/// Outcome of checking a batch of chains
#[derive(Debug, Default)]
pub struct VerificationReport {
    /// Number of chains checked
    pub checked: usize,
    /// Index into the input and the first failure of each rejected chain, by index
    pub failures: Vec<(usize, PositionError)>,
}

impl VerificationReport {
    pub fn is_ok(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Check many chains in parallel
pub fn check_all(
    positions: &[SourcePosition],
    bytecode: &dyn BytecodeInfo,
    config: &VerifyConfig,
) -> VerificationReport {
    let mut failures: Vec<(usize, PositionError)> = positions
        .par_iter()
        .enumerate()
        .filter_map(|(i, position)| position.check_with(bytecode, config).err().map(|e| (i, e)))
        .collect();
    failures.sort_by_key(|(i, _)| *i);

    VerificationReport {
        checked: positions.len(),
        failures,
    }
}
