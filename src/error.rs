//! Error types for position verification, bytecode building and configuration.

use std::path::PathBuf;

use crate::meta::{Constant, MethodRef};

/// A provenance chain that does not agree with the bytecode or metadata it names
#[derive(Debug, Clone, PartialEq)]
pub enum PositionError {
    /// The caller frame's call site resolves to a different method than the callee frame
    CallerMismatch {
        caller: MethodRef,
        bci: i32,
        expected: MethodRef,
        found: MethodRef,
    },
    /// A receiver that is not an instance of the frame method's declaring type
    ReceiverNotInstance { method: MethodRef, receiver: Constant },
    /// Extension would replace a receiver already recorded on the root frame
    ReceiverOverwrite { method: MethodRef, existing: Constant },
}

impl std::fmt::Display for PositionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CallerMismatch {
                caller,
                bci,
                expected,
                found,
            } => write!(
                f,
                "Caller mismatch at {}({}): expected {} but found {}",
                caller, bci, expected, found
            ),
            Self::ReceiverNotInstance { method, receiver } => write!(
                f,
                "Receiver {} is not an instance of {}",
                receiver,
                method.declaring_type()
            ),
            Self::ReceiverOverwrite { method, existing } => {
                write!(f, "Replacing receiver {} of {}", existing, method)
            }
        }
    }
}

impl std::error::Error for PositionError {}

/// Result type for position checks
pub type PositionResult<T> = Result<T, PositionError>;

/// Bytecode construction errors
#[derive(Debug, Clone, PartialEq)]
pub enum BytecodeError {
    /// Too many constants in one method body
    TooManyConstants,
    /// `emit_invoke` called with an opcode that does not take a method operand
    NotAnInvoke(String),
}

impl std::fmt::Display for BytecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TooManyConstants => write!(f, "Too many constants (max 65535)"),
            Self::NotAnInvoke(mnemonic) => {
                write!(f, "Opcode {} does not take a method operand", mnemonic)
            }
        }
    }
}

impl std::error::Error for BytecodeError {}

/// Result type for bytecode building
pub type BytecodeResult<T> = Result<T, BytecodeError>;

/// Configuration loading errors
#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: std::io::Error },
    Parse(toml::de::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "Failed to read {}: {}", path.display(), source)
            }
            Self::Parse(e) => write!(f, "Invalid exemption config: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(e) => Some(e),
        }
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        Self::Parse(e)
    }
}

/// Result type for configuration loading
pub type ConfigResult<T> = Result<T, ConfigError>;
