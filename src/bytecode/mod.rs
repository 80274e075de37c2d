//! Bytecode access for position verification and rendering
//!
//! Positions never read bytecode directly. Everything they need from a
//! method's code goes through the [`BytecodeInfo`] capability, so a compiler
//! can back it with its class-file parser and tests can back it with
//! hand-built chunks.
//!
//! # Modules
//!
//! - [`opcodes`]: Instruction set and invoke classification
//! - [`chunk`]: BytecodeChunk method bodies with constant pool and disassembler
//! - [`registry`]: Concurrent method → chunk map implementing `BytecodeInfo`
//! - [`frame_state`]: Placeholder bytecode index sentinels
//!
//! # Example
//!
//! ```ignore
//! use inline_provenance::bytecode::{ChunkBuilder, MethodRegistry, Opcode};
//!
//! let mut builder = ChunkBuilder::new("caller");
//! let bci = builder.emit_invoke(Opcode::InvokeStatic, callee.clone())?;
//! builder.emit(Opcode::Return);
//!
//! let registry = MethodRegistry::new();
//! registry.register(caller.clone(), builder.build_arc());
//! assert_eq!(registry.invoked_method_at(&caller, bci as i32), Some(callee));
//! ```

pub mod chunk;
pub mod frame_state;
pub mod opcodes;
pub mod registry;

pub use chunk::{BytecodeChunk, ChunkBuilder, PoolEntry};
pub use opcodes::Opcode;
pub use registry::MethodRegistry;

use crate::meta::MethodRef;

/// Read access to method bytecode
///
/// All lookups are by method and bytecode index. Implementations return None
/// for unknown methods, out of range indices and placeholder indices.
/// Which indices are placeholders is fixed by [`frame_state`], not by the
/// implementation, so construction and verification agree on them.
pub trait BytecodeInfo: Send + Sync {
    /// Opcode of the instruction at `bci`
    fn opcode_at(&self, method: &MethodRef, bci: i32) -> Option<Opcode>;

    /// Statically resolved target of the call instruction at `bci`
    fn invoked_method_at(&self, method: &MethodRef, bci: i32) -> Option<MethodRef>;

    /// Human readable text of the single instruction at `bci`
    fn disassemble_one(&self, method: &MethodRef, bci: i32) -> Option<String>;
}

/// A `BytecodeInfo` with no bytecode at all
///
/// Every link it is asked about is unverifiable and therefore accepted, and
/// rendering produces no disassembly.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoBytecode;

impl BytecodeInfo for NoBytecode {
    fn opcode_at(&self, _method: &MethodRef, _bci: i32) -> Option<Opcode> {
        None
    }

    fn invoked_method_at(&self, _method: &MethodRef, _bci: i32) -> Option<MethodRef> {
        None
    }

    fn disassemble_one(&self, _method: &MethodRef, _bci: i32) -> Option<String> {
        None
    }
}
