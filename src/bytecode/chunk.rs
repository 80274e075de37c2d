//! Bytecode chunk representation
//!
//! A BytecodeChunk is the compiled body of one method: its instructions and
//! the constant pool they index into. Chunks are immutable after
//! building and can be shared across threads.

use std::fmt;
use std::sync::Arc;

use crate::error::{BytecodeError, BytecodeResult};
use crate::meta::{MethodRef, TypeRef};

use super::opcodes::Opcode;

/// An entry in a chunk's constant pool
#[derive(Debug, Clone, PartialEq)]
pub enum PoolEntry {
    Int(i64),
    Type(TypeRef),
    Method(MethodRef),
    Field(String),
    /// Bootstrap name of a dynamic call site
    CallSite(String),
}

impl fmt::Display for PoolEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PoolEntry::Int(v) => write!(f, "{}", v),
            PoolEntry::Type(ty) => write!(f, "{}", ty),
            PoolEntry::Method(m) => write!(f, "{}", m),
            PoolEntry::Field(name) => write!(f, "{}", name),
            PoolEntry::CallSite(name) => write!(f, "call_site {}", name),
        }
    }
}

/// A compiled method body
#[derive(Debug, Clone)]
pub struct BytecodeChunk {
    /// The bytecode instructions
    code: Vec<u8>,

    /// Constant pool for operands that can't be encoded inline
    constants: Vec<PoolEntry>,

    /// Name of this chunk (for debugging)
    name: String,
}

/// Builder for constructing BytecodeChunks
#[derive(Debug)]
pub struct ChunkBuilder {
    code: Vec<u8>,
    constants: Vec<PoolEntry>,
    name: String,
}

impl BytecodeChunk {
    /// Get the length of the bytecode
    #[inline]
    pub fn len(&self) -> usize {
        self.code.len()
    }

    /// Check if the chunk is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    /// Decode the byte at `offset` as an opcode, without checking instruction boundaries
    #[inline]
    pub fn read_opcode(&self, offset: usize) -> Option<Opcode> {
        self.code.get(offset).and_then(|&b| Opcode::from_byte(b))
    }

    /// Read a u16 from the bytecode (big-endian)
    #[inline]
    pub fn read_u16(&self, offset: usize) -> Option<u16> {
        if offset + 1 < self.code.len() {
            Some(u16::from_be_bytes([self.code[offset], self.code[offset + 1]]))
        } else {
            None
        }
    }

    /// Get a constant from the pool
    #[inline]
    pub fn get_constant(&self, index: u16) -> Option<&PoolEntry> {
        self.constants.get(index as usize)
    }

    /// Get the chunk name
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether an instruction begins exactly at `offset`
    pub fn is_instruction_start(&self, offset: usize) -> bool {
        let mut pos = 0;
        while pos < offset {
            let Some(opcode) = self.read_opcode(pos) else {
                return false;
            };
            pos += 1 + opcode.immediate_size();
        }
        pos == offset && offset < self.code.len()
    }

    /// Opcode of the instruction starting at `offset`
    ///
    /// Returns None for offsets inside an instruction or past the end.
    pub fn opcode_at(&self, offset: usize) -> Option<Opcode> {
        if self.is_instruction_start(offset) {
            self.read_opcode(offset)
        } else {
            None
        }
    }

    /// Method named by the invoke instruction at `offset`
    ///
    /// Dynamic invocations have no statically known target and return None.
    pub fn invoked_method_at(&self, offset: usize) -> Option<&MethodRef> {
        let opcode = self.opcode_at(offset)?;
        if !opcode.is_static_invoke() {
            return None;
        }
        match self.get_constant(self.read_u16(offset + 1)?)? {
            PoolEntry::Method(method) => Some(method),
            _ => None,
        }
    }

    /// Disassemble a single instruction, returns (string, next_offset)
    pub fn disassemble_instruction(&self, offset: usize) -> (String, usize) {
        let Some(opcode) = self.read_opcode(offset) else {
            return (
                format!("??? (0x{:02x})", self.code.get(offset).copied().unwrap_or(0)),
                offset + 1,
            );
        };

        let mnemonic = opcode.mnemonic();
        let imm_size = opcode.immediate_size();
        let next_offset = offset + 1 + imm_size;

        let operand_str = match imm_size {
            0 => String::new(),
            1 => {
                let byte = self.code.get(offset + 1).copied().unwrap_or(0);
                match opcode {
                    Opcode::PushIntSmall => format!(" {}", byte as i8),
                    _ => format!(" {}", byte),
                }
            }
            2 => {
                let value = self.read_u16(offset + 1).unwrap_or(0);
                if opcode.is_jump() {
                    let target = (offset as isize + 3 + (value as i16) as isize) as usize;
                    format!(" -> {:04x}", target)
                } else {
                    let const_str = self
                        .constants
                        .get(value as usize)
                        .map(|c| c.to_string())
                        .unwrap_or_else(|| "???".to_string());
                    format!(" #{} ({})", value, const_str)
                }
            }
            _ => String::new(),
        };

        (format!("{}{}", mnemonic, operand_str), next_offset)
    }
}

impl ChunkBuilder {
    /// Create a new chunk builder
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            code: Vec::with_capacity(64),
            constants: Vec::new(),
            name: name.into(),
        }
    }

    /// Get the current bytecode offset
    #[inline]
    pub fn current_offset(&self) -> usize {
        self.code.len()
    }

    /// Emit a single opcode
    pub fn emit(&mut self, opcode: Opcode) {
        self.code.push(opcode.to_byte());
    }

    /// Emit an opcode with a 1-byte operand
    pub fn emit_byte(&mut self, opcode: Opcode, operand: u8) {
        self.code.push(opcode.to_byte());
        self.code.push(operand);
    }

    /// Emit an opcode with a 2-byte operand (big-endian)
    pub fn emit_u16(&mut self, opcode: Opcode, operand: u16) {
        self.code.push(opcode.to_byte());
        self.code.extend_from_slice(&operand.to_be_bytes());
    }

    /// Add a constant to the pool, returns its index
    pub fn add_constant(&mut self, entry: PoolEntry) -> BytecodeResult<u16> {
        if let Some(i) = self.constants.iter().position(|existing| existing == &entry) {
            return Ok(i as u16);
        }

        let index = self.constants.len();
        if index > u16::MAX as usize {
            return Err(BytecodeError::TooManyConstants);
        }
        self.constants.push(entry);
        Ok(index as u16)
    }

    /// Emit a call to `method`, returns the bytecode offset of the call instruction
    pub fn emit_invoke(&mut self, opcode: Opcode, method: MethodRef) -> BytecodeResult<usize> {
        if !opcode.is_static_invoke() {
            return Err(BytecodeError::NotAnInvoke(opcode.mnemonic().to_string()));
        }
        let index = self.add_constant(PoolEntry::Method(method))?;
        let bci = self.current_offset();
        self.emit_u16(opcode, index);
        Ok(bci)
    }

    /// Emit a dynamic call site, returns the bytecode offset of the call instruction
    pub fn emit_invoke_dynamic(&mut self, call_site: impl Into<String>) -> BytecodeResult<usize> {
        let index = self.add_constant(PoolEntry::CallSite(call_site.into()))?;
        let bci = self.current_offset();
        self.emit_u16(Opcode::InvokeDynamic, index);
        Ok(bci)
    }

    /// Build the final chunk
    pub fn build(self) -> BytecodeChunk {
        BytecodeChunk {
            code: self.code,
            constants: self.constants,
            name: self.name,
        }
    }

    /// Build the final chunk wrapped in an Arc
    pub fn build_arc(self) -> Arc<BytecodeChunk> {
        Arc::new(self.build())
    }
}
