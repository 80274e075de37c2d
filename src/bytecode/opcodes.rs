//! Bytecode opcode definitions
//!
//! A compact stack-machine instruction set. Each opcode is one byte followed
//! by zero or more immediate bytes; [`Opcode::immediate_size`] gives the count.
//!
//! # Encoding
//! - 1-byte immediates: local slot index or small signed constant
//! - 2-byte immediates (big-endian): constant pool index or signed jump offset
//!
//! # Categories
//! - 0x00-0x0F: Stack operations
//! - 0x10-0x1F: Constants and locals
//! - 0x20-0x2F: Arithmetic
//! - 0x30-0x3F: Objects and fields
//! - 0x40-0x4F: Control flow
//! - 0x50-0x5F: Invocation
//! - 0x60-0x6F: Return and throw

use std::fmt;

/// Bytecode opcodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    // === Stack Operations (0x00-0x0F) ===
    /// No operation
    Nop = 0x00,
    /// Pop top of stack
    Pop = 0x01,
    /// Duplicate top of stack
    Dup = 0x02,
    /// Swap top two values
    Swap = 0x03,

    // === Constants and Locals (0x10-0x1F) ===
    /// Push null reference
    PushNull = 0x10,
    /// Push small integer (-128..127): <value: i8>
    PushIntSmall = 0x11,
    /// Push constant from pool: <index: u16>
    PushConstant = 0x12,
    /// Load local slot: <slot: u8>
    LoadLocal = 0x13,
    /// Store local slot: <slot: u8>
    StoreLocal = 0x14,

    // === Arithmetic (0x20-0x2F) ===
    Add = 0x20,
    Sub = 0x21,
    Mul = 0x22,
    Div = 0x23,
    Neg = 0x24,

    // === Objects and Fields (0x30-0x3F) ===
    /// Allocate instance: <type_index: u16>
    New = 0x30,
    /// Read field: <field_index: u16>
    GetField = 0x31,
    /// Write field: <field_index: u16>
    PutField = 0x32,
    /// Checked cast: <type_index: u16>
    CheckCast = 0x33,
    /// Instance test: <type_index: u16>
    InstanceOf = 0x34,

    // === Control Flow (0x40-0x4F) ===
    /// Unconditional jump: <offset: i16>
    Jump = 0x40,
    /// Jump if false: <offset: i16>
    JumpIfFalse = 0x41,
    /// Jump if true: <offset: i16>
    JumpIfTrue = 0x42,

    // === Invocation (0x50-0x5F) ===
    /// Virtual dispatch on the receiver: <method_index: u16>
    InvokeVirtual = 0x50,
    /// Non-virtual instance call (constructors, private, super): <method_index: u16>
    InvokeSpecial = 0x51,
    /// Static call: <method_index: u16>
    InvokeStatic = 0x52,
    /// Interface dispatch: <method_index: u16>
    InvokeInterface = 0x53,
    /// Call site linked at run time: <call_site_index: u16>
    InvokeDynamic = 0x54,

    // === Return and Throw (0x60-0x6F) ===
    /// Return without value
    Return = 0x60,
    /// Return top of stack
    ReturnValue = 0x61,
    /// Throw top of stack
    Throw = 0x62,
}

impl Opcode {
    /// Convert byte to opcode, returns None if invalid
    #[inline]
    pub fn from_byte(byte: u8) -> Option<Self> {
        OPCODE_TABLE.get(byte as usize).copied().flatten()
    }

    /// Convert opcode to byte
    #[inline]
    pub fn to_byte(self) -> u8 {
        self as u8
    }

    /// Get the number of immediate bytes following this opcode
    #[inline]
    pub fn immediate_size(self) -> usize {
        match self {
            Self::Nop | Self::Pop | Self::Dup | Self::Swap | Self::PushNull
            | Self::Add | Self::Sub | Self::Mul | Self::Div | Self::Neg
            | Self::Return | Self::ReturnValue | Self::Throw => 0,

            Self::PushIntSmall | Self::LoadLocal | Self::StoreLocal => 1,

            Self::PushConstant | Self::New | Self::GetField | Self::PutField
            | Self::CheckCast | Self::InstanceOf
            | Self::Jump | Self::JumpIfFalse | Self::JumpIfTrue
            | Self::InvokeVirtual | Self::InvokeSpecial | Self::InvokeStatic
            | Self::InvokeInterface | Self::InvokeDynamic => 2,
        }
    }

    /// Get the mnemonic name for this opcode
    pub fn mnemonic(self) -> &'static str {
        match self {
            Self::Nop => "nop",
            Self::Pop => "pop",
            Self::Dup => "dup",
            Self::Swap => "swap",
            Self::PushNull => "push_null",
            Self::PushIntSmall => "push_int_small",
            Self::PushConstant => "push_constant",
            Self::LoadLocal => "load_local",
            Self::StoreLocal => "store_local",
            Self::Add => "add",
            Self::Sub => "sub",
            Self::Mul => "mul",
            Self::Div => "div",
            Self::Neg => "neg",
            Self::New => "new",
            Self::GetField => "get_field",
            Self::PutField => "put_field",
            Self::CheckCast => "check_cast",
            Self::InstanceOf => "instance_of",
            Self::Jump => "jump",
            Self::JumpIfFalse => "jump_if_false",
            Self::JumpIfTrue => "jump_if_true",
            Self::InvokeVirtual => "invoke_virtual",
            Self::InvokeSpecial => "invoke_special",
            Self::InvokeStatic => "invoke_static",
            Self::InvokeInterface => "invoke_interface",
            Self::InvokeDynamic => "invoke_dynamic",
            Self::Return => "return",
            Self::ReturnValue => "return_value",
            Self::Throw => "throw",
        }
    }

    /// Check if this opcode is a jump instruction
    #[inline]
    pub fn is_jump(self) -> bool {
        matches!(self, Self::Jump | Self::JumpIfFalse | Self::JumpIfTrue)
    }

    /// Check if this opcode is any kind of call
    #[inline]
    pub fn is_invoke(self) -> bool {
        self.is_static_invoke() || self == Self::InvokeDynamic
    }

    /// Check if this opcode calls a method named in the constant pool
    ///
    /// Dynamic invocations are excluded: their target is only known at link time.
    #[inline]
    pub fn is_static_invoke(self) -> bool {
        matches!(
            self,
            Self::InvokeVirtual | Self::InvokeSpecial | Self::InvokeStatic | Self::InvokeInterface
        )
    }

}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.mnemonic())
    }
}

/// Lookup table for byte -> Opcode conversion
static OPCODE_TABLE: [Option<Opcode>; 256] = {
    let mut table = [None; 256];

    // Stack operations
    table[0x00] = Some(Opcode::Nop);
    table[0x01] = Some(Opcode::Pop);
    table[0x02] = Some(Opcode::Dup);
    table[0x03] = Some(Opcode::Swap);

    // Constants and locals
    table[0x10] = Some(Opcode::PushNull);
    table[0x11] = Some(Opcode::PushIntSmall);
    table[0x12] = Some(Opcode::PushConstant);
    table[0x13] = Some(Opcode::LoadLocal);
    table[0x14] = Some(Opcode::StoreLocal);

    // Arithmetic
    table[0x20] = Some(Opcode::Add);
    table[0x21] = Some(Opcode::Sub);
    table[0x22] = Some(Opcode::Mul);
    table[0x23] = Some(Opcode::Div);
    table[0x24] = Some(Opcode::Neg);

    // Objects and fields
    table[0x30] = Some(Opcode::New);
    table[0x31] = Some(Opcode::GetField);
    table[0x32] = Some(Opcode::PutField);
    table[0x33] = Some(Opcode::CheckCast);
    table[0x34] = Some(Opcode::InstanceOf);

    // Control flow
    table[0x40] = Some(Opcode::Jump);
    table[0x41] = Some(Opcode::JumpIfFalse);
    table[0x42] = Some(Opcode::JumpIfTrue);

    // Invocation
    table[0x50] = Some(Opcode::InvokeVirtual);
    table[0x51] = Some(Opcode::InvokeSpecial);
    table[0x52] = Some(Opcode::InvokeStatic);
    table[0x53] = Some(Opcode::InvokeInterface);
    table[0x54] = Some(Opcode::InvokeDynamic);

    // Return and throw
    table[0x60] = Some(Opcode::Return);
    table[0x61] = Some(Opcode::ReturnValue);
    table[0x62] = Some(Opcode::Throw);

    table
};
