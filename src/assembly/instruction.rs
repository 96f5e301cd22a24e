//! Decoded CIL instructions and their operands.
//!
//! # Key Types
//! - [`Instruction`] - One decoded instruction at an offset inside a method body
//! - [`Operand`] - What followed the opcode, after token resolution
//! - [`OperandType`] - How many operand bytes an opcode consumes and how to read them
//! - [`FlowType`] / [`InstructionCategory`] - Coarse classification of the opcode
//!
//! # Thread Safety
//!
//! All types in this module are [`Send`] and [`Sync`]. Decoded instructions own their data
//! and can be handed across threads freely.

use std::fmt;

use crate::metadata::{loader::MemberRef, token::Token};

/// The operand layout of an opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandType {
    /// No operand present
    None,
    /// Signed 8-bit integer
    Int8,
    /// Unsigned 8-bit integer
    UInt8,
    /// Unsigned 16-bit integer
    UInt16,
    /// Signed 32-bit integer
    Int32,
    /// Signed 64-bit integer
    Int64,
    /// 32-bit floating point
    Float32,
    /// 64-bit floating point
    Float64,
    /// Signed 8-bit branch displacement
    ShortBranch,
    /// Signed 32-bit branch displacement
    Branch,
    /// Metadata token reference
    Token,
    /// Switch table: a 32-bit count followed by that many 32-bit displacements
    Switch,
}

impl OperandType {
    /// Size in bytes of the operand, or `None` for the variable sized switch table.
    ///
    /// ```rust
    /// use dotprobe::assembly::OperandType;
    ///
    /// assert_eq!(OperandType::None.size(), Some(0));
    /// assert_eq!(OperandType::ShortBranch.size(), Some(1));
    /// assert_eq!(OperandType::Token.size(), Some(4));
    /// assert_eq!(OperandType::Float64.size(), Some(8));
    /// assert_eq!(OperandType::Switch.size(), None);
    /// ```
    #[must_use]
    pub const fn size(&self) -> Option<usize> {
        match self {
            OperandType::None => Some(0),
            OperandType::Int8 | OperandType::UInt8 | OperandType::ShortBranch => Some(1),
            OperandType::UInt16 => Some(2),
            OperandType::Int32 | OperandType::Float32 | OperandType::Branch | OperandType::Token => {
                Some(4)
            }
            OperandType::Int64 | OperandType::Float64 => Some(8),
            OperandType::Switch => None,
        }
    }
}

/// A literal immediate operand.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Immediate {
    /// Signed 8-bit integer (`ldc.i4.s`)
    Int8(i8),
    /// Unsigned 8-bit integer (`ldarg.s`, `ldloc.s`, `unaligned.`, ...)
    UInt8(u8),
    /// Unsigned 16-bit integer (`ldarg`, `ldloc`, ...)
    UInt16(u16),
    /// Signed 32-bit integer (`ldc.i4`)
    Int32(i32),
    /// Signed 64-bit integer (`ldc.i8`)
    Int64(i64),
    /// 32-bit float (`ldc.r4`)
    Float32(f32),
    /// 64-bit float (`ldc.r8`)
    Float64(f64),
}

impl fmt::Display for Immediate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Immediate::Int8(value) => write!(f, "{value}"),
            Immediate::UInt8(value) => write!(f, "{value}"),
            Immediate::UInt16(value) => write!(f, "{value}"),
            Immediate::Int32(value) => write!(f, "{value}"),
            Immediate::Int64(value) => write!(f, "{value}"),
            Immediate::Float32(value) => write!(f, "{value:?}"),
            Immediate::Float64(value) => write!(f, "{value:?}"),
        }
    }
}

/// The decoded operand of an instruction.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// No operand
    None,
    /// Integer or floating point literal
    Immediate(Immediate),
    /// Absolute branch target offset inside the method body.
    ///
    /// Signed because hostile bodies can encode displacements that point before the start.
    Target(i64),
    /// Resolved user string (`ldstr`)
    String(String),
    /// Resolved method, field or type
    Member(MemberRef),
    /// Token the loader could not resolve
    Token(Token),
    /// Switch table; only the case count is kept, the targets are skipped
    Switch {
        /// Number of cases
        count: u32,
    },
}

/// How an instruction affects control flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowType {
    /// Falls through to the next instruction
    Sequential,
    /// May branch or fall through
    ConditionalBranch,
    /// Always branches
    UnconditionalBranch,
    /// Calls another method and continues
    Call,
    /// Returns from the method
    Return,
    /// Multi-way branch
    Switch,
    /// Throws an exception
    Throw,
    /// Ends a finally, fault or filter block
    EndFinally,
    /// Leaves a protected region
    Leave,
}

/// Coarse functional category of an opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstructionCategory {
    /// Arithmetic operations
    Arithmetic,
    /// Bitwise and logical operations
    BitwiseLogical,
    /// Comparisons
    Comparison,
    /// Branches, calls, returns, exceptions
    ControlFlow,
    /// Numeric conversions
    Conversion,
    /// Loads and stores of arguments, locals, fields, elements and indirections
    LoadStore,
    /// Object model: allocation, casts, boxing, tokens
    ObjectModel,
    /// Prefixes modifying the following instruction
    Prefix,
    /// Everything else
    Misc,
}

/// One decoded CIL instruction.
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    /// Offset of the first opcode byte inside the method body
    pub offset: u32,
    /// Total encoded size, opcode and operand bytes together
    pub size: u32,
    /// `0xFE` for two-byte opcodes, `0` otherwise
    pub prefix: u8,
    /// The opcode byte (second byte for two-byte opcodes)
    pub opcode: u8,
    /// Mnemonic as written in ILAsm
    pub mnemonic: &'static str,
    /// Functional category
    pub category: InstructionCategory,
    /// Control flow behaviour
    pub flow_type: FlowType,
    /// Decoded operand
    pub operand: Operand,
}

impl Instruction {
    /// 16-bit opcode key: `0xFEnn` for two-byte opcodes, `0x00nn` otherwise.
    #[must_use]
    pub fn opcode_key(&self) -> u16 {
        u16::from(self.prefix) << 8 | u16::from(self.opcode)
    }

    /// Offset of the instruction that follows this one.
    #[must_use]
    pub fn next_offset(&self) -> u32 {
        self.offset.saturating_add(self.size)
    }

    /// The branch target, for branch and leave instructions.
    #[must_use]
    pub fn branch_target(&self) -> Option<i64> {
        match self.operand {
            Operand::Target(target) => Some(target),
            _ => None,
        }
    }

    /// Whether control may transfer somewhere other than the next instruction.
    #[must_use]
    pub fn is_branch(&self) -> bool {
        matches!(
            self.flow_type,
            FlowType::ConditionalBranch
                | FlowType::UnconditionalBranch
                | FlowType::Switch
                | FlowType::Leave
        )
    }

    /// Whether control never falls through to the next instruction.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.flow_type,
            FlowType::UnconditionalBranch
                | FlowType::Return
                | FlowType::Throw
                | FlowType::EndFinally
                | FlowType::Leave
        )
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IL_{:04x}: {}", self.offset, self.mnemonic)?;
        match &self.operand {
            Operand::None => Ok(()),
            Operand::Immediate(value) => write!(f, " {value}"),
            Operand::Target(target) if *target >= 0 => write!(f, " IL_{target:04x}"),
            Operand::Target(target) => write!(f, " IL_-{:04x}", target.unsigned_abs()),
            Operand::String(value) => write!(f, " \"{}\"", value.escape_debug()),
            Operand::Member(member) => write!(f, " {member}"),
            Operand::Token(token) => write!(f, " {token}"),
            Operand::Switch { count } => write!(f, " ({count} targets)"),
        }
    }
}
