//! CIL instruction decoding.
//!
//! This module turns raw method body bytes into structured [`Instruction`]s. Decoding is a
//! pure function of the bytes and the loader's token resolution: it has no side effects,
//! keeps no global cache and can run on many bodies in parallel.
//!
//! # Key Components
//!
//! - [`decode_body`] - Decode a whole body into a [`DecodedBody`]
//! - [`decode_instruction`] - Decode a single instruction at a [`crate::Parser`] cursor
//! - [`disassemble`] - Render a decoded body as an ILAsm-like listing
//! - [`lookup`] / [`lookup_fe`] - The single and two-byte opcode tables
//!
//! # Examples
//!
//! ```rust
//! use dotprobe::assembly::{decode_body, disassemble};
//!
//! let decoded = decode_body(&[0x16, 0x2A], &());
//! assert_eq!(disassemble(&decoded), "IL_0000: ldc.i4.0\nIL_0001: ret");
//! ```

mod decoder;
mod instruction;
mod instructions;

pub use decoder::{
    decode_body, decode_instruction, disassemble, DecodedBody, Truncation, TruncationReason,
};
pub use instruction::{
    FlowType, Immediate, Instruction, InstructionCategory, Operand, OperandType,
};
pub use instructions::{lookup, lookup_fe, OpCodeInfo, PREFIX_FE};
