//! CIL bytecode decoding.
//!
//! [`decode_body`] turns the code bytes of one method into an ordered list of
//! [`Instruction`]s. It never executes anything and never panics: malformed trailing data
//! ends decoding and is reported as a [`Truncation`] next to everything that decoded fine
//! before it. [`decode_instruction`] decodes a single instruction at the parser's cursor.
//!
//! Token operands are resolved through a [`TokenResolver`]. A failing lookup degrades that
//! one operand to [`Operand::Token`]; the rest of the body still decodes.
//!
//! # Examples
//!
//! ```rust
//! use dotprobe::assembly::{decode_body, Operand};
//!
//! // ldarg.0, brtrue.s +1, nop, ret
//! let decoded = decode_body(&[0x02, 0x2D, 0x01, 0x00, 0x2A], &());
//! assert!(decoded.is_complete());
//! assert_eq!(decoded.instructions.len(), 4);
//! assert_eq!(decoded.instructions[1].operand, Operand::Target(4));
//! ```

use std::fmt;

use crate::{
    assembly::{
        instructions::{lookup, lookup_fe, OpCodeInfo, PREFIX_FE},
        Immediate, Instruction, Operand, OperandType,
    },
    file::parser::Parser,
    metadata::{
        loader::TokenResolver,
        token::{Token, TokenKind},
    },
    Result,
};

/// Why decoding stopped before the end of the body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TruncationReason {
    /// The opcode (16-bit key) is reserved or unassigned
    InvalidOpcode(u16),
    /// The cursor was already at the end of the body
    EndOfBody,
    /// A `0xFE` escape byte was the last byte of the body
    DanglingPrefix,
    /// The operand of the named instruction extends past the end of the body
    TruncatedOperand(&'static str),
    /// The body is too large to address with 32-bit offsets
    BodyTooLarge,
}

impl fmt::Display for TruncationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TruncationReason::InvalidOpcode(key) if *key > 0xFF => {
                write!(f, "invalid opcode FE {:02X}", key & 0xFF)
            }
            TruncationReason::InvalidOpcode(key) => write!(f, "invalid opcode {key:02X}"),
            TruncationReason::EndOfBody => f.write_str("end of body"),
            TruncationReason::DanglingPrefix => f.write_str("dangling FE prefix"),
            TruncationReason::TruncatedOperand(mnemonic) => {
                write!(f, "truncated operand of {mnemonic}")
            }
            TruncationReason::BodyTooLarge => f.write_str("body exceeds 32-bit offsets"),
        }
    }
}

/// Where and why decoding stopped early.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Truncation {
    /// Offset of the first byte that could not be decoded
    pub offset: u32,
    /// What was wrong with it
    pub reason: TruncationReason,
}

/// The result of decoding one method body.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedBody {
    /// Instructions in offset order
    pub instructions: Vec<Instruction>,
    /// Set if the body could not be consumed completely
    pub truncation: Option<Truncation>,
}

impl DecodedBody {
    /// Whether every byte of the body was consumed.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.truncation.is_none()
    }

    /// The instructions, if the body was consumed completely.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] describing the truncation otherwise.
    pub fn into_complete(self) -> Result<Vec<Instruction>> {
        match self.truncation {
            None => Ok(self.instructions),
            Some(truncation) => Err(malformed_error!(
                "Decoding stopped at IL_{:04x}: {}",
                truncation.offset,
                truncation.reason
            )),
        }
    }
}

/// Decodes a complete method body.
///
/// `body` is the code only, without the method header (see
/// [`crate::metadata::method::MethodBody::code`]). Offsets in the result are relative to
/// its start.
pub fn decode_body<R: TokenResolver + ?Sized>(body: &[u8], resolver: &R) -> DecodedBody {
    let mut instructions = Vec::new();

    if u32::try_from(body.len()).is_err() {
        return DecodedBody {
            instructions,
            truncation: Some(Truncation {
                offset: 0,
                reason: TruncationReason::BodyTooLarge,
            }),
        };
    }

    let mut parser = Parser::new(body);
    while parser.has_more_data() {
        #[allow(clippy::cast_possible_truncation)]
        let offset = parser.pos() as u32;

        match decode_at(&mut parser, resolver) {
            Ok(instruction) => instructions.push(instruction),
            Err(reason) => {
                log::debug!("decoding stopped at IL_{offset:04x}: {reason}");
                return DecodedBody {
                    instructions,
                    truncation: Some(Truncation { offset, reason }),
                };
            }
        }
    }

    DecodedBody {
        instructions,
        truncation: None,
    }
}

/// Decodes the instruction at the parser's cursor and advances past it.
///
/// # Errors
/// Returns [`crate::Error::Malformed`] for reserved opcodes and truncated operands. The
/// parser position is unspecified afterwards.
pub fn decode_instruction<R: TokenResolver + ?Sized>(
    parser: &mut Parser,
    resolver: &R,
) -> Result<Instruction> {
    let offset = parser.pos();
    decode_at(parser, resolver)
        .map_err(|reason| malformed_error!("IL_{:04x}: {}", offset, reason))
}

/// Renders a decoded body as one instruction per line.
#[must_use]
pub fn disassemble(decoded: &DecodedBody) -> String {
    let mut text = decoded
        .instructions
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n");

    if let Some(truncation) = &decoded.truncation {
        if !text.is_empty() {
            text.push('\n');
        }
        text.push_str(&format!(
            "// decoding stopped at IL_{:04x}: {}",
            truncation.offset, truncation.reason
        ));
    }
    text
}

fn decode_at<R: TokenResolver + ?Sized>(
    parser: &mut Parser,
    resolver: &R,
) -> std::result::Result<Instruction, TruncationReason> {
    let start = parser.pos();
    let first = parser
        .read_le::<u8>()
        .map_err(|_| TruncationReason::EndOfBody)?;

    let (info, prefix, opcode) = if first == PREFIX_FE {
        let second = parser
            .read_le::<u8>()
            .map_err(|_| TruncationReason::DanglingPrefix)?;
        let info = lookup_fe(second)
            .ok_or(TruncationReason::InvalidOpcode(0xFE00 | u16::from(second)))?;
        (info, PREFIX_FE, second)
    } else {
        let info = lookup(first).ok_or(TruncationReason::InvalidOpcode(u16::from(first)))?;
        (info, 0, first)
    };

    let operand = decode_operand(parser, &info, resolver)
        .map_err(|_| TruncationReason::TruncatedOperand(info.mnemonic))?;

    #[allow(clippy::cast_possible_truncation)]
    let (offset, size) = (start as u32, (parser.pos() - start) as u32);

    Ok(Instruction {
        offset,
        size,
        prefix,
        opcode,
        mnemonic: info.mnemonic,
        category: info.category,
        flow_type: info.flow,
        operand,
    })
}

fn decode_operand<R: TokenResolver + ?Sized>(
    parser: &mut Parser,
    info: &OpCodeInfo,
    resolver: &R,
) -> Result<Operand> {
    let operand = match info.operand {
        OperandType::None => Operand::None,
        OperandType::Int8 => Operand::Immediate(Immediate::Int8(parser.read_le::<i8>()?)),
        OperandType::UInt8 => Operand::Immediate(Immediate::UInt8(parser.read_le::<u8>()?)),
        OperandType::UInt16 => Operand::Immediate(Immediate::UInt16(parser.read_le::<u16>()?)),
        OperandType::Int32 => Operand::Immediate(Immediate::Int32(parser.read_le::<i32>()?)),
        OperandType::Int64 => Operand::Immediate(Immediate::Int64(parser.read_le::<i64>()?)),
        OperandType::Float32 => Operand::Immediate(Immediate::Float32(parser.read_le::<f32>()?)),
        OperandType::Float64 => Operand::Immediate(Immediate::Float64(parser.read_le::<f64>()?)),
        OperandType::ShortBranch => {
            let displacement = i64::from(parser.read_le::<i8>()?);
            Operand::Target(parser.pos() as i64 + displacement)
        }
        OperandType::Branch => {
            let displacement = i64::from(parser.read_le::<i32>()?);
            Operand::Target(parser.pos() as i64 + displacement)
        }
        OperandType::Token => resolve_token(parser.read_token()?, resolver),
        OperandType::Switch => {
            let count = parser.read_le::<u32>()?;
            let table = (count as usize)
                .checked_mul(4)
                .ok_or_else(|| out_of_bounds_error!())?;
            parser.advance_by(table)?;
            Operand::Switch { count }
        }
    };

    Ok(operand)
}

fn resolve_token<R: TokenResolver + ?Sized>(token: Token, resolver: &R) -> Operand {
    let resolved = if token.kind() == TokenKind::UserString {
        resolver.resolve_string(token).map(Operand::String)
    } else {
        resolver.resolve_member(token).map(Operand::Member)
    };

    match resolved {
        Ok(operand) => operand,
        Err(error) => {
            log::trace!("keeping {token} opaque: {error}");
            Operand::Token(token)
        }
    }
}
