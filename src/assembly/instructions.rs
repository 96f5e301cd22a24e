//! The CIL opcode tables (ECMA-335 Partition III).
//!
//! Single-byte opcodes are looked up with [`lookup`], opcodes behind the `0xFE` escape byte
//! with [`lookup_fe`]. Both return `None` for reserved or unassigned codes.

use crate::assembly::{FlowType, InstructionCategory, OperandType};

/// Static description of one opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpCodeInfo {
    /// Mnemonic as written in ILAsm
    pub mnemonic: &'static str,
    /// Operand layout
    pub operand: OperandType,
    /// Control flow behaviour
    pub flow: FlowType,
    /// Functional category
    pub category: InstructionCategory,
}

/// The escape byte introducing a two-byte opcode.
pub const PREFIX_FE: u8 = 0xFE;

const fn op(
    mnemonic: &'static str,
    operand: OperandType,
    flow: FlowType,
    category: InstructionCategory,
) -> Option<OpCodeInfo> {
    Some(OpCodeInfo {
        mnemonic,
        operand,
        flow,
        category,
    })
}

const fn simple(mnemonic: &'static str, category: InstructionCategory) -> Option<OpCodeInfo> {
    op(mnemonic, OperandType::None, FlowType::Sequential, category)
}

const fn with_token(mnemonic: &'static str, category: InstructionCategory) -> Option<OpCodeInfo> {
    op(mnemonic, OperandType::Token, FlowType::Sequential, category)
}

const fn cond_s(mnemonic: &'static str) -> Option<OpCodeInfo> {
    op(
        mnemonic,
        OperandType::ShortBranch,
        FlowType::ConditionalBranch,
        InstructionCategory::ControlFlow,
    )
}

const fn cond(mnemonic: &'static str) -> Option<OpCodeInfo> {
    op(
        mnemonic,
        OperandType::Branch,
        FlowType::ConditionalBranch,
        InstructionCategory::ControlFlow,
    )
}

const fn call(mnemonic: &'static str, category: InstructionCategory) -> Option<OpCodeInfo> {
    op(mnemonic, OperandType::Token, FlowType::Call, category)
}

/// Looks up a single-byte opcode.
#[must_use]
#[allow(clippy::too_many_lines)]
pub const fn lookup(opcode: u8) -> Option<OpCodeInfo> {
    use FlowType as F;
    use InstructionCategory::{
        Arithmetic, BitwiseLogical, ControlFlow, Conversion, LoadStore, Misc, ObjectModel,
    };
    use OperandType as O;

    match opcode {
        0x00 => simple("nop", Misc),
        0x01 => simple("break", Misc),
        0x02 => simple("ldarg.0", LoadStore),
        0x03 => simple("ldarg.1", LoadStore),
        0x04 => simple("ldarg.2", LoadStore),
        0x05 => simple("ldarg.3", LoadStore),
        0x06 => simple("ldloc.0", LoadStore),
        0x07 => simple("ldloc.1", LoadStore),
        0x08 => simple("ldloc.2", LoadStore),
        0x09 => simple("ldloc.3", LoadStore),
        0x0A => simple("stloc.0", LoadStore),
        0x0B => simple("stloc.1", LoadStore),
        0x0C => simple("stloc.2", LoadStore),
        0x0D => simple("stloc.3", LoadStore),
        0x0E => op("ldarg.s", O::UInt8, F::Sequential, LoadStore),
        0x0F => op("ldarga.s", O::UInt8, F::Sequential, LoadStore),
        0x10 => op("starg.s", O::UInt8, F::Sequential, LoadStore),
        0x11 => op("ldloc.s", O::UInt8, F::Sequential, LoadStore),
        0x12 => op("ldloca.s", O::UInt8, F::Sequential, LoadStore),
        0x13 => op("stloc.s", O::UInt8, F::Sequential, LoadStore),
        0x14 => simple("ldnull", LoadStore),
        0x15 => simple("ldc.i4.m1", LoadStore),
        0x16 => simple("ldc.i4.0", LoadStore),
        0x17 => simple("ldc.i4.1", LoadStore),
        0x18 => simple("ldc.i4.2", LoadStore),
        0x19 => simple("ldc.i4.3", LoadStore),
        0x1A => simple("ldc.i4.4", LoadStore),
        0x1B => simple("ldc.i4.5", LoadStore),
        0x1C => simple("ldc.i4.6", LoadStore),
        0x1D => simple("ldc.i4.7", LoadStore),
        0x1E => simple("ldc.i4.8", LoadStore),
        0x1F => op("ldc.i4.s", O::Int8, F::Sequential, LoadStore),
        0x20 => op("ldc.i4", O::Int32, F::Sequential, LoadStore),
        0x21 => op("ldc.i8", O::Int64, F::Sequential, LoadStore),
        0x22 => op("ldc.r4", O::Float32, F::Sequential, LoadStore),
        0x23 => op("ldc.r8", O::Float64, F::Sequential, LoadStore),
        0x25 => simple("dup", Misc),
        0x26 => simple("pop", Misc),
        0x27 => call("jmp", ControlFlow),
        0x28 => call("call", ControlFlow),
        0x29 => call("calli", ControlFlow),
        0x2A => op("ret", O::None, F::Return, ControlFlow),
        0x2B => op("br.s", O::ShortBranch, F::UnconditionalBranch, ControlFlow),
        0x2C => cond_s("brfalse.s"),
        0x2D => cond_s("brtrue.s"),
        0x2E => cond_s("beq.s"),
        0x2F => cond_s("bge.s"),
        0x30 => cond_s("bgt.s"),
        0x31 => cond_s("ble.s"),
        0x32 => cond_s("blt.s"),
        0x33 => cond_s("bne.un.s"),
        0x34 => cond_s("bge.un.s"),
        0x35 => cond_s("bgt.un.s"),
        0x36 => cond_s("ble.un.s"),
        0x37 => cond_s("blt.un.s"),
        0x38 => op("br", O::Branch, F::UnconditionalBranch, ControlFlow),
        0x39 => cond("brfalse"),
        0x3A => cond("brtrue"),
        0x3B => cond("beq"),
        0x3C => cond("bge"),
        0x3D => cond("bgt"),
        0x3E => cond("ble"),
        0x3F => cond("blt"),
        0x40 => cond("bne.un"),
        0x41 => cond("bge.un"),
        0x42 => cond("bgt.un"),
        0x43 => cond("ble.un"),
        0x44 => cond("blt.un"),
        0x45 => op("switch", O::Switch, F::Switch, ControlFlow),
        0x46 => simple("ldind.i1", LoadStore),
        0x47 => simple("ldind.u1", LoadStore),
        0x48 => simple("ldind.i2", LoadStore),
        0x49 => simple("ldind.u2", LoadStore),
        0x4A => simple("ldind.i4", LoadStore),
        0x4B => simple("ldind.u4", LoadStore),
        0x4C => simple("ldind.i8", LoadStore),
        0x4D => simple("ldind.i", LoadStore),
        0x4E => simple("ldind.r4", LoadStore),
        0x4F => simple("ldind.r8", LoadStore),
        0x50 => simple("ldind.ref", LoadStore),
        0x51 => simple("stind.ref", LoadStore),
        0x52 => simple("stind.i1", LoadStore),
        0x53 => simple("stind.i2", LoadStore),
        0x54 => simple("stind.i4", LoadStore),
        0x55 => simple("stind.i8", LoadStore),
        0x56 => simple("stind.r4", LoadStore),
        0x57 => simple("stind.r8", LoadStore),
        0x58 => simple("add", Arithmetic),
        0x59 => simple("sub", Arithmetic),
        0x5A => simple("mul", Arithmetic),
        0x5B => simple("div", Arithmetic),
        0x5C => simple("div.un", Arithmetic),
        0x5D => simple("rem", Arithmetic),
        0x5E => simple("rem.un", Arithmetic),
        0x5F => simple("and", BitwiseLogical),
        0x60 => simple("or", BitwiseLogical),
        0x61 => simple("xor", BitwiseLogical),
        0x62 => simple("shl", BitwiseLogical),
        0x63 => simple("shr", BitwiseLogical),
        0x64 => simple("shr.un", BitwiseLogical),
        0x65 => simple("neg", Arithmetic),
        0x66 => simple("not", BitwiseLogical),
        0x67 => simple("conv.i1", Conversion),
        0x68 => simple("conv.i2", Conversion),
        0x69 => simple("conv.i4", Conversion),
        0x6A => simple("conv.i8", Conversion),
        0x6B => simple("conv.r4", Conversion),
        0x6C => simple("conv.r8", Conversion),
        0x6D => simple("conv.u4", Conversion),
        0x6E => simple("conv.u8", Conversion),
        0x6F => call("callvirt", ControlFlow),
        0x70 => with_token("cpobj", ObjectModel),
        0x71 => with_token("ldobj", ObjectModel),
        0x72 => with_token("ldstr", LoadStore),
        0x73 => call("newobj", ObjectModel),
        0x74 => with_token("castclass", ObjectModel),
        0x75 => with_token("isinst", ObjectModel),
        0x76 => simple("conv.r.un", Conversion),
        0x79 => with_token("unbox", ObjectModel),
        0x7A => op("throw", O::None, F::Throw, ControlFlow),
        0x7B => with_token("ldfld", LoadStore),
        0x7C => with_token("ldflda", LoadStore),
        0x7D => with_token("stfld", LoadStore),
        0x7E => with_token("ldsfld", LoadStore),
        0x7F => with_token("ldsflda", LoadStore),
        0x80 => with_token("stsfld", LoadStore),
        0x81 => with_token("stobj", ObjectModel),
        0x82 => simple("conv.ovf.i1.un", Conversion),
        0x83 => simple("conv.ovf.i2.un", Conversion),
        0x84 => simple("conv.ovf.i4.un", Conversion),
        0x85 => simple("conv.ovf.i8.un", Conversion),
        0x86 => simple("conv.ovf.u1.un", Conversion),
        0x87 => simple("conv.ovf.u2.un", Conversion),
        0x88 => simple("conv.ovf.u4.un", Conversion),
        0x89 => simple("conv.ovf.u8.un", Conversion),
        0x8A => simple("conv.ovf.i.un", Conversion),
        0x8B => simple("conv.ovf.u.un", Conversion),
        0x8C => with_token("box", ObjectModel),
        0x8D => with_token("newarr", ObjectModel),
        0x8E => simple("ldlen", ObjectModel),
        0x8F => with_token("ldelema", LoadStore),
        0x90 => simple("ldelem.i1", LoadStore),
        0x91 => simple("ldelem.u1", LoadStore),
        0x92 => simple("ldelem.i2", LoadStore),
        0x93 => simple("ldelem.u2", LoadStore),
        0x94 => simple("ldelem.i4", LoadStore),
        0x95 => simple("ldelem.u4", LoadStore),
        0x96 => simple("ldelem.i8", LoadStore),
        0x97 => simple("ldelem.i", LoadStore),
        0x98 => simple("ldelem.r4", LoadStore),
        0x99 => simple("ldelem.r8", LoadStore),
        0x9A => simple("ldelem.ref", LoadStore),
        0x9B => simple("stelem.i", LoadStore),
        0x9C => simple("stelem.i1", LoadStore),
        0x9D => simple("stelem.i2", LoadStore),
        0x9E => simple("stelem.i4", LoadStore),
        0x9F => simple("stelem.i8", LoadStore),
        0xA0 => simple("stelem.r4", LoadStore),
        0xA1 => simple("stelem.r8", LoadStore),
        0xA2 => simple("stelem.ref", LoadStore),
        0xA3 => with_token("ldelem", LoadStore),
        0xA4 => with_token("stelem", LoadStore),
        0xA5 => with_token("unbox.any", ObjectModel),
        0xB3 => simple("conv.ovf.i1", Conversion),
        0xB4 => simple("conv.ovf.u1", Conversion),
        0xB5 => simple("conv.ovf.i2", Conversion),
        0xB6 => simple("conv.ovf.u2", Conversion),
        0xB7 => simple("conv.ovf.i4", Conversion),
        0xB8 => simple("conv.ovf.u4", Conversion),
        0xB9 => simple("conv.ovf.i8", Conversion),
        0xBA => simple("conv.ovf.u8", Conversion),
        0xC2 => with_token("refanyval", ObjectModel),
        0xC3 => simple("ckfinite", Arithmetic),
        0xC6 => with_token("mkrefany", ObjectModel),
        0xD0 => with_token("ldtoken", ObjectModel),
        0xD1 => simple("conv.u2", Conversion),
        0xD2 => simple("conv.u1", Conversion),
        0xD3 => simple("conv.i", Conversion),
        0xD4 => simple("conv.ovf.i", Conversion),
        0xD5 => simple("conv.ovf.u", Conversion),
        0xD6 => simple("add.ovf", Arithmetic),
        0xD7 => simple("add.ovf.un", Arithmetic),
        0xD8 => simple("mul.ovf", Arithmetic),
        0xD9 => simple("mul.ovf.un", Arithmetic),
        0xDA => simple("sub.ovf", Arithmetic),
        0xDB => simple("sub.ovf.un", Arithmetic),
        0xDC => op("endfinally", O::None, F::EndFinally, ControlFlow),
        0xDD => op("leave", O::Branch, F::Leave, ControlFlow),
        0xDE => op("leave.s", O::ShortBranch, F::Leave, ControlFlow),
        0xDF => simple("stind.i", LoadStore),
        0xE0 => simple("conv.u", Conversion),
        _ => None,
    }
}

/// Looks up the second byte of a `0xFE`-prefixed opcode.
#[must_use]
pub const fn lookup_fe(opcode: u8) -> Option<OpCodeInfo> {
    use FlowType as F;
    use InstructionCategory::{Comparison, ControlFlow, LoadStore, Misc, ObjectModel, Prefix};
    use OperandType as O;

    match opcode {
        0x00 => simple("arglist", Misc),
        0x01 => simple("ceq", Comparison),
        0x02 => simple("cgt", Comparison),
        0x03 => simple("cgt.un", Comparison),
        0x04 => simple("clt", Comparison),
        0x05 => simple("clt.un", Comparison),
        0x06 => with_token("ldftn", ObjectModel),
        0x07 => with_token("ldvirtftn", ObjectModel),
        0x09 => op("ldarg", O::UInt16, F::Sequential, LoadStore),
        0x0A => op("ldarga", O::UInt16, F::Sequential, LoadStore),
        0x0B => op("starg", O::UInt16, F::Sequential, LoadStore),
        0x0C => op("ldloc", O::UInt16, F::Sequential, LoadStore),
        0x0D => op("ldloca", O::UInt16, F::Sequential, LoadStore),
        0x0E => op("stloc", O::UInt16, F::Sequential, LoadStore),
        0x0F => simple("localloc", Misc),
        0x11 => op("endfilter", O::None, F::EndFinally, ControlFlow),
        0x12 => op("unaligned.", O::UInt8, F::Sequential, Prefix),
        0x13 => simple("volatile.", Prefix),
        0x14 => simple("tail.", Prefix),
        0x15 => with_token("initobj", ObjectModel),
        0x16 => with_token("constrained.", Prefix),
        0x17 => simple("cpblk", Misc),
        0x18 => simple("initblk", Misc),
        0x19 => op("no.", O::UInt8, F::Sequential, Prefix),
        0x1A => op("rethrow", O::None, F::Throw, ControlFlow),
        0x1C => with_token("sizeof", ObjectModel),
        0x1D => simple("refanytype", ObjectModel),
        0x1E => simple("readonly.", Prefix),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn table_sizes() {
        let single = (0..=u8::MAX).filter_map(lookup).count();
        let double = (0..=u8::MAX).filter_map(lookup_fe).count();

        assert_eq!(single, 191);
        assert_eq!(double, 28);
    }

    #[test]
    fn mnemonics_unique() {
        let mut seen = HashSet::new();
        for info in (0..=u8::MAX).filter_map(lookup).chain((0..=u8::MAX).filter_map(lookup_fe)) {
            assert!(seen.insert(info.mnemonic), "duplicate mnemonic {}", info.mnemonic);
        }
    }

    #[test]
    fn reserved_codes() {
        for code in [0x24, 0x77, 0x78, 0xA6, 0xB2, 0xBB, 0xC4, 0xCF, 0xE1, 0xFD, 0xFE, 0xFF] {
            assert!(lookup(code).is_none(), "{code:#04x} should be unassigned");
        }
        for code in [0x08, 0x10, 0x1B, 0x1F, 0xFF] {
            assert!(lookup_fe(code).is_none(), "FE {code:#04x} should be unassigned");
        }
    }

    #[test]
    fn branch_shapes() {
        for code in 0x2B..=0x37 {
            let info = lookup(code).unwrap();
            assert_eq!(info.operand, OperandType::ShortBranch, "{}", info.mnemonic);
        }
        for code in 0x38..=0x44 {
            let info = lookup(code).unwrap();
            assert_eq!(info.operand, OperandType::Branch, "{}", info.mnemonic);
        }
        assert_eq!(lookup(0xDE).unwrap().flow, FlowType::Leave);
        assert_eq!(lookup(0x45).unwrap().operand, OperandType::Switch);
    }

    #[test]
    fn call_family() {
        for (code, name) in [(0x28, "call"), (0x6F, "callvirt"), (0x73, "newobj")] {
            let info = lookup(code).unwrap();
            assert_eq!(info.mnemonic, name);
            assert_eq!(info.flow, FlowType::Call);
            assert_eq!(info.operand, OperandType::Token);
        }
    }
}
