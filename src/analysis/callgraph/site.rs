//! Call sites extracted from decoded instructions.

use std::{fmt, sync::Arc};

use crate::{
    assembly::{Instruction, Operand},
    metadata::{loader::MemberRef, method::MethodDescriptor},
};

/// How a call site transfers control to its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CallKind {
    /// `call` - direct, non-virtual call
    Call,
    /// `callvirt` - virtual dispatch (also used for non-virtual instance calls with a null check)
    VirtualCall,
    /// `newobj` - constructor call allocating a new object
    Construct,
}

impl CallKind {
    /// The call kind of an instruction, if it is `call`, `callvirt` or `newobj`.
    #[must_use]
    pub const fn from_opcode(opcode_key: u16) -> Option<Self> {
        match opcode_key {
            0x28 => Some(CallKind::Call),
            0x6F => Some(CallKind::VirtualCall),
            0x73 => Some(CallKind::Construct),
            _ => None,
        }
    }

    /// Whether dispatch depends on the runtime type of the receiver.
    #[must_use]
    pub const fn is_virtual(&self) -> bool {
        matches!(self, CallKind::VirtualCall)
    }

    /// Whether this call allocates a new object.
    #[must_use]
    pub const fn is_constructor(&self) -> bool {
        matches!(self, CallKind::Construct)
    }
}

impl fmt::Display for CallKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CallKind::Call => "call",
            CallKind::VirtualCall => "callvirt",
            CallKind::Construct => "newobj",
        })
    }
}

/// A call instruction whose target resolved to a method.
#[derive(Debug, Clone, PartialEq)]
pub struct CallSite {
    /// Offset of the call instruction in the caller's body
    pub offset: u32,
    /// Kind of call
    pub kind: CallKind,
    /// The called method
    pub target: Arc<MethodDescriptor>,
}

/// Extracts the resolved call sites of a decoded body, in offset order.
///
/// Calls whose token stayed unresolved have no known target and are skipped.
pub fn call_sites(instructions: &[Instruction]) -> Vec<CallSite> {
    instructions
        .iter()
        .filter_map(|instr| {
            let kind = CallKind::from_opcode(instr.opcode_key())?;
            match &instr.operand {
                Operand::Member(MemberRef::Method(target)) => Some(CallSite {
                    offset: instr.offset,
                    kind,
                    target: Arc::clone(target),
                }),
                other => {
                    log::trace!("{kind} at IL_{:04x} has no resolved target: {other:?}", instr.offset);
                    None
                }
            }
        })
        .collect()
}
