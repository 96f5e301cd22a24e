//! Raw method flag words (ECMA-335 II.23.1.10 and II.23.1.11) and method header flags.
//!
//! Loaders usually hold the raw `MethodAttributes` / `MethodImplAttributes` words from the
//! `MethodDef` table. [`MethodKind::from_flags`](crate::metadata::method::MethodKind::from_flags)
//! turns them into the closed set of kinds the invocation boundary validates against.

use bitflags::bitflags;

/// Bitmask for `CODE_TYPE` extraction from implementation flags
pub const METHOD_IMPL_CODE_TYPE_MASK: u32 = 0x0003;

bitflags! {
    /// `MethodAttributes` bits relevant to inspection and invocation.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MethodAttributes: u32 {
        /// Accessibility: public
        const PUBLIC = 0x0006;
        /// Defined on type, not per instance
        const STATIC = 0x0010;
        /// Cannot be overridden
        const FINAL = 0x0020;
        /// Participates in virtual dispatch
        const VIRTUAL = 0x0040;
        /// Method is abstract and has no body
        const ABSTRACT = 0x0400;
        /// Implementation is forwarded through P/Invoke
        const PINVOKE_IMPL = 0x2000;
        /// Name has special meaning (`.ctor`, property accessors, ...)
        const SPECIAL_NAME = 0x0800;
        /// Runtime should check the name encoding
        const RT_SPECIAL_NAME = 0x1000;
    }
}

bitflags! {
    /// `MethodImplAttributes` bits relevant to deciding whether a managed body exists.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MethodImplAttributes: u32 {
        /// Implementation is native code
        const NATIVE = 0x0001;
        /// Implementation is OPTIL
        const OPTIL = 0x0002;
        /// Implementation is provided by the runtime
        const RUNTIME = 0x0003;
        /// Implementation is unmanaged
        const UNMANAGED = 0x0004;
        /// Implemented inside the runtime itself
        const INTERNAL_CALL = 0x1000;
    }
}

impl MethodImplAttributes {
    /// Whether the code-type bits say "IL".
    #[must_use]
    pub fn is_il(&self) -> bool {
        self.bits() & METHOD_IMPL_CODE_TYPE_MASK == 0
    }
}

bitflags! {
    /// Flags in the first bytes of a method header (II.25.4.4).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MethodBodyFlags: u16 {
        /// Tiny header (one byte, code size in the upper six bits)
        const TINY_FORMAT = 0x2;
        /// Fat header (twelve bytes)
        const FAT_FORMAT = 0x3;
        /// Extra data sections follow the code
        const MORE_SECTS = 0x8;
        /// Call default constructor on all locals
        const INIT_LOCALS = 0x10;
    }
}

bitflags! {
    /// Flags of an extra data section following the code (II.25.4.5).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SectionFlags: u8 {
        /// Exception handling table
        const EHTABLE = 0x1;
        /// Optional IL table (reserved)
        const OPT_ILTABLE = 0x2;
        /// Section uses the fat layout
        const FAT_FORMAT = 0x40;
        /// Another section follows this one
        const MORE_SECTS = 0x80;
    }
}
