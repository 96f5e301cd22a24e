//! Methods: identity, implementation kind and on-disk bodies.
//!
//! # Key Types
//! - [`MethodDescriptor`] / [`MethodId`]: structural identity of a method
//! - [`MethodKind`], [`GenericState`]: closed classifications used by invocation validation
//! - [`ParameterSpec`]: a declared parameter with its optional default
//! - [`MethodBody`], [`ExceptionHandler`]: method header and exception clauses
//! - [`MethodAttributes`], [`MethodImplAttributes`], [`MethodBodyFlags`], [`SectionFlags`]: raw flags

mod body;
mod descriptor;
mod exceptions;
mod flags;

pub use body::MethodBody;
pub use descriptor::{GenericState, MethodDescriptor, MethodId, MethodKind, ParameterSpec};
pub use exceptions::{ExceptionHandler, ExceptionHandlerFlags};
pub use flags::{
    MethodAttributes, MethodBodyFlags, MethodImplAttributes, SectionFlags,
    METHOD_IMPL_CODE_TYPE_MASK,
};
