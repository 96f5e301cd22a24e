//! # dotprobe Prelude
//!
//! The most commonly used types and traits of the crate, for glob import.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for decoding and analysis
pub use crate::Error;

/// The result type used throughout dotprobe
pub use crate::Result;

/// Cursor over raw bytecode
pub use crate::Parser;

// ================================================================================================
// Metadata and Loader Seam
// ================================================================================================

/// Metadata token type for referencing table entries
pub use crate::metadata::token::Token;

/// Method identity, kind and parameters
pub use crate::metadata::method::{
    GenericState, MethodBody, MethodDescriptor, MethodId, MethodKind, ParameterSpec,
};

/// Declared types
pub use crate::metadata::typesystem::{
    ConstructorDescriptor, Constant, PrimitiveKind, TypeDescriptor, TypeKind, TypeSig,
};

/// Loader traits and the in-memory loader
pub use crate::metadata::loader::{
    AssemblyView, InMemoryAssembly, MemberRef, TokenResolver, TypeResolver,
};

// ================================================================================================
// Decoding
// ================================================================================================

/// Bytecode decoding
pub use crate::assembly::{
    decode_body, decode_instruction, disassemble, DecodedBody, FlowType, Instruction, Operand,
    Truncation, TruncationReason,
};

// ================================================================================================
// Analysis
// ================================================================================================

/// Call graphs
pub use crate::analysis::{CallGraph, CallGraphEdge, CallGraphNode, CallGraphStats, CallKind};

/// Decompiler seam
pub use crate::analysis::{decompile_or_comment, Decompiler};

// ================================================================================================
// Invocation
// ================================================================================================

/// The invocation boundary and its results
pub use crate::invoke::{
    CancellationToken, InvocationBoundary, InvocationConfig, InvocationError, InvocationOutcome,
    InvocationRequest, InvocationState, ValidationError, Value,
};

/// Host runtime seam
pub use crate::invoke::host::{HostException, HostRuntime};
