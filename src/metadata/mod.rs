//! Metadata model: tokens, methods, declared types and the loader seam.
//!
//! This crate does not parse PE files or metadata tables. It works on what a loader has
//! already extracted and exposes through [`loader::AssemblyView`]; the types in here are the
//! shared vocabulary between that loader, the decoder, the call graph and the invocation side.

pub mod loader;
pub mod method;
pub mod token;
pub mod typesystem;
