// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![deny(unsafe_code)]

//! # dotprobe
//!
//! Method-level inspection and controlled invocation for .NET (ECMA-335) binaries.
//!
//! `dotprobe` is built for reverse engineers looking at possibly hostile managed code. It
//! lets you take a binary apart one method at a time and, when you decide to, run a single
//! method under observation:
//!
//! - **Bytecode decoding** - turn a raw CIL body into structured instructions without ever
//!   executing or panicking on it
//! - **Call graphs** - map which methods call which, across one binary or outward from a
//!   single method up to a depth bound
//! - **Input synthesis** - fabricate type-valid arguments and receivers from text input,
//!   declared defaults or a fixed default table
//! - **Invocation boundary** - the single, serialized place where target code runs, with
//!   console capture and a classified outcome
//!
//! Loading binaries and executing managed code are left to the embedder. A loader hands its
//! parsed metadata over through [`metadata::loader::AssemblyView`], a runtime executes calls
//! through [`invoke::host::HostRuntime`].
//!
//! ## Quick Start
//!
//! ```rust
//! use dotprobe::prelude::*;
//!
//! let mut assembly = InMemoryAssembly::new("Acme");
//! assembly.add_string(Token::new(0x7000_0001), "hello");
//! let hello = assembly.add_method(
//!     MethodDescriptor::new("Acme", "Acme.Program", "Hello").with_token(Token::new(0x0600_0001)),
//!     // ldstr "hello", pop, ret
//!     vec![0x72, 0x01, 0x00, 0x00, 0x70, 0x26, 0x2A],
//! );
//!
//! let body = assembly.method_body(&hello).unwrap_or_default();
//! let decoded = decode_body(&body, &assembly);
//! assert!(decoded.is_complete());
//! assert_eq!(decoded.instructions[0].operand, Operand::String("hello".into()));
//!
//! let graph = CallGraph::build_assembly(&assembly);
//! assert_eq!(graph.node_count(), 1);
//! ```
//!
//! ## Safety Model
//!
//! Decoding and call graph construction are read-only and never run target code; they can
//! be used on any input. Invocation is not a sandbox: it runs the target method in-process.
//! Infinite loops, stack overflows and native crashes inside the target take the whole
//! process down and cannot be reported.
//!
//! ## Logging
//!
//! The crate reports through the [`log`] facade and never installs a logger itself.
//! Truncated bodies are logged at `warn`, invocation outcomes at `info`/`warn` (see
//! [`invoke::InvocationConfig::log_outcomes`]), everything else at `debug` or `trace`.
//!
//! ## Fuzzing
//!
//! ```bash
//! cargo +nightly fuzz run decode --release
//! ```

#[macro_use]
pub(crate) mod error;
pub(crate) mod file;

/// Convenient re-exports of the most commonly used types and traits.
///
/// ```rust
/// use dotprobe::prelude::*;
///
/// let decoded = decode_body(&[0x00, 0x2A], &());
/// assert_eq!(decoded.instructions.len(), 2);
/// ```
pub mod prelude;

/// CIL instruction decoding based on ECMA-335.
///
/// # Key Types
///
/// - [`assembly::Instruction`] - a decoded instruction
/// - [`assembly::Operand`] - its resolved operand
/// - [`assembly::DecodedBody`] - a whole body, with a record of where decoding stopped
///
/// # Examples
///
/// ```rust
/// use dotprobe::{assembly::decode_instruction, Parser};
///
/// let bytecode = [0x2A]; // ret
/// let mut parser = Parser::new(&bytecode);
/// let instruction = decode_instruction(&mut parser, &())?;
/// assert_eq!(instruction.mnemonic, "ret");
/// # Ok::<(), dotprobe::Error>(())
/// ```
pub mod assembly;

/// Call graph construction and the decompiler seam.
pub mod analysis;

/// Method descriptors, method bodies, tokens, declared types and the loader seam.
pub mod metadata;

/// Parameter and instance synthesis and the invocation boundary.
pub mod invoke;

/// Generic directed graph and Graphviz helpers.
pub mod utils;

/// `dotprobe` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type is always [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// `dotprobe` Error type
///
/// The error type of decoding, method body parsing, metadata lookup and graph construction.
/// Invocation failures are classified separately in [`invoke::InvocationError`].
///
/// # Examples
///
/// ```rust
/// use dotprobe::{metadata::method::MethodBody, Error};
///
/// match MethodBody::parse(&[]) {
///     Ok(body) => println!("{} bytes of code", body.size_code),
///     Err(Error::OutOfBounds { .. }) | Err(Error::Empty) => println!("no header"),
///     Err(e) => println!("Error: {}", e),
/// }
/// ```
pub use error::Error;

/// Cursor used for decoding CIL bytecode.
///
/// # Example
///
/// ```rust
/// use dotprobe::{assembly::decode_instruction, Parser};
/// let code = [0x2A]; // ret
/// let mut parser = Parser::new(&code);
/// let instr = decode_instruction(&mut parser, &())?;
/// assert_eq!(instr.mnemonic, "ret");
/// assert!(!parser.has_more_data());
/// # Ok::<(), dotprobe::Error>(())
/// ```
pub use file::parser::Parser;
