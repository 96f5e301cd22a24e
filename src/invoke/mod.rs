//! Controlled invocation of individual methods.
//!
//! Everything that executes target code goes through [`InvocationBoundary`]. The remaining
//! modules supply what the boundary needs:
//!
//! - [`params`] - argument values for declared parameters, from text or defaults
//! - [`instance`] - receivers and constructor arguments, bounded in depth
//! - [`console`] - the process console streams, the invocation permit and output capture
//! - [`host`] - the seam to the runtime that actually runs managed code
//! - [`outcome`] - states, the failure taxonomy and the outcome record
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use dotprobe::{
//!     invoke::{
//!         host::{HostException, HostRuntime},
//!         AwaitableHandle, CancellationToken, InvocationBoundary, InvocationRequest,
//!         InvocationState, Value,
//!     },
//!     metadata::{
//!         loader::InMemoryAssembly,
//!         method::{MethodDescriptor, ParameterSpec},
//!         typesystem::{ConstructorDescriptor, TypeDescriptor, TypeSig},
//!     },
//! };
//!
//! /// Doubles its first argument.
//! struct Doubler;
//!
//! impl HostRuntime for Doubler {
//!     fn invoke(
//!         &self,
//!         _: &MethodDescriptor,
//!         _: Option<&Value>,
//!         arguments: &[Value],
//!     ) -> Result<Value, HostException> {
//!         match arguments.first() {
//!             Some(Value::I4(v)) => Ok(Value::I4(v * 2)),
//!             _ => Err(HostException::new("System.ArgumentException", "expected an int")),
//!         }
//!     }
//!
//!     fn await_result(&self, _: &AwaitableHandle) -> Result<Value, HostException> {
//!         Ok(Value::Void)
//!     }
//!
//!     fn construct(
//!         &self,
//!         _: &TypeDescriptor,
//!         _: &ConstructorDescriptor,
//!         _: &[Value],
//!     ) -> Result<Value, HostException> {
//!         Err(HostException::new("System.NotSupportedException", "no objects"))
//!     }
//!
//!     fn default_value_type(&self, _: &TypeDescriptor) -> Option<Value> {
//!         None
//!     }
//! }
//!
//! let boundary = InvocationBoundary::new(Arc::new(Doubler), Arc::new(InMemoryAssembly::new("Acme")));
//! let method = MethodDescriptor::new("Acme", "Acme.Math", "Double")
//!     .with_parameter(ParameterSpec::new("x", TypeSig::parse("System.Int32")));
//!
//! let request = InvocationRequest::new(Arc::new(method)).with_inputs([Some("21")]);
//! let outcome = boundary.invoke(&request, &CancellationToken::new());
//!
//! assert_eq!(outcome.state, InvocationState::Completed);
//! assert_eq!(outcome.value(), Some(&Value::I4(42)));
//! ```

mod boundary;
mod cancel;
mod config;
pub mod console;
pub mod host;
pub mod instance;
pub mod outcome;
pub mod params;
mod value;

pub use boundary::{InvocationBoundary, InvocationRequest};
pub use cancel::CancellationToken;
pub use config::InvocationConfig;
pub use instance::{InstanceSynthesizer, MAX_CONSTRUCTION_DEPTH};
pub use outcome::{
    CapturedOutput, FaultInfo, InvocationError, InvocationOutcome, InvocationState,
    ValidationError,
};
pub use params::ParameterSynthesizer;
pub use value::{AwaitableHandle, ObjectHandle, Value};
