//! Invocation states, the failure taxonomy and the outcome record.

use std::{fmt, time::Duration};

use thiserror::Error;

use crate::{
    invoke::{host::HostException, value::Value},
    metadata::method::MethodId,
};

/// Lifecycle of one invocation.
///
/// `Idle → Validating → {Blocked | Executing} → {Completed | Faulted | Cancelled}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InvocationState {
    /// Not started
    Idle,
    /// Checking whether the method may run at all
    Validating,
    /// Rejected before any execution attempt
    Blocked,
    /// Holding the invocation permit with the console redirected
    Executing,
    /// The call returned a value
    Completed,
    /// Instantiation, conversion or the target code itself failed
    Faulted,
    /// Cancellation was requested before dispatch
    Cancelled,
}

impl InvocationState {
    /// Whether `next` is a legal successor of this state.
    #[must_use]
    pub fn can_transition_to(self, next: InvocationState) -> bool {
        matches!(
            (self, next),
            (InvocationState::Idle, InvocationState::Validating)
                | (
                    InvocationState::Validating,
                    InvocationState::Blocked | InvocationState::Executing
                )
                | (
                    InvocationState::Executing,
                    InvocationState::Completed
                        | InvocationState::Faulted
                        | InvocationState::Cancelled
                )
        )
    }

    /// Whether no further transition is possible.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            InvocationState::Blocked
                | InvocationState::Completed
                | InvocationState::Faulted
                | InvocationState::Cancelled
        )
    }

    pub(crate) fn advance(self, next: InvocationState) -> InvocationState {
        debug_assert!(
            self.can_transition_to(next),
            "illegal invocation transition {self} -> {next}"
        );
        next
    }
}

impl fmt::Display for InvocationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Why a method was blocked before execution.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Open generic method definition
    #[error("open generic method definition")]
    OpenGenericDefinition,

    /// A parameter, return type or generic argument is still a generic parameter
    #[error("signature contains unresolved generic parameters")]
    UnresolvedGenericParameters,

    /// Emitted at runtime, there is no file-backed body to run
    #[error("dynamically generated method")]
    DynamicMethod,

    /// Native, internal call or otherwise lacking a managed body
    #[error("no managed body (native or extern method)")]
    NoManagedBody,
}

/// An exception thrown by target code, after all wrappers were removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaultInfo {
    /// Fully qualified exception type name
    pub type_name: String,
    /// Exception message
    pub message: String,
    /// Stack trace as rendered by the host
    pub stack_trace: String,
}

impl From<HostException> for FaultInfo {
    fn from(exception: HostException) -> Self {
        let original = exception.into_original();
        FaultInfo {
            type_name: original.type_name,
            message: original.message,
            stack_trace: original.stack_trace,
        }
    }
}

/// Why an invocation did not produce a value.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InvocationError {
    /// The method was rejected before any execution attempt.
    #[error("Method cannot be invoked - {0}")]
    Validation(#[from] ValidationError),

    /// A receiver or a constructor argument could not be built.
    #[error("Failed to instantiate {type_name} - {reason}")]
    Instantiation {
        /// The type that could not be built
        type_name: String,
        /// What went wrong
        reason: String,
    },

    /// Explicit textual input could not be converted to the declared parameter type.
    #[error("Failed to convert {input:?} for parameter '{parameter}' to {target_type}")]
    Conversion {
        /// Declared parameter name
        parameter: String,
        /// Declared parameter type
        target_type: String,
        /// The rejected input
        input: String,
    },

    /// The target code threw.
    #[error("{}: {}", .0.type_name, .0.message)]
    Fault(FaultInfo),

    /// Cancellation was requested before dispatch.
    #[error("Invocation cancelled before dispatch")]
    Cancelled,
}

impl InvocationError {
    /// The terminal state an invocation ending in this error is in.
    #[must_use]
    pub fn state(&self) -> InvocationState {
        match self {
            InvocationError::Validation(_) => InvocationState::Blocked,
            InvocationError::Cancelled => InvocationState::Cancelled,
            InvocationError::Instantiation { .. }
            | InvocationError::Conversion { .. }
            | InvocationError::Fault(_) => InvocationState::Faulted,
        }
    }

    pub(crate) fn instantiation(type_name: &str, reason: impl Into<String>) -> Self {
        InvocationError::Instantiation {
            type_name: type_name.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<HostException> for InvocationError {
    fn from(exception: HostException) -> Self {
        InvocationError::Fault(exception.into())
    }
}

/// Console output captured during one invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapturedOutput {
    /// Everything written to stdout
    pub stdout: String,
    /// Everything written to stderr
    pub stderr: String,
    /// Whether either stream exceeded the capture limit and lost output
    pub truncated: bool,
}

/// The result of one invocation. Each outcome is independent of every other.
#[derive(Debug, Clone, PartialEq)]
pub struct InvocationOutcome {
    /// The invoked method
    pub method: MethodId,
    /// The return value ([`Value::Void`] for none) or the classified failure
    pub result: Result<Value, InvocationError>,
    /// Console output captured while the method ran
    pub output: CapturedOutput,
    /// Wall time from validation to restoring the console
    pub elapsed: Duration,
    /// Terminal state
    pub state: InvocationState,
}

impl InvocationOutcome {
    /// Whether the call completed and produced a value.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    /// The return value, if the call completed.
    #[must_use]
    pub fn value(&self) -> Option<&Value> {
        self.result.as_ref().ok()
    }

    /// The failure, if the call did not complete.
    #[must_use]
    pub fn error(&self) -> Option<&InvocationError> {
        self.result.as_ref().err()
    }

    /// Captured stdout.
    #[must_use]
    pub fn stdout(&self) -> &str {
        &self.output.stdout
    }

    /// Captured stderr.
    #[must_use]
    pub fn stderr(&self) -> &str {
        &self.output.stderr
    }
}

impl fmt::Display for InvocationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.result {
            Ok(value) => write!(
                f,
                "{} -> {value} [{:.3} ms]",
                self.method,
                self.elapsed.as_secs_f64() * 1000.0
            ),
            Err(error) => write!(f, "{} {}: {error}", self.method, self.state),
        }
    }
}
