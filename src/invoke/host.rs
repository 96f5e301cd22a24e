//! Seam to the runtime that actually executes managed code.
//!
//! This crate never runs CIL itself. A [`HostRuntime`] implementation dispatches calls,
//! runs constructors and awaits asynchronous results on its behalf. Exceptions thrown by
//! target code come back as [`HostException`]s, possibly wrapped the way reflection and
//! task machinery wrap them.

use crate::{
    invoke::value::{AwaitableHandle, Value},
    metadata::{
        method::MethodDescriptor,
        typesystem::{ConstructorDescriptor, TypeDescriptor},
    },
};

/// Which wrapping an exception represents, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExceptionWrapper {
    /// An exception thrown by target code
    None,
    /// The wrapper added by reflective invocation around the real exception
    Invocation,
    /// The wrapper added by task machinery around the exceptions of an awaited operation
    Aggregate,
}

/// An exception raised inside the host runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostException {
    /// Whether this is a wrapper around other exceptions
    pub wrapper: ExceptionWrapper,
    /// Fully qualified exception type name
    pub type_name: String,
    /// Exception message
    pub message: String,
    /// Stack trace as rendered by the host
    pub stack_trace: String,
    /// Inner exceptions, in order
    pub inner: Vec<HostException>,
}

impl HostException {
    /// An exception thrown by target code.
    #[must_use]
    pub fn new(type_name: &str, message: &str) -> Self {
        HostException {
            wrapper: ExceptionWrapper::None,
            type_name: type_name.to_string(),
            message: message.to_string(),
            stack_trace: String::new(),
            inner: Vec::new(),
        }
    }

    /// Wraps `inner` the way reflective invocation does.
    #[must_use]
    pub fn invocation_wrapper(inner: HostException) -> Self {
        HostException {
            wrapper: ExceptionWrapper::Invocation,
            inner: vec![inner],
            ..Self::new(
                "System.Reflection.TargetInvocationException",
                "Exception has been thrown by the target of an invocation.",
            )
        }
    }

    /// Wraps `inner` the way task machinery does.
    #[must_use]
    pub fn aggregate(inner: Vec<HostException>) -> Self {
        HostException {
            wrapper: ExceptionWrapper::Aggregate,
            inner,
            ..Self::new("System.AggregateException", "One or more errors occurred.")
        }
    }

    /// Attaches a stack trace.
    #[must_use]
    pub fn with_stack_trace(mut self, stack_trace: &str) -> Self {
        self.stack_trace = stack_trace.to_string();
        self
    }

    /// Peels off every wrapper layer and returns the exception target code threw.
    ///
    /// An aggregate with several inner exceptions yields its first one. A wrapper without any
    /// inner exception is returned as is.
    ///
    /// ```rust
    /// use dotprobe::invoke::host::HostException;
    ///
    /// let thrown = HostException::new("System.InvalidOperationException", "boom");
    /// let wrapped = HostException::invocation_wrapper(HostException::aggregate(vec![thrown.clone()]));
    /// assert_eq!(wrapped.into_original(), thrown);
    /// ```
    #[must_use]
    pub fn into_original(mut self) -> HostException {
        while self.wrapper != ExceptionWrapper::None && !self.inner.is_empty() {
            self = self.inner.swap_remove(0);
        }
        self
    }
}

/// The execution engine running the target binary.
///
/// Every method is called with the invocation permit held, so implementations never see two
/// invocations at the same time. Target code writes its console output through
/// [`crate::invoke::console::stdout`] and [`crate::invoke::console::stderr`].
pub trait HostRuntime: Send + Sync {
    /// Calls `method` with an optional receiver and the given arguments.
    ///
    /// # Errors
    /// The exception thrown by the call, wrapped however the host wraps reflective calls.
    fn invoke(
        &self,
        method: &MethodDescriptor,
        receiver: Option<&Value>,
        arguments: &[Value],
    ) -> Result<Value, HostException>;

    /// Blocks until `awaitable` completes and returns its result, or [`Value::Void`] if it has
    /// none.
    ///
    /// # Errors
    /// The exception the awaited operation faulted with.
    fn await_result(&self, awaitable: &AwaitableHandle) -> Result<Value, HostException>;

    /// Runs `constructor` of `ty` with the given arguments and returns the new instance.
    ///
    /// # Errors
    /// The exception the constructor threw.
    fn construct(
        &self,
        ty: &TypeDescriptor,
        constructor: &ConstructorDescriptor,
        arguments: &[Value],
    ) -> Result<Value, HostException>;

    /// The default (all-zero) instance of a value type, if the host can create one.
    fn default_value_type(&self, ty: &TypeDescriptor) -> Option<Value>;
}
