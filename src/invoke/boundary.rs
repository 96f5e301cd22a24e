//! The one place where target code is executed.
//!
//! [`InvocationBoundary::invoke`] runs a single method through a fixed sequence:
//!
//! 1. **Validating**: [`InvocationBoundary::validate`] rejects methods that must never run.
//!    Rejected methods end `Blocked` without touching the host.
//! 2. **Executing**: take the process-wide [`InvocationPermit`], check cancellation, redirect
//!    the console into capture buffers, synthesize arguments and the receiver, check
//!    cancellation again, dispatch, await an awaitable result.
//! 3. Restore the console, release the permit and return an [`InvocationOutcome`].
//!
//! Host exceptions are unwrapped to the exception the target code threw before they are
//! classified. A panicking host is reported as a fault as well. Failures that take down the
//! process (stack or memory exhaustion, native crashes) cannot be reported by anything.

use std::{
    any::Any,
    panic::{self, AssertUnwindSafe},
    sync::Arc,
    thread::{self, JoinHandle},
    time::Instant,
};

use crate::{
    invoke::{
        cancel::CancellationToken,
        config::InvocationConfig,
        console::{InvocationPermit, OutputRedirect},
        host::HostRuntime,
        instance::InstanceSynthesizer,
        outcome::{
            CapturedOutput, FaultInfo, InvocationError, InvocationOutcome, InvocationState,
            ValidationError,
        },
        params::ParameterSynthesizer,
        value::Value,
    },
    metadata::{
        loader::TypeResolver,
        method::{GenericState, MethodDescriptor, MethodKind},
        typesystem::TypeSig,
    },
    Result,
};

/// One method to invoke, with optional textual inputs for its parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct InvocationRequest {
    /// The method
    pub method: Arc<MethodDescriptor>,
    /// Inputs by parameter position; `None` or a missing entry means "use the default"
    pub inputs: Vec<Option<String>>,
}

impl InvocationRequest {
    /// A request using defaults for every parameter.
    #[must_use]
    pub fn new(method: Arc<MethodDescriptor>) -> Self {
        InvocationRequest {
            method,
            inputs: Vec::new(),
        }
    }

    /// Sets the textual inputs, by parameter position.
    #[must_use]
    pub fn with_inputs<I, S>(mut self, inputs: I) -> Self
    where
        I: IntoIterator<Item = Option<S>>,
        S: Into<String>,
    {
        self.inputs = inputs.into_iter().map(|i| i.map(Into::into)).collect();
        self
    }
}

/// Executes methods through a [`HostRuntime`].
///
/// Cloning is cheap; clones share the host and the type resolver.
#[derive(Clone)]
pub struct InvocationBoundary {
    host: Arc<dyn HostRuntime>,
    types: Arc<dyn TypeResolver>,
    config: InvocationConfig,
}

impl InvocationBoundary {
    /// A boundary with the default configuration.
    #[must_use]
    pub fn new(host: Arc<dyn HostRuntime>, types: Arc<dyn TypeResolver>) -> Self {
        InvocationBoundary {
            host,
            types,
            config: InvocationConfig::default(),
        }
    }

    /// Replaces the configuration.
    #[must_use]
    pub fn with_config(mut self, config: InvocationConfig) -> Self {
        self.config = config;
        self
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &InvocationConfig {
        &self.config
    }

    /// Checks whether `method` may be invoked at all.
    ///
    /// # Errors
    /// The reason the method is blocked: open generic definitions, unresolved generic
    /// parameters, runtime-generated methods, and methods without a managed body that are
    /// neither abstract nor interface members.
    pub fn validate(method: &MethodDescriptor) -> std::result::Result<(), ValidationError> {
        if matches!(method.generics, GenericState::OpenDefinition { .. }) {
            return Err(ValidationError::OpenGenericDefinition);
        }
        if method.has_unresolved_generics() {
            return Err(ValidationError::UnresolvedGenericParameters);
        }

        match method.kind {
            MethodKind::Dynamic => Err(ValidationError::DynamicMethod),
            MethodKind::Native => Err(ValidationError::NoManagedBody),
            MethodKind::Managed if !method.has_body => Err(ValidationError::NoManagedBody),
            MethodKind::Managed | MethodKind::Abstract | MethodKind::InterfaceMember => Ok(()),
        }
    }

    /// Invokes one method and reports what happened.
    ///
    /// Waits for the invocation permit if another invocation is running. The console streams
    /// are back to their previous identity when this returns, whatever the outcome.
    pub fn invoke(
        &self,
        request: &InvocationRequest,
        cancel: &CancellationToken,
    ) -> InvocationOutcome {
        let started = Instant::now();
        let method = &request.method;
        let state = InvocationState::Idle.advance(InvocationState::Validating);

        if let Err(reason) = Self::validate(method) {
            let state = state.advance(InvocationState::Blocked);
            return self.finish(
                method,
                Err(reason.into()),
                CapturedOutput::default(),
                started,
                state,
            );
        }

        let state = state.advance(InvocationState::Executing);
        let permit = InvocationPermit::acquire();
        if cancel.is_cancelled() {
            drop(permit);
            return self.finish(
                method,
                Err(InvocationError::Cancelled),
                CapturedOutput::default(),
                started,
                state.advance(InvocationState::Cancelled),
            );
        }

        let redirect = OutputRedirect::install(&permit, self.config.capture_limit);
        let result = panic::catch_unwind(AssertUnwindSafe(|| self.execute(request, cancel)))
            .unwrap_or_else(|payload| Err(InvocationError::Fault(panic_fault(payload.as_ref()))));
        let output = redirect.finish();
        drop(permit);

        let next = match &result {
            Ok(_) => InvocationState::Completed,
            Err(error) => error.state(),
        };
        self.finish(method, result, output, started, state.advance(next))
    }

    /// Invokes each request in turn. Every invocation completes before the next one starts;
    /// once `cancel` fires, the remaining requests end `Cancelled`.
    pub fn invoke_all<I>(&self, requests: I, cancel: &CancellationToken) -> Vec<InvocationOutcome>
    where
        I: IntoIterator<Item = InvocationRequest>,
    {
        requests
            .into_iter()
            .map(|request| self.invoke(&request, cancel))
            .collect()
    }

    /// Runs one invocation on a dedicated worker thread so the caller is not blocked.
    ///
    /// The worker uses [`InvocationConfig::worker_stack_size`]. Invocations started this way
    /// still run one at a time.
    ///
    /// # Errors
    /// Returns [`crate::Error::FileError`] if the worker thread cannot be started.
    pub fn spawn(
        &self,
        request: InvocationRequest,
        cancel: CancellationToken,
    ) -> Result<JoinHandle<InvocationOutcome>> {
        let boundary = self.clone();
        let handle = thread::Builder::new()
            .name(format!("invoke {}", request.method.name))
            .stack_size(self.config.worker_stack_size)
            .spawn(move || boundary.invoke(&request, &cancel))?;
        Ok(handle)
    }

    fn execute(
        &self,
        request: &InvocationRequest,
        cancel: &CancellationToken,
    ) -> std::result::Result<Value, InvocationError> {
        let method = &request.method;
        let params = ParameterSynthesizer::new(&*self.types, &*self.host);
        let arguments = params.resolve_all(&method.parameters, &request.inputs)?;

        let receiver = if method.is_static {
            None
        } else {
            let instances = InstanceSynthesizer::new(&*self.types, &*self.host);
            Some(instances.construct(&TypeSig::parse(&method.declaring_type), 0)?)
        };

        cancel.check()?;
        log::trace!("dispatching {}", method.display_name());
        let result = self.host.invoke(method, receiver.as_ref(), &arguments)?;

        match result {
            Value::Awaitable(awaitable) => {
                let awaited = self.host.await_result(&awaitable)?;
                Ok(if awaitable.has_result {
                    awaited
                } else {
                    Value::Void
                })
            }
            other => Ok(other),
        }
    }

    fn finish(
        &self,
        method: &MethodDescriptor,
        result: std::result::Result<Value, InvocationError>,
        output: CapturedOutput,
        started: Instant,
        state: InvocationState,
    ) -> InvocationOutcome {
        let outcome = InvocationOutcome {
            method: method.id(),
            result,
            output,
            elapsed: started.elapsed(),
            state,
        };

        if self.config.log_outcomes {
            match outcome.state {
                InvocationState::Completed => log::info!("{outcome}"),
                _ => log::warn!("{outcome}"),
            }
        }
        if outcome.output.truncated {
            log::debug!(
                "console output of {} exceeded {} bytes and was truncated",
                outcome.method,
                self.config.capture_limit
            );
        }
        outcome
    }
}

fn panic_fault(payload: &(dyn Any + Send)) -> FaultInfo {
    let message = if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    };

    FaultInfo {
        type_name: "panic".to_string(),
        message,
        stack_trace: String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        invoke::{
            console,
            host::HostException,
            value::{AwaitableHandle, ObjectHandle},
        },
        metadata::{
            loader::InMemoryAssembly,
            method::ParameterSpec,
            typesystem::{ConstructorDescriptor, TypeDescriptor},
        },
    };

    /// Behaves according to the called method's name.
    struct ScriptedHost;

    impl HostRuntime for ScriptedHost {
        fn invoke(
            &self,
            method: &MethodDescriptor,
            receiver: Option<&Value>,
            arguments: &[Value],
        ) -> std::result::Result<Value, HostException> {
            match method.name.as_str() {
                "Echo" => {
                    console::stdout().write_str("echo:");
                    console::stderr().write_str("warn");
                    Ok(arguments.first().cloned().unwrap_or(Value::Void))
                }
                "Throw" => Err(HostException::invocation_wrapper(HostException::new(
                    "System.InvalidOperationException",
                    "original message",
                ))),
                "Answer" => Ok(Value::Awaitable(AwaitableHandle {
                    object: ObjectHandle::new(1, "System.Threading.Tasks.Task`1"),
                    has_result: true,
                })),
                "Fire" => Ok(Value::Awaitable(AwaitableHandle {
                    object: ObjectHandle::new(2, "System.Threading.Tasks.Task"),
                    has_result: false,
                })),
                "Receiver" => Ok(receiver.cloned().unwrap_or(Value::Null)),
                "Panic" => panic!("host bug"),
                _ => Ok(Value::Void),
            }
        }

        fn await_result(
            &self,
            awaitable: &AwaitableHandle,
        ) -> std::result::Result<Value, HostException> {
            Ok(if awaitable.has_result {
                Value::I4(42)
            } else {
                Value::Null
            })
        }

        fn construct(
            &self,
            ty: &TypeDescriptor,
            _: &ConstructorDescriptor,
            _: &[Value],
        ) -> std::result::Result<Value, HostException> {
            Ok(Value::Object(ObjectHandle::new(7, &ty.name)))
        }

        fn default_value_type(&self, _: &TypeDescriptor) -> Option<Value> {
            None
        }
    }

    fn boundary() -> InvocationBoundary {
        let mut types = InMemoryAssembly::new("Acme");
        types.add_type(
            TypeDescriptor::class("Acme", "Acme.P")
                .with_constructor(ConstructorDescriptor::parameterless()),
        );
        types.add_type(TypeDescriptor::interface("Acme", "Acme.IRun"));
        InvocationBoundary::new(Arc::new(ScriptedHost), Arc::new(types))
            .with_config(InvocationConfig::quiet())
    }

    fn request(method: MethodDescriptor) -> InvocationRequest {
        InvocationRequest::new(Arc::new(method))
    }

    #[test]
    fn validation_rules() {
        let base = || MethodDescriptor::new("Acme", "Acme.P", "Run");

        assert_eq!(InvocationBoundary::validate(&base()), Ok(()));
        assert_eq!(
            InvocationBoundary::validate(&base().with_generics(GenericState::OpenDefinition {
                arity: 1
            })),
            Err(ValidationError::OpenGenericDefinition)
        );
        assert_eq!(
            InvocationBoundary::validate(
                &base().with_parameter(ParameterSpec::new("x", TypeSig::GenericParam("!!0".into())))
            ),
            Err(ValidationError::UnresolvedGenericParameters)
        );
        assert_eq!(
            InvocationBoundary::validate(&base().with_kind(MethodKind::Dynamic)),
            Err(ValidationError::DynamicMethod)
        );
        assert_eq!(
            InvocationBoundary::validate(&base().with_kind(MethodKind::Native)),
            Err(ValidationError::NoManagedBody)
        );
        assert_eq!(
            InvocationBoundary::validate(&base().without_body()),
            Err(ValidationError::NoManagedBody)
        );
        assert_eq!(
            InvocationBoundary::validate(&base().with_kind(MethodKind::Abstract)),
            Ok(())
        );
        assert_eq!(
            InvocationBoundary::validate(&base().with_kind(MethodKind::InterfaceMember)),
            Ok(())
        );
    }

    #[test]
    fn completed_with_captured_output() {
        let method = MethodDescriptor::new("Acme", "Acme.P", "Echo")
            .with_parameter(ParameterSpec::new("n", TypeSig::parse("System.Int32")));
        let outcome = boundary().invoke(
            &request(method).with_inputs([Some("5")]),
            &CancellationToken::new(),
        );

        assert_eq!(outcome.state, InvocationState::Completed);
        assert_eq!(outcome.value(), Some(&Value::I4(5)));
        assert_eq!(outcome.stdout(), "echo:");
        assert_eq!(outcome.stderr(), "warn");
    }

    #[test]
    fn blocked_methods_never_dispatch() {
        let outcome = boundary().invoke(
            &request(MethodDescriptor::new("Acme", "Acme.P", "Echo").with_kind(MethodKind::Dynamic)),
            &CancellationToken::new(),
        );
        assert_eq!(outcome.state, InvocationState::Blocked);
        assert_eq!(
            outcome.error(),
            Some(&InvocationError::Validation(ValidationError::DynamicMethod))
        );
        assert!(outcome.stdout().is_empty());
    }

    #[test]
    fn faults_report_the_original_exception() {
        let outcome = boundary().invoke(
            &request(MethodDescriptor::new("Acme", "Acme.P", "Throw")),
            &CancellationToken::new(),
        );
        assert_eq!(outcome.state, InvocationState::Faulted);
        match outcome.error() {
            Some(InvocationError::Fault(fault)) => {
                assert_eq!(fault.type_name, "System.InvalidOperationException");
                assert_eq!(fault.message, "original message");
            }
            other => panic!("expected a fault, got {other:?}"),
        }
    }

    #[test]
    fn awaitables_are_awaited() {
        let b = boundary();
        let typed = b.invoke(
            &request(MethodDescriptor::new("Acme", "Acme.P", "Answer")),
            &CancellationToken::new(),
        );
        assert_eq!(typed.value(), Some(&Value::I4(42)));

        let untyped = b.invoke(
            &request(MethodDescriptor::new("Acme", "Acme.P", "Fire")),
            &CancellationToken::new(),
        );
        assert_eq!(untyped.value(), Some(&Value::Void));
    }

    #[test]
    fn receivers_are_synthesized() {
        let b = boundary();
        let outcome = b.invoke(
            &request(MethodDescriptor::new("Acme", "Acme.P", "Receiver").instance()),
            &CancellationToken::new(),
        );
        assert_eq!(
            outcome.value(),
            Some(&Value::Object(ObjectHandle::new(7, "Acme.P")))
        );

        let outcome = b.invoke(
            &request(
                MethodDescriptor::new("Acme", "Acme.IRun", "Receiver")
                    .instance()
                    .with_kind(MethodKind::InterfaceMember),
            ),
            &CancellationToken::new(),
        );
        assert!(matches!(
            outcome.error(),
            Some(InvocationError::Instantiation { .. })
        ));
        assert_eq!(outcome.state, InvocationState::Faulted);
    }

    #[test]
    fn cancelled_before_dispatch() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let outcome = boundary().invoke(
            &request(MethodDescriptor::new("Acme", "Acme.P", "Echo")),
            &cancel,
        );
        assert_eq!(outcome.state, InvocationState::Cancelled);
        assert_eq!(outcome.error(), Some(&InvocationError::Cancelled));
    }

    #[test]
    fn host_panics_become_faults_and_streams_survive() {
        let before = {
            let _permit = InvocationPermit::acquire();
            console::stdout()
        };

        let outcome = boundary().invoke(
            &request(MethodDescriptor::new("Acme", "Acme.P", "Panic")),
            &CancellationToken::new(),
        );
        match outcome.error() {
            Some(InvocationError::Fault(fault)) => assert_eq!(fault.message, "host bug"),
            other => panic!("expected a fault, got {other:?}"),
        }

        let _permit = InvocationPermit::acquire();
        assert!(console::stdout().same_as(&before));
    }

    #[test]
    fn batch_and_spawn() {
        let b = boundary();
        let cancel = CancellationToken::new();
        let outcomes = b.invoke_all(
            [
                request(MethodDescriptor::new("Acme", "Acme.P", "Answer")),
                request(MethodDescriptor::new("Acme", "Acme.P", "Throw")),
                request(MethodDescriptor::new("Acme", "Acme.P", "Fire")),
            ],
            &cancel,
        );
        let states: Vec<_> = outcomes.iter().map(|o| o.state).collect();
        assert_eq!(
            states,
            [
                InvocationState::Completed,
                InvocationState::Faulted,
                InvocationState::Completed
            ]
        );

        let handle = b
            .spawn(
                request(MethodDescriptor::new("Acme", "Acme.P", "Answer")),
                cancel,
            )
            .unwrap();
        assert_eq!(handle.join().unwrap().value(), Some(&Value::I4(42)));
    }
}
