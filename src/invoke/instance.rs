//! Receivers and constructor arguments.
//!
//! [`InstanceSynthesizer::construct`] builds an instance of a declared type for calling
//! instance methods. Strings, value types and arrays get their zero-equivalent directly.
//! Abstract types and interfaces always fail. Classes are built through their public
//! constructors, parameterless first, then by ascending parameter count, synthesizing the
//! constructor arguments recursively one level deeper.
//!
//! The depth is threaded through every recursive call as a plain argument. Past
//! [`MAX_CONSTRUCTION_DEPTH`] construction fails, which terminates self-referential and
//! deeply chained constructor graphs.

use std::collections::HashMap;

use crate::{
    invoke::{
        host::{HostException, HostRuntime},
        outcome::InvocationError,
        params::ParameterSynthesizer,
        value::Value,
    },
    metadata::{
        loader::TypeResolver,
        typesystem::{ConstructorDescriptor, TypeDescriptor, TypeKind, TypeSig},
    },
};

/// Deepest constructor nesting attempted.
pub const MAX_CONSTRUCTION_DEPTH: usize = 10;

/// One constructor candidate with its arguments, alive for a single attempt.
struct ConstructionPlan<'t> {
    target: &'t TypeDescriptor,
    constructor: &'t ConstructorDescriptor,
    arguments: Vec<Value>,
    depth: usize,
}

impl ConstructionPlan<'_> {
    fn run(&self, host: &dyn HostRuntime) -> Result<Value, HostException> {
        host.construct(self.target, self.constructor, &self.arguments)
    }
}

/// Named types that could not be built, with the shallowest depth they failed at. Failing at
/// depth `d` implies failing at every depth below the bound that is greater than `d`.
type FailedTypes = HashMap<String, usize>;

/// Builds instances of declared types through the host runtime.
pub struct InstanceSynthesizer<'a> {
    types: &'a dyn TypeResolver,
    host: &'a dyn HostRuntime,
    params: ParameterSynthesizer<'a>,
}

impl<'a> InstanceSynthesizer<'a> {
    /// A synthesizer looking types up in `types` and running constructors through `host`.
    #[must_use]
    pub fn new(types: &'a dyn TypeResolver, host: &'a dyn HostRuntime) -> Self {
        InstanceSynthesizer {
            types,
            host,
            params: ParameterSynthesizer::new(types, host),
        }
    }

    /// Builds an instance of `ty` at construction depth `depth` (0 for a receiver).
    ///
    /// A named type that failed once is not retried at the same or a greater depth
    /// during the same call, so the number of attempts stays linear in the number of
    /// constructors even for types whose constructors all take the type itself.
    ///
    /// # Errors
    /// Returns [`InvocationError::Instantiation`] if `ty` is abstract, an interface, unknown,
    /// has no constructor that succeeds, or `depth` exceeds [`MAX_CONSTRUCTION_DEPTH`].
    pub fn construct(&self, ty: &TypeSig, depth: usize) -> Result<Value, InvocationError> {
        let mut failed = FailedTypes::new();
        self.construct_at(ty, depth, &mut failed)
    }

    fn construct_at(
        &self,
        ty: &TypeSig,
        depth: usize,
        failed: &mut FailedTypes,
    ) -> Result<Value, InvocationError> {
        if depth > MAX_CONSTRUCTION_DEPTH {
            return Err(InvocationError::instantiation(
                &ty.to_string(),
                format!("construction depth {depth} exceeds {MAX_CONSTRUCTION_DEPTH}"),
            ));
        }

        match ty {
            TypeSig::String => Ok(Value::String(String::new())),
            TypeSig::Primitive(_) | TypeSig::Guid | TypeSig::Array(_) => {
                Ok(self.params.default_for(ty))
            }
            TypeSig::Object => {
                let object = TypeDescriptor::class("mscorlib", "System.Object")
                    .with_constructor(ConstructorDescriptor::parameterless());
                self.construct_class(&object, depth, failed)
            }
            TypeSig::Named(name) => {
                if let Some(&at) = failed.get(name.as_str()) {
                    if depth >= at {
                        return Err(InvocationError::instantiation(
                            name,
                            format!("already failed at depth {at}"),
                        ));
                    }
                }

                let Some(descriptor) = self.types.find_type(name) else {
                    return Err(InvocationError::instantiation(name, "type not found"));
                };
                let result = self.construct_descriptor(&descriptor, depth, failed);
                if result.is_err() {
                    failed.insert(name.clone(), depth);
                }
                result
            }
            TypeSig::Void | TypeSig::GenericParam(_) => Err(InvocationError::instantiation(
                &ty.to_string(),
                "not a constructible type",
            )),
        }
    }

    fn construct_descriptor(
        &self,
        descriptor: &TypeDescriptor,
        depth: usize,
        failed: &mut FailedTypes,
    ) -> Result<Value, InvocationError> {
        if descriptor.is_uninstantiable() {
            return Err(InvocationError::instantiation(
                &descriptor.name,
                if descriptor.kind == TypeKind::Interface {
                    "interfaces cannot be instantiated"
                } else {
                    "abstract types cannot be instantiated"
                },
            ));
        }

        match descriptor.kind {
            TypeKind::Enum(_) => Ok(self.params.default_for_descriptor(descriptor)),
            TypeKind::ValueType => self.host.default_value_type(descriptor).ok_or_else(|| {
                InvocationError::instantiation(&descriptor.name, "no default instance available")
            }),
            TypeKind::Class | TypeKind::Interface => {
                self.construct_class(descriptor, depth, failed)
            }
        }
    }

    fn construct_class(
        &self,
        descriptor: &TypeDescriptor,
        depth: usize,
        failed: &mut FailedTypes,
    ) -> Result<Value, InvocationError> {
        let mut candidates: Vec<&ConstructorDescriptor> = descriptor.constructors.iter().collect();
        // stable: the parameterless constructor comes first, ties keep declaration order
        candidates.sort_by_key(|ctor| ctor.parameters.len());

        for ctor in &candidates {
            let arguments = match self.constructor_arguments(ctor, depth + 1, failed) {
                Ok(arguments) => arguments,
                Err(error) => {
                    log::trace!(
                        "skipping {}({} params): {error}",
                        descriptor.name,
                        ctor.parameters.len()
                    );
                    continue;
                }
            };

            let plan = ConstructionPlan {
                target: descriptor,
                constructor: ctor,
                arguments,
                depth,
            };
            match plan.run(self.host) {
                Ok(instance) => return Ok(instance),
                Err(exception) => {
                    let original = exception.into_original();
                    log::trace!(
                        "constructor of {} at depth {} threw {}: {}",
                        plan.target.name,
                        plan.depth,
                        original.type_name,
                        original.message
                    );
                }
            }
        }

        Err(InvocationError::instantiation(
            &descriptor.name,
            if candidates.is_empty() {
                "no public constructor".to_string()
            } else {
                format!("all {} constructors failed", candidates.len())
            },
        ))
    }

    fn constructor_arguments(
        &self,
        ctor: &ConstructorDescriptor,
        depth: usize,
        failed: &mut FailedTypes,
    ) -> Result<Vec<Value>, InvocationError> {
        ctor.parameters
            .iter()
            .map(|param| {
                if self.is_object_type(&param.ty) {
                    self.construct_at(&param.ty, depth, failed)
                } else {
                    Ok(self.params.default_for(&param.ty))
                }
            })
            .collect()
    }

    /// Whether a constructor parameter of this type needs a constructed instance rather
    /// than a table default.
    fn is_object_type(&self, ty: &TypeSig) -> bool {
        match ty {
            TypeSig::Object => true,
            TypeSig::Named(name) => self
                .types
                .find_type(name)
                .map_or(true, |descriptor| !descriptor.is_value_type()),
            _ => false,
        }
    }
}
