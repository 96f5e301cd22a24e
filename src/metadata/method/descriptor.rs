//! Method identity and shape: [`MethodDescriptor`], [`MethodId`], [`ParameterSpec`] and the
//! [`MethodKind`] / [`GenericState`] tags the invocation boundary validates against.

use std::fmt;

use crate::metadata::{
    method::{MethodAttributes, MethodImplAttributes},
    token::Token,
    typesystem::{Constant, TypeSig},
};

/// A declared parameter of a method or constructor.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSpec {
    /// Declared name, may be empty for compiler generated parameters
    pub name: String,
    /// Declared type
    pub ty: TypeSig,
    /// Declared default value, present only for optional parameters with a known default
    pub default: Option<Constant>,
}

impl ParameterSpec {
    /// A required parameter.
    #[must_use]
    pub fn new(name: &str, ty: TypeSig) -> Self {
        ParameterSpec {
            name: name.to_string(),
            ty,
            default: None,
        }
    }

    /// An optional parameter with a declared default.
    #[must_use]
    pub fn optional(name: &str, ty: TypeSig, default: Constant) -> Self {
        ParameterSpec {
            default: Some(default),
            ..Self::new(name, ty)
        }
    }
}

/// How a method is implemented, as far as the invocation boundary is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MethodKind {
    /// Ordinary method with a managed (CIL) implementation
    Managed,
    /// Abstract method, dispatched virtually on a concrete receiver
    Abstract,
    /// Member declared on an interface
    InterfaceMember,
    /// P/Invoke, internal call or otherwise native implementation
    Native,
    /// Method emitted at runtime, with no file-backed body
    Dynamic,
}

impl MethodKind {
    /// Classifies a method from its raw `MethodDef` flag words.
    ///
    /// `on_interface` is whether the declaring type is an interface. Runtime-generated methods
    /// never come out of this function; loaders that can recognize them report
    /// [`MethodKind::Dynamic`] directly.
    #[must_use]
    pub fn from_flags(
        attributes: MethodAttributes,
        implementation: MethodImplAttributes,
        on_interface: bool,
    ) -> Self {
        if on_interface {
            MethodKind::InterfaceMember
        } else if attributes.contains(MethodAttributes::ABSTRACT) {
            MethodKind::Abstract
        } else if attributes.contains(MethodAttributes::PINVOKE_IMPL)
            || implementation.contains(MethodImplAttributes::INTERNAL_CALL)
            || implementation.contains(MethodImplAttributes::UNMANAGED)
            || !implementation.is_il()
        {
            MethodKind::Native
        } else {
            MethodKind::Managed
        }
    }
}

/// Generic shape of a method.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GenericState {
    /// Not generic
    NonGeneric,
    /// Generic method definition without arguments applied
    OpenDefinition {
        /// Number of generic parameters
        arity: usize,
    },
    /// Generic method with arguments applied
    Instantiated {
        /// The applied generic arguments
        arguments: Vec<TypeSig>,
    },
}

/// The identity of a method, stable across decodes and graph builds.
///
/// Rendered as `[Assembly]Namespace.Type::Name(ParamType,...)`, optionally followed by the
/// applied generic arguments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MethodId(String);

impl MethodId {
    /// The textual identity.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MethodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The structural identity of a method and everything needed to validate and invoke it.
///
/// Descriptors are created once per discovered method by the loader and shared as
/// `Arc<MethodDescriptor>`; nothing in this crate mutates them afterwards.
///
/// ```rust
/// use dotprobe::metadata::{method::{MethodDescriptor, ParameterSpec}, typesystem::TypeSig};
///
/// let method = MethodDescriptor::new("Acme", "Acme.Math", "Add")
///     .with_parameter(ParameterSpec::new("a", TypeSig::parse("System.Int32")))
///     .with_parameter(ParameterSpec::new("b", TypeSig::parse("System.Int32")))
///     .with_return(TypeSig::parse("System.Int32"));
///
/// assert!(method.is_static);
/// assert_eq!(method.id().as_str(), "[Acme]Acme.Math::Add(System.Int32,System.Int32)");
/// assert_eq!(method.display_name(), "Acme.Math::Add(System.Int32,System.Int32)");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct MethodDescriptor {
    /// Name of the declaring assembly
    pub assembly: String,
    /// Fully qualified name of the declaring type
    pub declaring_type: String,
    /// Method name
    pub name: String,
    /// Parameters in declaration order, excluding the receiver
    pub parameters: Vec<ParameterSpec>,
    /// Return type
    pub return_type: TypeSig,
    /// Whether the method is static
    pub is_static: bool,
    /// Implementation kind
    pub kind: MethodKind,
    /// Generic shape
    pub generics: GenericState,
    /// Whether the loader can supply a managed body
    pub has_body: bool,
    /// Metadata token, if known
    pub token: Option<Token>,
}

impl MethodDescriptor {
    /// A static, non-generic, managed method with a body, no parameters and a void return.
    #[must_use]
    pub fn new(assembly: &str, declaring_type: &str, name: &str) -> Self {
        MethodDescriptor {
            assembly: assembly.to_string(),
            declaring_type: declaring_type.to_string(),
            name: name.to_string(),
            parameters: Vec::new(),
            return_type: TypeSig::Void,
            is_static: true,
            kind: MethodKind::Managed,
            generics: GenericState::NonGeneric,
            has_body: true,
            token: None,
        }
    }

    /// Appends a parameter.
    #[must_use]
    pub fn with_parameter(mut self, parameter: ParameterSpec) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// Sets the return type.
    #[must_use]
    pub fn with_return(mut self, return_type: TypeSig) -> Self {
        self.return_type = return_type;
        self
    }

    /// Marks the method as an instance method.
    #[must_use]
    pub fn instance(mut self) -> Self {
        self.is_static = false;
        self
    }

    /// Sets the implementation kind and with it `has_body`: only [`MethodKind::Managed`]
    /// carries a body. Call [`MethodDescriptor::without_body`] afterwards for a managed
    /// method the loader cannot supply a body for.
    #[must_use]
    pub fn with_kind(mut self, kind: MethodKind) -> Self {
        self.kind = kind;
        self.has_body = kind == MethodKind::Managed;
        self
    }

    /// Sets the generic shape.
    #[must_use]
    pub fn with_generics(mut self, generics: GenericState) -> Self {
        self.generics = generics;
        self
    }

    /// Declares that the loader has no body for this method.
    #[must_use]
    pub fn without_body(mut self) -> Self {
        self.has_body = false;
        self
    }

    /// Sets the metadata token.
    #[must_use]
    pub fn with_token(mut self, token: Token) -> Self {
        self.token = Some(token);
        self
    }

    /// The stable identity of this method.
    #[must_use]
    pub fn id(&self) -> MethodId {
        MethodId(format!("[{}]{}", self.assembly, self.display_name()))
    }

    /// Human readable name without the assembly.
    #[must_use]
    pub fn display_name(&self) -> String {
        let params = self
            .parameters
            .iter()
            .map(|p| p.ty.to_string())
            .collect::<Vec<_>>()
            .join(",");

        let generics = match &self.generics {
            GenericState::NonGeneric => String::new(),
            GenericState::OpenDefinition { arity } => format!("`{arity}"),
            GenericState::Instantiated { arguments } => format!(
                "<{}>",
                arguments
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(",")
            ),
        };

        format!("{}::{}{}({})", self.declaring_type, self.name, generics, params)
    }

    /// Whether this is an open generic definition or still mentions generic parameters that
    /// have no concrete argument.
    #[must_use]
    pub fn has_unresolved_generics(&self) -> bool {
        match &self.generics {
            GenericState::OpenDefinition { .. } => return true,
            GenericState::Instantiated { arguments } => {
                if arguments.iter().any(TypeSig::contains_generic_param) {
                    return true;
                }
            }
            GenericState::NonGeneric => {}
        }

        self.return_type.contains_generic_param()
            || self
                .parameters
                .iter()
                .any(|p| p.ty.contains_generic_param())
    }

    /// Whether this is an instance constructor.
    #[must_use]
    pub fn is_constructor(&self) -> bool {
        self.name == ".ctor"
    }
}
