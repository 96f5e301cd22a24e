//! Declared types as seen by the synthesizers.
//!
//! Two layers exist:
//!
//! - [`TypeSig`] is a type as it appears in a signature: a parameter type, a return type, an
//!   array element type. Well-known runtime types (`System.String`, `System.Guid`, the
//!   primitives) are recognized up front, everything else stays a fully qualified name.
//! - [`TypeDescriptor`] is what the loader knows about a named type: its [`TypeKind`],
//!   whether it is abstract, and its public constructors.
//!
//! The synthesizers only ever need the second layer for [`TypeSig::Named`] types, which they
//! look up through [`crate::metadata::loader::TypeResolver`].

use std::fmt;

use strum::{EnumCount, EnumIter, IntoEnumIterator};

use crate::metadata::{method::ParameterSpec, token::Token};

/// The primitive runtime types with a fixed zero-equivalent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, EnumCount)]
pub enum PrimitiveKind {
    /// System.Boolean
    Boolean,
    /// System.Char - UTF-16 code unit
    Char,
    /// System.SByte
    I1,
    /// System.Byte
    U1,
    /// System.Int16
    I2,
    /// System.UInt16
    U2,
    /// System.Int32
    I4,
    /// System.UInt32
    U4,
    /// System.Int64
    I8,
    /// System.UInt64
    U8,
    /// System.Single
    R4,
    /// System.Double
    R8,
    /// System.IntPtr
    I,
    /// System.UIntPtr
    U,
}

impl PrimitiveKind {
    /// Fully qualified runtime name, e.g. `System.Int32`.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            PrimitiveKind::Boolean => "System.Boolean",
            PrimitiveKind::Char => "System.Char",
            PrimitiveKind::I1 => "System.SByte",
            PrimitiveKind::U1 => "System.Byte",
            PrimitiveKind::I2 => "System.Int16",
            PrimitiveKind::U2 => "System.UInt16",
            PrimitiveKind::I4 => "System.Int32",
            PrimitiveKind::U4 => "System.UInt32",
            PrimitiveKind::I8 => "System.Int64",
            PrimitiveKind::U8 => "System.UInt64",
            PrimitiveKind::R4 => "System.Single",
            PrimitiveKind::R8 => "System.Double",
            PrimitiveKind::I => "System.IntPtr",
            PrimitiveKind::U => "System.UIntPtr",
        }
    }

    /// Looks a primitive up by its fully qualified runtime name.
    #[must_use]
    pub fn from_type_name(name: &str) -> Option<Self> {
        PrimitiveKind::iter().find(|kind| kind.type_name() == name)
    }

    /// Whether this is one of the integer kinds (including native sized integers).
    #[must_use]
    pub fn is_integer(&self) -> bool {
        !matches!(
            self,
            PrimitiveKind::Boolean | PrimitiveKind::Char | PrimitiveKind::R4 | PrimitiveKind::R8
        )
    }
}

/// A type as it appears in a method or constructor signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeSig {
    /// System.Void
    Void,
    /// One of the primitive value types
    Primitive(PrimitiveKind),
    /// System.String
    String,
    /// System.Object
    Object,
    /// System.Guid, the 128-bit unique identifier type
    Guid,
    /// Single-dimensional array of the element type
    Array(Box<TypeSig>),
    /// Any other type, by fully qualified name
    Named(String),
    /// An unresolved generic parameter (`T`, `!0`, `!!0`)
    GenericParam(String),
}

impl TypeSig {
    /// Builds a signature from a fully qualified name, recognizing the well-known types and
    /// a trailing `[]` for arrays.
    ///
    /// ```rust
    /// use dotprobe::metadata::typesystem::{PrimitiveKind, TypeSig};
    ///
    /// assert_eq!(TypeSig::parse("System.Int32"), TypeSig::Primitive(PrimitiveKind::I4));
    /// assert_eq!(
    ///     TypeSig::parse("System.String[]"),
    ///     TypeSig::Array(Box::new(TypeSig::String))
    /// );
    /// assert_eq!(TypeSig::parse("Acme.Widget"), TypeSig::Named("Acme.Widget".into()));
    /// ```
    #[must_use]
    pub fn parse(name: &str) -> Self {
        let name = name.trim();
        if let Some(element) = name.strip_suffix("[]") {
            return TypeSig::Array(Box::new(TypeSig::parse(element)));
        }
        if name.starts_with('!') {
            return TypeSig::GenericParam(name.to_string());
        }

        match name {
            "System.Void" => TypeSig::Void,
            "System.String" => TypeSig::String,
            "System.Object" => TypeSig::Object,
            "System.Guid" => TypeSig::Guid,
            other => match PrimitiveKind::from_type_name(other) {
                Some(kind) => TypeSig::Primitive(kind),
                None => TypeSig::Named(other.to_string()),
            },
        }
    }

    /// Whether an unresolved generic parameter appears anywhere in this signature.
    #[must_use]
    pub fn contains_generic_param(&self) -> bool {
        match self {
            TypeSig::GenericParam(_) => true,
            TypeSig::Array(element) => element.contains_generic_param(),
            _ => false,
        }
    }
}

impl fmt::Display for TypeSig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeSig::Void => f.write_str("System.Void"),
            TypeSig::Primitive(kind) => f.write_str(kind.type_name()),
            TypeSig::String => f.write_str("System.String"),
            TypeSig::Object => f.write_str("System.Object"),
            TypeSig::Guid => f.write_str("System.Guid"),
            TypeSig::Array(element) => write!(f, "{element}[]"),
            TypeSig::Named(name) | TypeSig::GenericParam(name) => f.write_str(name),
        }
    }
}

/// A literal constant as stored in metadata, used for declared parameter defaults.
#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    /// `null` default for reference types
    Null,
    /// Boolean constant
    Boolean(bool),
    /// Char constant
    Char(u16),
    /// Any signed integer constant, widened
    Int(i64),
    /// Any unsigned integer constant, widened
    UInt(u64),
    /// Floating point constant, widened
    Float(f64),
    /// String constant
    String(String),
}

/// One named member of an enum type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumMember {
    /// Member name
    pub name: String,
    /// Underlying integer value
    pub value: i64,
}

/// What kind of type a [`TypeDescriptor`] describes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeKind {
    /// Reference type
    Class,
    /// Interface type, never instantiable
    Interface,
    /// User-defined value type (struct)
    ValueType,
    /// Enum with its members in declaration order
    Enum(Vec<EnumMember>),
}

/// A public constructor of a type.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstructorDescriptor {
    /// Constructor parameters in declaration order
    pub parameters: Vec<ParameterSpec>,
    /// Metadata token, if known
    pub token: Option<Token>,
}

impl ConstructorDescriptor {
    /// Creates a constructor with the given parameters.
    #[must_use]
    pub fn new(parameters: Vec<ParameterSpec>) -> Self {
        ConstructorDescriptor {
            parameters,
            token: None,
        }
    }

    /// The parameterless constructor.
    #[must_use]
    pub fn parameterless() -> Self {
        Self::new(Vec::new())
    }
}

/// Everything the synthesizers need to know about a named type.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDescriptor {
    /// Fully qualified name (`Namespace.Name`, nested types as `Outer/Inner`)
    pub name: String,
    /// Name of the declaring assembly
    pub assembly: String,
    /// Kind of type
    pub kind: TypeKind,
    /// Whether the type is abstract
    pub is_abstract: bool,
    /// Public instance constructors
    pub constructors: Vec<ConstructorDescriptor>,
}

impl TypeDescriptor {
    /// A concrete class with no constructors yet.
    #[must_use]
    pub fn class(assembly: &str, name: &str) -> Self {
        TypeDescriptor {
            name: name.to_string(),
            assembly: assembly.to_string(),
            kind: TypeKind::Class,
            is_abstract: false,
            constructors: Vec::new(),
        }
    }

    /// An interface type.
    #[must_use]
    pub fn interface(assembly: &str, name: &str) -> Self {
        TypeDescriptor {
            kind: TypeKind::Interface,
            is_abstract: true,
            ..Self::class(assembly, name)
        }
    }

    /// A user-defined value type.
    #[must_use]
    pub fn value_type(assembly: &str, name: &str) -> Self {
        TypeDescriptor {
            kind: TypeKind::ValueType,
            ..Self::class(assembly, name)
        }
    }

    /// An enum with members given as `(name, value)` pairs in declaration order.
    #[must_use]
    pub fn enumeration(assembly: &str, name: &str, members: &[(&str, i64)]) -> Self {
        let members = members
            .iter()
            .map(|(name, value)| EnumMember {
                name: (*name).to_string(),
                value: *value,
            })
            .collect();

        TypeDescriptor {
            kind: TypeKind::Enum(members),
            ..Self::class(assembly, name)
        }
    }

    /// Marks the type abstract.
    #[must_use]
    pub fn with_abstract(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    /// Adds a public constructor.
    #[must_use]
    pub fn with_constructor(mut self, ctor: ConstructorDescriptor) -> Self {
        self.constructors.push(ctor);
        self
    }

    /// Whether this is a value type (structs and enums).
    #[must_use]
    pub fn is_value_type(&self) -> bool {
        matches!(self.kind, TypeKind::ValueType | TypeKind::Enum(_))
    }

    /// Whether no instance of this type can ever be constructed directly.
    #[must_use]
    pub fn is_uninstantiable(&self) -> bool {
        self.is_abstract || self.kind == TypeKind::Interface
    }

    /// Enum members, if this is an enum.
    #[must_use]
    pub fn enum_members(&self) -> Option<&[EnumMember]> {
        match &self.kind {
            TypeKind::Enum(members) => Some(members),
            _ => None,
        }
    }
}
