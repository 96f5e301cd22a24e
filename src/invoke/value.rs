//! Managed values crossing the invocation boundary.

use std::fmt;

use uguid::Guid;

use crate::metadata::typesystem::{PrimitiveKind, TypeSig};

/// An object living inside the host runtime, known only by an opaque id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectHandle {
    /// Host-assigned identity
    pub id: u64,
    /// Runtime type of the object
    pub type_name: String,
}

impl ObjectHandle {
    /// Wraps a host object id.
    #[must_use]
    pub fn new(id: u64, type_name: &str) -> Self {
        ObjectHandle {
            id,
            type_name: type_name.to_string(),
        }
    }
}

/// A pending asynchronous operation returned by a method (`Task`, `Task<T>`, `ValueTask`...).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AwaitableHandle {
    /// The awaitable object itself
    pub object: ObjectHandle,
    /// Whether awaiting produces a value (`Task<T>`) or nothing (`Task`)
    pub has_result: bool,
}

/// A managed value: an argument, a receiver or a return value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// No value at all, the result of a `void` method or an untyped awaitable
    Void,
    /// The null reference, also used as "absent" for value types that could not be built
    Null,
    /// System.Boolean
    Bool(bool),
    /// System.Char
    Char(u16),
    /// System.SByte
    I1(i8),
    /// System.Byte
    U1(u8),
    /// System.Int16
    I2(i16),
    /// System.UInt16
    U2(u16),
    /// System.Int32
    I4(i32),
    /// System.UInt32
    U4(u32),
    /// System.Int64
    I8(i64),
    /// System.UInt64
    U8(u64),
    /// System.Single
    R4(f32),
    /// System.Double
    R8(f64),
    /// System.IntPtr
    I(i64),
    /// System.UIntPtr
    U(u64),
    /// System.String
    String(String),
    /// System.Guid
    Guid(Guid),
    /// A member of an enum type. `member` is `None` for values without a named member.
    Enum {
        /// Fully qualified name of the enum type
        type_name: String,
        /// Name of the member, if the value has one
        member: Option<String>,
        /// Underlying integer value
        value: i64,
    },
    /// A single-dimensional array
    Array {
        /// Declared element type
        element: TypeSig,
        /// Elements
        items: Vec<Value>,
    },
    /// A reference to an object in the host runtime
    Object(ObjectHandle),
    /// An awaitable returned by an asynchronous method
    Awaitable(AwaitableHandle),
}

impl Value {
    /// The zero-equivalent of a primitive type.
    #[must_use]
    pub fn zero(kind: PrimitiveKind) -> Self {
        match kind {
            PrimitiveKind::Boolean => Value::Bool(false),
            PrimitiveKind::Char => Value::Char(0),
            PrimitiveKind::I1 => Value::I1(0),
            PrimitiveKind::U1 => Value::U1(0),
            PrimitiveKind::I2 => Value::I2(0),
            PrimitiveKind::U2 => Value::U2(0),
            PrimitiveKind::I4 => Value::I4(0),
            PrimitiveKind::U4 => Value::U4(0),
            PrimitiveKind::I8 => Value::I8(0),
            PrimitiveKind::U8 => Value::U8(0),
            PrimitiveKind::R4 => Value::R4(0.0),
            PrimitiveKind::R8 => Value::R8(0.0),
            PrimitiveKind::I => Value::I(0),
            PrimitiveKind::U => Value::U(0),
        }
    }

    /// A zero-length array of `element`.
    #[must_use]
    pub fn empty_array(element: TypeSig) -> Self {
        Value::Array {
            element,
            items: Vec::new(),
        }
    }

    /// Whether this is [`Value::Null`].
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Whether this is [`Value::Void`].
    #[must_use]
    pub fn is_void(&self) -> bool {
        matches!(self, Value::Void)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Void => f.write_str("(void)"),
            Value::Null => f.write_str("null"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Char(v) => match char::from_u32(u32::from(*v)) {
                Some(c) => write!(f, "'{}'", c.escape_default()),
                None => write!(f, "'\\u{v:04x}'"),
            },
            Value::I1(v) => write!(f, "{v}"),
            Value::U1(v) => write!(f, "{v}"),
            Value::I2(v) => write!(f, "{v}"),
            Value::U2(v) => write!(f, "{v}"),
            Value::I4(v) => write!(f, "{v}"),
            Value::U4(v) => write!(f, "{v}"),
            Value::I8(v) | Value::I(v) => write!(f, "{v}"),
            Value::U8(v) | Value::U(v) => write!(f, "{v}"),
            Value::R4(v) => write!(f, "{v}"),
            Value::R8(v) => write!(f, "{v}"),
            Value::String(v) => write!(f, "{v:?}"),
            Value::Guid(v) => write!(f, "{v}"),
            Value::Enum {
                type_name,
                member,
                value,
            } => match member {
                Some(member) => write!(f, "{type_name}.{member}"),
                None => write!(f, "({type_name}){value}"),
            },
            Value::Array { element, items } => {
                write!(f, "{element}[{}]", items.len())
            }
            Value::Object(handle) => write!(f, "{}#{}", handle.type_name, handle.id),
            Value::Awaitable(handle) => {
                write!(f, "awaitable {}#{}", handle.object.type_name, handle.object.id)
            }
        }
    }
}
