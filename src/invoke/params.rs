//! Argument values for declared parameters.
//!
//! [`ParameterSynthesizer::resolve`] picks a value for one parameter with a fixed priority:
//!
//! 1. explicit textual input, converted to the declared type (failures are reported, never
//!    swallowed);
//! 2. the declared default of an optional parameter;
//! 3. a type-directed default from [`ParameterSynthesizer::default_for`].
//!
//! Auto-generated values are only guaranteed to be type-valid. A value type that could not
//! be built comes back as [`Value::Null`], which usually means the call will fail later.

use uguid::Guid;

use crate::{
    invoke::{host::HostRuntime, outcome::InvocationError, value::Value},
    metadata::{
        loader::TypeResolver,
        method::ParameterSpec,
        typesystem::{Constant, PrimitiveKind, TypeDescriptor, TypeKind, TypeSig},
    },
};

/// Resolves parameter values against the loaded types.
pub struct ParameterSynthesizer<'a> {
    types: &'a dyn TypeResolver,
    host: &'a dyn HostRuntime,
}

impl<'a> ParameterSynthesizer<'a> {
    /// A synthesizer looking types up in `types` and building value types through `host`.
    #[must_use]
    pub fn new(types: &'a dyn TypeResolver, host: &'a dyn HostRuntime) -> Self {
        ParameterSynthesizer { types, host }
    }

    /// The value for one parameter.
    ///
    /// # Errors
    /// Returns [`InvocationError::Conversion`] if `raw_input` is present but cannot be converted
    /// to the declared type.
    pub fn resolve(
        &self,
        spec: &ParameterSpec,
        raw_input: Option<&str>,
    ) -> Result<Value, InvocationError> {
        if let Some(raw) = raw_input {
            return self.convert(spec, raw);
        }
        if let Some(default) = &spec.default {
            return Ok(self.constant_value(&spec.ty, default));
        }
        Ok(self.default_for(&spec.ty))
    }

    /// Values for a whole parameter list.
    ///
    /// Inputs are matched to parameters by position. Every parameter without an input
    /// (missing, `None`, or beyond the end of `inputs`) falls back to its declared or
    /// auto-generated default on its own; surplus inputs are ignored.
    ///
    /// # Errors
    /// The first conversion failure, in parameter order.
    pub fn resolve_all(
        &self,
        parameters: &[ParameterSpec],
        inputs: &[Option<String>],
    ) -> Result<Vec<Value>, InvocationError> {
        if inputs.len() > parameters.len() {
            log::debug!(
                "ignoring {} surplus inputs",
                inputs.len() - parameters.len()
            );
        }

        parameters
            .iter()
            .enumerate()
            .map(|(index, spec)| {
                let raw = inputs.get(index).and_then(Option::as_deref);
                self.resolve(spec, raw)
            })
            .collect()
    }

    /// The type-directed default of `ty`.
    ///
    /// | Type | Default |
    /// |------|---------|
    /// | bool | `false` |
    /// | char | `'\0'` |
    /// | integers, native integers | `0` |
    /// | floats | `0.0` |
    /// | string | `""` |
    /// | guid | all-zero guid |
    /// | array | zero-length array of the element type |
    /// | enum | first declared member |
    /// | other value types | argument-less construction, `Null` if that fails |
    /// | classes, interfaces, `object` | `Null` |
    #[must_use]
    pub fn default_for(&self, ty: &TypeSig) -> Value {
        match ty {
            TypeSig::Primitive(kind) => Value::zero(*kind),
            TypeSig::String => Value::String(String::new()),
            TypeSig::Guid => Value::Guid(Guid::ZERO),
            TypeSig::Array(element) => Value::empty_array((**element).clone()),
            TypeSig::Named(name) => match self.types.find_type(name) {
                Some(descriptor) => self.default_for_descriptor(&descriptor),
                None => {
                    log::debug!("unknown type {name}, defaulting to null");
                    Value::Null
                }
            },
            TypeSig::Void | TypeSig::Object | TypeSig::GenericParam(_) => Value::Null,
        }
    }

    pub(crate) fn default_for_descriptor(&self, descriptor: &TypeDescriptor) -> Value {
        match &descriptor.kind {
            TypeKind::Enum(members) => match members.first() {
                Some(first) => Value::Enum {
                    type_name: descriptor.name.clone(),
                    member: Some(first.name.clone()),
                    value: first.value,
                },
                None => Value::Enum {
                    type_name: descriptor.name.clone(),
                    member: None,
                    value: 0,
                },
            },
            TypeKind::ValueType => match self.host.default_value_type(descriptor) {
                Some(value) => value,
                None => {
                    log::debug!(
                        "no default instance of value type {}, passing absent",
                        descriptor.name
                    );
                    Value::Null
                }
            },
            TypeKind::Class | TypeKind::Interface => Value::Null,
        }
    }

    fn convert(&self, spec: &ParameterSpec, raw: &str) -> Result<Value, InvocationError> {
        let converted = match &spec.ty {
            TypeSig::String | TypeSig::Object => Some(Value::String(raw.to_string())),
            TypeSig::Guid => parse_guid(raw).map(Value::Guid),
            TypeSig::Primitive(kind) => parse_primitive(*kind, raw),
            TypeSig::Named(name) => self
                .types
                .find_type(name)
                .and_then(|descriptor| parse_enum(&descriptor, raw)),
            TypeSig::Array(_) | TypeSig::Void | TypeSig::GenericParam(_) => None,
        };

        converted.ok_or_else(|| InvocationError::Conversion {
            parameter: spec.name.clone(),
            target_type: spec.ty.to_string(),
            input: raw.to_string(),
        })
    }

    fn constant_value(&self, ty: &TypeSig, constant: &Constant) -> Value {
        let value = match (ty, constant) {
            (TypeSig::Primitive(kind), Constant::Int(v)) => integer_value(*kind, i128::from(*v)),
            (TypeSig::Primitive(kind), Constant::UInt(v)) => integer_value(*kind, i128::from(*v)),
            #[allow(clippy::cast_possible_truncation)]
            (TypeSig::Primitive(PrimitiveKind::R4), Constant::Float(v)) => Some(Value::R4(*v as f32)),
            (TypeSig::Primitive(PrimitiveKind::R8), Constant::Float(v)) => Some(Value::R8(*v)),
            (TypeSig::Primitive(PrimitiveKind::Boolean), Constant::Boolean(v)) => {
                Some(Value::Bool(*v))
            }
            (TypeSig::Primitive(PrimitiveKind::Char), Constant::Char(v)) => Some(Value::Char(*v)),
            (TypeSig::String | TypeSig::Object, Constant::String(v)) => {
                Some(Value::String(v.clone()))
            }
            (TypeSig::Named(name), Constant::Int(v)) => self
                .types
                .find_type(name)
                .and_then(|descriptor| enum_value(&descriptor, *v)),
            // `default(T)` of a value type is stored as a null constant
            (_, Constant::Null) => return self.default_for(ty),
            _ => None,
        };

        value.unwrap_or_else(|| {
            log::debug!("default {constant:?} does not fit {ty}, auto-generating instead");
            self.default_for(ty)
        })
    }
}

fn integer_value(kind: PrimitiveKind, v: i128) -> Option<Value> {
    Some(match kind {
        PrimitiveKind::I1 => Value::I1(i8::try_from(v).ok()?),
        PrimitiveKind::U1 => Value::U1(u8::try_from(v).ok()?),
        PrimitiveKind::I2 => Value::I2(i16::try_from(v).ok()?),
        PrimitiveKind::U2 => Value::U2(u16::try_from(v).ok()?),
        PrimitiveKind::I4 => Value::I4(i32::try_from(v).ok()?),
        PrimitiveKind::U4 => Value::U4(u32::try_from(v).ok()?),
        PrimitiveKind::I8 => Value::I8(i64::try_from(v).ok()?),
        PrimitiveKind::U8 => Value::U8(u64::try_from(v).ok()?),
        PrimitiveKind::I => Value::I(i64::try_from(v).ok()?),
        PrimitiveKind::U => Value::U(u64::try_from(v).ok()?),
        PrimitiveKind::Char => Value::Char(u16::try_from(v).ok()?),
        PrimitiveKind::Boolean => Value::Bool(v != 0),
        #[allow(clippy::cast_precision_loss)]
        PrimitiveKind::R4 => Value::R4(v as f32),
        #[allow(clippy::cast_precision_loss)]
        PrimitiveKind::R8 => Value::R8(v as f64),
    })
}

fn parse_primitive(kind: PrimitiveKind, raw: &str) -> Option<Value> {
    let text = raw.trim();
    Some(match kind {
        PrimitiveKind::Boolean => {
            if text.eq_ignore_ascii_case("true") {
                Value::Bool(true)
            } else if text.eq_ignore_ascii_case("false") {
                Value::Bool(false)
            } else {
                return None;
            }
        }
        PrimitiveKind::Char => {
            // exactly one UTF-16 code unit, taken from the untrimmed input so ' ' works
            let mut units = raw.encode_utf16();
            match (units.next(), units.next()) {
                (Some(unit), None) => Value::Char(unit),
                _ => return None,
            }
        }
        PrimitiveKind::I1 => Value::I1(text.parse().ok()?),
        PrimitiveKind::U1 => Value::U1(text.parse().ok()?),
        PrimitiveKind::I2 => Value::I2(text.parse().ok()?),
        PrimitiveKind::U2 => Value::U2(text.parse().ok()?),
        PrimitiveKind::I4 => Value::I4(text.parse().ok()?),
        PrimitiveKind::U4 => Value::U4(text.parse().ok()?),
        PrimitiveKind::I8 => Value::I8(text.parse().ok()?),
        PrimitiveKind::U8 => Value::U8(text.parse().ok()?),
        PrimitiveKind::I => Value::I(text.parse().ok()?),
        PrimitiveKind::U => Value::U(text.parse().ok()?),
        PrimitiveKind::R4 => Value::R4(text.parse().ok()?),
        PrimitiveKind::R8 => Value::R8(text.parse().ok()?),
    })
}

/// Parses the canonical guid text forms: 32 hex digits, optionally hyphenated, optionally
/// enclosed in braces or parentheses.
fn parse_guid(raw: &str) -> Option<Guid> {
    let text = raw.trim();
    let inner = text
        .strip_prefix('{')
        .and_then(|t| t.strip_suffix('}'))
        .or_else(|| text.strip_prefix('(').and_then(|t| t.strip_suffix(')')))
        .unwrap_or(text);

    if inner.len() == 32 && inner.bytes().all(|b| b.is_ascii_hexdigit()) {
        let hyphenated = format!(
            "{}-{}-{}-{}-{}",
            &inner[..8],
            &inner[8..12],
            &inner[12..16],
            &inner[16..20],
            &inner[20..]
        );
        return Guid::try_parse(&hyphenated).ok();
    }
    Guid::try_parse(inner).ok()
}

/// Matches an enum member by name, ignoring case, or by its numeric value.
fn parse_enum(descriptor: &TypeDescriptor, raw: &str) -> Option<Value> {
    let members = descriptor.enum_members()?;
    let text = raw.trim();

    if let Some(member) = members.iter().find(|m| m.name.eq_ignore_ascii_case(text)) {
        return Some(Value::Enum {
            type_name: descriptor.name.clone(),
            member: Some(member.name.clone()),
            value: member.value,
        });
    }

    let value: i64 = text.parse().ok()?;
    enum_value(descriptor, value)
}

fn enum_value(descriptor: &TypeDescriptor, value: i64) -> Option<Value> {
    let members = descriptor.enum_members()?;
    Some(Value::Enum {
        type_name: descriptor.name.clone(),
        member: members
            .iter()
            .find(|m| m.value == value)
            .map(|m| m.name.clone()),
        value,
    })
}
