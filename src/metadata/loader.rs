//! The seam between this crate and whatever loaded the binary.
//!
//! Loading and unloading binaries is not this crate's business. A loader hands over what it
//! already parsed through three traits:
//!
//! - [`TokenResolver`] turns operand tokens into strings and member identities while decoding,
//! - [`TypeResolver`] supplies [`TypeDescriptor`]s to the parameter and instance synthesizers,
//! - [`AssemblyView`] enumerates the methods of one binary and hands out their bodies.
//!
//! [`InMemoryAssembly`] implements all three from explicitly registered data and is what the
//! tests and benchmarks of this crate run against.

use std::{borrow::Cow, collections::HashMap, fmt, sync::Arc};

use crate::{
    metadata::{
        method::{MethodBody, MethodDescriptor, MethodId},
        token::Token,
        typesystem::{TypeDescriptor, TypeSig},
    },
    Error, Result,
};

/// A resolved member referenced by an instruction operand.
#[derive(Debug, Clone, PartialEq)]
pub enum MemberRef {
    /// A method (`call`, `callvirt`, `newobj`, `ldftn`, ...)
    Method(Arc<MethodDescriptor>),
    /// A field (`ldfld`, `stsfld`, ...)
    Field {
        /// Fully qualified name of the declaring type
        declaring_type: String,
        /// Field name
        name: String,
        /// Field type
        ty: TypeSig,
    },
    /// A type (`newarr`, `box`, `castclass`, `ldtoken`, ...)
    Type(TypeSig),
}

impl MemberRef {
    /// The method, if this references one.
    #[must_use]
    pub fn as_method(&self) -> Option<&Arc<MethodDescriptor>> {
        match self {
            MemberRef::Method(method) => Some(method),
            _ => None,
        }
    }
}

impl fmt::Display for MemberRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemberRef::Method(method) => f.write_str(&method.display_name()),
            MemberRef::Field {
                declaring_type,
                name,
                ty,
            } => write!(f, "{ty} {declaring_type}::{name}"),
            MemberRef::Type(ty) => write!(f, "{ty}"),
        }
    }
}

/// Resolves metadata tokens found in instruction operands.
///
/// Failures are expected for hostile or partially loaded binaries; the decoder absorbs them
/// per operand.
pub trait TokenResolver {
    /// Resolves a user string token (`ldstr`).
    ///
    /// # Errors
    /// Returns [`Error::UnresolvedToken`] if the token does not name a user string.
    fn resolve_string(&self, token: Token) -> Result<String>;

    /// Resolves a method, field or type token.
    ///
    /// # Errors
    /// Returns [`Error::UnresolvedToken`] if the token does not name a known member.
    fn resolve_member(&self, token: Token) -> Result<MemberRef>;
}

/// Resolves nothing; every token stays opaque.
impl TokenResolver for () {
    fn resolve_string(&self, token: Token) -> Result<String> {
        Err(Error::UnresolvedToken(token))
    }

    fn resolve_member(&self, token: Token) -> Result<MemberRef> {
        Err(Error::UnresolvedToken(token))
    }
}

/// Supplies descriptors for named types.
pub trait TypeResolver: Send + Sync {
    /// Looks a type up by its fully qualified name.
    fn find_type(&self, name: &str) -> Option<Arc<TypeDescriptor>>;
}

/// One loaded binary, as far as inspection is concerned.
pub trait AssemblyView: TokenResolver + TypeResolver {
    /// Name of the binary. Methods whose [`MethodDescriptor::assembly`] equals it are declared
    /// inside it.
    fn name(&self) -> &str;

    /// Every method declared in this binary.
    fn methods(&self) -> Vec<Arc<MethodDescriptor>>;

    /// The CIL code of a method (without method header), if the loader has one.
    fn method_body(&self, method: &MethodDescriptor) -> Option<Cow<'_, [u8]>>;
}

/// An [`AssemblyView`] assembled from explicitly registered methods, bodies, strings, members
/// and types.
///
/// ```rust
/// use dotprobe::metadata::{
///     loader::{AssemblyView, InMemoryAssembly},
///     method::MethodDescriptor,
///     token::Token,
/// };
///
/// let mut assembly = InMemoryAssembly::new("Acme");
/// let main = assembly.add_method(
///     MethodDescriptor::new("Acme", "Acme.Program", "Main").with_token(Token::new(0x0600_0001)),
///     vec![0x00, 0x2A],
/// );
///
/// assert_eq!(assembly.methods().len(), 1);
/// assert_eq!(assembly.method_body(&main).as_deref(), Some(&[0x00, 0x2A][..]));
/// ```
#[derive(Debug, Default)]
pub struct InMemoryAssembly {
    name: String,
    methods: Vec<Arc<MethodDescriptor>>,
    bodies: HashMap<MethodId, Vec<u8>>,
    strings: HashMap<Token, String>,
    members: HashMap<Token, MemberRef>,
    types: HashMap<String, Arc<TypeDescriptor>>,
}

impl InMemoryAssembly {
    /// An empty binary called `name`.
    #[must_use]
    pub fn new(name: &str) -> Self {
        InMemoryAssembly {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Registers a method declared in this binary together with its CIL code.
    ///
    /// If the descriptor carries a token, the token also resolves to the method.
    pub fn add_method(&mut self, method: MethodDescriptor, code: Vec<u8>) -> Arc<MethodDescriptor> {
        let method = self.register(method);
        self.bodies.insert(method.id(), code);
        method
    }

    /// Registers a method declared in this binary from raw body bytes that start with a
    /// method header.
    ///
    /// # Errors
    /// Returns the header parse error if `raw` does not start with a valid header.
    pub fn add_method_with_header(
        &mut self,
        method: MethodDescriptor,
        raw: &[u8],
    ) -> Result<Arc<MethodDescriptor>> {
        let body = MethodBody::parse(raw)?;
        Ok(self.add_method(method, body.code(raw).to_vec()))
    }

    /// Registers a method declared in this binary that has no body (abstract, native, ...).
    ///
    /// The registered descriptor always reports `has_body == false`.
    pub fn add_bodiless_method(&mut self, method: MethodDescriptor) -> Arc<MethodDescriptor> {
        self.register(method.without_body())
    }

    /// Registers a method declared elsewhere, reachable only through `token`.
    ///
    /// This binary cannot supply its body, so the registered descriptor reports
    /// `has_body == false`.
    pub fn add_external_method(
        &mut self,
        token: Token,
        method: MethodDescriptor,
    ) -> Arc<MethodDescriptor> {
        let method = Arc::new(method.without_body());
        self.members
            .insert(token, MemberRef::Method(Arc::clone(&method)));
        method
    }

    /// Registers a user string.
    pub fn add_string(&mut self, token: Token, value: &str) {
        self.strings.insert(token, value.to_string());
    }

    /// Registers an arbitrary member reference.
    pub fn add_member(&mut self, token: Token, member: MemberRef) {
        self.members.insert(token, member);
    }

    /// Registers a type.
    pub fn add_type(&mut self, ty: TypeDescriptor) -> Arc<TypeDescriptor> {
        let ty = Arc::new(ty);
        self.types.insert(ty.name.clone(), Arc::clone(&ty));
        ty
    }

    fn register(&mut self, method: MethodDescriptor) -> Arc<MethodDescriptor> {
        let method = Arc::new(method);
        if let Some(token) = method.token {
            self.members
                .insert(token, MemberRef::Method(Arc::clone(&method)));
        }
        if method.assembly == self.name {
            self.methods.push(Arc::clone(&method));
        }
        method
    }
}

impl TokenResolver for InMemoryAssembly {
    fn resolve_string(&self, token: Token) -> Result<String> {
        self.strings
            .get(&token)
            .cloned()
            .ok_or(Error::UnresolvedToken(token))
    }

    fn resolve_member(&self, token: Token) -> Result<MemberRef> {
        self.members
            .get(&token)
            .cloned()
            .ok_or(Error::UnresolvedToken(token))
    }
}

impl TypeResolver for InMemoryAssembly {
    fn find_type(&self, name: &str) -> Option<Arc<TypeDescriptor>> {
        self.types.get(name).cloned()
    }
}

impl AssemblyView for InMemoryAssembly {
    fn name(&self) -> &str {
        &self.name
    }

    fn methods(&self) -> Vec<Arc<MethodDescriptor>> {
        self.methods.clone()
    }

    fn method_body(&self, method: &MethodDescriptor) -> Option<Cow<'_, [u8]>> {
        self.bodies
            .get(&method.id())
            .map(|code| Cow::Borrowed(code.as_slice()))
    }
}
