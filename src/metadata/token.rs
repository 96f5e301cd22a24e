//! Metadata tokens as they appear inside CIL operands.
//!
//! A token is a 32-bit value whose high byte selects a metadata table (or the user string
//! heap) and whose low 24 bits are a row index or heap offset. The decoder hands tokens to a
//! [`crate::metadata::loader::TokenResolver`]; [`TokenKind`] tells it which kind of lookup
//! applies.

use std::fmt;

/// A metadata token: table selector in the high byte, row / heap offset in the low 24 bits.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Token(pub u32);

impl Token {
    /// Creates a token from its raw 32-bit encoding.
    #[must_use]
    pub fn new(value: u32) -> Self {
        Token(value)
    }

    /// The raw 32-bit encoding.
    #[must_use]
    pub fn value(&self) -> u32 {
        self.0
    }

    /// The table selector (high byte).
    #[must_use]
    pub fn table(&self) -> u8 {
        (self.0 >> 24) as u8
    }

    /// The row index or heap offset (low 24 bits).
    #[must_use]
    pub fn row(&self) -> u32 {
        self.0 & 0x00FF_FFFF
    }

    /// Row 0 never names a real entry.
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.row() == 0
    }

    /// Classifies the token by its table selector.
    #[must_use]
    pub fn kind(&self) -> TokenKind {
        TokenKind::from_table(self.table())
    }
}

impl From<u32> for Token {
    fn from(value: u32) -> Self {
        Token(value)
    }
}

impl From<Token> for u32 {
    fn from(token: Token) -> Self {
        token.0
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Token(0x{:08x}, {:?}, row: {})", self.0, self.kind(), self.row())
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.0)
    }
}

/// The table (or heap) a [`Token`] points into, limited to what CIL operands reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// `TypeRef` (0x01)
    TypeRef,
    /// `TypeDef` (0x02)
    TypeDef,
    /// `Field` (0x04)
    Field,
    /// `MethodDef` (0x06)
    MethodDef,
    /// `MemberRef` (0x0A), either a method or a field on another type
    MemberRef,
    /// `StandAloneSig` (0x11), used by `calli`
    StandAloneSig,
    /// `TypeSpec` (0x1B)
    TypeSpec,
    /// `MethodSpec` (0x2B), a generic method instantiation
    MethodSpec,
    /// User string heap (0x70), used by `ldstr`
    UserString,
    /// Anything else
    Other(u8),
}

impl TokenKind {
    /// Maps a table selector byte onto the kinds CIL operands use.
    #[must_use]
    pub fn from_table(table: u8) -> Self {
        match table {
            0x01 => TokenKind::TypeRef,
            0x02 => TokenKind::TypeDef,
            0x04 => TokenKind::Field,
            0x06 => TokenKind::MethodDef,
            0x0A => TokenKind::MemberRef,
            0x11 => TokenKind::StandAloneSig,
            0x1B => TokenKind::TypeSpec,
            0x2B => TokenKind::MethodSpec,
            0x70 => TokenKind::UserString,
            other => TokenKind::Other(other),
        }
    }

    /// Whether a token of this kind can name a method.
    #[must_use]
    pub fn may_be_method(&self) -> bool {
        matches!(
            self,
            TokenKind::MethodDef | TokenKind::MemberRef | TokenKind::MethodSpec
        )
    }
}
