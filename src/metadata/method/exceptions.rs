//! Exception handling clauses attached to a fat method body.

use bitflags::bitflags;

use crate::metadata::token::Token;

bitflags! {
    /// Kind of an exception handling clause (II.25.4.6).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ExceptionHandlerFlags: u16 {
        /// Typed `catch` clause
        const EXCEPTION = 0x0000;
        /// Filter clause
        const FILTER = 0x0001;
        /// `finally` clause
        const FINALLY = 0x0002;
        /// `fault` clause
        const FAULT = 0x0004;
    }
}

/// One try/handler region of a method body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExceptionHandler {
    /// Clause kind
    pub flags: ExceptionHandlerFlags,
    /// Offset of the protected region, relative to the start of the code
    pub try_offset: u32,
    /// Length of the protected region
    pub try_length: u32,
    /// Offset of the handler, relative to the start of the code
    pub handler_offset: u32,
    /// Length of the handler
    pub handler_length: u32,
    /// For typed catch clauses the class token, for filters the filter offset.
    pub class_token_or_filter: u32,
}

impl ExceptionHandler {
    /// The catch type token for typed catch clauses.
    #[must_use]
    pub fn catch_type(&self) -> Option<Token> {
        if self.flags.bits() == ExceptionHandlerFlags::EXCEPTION.bits() {
            Some(Token::new(self.class_token_or_filter))
        } else {
            None
        }
    }

    /// The filter offset for filter clauses.
    #[must_use]
    pub fn filter_offset(&self) -> Option<u32> {
        self.flags
            .contains(ExceptionHandlerFlags::FILTER)
            .then_some(self.class_token_or_filter)
    }

    /// Whether `offset` lies inside the protected region.
    #[must_use]
    pub fn protects(&self, offset: u32) -> bool {
        offset >= self.try_offset && offset - self.try_offset < self.try_length
    }
}
