//! Cursor-based reader over a method body.
//!
//! [`Parser`] keeps a position inside a byte slice and validates every read against the
//! remaining length. Both the method header parser and the instruction decoder drive one.
//!
//! # Examples
//!
//! ```rust
//! use dotprobe::Parser;
//!
//! let data = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08];
//! let mut parser = Parser::new(&data);
//!
//! let first = parser.read_le::<u32>()?;
//! assert_eq!(first, 0x04030201);
//!
//! parser.seek(6)?;
//! assert_eq!(parser.read_le::<u16>()?, 0x0807);
//! assert!(!parser.has_more_data());
//! # Ok::<(), dotprobe::Error>(())
//! ```

use crate::{
    file::io::{read_le_at, CilIO},
    metadata::token::Token,
    Result,
};

/// A bounds-checked little-endian cursor over a byte slice.
pub struct Parser<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> Parser<'a> {
    /// Creates a parser positioned at the start of `data`.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Parser { data, position: 0 }
    }

    /// Total length of the underlying data.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the underlying data is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Whether the cursor has not yet reached the end.
    #[must_use]
    pub fn has_more_data(&self) -> bool {
        self.position < self.data.len()
    }

    /// Bytes left between the cursor and the end.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.position)
    }

    /// Moves the cursor to `pos`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if `pos` is not inside the data.
    pub fn seek(&mut self, pos: usize) -> Result<()> {
        if pos >= self.data.len() {
            return Err(out_of_bounds_error!());
        }

        self.position = pos;
        Ok(())
    }

    /// Moves the cursor forward by `step` bytes. Advancing exactly to the end is allowed.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if that would move past the end.
    pub fn advance_by(&mut self, step: usize) -> Result<()> {
        match self.position.checked_add(step) {
            Some(end) if end <= self.data.len() => {
                self.position = end;
                Ok(())
            }
            _ => Err(out_of_bounds_error!()),
        }
    }

    /// Current cursor position.
    #[must_use]
    pub fn pos(&self) -> usize {
        self.position
    }

    /// The full underlying data.
    #[must_use]
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Returns the byte at the cursor without consuming it.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] at the end of the data.
    pub fn peek_byte(&self) -> Result<u8> {
        self.data
            .get(self.position)
            .copied()
            .ok_or_else(|| out_of_bounds_error!())
    }

    /// Reads a little-endian `T` and advances past it.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if not enough data remains.
    pub fn read_le<T: CilIO>(&mut self) -> Result<T> {
        read_le_at::<T>(self.data, &mut self.position)
    }

    /// Reads a raw 4-byte metadata token.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if not enough data remains.
    pub fn read_token(&mut self) -> Result<Token> {
        Ok(Token::new(self.read_le::<u32>()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_navigation() {
        let data = [0x10, 0x20, 0x30, 0x40];
        let mut parser = Parser::new(&data);

        assert_eq!(parser.len(), 4);
        assert_eq!(parser.remaining(), 4);
        assert_eq!(parser.peek_byte().unwrap(), 0x10);
        assert_eq!(parser.pos(), 0);

        parser.advance_by(3).unwrap();
        assert_eq!(parser.read_le::<u8>().unwrap(), 0x40);
        assert!(!parser.has_more_data());
        assert!(parser.peek_byte().is_err());

        parser.seek(1).unwrap();
        assert_eq!(parser.read_le::<u16>().unwrap(), 0x3020);
        assert!(parser.seek(4).is_err());
    }

    #[test]
    fn test_advance_to_end_allowed() {
        let data = [0u8; 8];
        let mut parser = Parser::new(&data);

        parser.advance_by(8).unwrap();
        assert_eq!(parser.remaining(), 0);
        assert!(parser.advance_by(1).is_err());
        assert!(parser.advance_by(usize::MAX).is_err());
    }

    #[test]
    fn test_read_token() {
        let data = [0x01, 0x00, 0x00, 0x0A];
        let mut parser = Parser::new(&data);

        let token = parser.read_token().unwrap();
        assert_eq!(token.value(), 0x0A00_0001);
        assert!(parser.read_token().is_err());
    }

    #[test]
    fn test_empty() {
        let parser = Parser::new(&[]);
        assert!(parser.is_empty());
        assert!(!parser.has_more_data());
    }
}
