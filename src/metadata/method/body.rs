//! Method header parsing for CIL method bodies.
//!
//! A method body as stored in a binary starts with a tiny (1 byte) or fat (12 byte) header,
//! followed by the code and, for fat headers, optional 4-byte aligned exception handling
//! sections. [`MethodBody::parse`] reads that layout; [`MethodBody::code`] returns the code
//! slice ready for [`crate::assembly::decode_body`].
//!
//! # Examples
//!
//! ```rust
//! use dotprobe::metadata::method::MethodBody;
//!
//! // tiny header announcing 2 code bytes: nop, ret
//! let raw = [0x0A, 0x00, 0x2A];
//! let body = MethodBody::parse(&raw)?;
//! assert!(!body.is_fat);
//! assert_eq!(body.code(&raw), &[0x00, 0x2A]);
//! # Ok::<(), dotprobe::Error>(())
//! ```
//!
//! # References
//! - ECMA-335 6th Edition, Partition II, Section 25.4 - Method Header Format

use crate::{
    file::parser::Parser,
    metadata::method::{ExceptionHandler, ExceptionHandlerFlags, MethodBodyFlags, SectionFlags},
    Result,
};

/// Header information of one method body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodBody {
    /// Size of the code in bytes, not counting the header
    pub size_code: usize,
    /// Size of the header in bytes
    pub size_header: usize,
    /// Token of the local variable signature. 0 == no local variables
    pub local_var_sig_token: u32,
    /// Maximum number of items on the operand stack
    pub max_stack: usize,
    /// Whether the header uses the fat layout
    pub is_fat: bool,
    /// Whether locals are zero-initialized
    pub is_init_local: bool,
    /// Exception handling clauses, in declaration order
    pub exception_handlers: Vec<ExceptionHandler>,
}

impl MethodBody {
    /// Parses the header (and exception sections) at the start of `data`.
    ///
    /// # Errors
    /// Returns [`crate::Error::Empty`] for empty input, [`crate::Error::OutOfBounds`] if the
    /// header announces more code than `data` holds and [`crate::Error::Malformed`] for an
    /// unknown header format.
    pub fn parse(data: &[u8]) -> Result<MethodBody> {
        if data.is_empty() {
            return Err(crate::Error::Empty);
        }

        let mut parser = Parser::new(data);
        let first_byte = parser.peek_byte()?;

        match MethodBodyFlags::from_bits_truncate(u16::from(first_byte & 0b11)) {
            MethodBodyFlags::TINY_FORMAT => {
                let size_code = (first_byte >> 2) as usize;
                if size_code + 1 > data.len() {
                    return Err(out_of_bounds_error!());
                }

                Ok(MethodBody {
                    size_code,
                    size_header: 1,
                    local_var_sig_token: 0,
                    max_stack: 8,
                    is_fat: false,
                    is_init_local: false,
                    exception_handlers: Vec::new(),
                })
            }
            MethodBodyFlags::FAT_FORMAT => {
                let flags_and_size = parser.read_le::<u16>()?;
                let max_stack = parser.read_le::<u16>()? as usize;
                let size_code = parser.read_le::<u32>()? as usize;
                let local_var_sig_token = parser.read_le::<u32>()?;

                let size_header = ((flags_and_size >> 12) * 4) as usize;
                if size_header < 12 {
                    return Err(malformed_error!(
                        "Fat header declares a size of {} bytes",
                        size_header
                    ));
                }

                let code_end = size_header
                    .checked_add(size_code)
                    .ok_or_else(|| out_of_bounds_error!())?;
                if code_end > data.len() {
                    return Err(out_of_bounds_error!());
                }

                let flags = MethodBodyFlags::from_bits_truncate(flags_and_size & 0x0FFF);
                let exception_handlers = if flags.contains(MethodBodyFlags::MORE_SECTS) {
                    parse_sections(data, code_end)?
                } else {
                    Vec::new()
                };

                Ok(MethodBody {
                    size_code,
                    size_header,
                    local_var_sig_token,
                    max_stack,
                    is_fat: true,
                    is_init_local: flags.contains(MethodBodyFlags::INIT_LOCALS),
                    exception_handlers,
                })
            }
            _ => Err(malformed_error!(
                "Method header is neither fat nor tiny - {:#04x}",
                first_byte
            )),
        }
    }

    /// The code bytes of this body inside the data it was parsed from.
    ///
    /// Returns an empty slice if `data` is not the slice this header was parsed from.
    #[must_use]
    pub fn code<'a>(&self, data: &'a [u8]) -> &'a [u8] {
        data.get(self.size_header..self.size())
            .unwrap_or_default()
    }

    /// Full size of header plus code
    #[must_use]
    pub fn size(&self) -> usize {
        self.size_code + self.size_header
    }
}

/// Reads exception handling sections starting at the first 4-byte boundary after `code_end`.
///
/// Sections that do not fit into `data` end the scan; the clauses read so far are kept.
fn parse_sections(data: &[u8], code_end: usize) -> Result<Vec<ExceptionHandler>> {
    let mut handlers = Vec::new();
    let mut cursor = (code_end + 3) & !3;

    while cursor + 4 <= data.len() {
        let mut parser = Parser::new(data);
        parser.seek(cursor)?;

        let section = SectionFlags::from_bits_truncate(parser.read_le::<u8>()?);
        if !section.contains(SectionFlags::EHTABLE) {
            break;
        }

        let (section_size, clause_size) = if section.contains(SectionFlags::FAT_FORMAT) {
            let low = u32::from(parser.read_le::<u16>()?);
            let high = u32::from(parser.read_le::<u8>()?);
            ((high << 16 | low) as usize, 24)
        } else {
            let size = parser.read_le::<u8>()? as usize;
            parser.advance_by(2)?;
            (size, 12)
        };

        if section_size < 4 || cursor + section_size > data.len() {
            break;
        }

        for _ in 0..(section_size - 4) / clause_size {
            let handler = if clause_size == 24 {
                ExceptionHandler {
                    #[allow(clippy::cast_possible_truncation)]
                    flags: ExceptionHandlerFlags::from_bits_truncate(
                        parser.read_le::<u32>()? as u16,
                    ),
                    try_offset: parser.read_le::<u32>()?,
                    try_length: parser.read_le::<u32>()?,
                    handler_offset: parser.read_le::<u32>()?,
                    handler_length: parser.read_le::<u32>()?,
                    class_token_or_filter: parser.read_le::<u32>()?,
                }
            } else {
                ExceptionHandler {
                    flags: ExceptionHandlerFlags::from_bits_truncate(parser.read_le::<u16>()?),
                    try_offset: u32::from(parser.read_le::<u16>()?),
                    try_length: u32::from(parser.read_le::<u8>()?),
                    handler_offset: u32::from(parser.read_le::<u16>()?),
                    handler_length: u32::from(parser.read_le::<u8>()?),
                    class_token_or_filter: parser.read_le::<u32>()?,
                }
            };
            handlers.push(handler);
        }

        if !section.contains(SectionFlags::MORE_SECTS) {
            break;
        }
        cursor = (cursor + section_size + 3) & !3;
    }

    Ok(handlers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    fn fat_header(flags: u16, max_stack: u16, code: &[u8], local_sig: u32) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(&((3u16 << 12) | flags | 0x3).to_le_bytes());
        data.extend_from_slice(&max_stack.to_le_bytes());
        data.extend_from_slice(&(code.len() as u32).to_le_bytes());
        data.extend_from_slice(&local_sig.to_le_bytes());
        data.extend_from_slice(code);
        data
    }

    #[test]
    fn tiny() {
        // ldarg.0, ldarg.1, add, ret
        let data = [0x12, 0x02, 0x03, 0x58, 0x2A];
        let body = MethodBody::parse(&data).unwrap();

        assert!(!body.is_fat);
        assert_eq!(body.size_code, 4);
        assert_eq!(body.size_header, 1);
        assert_eq!(body.size(), 5);
        assert_eq!(body.max_stack, 8);
        assert_eq!(body.code(&data), &[0x02, 0x03, 0x58, 0x2A]);
    }

    #[test]
    fn tiny_truncated() {
        // announces 4 code bytes, only 2 present
        let data = [0x12, 0x02, 0x03];
        assert!(matches!(
            MethodBody::parse(&data),
            Err(Error::OutOfBounds { .. })
        ));
    }

    #[test]
    fn fat() {
        let code = [0x00, 0x00, 0x2A];
        let data = fat_header(0x10, 4, &code, 0x1100_0002);
        let body = MethodBody::parse(&data).unwrap();

        assert!(body.is_fat);
        assert!(body.is_init_local);
        assert_eq!(body.max_stack, 4);
        assert_eq!(body.size_header, 12);
        assert_eq!(body.size_code, 3);
        assert_eq!(body.local_var_sig_token, 0x1100_0002);
        assert!(body.exception_handlers.is_empty());
        assert_eq!(body.code(&data), &code);
    }

    #[test]
    fn fat_with_small_eh_section() {
        let code = [0x00, 0x00, 0x00, 0x00, 0xDD, 0x00, 0x2A];
        let mut data = fat_header(0x08, 2, &code, 0);
        while data.len() % 4 != 0 {
            data.push(0);
        }
        // small section: kind, size, reserved
        data.extend_from_slice(&[0x01, 16, 0x00, 0x00]);
        // finally clause: flags u16, try off u16, try len u8, handler off u16, handler len u8
        data.extend_from_slice(&2u16.to_le_bytes());
        data.extend_from_slice(&0u16.to_le_bytes());
        data.push(4);
        data.extend_from_slice(&4u16.to_le_bytes());
        data.push(2);
        data.extend_from_slice(&0u32.to_le_bytes());

        let body = MethodBody::parse(&data).unwrap();
        assert_eq!(body.exception_handlers.len(), 1);

        let handler = &body.exception_handlers[0];
        assert_eq!(handler.flags, ExceptionHandlerFlags::FINALLY);
        assert_eq!(handler.try_length, 4);
        assert_eq!(handler.handler_offset, 4);
        assert!(handler.protects(3));
        assert!(!handler.protects(4));
        assert_eq!(handler.catch_type(), None);
    }

    #[test]
    fn fat_with_fat_eh_section() {
        let code = [0x00; 8];
        let mut data = fat_header(0x08, 2, &code, 0);
        // fat section: kind, 3-byte size
        data.extend_from_slice(&[0x41, 28, 0x00, 0x00]);
        for value in [0u32, 0, 4, 4, 4, 0x0100_0003] {
            data.extend_from_slice(&value.to_le_bytes());
        }

        let body = MethodBody::parse(&data).unwrap();
        assert_eq!(body.exception_handlers.len(), 1);
        assert_eq!(
            body.exception_handlers[0].catch_type().map(|t| t.value()),
            Some(0x0100_0003)
        );
    }

    #[test]
    fn fat_truncated_section_is_ignored() {
        let code = [0x2A; 4];
        let mut data = fat_header(0x08, 2, &code, 0);
        data.extend_from_slice(&[0x01, 64, 0x00, 0x00]);

        let body = MethodBody::parse(&data).unwrap();
        assert!(body.exception_handlers.is_empty());
    }

    #[test]
    fn invalid_inputs() {
        assert!(matches!(MethodBody::parse(&[]), Err(Error::Empty)));
        assert!(matches!(
            MethodBody::parse(&[0x00]),
            Err(Error::Malformed { .. })
        ));
        // fat flag but no room for the remaining header
        assert!(MethodBody::parse(&[0x03, 0x30]).is_err());
    }
}
