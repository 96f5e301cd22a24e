use thiserror::Error;

use crate::metadata::token::Token;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

macro_rules! out_of_bounds_error {
    () => {
        crate::Error::OutOfBounds {
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, covering every failure the inspection side of this library can
/// return.
///
/// Decoding, method body parsing, metadata lookup and call graph construction all report
/// through this type. Invocation failures are not part of it: they are classified into
/// [`crate::invoke::InvocationError`] and carried inside an
/// [`crate::invoke::InvocationOutcome`] instead, because an invocation never "fails" to the
/// caller, it always produces an outcome.
///
/// # Error Categories
///
/// ## Parsing Errors
/// - [`Error::Malformed`] - Corrupted or invalid method body / bytecode
/// - [`Error::OutOfBounds`] - Attempted to read beyond the provided data
/// - [`Error::Empty`] - Empty input provided
///
/// ## Metadata Errors
/// - [`Error::UnresolvedToken`] - A metadata token could not be resolved by the loader
///
/// ## Analysis Errors
/// - [`Error::GraphError`] - Graph construction was asked to do something inconsistent
///
/// ## Other Errors
/// - [`Error::FileError`] - An I/O operation failed
/// - [`Error::Error`] - Anything else, such as a decompiler failure
///
/// # Examples
///
/// ```rust
/// use dotprobe::{Error, assembly::decode_body};
///
/// // `0x28` is `call` and needs four operand bytes that are not there
/// let decoded = decode_body(&[0x00, 0x28, 0x01], &());
/// match decoded.into_complete() {
///     Ok(instructions) => println!("{} instructions", instructions.len()),
///     Err(Error::Malformed { message, .. }) => eprintln!("truncated: {message}"),
///     Err(e) => eprintln!("other error: {e}"),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The data is damaged and could not be parsed.
    ///
    /// The error includes the source location where the malformation was detected
    /// for debugging purposes.
    ///
    /// # Fields
    ///
    /// * `message` - Detailed description of what was malformed
    /// * `file` - Source file where the error was detected
    /// * `line` - Source line where the error was detected
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// An out of bound access was attempted while parsing.
    ///
    /// Raised by [`crate::file::parser::Parser`] before any read past the end of its
    /// input, so truncated attacker data never turns into a panic.
    #[error("Out of Bound read would have occurred! - {file}:{line}")]
    OutOfBounds {
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// Provided input was empty.
    #[error("Provided input was empty")]
    Empty,

    /// I/O error.
    ///
    /// Wraps standard I/O errors, such as failing to start an invocation worker thread.
    #[error("{0}")]
    FileError(#[from] std::io::Error),

    /// Generic error for miscellaneous failures.
    #[error("{0}")]
    Error(String),

    /// A metadata token could not be resolved.
    ///
    /// Produced by [`crate::metadata::loader::TokenResolver`] implementations. The
    /// decoder never propagates it: it degrades the affected operand to
    /// [`crate::assembly::Operand::Token`] and keeps going.
    #[error("Failed to resolve token - {0}")]
    UnresolvedToken(Token),

    /// Graph operation error.
    ///
    /// Raised when an edge references a node that is not part of the graph.
    #[error("{0}")]
    GraphError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn category(error: &Error) -> &'static str {
        match error {
            Error::Malformed { .. } | Error::OutOfBounds { .. } | Error::Empty => "parsing",
            Error::UnresolvedToken(_) => "metadata",
            Error::GraphError(_) => "analysis",
            Error::FileError(_) | Error::Error(_) => "other",
        }
    }

    #[test]
    fn every_variant_is_categorized_and_displayed() {
        let errors = [
            malformed_error!("bad header {}", 3),
            out_of_bounds_error!(),
            Error::Empty,
            Error::UnresolvedToken(Token::new(0x0600_0001)),
            Error::GraphError("missing node".into()),
            Error::FileError(std::io::Error::other("no thread")),
            Error::Error("unsupported".into()),
        ];
        let categories: Vec<_> = errors.iter().map(category).collect();
        assert_eq!(
            categories,
            ["parsing", "parsing", "parsing", "metadata", "analysis", "other", "other"]
        );

        assert!(errors[0].to_string().contains("bad header 3"));
        assert!(errors[3].to_string().contains("Failed to resolve token"));
        assert_eq!(errors[5].to_string(), "no thread");
    }
}
