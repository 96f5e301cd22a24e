//! Seam to an external decompiler.
//!
//! Decompilation is not done by this crate. Embedders that have a decompiler plug it in
//! through [`Decompiler`]; consumers that only display the text use
//! [`decompile_or_comment`], which never fails.

use crate::{metadata::method::MethodDescriptor, Result};

/// Produces readable source text for a method.
pub trait Decompiler {
    /// Decompiles `method` into source text.
    ///
    /// # Errors
    /// Any error the decompiler reports. The text is best effort, so callers are expected
    /// to display the error rather than abort.
    fn decompile(&self, method: &MethodDescriptor) -> Result<String>;
}

/// Decompiles `method`, turning a failure into a commented error text.
///
/// ```rust
/// use dotprobe::{
///     analysis::decompiler::{decompile_or_comment, Decompiler},
///     metadata::method::MethodDescriptor,
///     Error, Result,
/// };
///
/// struct Broken;
/// impl Decompiler for Broken {
///     fn decompile(&self, _: &MethodDescriptor) -> Result<String> {
///         Err(Error::Error("unsupported construct".to_string()))
///     }
/// }
///
/// let method = MethodDescriptor::new("Acme", "Acme.P", "Main");
/// let text = decompile_or_comment(&Broken, &method);
/// assert!(text.starts_with("// "));
/// ```
pub fn decompile_or_comment<D: Decompiler + ?Sized>(
    decompiler: &D,
    method: &MethodDescriptor,
) -> String {
    match decompiler.decompile(method) {
        Ok(source) => source,
        Err(error) => {
            log::debug!("decompiling {} failed: {error}", method.display_name());
            let mut text = format!("// Failed to decompile {}\n", method.display_name());
            for line in error.to_string().lines() {
                text.push_str("// ");
                text.push_str(line);
                text.push('\n');
            }
            text
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    struct Fixed(&'static str);

    impl Decompiler for Fixed {
        fn decompile(&self, method: &MethodDescriptor) -> Result<String> {
            Ok(format!("{} {}", self.0, method.name))
        }
    }

    struct Failing;

    impl Decompiler for Failing {
        fn decompile(&self, _: &MethodDescriptor) -> Result<String> {
            Err(Error::Error("line one\nline two".to_string()))
        }
    }

    #[test]
    fn passes_source_through() {
        let method = MethodDescriptor::new("Acme", "Acme.P", "Run");
        assert_eq!(decompile_or_comment(&Fixed("void"), &method), "void Run");
    }

    #[test]
    fn comments_out_every_error_line() {
        let method = MethodDescriptor::new("Acme", "Acme.P", "Run");
        let text = decompile_or_comment(&Failing, &method);

        assert!(text.lines().all(|line| line.starts_with("// ")));
        assert!(text.contains("Acme.P::Run()"));
        assert!(text.contains("// line two"));
    }
}
