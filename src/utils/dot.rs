//! DOT format helpers for Graphviz output.

/// Escapes `s` for use inside a double-quoted DOT label.
#[must_use]
pub fn escape_dot(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            '\r' => {}
            '<' => escaped.push_str("\\<"),
            '>' => escaped.push_str("\\>"),
            '{' => escaped.push_str("\\{"),
            '}' => escaped.push_str("\\}"),
            '|' => escaped.push_str("\\|"),
            other => escaped.push(other),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_untouched() {
        assert_eq!(escape_dot("Acme.Program::Main()"), "Acme.Program::Main()");
    }

    #[test]
    fn quotes_and_backslashes() {
        assert_eq!(escape_dot("say \"hi\""), "say \\\"hi\\\"");
        assert_eq!(escape_dot("a\\b"), "a\\\\b");
    }

    #[test]
    fn newlines_and_record_characters() {
        assert_eq!(escape_dot("a\r\nb"), "a\\nb");
        assert_eq!(
            escape_dot("List<T>::Add{x|y}"),
            "List\\<T\\>::Add\\{x\\|y\\}"
        );
    }
}
