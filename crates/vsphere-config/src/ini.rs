//! Escaping for INI-style configuration values.
//!
//! The cloud config dialect reads values as double-quoted strings with
//! backslash escapes. [`escape`] produces the quoted form; distinct inputs
//! map to distinct outputs, so a conforming reader recovers the original
//! exactly.

/// Quote `s` so it parses back as a single value equal to `s`.
///
/// Backslashes, double quotes, newlines, carriage returns and tabs are
/// backslash-escaped. Everything else passes through verbatim; the
/// surrounding quotes make `;` and `#` inert.
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '\\' => out.push_str(r"\\"),
            '"' => out.push_str(r#"\""#),
            '\n' => out.push_str(r"\n"),
            '\r' => out.push_str(r"\r"),
            '\t' => out.push_str(r"\t"),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Conforming reader for the quoted form produced by [`escape`].
#[cfg(test)]
pub(crate) fn unescape(quoted: &str) -> String {
    let inner = quoted
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .expect("value is quoted");
    let mut out = String::new();
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('"') => out.push('"'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            other => panic!("unknown escape sequence: {other:?}"),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_string_stays_a_single_value() {
        assert_eq!(escape(""), r#""""#);
        assert_eq!(unescape(&escape("")), "");
    }

    #[test]
    fn quotes_and_backslashes_are_escaped() {
        assert_eq!(escape(r#"p"w"#), r#""p\"w""#);
        assert_eq!(escape(r"C:\vms"), r#""C:\\vms""#);
    }

    #[test]
    fn line_terminators_cannot_leak() {
        let escaped = escape("line1\nline2\r\ttail");
        assert!(!escaped.contains('\n'));
        assert!(!escaped.contains('\r'));
        assert_eq!(unescape(&escaped), "line1\nline2\r\ttail");
    }

    #[test]
    fn comment_characters_are_neutralized_by_quoting() {
        assert_eq!(escape("; not a comment"), r#""; not a comment""#);
        assert_eq!(escape("#neither"), r##""#neither""##);
    }

    #[test]
    fn escaping_is_injective() {
        // A literal backslash-n must not collide with a newline.
        assert_ne!(escape(r"a\nb"), escape("a\nb"));
        assert_ne!(escape(r#"""#), escape(r"\"));
        assert_ne!(escape("\t"), escape(r"\t"));
    }

    #[test]
    fn round_trips_arbitrary_values() {
        for value in [
            "plain",
            "with spaces",
            r#"quo"te"#,
            r"back\slash",
            "new\nline",
            "; #\t mix\r\n",
            "dätaçenter-ü",
            "",
        ] {
            assert_eq!(unescape(&escape(value)), value, "value: {value:?}");
        }
    }
}
