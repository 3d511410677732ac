//! Escaping for ffmpeg's filtergraph sub-language.
//!
//! Arguments reach ffmpeg without a shell, so shell metacharacters are inert.
//! Text placed inside a filter description is still parsed twice by ffmpeg:
//! once when the filtergraph is split into filters, and once when a filter's
//! option string is split into `key=value` pairs. Caller text must be escaped
//! for both levels, innermost first.

/// Escape a value for a filter option string (`key=value:key=value`).
///
/// ```
/// use clipforged_av::escape::escape_option_value;
///
/// assert_eq!(escape_option_value("a:b"), r"a\:b");
/// assert_eq!(escape_option_value("it's"), r"it\'s");
/// ```
pub fn escape_option_value(value: &str) -> String {
    escape_chars(value, &['\\', '\'', ':'])
}

/// Escape a filter description for inclusion in a filtergraph.
///
/// ```
/// use clipforged_av::escape::escape_filtergraph;
///
/// assert_eq!(escape_filtergraph("a,b;c"), r"a\,b\;c");
/// assert_eq!(escape_filtergraph("[out]"), r"\[out\]");
/// ```
pub fn escape_filtergraph(description: &str) -> String {
    escape_chars(description, &['\\', '\'', '[', ']', ',', ';'])
}

/// Escape caller text destined for a filter option inside a filtergraph.
///
/// ```
/// use clipforged_av::escape::escape_filter_text;
///
/// assert_eq!(escape_filter_text("Hello, world"), r"Hello\, world");
/// ```
pub fn escape_filter_text(text: &str) -> String {
    escape_filtergraph(&escape_option_value(text))
}

fn escape_chars(input: &str, special: &[char]) -> String {
    let mut out = String::with_capacity(input.len() + 8);
    for c in input.chars() {
        if special.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_level_escaping_matches_ffmpeg_documentation() {
        // Worked example from the ffmpeg filtergraph escaping notes.
        let text = "this is a 'string': may contain one, or more, special characters";
        assert_eq!(
            escape_option_value(text),
            r"this is a \'string\'\: may contain one, or more, special characters"
        );
        assert_eq!(
            escape_filter_text(text),
            r"this is a \\\'string\\\'\\: may contain one\, or more\, special characters"
        );
    }

    #[test]
    fn test_backslash_escaped_at_each_level() {
        assert_eq!(escape_option_value(r"a\b"), r"a\\b");
        assert_eq!(escape_filter_text(r"a\b"), r"a\\\\b");
    }

    #[test]
    fn test_shell_metacharacters_survive_literally() {
        let text = r#"ignored"; rm -rf /; echo ""#;
        let escaped = escape_filter_text(text);
        assert_eq!(escaped, r#"ignored"\; rm -rf /\; echo ""#);
        assert!(!escaped.contains('\n'));
    }

    #[test]
    fn test_plain_text_untouched() {
        assert_eq!(escape_filter_text("TOWSIF AKTAR"), "TOWSIF AKTAR");
        assert_eq!(escape_filter_text(""), "");
    }
}
