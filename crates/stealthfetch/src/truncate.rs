//! Uniform size bound for every string leaving the crate

/// Bound `value` to at most `max_chars` characters.
///
/// Oversized input keeps its first `max_chars` characters (trailing
/// whitespace trimmed) followed by a newline and a visible marker. A zero
/// limit yields the marker alone, whatever the input.
pub fn truncate(value: &str, max_chars: usize) -> String {
    if max_chars == 0 {
        return "[truncated at 0 chars]".to_string();
    }

    match value.char_indices().nth(max_chars) {
        None => value.to_string(),
        Some((cut, _)) => format!(
            "{}\n[truncated at {} chars]",
            value[..cut].trim_end(),
            max_chars
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_limit_is_constant_marker() {
        assert_eq!(truncate("anything", 0), "[truncated at 0 chars]");
        assert_eq!(truncate("", 0), "[truncated at 0 chars]");
    }

    #[test]
    fn test_short_value_unchanged() {
        assert_eq!(truncate("hello", 5), "hello");
        assert_eq!(truncate("hello", 100), "hello");
        assert_eq!(truncate("", 1), "");
    }

    #[test]
    fn test_long_value_marked() {
        let out = truncate("abcdefghij", 4);
        assert_eq!(out, "abcd\n[truncated at 4 chars]");
    }

    #[test]
    fn test_trailing_whitespace_trimmed_before_marker() {
        let out = truncate("abc   defg", 5);
        assert_eq!(out, "abc\n[truncated at 5 chars]");
    }

    #[test]
    fn test_counts_characters_not_bytes() {
        let value = "héllo wörld";
        assert_eq!(truncate(value, 11), value);
        assert_eq!(truncate(value, 5), "héllo\n[truncated at 5 chars]");
    }
}
