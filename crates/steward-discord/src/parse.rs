//! Command text parsing. Pure, total functions — defined for all inputs,
//! including the empty string.

/// Remove one leading prefix character. Text that does not start with the
/// prefix is returned unchanged.
pub fn strip_prefix(text: &str, prefix: char) -> &str {
    text.strip_prefix(prefix).unwrap_or(text)
}

/// Split prefix-stripped text into the command token and the argument
/// remainder. The token match downstream is case-sensitive.
pub fn split_command(text: &str) -> (&str, &str) {
    let text = text.trim_start();
    match text.split_once(char::is_whitespace) {
        Some((token, rest)) => (token, rest.trim()),
        None => (text, ""),
    }
}

/// The first whitespace-delimited segment of prefix-stripped text.
pub fn command_token(text: &str) -> &str {
    split_command(text).0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_removes_one_prefix_char() {
        assert_eq!(strip_prefix("!lvl", '!'), "lvl");
        assert_eq!(strip_prefix("!!lvl", '!'), "!lvl");
    }

    #[test]
    fn strip_leaves_unprefixed_text() {
        assert_eq!(strip_prefix("lvl", '!'), "lvl");
    }

    #[test]
    fn strip_of_empty_is_empty() {
        assert_eq!(strip_prefix("", '!'), "");
    }

    #[test]
    fn token_is_first_segment() {
        assert_eq!(command_token("define hug a hug for %user%"), "define");
        assert_eq!(command_token("lvl"), "lvl");
    }

    #[test]
    fn token_of_empty_or_blank_is_empty() {
        assert_eq!(command_token(""), "");
        assert_eq!(command_token("   "), "");
    }

    #[test]
    fn token_is_case_sensitive_as_extracted() {
        assert_eq!(command_token("Lvl"), "Lvl");
    }

    #[test]
    fn split_trims_argument_remainder() {
        assert_eq!(split_command("say   hello world "), ("say", "hello world"));
        assert_eq!(split_command(" lvl"), ("lvl", ""));
    }
}
