//! FTP Command parsing
//!
//! Splits a raw control-channel line into its verb and argument.

/// A control line split at its first space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedLine {
    pub verb: Option<String>,
    pub value: String,
}

/// Splits `line` into verb and value.
///
/// The line is trimmed first; an empty line has no verb. The value is
/// everything after the first space and is empty when there is none.
pub fn parse(line: &str) -> ParsedLine {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return ParsedLine {
            verb: None,
            value: String::new(),
        };
    }

    match trimmed.split_once(' ') {
        Some((verb, value)) => ParsedLine {
            verb: Some(verb.to_string()),
            value: value.to_string(),
        },
        None => ParsedLine {
            verb: Some(trimmed.to_string()),
            value: String::new(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parts(line: &str) -> (Option<String>, String) {
        let parsed = parse(line);
        (parsed.verb, parsed.value)
    }

    #[test]
    fn splits_on_first_space() {
        assert_eq!(parts("LIST -a"), (Some("LIST".into()), "-a".into()));
        assert_eq!(
            parts("STOR my file.txt"),
            (Some("STOR".into()), "my file.txt".into())
        );
    }

    #[test]
    fn blank_line_has_no_verb() {
        assert_eq!(parts("   "), (None, String::new()));
        assert_eq!(parts(""), (None, String::new()));
        assert_eq!(parts("\r\n"), (None, String::new()));
    }

    #[test]
    fn bare_verb_has_empty_value() {
        assert_eq!(parts("QUIT"), (Some("QUIT".into()), String::new()));
        assert_eq!(parts("PWD\r\n"), (Some("PWD".into()), String::new()));
        assert_eq!(parts("  CDUP  "), (Some("CDUP".into()), String::new()));
    }
}
