// SPDX-License-Identifier: MIT

use thiserror::Error;

/// A command string failed to split into shell words.
#[derive(Debug, Error)]
#[error("malformed command: {reason}")]
pub struct ParseError {
    pub reason: String,
}

/// Split a task's command string into words, the same way a POSIX shell
/// would before word-splitting and expansion. This is a syntax check only —
/// it does not execute anything and does not expand variables or globs.
///
/// An unterminated quote is the typical failure mode (`echo "unterminated`).
pub fn parse_command(command: &str) -> Result<Vec<String>, ParseError> {
    shell_words::split(command).map_err(|e| ParseError {
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_simple_command() {
        let words = parse_command("echo hello world").unwrap();
        assert_eq!(words, vec!["echo", "hello", "world"]);
    }

    #[test]
    fn rejects_unterminated_quote() {
        let err = parse_command("echo \"unterminated").unwrap_err();
        assert!(err.reason.to_lowercase().contains("quote") || !err.reason.is_empty());
    }

    #[test]
    fn handles_quoted_redirection_and_pipes_as_opaque_words() {
        // Word-splitting doesn't interpret shell operators; that's bash's job
        // at `bash -c` spawn time. We only check that it's splittable.
        let words = parse_command("sh -c 'echo a; echo b >&2; exit 3'").unwrap();
        assert_eq!(words, vec!["sh", "-c", "echo a; echo b >&2; exit 3"]);
    }
}
