// SPDX-License-Identifier: MIT

use regex::Regex;
use std::sync::OnceLock;

/// How serious a static-analysis finding is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Worth flagging but not a reason to refuse the task on its own.
    Warning,
    /// Command is rejected outright when this finding is present.
    Error,
}

/// A single static-analysis finding against a task's command string.
#[derive(Debug, Clone)]
pub struct Finding {
    pub severity: Severity,
    pub message: String,
}

struct Rule {
    pattern: &'static str,
    severity: Severity,
    message: &'static str,
}

/// Advisory rules approximating the class of command a linter like
/// shellcheck would flag at `-S warning` or worse: destructive filesystem
/// operations, fork bombs, and "pipe a remote script into a shell".
///
/// This is intentionally a fixed, auditable rule set rather than an
/// invocation of an external linter binary — the validator is optional and
/// advisory (per spec), and a hardcoded rule set has no runtime dependency
/// on a tool being installed on the host.
const RULES: &[Rule] = &[
    Rule {
        pattern: r"rm\s+(-\w*r\w*f\w*|-\w*f\w*r\w*)\s+(/\s|/$|/\*|~(\s|$))",
        severity: Severity::Error,
        message: "recursive force-remove of root or home directory",
    },
    Rule {
        pattern: r":\s*\(\s*\)\s*\{[^}]*:\s*\|\s*:",
        severity: Severity::Error,
        message: "fork bomb",
    },
    Rule {
        pattern: r"(curl|wget)\s[^|]*\|\s*(sudo\s+)?(ba)?sh\b",
        severity: Severity::Error,
        message: "piping a remote download directly into a shell",
    },
    Rule {
        pattern: r"\bmkfs(\.\w+)?\b",
        severity: Severity::Error,
        message: "formatting a filesystem",
    },
    Rule {
        pattern: r"\bdd\b[^|;]*of=/dev/(sd|nvme|hd|xvd)",
        severity: Severity::Error,
        message: "writing directly to a block device",
    },
    Rule {
        pattern: r"chmod\s+-R\s+777\s+/(\s|$)",
        severity: Severity::Warning,
        message: "recursively world-writable root directory",
    },
];

fn compiled() -> &'static [(Regex, Severity, &'static str)] {
    static CELL: OnceLock<Vec<(Regex, Severity, &'static str)>> = OnceLock::new();
    CELL.get_or_init(|| {
        RULES
            .iter()
            .map(|r| {
                // Patterns are fixed string literals exercised by the tests below;
                // a build where one fails to compile should fail loudly, not silently
                // drop a rule.
                #[allow(clippy::expect_used)]
                let re = Regex::new(r.pattern).expect("static validator pattern is valid");
                (re, r.severity, r.message)
            })
            .collect()
    })
}

/// Run the static validator against a raw command string and report any
/// findings. An empty result means the command looks safe to this validator
/// (which, per spec, is advisory only and never a guarantee).
pub fn validate_command(command: &str) -> Vec<Finding> {
    compiled()
        .iter()
        .filter(|(re, ..)| re.is_match(command))
        .map(|(_, severity, message)| Finding {
            severity: *severity,
            message: message.to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_recursive_root_remove() {
        let findings = validate_command("rm -rf /");
        assert!(findings.iter().any(|f| f.severity == Severity::Error));
    }

    #[test]
    fn flags_fork_bomb() {
        let findings = validate_command(":(){ :|:& };:");
        assert!(!findings.is_empty());
    }

    #[test]
    fn flags_curl_pipe_bash() {
        let findings = validate_command("curl https://example.com/install.sh | bash");
        assert!(!findings.is_empty());
    }

    #[test]
    fn benign_command_has_no_findings() {
        assert!(validate_command("echo hello").is_empty());
        assert!(validate_command("for i in 1 2 3; do echo $i; sleep 1; done").is_empty());
    }
}
