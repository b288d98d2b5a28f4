//! Classification of agent replies under the build verification protocol.
//!
//! The agent is asked to answer `OK` when the build succeeds (or the project is
//! not buildable) and `ERROR:` followed by the build output otherwise. This is
//! the only place that interprets those sentinels.

use std::sync::LazyLock;

use regex::Regex;

use crate::core::types::BuildVerdict;

pub const ERROR_SENTINEL: &str = "ERROR:";
pub const EMPTY_REPLY_DETAIL: &str = "Agent returned empty output";

static OK_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bOK\b").expect("ok pattern should be valid"));

/// Classify the combined reply text of one agent invocation.
///
/// - `ERROR:` anywhere (case-insensitive) wins: the trimmed text after the
///   first occurrence is the detail, or the whole reply when nothing follows.
/// - Otherwise a standalone `OK` word means success.
/// - Anything else, including blank replies, is a failure.
pub fn classify_build_reply(reply: &str) -> BuildVerdict {
    let normalized = reply.trim();
    if normalized.is_empty() {
        return BuildVerdict::Failure {
            detail: EMPTY_REPLY_DETAIL.to_string(),
        };
    }

    // ASCII lowercasing keeps byte offsets aligned with `normalized`.
    let folded = normalized.to_ascii_lowercase();
    let sentinel = ERROR_SENTINEL.to_ascii_lowercase();
    if let Some(index) = folded.find(&sentinel) {
        let detail = normalized[index + sentinel.len()..].trim();
        let detail = if detail.is_empty() { reply } else { detail };
        return BuildVerdict::Failure {
            detail: detail.to_string(),
        };
    }

    if OK_WORD.is_match(normalized) {
        return BuildVerdict::Success;
    }

    BuildVerdict::Failure {
        detail: reply.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure(detail: &str) -> BuildVerdict {
        BuildVerdict::Failure {
            detail: detail.to_string(),
        }
    }

    #[test]
    fn bare_ok_is_success() {
        assert_eq!(classify_build_reply("OK"), BuildVerdict::Success);
        assert_eq!(classify_build_reply("  ok\n"), BuildVerdict::Success);
    }

    #[test]
    fn error_prefix_extracts_trailing_detail() {
        assert_eq!(classify_build_reply("error: disk full"), failure("disk full"));
        assert_eq!(
            classify_build_reply("Ran cargo build.\nERROR:\n  src/lib.rs:3 missing ;"),
            failure("src/lib.rs:3 missing ;")
        );
    }

    #[test]
    fn error_wins_over_ok() {
        assert_eq!(
            classify_build_reply("OK so far, then ERROR: tests failed"),
            failure("tests failed")
        );
    }

    #[test]
    fn bare_error_prefix_uses_whole_reply() {
        assert_eq!(classify_build_reply("ERROR:"), failure("ERROR:"));
    }

    #[test]
    fn ok_must_be_a_standalone_word() {
        assert_eq!(
            classify_build_reply("the OK button was clicked"),
            BuildVerdict::Success
        );
        assert_eq!(classify_build_reply("errorbook"), failure("errorbook"));
        assert_eq!(
            classify_build_reply("look at this book"),
            failure("look at this book")
        );
    }

    #[test]
    fn blank_reply_is_failure() {
        assert_eq!(classify_build_reply(" \n "), failure(EMPTY_REPLY_DETAIL));
    }
}
