//! Call-trigger phrase detection.
//!
//! Assistant replies can initiate a call by announcing it in a fixed
//! sentence. The phrase must end with a period; the captured target is the
//! text between "with" and that period, which the coordinator then resolves
//! against the directory like any other query.

use std::sync::LazyLock;

use regex::Regex;

static CALL_TRIGGER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)I am going to start a video call with\s+(.+?)\.")
        .expect("call trigger pattern is valid")
});

/// Extract the call target named in `reply`, if the reply contains the
/// trigger phrase.
#[must_use]
pub fn detect_call_target(reply: &str) -> Option<&str> {
    CALL_TRIGGER
        .captures(reply)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
}
