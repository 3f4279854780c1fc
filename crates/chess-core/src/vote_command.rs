//! Chat vote command parsing.
//!
//! A vote is the marker `m-` followed by a UCI move, anywhere in the
//! message: `"I say m-e2e4!"` votes for `e2e4`.

use std::sync::LazyLock;

use regex::Regex;

pub const VOTE_PREFIX: &str = "m-";

static VOTE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"m-([a-h][1-8][a-h][1-8][qrbn]?)").expect("vote regex"));

/// Extract the first vote from raw chat text. Case and surrounding
/// whitespace are ignored; text without the marker yields `None`.
pub fn parse_vote(raw_text: &str) -> Option<String> {
    let normalized = raw_text.trim().to_lowercase();
    VOTE_RE
        .captures(&normalized)
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str().to_string())
}
