//! Polling cursor for long-lived streaming responses.
//!
//! Each tick reads the whole partial response, remembers how much of it has
//! been seen, and delivers the second-to-last line. The last element of the
//! split may still be mid-write, so it is only delivered once a later line
//! terminates it. A line equal to the previous delivery is skipped.

use std::sync::LazyLock;

use regex::Regex;

static LINE_BREAKS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\r\n]+").expect("line break pattern is valid"));

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CometCursor {
    last_line: Option<String>,
    flushed: usize,
}

impl CometCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run one tick against the current partial text. Returns the line to
    /// deliver, if any.
    pub fn advance(&mut self, text: &str) -> Option<String> {
        self.flushed = text.len();
        let mut lines: Vec<&str> = LINE_BREAKS.split(text).collect();
        lines.pop()?;
        let candidate = lines.pop().filter(|line| !line.is_empty())?;
        if self.last_line.as_deref() == Some(candidate) {
            return None;
        }
        self.last_line = Some(candidate.to_string());
        self.last_line.clone()
    }

    /// Text that arrived after the last tick.
    pub fn tail<'a>(&self, full: &'a str) -> &'a str {
        full.get(self.flushed..).unwrap_or("")
    }
}
