//! Bounded formatting of captured values.

use crate::failure::panic_message;
use crate::wrapper;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use unicode_segmentation::UnicodeSegmentation;

const ELLIPSIS: &str = "...";

/// Turns an arbitrary value into a bounded, printable string.
///
/// Implementations must not panic: they run while a failure is being
/// recorded, and a panic there would replace the report with an unrelated
/// error.
pub trait ValueFormatter: Send + Sync {
    fn format(&self, value: &dyn fmt::Debug, max_len: usize) -> String;
}

/// `Debug`-based formatter that survives panicking `Debug` implementations
/// and shortens long output to `max_len` graphemes, keeping both ends.
#[derive(Debug, Clone, Copy, Default)]
pub struct SafeReprFormatter;

impl ValueFormatter for SafeReprFormatter {
    fn format(&self, value: &dyn fmt::Debug, max_len: usize) -> String {
        let repr = match panic::catch_unwind(AssertUnwindSafe(|| format!("{:?}", value))) {
            Ok(repr) => repr,
            Err(payload) => {
                wrapper::discard_last_panic();
                format!(
                    "<unprintable value: Debug implementation panicked: {}>",
                    panic_message(payload.as_ref())
                )
            }
        };
        truncate_middle(&repr, max_len)
    }
}

/// Shorten `text` to `max_len` graphemes by replacing its middle with `...`.
pub fn truncate_middle(text: &str, max_len: usize) -> String {
    let graphemes: Vec<&str> = text.graphemes(true).collect();
    if graphemes.len() <= max_len {
        return text.to_string();
    }

    let head = max_len.saturating_sub(ELLIPSIS.len()) / 2;
    let tail = max_len.saturating_sub(ELLIPSIS.len()).saturating_sub(head);

    let mut out = String::with_capacity(max_len + ELLIPSIS.len());
    out.extend(graphemes[..head].iter().copied());
    out.push_str(ELLIPSIS);
    out.extend(graphemes[graphemes.len() - tail..].iter().copied());
    out
}
