//! Prompt sanitization and JSON string escaping.
//!
//! Outbound prompts pass through two independent steps:
//!
//! 1. [`SanitizerPipeline::sanitize`] runs caller-supplied [`PromptFilter`]s in
//!    registration order. Any filter may veto the prompt, which turns the
//!    result into an empty string.
//! 2. [`json_escape`] makes the result safe to embed between the quotes of a
//!    JSON string literal.

use parking_lot::RwLock;
use std::borrow::Cow;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Escape `text` so it can be placed inside a JSON string literal.
///
/// Backslash, double quote, slash, backspace, form feed, newline, carriage
/// return and tab get their two-character escapes. The single quote and any
/// other control character are written as `\u00XX`, which every JSON parser
/// accepts. Returns the input unchanged when nothing needs escaping.
pub fn json_escape(text: &str) -> Cow<'_, str> {
    let Some(first) = text.find(needs_escape) else {
        return Cow::Borrowed(text);
    };

    let mut out = String::with_capacity(text.len() + 8);
    out.push_str(&text[..first]);
    for c in text[first..].chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '/' => out.push_str("\\/"),
            '\u{08}' => out.push_str("\\b"),
            '\u{0C}' => out.push_str("\\f"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\'' => out.push_str("\\u0027"),
            c if c.is_control() && (c as u32) < 0x20 => {
                out.push_str(&format!("\\u{:04x}", c as u32));
            }
            c => out.push(c),
        }
    }
    Cow::Owned(out)
}

fn needs_escape(c: char) -> bool {
    matches!(c, '\\' | '"' | '/' | '\'') || (c as u32) < 0x20
}

/// Result of running one filter over a prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Keep going with the (possibly rewritten) text.
    Pass(String),
    /// Drop the prompt.
    Veto,
}

/// A pluggable prompt filter, e.g. a profanity or PII check.
pub trait PromptFilter: Send + Sync {
    /// Inspect and optionally rewrite the prompt.
    fn filter(&self, prompt: &str) -> Verdict;
}

impl<F> PromptFilter for F
where
    F: Fn(&str) -> Verdict + Send + Sync,
{
    fn filter(&self, prompt: &str) -> Verdict {
        self(prompt)
    }
}

/// Handle returned when a filter is registered, used to remove it again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FilterId(u64);

/// Ordered list of prompt filters owned by a session.
#[derive(Default)]
pub struct SanitizerPipeline {
    filters: RwLock<Vec<(FilterId, Arc<dyn PromptFilter>)>>,
    next_id: AtomicU64,
}

impl SanitizerPipeline {
    /// Create an empty pipeline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a filter. Filters run in the order they were added.
    pub fn add_filter(&self, filter: impl PromptFilter + 'static) -> FilterId {
        let id = FilterId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.filters.write().push((id, Arc::new(filter)));
        id
    }

    /// Remove a filter. Returns `false` if it was not registered.
    pub fn remove_filter(&self, id: FilterId) -> bool {
        let mut filters = self.filters.write();
        let before = filters.len();
        filters.retain(|(fid, _)| *fid != id);
        filters.len() != before
    }

    /// Number of registered filters.
    pub fn len(&self) -> usize {
        self.filters.read().len()
    }

    /// Whether no filters are registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run the prompt through every filter.
    ///
    /// Blank input returns an empty string without consulting the filters.
    /// The first [`Verdict::Veto`] stops the pipeline and also yields an
    /// empty string.
    pub fn sanitize(&self, prompt: &str) -> String {
        if prompt.trim().is_empty() {
            return String::new();
        }

        let filters: Vec<Arc<dyn PromptFilter>> =
            self.filters.read().iter().map(|(_, f)| Arc::clone(f)).collect();

        let mut current = prompt.to_string();
        for (index, filter) in filters.into_iter().enumerate() {
            match filter.filter(&current) {
                Verdict::Pass(next) => current = next,
                Verdict::Veto => {
                    tracing::debug!(filter = index, "Prompt vetoed by filter");
                    return String::new();
                }
            }
        }
        current
    }
}

impl std::fmt::Debug for SanitizerPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SanitizerPipeline").field("filters", &self.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_leaves_plain_text_borrowed() {
        assert!(matches!(json_escape("hello world"), Cow::Borrowed("hello world")));
    }

    #[test]
    fn escape_known_characters() {
        assert_eq!(json_escape("a\"b"), "a\\\"b");
        assert_eq!(json_escape("a\\b"), "a\\\\b");
        assert_eq!(json_escape("a/b"), "a\\/b");
        assert_eq!(json_escape("line\nnext\r\t"), "line\\nnext\\r\\t");
        assert_eq!(json_escape("\u{08}\u{0C}"), "\\b\\f");
        assert_eq!(json_escape("it's"), "it\\u0027s");
        assert_eq!(json_escape("\u{01}"), "\\u0001");
    }

    #[test]
    fn escape_keeps_leading_text() {
        assert_eq!(json_escape("abc\"def"), "abc\\\"def");
        assert_eq!(json_escape("x\n"), "x\\n");
    }

    #[test]
    fn escape_handles_multibyte_text() {
        assert_eq!(json_escape("héllo \"wörld\" 👋"), "héllo \\\"wörld\\\" 👋");
    }

    #[test]
    fn blank_prompt_skips_filters() {
        let pipeline = SanitizerPipeline::new();
        pipeline.add_filter(|_: &str| -> Verdict { panic!("must not run") });
        assert_eq!(pipeline.sanitize("   \n\t"), "");
        assert_eq!(pipeline.sanitize(""), "");
    }

    #[test]
    fn filters_run_in_order() {
        let pipeline = SanitizerPipeline::new();
        pipeline.add_filter(|p: &str| Verdict::Pass(format!("{}-a", p)));
        pipeline.add_filter(|p: &str| Verdict::Pass(format!("{}-b", p)));
        assert_eq!(pipeline.sanitize("x"), "x-a-b");
    }

    #[test]
    fn veto_short_circuits() {
        let pipeline = SanitizerPipeline::new();
        pipeline.add_filter(|p: &str| {
            if p.contains("secret") { Verdict::Veto } else { Verdict::Pass(p.to_string()) }
        });
        pipeline.add_filter(|_: &str| -> Verdict { panic!("must not run after a veto") });
        assert_eq!(pipeline.sanitize("my secret"), "");
    }

    #[test]
    fn remove_filter() {
        let pipeline = SanitizerPipeline::new();
        let id = pipeline.add_filter(|_: &str| Verdict::Veto);
        assert_eq!(pipeline.sanitize("hi"), "");
        assert!(pipeline.remove_filter(id));
        assert!(!pipeline.remove_filter(id));
        assert!(pipeline.is_empty());
        assert_eq!(pipeline.sanitize("hi"), "hi");
    }
}
