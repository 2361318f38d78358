//! Summary length selection and directive construction.

use super::SummarizeError;
use serde::{Serialize, Serializer};
use std::fmt;

/// Coarse summary size selected by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SummaryLength {
    /// Roughly 100 words.
    Short,
    /// Roughly 250 words.
    #[default]
    Medium,
    /// Roughly 500 words.
    Long,
}

impl SummaryLength {
    /// Normalize a caller-supplied token. Unknown or missing tokens select [`SummaryLength::Medium`].
    pub fn from_token(token: Option<&str>) -> Self {
        match token {
            Some("short") => Self::Short,
            Some("long") => Self::Long,
            _ => Self::Medium,
        }
    }

    /// Target number of words for this size.
    pub const fn word_budget(self) -> usize {
        match self {
            Self::Short => 100,
            Self::Medium => 250,
            Self::Long => 500,
        }
    }

    /// Token as exposed over the API.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Short => "short",
            Self::Medium => "medium",
            Self::Long => "long",
        }
    }
}

impl fmt::Display for SummaryLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for SummaryLength {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Map a raw length token to its word budget.
pub fn resolve_word_budget(token: Option<&str>) -> usize {
    SummaryLength::from_token(token).word_budget()
}

const FORMATTING_RULES: &str = "\
- Use **bold text** for important concepts or key terms
- Use backticks for code snippets or technical terms like `function()` or `API`
- Use triple backticks for code blocks with appropriate language specification
- Use bullet points for lists where appropriate
- Use headers (##) for section titles if needed";

/// Assemble the directive sent to the generation provider.
///
/// The source text is appended verbatim after the instructions.
pub fn build_prompt(text: &str, word_budget: usize) -> Result<String, SummarizeError> {
    if text.trim().is_empty() {
        return Err(SummarizeError::EmptyInput);
    }

    Ok(format!(
        "Please summarize the following text in approximately {word_budget} words. \
         Format your response using Markdown syntax:\n\n\
         {FORMATTING_RULES}\n\n\
         Here's the text to summarize:\n\n\
         {text}"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_budgets_follow_the_fixed_table() {
        assert_eq!(resolve_word_budget(Some("short")), 100);
        assert_eq!(resolve_word_budget(Some("medium")), 250);
        assert_eq!(resolve_word_budget(Some("long")), 500);
        assert_eq!(resolve_word_budget(Some("epic")), 250);
        assert_eq!(resolve_word_budget(Some("SHORT")), 250);
        assert_eq!(resolve_word_budget(None), 250);
    }

    #[test]
    fn length_tokens_round_trip_through_display() {
        for length in [SummaryLength::Short, SummaryLength::Medium, SummaryLength::Long] {
            assert_eq!(SummaryLength::from_token(Some(length.as_str())), length);
        }
        assert_eq!(SummaryLength::default(), SummaryLength::Medium);
    }

    #[test]
    fn rejects_empty_and_whitespace_text() {
        assert!(matches!(build_prompt("", 100), Err(SummarizeError::EmptyInput)));
        assert!(matches!(
            build_prompt(" \n\t ", 100),
            Err(SummarizeError::EmptyInput)
        ));
    }

    #[test]
    fn directive_embeds_budget_rules_and_verbatim_text() {
        let text = "  Rust ownership keeps memory safe.\nSecond line.  ";
        let prompt = build_prompt(text, 500).expect("prompt");

        assert!(prompt.starts_with("Please summarize the following text in approximately 500 words."));
        assert!(prompt.contains("**bold text**"));
        assert!(prompt.contains("`function()`"));
        assert!(prompt.contains("triple backticks"));
        assert!(prompt.contains("headers (##)"));
        assert!(prompt.ends_with(text));
    }
}
