//! Error types for the compile pipeline.
//!
//! Almost everything the tokenizers meet is recovered locally (unresolved
//! reference links, stray markup, unknown HTML). Only two conditions are
//! fatal: a gap in the grammar tables, and a failing syntax highlighter.

/// How much of the unconsumed input a `RuleGap` error carries.
const SNIPPET_LEN: usize = 24;

/// Errors that can escape a compile call.
#[derive(Debug)]
pub enum Error {
    /// No rule in the active grammar table consumed the remaining input.
    /// This is a grammar coverage bug, not a property of the input.
    RuleGap { stage: Stage, near: String },
    /// The configured syntax highlighter failed for a code block.
    Highlight { reason: String },
}

/// Pipeline stage an error originated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Block,
    Inline,
}

impl Error {
    /// Build a `RuleGap` carrying a short prefix of the unconsumed input.
    pub(crate) fn rule_gap(stage: Stage, rest: &str) -> Self {
        let end = rest
            .char_indices()
            .map(|(i, _)| i)
            .find(|&i| i > SNIPPET_LEN)
            .unwrap_or(rest.len());
        Self::RuleGap {
            stage,
            near: rest[..end].to_string(),
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Block => write!(f, "block"),
            Self::Inline => write!(f, "inline"),
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RuleGap { stage, near } => {
                write!(f, "no {} rule matched near {:?}", stage, near)
            }
            Self::Highlight { reason } => {
                write!(f, "syntax highlighter failed: {}", reason)
            }
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_gap_snippet_is_bounded() {
        let long = "x".repeat(200);
        let err = Error::rule_gap(Stage::Block, &long);
        match err {
            Error::RuleGap { near, .. } => assert!(near.len() <= 25),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_rule_gap_respects_char_boundaries() {
        let text = "é".repeat(40);
        let err = Error::rule_gap(Stage::Inline, &text);
        match err {
            Error::RuleGap { stage, near } => {
                assert_eq!(stage, Stage::Inline);
                assert!(near.chars().all(|c| c == 'é'));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_display_messages() {
        let err = Error::rule_gap(Stage::Block, "?!");
        assert_eq!(err.to_string(), "no block rule matched near \"?!\"");
        let err = Error::Highlight {
            reason: "lexer panicked".into(),
        };
        assert_eq!(
            err.to_string(),
            "syntax highlighter failed: lexer panicked"
        );
    }
}
