//! Block token model and the link reference table.

use std::collections::HashMap;

/// A unit of document structure from the block tokenizer.
///
/// Container kinds come in matched, non-overlapping start/end pairs; the
/// compiler walks them by recursive descent and never sees an unpaired end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// A run of blank lines.
    Space,
    HorizontalRule,
    Heading {
        depth: u8,
        text: String,
    },
    Code {
        text: String,
        lang: Option<String>,
        /// True once a highlighter has already produced HTML for `text`.
        pre_escaped: bool,
    },
    Table {
        header: Vec<String>,
        align: Vec<Align>,
        cells: Vec<Vec<String>>,
    },
    BlockquoteStart,
    BlockquoteEnd,
    ListStart {
        ordered: bool,
    },
    ListEnd,
    ListItemStart {
        loose: bool,
    },
    ListItemEnd,
    Html {
        text: String,
        is_pre: bool,
    },
    Paragraph {
        text: String,
    },
    /// A single leaf line; consecutive `Text` tokens are coalesced by the
    /// compiler before inline rendering.
    Text {
        text: String,
    },
}

/// Column alignment of a table cell, from the separator row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Align {
    #[default]
    None,
    Left,
    Center,
    Right,
}

impl Align {
    /// CSS value for the alignment, if any.
    pub fn as_css(self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::Left => Some("left"),
            Self::Center => Some("center"),
            Self::Right => Some("right"),
        }
    }
}

/// Target of a link reference definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkRef {
    pub href: String,
    pub title: Option<String>,
}

/// Link definitions collected during the top-level tokenization pass,
/// keyed by normalized label.
pub type LinkTable = HashMap<String, LinkRef>;

/// Normalize a reference label: case-fold and collapse internal whitespace
/// runs to single spaces. Applied identically when a definition is stored
/// and when a reference is looked up.
pub fn normalize_label(label: &str) -> String {
    let mut out = String::with_capacity(label.len());
    let mut in_space = false;
    for c in label.chars() {
        if c.is_whitespace() {
            in_space = true;
            continue;
        }
        if in_space && !out.is_empty() {
            out.push(' ');
        }
        in_space = false;
        for lc in c.to_lowercase() {
            out.push(lc);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_label_case_folds() {
        assert_eq!(normalize_label("FOO"), "foo");
        assert_eq!(normalize_label("Foo Bar"), "foo bar");
    }

    #[test]
    fn test_normalize_label_collapses_whitespace() {
        assert_eq!(normalize_label("foo   bar"), "foo bar");
        assert_eq!(normalize_label("  foo\tbar "), "foo bar");
        assert_eq!(normalize_label("a\n b"), "a b");
    }

    #[test]
    fn test_align_css() {
        assert_eq!(Align::Left.as_css(), Some("left"));
        assert_eq!(Align::None.as_css(), None);
    }
}
