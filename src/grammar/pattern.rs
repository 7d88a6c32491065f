//! Pattern assembly for the grammar tables.
//!
//! Rule patterns are written as templates with named slots (`bull`, `hr`,
//! `href`, ...). [`PatternBuilder`] splices a sub-pattern source into each
//! slot, stripping the sub-pattern's `^` anchors so that a rule anchored at
//! the start of input can be embedded mid-pattern. A `^` that is part of a
//! negated character class (`[^...]`) is kept.

use regex::Regex;

/// Assembles one rule pattern from a template plus named sub-patterns.
///
/// Built once per table at initialization; the result is a compiled
/// [`Regex`].
#[derive(Debug, Clone)]
pub struct PatternBuilder {
    source: String,
}

impl PatternBuilder {
    pub fn new(template: &str) -> Self {
        Self {
            source: template.to_string(),
        }
    }

    /// Replace every occurrence of `name` in the template with `sub`,
    /// de-anchored.
    pub fn splice(mut self, name: &str, sub: &str) -> Self {
        self.source = self.source.replace(name, &strip_anchors(sub));
        self
    }

    /// Pattern source accumulated so far.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Compile the assembled pattern. Pattern sources are static program
    /// data; failing to compile is a bug in the tables, caught at first use.
    pub fn compile(self) -> Regex {
        Regex::new(&self.source).unwrap()
    }
}

/// Remove every `^` not immediately preceded by `[`.
fn strip_anchors(sub: &str) -> String {
    let mut out = String::with_capacity(sub.len());
    let mut prev = None;
    for c in sub.chars() {
        if c == '^' && prev != Some('[') {
            prev = Some(c);
            continue;
        }
        prev = Some(c);
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_leading_anchor() {
        assert_eq!(strip_anchors("^foo"), "foo");
    }

    #[test]
    fn test_keeps_negated_class() {
        assert_eq!(strip_anchors("^a[^b]c"), "a[^b]c");
        assert_eq!(strip_anchors("[^\\]]+"), "[^\\]]+");
    }

    #[test]
    fn test_strips_interior_anchor() {
        // Same fix-up as for leading anchors: only `[^` survives.
        assert_eq!(strip_anchors("a|^b"), "a|b");
    }

    #[test]
    fn test_splice_replaces_all_occurrences() {
        let built = PatternBuilder::new("^( *)(bull) |(bull)")
            .splice("bull", "^[*+-]")
            .source()
            .to_string();
        assert_eq!(built, "^( *)([*+-]) |([*+-])");
    }

    #[test]
    fn test_spliced_pattern_compiles_and_matches() {
        let re = PatternBuilder::new("^(?:hr|heading)")
            .splice("hr", "^( *[-*_]){3,} *(?:\\n+|$)")
            .splice("heading", "^ *(#{1,6}) *([^\\n]+?) *#* *(?:\\n+|$)")
            .compile();
        assert!(re.is_match("***\n"));
        assert!(re.is_match("## title\n"));
        assert!(!re.is_match("plain line\n"));
    }
}
