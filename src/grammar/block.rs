//! Block-level grammar tables.
//!
//! One immutable [`BlockRules`] table per context (`normal`, `gfm`,
//! `tables`), built on first use. Entries are anchored patterns; rules that
//! needed backreferences or lookaround in the original engine (fence
//! closers, list extents, paragraph interruption, HTML block pairing) keep
//! their anchoring pattern here while the tokenizer owns the matching scan.

use std::sync::LazyLock;

use regex::Regex;

use super::pattern::PatternBuilder;

const NEWLINE: &str = r"^\n+";
const CODE: &str = r"^( {4}[^\n]+\n*)+";
const FENCE_OPEN: &str = r"^ *(`{3,}|~{3,})[ .]*(\S+)? *\n";
const HR: &str = r"^( *[-*_]){3,} *(?:\n+|$)";
const HEADING: &str = r"^ *(#{1,6}) *([^\n]+?) *#* *(?:\n+|$)";
const LHEADING: &str = r"^([^\n]+)\n *(=|-){2,} *(?:\n+|$)";
const BLOCKQUOTE: &str = r"^( *>[^\n]+(\n[^\n]+)*\n*)+";
const BULLET: &str = r"(?:[*+-]|[0-9]+\.)";
const DEF: &str = r#"^ *\[([^\]]+)\]: *<?([^\s>]+)>?(?: +["(]([^\n]+)[")])? *(?:\n+|$)"#;
const NPTABLE: &str = r"^ *(\S.*\|.*)\n *([-:]+ *\|[-| :]*)\n((?:.*\|.*(?:\n|$))*)\n*";
const TABLE: &str = r"^ *\|(.+)\n *\|( *[-:]+[-| :]*)\n((?: *\|.*(?:\n|$))*)\n*";
const TEXT: &str = r"^[^\n]+";

/// Horizontal-rule form accepted as a list terminator (the list's own
/// indent is stripped by the tokenizer before testing).
const LIST_HR: &str = r"^(?:[-*_] *){3,}(?:\n+|$)";

/// Tag names that stay inline; a raw HTML *block* must open with something
/// else.
pub(crate) const INLINE_TAGS: &[&str] = &[
    "a", "em", "strong", "small", "s", "cite", "q", "dfn", "abbr", "data", "time", "code", "var",
    "samp", "kbd", "sub", "sup", "i", "b", "u", "mark", "ruby", "rt", "rp", "bdi", "bdo", "span",
    "br", "wbr", "ins", "del", "img",
];

/// Block rule table for one grammar context.
#[derive(Debug)]
pub struct BlockRules {
    pub newline: Regex,
    pub code: Regex,
    /// Opening fence line; `None` outside the extended grammar. The closing
    /// line must repeat capture 1 exactly and is located by the tokenizer.
    pub fences: Option<Regex>,
    pub heading: Regex,
    /// Table without leading pipes; `None` unless tables are enabled.
    pub nptable: Option<Regex>,
    pub lheading: Regex,
    pub hr: Regex,
    pub blockquote: Regex,
    /// List opener: captures indent and bullet, requires one more character.
    pub list_start: Regex,
    /// A bullet with its indent, for item splitting and smart-list checks.
    pub bullet: Regex,
    pub list_hr: Regex,
    pub def: Regex,
    /// Piped table; `None` unless tables are enabled.
    pub table: Option<Regex>,
    /// Constructs that cut a paragraph short when they start the next line.
    pub interrupt: Regex,
    /// Whether a complete fence or a list start also interrupts paragraphs.
    pub fence_and_list_interrupt: bool,
    pub text: Regex,
}

impl BlockRules {
    fn base(fences: bool, tables: bool) -> Self {
        Self {
            newline: Regex::new(NEWLINE).unwrap(),
            code: Regex::new(CODE).unwrap(),
            fences: fences.then(|| Regex::new(FENCE_OPEN).unwrap()),
            heading: Regex::new(HEADING).unwrap(),
            nptable: tables.then(|| Regex::new(NPTABLE).unwrap()),
            lheading: Regex::new(LHEADING).unwrap(),
            hr: Regex::new(HR).unwrap(),
            blockquote: Regex::new(BLOCKQUOTE).unwrap(),
            list_start: PatternBuilder::new(r"^( *)(bull) [\s\S]")
                .splice("bull", BULLET)
                .compile(),
            bullet: PatternBuilder::new(r"^ *(bull)")
                .splice("bull", BULLET)
                .compile(),
            list_hr: Regex::new(LIST_HR).unwrap(),
            def: Regex::new(DEF).unwrap(),
            table: tables.then(|| Regex::new(TABLE).unwrap()),
            // `lheading` is spliced before `heading`: slot names are plain
            // text and one contains the other.
            interrupt: PatternBuilder::new("^(?:hr|lheading|heading|blockquote|def)")
                .splice("lheading", LHEADING)
                .splice("heading", HEADING)
                .splice("hr", HR)
                .splice("blockquote", BLOCKQUOTE)
                .splice("def", DEF)
                .compile(),
            fence_and_list_interrupt: fences,
            text: Regex::new(TEXT).unwrap(),
        }
    }
}

static NORMAL: LazyLock<BlockRules> = LazyLock::new(|| BlockRules::base(false, false));
static GFM: LazyLock<BlockRules> = LazyLock::new(|| BlockRules::base(true, false));
static TABLES: LazyLock<BlockRules> = LazyLock::new(|| BlockRules::base(true, true));

/// Select the block table for the active options.
pub fn block_rules(gfm: bool, tables: bool) -> &'static BlockRules {
    if gfm {
        if tables { &TABLES } else { &GFM }
    } else {
        &NORMAL
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contexts_gate_rules() {
        assert!(block_rules(false, false).fences.is_none());
        assert!(block_rules(true, false).fences.is_some());
        assert!(block_rules(true, false).table.is_none());
        assert!(block_rules(true, true).table.is_some());
        assert!(block_rules(true, true).nptable.is_some());
    }

    #[test]
    fn test_heading_captures() {
        let rules = block_rules(true, true);
        let cap = rules.heading.captures("## Title ##\n\nrest").unwrap();
        assert_eq!(&cap[1], "##");
        assert_eq!(&cap[2], "Title");
    }

    #[test]
    fn test_def_captures_title_forms() {
        let rules = block_rules(true, true);
        let cap = rules.def.captures("[lbl]: <http://x> \"T\"\n").unwrap();
        assert_eq!(&cap[1], "lbl");
        assert_eq!(&cap[2], "http://x");
        assert_eq!(&cap[3], "T");
        let cap = rules.def.captures("[lbl]: /url (Title)\n").unwrap();
        assert_eq!(&cap[3], "Title");
        let cap = rules.def.captures("[lbl]: /url\n").unwrap();
        assert!(cap.get(3).is_none());
    }

    #[test]
    fn test_interrupt_matches_next_block_starts() {
        let rules = block_rules(true, true);
        assert!(rules.interrupt.is_match("# h\n"));
        assert!(rules.interrupt.is_match("> q\n"));
        assert!(rules.interrupt.is_match("- - -\n"));
        assert!(rules.interrupt.is_match("under\n===\n"));
        assert!(rules.interrupt.is_match("[l]: /u\n"));
        assert!(!rules.interrupt.is_match("plain\n"));
    }

    #[test]
    fn test_list_start_requires_trailing_content() {
        let rules = block_rules(true, true);
        assert!(rules.list_start.is_match("- item"));
        assert!(rules.list_start.is_match("12. item"));
        assert!(!rules.list_start.is_match("- "));
        assert!(!rules.list_start.is_match("-item"));
    }

    #[test]
    fn test_fence_open_line() {
        let rules = block_rules(true, false);
        let fences = rules.fences.as_ref().unwrap();
        let cap = fences.captures("``` rust\nfn x() {}\n```\n").unwrap();
        assert_eq!(&cap[1], "```");
        assert_eq!(&cap[2], "rust");
        assert!(fences.captures("```\ncode\n```\n").unwrap().get(2).is_none());
    }
}
