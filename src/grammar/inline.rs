//! Inline-span grammar tables.
//!
//! One immutable [`InlineRules`] table per context (`normal`, `pedantic`,
//! `gfm`, `breaks`). Emphasis, code spans, link bracket balancing and text
//! runs are matched by scans in the inline tokenizer; the table carries
//! their parameters (emphasis style, text-run stop set, break spacing) next
//! to the plain compiled patterns.

use std::sync::LazyLock;

use regex::Regex;

use super::pattern::PatternBuilder;

const ESCAPE: &str = r"^\\([\\`*{}\[\]()#+\-.!_>])";
const ESCAPE_GFM: &str = r"^\\([\\`*{}\[\]()#+\-.!_>~|])";
const AUTOLINK: &str = r"^<([^ >]+(@|:/)[^ >]*)>";
const URL: &str = r#"^(https?://[^\s<]+[^<.,:;"')\]\s])"#;
const TAG: &str = r#"^<!--[\s\S]*?-->|^</?[A-Za-z0-9_]+(?:"[^"]*"|'[^']*'|[^'">])*?>"#;
const HREF: &str = r#"\s*<?([\s\S]*?)>?(?:\s+['"]([\s\S]*?)['"])?\s*"#;
const REFLINK_LABEL: &str = r"^\s*\[([^\]]*)\]";
const NOLINK: &str = r"^!?\[((?:\[[^\]]*\]|[^\[\]])*)\]";
const BR: &str = r"^ {2,}\n";
const BR_ANY: &str = r"^ *\n";
const DEL: &str = r"^~~(\S(?:[\s\S]*?\S)?)~~";

/// How emphasis delimiters close.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmphasisStyle {
    /// Star runs prefer pairing, underscore closes on a word boundary.
    Normal,
    /// Content must start and end with non-whitespace; first eligible close
    /// wins.
    Pedantic,
}

/// Inline rule table for one grammar context.
#[derive(Debug)]
pub struct InlineRules {
    pub escape: Regex,
    pub autolink: Regex,
    /// Bare URL autolink; `None` outside the extended grammar.
    pub url: Option<Regex>,
    pub tag: Regex,
    /// The `(href "title")` tail of an inline link. The bracketed text in
    /// front of it is balanced by the tokenizer.
    pub link_href: Regex,
    /// The `[label]` tail of a reference link.
    pub reflink_label: Regex,
    pub nolink: Regex,
    pub br: Regex,
    /// Strikethrough; `None` outside the extended grammar.
    pub del: Option<Regex>,
    pub emphasis: EmphasisStyle,
    /// Characters that terminate a plain text run.
    pub text_specials: &'static [char],
    /// Whether `http://` / `https://` also terminates a text run.
    pub text_url_stop: bool,
    /// Spaces required before a newline to count as a hard break (and to
    /// terminate a text run).
    pub br_spaces: usize,
}

const SPECIALS: &[char] = &['\\', '<', '!', '[', '_', '*', '`'];
const SPECIALS_GFM: &[char] = &['\\', '<', '!', '[', '_', '*', '`', '~'];

impl InlineRules {
    fn base(context: Context) -> Self {
        let gfm = matches!(context, Context::Gfm | Context::Breaks);
        let breaks = matches!(context, Context::Breaks);
        Self {
            escape: Regex::new(if gfm { ESCAPE_GFM } else { ESCAPE }).unwrap(),
            autolink: Regex::new(AUTOLINK).unwrap(),
            url: gfm.then(|| Regex::new(URL).unwrap()),
            tag: Regex::new(TAG).unwrap(),
            link_href: PatternBuilder::new(r"^\(href\)")
                .splice("href", HREF)
                .compile(),
            reflink_label: Regex::new(REFLINK_LABEL).unwrap(),
            nolink: Regex::new(NOLINK).unwrap(),
            br: Regex::new(if breaks { BR_ANY } else { BR }).unwrap(),
            del: gfm.then(|| Regex::new(DEL).unwrap()),
            emphasis: if matches!(context, Context::Pedantic) {
                EmphasisStyle::Pedantic
            } else {
                EmphasisStyle::Normal
            },
            text_specials: if gfm { SPECIALS_GFM } else { SPECIALS },
            text_url_stop: gfm,
            br_spaces: if breaks { 0 } else { 2 },
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Context {
    Normal,
    Pedantic,
    Gfm,
    Breaks,
}

static NORMAL: LazyLock<InlineRules> = LazyLock::new(|| InlineRules::base(Context::Normal));
static PEDANTIC: LazyLock<InlineRules> = LazyLock::new(|| InlineRules::base(Context::Pedantic));
static GFM: LazyLock<InlineRules> = LazyLock::new(|| InlineRules::base(Context::Gfm));
static BREAKS: LazyLock<InlineRules> = LazyLock::new(|| InlineRules::base(Context::Breaks));

/// Select the inline table for the active options. `breaks` only applies
/// within the extended grammar; `pedantic` only outside it.
pub fn inline_rules(gfm: bool, breaks: bool, pedantic: bool) -> &'static InlineRules {
    if gfm {
        if breaks { &BREAKS } else { &GFM }
    } else if pedantic {
        &PEDANTIC
    } else {
        &NORMAL
    }
}
