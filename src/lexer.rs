//! Block tokenizer: turns source text into a flat [`Token`] stream.
//!
//! One rule fires per iteration, consumes a prefix of the input and emits
//! zero or more tokens. Containers (blockquotes, list items) re-enter the
//! tokenizer over their inner text, so the stream carries matched start/end
//! pairs instead of a tree. Link definitions are collected on the side and
//! never become tokens.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{Error, Stage};
use crate::grammar::block::INLINE_TAGS;
use crate::grammar::{BlockRules, block_rules};
use crate::options::Options;
use crate::token::{Align, LinkRef, LinkTable, Token, normalize_label};

static BLANK_LINE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^ +$").unwrap());
static OUTDENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^ {4}").unwrap());
static QUOTE_MARKER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^ *> ?").unwrap());
static BULLET_STRIP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^ *(?:[*+-]|[0-9]+\.) +").unwrap());
static BULLET_SPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:[*+-]|[0-9]+\.) ").unwrap());
static TABLE_EDGES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^ *| *\| *$").unwrap());
static ALIGN_EDGES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^ *|\| *$").unwrap());
static ROW_EDGES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^ *\| *| *\| *$").unwrap());
static TABLE_TRAILING: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?: *\| *)?\n$").unwrap());
static CELL_SPLIT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r" *\| *").unwrap());
static ALIGN_RIGHT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^ *-+: *$").unwrap());
static ALIGN_CENTER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^ *:-+: *$").unwrap());
static ALIGN_LEFT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^ *:-+ *$").unwrap());

/// Tokenize a whole document. Returns the token stream plus the link
/// definitions gathered along the way.
pub fn tokenize(src: &str, options: &Options) -> Result<(Vec<Token>, LinkTable), Error> {
    Lexer::new(options).lex(src)
}

/// Normalize line endings and whitespace forms the grammar assumes away.
fn preprocess(src: &str) -> String {
    src.replace("\r\n", "\n")
        .replace('\r', "\n")
        .replace('\t', "    ")
        .replace('\u{00a0}', " ")
        .replace('\u{2424}', "\n")
}

pub struct Lexer<'a> {
    options: &'a Options,
    rules: &'static BlockRules,
    tokens: Vec<Token>,
    links: LinkTable,
}

impl<'a> Lexer<'a> {
    pub fn new(options: &'a Options) -> Self {
        Self {
            options,
            rules: block_rules(options.gfm, options.tables),
            tokens: Vec::new(),
            links: LinkTable::new(),
        }
    }

    pub fn lex(mut self, src: &str) -> Result<(Vec<Token>, LinkTable), Error> {
        let src = preprocess(src);
        self.token(&src, true, false)?;
        log::debug!(
            "block pass: {} tokens, {} link defs",
            self.tokens.len(),
            self.links.len()
        );
        Ok((self.tokens, self.links))
    }

    /// One tokenizer pass over `src`. `top` is false inside list items;
    /// `bq` is true inside blockquotes (link definitions are ignored there).
    fn token(&mut self, src: &str, top: bool, bq: bool) -> Result<(), Error> {
        let mut buf = BLANK_LINE.replace_all(src, "").into_owned();
        let mut pos = 0;
        while pos < buf.len() {
            let rest = &buf[pos..];

            // blank lines
            if let Some(m) = self.rules.newline.find(rest) {
                if m.end() > 1 {
                    self.tokens.push(Token::Space);
                }
                pos += m.end();
                continue;
            }

            // indented code
            if let Some(m) = self.rules.code.find(rest) {
                let text = OUTDENT.replace_all(m.as_str(), "");
                let text = if self.options.pedantic {
                    text.into_owned()
                } else {
                    text.trim_end_matches('\n').to_string()
                };
                self.tokens.push(Token::Code {
                    text,
                    lang: None,
                    pre_escaped: false,
                });
                pos += m.end();
                continue;
            }

            // fenced code
            if let Some((len, lang, text)) = self.scan_fence(rest) {
                self.tokens.push(Token::Code {
                    text,
                    lang,
                    pre_escaped: false,
                });
                pos += len;
                continue;
            }

            // heading
            if let Some(cap) = self.rules.heading.captures(rest) {
                self.tokens.push(Token::Heading {
                    depth: cap[1].len() as u8,
                    text: cap[2].to_string(),
                });
                pos += cap[0].len();
                continue;
            }

            // table without leading pipes
            if top
                && let Some(nptable) = self.rules.nptable.as_ref()
                && let Some(cap) = nptable.captures(rest)
            {
                let header = split_cells(&TABLE_EDGES.replace_all(&cap[1], ""));
                let align = parse_align(&ALIGN_EDGES.replace_all(&cap[2], ""));
                let body = cap.get(3).map_or("", |m| m.as_str());
                let body = body.strip_suffix('\n').unwrap_or(body);
                let cells = body.split('\n').map(split_cells).collect();
                self.tokens.push(Token::Table {
                    header,
                    align,
                    cells,
                });
                pos += cap[0].len();
                continue;
            }

            // setext heading
            if let Some(cap) = self.rules.lheading.captures(rest) {
                self.tokens.push(Token::Heading {
                    depth: if &cap[2] == "=" { 1 } else { 2 },
                    text: cap[1].to_string(),
                });
                pos += cap[0].len();
                continue;
            }

            // horizontal rule
            if let Some(m) = self.rules.hr.find(rest) {
                self.tokens.push(Token::HorizontalRule);
                pos += m.end();
                continue;
            }

            // blockquote
            if let Some(m) = self.rules.blockquote.find(rest) {
                let mut end = m.end();
                // a contained link definition cuts the quoted region short
                for (p, _) in rest[..end].match_indices('\n') {
                    let ls = p + 1;
                    if ls < end && self.rules.def.is_match(&rest[ls..]) {
                        end = ls;
                        break;
                    }
                }
                let inner = QUOTE_MARKER.replace_all(&rest[..end], "").into_owned();
                self.tokens.push(Token::BlockquoteStart);
                self.token(&inner, top, true)?;
                self.tokens.push(Token::BlockquoteEnd);
                pos += end;
                continue;
            }

            // list
            if let Some(open) = self.rules.list_start.captures(rest) {
                let indent = open.get(1).map_or("", |m| m.as_str());
                let bull = open.get(2).map_or("", |m| m.as_str());
                let raw_len = self.list_extent(rest, indent, open[0].len());
                let raw = &rest[..raw_len];
                let items = split_items(raw, indent);
                let ordered = bull.len() > 1;
                log::trace!("list of {} items at byte {}", items.len(), pos);

                // a change of bullet style can end the list early
                let mut cut = None;
                if self.options.smart_lists {
                    for i in 0..items.len() - 1 {
                        let next_bull = self
                            .rules
                            .bullet
                            .captures(items[i + 1])
                            .and_then(|c| c.get(1))
                            .map_or("", |m| m.as_str());
                        if next_bull != bull && !(bull.len() > 1 && next_bull.len() > 1) {
                            cut = Some(i + 1);
                            break;
                        }
                    }
                }

                let count = cut.unwrap_or(items.len());
                let mut bodies = Vec::with_capacity(count);
                let mut any_loose = false;
                for (i, item) in items[..count].iter().enumerate() {
                    let width = item.len();
                    let mut body = BULLET_STRIP.replace(item, "").into_owned();
                    let width = width - body.len();
                    if body.contains("\n ") {
                        let max = if self.options.pedantic { 4 } else { width };
                        body = outdent(&body, max);
                    }
                    let last = i + 1 == count;
                    if (!last && body.ends_with('\n')) || body.trim_end().contains("\n\n") {
                        any_loose = true;
                    }
                    bodies.push(body);
                }

                self.tokens.push(Token::ListStart { ordered });
                for body in &bodies {
                    self.tokens.push(Token::ListItemStart { loose: any_loose });
                    self.token(body, false, bq)?;
                    self.tokens.push(Token::ListItemEnd);
                }
                self.tokens.push(Token::ListEnd);

                if let Some(from) = cut {
                    let mut requeued = items[from..].join("\n");
                    requeued.push_str(&buf[pos + raw_len..]);
                    buf = requeued;
                    pos = 0;
                } else {
                    pos += raw_len;
                }
                continue;
            }

            // raw HTML block
            if let Some((len, closed_tag)) = self.scan_html(rest) {
                let text = rest[..len].to_string();
                if self.options.sanitize {
                    self.tokens.push(Token::Paragraph { text });
                } else {
                    let is_pre = self.options.sanitizer.is_none()
                        && matches!(closed_tag, Some("pre" | "script" | "style"));
                    self.tokens.push(Token::Html { text, is_pre });
                }
                pos += len;
                continue;
            }

            // link definition
            if top
                && !bq
                && let Some(cap) = self.rules.def.captures(rest)
            {
                self.links.insert(
                    normalize_label(&cap[1]),
                    LinkRef {
                        href: cap[2].to_string(),
                        title: cap.get(3).map(|m| m.as_str().to_string()),
                    },
                );
                pos += cap[0].len();
                continue;
            }

            // piped table
            if top
                && let Some(table) = self.rules.table.as_ref()
                && let Some(cap) = table.captures(rest)
            {
                let header = split_cells(&TABLE_EDGES.replace_all(&cap[1], ""));
                let align = parse_align(&ALIGN_EDGES.replace_all(&cap[2], ""));
                let body = TABLE_TRAILING.replace(cap.get(3).map_or("", |m| m.as_str()), "");
                let cells = body
                    .split('\n')
                    .map(|row| split_cells(&ROW_EDGES.replace_all(row, "")))
                    .collect();
                self.tokens.push(Token::Table {
                    header,
                    align,
                    cells,
                });
                pos += cap[0].len();
                continue;
            }

            // paragraph
            if top {
                let (text_end, consumed) = self.paragraph_extent(rest);
                let text = rest[..text_end].strip_suffix('\n').unwrap_or(&rest[..text_end]);
                self.tokens.push(Token::Paragraph {
                    text: text.to_string(),
                });
                pos += consumed;
                continue;
            }

            // leaf line
            if let Some(m) = self.rules.text.find(rest) {
                self.tokens.push(Token::Text {
                    text: m.as_str().to_string(),
                });
                pos += m.end();
                continue;
            }

            return Err(Error::rule_gap(Stage::Block, rest));
        }
        Ok(())
    }

    /// Match a complete fenced block at the start of `rest`. The closing
    /// line must repeat the opening fence sequence exactly; without one the
    /// rule does not apply and the text falls through to later rules.
    fn scan_fence(&self, rest: &str) -> Option<(usize, Option<String>, String)> {
        let open = self.rules.fences.as_ref()?.captures(rest)?;
        let fence = open.get(1)?.as_str();
        let lang = open.get(2).map(|m| m.as_str().to_string());
        let body_start = open[0].len();
        let body = &rest[body_start..];
        let mut from = 0;
        while let Some(off) = body[from..].find(fence) {
            let at = from + off;
            let tail = &body[at + fence.len()..];
            let after_spaces = tail.trim_start_matches(' ');
            if after_spaces.is_empty() || after_spaces.starts_with('\n') {
                let spaces = tail.len() - after_spaces.len();
                let newlines = after_spaces.len() - after_spaces.trim_start_matches('\n').len();
                let consumed = body_start + at + fence.len() + spaces + newlines;
                return Some((consumed, lang, body[..at].trim_end().to_string()));
            }
            from = at + 1;
        }
        None
    }

    /// Byte length of the whole list starting `rest`. The list runs until a
    /// blank separation before unindented non-list text, a horizontal rule
    /// at the list's indent, a link definition, or the end of input.
    fn list_extent(&self, rest: &str, indent: &str, scan_from: usize) -> usize {
        let bytes = rest.as_bytes();
        let mut i = scan_from;
        while i < bytes.len() {
            if bytes[i] != b'\n' {
                i += 1;
                continue;
            }
            let mut run_end = i;
            while run_end < bytes.len() && bytes[run_end] == b'\n' {
                run_end += 1;
            }
            let k = run_end - i;
            let after = &rest[run_end..];
            let hr_here = self.rules.list_hr.is_match(after)
                || after
                    .strip_prefix(indent)
                    .is_some_and(|t| self.rules.list_hr.is_match(t));
            let def_here = self.rules.def.is_match(after);
            let blank_here = k >= 3
                || (k == 2
                    && !after.starts_with(' ')
                    && !after
                        .strip_prefix(indent)
                        .is_some_and(|t| BULLET_SPACE.is_match(t)));
            if hr_here || def_here || blank_here {
                return run_end;
            }
            i = run_end;
        }
        rest.len()
    }

    /// Match a raw HTML block: a comment, a closed non-inline tag pair, or
    /// a single open tag, each with the blank separation the grammar
    /// demands. Returns the consumed length and the pair's tag name.
    fn scan_html<'s>(&self, rest: &'s str) -> Option<(usize, Option<&'s str>)> {
        let indent = rest.len() - rest.trim_start_matches(' ').len();
        let s = &rest[indent..];

        if let Some(after) = s.strip_prefix("<!--") {
            let end = after.find("-->")? + 3;
            let t = &after[end..];
            let spaces = t.len() - t.trim_start_matches(' ').len();
            let t2 = &t[spaces..];
            // one newline, or nothing but whitespace to the end
            let tail = if t2.starts_with('\n') {
                spaces + 1
            } else if t2.trim().is_empty() {
                t.len()
            } else {
                return None;
            };
            return Some((indent + 4 + end + tail, None));
        }

        let name_len = block_tag_len(s.strip_prefix('<')?)?;
        let name = &s[1..1 + name_len];
        let body = &s[1 + name_len..];

        // closed pair: first closing tag with valid trailing separation
        let close = format!("</{}>", name);
        let mut from = body.chars().next().map_or(0, char::len_utf8);
        while let Some(off) = body.get(from..).and_then(|b| b.find(&close)) {
            let at = from + off;
            if let Some(tail) = html_tail(&body[at + close.len()..]) {
                return Some((indent + 1 + name_len + at + close.len() + tail, Some(name)));
            }
            from = at + 1;
        }

        // single open tag: scan to the first unquoted `>`
        let b = body.as_bytes();
        let mut i = 0;
        let gt = loop {
            if i >= b.len() {
                break None;
            }
            match b[i] {
                b'>' => break Some(i),
                b'"' => i += body[i + 1..].find('"')? + 2,
                b'\'' => i += body[i + 1..].find('\'')? + 2,
                _ => i += 1,
            }
        };
        let gt = gt?;
        let tail = html_tail(&body[gt + 1..])?;
        Some((indent + 1 + name_len + gt + 1 + tail, None))
    }

    /// Extent of a paragraph at the start of `rest`: byte length of the
    /// paragraph text and the total consumed length including trailing
    /// blank lines.
    fn paragraph_extent(&self, rest: &str) -> (usize, usize) {
        let mut end = 0;
        let mut pos = 0;
        loop {
            let line_len = rest[pos..].find('\n').unwrap_or(rest.len() - pos);
            if line_len == 0 {
                break;
            }
            pos += line_len;
            end = pos;
            if pos >= rest.len() {
                break;
            }
            if self.interrupts_paragraph(&rest[pos + 1..]) {
                break;
            }
            pos += 1;
            end = pos;
        }
        let trailing = rest[end..].len() - rest[end..].trim_start_matches('\n').len();
        (end, end + trailing)
    }

    /// Whether the text after a newline starts a construct that cuts the
    /// current paragraph short.
    fn interrupts_paragraph(&self, next: &str) -> bool {
        if self.rules.interrupt.is_match(next) {
            return true;
        }
        if next.strip_prefix('<').and_then(block_tag_len).is_some() {
            return true;
        }
        if self.rules.fence_and_list_interrupt {
            if self.scan_fence(next).is_some() {
                return true;
            }
            if self.rules.list_start.is_match(next) {
                return true;
            }
        }
        false
    }
}

/// Trailing separation required after an HTML block: spaces, then either a
/// blank line or nothing but whitespace to the end of input.
fn html_tail(t: &str) -> Option<usize> {
    let after_spaces = t.trim_start_matches(' ');
    let spaces = t.len() - after_spaces.len();
    let newlines = after_spaces.len() - after_spaces.trim_start_matches('\n').len();
    if newlines >= 2 {
        Some(spaces + newlines)
    } else if after_spaces.trim().is_empty() {
        Some(t.len())
    } else {
        None
    }
}

/// Length of a valid block-level tag name at the start of `s`, the text
/// right after `<`. Inline-level names, scheme-like heads (`name:/`) and
/// address-like heads (`name@`, possibly with punctuation between) do not
/// open an HTML block.
fn block_tag_len(s: &str) -> Option<usize> {
    let len = s
        .bytes()
        .take_while(|b| b.is_ascii_alphanumeric() || *b == b'_')
        .count();
    if len == 0 || INLINE_TAGS.contains(&&s[..len]) {
        return None;
    }
    let after = &s[len..];
    if after.starts_with(":/") {
        return None;
    }
    for c in after.chars() {
        if c == '@' {
            return None;
        }
        if c.is_ascii_alphanumeric() || c == '_' || c.is_whitespace() {
            break;
        }
    }
    Some(len)
}

/// Split a list's raw text into per-item slices. Items begin on lines that
/// carry the list's own indent and a bullet; the newline before each next
/// item belongs to neither side.
fn split_items<'s>(raw: &'s str, indent: &str) -> Vec<&'s str> {
    let mut starts = vec![0];
    for (p, _) in raw.match_indices('\n') {
        let ls = p + 1;
        if ls >= raw.len() {
            continue;
        }
        if let Some(t) = raw[ls..].strip_prefix(indent)
            && BULLET_SPACE.is_match(t)
        {
            starts.push(ls);
        }
    }
    let mut items = Vec::with_capacity(starts.len());
    for (i, &s) in starts.iter().enumerate() {
        let end = starts.get(i + 1).map_or(raw.len(), |&n| n - 1);
        items.push(&raw[s..end]);
    }
    items
}

/// Strip up to `max` leading spaces from every line.
fn outdent(text: &str, max: usize) -> String {
    let mut out = String::with_capacity(text.len());
    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            out.push('\n');
        }
        let lead = line.len() - line.trim_start_matches(' ').len();
        out.push_str(&line[lead.min(max)..]);
    }
    out
}

fn split_cells(row: &str) -> Vec<String> {
    CELL_SPLIT.split(row).map(str::to_string).collect()
}

fn parse_align(row: &str) -> Vec<Align> {
    CELL_SPLIT
        .split(row)
        .map(|col| {
            if ALIGN_RIGHT.is_match(col) {
                Align::Right
            } else if ALIGN_CENTER.is_match(col) {
                Align::Center
            } else if ALIGN_LEFT.is_match(col) {
                Align::Left
            } else {
                Align::None
            }
        })
        .collect()
}
