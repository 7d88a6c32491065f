//! Inline-span tokenizer.
//!
//! Walks a leaf token's text left to right with a fixed rule precedence and
//! renders spans directly through the output strategy. The only state that
//! carries across spans is the "inside an anchor" flag, which suppresses
//! nested links and bare-URL autolinks, and the coin source for mail
//! mangling.

use std::borrow::Cow;
use std::collections::hash_map::RandomState;
use std::hash::{BuildHasher, Hasher};
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{Error, Stage};
use crate::grammar::inline::{EmphasisStyle, InlineRules, inline_rules};
use crate::options::Options;
use crate::render::{RenderFlags, escape};
use crate::token::{LinkTable, normalize_label};

static OPEN_SINGLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(^|[-\x{2014}/(\[{"\s])'"#).unwrap());
static OPEN_DOUBLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(^|[-\x{2014}/(\[{\x{2018}\s])""#).unwrap());

/// Inline tokenizer over one link table and option set. One instance renders
/// every leaf token of a compile pass.
pub(crate) struct InlineLexer<'a> {
    options: &'a Options,
    links: &'a LinkTable,
    rules: &'static InlineRules,
    flags: RenderFlags,
    in_link: bool,
    coins: Coins,
}

impl<'a> InlineLexer<'a> {
    pub(crate) fn new(links: &'a LinkTable, options: &'a Options) -> Self {
        Self {
            options,
            links,
            rules: inline_rules(options.gfm, options.breaks, options.pedantic),
            flags: options.render_flags(),
            in_link: false,
            coins: Coins::new(options.mangle_seed),
        }
    }

    /// Render one source string to output markup.
    pub(crate) fn render_inline(&mut self, src: &str) -> Result<String, Error> {
        log::trace!("inline pass over {} bytes", src.len());
        let mut out = String::new();
        let mut pos = 0;

        while pos < src.len() {
            let rest = &src[pos..];

            // backslash escape, emitted verbatim
            if let Some(cap) = self.rules.escape.captures(rest) {
                log::trace!("escape at byte {}", pos);
                out.push_str(&cap[1]);
                pos += cap[0].len();
                continue;
            }

            // <scheme://target> and <address@host> autolinks
            if let Some(cap) = self.rules.autolink.captures(rest) {
                log::trace!("autolink at byte {}", pos);
                let (text, href) = if &cap[2] == "@" {
                    let raw = &cap[1];
                    let address = if raw.as_bytes().get(6) == Some(&b':') {
                        &raw[7..]
                    } else {
                        raw
                    };
                    let text = self.mangle(address);
                    let mut href = self.mangle("mailto:");
                    href.push_str(&text);
                    (text, href)
                } else {
                    let text = escape(&cap[1], false);
                    (text.clone(), text)
                };
                out.push_str(&self.options.renderer.link(&self.flags, &href, None, &text));
                pos += cap[0].len();
                continue;
            }

            // bare URLs, never inside an anchor
            if !self.in_link
                && let Some(url) = &self.rules.url
                && let Some(cap) = url.captures(rest)
            {
                log::trace!("bare url at byte {}", pos);
                let text = escape(&cap[1], false);
                out.push_str(&self.options.renderer.link(&self.flags, &text, None, &text));
                pos += cap[0].len();
                continue;
            }

            // raw tag passthrough
            if let Some(m) = self.rules.tag.find(rest) {
                log::trace!("raw tag at byte {}", pos);
                let tag = m.as_str();
                if !self.in_link && opens_anchor(tag) {
                    self.in_link = true;
                } else if self.in_link && closes_anchor(tag) {
                    self.in_link = false;
                }
                let piece = if self.options.sanitize {
                    match &self.options.sanitizer {
                        Some(sanitizer) => sanitizer(tag),
                        None => escape(tag, false),
                    }
                } else {
                    tag.to_string()
                };
                out.push_str(&piece);
                pos += m.end();
                continue;
            }

            // inline link or image
            if let Some((consumed, image, text, href, title)) = self.scan_link(rest) {
                log::trace!("inline link at byte {}", pos);
                self.in_link = true;
                let rendered = self.output_link(image, text, &href, title.as_deref())?;
                self.in_link = false;
                out.push_str(&rendered);
                pos += consumed;
                continue;
            }

            // reference and shorthand links
            if let Some((consumed, image, text, label)) = self.scan_reflink(rest) {
                let key = normalize_label(if label.is_empty() { text } else { label });
                match self.links.get(&key) {
                    Some(link) if !link.href.is_empty() => {
                        log::trace!("reference link at byte {}", pos);
                        let (href, title) = (link.href.clone(), link.title.clone());
                        self.in_link = true;
                        let rendered = self.output_link(image, text, &href, title.as_deref())?;
                        self.in_link = false;
                        out.push_str(&rendered);
                        pos += consumed;
                    }
                    _ => {
                        // unresolved: degrade to the literal opening
                        // character and rescan what follows it
                        log::trace!("unresolved reference at byte {}", pos);
                        let literal = if image { "!" } else { "[" };
                        out.push_str(&self.options.renderer.text(&self.flags, literal));
                        pos += 1;
                    }
                }
                continue;
            }

            // strong
            if let Some((consumed, content)) = scan_strong(rest, self.rules.emphasis) {
                log::trace!("strong at byte {}", pos);
                let inner = self.render_inline(content)?;
                out.push_str(&self.options.renderer.strong(&self.flags, &inner));
                pos += consumed;
                continue;
            }

            // emphasis
            if let Some((consumed, content)) = scan_emphasis(rest, self.rules.emphasis) {
                log::trace!("emphasis at byte {}", pos);
                let inner = self.render_inline(content)?;
                out.push_str(&self.options.renderer.emphasis(&self.flags, &inner));
                pos += consumed;
                continue;
            }

            // code span
            if let Some((consumed, content)) = scan_code_span(rest) {
                log::trace!("code span at byte {}", pos);
                let code = escape(content, true);
                out.push_str(&self.options.renderer.code_span(&self.flags, &code));
                pos += consumed;
                continue;
            }

            // hard break, except before a whitespace-only tail
            if let Some(m) = self.rules.br.find(rest)
                && !rest[m.end()..].chars().all(char::is_whitespace)
            {
                log::trace!("hard break at byte {}", pos);
                out.push_str(&self.options.renderer.line_break(&self.flags));
                pos += m.end();
                continue;
            }

            // strikethrough
            if let Some(del) = &self.rules.del
                && let Some(cap) = del.captures(rest)
            {
                log::trace!("strikethrough at byte {}", pos);
                let inner = self.render_inline(&cap[1])?;
                out.push_str(&self.options.renderer.strikethrough(&self.flags, &inner));
                pos += cap[0].len();
                continue;
            }

            // plain text run
            let stop = self.text_extent(rest);
            if stop > 0 {
                let run = self.smartypants(&rest[..stop]);
                out.push_str(&self.options.renderer.text(&self.flags, &escape(&run, false)));
                pos += stop;
                continue;
            }

            return Err(Error::rule_gap(Stage::Inline, rest));
        }

        Ok(out)
    }

    /// Match `[text](href "title")` at the head of `rest`. The bracketed
    /// text is balanced by hand, longest candidate first; the tail after the
    /// closing bracket must parse as an href group.
    fn scan_link<'s>(
        &self,
        rest: &'s str,
    ) -> Option<(usize, bool, &'s str, String, Option<String>)> {
        let image = rest.starts_with('!');
        let open = image as usize;
        if rest.as_bytes().get(open) != Some(&b'[') {
            return None;
        }
        let body = &rest[open + 1..];
        for stop in bracket_stops(body).into_iter().rev() {
            if let Some(cap) = self.rules.link_href.captures(&body[stop + 1..]) {
                let consumed = open + 1 + stop + 1 + cap[0].len();
                let title = cap.get(2).map(|m| m.as_str().to_string());
                return Some((consumed, image, &body[..stop], cap[1].to_string(), title));
            }
        }
        None
    }

    /// Match `[text][label]` or shorthand `[text]` at the head of `rest`,
    /// returning the label to resolve (the text itself for the shorthand).
    fn scan_reflink<'s>(&self, rest: &'s str) -> Option<(usize, bool, &'s str, &'s str)> {
        let image = rest.starts_with('!');
        let open = image as usize;
        if rest.as_bytes().get(open) != Some(&b'[') {
            return None;
        }
        let body = &rest[open + 1..];
        for stop in bracket_stops(body).into_iter().rev() {
            if let Some(cap) = self.rules.reflink_label.captures(&body[stop + 1..]) {
                let consumed = open + 1 + stop + 1 + cap[0].len();
                let label = cap.get(1).map_or("", |m| m.as_str());
                return Some((consumed, image, &body[..stop], label));
            }
        }
        let cap = self.rules.nolink.captures(rest)?;
        let text = cap.get(1).map_or("", |m| m.as_str());
        Some((cap[0].len(), image, text, text))
    }

    fn output_link(
        &mut self,
        image: bool,
        text: &str,
        href: &str,
        title: Option<&str>,
    ) -> Result<String, Error> {
        let href = escape(href, false);
        let title = title.map(|t| escape(t, false));
        if image {
            let alt = escape(text, false);
            Ok(self
                .options
                .renderer
                .image(&self.flags, &href, title.as_deref(), &alt))
        } else {
            let body = self.render_inline(text)?;
            Ok(self
                .options
                .renderer
                .link(&self.flags, &href, title.as_deref(), &body))
        }
    }

    /// Length of the plain text run at the head of `rest`: at least one
    /// character, up to the next special character, bare-URL start or
    /// hard-break candidate.
    fn text_extent(&self, rest: &str) -> usize {
        let bytes = rest.as_bytes();
        let mut pos = match rest.chars().next() {
            Some(c) => c.len_utf8(),
            None => return 0,
        };
        while pos < bytes.len() {
            let Some(c) = rest[pos..].chars().next() else {
                break;
            };
            if self.rules.text_specials.contains(&c) {
                break;
            }
            if self.rules.text_url_stop
                && (rest[pos..].starts_with("http://") || rest[pos..].starts_with("https://"))
            {
                break;
            }
            if break_ahead(bytes, pos, self.rules.br_spaces) {
                break;
            }
            pos += c.len_utf8();
        }
        pos
    }

    /// Typographic punctuation for literal text runs.
    fn smartypants<'t>(&self, text: &'t str) -> Cow<'t, str> {
        if !self.options.smartypants {
            return Cow::Borrowed(text);
        }
        let text = text.replace("---", "\u{2014}").replace("--", "\u{2013}");
        let text = OPEN_SINGLE.replace_all(&text, "${1}\u{2018}");
        let text = text.replace('\'', "\u{2019}");
        let text = OPEN_DOUBLE.replace_all(&text, "${1}\u{201c}");
        let text = text.replace('"', "\u{201d}").replace("...", "\u{2026}");
        Cow::Owned(text)
    }

    /// Obfuscate every character as a numeric reference, choosing decimal or
    /// hexadecimal form per character by coin flip.
    fn mangle(&mut self, text: &str) -> String {
        if !self.options.mangle {
            return text.to_string();
        }
        let mut out = String::new();
        for c in text.chars() {
            let code = c as u32;
            if self.coins.flip() {
                out.push_str(&format!("&#x{:x};", code));
            } else {
                out.push_str(&format!("&#{};", code));
            }
        }
        out
    }
}

/// xorshift64 coin source for mail mangling. Seeded from the options for
/// reproducible output, otherwise from ambient hasher entropy.
struct Coins {
    state: u64,
}

impl Coins {
    fn new(seed: Option<u64>) -> Self {
        let state = seed.unwrap_or_else(|| RandomState::new().build_hasher().finish());
        // xorshift sticks at zero
        Self { state: state | 1 }
    }

    fn flip(&mut self) -> bool {
        self.state ^= self.state << 13;
        self.state ^= self.state >> 7;
        self.state ^= self.state << 17;
        self.state & 1 == 0
    }
}

fn opens_anchor(tag: &str) -> bool {
    tag.len() >= 3 && tag.as_bytes()[..3].eq_ignore_ascii_case(b"<a ")
}

fn closes_anchor(tag: &str) -> bool {
    tag.len() >= 4 && tag.as_bytes()[..4].eq_ignore_ascii_case(b"</a>")
}

/// Positions in `body` (the text after an opening bracket) where a closing
/// bracket can end the link text. A `[` skips to its matching `]`; a `]` can
/// be part of the text only when another `]` follows with no `[` between.
/// Candidates come back in ascending order.
fn bracket_stops(body: &str) -> Vec<usize> {
    let bytes = body.as_bytes();
    let mut reachable = vec![false; bytes.len() + 1];
    reachable[0] = true;
    let mut stops = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        if !reachable[i] {
            i += 1;
            continue;
        }
        match bytes[i] {
            b'[' => {
                if let Some(j) = body[i + 1..].find(']') {
                    reachable[i + 1 + j + 1] = true;
                }
            }
            b']' => {
                stops.push(i);
                if let Some(k) = body[i + 1..].find(['[', ']'])
                    && bytes[i + 1 + k] == b']'
                {
                    reachable[i + 1] = true;
                }
            }
            _ => {
                let step = body[i..].chars().next().map_or(1, char::len_utf8);
                reachable[i + step] = true;
            }
        }
        i += 1;
    }
    stops
}

/// Match a strong span at the head of `rest`: a two-character delimiter run,
/// closed by the same run not followed by a third delimiter.
fn scan_strong(rest: &str, style: EmphasisStyle) -> Option<(usize, &str)> {
    let bytes = rest.as_bytes();
    let delim = match (bytes.first(), bytes.get(1)) {
        (Some(b'*'), Some(b'*')) => b'*',
        (Some(b'_'), Some(b'_')) => b'_',
        _ => return None,
    };
    let pedantic = style == EmphasisStyle::Pedantic;
    if pedantic && !rest[2..].chars().next().is_some_and(|c| !c.is_whitespace()) {
        return None;
    }
    let mut pos = 3;
    while pos + 1 < bytes.len() {
        if bytes[pos] == delim
            && bytes[pos + 1] == delim
            && bytes.get(pos + 2) != Some(&delim)
            && (!pedantic
                || rest[2..pos]
                    .chars()
                    .next_back()
                    .is_some_and(|c| !c.is_whitespace()))
        {
            return Some((pos + 2, &rest[2..pos]));
        }
        pos += 1;
    }
    None
}

fn scan_emphasis(rest: &str, style: EmphasisStyle) -> Option<(usize, &str)> {
    let delim = match rest.as_bytes().first() {
        Some(b'*') => b'*',
        Some(b'_') => b'_',
        _ => return None,
    };
    match style {
        EmphasisStyle::Pedantic => scan_emphasis_pedantic(rest, delim),
        EmphasisStyle::Normal if delim == b'_' => scan_emphasis_underscore(rest),
        EmphasisStyle::Normal => scan_emphasis_star(rest),
    }
}

/// Star emphasis. `**` pairs inside the span pass through as content; a
/// star inside a pair run only closes once pairing has failed to reach a
/// closer, which is what lets `**a*b*c**` nest instead of closing early.
fn scan_emphasis_star(rest: &str) -> Option<(usize, &str)> {
    let bytes = rest.as_bytes();
    let mut pos = 1;
    let mut last_pair = None;
    while pos < bytes.len() {
        if bytes[pos] == b'*' {
            if bytes.get(pos + 1) == Some(&b'*') {
                last_pair = Some(pos);
                pos += 2;
                continue;
            }
            if pos > 1 {
                return Some((pos + 1, &rest[1..pos]));
            }
        }
        pos += 1;
    }
    // splitting the last pair exposes its second star as the closer
    last_pair.map(|pair| (pair + 2, &rest[1..pair + 1]))
}

/// Underscore emphasis closes only at a word boundary; an underscore inside
/// a word fails the whole span rather than closing it.
fn scan_emphasis_underscore(rest: &str) -> Option<(usize, &str)> {
    let bytes = rest.as_bytes();
    let mut pos = 1;
    while pos < bytes.len() {
        if bytes[pos] == b'_' {
            if bytes.get(pos + 1) == Some(&b'_') {
                pos += 2;
                continue;
            }
            if pos > 1 && !word_follows(rest, pos + 1) {
                return Some((pos + 1, &rest[1..pos]));
            }
            return None;
        }
        pos += 1;
    }
    None
}

/// Markdown.pl-style emphasis: any same-delimiter closer works as long as
/// the content edges are non-whitespace.
fn scan_emphasis_pedantic(rest: &str, delim: u8) -> Option<(usize, &str)> {
    let bytes = rest.as_bytes();
    if !rest[1..].chars().next().is_some_and(|c| !c.is_whitespace()) {
        return None;
    }
    let mut pos = 2;
    while pos < bytes.len() {
        if bytes[pos] == delim
            && bytes.get(pos + 1) != Some(&delim)
            && rest[1..pos]
                .chars()
                .next_back()
                .is_some_and(|c| !c.is_whitespace())
        {
            return Some((pos + 1, &rest[1..pos]));
        }
        pos += 1;
    }
    None
}

/// Match a code span: equal-length backtick runs around the content, which
/// loses exactly one leading and one trailing space.
fn scan_code_span(rest: &str) -> Option<(usize, &str)> {
    let bytes = rest.as_bytes();
    let open = bytes.iter().take_while(|&&b| b == b'`').count();
    if open == 0 {
        return None;
    }
    let mut pos = open;
    while pos < bytes.len() {
        if bytes[pos] == b'`' {
            let run = bytes[pos..].iter().take_while(|&&b| b == b'`').count();
            if run == open {
                let content = &rest[open..pos];
                let content = content.strip_prefix(' ').unwrap_or(content);
                let content = content.strip_suffix(' ').unwrap_or(content);
                return Some((pos + run, content));
            }
            pos += run;
            continue;
        }
        pos += 1;
    }
    None
}

fn word_follows(text: &str, at: usize) -> bool {
    text[at..]
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Whether `pos` starts a hard-break candidate: `min_spaces` or more spaces
/// directly before a newline.
fn break_ahead(bytes: &[u8], pos: usize, min_spaces: usize) -> bool {
    let mut end = pos;
    while bytes.get(end) == Some(&b' ') {
        end += 1;
    }
    end - pos >= min_spaces && bytes.get(end) == Some(&b'\n')
}
