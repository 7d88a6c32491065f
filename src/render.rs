//! Output strategy: the [`Renderer`] trait and the default HTML5 renderer.
//!
//! Every method has a default body, so an implementation overrides any
//! subset and composes with the default for the rest. Presentation inputs
//! the defaults need arrive as [`RenderFlags`], derived from the active
//! options by the compiler.

use std::sync::LazyLock;

use regex::Regex;

use crate::token::Align;

/// Presentation switches consulted by the default method bodies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderFlags {
    /// Emit XHTML self-closing forms for void elements.
    pub xhtml: bool,
    /// Reject unsafe link schemes.
    pub sanitize: bool,
    /// Class prefix for fenced code languages.
    pub lang_prefix: String,
    /// Prefix for generated heading ids.
    pub header_id_prefix: String,
}

impl Default for RenderFlags {
    fn default() -> Self {
        Self {
            xhtml: false,
            sanitize: false,
            lang_prefix: "lang-".to_string(),
            header_id_prefix: String::new(),
        }
    }
}

/// One method per emitted shape. Inline-level arguments (`text`, `href`,
/// `title`) arrive already escaped or rendered by the inline tokenizer;
/// block-level bodies arrive fully rendered.
pub trait Renderer: Send + Sync {
    fn code(&self, flags: &RenderFlags, code: &str, lang: Option<&str>, escaped: bool) -> String {
        let body = if escaped {
            code.to_string()
        } else {
            escape(code, true)
        };
        match lang {
            Some(lang) => format!(
                "<pre><code class=\"{}{}\">{}\n</code></pre>\n",
                flags.lang_prefix,
                escape(lang, true),
                body
            ),
            None => format!("<pre><code>{}\n</code></pre>", body),
        }
    }

    fn blockquote(&self, _flags: &RenderFlags, body: &str) -> String {
        format!("<blockquote>\n{}</blockquote>\n", body)
    }

    fn html(&self, _flags: &RenderFlags, html: &str) -> String {
        html.to_string()
    }

    fn heading(&self, flags: &RenderFlags, text: &str, depth: u8, raw: &str) -> String {
        format!(
            "<h{} id=\"{}{}\">{}</h{}>\n",
            depth,
            flags.header_id_prefix,
            heading_id(raw),
            text,
            depth
        )
    }

    fn horizontal_rule(&self, flags: &RenderFlags) -> String {
        if flags.xhtml { "<hr/>\n" } else { "<hr>\n" }.to_string()
    }

    fn list(&self, _flags: &RenderFlags, body: &str, ordered: bool) -> String {
        let tag = if ordered { "ol" } else { "ul" };
        format!("<{}>\n{}</{}>\n", tag, body, tag)
    }

    fn list_item(&self, _flags: &RenderFlags, body: &str) -> String {
        format!("<li>{}</li>\n", body)
    }

    fn paragraph(&self, _flags: &RenderFlags, text: &str) -> String {
        format!("<p>{}</p>\n", text)
    }

    fn table(&self, _flags: &RenderFlags, header: &str, body: &str) -> String {
        format!(
            "<table>\n<thead>\n{}</thead>\n<tbody>\n{}</tbody>\n</table>\n",
            header, body
        )
    }

    fn table_row(&self, _flags: &RenderFlags, content: &str) -> String {
        format!("<tr>\n{}</tr>\n", content)
    }

    fn table_cell(
        &self,
        _flags: &RenderFlags,
        content: &str,
        header: bool,
        align: Align,
    ) -> String {
        let tag = if header { "th" } else { "td" };
        match align.as_css() {
            Some(css) => format!("<{} style=\"text-align:{}\">{}</{}>\n", tag, css, content, tag),
            None => format!("<{}>{}</{}>\n", tag, content, tag),
        }
    }

    fn strong(&self, _flags: &RenderFlags, text: &str) -> String {
        format!("<strong>{}</strong>", text)
    }

    fn emphasis(&self, _flags: &RenderFlags, text: &str) -> String {
        format!("<em>{}</em>", text)
    }

    fn code_span(&self, _flags: &RenderFlags, text: &str) -> String {
        format!("<code>{}</code>", text)
    }

    fn line_break(&self, flags: &RenderFlags) -> String {
        if flags.xhtml { "<br/>" } else { "<br>" }.to_string()
    }

    fn strikethrough(&self, _flags: &RenderFlags, text: &str) -> String {
        format!("<del>{}</del>", text)
    }

    fn link(&self, flags: &RenderFlags, href: &str, title: Option<&str>, text: &str) -> String {
        let href = if flags.sanitize && unsafe_href(href) {
            ""
        } else {
            href
        };
        let mut out = format!("<a href=\"{}\"", href);
        if let Some(title) = title {
            out.push_str(" title=\"");
            out.push_str(title);
            out.push('"');
        }
        out.push('>');
        out.push_str(text);
        out.push_str("</a>");
        out
    }

    fn image(&self, flags: &RenderFlags, href: &str, title: Option<&str>, text: &str) -> String {
        let mut out = format!("<img src=\"{}\" alt=\"{}\"", href, text);
        if let Some(title) = title {
            out.push_str(" title=\"");
            out.push_str(title);
            out.push('"');
        }
        out.push_str(if flags.xhtml { "/>" } else { ">" });
        out
    }

    fn text(&self, _flags: &RenderFlags, text: &str) -> String {
        text.to_string()
    }
}

/// The default output strategy: all trait defaults, no overrides.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlRenderer;

impl Renderer for HtmlRenderer {}

/// Escape HTML-special characters. With `encode` every ampersand is
/// encoded; without it, ampersands already starting an entity are left
/// alone so escaped text survives a second pass unchanged.
pub fn escape(text: &str, encode: bool) -> String {
    let mut out = String::with_capacity(text.len());
    for (i, c) in text.char_indices() {
        match c {
            '&' => {
                if !encode && entity_follows(&text[i + 1..]) {
                    out.push('&');
                } else {
                    out.push_str("&amp;");
                }
            }
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// True when `rest` begins with the tail of a character entity
/// (`#?[A-Za-z0-9_]+;`).
fn entity_follows(rest: &str) -> bool {
    let body = rest.strip_prefix('#').unwrap_or(rest);
    let end = body
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .unwrap_or(body.len());
    end > 0 && body[end..].starts_with(';')
}

static ENTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)&(#(?:[0-9]+)|(?:#x[0-9A-Fa-f]+)|(?:[A-Za-z0-9_]+));?").unwrap()
});

/// Decode character entities the way the sanitizer needs: numeric
/// references and `&colon;` become their characters, other named entities
/// are dropped.
pub(crate) fn unescape(text: &str) -> String {
    ENTITY
        .replace_all(text, |caps: &regex::Captures<'_>| {
            let name = caps[1].to_lowercase();
            if name == "colon" {
                return ":".to_string();
            }
            if let Some(num) = name.strip_prefix('#') {
                let code = if let Some(hex) = num.strip_prefix('x') {
                    u32::from_str_radix(hex, 16).ok()
                } else {
                    num.parse::<u32>().ok()
                };
                return code
                    .and_then(char::from_u32)
                    .unwrap_or('\u{FFFD}')
                    .to_string();
            }
            String::new()
        })
        .into_owned()
}

/// Percent-decode, rejecting malformed sequences and invalid UTF-8.
fn percent_decode(text: &str) -> Option<String> {
    let bytes = text.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = bytes.get(i + 1..i + 3)?;
            let hi = (hex[0] as char).to_digit(16)?;
            let lo = (hex[1] as char).to_digit(16)?;
            out.push((hi * 16 + lo) as u8);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}

/// Scheme check behind `sanitize`: decode the target, keep only word
/// characters and colons, and compare case-insensitively. An undecodable
/// target counts as unsafe.
pub(crate) fn unsafe_href(href: &str) -> bool {
    let Some(decoded) = percent_decode(&unescape(href)) else {
        return true;
    };
    let proto: String = decoded
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == ':')
        .collect::<String>()
        .to_lowercase();
    proto.starts_with("javascript:") || proto.starts_with("vbscript:")
}

/// Heading id from the raw heading text: lowercased, runs of non-word
/// characters collapsed to `-`.
fn heading_id(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut dash = false;
    for c in raw.to_lowercase().chars() {
        if c.is_ascii_alphanumeric() || c == '_' {
            out.push(c);
            dash = false;
        } else if !dash {
            out.push('-');
            dash = true;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_specials() {
        assert_eq!(escape("<a & \"b\"'", false), "&lt;a &amp; &quot;b&quot;&#39;");
    }

    #[test]
    fn test_escape_keeps_existing_entities() {
        assert_eq!(escape("&amp; &#39; &#x27;", false), "&amp; &#39; &#x27;");
        assert_eq!(escape("&amp;", true), "&amp;amp;");
        assert_eq!(escape("a & b", false), "a &amp; b");
    }

    #[test]
    fn test_unescape_numeric_and_colon() {
        assert_eq!(unescape("&#106;&#97;"), "ja");
        assert_eq!(unescape("&#x6A;"), "j");
        assert_eq!(unescape("&colon;"), ":");
        assert_eq!(unescape("&bogus;x"), "x");
    }

    #[test]
    fn test_unsafe_href_detects_obfuscated_schemes() {
        assert!(unsafe_href("javascript:alert(1)"));
        assert!(unsafe_href("JAVASCRIPT:alert(1)"));
        assert!(unsafe_href("java&#115;cript:alert(1)"));
        assert!(unsafe_href("vbscript:msgbox"));
        assert!(unsafe_href("java%73cript:alert(1)"));
        assert!(!unsafe_href("http://x.test"));
        assert!(!unsafe_href("/relative"));
    }

    #[test]
    fn test_undecodable_href_is_unsafe() {
        assert!(unsafe_href("%ZZ"));
        assert!(unsafe_href("%a"));
    }

    #[test]
    fn test_heading_id() {
        assert_eq!(heading_id("Hello World"), "hello-world");
        assert_eq!(heading_id("Hello *World*"), "hello-world-");
        assert_eq!(heading_id("a_b 9"), "a_b-9");
    }

    #[test]
    fn test_code_with_and_without_lang() {
        let r = HtmlRenderer;
        let f = RenderFlags::default();
        assert_eq!(
            r.code(&f, "x < y", Some("rust"), false),
            "<pre><code class=\"lang-rust\">x &lt; y\n</code></pre>\n"
        );
        assert_eq!(r.code(&f, "x", None, false), "<pre><code>x\n</code></pre>");
        assert_eq!(
            r.code(&f, "<b>hi</b>", None, true),
            "<pre><code><b>hi</b>\n</code></pre>"
        );
    }

    #[test]
    fn test_xhtml_void_elements() {
        let r = HtmlRenderer;
        let xhtml = RenderFlags {
            xhtml: true,
            ..RenderFlags::default()
        };
        let html = RenderFlags::default();
        assert_eq!(r.horizontal_rule(&xhtml), "<hr/>\n");
        assert_eq!(r.horizontal_rule(&html), "<hr>\n");
        assert_eq!(r.line_break(&xhtml), "<br/>");
        assert_eq!(r.image(&xhtml, "/i.png", None, "alt"), "<img src=\"/i.png\" alt=\"alt\"/>");
        assert_eq!(r.image(&html, "/i.png", None, "alt"), "<img src=\"/i.png\" alt=\"alt\">");
    }

    #[test]
    fn test_table_cell_alignment() {
        let r = HtmlRenderer;
        let f = RenderFlags::default();
        assert_eq!(
            r.table_cell(&f, "x", true, Align::Center),
            "<th style=\"text-align:center\">x</th>\n"
        );
        assert_eq!(r.table_cell(&f, "x", false, Align::None), "<td>x</td>\n");
    }

    #[test]
    fn test_link_sanitize_renders_empty_href() {
        let r = HtmlRenderer;
        let f = RenderFlags {
            sanitize: true,
            ..RenderFlags::default()
        };
        assert_eq!(
            r.link(&f, "javascript:alert(1)", None, "x"),
            "<a href=\"\">x</a>"
        );
        assert_eq!(
            r.link(&f, "http://x.test", Some("T"), "x"),
            "<a href=\"http://x.test\" title=\"T\">x</a>"
        );
    }

    #[test]
    fn test_partial_override_composes_with_defaults() {
        // The one override the surrounding application ships: external
        // links open in a new context, everything else stays default.
        struct NewTabLinks;
        impl Renderer for NewTabLinks {
            fn link(
                &self,
                _flags: &RenderFlags,
                href: &str,
                title: Option<&str>,
                text: &str,
            ) -> String {
                format!(
                    "<a href='{}' title='{}' target='_blank'>{}</a>",
                    href,
                    title.unwrap_or(""),
                    text
                )
            }
        }
        let r = NewTabLinks;
        let f = RenderFlags::default();
        assert_eq!(
            r.link(&f, "http://x.test", None, "x"),
            "<a href='http://x.test' title='' target='_blank'>x</a>"
        );
        assert_eq!(r.paragraph(&f, "p"), "<p>p</p>\n");
    }
}
