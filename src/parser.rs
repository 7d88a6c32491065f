//! Compiles a block token stream into final markup.
//!
//! The parser walks the flat stream produced by [`tokenize`](crate::lexer::tokenize),
//! recursing on container start markers until it hits the matching end marker.
//! Inline text inside headings, paragraphs, and table cells goes through the
//! inline lexer on the way out.

use std::iter::Peekable;
use std::vec::IntoIter;

use crate::error::Error;
use crate::highlight::highlight_code;
use crate::inline::InlineLexer;
use crate::options::Options;
use crate::render::RenderFlags;
use crate::token::{Align, LinkTable, Token};

pub struct Parser<'a> {
    options: &'a Options,
    inline: InlineLexer<'a>,
    flags: RenderFlags,
    iter: Peekable<IntoIter<Token>>,
    apply_highlight: bool,
}

impl<'a> Parser<'a> {
    /// Compile a token stream against the reference links gathered while
    /// tokenizing.
    pub fn parse(
        tokens: Vec<Token>,
        links: &'a LinkTable,
        options: &'a Options,
    ) -> Result<String, Error> {
        Self::parse_with(tokens, links, options, true)
    }

    /// `apply_highlight` is false when a highlighting pre-pass already ran
    /// over the token stream.
    pub(crate) fn parse_with(
        tokens: Vec<Token>,
        links: &'a LinkTable,
        options: &'a Options,
        apply_highlight: bool,
    ) -> Result<String, Error> {
        log::debug!("compiling {} block tokens", tokens.len());
        let mut parser = Parser {
            options,
            inline: InlineLexer::new(links, options),
            flags: options.render_flags(),
            iter: tokens.into_iter().peekable(),
            apply_highlight,
        };
        let mut out = String::new();
        while let Some(token) = parser.iter.next() {
            out.push_str(&parser.tok(token)?);
        }
        Ok(out)
    }

    fn tok(&mut self, token: Token) -> Result<String, Error> {
        Ok(match token {
            Token::Space => String::new(),
            Token::HorizontalRule => self.options.renderer.horizontal_rule(&self.flags),
            Token::Heading { depth, text } => {
                let content = self.inline.render_inline(&text)?;
                self.options
                    .renderer
                    .heading(&self.flags, &content, depth, &text)
            }
            Token::Code {
                mut text,
                lang,
                mut pre_escaped,
            } => {
                if self.apply_highlight
                    && let Some(highlighter) = &self.options.highlighter
                {
                    highlight_code(
                        &mut text,
                        lang.as_deref(),
                        &mut pre_escaped,
                        highlighter.as_ref(),
                    )?;
                }
                self.options
                    .renderer
                    .code(&self.flags, &text, lang.as_deref(), pre_escaped)
            }
            Token::Table {
                header,
                align,
                cells,
            } => {
                let mut head = String::new();
                for (i, cell) in header.iter().enumerate() {
                    let content = self.inline.render_inline(cell)?;
                    head.push_str(&self.options.renderer.table_cell(
                        &self.flags,
                        &content,
                        true,
                        column_align(&align, i),
                    ));
                }
                let head = self.options.renderer.table_row(&self.flags, &head);
                let mut body = String::new();
                for row in &cells {
                    let mut cols = String::new();
                    for (i, cell) in row.iter().enumerate() {
                        let content = self.inline.render_inline(cell)?;
                        cols.push_str(&self.options.renderer.table_cell(
                            &self.flags,
                            &content,
                            false,
                            column_align(&align, i),
                        ));
                    }
                    body.push_str(&self.options.renderer.table_row(&self.flags, &cols));
                }
                self.options.renderer.table(&self.flags, &head, &body)
            }
            Token::BlockquoteStart => {
                let mut body = String::new();
                while let Some(token) = self.iter.next() {
                    if token == Token::BlockquoteEnd {
                        break;
                    }
                    body.push_str(&self.tok(token)?);
                }
                self.options.renderer.blockquote(&self.flags, &body)
            }
            Token::ListStart { ordered } => {
                let mut body = String::new();
                while let Some(token) = self.iter.next() {
                    if token == Token::ListEnd {
                        break;
                    }
                    body.push_str(&self.tok(token)?);
                }
                self.options.renderer.list(&self.flags, &body, ordered)
            }
            Token::ListItemStart { loose } => {
                let mut body = String::new();
                while let Some(token) = self.iter.next() {
                    if token == Token::ListItemEnd {
                        break;
                    }
                    // Tight items inline their text without a paragraph wrapper.
                    let piece = match token {
                        Token::Text { text } if !loose => self.parse_text(text)?,
                        other => self.tok(other)?,
                    };
                    body.push_str(&piece);
                }
                self.options.renderer.list_item(&self.flags, &body)
            }
            Token::Html { text, is_pre } => {
                let html = if !is_pre && !self.options.pedantic {
                    self.inline.render_inline(&text)?
                } else {
                    text
                };
                self.options.renderer.html(&self.flags, &html)
            }
            Token::Paragraph { text } => {
                let content = self.inline.render_inline(&text)?;
                self.options.renderer.paragraph(&self.flags, &content)
            }
            Token::Text { text } => {
                let content = self.parse_text(text)?;
                self.options.renderer.paragraph(&self.flags, &content)
            }
            // End markers are consumed by their container loops; a stray one
            // renders nothing.
            Token::BlockquoteEnd | Token::ListEnd | Token::ListItemEnd => String::new(),
        })
    }

    /// Folds a run of consecutive text tokens into a single inline pass.
    fn parse_text(&mut self, first: String) -> Result<String, Error> {
        let mut body = first;
        while let Some(Token::Text { text }) = self
            .iter
            .next_if(|token| matches!(token, Token::Text { .. }))
        {
            body.push('\n');
            body.push_str(&text);
        }
        self.inline.render_inline(&body)
    }
}

fn column_align(align: &[Align], column: usize) -> Align {
    align.get(column).copied().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::highlight::Highlighter;
    use crate::lexer::tokenize;
    use crate::options::OptionsBuilder;

    fn compile(src: &str) -> String {
        compile_with(src, &Options::default())
    }

    fn compile_with(src: &str, options: &Options) -> String {
        let (tokens, links) = tokenize(src, options).unwrap();
        Parser::parse(tokens, &links, options).unwrap()
    }

    #[test]
    fn test_paragraph_with_inline_markup() {
        assert_eq!(compile("Hello *world*"), "<p>Hello <em>world</em></p>\n");
    }

    #[test]
    fn test_heading_id_comes_from_raw_text() {
        assert_eq!(compile("# My Title"), "<h1 id=\"my-title\">My Title</h1>\n");
        assert_eq!(compile("# A *B*"), "<h1 id=\"a-b-\">A <em>B</em></h1>\n");
    }

    #[test]
    fn test_tight_item_skips_paragraph_wrapper() {
        assert_eq!(compile("- a\n- b"), "<ul>\n<li>a</li>\n<li>b</li>\n</ul>\n");
    }

    #[test]
    fn test_loose_item_keeps_paragraph_wrapper() {
        assert_eq!(
            compile("- a\n\n- b"),
            "<ul>\n<li><p>a</p>\n</li>\n<li><p>b</p>\n</li>\n</ul>\n"
        );
    }

    #[test]
    fn test_text_tokens_coalesce_before_inline_pass() {
        assert_eq!(compile("- a\n  b"), "<ul>\n<li>a\nb</li>\n</ul>\n");
    }

    #[test]
    fn test_blockquote_wraps_inner_blocks() {
        assert_eq!(
            compile("> quoted"),
            "<blockquote>\n<p>quoted</p>\n</blockquote>\n"
        );
    }

    #[test]
    fn test_indented_code_has_no_trailing_newline() {
        assert_eq!(compile("    indented"), "<pre><code>indented\n</code></pre>");
    }

    #[test]
    fn test_fenced_code_carries_language_class() {
        assert_eq!(
            compile("```rust\nfn x() {}\n```"),
            "<pre><code class=\"lang-rust\">fn x() {}\n</code></pre>\n"
        );
    }

    #[test]
    fn test_table_cells_follow_column_alignment() {
        assert_eq!(
            compile("a|b\n-|-:\n1|2"),
            "<table>\n<thead>\n<tr>\n<th>a</th>\n<th style=\"text-align:right\">b</th>\n\
             </tr>\n</thead>\n<tbody>\n<tr>\n<td>1</td>\n\
             <td style=\"text-align:right\">2</td>\n</tr>\n</tbody>\n</table>\n"
        );
    }

    #[test]
    fn test_row_shorter_than_alignment_defaults_to_none() {
        let html = compile("a|b|c\n-|:-:|-\n1|2");
        assert!(html.contains("<td style=\"text-align:center\">2</td>"));
        assert!(!html.contains("<td style=\"text-align:center\">1</td>"));
    }

    struct Shout;

    impl Highlighter for Shout {
        fn highlight(&self, code: &str, lang: Option<&str>) -> Result<Option<String>, String> {
            match lang {
                Some("shout") => Ok(Some(code.to_uppercase())),
                _ => Ok(None),
            }
        }
    }

    #[test]
    fn test_code_runs_through_highlighter() {
        let options = OptionsBuilder::default().highlighter(Shout).build();
        assert_eq!(
            compile_with("```shout\nhi\n```", &options),
            "<pre><code class=\"lang-shout\">HI\n</code></pre>\n"
        );
    }

    #[test]
    fn test_unclaimed_language_falls_back_to_escaping() {
        let options = OptionsBuilder::default().highlighter(Shout).build();
        assert_eq!(
            compile_with("```c\na < b\n```", &options),
            "<pre><code class=\"lang-c\">a &lt; b\n</code></pre>\n"
        );
    }

    #[test]
    fn test_html_block_gets_inline_rendering() {
        assert_eq!(compile("<div>*x*</div>"), "<div><em>x</em></div>");
    }

    #[test]
    fn test_pre_block_is_left_alone() {
        assert_eq!(compile("<pre>*x*</pre>"), "<pre>*x*</pre>");
    }
}
