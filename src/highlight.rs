//! Syntax highlighting hooks for code blocks.

use rayon::prelude::*;

use crate::error::Error;
use crate::token::Token;

/// Code block highlighter plugged into [`Options`](crate::Options).
///
/// Returning `Ok(None)` declines the block and leaves it to the plain code
/// path. `Ok(Some(html))` replaces the block's contents with ready-made
/// markup that is emitted without further escaping. `Err` aborts the render
/// with [`Error::Highlight`].
pub trait Highlighter: Send + Sync {
    fn highlight(&self, code: &str, lang: Option<&str>) -> Result<Option<String>, String>;
}

/// Offer one code block to the highlighter, rewriting it in place when the
/// highlighter accepts.
pub(crate) fn highlight_code(
    text: &mut String,
    lang: Option<&str>,
    pre_escaped: &mut bool,
    highlighter: &dyn Highlighter,
) -> Result<(), Error> {
    match highlighter.highlight(text, lang) {
        Ok(Some(html)) => {
            // an unchanged block keeps the plain escaping path
            if html != *text {
                *text = html;
                *pre_escaped = true;
            }
            Ok(())
        }
        Ok(None) => Ok(()),
        Err(reason) => Err(Error::Highlight { reason }),
    }
}

/// Run the highlighter over every code token in place, in parallel. The
/// asynchronous entry point does this before compiling, so the compiler
/// itself never blocks on highlighting.
pub(crate) fn apply_highlighting(
    tokens: &mut [Token],
    highlighter: &dyn Highlighter,
) -> Result<(), Error> {
    tokens.par_iter_mut().try_for_each(|token| {
        if let Token::Code {
            text,
            lang,
            pre_escaped,
        } = token
        {
            highlight_code(text, lang.as_deref(), pre_escaped, highlighter)
        } else {
            Ok(())
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Upper;

    impl Highlighter for Upper {
        fn highlight(&self, code: &str, lang: Option<&str>) -> Result<Option<String>, String> {
            match lang {
                Some("shout") => Ok(Some(code.to_uppercase())),
                Some("bad") => Err("no such grammar".to_string()),
                _ => Ok(None),
            }
        }
    }

    fn code(text: &str, lang: Option<&str>) -> Token {
        Token::Code {
            text: text.to_string(),
            lang: lang.map(str::to_string),
            pre_escaped: false,
        }
    }

    #[test]
    fn test_replaces_accepted_blocks() {
        let mut tokens = vec![code("hi", Some("shout")), Token::Space];
        apply_highlighting(&mut tokens, &Upper).unwrap();
        assert_eq!(
            tokens[0],
            Token::Code {
                text: "HI".to_string(),
                lang: Some("shout".to_string()),
                pre_escaped: true,
            }
        );
    }

    #[test]
    fn test_declined_blocks_keep_plain_path() {
        let mut tokens = vec![code("hi", Some("other")), code("lone", None)];
        apply_highlighting(&mut tokens, &Upper).unwrap();
        assert_eq!(tokens[0], code("hi", Some("other")));
        assert_eq!(tokens[1], code("lone", None));
    }

    #[test]
    fn test_unchanged_output_is_not_marked_escaped() {
        let mut tokens = vec![code("HI", Some("shout"))];
        apply_highlighting(&mut tokens, &Upper).unwrap();
        assert_eq!(tokens[0], code("HI", Some("shout")));
    }

    #[test]
    fn test_error_aborts() {
        let mut tokens = vec![code("x", Some("bad"))];
        let err = apply_highlighting(&mut tokens, &Upper).unwrap_err();
        assert_eq!(
            err.to_string(),
            "syntax highlighter failed: no such grammar"
        );
    }
}
