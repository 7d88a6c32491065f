//! A Markdown-to-HTML compiler with GFM tables, smart typography, and a
//! pluggable renderer.
//!
//! Rendering runs in three stages: [`tokenize`] flattens the source into
//! block tokens and collects reference links, the [`Parser`] walks that
//! stream, and a [`Renderer`] turns each construct into markup. The
//! top-level [`render`] and [`render_with`] functions wire the stages
//! together; [`render_async`] does the same on a background thread.

pub mod error;
mod grammar;
pub mod highlight;
mod inline;
pub mod lexer;
pub mod options;
pub mod parser;
pub mod render;
pub mod token;

pub use error::Error;
pub use error::Stage;
pub use highlight::Highlighter;
pub use lexer::tokenize;
pub use options::Options;
pub use options::OptionsBuilder;
pub use options::defaults;
pub use options::set_defaults;
pub use parser::Parser;
pub use render::HtmlRenderer;
pub use render::RenderFlags;
pub use render::Renderer;
pub use token::Align;
pub use token::LinkRef;
pub use token::LinkTable;
pub use token::Token;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Renders a document to HTML with the process-wide default options.
///
/// # Examples
///
/// ```rust
/// let html = tinta::render("# Hello\n\nSome *emphasis*.").unwrap();
/// assert!(html.starts_with("<h1"));
/// ```
///
/// # Arguments
///
/// * `src` - The document source to render
pub fn render(src: &str) -> Result<String, Error> {
    render_with(src, defaults())
}

/// Renders a document to HTML with explicit options.
///
/// # Examples
///
/// ```rust
/// use tinta::Options;
///
/// let options = Options::builder().breaks(true).build();
/// let html = tinta::render_with("line\nbreak", &options).unwrap();
/// assert_eq!(html, "<p>line<br>break</p>\n");
/// ```
///
/// # Arguments
///
/// * `src` - The document source to render
/// * `options` - Rendering options, usually built with [`Options::builder`]
pub fn render_with(src: &str, options: &Options) -> Result<String, Error> {
    #[cfg(debug_assertions)]
    {
        init_logger();
    }

    let result = tokenize(src, options)
        .and_then(|(tokens, links)| Parser::parse(tokens, &links, options));
    absorb_errors(result, options)
}

/// Renders a document on a background thread and hands the result to `done`.
///
/// Syntax highlighting runs as a parallel pre-pass over every code block
/// before the token stream is compiled, so one slow highlighter call does
/// not serialize the rest.
///
/// # Arguments
///
/// * `src` - The document source to render
/// * `options` - Rendering options for this call
/// * `done` - Completion callback, invoked once with the outcome
pub fn render_async(
    src: String,
    options: Options,
    done: impl FnOnce(Result<String, Error>) + Send + 'static,
) {
    std::thread::spawn(move || {
        #[cfg(debug_assertions)]
        {
            init_logger();
        }

        let result = tokenize(&src, &options).and_then(|(mut tokens, links)| {
            if let Some(highlighter) = &options.highlighter {
                highlight::apply_highlighting(&mut tokens, highlighter.as_ref())?;
            }
            Parser::parse_with(tokens, &links, &options, false)
        });
        done(absorb_errors(result, &options));
    });
}

/// In silent mode a failed render degrades to an HTML fragment carrying the
/// error message instead of surfacing the error.
fn absorb_errors(result: Result<String, Error>, options: &Options) -> Result<String, Error> {
    match result {
        Err(err) if options.silent => {
            log::debug!("absorbing render failure: {err}");
            Ok(format!(
                "<p>An error occurred:</p><pre>{}</pre>",
                render::escape(&err.to_string(), true)
            ))
        }
        other => other,
    }
}
