use std::path::PathBuf;

use clap::Parser;

#[derive(Parser)]
#[command(name = "tinta")]
#[command(version)]
#[command(about = "Compile Markdown to HTML")]
#[command(
    long_about = "Tinta compiles Markdown to HTML, covering the common dialect plus pipe \
    tables, fenced code blocks, and strikethrough. Output can be tuned with the same options \
    the library exposes: pedantic original-flavor parsing, hard line breaks, sanitized HTML, \
    and smart typography."
)]
#[command(after_help = "\
EXAMPLES:

    # Render a file to stdout
    tinta notes.md

    # Render from stdin
    cat notes.md | tinta

    # Write the result next to the source
    tinta notes.md --output notes.html

    # Original-flavor parsing without the extended grammar
    tinta --pedantic --no-gfm notes.md")]
pub struct Cli {
    /// Input file (stdin if not provided)
    #[arg(help = "Input file path")]
    pub file: Option<PathBuf>,

    /// Write the rendered HTML to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Follow the original markdown.pl quirks where the dialects differ
    #[arg(long)]
    pub pedantic: bool,

    /// Turn off the extended grammar (fenced code, tables, strikethrough)
    #[arg(long)]
    pub no_gfm: bool,

    /// Render every newline inside a paragraph as a line break
    #[arg(long)]
    pub breaks: bool,

    /// Escape raw HTML and drop unsafe link schemes
    #[arg(long)]
    pub sanitize: bool,

    /// Replace ASCII quotes, dashes, and ellipses with typographic forms
    #[arg(long)]
    pub smartypants: bool,

    /// Respect ordered-list start numbers and bullet-style changes
    #[arg(long)]
    pub smart_lists: bool,

    /// Close void elements with a slash, XHTML style
    #[arg(long)]
    pub xhtml: bool,

    /// Seed for the mail-address mangler, for reproducible output
    #[arg(long, value_name = "SEED")]
    pub mangle_seed: Option<u64>,

    /// Render failures as an HTML fragment instead of exiting nonzero
    #[arg(long)]
    pub silent: bool,
}
