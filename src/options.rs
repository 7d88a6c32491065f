//! Rendering options, the fluent builder, and process-wide defaults.

use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::highlight::Highlighter;
use crate::render::{HtmlRenderer, RenderFlags, Renderer};

/// Callback that rewrites a raw HTML fragment when sanitizing.
pub type Sanitizer = dyn Fn(&str) -> String + Send + Sync;

/// Everything a render call can be configured with. Plain data plus a few
/// shared strategy objects; cloning is cheap.
#[derive(Clone)]
pub struct Options {
    /// Extended grammar: fenced code, strikethrough, bare URL autolinks.
    pub gfm: bool,
    /// Pipe tables (only active together with `gfm`).
    pub tables: bool,
    /// Treat every newline inside a paragraph as a hard line break.
    pub breaks: bool,
    /// Emulate the original Markdown.pl: lax emphasis closers, fixed
    /// four-space outdenting, no trailing-blank trimming in code.
    pub pedantic: bool,
    /// Escape raw HTML and reject unsafe link schemes.
    pub sanitize: bool,
    /// When set, raw HTML is passed through this callback instead of being
    /// escaped. Only consulted while `sanitize` is on.
    pub sanitizer: Option<Arc<Sanitizer>>,
    /// Obfuscate autolinked email addresses with numeric references.
    pub mangle: bool,
    /// End a list when the bullet style changes between items.
    pub smart_lists: bool,
    /// Swallow errors and render an apology block instead.
    pub silent: bool,
    /// Code block highlighter.
    pub highlighter: Option<Arc<dyn Highlighter>>,
    /// Class prefix for fenced code languages.
    pub lang_prefix: String,
    /// Typographic quotes, dashes and ellipses in plain text.
    pub smartypants: bool,
    /// Prefix for generated heading ids.
    pub header_id_prefix: String,
    /// Output strategy.
    pub renderer: Arc<dyn Renderer>,
    /// Self-closing void elements in the output.
    pub xhtml: bool,
    /// Fixed seed for email mangling; fresh entropy when unset.
    pub mangle_seed: Option<u64>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            gfm: true,
            tables: true,
            breaks: false,
            pedantic: false,
            sanitize: false,
            sanitizer: None,
            mangle: true,
            smart_lists: false,
            silent: false,
            highlighter: None,
            lang_prefix: "lang-".to_string(),
            smartypants: false,
            header_id_prefix: String::new(),
            renderer: Arc::new(HtmlRenderer),
            xhtml: false,
            mangle_seed: None,
        }
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("gfm", &self.gfm)
            .field("tables", &self.tables)
            .field("breaks", &self.breaks)
            .field("pedantic", &self.pedantic)
            .field("sanitize", &self.sanitize)
            .field("sanitizer", &self.sanitizer.is_some())
            .field("mangle", &self.mangle)
            .field("smart_lists", &self.smart_lists)
            .field("silent", &self.silent)
            .field("highlighter", &self.highlighter.is_some())
            .field("lang_prefix", &self.lang_prefix)
            .field("smartypants", &self.smartypants)
            .field("header_id_prefix", &self.header_id_prefix)
            .field("xhtml", &self.xhtml)
            .field("mangle_seed", &self.mangle_seed)
            .finish_non_exhaustive()
    }
}

impl Options {
    /// Builder seeded from the process-wide defaults.
    pub fn builder() -> OptionsBuilder {
        OptionsBuilder {
            options: defaults().clone(),
        }
    }

    pub(crate) fn render_flags(&self) -> RenderFlags {
        RenderFlags {
            xhtml: self.xhtml,
            sanitize: self.sanitize,
            lang_prefix: self.lang_prefix.clone(),
            header_id_prefix: self.header_id_prefix.clone(),
        }
    }
}

static DEFAULTS: OnceLock<Options> = OnceLock::new();

/// The process-wide default options. Until [`set_defaults`] succeeds this
/// is the built-in configuration.
pub fn defaults() -> &'static Options {
    DEFAULTS.get_or_init(Options::default)
}

/// Install process-wide defaults, once. Fails if defaults were already
/// installed or read, handing the rejected options back.
pub fn set_defaults(options: Options) -> Result<(), Options> {
    DEFAULTS.set(options)
}

/// Fluent constructor for [`Options`].
#[derive(Debug, Clone, Default)]
pub struct OptionsBuilder {
    options: Options,
}

impl OptionsBuilder {
    pub fn gfm(mut self, on: bool) -> Self {
        self.options.gfm = on;
        self
    }

    pub fn tables(mut self, on: bool) -> Self {
        self.options.tables = on;
        self
    }

    pub fn breaks(mut self, on: bool) -> Self {
        self.options.breaks = on;
        self
    }

    pub fn pedantic(mut self, on: bool) -> Self {
        self.options.pedantic = on;
        self
    }

    pub fn sanitize(mut self, on: bool) -> Self {
        self.options.sanitize = on;
        self
    }

    pub fn sanitizer(mut self, sanitizer: impl Fn(&str) -> String + Send + Sync + 'static) -> Self {
        self.options.sanitizer = Some(Arc::new(sanitizer));
        self
    }

    pub fn mangle(mut self, on: bool) -> Self {
        self.options.mangle = on;
        self
    }

    pub fn smart_lists(mut self, on: bool) -> Self {
        self.options.smart_lists = on;
        self
    }

    pub fn silent(mut self, on: bool) -> Self {
        self.options.silent = on;
        self
    }

    pub fn highlighter(mut self, highlighter: impl Highlighter + 'static) -> Self {
        self.options.highlighter = Some(Arc::new(highlighter));
        self
    }

    pub fn lang_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.options.lang_prefix = prefix.into();
        self
    }

    pub fn smartypants(mut self, on: bool) -> Self {
        self.options.smartypants = on;
        self
    }

    pub fn header_id_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.options.header_id_prefix = prefix.into();
        self
    }

    pub fn renderer(mut self, renderer: impl Renderer + 'static) -> Self {
        self.options.renderer = Arc::new(renderer);
        self
    }

    pub fn xhtml(mut self, on: bool) -> Self {
        self.options.xhtml = on;
        self
    }

    pub fn mangle_seed(mut self, seed: u64) -> Self {
        self.options.mangle_seed = Some(seed);
        self
    }

    pub fn build(self) -> Options {
        self.options
    }
}
