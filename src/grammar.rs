//! Grammar tables for both tokenization passes.
//!
//! Tables are pure data: compiled patterns plus the scan parameters the
//! tokenizers interpret. Each context derives from a base table by
//! selectively overriding entries, assembled once behind `LazyLock`.

pub mod block;
pub mod inline;
pub mod pattern;

pub use block::{BlockRules, block_rules};
pub use inline::{EmphasisStyle, InlineRules, inline_rules};
pub use pattern::PatternBuilder;
