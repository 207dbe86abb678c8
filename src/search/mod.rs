//! Full-text search over decoded file contents.
//!
//! A query is compiled once with [`compile_pattern`] (or
//! [`SearchOptions::compile`]) and the resulting [`CompiledPattern`] is passed
//! to [`search`] for each file. There is no hidden pattern cache.

mod engine;
mod pattern;

pub use engine::{search, search_files, FileSearchResult, LineIndex, SearchMatch};
pub use pattern::{compile_pattern, CompiledPattern};

use crate::error::PatternError;

pub const DEFAULT_CONTEXT_LINES: u32 = 2;

/// Everything a caller specifies for one search request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchOptions {
    pub query: String,
    pub case_sensitive: bool,
    pub whole_word: bool,
    pub use_regex: bool,
    pub context_lines: u32,
    pub max_matches_per_file: Option<usize>,
}

impl SearchOptions {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            case_sensitive: false,
            whole_word: false,
            use_regex: false,
            context_lines: DEFAULT_CONTEXT_LINES,
            max_matches_per_file: None,
        }
    }

    pub fn case_sensitive(mut self, yes: bool) -> Self {
        self.case_sensitive = yes;
        self
    }

    pub fn whole_word(mut self, yes: bool) -> Self {
        self.whole_word = yes;
        self
    }

    pub fn regex(mut self, yes: bool) -> Self {
        self.use_regex = yes;
        self
    }

    pub fn context_lines(mut self, lines: u32) -> Self {
        self.context_lines = lines;
        self
    }

    pub fn max_matches_per_file(mut self, max: Option<usize>) -> Self {
        self.max_matches_per_file = max;
        self
    }

    pub fn compile(&self) -> Result<Option<CompiledPattern>, PatternError> {
        compile_pattern(
            &self.query,
            self.case_sensitive,
            self.whole_word,
            self.use_regex,
        )
    }
}
