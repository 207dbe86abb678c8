use clap::Parser;

use crate::filter::FilterCriteria;
use crate::search::{SearchOptions, DEFAULT_CONTEXT_LINES};
use crate::tree::Category;

/// 64 MiB; well above any store-listed extension.
pub const DEFAULT_MAX_CONTAINER_SIZE: u64 = 64 * 1024 * 1024;
pub const DEFAULT_MAX_ENTRIES: usize = 65_535;

#[derive(Parser, Debug)]
#[command(name = "crxscope")]
#[command(version)]
#[command(about = "Inspect browser extension (CRX) packages", long_about = None)]
#[command(after_help = "Examples:\n  \
  crxscope ext.crx -t --category code          show the tree of code files\n  \
  crxscope ext.crx -s 'eval(' -C 1             search all text files\n  \
  crxscope ext.crx -p manifest.json            print a file to stdout\n  \
  crxscope -l https://example.com/ext.crx      list files from a remote package")]
pub struct Cli {
    /// CRX file path or HTTP URL
    #[arg(value_name = "FILE")]
    pub file: String,

    /// Files to extract (exact path, base name or glob)
    #[arg(value_name = "FILES")]
    pub files: Vec<String>,

    /// List files (short format)
    #[arg(short = 'l')]
    pub list: bool,

    /// List verbosely with sizes, dates and categories
    #[arg(short = 'v')]
    pub verbose: bool,

    /// Show the file tree
    #[arg(short = 't', long = "tree")]
    pub tree: bool,

    /// Show the parsed manifest.json
    #[arg(short = 'm', long = "manifest")]
    pub manifest: bool,

    /// Search text files for QUERY
    #[arg(short = 's', long = "search", value_name = "QUERY")]
    pub search: Option<String>,

    /// Treat the search query and name filter as regular expressions
    #[arg(long = "regex")]
    pub regex: bool,

    /// Match case in the search query and name filter
    #[arg(long = "case-sensitive")]
    pub case_sensitive: bool,

    /// Match whole words only (literal queries)
    #[arg(short = 'w', long = "word")]
    pub whole_word: bool,

    /// Lines of context around each match
    #[arg(short = 'C', long = "context", value_name = "N", default_value_t = DEFAULT_CONTEXT_LINES)]
    pub context: u32,

    /// Keep at most N matches per file
    #[arg(long = "max-matches", value_name = "N")]
    pub max_matches: Option<usize>,

    /// Only files whose name matches a glob, or whose name or path matches with --regex
    #[arg(short = 'f', long = "filter", value_name = "PATTERN")]
    pub filter: Option<String>,

    /// Only files of these categories
    #[arg(long = "category", value_enum, num_args = 1..)]
    pub categories: Vec<Category>,

    /// Only files of at least this many bytes
    #[arg(long = "min-size", value_name = "BYTES")]
    pub min_size: Option<u64>,

    /// Only files of at most this many bytes
    #[arg(long = "max-size", value_name = "BYTES")]
    pub max_size: Option<u64>,

    /// Extract files to pipe, no messages
    #[arg(short = 'p')]
    pub pipe: bool,

    /// Extract files into exdir
    #[arg(short = 'd', value_name = "DIR")]
    pub extract_dir: Option<String>,

    /// Never overwrite existing files
    #[arg(short = 'n')]
    pub never_overwrite: bool,

    /// Overwrite files WITHOUT prompting
    #[arg(short = 'o')]
    pub overwrite: bool,

    /// Junk paths (do not make directories)
    #[arg(short = 'j')]
    pub junk_paths: bool,

    /// Emit JSON instead of text
    #[arg(long = "json")]
    pub json: bool,

    /// Refuse containers larger than this many bytes
    #[arg(long = "max-container-size", value_name = "BYTES", default_value_t = DEFAULT_MAX_CONTAINER_SIZE)]
    pub max_container_size: u64,

    /// Refuse archives with more entries than this
    #[arg(long = "max-entries", value_name = "N", default_value_t = DEFAULT_MAX_ENTRIES)]
    pub max_entries: usize,

    /// Log level when RUST_LOG is unset
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "warn")]
    pub log_level: String,

    /// Quiet mode (-qq => quieter)
    #[arg(short = 'q', action = clap::ArgAction::Count)]
    pub quiet: u8,
}

impl Cli {
    pub fn is_http_url(&self) -> bool {
        self.file.starts_with("http://") || self.file.starts_with("https://")
    }

    pub fn is_quiet(&self) -> bool {
        self.quiet > 0 || self.pipe || self.json
    }

    pub fn is_very_quiet(&self) -> bool {
        self.quiet > 1
    }

    pub fn filter_criteria(&self) -> FilterCriteria {
        FilterCriteria {
            name_pattern: self.filter.clone(),
            use_regex: self.regex,
            case_sensitive: self.case_sensitive,
            categories: self.categories.iter().copied().collect(),
            min_size: self.min_size,
            max_size: self.max_size,
        }
    }

    pub fn search_options(&self) -> Option<SearchOptions> {
        let query = self.search.as_ref()?;
        Some(
            SearchOptions::new(query.clone())
                .case_sensitive(self.case_sensitive)
                .whole_word(self.whole_word)
                .regex(self.regex)
                .context_lines(self.context)
                .max_matches_per_file(self.max_matches),
        )
    }
}
