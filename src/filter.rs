//! Name, category and size filtering over a file tree.
//!
//! Criteria apply to files only and combine conjunctively. Directories
//! survive while at least one file below them does.

use regex::{Regex, RegexBuilder};
use std::collections::BTreeSet;

use crate::error::PatternError;
use crate::tree::{Category, DirectoryNode, FileNode, FileTreeNode};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterCriteria {
    /// Glob (`*`, `?`) unless `use_regex` is set.
    pub name_pattern: Option<String>,
    pub use_regex: bool,
    pub case_sensitive: bool,
    /// Empty means every category.
    pub categories: BTreeSet<Category>,
    pub min_size: Option<u64>,
    pub max_size: Option<u64>,
}

impl FilterCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, pattern: impl Into<String>) -> Self {
        self.name_pattern = Some(pattern.into());
        self
    }

    pub fn with_regex(mut self, yes: bool) -> Self {
        self.use_regex = yes;
        self
    }

    pub fn with_case_sensitive(mut self, yes: bool) -> Self {
        self.case_sensitive = yes;
        self
    }

    pub fn with_categories(mut self, categories: impl IntoIterator<Item = Category>) -> Self {
        self.categories.extend(categories);
        self
    }

    pub fn with_size_range(mut self, min: Option<u64>, max: Option<u64>) -> Self {
        self.min_size = min;
        self.max_size = max;
        self
    }

    /// True when no criterion is active.
    pub fn is_empty(&self) -> bool {
        self.name_pattern.as_deref().is_none_or(str::is_empty)
            && self.categories.is_empty()
            && self.min_size.is_none()
            && self.max_size.is_none()
    }

    pub fn compile(&self) -> Result<CompiledFilter, PatternError> {
        let name = match self.name_pattern.as_deref() {
            None | Some("") => None,
            Some(pattern) => {
                let source = if self.use_regex {
                    pattern.to_string()
                } else {
                    glob_to_regex(pattern)
                };
                Some(
                    RegexBuilder::new(&source)
                        .case_insensitive(!self.case_sensitive)
                        .build()?,
                )
            }
        };

        Ok(CompiledFilter {
            name,
            name_matches_path: self.use_regex,
            categories: self.categories.clone(),
            min_size: self.min_size,
            max_size: self.max_size,
            pass_through: self.is_empty(),
        })
    }
}

/// Translate a glob into an anchored regex: `*` is any run, `?` any one
/// character, everything else literal.
pub fn glob_to_regex(glob: &str) -> String {
    let mut out = String::with_capacity(glob.len() + 8);
    out.push('^');
    let mut buf = [0u8; 4];
    for c in glob.chars() {
        match c {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            _ => out.push_str(&regex::escape(c.encode_utf8(&mut buf))),
        }
    }
    out.push('$');
    out
}

/// Criteria with the name pattern compiled.
#[derive(Debug, Clone)]
pub struct CompiledFilter {
    name: Option<Regex>,
    /// Regex patterns may also match the full path; globs see the name only.
    name_matches_path: bool,
    categories: BTreeSet<Category>,
    min_size: Option<u64>,
    max_size: Option<u64>,
    pass_through: bool,
}

impl CompiledFilter {
    /// A glob is matched against the file name (`*.js`). A regex is tried
    /// against the name and then the full path (`^src/.*\.js$`).
    pub fn matches(&self, file: &FileNode) -> bool {
        if let Some(re) = &self.name {
            let by_name = re.is_match(&file.name);
            if !by_name && !(self.name_matches_path && re.is_match(&file.path)) {
                return false;
            }
        }
        if !self.categories.is_empty() && !self.categories.contains(&file.category) {
            return false;
        }
        if self.min_size.is_some_and(|min| file.size < min) {
            return false;
        }
        if self.max_size.is_some_and(|max| file.size > max) {
            return false;
        }
        true
    }

    /// Copy of `root` keeping matching files and the directories that lead to
    /// them. The root itself is always returned.
    pub fn filter_tree(&self, root: &FileTreeNode) -> FileTreeNode {
        if self.pass_through {
            return root.clone();
        }
        match root {
            FileTreeNode::Directory(dir) => FileTreeNode::Directory(self.prune_dir(dir)),
            FileTreeNode::File(_) => root.clone(),
        }
    }

    fn prune_dir(&self, dir: &DirectoryNode) -> DirectoryNode {
        let children = dir
            .children
            .iter()
            .filter_map(|child| match child {
                FileTreeNode::File(f) => self.matches(f).then(|| child.clone()),
                FileTreeNode::Directory(d) => {
                    let pruned = self.prune_dir(d);
                    (!pruned.children.is_empty()).then_some(FileTreeNode::Directory(pruned))
                }
            })
            .collect();

        DirectoryNode {
            name: dir.name.clone(),
            path: dir.path.clone(),
            modified_at: dir.modified_at,
            children,
        }
    }

    /// Paths of the matching files, in tree order.
    pub fn matching_paths(&self, root: &FileTreeNode) -> Vec<String> {
        root.leaves()
            .filter(|f| self.matches(f))
            .map(|f| f.path.clone())
            .collect()
    }
}

pub fn filter_tree(
    root: &FileTreeNode,
    criteria: &FilterCriteria,
) -> Result<FileTreeNode, PatternError> {
    Ok(criteria.compile()?.filter_tree(root))
}

pub fn matching_paths(
    root: &FileTreeNode,
    criteria: &FilterCriteria,
) -> Result<Vec<String>, PatternError> {
    Ok(criteria.compile()?.matching_paths(root))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::build_tree;
    use crate::zip::ArchiveEntry;

    fn sample() -> FileTreeNode {
        build_tree(&[
            ArchiveEntry::file("src/index.ts", 100),
            ArchiveEntry::file("src/index.js", 80),
            ArchiveEntry::file("lib/index.js", 60),
            ArchiveEntry::file("style.css", 20),
            ArchiveEntry::file("assets/logo.png", 5000),
            ArchiveEntry::file("README.md", 10),
        ])
    }

    #[test]
    fn category_filter_drops_empty_directories() {
        let tree = build_tree(&[
            ArchiveEntry::file("src/index.ts", 100),
            ArchiveEntry::file("assets/logo.png", 5000),
        ]);
        let criteria = FilterCriteria::new().with_categories([Category::Asset]);
        let filtered = filter_tree(&tree, &criteria).unwrap();

        let leaves: Vec<_> = filtered.leaves().map(|f| f.name.as_str()).collect();
        assert_eq!(leaves, ["logo.png"]);
        assert!(filtered.find("src").is_none());
        assert!(filtered.find("assets").is_some());
    }

    #[test]
    fn glob_matches_names() {
        let criteria = FilterCriteria::new().with_name("*.js");
        let paths = matching_paths(&sample(), &criteria).unwrap();
        assert_eq!(paths, ["lib/index.js", "src/index.js"]);
        assert!(!paths.iter().any(|p| p.ends_with(".css")));
    }

    #[test]
    fn glob_prefix_does_not_reach_into_directories() {
        let only_s = FilterCriteria::new().with_name("s*");
        assert_eq!(matching_paths(&sample(), &only_s).unwrap(), ["style.css"]);

        let only_a = FilterCriteria::new().with_name("a*");
        assert!(matching_paths(&sample(), &only_a).unwrap().is_empty());

        let slashed = FilterCriteria::new().with_name("src/*.js");
        assert!(matching_paths(&sample(), &slashed).unwrap().is_empty());
    }

    #[test]
    fn regex_matches_paths() {
        let criteria = FilterCriteria::new()
            .with_name(r"^src/.*\.js$")
            .with_regex(true);
        let paths = matching_paths(&sample(), &criteria).unwrap();
        assert_eq!(paths, ["src/index.js"]);
    }

    #[test]
    fn glob_question_mark_and_escaping() {
        assert_eq!(glob_to_regex("a?.js"), r"^a.\.js$");
        let re = Regex::new(&glob_to_regex("[x]+*.txt")).unwrap();
        assert!(re.is_match("[x]+notes.txt"));
        assert!(!re.is_match("xx.txt"));
    }

    #[test]
    fn case_sensitivity_applies_to_names() {
        let insensitive = FilterCriteria::new().with_name("readme*");
        assert_eq!(matching_paths(&sample(), &insensitive).unwrap(), ["README.md"]);

        let sensitive = insensitive.with_case_sensitive(true);
        assert!(matching_paths(&sample(), &sensitive).unwrap().is_empty());
    }

    #[test]
    fn criteria_are_conjunctive() {
        let criteria = FilterCriteria::new()
            .with_name("*index*")
            .with_categories([Category::Code])
            .with_size_range(Some(70), Some(100));
        let paths = matching_paths(&sample(), &criteria).unwrap();
        assert_eq!(paths, ["src/index.js", "src/index.ts"]);
    }

    #[test]
    fn size_bounds_are_inclusive() {
        let criteria = FilterCriteria::new().with_size_range(Some(20), Some(60));
        let paths = matching_paths(&sample(), &criteria).unwrap();
        assert_eq!(paths, ["lib/index.js", "style.css"]);
    }

    #[test]
    fn empty_criteria_keep_the_tree() {
        let tree = build_tree(&[ArchiveEntry::directory("empty"), ArchiveEntry::file("a.js", 1)]);
        assert_eq!(filter_tree(&tree, &FilterCriteria::new()).unwrap(), tree);
    }

    #[test]
    fn nothing_matches_leaves_a_bare_root() {
        let criteria = FilterCriteria::new().with_name("*.rs");
        let filtered = filter_tree(&sample(), &criteria).unwrap();
        assert!(filtered.is_directory());
        assert!(filtered.children().is_empty());
    }

    #[test]
    fn invalid_regex_is_a_pattern_error() {
        let criteria = FilterCriteria::new().with_name("(").with_regex(true);
        assert!(filter_tree(&sample(), &criteria).is_err());
    }
}
