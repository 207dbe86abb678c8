//! Hierarchical view of an archive's entries.
//!
//! [`build_tree`] turns the flat, ordered entry list into a [`FileTreeNode`]
//! rooted at an unnamed directory. Children are always ordered directories
//! first, then files, each group sorted byte-wise (case-sensitive) by name.
//!
//! The tree stores sizes on files only. Directory totals come from the
//! explicit [`FileTreeNode::summarize`] pass.

mod builder;
mod category;

pub use builder::build_tree;
pub use category::{categorize, Category};

use chrono::NaiveDateTime;
use serde::Serialize;
use std::collections::BTreeMap;

/// A node of the file tree. Files cannot have children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FileTreeNode {
    Directory(DirectoryNode),
    File(FileNode),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryNode {
    pub name: String,
    pub path: String,
    /// Set when the archive carried an explicit record for this directory.
    pub modified_at: Option<NaiveDateTime>,
    pub children: Vec<FileTreeNode>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileNode {
    pub name: String,
    pub path: String,
    pub size: u64,
    pub compressed_size: u64,
    pub modified_at: Option<NaiveDateTime>,
    pub category: Category,
}

/// One row of a flattened tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlatEntry {
    pub path: String,
    pub name: String,
    pub is_directory: bool,
    pub depth: usize,
    pub size: u64,
    pub compressed_size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryTotals {
    pub count: u64,
    pub size: u64,
}

/// Aggregated sizes below a node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeSummary {
    pub file_count: u64,
    /// Directories below the node, not counting the node itself.
    pub directory_count: u64,
    pub total_size: u64,
    pub total_compressed_size: u64,
    pub by_category: BTreeMap<Category, CategoryTotals>,
}

impl FileTreeNode {
    pub fn name(&self) -> &str {
        match self {
            FileTreeNode::Directory(d) => &d.name,
            FileTreeNode::File(f) => &f.name,
        }
    }

    pub fn path(&self) -> &str {
        match self {
            FileTreeNode::Directory(d) => &d.path,
            FileTreeNode::File(f) => &f.path,
        }
    }

    pub fn is_directory(&self) -> bool {
        matches!(self, FileTreeNode::Directory(_))
    }

    /// Children of a directory; empty for files.
    pub fn children(&self) -> &[FileTreeNode] {
        match self {
            FileTreeNode::Directory(d) => &d.children,
            FileTreeNode::File(_) => &[],
        }
    }

    /// Stored size: the file size, or 0 for directories.
    pub fn size(&self) -> u64 {
        match self {
            FileTreeNode::Directory(_) => 0,
            FileTreeNode::File(f) => f.size,
        }
    }

    pub fn category(&self) -> Option<Category> {
        match self {
            FileTreeNode::Directory(_) => None,
            FileTreeNode::File(f) => Some(f.category),
        }
    }

    /// Depth-first iterator over the file nodes, in child order.
    pub fn leaves(&self) -> Leaves<'_> {
        Leaves { stack: vec![self] }
    }

    /// Look up a node by its slash-separated path; `""` is this node.
    pub fn find(&self, path: &str) -> Option<&FileTreeNode> {
        let mut node = self;
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            node = node.children().iter().find(|c| c.name() == segment)?;
        }
        Some(node)
    }

    /// Pre-order flat listing of every node below this one.
    pub fn flatten(&self) -> Vec<FlatEntry> {
        fn walk(node: &FileTreeNode, depth: usize, out: &mut Vec<FlatEntry>) {
            for child in node.children() {
                out.push(match child {
                    FileTreeNode::Directory(d) => FlatEntry {
                        path: d.path.clone(),
                        name: d.name.clone(),
                        is_directory: true,
                        depth,
                        size: 0,
                        compressed_size: 0,
                        category: None,
                    },
                    FileTreeNode::File(f) => FlatEntry {
                        path: f.path.clone(),
                        name: f.name.clone(),
                        is_directory: false,
                        depth,
                        size: f.size,
                        compressed_size: f.compressed_size,
                        category: Some(f.category),
                    },
                });
                walk(child, depth + 1, out);
            }
        }

        let mut out = Vec::new();
        walk(self, 0, &mut out);
        out
    }

    /// Aggregate sizes and counts of everything below this node.
    pub fn summarize(&self) -> TreeSummary {
        fn add_file(f: &FileNode, summary: &mut TreeSummary) {
            summary.file_count += 1;
            summary.total_size = summary.total_size.saturating_add(f.size);
            summary.total_compressed_size =
                summary.total_compressed_size.saturating_add(f.compressed_size);
            let totals = summary.by_category.entry(f.category).or_default();
            totals.count += 1;
            totals.size = totals.size.saturating_add(f.size);
        }

        fn walk(node: &FileTreeNode, summary: &mut TreeSummary) {
            for child in node.children() {
                match child {
                    FileTreeNode::Directory(_) => {
                        summary.directory_count += 1;
                        walk(child, summary);
                    }
                    FileTreeNode::File(f) => add_file(f, summary),
                }
            }
        }

        let mut summary = TreeSummary::default();
        match self {
            FileTreeNode::File(f) => add_file(f, &mut summary),
            FileTreeNode::Directory(_) => walk(self, &mut summary),
        }
        summary
    }
}

pub struct Leaves<'a> {
    stack: Vec<&'a FileTreeNode>,
}

impl<'a> Iterator for Leaves<'a> {
    type Item = &'a FileNode;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(node) = self.stack.pop() {
            match node {
                FileTreeNode::File(f) => return Some(f),
                FileTreeNode::Directory(d) => self.stack.extend(d.children.iter().rev()),
            }
        }
        None
    }
}

/// Join a parent path and a child name with `/`.
pub(crate) fn join_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}/{name}")
    }
}
