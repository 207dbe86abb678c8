use chrono::NaiveDateTime;
use std::collections::BTreeMap;

use crate::zip::ArchiveEntry;

use super::{categorize, join_path, DirectoryNode, FileNode, FileTreeNode};

struct Leaf {
    size: u64,
    compressed_size: u64,
    modified_at: Option<NaiveDateTime>,
}

/// Mutable directory used while inserting entries. BTreeMap keeps each
/// group in byte order, which is the final child order.
#[derive(Default)]
struct DirBuilder {
    modified_at: Option<NaiveDateTime>,
    dirs: BTreeMap<String, DirBuilder>,
    files: BTreeMap<String, Leaf>,
}

impl DirBuilder {
    /// Descend into (or create) the child directory `name`, evicting a file of
    /// the same name.
    fn dir_mut(&mut self, name: &str) -> &mut DirBuilder {
        self.files.remove(name);
        self.dirs.entry(name.to_string()).or_default()
    }

    fn insert(&mut self, entry: &ArchiveEntry) {
        let segments: Vec<&str> = entry.path.split('/').filter(|s| !s.is_empty()).collect();
        let Some((last, parents)) = segments.split_last() else {
            return;
        };

        let mut dir = self;
        for segment in parents {
            dir = dir.dir_mut(segment);
        }

        if entry.is_directory {
            let node = dir.dir_mut(last);
            if entry.modified_at.is_some() {
                node.modified_at = entry.modified_at;
            }
        } else {
            // Duplicate paths: the later record wins.
            dir.dirs.remove(*last);
            dir.files.insert(
                last.to_string(),
                Leaf {
                    size: entry.uncompressed_size,
                    compressed_size: entry.compressed_size,
                    modified_at: entry.modified_at,
                },
            );
        }
    }

    fn finish(self, name: String, path: String) -> FileTreeNode {
        let mut children = Vec::with_capacity(self.dirs.len() + self.files.len());

        for (child_name, child) in self.dirs {
            let child_path = join_path(&path, &child_name);
            children.push(child.finish(child_name, child_path));
        }

        for (child_name, leaf) in self.files {
            children.push(FileTreeNode::File(FileNode {
                path: join_path(&path, &child_name),
                category: categorize(&child_name),
                name: child_name,
                size: leaf.size,
                compressed_size: leaf.compressed_size,
                modified_at: leaf.modified_at,
            }));
        }

        FileTreeNode::Directory(DirectoryNode {
            name,
            path,
            modified_at: self.modified_at,
            children,
        })
    }
}

/// Build the file tree for an entry list.
///
/// Intermediate directories are created on first sight. When two records
/// share a path, the later one wins, including a file replacing a directory
/// of the same name and vice versa. The result depends only on the set of
/// final records, never on their order otherwise.
pub fn build_tree(entries: &[ArchiveEntry]) -> FileTreeNode {
    let mut root = DirBuilder::default();
    for entry in entries {
        root.insert(entry);
    }
    root.finish(String::new(), String::new())
}
