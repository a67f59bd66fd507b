//! Directory listing of a project's generated output.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::error::GenerationError;

/// Entry kind in an artifact tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Folder,
    File,
}

/// One node of an artifact tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeNode {
    pub name: String,

    #[serde(rename = "type")]
    pub kind: NodeKind,

    /// Children, for folders
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<TreeNode>>,
}

impl TreeNode {
    pub fn is_folder(&self) -> bool {
        self.kind == NodeKind::Folder
    }
}

/// Build the tree below `dir`: folders first, then files, each sorted by name
///
/// A missing directory yields an empty tree. Symlinks are listed as files and
/// never followed.
pub fn build_file_tree(dir: &Path) -> Result<Vec<TreeNode>, GenerationError> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let entries = fs::read_dir(dir)
        .map_err(|e| GenerationError::storage(format!("list {}", dir.display()), e))?;

    let mut nodes = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| GenerationError::storage("read directory entry", e))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        let metadata = fs::symlink_metadata(entry.path())
            .map_err(|e| GenerationError::storage(format!("stat {}", name), e))?;

        let node = if metadata.is_dir() {
            TreeNode {
                name,
                kind: NodeKind::Folder,
                children: Some(build_file_tree(&entry.path())?),
            }
        } else {
            TreeNode {
                name,
                kind: NodeKind::File,
                children: None,
            }
        };
        nodes.push(node);
    }

    nodes.sort_by(|a, b| a.kind.cmp(&b.kind).then_with(|| a.name.cmp(&b.name)));
    Ok(nodes)
}
