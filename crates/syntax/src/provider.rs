//! Syntax tree providers
//!
//! Parsing a concrete language is outside this crate. A
//! [`SyntaxTreeProvider`] turns source bytes into a [`SyntaxTree`] and
//! renders edited trees back to bytes.
//!
//! [`OutlineProvider`] reads trees prepared ahead of time by an external
//! front end: for each source file `<path>` it loads `<path>.outline.json`,
//! a JSON description of the file's node structure.

use crate::render::splice;
use crate::tree::{IdentRole, NodeId, NodeKind, Slot, SyntaxTree, TextRange};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Parses and renders source files
pub trait SyntaxTreeProvider: Send + Sync {
    fn parse(&self, path: &str, source: &[u8]) -> anyhow::Result<SyntaxTree>;

    fn render(&self, tree: &SyntaxTree) -> anyhow::Result<Vec<u8>> {
        Ok(splice(tree)?)
    }
}

#[derive(Debug, Error)]
pub enum OutlineError {
    #[error("identifier node at depth {depth} has no name")]
    MissingName { depth: usize },

    #[error("invalid outline: {0}")]
    Json(#[from] serde_json::Error),
}

/// Node category in an outline file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutlineKind {
    Decl,
    Binding,
    NameGroup,
    Ident,
    Other,
}

/// One node of an outline file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutlineNode {
    pub kind: OutlineKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub role: IdentRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<TextRange>,
    #[serde(default)]
    pub slot: Slot,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<OutlineNode>,
}

/// Node structure of a whole file; `nodes` are the root's children
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Outline {
    pub nodes: Vec<OutlineNode>,
}

impl Outline {
    pub fn from_json(json: &str) -> Result<Self, OutlineError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Build the tree for `source` described by this outline
    pub fn into_tree(self, path: &str, source: &[u8]) -> Result<SyntaxTree, OutlineError> {
        let mut tree = SyntaxTree::new(path, source);
        let root = tree.root();
        for node in self.nodes {
            attach(&mut tree, root, node, 1)?;
        }
        Ok(tree)
    }
}

fn attach(
    tree: &mut SyntaxTree,
    parent: NodeId,
    node: OutlineNode,
    depth: usize,
) -> Result<(), OutlineError> {
    let kind = match node.kind {
        OutlineKind::Decl => NodeKind::Decl,
        OutlineKind::Binding => NodeKind::Binding,
        OutlineKind::NameGroup => NodeKind::NameGroup,
        OutlineKind::Ident => NodeKind::Ident {
            name: node.name.ok_or(OutlineError::MissingName { depth })?,
            role: node.role,
        },
        OutlineKind::Other => NodeKind::Other(node.label.unwrap_or_default()),
    };

    let id = tree.push(parent, kind, node.slot, node.range);
    for child in node.children {
        attach(tree, id, child, depth + 1)?;
    }
    Ok(())
}

/// Loads trees from `.outline.json` sidecar files
#[derive(Debug, Clone)]
pub struct OutlineProvider {
    suffix: String,
}

impl Default for OutlineProvider {
    fn default() -> Self {
        Self {
            suffix: ".outline.json".to_string(),
        }
    }
}

impl OutlineProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_suffix(suffix: impl Into<String>) -> Self {
        Self {
            suffix: suffix.into(),
        }
    }

    /// Path of the outline describing `path`
    pub fn outline_path(&self, path: &str) -> PathBuf {
        PathBuf::from(format!("{}{}", path, self.suffix))
    }
}

impl SyntaxTreeProvider for OutlineProvider {
    fn parse(&self, path: &str, source: &[u8]) -> anyhow::Result<SyntaxTree> {
        let outline_path = self.outline_path(path);
        let json = std::fs::read_to_string(&outline_path)
            .with_context(|| format!("Failed to read outline {}", outline_path.display()))?;

        let outline = Outline::from_json(&json)
            .with_context(|| format!("Failed to parse outline {}", outline_path.display()))?;

        Ok(outline.into_tree(path, source)?)
    }
}
