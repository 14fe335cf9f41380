//! Arena-backed syntax trees and cursor-based editing
//!
//! A [`SyntaxTree`] keeps every node it ever held in an arena; deleting a
//! node only detaches it from its parent, so ids stay valid and the
//! renderer can still find the source range of removed code.
//!
//! Edits run through [`apply`], a depth-first walk that calls an
//! [`Editor`]'s `pre` hook on the way down and `post` hook on the way up.
//! Editors that learn about a deletion while visiting children record the
//! parent in a side table and act on it in `post`.

use cl_core::Position;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Stable identity of a node within one tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Source range of a node; `end` is exclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextRange {
    pub start: Position,
    pub end: Position,
}

impl TextRange {
    /// Create a range from `(line, col)` pairs
    pub const fn new(start: (u32, u32), end: (u32, u32)) -> Self {
        Self {
            start: Position::new(start.0, start.1),
            end: Position::new(end.0, end.1),
        }
    }
}

/// How a node is held by its parent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Slot {
    /// One element of a sequence; can be removed on its own
    #[default]
    Element,
    /// A required part of a fixed-shape parent
    Field,
}

/// Whether an identifier introduces a name or refers to one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentRole {
    Decl,
    #[default]
    Ref,
}

/// Node categories the pruning pipeline cares about
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// The file itself
    Root,
    /// A declaration that can be deleted as a whole
    Decl,
    /// A derived declaration form (type spec, alias) living inside a `Decl`
    Binding,
    /// Several names declared together (struct field row, var spec)
    NameGroup,
    Ident { name: String, role: IdentRole },
    /// Anything else, labelled for debugging
    Other(String),
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    range: Option<TextRange>,
    slot: Slot,
    parent: Option<NodeId>,
    children: SmallVec<[NodeId; 4]>,
    attached: bool,
}

/// Mutable, ordered syntax tree for one source file
#[derive(Debug, Clone)]
pub struct SyntaxTree {
    path: String,
    source: Vec<u8>,
    nodes: Vec<Node>,
}

impl SyntaxTree {
    /// Create a tree holding only a root node
    pub fn new(path: impl Into<String>, source: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            source: source.into(),
            nodes: vec![Node {
                kind: NodeKind::Root,
                range: None,
                slot: Slot::Field,
                parent: None,
                children: SmallVec::new(),
                attached: true,
            }],
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Original source text the tree was parsed from
    pub fn source(&self) -> &[u8] {
        &self.source
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Append a child to `parent` and return its id
    pub fn push(
        &mut self,
        parent: NodeId,
        kind: NodeKind,
        slot: Slot,
        range: Option<TextRange>,
    ) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            kind,
            range,
            slot,
            parent: Some(parent),
            children: SmallVec::new(),
            attached: true,
        });
        self.nodes[parent.index()].children.push(id);
        id
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.index()].kind
    }

    pub fn range(&self, id: NodeId) -> Option<TextRange> {
        self.nodes[id.index()].range
    }

    pub fn slot(&self, id: NodeId) -> Slot {
        self.nodes[id.index()].slot
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.index()].parent
    }

    /// Children currently attached to `id`
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.index()].children
    }

    /// Whether the node and all of its ancestors are still attached
    pub fn is_live(&self, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if !self.nodes[node.index()].attached {
                return false;
            }
            current = self.nodes[node.index()].parent;
        }
        true
    }

    /// Detach a node from its parent; the root cannot be detached
    fn detach(&mut self, id: NodeId) -> bool {
        let Some(parent) = self.nodes[id.index()].parent else {
            return false;
        };
        if !self.nodes[id.index()].attached {
            return false;
        }

        self.nodes[parent.index()].children.retain(|child| *child != id);
        self.nodes[id.index()].attached = false;
        true
    }

    /// Live nodes in pre-order
    pub fn live_nodes(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![self.root()];
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.children(id).iter().rev().copied());
        }
        out
    }

    /// Number of live nodes, root included
    pub fn live_count(&self) -> usize {
        self.live_nodes().len()
    }

    /// Live identifier occurrences in pre-order
    pub fn idents(&self) -> Vec<(NodeId, &str, IdentRole)> {
        self.live_nodes()
            .into_iter()
            .filter_map(|id| match self.kind(id) {
                NodeKind::Ident { name, role } => Some((id, name.as_str(), *role)),
                _ => None,
            })
            .collect()
    }

    /// Identifiers held as sequence elements of a name group
    pub fn name_count(&self, group: NodeId) -> usize {
        self.children(group)
            .iter()
            .filter(|&&child| {
                self.slot(child) == Slot::Element
                    && matches!(self.kind(child), NodeKind::Ident { .. })
            })
            .count()
    }

    /// Detached nodes whose parent is still live
    ///
    /// These are the outermost pieces of removed code; everything below
    /// them went with them.
    pub fn removed_roots(&self) -> Vec<NodeId> {
        (0..self.nodes.len())
            .map(|idx| NodeId(idx as u32))
            .filter(|&id| {
                let node = &self.nodes[id.index()];
                !node.attached && node.parent.is_some_and(|parent| self.is_live(parent))
            })
            .collect()
    }
}

/// Hooks invoked by [`apply`]
pub trait Editor {
    /// Called before a node's children; return `false` to skip them
    fn pre(&mut self, cursor: &mut Cursor<'_>) -> bool;

    /// Called after a node's children
    fn post(&mut self, _cursor: &mut Cursor<'_>) {}
}

/// View of the node currently being visited
pub struct Cursor<'t> {
    tree: &'t mut SyntaxTree,
    node: NodeId,
    deleted: bool,
}

impl<'t> Cursor<'t> {
    fn new(tree: &'t mut SyntaxTree, node: NodeId) -> Self {
        Self {
            tree,
            node,
            deleted: false,
        }
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.tree.parent(self.node)
    }

    pub fn kind(&self) -> &NodeKind {
        self.tree.kind(self.node)
    }

    pub fn range(&self) -> Option<TextRange> {
        self.tree.range(self.node)
    }

    pub fn tree(&self) -> &SyntaxTree {
        self.tree
    }

    /// Whether the node occupies a removable slot of its parent
    pub fn is_removable(&self) -> bool {
        self.tree.slot(self.node) == Slot::Element && self.parent().is_some()
    }

    /// Remove the node from its parent
    ///
    /// Returns `false` when the node sits in a fixed slot.
    pub fn delete(&mut self) -> bool {
        if !self.is_removable() {
            return false;
        }
        self.deleted = self.tree.detach(self.node);
        self.deleted
    }
}

/// Walk the tree depth-first, letting `editor` delete nodes as it goes
///
/// Children are visited in order. A node deleted in `pre` is neither
/// descended into nor passed to `post`.
pub fn apply<E: Editor + ?Sized>(tree: &mut SyntaxTree, editor: &mut E) {
    let root = tree.root();
    walk(tree, root, editor);
}

fn walk<E: Editor + ?Sized>(tree: &mut SyntaxTree, id: NodeId, editor: &mut E) {
    let descend = {
        let mut cursor = Cursor::new(tree, id);
        let descend = editor.pre(&mut cursor);
        if cursor.deleted {
            return;
        }
        descend
    };

    if descend {
        let children: SmallVec<[NodeId; 4]> = tree.nodes[id.index()].children.clone();
        for child in children {
            if tree.nodes[child.index()].attached {
                walk(tree, child, editor);
            }
        }
    }

    let mut cursor = Cursor::new(tree, id);
    editor.post(&mut cursor);
}
