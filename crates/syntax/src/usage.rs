//! Identifier usage analysis
//!
//! Dead-declaration removal needs to know, for every declaring identifier,
//! which identifiers refer to it. That knowledge comes from a
//! [`UsageAnalyzer`]; the bundled [`NameUsageAnalyzer`] links references to
//! declarations purely by name across all analyzed trees.

use crate::tree::{IdentRole, NodeId, SyntaxTree};
use ahash::{AHashMap, AHashSet};

/// An identifier occurrence: tree index within the analyzed batch plus node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Occurrence {
    pub tree: usize,
    pub node: NodeId,
}

impl Occurrence {
    pub fn new(tree: usize, node: NodeId) -> Self {
        Self { tree, node }
    }
}

/// Declarations mapped to the references that use them
#[derive(Debug, Clone, Default)]
pub struct UsageMap {
    uses: AHashMap<Occurrence, AHashSet<Occurrence>>,
    references: AHashSet<Occurrence>,
    /// Non-fatal findings such as unresolved names
    pub diagnostics: Vec<String>,
}

impl UsageMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a declaration, with no uses yet
    pub fn declare(&mut self, declaration: Occurrence) {
        self.uses.entry(declaration).or_default();
    }

    /// Record a reference and, when known, the declaration it resolves to
    pub fn record(&mut self, reference: Occurrence, declaration: Option<Occurrence>) {
        self.references.insert(reference);
        if let Some(declaration) = declaration {
            self.uses.entry(declaration).or_default().insert(reference);
        }
    }

    pub fn is_reference(&self, occurrence: Occurrence) -> bool {
        self.references.contains(&occurrence)
    }

    /// Number of references resolving to `declaration`
    pub fn use_count(&self, declaration: Occurrence) -> usize {
        self.uses.get(&declaration).map_or(0, |uses| uses.len())
    }

    /// A declaring occurrence nobody refers to
    pub fn is_unused(&self, occurrence: Occurrence) -> bool {
        !self.is_reference(occurrence) && self.use_count(occurrence) == 0
    }

    pub fn is_empty(&self) -> bool {
        self.uses.is_empty() && self.references.is_empty()
    }
}

/// Computes identifier usage over a batch of trees
pub trait UsageAnalyzer: Send + Sync {
    fn analyze(&self, trees: &[SyntaxTree]) -> anyhow::Result<UsageMap>;
}

/// Resolves references to every same-named declaration in the batch
///
/// Coarse, but never reports a used declaration as unused: shadowing and
/// scoping can only make it keep too much.
#[derive(Debug, Clone, Copy, Default)]
pub struct NameUsageAnalyzer;

impl UsageAnalyzer for NameUsageAnalyzer {
    fn analyze(&self, trees: &[SyntaxTree]) -> anyhow::Result<UsageMap> {
        let mut declarations: AHashMap<&str, Vec<Occurrence>> = AHashMap::new();
        let mut references: Vec<(&str, Occurrence)> = Vec::new();

        for (idx, tree) in trees.iter().enumerate() {
            for (node, name, role) in tree.idents() {
                let occurrence = Occurrence::new(idx, node);
                match role {
                    IdentRole::Decl => declarations.entry(name).or_default().push(occurrence),
                    IdentRole::Ref => references.push((name, occurrence)),
                }
            }
        }

        let mut usage = UsageMap::new();
        for occurrence in declarations.values().flatten() {
            usage.declare(*occurrence);
        }

        for (name, reference) in references {
            match declarations.get(name) {
                Some(targets) => {
                    for target in targets {
                        usage.record(reference, Some(*target));
                    }
                }
                None => {
                    usage.record(reference, None);
                    usage
                        .diagnostics
                        .push(format!("unresolved reference '{}'", name));
                }
            }
        }

        Ok(usage)
    }
}
