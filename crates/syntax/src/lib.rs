//! Syntax trees and source reduction for commitlog
//!
//! This crate provides:
//! - An arena syntax tree with pre/post cursor editing
//! - Coverage-guided pruning of unexecuted code
//! - Fixpoint removal of declarations left without users
//! - Splice rendering back to source text
//! - The provider seam for parsing, with an outline-file implementation

pub mod deadcode;
pub mod provider;
pub mod prune;
pub mod render;
pub mod tree;
pub mod usage;

// Re-exports
pub use deadcode::{EliminationReport, Eliminator, DEFAULT_MAX_PASSES, DEFAULT_ROOT_SYMBOL};
pub use provider::{Outline, OutlineError, OutlineNode, OutlineProvider, SyntaxTreeProvider};
pub use prune::{prune, Pruner};
pub use render::{splice, RenderError};
pub use tree::{apply, Cursor, Editor, IdentRole, NodeId, NodeKind, Slot, SyntaxTree, TextRange};
pub use usage::{NameUsageAnalyzer, Occurrence, UsageAnalyzer, UsageMap};
