//! Source rendering by splicing
//!
//! Rather than pretty-printing the tree, the renderer copies the original
//! source and cuts out the text of every removed subtree. Cuts that leave
//! a line empty take the whole line with them; otherwise an adjacent `,`
//! separator goes too, so `Used, Unused int` becomes `Used int`.

use crate::tree::{NodeId, SyntaxTree};
use cl_core::Position;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("removed node {node:?} in {path} has no source range")]
    Unpositioned { path: String, node: NodeId },

    #[error("position {line}:{col} is outside {path}")]
    OutOfBounds { path: String, line: u32, col: u32 },
}

/// Byte offsets of each line start
struct LineIndex<'s> {
    source: &'s [u8],
    starts: Vec<usize>,
}

impl<'s> LineIndex<'s> {
    fn new(source: &'s [u8]) -> Self {
        let mut starts = vec![0];
        starts.extend(
            source
                .iter()
                .enumerate()
                .filter(|&(_, &b)| b == b'\n')
                .map(|(idx, _)| idx + 1),
        );
        Self { source, starts }
    }

    /// Byte offset of a 1-based line/column position, clamped to its line
    fn offset(&self, pos: Position) -> Option<usize> {
        let line = pos.line.checked_sub(1)? as usize;
        let start = *self.starts.get(line)?;
        let line_end = self
            .starts
            .get(line + 1)
            .map_or(self.source.len(), |next| next - 1);
        let col = pos.col.saturating_sub(1) as usize;
        Some((start + col).min(line_end))
    }

    fn line_start(&self, offset: usize) -> usize {
        self.source[..offset]
            .iter()
            .rposition(|&b| b == b'\n')
            .map_or(0, |idx| idx + 1)
    }

    fn line_end(&self, offset: usize) -> usize {
        self.source[offset..]
            .iter()
            .position(|&b| b == b'\n')
            .map_or(self.source.len(), |idx| offset + idx)
    }
}

fn is_blank(bytes: &[u8]) -> bool {
    bytes.iter().all(|b| b.is_ascii_whitespace())
}

fn is_inline_space(b: u8) -> bool {
    b == b' ' || b == b'\t'
}

/// Grow a cut to cover its line or a neighbouring separator
fn widen(index: &LineIndex<'_>, start: usize, end: usize) -> (usize, usize) {
    let src = index.source;
    let ls = index.line_start(start);
    let le = index.line_end(end);

    if is_blank(&src[ls..start]) && is_blank(&src[end..le]) {
        return (ls, (le + 1).min(src.len()));
    }

    let mut next = end;
    while next < le && is_inline_space(src[next]) {
        next += 1;
    }
    if next < le && src[next] == b',' {
        next += 1;
        while next < le && is_inline_space(src[next]) {
            next += 1;
        }
        return (start, next);
    }

    let mut prev = start;
    while prev > ls && is_inline_space(src[prev - 1]) {
        prev -= 1;
    }
    if prev > ls && src[prev - 1] == b',' {
        return (prev - 1, end);
    }

    (start, end)
}

/// Render the tree's live code by cutting removed subtrees from its source
pub fn splice(tree: &SyntaxTree) -> Result<Vec<u8>, RenderError> {
    let source = tree.source();
    let index = LineIndex::new(source);

    let locate = |pos: Position| {
        index.offset(pos).ok_or_else(|| RenderError::OutOfBounds {
            path: tree.path().to_string(),
            line: pos.line,
            col: pos.col,
        })
    };

    let mut cuts = Vec::new();
    for node in tree.removed_roots() {
        let range = tree.range(node).ok_or_else(|| RenderError::Unpositioned {
            path: tree.path().to_string(),
            node,
        })?;
        let start = locate(range.start)?;
        let end = locate(range.end)?.max(start);
        cuts.push(widen(&index, start, end));
    }

    if cuts.is_empty() {
        return Ok(source.to_vec());
    }

    cuts.sort_unstable();
    let mut merged: Vec<(usize, usize)> = Vec::with_capacity(cuts.len());
    for (start, end) in cuts {
        match merged.last_mut() {
            Some(last) if start <= last.1 => last.1 = last.1.max(end),
            _ => merged.push((start, end)),
        }
    }

    let mut out = Vec::with_capacity(source.len());
    let mut cursor = 0;
    for (start, end) in merged {
        out.extend_from_slice(&source[cursor..start]);
        cursor = end;
    }
    out.extend_from_slice(&source[cursor..]);
    Ok(out)
}
