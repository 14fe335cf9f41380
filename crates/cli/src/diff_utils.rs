//! Line diffs between snapshots

use journal::Snapshot;
use owo_colors::OwoColorize;
use similar::{ChangeTag, TextDiff};
use std::collections::BTreeSet;

/// Check if content is binary (contains null bytes in first 8KB)
pub fn is_binary(content: &[u8]) -> bool {
    content.iter().take(8192).any(|&b| b == 0)
}

/// Coloured unified diff of one file, empty when nothing changed
pub fn unified_diff(old_content: &[u8], new_content: &[u8], path: &str, context_lines: usize) -> String {
    let old_text = String::from_utf8_lossy(old_content);
    let new_text = String::from_utf8_lossy(new_content);
    let diff = TextDiff::from_lines(&old_text, &new_text);

    let mut output = String::new();
    for (hunk_idx, hunk) in diff
        .unified_diff()
        .context_radius(context_lines)
        .iter_hunks()
        .enumerate()
    {
        if hunk_idx == 0 {
            output.push_str(&format!("{}\n", format!("--- a/{}", path).bold()));
            output.push_str(&format!("{}\n", format!("+++ b/{}", path).bold()));
        }
        output.push_str(&format!("{}\n", hunk.header().cyan()));

        for change in hunk.iter_changes() {
            let line: &str = change.value();
            match change.tag() {
                ChangeTag::Delete => output.push_str(&format!("{}", format!("-{}", line).red())),
                ChangeTag::Insert => output.push_str(&format!("{}", format!("+{}", line).green())),
                ChangeTag::Equal => output.push_str(&format!("{}", format!(" {}", line).dimmed())),
            }
            if !line.ends_with('\n') {
                output.push('\n');
            }
        }
    }

    output
}

/// Diff every file present in either snapshot
///
/// A file missing on one side diffs against empty content.
pub fn diff_snapshots(old: &Snapshot, new: &Snapshot, context_lines: usize) -> String {
    let paths: BTreeSet<&String> = old.keys().chain(new.keys()).collect();

    let mut output = String::new();
    for path in paths {
        let before = old.get(path).map(Vec::as_slice).unwrap_or_default();
        let after = new.get(path).map(Vec::as_slice).unwrap_or_default();

        if is_binary(before) || is_binary(after) {
            if before != after {
                output.push_str(&format!("Binary file {} differs\n", path));
            }
            continue;
        }

        output.push_str(&unified_diff(before, after, path, context_lines));
    }

    output
}
