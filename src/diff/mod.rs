//! Unified diff rendering between original and fixed source.

use std::path::Path;

/// Diff collaborator: renders a human-readable diff of one file's change.
pub trait Differ: Send + Sync {
    fn diff(&self, old: &str, new: &str, path: &Path) -> String;
}

/// Differ that never renders anything. Useful when callers only care about
/// which files changed, not how.
#[derive(Debug, Default, Clone)]
pub struct NullDiffer;

impl Differ for NullDiffer {
    fn diff(&self, _old: &str, _new: &str, _path: &Path) -> String {
        String::new()
    }
}

// Quadratic LCS is fine for source files; past this many cells we fall back
// to a whole-file replacement hunk instead of ballooning memory.
const LCS_CELL_LIMIT: usize = 4_000_000;

/// Differ that renders a unified diff with `---`/`+++` headers and `@@`
/// hunk markers.
#[derive(Debug, Clone)]
pub struct UnifiedDiffer {
    context: usize,
}

impl UnifiedDiffer {
    pub fn new() -> Self {
        Self { context: 3 }
    }

    pub fn with_context(context: usize) -> Self {
        Self { context }
    }
}

impl Default for UnifiedDiffer {
    fn default() -> Self {
        Self::new()
    }
}

impl Differ for UnifiedDiffer {
    fn diff(&self, old: &str, new: &str, path: &Path) -> String {
        if old == new {
            return String::new();
        }

        let old_lines: Vec<&str> = old.lines().collect();
        let new_lines: Vec<&str> = new.lines().collect();

        let ops = if (old_lines.len() + 1) * (new_lines.len() + 1) > LCS_CELL_LIMIT {
            replace_ops(&old_lines, &new_lines)
        } else {
            diff_ops(&old_lines, &new_lines)
        };

        let name = path.display();
        let mut out = format!("--- a/{name}\n+++ b/{name}\n");
        render_hunks(&ops, self.context, &mut out);
        out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OpKind {
    Equal,
    Delete,
    Insert,
}

#[derive(Debug, Clone, Copy)]
struct Op<'a> {
    kind: OpKind,
    text: &'a str,
}

fn replace_ops<'a>(old: &[&'a str], new: &[&'a str]) -> Vec<Op<'a>> {
    old.iter()
        .map(|text| Op { kind: OpKind::Delete, text })
        .chain(new.iter().map(|text| Op { kind: OpKind::Insert, text }))
        .collect()
}

/// Line-level diff via longest common subsequence.
fn diff_ops<'a>(old: &[&'a str], new: &[&'a str]) -> Vec<Op<'a>> {
    let n = old.len();
    let m = new.len();

    // table[i][j] = LCS length of old[i..] and new[j..]
    let width = m + 1;
    let mut table = vec![0usize; (n + 1) * width];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            table[i * width + j] = if old[i] == new[j] {
                table[(i + 1) * width + j + 1] + 1
            } else {
                table[(i + 1) * width + j].max(table[i * width + j + 1])
            };
        }
    }

    let mut ops = Vec::with_capacity(n.max(m));
    let (mut i, mut j) = (0, 0);
    while i < n && j < m {
        if old[i] == new[j] {
            ops.push(Op { kind: OpKind::Equal, text: old[i] });
            i += 1;
            j += 1;
        } else if table[(i + 1) * width + j] >= table[i * width + j + 1] {
            ops.push(Op { kind: OpKind::Delete, text: old[i] });
            i += 1;
        } else {
            ops.push(Op { kind: OpKind::Insert, text: new[j] });
            j += 1;
        }
    }
    for text in &old[i..] {
        ops.push(Op { kind: OpKind::Delete, text });
    }
    for text in &new[j..] {
        ops.push(Op { kind: OpKind::Insert, text });
    }

    ops
}

fn render_hunks(ops: &[Op<'_>], context: usize, out: &mut String) {
    let changes: Vec<usize> = ops
        .iter()
        .enumerate()
        .filter(|(_, op)| op.kind != OpKind::Equal)
        .map(|(index, _)| index)
        .collect();
    if changes.is_empty() {
        return;
    }

    // line numbers (1-based) at which each op starts
    let mut positions = Vec::with_capacity(ops.len());
    let (mut old_line, mut new_line) = (1usize, 1usize);
    for op in ops {
        positions.push((old_line, new_line));
        match op.kind {
            OpKind::Equal => {
                old_line += 1;
                new_line += 1;
            }
            OpKind::Delete => old_line += 1,
            OpKind::Insert => new_line += 1,
        }
    }

    // group changed ops into hunks, merging runs whose context would overlap
    let mut hunks: Vec<(usize, usize)> = Vec::new();
    let mut start = changes[0];
    let mut prev = changes[0];
    for &change in &changes[1..] {
        if change - prev > 2 * context {
            hunks.push((start, prev));
            start = change;
        }
        prev = change;
    }
    hunks.push((start, prev));

    for (first, last) in hunks {
        let from = first.saturating_sub(context);
        let to = (last + context).min(ops.len() - 1);
        let slice = &ops[from..=to];

        let old_count = slice
            .iter()
            .filter(|op| op.kind != OpKind::Insert)
            .count();
        let new_count = slice
            .iter()
            .filter(|op| op.kind != OpKind::Delete)
            .count();
        let (mut old_start, mut new_start) = positions[from];
        // empty sides are anchored to the line before the hunk
        if old_count == 0 {
            old_start -= 1;
        }
        if new_count == 0 {
            new_start -= 1;
        }

        out.push_str(&format!(
            "@@ -{old_start},{old_count} +{new_start},{new_count} @@\n"
        ));
        for op in slice {
            let prefix = match op.kind {
                OpKind::Equal => ' ',
                OpKind::Delete => '-',
                OpKind::Insert => '+',
            };
            out.push(prefix);
            out.push_str(op.text);
            out.push('\n');
        }
    }
}
