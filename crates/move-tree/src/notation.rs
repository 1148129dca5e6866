//! Tree flattening and the indented notation-text format.
//!
//! The text format: the mainline is one line per move pair (`"1. e4 e5"`);
//! each variation is a single line holding all its moves, indented 2 spaces
//! per depth level and placed right after the line containing the move it
//! branches from. A variation starting with a black move opens with `"N... "`.
//! Move numbers are absolute plies from the game start, which is what lets
//! the parser recover branch points.
//!
//! All traversals are explicit work-stack walks; nesting depth is bounded by
//! memory, not the call stack.

use std::fmt;

use regex::Regex;

use crate::path::{Branch, Path, PathStep};
use crate::rules::MoveRules;
use crate::tree::{Line, MoveInput, MoveTree};

/// One flattened move: enough to render a move list and navigate back into
/// the tree on click.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinearMove {
    pub id: u64,
    pub notation: String,
    pub path: Path,
    pub move_index: usize,
    /// Absolute ply from the game start (0 = white's first move).
    pub ply: usize,
    pub is_mainline: bool,
}

/// A notation-text line the importer could not use. `line_no` is 1-based;
/// 0 for warnings not tied to a text line (hydration failures).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseWarning {
    pub line_no: usize,
    pub text: String,
    pub reason: String,
}

impl fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {} ({})", self.line_no, self.reason, self.text)
    }
}

#[derive(Clone)]
struct Frame {
    path: Path,
    next: usize,
    base_ply: usize,
}

/// Depth-first traversal order: the mainline with each move's variations
/// emitted right after the move itself, root-level variations after the
/// mainline block.
fn seed_frames(tree: &MoveTree) -> Vec<Frame> {
    let mut stack = Vec::with_capacity(tree.variations.len() + 1);
    for vi in (0..tree.variations.len()).rev() {
        stack.push(Frame {
            path: Path::root().child(PathStep::at_root(vi)),
            next: 0,
            base_ply: 0,
        });
    }
    stack.push(Frame {
        path: Path::root(),
        next: 0,
        base_ply: 0,
    });
    stack
}

/// Flatten the tree into render order: every move tagged with its path, a
/// move's variations emitted before the line's next move.
pub fn linearize(tree: &MoveTree) -> Vec<LinearMove> {
    let mut out = Vec::new();
    let mut stack = seed_frames(tree);
    while let Some(mut frame) = stack.pop() {
        let line = match tree.resolve_line(&frame.path) {
            Ok(line) => line,
            Err(_) => continue,
        };
        while frame.next < line.len() {
            let i = frame.next;
            let node = &line[i];
            out.push(LinearMove {
                id: node.id,
                notation: node.notation.clone(),
                path: frame.path.clone(),
                move_index: i,
                ply: frame.base_ply + i,
                is_mainline: frame.path.is_mainline(),
            });
            frame.next = i + 1;
            if !node.variations.is_empty() {
                let base_ply = frame.base_ply;
                let path = frame.path.clone();
                let var_count = node.variations.len();
                stack.push(frame);
                for vi in (0..var_count).rev() {
                    stack.push(Frame {
                        path: path.child(PathStep::at_move(i, vi)),
                        next: 0,
                        base_ply: base_ply + i + 1,
                    });
                }
                break;
            }
        }
    }
    out
}

/// Render the tree as indented notation text. The mainline is split into
/// pair lines so variations sit next to their branch move; a variation is a
/// single line (its nested blocks follow it), which is what keeps a sibling
/// variation and a continuation line distinguishable when parsing back.
pub fn to_notation_text(tree: &MoveTree) -> String {
    let mut out = String::new();
    let mut stack = seed_frames(tree);
    while let Some(mut frame) = stack.pop() {
        let line = match tree.resolve_line(&frame.path) {
            Ok(line) => line,
            Err(_) => continue,
        };
        if !frame.path.is_mainline() {
            for _ in 0..frame.path.depth() {
                out.push_str("  ");
            }
            for (k, node) in line.iter().enumerate() {
                let p = frame.base_ply + k;
                if k > 0 {
                    out.push(' ');
                }
                if p % 2 == 0 {
                    out.push_str(&format!("{}. ", p / 2 + 1));
                } else if k == 0 {
                    out.push_str(&format!("{}... ", p / 2 + 1));
                }
                out.push_str(&node.notation);
            }
            out.push('\n');
            for i in (0..line.len()).rev() {
                for vi in (0..line[i].variations.len()).rev() {
                    stack.push(Frame {
                        path: frame.path.child(PathStep::at_move(i, vi)),
                        next: 0,
                        base_ply: frame.base_ply + i + 1,
                    });
                }
            }
            continue;
        }
        while frame.next < line.len() {
            let start = frame.next;
            let ply = frame.base_ply + start;
            // A lone black move, or a white move plus its reply.
            let group = if ply % 2 == 1 || start + 1 >= line.len() {
                1
            } else {
                2
            };
            for k in 0..group {
                let p = ply + k;
                if k > 0 {
                    out.push(' ');
                }
                if p % 2 == 0 {
                    out.push_str(&format!("{}. ", p / 2 + 1));
                } else if k == 0 {
                    out.push_str(&format!("{}... ", p / 2 + 1));
                }
                out.push_str(&line[start + k].notation);
            }
            out.push('\n');
            frame.next = start + group;
            if (start..start + group).any(|i| !line[i].variations.is_empty()) {
                let path = frame.path.clone();
                stack.push(frame.clone());
                for i in (start..start + group).rev() {
                    for vi in (0..line[i].variations.len()).rev() {
                        stack.push(Frame {
                            path: path.child(PathStep::at_move(i, vi)),
                            next: 0,
                            base_ply: frame.base_ply + i + 1,
                        });
                    }
                }
                break;
            }
        }
    }
    out
}

struct OpenLine {
    level: usize,
    path: Path,
    start_ply: usize,
    len: usize,
}

/// Parse indented notation text back into a tree. Malformed lines are
/// skipped with a warning; parsing always continues. Imported moves carry
/// notation only; run [`hydrate`] to fill squares and piece info.
pub fn from_notation_text(text: &str) -> (MoveTree, Vec<ParseWarning>) {
    let mut tree = MoveTree::new();
    let mut warnings: Vec<ParseWarning> = Vec::new();
    // One open line per nesting level; the mainline entry is never popped.
    let mut stack: Vec<OpenLine> = vec![OpenLine {
        level: 0,
        path: Path::root(),
        start_ply: 0,
        len: 0,
    }];

    let comment_re = Regex::new(r"\([^)]*\)|\{[^}]*\}").unwrap();
    let number_re = Regex::new(r"^(\d+)(\.{3}|\.)$").unwrap();
    let san_re =
        Regex::new(r"^(?:[KQRBN]?[a-h]?[1-8]?x?[a-h][1-8](?:=[QRBN])?|O-O-O|O-O)[+#]?[!?]*$")
            .unwrap();

    for (idx, raw) in text.lines().enumerate() {
        let line_no = idx + 1;
        if raw.trim().is_empty() {
            continue;
        }
        let leading = raw.len() - raw.trim_start_matches(' ').len();
        let rest = &raw[leading..];
        if rest.starts_with('\t') {
            skip(&mut warnings, line_no, raw, "tab indentation".to_string());
            continue;
        }
        let level = leading / 2;

        // Tokenize: move numbers carry the ply, parenthesized/braced
        // commentary is dropped, anything unrecognized voids the line.
        let cleaned = comment_re.replace_all(rest, " ");
        let mut first_ply: Option<usize> = None;
        let mut notations: Vec<String> = Vec::new();
        let mut bad: Option<String> = None;
        for token in cleaned.split_whitespace() {
            if let Some(caps) = number_re.captures(token) {
                let number: usize = match caps[1].parse() {
                    Ok(n) if n > 0 => n,
                    _ => {
                        bad = Some(format!("bad move number '{token}'"));
                        break;
                    }
                };
                let black = &caps[2] == "...";
                let ply = (number - 1) * 2 + usize::from(black);
                match first_ply {
                    None => first_ply = Some(ply),
                    Some(p0) => {
                        if ply != p0 + notations.len() {
                            bad = Some(format!("move number '{token}' does not follow the line"));
                            break;
                        }
                    }
                }
            } else if token == "1-0" || token == "0-1" || token == "1/2-1/2" || token == "*" {
                continue;
            } else if san_re.is_match(token) {
                if first_ply.is_none() {
                    bad = Some(format!("move '{token}' before any move number"));
                    break;
                }
                notations.push(token.trim_end_matches(['!', '?']).to_string());
            } else {
                bad = Some(format!("unrecognized token '{token}'"));
                break;
            }
        }
        if let Some(reason) = bad {
            skip(&mut warnings, line_no, raw, reason);
            continue;
        }
        let Some(ply0) = first_ply else { continue };
        if notations.is_empty() {
            continue;
        }

        while stack.last().is_some_and(|t| t.level > level) {
            stack.pop();
        }

        // Level 0 is always the mainline: a top-level line continues it (the
        // renderer splits the mainline into pair lines around variation
        // blocks). Deeper lines are always whole variations.
        if level == 0 {
            let continues = stack
                .last()
                .is_some_and(|t| t.level == 0 && ply0 == t.start_ply + t.len);
            if !continues {
                skip(
                    &mut warnings,
                    line_no,
                    raw,
                    "unexpected restart of the main line".to_string(),
                );
                continue;
            }
            let path = stack.last().map(|t| t.path.clone()).unwrap_or_default();
            let mut nodes = Vec::with_capacity(notations.len());
            for n in &notations {
                nodes.push(tree.new_node(MoveInput::bare(n)));
            }
            if let Ok(moves) = tree.resolve_line_mut(&path) {
                moves.extend(nodes);
                if let Some(top) = stack.last_mut() {
                    top.len += notations.len();
                }
            }
            continue;
        }

        if stack.last().is_some_and(|t| t.level == level) {
            stack.pop();
        }
        let Some(parent) = stack.last() else { continue };
        if parent.level + 1 != level {
            skip(
                &mut warnings,
                line_no,
                raw,
                format!("indentation jumps from level {} to {}", parent.level, level),
            );
            continue;
        }
        if ply0 < parent.start_ply {
            skip(
                &mut warnings,
                line_no,
                raw,
                "variation starts before its parent line".to_string(),
            );
            continue;
        }
        let replaced = ply0 - parent.start_ply;
        if replaced > parent.len {
            skip(
                &mut warnings,
                line_no,
                raw,
                format!(
                    "variation replaces move {replaced} but parent line has {} moves",
                    parent.len
                ),
            );
            continue;
        }
        let parent_path = parent.path.clone();

        let mut nodes = Vec::with_capacity(notations.len());
        for n in &notations {
            nodes.push(tree.new_node(MoveInput::bare(n)));
        }
        let new_path = if replaced == 0 {
            // Alternative to the parent line's first move: a sibling of the
            // parent, attached wherever the parent is attached.
            let owner_move = match parent_path.parent() {
                None => None,
                Some((owner, step)) => match step.branch {
                    Branch::Root => None,
                    Branch::Move(b) => Some((owner, b)),
                },
            };
            match owner_move {
                None => {
                    tree.variations.push(Line {
                        moves: nodes,
                        branch_point: None,
                    });
                    Path::root().child(PathStep::at_root(tree.variations.len() - 1))
                }
                Some((owner, b)) => match attach(&mut tree, &owner, b, nodes) {
                    Some(path) => path,
                    None => continue,
                },
            }
        } else {
            match attach(&mut tree, &parent_path, replaced - 1, nodes) {
                Some(path) => path,
                None => continue,
            }
        };
        stack.push(OpenLine {
            level,
            path: new_path,
            start_ply: ply0,
            len: notations.len(),
        });
    }
    (tree, warnings)
}

/// Attach `nodes` as a new variation of the move at `branch` in the line at
/// `owner`; returns the new line's path.
fn attach(
    tree: &mut MoveTree,
    owner: &Path,
    branch: usize,
    nodes: Vec<crate::tree::MoveNode>,
) -> Option<Path> {
    let line = tree.resolve_line_mut(owner).ok()?;
    let parent_move = line.get_mut(branch)?;
    parent_move.variations.push(Line {
        moves: nodes,
        branch_point: Some(branch),
    });
    Some(owner.child(PathStep::at_move(branch, parent_move.variations.len() - 1)))
}

fn skip(warnings: &mut Vec<ParseWarning>, line_no: usize, raw: &str, reason: String) {
    tracing::warn!(line = line_no, %reason, "skipping notation line");
    warnings.push(ParseWarning {
        line_no,
        text: raw.trim().to_string(),
        reason,
    });
}

/// Replay an imported tree through the rules collaborator, filling squares,
/// piece and capture info and canonicalizing SAN. A line that stops being
/// legal is left unhydrated from that point on, with a warning.
pub fn hydrate(tree: &mut MoveTree, rules: &impl MoveRules) -> Vec<ParseWarning> {
    let mut warnings = Vec::new();
    let mut stack: Vec<(Path, String)> = Vec::new();
    for vi in 0..tree.variations.len() {
        stack.push((
            Path::root().child(PathStep::at_root(vi)),
            rules.initial_fen(),
        ));
    }
    stack.push((Path::root(), rules.initial_fen()));
    while let Some((path, mut fen)) = stack.pop() {
        let mut children: Vec<(Path, String)> = Vec::new();
        if let Ok(line) = tree.resolve_line_mut(&path) {
            for (i, node) in line.iter_mut().enumerate() {
                match rules.apply(&fen, &node.notation) {
                    Ok(applied) => {
                        node.notation = applied.notation;
                        node.from = applied.from;
                        node.to = applied.to;
                        node.piece = applied.piece;
                        node.captured = applied.captured;
                        fen = applied.fen_after;
                        // Variations of this move replay from the position
                        // after it (they replace the move that follows).
                        for vi in 0..node.variations.len() {
                            children.push((path.child(PathStep::at_move(i, vi)), fen.clone()));
                        }
                    }
                    Err(err) => {
                        tracing::warn!(path = %path, notation = %node.notation, %err,
                            "imported move is not legal here; rest of line left unhydrated");
                        warnings.push(ParseWarning {
                            line_no: 0,
                            text: node.notation.clone(),
                            reason: err.to_string(),
                        });
                        break;
                    }
                }
            }
        }
        stack.extend(children);
    }
    warnings
}
