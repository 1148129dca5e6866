//! The move tree: a mainline plus arbitrarily nested variations.
//!
//! Lines exclusively own their moves; moves exclusively own their variations.
//! A variation attached to the move at index `i` of its parent line has
//! `branch_point == i`, and its first move is an alternative to the parent's
//! move `i + 1`. Alternative *first* moves have no parent move and live in the
//! tree-level `variations` list.

use serde::{Deserialize, Serialize};

use crate::error::TreeError;
use crate::path::{Branch, Path, PathStep};
use crate::rules::AppliedMove;

/// One ply. `notation` is the move's canonical identity within its position;
/// `from`/`to`/`piece`/`captured` are cached for UI use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveNode {
    /// Opaque id, stable for the move's lifetime (UI collapse state keys on it).
    #[serde(default)]
    pub id: u64,
    pub notation: String,
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub to: String,
    #[serde(default)]
    pub piece: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub captured: Option<String>,
    #[serde(default)]
    pub variations: Vec<Line>,
}

/// A contiguous sequence of moves: the mainline or one variation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Line {
    pub moves: Vec<MoveNode>,
    /// Index of the parent-line move this variation is attached to.
    /// `None` for the mainline and for root-level variations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch_point: Option<usize>,
}

/// The fields a caller supplies when recording a move, typically copied from
/// the rules collaborator's [`AppliedMove`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveInput {
    pub notation: String,
    pub from: String,
    pub to: String,
    pub piece: String,
    pub captured: Option<String>,
}

impl MoveInput {
    /// A move known only by notation (imports fill the rest via hydration).
    pub fn bare(notation: impl Into<String>) -> Self {
        MoveInput {
            notation: notation.into(),
            from: String::new(),
            to: String::new(),
            piece: String::new(),
            captured: None,
        }
    }
}

impl From<AppliedMove> for MoveInput {
    fn from(applied: AppliedMove) -> Self {
        MoveInput {
            notation: applied.notation,
            from: applied.from,
            to: applied.to,
            piece: applied.piece,
            captured: applied.captured,
        }
    }
}

/// How [`MoveTree::add_move`] disposed of the move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayKind {
    /// Appended to the end of the addressed line.
    Extended,
    /// The move was already recorded at this slot; nothing changed.
    Revisited,
    /// A new variation was created.
    Forked,
    /// An existing variation already starts with this move; moved into it.
    Switched,
}

/// New cursor position after [`MoveTree::add_move`]. After a fork the cursor
/// is inside the new variation, not on the old line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Played {
    pub path: Path,
    pub move_index: usize,
    pub kind: PlayKind,
}

/// Root of the structure: the mainline plus root-level variations
/// (alternative first moves, stored here because the root has no parent move).
#[derive(Debug, Clone, Eq, Serialize, Deserialize, Default)]
pub struct MoveTree {
    pub moves: Vec<MoveNode>,
    #[serde(default)]
    pub variations: Vec<Line>,
    #[serde(skip)]
    next_id: u64,
}

// `next_id` is runtime allocator state, not document state, so it is excluded
// from equality just as it is from serialization.
impl PartialEq for MoveTree {
    fn eq(&self, other: &Self) -> bool {
        self.moves == other.moves && self.variations == other.variations
    }
}

impl MoveTree {
    pub fn new() -> Self {
        MoveTree::default()
    }

    pub fn is_empty(&self) -> bool {
        self.moves.is_empty() && self.variations.is_empty()
    }

    /// Resolve the line a path addresses. No clamping: any missing index is
    /// an [`TreeError::InvalidPath`] and the caller reacts.
    pub fn resolve_line(&self, path: &Path) -> Result<&Vec<MoveNode>, TreeError> {
        let mut current = &self.moves;
        for (i, step) in path.steps().iter().enumerate() {
            let variations = match step.branch {
                Branch::Root => {
                    if i != 0 {
                        return Err(TreeError::invalid_path(
                            path,
                            "root sentinel past the first pair",
                        ));
                    }
                    &self.variations
                }
                Branch::Move(b) => {
                    let node = current.get(b).ok_or_else(|| {
                        TreeError::invalid_path(path, format!("no move at branch index {b}"))
                    })?;
                    &node.variations
                }
            };
            let line = variations.get(step.variation).ok_or_else(|| {
                TreeError::invalid_path(
                    path,
                    format!("no variation {} at pair {}", step.variation, i),
                )
            })?;
            current = &line.moves;
        }
        Ok(current)
    }

    pub fn resolve_line_mut(&mut self, path: &Path) -> Result<&mut Vec<MoveNode>, TreeError> {
        // Validate up front; the walk below then indexes directly.
        self.resolve_line(path)?;
        let mut steps = path.steps().iter();
        let mut current = match steps.next() {
            None => return Ok(&mut self.moves),
            Some(step) => match step.branch {
                Branch::Root => &mut self.variations[step.variation].moves,
                Branch::Move(b) => &mut self.moves[b].variations[step.variation].moves,
            },
        };
        for step in steps {
            let b = match step.branch {
                Branch::Move(b) => b,
                Branch::Root => {
                    return Err(TreeError::invalid_path(
                        path,
                        "root sentinel past the first pair",
                    ))
                }
            };
            let line = current;
            current = &mut line[b].variations[step.variation].moves;
        }
        Ok(current)
    }

    /// Record a move at `(path, move_index)`: extend the line, revisit an
    /// identical recorded move, or fork a variation. Returns the new cursor.
    pub fn add_move(
        &mut self,
        path: &Path,
        move_index: usize,
        input: MoveInput,
    ) -> Result<Played, TreeError> {
        let (len, existing) = {
            let line = self.resolve_line(path)?;
            (
                line.len(),
                line.get(move_index).map(|m| m.notation.clone()),
            )
        };
        if move_index > len {
            return Err(TreeError::invalid_path(
                path,
                format!("move index {move_index} past end of line with {len} moves"),
            ));
        }

        match existing {
            None => {
                let node = self.new_node(input);
                self.resolve_line_mut(path)?.push(node);
                Ok(Played {
                    path: path.clone(),
                    move_index: move_index + 1,
                    kind: PlayKind::Extended,
                })
            }
            Some(recorded) if recorded == input.notation => Ok(Played {
                path: path.clone(),
                move_index: move_index + 1,
                kind: PlayKind::Revisited,
            }),
            Some(_) => {
                if move_index == 0 {
                    match path.parent() {
                        // Alternative first move of the game.
                        None => self.fork_at_root(input),
                        // Diverging at a variation's own first move: the new
                        // line becomes a sibling, attached wherever the
                        // current line is attached.
                        Some((owner, step)) => match step.branch {
                            Branch::Root => self.fork_at_root(input),
                            Branch::Move(b) => self.fork_at(&owner, b, input),
                        },
                    }
                } else {
                    self.fork_at(path, move_index - 1, input)
                }
            }
        }
    }

    fn fork_at(
        &mut self,
        owner: &Path,
        parent_index: usize,
        input: MoveInput,
    ) -> Result<Played, TreeError> {
        {
            let line = self.resolve_line(owner)?;
            let parent = line.get(parent_index).ok_or_else(|| {
                TreeError::invalid_path(owner, format!("no move at branch index {parent_index}"))
            })?;
            // Never create a duplicate sibling: switch into a variation that
            // already starts with this move.
            if let Some(vi) = first_move_match(&parent.variations, &input.notation) {
                tracing::debug!(path = %owner, branch = parent_index, variation = vi, "switching into existing variation");
                return Ok(Played {
                    path: owner.child(PathStep::at_move(parent_index, vi)),
                    move_index: 1,
                    kind: PlayKind::Switched,
                });
            }
        }
        let node = self.new_node(input);
        let line = self.resolve_line_mut(owner)?;
        let parent = &mut line[parent_index];
        parent.variations.push(Line {
            moves: vec![node],
            branch_point: Some(parent_index),
        });
        let vi = parent.variations.len() - 1;
        tracing::debug!(path = %owner, branch = parent_index, variation = vi, "forked new variation");
        Ok(Played {
            path: owner.child(PathStep::at_move(parent_index, vi)),
            move_index: 1,
            kind: PlayKind::Forked,
        })
    }

    fn fork_at_root(&mut self, input: MoveInput) -> Result<Played, TreeError> {
        if let Some(vi) = first_move_match(&self.variations, &input.notation) {
            tracing::debug!(variation = vi, "switching into existing root variation");
            return Ok(Played {
                path: Path::root().child(PathStep::at_root(vi)),
                move_index: 1,
                kind: PlayKind::Switched,
            });
        }
        let node = self.new_node(input);
        self.variations.push(Line {
            moves: vec![node],
            branch_point: None,
        });
        let vi = self.variations.len() - 1;
        tracing::debug!(variation = vi, "forked new root-level variation");
        Ok(Played {
            path: Path::root().child(PathStep::at_root(vi)),
            move_index: 1,
            kind: PlayKind::Forked,
        })
    }

    pub(crate) fn new_node(&mut self, input: MoveInput) -> MoveNode {
        if self.next_id == 0 {
            // Re-seed the allocator past any ids present in loaded data.
            self.next_id = self.max_id() + 1;
        }
        let id = self.next_id;
        self.next_id += 1;
        MoveNode {
            id,
            notation: input.notation,
            from: input.from,
            to: input.to,
            piece: input.piece,
            captured: input.captured,
            variations: Vec::new(),
        }
    }

    fn max_id(&self) -> u64 {
        let mut max = 0;
        let mut stack: Vec<&Vec<MoveNode>> = vec![&self.moves];
        stack.extend(self.variations.iter().map(|l| &l.moves));
        while let Some(moves) = stack.pop() {
            for node in moves {
                max = max.max(node.id);
                stack.extend(node.variations.iter().map(|l| &l.moves));
            }
        }
        max
    }
}

fn first_move_match(variations: &[Line], notation: &str) -> Option<usize> {
    variations
        .iter()
        .position(|l| l.moves.first().map(|m| m.notation.as_str()) == Some(notation))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mainline(tree: &mut MoveTree, sans: &[&str]) {
        let mut index = tree.moves.len();
        for san in sans {
            let played = tree
                .add_move(&Path::root(), index, MoveInput::bare(*san))
                .unwrap();
            index = played.move_index;
        }
    }

    #[test]
    fn test_first_move_appends_to_mainline() {
        let mut tree = MoveTree::new();
        let played = tree
            .add_move(&Path::root(), 0, MoveInput::bare("e4"))
            .unwrap();
        assert_eq!(played.kind, PlayKind::Extended);
        assert!(played.path.is_mainline());
        assert_eq!(played.move_index, 1);
        assert_eq!(tree.moves.len(), 1);
        assert_eq!(tree.moves[0].notation, "e4");
        assert!(tree.moves[0].variations.is_empty());
    }

    #[test]
    fn test_divergence_forks_variation() {
        let mut tree = MoveTree::new();
        mainline(&mut tree, &["e4", "e5"]);
        let played = tree
            .add_move(&Path::root(), 1, MoveInput::bare("c5"))
            .unwrap();
        assert_eq!(played.kind, PlayKind::Forked);
        assert_eq!(played.path.to_wire(), vec![0, 0]);
        assert_eq!(played.move_index, 1);
        let var = &tree.moves[0].variations[0];
        assert_eq!(var.branch_point, Some(0));
        assert_eq!(var.moves[0].notation, "c5");
        // Mainline untouched
        assert_eq!(tree.moves[1].notation, "e5");
    }

    #[test]
    fn test_same_move_is_pure_navigation() {
        let mut tree = MoveTree::new();
        mainline(&mut tree, &["e4", "e5"]);
        let before = tree.clone();
        let played = tree
            .add_move(&Path::root(), 0, MoveInput::bare("e4"))
            .unwrap();
        assert_eq!(played.kind, PlayKind::Revisited);
        assert_eq!(played.move_index, 1);
        assert_eq!(tree, before);
    }

    #[test]
    fn test_repeated_fork_switches_instead_of_duplicating() {
        let mut tree = MoveTree::new();
        mainline(&mut tree, &["e4", "e5"]);
        let first = tree
            .add_move(&Path::root(), 1, MoveInput::bare("c5"))
            .unwrap();
        let second = tree
            .add_move(&Path::root(), 1, MoveInput::bare("c5"))
            .unwrap();
        assert_eq!(first.kind, PlayKind::Forked);
        assert_eq!(second.kind, PlayKind::Switched);
        assert_eq!(second.path, first.path);
        assert_eq!(tree.moves[0].variations.len(), 1);
    }

    #[test]
    fn test_alternative_first_move_goes_to_root_level() {
        let mut tree = MoveTree::new();
        mainline(&mut tree, &["e4"]);
        let played = tree
            .add_move(&Path::root(), 0, MoveInput::bare("d4"))
            .unwrap();
        assert_eq!(played.kind, PlayKind::Forked);
        assert_eq!(played.path.to_wire(), vec![-1, 0]);
        assert_eq!(tree.variations.len(), 1);
        assert_eq!(tree.variations[0].branch_point, None);
        assert_eq!(tree.variations[0].moves[0].notation, "d4");
    }

    #[test]
    fn test_fork_at_variation_head_creates_sibling() {
        let mut tree = MoveTree::new();
        mainline(&mut tree, &["e4", "e5", "Nf3"]);
        let fork = tree
            .add_move(&Path::root(), 1, MoveInput::bare("c5"))
            .unwrap();
        // Diverge at the variation's first move: sibling on the same parent.
        let sibling = tree
            .add_move(&fork.path, 0, MoveInput::bare("e6"))
            .unwrap();
        assert_eq!(sibling.kind, PlayKind::Forked);
        assert_eq!(sibling.path.to_wire(), vec![0, 1]);
        assert_eq!(tree.moves[0].variations.len(), 2);
        assert_eq!(tree.moves[0].variations[1].moves[0].notation, "e6");
        assert_eq!(tree.moves[0].variations[1].branch_point, Some(0));
    }

    #[test]
    fn test_nested_variation() {
        let mut tree = MoveTree::new();
        mainline(&mut tree, &["e4", "e5", "Nf3", "Nc6"]);
        let fork = tree
            .add_move(&Path::root(), 3, MoveInput::bare("Nf6"))
            .unwrap();
        assert_eq!(fork.path.to_wire(), vec![2, 0]);
        // Extend the variation, then fork inside it.
        let ext = tree
            .add_move(&fork.path, 1, MoveInput::bare("Nxe5"))
            .unwrap();
        assert_eq!(ext.kind, PlayKind::Extended);
        let nested = tree
            .add_move(&fork.path, 1, MoveInput::bare("Bc4"))
            .unwrap();
        assert_eq!(nested.kind, PlayKind::Forked);
        assert_eq!(nested.path.to_wire(), vec![2, 0, 0, 0]);
        let line = tree.resolve_line(&nested.path).unwrap();
        assert_eq!(line[0].notation, "Bc4");
    }

    #[test]
    fn test_resolve_rejects_missing_indices() {
        let mut tree = MoveTree::new();
        mainline(&mut tree, &["e4"]);
        let bad = Path::from_wire(&[0, 0]).unwrap();
        assert!(matches!(
            tree.resolve_line(&bad),
            Err(TreeError::InvalidPath { .. })
        ));
        let bad_root = Path::from_wire(&[-1, 0]).unwrap();
        assert!(tree.resolve_line(&bad_root).is_err());
    }

    #[test]
    fn test_add_move_rejects_index_past_end() {
        let mut tree = MoveTree::new();
        mainline(&mut tree, &["e4"]);
        assert!(tree
            .add_move(&Path::root(), 5, MoveInput::bare("e5"))
            .is_err());
    }

    #[test]
    fn test_ids_are_unique_and_survive_reload() {
        let mut tree = MoveTree::new();
        mainline(&mut tree, &["e4", "e5", "Nf3"]);
        tree.add_move(&Path::root(), 1, MoveInput::bare("c5"))
            .unwrap();
        let json = serde_json::to_string(&tree).unwrap();
        let mut reloaded: MoveTree = serde_json::from_str(&json).unwrap();
        let old_ids: Vec<u64> = reloaded.moves.iter().map(|m| m.id).collect();
        assert_eq!(
            old_ids,
            tree.moves.iter().map(|m| m.id).collect::<Vec<u64>>()
        );
        // Fresh ids keep going past the loaded ones.
        let played = reloaded
            .add_move(&Path::root(), 3, MoveInput::bare("Nc6"))
            .unwrap();
        assert_eq!(played.kind, PlayKind::Extended);
        let new_id = reloaded.moves[3].id;
        assert!(old_ids.iter().all(|&id| id < new_id));
    }

    #[test]
    fn test_json_shape_matches_stored_chapters() {
        let mut tree = MoveTree::new();
        mainline(&mut tree, &["e4", "e5"]);
        tree.add_move(&Path::root(), 1, MoveInput::bare("c5"))
            .unwrap();
        let value = serde_json::to_value(&tree).unwrap();
        assert!(value.get("moves").unwrap().is_array());
        assert!(value.get("variations").unwrap().is_array());
        assert!(value.get("nextId").is_none());
        assert!(value.get("next_id").is_none());
        let var = &value["moves"][0]["variations"][0];
        assert_eq!(var["branchPoint"], 0);
        assert_eq!(var["moves"][0]["notation"], "c5");
    }
}
