//! Position reconstruction by root-to-leaf replay.

use crate::error::TreeError;
use crate::path::{Branch, Path};
use crate::rules::MoveRules;
use crate::tree::{MoveNode, MoveTree};

/// One replayed ply, for UI move-highlighting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayedMove {
    pub id: u64,
    pub notation: String,
    pub from: String,
    pub to: String,
    pub fen_after: String,
}

/// Result of [`navigate_to`]. `partial` is set when a recorded move stopped
/// being legal mid-replay (corrupted tree); `fen` is then the last good
/// position, never a silently-continued one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replay {
    pub fen: String,
    pub moves: Vec<PlayedMove>,
    pub partial: bool,
}

/// Replay from the tree root to `(path, move_index)`: for each ancestor line
/// the moves up to and including its branch point, then the addressed line up
/// to (exclusive) `move_index`. A move index past the end of the line replays
/// the whole line.
///
/// Replay order is always root-to-leaf, which makes the reconstructed
/// position deterministic regardless of how the tree was built.
pub fn navigate_to(
    tree: &MoveTree,
    path: &Path,
    move_index: usize,
    rules: &impl MoveRules,
) -> Result<Replay, TreeError> {
    // Plan the full move sequence first: a bad path must fail outright rather
    // than yield a partial position.
    let mut plan: Vec<&MoveNode> = Vec::new();
    let mut current = &tree.moves;
    for (i, step) in path.steps().iter().enumerate() {
        let variations = match step.branch {
            Branch::Root => {
                if i != 0 {
                    return Err(TreeError::invalid_path(
                        path,
                        "root sentinel past the first pair",
                    ));
                }
                &tree.variations
            }
            Branch::Move(b) => {
                if b >= current.len() {
                    return Err(TreeError::invalid_path(
                        path,
                        format!("no move at branch index {b}"),
                    ));
                }
                plan.extend(current[..=b].iter());
                &current[b].variations
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
    plan.extend(current.iter().take(move_index));

    let mut fen = rules.initial_fen();
    let mut played = Vec::with_capacity(plan.len());
    for node in plan {
        match rules.apply(&fen, &node.notation) {
            Ok(applied) => {
                played.push(PlayedMove {
                    id: node.id,
                    notation: node.notation.clone(),
                    from: applied.from,
                    to: applied.to,
                    fen_after: applied.fen_after.clone(),
                });
                fen = applied.fen_after;
            }
            Err(err) => {
                tracing::warn!(path = %path, notation = %node.notation, %err,
                    "recorded move is no longer legal; returning partial replay");
                return Ok(Replay {
                    fen,
                    moves: played,
                    partial: true,
                });
            }
        }
    }
    Ok(Replay {
        fen,
        moves: played,
        partial: false,
    })
}
