//! Single-writer cursor over a move tree.
//!
//! Owns the tree, the current `(path, move_index)` cursor and the FEN it
//! corresponds to. One session mutates one tree at a time; collaborative
//! editing would need an arbiter above this.

use crate::error::TreeError;
use crate::navigate::{navigate_to, Replay};
use crate::path::{Branch, Path};
use crate::rules::MoveRules;
use crate::tree::{MoveInput, MoveTree, Played};

pub struct Session<R: MoveRules> {
    rules: R,
    tree: MoveTree,
    path: Path,
    move_index: usize,
    fen: String,
}

impl<R: MoveRules> Session<R> {
    pub fn new(rules: R) -> Self {
        let fen = rules.initial_fen();
        Session {
            rules,
            tree: MoveTree::new(),
            path: Path::root(),
            move_index: 0,
            fen,
        }
    }

    pub fn tree(&self) -> &MoveTree {
        &self.tree
    }

    pub fn fen(&self) -> &str {
        &self.fen
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn move_index(&self) -> usize {
        self.move_index
    }

    /// Play a move at the cursor: legality is checked first, so an illegal
    /// move leaves the tree untouched. Extends, revisits, forks or switches
    /// per [`MoveTree::add_move`], then advances the cursor.
    pub fn play(&mut self, san: &str) -> Result<Played, TreeError> {
        let applied = self.rules.apply(&self.fen, san)?;
        let fen_after = applied.fen_after.clone();
        let played = self
            .tree
            .add_move(&self.path, self.move_index, MoveInput::from(applied))?;
        self.path = played.path.clone();
        self.move_index = played.move_index;
        self.fen = fen_after;
        Ok(played)
    }

    /// Move the cursor and rebuild the position by replay. The move index is
    /// clamped to the addressed line.
    pub fn jump(&mut self, path: Path, move_index: usize) -> Result<Replay, TreeError> {
        let len = self.tree.resolve_line(&path)?.len();
        let move_index = move_index.min(len);
        let replay = navigate_to(&self.tree, &path, move_index, &self.rules)?;
        self.path = path;
        self.move_index = move_index;
        self.fen = replay.fen.clone();
        Ok(replay)
    }

    /// Step back one move. At the head of a variation this pops out to the
    /// parent line, landing just after the branch-point move. `None` when
    /// already at the start of the game.
    pub fn back(&mut self) -> Result<Option<Replay>, TreeError> {
        if self.move_index > 0 {
            return self.jump(self.path.clone(), self.move_index - 1).map(Some);
        }
        let Some((parent, step)) = self.path.parent() else {
            return Ok(None);
        };
        let landing = match step.branch {
            Branch::Root => 0,
            Branch::Move(b) => b + 1,
        };
        self.jump(parent, landing).map(Some)
    }

    /// Step forward one move along the current line. `None` at the end.
    pub fn forward(&mut self) -> Result<Option<Replay>, TreeError> {
        let len = self.tree.resolve_line(&self.path)?.len();
        if self.move_index >= len {
            return Ok(None);
        }
        self.jump(self.path.clone(), self.move_index + 1).map(Some)
    }

    pub fn to_start(&mut self) -> Result<Replay, TreeError> {
        self.jump(self.path.clone(), 0)
    }

    pub fn to_end(&mut self) -> Result<Replay, TreeError> {
        let len = self.tree.resolve_line(&self.path)?.len();
        self.jump(self.path.clone(), len)
    }

    /// Throw the tree away and start over (new game / chapter reset).
    pub fn reset(&mut self) {
        self.tree = MoveTree::new();
        self.path = Path::root();
        self.move_index = 0;
        self.fen = self.rules.initial_fen();
    }

    /// Replace the tree wholesale (chapter or import load), cursor at the
    /// start.
    pub fn load(&mut self, tree: MoveTree) {
        self.tree = tree;
        self.path = Path::root();
        self.move_index = 0;
        self.fen = self.rules.initial_fen();
    }
}
