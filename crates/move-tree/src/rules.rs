//! Boundary with the move-legality collaborator.
//!
//! The tree never computes legality itself; everything goes through
//! [`MoveRules`]. [`ShakmatyRules`] is the bundled implementation.

use shakmaty::fen::Fen;
use shakmaty::san::{San, SanPlus};
use shakmaty::{CastlingMode, Chess, EnPassantMode, File, Move, Position, Role, Square};

use crate::error::TreeError;

pub const STANDARD_START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// What the rules collaborator reports back for one accepted move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedMove {
    /// Canonical SAN, including check/mate suffix.
    pub notation: String,
    pub from: String,
    pub to: String,
    /// Role letter of the moving piece ("P", "N", ...).
    pub piece: String,
    pub captured: Option<String>,
    pub fen_after: String,
}

/// Legal-move generator boundary: apply a SAN move to a FEN position.
pub trait MoveRules {
    fn initial_fen(&self) -> String;

    fn apply(&self, fen: &str, san: &str) -> Result<AppliedMove, TreeError>;
}

/// shakmaty-backed rules, optionally from a non-standard starting position
/// (chapter starting FENs).
#[derive(Debug, Clone)]
pub struct ShakmatyRules {
    start_fen: String,
}

impl ShakmatyRules {
    pub fn new() -> Self {
        ShakmatyRules {
            start_fen: STANDARD_START_FEN.to_string(),
        }
    }

    pub fn from_fen(fen: &str) -> Result<Self, TreeError> {
        parse_position(fen)?;
        Ok(ShakmatyRules {
            start_fen: fen.to_string(),
        })
    }
}

impl Default for ShakmatyRules {
    fn default() -> Self {
        Self::new()
    }
}

impl MoveRules for ShakmatyRules {
    fn initial_fen(&self) -> String {
        self.start_fen.clone()
    }

    fn apply(&self, fen: &str, san: &str) -> Result<AppliedMove, TreeError> {
        let pos = parse_position(fen)?;

        let rejected = || TreeError::IllegalMove {
            san: san.trim().to_string(),
            fen: fen.to_string(),
        };

        let parsed: San = san.trim().parse().map_err(|_| rejected())?;
        let mv = parsed.to_move(&pos).map_err(|_| rejected())?;

        let (from_sq, to_sq, role, captured) = match &mv {
            Move::Normal {
                role,
                from,
                capture,
                to,
                ..
            } => (*from, *to, *role, *capture),
            Move::EnPassant { from, to } => (*from, *to, Role::Pawn, Some(Role::Pawn)),
            Move::Castle { king, rook } => {
                // King destination file: g for short, c for long
                let to_file = if rook.file() > king.file() { 6 } else { 2 };
                (
                    *king,
                    Square::from_coords(File::new(to_file), king.rank()),
                    Role::King,
                    None,
                )
            }
            _ => return Err(rejected()),
        };

        let notation = SanPlus::from_move(pos.clone(), mv).to_string();

        let mut after = pos;
        after.play_unchecked(mv);
        let fen_after = Fen::from_position(&after, EnPassantMode::Legal).to_string();

        Ok(AppliedMove {
            notation,
            from: from_sq.to_string(),
            to: to_sq.to_string(),
            piece: role_letter(role).to_string(),
            captured: captured.map(|r| role_letter(r).to_string()),
            fen_after,
        })
    }
}

fn parse_position(fen: &str) -> Result<Chess, TreeError> {
    let parsed: Fen = fen
        .parse()
        .map_err(|e| TreeError::BadPosition(format!("unparseable FEN '{fen}': {e}")))?;
    parsed
        .into_position::<Chess>(CastlingMode::Standard)
        .map_err(|e| TreeError::BadPosition(format!("FEN '{fen}' is not a legal position: {e}")))
}

fn role_letter(role: Role) -> &'static str {
    match role {
        Role::Pawn => "P",
        Role::Knight => "N",
        Role::Bishop => "B",
        Role::Rook => "R",
        Role::Queen => "Q",
        Role::King => "K",
    }
}
