//! In-memory move tree for chess study tools: a mainline plus arbitrarily
//! nested variations, addressed by (branch, variation) index pairs.
//!
//! The core is pure, synchronous and single-writer. Legality lives behind
//! [`MoveRules`]; [`ShakmatyRules`] is the bundled implementation.

pub mod error;
pub mod navigate;
pub mod notation;
pub mod path;
pub mod rules;
pub mod session;
pub mod tree;

pub use error::TreeError;
pub use navigate::{navigate_to, PlayedMove, Replay};
pub use notation::{
    from_notation_text, hydrate, linearize, to_notation_text, LinearMove, ParseWarning,
};
pub use path::{Branch, Path, PathStep};
pub use rules::{AppliedMove, MoveRules, ShakmatyRules, STANDARD_START_FEN};
pub use session::Session;
pub use tree::{Line, MoveInput, MoveNode, MoveTree, PlayKind, Played};
