//! Pair-based addressing of lines inside a move tree.
//!
//! A path is a sequence of (branch, variation) pairs: `[]` is the mainline,
//! each pair descends into one variation. On the wire this is the flat
//! even-length integer array the frontend stores (`[]`, `[-1, 0]`,
//! `[0, 1, 4, 0]`, ...), where `-1` marks a root-level variation and is only
//! legal in the first pair.

use std::fmt;

use serde::de;
use serde::ser::SerializeSeq;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Wire value marking a root-level variation (no parent move).
const ROOT_SENTINEL: i64 = -1;

/// Where a variation hangs: off a move of the line walked so far, or off the
/// tree root (alternative first moves).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Branch {
    Root,
    Move(usize),
}

/// One descent: pick the `variation`-th variation at `branch`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathStep {
    pub branch: Branch,
    pub variation: usize,
}

impl PathStep {
    /// Step into a root-level variation (alternative first move).
    pub fn at_root(variation: usize) -> Self {
        PathStep {
            branch: Branch::Root,
            variation,
        }
    }

    /// Step into a variation attached to the move at `branch` of the current line.
    pub fn at_move(branch: usize, variation: usize) -> Self {
        PathStep {
            branch: Branch::Move(branch),
            variation,
        }
    }
}

/// Address of a line in the tree. `Path::root()` is the mainline.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Path {
    steps: Vec<PathStep>,
}

impl Path {
    /// The mainline address.
    pub fn root() -> Self {
        Path::default()
    }

    pub fn is_mainline(&self) -> bool {
        self.steps.is_empty()
    }

    /// Nesting depth (number of pairs).
    pub fn depth(&self) -> usize {
        self.steps.len()
    }

    pub fn steps(&self) -> &[PathStep] {
        &self.steps
    }

    /// The path one variation deeper.
    pub fn child(&self, step: PathStep) -> Path {
        let mut steps = self.steps.clone();
        steps.push(step);
        Path { steps }
    }

    /// The enclosing line's path and the step that left it, unless this is the
    /// mainline.
    pub fn parent(&self) -> Option<(Path, PathStep)> {
        let (last, rest) = self.steps.split_last()?;
        Some((
            Path {
                steps: rest.to_vec(),
            },
            *last,
        ))
    }

    /// Decode the flat wire encoding, validating shape and the `-1` sentinel.
    pub fn from_wire(raw: &[i64]) -> Result<Self, String> {
        if raw.len() % 2 != 0 {
            return Err(format!("path length {} is not even", raw.len()));
        }
        let mut steps = Vec::with_capacity(raw.len() / 2);
        for (i, pair) in raw.chunks_exact(2).enumerate() {
            let branch = match pair[0] {
                ROOT_SENTINEL if i == 0 => Branch::Root,
                ROOT_SENTINEL => {
                    return Err("root sentinel is only valid in the first pair".to_string())
                }
                b if b >= 0 => Branch::Move(b as usize),
                b => return Err(format!("negative branch index {b}")),
            };
            if pair[1] < 0 {
                return Err(format!("negative variation index {}", pair[1]));
            }
            steps.push(PathStep {
                branch,
                variation: pair[1] as usize,
            });
        }
        Ok(Path { steps })
    }

    pub fn to_wire(&self) -> Vec<i64> {
        let mut raw = Vec::with_capacity(self.steps.len() * 2);
        for step in &self.steps {
            raw.push(match step.branch {
                Branch::Root => ROOT_SENTINEL,
                Branch::Move(b) => b as i64,
            });
            raw.push(step.variation as i64);
        }
        raw
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, v) in self.to_wire().iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{v}")?;
        }
        write!(f, "]")
    }
}

impl Serialize for Path {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let wire = self.to_wire();
        let mut seq = serializer.serialize_seq(Some(wire.len()))?;
        for v in wire {
            seq.serialize_element(&v)?;
        }
        seq.end()
    }
}

impl<'de> Deserialize<'de> for Path {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Vec::<i64>::deserialize(deserializer)?;
        Path::from_wire(&raw).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_round_trip() {
        for raw in [vec![], vec![-1, 0], vec![0, 1], vec![3, 0, 1, 2]] {
            let path = Path::from_wire(&raw).unwrap();
            assert_eq!(path.to_wire(), raw);
        }
    }

    #[test]
    fn test_wire_rejects_odd_length() {
        assert!(Path::from_wire(&[0]).is_err());
        assert!(Path::from_wire(&[0, 1, 2]).is_err());
    }

    #[test]
    fn test_wire_rejects_misplaced_sentinel() {
        assert!(Path::from_wire(&[0, 0, -1, 0]).is_err());
        assert!(Path::from_wire(&[-2, 0]).is_err());
        assert!(Path::from_wire(&[-1, 1, 2, 0]).is_ok());
    }

    #[test]
    fn test_json_is_flat_array() {
        let path = Path::from_wire(&[-1, 2, 0, 1]).unwrap();
        let json = serde_json::to_string(&path).unwrap();
        assert_eq!(json, "[-1,2,0,1]");
        let back: Path = serde_json::from_str(&json).unwrap();
        assert_eq!(back, path);
    }

    #[test]
    fn test_parent_and_child() {
        let path = Path::root().child(PathStep::at_move(2, 0));
        let (parent, step) = path.parent().unwrap();
        assert!(parent.is_mainline());
        assert_eq!(step, PathStep::at_move(2, 0));
        assert!(Path::root().parent().is_none());
    }
}
