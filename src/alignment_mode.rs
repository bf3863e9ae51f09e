use std::fmt;
use std::str::FromStr;

use crate::AlignerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlignmentMode {
    #[default]
    Global,     // Needleman-Wunsch
    Local,      // Smith-Waterman
    SemiGlobal, // Free end-gaps ("glocal")
}

impl AlignmentMode {
    /// Whether the reported start coordinates are pinned to `(1, 1)`.
    pub fn anchored_start(self) -> bool {
        !matches!(self, AlignmentMode::Local)
    }
}

impl fmt::Display for AlignmentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AlignmentMode::Global => "global",
            AlignmentMode::Local => "local",
            AlignmentMode::SemiGlobal => "glocal",
        };
        f.write_str(name)
    }
}

impl FromStr for AlignmentMode {
    type Err = AlignerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "global" | "nw" => Ok(AlignmentMode::Global),
            "local" | "sw" => Ok(AlignmentMode::Local),
            "glocal" | "semiglobal" | "semi-global" => Ok(AlignmentMode::SemiGlobal),
            _ => Err(AlignerError::InvalidParameterValue {
                name: "mode".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// Gap cost model, with penalties stored as negative score deltas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GapModel {
    /// Every gap column costs `gap`.
    Linear { gap: i32 },
    /// A run of `k` gap columns costs `open + extend * (k - 1)`.
    Affine { open: i32, extend: i32 },
}

impl GapModel {
    /// Builds the model from user-facing positive penalties.
    ///
    /// Supplying an extension penalty selects the affine engine even when it
    /// equals the opening penalty.
    pub fn from_penalties(gap_open: i32, gap_extend: Option<i32>) -> Self {
        match gap_extend {
            Some(extend) => GapModel::Affine {
                open: -gap_open,
                extend: -extend,
            },
            None => GapModel::Linear { gap: -gap_open },
        }
    }

    pub fn is_affine(&self) -> bool {
        matches!(self, GapModel::Affine { .. })
    }

    /// Score delta of a single gap run of `len` columns.
    pub fn run_cost(&self, len: usize) -> i32 {
        if len == 0 {
            return 0;
        }
        match *self {
            GapModel::Linear { gap } => gap.saturating_mul(run_len(len)),
            GapModel::Affine { open, extend } => {
                open.saturating_add(extend.saturating_mul(run_len(len - 1)))
            }
        }
    }
}

fn run_len(len: usize) -> i32 {
    i32::try_from(len).unwrap_or(i32::MAX)
}
