use std::fmt;

use crate::alignment_mode::AlignmentMode;
use crate::engine::{DpMatrices, EndCell, State, Step};
use crate::scoring::{Position, ScoringMatrix};
use crate::sequence::GAP_SYMBOL;
use crate::{AlignerError, Result};

/// One alignment column as 1-based positions; `None` is a gap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlignedPair {
    pub seq1: Option<usize>,
    pub seq2: Option<usize>,
}

impl AlignedPair {
    pub fn is_gap(&self) -> bool {
        self.seq1.is_none() || self.seq2.is_none()
    }
}

/// Ordered alignment columns plus the first residue consumed in each sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracePath {
    pub pairs: Vec<AlignedPair>,
    pub start: Position,
}

/// Walks back-pointers from an end cell.
pub struct Traceback<'a> {
    matrices: &'a DpMatrices,
}

impl<'a> Traceback<'a> {
    pub fn new(matrices: &'a DpMatrices) -> Self {
        Self { matrices }
    }

    /// Follows pointers from `end` until a `Stop` pointer.
    ///
    /// Global and semi-global walks finish in the top-left corner; once they
    /// reach row or column 0 the rest of the path is a single gap run.
    pub fn reconstruct(&self, end: EndCell, mode: AlignmentMode) -> Result<TracePath> {
        let affine = self.matrices.is_affine();
        let mut pairs = Vec::new();
        let (mut row, mut col, mut state) = (end.row, end.col, end.state);

        loop {
            if mode != AlignmentMode::Local && (row == 0 || col == 0) {
                // Only a leading gap run is left on the boundary.
                pairs.extend((1..=col).rev().map(|c| AlignedPair {
                    seq1: Some(c),
                    seq2: None,
                }));
                pairs.extend((1..=row).rev().map(|r| AlignedPair {
                    seq1: None,
                    seq2: Some(r),
                }));
                row = 0;
                col = 0;
                break;
            }
            let step = match self.matrices.pointer(state, row, col).resolve() {
                Some(step) => step,
                None => break,
            };
            // Affine pointers pick the next state; the move is fixed by the
            // current one.
            let movement = if affine {
                match state {
                    State::Align => Step::Diagonal,
                    State::GapInQuery => Step::Up,
                    State::GapInSubject => Step::Left,
                }
            } else {
                step
            };

            let (needs_row, needs_col) = match movement {
                Step::Diagonal => (true, true),
                Step::Up => (true, false),
                Step::Left => (false, true),
            };
            if (needs_row && row == 0) || (needs_col && col == 0) {
                return Err(AlignerError::Traceback(format!(
                    "{:?} move leaves the matrix at ({}, {})",
                    movement, row, col
                )));
            }

            pairs.push(AlignedPair {
                seq1: needs_col.then_some(col),
                seq2: needs_row.then_some(row),
            });
            if needs_row {
                row -= 1;
            }
            if needs_col {
                col -= 1;
            }
            if affine {
                state = State::from_step(step);
            }
        }

        if mode != AlignmentMode::Local && (row, col) != (0, 0) {
            return Err(AlignerError::Traceback(format!(
                "{} traceback stopped at ({}, {}) instead of the origin",
                mode, row, col
            )));
        }

        pairs.reverse();
        Ok(TracePath {
            pairs,
            start: Position::new(col + 1, row + 1),
        })
    }
}

/// Three-row rendering: first sequence, relation markers, second sequence.
///
/// The relation row holds `|` for identical codes, `:` for a non-negative
/// substitution score and a space otherwise. Columns with a gap, or with a
/// code the matrix cannot score, stay blank.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlignmentRecord {
    pub seq1: String,
    pub relation: String,
    pub seq2: String,
}

impl AlignmentRecord {
    pub fn render(
        pairs: &[AlignedPair],
        residues: (&[u8], &[u8]),
        codes: (&[u8], &[u8]),
        matrix: &ScoringMatrix,
    ) -> Self {
        let mut top = String::with_capacity(pairs.len());
        let mut middle = String::with_capacity(pairs.len());
        let mut bottom = String::with_capacity(pairs.len());

        for pair in pairs {
            top.push(pair.seq1.map_or(GAP_SYMBOL, |p| residues.0[p - 1]) as char);
            bottom.push(pair.seq2.map_or(GAP_SYMBOL, |p| residues.1[p - 1]) as char);

            let marker = match (pair.seq1, pair.seq2) {
                (Some(p1), Some(p2)) => {
                    let (a, b) = (codes.0[p1 - 1], codes.1[p2 - 1]);
                    match matrix.try_score(a, b) {
                        Some(_) if a == b => '|',
                        Some(score) if score >= 0 => ':',
                        _ => ' ',
                    }
                }
                _ => ' ',
            };
            middle.push(marker);
        }

        Self {
            seq1: top,
            relation: middle,
            seq2: bottom,
        }
    }

    /// Number of alignment columns.
    pub fn len(&self) -> usize {
        self.seq1.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seq1.is_empty()
    }

    /// The three rows, top to bottom.
    pub fn rows(&self) -> [&str; 3] {
        [&self.seq1, &self.relation, &self.seq2]
    }
}

impl fmt::Display for AlignmentRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.seq1)?;
        writeln!(f, "{}", self.relation)?;
        write!(f, "{}", self.seq2)
    }
}
