//! Pairwise sequence alignment.
//!
//! Global (Needleman-Wunsch), local (Smith-Waterman) and semi-global
//! alignment of two amino-acid or nucleotide sequences under linear or
//! affine gap costs, with a substitution matrix chosen by name, given as a
//! table, or parsed from NCBI text.
//!
//! ```no_run
//! use pairalign::{align, AlignOptions, AlignmentMode, Alphabet};
//!
//! let options = AlignOptions::new()
//!     .with_alphabet(Alphabet::Nucleotide)
//!     .with_mode(AlignmentMode::Local);
//! let result = align("ACGTACGT", "TTACGTAA", &options)?;
//! println!("{}\n{}", result.score, result.alignment);
//! # Ok::<(), pairalign::AlignerError>(())
//! ```

use std::time::Instant;

use log::{debug, trace, warn};
use thiserror::Error;

pub mod alignment_mode;
pub mod batch;
pub mod config;
pub mod engine;
pub mod matrices;
pub mod report;
pub mod scoring;
pub mod sequence;
pub mod traceback;

pub use crate::alignment_mode::{AlignmentMode, GapModel};
pub use crate::batch::BatchAligner;
pub use crate::config::AlignOptions;
pub use crate::engine::{DpMatrices, State, Trace};
pub use crate::report::{AlignmentResult, AlignmentStats, AlignmentWarning};
pub use crate::scoring::{MatrixSource, Position, ScoringMatrix};
pub use crate::sequence::{Alphabet, Sequence};
pub use crate::traceback::{AlignedPair, AlignmentRecord};

use crate::engine::Engine;
use crate::sequence::EncodedSequence;
use crate::traceback::Traceback;

/// Gap opening penalty used when none is given.
pub const DEFAULT_GAP_OPEN: i32 = 8;

/// Default ceiling on cells per DP layer, roughly a 10k x 10k problem.
pub const DEFAULT_CELL_BUDGET: usize = 100_000_000;

/// Largest score magnitude any DP cell may reach, a quarter of `i32` range
/// so gap openings from the unreachable floor cannot wrap.
pub const MAX_SCORE_MAGNITUDE: i32 = i32::MAX / 4;

#[derive(Debug, Error)]
pub enum AlignerError {
    #[error("Both sequences must contain at least one symbol")]
    InvalidLengthSequences,
    #[error("Sequence {sequence} has invalid amino acid symbol '{symbol}' at position {position}")]
    InvalidAminoAcidSequences {
        sequence: usize,
        position: usize,
        symbol: char,
    },
    #[error("Sequence {sequence} has invalid nucleotide symbol '{symbol}' at position {position}")]
    InvalidNucleotideSequences {
        sequence: usize,
        position: usize,
        symbol: char,
    },
    #[error("Sequence {sequence} symbol '{symbol}' at position {position} is outside the {size}x{size} scoring matrix")]
    InvalidSymbolsInInputSequences {
        sequence: usize,
        position: usize,
        symbol: char,
        size: usize,
    },
    #[error("Invalid scoring matrix: {0}")]
    InvalidScoringMatrix(String),
    #[error("Unknown parameter name: {0}")]
    UnknownParameterName(String),
    #[error("Ambiguous parameter name '{name}', could be any of: {}", .candidates.join(", "))]
    AmbiguousParameterName {
        name: String,
        candidates: Vec<String>,
    },
    #[error("Invalid value '{value}' for parameter {name}")]
    InvalidParameterValue { name: String, value: String },
    #[error("Alignment needs {cells} cells per matrix, over the budget of {budget}")]
    MatrixTooLarge { cells: usize, budget: usize },
    #[error("Traceback failed: {0}")]
    Traceback(String),
    #[error("Batch worker error: {0}")]
    Batch(String),
}

pub type Result<T> = std::result::Result<T, AlignerError>;

/// Options bound to a resolved scoring matrix, reusable across many pairs.
#[derive(Debug, Clone)]
pub struct Aligner {
    options: AlignOptions,
    matrix: ScoringMatrix,
    gaps: GapModel,
}

impl Aligner {
    pub fn new(options: AlignOptions) -> Result<Self> {
        options.validate()?;
        let matrix = ScoringMatrix::resolve(options.matrix.as_ref(), options.alphabet)?;
        let gaps = options.gap_model();
        debug!(
            "{} alignment, {} alphabet, matrix {} ({}x{}, scale {}), gaps {:?}",
            options.mode,
            options.alphabet,
            matrix.name(),
            matrix.size(),
            matrix.size(),
            matrix.scale(),
            gaps
        );
        Ok(Self {
            options,
            matrix,
            gaps,
        })
    }

    pub fn options(&self) -> &AlignOptions {
        &self.options
    }

    pub fn matrix(&self) -> &ScoringMatrix {
        &self.matrix
    }

    /// Score multiplier applied to raw matrix units.
    pub fn scale(&self) -> f64 {
        self.options.scale * self.matrix.scale()
    }

    /// Aligns `seq1` against `seq2`.
    ///
    /// Every input error is reported before any DP matrix is allocated.
    pub fn align(&self, seq1: impl AsRef<[u8]>, seq2: impl AsRef<[u8]>) -> Result<AlignmentResult> {
        self.align_sequences(&Sequence::new(seq1.as_ref()), &Sequence::new(seq2.as_ref()))
    }

    pub fn align_sequences(&self, seq1: &Sequence, seq2: &Sequence) -> Result<AlignmentResult> {
        let started = Instant::now();
        let alphabet = self.options.alphabet;
        let mode = self.options.mode;

        if seq1.is_empty() || seq2.is_empty() {
            return Err(AlignerError::InvalidLengthSequences);
        }
        let mut enc1 = EncodedSequence::encode(seq1, alphabet, 1)?;
        let mut enc2 = EncodedSequence::encode(seq2, alphabet, 2)?;
        enc1.fit_to_matrix(self.matrix.size(), alphabet, 1)?;
        enc2.fit_to_matrix(self.matrix.size(), alphabet, 2)?;
        self.check_budget(enc1.len(), enc2.len())?;
        self.check_score_range(enc1.len(), enc2.len())?;

        let matrices = Engine::new(
            enc1.scoring_codes(),
            enc2.scoring_codes(),
            &self.matrix,
            self.gaps,
            mode,
        )
        .fill();
        let end = matrices.end_cell(mode);

        let mut result = if mode == AlignmentMode::Local && end.score <= 0 {
            warn!(
                "no positive-scoring local alignment between sequences of length {} and {}",
                seq1.len(),
                seq2.len()
            );
            AlignmentResult::empty(self.scale(), mode)
        } else {
            let path = Traceback::new(&matrices).reconstruct(end, mode)?;
            let alignment = AlignmentRecord::render(
                &path.pairs,
                (seq1.as_bytes(), seq2.as_bytes()),
                (enc1.codes(), enc2.codes()),
                &self.matrix,
            );
            let start = if mode.anchored_start() {
                Position::new(1, 1)
            } else {
                path.start
            };
            AlignmentResult::new(end.score, self.scale(), mode, alignment, path.pairs, start)
        };

        if self.options.keep_matrices {
            result.matrices = Some(matrices);
        }
        trace!(
            "aligned {}x{} in {:.3} ms, raw score {}",
            seq1.len(),
            seq2.len(),
            started.elapsed().as_secs_f64() * 1000.0,
            result.raw_score
        );
        Ok(result)
    }

    fn check_budget(&self, len1: usize, len2: usize) -> Result<()> {
        let Some(budget) = self.options.max_cells else {
            return Ok(());
        };
        let cells = (len1 + 1)
            .checked_mul(len2 + 1)
            .unwrap_or(usize::MAX);
        if cells > budget {
            return Err(AlignerError::MatrixTooLarge { cells, budget });
        }
        Ok(())
    }

    /// Rejects penalties and matrices whose extreme path scores leave the
    /// range the DP cells are kept in.
    fn check_score_range(&self, len1: usize, len2: usize) -> Result<()> {
        let limit = i64::from(MAX_SCORE_MAGNITUDE);
        let (name, penalty) = match self.options.gap_extend {
            Some(extend) if extend > self.options.gap_open => ("gapextend", extend),
            _ => ("gapopen", self.options.gap_open),
        };
        // A path never has more gap columns than residues in both sequences.
        let gap_bound = (len1 as i64 + len2 as i64).saturating_mul(i64::from(penalty));
        if gap_bound > limit {
            return Err(invalid_penalty(name, penalty, len1, len2));
        }
        let pair_bound = (len1.min(len2) as i64).saturating_mul(i64::from(self.matrix.max_magnitude()));
        if gap_bound.saturating_add(pair_bound) > limit {
            return Err(AlignerError::InvalidScoringMatrix(format!(
                "scores of {} over {}x{} residues exceed {}",
                self.matrix.name(),
                len1,
                len2,
                MAX_SCORE_MAGNITUDE
            )));
        }
        Ok(())
    }
}

fn invalid_penalty(name: &str, penalty: i32, len1: usize, len2: usize) -> AlignerError {
    debug!(
        "{} {} over {}x{} residues exceeds score range {}",
        name, penalty, len1, len2, MAX_SCORE_MAGNITUDE
    );
    AlignerError::InvalidParameterValue {
        name: name.to_string(),
        value: penalty.to_string(),
    }
}

/// One-shot alignment of two sequences.
pub fn align(
    seq1: impl AsRef<[u8]>,
    seq2: impl AsRef<[u8]>,
    options: &AlignOptions,
) -> Result<AlignmentResult> {
    Aligner::new(options.clone())?.align(seq1, seq2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_sequence_rejected() {
        let err = align("", "ACGT", &AlignOptions::default()).unwrap_err();
        assert!(matches!(err, AlignerError::InvalidLengthSequences));
        let err = align("ACGT", "", &AlignOptions::default()).unwrap_err();
        assert!(matches!(err, AlignerError::InvalidLengthSequences));
    }

    #[test]
    fn test_cell_budget() {
        let options = AlignOptions::new().with_max_cells(Some(20));
        let err = align("ACDEFGHIK", "ACDEFGHIK", &options).unwrap_err();
        assert!(matches!(err, AlignerError::MatrixTooLarge { cells: 100, budget: 20 }));
        assert!(align("ACD", "ACD", &options).is_ok());
    }

    #[test]
    fn test_huge_gap_penalties_rejected() {
        let nt = AlignOptions::new().with_alphabet(Alphabet::Nucleotide);

        let err = align("ACGT", "AC", &nt.clone().with_gap_open(1_500_000_000)).unwrap_err();
        assert!(matches!(
            err,
            AlignerError::InvalidParameterValue { ref name, .. } if name == "gapopen"
        ));

        let affine = nt.clone().with_gap_open(2_000_000_000).with_gap_extend(1);
        let err = align("ACGT", "AC", &affine).unwrap_err();
        assert!(matches!(err, AlignerError::InvalidParameterValue { .. }));

        let affine = nt.with_gap_open(1).with_gap_extend(1_000_000_000);
        let err = align("ACGT", "AC", &affine).unwrap_err();
        assert!(matches!(
            err,
            AlignerError::InvalidParameterValue { ref name, .. } if name == "gapextend"
        ));
    }

    #[test]
    fn test_moderate_penalty_on_long_sequences() {
        let options = AlignOptions::new()
            .with_alphabet(Alphabet::Nucleotide)
            .with_gap_open(1_000_000);
        let long1 = "ACGT".repeat(300);
        let long2 = "TGCA".repeat(300);
        let err = align(&long1, &long2, &options).unwrap_err();
        assert!(matches!(err, AlignerError::InvalidParameterValue { .. }));

        // Short inputs stay in range: two matches and two gap columns.
        let result = align("ACGT", "AC", &options).unwrap();
        assert_eq!(result.raw_score, 2 * 5 - 2 * 1_000_000);
    }

    #[test]
    fn test_extreme_matrix_entries_rejected() {
        let rows = vec![vec![MAX_SCORE_MAGNITUDE, 0], vec![0, MAX_SCORE_MAGNITUDE]];
        let options = AlignOptions::new()
            .with_alphabet(Alphabet::Nucleotide)
            .with_matrix(MatrixSource::Table(rows));
        let err = align("AC", "AC", &options).unwrap_err();
        assert!(matches!(err, AlignerError::InvalidScoringMatrix(_)));
        assert!(align("A", "C", &options).is_err());
    }

    #[test]
    fn test_matrix_error_before_alignment() {
        let options = AlignOptions::new().with_matrix(MatrixSource::Named("PAM250".into()));
        assert!(matches!(
            Aligner::new(options),
            Err(AlignerError::InvalidScoringMatrix(_))
        ));
    }

    #[test]
    fn test_keep_matrices() {
        let options = AlignOptions::new()
            .with_alphabet(Alphabet::Nucleotide)
            .with_matrices(true);
        let result = align("ACGT", "AGT", &options).unwrap();
        let matrices = result.matrices.unwrap();
        assert_eq!((matrices.rows(), matrices.cols()), (4, 5));
        assert_eq!(matrices.score(State::Align, 3, 4), result.raw_score);
    }

    #[test]
    fn test_scale_combines_user_and_matrix() {
        let options = AlignOptions::new()
            .with_alphabet(Alphabet::Nucleotide)
            .with_scale(2.0);
        let aligner = Aligner::new(options).unwrap();
        assert!((aligner.scale() - 2.0 * 0.277316).abs() < 1e-12);
    }

    #[test]
    fn test_error_messages() {
        let err = AlignerError::AmbiguousParameterName {
            name: "gap".into(),
            candidates: vec!["gapopen".into(), "gapextend".into()],
        };
        assert_eq!(
            err.to_string(),
            "Ambiguous parameter name 'gap', could be any of: gapopen, gapextend"
        );
    }
}
