//! Scaled scores and the packaged alignment result.

use std::fmt;
use std::fmt::Write as _;

use crate::alignment_mode::AlignmentMode;
use crate::engine::DpMatrices;
use crate::scoring::Position;
use crate::traceback::{AlignedPair, AlignmentRecord};

/// Non-fatal conditions raised while aligning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlignmentWarning {
    /// Local alignment found no positive-scoring region.
    EmptyAlignment,
}

impl fmt::Display for AlignmentWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlignmentWarning::EmptyAlignment => {
                f.write_str("no positive-scoring local alignment; returning an empty alignment")
            }
        }
    }
}

/// Column counts over a rendered alignment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AlignmentStats {
    pub length: usize,
    pub identities: usize,
    pub positives: usize,
    pub mismatches: usize,
    pub gaps: usize,
    pub gap_opens: usize,
}

impl AlignmentStats {
    pub fn from_record(record: &AlignmentRecord, pairs: &[AlignedPair]) -> Self {
        let mut stats = AlignmentStats {
            length: pairs.len(),
            ..Default::default()
        };
        let mut previous_gap: Option<(bool, bool)> = None;
        for (pair, marker) in pairs.iter().zip(record.relation.chars()) {
            if pair.is_gap() {
                stats.gaps += 1;
                let kind = (pair.seq1.is_none(), pair.seq2.is_none());
                if previous_gap != Some(kind) {
                    stats.gap_opens += 1;
                }
                previous_gap = Some(kind);
                continue;
            }
            previous_gap = None;
            match marker {
                '|' => {
                    stats.identities += 1;
                    stats.positives += 1;
                }
                ':' => {
                    stats.positives += 1;
                    stats.mismatches += 1;
                }
                _ => stats.mismatches += 1,
            }
        }
        stats
    }

    /// Percentage of columns that are identities.
    pub fn identity(&self) -> f64 {
        if self.length == 0 {
            0.0
        } else {
            100.0 * self.identities as f64 / self.length as f64
        }
    }
}

/// Everything one `align` call produces.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignmentResult {
    /// Raw score multiplied by the combined scale.
    pub score: f64,
    /// Score in scoring-matrix units.
    pub raw_score: i32,
    /// User scale times the matrix's intrinsic scale.
    pub scale: f64,
    pub mode: AlignmentMode,
    pub alignment: AlignmentRecord,
    pub path: Vec<AlignedPair>,
    /// First aligned residue in each sequence; always `[1, 1]` unless local.
    pub start: Position,
    pub stats: AlignmentStats,
    pub warnings: Vec<AlignmentWarning>,
    /// Score and pointer matrices, when requested.
    pub matrices: Option<DpMatrices>,
}

impl AlignmentResult {
    pub(crate) fn new(
        raw_score: i32,
        scale: f64,
        mode: AlignmentMode,
        alignment: AlignmentRecord,
        path: Vec<AlignedPair>,
        start: Position,
    ) -> Self {
        let stats = AlignmentStats::from_record(&alignment, &path);
        Self {
            score: raw_score as f64 * scale,
            raw_score,
            scale,
            mode,
            alignment,
            path,
            start,
            stats,
            warnings: Vec::new(),
            matrices: None,
        }
    }

    /// Degenerate result for a local alignment with nothing to report.
    pub(crate) fn empty(scale: f64, mode: AlignmentMode) -> Self {
        let mut result = Self::new(
            0,
            scale,
            mode,
            AlignmentRecord::default(),
            Vec::new(),
            Position::new(1, 1),
        );
        result.warnings.push(AlignmentWarning::EmptyAlignment);
        result
    }

    pub fn is_empty(&self) -> bool {
        self.path.is_empty()
    }

    /// Alignment rows wrapped to `width` columns, each line carrying the
    /// 1-based coordinates of its first and last residue.
    pub fn format_wrapped(&self, width: usize) -> String {
        let width = width.max(1);
        let mut out = String::new();
        let rows = self.alignment.rows();
        let mut next1 = self.path.iter().find_map(|p| p.seq1).unwrap_or(self.start.seq1);
        let mut next2 = self.path.iter().find_map(|p| p.seq2).unwrap_or(self.start.seq2);

        for (block, pairs) in self.path.chunks(width).enumerate() {
            let from = block * width;
            let to = from + pairs.len();
            let used1 = pairs.iter().filter(|p| p.seq1.is_some()).count();
            let used2 = pairs.iter().filter(|p| p.seq2.is_some()).count();

            if block > 0 {
                out.push('\n');
            }
            // A row made only of gaps ends on the last residue printed before it.
            let _ = writeln!(out, "{:>8} {} {}", next1, &rows[0][from..to], next1 + used1 - 1);
            let _ = writeln!(out, "{:>8} {}", "", &rows[1][from..to]);
            let _ = writeln!(out, "{:>8} {} {}", next2, &rows[2][from..to], next2 + used2 - 1);
            next1 += used1;
            next2 += used2;
        }
        out
    }
}
