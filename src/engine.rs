//! Dynamic-programming fill for pairwise alignment.
//!
//! Matrix rows index the second sequence and columns index the first, so a
//! matrix is `(len(seq2) + 1) x (len(seq1) + 1)` and row/column 0 hold the
//! empty-prefix boundary.
//!
//! # Recurrences
//!
//! Linear gaps keep one score per cell:
//!
//! ```text
//! F(i,j) = max(F(i-1,j-1) + s(seq1[j-1], seq2[i-1]),  // diagonal
//!              F(i-1,j)   + gap,                       // up
//!              F(i,j-1)   + gap)                       // left
//! ```
//!
//! Affine gaps keep three states per cell:
//!
//! ```text
//! Up(i,j)    = max(Align(i-1,j) + open, Up(i-1,j) + extend)
//! Left(i,j)  = max(Align(i,j-1) + open, Left(i,j-1) + extend)
//! Align(i,j) = max(Align(i-1,j-1), Up(i-1,j-1), Left(i-1,j-1)) + s(..)
//! ```
//!
//! Local mode clamps every value at zero and marks clamped cells with
//! [`Trace::Stop`]. Semi-global mode starts every state at zero on the
//! boundary and does not charge gaps that run along the last row or the last
//! column.

use log::trace;

use crate::alignment_mode::{AlignmentMode, GapModel};
use crate::scoring::ScoringMatrix;

/// Stand-in for minus infinity that survives a few additions without overflow.
pub const NEG_INF: i32 = i32::MIN / 4;

/// Row-major 2-D storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid<T> {
    data: Vec<T>,
    rows: usize,
    cols: usize,
}

impl<T: Copy> Grid<T> {
    pub fn new(rows: usize, cols: usize, fill: T) -> Self {
        Self {
            data: vec![fill; rows * cols],
            rows,
            cols,
        }
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> T {
        self.data[row * self.cols + col]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, value: T) {
        self.data[row * self.cols + col] = value;
    }

    pub fn row(&self, row: usize) -> &[T] {
        &self.data[row * self.cols..(row + 1) * self.cols]
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }
}

/// A single traceback move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Diagonal,
    Up,
    Left,
}

impl Step {
    /// Resolution order for tied pointers.
    pub const PRIORITY: [Step; 3] = [Step::Diagonal, Step::Up, Step::Left];
}

/// Back-pointer for one cell, recording every predecessor that tied for best.
///
/// With linear gaps a pointer names the move. With affine gaps it names the
/// predecessor state: `Diagonal` is [`State::Align`], `Up` is
/// [`State::GapInQuery`] and `Left` is [`State::GapInSubject`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Trace {
    #[default]
    Stop,
    Diagonal,
    Up,
    Left,
    DiagonalOrUp,
    DiagonalOrLeft,
    UpOrLeft,
    All,
}

impl Trace {
    pub fn from_flags(diagonal: bool, up: bool, left: bool) -> Self {
        match (diagonal, up, left) {
            (false, false, false) => Trace::Stop,
            (true, false, false) => Trace::Diagonal,
            (false, true, false) => Trace::Up,
            (false, false, true) => Trace::Left,
            (true, true, false) => Trace::DiagonalOrUp,
            (true, false, true) => Trace::DiagonalOrLeft,
            (false, true, true) => Trace::UpOrLeft,
            (true, true, true) => Trace::All,
        }
    }

    pub fn contains(self, step: Step) -> bool {
        match step {
            Step::Diagonal => matches!(
                self,
                Trace::Diagonal | Trace::DiagonalOrUp | Trace::DiagonalOrLeft | Trace::All
            ),
            Step::Up => matches!(
                self,
                Trace::Up | Trace::DiagonalOrUp | Trace::UpOrLeft | Trace::All
            ),
            Step::Left => matches!(
                self,
                Trace::Left | Trace::DiagonalOrLeft | Trace::UpOrLeft | Trace::All
            ),
        }
    }

    /// Picks one move, Diagonal before Up before Left. `None` for `Stop`.
    pub fn resolve(self) -> Option<Step> {
        Step::PRIORITY.into_iter().find(|&step| self.contains(step))
    }

    /// Single-character code used when dumping pointer matrices.
    pub fn symbol(self) -> char {
        match self {
            Trace::Stop => '.',
            Trace::Diagonal => '\\',
            Trace::Up => '|',
            Trace::Left => '-',
            Trace::DiagonalOrUp => 'u',
            Trace::DiagonalOrLeft => 'l',
            Trace::UpOrLeft => '+',
            Trace::All => '*',
        }
    }
}

/// Affine DP state. Linear-gap matrices only use `Align`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Last column pairs two residues.
    Align,
    /// Last column is a gap in the first sequence ("up").
    GapInQuery,
    /// Last column is a gap in the second sequence ("left").
    GapInSubject,
}

impl State {
    pub const ALL: [State; 3] = [State::Align, State::GapInQuery, State::GapInSubject];

    pub fn index(self) -> usize {
        match self {
            State::Align => 0,
            State::GapInQuery => 1,
            State::GapInSubject => 2,
        }
    }

    /// The state an affine pointer step refers to.
    pub fn from_step(step: Step) -> Self {
        match step {
            Step::Diagonal => State::Align,
            Step::Up => State::GapInQuery,
            Step::Left => State::GapInSubject,
        }
    }
}

/// Score and pointer layers produced by one fill.
///
/// Linear gaps produce one layer; affine gaps produce three, indexed by
/// [`State::index`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DpMatrices {
    pub scores: Vec<Grid<i32>>,
    pub pointers: Vec<Grid<Trace>>,
}

impl DpMatrices {
    fn new(layers: usize, rows: usize, cols: usize, fill: i32) -> Self {
        Self {
            scores: vec![Grid::new(rows, cols, fill); layers],
            pointers: vec![Grid::new(rows, cols, Trace::Stop); layers],
        }
    }

    pub fn is_affine(&self) -> bool {
        self.scores.len() == State::ALL.len()
    }

    pub fn rows(&self) -> usize {
        self.scores[0].rows()
    }

    pub fn cols(&self) -> usize {
        self.scores[0].cols()
    }

    #[inline]
    pub fn score(&self, state: State, row: usize, col: usize) -> i32 {
        self.scores[state.index()].get(row, col)
    }

    #[inline]
    pub fn pointer(&self, state: State, row: usize, col: usize) -> Trace {
        self.pointers[state.index()].get(row, col)
    }

    #[inline]
    fn put(&mut self, state: State, row: usize, col: usize, (score, trace): (i32, Trace)) {
        self.scores[state.index()].set(row, col, score);
        self.pointers[state.index()].set(row, col, trace);
    }

    fn states(&self) -> &'static [State] {
        const LINEAR: [State; 1] = [State::Align];
        if self.is_affine() {
            &State::ALL
        } else {
            &LINEAR
        }
    }

    /// Cell where traceback begins.
    ///
    /// Global and semi-global alignments end in the bottom-right cell, in the
    /// best state there. Local alignments end at the highest-scoring cell of
    /// any state; the first one met in row-major order wins ties.
    pub fn end_cell(&self, mode: AlignmentMode) -> EndCell {
        let states = self.states();
        match mode {
            AlignmentMode::Global | AlignmentMode::SemiGlobal => {
                let (row, col) = (self.rows() - 1, self.cols() - 1);
                let mut best = EndCell {
                    row,
                    col,
                    state: State::Align,
                    score: self.score(State::Align, row, col),
                };
                for &state in &states[1..] {
                    let score = self.score(state, row, col);
                    if score > best.score {
                        best = EndCell { row, col, state, score };
                    }
                }
                best
            }
            AlignmentMode::Local => {
                let mut best = EndCell {
                    row: 0,
                    col: 0,
                    state: State::Align,
                    score: 0,
                };
                for row in 1..self.rows() {
                    for col in 1..self.cols() {
                        for &state in states {
                            let score = self.score(state, row, col);
                            if score > best.score {
                                best = EndCell { row, col, state, score };
                            }
                        }
                    }
                }
                best
            }
        }
    }
}

/// Where traceback starts and the raw score found there.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndCell {
    pub row: usize,
    pub col: usize,
    pub state: State,
    pub score: i32,
}

/// Best of an ordered candidate list, with every exact tie recorded.
fn choose(candidates: &[(i32, Step)]) -> (i32, Trace) {
    let best = candidates
        .iter()
        .map(|&(score, _)| score)
        .max()
        .unwrap_or(NEG_INF);
    let tied = |step: Step| {
        candidates
            .iter()
            .any(|&(score, s)| s == step && score == best)
    };
    (
        best.max(NEG_INF),
        Trace::from_flags(tied(Step::Diagonal), tied(Step::Up), tied(Step::Left)),
    )
}

#[inline]
fn clamp_local((score, trace): (i32, Trace)) -> (i32, Trace) {
    if score <= 0 {
        (0, Trace::Stop)
    } else {
        (score, trace)
    }
}

/// One alignment problem over already-encoded sequences.
pub struct Engine<'a> {
    seq1: &'a [u8],
    seq2: &'a [u8],
    matrix: &'a ScoringMatrix,
    gaps: GapModel,
    mode: AlignmentMode,
}

impl<'a> Engine<'a> {
    /// `seq1` and `seq2` hold scoring codes that are all in bounds for `matrix`.
    pub fn new(
        seq1: &'a [u8],
        seq2: &'a [u8],
        matrix: &'a ScoringMatrix,
        gaps: GapModel,
        mode: AlignmentMode,
    ) -> Self {
        Self {
            seq1,
            seq2,
            matrix,
            gaps,
            mode,
        }
    }

    pub fn fill(&self) -> DpMatrices {
        trace!(
            "{} fill of {}x{} cells, {:?}",
            self.mode,
            self.seq2.len() + 1,
            self.seq1.len() + 1,
            self.gaps
        );
        match self.gaps {
            GapModel::Linear { gap } => self.fill_linear(gap),
            GapModel::Affine { open, extend } => self.fill_affine(open, extend),
        }
    }

    #[inline]
    fn substitution(&self, row: usize, col: usize) -> i32 {
        self.matrix.score(self.seq1[col - 1], self.seq2[row - 1])
    }

    fn fill_linear(&self, gap: i32) -> DpMatrices {
        let (n, m) = (self.seq2.len(), self.seq1.len());
        let mut dp = DpMatrices::new(1, n + 1, m + 1, 0);
        let a = State::Align;

        match self.mode {
            AlignmentMode::Global => {
                for col in 1..=m {
                    dp.put(a, 0, col, (gap * col as i32, Trace::Left));
                }
                for row in 1..=n {
                    dp.put(a, row, 0, (gap * row as i32, Trace::Up));
                }
            }
            AlignmentMode::SemiGlobal => {
                for col in 1..=m {
                    dp.put(a, 0, col, (0, Trace::Left));
                }
                for row in 1..=n {
                    dp.put(a, row, 0, (0, Trace::Up));
                }
            }
            AlignmentMode::Local => {}
        }

        let semi = self.mode == AlignmentMode::SemiGlobal;
        for row in 1..=n {
            let left_gap = if semi && row == n { 0 } else { gap };
            for col in 1..=m {
                let up_gap = if semi && col == m { 0 } else { gap };
                let cell = choose(&[
                    (dp.score(a, row - 1, col - 1) + self.substitution(row, col), Step::Diagonal),
                    (dp.score(a, row - 1, col) + up_gap, Step::Up),
                    (dp.score(a, row, col - 1) + left_gap, Step::Left),
                ]);
                let cell = if self.mode == AlignmentMode::Local {
                    clamp_local(cell)
                } else {
                    cell
                };
                dp.put(a, row, col, cell);
            }
        }
        dp
    }

    fn fill_affine(&self, open: i32, extend: i32) -> DpMatrices {
        let (n, m) = (self.seq2.len(), self.seq1.len());
        let local = self.mode == AlignmentMode::Local;
        let semi = self.mode == AlignmentMode::SemiGlobal;
        let mut dp = DpMatrices::new(State::ALL.len(), n + 1, m + 1, if local { 0 } else { NEG_INF });

        if !local {
            // A boundary gap run of length k costs open + extend * (k - 1).
            let (open, extend) = if semi { (0, 0) } else { (open, extend) };
            dp.put(State::Align, 0, 0, (0, Trace::Stop));
            for col in 1..=m {
                let trace = if col == 1 { Trace::Diagonal } else { Trace::Left };
                dp.put(State::GapInSubject, 0, col, (open + extend * (col as i32 - 1), trace));
            }
            for row in 1..=n {
                let trace = if row == 1 { Trace::Diagonal } else { Trace::Up };
                dp.put(State::GapInQuery, row, 0, (open + extend * (row as i32 - 1), trace));
            }
            if semi {
                // Overhangs are free, so any state may leave the boundary.
                for col in 1..=m {
                    dp.put(State::Align, 0, col, (0, Trace::Left));
                    dp.put(State::GapInQuery, 0, col, (0, Trace::Left));
                }
                for row in 1..=n {
                    dp.put(State::Align, row, 0, (0, Trace::Up));
                    dp.put(State::GapInSubject, row, 0, (0, Trace::Up));
                }
            }
        }

        for row in 1..=n {
            let (left_open, left_extend) = if semi && row == n { (0, 0) } else { (open, extend) };
            for col in 1..=m {
                let (up_open, up_extend) = if semi && col == m { (0, 0) } else { (open, extend) };

                let up = choose(&[
                    (dp.score(State::Align, row - 1, col) + up_open, Step::Diagonal),
                    (dp.score(State::GapInQuery, row - 1, col) + up_extend, Step::Up),
                ]);
                let left = choose(&[
                    (dp.score(State::Align, row, col - 1) + left_open, Step::Diagonal),
                    (dp.score(State::GapInSubject, row, col - 1) + left_extend, Step::Left),
                ]);
                let (best, trace) = choose(&[
                    (dp.score(State::Align, row - 1, col - 1), Step::Diagonal),
                    (dp.score(State::GapInQuery, row - 1, col - 1), Step::Up),
                    (dp.score(State::GapInSubject, row - 1, col - 1), Step::Left),
                ]);
                let align = ((best + self.substitution(row, col)).max(NEG_INF), trace);

                if local {
                    dp.put(State::GapInQuery, row, col, clamp_local(up));
                    dp.put(State::GapInSubject, row, col, clamp_local(left));
                    dp.put(State::Align, row, col, clamp_local(align));
                } else {
                    dp.put(State::GapInQuery, row, col, up);
                    dp.put(State::GapInSubject, row, col, left);
                    dp.put(State::Align, row, col, align);
                }
            }
        }
        dp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn simple_dna() -> ScoringMatrix {
        // A C G T with +1 match / -1 mismatch.
        let rows = (0..4)
            .map(|i| (0..4).map(|j| if i == j { 1 } else { -1 }).collect())
            .collect::<Vec<Vec<i32>>>();
        ScoringMatrix::from_table("unit", &rows).unwrap()
    }

    fn codes(s: &str) -> Vec<u8> {
        s.bytes()
            .map(|b| match b {
                b'A' => 0,
                b'C' => 1,
                b'G' => 2,
                _ => 3,
            })
            .collect()
    }

    #[test]
    fn test_trace_resolution_order() {
        assert_eq!(Trace::All.resolve(), Some(Step::Diagonal));
        assert_eq!(Trace::UpOrLeft.resolve(), Some(Step::Up));
        assert_eq!(Trace::DiagonalOrLeft.resolve(), Some(Step::Diagonal));
        assert_eq!(Trace::Left.resolve(), Some(Step::Left));
        assert_eq!(Trace::Stop.resolve(), None);
        assert_eq!(Trace::from_flags(false, true, true), Trace::UpOrLeft);
    }

    #[test]
    fn test_choose_records_ties() {
        let (score, trace) = choose(&[(3, Step::Diagonal), (3, Step::Up), (1, Step::Left)]);
        assert_eq!(score, 3);
        assert_eq!(trace, Trace::DiagonalOrUp);

        let (score, trace) = choose(&[(0, Step::Diagonal), (2, Step::Up), (2, Step::Left)]);
        assert_eq!(score, 2);
        assert_eq!(trace, Trace::UpOrLeft);
    }

    #[test]
    fn test_grid_dimensions_follow_sequences() {
        let matrix = simple_dna();
        let (s1, s2) = (codes("ACGTA"), codes("ACG"));
        let dp = Engine::new(&s1, &s2, &matrix, GapModel::Linear { gap: -2 }, AlignmentMode::Global)
            .fill();
        assert_eq!(dp.rows(), 4);
        assert_eq!(dp.cols(), 6);
        assert!(!dp.is_affine());
    }

    #[test]
    fn test_global_linear_boundaries_accumulate() {
        let matrix = simple_dna();
        let (s1, s2) = (codes("ACG"), codes("AC"));
        let dp = Engine::new(&s1, &s2, &matrix, GapModel::Linear { gap: -2 }, AlignmentMode::Global)
            .fill();
        assert_eq!(dp.scores[0].row(0), &[0, -2, -4, -6]);
        assert_eq!(dp.score(State::Align, 2, 0), -4);
        assert_eq!(dp.pointer(State::Align, 0, 3), Trace::Left);
        assert_eq!(dp.pointer(State::Align, 2, 0), Trace::Up);
        // AC vs ACG: two matches and one gap.
        assert_eq!(dp.end_cell(AlignmentMode::Global).score, 0);
    }

    #[test]
    fn test_local_linear_clamps_at_zero() {
        let matrix = simple_dna();
        let (s1, s2) = (codes("TTACGTT"), codes("GACGA"));
        let dp = Engine::new(&s1, &s2, &matrix, GapModel::Linear { gap: -2 }, AlignmentMode::Local)
            .fill();
        for row in 0..dp.rows() {
            for col in 0..dp.cols() {
                let score = dp.score(State::Align, row, col);
                assert!(score >= 0);
                if score == 0 {
                    assert_eq!(dp.pointer(State::Align, row, col), Trace::Stop);
                }
            }
        }
        let end = dp.end_cell(AlignmentMode::Local);
        assert_eq!(end.score, 3);
    }

    #[test]
    fn test_affine_boundary_gap_runs() {
        let matrix = simple_dna();
        let (s1, s2) = (codes("ACGT"), codes("AC"));
        let dp = Engine::new(
            &s1,
            &s2,
            &matrix,
            GapModel::Affine { open: -5, extend: -1 },
            AlignmentMode::Global,
        )
        .fill();
        assert!(dp.is_affine());
        assert_eq!(dp.score(State::GapInSubject, 0, 1), -5);
        assert_eq!(dp.score(State::GapInSubject, 0, 4), -8);
        assert_eq!(dp.pointer(State::GapInSubject, 0, 1), Trace::Diagonal);
        assert_eq!(dp.pointer(State::GapInSubject, 0, 4), Trace::Left);
        assert_eq!(dp.score(State::GapInQuery, 2, 0), -6);
        assert_eq!(dp.score(State::Align, 0, 2), NEG_INF);
        // AC-- : two matches then one gap run of length two.
        assert_eq!(dp.end_cell(AlignmentMode::Global).score, 2 - 6);
    }

    #[test]
    fn test_semi_global_ignores_end_gaps() {
        let matrix = simple_dna();
        let (s1, s2) = (codes("TTTACGTTT"), codes("ACG"));
        for gaps in [
            GapModel::Linear { gap: -2 },
            GapModel::Affine { open: -4, extend: -1 },
        ] {
            let dp = Engine::new(&s1, &s2, &matrix, gaps, AlignmentMode::SemiGlobal).fill();
            let end = dp.end_cell(AlignmentMode::SemiGlobal);
            assert_eq!((end.row, end.col), (3, 9));
            assert_eq!(end.score, 3);
        }
    }

    #[test]
    fn test_semi_global_affine_can_turn_at_the_boundary() {
        let matrix = simple_dna();
        let (s1, s2) = (codes("A"), codes("C"));
        for gaps in [
            GapModel::Linear { gap: -2 },
            GapModel::Affine { open: -2, extend: -2 },
        ] {
            let dp = Engine::new(&s1, &s2, &matrix, gaps, AlignmentMode::SemiGlobal).fill();
            // Skipping both residues for free beats the -1 mismatch.
            assert_eq!(dp.end_cell(AlignmentMode::SemiGlobal).score, 0);
        }
    }

    #[test]
    fn test_local_end_cell_empty_for_dissimilar() {
        let matrix = simple_dna();
        let (s1, s2) = (codes("AAAA"), codes("TTTT"));
        let dp = Engine::new(
            &s1,
            &s2,
            &matrix,
            GapModel::Affine { open: -3, extend: -1 },
            AlignmentMode::Local,
        )
        .fill();
        let end = dp.end_cell(AlignmentMode::Local);
        assert_eq!(end.score, 0);
        assert_eq!((end.row, end.col), (0, 0));
    }
}
