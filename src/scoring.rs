use std::fmt;

use log::debug;

use crate::matrices::{
    AMINO_DIM, BLOSUM50, BLOSUM50_SCALE, BLOSUM62, BLOSUM62_SCALE, NUC44, NUC44_SCALE,
    NUCLEOTIDE_DIM,
};
use crate::sequence::Alphabet;
use crate::{AlignerError, Result};

/// 1-based coordinates into the two input sequences.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub seq1: usize,
    pub seq2: usize,
}

impl Position {
    pub fn new(seq1: usize, seq2: usize) -> Self {
        Self { seq1, seq2 }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.seq1, self.seq2)
    }
}

/// Where the substitution scores come from.
#[derive(Debug, Clone, PartialEq)]
pub enum MatrixSource {
    /// A built-in table: `BLOSUM50`, `BLOSUM62` or `NUC44`.
    Named(String),
    /// A square table indexed by alphabet codes.
    Table(Vec<Vec<i32>>),
    /// NCBI-format matrix text with a symbol header row.
    Ncbi(String),
}

/// A resolved square substitution table plus its intrinsic scale.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringMatrix {
    name: String,
    size: usize,
    scores: Vec<i32>,
    scale: f64,
}

impl ScoringMatrix {
    /// The standard matrix for an alphabet: BLOSUM50 or NUC44.
    pub fn default_for(alphabet: Alphabet) -> Self {
        match alphabet {
            Alphabet::AminoAcid => Self::builtin("BLOSUM50", &BLOSUM50, AMINO_DIM, BLOSUM50_SCALE),
            Alphabet::Nucleotide => Self::builtin("NUC44", &NUC44, NUCLEOTIDE_DIM, NUC44_SCALE),
        }
    }

    fn builtin(name: &str, table: &[i32], size: usize, scale: f64) -> Self {
        Self {
            name: name.to_string(),
            size,
            scores: table.to_vec(),
            scale,
        }
    }

    pub fn resolve(source: Option<&MatrixSource>, alphabet: Alphabet) -> Result<Self> {
        let matrix = match source {
            None => Self::default_for(alphabet),
            Some(MatrixSource::Named(name)) => Self::named(name, alphabet)?,
            Some(MatrixSource::Table(rows)) => Self::from_table("custom", rows)?,
            Some(MatrixSource::Ncbi(text)) => Self::from_ncbi(text, alphabet)?,
        };
        debug!(
            "scoring matrix {} ({}x{}, scale {})",
            matrix.name, matrix.size, matrix.size, matrix.scale
        );
        Ok(matrix)
    }

    /// Looks up a built-in matrix by case-insensitive name.
    pub fn named(name: &str, alphabet: Alphabet) -> Result<Self> {
        let (matrix, matrix_alphabet) = match name.to_ascii_uppercase().as_str() {
            "BLOSUM50" => (
                Self::builtin("BLOSUM50", &BLOSUM50, AMINO_DIM, BLOSUM50_SCALE),
                Alphabet::AminoAcid,
            ),
            "BLOSUM62" => (
                Self::builtin("BLOSUM62", &BLOSUM62, AMINO_DIM, BLOSUM62_SCALE),
                Alphabet::AminoAcid,
            ),
            "NUC44" | "NUC.4.4" | "EDNAFULL" => (
                Self::builtin("NUC44", &NUC44, NUCLEOTIDE_DIM, NUC44_SCALE),
                Alphabet::Nucleotide,
            ),
            _ => {
                return Err(AlignerError::InvalidScoringMatrix(format!(
                    "unknown matrix name '{}'",
                    name
                )))
            }
        };
        if matrix_alphabet != alphabet {
            return Err(AlignerError::InvalidScoringMatrix(format!(
                "{} scores {} symbols, not {} symbols",
                matrix.name, matrix_alphabet, alphabet
            )));
        }
        Ok(matrix)
    }

    /// Builds a matrix from rows indexed by alphabet codes. Scale is 1.
    pub fn from_table(name: &str, rows: &[Vec<i32>]) -> Result<Self> {
        let size = rows.len();
        if size == 0 {
            return Err(AlignerError::InvalidScoringMatrix(
                "matrix has no rows".to_string(),
            ));
        }
        if let Some((idx, row)) = rows.iter().enumerate().find(|(_, row)| row.len() != size) {
            return Err(AlignerError::InvalidScoringMatrix(format!(
                "matrix is not square: row {} has {} columns, expected {}",
                idx + 1,
                row.len(),
                size
            )));
        }
        Ok(Self {
            name: name.to_string(),
            size,
            scores: rows.concat(),
            scale: 1.0,
        })
    }

    /// Parses NCBI/EMBOSS matrix text and permutes it into code order.
    ///
    /// The header symbols must cover codes `0..n` of the alphabet exactly
    /// once. A `# ... in 1/N Bit Units` comment sets the intrinsic scale.
    pub fn from_ncbi(text: &str, alphabet: Alphabet) -> Result<Self> {
        let invalid = |msg: String| AlignerError::InvalidScoringMatrix(msg);

        let mut scale = 1.0;
        let mut header: Option<Vec<u8>> = None;
        let mut rows: Vec<(u8, Vec<i32>)> = Vec::new();

        for (lineno, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if let Some(comment) = line.strip_prefix('#') {
                if let Some(units) = parse_bit_units(comment) {
                    scale = units;
                }
                continue;
            }

            let mut fields = line.split_whitespace();
            match &header {
                None => {
                    let codes = fields
                        .map(|symbol| symbol_code(symbol, alphabet))
                        .collect::<Option<Vec<u8>>>()
                        .ok_or_else(|| {
                            invalid(format!(
                                "header line {} has symbols outside the {} alphabet",
                                lineno + 1,
                                alphabet
                            ))
                        })?;
                    header = Some(codes);
                }
                Some(columns) => {
                    let label = fields.next().unwrap_or_default();
                    let code = symbol_code(label, alphabet).ok_or_else(|| {
                        invalid(format!("row label '{}' on line {}", label, lineno + 1))
                    })?;
                    let values = fields
                        .map(|v| v.parse::<i32>())
                        .collect::<std::result::Result<Vec<i32>, _>>()
                        .map_err(|e| invalid(format!("line {}: {}", lineno + 1, e)))?;
                    if values.len() != columns.len() {
                        return Err(invalid(format!(
                            "line {} has {} scores, header has {} symbols",
                            lineno + 1,
                            values.len(),
                            columns.len()
                        )));
                    }
                    rows.push((code, values));
                }
            }
        }

        let columns = header.ok_or_else(|| invalid("no header row".to_string()))?;
        let size = columns.len();
        if rows.len() != size {
            return Err(invalid(format!(
                "{} rows for {} header symbols",
                rows.len(),
                size
            )));
        }
        let mut seen = vec![false; size];
        for &code in &columns {
            match seen.get_mut(code as usize) {
                Some(slot) if !*slot => *slot = true,
                _ => {
                    return Err(invalid(format!(
                        "header symbols do not cover codes 0..{} exactly once",
                        size
                    )))
                }
            }
        }

        let mut scores = vec![0; size * size];
        let mut filled = vec![false; size];
        for (row_code, values) in rows {
            let r = row_code as usize;
            if r >= size || filled[r] {
                return Err(invalid(format!(
                    "row '{}' is duplicated or outside the header",
                    alphabet.symbol(row_code).unwrap_or(b'?') as char
                )));
            }
            filled[r] = true;
            for (&col_code, value) in columns.iter().zip(values) {
                scores[r * size + col_code as usize] = value;
            }
        }

        Ok(Self {
            name: "custom".to_string(),
            size,
            scores,
            scale,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of codes the matrix can score.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Intrinsic units of the matrix, in bits per score unit when known.
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Substitution score of two in-bound codes.
    #[inline]
    pub fn score(&self, a: u8, b: u8) -> i32 {
        self.scores[a as usize * self.size + b as usize]
    }

    /// Largest absolute entry of the table.
    pub fn max_magnitude(&self) -> i32 {
        self.scores
            .iter()
            .map(|s| s.saturating_abs())
            .max()
            .unwrap_or(0)
    }

    /// Like [`score`](Self::score), but `None` when either code is out of bounds.
    pub fn try_score(&self, a: u8, b: u8) -> Option<i32> {
        if (a as usize) < self.size && (b as usize) < self.size {
            Some(self.score(a, b))
        } else {
            None
        }
    }
}

fn symbol_code(symbol: &str, alphabet: Alphabet) -> Option<u8> {
    match symbol.as_bytes() {
        [b] => alphabet.code(*b),
        _ => None,
    }
}

/// Reads `1/3` out of a comment such as `BLOSUM Clustered Scoring Matrix in 1/3 Bit Units`.
fn parse_bit_units(comment: &str) -> Option<f64> {
    let words: Vec<&str> = comment.split_whitespace().collect();
    let bit = words.iter().position(|w| w.eq_ignore_ascii_case("bit"))?;
    if !words.get(bit + 1)?.to_ascii_lowercase().starts_with("unit") {
        return None;
    }
    let amount = match bit.checked_sub(1).map(|i| words[i]) {
        Some(token) => token,
        None => return Some(1.0),
    };
    match amount.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.parse().ok()?;
            let den: f64 = den.parse().ok()?;
            (den != 0.0).then(|| num / den)
        }
        None => amount.parse().ok().or(Some(1.0)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_matrices() {
        let aa = ScoringMatrix::default_for(Alphabet::AminoAcid);
        assert_eq!(aa.name(), "BLOSUM50");
        assert_eq!(aa.size(), 24);
        assert!((aa.scale() - 1.0 / 3.0).abs() < 1e-12);
        // W/W and C/C are the extreme diagonal entries of BLOSUM50.
        let w = Alphabet::AminoAcid.code(b'W').unwrap();
        let c = Alphabet::AminoAcid.code(b'C').unwrap();
        assert_eq!(aa.score(w, w), 15);
        assert_eq!(aa.score(c, c), 13);

        let nt = ScoringMatrix::default_for(Alphabet::Nucleotide);
        assert_eq!(nt.name(), "NUC44");
        assert_eq!(nt.size(), 15);
        assert_eq!(nt.score(0, 0), 5);
        assert_eq!(nt.score(0, 3), -4);
    }

    #[test]
    fn test_builtin_tables_are_symmetric() {
        for alphabet in [Alphabet::AminoAcid, Alphabet::Nucleotide] {
            let m = ScoringMatrix::default_for(alphabet);
            for a in 0..m.size() as u8 {
                for b in 0..m.size() as u8 {
                    assert_eq!(m.score(a, b), m.score(b, a));
                }
            }
        }
        let b62 = ScoringMatrix::named("blosum62", Alphabet::AminoAcid).unwrap();
        assert_eq!(b62.score(0, 0), 4);
        assert_eq!(b62.scale(), 0.5);
    }

    #[test]
    fn test_named_matrix_errors() {
        assert!(matches!(
            ScoringMatrix::named("PAM999", Alphabet::AminoAcid),
            Err(AlignerError::InvalidScoringMatrix(_))
        ));
        assert!(matches!(
            ScoringMatrix::named("BLOSUM50", Alphabet::Nucleotide),
            Err(AlignerError::InvalidScoringMatrix(_))
        ));
    }

    #[test]
    fn test_from_table_requires_square() {
        let ok = ScoringMatrix::from_table("dna", &[vec![1, -1], vec![-1, 1]]).unwrap();
        assert_eq!(ok.size(), 2);
        assert_eq!(ok.score(1, 0), -1);
        assert_eq!(ok.scale(), 1.0);

        assert!(ScoringMatrix::from_table("bad", &[]).is_err());
        assert!(ScoringMatrix::from_table("bad", &[vec![1, 2], vec![3]]).is_err());
    }

    #[test]
    fn test_try_score_bounds() {
        let m = ScoringMatrix::from_table("dna", &[vec![1, -1], vec![-1, 1]]).unwrap();
        assert_eq!(m.try_score(0, 1), Some(-1));
        assert_eq!(m.try_score(0, 2), None);
    }

    const SMALL_NCBI: &str = "\
#  Toy matrix
#  Entropy = 0.0, Expected = -1.0
#  Nucleotide Scoring Matrix in 1/2 Bit Units
   T  A  G  C
T  4 -2 -3 -3
A -2  4 -3 -3
G -3 -3  6 -1
C -3 -3 -1  6
";

    #[test]
    fn test_from_ncbi_permutes_into_code_order() {
        let m = ScoringMatrix::from_ncbi(SMALL_NCBI, Alphabet::Nucleotide).unwrap();
        assert_eq!(m.size(), 4);
        assert_eq!(m.scale(), 0.5);
        let (a, c, g, t) = (0, 1, 2, 3);
        assert_eq!(m.score(a, a), 4);
        assert_eq!(m.score(t, t), 4);
        assert_eq!(m.score(a, t), -2);
        assert_eq!(m.score(g, c), -1);
        assert_eq!(m.score(c, c), 6);
    }

    #[test]
    fn test_from_ncbi_rejects_malformed_text() {
        let missing_row = "   A  C\nA  1 -1\n";
        assert!(ScoringMatrix::from_ncbi(missing_row, Alphabet::Nucleotide).is_err());

        let non_numeric = "   A  C\nA  1 x\nC -1 1\n";
        assert!(ScoringMatrix::from_ncbi(non_numeric, Alphabet::Nucleotide).is_err());

        let gap_in_codes = "   A  G\nA  1 -1\nG -1 1\n";
        assert!(ScoringMatrix::from_ncbi(gap_in_codes, Alphabet::Nucleotide).is_err());

        assert!(ScoringMatrix::from_ncbi("# only comments\n", Alphabet::Nucleotide).is_err());
    }

    #[test]
    fn test_parse_bit_units() {
        assert_eq!(
            parse_bit_units("  BLOSUM Clustered Scoring Matrix in 1/3 Bit Units"),
            Some(1.0 / 3.0)
        );
        assert_eq!(parse_bit_units(" scores in 2 bit units"), Some(2.0));
        assert_eq!(parse_bit_units(" Entropy = 0.4657"), None);
    }

    #[test]
    fn test_resolve_defaults_by_alphabet() {
        let m = ScoringMatrix::resolve(None, Alphabet::Nucleotide).unwrap();
        assert_eq!(m.name(), "NUC44");
        let m = ScoringMatrix::resolve(
            Some(&MatrixSource::Named("BLOSUM62".into())),
            Alphabet::AminoAcid,
        )
        .unwrap();
        assert_eq!(m.name(), "BLOSUM62");
    }
}
