use crate::alignment_mode::{AlignmentMode, GapModel};
use crate::scoring::MatrixSource;
use crate::sequence::Alphabet;
use crate::{AlignerError, Result, DEFAULT_CELL_BUDGET, DEFAULT_GAP_OPEN, MAX_SCORE_MAGNITUDE};

/// Option names accepted by [`AlignOptions::from_pairs`].
pub const PARAMETER_NAMES: [&str; 8] = [
    "alphabet",
    "scoringmatrix",
    "gapopen",
    "gapextend",
    "scale",
    "mode",
    "showmatrices",
    "maxcells",
];

/// Everything that controls one alignment.
///
/// Gap penalties are given as positive costs and subtracted internally.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignOptions {
    pub alphabet: Alphabet,
    /// `None` selects the standard matrix for `alphabet`.
    pub matrix: Option<MatrixSource>,
    pub gap_open: i32,
    /// Setting this switches to the affine engine.
    pub gap_extend: Option<i32>,
    pub scale: f64,
    pub mode: AlignmentMode,
    /// Return the DP matrices alongside the alignment.
    pub keep_matrices: bool,
    /// Upper bound on DP cells per layer; `None` disables the check.
    pub max_cells: Option<usize>,
}

impl Default for AlignOptions {
    fn default() -> Self {
        Self {
            alphabet: Alphabet::AminoAcid,
            matrix: None,
            gap_open: DEFAULT_GAP_OPEN,
            gap_extend: None,
            scale: 1.0,
            mode: AlignmentMode::Global,
            keep_matrices: false,
            max_cells: Some(DEFAULT_CELL_BUDGET),
        }
    }
}

impl AlignOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_alphabet(mut self, alphabet: Alphabet) -> Self {
        self.alphabet = alphabet;
        self
    }

    pub fn with_matrix(mut self, matrix: MatrixSource) -> Self {
        self.matrix = Some(matrix);
        self
    }

    pub fn with_gap_open(mut self, gap_open: i32) -> Self {
        self.gap_open = gap_open;
        self
    }

    pub fn with_gap_extend(mut self, gap_extend: i32) -> Self {
        self.gap_extend = Some(gap_extend);
        self
    }

    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_mode(mut self, mode: AlignmentMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_matrices(mut self, keep: bool) -> Self {
        self.keep_matrices = keep;
        self
    }

    pub fn with_max_cells(mut self, max_cells: Option<usize>) -> Self {
        self.max_cells = max_cells;
        self
    }

    pub fn gap_model(&self) -> GapModel {
        GapModel::from_penalties(self.gap_open, self.gap_extend)
    }

    /// Rejects values that no alignment could use.
    pub fn validate(&self) -> Result<()> {
        if !(0..=MAX_SCORE_MAGNITUDE).contains(&self.gap_open) {
            return Err(invalid_value("gapopen", self.gap_open));
        }
        if let Some(extend) = self.gap_extend {
            if !(0..=MAX_SCORE_MAGNITUDE).contains(&extend) {
                return Err(invalid_value("gapextend", extend));
            }
        }
        if !self.scale.is_finite() || self.scale <= 0.0 {
            return Err(invalid_value("scale", self.scale));
        }
        Ok(())
    }

    /// Builds options from `(name, value)` string pairs.
    ///
    /// Names are case-insensitive and may be shortened to any unique prefix.
    /// Unset options keep their defaults.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut options = Self::default();
        for (name, value) in pairs {
            let value = value.as_ref().trim();
            match resolve_name(name.as_ref())? {
                "alphabet" => options.alphabet = value.parse()?,
                "scoringmatrix" => options.matrix = Some(MatrixSource::Named(value.to_string())),
                "gapopen" => options.gap_open = parse_number("gapopen", value)?,
                "gapextend" => options.gap_extend = Some(parse_number("gapextend", value)?),
                "scale" => options.scale = parse_number("scale", value)?,
                "mode" => options.mode = value.parse()?,
                "showmatrices" => options.keep_matrices = parse_flag("showmatrices", value)?,
                "maxcells" => {
                    options.max_cells = match value.to_ascii_lowercase().as_str() {
                        "none" | "off" | "unlimited" => None,
                        _ => Some(parse_number("maxcells", value)?),
                    }
                }
                _ => unreachable!("resolve_name only returns known names"),
            }
        }
        options.validate()?;
        Ok(options)
    }
}

/// Maps a possibly abbreviated option name onto its canonical spelling.
pub fn resolve_name(name: &str) -> Result<&'static str> {
    let wanted = name.trim().trim_start_matches('-').to_ascii_lowercase();
    if wanted.is_empty() {
        return Err(AlignerError::UnknownParameterName(name.to_string()));
    }
    if let Some(exact) = PARAMETER_NAMES.iter().find(|&&known| known == wanted) {
        return Ok(*exact);
    }
    let candidates: Vec<&'static str> = PARAMETER_NAMES
        .iter()
        .copied()
        .filter(|known| known.starts_with(&wanted))
        .collect();
    match candidates.as_slice() {
        [] => Err(AlignerError::UnknownParameterName(name.to_string())),
        [only] => Ok(*only),
        _ => Err(AlignerError::AmbiguousParameterName {
            name: name.to_string(),
            candidates: candidates.iter().map(|c| c.to_string()).collect(),
        }),
    }
}

fn invalid_value(name: &str, value: impl ToString) -> AlignerError {
    AlignerError::InvalidParameterValue {
        name: name.to_string(),
        value: value.to_string(),
    }
}

fn parse_number<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value.parse().map_err(|_| invalid_value(name, value))
}

fn parse_flag(name: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(invalid_value(name, value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = AlignOptions::default();
        assert_eq!(options.alphabet, Alphabet::AminoAcid);
        assert_eq!(options.gap_open, 8);
        assert_eq!(options.gap_model(), GapModel::Linear { gap: -8 });
        assert_eq!(options.mode, AlignmentMode::Global);
        assert!(options.matrix.is_none());
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let options = AlignOptions::new()
            .with_alphabet(Alphabet::Nucleotide)
            .with_gap_open(10)
            .with_gap_extend(1)
            .with_mode(AlignmentMode::Local)
            .with_max_cells(None);
        assert!(options.gap_model().is_affine());
        assert_eq!(options.max_cells, None);
    }

    #[test]
    fn test_from_pairs_accepts_prefixes() {
        let options = AlignOptions::from_pairs([
            ("Alpha", "nt"),
            ("gapo", "5"),
            ("GapE", "2"),
            ("mo", "glocal"),
            ("scoring", "nuc44"),
            ("sh", "yes"),
        ])
        .unwrap();
        assert_eq!(options.alphabet, Alphabet::Nucleotide);
        assert_eq!(options.gap_open, 5);
        assert_eq!(options.gap_extend, Some(2));
        assert_eq!(options.mode, AlignmentMode::SemiGlobal);
        assert_eq!(options.matrix, Some(MatrixSource::Named("nuc44".into())));
        assert!(options.keep_matrices);
    }

    #[test]
    fn test_unknown_parameter() {
        let err = AlignOptions::from_pairs([("bandwidth", "3")]).unwrap_err();
        assert!(matches!(err, AlignerError::UnknownParameterName(name) if name == "bandwidth"));
    }

    #[test]
    fn test_ambiguous_parameter() {
        match resolve_name("gap") {
            Err(AlignerError::AmbiguousParameterName { candidates, .. }) => {
                assert_eq!(candidates, vec!["gapopen", "gapextend"]);
            }
            other => panic!("expected ambiguity, got {:?}", other),
        }
        assert!(matches!(
            resolve_name("s"),
            Err(AlignerError::AmbiguousParameterName { .. })
        ));
        assert_eq!(resolve_name("--SCALE").unwrap(), "scale");
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            AlignOptions::from_pairs([("gapopen", "eight")]),
            Err(AlignerError::InvalidParameterValue { .. })
        ));
        assert!(matches!(
            AlignOptions::from_pairs([("scale", "0")]),
            Err(AlignerError::InvalidParameterValue { .. })
        ));
        assert!(matches!(
            AlignOptions::from_pairs([("gapopen", "-3")]),
            Err(AlignerError::InvalidParameterValue { .. })
        ));
        assert!(matches!(
            AlignOptions::from_pairs([("gapextend", "1500000000")]),
            Err(AlignerError::InvalidParameterValue { .. })
        ));
        assert!(AlignOptions::new()
            .with_gap_open(MAX_SCORE_MAGNITUDE + 1)
            .validate()
            .is_err());
        assert!(AlignOptions::new()
            .with_gap_open(MAX_SCORE_MAGNITUDE)
            .validate()
            .is_ok());
        let unlimited = AlignOptions::from_pairs([("maxcells", "none")]).unwrap();
        assert_eq!(unlimited.max_cells, None);
    }
}
