//! Sequences, alphabets and integer symbol encoding.
//!
//! Symbols are encoded into small integer codes that index the scoring
//! matrix directly. Each alphabet reserves a wildcard code for ambiguous
//! residues. The gap marker is output-only and never a valid input symbol.

use std::fmt;
use std::str::FromStr;

use log::warn;

use crate::{AlignerError, Result};

const AMINO_SYMBOLS: &[u8] = b"ARNDCQEGHILKMFPSTWYVBZX*";
const NUCLEOTIDE_SYMBOLS: &[u8] = b"ACGTRYKMSWBDHVN";

pub const GAP_SYMBOL: u8 = b'-';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Alphabet {
    #[default]
    AminoAcid,
    Nucleotide,
}

impl Alphabet {
    /// Residue symbols in code order.
    pub fn symbols(self) -> &'static [u8] {
        match self {
            Alphabet::AminoAcid => AMINO_SYMBOLS,
            Alphabet::Nucleotide => NUCLEOTIDE_SYMBOLS,
        }
    }

    /// Code of the "any residue" symbol (`X` or `N`).
    pub fn wildcard(self) -> u8 {
        match self {
            Alphabet::AminoAcid => 22,
            Alphabet::Nucleotide => 14,
        }
    }

    /// Case-insensitive lookup of a symbol's code.
    pub fn code(self, symbol: u8) -> Option<u8> {
        let upper = symbol.to_ascii_uppercase();
        if self == Alphabet::Nucleotide && upper == b'U' {
            return Some(3);
        }
        self.symbols()
            .iter()
            .position(|&s| s == upper)
            .map(|idx| idx as u8)
    }

    pub fn symbol(self, code: u8) -> Option<u8> {
        self.symbols().get(code as usize).copied()
    }

    fn invalid_symbol(self, sequence: usize, position: usize, symbol: u8) -> AlignerError {
        let symbol = symbol as char;
        match self {
            Alphabet::AminoAcid => AlignerError::InvalidAminoAcidSequences {
                sequence,
                position,
                symbol,
            },
            Alphabet::Nucleotide => AlignerError::InvalidNucleotideSequences {
                sequence,
                position,
                symbol,
            },
        }
    }
}

impl fmt::Display for Alphabet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Alphabet::AminoAcid => f.write_str("amino acid"),
            Alphabet::Nucleotide => f.write_str("nucleotide"),
        }
    }
}

impl FromStr for Alphabet {
    type Err = AlignerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "aa" | "amino" | "aminoacid" | "amino-acid" | "protein" => Ok(Alphabet::AminoAcid),
            "nt" | "nucleotide" | "dna" | "rna" => Ok(Alphabet::Nucleotide),
            _ => Err(AlignerError::InvalidParameterValue {
                name: "alphabet".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// An immutable run of residues, uppercased on construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sequence {
    data: Vec<u8>,
}

impl Sequence {
    pub fn new(data: &[u8]) -> Self {
        Self {
            data: data.to_ascii_uppercase(),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Sliding windows of length `k`, paired with their 0-based offsets.
    pub fn kmers(&self, k: usize) -> Kmers<'_> {
        Kmers {
            data: &self.data,
            k,
            offset: 0,
        }
    }
}

impl From<&str> for Sequence {
    fn from(s: &str) -> Self {
        Sequence::new(s.as_bytes())
    }
}

impl fmt::Display for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.data))
    }
}

/// Lazy k-mer iterator. Cloning restarts from the clone's position.
#[derive(Debug, Clone)]
pub struct Kmers<'a> {
    data: &'a [u8],
    k: usize,
    offset: usize,
}

impl<'a> Iterator for Kmers<'a> {
    type Item = (usize, &'a [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        if self.k == 0 || self.offset + self.k > self.data.len() {
            return None;
        }
        let start = self.offset;
        self.offset += 1;
        Some((start, &self.data[start..start + self.k]))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = if self.k == 0 || self.offset + self.k > self.data.len() {
            0
        } else {
            self.data.len() - self.k - self.offset + 1
        };
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Kmers<'_> {}

/// Integer codes for one input sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedSequence {
    /// Codes as read from the input.
    codes: Vec<u8>,
    /// Codes fed to the DP, with out-of-bound codes remapped to the wildcard.
    scoring: Vec<u8>,
}

impl EncodedSequence {
    /// Encodes `seq`, which is sequence number `which` (1 or 2) of the pair.
    pub fn encode(seq: &Sequence, alphabet: Alphabet, which: usize) -> Result<Self> {
        if seq.is_empty() {
            return Err(AlignerError::InvalidLengthSequences);
        }
        let codes = seq
            .as_bytes()
            .iter()
            .enumerate()
            .map(|(pos, &symbol)| {
                alphabet
                    .code(symbol)
                    .ok_or_else(|| alphabet.invalid_symbol(which, pos + 1, symbol))
            })
            .collect::<Result<Vec<u8>>>()?;
        Ok(Self {
            scoring: codes.clone(),
            codes,
        })
    }

    /// Remaps every code the scoring matrix cannot index onto the wildcard.
    ///
    /// Returns the number of remapped positions.
    pub fn fit_to_matrix(
        &mut self,
        matrix_size: usize,
        alphabet: Alphabet,
        which: usize,
    ) -> Result<usize> {
        let wildcard = alphabet.wildcard();
        let mut remapped = 0;
        for (pos, code) in self.scoring.iter_mut().enumerate() {
            if (*code as usize) < matrix_size {
                continue;
            }
            if (wildcard as usize) >= matrix_size {
                let symbol = alphabet.symbol(*code).unwrap_or(b'?') as char;
                return Err(AlignerError::InvalidSymbolsInInputSequences {
                    sequence: which,
                    position: pos + 1,
                    symbol,
                    size: matrix_size,
                });
            }
            *code = wildcard;
            remapped += 1;
        }
        if remapped > 0 {
            warn!(
                "sequence {}: {} symbol(s) outside the {}x{} scoring matrix scored as wildcard",
                which, remapped, matrix_size, matrix_size
            );
        }
        Ok(remapped)
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    pub fn codes(&self) -> &[u8] {
        &self.codes
    }

    pub fn scoring_codes(&self) -> &[u8] {
        &self.scoring
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alphabet_codes() {
        assert_eq!(Alphabet::AminoAcid.code(b'A'), Some(0));
        assert_eq!(Alphabet::AminoAcid.code(b'v'), Some(19));
        assert_eq!(Alphabet::AminoAcid.code(b'*'), Some(23));
        assert_eq!(Alphabet::AminoAcid.code(b'-'), None);
        assert_eq!(Alphabet::AminoAcid.code(b'J'), None);

        assert_eq!(Alphabet::Nucleotide.code(b'g'), Some(2));
        assert_eq!(Alphabet::Nucleotide.code(b'U'), Some(3));
        assert_eq!(Alphabet::Nucleotide.code(b'N'), Some(14));
        assert_eq!(Alphabet::Nucleotide.code(b'-'), None);
        assert_eq!(Alphabet::Nucleotide.code(b'E'), None);
    }

    #[test]
    fn test_symbol_roundtrip_for_wildcards() {
        assert_eq!(Alphabet::AminoAcid.symbol(Alphabet::AminoAcid.wildcard()), Some(b'X'));
        assert_eq!(Alphabet::Nucleotide.symbol(Alphabet::Nucleotide.wildcard()), Some(b'N'));
        assert_eq!(Alphabet::Nucleotide.symbol(14), Some(b'N'));
        assert_eq!(Alphabet::Nucleotide.symbol(15), None);
    }

    #[test]
    fn test_sequence_uppercases() {
        let seq = Sequence::new(b"acgT");
        assert_eq!(seq.as_bytes(), b"ACGT");
        assert_eq!(seq.to_string(), "ACGT");
    }

    #[test]
    fn test_encode_rejects_empty() {
        let seq = Sequence::new(b"");
        assert!(matches!(
            EncodedSequence::encode(&seq, Alphabet::Nucleotide, 1),
            Err(AlignerError::InvalidLengthSequences)
        ));
    }

    #[test]
    fn test_encode_reports_bad_symbol() {
        let seq = Sequence::new(b"ACGXT");
        match EncodedSequence::encode(&seq, Alphabet::Nucleotide, 2) {
            Err(AlignerError::InvalidNucleotideSequences {
                sequence,
                position,
                symbol,
            }) => {
                assert_eq!(sequence, 2);
                assert_eq!(position, 4);
                assert_eq!(symbol, 'X');
            }
            other => panic!("unexpected result: {:?}", other),
        }

        let protein = Sequence::new(b"MKJ");
        assert!(matches!(
            EncodedSequence::encode(&protein, Alphabet::AminoAcid, 1),
            Err(AlignerError::InvalidAminoAcidSequences { position: 3, .. })
        ));
    }

    #[test]
    fn test_encode_rejects_gap_marker() {
        let seq = Sequence::new(b"AC-T");
        assert!(matches!(
            EncodedSequence::encode(&seq, Alphabet::Nucleotide, 1),
            Err(AlignerError::InvalidNucleotideSequences {
                sequence: 1,
                position: 3,
                symbol: '-',
            })
        ));
        let protein = Sequence::new(b"-MK");
        assert!(matches!(
            EncodedSequence::encode(&protein, Alphabet::AminoAcid, 2),
            Err(AlignerError::InvalidAminoAcidSequences { position: 1, .. })
        ));
    }

    #[test]
    fn test_fit_to_matrix_remaps_to_wildcard() {
        let seq = Sequence::new(b"AC*W");
        let mut encoded = EncodedSequence::encode(&seq, Alphabet::AminoAcid, 1).unwrap();
        let remapped = encoded.fit_to_matrix(23, Alphabet::AminoAcid, 1).unwrap();
        assert_eq!(remapped, 1);
        assert_eq!(encoded.codes(), &[0, 4, 23, 17]);
        assert_eq!(encoded.scoring_codes(), &[0, 4, 22, 17]);
    }

    #[test]
    fn test_fit_to_matrix_without_wildcard_fails() {
        let seq = Sequence::new(b"ACRT");
        let mut encoded = EncodedSequence::encode(&seq, Alphabet::Nucleotide, 1).unwrap();
        assert!(matches!(
            encoded.fit_to_matrix(4, Alphabet::Nucleotide, 1),
            Err(AlignerError::InvalidSymbolsInInputSequences {
                position: 3,
                symbol: 'R',
                size: 4,
                ..
            })
        ));
    }

    #[test]
    fn test_kmers_are_lazy_and_restartable() {
        let seq = Sequence::new(b"ACGTA");
        let kmers = seq.kmers(3);
        assert_eq!(kmers.len(), 3);

        let first: Vec<_> = kmers.clone().collect();
        let second: Vec<_> = kmers.collect();
        assert_eq!(first, second);
        assert_eq!(
            first,
            vec![(0, &b"ACG"[..]), (1, &b"CGT"[..]), (2, &b"GTA"[..])]
        );
    }

    #[test]
    fn test_kmers_degenerate_sizes() {
        let seq = Sequence::new(b"ACG");
        assert_eq!(seq.kmers(0).count(), 0);
        assert_eq!(seq.kmers(4).count(), 0);
        assert_eq!(seq.kmers(3).count(), 1);
    }
}
