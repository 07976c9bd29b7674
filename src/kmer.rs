// K-mer extraction logic

use rayon::prelude::*;
use std::collections::HashMap;

use crate::errors::AssemblerError;

/// The nucleotide alphabet, in the order neighbours are enumerated.
pub const BASES: [char; 4] = ['A', 'C', 'G', 'T'];

/// A mapping from k-mer to the number of times it was observed.
pub type KmerCounts = HashMap<String, usize>;

/// Upper-cases a sequence so that k-mers compare by bases alone.
#[inline]
pub fn normalize_sequence(sequence: &str) -> String {
    sequence.trim().to_ascii_uppercase()
}

/// Counts every length-`k` window (stride 1) of `sequence`.
///
/// The sequence is upper-cased before windows are taken, so `acg` and `ACG`
/// count towards the same k-mer.
/// Returns `NonAsciiBase` for a sequence with any non-ASCII character and
/// `InvalidLength` if `k` is 0 or longer than the sequence.
pub fn extract_kmers(sequence: &str, k: usize) -> Result<KmerCounts, AssemblerError> {
    let bases = normalize_sequence(sequence);
    check_ascii(&bases)?;
    if k == 0 || k > bases.len() {
        return Err(AssemblerError::InvalidLength {
            k,
            length: bases.len(),
        });
    }

    let mut counts = KmerCounts::new();
    for start in 0..=bases.len() - k {
        *counts.entry(bases[start..start + k].to_string()).or_insert(0) += 1;
    }
    Ok(counts)
}

/// Fails on the first non-ASCII character, so byte offsets are base offsets.
pub(crate) fn check_ascii(bases: &str) -> Result<(), AssemblerError> {
    match bases.chars().find(|c| !c.is_ascii()) {
        Some(c) => Err(AssemblerError::NonAsciiBase(c)),
        None => Ok(()),
    }
}

/// Runs [`extract_kmers`] over many reads at once.
///
/// Extraction is pure, so reads are processed on the rayon pool; the results
/// come back in input order, one per read.
pub fn extract_kmers_parallel<S>(
    reads: &[S],
    k: usize,
) -> Vec<Result<KmerCounts, AssemblerError>>
where
    S: AsRef<str> + Sync,
{
    reads
        .par_iter()
        .map(|read| extract_kmers(read.as_ref(), k))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_kmers_example_read() {
        let counts = extract_kmers("ACGTACG", 3).unwrap();
        assert_eq!(counts.len(), 4);
        assert_eq!(counts["ACG"], 2);
        assert_eq!(counts["CGT"], 1);
        assert_eq!(counts["GTA"], 1);
        assert_eq!(counts["TAC"], 1);
    }

    #[test]
    fn test_extract_kmers_sum_and_lengths() {
        let seqs = ["ACGTACGTACGT", "TTTTCCCCGGGGAAAA", "GATTACA", "A", "ATATATATAT"];
        for seq in seqs {
            for k in 1..=seq.len() {
                let counts = extract_kmers(seq, k).unwrap();
                let total: usize = counts.values().sum();
                assert_eq!(total, seq.len() - k + 1, "seq={} k={}", seq, k);
                assert!(counts.keys().all(|kmer| kmer.len() == k));
            }
        }
    }

    #[test]
    fn test_extract_kmers_case_insensitive() {
        let lower = extract_kmers("acgTacg", 3).unwrap();
        let upper = extract_kmers("ACGTACG", 3).unwrap();
        assert_eq!(lower, upper);
    }

    #[test]
    fn test_extract_kmers_whole_sequence() {
        let counts = extract_kmers("GATTACA", 7).unwrap();
        assert_eq!(counts.len(), 1);
        assert_eq!(counts["GATTACA"], 1);
    }

    #[test]
    fn test_extract_kmers_invalid_k() {
        assert_eq!(
            extract_kmers("ACGT", 0),
            Err(AssemblerError::InvalidLength { k: 0, length: 4 })
        );
        assert_eq!(
            extract_kmers("ACGT", 5),
            Err(AssemblerError::InvalidLength { k: 5, length: 4 })
        );
        assert!(extract_kmers("", 1).is_err());
    }

    #[test]
    fn test_extract_kmers_rejects_non_ascii() {
        assert_eq!(extract_kmers("é", 1), Err(AssemblerError::NonAsciiBase('é')));
        // Two bytes of 'é' plus 'A' would make a single three-byte window.
        assert_eq!(extract_kmers("éA", 3), Err(AssemblerError::NonAsciiBase('é')));
        assert_eq!(
            extract_kmers("ACGTÅCGT", 2),
            Err(AssemblerError::NonAsciiBase('Å'))
        );
    }

    #[test]
    fn test_extract_kmers_parallel_keeps_order() {
        let reads = vec!["ACGTACG".to_string(), "AC".to_string(), "TTTT".to_string()];
        let results = extract_kmers_parallel(&reads, 3);
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap()["ACG"], 2);
        assert_eq!(
            results[1],
            Err(AssemblerError::InvalidLength { k: 3, length: 2 })
        );
        assert_eq!(results[2].as_ref().unwrap()["TTT"], 2);
    }
}
