use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssemblerError {
    #[error("Invalid K-mer size: {0}. Must be at least 1.")]
    InvalidKmerSize(usize),

    #[error("Invalid length: cannot extract {k}-mers from a sequence of length {length}")]
    InvalidLength { k: usize, length: usize },

    #[error("Incompatible k-mer lengths: graph expects k={expected} but got a k-mer of length {actual}")]
    IncompatibleKmerLength { expected: usize, actual: usize },

    #[error("Invalid base '{0}': k-mers must be ASCII nucleotide codes")]
    NonAsciiBase(char),

    #[error("Failed to parse input file: {0}")]
    FileParsingError(String),
}
