// This file makes items available to main.rs and integration tests.

pub mod cli;
pub mod commands;
pub mod contig;
pub mod errors;
pub mod graph;
pub mod kmer;
pub mod simplify;
pub mod utils;

pub use contig::{Contig, ContigExtractor};
pub use errors::AssemblerError;
pub use graph::{DeBruijnGraph, EdgeWeightPolicy, GraphNode};
pub use kmer::{extract_kmers, KmerCounts};
pub use simplify::Unitig;
