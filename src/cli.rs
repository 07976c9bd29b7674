use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::graph::EdgeWeightPolicy;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
#[clap(propagate_version = true)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,

    #[clap(
        short,
        long,
        global = true,
        default_value_t = 0,
        help = "Number of threads to use (0 for all logical cores)"
    )]
    pub threads: usize,

    #[clap(short, long, global = true, action = clap::ArgAction::Count, help = "Verbosity level (e.g., -v, -vv)")]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Count k-mers in FASTA/FASTQ files
    Count(CountArgs),
    /// Assemble reads into contigs through a de Bruijn graph
    Assemble(AssembleArgs),
}

#[derive(Parser, Debug)]
pub struct CountArgs {
    #[clap(short, long, required = true, help = "The length of the k-mer")]
    pub kmer_size: usize,

    #[clap(short, long, required = true, num_args = 1.., help = "One or more input FASTA/FASTQ files. Supports .gz, .xz, .zst compression.")]
    pub input_files: Vec<PathBuf>,

    #[clap(
        short,
        long,
        required = true,
        help = "Output file for k-mer counts (kmer<TAB>count). Supports .gz, .xz, .zst compression based on extension."
    )]
    pub output_file: PathBuf,

    #[clap(
        short = 'm',
        long,
        default_value_t = 1,
        help = "Minimum count to report a k-mer"
    )]
    pub min_count: usize,
}

#[derive(Parser, Debug)]
pub struct AssembleArgs {
    #[clap(short, long, required = true, help = "The length of the k-mer")]
    pub kmer_size: usize,

    #[clap(short, long, required = true, num_args = 1.., help = "One or more input read files (FASTA/FASTQ). Supports .gz, .xz, .zst compression.")]
    pub input_files: Vec<PathBuf>,

    #[clap(
        short,
        long,
        required = true,
        help = "Output FASTA file for the contigs. Supports .gz, .xz, .zst compression based on extension."
    )]
    pub output_file: PathBuf,

    #[clap(
        short = 'w',
        long,
        value_enum,
        default_value_t = EdgeWeightPolicy::Cumulative,
        help = "How repeated observations of an edge are combined into its weight"
    )]
    pub weight_policy: EdgeWeightPolicy,

    #[clap(
        long,
        default_value_t = 0,
        help = "Only write contigs of at least this many bases"
    )]
    pub min_length: usize,

    #[clap(long, help = "Optional: Output file path for assembly statistics (JSON format).")]
    pub stats: Option<PathBuf>,

    #[clap(
        long,
        help = "Optional: Output file path for a per-contig TSV summary. Supports .gz, .xz, .zst compression based on extension."
    )]
    pub summary_tsv: Option<PathBuf>,

    #[clap(
        long,
        help = "Optional: Output file path for the graph's edge list (source<TAB>target<TAB>weight)."
    )]
    pub edges_tsv: Option<PathBuf>,
}

pub fn parse_cli() -> Cli {
    Cli::parse()
}
