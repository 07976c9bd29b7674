// Contig emission and formatting

use serde::Serialize;
use std::io::{self, Write};

use crate::{graph::DeBruijnGraph, simplify::Unitig};

/// One assembled sequence, ready for output.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Contig {
    pub id: String,
    pub sequence: String,
    /// Number of graph nodes compacted into this contig.
    pub kmer_count: usize,
    /// Mean multiplicity of the contig's k-mers.
    pub coverage: f64,
    pub circular: bool,
}

impl Contig {
    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }
}

/// Turns the unitigs of a graph into named contigs.
pub struct ContigExtractor<'a> {
    graph: &'a DeBruijnGraph,
    prefix: String,
}

impl<'a> ContigExtractor<'a> {
    pub fn new(graph: &'a DeBruijnGraph) -> Self {
        ContigExtractor {
            graph,
            prefix: "contig".to_string(),
        }
    }

    /// Identifiers become `<prefix>_1`, `<prefix>_2`, ...
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Simplifies the graph and returns one contig per unitig, numbered in
    /// the order the unitigs were discovered.
    pub fn extract(&self) -> Vec<Contig> {
        self.graph
            .simplify()
            .into_iter()
            .enumerate()
            .map(|(i, unitig)| self.to_contig(i + 1, unitig))
            .collect()
    }

    fn to_contig(&self, number: usize, unitig: Unitig) -> Contig {
        let total: usize = unitig
            .kmers
            .iter()
            .filter_map(|kmer| self.graph.node(kmer))
            .map(|node| node.count())
            .sum();
        let coverage = if unitig.kmers.is_empty() {
            0.0
        } else {
            total as f64 / unitig.kmers.len() as f64
        };
        Contig {
            id: format!("{}_{}", self.prefix, number),
            kmer_count: unitig.kmers.len(),
            sequence: unitig.sequence,
            coverage,
            circular: unitig.circular,
        }
    }
}

/// Writes contigs as FASTA: a `>id` header line followed by the unwrapped
/// sequence.
pub fn write_fasta<W: Write>(writer: &mut W, contigs: &[Contig]) -> io::Result<()> {
    for contig in contigs {
        writeln!(writer, ">{}", contig.id)?;
        writeln!(writer, "{}", contig.sequence)?;
    }
    Ok(())
}

/// FASTA text for `contigs`, written through [`write_fasta`].
pub fn to_fasta(contigs: &[Contig]) -> String {
    let mut buf = Vec::new();
    // Writes into a Vec cannot fail.
    if write_fasta(&mut buf, contigs).is_err() {
        return String::new();
    }
    String::from_utf8_lossy(&buf).into_owned()
}

/// Summary numbers for a set of contigs.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct AssemblyStats {
    pub num_contigs: usize,
    pub circular_contigs: usize,
    pub total_length: usize,
    pub longest_contig: usize,
    pub shortest_contig: usize,
    pub n50: usize,
    pub mean_coverage: f64,
}

impl AssemblyStats {
    pub fn from_contigs(contigs: &[Contig]) -> Self {
        let mut lengths: Vec<usize> = contigs.iter().map(Contig::len).collect();
        lengths.sort_unstable_by(|a, b| b.cmp(a));
        let total_length: usize = lengths.iter().sum();

        let mut running = 0;
        let mut n50 = 0;
        for &len in &lengths {
            running += len;
            if running * 2 >= total_length {
                n50 = len;
                break;
            }
        }

        let total_kmers: usize = contigs.iter().map(|c| c.kmer_count).sum();
        let weighted: f64 = contigs
            .iter()
            .map(|c| c.coverage * c.kmer_count as f64)
            .sum();

        AssemblyStats {
            num_contigs: contigs.len(),
            circular_contigs: contigs.iter().filter(|c| c.circular).count(),
            total_length,
            longest_contig: lengths.first().copied().unwrap_or(0),
            shortest_contig: lengths.last().copied().unwrap_or(0),
            n50,
            mean_coverage: if total_kmers == 0 {
                0.0
            } else {
                weighted / total_kmers as f64
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kmer::extract_kmers;

    fn contig(id: &str, sequence: &str) -> Contig {
        Contig {
            id: id.to_string(),
            sequence: sequence.to_string(),
            kmer_count: 1,
            coverage: 1.0,
            circular: false,
        }
    }

    #[test]
    fn test_extract_example_read() {
        let mut graph = DeBruijnGraph::new();
        graph.add_kmers(&extract_kmers("ACGTACG", 3).unwrap()).unwrap();
        let contigs = ContigExtractor::new(&graph).extract();
        assert_eq!(contigs.len(), 1);
        assert_eq!(contigs[0].id, "contig_1");
        assert_eq!(contigs[0].sequence, "ACGTACG");
        assert_eq!(contigs[0].len(), 7);
        assert_eq!(contigs[0].kmer_count, 4);
        // ACG:2, CGT:1, GTA:1, TAC:1
        assert!((contigs[0].coverage - 1.25).abs() < 1e-9);
        assert!(contigs[0].circular);
    }

    #[test]
    fn test_extract_numbers_in_discovery_order() {
        let mut graph = DeBruijnGraph::new();
        for read in ["AACGT", "AACGA"] {
            graph.add_kmers(&extract_kmers(read, 3).unwrap()).unwrap();
        }
        let contigs = ContigExtractor::new(&graph).with_prefix("unitig").extract();
        let ids: Vec<&str> = contigs.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, ["unitig_1", "unitig_2", "unitig_3"]);
        assert_eq!(contigs[0].sequence, "AACG");
        assert!((contigs[0].coverage - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_extract_is_idempotent() {
        let mut graph = DeBruijnGraph::new();
        graph.add_kmers(&extract_kmers("TTGACCATGGA", 4).unwrap()).unwrap();
        let extractor = ContigExtractor::new(&graph);
        assert_eq!(extractor.extract(), extractor.extract());
    }

    #[test]
    fn test_fasta_output() {
        let contigs = vec![contig("contig_1", "ACGT"), contig("contig_2", "GG")];
        let mut buf = Vec::new();
        write_fasta(&mut buf, &contigs).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text, ">contig_1\nACGT\n>contig_2\nGG\n");
        assert_eq!(to_fasta(&contigs), text);
        assert_eq!(to_fasta(&[]), "");
    }

    #[test]
    fn test_stats() {
        let contigs = vec![
            contig("a", "AAAAAAAAAA"),
            contig("b", "CCCCCC"),
            contig("c", "GGGG"),
            contig("d", "TT"),
        ];
        let stats = AssemblyStats::from_contigs(&contigs);
        assert_eq!(stats.num_contigs, 4);
        assert_eq!(stats.total_length, 22);
        assert_eq!(stats.longest_contig, 10);
        assert_eq!(stats.shortest_contig, 2);
        // 10 < 11, 10 + 6 >= 11
        assert_eq!(stats.n50, 6);
        assert_eq!(stats.circular_contigs, 0);
    }

    #[test]
    fn test_stats_empty() {
        let stats = AssemblyStats::from_contigs(&[]);
        assert_eq!(stats.num_contigs, 0);
        assert_eq!(stats.n50, 0);
        assert_eq!(stats.mean_coverage, 0.0);
    }
}
