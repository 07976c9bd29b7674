// Chain compaction over a finished graph

use log::debug;
use std::collections::HashSet;

use crate::graph::{DeBruijnGraph, GraphNode};

/// A maximal non-branching path through the graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unitig {
    /// The k-mers on the path, in walk order. A circular unitig lists each
    /// k-mer once and does not repeat its start.
    pub kmers: Vec<String>,
    /// The spelled sequence: the first k-mer plus one base per edge walked.
    pub sequence: String,
    /// True when the path is a closed cycle with no branch point.
    pub circular: bool,
}

impl Unitig {
    fn start(node: &GraphNode) -> Self {
        Unitig {
            kmers: vec![node.sequence().to_string()],
            sequence: node.sequence().to_string(),
            circular: false,
        }
    }

    fn extend(&mut self, node: &GraphNode) {
        self.kmers.push(node.sequence().to_string());
        self.push_last_base(node);
    }

    fn close(&mut self, start: &GraphNode) {
        self.push_last_base(start);
        self.circular = true;
    }

    fn push_last_base(&mut self, node: &GraphNode) {
        if let Some(base) = node.sequence().chars().last() {
            self.sequence.push(base);
        }
    }

    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }
}

impl DeBruijnGraph {
    /// Compacts every maximal chain of the graph into a unitig.
    ///
    /// Chains are started from branch points and sources in lexicographic
    /// order; nodes left over afterwards sit on isolated cycles and are each
    /// emitted once as a circular unitig. Every node ends up in exactly one
    /// unitig. The graph itself is not modified, so repeated calls return the
    /// same result.
    pub fn simplify(&self) -> Vec<Unitig> {
        let mut visited: HashSet<&str> = HashSet::with_capacity(self.count_nodes());
        let mut unitigs = Vec::new();

        for node in self.nodes() {
            if self.is_chain_start(node) && !visited.contains(node.sequence()) {
                unitigs.push(self.walk_chain(node, &mut visited));
            }
        }
        let linear = unitigs.len();

        for node in self.nodes() {
            if !visited.contains(node.sequence()) {
                unitigs.push(self.walk_cycle(node, &mut visited));
            }
        }

        debug!(
            "Compacted {} nodes into {} unitigs ({} circular)",
            self.count_nodes(),
            unitigs.len(),
            unitigs.len() - linear
        );
        unitigs
    }

    /// A chain starts wherever the walk from the predecessor side cannot
    /// reach: no unique predecessor, or a predecessor that branches.
    /// Only the predecessor's out-degree matters, not [`GraphNode::is_simple`]:
    /// a predecessor with a single successor walks on into this node whatever
    /// its own in-degree.
    fn is_chain_start(&self, node: &GraphNode) -> bool {
        match node.sole_predecessor().and_then(|pred| self.node(pred)) {
            Some(pred) => pred.out_degree() != 1,
            None => true,
        }
    }

    /// The node a chain continues into from `node`, if the step is unambiguous.
    fn extension(&self, node: &GraphNode) -> Option<&GraphNode> {
        let next = self.node(node.sole_successor()?)?;
        (next.in_degree() == 1).then_some(next)
    }

    fn walk_chain<'a>(&'a self, start: &'a GraphNode, visited: &mut HashSet<&'a str>) -> Unitig {
        let mut unitig = Unitig::start(start);
        visited.insert(start.sequence());

        let mut current = start;
        while let Some(next) = self.extension(current) {
            if !visited.insert(next.sequence()) {
                break;
            }
            unitig.extend(next);
            current = next;
        }
        unitig
    }

    fn walk_cycle<'a>(&'a self, start: &'a GraphNode, visited: &mut HashSet<&'a str>) -> Unitig {
        let mut unitig = Unitig::start(start);
        visited.insert(start.sequence());

        let mut current = start;
        while let Some(next) = self.extension(current) {
            if next.sequence() == start.sequence() {
                unitig.close(start);
                break;
            }
            if !visited.insert(next.sequence()) {
                break;
            }
            unitig.extend(next);
            current = next;
        }
        unitig
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kmer::{extract_kmers, KmerCounts};

    fn graph_from_reads(reads: &[&str], k: usize) -> DeBruijnGraph {
        let mut graph = DeBruijnGraph::new();
        for read in reads {
            graph.add_kmers(&extract_kmers(read, k).unwrap()).unwrap();
        }
        graph
    }

    fn sequences(unitigs: &[Unitig]) -> Vec<&str> {
        unitigs.iter().map(|u| u.sequence.as_str()).collect()
    }

    #[test]
    fn test_empty_graph_has_no_unitigs() {
        assert!(DeBruijnGraph::new().simplify().is_empty());
    }

    #[test]
    fn test_linear_read_is_one_unitig() {
        let graph = graph_from_reads(&["GATTACA"], 3);
        let unitigs = graph.simplify();
        assert_eq!(sequences(&unitigs), ["GATTACA"]);
        assert!(!unitigs[0].circular);
        assert_eq!(unitigs[0].kmers, ["GAT", "ATT", "TTA", "TAC", "ACA"]);
    }

    #[test]
    fn test_example_read_closes_cycle() {
        let graph = graph_from_reads(&["ACGTACG"], 3);
        let unitigs = graph.simplify();
        assert_eq!(sequences(&unitigs), ["ACGTACG"]);
        assert!(unitigs[0].circular);
        assert_eq!(unitigs[0].kmers.len(), 4);
    }

    #[test]
    fn test_repeat_gives_single_circular_unitig() {
        let graph = graph_from_reads(&["ATATATATAT"], 2);
        let unitigs = graph.simplify();
        assert_eq!(unitigs.len(), 1);
        assert!(unitigs[0].circular);
        assert_eq!(unitigs[0].sequence, "ATAT");
    }

    #[test]
    fn test_isolated_node() {
        let mut graph = DeBruijnGraph::new();
        let counts: KmerCounts = [("ACG".to_string(), 1)].into_iter().collect();
        graph.add_kmers(&counts).unwrap();
        let unitigs = graph.simplify();
        assert_eq!(sequences(&unitigs), ["ACG"]);
        assert!(!unitigs[0].circular);
    }

    #[test]
    fn test_self_loop_is_circular() {
        let graph = graph_from_reads(&["AAAA"], 3);
        let unitigs = graph.simplify();
        assert_eq!(sequences(&unitigs), ["AAAA"]);
        assert!(unitigs[0].circular);
    }

    #[test]
    fn test_branch_stops_chain() {
        let graph = graph_from_reads(&["AACGT", "AACGA"], 3);
        assert_eq!(graph.node("ACG").unwrap().out_degree(), 2);
        let unitigs = graph.simplify();
        assert_eq!(sequences(&unitigs), ["AACG", "CGA", "CGT"]);
    }

    #[test]
    fn test_merge_starts_chain() {
        let graph = graph_from_reads(&["AACGT", "TACGT"], 3);
        assert_eq!(graph.node("ACG").unwrap().in_degree(), 2);
        let unitigs = graph.simplify();
        assert_eq!(sequences(&unitigs), ["AAC", "ACGT", "TAC"]);
    }

    #[test]
    fn test_cycle_with_entry_tail() {
        // CATG is entered from both TCAT and GCAT, so the tail stops before it
        // and the loop is walked as a linear chain from CATG.
        let graph = graph_from_reads(&["TTCATGCAT"], 4);
        assert_eq!(graph.node("CATG").unwrap().in_degree(), 2);
        let unitigs = graph.simplify();
        assert_eq!(sequences(&unitigs), ["CATGCAT", "TTCAT"]);
        assert!(unitigs.iter().all(|u| !u.circular));
    }

    #[test]
    fn test_disjoint_cycles_and_linear_component() {
        let graph = graph_from_reads(&["AACTG", "ATATA", "CCGCCG"], 3);
        let unitigs = graph.simplify();
        assert_eq!(sequences(&unitigs), ["AACTG", "ATATA", "CCGCCG"]);
        let circular: Vec<bool> = unitigs.iter().map(|u| u.circular).collect();
        assert_eq!(circular, [false, true, true]);
    }

    #[test]
    fn test_every_node_used_once() {
        let graph = graph_from_reads(&["ACGTTGCATGCA", "TTGCATGGA", "GGATCCA"], 4);
        let unitigs = graph.simplify();
        let mut used: Vec<&str> = unitigs
            .iter()
            .flat_map(|u| u.kmers.iter().map(String::as_str))
            .collect();
        used.sort_unstable();
        let all: Vec<&str> = graph.nodes().map(|n| n.sequence()).collect();
        assert_eq!(used, all);
    }

    #[test]
    fn test_simplify_is_idempotent() {
        let graph = graph_from_reads(&["AACGTACGTTA", "CGTAGG"], 3);
        assert_eq!(graph.simplify(), graph.simplify());
    }
}
