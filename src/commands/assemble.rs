use anyhow::{Context, Result};
use log::{info, warn};
use serde::Serialize;
use std::{io::Write, path::Path};

use crate::{
    cli::AssembleArgs,
    contig::{write_fasta, AssemblyStats, Contig, ContigExtractor},
    graph::{DeBruijnGraph, EdgeWeightPolicy},
    kmer::extract_kmers_parallel,
    utils::{get_output_writer, read_sequences, track_progress_and_resources},
};

#[derive(Serialize, Debug)]
struct AssemblyOutput {
    input_files: Vec<String>,
    kmer_size: usize,
    weight_policy: EdgeWeightPolicy,
    reads_used: usize,
    reads_skipped: usize,
    graph_nodes: usize,
    graph_edges: usize,
    min_length: usize,
    contigs_written: AssemblyStats,
}

#[derive(Debug, Default)]
struct IngestSummary {
    used: usize,
    skipped: usize,
}

/// Adds every read of one file to the graph. Reads too short for k are
/// skipped; a k-mer length conflict aborts the build.
fn ingest_file(path: &Path, k: usize, graph: &mut DeBruijnGraph) -> Result<IngestSummary> {
    let reads = read_sequences(path)?;
    let sequences: Vec<&str> = reads.iter().map(|r| r.sequence.as_str()).collect();
    let mut summary = IngestSummary::default();

    for (read, counts) in reads.iter().zip(extract_kmers_parallel(&sequences, k)) {
        match counts {
            Ok(counts) => {
                graph
                    .add_kmers(&counts)
                    .with_context(|| format!("Failed to add read '{}' to the graph", read.id))?;
                summary.used += 1;
            }
            Err(e) => {
                warn!("Skipping read '{}' from {:?}: {}", read.id, path, e);
                summary.skipped += 1;
            }
        }
    }
    info!(
        "Added {} reads from {:?} ({} skipped); graph is now {}",
        summary.used, path, summary.skipped, graph
    );
    Ok(summary)
}

fn write_summary_tsv(path: &Path, contigs: &[Contig]) -> Result<()> {
    let writer = get_output_writer(path)
        .with_context(|| format!("Failed to get output writer for TSV file: {:?}", path))?;
    let mut tsv_writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_writer(writer);

    tsv_writer.write_record(["ContigId", "Length", "Kmers", "Coverage", "Circular"])?;
    for contig in contigs {
        tsv_writer.write_record(&[
            contig.id.clone(),
            contig.len().to_string(),
            contig.kmer_count.to_string(),
            format!("{:.4}", contig.coverage),
            contig.circular.to_string(),
        ])?;
    }
    tsv_writer.flush()?;
    info!("Contig summary TSV written to {:?}", path);
    Ok(())
}

fn write_edges_tsv(path: &Path, graph: &DeBruijnGraph) -> Result<()> {
    let writer = get_output_writer(path)
        .with_context(|| format!("Failed to get output writer for TSV file: {:?}", path))?;
    let mut tsv_writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_writer(writer);

    tsv_writer.write_record(["Source", "Target", "Weight"])?;
    for (source, target, weight) in graph.edges() {
        tsv_writer.write_record([source, target, weight.to_string().as_str()])?;
    }
    tsv_writer.flush()?;
    info!("Edge list written to {:?}", path);
    Ok(())
}

pub fn run_assemble(args: AssembleArgs) -> Result<()> {
    info!("Starting assemble command with args: {:?}", args);

    let k = args.kmer_size;
    let mut graph = DeBruijnGraph::with_k(k)?.with_policy(args.weight_policy);
    let mut totals = IngestSummary::default();

    track_progress_and_resources(
        "Building de Bruijn graph",
        args.input_files.len() as u64,
        |pb_files| {
            for input_path in &args.input_files {
                pb_files.set_message(format!("Processing: {}", input_path.to_string_lossy()));
                let summary = ingest_file(input_path, k, &mut graph)?;
                totals.used += summary.used;
                totals.skipped += summary.skipped;
                pb_files.inc(1);
            }
            Ok(())
        },
    )?;
    info!("Finished building graph: {}", graph);

    if totals.used == 0 {
        warn!("No read was at least {} bases long; the assembly is empty", k);
    }

    let contigs = track_progress_and_resources("Simplifying graph", 1, |pb| {
        let contigs = ContigExtractor::new(&graph).extract();
        pb.inc(1);
        Ok(contigs)
    })?;
    let total_contigs = contigs.len();
    let contigs: Vec<Contig> = contigs
        .into_iter()
        .filter(|c| c.len() >= args.min_length)
        .collect();
    info!(
        "Extracted {} contigs, {} of at least {} bases",
        total_contigs,
        contigs.len(),
        args.min_length
    );

    let mut writer = get_output_writer(&args.output_file).with_context(|| {
        format!(
            "Failed to get output writer for contig file: {:?}",
            args.output_file
        )
    })?;
    write_fasta(&mut writer, &contigs)
        .with_context(|| format!("Failed to write contigs to {:?}", args.output_file))?;
    writer.flush().context("Failed to flush contig writer")?;
    info!("Successfully wrote contigs to {:?}", args.output_file);

    if let Some(stats_path) = &args.stats {
        let output = AssemblyOutput {
            input_files: args
                .input_files
                .iter()
                .map(|p| p.to_string_lossy().into_owned())
                .collect(),
            kmer_size: k,
            weight_policy: graph.policy(),
            reads_used: totals.used,
            reads_skipped: totals.skipped,
            graph_nodes: graph.count_nodes(),
            graph_edges: graph.count_edges(),
            min_length: args.min_length,
            contigs_written: AssemblyStats::from_contigs(&contigs),
        };
        let mut stats_writer = get_output_writer(stats_path)?;
        serde_json::to_writer_pretty(&mut stats_writer, &output)
            .with_context(|| format!("Failed to write assembly JSON to {:?}", stats_path))?;
        stats_writer
            .flush()
            .context("Failed to flush JSON output writer")?;
        info!("Assembly statistics written to {:?}", stats_path);
    }

    if let Some(tsv_path) = &args.summary_tsv {
        write_summary_tsv(tsv_path, &contigs)?;
    }
    if let Some(edges_path) = &args.edges_tsv {
        write_edges_tsv(edges_path, &graph)?;
    }

    Ok(())
}
