use anyhow::{Context, Result};
use dashmap::DashMap;
use log::{debug, info, warn};
use rayon::prelude::*;
use std::{
    io::Write,
    sync::atomic::{AtomicUsize, Ordering},
};

use crate::{
    cli::CountArgs,
    errors::AssemblerError,
    kmer::extract_kmers,
    utils::{get_output_writer, read_sequences, track_progress_and_resources},
};

fn merge_read_counts(sequence: &str, k: usize, kmer_counts: &DashMap<String, AtomicUsize>) {
    match extract_kmers(sequence, k) {
        Ok(counts) => {
            for (kmer, count) in counts {
                kmer_counts
                    .entry(kmer)
                    .or_insert_with(|| AtomicUsize::new(0))
                    .fetch_add(count, Ordering::Relaxed);
            }
        }
        // Reads shorter than k contribute nothing.
        Err(e) => debug!("Skipping read: {}", e),
    }
}

pub fn run_count(args: CountArgs) -> Result<()> {
    info!("Starting count command with args: {:?}", args);

    if args.kmer_size == 0 {
        return Err(AssemblerError::InvalidKmerSize(args.kmer_size).into());
    }
    let k = args.kmer_size;

    let kmer_counts: DashMap<String, AtomicUsize> = DashMap::new();
    let num_files = args.input_files.len() as u64;

    track_progress_and_resources("Counting k-mers from input files", num_files, |pb_files| {
        for input_path in &args.input_files {
            pb_files.set_message(format!("Processing: {}", input_path.to_string_lossy()));
            let reads = read_sequences(input_path)?;
            reads
                .par_iter()
                .for_each(|read| merge_read_counts(&read.sequence, k, &kmer_counts));
            info!(
                "Finished processing {} records from {:?}. Unique k-mers so far: {}",
                reads.len(),
                input_path,
                kmer_counts.len()
            );
            pb_files.inc(1);
        }
        Ok(())
    })?;

    if kmer_counts.is_empty() {
        warn!("No read was at least {} bases long; no k-mers counted", k);
    }

    let mut kmer_vec: Vec<(String, usize)> = kmer_counts
        .into_iter()
        .filter_map(|(kmer, count_atomic)| {
            let count = count_atomic.into_inner();
            (count >= args.min_count).then_some((kmer, count))
        })
        .collect();
    kmer_vec.sort_unstable_by(|a, b| a.0.cmp(&b.0));

    info!(
        "Writing {} k-mers (count >= {}) to output file...",
        kmer_vec.len(),
        args.min_count
    );
    let mut writer = get_output_writer(&args.output_file)?;
    for (kmer, count) in kmer_vec {
        writeln!(writer, "{}\t{}", kmer, count)
            .context("Failed to write k-mer count to output file")?;
    }

    writer.flush().context("Failed to flush output writer")?;
    info!("Successfully wrote k-mer counts to {:?}", args.output_file);

    Ok(())
}
