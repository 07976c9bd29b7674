use anyhow::{Context, Result};
use flate2::{read::MultiGzDecoder, write::GzEncoder, Compression as GzCompression};
use log::{debug, info};
use needletail::{parse_fastx_reader, Sequence};
use std::{
    fs::File,
    io::{BufRead, BufReader, BufWriter, Write},
    path::Path,
};
use xz2::{read::XzDecoder, write::XzEncoder};
use zstd::{stream::read::Decoder as ZstdDecoder, stream::write::Encoder as ZstdEncoder};

use crate::errors::AssemblerError;

/// Determines the number of threads to use.
/// If `cli_threads` is 0, it uses all available logical cores.
/// Otherwise, it uses the number specified in `cli_threads`.
pub fn get_num_threads(cli_threads: usize) -> usize {
    let num_threads = if cli_threads == 0 {
        num_cpus::get()
    } else {
        cli_threads
    };
    debug!("Using {} threads for processing.", num_threads);
    num_threads
}

/// Initializes the Rayon global thread pool with the specified number of threads.
pub fn initialize_rayon_pool(num_threads: usize) -> Result<()> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build_global()?;
    Ok(())
}

/// A sequencing read as handed to the assembler core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Read {
    pub id: String,
    /// Upper-cased bases; multi-line FASTA records are joined.
    pub sequence: String,
}

/// Reads every record of a FASTA/FASTQ file (optionally compressed).
pub fn read_sequences(path: &Path) -> Result<Vec<Read>> {
    let input = get_input_reader(path)?;
    let mut reader = parse_fastx_reader(input)
        .with_context(|| format!("Failed to open or parse file: {:?}", path))?;

    let mut reads = Vec::new();
    while let Some(record) = reader.next() {
        let record = record.with_context(|| format!("Error reading record from {:?}", path))?;
        let norm_seq = record.normalize(false);
        reads.push(Read {
            id: String::from_utf8_lossy(record.id()).into_owned(),
            sequence: String::from_utf8_lossy(&norm_seq).into_owned(),
        });
        if reads.len() % 100_000 == 0 {
            debug!("Read {} records from {:?}", reads.len(), path);
        }
    }

    if reads.is_empty() {
        return Err(AssemblerError::FileParsingError(format!("no records in {:?}", path)).into());
    }
    info!("Read {} records from {:?}", reads.len(), path);
    Ok(reads)
}

use indicatif::{ProgressBar, ProgressStyle};
use psutil::process::Process;
use std::time::Instant;

/// Wraps a function to provide progress tracking, execution time, and max RAM usage.
pub fn track_progress_and_resources<F, R>(
    task_description: &str,
    total_items: u64,
    func: F,
) -> Result<R>
where
    F: FnOnce(&ProgressBar) -> Result<R>,
{
    info!("Starting task: {}", task_description);
    let start_time = Instant::now();

    let pb = ProgressBar::new(total_items);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}",
            )
            .unwrap_or_else(|e| {
                debug!("Error setting progress bar style: {}", e);
                ProgressStyle::default_bar()
            })
            .progress_chars("#>-"),
    );

    let result = func(&pb);

    pb.finish_with_message(format!("{} completed.", task_description));

    let duration = start_time.elapsed();
    info!("Task '{}' finished in {:.2?}", task_description, duration);

    match Process::current() {
        Ok(process) => match process.memory_info() {
            Ok(mem_info) => {
                info!(
                    "Max RAM usage for task '{}': {} MB",
                    task_description,
                    mem_info.rss() / 1024 / 1024
                );
            }
            Err(e) => {
                debug!("Failed to get memory info: {}", e);
            }
        },
        Err(e) => {
            debug!("Failed to get current process: {}", e);
        }
    }

    result
}

// Helper function to get file extension as lowercase string
fn get_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|s| s.to_lowercase())
}

/// Opens a file for reading, handling decompression based on file extension.
/// Supported extensions: .gz, .xz, .zst.
pub fn get_input_reader(path: &Path) -> Result<Box<dyn BufRead + Send>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open input file: {:?}", path))?;
    let extension = get_extension(path);

    match extension.as_deref() {
        Some("gz") => {
            info!("Reading GZipped file: {:?}", path);
            let decoder = MultiGzDecoder::new(file);
            Ok(Box::new(BufReader::new(decoder)))
        }
        Some("xz") => {
            info!("Reading XZ compressed file: {:?}", path);
            let decoder = XzDecoder::new(file);
            Ok(Box::new(BufReader::new(decoder)))
        }
        Some("zst") | Some("zstd") => {
            info!("Reading Zstandard compressed file: {:?}", path);
            let decoder = ZstdDecoder::new(file)
                .with_context(|| format!("Failed to create ZstdDecoder for {:?}", path))?;
            Ok(Box::new(BufReader::new(decoder)))
        }
        _ => {
            debug!("Reading uncompressed file: {:?}", path);
            Ok(Box::new(BufReader::new(file)))
        }
    }
}

/// Opens a file for writing, handling compression based on file extension.
/// Supported extensions: .gz, .xz, .zst.
pub fn get_output_writer(path: &Path) -> Result<Box<dyn Write>> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create output file: {:?}", path))?;
    let extension = get_extension(path);

    match extension.as_deref() {
        Some("gz") => {
            info!("Writing GZipped file: {:?}", path);
            let encoder = GzEncoder::new(file, GzCompression::default());
            Ok(Box::new(BufWriter::new(encoder)))
        }
        Some("xz") => {
            info!("Writing XZ compressed file: {:?}", path);
            let encoder = XzEncoder::new(file, 6);
            Ok(Box::new(BufWriter::new(encoder)))
        }
        Some("zst") | Some("zstd") => {
            info!("Writing Zstandard compressed file: {:?}", path);
            let encoder = ZstdEncoder::new(file, 0) // 0 is default compression level for zstd crate
                .with_context(|| format!("Failed to create ZstdEncoder for {:?}", path))?
                .auto_finish();
            Ok(Box::new(BufWriter::new(encoder)))
        }
        _ => {
            debug!("Writing uncompressed file: {:?}", path);
            Ok(Box::new(BufWriter::new(file)))
        }
    }
}
