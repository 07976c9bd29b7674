pub mod assemble;
pub mod count;

use crate::cli::Commands;
use anyhow::Result;

pub fn dispatch_command(command: Commands, threads: usize, verbose: u8) -> Result<()> {
    // Setup logging based on verbosity
    let log_level = match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new().filter_level(log_level).init();

    crate::utils::initialize_rayon_pool(crate::utils::get_num_threads(threads))?;

    match command {
        Commands::Count(args) => count::run_count(args),
        Commands::Assemble(args) => assemble::run_assemble(args),
    }
}
