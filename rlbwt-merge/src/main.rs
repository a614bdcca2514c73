use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use log::info;

use rlbwt_merge::index::{IndexMeta, RlBwt, DEFAULT_SAMPLE_RATE};
use rlbwt_merge::io;
use rlbwt_merge::logging;
use rlbwt_merge::merge::{self, Direction, GapKind, MergeOpt, RoundReport};
use rlbwt_merge::util::dna;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[derive(Parser, Debug)]
#[command(name = "rlbwt-merge", author, version, about = "Run-length BWT index with incremental merging", arg_required_else_help = true)]
struct Cli {
    /// Increase log detail (-v info, -vv debug; RUST_LOG overrides)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug, Clone)]
struct RoundArgs {
    /// Occurrence sample interval
    #[arg(long = "sample-rate", default_value_t = DEFAULT_SAMPLE_RATE, value_parser = positive)]
    sample_rate: usize,
    /// Sequences ranked per parallel chunk
    #[arg(long = "chunk-size", default_value_t = 4096)]
    chunk_size: usize,
    /// Index reversed sequences (reverse BWT)
    #[arg(long)]
    reverse: bool,
    /// Use the byte-per-slot gap array
    #[arg(long = "sparse-gaps")]
    sparse_gaps: bool,
    #[arg(short = 't', long = "threads", default_value_t = 1)]
    threads: usize,
    /// Run the full self-check on the resulting index
    #[arg(long)]
    validate: bool,
}

impl RoundArgs {
    fn opt(&self) -> MergeOpt {
        MergeOpt {
            sample_rate: self.sample_rate,
            chunk_size: self.chunk_size,
            direction: if self.reverse { Direction::Reverse } else { Direction::Forward },
            gap_kind: if self.sparse_gaps { GapKind::Sparse } else { GapKind::Dense },
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build an index from scratch
    Index {
        /// Reads (FASTA or FASTQ)
        reads: String,
        /// Output prefix for the index file
        #[arg(short, long, default_value = "reads")]
        output: String,
        #[command(flatten)]
        round: RoundArgs,
    },
    /// Insert a batch of reads into an existing index
    Extend {
        /// Path to the index (.rlbwt)
        #[arg(short = 'i', long = "index")]
        index: String,
        /// Reads to add (FASTA or FASTQ)
        reads: String,
        /// Output path (overwrites the input index if omitted)
        #[arg(short, long)]
        out: Option<String>,
        #[command(flatten)]
        round: RoundArgs,
    },
    /// Remove reads from an index; read ids must be their current index numbers
    Remove {
        #[arg(short = 'i', long = "index")]
        index: String,
        reads: String,
        #[arg(short, long)]
        out: Option<String>,
        #[command(flatten)]
        round: RoundArgs,
    },
    /// Print index statistics
    Stats {
        #[arg(short = 'i', long = "index")]
        index: String,
        #[arg(long = "sample-rate", default_value_t = DEFAULT_SAMPLE_RATE, value_parser = positive)]
        sample_rate: usize,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logger(cli.verbose);
    match cli.command {
        Commands::Index { reads, output, round } => run_index(&reads, &output, &round),
        Commands::Extend { index, reads, out, round } => run_round(&index, &reads, out.as_deref(), &round, false),
        Commands::Remove { index, reads, out, round } => run_round(&index, &reads, out.as_deref(), &round, true),
        Commands::Stats { index, sample_rate } => run_stats(&index, sample_rate),
    }
}

fn positive(s: &str) -> std::result::Result<usize, String> {
    match s.parse::<usize>() {
        Ok(0) => Err("must be at least 1".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(e.to_string()),
    }
}

fn init_threads(threads: usize) -> Result<()> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads.max(1))
        .build_global()
        .context("cannot initialise the rayon thread pool")
}

fn build_args() -> Option<String> {
    Some(std::env::args().collect::<Vec<_>>().join(" "))
}

fn run_index(reads_path: &str, output: &str, round: &RoundArgs) -> Result<()> {
    init_threads(round.threads)?;
    let items = io::read_sequences(reads_path)
        .with_context(|| format!("cannot read sequences from '{}'", reads_path))?;
    if items.is_empty() {
        anyhow::bail!("'{}' contains no sequences", reads_path);
    }

    let mut bwt = merge::build_index(&items, &round.opt())?;
    bwt.set_meta(IndexMeta {
        source_files: vec![reads_path.to_string()],
        build_args: build_args(),
        build_timestamp: Some(chrono::Utc::now().to_rfc3339()),
        merge_rounds: 0,
    });
    if round.validate {
        bwt.validate();
    }

    let out_path = format!("{}.rlbwt", output);
    bwt.save_to_file(&out_path)
        .with_context(|| format!("cannot write index to '{}'", out_path))?;
    info!("index saved: {} ({} strings, {} symbols, {} runs)", out_path, bwt.num_strings(), bwt.num_symbols(), bwt.num_runs());
    println!("index saved: {}", out_path);
    Ok(())
}

fn run_round(index_path: &str, reads_path: &str, out_path: Option<&str>, round: &RoundArgs, remove: bool) -> Result<()> {
    init_threads(round.threads)?;
    let opt = round.opt();
    let prior = RlBwt::load_from_file(index_path, opt.sample_rate)
        .with_context(|| format!("cannot load index '{}'", index_path))?;
    let items = io::read_sequences(reads_path)
        .with_context(|| format!("cannot read sequences from '{}'", reads_path))?;

    let (mut next, report) = if remove {
        merge::remove_from_index(&prior, &items, &opt)?
    } else {
        merge::extend_index(&prior, &items, &opt)?
    };
    // 合并已完成，释放旧索引
    drop(prior);

    let meta = next.meta_mut();
    meta.source_files.push(reads_path.to_string());
    meta.build_args = build_args();
    meta.build_timestamp = Some(chrono::Utc::now().to_rfc3339());
    if round.validate {
        next.validate();
    }

    let target = out_path.unwrap_or(index_path);
    next.save_to_file(target)
        .with_context(|| format!("cannot write index to '{}'", target))?;
    print_report(&report, remove);
    println!("index saved: {} ({} strings, {} symbols)", target, next.num_strings(), next.num_symbols());
    Ok(())
}

fn print_report(report: &RoundReport, remove: bool) {
    let verb = if remove { "removed" } else { "inserted" };
    println!("{} sequences: {} ({} symbols)", verb, report.accepted, report.symbols);
    println!(
        "gap array: {} slots, {} non-zero, max {}",
        report.gap_stats.size, report.gap_stats.nonzero, report.gap_stats.max
    );
    if !report.rejected.is_empty() {
        println!("rejected sequences: {}", report.rejected.len());
        for r in &report.rejected {
            println!("  {}\t{}", r.id, r.reason);
        }
    }
}

fn run_stats(index_path: &str, sample_rate: usize) -> Result<()> {
    let bwt = RlBwt::load_from_file(index_path, sample_rate)
        .with_context(|| format!("cannot load index '{}'", index_path))?;
    let stats = bwt.stats();
    println!("strings: {}", stats.num_strings);
    println!("symbols: {}", stats.num_symbols);
    println!("runs: {}", stats.num_runs);
    println!("mean run length: {:.2}", stats.mean_run_length());
    println!("occ checkpoints: {} (every {})", stats.num_marks, bwt.sample_rate());
    for (r, &c) in stats.symbol_counts.as_array().iter().enumerate() {
        println!("  {}: {}", dna::from_alphabet(r as u8) as char, c);
    }
    let meta = bwt.meta();
    println!("merge rounds: {}", meta.merge_rounds);
    if let Some(ts) = &meta.build_timestamp {
        println!("last written: {}", ts);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_rate_must_be_positive() {
        assert_eq!(positive("64"), Ok(64));
        assert!(positive("0").is_err());
        assert!(positive("x").is_err());
        assert!(Cli::try_parse_from(["rlbwt-merge", "stats", "-i", "a.rlbwt", "--sample-rate", "0"]).is_err());
        let cli = Cli::try_parse_from(["rlbwt-merge", "-vv", "stats", "-i", "a.rlbwt"]).unwrap();
        assert_eq!(cli.verbose, 2);
    }
}
