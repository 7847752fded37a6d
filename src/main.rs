//! CLI Entry Point for signal-pool
//!
//! Provides command-line access to:
//! - A demonstration of the pool lifecycle (register, store, subscribe,
//!   chunked read, automatic release)
//! - Inspection of raw record files, which carry no header and need their
//!   sample type supplied
//!
//! # Usage
//!
//! ```bash
//! signal-pool demo
//! signal-pool demo --folder /tmp/pool
//! signal-pool inspect /tmp/pool/<id>.dat --sample-type float32 --chunk-size 4
//! signal-pool inspect /tmp/pool/<id>.dat --sample-type float32 --chunk-size 4 --index 2
//! signal-pool inspect /tmp/pool/<id>.dat --sample-type float32 --overlapped
//! signal-pool inspect /tmp/pool/<id>.dat --sample-type float32 --overlap 25
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use signal_pool::config::{PoolConfig, DEFAULT_CONFIG_PATH};
use signal_pool::data::backend::RecordStore;
use signal_pool::prelude::*;
use signal_pool::tracing_setup::{self, OutputFormat, TracingConfig};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser)]
#[command(name = "signal-pool")]
#[command(about = "Typed in-process data pool for signal data", long_about = None)]
struct Cli {
    /// Configuration file
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Log output format (pretty, compact, json)
    #[arg(long, global = true, default_value = "compact")]
    log_format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the temporal-signal lifecycle scenario and print every pool event
    Demo {
        /// Store the signal in this folder instead of RAM
        #[arg(long)]
        folder: Option<PathBuf>,
    },

    /// Decode a raw record file
    Inspect {
        /// Path to the record file
        file: PathBuf,

        /// Element type of the file (float32, float64, int32, int64, text)
        #[arg(long)]
        sample_type: SampleType,

        /// Elements per chunk (defaults to streaming.default_chunk_size)
        #[arg(long)]
        chunk_size: Option<usize>,

        /// Print only this chunk
        #[arg(long, conflicts_with_all = ["overlapped", "overlap"])]
        index: Option<usize>,

        /// Print overlapping windows (overlap defaults to
        /// streaming.default_overlap_percent)
        #[arg(long)]
        overlapped: bool,

        /// Window overlap in percent; implies --overlapped
        #[arg(long)]
        overlap: Option<f64>,
    },
}

/// Which chunks `inspect` prints.
#[derive(Debug, Clone, Copy, PartialEq)]
enum View {
    Sequential,
    At(usize),
    Overlapped(f64),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = PoolConfig::load_from(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    config.validate()?;
    let tracing_config =
        TracingConfig::from_pool_config(&config)?.with_format(cli.log_format);
    tracing_setup::init(tracing_config)?;

    match cli.command {
        Commands::Demo { folder } => run_demo(config, folder),
        Commands::Inspect {
            file,
            sample_type,
            chunk_size,
            index,
            overlapped,
            overlap,
        } => {
            let chunk_size = chunk_size.unwrap_or(config.streaming.default_chunk_size);
            let view = match (index, overlap) {
                (Some(index), _) => View::At(index),
                (None, Some(percent)) => View::Overlapped(percent),
                (None, None) if overlapped => {
                    View::Overlapped(config.streaming.default_overlap_percent)
                }
                (None, None) => View::Sequential,
            };
            inspect(&mut std::io::stdout().lock(), &file, sample_type, chunk_size, view)
        }
    }
}

fn run_demo(config: PoolConfig, folder: Option<PathBuf>) -> Result<()> {
    let pool = DataPool::new(config);
    pool.add_observer(|event: &PoolEvent| match serde_json::to_string(event) {
        Ok(line) => println!("event: {line}"),
        Err(e) => eprintln!("event could not be serialized: {e}"),
    });

    let storage = if folder.is_some() {
        StorageMode::File
    } else {
        StorageMode::Ram
    };
    let id = pool.register(
        KindTag::TemporalSignal,
        "demo signal",
        "demo-source",
        false,
        storage,
        KindParams::temporal(0.01, "V"),
    )?;
    let signal: Vec<f32> = (1..=10u8).map(|i| f32::from(i) / 10.0).collect();
    pool.store(&id, signal, "demo-source", folder.as_deref())?;

    let info = pool.get_info(&id)?;
    println!("{}", serde_json::to_string_pretty(&info)?);

    pool.add_subscriber(&id, "demo-reader")?;
    for (n, chunk) in pool.get_chunk_generator(&id, "demo-reader", 3)?.enumerate() {
        println!("chunk {n}: {}", serde_json::to_string(&chunk?)?);
    }

    match pool.get_info(&id) {
        Err(PoolError::NotFound(_)) => {
            info!(data_id = %id, "record released after its only subscriber finished");
            println!("state: {}", pool.state(&id)?);
            Ok(())
        }
        Ok(_) => anyhow::bail!("record {id} is still registered after the final acknowledgment"),
        Err(e) => Err(e.into()),
    }
}

fn inspect(
    out: &mut impl Write,
    file: &Path,
    sample_type: SampleType,
    chunk_size: usize,
    view: View,
) -> Result<()> {
    let store = RecordStore::open_file(file, sample_type)
        .with_context(|| format!("opening {}", file.display()))?;
    writeln!(
        out,
        "{}: {} {} elements, {} bytes",
        file.display(),
        store.element_count(),
        sample_type,
        store.byte_length()
    )?;

    match view {
        View::At(index) => {
            let chunk = store.read_chunk_at(index, chunk_size)?;
            writeln!(out, "chunk {index}: {}", serde_json::to_string(&chunk)?)?;
        }
        View::Sequential => {
            for (n, chunk) in store.read_sequential_chunks(chunk_size)?.enumerate() {
                writeln!(out, "chunk {n}: {}", serde_json::to_string(&chunk?)?)?;
            }
        }
        View::Overlapped(percent) => {
            for (n, window) in store
                .read_overlapped_chunks(chunk_size, percent)?
                .enumerate()
            {
                writeln!(out, "window {n}: {}", serde_json::to_string(&window?)?)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use signal_pool::data::codec;

    fn raw_ints(dir: &Path) -> PathBuf {
        let path = dir.join("ints.dat");
        std::fs::write(&path, codec::encode(&Samples::Int32((0..6).collect()))).unwrap();
        path
    }

    fn inspect_lines(path: &Path, chunk_size: usize, view: View) -> Vec<String> {
        let mut out = Vec::new();
        inspect(&mut out, path, SampleType::Int32, chunk_size, view).unwrap();
        String::from_utf8(out)
            .unwrap()
            .lines()
            .skip(1)
            .map(str::to_owned)
            .collect()
    }

    #[test]
    fn overlapped_inspection_prints_windows() {
        let dir = tempfile::tempdir().unwrap();
        let path = raw_ints(dir.path());
        let windows = inspect_lines(&path, 4, View::Overlapped(50.0));
        assert_eq!(windows.len(), 3);
        assert!(windows[0].starts_with("window 0: "));
        assert!(windows[1].starts_with("window 1: "));

        let chunks = inspect_lines(&path, 4, View::Sequential);
        assert_eq!(chunks.len(), 2);
        assert_eq!(inspect_lines(&path, 4, View::At(1)).len(), 1);
    }

    #[test]
    fn overlap_flags_parse() {
        let cli = Cli::try_parse_from([
            "signal-pool", "inspect", "r.dat", "--sample-type", "int32", "--overlap", "25",
        ])
        .unwrap();
        let Commands::Inspect { overlap, overlapped, .. } = cli.command else {
            panic!("expected inspect");
        };
        assert_eq!(overlap, Some(25.0));
        assert!(!overlapped);

        assert!(Cli::try_parse_from([
            "signal-pool", "inspect", "r.dat", "--sample-type", "int32", "--index", "1",
            "--overlapped",
        ])
        .is_err());
    }
}
