use std::{num::NonZeroUsize, path::PathBuf, thread};

use clap::{Parser, ValueEnum};

/// Block size of a single read.
pub const DEFAULT_CHUNK_SIZE: usize = 256 * 1024 * 1024;

/// How a worker feeds a chunk into its trie.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum InsertMode {
    /// Walk the chunk record by record without splitting it first.
    #[default]
    Stream,
    /// Split the chunk into lines, then insert each line on its own.
    Lines,
}

/// How the merger reduces per-worker tries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum MergeStrategy {
    /// Fold tries into one accumulator as they arrive.
    #[default]
    Sequential,
    /// Wait for every trie, then reduce them pairwise on the rayon pool.
    Tree,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub chunk_size: usize,
    pub workers: usize,
    pub queue_depth: usize,
    pub insert_mode: InsertMode,
    pub merge: MergeStrategy,
}

impl Default for Config {
    fn default() -> Self {
        let workers = default_workers();
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            workers,
            queue_depth: 1,
            insert_mode: InsertMode::default(),
            merge: MergeStrategy::default(),
        }
    }
}

/// One worker per hardware thread, minus one for the reader and merger.
pub fn default_workers() -> usize {
    thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
        .saturating_sub(1)
        .max(1)
}

#[derive(Debug, Parser)]
#[command(version, about = "Per-key min/mean/max over a `<key>;<value>` file", long_about = None)]
pub struct Args {
    /// Input file of `<key>;<value>` lines.
    #[arg(default_value = "measurements.txt")]
    pub path: PathBuf,

    /// Bytes read per chunk; must exceed the longest record.
    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE, value_parser = parse_positive)]
    pub chunk_size: usize,

    /// Worker threads [default: available parallelism - 1].
    #[arg(long, value_parser = parse_positive)]
    pub workers: Option<usize>,

    /// Chunks buffered between the reader and the workers.
    #[arg(long, default_value_t = 1)]
    pub queue_depth: usize,

    #[arg(long, value_enum, default_value_t = InsertMode::Stream)]
    pub mode: InsertMode,

    #[arg(long, value_enum, default_value_t = MergeStrategy::Sequential)]
    pub merge: MergeStrategy,
}

impl Args {
    pub fn config(&self) -> Config {
        Config {
            chunk_size: self.chunk_size,
            workers: self.workers.unwrap_or_else(default_workers),
            queue_depth: self.queue_depth,
            insert_mode: self.mode,
            merge: self.merge,
        }
    }
}

fn parse_positive(s: &str) -> Result<usize, String> {
    match s.parse::<usize>() {
        Ok(0) => Err("must be greater than zero".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let args = Args::parse_from(["trie-brc"]);
        let config = args.config();
        assert_eq!(args.path, PathBuf::from("measurements.txt"));
        assert_eq!(config.chunk_size, DEFAULT_CHUNK_SIZE);
        assert_eq!(config.workers, default_workers());
        assert!(config.workers >= 1);
        assert_eq!(config.insert_mode, InsertMode::Stream);
        assert_eq!(config.merge, MergeStrategy::Sequential);
    }

    #[test]
    fn flags_override_defaults() {
        let args = Args::parse_from([
            "trie-brc",
            "data.txt",
            "--chunk-size",
            "4096",
            "--workers",
            "3",
            "--queue-depth",
            "0",
            "--mode",
            "lines",
            "--merge",
            "tree",
        ]);
        let config = args.config();
        assert_eq!(args.path, PathBuf::from("data.txt"));
        assert_eq!(
            config,
            Config {
                chunk_size: 4096,
                workers: 3,
                queue_depth: 0,
                insert_mode: InsertMode::Lines,
                merge: MergeStrategy::Tree,
            }
        );
    }

    #[test]
    fn zero_chunk_size_is_rejected() {
        assert!(Args::try_parse_from(["trie-brc", "--chunk-size", "0"]).is_err());
        assert!(Args::try_parse_from(["trie-brc", "--workers", "0"]).is_err());
    }
}
