use std::io::{self, Write};
use std::time::Instant;

use clap::Parser;
use log::info;

use trie_brc::{aggregate_file, render, Args};

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let start = Instant::now();
    let args = Args::parse();
    let config = args.config();

    let trie = aggregate_file(&args.path, &config)?;
    let output = render(&trie);

    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{output}")?;
    stdout.flush()?;

    info!("took {:?}", start.elapsed());
    Ok(())
}
