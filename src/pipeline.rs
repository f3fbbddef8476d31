use std::{
    fs::File,
    io::{Read, Seek},
    path::Path,
    sync::atomic::{AtomicBool, Ordering},
    thread,
};

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use log::{debug, info};

use crate::chunk::{Chunk, ChunkReader};
use crate::config::{Config, InsertMode};
use crate::error::Error;
use crate::merge;
use crate::node::Node;

/// Opens `path` and runs [`aggregate`] over it.
pub fn aggregate_file(path: &Path, config: &Config) -> Result<Node, Error> {
    let file = File::open(path).map_err(|source| Error::InputUnavailable {
        path: path.to_path_buf(),
        source,
    })?;
    info!("reading {}", path.display());
    aggregate(file, config)
}

/// Reads `source` on the calling thread, aggregates it on `config.workers`
/// worker threads and merges their tries on a dedicated merger thread.
///
/// Any error aborts the run; no partial trie is returned.
pub fn aggregate<R: Read + Seek>(source: R, config: &Config) -> Result<Node, Error> {
    let workers = config.workers.max(1);
    info!(
        "aggregating with {} workers, {} byte chunks, {:?} insertion, {:?} merge",
        workers, config.chunk_size, config.insert_mode, config.merge
    );
    let abort = AtomicBool::new(false);

    thread::scope(|scope| {
        let (chunk_tx, chunk_rx) = bounded::<Chunk>(config.queue_depth);
        let (result_tx, result_rx) = unbounded::<Result<Node, Error>>();

        let mut handles = Vec::with_capacity(workers);
        for id in 0..workers {
            let chunks = chunk_rx.clone();
            let results = result_tx.clone();
            let abort = &abort;
            let handle = thread::Builder::new()
                .name(format!("worker-{id}"))
                .spawn_scoped(scope, move || {
                    let outcome = run_worker(id, &chunks, config.insert_mode, abort);
                    if outcome.is_err() {
                        abort.store(true, Ordering::Relaxed);
                    }
                    // the merger hangs up early when another worker failed
                    let _ = results.send(outcome);
                })
                .map_err(Error::Spawn)?;
            handles.push(handle);
        }
        drop(chunk_rx);
        drop(result_tx);

        let merger = thread::Builder::new()
            .name("merger".to_string())
            .spawn_scoped(scope, move || merge::merge_results(result_rx, config.merge))
            .map_err(Error::Spawn)?;

        let read = feed(source, config.chunk_size, &chunk_tx, &abort);
        if read.is_err() {
            abort.store(true, Ordering::Relaxed);
        }
        drop(chunk_tx);

        for handle in handles {
            handle.join().map_err(|_| Error::WorkerPanicked)?;
        }
        let total = merger.join().map_err(|_| Error::WorkerPanicked)?;
        read?;
        let total = total?;
        info!("merged {} distinct keys", total.len());
        Ok(total)
    })
}

/// Single producer: pushes every chunk of `source` onto the chunk queue.
fn feed<R: Read + Seek>(
    source: R,
    chunk_size: usize,
    chunks: &Sender<Chunk>,
    abort: &AtomicBool,
) -> Result<(), Error> {
    for chunk in ChunkReader::new(source, chunk_size) {
        let chunk = chunk?;
        if abort.load(Ordering::Relaxed) {
            break;
        }
        // every worker is gone, which only happens after a failure
        if chunks.send(chunk).is_err() {
            break;
        }
    }
    Ok(())
}

fn run_worker(
    id: usize,
    chunks: &Receiver<Chunk>,
    mode: InsertMode,
    abort: &AtomicBool,
) -> Result<Node, Error> {
    let mut trie = Node::root();
    let mut chunk_count = 0u64;
    let mut record_count = 0u64;

    for chunk in chunks {
        if abort.load(Ordering::Relaxed) {
            break;
        }
        record_count += match mode {
            InsertMode::Stream => trie.insert_records(&chunk)?,
            InsertMode::Lines => trie.insert_lines(&chunk)?,
        };
        chunk_count += 1;
    }

    debug!("worker {id} folded {record_count} records from {chunk_count} chunks");
    Ok(trie)
}
