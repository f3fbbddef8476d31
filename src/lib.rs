//! Per-key min/mean/max over large `<key>;<value>` files.
//!
//! Records are read in large chunks, folded into one byte trie per worker
//! thread, and the tries are merged and walked to produce the summary.

pub mod chunk;
pub mod config;
pub mod error;
pub mod merge;
pub mod node;
pub mod parse;
pub mod pipeline;
pub mod render;

pub use config::{Args, Config, InsertMode, MergeStrategy};
pub use error::{Error, FormatError};
pub use node::{Entry, Node, Stats};
pub use pipeline::{aggregate, aggregate_file};
pub use render::render;
