use std::fmt::{self, Write};

use crate::node::{Entry, Node};

/// A scaled integer printed as a decimal with one fractional digit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tenths(pub i64);

impl fmt::Display for Tenths {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let magnitude = self.0.unsigned_abs();
        write!(f, "{sign}{}.{}", magnitude / 10, magnitude % 10)
    }
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}={}/{}/{}",
            String::from_utf8_lossy(&self.key),
            Tenths(self.stats.min),
            Tenths(self.stats.mean()),
            Tenths(self.stats.max)
        )
    }
}

/// Renders every key of `trie` as `{ key=min/mean/max , ... }`, in walk order.
pub fn render(trie: &Node) -> String {
    let entries = trie.walk();
    let mut out = String::with_capacity(2 + entries.len() * 32);
    out.push_str("{ ");
    for (i, entry) in entries.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        // writing into a String cannot fail
        let _ = write!(out, "{entry} ");
    }
    out.push('}');
    out
}
