use std::fmt;

use memchr::memchr;

use crate::chunk::Lines;
use crate::error::{Error, FormatError};
use crate::parse::{self, COMMENT, DELIMITER, TERMINATOR};

/// One child slot per possible byte value.
pub const FANOUT: usize = 256;

/// Running statistics for one key, in tenths.
///
/// A node without a key ending at it carries no `Stats` at all, so a first
/// observation of exactly `0.0` is never mistaken for "nothing recorded yet".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stats {
    pub min: i64,
    pub max: i64,
    pub sum: i128,
    pub count: u64,
}

impl Stats {
    pub fn new(value: i64) -> Self {
        Self {
            min: value,
            max: value,
            sum: i128::from(value),
            count: 1,
        }
    }

    #[inline]
    pub fn update(&mut self, value: i64) {
        self.min = self.min.min(value);
        self.max = self.max.max(value);
        self.sum += i128::from(value);
        self.count += 1;
    }

    pub fn combine(self, other: Stats) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
            sum: self.sum + other.sum,
            count: self.count + other.count,
        }
    }

    /// `sum / count` rounded to the nearest tenth, halves away from zero.
    ///
    /// The result lies between `min` and `max`, so it always fits an `i64`.
    pub fn mean(&self) -> i64 {
        let count = i128::from(self.count);
        let twice = 2 * self.sum;
        let mean = if twice >= 0 {
            (twice + count) / (2 * count)
        } else {
            -((-twice + count) / (2 * count))
        };
        mean as i64
    }
}

/// A key and its statistics, as produced by [`Node::walk`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub key: Vec<u8>,
    pub stats: Stats,
}

/// A byte trie over keys; the node reached by a key's last byte holds its
/// statistics.
pub struct Node {
    key: u8,
    stats: Option<Stats>,
    children: [Option<Box<Node>>; FANOUT],
}

impl Node {
    /// An empty trie. The root's own key byte is never part of any label.
    pub fn root() -> Self {
        Self::new(0)
    }

    fn new(key: u8) -> Self {
        Self {
            key,
            stats: None,
            children: std::array::from_fn(|_| None),
        }
    }

    pub fn stats(&self) -> Option<&Stats> {
        self.stats.as_ref()
    }

    pub fn is_terminal(&self) -> bool {
        self.stats.is_some()
    }

    pub fn child(&self, byte: u8) -> Option<&Node> {
        self.children[byte as usize].as_deref()
    }

    pub fn children(&self) -> impl Iterator<Item = &Node> {
        self.children.iter().flatten().map(|child| &**child)
    }

    /// Follows `key` from this node, `None` if the path was never created.
    pub fn find(&self, key: &[u8]) -> Option<&Node> {
        key.iter().try_fold(self, |node, &byte| node.child(byte))
    }

    #[inline]
    fn child_or_insert(&mut self, byte: u8) -> &mut Node {
        self.children[byte as usize].get_or_insert_with(|| Box::new(Node::new(byte)))
    }

    #[inline]
    fn record(&mut self, value: i64) {
        match &mut self.stats {
            Some(stats) => stats.update(value),
            None => self.stats = Some(Stats::new(value)),
        }
    }

    /// Inserts the record at the start of `records` and returns whatever
    /// follows it: the next record, or an empty slice.
    ///
    /// Descends one byte at a time until the `;`, then parses the value up to
    /// the next `\n` (or the end of the buffer).
    #[inline]
    pub fn insert<'a>(&mut self, records: &'a [u8]) -> Result<&'a [u8], FormatError> {
        let mut node = self;
        for (position, &byte) in records.iter().enumerate() {
            match byte {
                DELIMITER if position == 0 => return Err(FormatError::EmptyKey),
                DELIMITER => {
                    let value_start = position + 1;
                    let (value, consumed) = parse::parse_value(&records[value_start..])?;
                    node.record(value);
                    return Ok(&records[value_start + consumed..]);
                }
                TERMINATOR => return Err(FormatError::MissingDelimiter),
                _ => node = node.child_or_insert(byte),
            }
        }
        Err(FormatError::MissingDelimiter)
    }

    /// Inserts a single record that has already been cut out of its buffer,
    /// terminator excluded.
    pub fn insert_line(&mut self, line: &[u8]) -> Result<(), FormatError> {
        let delimiter = memchr(DELIMITER, line).ok_or(FormatError::MissingDelimiter)?;
        if delimiter == 0 {
            return Err(FormatError::EmptyKey);
        }
        let value = parse::parse_field(&line[delimiter + 1..])?;
        let mut node = self;
        for &byte in &line[..delimiter] {
            node = node.child_or_insert(byte);
        }
        node.record(value);
        Ok(())
    }

    /// Streams every record of `buf` through [`Node::insert`], skipping
    /// comment and blank lines. Returns the number of records inserted.
    pub fn insert_records(&mut self, mut buf: &[u8]) -> Result<u64, Error> {
        let mut inserted = 0;
        while let Some(&first) = buf.first() {
            buf = match first {
                COMMENT | TERMINATOR => skip_line(buf),
                _ => {
                    inserted += 1;
                    self.insert(buf).map_err(|source| Error::format(buf, source))?
                }
            };
        }
        Ok(inserted)
    }

    /// Line-oriented counterpart of [`Node::insert_records`].
    pub fn insert_lines(&mut self, buf: &[u8]) -> Result<u64, Error> {
        let mut inserted = 0;
        for line in Lines::new(buf) {
            if line.is_empty() || line[0] == COMMENT {
                continue;
            }
            self.insert_line(line)
                .map_err(|source| Error::format(line, source))?;
            inserted += 1;
        }
        Ok(inserted)
    }

    /// Folds `other` into this trie. Subtrees only `other` has are moved over
    /// as they are.
    pub fn merge(&mut self, other: Node) {
        let mut pending: Vec<(&mut Node, Box<Node>)> = vec![(self, Box::new(other))];
        while let Some((ours, mut theirs)) = pending.pop() {
            if let Some(stats) = theirs.stats {
                ours.stats = Some(match ours.stats {
                    Some(mine) => mine.combine(stats),
                    None => stats,
                });
            }
            for (slot, incoming) in ours.children.iter_mut().zip(theirs.children.iter_mut()) {
                let Some(incoming) = incoming.take() else { continue };
                match slot {
                    Some(existing) => pending.push((&mut **existing, incoming)),
                    empty => *empty = Some(incoming),
                }
            }
        }
    }

    /// Number of distinct keys stored below (and at) this node.
    pub fn len(&self) -> usize {
        let mut pending = vec![self];
        let mut keys = 0;
        while let Some(node) = pending.pop() {
            keys += node.is_terminal() as usize;
            pending.extend(node.children());
        }
        keys
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Depth-first walk in ascending byte order. A key is emitted after all
    /// longer keys that extend it.
    pub fn walk(&self) -> Vec<Entry> {
        let mut label = Vec::new();
        let mut entries = Vec::new();
        // each frame is a node plus the first child slot not yet visited
        let mut path = vec![(self, 0usize)];

        while let Some((node, next)) = path.last_mut() {
            let node = *node;
            let child = node.children[*next..]
                .iter()
                .enumerate()
                .find_map(|(offset, child)| child.as_deref().map(|child| (offset, child)));
            match child {
                Some((offset, child)) => {
                    *next += offset + 1;
                    label.push(child.key);
                    path.push((child, 0));
                }
                None => {
                    if let Some(stats) = node.stats {
                        entries.push(Entry {
                            key: label.clone(),
                            stats,
                        });
                    }
                    path.pop();
                    label.pop();
                }
            }
        }
        entries
    }
}

/// Tears the trie down level by level; long keys would otherwise recurse once
/// per byte.
impl Drop for Node {
    fn drop(&mut self) {
        let mut pending: Vec<Box<Node>> =
            self.children.iter_mut().filter_map(Option::take).collect();
        while let Some(mut node) = pending.pop() {
            pending.extend(node.children.iter_mut().filter_map(Option::take));
        }
    }
}

impl Default for Node {
    fn default() -> Self {
        Self::root()
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("key", &self.key)
            .field("stats", &self.stats)
            .field("children", &self.children().count())
            .finish()
    }
}

fn skip_line(buf: &[u8]) -> &[u8] {
    match memchr(TERMINATOR, buf) {
        Some(end) => &buf[end + 1..],
        None => &buf[buf.len()..],
    }
}
