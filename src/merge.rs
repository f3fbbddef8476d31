use crossbeam_channel::Receiver;
use log::debug;
use rayon::prelude::*;

use crate::config::MergeStrategy;
use crate::error::Error;
use crate::node::Node;

/// Drains the result queue into a single trie.
///
/// Stops at the first failed worker; dropping the receiver then tells the
/// remaining workers nobody is listening.
pub fn merge_results(
    results: Receiver<Result<Node, Error>>,
    strategy: MergeStrategy,
) -> Result<Node, Error> {
    match strategy {
        MergeStrategy::Sequential => {
            let mut total = Node::root();
            for (merged, trie) in results.iter().enumerate() {
                total.merge(trie?);
                debug!("merged trie {}", merged + 1);
            }
            Ok(total)
        }
        MergeStrategy::Tree => {
            let tries = results.iter().collect::<Result<Vec<_>, _>>()?;
            debug!("reducing {} tries", tries.len());
            Ok(tree_reduce(tries))
        }
    }
}

/// Pairwise parallel reduction; yields the same trie as folding sequentially.
pub fn tree_reduce(tries: Vec<Node>) -> Node {
    tries.into_par_iter().reduce(Node::root, |mut left, right| {
        left.merge(right);
        left
    })
}

#[cfg(test)]
mod tests {
    use crossbeam_channel::unbounded;

    use super::*;
    use crate::error::FormatError;

    fn trie(input: &[u8]) -> Node {
        let mut root = Node::root();
        root.insert_records(input).unwrap();
        root
    }

    fn parts() -> Vec<&'static [u8]> {
        vec![
            &b"A;1.0\nB;2.0\n"[..],
            &b"A;-3.0\nC;0.0\n"[..],
            &b"AB;4.4\nB;-0.1\n"[..],
            &b""[..],
            &b"C;9.9\nA;0.5\n"[..],
        ]
    }

    fn merged(strategy: MergeStrategy) -> Node {
        let (tx, rx) = unbounded();
        for part in parts() {
            tx.send(Ok(trie(part))).unwrap();
        }
        drop(tx);
        merge_results(rx, strategy).unwrap()
    }

    #[test]
    fn strategies_agree_with_a_single_pass() {
        let whole = trie(&parts().concat()).walk();
        assert_eq!(merged(MergeStrategy::Sequential).walk(), whole);
        assert_eq!(merged(MergeStrategy::Tree).walk(), whole);
    }

    #[test]
    fn merge_order_does_not_matter() {
        let forward = tree_reduce(parts().into_iter().map(trie).collect());
        let backward = tree_reduce(parts().into_iter().rev().map(trie).collect());
        assert_eq!(forward.walk(), backward.walk());
    }

    #[test]
    fn worker_failure_aborts_the_merge() {
        for strategy in [MergeStrategy::Sequential, MergeStrategy::Tree] {
            let (tx, rx) = unbounded();
            tx.send(Ok(trie(b"A;1.0\n"))).unwrap();
            tx.send(Err(Error::format(b"A;x", FormatError::MissingFraction)))
                .unwrap();
            drop(tx);
            assert!(matches!(merge_results(rx, strategy), Err(Error::Format { .. })));
        }
    }

    #[test]
    fn no_tries_gives_an_empty_trie() {
        let (tx, rx) = unbounded::<Result<Node, Error>>();
        drop(tx);
        assert!(merge_results(rx, MergeStrategy::Tree).unwrap().is_empty());
    }
}
