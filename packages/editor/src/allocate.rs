//! Identifier allocation.
//!
//! Names are made unique among siblings by suffixing: `square`, `square 2`,
//! `square 3`. Edge indices are dense per endpoint pair and arrow style, so
//! the next free index is the number of edges the pair already has.

use std::collections::HashSet;
use trellis_compiler::{Board, ObjId};

/// `base` if nothing in `taken` equals it, else `base N` for the smallest
/// free `N >= 2`.
pub fn unique_name<'a, I>(taken: I, base: &str) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let taken: HashSet<&str> = taken.into_iter().collect();
    if !taken.contains(base) {
        return base.to_string();
    }
    let mut n = 2;
    loop {
        let candidate = format!("{} {}", base, n);
        if !taken.contains(candidate.as_str()) {
            return candidate;
        }
        n += 1;
    }
}

/// Names of `parent`'s children, leaving out `exclude`.
pub(crate) fn sibling_names(board: &Board, parent: ObjId, exclude: Option<ObjId>) -> Vec<String> {
    board
        .object(parent)
        .children
        .iter()
        .filter(|c| Some(**c) != exclude)
        .map(|c| board.object(*c).name.clone())
        .collect()
}

pub fn next_edge_index(board: &Board, src: ObjId, dst: ObjId, src_arrow: bool, dst_arrow: bool) -> usize {
    board.edges_between(src, dst, src_arrow, dst_arrow).len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use trellis_compiler::compile;

    #[test]
    fn test_unique_name_suffixes() {
        assert_eq!(unique_name(Vec::<&str>::new(), "square"), "square");
        assert_eq!(unique_name(["square"], "square"), "square 2");
        assert_eq!(unique_name(["square", "square 2", "square 4"], "square"), "square 3");
        assert_eq!(unique_name(["square 2"], "square"), "square");
    }

    #[test]
    fn test_next_edge_index_counts_pair() {
        let diagram = compile("a -> b\na -> b\nb -> a\na <- b").unwrap();
        let board = &diagram.root;
        let a = board.find(&["a"]).unwrap();
        let b = board.find(&["b"]).unwrap();
        assert_eq!(next_edge_index(board, a, b, false, true), 2);
        assert_eq!(next_edge_index(board, b, a, false, true), 1);
        assert_eq!(next_edge_index(board, a, b, true, false), 1);
        assert_eq!(next_edge_index(board, a, b, true, true), 0);
    }

    #[test]
    fn test_sibling_names_exclude() {
        let diagram = compile("p: { a; b; c }").unwrap();
        let board = &diagram.root;
        let p = board.find(&["p"]).unwrap();
        let b = board.find(&["p", "b"]).unwrap();
        assert_eq!(sibling_names(board, p, Some(b)), vec!["a", "c"]);
    }

    proptest! {
        #[test]
        fn prop_allocated_name_is_free(
            base in "[a-z]{1,4}",
            suffixes in proptest::collection::vec(2usize..8, 0..6),
            include_base in any::<bool>(),
        ) {
            let mut taken: Vec<String> = suffixes.iter().map(|n| format!("{} {}", base, n)).collect();
            if include_base {
                taken.push(base.clone());
            }
            let name = unique_name(taken.iter().map(String::as_str), &base);
            prop_assert!(!taken.contains(&name));

            taken.push(name.clone());
            let next = unique_name(taken.iter().map(String::as_str), &base);
            prop_assert_ne!(next, name);
        }
    }
}
