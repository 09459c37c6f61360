use quickcheck::{Gen, QuickCheck};
use rbtree::redblack::Tree;

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::thread;

use crate::Op;

/// Applies a set of operations to a tree and a hashset, checking the tree's invariants after every
/// step. This way we can ensure that after a random smattering of inserts and deletes we have the
/// same set of values and a valid red-black tree.
fn do_ops<T>(ops: &[Op<T>], tree: &mut Tree<T>, set: &mut HashSet<T>)
where
    T: std::hash::Hash + Eq + Clone + Ord + std::fmt::Debug,
{
    for op in ops {
        match op {
            Op::Insert(x) => assert_eq!(tree.insert(x.clone()), set.insert(x.clone())),
            Op::Delete(x) => assert_eq!(tree.delete(x), set.take(x)),
        }
        if let Err(violation) = tree.check_invariants() {
            panic!("{violation} after {op:?}");
        }
    }
}

quickcheck::quickcheck! {
    fn fuzz_multiple_operations_i8(ops: Vec<Op<i8>>) -> bool {
        let mut tree = Tree::new();
        let mut set = HashSet::new();

        do_ops(&ops, &mut tree, &mut set);
        (i8::MIN..=i8::MAX).all(|x| tree.search(&x) == set.contains(&x))
    }
}

quickcheck::quickcheck! {
    fn contains(xs: Vec<i32>) -> bool {
        let tree: Tree<_> = xs.iter().copied().collect();

        xs.iter().all(|x| tree.search(x))
    }
}

quickcheck::quickcheck! {
    fn contains_not(xs: Vec<i8>, nots: Vec<i8>) -> bool {
        let tree: Tree<_> = xs.iter().copied().collect();
        let added: HashSet<_> = xs.into_iter().collect();
        let nots: HashSet<_> = nots.into_iter().collect();
        let mut nots = nots.difference(&added);

        nots.all(|x| !tree.search(x))
    }
}

quickcheck::quickcheck! {
    fn with_deletions(xs: Vec<i8>, deletes: Vec<i8>) -> bool {
        let mut tree: Tree<_> = xs.iter().copied().collect();
        for delete in &deletes {
            tree.delete(delete);
        }

        let mut still_present = xs;
        for delete in &deletes {
            // We may have inserted the same value multiple times - delete each one.
            while let Some(pos) = still_present.iter().position(|x| x == delete) {
                still_present.swap_remove(pos);
            }
        }

        tree.check_invariants().is_ok()
            && deletes.iter().all(|x| !tree.search(x))
            && still_present.iter().all(|x| tree.search(x))
    }
}

quickcheck::quickcheck! {
    fn duplicate_insert_is_idempotent(xs: Vec<i16>) -> bool {
        let once: Tree<_> = xs.iter().copied().collect();
        let mut twice = once.clone();
        twice.extend(xs.iter().copied());

        // Re-inserting everything changes nothing, including the shape of the tree.
        format!("{once:?}") == format!("{twice:?}")
    }
}

quickcheck::quickcheck! {
    fn insert_then_delete_all_is_empty(xs: HashSet<u32>) -> bool {
        let mut tree: Tree<_> = xs.iter().copied().collect();
        let all_deleted = xs.iter().all(|x| tree.delete(x) == Some(*x));

        all_deleted && tree.is_empty() && tree.check_invariants() == Ok(0)
    }
}

#[test]
fn long_operation_sequences_keep_invariants() {
    // Long runs over a small key space, so trees get deep and deletes keep hitting cascades.
    fn prop(ops: Vec<Op<u8>>) -> bool {
        let mut tree = Tree::new();
        let mut set = HashSet::new();
        do_ops(&ops, &mut tree, &mut set);

        let mut remaining: Vec<_> = set.into_iter().collect();
        remaining.sort_unstable();
        for x in remaining {
            assert_eq!(tree.delete(&x), Some(x));
            assert!(tree.check_invariants().is_ok());
        }
        tree.is_empty()
    }

    QuickCheck::new()
        .gen(Gen::new(5_000))
        .tests(40)
        .quickcheck(prop as fn(Vec<Op<u8>>) -> bool);
}

#[test]
fn shared_across_threads_behind_a_lock() {
    let tree = Arc::new(Mutex::new(Tree::new()));

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let tree = Arc::clone(&tree);
            thread::spawn(move || {
                for x in 0..100 {
                    tree.lock().unwrap().insert(t * 100 + x);
                }
                for x in (0..100).step_by(2) {
                    tree.lock().unwrap().delete(&(t * 100 + x));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let tree = tree.lock().unwrap();
    assert!(tree.check_invariants().is_ok());
    assert!((0..400).all(|x| tree.search(&x) == (x % 2 == 1)));
}

#[test]
fn balanced_after_ascending_inserts() {
    let tree: Tree<_> = (0..(1 << 12)).collect();

    // A subtree whose paths each hold `k` black value nodes has at least `2^k - 1` values, and
    // the returned black-height also counts the sentinel.
    let black_height = tree.check_invariants().unwrap();
    assert!(black_height <= 13);
}
