use std::collections::HashMap;
use std::hash::Hash;

use super::{NestedSet, Node};
use crate::core::{Blake3Hasher, Hash32};

/// Digest of a node is the hash of its order, its direct elements and the
/// digests of its children. Each distinct node is hashed once and the result
/// is kept on the node.
pub(super) fn digest<T>(root: &NestedSet<T>) -> Hash32
where
    T: Hash,
{
    if let Some(digest) = root.0.digest.get() {
        return *digest;
    }

    let mut memo: HashMap<usize, Hash32> = HashMap::new();
    // (node, children already pushed)
    let mut stack: Vec<(&Node<T>, bool)> = vec![(&*root.0, false)];

    while let Some((node, expanded)) = stack.pop() {
        if memo.contains_key(&node.id()) {
            continue;
        }

        if let Some(digest) = node.digest.get() {
            memo.insert(node.id(), *digest);
            continue;
        }

        if !expanded {
            stack.push((node, true));
            for child in node.children.iter() {
                if !memo.contains_key(&child.0.id()) {
                    stack.push((&*child.0, false));
                }
            }
            continue;
        }

        let mut hasher = Blake3Hasher::default();
        hasher.update(&[node.order.tag()]);
        hasher.update(&(node.direct.len() as u64).to_le_bytes());
        for element in node.direct.iter() {
            element.hash(&mut hasher);
        }
        hasher.update(&(node.children.len() as u64).to_le_bytes());
        for child in node.children.iter() {
            hasher.update(memo[&child.0.id()].as_bytes());
        }

        let digest = Hash32::from(hasher);
        let _ = node.digest.set(digest);
        memo.insert(node.id(), digest);
    }

    memo[&root.0.id()]
}

#[cfg(test)]
mod tests {
    use crate::nested::{NestedSet, NestedSetBuilder, Order};

    fn build(order: Order) -> NestedSet<u32> {
        let shared = NestedSet::leaf(order, [1, 2]);
        let mut left = NestedSetBuilder::new(order);
        left.add_direct(3).add_transitive(&shared).unwrap();
        let mut right = NestedSetBuilder::new(order);
        right.add_direct(4).add_transitive(&shared).unwrap();
        NestedSet::union(order, [&left.build(), &right.build()]).unwrap()
    }

    #[test]
    fn test_identical_structures_share_digest() {
        assert_eq!(build(Order::Preorder).digest(), build(Order::Preorder).digest());
    }

    #[test]
    fn test_order_changes_digest() {
        assert_ne!(build(Order::Preorder).digest(), build(Order::Postorder).digest());
    }

    #[test]
    fn test_content_changes_digest() {
        let a = NestedSet::leaf(Order::Unordered, [1u32, 2]);
        let b = NestedSet::leaf(Order::Unordered, [1u32, 3]);
        assert_ne!(a.digest(), b.digest());
    }

    #[test]
    fn test_digest_is_cached() {
        let set = build(Order::Topological);
        let first = set.digest();
        assert_eq!(set.digest(), first);
    }
}
