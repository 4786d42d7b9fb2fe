//! Traversals turning a node graph into a flat sequence.
//!
//! Every traversal keeps a set of visited node identities and never enters a
//! node twice, and a set of emitted elements so that only the first
//! occurrence of an element is kept. All of them are iterative, deep chains
//! of unions don't grow the call stack.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::hash::Hash;

use super::{Node, Order};

pub(super) fn flatten<T>(root: &Node<T>) -> Vec<T>
where
    T: Clone + Eq + Hash,
{
    let mut out = Emitter::default();

    match root.order {
        // Unordered sets reuse the preorder walk, it is deterministic for a
        // given node graph.
        Order::Preorder | Order::Unordered => preorder(root, &mut out),
        Order::Postorder => postorder(root, &mut out),
        Order::Topological => topological(root, &mut out),
    }

    out.list
}

/// Collects elements, skipping those already emitted.
struct Emitter<'a, T> {
    seen: HashSet<&'a T>,
    list: Vec<T>,
}

impl<T> Default for Emitter<'_, T> {
    fn default() -> Self {
        Self {
            seen: HashSet::new(),
            list: Vec::new(),
        }
    }
}

impl<'a, T> Emitter<'a, T>
where
    T: Clone + Eq + Hash,
{
    fn emit(&mut self, elements: &'a [T]) {
        for element in elements {
            if self.seen.insert(element) {
                self.list.push(element.clone());
            }
        }
    }
}

fn preorder<'a, T>(root: &'a Node<T>, out: &mut Emitter<'a, T>)
where
    T: Clone + Eq + Hash,
{
    let mut visited = HashSet::new();
    let mut stack = vec![root];

    while let Some(node) = stack.pop() {
        if !visited.insert(node.id()) {
            continue;
        }

        out.emit(&node.direct);
        // Reversed, so that the first child is popped first.
        stack.extend(node.children.iter().rev().map(|child| &*child.0));
    }
}

fn postorder<'a, T>(root: &'a Node<T>, out: &mut Emitter<'a, T>)
where
    T: Clone + Eq + Hash,
{
    let mut visited = HashSet::new();
    // (node, index of the next child to enter)
    let mut stack = vec![(root, 0usize)];
    visited.insert(root.id());

    while let Some(&(node, next)) = stack.last() {
        match node.children.get(next) {
            Some(child) => {
                if let Some(top) = stack.last_mut() {
                    top.1 += 1;
                }
                let child = &*child.0;
                if visited.insert(child.id()) {
                    stack.push((child, 0));
                }
            }
            None => {
                out.emit(&node.direct);
                stack.pop();
            }
        }
    }
}

/// Kahn's algorithm over the nodes reachable from `root`: a node is emitted
/// once all of its children were, and among ready nodes the one discovered
/// first (in a preorder walk) goes first.
fn topological<'a, T>(root: &'a Node<T>, out: &mut Emitter<'a, T>)
where
    T: Clone + Eq + Hash,
{
    // Discovery: assign each distinct node its preorder index.
    let mut index: HashMap<usize, usize> = HashMap::new();
    let mut nodes: Vec<&'a Node<T>> = Vec::new();
    let mut stack = vec![root];

    while let Some(node) = stack.pop() {
        if index.contains_key(&node.id()) {
            continue;
        }

        index.insert(node.id(), nodes.len());
        nodes.push(node);
        stack.extend(node.children.iter().rev().map(|child| &*child.0));
    }

    // Edges: pending child count per node, parents per node.
    let mut pending = vec![0usize; nodes.len()];
    let mut parents: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];

    for (parent, node) in nodes.iter().enumerate() {
        let mut distinct = HashSet::new();
        for child in node.children.iter() {
            let child = index[&child.0.id()];
            if distinct.insert(child) {
                pending[parent] += 1;
                parents[child].push(parent);
            }
        }
    }

    let mut ready: BinaryHeap<Reverse<usize>> = pending
        .iter()
        .enumerate()
        .filter(|(_, count)| **count == 0)
        .map(|(i, _)| Reverse(i))
        .collect();

    let mut emitted = 0;
    while let Some(Reverse(i)) = ready.pop() {
        let node = nodes[i];
        out.emit(&node.direct);
        emitted += 1;

        for &parent in &parents[i] {
            pending[parent] -= 1;
            if pending[parent] == 0 {
                ready.push(Reverse(parent));
            }
        }
    }

    // Nodes are immutable once built, a parent can't become its own child.
    if emitted != nodes.len() {
        tracing::error!(
            nodes = nodes.len(),
            emitted,
            "nested set graph contains a cycle, flattened set is incomplete"
        );
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use crate::nested::{NestedSet, NestedSetBuilder, Order};

    fn node(
        order: Order,
        direct: &[&'static str],
        children: &[&NestedSet<&'static str>],
    ) -> NestedSet<&'static str> {
        let mut builder = NestedSetBuilder::new(order);
        builder.add_all(direct.iter().copied());
        builder.add_all_transitive(children.iter().copied()).unwrap();
        builder.build()
    }

    /// top(t) -> [left(l), right(r)], left -> [shared(s)], right -> [shared]
    fn diamond(order: Order) -> NestedSet<&'static str> {
        let shared = node(order, &["s"], &[]);
        let left = node(order, &["l"], &[&shared]);
        let right = node(order, &["r"], &[&shared]);
        node(order, &["t"], &[&left, &right])
    }

    #[test]
    fn test_preorder() {
        assert_eq!(&*diamond(Order::Preorder).to_list(), &["t", "l", "s", "r"]);
    }

    #[test]
    fn test_postorder() {
        assert_eq!(&*diamond(Order::Postorder).to_list(), &["s", "l", "r", "t"]);
    }

    #[test]
    fn test_topological() {
        assert_eq!(
            &*diamond(Order::Topological).to_list(),
            &["s", "l", "r", "t"]
        );
    }

    #[test]
    fn test_topological_dependencies_first() {
        // b is reachable directly from top and through a, it must still come
        // before a because a includes it.
        let order = Order::Topological;
        let b = node(order, &["b"], &[]);
        let a = node(order, &["a"], &[&b]);
        let c = node(order, &["c"], &[]);
        let top = node(order, &["top"], &[&c, &b, &a]);

        let list = top.to_list();
        let pos = |x: &str| list.iter().position(|e| *e == x).unwrap();
        assert!(pos("b") < pos("a"));
        assert!(pos("a") < pos("top"));
        assert!(pos("c") < pos("top"));
        // c and b are both ready at the start, c was discovered first.
        assert_eq!(&*list, &["c", "b", "a", "top"]);
    }

    #[test]
    fn test_first_occurrence_wins() {
        let order = Order::Preorder;
        let child = node(order, &["x", "y"], &[]);
        let top = node(order, &["y"], &[&child]);
        assert_eq!(&*top.to_list(), &["y", "x"]);
    }

    #[test]
    fn test_unordered_is_deterministic() {
        let a = diamond(Order::Unordered);
        let b = diamond(Order::Unordered);
        assert_eq!(a.to_list(), b.to_list());
        assert_eq!(a.to_list(), a.to_list());
        assert_eq!(a.len(), 4);
    }

    #[test]
    fn test_independent_structures_agree() {
        for order in [
            Order::Preorder,
            Order::Postorder,
            Order::Topological,
            Order::Unordered,
        ] {
            assert_eq!(diamond(order).to_list(), diamond(order).to_list());
        }
    }

    /// Each layer unions two distinct nodes that both include the previous
    /// layer, doubling the number of paths. Without memoization by node
    /// identity this would never finish.
    fn tower(order: Order, layers: usize) -> NestedSet<String> {
        let mut current = NestedSet::leaf(order, ["base".to_string()]);

        for layer in 0..layers {
            let mut left = NestedSetBuilder::new(order);
            left.add_direct(format!("l{layer}"))
                .add_transitive(&current)
                .unwrap();
            let mut right = NestedSetBuilder::new(order);
            right
                .add_direct(format!("r{layer}"))
                .add_transitive(&current)
                .unwrap();
            current = NestedSet::union(order, [&left.build(), &right.build()]).unwrap();
        }

        current
    }

    #[test]
    fn test_diamond_tower_is_linear() {
        for order in [
            Order::Preorder,
            Order::Postorder,
            Order::Topological,
            Order::Unordered,
        ] {
            let set = tower(order, 64);
            assert_eq!(set.len(), 1 + 2 * 64);
            assert_eq!(set.node_count(), 1 + 3 * 64);
        }
    }

    #[test]
    fn test_diamond_tower_scaling() {
        let small = Instant::now();
        assert_eq!(tower(Order::Topological, 5).len(), 11);
        let small = small.elapsed();

        let large = Instant::now();
        assert_eq!(tower(Order::Topological, 20).len(), 41);
        let large = large.elapsed();

        // 2^20 paths vs 2^5 paths; linear work keeps the gap small.
        assert!(large < small * 200 + std::time::Duration::from_millis(50));
    }

    #[test]
    fn test_deep_chain() {
        let order = Order::Postorder;
        let mut current = NestedSet::leaf(order, [0u32]);
        for i in 1..50_000u32 {
            let mut builder = NestedSetBuilder::new(order);
            builder.add_direct(i).add_transitive(&current).unwrap();
            current = builder.build();
        }

        let list = current.to_list();
        assert_eq!(list.len(), 50_000);
        assert_eq!(list[0], 0);
        assert_eq!(list[49_999], 49_999);
    }
}
