//! Immutable, structurally shared sets with a declared traversal order.
//!
//! A [`NestedSet`] is a node holding some direct elements and references to
//! other, already built, nested sets. Unions never copy elements: they
//! allocate a new node pointing at the operands. The full content of a set is
//! only materialised when someone asks for it through
//! [`NestedSet::to_list`], and the traversal behind it visits every distinct
//! node once, no matter how many paths lead to it.
//!
//! ## Diamonds
//!
//! If `B` and `C` both include the set `A`, and `D` includes `B` and `C`,
//! flattening `D` walks `A` once. Identity is the node allocation, not its
//! content, so the cost of a flatten is bound by the number of distinct nodes
//! and edges in the graph instead of the number of root-to-leaf paths.
//!
//! ## Cycles
//!
//! Children are `Arc`s to nodes that were fully constructed before their
//! parent and nodes are never mutated afterwards, so a set can't reach itself.

mod digest;
mod flatten;

use std::collections::HashSet;
use std::fmt::{self, Debug, Display};
use std::hash::Hash;
use std::sync::{Arc, OnceLock};

use serde::{Deserialize, Serialize};

use crate::core::Hash32;
use crate::error::NestedSetError;

/// Traversal order declared by a nested set. It dictates how the set is
/// flattened; sets of different orders can't be merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Order {
    /// Direct elements of a node come before the elements of its children,
    /// children are visited left to right.
    Preorder,
    /// Elements of the children come before the direct elements of a node.
    Postorder,
    /// Dependencies first: the elements of a node come after everything the
    /// node transitively includes. Ties are broken by discovery order.
    /// This is the classpath order.
    Topological,
    /// Membership only, the sequence is still deterministic per node.
    Unordered,
}

impl Order {
    pub(crate) fn tag(self) -> u8 {
        match self {
            Order::Preorder => 0,
            Order::Postorder => 1,
            Order::Topological => 2,
            Order::Unordered => 3,
        }
    }
}

impl Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Order::Preorder => "preorder",
            Order::Postorder => "postorder",
            Order::Topological => "topological",
            Order::Unordered => "unordered",
        })
    }
}

pub(crate) struct Node<T> {
    order: Order,
    direct: Box<[T]>,
    children: Box<[NestedSet<T>]>,
    /// Result of the first flatten, shared by every later caller.
    flattened: OnceLock<Arc<[T]>>,
    digest: OnceLock<Hash32>,
}

impl<T> Node<T> {
    /// Identity of the node, used as the memoization key of traversals.
    fn id(&self) -> usize {
        self as *const Node<T> as usize
    }
}

impl<T> Drop for Node<T> {
    fn drop(&mut self) {
        // Unlink long chains iteratively instead of recursing once per level.
        let mut stack = std::mem::take(&mut self.children).into_vec();
        while let Some(set) = stack.pop() {
            if let Some(mut node) = Arc::into_inner(set.0) {
                stack.extend(std::mem::take(&mut node.children).into_vec());
            }
        }
    }
}

/// An immutable set of elements with structural sharing and O(1) union.
///
/// Cloning a `NestedSet` clones a pointer.
pub struct NestedSet<T>(Arc<Node<T>>);

impl<T> Clone for NestedSet<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T> NestedSet<T> {
    pub fn order(&self) -> Order {
        self.0.order
    }

    /// True when the set has no elements at all.
    ///
    /// Empty operands are never stored as children, so this doesn't need to
    /// traverse anything.
    pub fn is_empty(&self) -> bool {
        self.0.direct.is_empty() && self.0.children.is_empty()
    }

    /// True when this node has no children.
    pub fn is_leaf(&self) -> bool {
        self.0.children.is_empty()
    }

    /// Elements stored directly on this node.
    pub fn direct(&self) -> &[T] {
        &self.0.direct
    }

    /// Sets referenced by this node, in reference order.
    pub fn children(&self) -> &[NestedSet<T>] {
        &self.0.children
    }

    /// True when both handles refer to the same node.
    pub fn ptr_eq(&self, other: &NestedSet<T>) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Number of distinct nodes reachable from this one, itself included.
    pub fn node_count(&self) -> usize {
        let mut visited = HashSet::new();
        let mut stack = vec![&*self.0];

        while let Some(node) = stack.pop() {
            if visited.insert(node.id()) {
                stack.extend(node.children.iter().map(|child| &*child.0));
            }
        }

        visited.len()
    }
}

impl<T> NestedSet<T>
where
    T: Clone + Eq + Hash,
{
    /// An empty set of the given order.
    pub fn empty(order: Order) -> Self {
        Self::from_parts(order, Vec::new(), Vec::new())
    }

    /// A set without children, holding `elements` without duplicates. The
    /// first occurrence of an element wins.
    pub fn leaf(order: Order, elements: impl IntoIterator<Item = T>) -> Self {
        Self::from_parts(order, dedup(elements), Vec::new())
    }

    /// A set referencing every operand. No element is copied.
    ///
    /// Fails when the order of an operand differs from `order`.
    pub fn union<'a, I>(order: Order, operands: I) -> Result<Self, NestedSetError>
    where
        T: 'a,
        I: IntoIterator<Item = &'a NestedSet<T>>,
    {
        let mut builder = NestedSetBuilder::new(order);
        for operand in operands {
            builder.add_transitive(operand)?;
        }
        Ok(builder.build())
    }

    /// Flattens the set into a deduplicated sequence following its order.
    ///
    /// The result of the first call is cached on the node. Concurrent first
    /// calls may compute it more than once, they all return equal sequences.
    pub fn to_list(&self) -> Arc<[T]> {
        if let Some(list) = self.0.flattened.get() {
            tracing::trace!(order = %self.0.order, "flatten cache hit");
            return Arc::clone(list);
        }

        let list: Arc<[T]> = flatten::flatten(&self.0).into();
        tracing::trace!(order = %self.0.order, len = list.len(), "flattened nested set");

        // Another thread may have won the race, its value is equal to ours.
        let _ = self.0.flattened.set(Arc::clone(&list));
        match self.0.flattened.get() {
            Some(stored) => Arc::clone(stored),
            None => list,
        }
    }

    /// Flattens the set and checks whether it contains `element`.
    pub fn contains(&self, element: &T) -> bool {
        self.to_list().contains(element)
    }

    /// Number of distinct elements in the set. Flattens the set.
    pub fn len(&self) -> usize {
        self.to_list().len()
    }

    /// Structural BLAKE3 fingerprint of the set.
    ///
    /// Identical structures built independently share the same digest.
    pub fn digest(&self) -> Hash32 {
        digest::digest(self)
    }

    fn from_parts(order: Order, direct: Vec<T>, children: Vec<NestedSet<T>>) -> Self {
        Self(Arc::new(Node {
            order,
            direct: direct.into_boxed_slice(),
            children: children.into_boxed_slice(),
            flattened: OnceLock::new(),
            digest: OnceLock::new(),
        }))
    }
}

impl<T> Debug for NestedSet<T>
where
    T: Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NestedSet")
            .field("order", &self.0.order)
            .field("direct", &self.0.direct)
            .field("children", &self.0.children.len())
            .finish()
    }
}

impl<T> Serialize for NestedSet<T>
where
    T: Clone + Eq + Hash + Serialize,
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_seq(self.to_list().iter())
    }
}

/// Accumulates direct elements and child sets for a single new node.
///
/// This is how a node with both own elements and references is made: the
/// direct elements are stored on the node, the transitive sets become its
/// children.
#[derive(Clone)]
pub struct NestedSetBuilder<T> {
    order: Order,
    direct: Vec<T>,
    transitive: Vec<NestedSet<T>>,
}

impl<T> NestedSetBuilder<T>
where
    T: Clone + Eq + Hash,
{
    pub fn new(order: Order) -> Self {
        Self {
            order,
            direct: Vec::new(),
            transitive: Vec::new(),
        }
    }

    pub fn order(&self) -> Order {
        self.order
    }

    pub fn add_direct(&mut self, element: T) -> &mut Self {
        self.direct.push(element);
        self
    }

    pub fn add_all(&mut self, elements: impl IntoIterator<Item = T>) -> &mut Self {
        self.direct.extend(elements);
        self
    }

    /// Adds a reference to `set`. Fails when `set` was declared with an order
    /// other than the one of this builder.
    pub fn add_transitive(&mut self, set: &NestedSet<T>) -> Result<&mut Self, NestedSetError> {
        if set.order() != self.order {
            return Err(NestedSetError::OrderConflict {
                expected: self.order,
                found: set.order(),
            });
        }

        if !set.is_empty() && !self.transitive.iter().any(|known| known.ptr_eq(set)) {
            self.transitive.push(set.clone());
        }

        Ok(self)
    }

    /// Adds references to every set in `sets`, see [`add_transitive`](Self::add_transitive).
    pub fn add_all_transitive<'a, I>(&mut self, sets: I) -> Result<&mut Self, NestedSetError>
    where
        T: 'a,
        I: IntoIterator<Item = &'a NestedSet<T>>,
    {
        for set in sets {
            self.add_transitive(set)?;
        }
        Ok(self)
    }

    pub fn build(self) -> NestedSet<T> {
        let direct = dedup(self.direct);
        let mut transitive = self.transitive;

        // A node that would only wrap one other node is that node.
        if direct.is_empty()
            && transitive.len() == 1
            && let Some(only) = transitive.pop()
        {
            return only;
        }

        NestedSet::from_parts(self.order, direct, transitive)
    }
}

fn dedup<T>(elements: impl IntoIterator<Item = T>) -> Vec<T>
where
    T: Clone + Eq + Hash,
{
    let mut seen = HashSet::new();
    let mut out = Vec::new();

    for element in elements {
        if seen.insert(element.clone()) {
            out.push(element);
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(order: Order, items: &[&'static str]) -> NestedSet<&'static str> {
        NestedSet::leaf(order, items.iter().copied())
    }

    #[test]
    fn test_leaf_dedup() {
        let set = leaf(Order::Preorder, &["a", "b", "a", "c", "b"]);
        assert_eq!(set.direct(), &["a", "b", "c"]);
        assert_eq!(&*set.to_list(), &["a", "b", "c"]);
        assert!(set.is_leaf());
    }

    #[test]
    fn test_union_is_set_union() {
        for order in [
            Order::Preorder,
            Order::Postorder,
            Order::Topological,
            Order::Unordered,
        ] {
            let a = leaf(order, &["a", "b", "c"]);
            let b = leaf(order, &["c", "d"]);
            let union = NestedSet::union(order, [&a, &b]).unwrap();

            let mut expected: Vec<_> = a.to_list().iter().chain(b.to_list().iter()).copied().collect();
            expected.sort();
            expected.dedup();

            let mut got = union.to_list().to_vec();
            got.sort();
            assert_eq!(got, expected, "order {order}");
            assert_eq!(union.len(), 4);
        }
    }

    #[test]
    fn test_union_shares_operands() {
        let a = leaf(Order::Preorder, &["a"]);
        let b = leaf(Order::Preorder, &["b"]);
        let union = NestedSet::union(Order::Preorder, [&a, &b]).unwrap();

        assert_eq!(union.children().len(), 2);
        assert!(union.children()[0].ptr_eq(&a));
        assert!(union.children()[1].ptr_eq(&b));
        assert!(union.direct().is_empty());
    }

    #[test]
    fn test_union_order_conflict() {
        let a = leaf(Order::Preorder, &["a"]);
        let b = leaf(Order::Topological, &["b"]);

        let err = NestedSet::union(Order::Preorder, [&a, &b]).unwrap_err();
        assert_eq!(
            err,
            NestedSetError::OrderConflict {
                expected: Order::Preorder,
                found: Order::Topological,
            }
        );
    }

    #[test]
    fn test_order_conflict_on_empty_operand() {
        let empty = NestedSet::<&str>::empty(Order::Unordered);
        let result = NestedSet::union(Order::Preorder, [&empty]);
        assert!(matches!(result, Err(NestedSetError::OrderConflict { .. })));
    }

    #[test]
    fn test_empty_operands_are_dropped() {
        let empty = NestedSet::empty(Order::Preorder);
        let a = leaf(Order::Preorder, &["a"]);
        let mut builder = NestedSetBuilder::new(Order::Preorder);
        builder
            .add_direct("x")
            .add_transitive(&empty)
            .unwrap()
            .add_transitive(&a)
            .unwrap();
        let set = builder.build();

        assert_eq!(set.children().len(), 1);
        assert_eq!(&*set.to_list(), &["x", "a"]);
    }

    #[test]
    fn test_single_operand_union_is_operand() {
        let a = leaf(Order::Topological, &["a"]);
        let union = NestedSet::union(Order::Topological, [&a, &a]).unwrap();
        assert!(union.ptr_eq(&a));
    }

    #[test]
    fn test_empty() {
        let set = NestedSet::<u32>::empty(Order::Unordered);
        assert!(set.is_empty());
        assert!(set.to_list().is_empty());
        assert_eq!(set.node_count(), 1);
    }

    #[test]
    fn test_to_list_is_cached() {
        let a = leaf(Order::Preorder, &["a", "b"]);
        let first = a.to_list();
        let second = a.to_list();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_concurrent_first_flatten_agrees() {
        let shared = leaf(Order::Topological, &["s", "t"]);
        let mut left = NestedSetBuilder::new(Order::Topological);
        left.add_direct("l").add_transitive(&shared).unwrap();
        let mut right = NestedSetBuilder::new(Order::Topological);
        right.add_direct("r").add_transitive(&shared).unwrap();
        let top =
            NestedSet::union(Order::Topological, [&left.build(), &right.build()]).unwrap();

        let lists: Vec<Arc<[&str]>> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8).map(|_| s.spawn(|| top.to_list())).collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        for list in &lists {
            assert_eq!(&**list, &["s", "t", "l", "r"]);
        }
        assert_eq!(top.to_list(), lists[0]);
    }

    #[test]
    fn test_node_count_diamond() {
        let shared = leaf(Order::Preorder, &["s"]);
        let mut left = NestedSetBuilder::new(Order::Preorder);
        left.add_direct("l").add_transitive(&shared).unwrap();
        let left = left.build();
        let mut right = NestedSetBuilder::new(Order::Preorder);
        right.add_direct("r").add_transitive(&shared).unwrap();
        let right = right.build();
        let top = NestedSet::union(Order::Preorder, [&left, &right]).unwrap();

        assert_eq!(top.node_count(), 4);
    }

    #[test]
    fn test_serialize_flattens() {
        let a = leaf(Order::Preorder, &["a"]);
        let mut builder = NestedSetBuilder::new(Order::Preorder);
        builder.add_direct("b").add_transitive(&a).unwrap();
        let json = serde_json::to_string(&builder.build()).unwrap();
        assert_eq!(json, r#"["b","a"]"#);
    }

    #[test]
    fn test_order_serde() {
        assert_eq!(
            serde_json::to_string(&Order::Topological).unwrap(),
            r#""topological""#
        );
        assert_eq!(Order::Unordered.to_string(), "unordered");
    }
}
