// Arena-backed intrusive doubly linked list used by the LFU engine.
//
// Nodes live in an `Arena` slot vector and are addressed by `NodeRef`
// handles, so the same node can be spliced between lists sharing that arena
// without any allocation. Every list owns one sentinel slot; an empty list is
// a sentinel linked to itself, which keeps edge handling uniform.

use std::marker::PhantomData;

/// Handle to a node slot inside an [`Arena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeRef(usize);

struct Slot<V> {
    next: usize,
    prev: usize,
    // None marks a sentinel slot; real nodes always carry a value.
    value: Option<V>,
}

/// Slot storage shared by every list built on top of it.
pub struct Arena<V> {
    slots: Vec<Slot<V>>,
}

impl<V> Arena<V> {
    pub fn new() -> Self {
        Self { slots: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
        }
    }

    /// Allocates a detached node holding `value`. The node links to itself
    /// until it is spliced into a list.
    pub fn alloc(&mut self, value: V) -> NodeRef {
        self.push_slot(Some(value))
    }

    fn alloc_sentinel(&mut self) -> NodeRef {
        self.push_slot(None)
    }

    fn push_slot(&mut self, value: Option<V>) -> NodeRef {
        let index = self.slots.len();
        self.slots.push(Slot {
            next: index,
            prev: index,
            value,
        });
        NodeRef(index)
    }

    pub fn next(&self, node: NodeRef) -> NodeRef {
        NodeRef(self.slots[node.0].next)
    }

    pub fn prev(&self, node: NodeRef) -> NodeRef {
        NodeRef(self.slots[node.0].prev)
    }

    /// Value of `node`, or None when `node` is a sentinel. Sentinel probing
    /// through this accessor is how callers compare against a neighbour that
    /// may be the list boundary.
    pub fn get(&self, node: NodeRef) -> Option<&V> {
        self.slots[node.0].value.as_ref()
    }

    pub fn get_mut(&mut self, node: NodeRef) -> Option<&mut V> {
        self.slots[node.0].value.as_mut()
    }

    /// Value of `node`.
    ///
    /// Panics when `node` is a sentinel; dereferencing a list boundary is a
    /// programmer error.
    pub fn value(&self, node: NodeRef) -> &V {
        self.slots[node.0].value.as_ref().expect("sentinel node holds no value")
    }

    pub fn value_mut(&mut self, node: NodeRef) -> &mut V {
        self.slots[node.0].value.as_mut().expect("sentinel node holds no value")
    }

    /// Splices `node` immediately before `anchor` in O(1).
    pub fn insert_before(&mut self, node: NodeRef, anchor: NodeRef) {
        let prev = self.slots[anchor.0].prev;
        self.slots[node.0].prev = prev;
        self.slots[node.0].next = anchor.0;
        self.slots[prev].next = node.0;
        self.slots[anchor.0].prev = node.0;
    }

    /// Detaches `node` from its current list in O(1). The node's own links
    /// are left as-is; callers must not traverse a detached node.
    pub fn unlink(&mut self, node: NodeRef) {
        let Slot { next, prev, .. } = self.slots[node.0];
        self.slots[prev].next = next;
        self.slots[next].prev = prev;
    }
}

impl<V> Default for Arena<V> {
    fn default() -> Self {
        Self::new()
    }
}

/// A doubly linked list over nodes of an [`Arena`]. The list itself is just
/// a sentinel handle, so it is `Copy` and all mutation goes through the
/// arena.
pub struct List<V> {
    sentinel: NodeRef,
    _marker: PhantomData<fn() -> V>,
}

impl<V> Clone for List<V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<V> Copy for List<V> {}

impl<V> List<V> {
    /// Creates a list with `node` spliced in as its sole element.
    pub fn new(arena: &mut Arena<V>, node: NodeRef) -> Self {
        let list = Self::empty(arena);
        list.push_front(arena, node);
        list
    }

    /// Creates an empty list: a fresh sentinel linked to itself.
    pub fn empty(arena: &mut Arena<V>) -> Self {
        Self {
            sentinel: arena.alloc_sentinel(),
            _marker: PhantomData,
        }
    }

    /// First element, or the sentinel itself when the list is empty.
    pub fn first(&self, arena: &Arena<V>) -> NodeRef {
        arena.next(self.sentinel)
    }

    /// Last element, or the sentinel itself when the list is empty.
    pub fn last(&self, arena: &Arena<V>) -> NodeRef {
        arena.prev(self.sentinel)
    }

    pub fn is_empty(&self, arena: &Arena<V>) -> bool {
        arena.next(self.sentinel) == self.sentinel
    }

    /// Makes `node` the first element.
    pub fn push_front(&self, arena: &mut Arena<V>, node: NodeRef) {
        let first = arena.next(self.sentinel);
        arena.insert_before(node, first);
    }

    /// Makes `node` the last element.
    pub fn push_back(&self, arena: &mut Arena<V>, node: NodeRef) {
        arena.insert_before(node, self.sentinel);
    }

    /// Iterates node handles from first to last, never yielding the
    /// sentinel.
    pub fn refs<'a>(&self, arena: &'a Arena<V>) -> Refs<'a, V> {
        Refs {
            arena,
            current: arena.next(self.sentinel),
            sentinel: self.sentinel,
        }
    }

    /// Iterates values from first to last. Dropping the iterator terminates
    /// the walk early.
    pub fn iter<'a>(&self, arena: &'a Arena<V>) -> impl Iterator<Item = &'a V> {
        let refs = self.refs(arena);
        refs.map(move |node| arena.value(node))
    }
}

/// Forward iterator over the node handles of a list.
pub struct Refs<'a, V> {
    arena: &'a Arena<V>,
    current: NodeRef,
    sentinel: NodeRef,
}

impl<V> Iterator for Refs<'_, V> {
    type Item = NodeRef;

    fn next(&mut self) -> Option<NodeRef> {
        if self.current == self.sentinel {
            return None;
        }
        let node = self.current;
        self.current = self.arena.next(node);
        Some(node)
    }
}
