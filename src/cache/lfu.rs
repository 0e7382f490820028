// Constant-time LFU cache.
//
// Two levels of intrusive lists: an outer list of frequency groups ordered
// by descending frequency, and per-group inner lists of entries ordered by
// recency (most recently touched at the front). The eviction candidate is
// therefore always the last entry of the last group. Hash indices map keys
// to entry nodes and frequencies to group nodes; emptied group nodes are
// recycled through a free list, so steady-state allocation stays bounded by
// the capacity even under adversarial frequency churn.

use std::collections::HashMap;
use std::hash::Hash;

use super::list::{Arena, List, NodeRef};

/// Returned by lookups for keys the cache does not hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("key not found")]
pub struct KeyNotFoundError;

/// Capacity used by [`LfuCache::new`].
pub const DEFAULT_CAPACITY: usize = 5;

/// The (key, value, frequency) triple stored in the cache. Lives as the
/// payload of one entry-arena node, owned by whichever group list currently
/// holds it.
struct Entry<K, V> {
    key: K,
    value: V,
    frequency: u64,
}

/// A cohort of entries sharing one frequency, held in a recency-ordered
/// inner list. Size drops to zero only transiently while an entry is being
/// detached.
struct Group<K, V> {
    frequency: u64,
    size: usize,
    inner: List<Entry<K, V>>,
}

/// Least-frequently-used cache with O(1) get, put, eviction and frequency
/// updates. Single-threaded by design; concurrent callers must serialise
/// externally.
pub struct LfuCache<K, V> {
    capacity: usize,
    size: usize,
    entries: Arena<Entry<K, V>>,
    groups: Arena<Group<K, V>>,
    // Outer list of groups, strictly descending by frequency.
    outer: List<Group<K, V>>,
    key_index: HashMap<K, NodeRef>,
    freq_index: HashMap<u64, NodeRef>,
    // Detached group nodes awaiting reuse. Each keeps its (empty) inner
    // list, so recycling is allocation-free.
    free_groups: Vec<NodeRef>,
}

impl<K, V> LfuCache<K, V>
where
    K: Eq + Hash + Clone,
{
    /// Creates a cache with [`DEFAULT_CAPACITY`].
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Creates a cache bounded to `capacity` entries. Capacity zero is a
    /// valid degenerate cache that stores nothing.
    pub fn with_capacity(capacity: usize) -> Self {
        // The maximum size is known up front, so slot and index memory can
        // be reserved in advance: one slot per entry plus one sentinel per
        // group list, and at most one group per entry alive at a time.
        let mut groups = Arena::with_capacity(capacity + 2);
        let outer = List::empty(&mut groups);
        Self {
            capacity,
            size: 0,
            entries: Arena::with_capacity(2 * capacity + 2),
            groups,
            outer,
            key_index: HashMap::with_capacity(capacity),
            freq_index: HashMap::with_capacity(capacity),
            free_groups: Vec::with_capacity(capacity),
        }
    }

    /// Returns the value stored under `key` and counts the access as a
    /// touch, promoting the entry to the next frequency group.
    pub fn get(&mut self, key: &K) -> Result<&V, KeyNotFoundError> {
        let node = *self.key_index.get(key).ok_or(KeyNotFoundError)?;
        self.bump(node);
        Ok(&self.entries.value(node).value)
    }

    /// Inserts or overwrites `key`. Overwriting counts as a touch. When the
    /// cache is full the least recently used entry of the lowest-frequency
    /// group is evicted and its node reused for the new key.
    pub fn put(&mut self, key: K, value: V) {
        if let Some(&node) = self.key_index.get(&key) {
            self.bump(node);
            self.entries.value_mut(node).value = value;
            return;
        }
        if self.capacity == 0 {
            return;
        }
        if self.size == self.capacity {
            self.evict_and_replace(key, value);
        } else {
            self.insert_fresh(key, value);
        }
    }

    /// Current frequency of `key` without counting a touch.
    pub fn frequency(&self, key: &K) -> Result<u64, KeyNotFoundError> {
        self.key_index
            .get(key)
            .map(|&node| self.entries.value(node).frequency)
            .ok_or(KeyNotFoundError)
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Lazily iterates entries in descending frequency order; within one
    /// frequency, the most recently touched entry comes first.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> + '_ {
        self.outer.refs(&self.groups).flat_map(move |group| {
            self.groups
                .value(group)
                .inner
                .iter(&self.entries)
                .map(|entry| (&entry.key, &entry.value))
        })
    }

    fn insert_fresh(&mut self, key: K, value: V) {
        let node = self.entries.alloc(Entry {
            key: key.clone(),
            value,
            frequency: 1,
        });
        let last = self.outer.last(&self.groups);
        let group = if self.groups.get(last).is_some_and(|g| g.frequency == 1) {
            // A unit-frequency group already sits at the tail; the new entry
            // becomes its most recent member.
            let inner = self.groups.value(last).inner;
            inner.push_front(&mut self.entries, node);
            self.groups.value_mut(last).size += 1;
            last
        } else {
            let group = self.take_group_node(node, 1);
            self.outer.push_back(&mut self.groups, group);
            group
        };
        self.freq_index.insert(1, group);
        self.key_index.insert(key, node);
        self.size += 1;
    }

    /// Reuses the LRU entry of the minimum-frequency group for `key`,
    /// relocating it into a unit-frequency group.
    fn evict_and_replace(&mut self, key: K, value: V) {
        let group = self.outer.last(&self.groups);
        let inner = self.groups.value(group).inner;
        let node = inner.last(&self.entries);

        let entry = self.entries.value_mut(node);
        let old_key = std::mem::replace(&mut entry.key, key.clone());
        entry.value = value;
        self.key_index.remove(&old_key);

        let frequency = self.groups.value(group).frequency;
        let group_size = self.groups.value(group).size;
        if frequency != 1 {
            if group_size == 1 {
                // Sole member: relabel the group to frequency 1 in place.
                self.freq_index.remove(&frequency);
                self.groups.value_mut(group).frequency = 1;
                self.freq_index.insert(1, group);
                self.entries.value_mut(node).frequency = 1;
            } else {
                self.groups.value_mut(group).size -= 1;
                self.entries.unlink(node);
                let fresh = self.take_group_node(node, 1);
                self.outer.push_back(&mut self.groups, fresh);
                self.freq_index.insert(1, fresh);
            }
        } else if group_size != 1 {
            // Already in the unit-frequency group; move to the most recent
            // position.
            self.entries.unlink(node);
            inner.push_front(&mut self.entries, node);
        }
        self.key_index.insert(key, node);
    }

    /// Raises the entry's frequency by one and relocates it to the front of
    /// the matching group, creating or relabelling groups as needed.
    fn bump(&mut self, node: NodeRef) {
        let old_frequency = self.entries.value(node).frequency;
        let group = self.freq_index[&old_frequency];
        let new_frequency = old_frequency + 1;

        self.groups.value_mut(group).size -= 1;
        let emptied = self.groups.value(group).size == 0;
        if emptied {
            self.freq_index.remove(&old_frequency);
        }

        // The outer list is descending, so the previous neighbour is the
        // higher-frequency side. For the first group that neighbour is the
        // sentinel, whose probe yields None and never matches.
        let higher = self.groups.prev(group);
        if self.groups.get(higher).is_some_and(|g| g.frequency == new_frequency) {
            self.entries.unlink(node);
            let inner = self.groups.value(higher).inner;
            inner.push_front(&mut self.entries, node);
            self.groups.value_mut(higher).size += 1;
            self.entries.value_mut(node).frequency = new_frequency;
            if emptied {
                self.groups.unlink(group);
                self.free_groups.push(group);
            }
        } else if emptied {
            // The entry was alone in its group: relabel the group in place,
            // keeping its outer-list position.
            let g = self.groups.value_mut(group);
            g.frequency = new_frequency;
            g.size = 1;
            self.freq_index.insert(new_frequency, group);
            self.entries.value_mut(node).frequency = new_frequency;
        } else {
            self.entries.unlink(node);
            let fresh = self.take_group_node(node, new_frequency);
            self.freq_index.insert(new_frequency, fresh);
            self.groups.insert_before(fresh, group);
        }
    }

    /// Recycles a detached group node from the free list, or allocates a
    /// fresh one; either way the node ends up holding exactly `node` at the
    /// given frequency. The returned group is detached from the outer list.
    fn take_group_node(&mut self, node: NodeRef, frequency: u64) -> NodeRef {
        self.entries.value_mut(node).frequency = frequency;
        if let Some(group) = self.free_groups.pop() {
            let inner = self.groups.value(group).inner;
            inner.push_front(&mut self.entries, node);
            let g = self.groups.value_mut(group);
            g.frequency = frequency;
            g.size = 1;
            group
        } else {
            let inner = List::new(&mut self.entries, node);
            self.groups.alloc(Group {
                frequency,
                size: 1,
                inner,
            })
        }
    }
}

impl<K, V> Default for LfuCache<K, V>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}
