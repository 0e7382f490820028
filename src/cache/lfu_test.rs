//! Tests for the LFU engine: eviction discipline, tie-breaks, iteration
//! order and the group-recycling paths.

#[cfg(test)]
mod tests {
    use crate::cache::lfu::{KeyNotFoundError, LfuCache, DEFAULT_CAPACITY};

    #[test]
    fn test_default_capacity() {
        let cache: LfuCache<u32, u32> = LfuCache::new();
        assert_eq!(cache.capacity(), DEFAULT_CAPACITY);
        assert_eq!(cache.size(), 0);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_get_missing_key_fails() {
        let mut cache: LfuCache<&str, u32> = LfuCache::new();
        assert_eq!(cache.get(&"missing"), Err(KeyNotFoundError));
        assert_eq!(cache.frequency(&"missing"), Err(KeyNotFoundError));
    }

    #[test]
    fn test_zero_capacity_stores_nothing() {
        let mut cache: LfuCache<u32, u32> = LfuCache::with_capacity(0);
        cache.put(1, 1);
        cache.put(2, 2);
        assert_eq!(cache.size(), 0);
        assert_eq!(cache.get(&1), Err(KeyNotFoundError));
        assert_eq!(cache.iter().count(), 0);
    }

    #[test]
    fn test_eviction_removes_least_frequent() {
        let mut cache = LfuCache::with_capacity(2);
        cache.put(1, 1);
        cache.put(2, 2);
        assert_eq!(cache.get(&1), Ok(&1));

        // Key 2 has frequency 1, key 1 has frequency 2.
        cache.put(3, 3);
        assert_eq!(cache.get(&2), Err(KeyNotFoundError));
        assert_eq!(cache.get(&3), Ok(&3));

        // Now 1 and 3 both have frequency 2; 1 was touched less recently.
        cache.put(4, 4);
        assert_eq!(cache.get(&1), Err(KeyNotFoundError));
        assert_eq!(cache.get(&3), Ok(&3));
        assert_eq!(cache.get(&4), Ok(&4));
    }

    #[test]
    fn test_tie_break_evicts_least_recently_touched() {
        let mut cache = LfuCache::with_capacity(2);
        cache.put(1, 1);
        cache.put(2, 2);
        assert_eq!(cache.get(&1), Ok(&1));
        assert_eq!(cache.get(&2), Ok(&2));

        // Both keys sit at frequency 2; key 2 was touched more recently.
        cache.put(3, 3);
        assert_eq!(cache.get(&1), Err(KeyNotFoundError));
        assert_eq!(cache.get(&2), Ok(&2));
    }

    #[test]
    fn test_overwrite_counts_as_touch() {
        let mut cache = LfuCache::with_capacity(2);
        cache.put(1, 1);
        cache.put(1, 9);
        assert_eq!(cache.frequency(&1), Ok(2));
        assert_eq!(cache.get(&1), Ok(&9));
        assert_eq!(cache.size(), 1);
    }

    #[test]
    fn test_frequency_counts_touches_since_insertion() {
        let mut cache = LfuCache::with_capacity(3);
        cache.put("a", 1);
        assert_eq!(cache.frequency(&"a"), Ok(1));

        let _ = cache.get(&"a");
        let _ = cache.get(&"a");
        assert_eq!(cache.frequency(&"a"), Ok(3));

        // Reading the frequency is not itself a touch.
        assert_eq!(cache.frequency(&"a"), Ok(3));
    }

    #[test]
    fn test_reinserted_key_restarts_at_frequency_one() {
        let mut cache = LfuCache::with_capacity(1);
        cache.put(1, 1);
        let _ = cache.get(&1);
        let _ = cache.get(&1);
        assert_eq!(cache.frequency(&1), Ok(3));

        // Evicting 1 reuses its node; the newcomer must start at 1.
        cache.put(2, 2);
        assert_eq!(cache.frequency(&2), Ok(1));
        assert_eq!(cache.get(&1), Err(KeyNotFoundError));
    }

    #[test]
    fn test_iter_orders_by_descending_frequency_then_recency() {
        let mut cache = LfuCache::with_capacity(3);
        cache.put("a", 1);
        cache.put("b", 2);
        cache.put("c", 3);
        let _ = cache.get(&"a");
        let _ = cache.get(&"a");
        let _ = cache.get(&"b");

        let snapshot: Vec<(&str, u32)> = cache.iter().map(|(k, v)| (*k, *v)).collect();
        assert_eq!(snapshot, vec![("a", 1), ("b", 2), ("c", 3)]);
    }

    #[test]
    fn test_iter_recency_within_one_frequency() {
        let mut cache = LfuCache::with_capacity(3);
        cache.put(1, 10);
        cache.put(2, 20);
        cache.put(3, 30);

        // All at frequency 1; most recently inserted first.
        let keys: Vec<u32> = cache.iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, vec![3, 2, 1]);

        // Touching 1 moves it into its own frequency-2 group up front.
        let _ = cache.get(&1);
        let keys: Vec<u32> = cache.iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, vec![1, 3, 2]);
    }

    #[test]
    fn test_iter_supports_early_termination() {
        let mut cache = LfuCache::with_capacity(5);
        for i in 0..5 {
            cache.put(i, i);
        }
        assert_eq!(cache.iter().take(2).count(), 2);
    }

    #[test]
    fn test_eviction_from_multi_entry_high_frequency_group() {
        // Forces the eviction branch where the minimum-frequency group has
        // frequency > 1 and more than one member: the victim node must move
        // into a freshly attached unit-frequency group.
        let mut cache = LfuCache::with_capacity(2);
        cache.put(1, 1);
        cache.put(2, 2);
        let _ = cache.get(&1);
        let _ = cache.get(&2);

        cache.put(3, 3);
        assert_eq!(cache.frequency(&3), Ok(1));
        assert_eq!(cache.frequency(&2), Ok(2));
        assert_eq!(cache.get(&1), Err(KeyNotFoundError));

        let keys: Vec<u32> = cache.iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, vec![2, 3]);
    }

    #[test]
    fn test_eviction_relabels_sole_high_frequency_group() {
        // Single entry at frequency 3 gets evicted: the group is relabelled
        // to frequency 1 in place and the index must follow.
        let mut cache = LfuCache::with_capacity(1);
        cache.put(1, 1);
        let _ = cache.get(&1);
        let _ = cache.get(&1);
        assert_eq!(cache.frequency(&1), Ok(3));

        cache.put(2, 2);
        assert_eq!(cache.frequency(&2), Ok(1));

        // The relabelled group must be findable again through a bump.
        let _ = cache.get(&2);
        assert_eq!(cache.frequency(&2), Ok(2));
    }

    #[test]
    fn test_group_nodes_are_recycled_across_churn() {
        // Walking one key up through many frequencies repeatedly creates and
        // empties groups; the structure must stay coherent throughout.
        let mut cache = LfuCache::with_capacity(3);
        cache.put(1, 1);
        cache.put(2, 2);
        cache.put(3, 3);
        for _ in 0..50 {
            let _ = cache.get(&1);
        }
        for _ in 0..25 {
            let _ = cache.get(&2);
        }
        assert_eq!(cache.frequency(&1), Ok(51));
        assert_eq!(cache.frequency(&2), Ok(26));
        assert_eq!(cache.frequency(&3), Ok(1));

        let keys: Vec<u32> = cache.iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, vec![1, 2, 3]);
        assert_eq!(cache.size(), 3);
    }

    #[test]
    fn test_size_never_exceeds_capacity() {
        let mut cache = LfuCache::with_capacity(4);
        for i in 0..100u32 {
            cache.put(i % 7, i);
            assert!(cache.size() <= cache.capacity());
        }
        assert_eq!(cache.size(), 4);
    }
}
