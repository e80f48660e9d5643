#![cfg(test)]
#![allow(missing_docs)]

use crate::LruMap;
use rand::prelude::*;

/// Reference model: a hashbrown map for the contents plus a vector holding the expected LRU to
/// MRU order.
#[derive(Default)]
struct Model {
    map: hashbrown::HashMap<u64, u64>,
    order: Vec<u64>,
}

impl Model {
    fn touch(&mut self, key: u64) {
        let position = self.order.iter().position(|&k| k == key).unwrap();
        self.order.remove(position);
        self.order.push(key);
    }

    fn insert(&mut self, key: u64, value: u64) -> Option<u64> {
        let previous = self.map.insert(key, value);
        if previous.is_some() {
            self.touch(key);
        } else {
            self.order.push(key);
        }
        previous
    }

    fn get(&mut self, key: u64) -> Option<u64> {
        let value = self.map.get(&key).copied();
        if value.is_some() {
            self.touch(key);
        }
        value
    }

    fn remove(&mut self, key: u64) -> Option<u64> {
        let value = self.map.remove(&key);
        if value.is_some() {
            self.order.retain(|&k| k != key);
        }
        value
    }

    fn remove_lru(&mut self) -> Option<(u64, u64)> {
        if self.order.is_empty() {
            return None;
        }
        let key = self.order.remove(0);
        let value = self.map.remove(&key).unwrap();
        Some((key, value))
    }
}

fn assert_same_order(map: &LruMap<u64, u64>, model: &Model) {
    let entries: Vec<(u64, u64)> = map.iter().map(|(&k, &v)| (k, v)).collect();
    let expected: Vec<(u64, u64)> = model.order.iter().map(|&k| (k, model.map[&k])).collect();
    assert_eq!(entries, expected);
    assert_eq!(map.len(), model.map.len());
}

#[test]
fn random_ops_match_the_model() {
    for seed in 0..8 {
        let mut rng = rand_pcg::Pcg64::seed_from_u64(seed);
        let mut map: LruMap<u64, u64> = LruMap::new();
        let mut model = Model::default();
        for step in 0..4000 {
            let key = rng.gen_range(0..200);
            match rng.gen_range(0..10) {
                0..=3 => {
                    let value = rng.gen();
                    assert_eq!(map.insert(key, value), model.insert(key, value));
                }
                4..=6 => {
                    assert_eq!(map.get(&key).copied(), model.get(key));
                }
                7..=8 => {
                    assert_eq!(map.remove(&key), model.remove(key));
                }
                _ => {
                    assert_eq!(map.remove_lru(), model.remove_lru());
                }
            }
            if step % 256 == 0 {
                assert_same_order(&map, &model);
                map.check();
            }
        }
        assert_same_order(&map, &model);
        map.check();
    }
}

#[test]
fn lookup_round_trip() {
    let mut rng = rand_pcg::Pcg64::seed_from_u64(10);
    let mut map: LruMap<u64, u64> = LruMap::new();
    let keys: Vec<u64> = (0..1000).map(|i| i * 2).collect();
    for &key in &keys {
        map.insert(key, rng.gen());
    }
    let mut rng = rand_pcg::Pcg64::seed_from_u64(10);
    for &key in &keys {
        let expected: u64 = rng.gen();
        assert_eq!(map.get(&key), Some(&expected));
    }
    for key in (0..1000).map(|i| i * 2 + 1) {
        assert_eq!(map.get(&key), None);
    }
    map.check();
}

#[test]
fn insert_replaces_and_returns_the_previous_value() {
    let mut map: LruMap<u64, u64> = LruMap::new();
    assert_eq!(map.insert(7, 1), None);
    assert_eq!(map.insert(7, 2), Some(1));
    assert_eq!(map.get(&7), Some(&2));
    assert_eq!(map.len(), 1);
    map.check();
}

#[test]
fn recency_follows_the_last_touch() {
    let mut rng = rand_pcg::Pcg64::seed_from_u64(11);
    let mut map: LruMap<u64, u64> = LruMap::new();
    let mut model = Model::default();
    for key in 0..50 {
        map.insert(key, key);
        model.insert(key, key);
    }
    for _ in 0..2000 {
        let key = rng.gen_range(0..50);
        if rng.gen() {
            assert!(map.get(&key).is_some());
            model.get(key);
        } else {
            map.insert(key, key + 1);
            model.insert(key, key + 1);
        }
        assert_same_order(&map, &model);
    }
    // draining LRU first returns the keys in the modelled order
    let drained: Vec<u64> = std::iter::from_fn(|| map.remove_lru()).map(|(k, _)| k).collect();
    assert_eq!(drained, model.order);
}

/// Drives the table to a high load factor and churns deletes against inserts so tombstones
/// accumulate until in-place rehashes reclaim them. The capacity must never change and every
/// operation must keep matching the model.
#[test]
fn tombstone_churn_rehashes_in_place() {
    let mut rng = rand_pcg::Pcg64::seed_from_u64(12);
    for &fill in &[512usize, 716, 800] {
        // loads 0.5, 0.7 and 0.78 at capacity 1024
        let mut map: LruMap<u64, u64> = LruMap::with_capacity(1024);
        let mut model = Model::default();
        let capacity = map.capacity();
        assert_eq!(capacity, 1024);

        let mut next_key = 0;
        for _ in 0..fill {
            map.insert(next_key, next_key);
            model.insert(next_key, next_key);
            next_key += 1;
        }

        let mut reclaimed = false;
        for _ in 0..6000 {
            let victim = *model.order.choose(&mut rng).unwrap();
            let tombstones = map.tombstone_count();
            assert_eq!(map.remove(&victim), model.remove(victim));
            map.insert(next_key, next_key);
            model.insert(next_key, next_key);
            next_key += 1;
            // deleting and reinserting can move the count by one; only a rehash drops it by
            // the whole accumulated amount
            if map.tombstone_count() + 50 < tombstones {
                reclaimed = true;
            }
            // a fresh key must be findable and a dead one must stay dead
            assert_eq!(map.get(&victim), None);
            assert_eq!(map.get(&(next_key - 1)), Some(&(next_key - 1)));
            model.get(next_key - 1);
        }
        // at low loads deletes land next to empty slots and rarely leave tombstones behind, so
        // the saturation trigger is only guaranteed to fire for the denser fills
        if fill >= 716 {
            assert!(reclaimed, "no in-place rehash happened at fill {fill}");
        }
        assert_eq!(map.capacity(), capacity, "the table must not grow");
        assert_same_order(&map, &model);
        map.check();
    }
}

#[test]
fn growing_preserves_order_and_contents() {
    let mut map: LruMap<u64, u64> = LruMap::with_capacity(16);
    let mut model = Model::default();
    assert_eq!(map.capacity(), 16);
    for key in 0..200 {
        map.insert(key, !key);
        model.insert(key, !key);
    }
    assert!(map.capacity() > 16);
    assert_same_order(&map, &model);
    map.check();
}

#[test]
fn tombstones_are_reclaimed_without_growing() {
    let mut map: LruMap<u64, u64> = LruMap::with_capacity(1024);
    for key in 0..890 {
        map.insert(key, key);
    }
    // deleting out of a table at load 0.87 leaves mostly full probe windows behind
    for key in 0..500 {
        assert_eq!(map.remove(&key), Some(key));
    }
    assert!(
        map.tombstone_count() >= 200,
        "expected tombstones, got {}",
        map.tombstone_count()
    );
    for key in 1000..1200 {
        map.insert(key, key);
    }
    assert_eq!(map.len(), 590);
    assert_eq!(map.capacity(), 1024, "reclamation must not grow the table");
    for key in 500..890 {
        assert_eq!(map.get(&key), Some(&key));
    }
    for key in 1000..1200 {
        assert_eq!(map.get(&key), Some(&key));
    }
    for key in 0..500 {
        assert_eq!(map.get(&key), None);
    }
    map.check();
}

#[test]
fn retain_visits_lru_first_and_tolerates_deletion() {
    let mut map: LruMap<u64, u64> = LruMap::new();
    for key in 0..100 {
        map.insert(key, key);
    }
    let mut visited = Vec::new();
    let mut step = 0;
    map.retain(|&key, _| {
        visited.push(key);
        step += 1;
        step % 2 == 0
    });
    assert_eq!(visited, (0..100).collect::<Vec<u64>>());
    assert_eq!(map.len(), 50);
    let kept: Vec<u64> = map.keys().copied().collect();
    assert_eq!(kept, (0..100).filter(|k| k % 2 == 1).collect::<Vec<u64>>());
    map.retain(|_, _| false);
    assert_eq!(map.len(), 0);
    map.check();
}

#[test]
fn clone_preserves_contents_and_order() {
    let mut map: LruMap<u64, u64> = LruMap::new();
    for key in 0..100 {
        map.insert(key, key * 3);
    }
    assert!(map.get(&17).is_some());
    let clone = map.clone();
    let original: Vec<(u64, u64)> = map.iter().map(|(&k, &v)| (k, v)).collect();
    let cloned: Vec<(u64, u64)> = clone.iter().map(|(&k, &v)| (k, v)).collect();
    assert_eq!(original, cloned);
    clone.check();
}

#[test]
fn into_iter_drains_lru_first() {
    let mut map: LruMap<u64, u64> = LruMap::new();
    for key in 0..10 {
        map.insert(key, key);
    }
    map.get(&0);
    let drained: Vec<u64> = map.into_iter().map(|(k, _)| k).collect();
    assert_eq!(drained, [1, 2, 3, 4, 5, 6, 7, 8, 9, 0]);
}

#[test]
fn clear_keeps_the_allocation() {
    let mut map: LruMap<u64, u64> = LruMap::with_capacity(64);
    for key in 0..50 {
        map.insert(key, key);
    }
    let capacity = map.capacity();
    map.clear();
    assert_eq!(map.len(), 0);
    assert_eq!(map.capacity(), capacity);
    assert_eq!(map.lru(), None);
    assert_eq!(map.iter().count(), 0);
    map.insert(1, 2);
    assert_eq!(map.get(&1), Some(&2));
    map.check();
}

#[test]
fn values_are_dropped_exactly_once() {
    use std::rc::Rc;

    let tracker = Rc::new(());
    let mut map: LruMap<u64, Rc<()>> = LruMap::new();
    for key in 0..100 {
        map.insert(key, tracker.clone());
    }
    for key in 0..30 {
        map.remove(&key);
    }
    map.insert(5, tracker.clone());
    map.remove_lru();
    drop(map);
    assert_eq!(Rc::strong_count(&tracker), 1);
}
