#![no_main]

use fakecheck_core::{CacheConfig, TimedCache};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }

    // First byte picks the capacity, the rest is an op stream
    let capacity = (data[0] as usize % 16) + 1;
    let cache: TimedCache<u8, u8> = TimedCache::new(CacheConfig::new(capacity, None).unwrap());
    let mut lookups = 0u64;

    for pair in data[1..].chunks(2) {
        let key = pair.get(1).copied().unwrap_or(0);
        match pair[0] % 4 {
            0 | 1 => cache.set(key, pair[0]),
            2 => {
                cache.get(&key);
                lookups += 1;
            }
            _ => {
                cache.remove(&key);
            }
        }
        assert!(cache.len() <= capacity);
    }

    let stats = cache.get_stats();
    assert_eq!(stats.hits + stats.misses, lookups);
    assert!((0.0..=1.0).contains(&stats.hit_rate));
});
