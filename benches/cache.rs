use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use fakecheck_core::*;
use std::time::Duration;

fn text(i: usize) -> String {
    format!("Breaking news number {} about the   situation at the border, sources say", i)
}

// ===== Micro Benchmarks =====

fn bench_fingerprint(c: &mut Criterion) {
    let short = text(1);
    let long = text(1).repeat(200);

    c.bench_function("fingerprint_short", |b| b.iter(|| black_box(Fingerprint::of(&short))));
    c.bench_function("fingerprint_long", |b| b.iter(|| black_box(Fingerprint::of(&long))));
}

fn bench_cache_hit(c: &mut Criterion) {
    let cache = TimedCache::new(CacheConfig::new(1000, Some(Duration::from_secs(600))).unwrap());
    let key = Fingerprint::of(&text(0));
    cache.set(key.clone(), 0.42f64);

    c.bench_function("cache_hit", |b| {
        b.iter(|| {
            black_box(cache.get(&key));
        })
    });
}

fn bench_cache_eviction(c: &mut Criterion) {
    let mut group = c.benchmark_group("cache_insert_at_capacity");

    for &capacity in &[100usize, 1000, 10_000] {
        let cache = TimedCache::new(CacheConfig::new(capacity, None).unwrap());
        for i in 0..capacity {
            cache.set(i, i);
        }
        let mut next = capacity;
        group.bench_with_input(BenchmarkId::from_parameter(capacity), &capacity, |b, _| {
            b.iter(|| {
                next += 1;
                cache.set(next, next);
            })
        });
    }

    group.finish();
}

fn bench_memoized_sentiment(c: &mut Criterion) {
    let caches = CacheRegistry::default();
    let sentiment = memoize(caches.sentiment(), |text: &str| {
        text.split_whitespace().filter(|w| w.ends_with('!')).count() as f64
    });
    let inputs: Vec<String> = (0..50).map(text).collect();

    c.bench_function("memoized_sentiment_warm", |b| {
        b.iter(|| {
            for input in &inputs {
                black_box(sentiment.call(input));
            }
        })
    });
}

fn bench_contention(c: &mut Criterion) {
    let mut group = c.benchmark_group("contention");

    let cache = TimedCache::new(CacheConfig::new(512, None).unwrap());
    for i in 0..512u64 {
        cache.set(i, i);
    }

    for &thread_count in &[1, 2, 4, 8] {
        group.bench_with_input(
            BenchmarkId::new("cache_get_threads", thread_count),
            &thread_count,
            |b, &threads| {
                b.iter_custom(|iters| {
                    let start = std::time::Instant::now();
                    crossbeam_utils::thread::scope(|s| {
                        for t in 0..threads {
                            let cache_ref = &cache;
                            s.spawn(move |_| {
                                for i in 0..iters / threads as u64 {
                                    black_box(cache_ref.get(&((i + t as u64) % 512)));
                                }
                            });
                        }
                    })
                    .unwrap();
                    start.elapsed()
                })
            },
        );
    }

    group.finish();
}

// ===== Macro Benchmarks =====

fn bench_container_lookup(c: &mut Criterion) {
    let container = ServiceContainer::new();
    for i in 0..200 {
        container.register_factory(format!("service_{}", i), move || i, true);
    }
    let _ = container.get::<i32>("service_199").unwrap();

    c.bench_function("container_singleton_hit_200", |b| {
        b.iter(|| black_box(container.get::<i32>("service_199").unwrap()))
    });
}

criterion_group!(
    micro_benches,
    bench_fingerprint,
    bench_cache_hit,
    bench_cache_eviction,
    bench_memoized_sentiment,
    bench_contention
);

criterion_group!(macro_benches, bench_container_lookup);

criterion_main!(micro_benches, macro_benches);
