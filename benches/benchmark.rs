use criterion::{black_box, criterion_group, criterion_main, Criterion};
use sharebus::{Hub, HubConfig};

fn bench_registry_find(c: &mut Criterion) {
    let hub = Hub::new(HubConfig::default());
    let registry = hub.objects::<u64>();
    for i in 0..1000u64 {
        registry.register(&format!("obj-{}", i), i).unwrap();
    }

    c.bench_function("registry find", |b| {
        b.iter(|| registry.find(black_box("obj-500")))
    });
}

fn bench_sync_set_get(c: &mut Criterion) {
    let hub = Hub::new(HubConfig::default());
    let value = hub.sync_value::<u64>("bench-sync");

    c.bench_function("sync set+get", |b| {
        b.iter(|| {
            value.set(black_box(42));
            black_box(value.get())
        })
    });
}

fn bench_channel_push_drain(c: &mut Criterion) {
    let hub = Hub::new(HubConfig::default());
    let publisher = hub.publisher::<u64>("bench-chan");
    let mut subscriber = hub.subscriber::<u64>("bench-chan");

    c.bench_function("channel push+drain", |b| {
        b.iter(|| {
            publisher.push(black_box(7));
            black_box(subscriber.try_recv().unwrap())
        })
    });
}

criterion_group!(
    benches,
    bench_registry_find,
    bench_sync_set_get,
    bench_channel_push_drain
);
criterion_main!(benches);
