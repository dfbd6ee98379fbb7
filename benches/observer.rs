use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use media_breakpoints::{stock_breakpoints, BreakpointObserver, InMemoryMatchMedia, Viewport};

fn make_observer() -> (InMemoryMatchMedia, BreakpointObserver) {
    let platform = InMemoryMatchMedia::with_viewport(Viewport::new(1024.0, 768.0));
    let observer = BreakpointObserver::from_definitions(stock_breakpoints(), Arc::new(platform.clone()))
        .expect("stock breakpoints register");
    (platform, observer)
}

fn bench_is_active(c: &mut Criterion) {
    let (_platform, observer) = make_observer();
    c.bench_function("observer/is_active_alias", |b| {
        b.iter(|| observer.is_active(black_box("gt-sm")));
    });
    c.bench_function("observer/is_active_literal_query", |b| {
        b.iter(|| observer.is_active(black_box("screen and (min-width: 960px)")));
    });
}

fn bench_active(c: &mut Criterion) {
    let (_platform, observer) = make_observer();
    c.bench_function("observer/active", |b| {
        b.iter(|| black_box(observer.active()).is_some());
    });
    c.bench_function("observer/active_overlaps", |b| {
        b.iter(|| black_box(observer.active_overlaps()).len());
    });
}

fn bench_resize_fanout(c: &mut Criterion) {
    let (platform, observer) = make_observer();
    let streams: Vec<_> = (0..16)
        .map(|_| observer.observe(None).expect("subscribe"))
        .collect();

    // Each iteration crosses the sm/md boundary: two transitions per resize.
    let mut wide = false;
    c.bench_function("observer/resize_fanout_16", |b| {
        b.iter(|| {
            wide = !wide;
            platform.set_width(if wide { 1000.0 } else { 900.0 });
            for stream in &streams {
                black_box(stream.drain());
            }
        });
    });
}

criterion_group!(benches, bench_is_active, bench_active, bench_resize_fanout);
criterion_main!(benches);
