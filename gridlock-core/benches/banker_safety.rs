use criterion::{black_box, criterion_group, criterion_main, Criterion};

use gridlock_common::ids::LaneId;
use gridlock_common::quadrant::{claim_for, Movement};
use gridlock_core::banker::BankerEngine;

fn request_release_cycle(c: &mut Criterion) {
    c.bench_function("banker_request_release_cycle", |b| {
        let engine = BankerEngine::new();
        b.iter(|| {
            for lane in LaneId::ALL {
                let req = claim_for(lane, Movement::Right);
                let _ = black_box(engine.request(lane, req));
                engine.release(lane);
            }
        });
    });
}

fn is_safe_state_under_load(c: &mut Criterion) {
    let engine = BankerEngine::new();
    engine.request(LaneId::North, claim_for(LaneId::North, Movement::Right)).unwrap();
    engine.request(LaneId::East, claim_for(LaneId::East, Movement::Right)).unwrap();

    c.bench_function("banker_is_safe_state", |b| {
        b.iter(|| black_box(engine.is_safe_state()));
    });
}

criterion_group!(benches, request_release_cycle, is_safe_state_under_load);
criterion_main!(benches);
