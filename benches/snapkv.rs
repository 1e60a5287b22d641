use criterion::{criterion_group, criterion_main, Criterion};
use snapkv::{Db, Options};

/// Generates a random number in `0..n`.
fn random(n: u32) -> u32 {
    use std::cell::Cell;
    use std::num::Wrapping;

    thread_local! {
        static RNG: Cell<Wrapping<u32>> = Cell::new(Wrapping(1406868647));
    }

    RNG.with(|rng| {
        // This is the 32-bit variant of Xorshift.
        //
        // Source: https://en.wikipedia.org/wiki/Xorshift
        let mut x = rng.get();
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        rng.set(x);

        // This is a fast alternative to `x % n`.
        //
        // Author: Daniel Lemire
        // Source: https://lemire.me/blog/2016/06/27/a-fast-alternative-to-the-modulo-reduction/
        ((x.0 as u64).wrapping_mul(n as u64) >> 32) as u32
    })
}

fn set_benchmark(c: &mut Criterion) {
    const SIZE: u32 = 65536;
    let dir = tempfile::tempdir().unwrap();
    let db = Db::open(Options::default_opt().work_dir(dir.path())).unwrap();
    c.bench_function("put", |b| {
        b.iter(|| {
            db.put(&random(SIZE).to_be_bytes(), &random(SIZE).to_be_bytes())
                .unwrap();
        })
    });
    c.bench_function("get", |b| {
        b.iter(|| {
            db.get(&random(SIZE).to_be_bytes(), None).unwrap();
        })
    });
    let snapshot = db.get_snapshot().unwrap();
    for i in 0..SIZE {
        db.put(&i.to_be_bytes(), &i.to_be_bytes()).unwrap();
    }
    c.bench_function("snapshot get", |b| {
        b.iter(|| {
            db.get(&random(SIZE).to_be_bytes(), Some(&snapshot)).unwrap();
        })
    });
}

criterion_group!(benches, set_benchmark);
criterion_main!(benches);
