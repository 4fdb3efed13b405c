// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Cost of one reader cycle against real named objects.
//
// Run with:
//   cargo bench --bench read_cycle
//
// Groups:
//   view_read  : volatile f64 load from the mapped view (no locking)
//   read_cycle : acquire -> read -> release through SpeedReader

use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use speed_reader::shm_name::VALUE_SIZE;
use speed_reader::{NamedSemaphore, ReaderConfig, SharedSegment, SpeedReader};

fn names(tag: &str) -> (String, String) {
    let pid = std::process::id();
    (format!("bench_{tag}_sem_{pid}"), format!("bench_{tag}_shm_{pid}"))
}

fn bench_view_read(c: &mut Criterion) {
    let (_, shm) = names("view");
    SharedSegment::unlink_by_name(&shm);
    let segment = SharedSegment::create(&shm, VALUE_SIZE).expect("create shm");
    let view = segment.map(VALUE_SIZE).expect("map");
    view.write_f64(88.5).expect("write");

    c.bench_function("view_read", |b| b.iter(|| black_box(view.read_f64())));

    SharedSegment::unlink_by_name(&shm);
}

fn bench_read_cycle(c: &mut Criterion) {
    let (sem, shm) = names("cycle");
    NamedSemaphore::clear_storage(&sem);
    SharedSegment::unlink_by_name(&shm);

    let segment = SharedSegment::create(&shm, VALUE_SIZE).expect("create shm");
    let view = segment.map(VALUE_SIZE).expect("map");
    view.write_f64(88.5).expect("write");
    let _semaphore = NamedSemaphore::create(&sem, 1).expect("create sem");

    let config = ReaderConfig::default().with_names(sem.as_str(), shm.as_str());
    let mut reader = SpeedReader::attach(config).expect("attach");

    c.bench_function("read_cycle", |b| {
        b.iter(|| black_box(reader.read_once(Some(Duration::from_millis(100)))))
    });

    drop(reader);
    NamedSemaphore::clear_storage(&sem);
    SharedSegment::unlink_by_name(&shm);
}

criterion_group!(benches, bench_view_read, bench_read_cycle);
criterion_main!(benches);
