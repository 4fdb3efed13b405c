// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Reader scenarios against real named OS objects. `Publisher` plays the
// external producer: it creates the segment and semaphore and writes under
// the same acquire/write/release protocol.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use speed_reader::shm_name::VALUE_SIZE;
use speed_reader::{
    AttachError, MappedView, NamedSemaphore, ReadError, ReaderConfig, SharedSegment, SpeedReader,
};

static COUNTER: AtomicUsize = AtomicUsize::new(0);

fn unique_names(prefix: &str) -> (String, String) {
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    let pid = std::process::id();
    (format!("{prefix}_sem_{pid}_{n}"), format!("{prefix}_shm_{pid}_{n}"))
}

fn config(sem: &str, shm: &str) -> ReaderConfig {
    ReaderConfig::default()
        .with_names(sem, shm)
        .with_poll_interval(Duration::from_millis(20))
        .with_wait_slice(Duration::from_millis(10))
}

struct Publisher {
    sem: Option<NamedSemaphore>,
    view: Option<MappedView>,
    _segment: Option<SharedSegment>,
    sem_name: String,
    shm_name: String,
}

impl Publisher {
    fn names_only(sem_name: &str, shm_name: &str) -> Self {
        NamedSemaphore::clear_storage(sem_name);
        SharedSegment::unlink_by_name(shm_name);
        Self {
            sem: None,
            view: None,
            _segment: None,
            sem_name: sem_name.to_string(),
            shm_name: shm_name.to_string(),
        }
    }

    fn with_semaphore(mut self, initial: u32) -> Self {
        self.sem = Some(NamedSemaphore::create(&self.sem_name, initial).expect("create sem"));
        self
    }

    fn with_segment(mut self, size: usize) -> Self {
        let segment = SharedSegment::create(&self.shm_name, size).expect("create shm");
        if size >= VALUE_SIZE {
            self.view = Some(segment.map(VALUE_SIZE).expect("map shm"));
        }
        self._segment = Some(segment);
        self
    }

    fn start(sem_name: &str, shm_name: &str, initial: u32) -> Self {
        Self::names_only(sem_name, shm_name)
            .with_segment(VALUE_SIZE)
            .with_semaphore(initial)
    }

    fn sem(&self) -> &NamedSemaphore {
        self.sem.as_ref().expect("publisher semaphore")
    }

    fn write(&self, value: f64) {
        self.view.as_ref().expect("publisher view").write_f64(value).expect("write");
    }

    /// acquire -> write -> release, like the real producer.
    fn publish(&self, value: f64) {
        assert!(self.sem().wait(Some(1000)).expect("publisher wait"));
        self.write(value);
        self.sem().post(1).expect("publisher post");
    }
}

impl Drop for Publisher {
    fn drop(&mut self) {
        NamedSemaphore::clear_storage(&self.sem_name);
        SharedSegment::unlink_by_name(&self.shm_name);
    }
}

#[test]
fn reads_published_value() {
    let (sem, shm) = unique_names("rd");
    let publisher = Publisher::start(&sem, &shm, 0);
    publisher.write(88.5);
    publisher.sem().post(1).expect("post");

    let mut reader = SpeedReader::attach(config(&sem, &shm)).expect("attach");
    assert!(reader.is_attached());

    let speed = reader.wait_and_read(Some(Duration::from_secs(1))).expect("read");
    assert_eq!(speed, Some(88.5));

    // permit is held until release
    assert!(!publisher.sem().wait(Some(10)).expect("publisher wait"));
    reader.release().expect("release");
    assert!(publisher.sem().wait(Some(100)).expect("publisher wait"));
}

#[test]
fn missing_semaphore_fails_attach() {
    let (sem, shm) = unique_names("nosem");
    let _publisher = Publisher::names_only(&sem, &shm).with_segment(VALUE_SIZE);

    let err = SpeedReader::attach(config(&sem, &shm)).err().expect("attach must fail");
    assert!(matches!(err, AttachError::SemaphoreNotFound { .. }), "got {err:?}");
    assert_eq!(err.exit_code(), 1);
}

#[test]
fn missing_segment_fails_attach() {
    let (sem, shm) = unique_names("noshm");
    let publisher = Publisher::names_only(&sem, &shm).with_semaphore(1);

    let err = SpeedReader::attach(config(&sem, &shm)).err().expect("attach must fail");
    assert!(matches!(err, AttachError::SegmentNotFound { .. }), "got {err:?}");
    assert_eq!(err.exit_code(), 1);

    // the failed attach took no permit
    assert!(publisher.sem().wait(Some(10)).expect("publisher wait"));
}

#[cfg(unix)]
#[test]
fn undersized_segment_fails_map() {
    let (sem, shm) = unique_names("small");
    let _publisher = Publisher::names_only(&sem, &shm)
        .with_segment(4)
        .with_semaphore(1);

    let err = SpeedReader::attach(config(&sem, &shm)).err().expect("attach must fail");
    assert!(matches!(err, AttachError::MapFailed { len: 8, .. }), "got {err:?}");
}

#[test]
fn latest_value_wins() {
    let (sem, shm) = unique_names("latest");
    let publisher = Publisher::start(&sem, &shm, 1);

    publisher.publish(10.0);
    publisher.publish(20.0);

    let mut reader = SpeedReader::attach(config(&sem, &shm)).expect("attach");
    let speed = reader.read_once(Some(Duration::from_secs(1))).expect("read");
    assert_eq!(speed, Some(20.0));
}

#[test]
fn read_times_out_without_permit() {
    let (sem, shm) = unique_names("idle");
    let _publisher = Publisher::start(&sem, &shm, 0);

    let mut reader = SpeedReader::attach(config(&sem, &shm)).expect("attach");
    let speed = reader.read_once(Some(Duration::from_millis(20))).expect("read");
    assert_eq!(speed, None);
}

#[test]
fn detach_releases_everything_and_is_idempotent() {
    let (sem, shm) = unique_names("detach");
    let _publisher = Publisher::start(&sem, &shm, 1);

    let mut reader = SpeedReader::attach(config(&sem, &shm)).expect("attach");
    let state = reader.resources();
    assert!(state.view_mapped && state.segment_open && state.semaphore_open);

    reader.detach().expect("detach");
    assert!(reader.resources().all_released());
    assert!(!reader.is_attached());

    reader.detach().expect("second detach");

    let err = reader.read_once(Some(Duration::from_millis(10))).err().expect("read after detach");
    assert!(matches!(err, ReadError::Detached));
}

#[test]
fn detach_returns_held_permit() {
    let (sem, shm) = unique_names("held");
    let publisher = Publisher::start(&sem, &shm, 1);
    publisher.write(5.0);

    let mut reader = SpeedReader::attach(config(&sem, &shm)).expect("attach");
    assert_eq!(reader.wait_and_read(Some(Duration::from_secs(1))).expect("read"), Some(5.0));

    reader.detach().expect("detach");
    assert!(publisher.sem().wait(Some(100)).expect("publisher wait"));
}

#[test]
fn reader_leaves_named_objects_in_place() {
    let (sem, shm) = unique_names("keep");
    let _publisher = Publisher::start(&sem, &shm, 1);

    let reader = SpeedReader::attach(config(&sem, &shm)).expect("attach");
    drop(reader);

    assert!(NamedSemaphore::open(&sem).is_ok());
    assert!(SharedSegment::open(&shm).is_ok());
}

#[test]
fn run_emits_reading_and_stops_on_flag() {
    let (sem, shm) = unique_names("run");
    let publisher = Publisher::start(&sem, &shm, 0);
    publisher.write(42.0);
    publisher.sem().post(1).expect("post");

    let mut reader = SpeedReader::attach(config(&sem, &shm)).expect("attach");
    let stop = AtomicBool::new(false);
    let mut readings = Vec::new();

    let reads = reader
        .run(&stop, |speed| {
            readings.push(speed);
            stop.store(true, Ordering::Release);
        })
        .expect("run");

    assert_eq!(reads, 1);
    assert_eq!(readings, vec![42.0]);
    // permit went back to the publisher
    assert!(publisher.sem().wait(Some(100)).expect("publisher wait"));
}

#[test]
fn run_keeps_reading_until_stopped() {
    let (sem, shm) = unique_names("loop");
    let publisher = Publisher::start(&sem, &shm, 1);
    publisher.publish(1.5);

    let mut reader = SpeedReader::attach(config(&sem, &shm)).expect("attach");
    let stop = AtomicBool::new(false);
    let mut readings = Vec::new();

    let reads = reader
        .run(&stop, |speed| {
            readings.push(speed);
            if readings.len() == 3 {
                stop.store(true, Ordering::Release);
            }
        })
        .expect("run");

    // no staleness detection: the same value is read on every cycle
    assert_eq!(reads, 3);
    assert_eq!(readings, vec![1.5, 1.5, 1.5]);
}

#[test]
fn run_stops_while_waiting() {
    let (sem, shm) = unique_names("stop");
    let _publisher = Publisher::start(&sem, &shm, 0);

    let mut reader = SpeedReader::attach(config(&sem, &shm)).expect("attach");
    let stop = Arc::new(AtomicBool::new(false));

    let flag = Arc::clone(&stop);
    let stopper = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        flag.store(true, Ordering::Release);
    });

    let reads = reader.run(&stop, |_| panic!("nothing was published")).expect("run");
    stopper.join().unwrap();
    assert_eq!(reads, 0);
}
