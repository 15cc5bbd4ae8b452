//! Stress tests for the bridge with a real publisher thread racing readers.
//!
//! The publisher writes a value that is a known function of the revision it
//! produces. Any torn read (a value from one publish with the revision of
//! another, or half-written bits) breaks that relation.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use potlink_platform::{BridgeSnapshot, ParameterBridge};

const PUBLISHES: u32 = 200_000;
const CONTROLLERS: [u8; 4] = [0, 1, 64, 127];

/// Raw value published as the `n`th publish (revision `n + 1`) of a slot.
fn raw_for(n: u32, controller: u8) -> u8 {
    ((n.wrapping_mul(37) + u32::from(controller)) % 128) as u8
}

fn expected(revision: u32, controller: u8) -> f32 {
    f32::from(raw_for(revision - 1, controller)) / 127.0
}

fn spawn_publisher(bridge: Arc<ParameterBridge>, done: Arc<AtomicBool>) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        for n in 0..PUBLISHES {
            for &c in &CONTROLLERS {
                bridge.publish(c, raw_for(n, c));
            }
        }
        done.store(true, Ordering::Release);
    })
}

#[test]
fn snapshots_are_never_torn() {
    let bridge = Arc::new(ParameterBridge::new());
    let done = Arc::new(AtomicBool::new(false));
    let publisher = spawn_publisher(Arc::clone(&bridge), Arc::clone(&done));

    let mut last_seen = [0u32; 128];
    let mut observed = 0u64;
    loop {
        // one last pass after the publisher finishes
        let finished = done.load(Ordering::Acquire);
        for &c in &CONTROLLERS {
            if let Some(snap) = bridge.snapshot(usize::from(c)) {
                assert_eq!(
                    snap.value,
                    expected(snap.revision, c),
                    "controller {c} revision {}",
                    snap.revision
                );
                assert!(
                    snap.revision >= last_seen[usize::from(c)],
                    "revision went backwards on controller {c}"
                );
                last_seen[usize::from(c)] = snap.revision;
                observed += 1;
            }
        }
        if finished {
            break;
        }
    }
    publisher.join().unwrap();

    assert!(observed > 0);
    for &c in &CONTROLLERS {
        let snap = bridge.snapshot(usize::from(c)).unwrap();
        assert_eq!(snap.revision, PUBLISHES);
        assert_eq!(snap.value, expected(PUBLISHES, c));
    }
}

#[test]
fn read_all_slots_are_individually_consistent() {
    let bridge = Arc::new(ParameterBridge::new());
    let done = Arc::new(AtomicBool::new(false));
    let publisher = spawn_publisher(Arc::clone(&bridge), Arc::clone(&done));

    let mut snap = BridgeSnapshot::new();
    while !done.load(Ordering::Acquire) {
        bridge.read_all(&mut snap);
        for (index, slot) in snap.iter_published() {
            let c = index as u8;
            assert!(CONTROLLERS.contains(&c), "unexpected slot {index}");
            assert_eq!(slot.value, expected(slot.revision, c));
        }
    }
    publisher.join().unwrap();
}

#[test]
fn several_readers_in_parallel() {
    let bridge = Arc::new(ParameterBridge::new());
    let done = Arc::new(AtomicBool::new(false));
    let publisher = spawn_publisher(Arc::clone(&bridge), Arc::clone(&done));

    let readers: Vec<_> = (0..3)
        .map(|_| {
            let bridge = Arc::clone(&bridge);
            let done = Arc::clone(&done);
            thread::spawn(move || {
                while !done.load(Ordering::Acquire) {
                    for &c in &CONTROLLERS {
                        if let Some(s) = bridge.snapshot(usize::from(c)) {
                            assert_eq!(s.value, expected(s.revision, c));
                        }
                    }
                    thread::yield_now();
                }
            })
        })
        .collect();

    publisher.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }
}
