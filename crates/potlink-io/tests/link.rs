//! Link thread lifecycle against scripted in-memory links.

use std::collections::VecDeque;
use std::io::{self, Read};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use potlink_io::{Error, LinkOpener, LinkStatus, SerialLinkConfig, SerialLinkDriver};
use potlink_platform::ParameterBridge;

/// What a scripted link does once its chunks are used up.
#[derive(Clone, Copy)]
enum Then {
    /// Report end of stream (device unplugged).
    Eof,
    /// Time out forever (quiet but healthy link).
    Idle,
    /// Block for this long on every read, ignoring any timeout.
    Stall(Duration),
}

struct ScriptedLink {
    chunks: VecDeque<Vec<u8>>,
    then: Then,
    closed: Arc<AtomicUsize>,
}

impl Read for ScriptedLink {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if let Some(chunk) = self.chunks.pop_front() {
            buf[..chunk.len()].copy_from_slice(&chunk);
            return Ok(chunk.len());
        }
        match self.then {
            Then::Eof => Ok(0),
            Then::Idle => {
                thread::sleep(Duration::from_millis(2));
                Err(io::ErrorKind::TimedOut.into())
            }
            Then::Stall(d) => {
                thread::sleep(d);
                Err(io::ErrorKind::TimedOut.into())
            }
        }
    }
}

impl Drop for ScriptedLink {
    fn drop(&mut self) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Clone, Default)]
struct ScriptedOpener {
    scripts: Arc<Mutex<VecDeque<(Vec<Vec<u8>>, Then)>>>,
    opened: Arc<AtomicUsize>,
    closed: Arc<AtomicUsize>,
}

impl ScriptedOpener {
    fn with(scripts: Vec<(Vec<Vec<u8>>, Then)>) -> Self {
        let opener = Self::default();
        opener.scripts.lock().unwrap().extend(scripts);
        opener
    }
}

impl LinkOpener for ScriptedOpener {
    fn open(&mut self) -> potlink_io::Result<Box<dyn Read + Send>> {
        let Some((chunks, then)) = self.scripts.lock().unwrap().pop_front() else {
            return Err(Error::LinkOpen {
                port: "mock".to_string(),
                source: serialport::Error::new(serialport::ErrorKind::NoDevice, "unplugged"),
            });
        };
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptedLink {
            chunks: chunks.into(),
            then,
            closed: Arc::clone(&self.closed),
        }))
    }

    fn name(&self) -> &str {
        "mock"
    }
}

fn config(reconnect: Option<Duration>) -> SerialLinkConfig {
    SerialLinkConfig {
        reconnect_interval: reconnect,
        read_timeout: Duration::from_millis(5),
        join_timeout: Duration::from_millis(500),
        ..SerialLinkConfig::new("mock")
    }
}

fn wait_for(mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    cond()
}

#[test]
fn frames_reach_the_bridge_and_stop_closes_once() {
    let opener = ScriptedOpener::with(vec![(
        vec![vec![0xB0, 0x01], vec![0x40, 0xFF, 0xB0, 0x02, 0x7F, 0xFF]],
        Then::Idle,
    )]);
    let closed = Arc::clone(&opener.closed);
    let bridge = Arc::new(ParameterBridge::new());

    let mut link =
        SerialLinkDriver::spawn_with(opener, &config(None), Arc::clone(&bridge), None).unwrap();
    assert!(wait_for(|| bridge.revision(2) > 0));
    assert!((bridge.read(1) - 64.0 / 127.0).abs() < 1e-7);
    assert_eq!(bridge.read(2), 1.0);
    assert_eq!(link.status(), LinkStatus::Connected);

    let started = Instant::now();
    link.stop().unwrap();
    assert!(started.elapsed() < Duration::from_millis(500));
    assert_eq!(link.status(), LinkStatus::Stopped);
    assert_eq!(closed.load(Ordering::SeqCst), 1);

    let stats = link.stats().snapshot();
    assert_eq!(stats.control_changes, 2);
    assert_eq!(stats.bytes, 8);

    // second stop is a no-op
    link.stop().unwrap();
    drop(link);
    assert_eq!(closed.load(Ordering::SeqCst), 1);
}

#[test]
fn link_loss_without_reconnect_fails() {
    let opener = ScriptedOpener::with(vec![(vec![vec![0xB0, 0x05, 0x10, 0xFF]], Then::Eof)]);
    let closed = Arc::clone(&opener.closed);
    let bridge = Arc::new(ParameterBridge::new());

    let link =
        SerialLinkDriver::spawn_with(opener, &config(None), Arc::clone(&bridge), None).unwrap();
    assert!(wait_for(|| link.status() == LinkStatus::Failed));
    assert_eq!(closed.load(Ordering::SeqCst), 1);
    assert_eq!(link.stats().snapshot().disconnects, 1);

    // values published before the loss remain
    assert_eq!(bridge.revision(5), 1);
}

#[test]
fn reconnects_after_link_loss() {
    let opener = ScriptedOpener::with(vec![
        (vec![vec![0xB0, 0x01, 0x20, 0xFF, 0xB0]], Then::Eof),
        (vec![vec![0x02, 0x30, 0xFF, 0xB0, 0x03, 0x40, 0xFF]], Then::Idle),
    ]);
    let opened = Arc::clone(&opener.opened);
    let closed = Arc::clone(&opener.closed);
    let bridge = Arc::new(ParameterBridge::new());

    let mut link = SerialLinkDriver::spawn_with(
        opener,
        &config(Some(Duration::from_millis(10))),
        Arc::clone(&bridge),
        None,
    )
    .unwrap();

    assert!(wait_for(|| bridge.revision(3) > 0));
    assert_eq!(link.status(), LinkStatus::Connected);
    assert_eq!(opened.load(Ordering::SeqCst), 2);
    assert_eq!(closed.load(Ordering::SeqCst), 1);
    // the half frame from the first session is dropped, not merged
    assert_eq!(bridge.revision(2), 0);

    link.stop().unwrap();
    assert_eq!(closed.load(Ordering::SeqCst), 2);
}

#[test]
fn stop_interrupts_reconnect_wait() {
    let opener = ScriptedOpener::with(vec![(vec![], Then::Eof)]);
    let bridge = Arc::new(ParameterBridge::new());
    let mut link = SerialLinkDriver::spawn_with(
        opener,
        &config(Some(Duration::from_secs(60))),
        bridge,
        None,
    )
    .unwrap();

    assert!(wait_for(|| link.status() == LinkStatus::Reconnecting));
    let started = Instant::now();
    link.stop().unwrap();
    assert!(started.elapsed() < Duration::from_millis(500));
    assert_eq!(link.status(), LinkStatus::Stopped);
}

#[test]
fn failed_reopens_keep_retrying() {
    // one script only: every reopen fails
    let opener = ScriptedOpener::with(vec![(vec![], Then::Eof)]);
    let opened = Arc::clone(&opener.opened);
    let bridge = Arc::new(ParameterBridge::new());
    let mut link = SerialLinkDriver::spawn_with(
        opener,
        &config(Some(Duration::from_millis(5))),
        bridge,
        None,
    )
    .unwrap();

    thread::sleep(Duration::from_millis(50));
    assert_eq!(link.status(), LinkStatus::Reconnecting);
    assert_eq!(opened.load(Ordering::SeqCst), 1);
    link.stop().unwrap();
}

#[test]
fn open_failure_is_reported_to_caller() {
    let opener = ScriptedOpener::default();
    let bridge = Arc::new(ParameterBridge::new());
    let err = SerialLinkDriver::spawn_with(opener, &config(None), bridge, None).unwrap_err();
    assert!(matches!(err, Error::LinkOpen { ref port, .. } if port == "mock"));
}

#[test]
fn stalled_link_times_out_join() {
    let opener = ScriptedOpener::with(vec![(vec![], Then::Stall(Duration::from_millis(300)))]);
    let closed = Arc::clone(&opener.closed);
    let bridge = Arc::new(ParameterBridge::new());
    let mut link = SerialLinkDriver::spawn_with(
        opener,
        &SerialLinkConfig {
            join_timeout: Duration::from_millis(20),
            ..config(None)
        },
        bridge,
        None,
    )
    .unwrap();

    thread::sleep(Duration::from_millis(10));
    let err = link.stop().unwrap_err();
    assert!(matches!(err, Error::JoinTimeout(_)));

    // the detached thread still exits and closes the link
    assert!(wait_for(|| closed.load(Ordering::SeqCst) == 1));
}

#[test]
fn tap_receives_decoded_events() {
    let opener = ScriptedOpener::with(vec![(vec![vec![0xB0, 0x0A, 0x7F, 0xFF]], Then::Idle)]);
    let (tx, rx) = crossbeam_channel::unbounded();
    let bridge = Arc::new(ParameterBridge::new());
    let _link = SerialLinkDriver::spawn_with(opener, &config(None), bridge, Some(tx)).unwrap();

    let event = rx.recv_timeout(Duration::from_secs(2)).unwrap();
    assert_eq!(event.to_string(), "0xB0 - 0x0A - 0x7F");
}
