//! Bytes in, bridge updates out.
//!
//! [`ControlPipeline`] is the producer half of the control path: it feeds
//! raw link bytes to a [`FrameDecoder`], classifies each frame and publishes
//! Control Changes into the shared [`ParameterBridge`]. It does no I/O of its
//! own, so the serial thread, a capture replay and the tests all drive it the
//! same way.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam_channel::{Sender, TrySendError};
use potlink_platform::{ControlEvent, DecodeStep, EventKind, FrameDecoder, ParameterBridge, translate};

/// Link counters, shared between the reading thread and observers.
#[derive(Debug, Default)]
pub struct LinkStats {
    bytes: AtomicU64,
    frames: AtomicU64,
    control_changes: AtomicU64,
    overflows: AtomicU64,
    unrecognized: AtomicU64,
    out_of_range: AtomicU64,
    tap_dropped: AtomicU64,
    disconnects: AtomicU64,
}

/// Point-in-time copy of [`LinkStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkStatsSnapshot {
    /// Bytes received.
    pub bytes: u64,
    /// Frames closed by a sentinel.
    pub frames: u64,
    /// Control Changes published to the bridge.
    pub control_changes: u64,
    /// Frames dropped for exceeding three payload bytes.
    pub overflows: u64,
    /// Frames with a status other than Control Change.
    pub unrecognized: u64,
    /// Control Changes naming a controller above 127.
    pub out_of_range: u64,
    /// Events the tap could not accept.
    pub tap_dropped: u64,
    /// Times the link was lost.
    pub disconnects: u64,
}

impl LinkStats {
    /// Copy all counters.
    pub fn snapshot(&self) -> LinkStatsSnapshot {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        LinkStatsSnapshot {
            bytes: load(&self.bytes),
            frames: load(&self.frames),
            control_changes: load(&self.control_changes),
            overflows: load(&self.overflows),
            unrecognized: load(&self.unrecognized),
            out_of_range: load(&self.out_of_range),
            tap_dropped: load(&self.tap_dropped),
            disconnects: load(&self.disconnects),
        }
    }

    pub(crate) fn record_disconnect(&self) {
        bump(&self.disconnects);
    }
}

#[inline]
fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

/// Decoder, bridge and counters for one link.
///
/// ```rust
/// use std::sync::Arc;
/// use potlink_io::ControlPipeline;
/// use potlink_platform::ParameterBridge;
///
/// let bridge = Arc::new(ParameterBridge::new());
/// let mut pipeline = ControlPipeline::new(Arc::clone(&bridge));
///
/// // A frame split across two reads is still assembled.
/// assert_eq!(pipeline.ingest(&[0xB0, 0x01]), 0);
/// assert_eq!(pipeline.ingest(&[0x7F, 0xFF]), 1);
/// assert_eq!(bridge.read(1), 1.0);
/// ```
#[derive(Debug)]
pub struct ControlPipeline {
    decoder: FrameDecoder,
    bridge: Arc<ParameterBridge>,
    stats: Arc<LinkStats>,
    tap: Option<Sender<ControlEvent>>,
}

impl ControlPipeline {
    /// Pipeline with fresh counters.
    pub fn new(bridge: Arc<ParameterBridge>) -> Self {
        Self::with_stats(bridge, Arc::new(LinkStats::default()))
    }

    /// Pipeline that counts into existing `stats`.
    pub fn with_stats(bridge: Arc<ParameterBridge>, stats: Arc<LinkStats>) -> Self {
        Self {
            decoder: FrameDecoder::new(),
            bridge,
            stats,
            tap: None,
        }
    }

    /// Also send every Control Change to `tap`. Sends never block; events a
    /// full channel cannot take are counted and dropped.
    pub fn with_tap(mut self, tap: Sender<ControlEvent>) -> Self {
        self.tap = Some(tap);
        self
    }

    /// Shared counters.
    pub fn stats(&self) -> &Arc<LinkStats> {
        &self.stats
    }

    /// The bridge this pipeline publishes into.
    pub fn bridge(&self) -> &Arc<ParameterBridge> {
        &self.bridge
    }

    /// Decode `bytes` and publish what they complete. Returns the number of
    /// values published.
    pub fn ingest(&mut self, bytes: &[u8]) -> usize {
        self.stats.bytes.fetch_add(bytes.len() as u64, Ordering::Relaxed);
        let mut published = 0;
        for &byte in bytes {
            match self.decoder.step(byte) {
                DecodeStep::Pending => {}
                DecodeStep::Overflow => {
                    bump(&self.stats.overflows);
                    tracing::warn!("frame overflow, discarding until next sentinel");
                }
                DecodeStep::Resynced => {
                    tracing::debug!("decoder resynchronised");
                }
                DecodeStep::Frame(frame) => {
                    bump(&self.stats.frames);
                    if self.dispatch(translate(&frame)) {
                        published += 1;
                    }
                }
            }
        }
        published
    }

    /// Drop any partial frame. Called when a new link session starts.
    pub fn reset(&mut self) {
        self.decoder.reset();
    }

    fn dispatch(&mut self, event: ControlEvent) -> bool {
        if event.kind == EventKind::Unrecognized {
            bump(&self.stats.unrecognized);
            tracing::warn!(status = event.status, "unrecognized frame: {event}");
            return false;
        }

        self.forward(event);
        if !self.bridge.publish(event.controller, event.value) {
            bump(&self.stats.out_of_range);
            tracing::debug!(controller = event.controller, "controller index out of range");
            return false;
        }
        bump(&self.stats.control_changes);
        tracing::trace!(controller = event.controller, value = event.value, "control change");
        true
    }

    fn forward(&self, event: ControlEvent) {
        let Some(tap) = &self.tap else { return };
        match tap.try_send(event) {
            Ok(()) | Err(TrySendError::Disconnected(_)) => {}
            Err(TrySendError::Full(_)) => bump(&self.stats.tap_dropped),
        }
    }
}
