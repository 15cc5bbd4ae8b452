//! Sentinel-delimited framing of the serial byte stream.
//!
//! The decoder accumulates payload bytes until it sees [`SENTINEL`]. A frame
//! that grows past [`FRAME_CAPACITY`] is malformed: its bytes are dropped and
//! everything up to and including the next sentinel is discarded, so the
//! decoder always realigns on a frame boundary. Losing one frame is
//! acceptable for continuous controls; the next knob movement repairs it.

use core::fmt;

use crate::{FRAME_CAPACITY, SENTINEL};

/// Up to [`FRAME_CAPACITY`] payload bytes received before a sentinel.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Frame {
    bytes: [u8; FRAME_CAPACITY],
    len: u8,
}

impl Frame {
    /// Build a frame from payload bytes; `None` if there are more than
    /// [`FRAME_CAPACITY`].
    pub fn new(payload: &[u8]) -> Option<Self> {
        if payload.len() > FRAME_CAPACITY {
            return None;
        }
        let mut bytes = [0; FRAME_CAPACITY];
        bytes[..payload.len()].copy_from_slice(payload);
        Some(Self {
            bytes,
            len: payload.len() as u8,
        })
    }

    /// The payload bytes.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len as usize]
    }

    /// Number of payload bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.len as usize
    }

    /// True if the frame holds no payload.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// True if the frame holds exactly [`FRAME_CAPACITY`] bytes.
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.len() == FRAME_CAPACITY
    }

    /// Byte 0, the status classifier.
    #[inline]
    pub fn status(&self) -> Option<u8> {
        self.as_bytes().first().copied()
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Frame[")?;
        for (i, b) in self.as_bytes().iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{b:02X}")?;
        }
        f.write_str("]")
    }
}

/// Outcome of feeding one byte to the decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeStep {
    /// Byte consumed, nothing to report.
    Pending,
    /// A sentinel closed a non-empty frame.
    Frame(Frame),
    /// Payload exceeded capacity; accumulated bytes were dropped and the
    /// decoder is discarding until the next sentinel.
    Overflow,
    /// The sentinel ending a discarded frame arrived; the decoder is aligned
    /// again.
    Resynced,
}

/// Byte-at-a-time frame decoder.
///
/// ```rust
/// use potlink_platform::{DecodeStep, Frame, FrameDecoder};
///
/// let mut decoder = FrameDecoder::new();
/// assert_eq!(decoder.feed(0xB0), None);
/// assert_eq!(decoder.feed(0x07), None);
/// assert_eq!(decoder.feed(0x64), None);
/// assert_eq!(decoder.feed(0xFF), Frame::new(&[0xB0, 0x07, 0x64]));
///
/// // Four payload bytes overflow a three-byte frame.
/// let steps: Vec<_> = [1, 2, 3, 4, 0xFF].iter().map(|&b| decoder.step(b)).collect();
/// assert_eq!(steps[3], DecodeStep::Overflow);
/// assert_eq!(steps[4], DecodeStep::Resynced);
/// ```
#[derive(Debug, Clone, Default)]
pub struct FrameDecoder {
    buf: [u8; FRAME_CAPACITY],
    cursor: usize,
    discarding: bool,
}

impl FrameDecoder {
    /// Decoder at a frame boundary.
    pub const fn new() -> Self {
        Self {
            buf: [0; FRAME_CAPACITY],
            cursor: 0,
            discarding: false,
        }
    }

    /// Feed one byte and report what happened.
    pub fn step(&mut self, byte: u8) -> DecodeStep {
        if byte == SENTINEL {
            let len = self.cursor;
            self.cursor = 0;
            if self.discarding {
                self.discarding = false;
                return DecodeStep::Resynced;
            }
            if len == 0 {
                // idle line or back-to-back sentinels
                return DecodeStep::Pending;
            }
            let mut bytes = [0; FRAME_CAPACITY];
            bytes[..len].copy_from_slice(&self.buf[..len]);
            return DecodeStep::Frame(Frame {
                bytes,
                len: len as u8,
            });
        }

        if self.discarding {
            return DecodeStep::Pending;
        }
        if self.cursor == FRAME_CAPACITY {
            self.cursor = 0;
            self.discarding = true;
            return DecodeStep::Overflow;
        }
        self.buf[self.cursor] = byte;
        self.cursor += 1;
        DecodeStep::Pending
    }

    /// Feed one byte; a frame is returned when a sentinel closes one.
    #[inline]
    pub fn feed(&mut self, byte: u8) -> Option<Frame> {
        match self.step(byte) {
            DecodeStep::Frame(frame) => Some(frame),
            _ => None,
        }
    }

    /// Iterate over the frames completed by `bytes`.
    ///
    /// Decoder state carries across calls, so a frame split between two
    /// reads is still assembled.
    pub fn feed_bytes<'a>(&'a mut self, bytes: &'a [u8]) -> FeedBytes<'a> {
        FeedBytes {
            decoder: self,
            bytes: bytes.iter(),
        }
    }

    /// Number of payload bytes accumulated for the current frame.
    pub fn pending_len(&self) -> usize {
        self.cursor
    }

    /// True while skipping the tail of an overflowed frame.
    pub fn is_discarding(&self) -> bool {
        self.discarding
    }

    /// Drop partial data and return to a frame boundary.
    pub fn reset(&mut self) {
        self.cursor = 0;
        self.discarding = false;
    }
}

/// Iterator returned by [`FrameDecoder::feed_bytes`].
pub struct FeedBytes<'a> {
    decoder: &'a mut FrameDecoder,
    bytes: core::slice::Iter<'a, u8>,
}

impl Iterator for FeedBytes<'_> {
    type Item = Frame;

    fn next(&mut self) -> Option<Frame> {
        for &byte in self.bytes.by_ref() {
            if let Some(frame) = self.decoder.feed(byte) {
                return Some(frame);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(decoder: &mut FrameDecoder, bytes: &[u8]) -> Vec<Frame> {
        decoder.feed_bytes(bytes).collect()
    }

    #[test]
    fn control_change_frame() {
        let mut d = FrameDecoder::new();
        let frames = collect(&mut d, &[0xB0, 0x01, 0x40, 0xFF]);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].as_bytes(), &[0xB0, 0x01, 0x40]);
        assert!(frames[0].is_complete());
    }

    #[test]
    fn overflow_emits_nothing() {
        let mut d = FrameDecoder::new();
        assert!(collect(&mut d, &[0x01, 0x02, 0x03, 0x04, 0xFF]).is_empty());
        assert_eq!(d.pending_len(), 0);
        assert!(!d.is_discarding());
    }

    #[test]
    fn overflow_tail_is_discarded_until_sentinel() {
        let mut d = FrameDecoder::new();
        let frames = collect(&mut d, &[1, 2, 3, 4, 5, 6, 7, 8, 0xFF, 0xB0, 0x02, 0x10, 0xFF]);
        assert_eq!(frames, vec![Frame::new(&[0xB0, 0x02, 0x10]).unwrap()]);
    }

    #[test]
    fn step_reports_overflow_once() {
        let mut d = FrameDecoder::new();
        let steps: Vec<_> = [1, 2, 3, 4, 5, 6, 0xFF].iter().map(|&b| d.step(b)).collect();
        let overflows = steps.iter().filter(|s| **s == DecodeStep::Overflow).count();
        assert_eq!(overflows, 1);
        assert_eq!(steps.last(), Some(&DecodeStep::Resynced));
    }

    #[test]
    fn short_frames_are_emitted() {
        let mut d = FrameDecoder::new();
        let frames = collect(&mut d, &[0xB0, 0x01, 0xFF, 0x42, 0xFF]);
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].as_bytes(), &[0xB0, 0x01]);
        assert_eq!(frames[1].as_bytes(), &[0x42]);
    }

    #[test]
    fn idle_sentinels_emit_nothing() {
        let mut d = FrameDecoder::new();
        assert!(collect(&mut d, &[0xFF, 0xFF, 0xFF]).is_empty());
    }

    #[test]
    fn frame_split_across_reads() {
        let mut d = FrameDecoder::new();
        assert!(collect(&mut d, &[0xB0, 0x05]).is_empty());
        assert_eq!(d.pending_len(), 2);
        let frames = collect(&mut d, &[0x7F, 0xFF]);
        assert_eq!(frames[0].as_bytes(), &[0xB0, 0x05, 0x7F]);
    }

    #[test]
    fn reset_drops_partial_frame() {
        let mut d = FrameDecoder::new();
        d.feed(0xB0);
        d.reset();
        assert_eq!(d.feed(0xFF), None);
    }

    #[test]
    fn frame_new_rejects_oversize() {
        assert!(Frame::new(&[1, 2, 3, 4]).is_none());
        assert_eq!(Frame::new(&[]).map(|f| f.is_empty()), Some(true));
    }

    #[test]
    fn debug_is_hex() {
        let frame = Frame::new(&[0xB0, 0x01, 0x40]).unwrap();
        assert_eq!(format!("{frame:?}"), "Frame[B0 01 40]");
    }
}
