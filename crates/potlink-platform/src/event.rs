//! Frame classification.

use core::fmt;

use crate::{CONTROL_CHANGE, FRAME_CAPACITY, Frame, MAX_RAW_VALUE};

/// Classification of a decoded frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Complete `0xB0` frame: controller index and value are meaningful.
    ControlChange,
    /// Any other status byte, or a `0xB0` frame too short to name a
    /// controller. Reported, never published.
    Unrecognized,
}

/// A classified frame.
///
/// For [`EventKind::Unrecognized`] events `controller` and `value` hold
/// whatever bytes 1 and 2 carried (zero if missing); they are kept only for
/// diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ControlEvent {
    /// Classification.
    pub kind: EventKind,
    /// Byte 0 as received.
    pub status: u8,
    /// Controller index (byte 1). Not range-checked here.
    pub controller: u8,
    /// Raw controller value (byte 2).
    pub value: u8,
}

impl ControlEvent {
    /// True for [`EventKind::ControlChange`].
    #[inline]
    pub fn is_control_change(&self) -> bool {
        self.kind == EventKind::ControlChange
    }

    /// `value / 127`, clamped to `[0, 1]`.
    #[inline]
    pub fn normalized(&self) -> f32 {
        f32::from(self.value.min(MAX_RAW_VALUE)) / f32::from(MAX_RAW_VALUE)
    }
}

/// Prints `0xB0 - 0x01 - 0x40`.
impl fmt::Display for ControlEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "0x{:02X} - 0x{:02X} - 0x{:02X}",
            self.status, self.controller, self.value
        )
    }
}

/// Classify a frame. Pure: the same bytes always give the same event.
///
/// ```rust
/// use potlink_platform::{EventKind, Frame, translate};
///
/// let cc = translate(&Frame::new(&[0xB0, 0x01, 0x40]).unwrap());
/// assert_eq!((cc.kind, cc.controller, cc.value), (EventKind::ControlChange, 1, 64));
///
/// let note = translate(&Frame::new(&[0x90, 0x01, 0x40]).unwrap());
/// assert_eq!(note.kind, EventKind::Unrecognized);
/// ```
pub fn translate(frame: &Frame) -> ControlEvent {
    let bytes = frame.as_bytes();
    let byte = |i: usize| bytes.get(i).copied().unwrap_or(0);
    let status = byte(0);
    let kind = if status == CONTROL_CHANGE && bytes.len() == FRAME_CAPACITY {
        EventKind::ControlChange
    } else {
        EventKind::Unrecognized
    };
    ControlEvent {
        kind,
        status,
        controller: byte(1),
        value: byte(2),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(bytes: &[u8]) -> Frame {
        Frame::new(bytes).unwrap()
    }

    #[test]
    fn control_change() {
        let ev = translate(&frame(&[0xB0, 0x01, 0x40]));
        assert!(ev.is_control_change());
        assert_eq!(ev.controller, 1);
        assert_eq!(ev.value, 64);
        assert!((ev.normalized() - 64.0 / 127.0).abs() < 1e-7);
    }

    #[test]
    fn other_status_is_unrecognized() {
        for status in [0x00, 0x80, 0x90, 0xB1, 0xC0, 0xFE] {
            let ev = translate(&frame(&[status, 0x01, 0x40]));
            assert_eq!(ev.kind, EventKind::Unrecognized, "status {status:#04X}");
            assert_eq!(ev.status, status);
        }
    }

    #[test]
    fn short_control_change_is_unrecognized() {
        let ev = translate(&frame(&[0xB0, 0x01]));
        assert_eq!(ev.kind, EventKind::Unrecognized);
        assert_eq!(ev.value, 0);
    }

    #[test]
    fn index_is_not_range_checked() {
        let ev = translate(&frame(&[0xB0, 0x9A, 0x10]));
        assert!(ev.is_control_change());
        assert_eq!(ev.controller, 0x9A);
    }

    #[test]
    fn normalized_clamps_high_values() {
        let ev = translate(&frame(&[0xB0, 0x01, 0xC8]));
        assert_eq!(ev.normalized(), 1.0);
    }

    #[test]
    fn display_matches_monitor_format() {
        let ev = translate(&frame(&[0xB0, 0x01, 0x40]));
        assert_eq!(ev.to_string(), "0xB0 - 0x01 - 0x40");
    }
}
