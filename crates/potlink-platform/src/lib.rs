//! potlink platform - the controller side of the audio path
//!
//! A microcontroller reads potentiometers and streams them over a serial link
//! as MIDI-style Control Change frames. This crate turns that byte stream into
//! parameter values the audio thread can read without blocking.
//!
//! # Data flow
//!
//! ```text
//! serial bytes -> FrameDecoder -> Frame -> translate -> ControlEvent -> ParameterBridge::publish
//!                                                  audio thread: ParameterBridge::read_all
//! ```
//!
//! - [`FrameDecoder`] - sentinel-delimited framing with overflow resync
//! - [`translate`] - classifies a [`Frame`] into a [`ControlEvent`]
//! - [`ParameterBridge`] - one atomically versioned slot per controller,
//!   latest value wins
//!
//! # Wire format
//!
//! ```text
//! [status][controller][value][SENTINEL]
//!  0xB0    0..=127     0..=127  0xFF
//! ```
//!
//! The sentinel is not escaped: a payload byte equal to [`SENTINEL`] ends the
//! frame early. MIDI data bytes never exceed 0x7F, so a well-behaved sender
//! cannot produce one, but a corrupted byte can. The decoder treats such a
//! frame like any other short frame and the translator rejects it.
//!
//! # no_std Support
//!
//! Nothing here allocates. Disable the default `std` feature for embedded
//! targets (64-bit atomics are required for the bridge):
//!
//! ```toml
//! [dependencies]
//! potlink-platform = { version = "0.1", default-features = false }
//! ```
//!
//! # Example
//!
//! ```rust
//! use potlink_platform::{EventKind, FrameDecoder, ParameterBridge, translate};
//!
//! let bridge = ParameterBridge::new();
//! let mut decoder = FrameDecoder::new();
//!
//! for frame in decoder.feed_bytes(&[0xB0, 0x01, 0x40, 0xFF]) {
//!     let event = translate(&frame);
//!     assert_eq!(event.kind, EventKind::ControlChange);
//!     bridge.publish(event.controller, event.value);
//! }
//!
//! assert!((bridge.read(1) - 64.0 / 127.0).abs() < 1e-6);
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

pub mod bridge;
pub mod event;
pub mod frame;

pub use bridge::{BridgeSnapshot, ParamSnapshot, ParameterBridge};
pub use event::{ControlEvent, EventKind, translate};
pub use frame::{DecodeStep, FeedBytes, Frame, FrameDecoder};

/// Byte that terminates every frame.
pub const SENTINEL: u8 = 0xFF;

/// Status byte of a Control Change frame (channel 1).
pub const CONTROL_CHANGE: u8 = 0xB0;

/// Payload bytes a frame can hold before the sentinel.
pub const FRAME_CAPACITY: usize = 3;

/// Number of addressable controllers, and of bridge slots.
pub const CONTROLLER_COUNT: usize = 128;

/// Largest raw controller value; the normalization divisor.
pub const MAX_RAW_VALUE: u8 = 127;
