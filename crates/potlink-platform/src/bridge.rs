//! Lock-free, latest-value-wins hand-off from the serial thread to the audio
//! thread.
//!
//! Each controller has one `AtomicU64` slot packing a 32-bit revision with the
//! bits of the normalized `f32` value. A publish is a single atomic
//! read-modify-write and a read is a single atomic load, so a reader can never
//! observe a value from one publish paired with the revision of another, and
//! never half of a value. Reads are wait-free; they neither block nor
//! allocate.
//!
//! Revision 0 marks a slot that has never been published. The counter skips
//! 0 when it wraps, so a changed revision always means a new value.

use core::sync::atomic::{AtomicU64, Ordering};

use crate::{CONTROLLER_COUNT, MAX_RAW_VALUE};

#[inline]
const fn pack(revision: u32, value: f32) -> u64 {
    ((revision as u64) << 32) | value.to_bits() as u64
}

#[inline]
const fn unpack(word: u64) -> (u32, f32) {
    ((word >> 32) as u32, f32::from_bits(word as u32))
}

#[inline]
const fn next_revision(revision: u32) -> u32 {
    match revision.wrapping_add(1) {
        0 => 1,
        next => next,
    }
}

/// One slot as seen by a reader.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamSnapshot {
    /// Normalized value in `[0, 1]`.
    pub value: f32,
    /// Publish counter for this slot; never 0 for a published slot.
    pub revision: u32,
}

/// Copy of every slot, filled by [`ParameterBridge::read_all`].
///
/// Lives on the reader's side (typically inside the effect chain) so the
/// audio thread can take a full snapshot without allocating.
#[derive(Clone)]
pub struct BridgeSnapshot {
    words: [u64; CONTROLLER_COUNT],
}

impl BridgeSnapshot {
    /// Snapshot with nothing published.
    pub const fn new() -> Self {
        Self {
            words: [0; CONTROLLER_COUNT],
        }
    }

    /// Slot `index`, or `None` if it was unpublished (or out of range).
    #[inline]
    pub fn get(&self, index: usize) -> Option<ParamSnapshot> {
        let (revision, value) = unpack(*self.words.get(index)?);
        (revision != 0).then_some(ParamSnapshot { value, revision })
    }

    /// Value of slot `index`; 0.0 if unpublished.
    #[inline]
    pub fn value(&self, index: usize) -> f32 {
        self.get(index).map_or(0.0, |s| s.value)
    }

    /// `(index, snapshot)` for every published slot.
    pub fn iter_published(&self) -> impl Iterator<Item = (usize, ParamSnapshot)> + '_ {
        (0..CONTROLLER_COUNT).filter_map(|i| self.get(i).map(|s| (i, s)))
    }
}

impl Default for BridgeSnapshot {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for BridgeSnapshot {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_map().entries(self.iter_published()).finish()
    }
}

/// Per-controller parameter store shared between the serial thread
/// (publisher) and the audio thread (reader).
///
/// Share it with `Arc<ParameterBridge>`; all methods take `&self`.
///
/// ```rust
/// use potlink_platform::ParameterBridge;
///
/// let bridge = ParameterBridge::new();
/// assert_eq!(bridge.snapshot(1), None);
///
/// bridge.publish(1, 127);
/// let snap = bridge.snapshot(1).unwrap();
/// assert_eq!(snap.value, 1.0);
/// assert_eq!(snap.revision, 1);
/// ```
pub struct ParameterBridge {
    slots: [AtomicU64; CONTROLLER_COUNT],
}

impl ParameterBridge {
    /// Bridge with every slot unpublished.
    pub const fn new() -> Self {
        Self {
            slots: [const { AtomicU64::new(0) }; CONTROLLER_COUNT],
        }
    }

    /// Store `raw / 127` for `controller` and bump its revision.
    ///
    /// Raw values above 127 are clamped. Returns `false` (and stores
    /// nothing) if `controller` has no slot.
    pub fn publish(&self, controller: u8, raw: u8) -> bool {
        let Some(slot) = self.slots.get(usize::from(controller)) else {
            return false;
        };
        let value = f32::from(raw.min(MAX_RAW_VALUE)) / f32::from(MAX_RAW_VALUE);
        // The closure always returns Some, so this cannot fail.
        let _ = slot.fetch_update(Ordering::AcqRel, Ordering::Acquire, |word| {
            let (revision, _) = unpack(word);
            Some(pack(next_revision(revision), value))
        });
        true
    }

    /// Normalized value for `controller`; 0.0 if unpublished or out of range.
    #[inline]
    pub fn read(&self, controller: usize) -> f32 {
        self.snapshot(controller).map_or(0.0, |s| s.value)
    }

    /// Value and revision for `controller`, or `None` if never published.
    #[inline]
    pub fn snapshot(&self, controller: usize) -> Option<ParamSnapshot> {
        let (revision, value) = unpack(self.slots.get(controller)?.load(Ordering::Acquire));
        (revision != 0).then_some(ParamSnapshot { value, revision })
    }

    /// Revision for `controller`; 0 if unpublished or out of range.
    #[inline]
    pub fn revision(&self, controller: usize) -> u32 {
        self.slots
            .get(controller)
            .map_or(0, |slot| unpack(slot.load(Ordering::Acquire)).0)
    }

    /// Copy every slot into `out`. Each slot is read atomically; slots are
    /// independent, so a publish racing the copy lands in this snapshot or
    /// the next.
    pub fn read_all(&self, out: &mut BridgeSnapshot) {
        for (word, slot) in out.words.iter_mut().zip(self.slots.iter()) {
            *word = slot.load(Ordering::Acquire);
        }
    }

    /// Number of controllers that have been published at least once.
    pub fn published_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| unpack(slot.load(Ordering::Relaxed)).0 != 0)
            .count()
    }
}

impl Default for ParameterBridge {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for ParameterBridge {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ParameterBridge")
            .field("published", &self.published_count())
            .finish()
    }
}
