//! The fixed effect chain driven by controller values.
//!
//! Stage order is fixed:
//!
//! ```text
//! compressor → pre_gain → chorus → delay → reverb → master_gain
//! ```
//!
//! At the start of every block the chain copies the [`ParameterBridge`] into
//! its own snapshot, then walks its resolved routes. A route is applied only
//! when its controller's revision differs from the one it last applied, so
//! an idle controller costs one comparison per block and never re-triggers
//! smoothing.
//!
//! Each stage carries a 5 ms bypass crossfade. Toggling bypass while the
//! chain is processing fades between the dry and processed signal; before
//! the first block the fade snaps, so a chain configured as bypassed is
//! silent-identity from sample zero. A fully bypassed stage is not run at
//! all.
//!
//! `configure` may allocate (delay lines are sized for the sample rate);
//! `process_block` and `process_block_stereo` never allocate, lock or log.

use std::sync::Arc;

use potlink_core::{Effect, ParameterInfo, SmoothedParam};
use potlink_platform::{BridgeSnapshot, CONTROLLER_COUNT, ParameterBridge};

use crate::routing::{ResolvedRoute, ResolvedTarget, Route, RouteTarget, default_routes};
use crate::stage::{EffectStage, StageKind};
use crate::ChainError;

/// Number of stages in the chain.
pub const STAGE_COUNT: usize = 6;

/// Stage labels in processing order.
pub const STAGE_LABELS: [&str; STAGE_COUNT] =
    ["compressor", "pre_gain", "chorus", "delay", "reverb", "master_gain"];

const STAGE_KINDS: [StageKind; STAGE_COUNT] = [
    StageKind::Compressor,
    StageKind::Gain,
    StageKind::Chorus,
    StageKind::Delay,
    StageKind::Reverb,
    StageKind::Gain,
];

/// Sample rate assumed until [`EffectChain::configure`] is called.
pub const DEFAULT_SAMPLE_RATE: f32 = 48000.0;

/// Block size assumed until [`EffectChain::configure`] is called.
pub const DEFAULT_BLOCK_SIZE: usize = 512;

const FADE_EPSILON: f32 = 1e-6;

/// Lifecycle of an [`EffectChain`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainState {
    /// Built but never configured; processing passes audio through.
    Uninitialized,
    /// Configured for a sample rate and block size; no block processed yet.
    Configured,
    /// At least one block processed since the last configure.
    Processing,
}

#[derive(Debug, Clone)]
struct StageSlot {
    label: &'static str,
    stage: EffectStage,
    bypassed: bool,
    /// 1.0 = processed, 0.0 = bypassed.
    fade: SmoothedParam,
}

impl StageSlot {
    fn new(label: &'static str, kind: StageKind, sample_rate: f32) -> Self {
        Self {
            label,
            stage: EffectStage::new(kind, sample_rate),
            bypassed: false,
            fade: SmoothedParam::fast(1.0, sample_rate),
        }
    }

    fn set_bypassed(&mut self, bypassed: bool, immediate: bool) {
        self.bypassed = bypassed;
        self.fade.set_target(if bypassed { 0.0 } else { 1.0 });
        if immediate {
            self.fade.snap_to_target();
        }
    }

    #[inline]
    fn process_block(&mut self, buffer: &mut [f32]) {
        if self.fade.is_settled() {
            if self.fade.get() < FADE_EPSILON {
                return;
            }
            self.stage.process_block_inplace(buffer);
            return;
        }
        for sample in buffer.iter_mut() {
            let fade = self.fade.advance();
            let wet = self.stage.process(*sample);
            *sample = *sample * (1.0 - fade) + wet * fade;
        }
    }

    #[inline]
    fn process_block_stereo(&mut self, left: &mut [f32], right: &mut [f32]) {
        if self.fade.is_settled() {
            if self.fade.get() < FADE_EPSILON {
                return;
            }
            self.stage.process_block_stereo_inplace(left, right);
            return;
        }
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let fade = self.fade.advance();
            let (wet_l, wet_r) = self.stage.process_stereo(*l, *r);
            let dry = 1.0 - fade;
            *l = *l * dry + wet_l * fade;
            *r = *r * dry + wet_r * fade;
        }
    }
}

/// Fixed six-stage chain reading its parameters from a [`ParameterBridge`].
///
/// ```rust
/// use std::sync::Arc;
/// use potlink_effects::{ChainState, EffectChain};
/// use potlink_platform::ParameterBridge;
///
/// let bridge = Arc::new(ParameterBridge::new());
/// let mut chain = EffectChain::new(Arc::clone(&bridge));
/// chain.configure(48000.0, 256).unwrap();
///
/// bridge.publish(1, 64); // CC1 → compressor attack
/// let mut block = vec![0.0f32; 256];
/// chain.process_block(&mut block);
/// assert_eq!(chain.state(), ChainState::Processing);
/// ```
#[derive(Debug)]
pub struct EffectChain {
    slots: [StageSlot; STAGE_COUNT],
    bridge: Arc<ParameterBridge>,
    snapshot: BridgeSnapshot,
    routes: Vec<ResolvedRoute>,
    state: ChainState,
    sample_rate: f32,
    block_size: usize,
}

impl EffectChain {
    /// Chain with the default routing table.
    pub fn new(bridge: Arc<ParameterBridge>) -> Self {
        let mut chain = Self::unrouted(bridge);
        for route in default_routes() {
            // every default route names a real stage and parameter; see tests
            if let Ok(resolved) = chain.resolve(&route) {
                chain.routes.push(resolved);
            }
        }
        chain
    }

    /// Chain with an explicit routing table.
    ///
    /// # Errors
    ///
    /// Fails on the first route naming an unknown stage or parameter, or a
    /// controller above 127.
    pub fn with_routes(
        bridge: Arc<ParameterBridge>,
        routes: impl IntoIterator<Item = Route>,
    ) -> Result<Self, ChainError> {
        let mut chain = Self::unrouted(bridge);
        for route in routes {
            let resolved = chain.resolve(&route)?;
            chain.routes.push(resolved);
        }
        tracing::debug!(routes = chain.routes.len(), "effect chain routes resolved");
        Ok(chain)
    }

    fn unrouted(bridge: Arc<ParameterBridge>) -> Self {
        let slots = core::array::from_fn(|i| {
            StageSlot::new(STAGE_LABELS[i], STAGE_KINDS[i], DEFAULT_SAMPLE_RATE)
        });
        Self {
            slots,
            bridge,
            snapshot: BridgeSnapshot::new(),
            routes: Vec::new(),
            state: ChainState::Uninitialized,
            sample_rate: DEFAULT_SAMPLE_RATE,
            block_size: DEFAULT_BLOCK_SIZE,
        }
    }

    fn resolve(&self, route: &Route) -> Result<ResolvedRoute, ChainError> {
        if usize::from(route.controller) >= CONTROLLER_COUNT {
            return Err(ChainError::ControllerOutOfRange(route.controller));
        }
        let stage = self.stage_index(&route.stage)?;
        let target = match &route.target {
            RouteTarget::Bypass => ResolvedTarget::Bypass,
            RouteTarget::Parameter(name) => {
                let index = self.slots[stage].stage.find_param_by_name(name).ok_or_else(|| {
                    ChainError::UnknownParameter {
                        stage: route.stage.to_string(),
                        param: name.to_string(),
                    }
                })?;
                ResolvedTarget::Parameter(index)
            }
        };
        Ok(ResolvedRoute {
            controller: route.controller,
            stage,
            target,
            last_revision: 0,
        })
    }

    /// Index of the stage labelled `label`.
    ///
    /// # Errors
    ///
    /// [`ChainError::UnknownStage`] if no stage has that label.
    pub fn stage_index(&self, label: &str) -> Result<usize, ChainError> {
        STAGE_LABELS
            .iter()
            .position(|l| l.eq_ignore_ascii_case(label))
            .ok_or_else(|| ChainError::UnknownStage(label.to_string()))
    }

    /// Prepare every stage for `sample_rate` and split incoming buffers into
    /// chunks of at most `block_size` frames.
    ///
    /// Clears all stage state and snaps parameters and bypass fades to their
    /// targets. May be called again to reconfigure.
    ///
    /// # Errors
    ///
    /// Rejects a non-finite or non-positive sample rate and a zero block size.
    pub fn configure(&mut self, sample_rate: f32, block_size: usize) -> Result<(), ChainError> {
        if !sample_rate.is_finite() || sample_rate <= 0.0 {
            return Err(ChainError::InvalidSampleRate(sample_rate));
        }
        if block_size == 0 {
            return Err(ChainError::ZeroBlockSize);
        }
        for slot in &mut self.slots {
            slot.stage.configure(sample_rate);
            slot.fade.set_sample_rate(sample_rate);
            slot.fade.snap_to_target();
        }
        self.sample_rate = sample_rate;
        self.block_size = block_size;
        self.state = ChainState::Configured;
        tracing::info!(sample_rate, block_size, "effect chain configured");
        Ok(())
    }

    /// Apply any controller changes, then run `buffer` through every active
    /// stage in place.
    ///
    /// An unconfigured chain leaves `buffer` untouched.
    pub fn process_block(&mut self, buffer: &mut [f32]) {
        if self.state == ChainState::Uninitialized {
            return;
        }
        self.apply_parameters();
        self.state = ChainState::Processing;
        for chunk in buffer.chunks_mut(self.block_size) {
            for slot in &mut self.slots {
                slot.process_block(chunk);
            }
        }
    }

    /// Stereo form of [`process_block`](Self::process_block). Only the
    /// first `min(left.len(), right.len())` frames are processed.
    pub fn process_block_stereo(&mut self, left: &mut [f32], right: &mut [f32]) {
        if self.state == ChainState::Uninitialized {
            return;
        }
        self.apply_parameters();
        self.state = ChainState::Processing;
        let frames = left.len().min(right.len());
        let chunks = left[..frames]
            .chunks_mut(self.block_size)
            .zip(right[..frames].chunks_mut(self.block_size));
        for (l, r) in chunks {
            for slot in &mut self.slots {
                slot.process_block_stereo(l, r);
            }
        }
    }

    /// Apply every route whose controller has a new revision.
    fn apply_parameters(&mut self) {
        self.bridge.read_all(&mut self.snapshot);
        let immediate = self.state != ChainState::Processing;
        for route in &mut self.routes {
            let Some(snap) = self.snapshot.get(usize::from(route.controller)) else {
                continue;
            };
            if snap.revision == route.last_revision {
                continue;
            }
            route.last_revision = snap.revision;
            let slot = &mut self.slots[route.stage];
            match route.target {
                ResolvedTarget::Parameter(index) => slot.stage.set_normalized(index, snap.value),
                ResolvedTarget::Bypass => slot.set_bypassed(snap.value >= 0.5, immediate),
            }
        }
    }

    /// Bypass or re-enable stage `index`. Out-of-range indices are ignored.
    ///
    /// While processing, the change crossfades over 5 ms; before the first
    /// block it takes effect immediately.
    pub fn set_bypassed(&mut self, index: usize, bypassed: bool) {
        let immediate = self.state != ChainState::Processing;
        if let Some(slot) = self.slots.get_mut(index) {
            slot.set_bypassed(bypassed, immediate);
        }
    }

    /// Whether stage `index` is bypassed.
    pub fn is_bypassed(&self, index: usize) -> bool {
        self.slots.get(index).is_some_and(|s| s.bypassed)
    }

    /// Bypass or re-enable a stage by label.
    ///
    /// # Errors
    ///
    /// [`ChainError::UnknownStage`] for an unknown label.
    pub fn set_stage_bypassed(&mut self, label: &str, bypassed: bool) -> Result<(), ChainError> {
        let index = self.stage_index(label)?;
        self.set_bypassed(index, bypassed);
        Ok(())
    }

    /// Set a stage parameter by label and name, in plain units (dB, ms, …).
    ///
    /// # Errors
    ///
    /// [`ChainError::UnknownStage`] or [`ChainError::UnknownParameter`].
    pub fn set_stage_param(
        &mut self,
        label: &str,
        param: &str,
        value: f32,
    ) -> Result<(), ChainError> {
        let index = self.stage_index(label)?;
        let stage = &mut self.slots[index].stage;
        let param_index =
            stage
                .find_param_by_name(param)
                .ok_or_else(|| ChainError::UnknownParameter {
                    stage: label.to_string(),
                    param: param.to_string(),
                })?;
        stage.set_param(param_index, value);
        Ok(())
    }

    /// Stage at `index`.
    pub fn stage(&self, index: usize) -> Option<&EffectStage> {
        self.slots.get(index).map(|s| &s.stage)
    }

    /// Mutable stage at `index`.
    pub fn stage_mut(&mut self, index: usize) -> Option<&mut EffectStage> {
        self.slots.get_mut(index).map(|s| &mut s.stage)
    }

    /// Label of stage `index`.
    pub fn stage_label(&self, index: usize) -> Option<&'static str> {
        self.slots.get(index).map(|s| s.label)
    }

    /// Resolved routes, in the order given.
    pub fn routes(&self) -> &[ResolvedRoute] {
        &self.routes
    }

    /// Lifecycle state.
    pub fn state(&self) -> ChainState {
        self.state
    }

    /// Configured sample rate.
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Configured block size.
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// The bridge this chain reads.
    pub fn bridge(&self) -> &Arc<ParameterBridge> {
        &self.bridge
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain() -> (Arc<ParameterBridge>, EffectChain) {
        let bridge = Arc::new(ParameterBridge::new());
        let chain = EffectChain::new(Arc::clone(&bridge));
        (bridge, chain)
    }

    #[test]
    fn default_routes_all_resolve() {
        let bridge = Arc::new(ParameterBridge::new());
        let chain = EffectChain::with_routes(bridge, default_routes()).unwrap();
        assert_eq!(chain.routes().len(), default_routes().len());
    }

    #[test]
    fn starts_uninitialized_and_passes_through() {
        let (_, mut chain) = chain();
        assert_eq!(chain.state(), ChainState::Uninitialized);
        let mut buf = [0.25f32; 64];
        chain.process_block(&mut buf);
        assert!(buf.iter().all(|&s| s == 0.25));
        assert_eq!(chain.state(), ChainState::Uninitialized);
    }

    #[test]
    fn configure_validates() {
        let (_, mut chain) = chain();
        assert_eq!(chain.configure(0.0, 64), Err(ChainError::InvalidSampleRate(0.0)));
        assert_eq!(chain.configure(48000.0, 0), Err(ChainError::ZeroBlockSize));
        assert!(chain.configure(48000.0, 64).is_ok());
        assert_eq!(chain.state(), ChainState::Configured);
    }

    #[test]
    fn unchanged_revision_is_not_reapplied() {
        let (bridge, mut chain) = chain();
        chain.configure(48000.0, 64).unwrap();
        bridge.publish(1, 127);
        let mut buf = [0.0f32; 64];
        chain.process_block(&mut buf);
        assert!((chain.stage(0).unwrap().get_param(2) - 100.0).abs() < 1e-3);

        // a direct edit survives because CC1 has not moved since
        chain.stage_mut(0).unwrap().set_param(2, 5.0);
        chain.process_block(&mut buf);
        assert_eq!(chain.stage(0).unwrap().get_param(2), 5.0);

        bridge.publish(1, 0);
        chain.process_block(&mut buf);
        assert_eq!(chain.stage(0).unwrap().get_param(2), 0.1);
    }

    #[test]
    fn bypass_before_first_block_snaps() {
        let (_, mut chain) = chain();
        chain.configure(48000.0, 64).unwrap();
        chain.set_bypassed(1, true);
        assert!(chain.is_bypassed(1));
        assert_eq!(chain.slots[1].fade.get(), 0.0);
    }

    #[test]
    fn bypass_while_processing_fades() {
        let (_, mut chain) = chain();
        chain.configure(48000.0, 64).unwrap();
        let mut buf = [0.0f32; 64];
        chain.process_block(&mut buf);
        chain.set_bypassed(1, true);
        assert_eq!(chain.slots[1].fade.get(), 1.0);
        chain.process_block(&mut buf);
        let mid = chain.slots[1].fade.get();
        assert!(mid > 0.0 && mid < 1.0, "fade {mid}");
    }

    #[test]
    fn bypass_route_toggles_stage() {
        let bridge = Arc::new(ParameterBridge::new());
        let mut chain =
            EffectChain::with_routes(Arc::clone(&bridge), [Route::bypass(40, "reverb")]).unwrap();
        chain.configure(48000.0, 64).unwrap();
        bridge.publish(40, 127);
        chain.process_block(&mut [0.0; 64]);
        assert!(chain.is_bypassed(4));
        bridge.publish(40, 0);
        chain.process_block(&mut [0.0; 64]);
        assert!(!chain.is_bypassed(4));
    }

    #[test]
    fn one_controller_drives_several_routes() {
        let bridge = Arc::new(ParameterBridge::new());
        let routes = [
            Route::parameter(7, "pre_gain", "gain"),
            Route::parameter(7, "master_gain", "gain"),
        ];
        let mut chain = EffectChain::with_routes(Arc::clone(&bridge), routes).unwrap();
        chain.configure(48000.0, 64).unwrap();
        bridge.publish(7, 127);
        chain.process_block(&mut [0.0; 64]);
        assert_eq!(chain.stage(1).unwrap().get_param(0), 2.0);
        assert_eq!(chain.stage(5).unwrap().get_param(0), 2.0);
    }

    #[test]
    fn labels_are_case_insensitive() {
        let (_, chain) = chain();
        assert_eq!(chain.stage_index("Master_Gain"), Ok(5));
        assert_eq!(
            chain.stage_index("flanger"),
            Err(ChainError::UnknownStage("flanger".into()))
        );
    }

    #[test]
    fn set_stage_param_uses_plain_units() {
        let (_, mut chain) = chain();
        chain.set_stage_param("delay", "time", 500.0).unwrap();
        assert_eq!(chain.stage(3).unwrap().get_param(0), 500.0);
        assert!(matches!(
            chain.set_stage_param("delay", "depth", 0.5),
            Err(ChainError::UnknownParameter { .. })
        ));
    }

    #[test]
    fn stage_labels_match_kinds() {
        let (_, chain) = chain();
        for i in 0..STAGE_COUNT {
            assert_eq!(chain.stage_label(i), Some(STAGE_LABELS[i]));
            assert_eq!(chain.stage(i).unwrap().kind(), STAGE_KINDS[i]);
        }
        assert!(chain.stage(STAGE_COUNT).is_none());
    }
}
