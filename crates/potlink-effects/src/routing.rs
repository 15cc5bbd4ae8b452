//! Controller-to-parameter routing.
//!
//! A [`Route`] ties one controller number to either a stage parameter or a
//! stage's bypass switch. Routes name stages and parameters by string so they
//! can come from a settings file; the chain resolves them to indices once,
//! when it is built, and the audio thread only ever sees the resolved form.
//!
//! One controller may drive several routes.

use std::borrow::Cow;
use std::fmt;

/// What a route drives.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RouteTarget {
    /// A named parameter; the normalized controller value is mapped through
    /// the parameter's range.
    Parameter(Cow<'static, str>),
    /// The stage's bypass switch; values at or above 0.5 bypass.
    Bypass,
}

/// One controller routing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Route {
    /// Controller number, 0–127.
    pub controller: u8,
    /// Stage label, e.g. `"compressor"` or `"master_gain"`.
    pub stage: Cow<'static, str>,
    /// Parameter or bypass.
    pub target: RouteTarget,
}

impl Route {
    /// Route `controller` to `stage.param`.
    pub fn parameter(
        controller: u8,
        stage: impl Into<Cow<'static, str>>,
        param: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self {
            controller,
            stage: stage.into(),
            target: RouteTarget::Parameter(param.into()),
        }
    }

    /// Route `controller` to the bypass switch of `stage`.
    pub fn bypass(controller: u8, stage: impl Into<Cow<'static, str>>) -> Self {
        Self {
            controller,
            stage: stage.into(),
            target: RouteTarget::Bypass,
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.target {
            RouteTarget::Parameter(param) => {
                write!(f, "CC{} -> {}.{}", self.controller, self.stage, param)
            }
            RouteTarget::Bypass => write!(f, "CC{} -> {} (bypass)", self.controller, self.stage),
        }
    }
}

/// Default controller table: one controller per parameter, starting at CC1.
const DEFAULT_TABLE: [(u8, &str, &str); 21] = [
    (1, "compressor", "attack"),
    (2, "compressor", "release"),
    (3, "compressor", "ratio"),
    (4, "compressor", "threshold"),
    (5, "compressor", "makeup"),
    (6, "pre_gain", "gain"),
    (7, "chorus", "rate"),
    (8, "chorus", "depth"),
    (9, "chorus", "centre_delay"),
    (10, "chorus", "feedback"),
    (11, "chorus", "mix"),
    (12, "delay", "time"),
    (13, "delay", "feedback"),
    (14, "delay", "mix"),
    (15, "reverb", "room_size"),
    (16, "reverb", "damping"),
    (17, "reverb", "wet_level"),
    (18, "reverb", "dry_level"),
    (19, "reverb", "width"),
    (20, "reverb", "freeze"),
    (21, "master_gain", "gain"),
];

/// The built-in routing table.
///
/// ```rust
/// use potlink_effects::{RouteTarget, default_routes};
///
/// let routes = default_routes();
/// assert_eq!(routes[0].controller, 1);
/// assert_eq!(routes[0].stage, "compressor");
/// assert_eq!(routes[0].target, RouteTarget::Parameter("attack".into()));
/// ```
pub fn default_routes() -> Vec<Route> {
    DEFAULT_TABLE
        .iter()
        .map(|&(cc, stage, param)| Route::parameter(cc, stage, param))
        .collect()
}

/// Resolved form of [`RouteTarget`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedTarget {
    /// Parameter index within the stage.
    Parameter(usize),
    /// Bypass switch.
    Bypass,
}

/// A route after name lookup, as the chain applies it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedRoute {
    pub(crate) controller: u8,
    pub(crate) stage: usize,
    pub(crate) target: ResolvedTarget,
    /// Bridge revision last applied through this route; 0 = never.
    pub(crate) last_revision: u32,
}

impl ResolvedRoute {
    /// Controller number.
    pub fn controller(&self) -> u8 {
        self.controller
    }

    /// Index of the stage in the chain.
    pub fn stage(&self) -> usize {
        self.stage
    }

    /// Parameter index or bypass.
    pub fn target(&self) -> ResolvedTarget {
        self.target
    }
}
