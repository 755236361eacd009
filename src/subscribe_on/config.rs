//! Construction-time configuration of the operator.

use std::fmt;
use std::sync::Arc;

use super::SubscribeOn;
use crate::flow::Source;
use crate::scheduler::Scheduler;

/// How a subscriber is connected and how its demand and cancel are routed.
///
/// | Strategy | eager cancel | dispatch demand |
/// |----------|--------------|-----------------|
/// | `Classic` | yes | yes |
/// | `EagerDirect` | yes | no |
/// | `NonEager` | no | yes |
/// | `Direct` | no | no |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// Scheduled connect and per-request scheduled demand, both stoppable.
    Classic,
    /// Stoppable scheduled connect, demand forwarded synchronously.
    EagerDirect,
    /// Fire-and-forget connect and demand dispatch.
    NonEager,
    /// Fire-and-forget connect, the source's own subscription is exposed.
    Direct,
}

impl Strategy {
    /// Picks the strategy for the two flags.
    #[must_use]
    pub const fn from_flags(eager_cancel: bool, dispatch_demand: bool) -> Self {
        match (eager_cancel, dispatch_demand) {
            (true, true) => Self::Classic,
            (true, false) => Self::EagerDirect,
            (false, true) => Self::NonEager,
            (false, false) => Self::Direct,
        }
    }

    /// Returns true if cancel stops in-flight scheduled work.
    #[must_use]
    pub const fn eager_cancel(self) -> bool {
        matches!(self, Self::Classic | Self::EagerDirect)
    }

    /// Returns true if each request is routed through the scheduler.
    #[must_use]
    pub const fn dispatch_demand(self) -> bool {
        matches!(self, Self::Classic | Self::NonEager)
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Classic => "classic",
            Self::EagerDirect => "eager-direct",
            Self::NonEager => "non-eager",
            Self::Direct => "direct",
        };
        f.write_str(name)
    }
}

/// Flags selecting a [`Strategy`].
///
/// The default enables both, which selects [`Strategy::Classic`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscribeOnConfig {
    /// Stop in-flight scheduled work on cancel.
    pub eager_cancel: bool,
    /// Route every request through the scheduler.
    pub dispatch_demand: bool,
}

impl SubscribeOnConfig {
    /// Creates a configuration from the two flags.
    #[must_use]
    pub const fn new(eager_cancel: bool, dispatch_demand: bool) -> Self {
        Self {
            eager_cancel,
            dispatch_demand,
        }
    }

    /// Returns the strategy these flags select.
    #[must_use]
    pub const fn strategy(&self) -> Strategy {
        Strategy::from_flags(self.eager_cancel, self.dispatch_demand)
    }
}

impl Default for SubscribeOnConfig {
    fn default() -> Self {
        Self::new(true, true)
    }
}

impl From<Strategy> for SubscribeOnConfig {
    fn from(strategy: Strategy) -> Self {
        Self::new(strategy.eager_cancel(), strategy.dispatch_demand())
    }
}

/// Builder for [`SubscribeOn`].
pub struct SubscribeOnBuilder<T> {
    source: Source<T>,
    scheduler: Arc<dyn Scheduler>,
    config: SubscribeOnConfig,
}

impl<T> SubscribeOnBuilder<T> {
    pub(super) fn new(source: Source<T>, scheduler: Arc<dyn Scheduler>) -> Self {
        Self {
            source,
            scheduler,
            config: SubscribeOnConfig::default(),
        }
    }

    /// Sets whether cancel stops in-flight scheduled work.
    #[must_use]
    pub fn eager_cancel(mut self, enable: bool) -> Self {
        self.config.eager_cancel = enable;
        self
    }

    /// Sets whether each request is routed through the scheduler.
    #[must_use]
    pub fn dispatch_demand(mut self, enable: bool) -> Self {
        self.config.dispatch_demand = enable;
        self
    }

    /// Sets both flags from a strategy.
    #[must_use]
    pub fn strategy(mut self, strategy: Strategy) -> Self {
        self.config = strategy.into();
        self
    }

    /// Builds the operator.
    #[must_use]
    pub fn build(self) -> SubscribeOn<T> {
        SubscribeOn::from_parts(self.source, self.scheduler, self.config)
    }
}

impl<T> fmt::Debug for SubscribeOnBuilder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscribeOnBuilder")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
