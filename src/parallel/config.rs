//! Run configuration: how many tasks may be in flight at once.

use crate::error::{Error, Result};
use std::fmt;
use std::num::NonZeroUsize;

/// Cap on simultaneously outstanding tasks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Limit {
    /// Launch everything up front
    #[default]
    Unbounded,
    /// At most this many at once
    Bounded(NonZeroUsize),
}

impl Limit {
    /// One at a time
    pub const SERIES: Limit = Limit::Bounded(NonZeroUsize::MIN);

    /// Bounded limit; zero is rejected
    pub fn new(limit: usize) -> Result<Self> {
        NonZeroUsize::new(limit)
            .map(Limit::Bounded)
            .ok_or(Error::InvalidLimit(limit))
    }

    /// One slot per CPU
    pub fn cpus() -> Self {
        Limit::Bounded(NonZeroUsize::new(num_cpus::get()).unwrap_or(NonZeroUsize::MIN))
    }

    /// Effective cap for a collection of `len` items, never below one
    pub fn cap(&self, len: usize) -> usize {
        match self {
            Limit::Unbounded => len.max(1),
            Limit::Bounded(n) => n.get(),
        }
    }
}

impl fmt::Display for Limit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Limit::Unbounded => f.write_str("unbounded"),
            Limit::Bounded(n) => write!(f, "{}", n),
        }
    }
}

impl TryFrom<usize> for Limit {
    type Error = Error;

    fn try_from(limit: usize) -> Result<Self> {
        Limit::new(limit)
    }
}

/// Configuration for a bounded run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IterConfig {
    /// Maximum number of tasks in flight (default: unbounded)
    pub limit: Limit,
    /// Name attached to this run's tracing events
    pub label: &'static str,
}

impl Default for IterConfig {
    fn default() -> Self {
        Self {
            limit: Limit::Unbounded,
            label: "parallel",
        }
    }
}

impl IterConfig {
    /// Everything at once
    pub fn parallel() -> Self {
        Self::default()
    }

    /// Strictly one after another
    pub fn series() -> Self {
        Self {
            limit: Limit::SERIES,
            label: "series",
        }
    }

    /// At most `limit` at once
    pub fn limited(limit: usize) -> Result<Self> {
        Ok(Self {
            limit: Limit::new(limit)?,
            label: "limited",
        })
    }

    /// One task per CPU, for workers that hand CPU-bound work to
    /// `spawn_blocking`
    pub fn per_cpu() -> Self {
        Self {
            limit: Limit::cpus(),
            label: "per_cpu",
        }
    }

    /// Rename the run in tracing output
    pub fn with_label(mut self, label: &'static str) -> Self {
        self.label = label;
        self
    }
}
