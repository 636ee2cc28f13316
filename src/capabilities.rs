//! Runtime capability probing
//!
//! Optional functionality is compiled in through Cargo features. The pipeline
//! never branches on `cfg` directly; it asks a [`Capabilities`] value resolved
//! once when the processor is configured.

use serde::{Deserialize, Serialize};

/// Optional capabilities available to the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    /// Learned (ONNX) segmentation can be used
    pub learned_segmentation: bool,
    /// Guided-filter refinement can be used
    pub guided_filter: bool,
}

impl Capabilities {
    /// Resolve the capabilities compiled into this build
    #[must_use]
    pub const fn probe() -> Self {
        Self {
            learned_segmentation: cfg!(feature = "onnx"),
            guided_filter: cfg!(feature = "guided-filter"),
        }
    }

    /// Classical segmentation with bilateral fallback only
    #[must_use]
    pub const fn classical_only() -> Self {
        Self {
            learned_segmentation: false,
            guided_filter: false,
        }
    }

    /// Every optional capability enabled
    #[must_use]
    pub const fn full() -> Self {
        Self {
            learned_segmentation: true,
            guided_filter: true,
        }
    }

    /// Same capabilities with the guided filter switched off or on
    #[must_use]
    pub const fn with_guided_filter(mut self, available: bool) -> Self {
        self.guided_filter = available;
        self
    }

    /// Same capabilities with learned segmentation switched off or on
    #[must_use]
    pub const fn with_learned_segmentation(mut self, available: bool) -> Self {
        self.learned_segmentation = available;
        self
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::probe()
    }
}

impl std::fmt::Display for Capabilities {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let flag = |on: bool| if on { "yes" } else { "no" };
        write!(
            f,
            "learned segmentation: {}, guided filter: {}",
            flag(self.learned_segmentation),
            flag(self.guided_filter)
        )
    }
}
