//! Inspection toggles.
//!
//! Whether a request is dumped and/or logged is decided outside the inspector.
//! A [`ToggleSource`] is injected at construction and queried once per call.

use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::config::InspectionConfig;

/// Resolved toggle decisions for one inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Toggles {
    pub raw_dump: bool,
    pub structured_log: bool,
}

impl Toggles {
    pub const ALL: Toggles = Toggles {
        raw_dump: true,
        structured_log: true,
    };

    pub const NONE: Toggles = Toggles {
        raw_dump: false,
        structured_log: false,
    };
}

/// Provider of toggle decisions.
pub trait ToggleSource: Send + Sync {
    fn resolve(&self) -> Toggles;
}

impl ToggleSource for Toggles {
    fn resolve(&self) -> Toggles {
        *self
    }
}

/// Toggles read from the live configuration.
///
/// The configuration can be swapped at any time (hot reload); each
/// inspection sees one consistent snapshot.
#[derive(Debug)]
pub struct ConfigToggles {
    current: ArcSwap<InspectionConfig>,
}

impl ConfigToggles {
    pub fn new(config: InspectionConfig) -> Self {
        Self {
            current: ArcSwap::from_pointee(config),
        }
    }

    /// Replace the configuration used by subsequent inspections.
    pub fn update(&self, config: InspectionConfig) {
        self.current.store(Arc::new(config));
    }

    pub fn snapshot(&self) -> Arc<InspectionConfig> {
        self.current.load_full()
    }
}

impl ToggleSource for ConfigToggles {
    fn resolve(&self) -> Toggles {
        let config = self.current.load();
        Toggles {
            raw_dump: config.raw_dump,
            structured_log: config.structured_log,
        }
    }
}
