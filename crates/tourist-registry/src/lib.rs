//! Tourist Registry Library
//!
//! Registration, live-location risk flags and emergency records for the
//! Suraksha Yatra tourist safety service. All state lives in a single
//! pretty-printed JSON document on disk; the [`Registry`] handle serializes
//! every load/mutate/save cycle so concurrent requests never lose updates.

use std::path::PathBuf;
use thiserror::Error;

pub mod clock;
pub mod identity;
pub mod model;
pub mod registry;
pub mod risk;
pub mod store;

pub use clock::{Clock, FixedClock, SystemClock};
pub use model::{Emergency, GeoPoint, Store, SystemCounters, Tourist};
pub use registry::{
    EmergencyReport, LocationUpdate, NewEmergency, NewTourist, Registration, Registry,
};
pub use risk::{RiskAssessment, RiskLevel};
pub use store::{CorruptionPolicy, JsonFileStore};

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Store file {path:?} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Tourist not found: {0}")]
    TouristNotFound(String),
    #[error("No tourist registered with fingerprint {0}")]
    FingerprintNotFound(String),
    #[error("Tourist ID space exhausted")]
    IdSpaceExhausted,
}

impl RegistryError {
    /// True for lookups that missed, as opposed to storage failures
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            RegistryError::TouristNotFound(_) | RegistryError::FingerprintNotFound(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, RegistryError>;
