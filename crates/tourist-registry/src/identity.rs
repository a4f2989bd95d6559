//! Tourist IDs, emergency IDs and registration fingerprints
//!
//! IDs keep their timestamp-derived shape (`T-` + last five digits of the
//! millisecond clock, `EM-` + full millis) but allocation consults the store
//! and steps past anything already taken, so a new record never overwrites an
//! existing one. Callers must hold the registry write lock.

use crate::model::Store;
use crate::{RegistryError, Result};
use hex::ToHex;
use sha2::{Digest, Sha256};

pub const TOURIST_ID_PREFIX: &str = "T-";
pub const EMERGENCY_ID_PREFIX: &str = "EM-";

/// Number of distinct tourist ID suffixes (five decimal digits)
pub const TOURIST_ID_SPACE: i64 = 100_000;

pub fn tourist_id_for(millis: i64) -> String {
    format!("{TOURIST_ID_PREFIX}{:05}", millis.rem_euclid(TOURIST_ID_SPACE))
}

pub fn emergency_id_for(millis: i64) -> String {
    format!("{EMERGENCY_ID_PREFIX}{millis}")
}

/// SHA-256 over `name + millis`, lowercase hex
pub fn fingerprint(name: Option<&str>, millis: i64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(name.unwrap_or("").as_bytes());
    hasher.update(millis.to_string().as_bytes());
    hasher.finalize().encode_hex::<String>()
}

/// First free tourist ID at or after the suffix of `millis`, wrapping at 99999
pub fn allocate_tourist_id(store: &Store, millis: i64) -> Result<String> {
    (0..TOURIST_ID_SPACE)
        .map(|step| tourist_id_for(millis + step))
        .find(|id| !store.tourists.contains_key(id))
        .ok_or(RegistryError::IdSpaceExhausted)
}

pub fn allocate_emergency_id(store: &Store, millis: i64) -> String {
    let mut at = millis;
    loop {
        let id = emergency_id_for(at);
        if !store.emergencies.contains_key(&id) {
            return id;
        }
        at += 1;
    }
}

/// Fingerprint for a registration at `millis`. If another tourist already
/// holds that digest (same name within the same millisecond) the hashed
/// instant moves forward one millisecond at a time until the digest is unused.
pub fn allocate_fingerprint(store: &Store, name: Option<&str>, millis: i64) -> String {
    let mut at = millis;
    loop {
        let digest = fingerprint(name, at);
        if !store.fingerprint_taken(&digest) {
            return digest;
        }
        tracing::debug!(millis = at, "fingerprint collision, advancing instant");
        at += 1;
    }
}
