//! Persisted document model
//!
//! Field names are camelCase on disk and on the wire. Caller-supplied fields
//! are kept as raw JSON values, stored exactly as sent and omitted from the
//! document when absent; only fields the service writes itself are typed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Root document: every tourist, every emergency and the system counters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Store {
    pub tourists: BTreeMap<String, Tourist>,
    pub emergencies: BTreeMap<String, Emergency>,
    pub system: SystemCounters,
}

impl Store {
    /// Linear scan for the tourist holding `fingerprint`
    pub fn find_by_fingerprint(&self, fingerprint: &str) -> Option<&Tourist> {
        self.tourists
            .values()
            .find(|t| t.blockchain_hash == fingerprint)
    }

    pub fn fingerprint_taken(&self, fingerprint: &str) -> bool {
        self.find_by_fingerprint(fingerprint).is_some()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SystemCounters {
    pub total_tourists: u64,
    pub total_emergencies: u64,
    /// Incremented once per successful registration
    pub block_height: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tourist {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nationality: Option<Value>,
    #[serde(default = "no_contacts")]
    pub emergency_contacts: Value,
    /// Registration fingerprint (SHA-256 of name + registration millis)
    pub blockchain_hash: String,
    pub is_active: bool,
    pub registered_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_location: Option<GeoPoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_risk: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
}

impl Tourist {
    /// Name as text for fingerprinting; anything but a JSON string hashes as ""
    pub fn name_text(name: Option<&Value>) -> &str {
        name.and_then(Value::as_str).unwrap_or("")
    }
}

fn no_contacts() -> Value {
    Value::Array(Vec::new())
}

/// Coordinates as reported by the client, unvalidated
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lng: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Emergency {
    pub id: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Value>,
    pub status: String,
    pub timestamp: DateTime<Utc>,
}

/// Status assigned to every new emergency
pub const EMERGENCY_STATUS_OPEN: &str = "OPEN";
