//! Registry handle
//!
//! One [`Registry`] is shared by every request. It owns the file store behind
//! an async mutex: each operation loads the document, applies one change and
//! saves it before the lock is released, so two concurrent writers can never
//! both start from the same snapshot.

use crate::clock::Clock;
use crate::identity;
use crate::model::{Emergency, GeoPoint, Store, SystemCounters, Tourist, EMERGENCY_STATUS_OPEN};
use crate::risk::RiskAssessment;
use crate::store::JsonFileStore;
use crate::{RegistryError, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

// Request bodies take caller fields as raw JSON: they are stored, never checked.

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTourist {
    pub name: Option<Value>,
    pub phone: Option<Value>,
    pub nationality: Option<Value>,
    pub emergency_contacts: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LocationUpdate {
    pub lat: Option<Value>,
    pub lng: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEmergency {
    pub emergency_type: Option<Value>,
    pub description: Option<Value>,
    pub location: Option<Value>,
}

/// Falsy contact lists (absent, null, false, 0, "") become `[]`
fn contacts_or_empty(contacts: Option<Value>) -> Value {
    match contacts {
        None | Some(Value::Null) | Some(Value::Bool(false)) => Value::Array(Vec::new()),
        Some(Value::String(s)) if s.is_empty() => Value::Array(Vec::new()),
        Some(Value::Number(n)) if n.as_f64() == Some(0.0) => Value::Array(Vec::new()),
        Some(other) => other,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub tourist_id: String,
    pub fingerprint: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmergencyReport {
    pub emergency_id: String,
}

#[derive(Clone)]
pub struct Registry {
    store: Arc<Mutex<JsonFileStore>>,
    clock: Arc<dyn Clock>,
}

impl Registry {
    pub fn new(store: JsonFileStore, clock: Arc<dyn Clock>) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
            clock,
        }
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Load (creating if needed) the backing file once and report its counters
    pub async fn open(&self) -> Result<SystemCounters> {
        let store = self.store.lock().await;
        let doc = store.load()?;
        info!(
            "Store {} ready: {} tourists, {} emergencies (on corrupt: {})",
            store.path().display(),
            doc.tourists.len(),
            doc.emergencies.len(),
            store.policy()
        );
        Ok(doc.system)
    }

    pub async fn register_tourist(&self, req: NewTourist) -> Result<Registration> {
        self.mutate(|doc, clock| {
            let now = clock.now_utc();
            let millis = now.timestamp_millis();

            let tourist_id = identity::allocate_tourist_id(doc, millis)?;
            let name = Tourist::name_text(req.name.as_ref());
            let fingerprint = identity::allocate_fingerprint(doc, Some(name), millis);

            doc.tourists.insert(
                tourist_id.clone(),
                Tourist {
                    id: tourist_id.clone(),
                    name: req.name,
                    phone: req.phone,
                    nationality: req.nationality,
                    emergency_contacts: contacts_or_empty(req.emergency_contacts),
                    blockchain_hash: fingerprint.clone(),
                    is_active: true,
                    registered_at: now,
                    last_location: None,
                    current_risk: None,
                    last_updated: None,
                },
            );
            doc.system.total_tourists += 1;
            doc.system.block_height += 1;

            info!(tourist_id = %tourist_id, block_height = doc.system.block_height, "Tourist registered");
            Ok(Registration {
                tourist_id,
                fingerprint,
            })
        })
        .await
    }

    pub async fn record_location(&self, id: &str, update: LocationUpdate) -> Result<RiskAssessment> {
        self.mutate(|doc, clock| {
            let tourist = doc
                .tourists
                .get_mut(id)
                .ok_or_else(|| RegistryError::TouristNotFound(id.to_string()))?;

            let now = clock.now();
            let risk = RiskAssessment::at(&now);

            tourist.last_location = Some(GeoPoint {
                lat: update.lat,
                lng: update.lng,
            });
            tourist.current_risk = Some(risk.score);
            tourist.last_updated = Some(now.with_timezone(&Utc));

            if risk.is_high_risk() {
                warn!(tourist_id = %id, score = risk.score, "{}", risk.message);
            } else {
                debug!(tourist_id = %id, score = risk.score, "Location updated");
            }
            Ok(risk)
        })
        .await
    }

    pub async fn record_emergency(&self, req: NewEmergency) -> Result<EmergencyReport> {
        self.mutate(|doc, clock| {
            let now = clock.now_utc();
            let emergency_id = identity::allocate_emergency_id(doc, now.timestamp_millis());

            doc.emergencies.insert(
                emergency_id.clone(),
                Emergency {
                    id: emergency_id.clone(),
                    kind: req.emergency_type,
                    description: req.description,
                    location: req.location,
                    status: EMERGENCY_STATUS_OPEN.to_string(),
                    timestamp: now,
                },
            );
            doc.system.total_emergencies += 1;

            warn!(emergency_id = %emergency_id, "Emergency recorded");
            Ok(EmergencyReport { emergency_id })
        })
        .await
    }

    /// System counters. Never fails: an unreadable store reports zeros.
    pub async fn stats(&self) -> SystemCounters {
        match self.read(|doc| doc.system).await {
            Ok(counters) => counters,
            Err(e) => {
                warn!("Stats unavailable, reporting zeros: {}", e);
                SystemCounters::default()
            }
        }
    }

    pub async fn verify(&self, fingerprint: &str) -> Result<Tourist> {
        self.read(|doc| doc.find_by_fingerprint(fingerprint).cloned())
            .await?
            .ok_or_else(|| RegistryError::FingerprintNotFound(fingerprint.to_string()))
    }

    #[cfg(test)]
    pub async fn tourist(&self, id: &str) -> Result<Tourist> {
        self.read(|doc| doc.tourists.get(id).cloned())
            .await?
            .ok_or_else(|| RegistryError::TouristNotFound(id.to_string()))
    }

    #[cfg(test)]
    pub async fn emergency(&self, id: &str) -> Result<Option<Emergency>> {
        self.read(|doc| doc.emergencies.get(id).cloned()).await
    }

    async fn read<T>(&self, f: impl FnOnce(&Store) -> T) -> Result<T> {
        let store = self.store.lock().await;
        let doc = store.load()?;
        Ok(f(&doc))
    }

    /// Load, apply `f`, and save only if `f` succeeded
    async fn mutate<T>(&self, f: impl FnOnce(&mut Store, &dyn Clock) -> Result<T>) -> Result<T> {
        let store = self.store.lock().await;
        let mut doc = store.load()?;
        let out = f(&mut doc, self.clock.as_ref())?;
        store.save(&doc)?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::risk::{HIGH_RISK_MESSAGE, SAFE_MESSAGE};
    use crate::identity::fingerprint;
    use crate::store::CorruptionPolicy;
    use serde_json::json;
    use std::fs;
    use tempfile::{tempdir, TempDir};

    fn registry_at_hour(hour: u32) -> (TempDir, Arc<FixedClock>, Registry) {
        let dir = tempdir().unwrap();
        let clock = Arc::new(FixedClock::at_hour(hour));
        let store = JsonFileStore::new(dir.path().join("data.json"), CorruptionPolicy::default());
        let registry = Registry::new(store, clock.clone());
        (dir, clock, registry)
    }

    fn alice() -> NewTourist {
        NewTourist {
            name: Some(json!("Alice")),
            phone: Some(json!("+91-9000000000")),
            nationality: Some(json!("IN")),
            emergency_contacts: None,
        }
    }

    fn is_tourist_id(id: &str) -> bool {
        id.len() == 7 && id.starts_with("T-") && id[2..].chars().all(|c| c.is_ascii_digit())
    }

    #[tokio::test]
    async fn test_register_tourist() {
        let (_dir, _clock, registry) = registry_at_hour(10);

        let reg = registry.register_tourist(alice()).await.unwrap();
        assert!(is_tourist_id(&reg.tourist_id), "bad id {}", reg.tourist_id);
        assert_eq!(reg.fingerprint.len(), 64);
        assert!(reg.fingerprint.chars().all(|c| c.is_ascii_hexdigit()));

        let stats = registry.stats().await;
        assert_eq!(stats.total_tourists, 1);
        assert_eq!(stats.block_height, 1);

        let stored = registry.tourist(&reg.tourist_id).await.unwrap();
        assert!(stored.is_active);
        assert_eq!(stored.emergency_contacts, json!([]));
        assert_eq!(stored.blockchain_hash, reg.fingerprint);
        assert!(stored.last_location.is_none());
    }

    #[tokio::test]
    async fn test_same_instant_registrations_stay_distinct() {
        let (_dir, _clock, registry) = registry_at_hour(10);

        let first = registry.register_tourist(alice()).await.unwrap();
        let second = registry.register_tourist(alice()).await.unwrap();

        assert_ne!(first.tourist_id, second.tourist_id);
        assert_ne!(first.fingerprint, second.fingerprint);
        assert_eq!(registry.verify(&first.fingerprint).await.unwrap().id, first.tourist_id);
        assert_eq!(registry.verify(&second.fingerprint).await.unwrap().id, second.tourist_id);

        let stats = registry.stats().await;
        assert_eq!(stats.total_tourists, 2);
        assert_eq!(stats.block_height, 2);
    }

    #[tokio::test]
    async fn test_verify_unknown_fingerprint() {
        let (_dir, _clock, registry) = registry_at_hour(10);
        let err = registry.verify("deadbeef").await.unwrap_err();
        assert!(matches!(err, RegistryError::FingerprintNotFound(_)));
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_location_risk_by_hour() {
        let (_dir, clock, registry) = registry_at_hour(23);
        let reg = registry.register_tourist(alice()).await.unwrap();

        let night = registry
            .record_location(&reg.tourist_id, LocationUpdate { lat: Some(json!(27.17)), lng: Some(json!(78.04)) })
            .await
            .unwrap();
        assert_eq!(night.score, 0.85);
        assert_eq!(night.message, HIGH_RISK_MESSAGE);

        let stored = registry.tourist(&reg.tourist_id).await.unwrap();
        assert_eq!(stored.current_risk, Some(0.85));
        assert_eq!(stored.last_location.and_then(|p| p.lat), Some(json!(27.17)));
        assert!(stored.last_updated.is_some());

        clock.set(FixedClock::at_hour(10).now());
        let day = registry
            .record_location(&reg.tourist_id, LocationUpdate::default())
            .await
            .unwrap();
        assert_eq!(day.score, 0.15);
        assert_eq!(day.message, SAFE_MESSAGE);
        assert_eq!(registry.tourist(&reg.tourist_id).await.unwrap().current_risk, Some(0.15));
    }

    #[tokio::test]
    async fn test_caller_fields_stored_as_sent() {
        let (_dir, clock, registry) = registry_at_hour(10);

        let reg = registry
            .register_tourist(NewTourist {
                name: Some(json!(42)),
                phone: Some(json!(9000000000u64)),
                nationality: None,
                emergency_contacts: Some(json!({ "primary": "Bob" })),
            })
            .await
            .unwrap();

        let stored = registry.tourist(&reg.tourist_id).await.unwrap();
        assert_eq!(stored.phone, Some(json!(9000000000u64)));
        assert_eq!(stored.emergency_contacts, json!({ "primary": "Bob" }));
        // Non-string names fingerprint as the empty string
        assert_eq!(reg.fingerprint, fingerprint(Some(""), clock.now_millis()));

        registry
            .record_location(
                &reg.tourist_id,
                LocationUpdate { lat: Some(json!("27.1")), lng: Some(json!("78.0")) },
            )
            .await
            .unwrap();
        let stored = registry.tourist(&reg.tourist_id).await.unwrap();
        assert_eq!(
            stored.last_location,
            Some(GeoPoint { lat: Some(json!("27.1")), lng: Some(json!("78.0")) })
        );
    }

    #[test]
    fn test_falsy_contacts_become_empty() {
        for falsy in [json!(null), json!(false), json!(0), json!("")] {
            assert_eq!(contacts_or_empty(Some(falsy)), json!([]));
        }
        assert_eq!(contacts_or_empty(None), json!([]));
        assert_eq!(contacts_or_empty(Some(json!(["Bob"]))), json!(["Bob"]));
    }

    #[tokio::test]
    async fn test_location_for_unknown_tourist() {
        let (dir, _clock, registry) = registry_at_hour(10);
        registry.open().await.unwrap();
        let before = fs::read(dir.path().join("data.json")).unwrap();

        let err = registry
            .record_location("T-99999", LocationUpdate::default())
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::TouristNotFound(ref id) if id == "T-99999"));

        // Failed mutations are not persisted
        assert_eq!(fs::read(dir.path().join("data.json")).unwrap(), before);
    }

    #[tokio::test]
    async fn test_record_emergency() {
        let (_dir, _clock, registry) = registry_at_hour(10);

        let report = registry
            .record_emergency(NewEmergency {
                emergency_type: Some(json!("MEDICAL")),
                description: Some(json!("Sprained ankle")),
                location: Some(json!({ "lat": 27.17, "lng": 78.04 })),
            })
            .await
            .unwrap();
        assert!(report.emergency_id.starts_with("EM-"));
        assert!(report.emergency_id[3..].chars().all(|c| c.is_ascii_digit()));

        let stored = registry.emergency(&report.emergency_id).await.unwrap().unwrap();
        assert_eq!(stored.status, "OPEN");
        assert_eq!(stored.kind, Some(json!("MEDICAL")));
        assert_eq!(registry.stats().await.total_emergencies, 1);

        // Same millisecond still yields a new record
        let again = registry.record_emergency(NewEmergency::default()).await.unwrap();
        assert_ne!(again.emergency_id, report.emergency_id);
        assert_eq!(registry.stats().await.total_emergencies, 2);
    }

    #[tokio::test]
    async fn test_stats_fall_back_to_zero() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.json");
        let registry = Registry::new(
            JsonFileStore::new(&path, CorruptionPolicy::Refuse),
            Arc::new(FixedClock::at_hour(10)),
        );
        registry.register_tourist(alice()).await.unwrap();
        assert_eq!(registry.stats().await.total_tourists, 1);

        fs::write(&path, b"garbage").unwrap();
        assert_eq!(registry.stats().await, SystemCounters::default());
        assert!(registry.register_tourist(alice()).await.is_err());

        fs::remove_file(&path).unwrap();
        assert_eq!(registry.stats().await, SystemCounters::default());
    }

    #[tokio::test]
    async fn test_concurrent_registrations_are_not_lost() {
        let (_dir, clock, registry) = registry_at_hour(10);

        let mut tasks = Vec::new();
        for i in 0..16 {
            clock.advance_millis(1);
            let registry = registry.clone();
            tasks.push(tokio::spawn(async move {
                registry
                    .register_tourist(NewTourist {
                        name: Some(json!(format!("Tourist {i}"))),
                        ..NewTourist::default()
                    })
                    .await
            }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let stats = registry.stats().await;
        assert_eq!(stats.total_tourists, 16);
        assert_eq!(stats.block_height, 16);
    }
}
