//! Hospitals known to the coordinator.

use std::collections::HashMap;

use corechain_types::{HospitalId, Timestamp};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HospitalRecord {
    pub hospital_id: HospitalId,
    pub hospital_name: String,
    pub dataset_size: u64,
    pub dataset_type: String,
    pub registered_at: Timestamp,
}

#[derive(Default)]
pub struct HospitalRegistry {
    hospitals: RwLock<HashMap<HospitalId, HospitalRecord>>,
}

impl HospitalRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or refresh a hospital. A re-registration keeps the original
    /// `registered_at`. Returns the number of known hospitals.
    pub fn upsert(&self, mut record: HospitalRecord) -> usize {
        let mut hospitals = self.hospitals.write();
        if let Some(existing) = hospitals.get(&record.hospital_id) {
            record.registered_at = existing.registered_at;
        }
        hospitals.insert(record.hospital_id.clone(), record);
        hospitals.len()
    }

    pub fn get(&self, id: &HospitalId) -> Option<HospitalRecord> {
        self.hospitals.read().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.hospitals.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.hospitals.read().is_empty()
    }

    /// All records, oldest registration first.
    pub fn list(&self) -> Vec<HospitalRecord> {
        let mut all: Vec<_> = self.hospitals.read().values().cloned().collect();
        all.sort_by(|a, b| {
            a.registered_at
                .cmp(&b.registered_at)
                .then_with(|| a.hospital_id.as_str().cmp(b.hospital_id.as_str()))
        });
        all
    }
}
