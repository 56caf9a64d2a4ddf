use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, warn};

const EMBEDDED_FINGERPRINTS: &str = include_str!("../../data/fingerprints.json");

/// Signature of a third-party service whose dangling resources can be
/// claimed again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FingerprintRecord {
    pub service: String,
    #[serde(rename = "cname", default)]
    pub cname_patterns: Vec<String>,
    #[serde(rename = "http_status", default)]
    pub accepted_statuses: Vec<u16>,
    #[serde(rename = "fingerprint", default)]
    pub body_patterns: Vec<String>,
}

impl FingerprintRecord {
    pub fn matches(&self, cname: &str, status: u16, body: &str) -> bool {
        self.cname_patterns
            .iter()
            .any(|pattern| cname.contains(pattern.as_str()))
            && self.accepted_statuses.contains(&status)
            && self
                .body_patterns
                .iter()
                .any(|pattern| body.contains(pattern.as_str()))
    }
}

/// Ordered records; the first matching one wins.
#[derive(Debug, Clone, Default)]
pub struct FingerprintStore {
    records: Vec<FingerprintRecord>,
}

impl FingerprintStore {
    pub fn new(records: Vec<FingerprintRecord>) -> Self {
        // an empty pattern would match every cname or body
        let records = records
            .into_iter()
            .map(|mut record| {
                record.cname_patterns.retain(|pattern| !pattern.is_empty());
                record.body_patterns.retain(|pattern| !pattern.is_empty());
                record
            })
            .collect();

        Self { records }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let records: Vec<FingerprintRecord> = serde_json::from_str(json)?;
        Ok(Self::new(records))
    }

    pub fn embedded() -> Self {
        Self::from_json(EMBEDDED_FINGERPRINTS).unwrap_or_else(|err| {
            warn!("Embedded fingerprints unusable, takeover checks disabled: {}", err);
            Self::default()
        })
    }

    /// A missing or malformed file disables takeover detection instead of
    /// aborting the scan.
    pub fn load_or_empty(path: &Path) -> Self {
        let store = std::fs::read_to_string(path)
            .map_err(crate::Error::from)
            .and_then(|json| Self::from_json(&json));

        match store {
            Ok(store) => {
                debug!("{} fingerprints loaded from {:?}", store.len(), path);
                store
            }
            Err(err) => {
                warn!("Fingerprints {:?} unusable, takeover checks disabled: {}", path, err);
                Self::default()
            }
        }
    }

    pub fn match_first(&self, cname: &str, status: u16, body: &str) -> Option<&FingerprintRecord> {
        self.records
            .iter()
            .find(|record| record.matches(cname, status, body))
    }

    pub fn records(&self) -> &[FingerprintRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
