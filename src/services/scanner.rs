use serde::Serialize;
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanVerdict {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reservation_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stall_name: Option<String>,
    pub message: String,
}

// Per-scanner de-duplication of verification calls. While a camera keeps
// seeing the same code, the decoded value repeats on every frame; the
// verdict for the last payload is replayed instead of re-verified until
// the scanner is explicitly reset.
#[derive(Debug, Default)]
pub struct ScannerRegistry {
    last: RwLock<HashMap<String, (String, ScanVerdict)>>,
}

impl ScannerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // Some(verdict) when the payload is identical to the last one this
    // scanner verified; the caller must skip verification then.
    pub fn replay(&self, scanner_id: &str, payload: &str) -> Option<ScanVerdict> {
        let last = self.last.read().unwrap();
        match last.get(scanner_id) {
            Some((seen, verdict)) if seen == payload => Some(verdict.clone()),
            _ => None,
        }
    }

    pub fn record(&self, scanner_id: &str, payload: &str, verdict: &ScanVerdict) {
        let mut last = self.last.write().unwrap();
        last.insert(
            scanner_id.to_string(),
            (payload.to_string(), verdict.clone()),
        );
    }

    pub fn reset(&self, scanner_id: &str) {
        let mut last = self.last.write().unwrap();
        last.remove(scanner_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verdict(valid: bool) -> ScanVerdict {
        ScanVerdict {
            valid,
            reservation_id: None,
            stall_name: None,
            message: "test".to_string(),
        }
    }

    #[test]
    fn identical_payload_replays_without_reverification() {
        let registry = ScannerRegistry::new();
        let payload = "STALL-A1-RES-12345";

        assert!(registry.replay("scanner-1", payload).is_none());
        registry.record("scanner-1", payload, &verdict(true));

        // Second sighting of the same code: replayed, not re-verified
        let replayed = registry.replay("scanner-1", payload).unwrap();
        assert!(replayed.valid);
    }

    #[test]
    fn different_payload_is_verified_again() {
        let registry = ScannerRegistry::new();
        registry.record("scanner-1", "STALL-A1-RES-1", &verdict(true));
        assert!(registry.replay("scanner-1", "STALL-A2-RES-2").is_none());
    }

    #[test]
    fn reset_rearms_the_scanner() {
        let registry = ScannerRegistry::new();
        registry.record("scanner-1", "STALL-A1-RES-1", &verdict(false));
        assert!(registry.replay("scanner-1", "STALL-A1-RES-1").is_some());

        registry.reset("scanner-1");
        assert!(registry.replay("scanner-1", "STALL-A1-RES-1").is_none());
    }

    #[test]
    fn scanners_are_independent() {
        let registry = ScannerRegistry::new();
        registry.record("scanner-1", "STALL-A1-RES-1", &verdict(true));
        assert!(registry.replay("scanner-2", "STALL-A1-RES-1").is_none());
    }
}
