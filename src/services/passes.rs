//! Entry-pass payload codec.
//!
//! A confirmed reservation is presented at the venue gate as a QR code whose
//! payload is the literal string `STALL-<stallName>-RES-<reservationId>`.
//! The payload itself is not secret, so issuance also produces a detached
//! signature (SHA-256 over payload + service secret, base64) that the
//! verification endpoint checks before trusting the decoded value.

use base64::{engine::general_purpose, Engine as _};
use sha2::{Digest, Sha256};
use thiserror::Error;
use uuid::Uuid;

const PASS_PREFIX: &str = "STALL-";
const RES_MARKER: &str = "-RES-";

#[derive(Debug, Error, PartialEq)]
pub enum PassError {
    #[error("Pass payload is malformed")]
    Malformed,
    #[error("Pass signature mismatch")]
    BadSignature,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PassRef {
    pub stall_name: String,
    pub reservation_id: Uuid,
}

pub fn format_payload(stall_name: &str, reservation_id: Uuid) -> String {
    format!("{}{}{}{}", PASS_PREFIX, stall_name, RES_MARKER, reservation_id)
}

// Stall names may themselves contain `-RES-`, so the split point is the
// last occurrence of the marker; the trailing segment must be a UUID.
pub fn parse_payload(payload: &str) -> Result<PassRef, PassError> {
    let rest = payload.strip_prefix(PASS_PREFIX).ok_or(PassError::Malformed)?;
    let split = rest.rfind(RES_MARKER).ok_or(PassError::Malformed)?;
    let stall_name = &rest[..split];
    let id_part = &rest[split + RES_MARKER.len()..];

    if stall_name.is_empty() {
        return Err(PassError::Malformed);
    }
    let reservation_id = Uuid::parse_str(id_part).map_err(|_| PassError::Malformed)?;

    Ok(PassRef {
        stall_name: stall_name.to_string(),
        reservation_id,
    })
}

pub fn sign_payload(payload: &str, secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(payload.as_bytes());
    hasher.update(secret.as_bytes());
    general_purpose::STANDARD.encode(hasher.finalize())
}

pub fn verify_signature(payload: &str, signature: &str, secret: &str) -> Result<(), PassError> {
    if sign_payload(payload, secret) == signature {
        Ok(())
    } else {
        Err(PassError::BadSignature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn payload_format_matches_wire_convention() {
        let id = Uuid::parse_str("67e55044-10b1-426f-9247-bb680e5fe0c8").unwrap();
        assert_eq!(
            format_payload("A1", id),
            "STALL-A1-RES-67e55044-10b1-426f-9247-bb680e5fe0c8"
        );
    }

    #[test]
    fn parse_recovers_fields() {
        let id = Uuid::new_v4();
        let parsed = parse_payload(&format_payload("Fiction Corner A1", id)).unwrap();
        assert_eq!(parsed.stall_name, "Fiction Corner A1");
        assert_eq!(parsed.reservation_id, id);
    }

    #[test]
    fn stall_name_containing_marker_still_parses() {
        let id = Uuid::new_v4();
        let parsed = parse_payload(&format_payload("A-RES-B", id)).unwrap();
        assert_eq!(parsed.stall_name, "A-RES-B");
        assert_eq!(parsed.reservation_id, id);
    }

    #[test]
    fn malformed_payloads_are_rejected() {
        assert_eq!(parse_payload("garbage"), Err(PassError::Malformed));
        assert_eq!(parse_payload("STALL-A1"), Err(PassError::Malformed));
        assert_eq!(
            parse_payload("STALL--RES-67e55044-10b1-426f-9247-bb680e5fe0c8"),
            Err(PassError::Malformed)
        );
        assert_eq!(
            parse_payload("STALL-A1-RES-not-a-uuid"),
            Err(PassError::Malformed)
        );
    }

    #[test]
    fn signature_rejects_tampering() {
        let payload = format_payload("A1", Uuid::new_v4());
        let sig = sign_payload(&payload, "secret");
        assert!(verify_signature(&payload, &sig, "secret").is_ok());
        assert_eq!(
            verify_signature(&payload, &sig, "other-secret"),
            Err(PassError::BadSignature)
        );
        assert_eq!(
            verify_signature("STALL-A2-RES-x", &sig, "secret"),
            Err(PassError::BadSignature)
        );
    }

    proptest! {
        // The marker split must stay unambiguous for any realistic stall name.
        #[test]
        fn parse_inverts_format(name in "[a-zA-Z0-9 _-]{1,32}") {
            let id = Uuid::new_v4();
            let parsed = parse_payload(&format_payload(&name, id)).unwrap();
            prop_assert_eq!(parsed.stall_name, name);
            prop_assert_eq!(parsed.reservation_id, id);
        }
    }
}
