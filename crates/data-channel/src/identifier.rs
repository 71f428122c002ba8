//! Peer identifier assignment.
//!
//! Identifiers are opaque to the application; only this module mints them.

use piclink_protocol::PeerId;
use rand::Rng;

/// Identifier length in bytes (produces 32 hex characters).
const ID_BYTES: usize = 16;

/// Assigns a fresh peer identifier from a CSPRNG.
pub fn assign_peer_id() -> PeerId {
    let mut bytes = [0u8; ID_BYTES];
    rand::thread_rng().fill(&mut bytes);
    // 32 lowercase hex chars always satisfy the PeerId shape.
    PeerId::parse(hex::encode(bytes)).expect("generated identifier is valid hex")
}

#[cfg(test)]
mod tests {
    use super::*;
    use piclink_protocol::PEER_ID_LEN;

    #[test]
    fn assigned_id_has_expected_shape() {
        let id = assign_peer_id();
        assert_eq!(id.as_str().len(), PEER_ID_LEN);
        assert!(id.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn assigned_ids_are_unique() {
        assert_ne!(assign_peer_id(), assign_peer_id());
    }

    #[test]
    fn assigned_id_matches_itself() {
        let id = assign_peer_id();
        assert!(id.matches(id.as_str()));
    }
}
