//! The ControlMessage vocabulary.
//!
//! Exactly two message kinds travel on the data channel: a file-carrying
//! message and a batch terminator. The wire shape is JSON tagged by `type`:
//!
//! ```text
//! { "type": "file", "name": "a.jpg", "mimeType": "image/jpeg",
//!   "data": "<base64>", "index": 0, "total": 3 }
//! { "type": "done" }
//! ```

use serde::{Deserialize, Serialize};

use crate::{PEER_ID_LEN, ProtocolError};

/// One user-selected file in flight.
///
/// `index` is zero-based and strictly increasing within a batch; `total`
/// is the batch size announced at trigger time and is constant across all
/// items of the batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMessage {
    pub name: String,
    pub mime_type: String,
    #[serde(with = "base64_bytes")]
    pub data: Vec<u8>,
    pub index: u32,
    pub total: u32,
}

/// Tagged union exchanged on the data channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ControlMessage {
    /// Carries one file of a batch.
    File(FileMessage),
    /// Terminates the batch; no further files follow.
    Done,
}

impl ControlMessage {
    /// Serializes the message to its JSON wire form.
    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(self).map_err(|e| ProtocolError::Malformed(e.to_string()))
    }

    /// Parses a message from its JSON wire form.
    ///
    /// A frame whose `type` tag is not `file` or `done` yields
    /// [`ProtocolError::UnknownType`] so the receiver can apply its
    /// unknown-message policy; any other parse failure is
    /// [`ProtocolError::Malformed`].
    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let value: serde_json::Value =
            serde_json::from_slice(bytes).map_err(|e| ProtocolError::Malformed(e.to_string()))?;

        match value.get("type").and_then(|t| t.as_str()) {
            Some("file") | Some("done") => {}
            Some(other) => return Err(ProtocolError::UnknownType(other.to_string())),
            None => return Err(ProtocolError::Malformed("missing type tag".into())),
        }

        serde_json::from_value(value).map_err(|e| ProtocolError::Malformed(e.to_string()))
    }
}

/// Opaque peer identifier assigned by the connection broker.
///
/// 32 lowercase hex characters. The application never chooses the value;
/// the data-channel endpoint assigns it at bind time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerId(String);

impl PeerId {
    /// Wraps a broker-assigned identifier, validating its shape.
    pub fn parse(s: impl Into<String>) -> Result<Self, ProtocolError> {
        let s = s.into();
        if s.len() != PEER_ID_LEN || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(ProtocolError::InvalidPeerId(s));
        }
        Ok(Self(s.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Constant-time comparison against a received identifier.
    pub fn matches(&self, received: &str) -> bool {
        if received.len() != self.0.len() {
            return false;
        }
        let mut diff = 0u8;
        for (a, b) in received.bytes().zip(self.0.bytes()) {
            diff |= a ^ b;
        }
        diff == 0
    }
}

impl std::fmt::Display for PeerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Base64 serde module for binary payloads inside JSON messages.
mod base64_bytes {
    use base64::{Engine, engine::general_purpose::STANDARD};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        STANDARD.encode(data).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        STANDARD.decode(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_file() -> FileMessage {
        FileMessage {
            name: "a.jpg".into(),
            mime_type: "image/jpeg".into(),
            data: vec![0xFF, 0xD8, 0xFF, 0xE0],
            index: 0,
            total: 3,
        }
    }

    #[test]
    fn file_message_wire_shape() {
        let msg = ControlMessage::File(sample_file());
        let json = String::from_utf8(msg.encode().unwrap()).unwrap();
        assert!(json.contains("\"type\":\"file\""));
        assert!(json.contains("\"mimeType\":\"image/jpeg\""));
        // 0xFFD8FFE0 in base64
        assert!(json.contains("\"data\":\"/9j/4A==\""));
        assert!(json.contains("\"index\":0"));
        assert!(json.contains("\"total\":3"));
    }

    #[test]
    fn done_message_wire_shape() {
        let json = String::from_utf8(ControlMessage::Done.encode().unwrap()).unwrap();
        assert_eq!(json, r#"{"type":"done"}"#);
    }

    #[test]
    fn file_message_roundtrip() {
        let msg = ControlMessage::File(sample_file());
        let bytes = msg.encode().unwrap();
        let parsed = ControlMessage::decode(&bytes).unwrap();
        assert_eq!(parsed, msg);
    }

    #[test]
    fn payload_bytes_survive_roundtrip() {
        let mut file = sample_file();
        file.data = (0..=255u8).collect();
        let bytes = ControlMessage::File(file.clone()).encode().unwrap();
        match ControlMessage::decode(&bytes).unwrap() {
            ControlMessage::File(parsed) => assert_eq!(parsed.data, file.data),
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn unknown_type_is_distinguished() {
        let err = ControlMessage::decode(br#"{"type":"ping"}"#).unwrap_err();
        assert!(matches!(err, ProtocolError::UnknownType(t) if t == "ping"));
    }

    #[test]
    fn missing_type_is_malformed() {
        let err = ControlMessage::decode(br#"{"name":"a.jpg"}"#).unwrap_err();
        assert!(matches!(err, ProtocolError::Malformed(_)));
    }

    #[test]
    fn truncated_frame_is_malformed() {
        let err = ControlMessage::decode(br#"{"type":"file","#).unwrap_err();
        assert!(matches!(err, ProtocolError::Malformed(_)));
    }

    #[test]
    fn file_with_missing_fields_is_malformed() {
        let err = ControlMessage::decode(br#"{"type":"file","name":"a.jpg"}"#).unwrap_err();
        assert!(matches!(err, ProtocolError::Malformed(_)));
    }

    #[test]
    fn peer_id_accepts_hex_and_normalizes_case() {
        let id = PeerId::parse("A1B2C3D4E5F6A7B8A1B2C3D4E5F6A7B8").unwrap();
        assert_eq!(id.as_str(), "a1b2c3d4e5f6a7b8a1b2c3d4e5f6a7b8");
    }

    #[test]
    fn peer_id_rejects_bad_shapes() {
        assert!(PeerId::parse("short").is_err());
        assert!(PeerId::parse("g1b2c3d4e5f6a7b8a1b2c3d4e5f6a7b8").is_err());
        assert!(PeerId::parse("").is_err());
    }

    #[test]
    fn peer_id_matches_constant_time() {
        let id = PeerId::parse("a1b2c3d4e5f6a7b8a1b2c3d4e5f6a7b8").unwrap();
        assert!(id.matches("a1b2c3d4e5f6a7b8a1b2c3d4e5f6a7b8"));
        assert!(!id.matches("00000000000000000000000000000000"));
        assert!(!id.matches("a1b2"));
    }
}
