//! Presentation and stream identifiers

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Stream identifier, unique within its presentation
pub type StreamId = u32;

/// Opaque presentation identifier.
///
/// On the wire a presentation is named by a 16-byte GUID in Microsoft's
/// mixed-endian layout; [`PresentationId::from_guid`] accepts that form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PresentationId(Uuid);

impl PresentationId {
    /// Build from a GUID as it appears in protocol messages
    pub fn from_guid(guid: [u8; 16]) -> Self {
        Self(Uuid::from_bytes_le(guid))
    }

    /// Build from big-endian (RFC 4122) bytes
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }

    /// Random id, for hosts that mint their own presentations
    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }

    /// GUID bytes in protocol layout
    pub fn to_guid(&self) -> [u8; 16] {
        self.0.to_bytes_le()
    }

    /// Underlying UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl From<Uuid> for PresentationId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl fmt::Display for PresentationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guid_layout_is_mixed_endian() {
        let guid = [
            0x78, 0x56, 0x34, 0x12, 0x34, 0x12, 0x78, 0x56, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06,
            0x07, 0x08,
        ];
        let id = PresentationId::from_guid(guid);

        assert_eq!(id.to_string(), "12345678-1234-5678-0102-030405060708");
        assert_eq!(id.to_guid(), guid);
    }

    #[test]
    fn test_distinct_guids_are_distinct_ids() {
        assert_ne!(
            PresentationId::from_guid([1; 16]),
            PresentationId::from_guid([2; 16])
        );
    }
}
