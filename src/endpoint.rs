use crate::CodecError;
use crate::constants::ENDPOINT_ID_LENGTH;

/// A remote endpoint identifier wrapper for type safety
///
/// Endpoints are addressed by their six-byte Bluetooth device address
/// (`BD_ADDR`), but the core never interprets the bytes beyond equality
/// and formatting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, defmt::Format)]
pub struct EndpointId(pub [u8; 6]);

impl EndpointId {
    /// Create a new endpoint identifier from bytes
    #[must_use]
    pub const fn new(id: [u8; 6]) -> Self {
        Self(id)
    }

    /// Get the raw identifier bytes
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 6] {
        &self.0
    }

    /// Format the identifier as a colon-separated hex string
    #[must_use]
    pub fn format_hex(&self) -> heapless::String<17> {
        let mut result = heapless::String::new();
        for (i, byte) in self.0.iter().enumerate() {
            if i > 0 {
                result.push(':').ok();
            }
            let hex_chars = [
                '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', 'A', 'B', 'C', 'D', 'E', 'F',
            ];
            result.push(hex_chars[(byte >> 4) as usize]).ok();
            result.push(hex_chars[(byte & 0x0F) as usize]).ok();
        }
        result
    }

    /// Parse an endpoint identifier from a colon-separated hex string
    ///
    /// # Returns
    /// - `Ok(EndpointId)` if the string is valid
    /// - `Err(CodecError::InvalidParameter)` if the string is invalid
    ///
    /// # Errors
    /// Returns an error if the string is not exactly 17 characters long or
    /// contains invalid characters
    pub fn from_hex(hex: &str) -> Result<Self, CodecError> {
        if hex.len() != 17 || !hex.chars().all(|c| c.is_ascii_hexdigit() || c == ':') {
            return Err(CodecError::InvalidParameter);
        }

        let mut bytes = [0u8; 6];
        for (i, byte) in hex.split(':').enumerate() {
            if i >= 6 || byte.len() != 2 {
                return Err(CodecError::InvalidParameter);
            }
            bytes[i] = u8::from_str_radix(byte, 16).map_err(|_| CodecError::InvalidParameter)?;
        }
        Ok(Self(bytes))
    }
}

impl From<[u8; 6]> for EndpointId {
    fn from(id: [u8; 6]) -> Self {
        Self(id)
    }
}

impl From<EndpointId> for [u8; 6] {
    fn from(id: EndpointId) -> Self {
        id.0
    }
}

impl From<EndpointId> for heapless::String<17> {
    fn from(id: EndpointId) -> Self {
        id.format_hex()
    }
}

impl TryFrom<&str> for EndpointId {
    type Error = CodecError;

    fn try_from(hex: &str) -> Result<Self, Self::Error> {
        EndpointId::from_hex(hex)
    }
}

impl TryFrom<&[u8]> for EndpointId {
    type Error = CodecError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        if bytes.len() == ENDPOINT_ID_LENGTH {
            let mut id = [0u8; ENDPOINT_ID_LENGTH];
            id.copy_from_slice(bytes);
            Ok(EndpointId(id))
        } else {
            Err(CodecError::InvalidParameter)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_id_creation() {
        let id = EndpointId::new([0x12, 0x34, 0x56, 0x78, 0x9A, 0xBC]);
        assert_eq!(id.as_bytes(), &[0x12, 0x34, 0x56, 0x78, 0x9A, 0xBC]);
    }

    #[test]
    fn test_endpoint_id_format_hex() {
        let id = EndpointId::new([0x12, 0x34, 0x56, 0x78, 0x9A, 0xBC]);
        assert_eq!(id.format_hex().as_str(), "12:34:56:78:9A:BC");

        let id_zero = EndpointId::new([0x00; 6]);
        assert_eq!(id_zero.format_hex().as_str(), "00:00:00:00:00:00");

        let id_max = EndpointId::new([0xFF; 6]);
        assert_eq!(id_max.format_hex().as_str(), "FF:FF:FF:FF:FF:FF");
    }

    #[test]
    fn test_endpoint_id_round_trip() {
        let id = EndpointId::new([0x0A, 0xB1, 0x2C, 0xD3, 0x4E, 0xF5]);
        let parsed = EndpointId::from_hex(id.format_hex().as_str()).unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_endpoint_id_from_hex_invalid() {
        assert!(EndpointId::from_hex("12:34:56").is_err());
        assert!(EndpointId::from_hex("12:34:56:78:9A:ZZ").is_err());
        assert!(EndpointId::from_hex("12-34-56-78-9A-BC").is_err());
    }

    #[test]
    fn test_endpoint_id_try_from_slice() {
        let bytes = &[0x12u8, 0x34, 0x56, 0x78, 0x9A, 0xBC][..];
        let id = EndpointId::try_from(bytes).unwrap();
        assert_eq!(id.as_bytes(), &[0x12, 0x34, 0x56, 0x78, 0x9A, 0xBC]);

        assert!(EndpointId::try_from(&[0x12u8, 0x34][..]).is_err());
        assert!(EndpointId::try_from(&[0u8; 8][..]).is_err());
    }
}
