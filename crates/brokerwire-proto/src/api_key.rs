//! Request type identifiers.

use std::fmt;

/// Api key carried in every request header.
///
/// Only the request types this crate can encode are listed; the raw value of
/// anything else is preserved by [`ApiKey::from_i16`] returning `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i16)]
pub enum ApiKey {
    /// Append message sets to partitions.
    Produce = 0,
    /// Read message sets from partitions.
    Fetch = 1,
    /// Discover brokers, topics and partition leaders.
    Metadata = 3,
}

impl ApiKey {
    /// Wire value.
    pub const fn to_i16(self) -> i16 {
        self as i16
    }

    /// Parse a wire value.
    pub const fn from_i16(value: i16) -> Option<Self> {
        match value {
            0 => Some(Self::Produce),
            1 => Some(Self::Fetch),
            3 => Some(Self::Metadata),
            _ => None,
        }
    }
}

impl fmt::Display for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Produce => "Produce",
            Self::Fetch => "Fetch",
            Self::Metadata => "Metadata",
        };
        write!(f, "{name}({})", self.to_i16())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_values() {
        for key in [ApiKey::Produce, ApiKey::Fetch, ApiKey::Metadata] {
            assert_eq!(ApiKey::from_i16(key.to_i16()), Some(key));
        }
        assert_eq!(ApiKey::Metadata.to_i16(), 3);
        assert_eq!(ApiKey::from_i16(2), None);
        assert_eq!(ApiKey::from_i16(-1), None);
    }
}
