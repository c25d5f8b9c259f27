//! Object identifiers and timestamps.
//!
//! An [`ObjectId`] is 12 bytes:
//!
//! | bytes | content                                   |
//! |-------|-------------------------------------------|
//! | 0..4  | creation time, seconds since the epoch    |
//! | 4..9  | random value chosen once per process      |
//! | 9..12 | counter, seeded randomly                  |
//!
//! The creation time embedded in an id is the value entities use as their
//! `dateCreated`, so both always agree.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::LazyLock;
use std::time::{SystemTime, UNIX_EPOCH};

use rand::Rng;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{CodecError, CodecResult};

const COUNTER_MASK: u32 = 0x00ff_ffff;

static PROCESS_UNIQUE: LazyLock<[u8; 5]> = LazyLock::new(|| rand::thread_rng().gen());

static COUNTER: LazyLock<AtomicU32> =
    LazyLock::new(|| AtomicU32::new(rand::thread_rng().gen_range(0..=COUNTER_MASK)));

/// A 12-byte document identifier.
///
/// Ids generated in the same process are unique and roughly ordered by
/// creation time.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId([u8; 12]);

impl ObjectId {
    /// Size of an object id in bytes.
    pub const SIZE: usize = 12;

    /// Generate a new id stamped with the current time.
    pub fn new() -> Self {
        let seconds = DateTime::now().timestamp_millis().div_euclid(1000);
        Self::with_timestamp(u32::try_from(seconds).unwrap_or(u32::MAX))
    }

    /// Generate a new id stamped with the given creation time in seconds.
    pub fn with_timestamp(seconds: u32) -> Self {
        let counter = COUNTER.fetch_add(1, Ordering::Relaxed) & COUNTER_MASK;
        let mut bytes = [0u8; 12];
        bytes[0..4].copy_from_slice(&seconds.to_be_bytes());
        bytes[4..9].copy_from_slice(&*PROCESS_UNIQUE);
        bytes[9..12].copy_from_slice(&counter.to_be_bytes()[1..4]);
        Self(bytes)
    }

    /// Create an id from raw bytes.
    pub const fn from_bytes(bytes: [u8; 12]) -> Self {
        Self(bytes)
    }

    /// Create an id from a byte slice.
    ///
    /// # Errors
    ///
    /// Returns an error if the slice is not exactly 12 bytes long.
    pub fn from_slice(bytes: &[u8]) -> CodecResult<Self> {
        let array: [u8; 12] = bytes.try_into().map_err(|_| {
            CodecError::invalid_object_id(format!("expected 12 bytes, got {}", bytes.len()))
        })?;
        Ok(Self(array))
    }

    /// Parse an id from its 24-character hex form.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not 24 hex digits.
    pub fn parse_str(s: &str) -> CodecResult<Self> {
        if s.len() != 24 {
            return Err(CodecError::invalid_object_id(format!(
                "expected 24 hex characters, got {}",
                s.len()
            )));
        }
        let mut bytes = [0u8; 12];
        for (i, byte) in bytes.iter_mut().enumerate() {
            let pair = &s[i * 2..i * 2 + 2];
            *byte = u8::from_str_radix(pair, 16)
                .map_err(|_| CodecError::invalid_object_id(format!("invalid hex '{pair}'")))?;
        }
        Ok(Self(bytes))
    }

    /// Returns the raw bytes.
    pub const fn bytes(&self) -> [u8; 12] {
        self.0
    }

    /// Returns the creation time embedded in this id.
    ///
    /// The id only carries second precision, so the result is always a
    /// whole second.
    pub fn timestamp(&self) -> DateTime {
        let seconds = u32::from_be_bytes([self.0[0], self.0[1], self.0[2], self.0[3]]);
        DateTime::from_millis(i64::from(seconds) * 1000)
    }

    /// Returns the lowercase hex form.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.to_hex())
    }
}

impl FromStr for ObjectId {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_str(s)
    }
}

impl Serialize for ObjectId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let hex = String::deserialize(deserializer)?;
        Self::parse_str(&hex).map_err(serde::de::Error::custom)
    }
}

/// A point in time with millisecond precision, measured from the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DateTime(i64);

impl DateTime {
    /// The current time.
    pub fn now() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
            .unwrap_or(0);
        Self(millis)
    }

    /// Create a timestamp from milliseconds since the epoch.
    pub const fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Milliseconds since the epoch.
    pub const fn timestamp_millis(&self) -> i64 {
        self.0
    }

    /// Add milliseconds, returning `None` on overflow.
    #[must_use]
    pub fn checked_add_millis(&self, millis: i64) -> Option<Self> {
        self.0.checked_add(millis).map(Self)
    }
}

impl fmt::Display for DateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn new_ids_are_unique() {
        let ids: HashSet<ObjectId> = (0..1000).map(|_| ObjectId::new()).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn timestamp_is_embedded() {
        let id = ObjectId::with_timestamp(1_700_000_000);
        assert_eq!(id.timestamp(), DateTime::from_millis(1_700_000_000_000));
    }

    #[test]
    fn new_id_timestamp_is_close_to_now() {
        let before = DateTime::now().timestamp_millis() / 1000 * 1000;
        let id = ObjectId::new();
        let after = DateTime::now().timestamp_millis();
        let created = id.timestamp().timestamp_millis();
        assert!(created >= before && created <= after);
    }

    #[test]
    fn hex_round_trip() {
        let id = ObjectId::new();
        let parsed: ObjectId = id.to_hex().parse().unwrap();
        assert_eq!(parsed, id);
        assert_eq!(id.to_string().len(), 24);
    }

    #[test]
    fn parse_rejects_bad_input() {
        assert!(ObjectId::parse_str("abc").is_err());
        assert!(ObjectId::parse_str("zz0000000000000000000000").is_err());
    }

    #[test]
    fn from_slice_checks_length() {
        assert!(ObjectId::from_slice(&[0u8; 11]).is_err());
        assert!(ObjectId::from_slice(&[7u8; 12]).is_ok());
    }

    #[test]
    fn serde_uses_hex_string() {
        let id = ObjectId::from_bytes([1; 12]);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"010101010101010101010101\"");
        let back: ObjectId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn date_time_ordering_and_arithmetic() {
        let a = DateTime::from_millis(10);
        let b = a.checked_add_millis(1).unwrap();
        assert!(b > a);
        assert!(DateTime::from_millis(i64::MAX).checked_add_millis(1).is_none());
    }
}
