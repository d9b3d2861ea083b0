//! Full-state snapshots exchanged between fleet members.

use std::fmt;

use parterre_registry::SeatRecord;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Full serialized copy of all seat records.
///
/// Snapshots are used for convergence instead of deltas: a receiver
/// either applies the whole thing or drops it, decided by the version
/// tag that accompanies it on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Every seat, in index order.
    pub seats: Vec<SeatRecord>,
}

impl Snapshot {
    /// Wrap a list of seat records.
    pub fn new(seats: Vec<SeatRecord>) -> Self {
        Self { seats }
    }

    /// Decode from the wire JSON form.
    pub fn decode(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::to_string(self).map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Snapshot {
        Snapshot::new(vec![
            SeatRecord {
                id: 1,
                booked_by: Some("ada".into()),
                booked: true,
            },
            SeatRecord {
                id: 2,
                booked_by: None,
                booked: false,
            },
        ])
    }

    #[test]
    fn wire_shape_is_stable() {
        let json = sample().to_string();
        assert_eq!(
            json,
            r#"{"seats":[{"id":"1","bookedBy":"ada","booked":true},{"id":"2","bookedBy":null,"booked":false}]}"#
        );
    }

    #[test]
    fn decode_roundtrip() {
        let snapshot = sample();
        let decoded = Snapshot::decode(&snapshot.to_string()).unwrap();
        assert_eq!(decoded, snapshot);
    }

    #[test]
    fn delimiter_characters_in_names_roundtrip() {
        let snapshot = Snapshot::new(vec![SeatRecord {
            id: 1,
            booked_by: Some(r#"o"malley, {jr}: esq"#.into()),
            booked: true,
        }]);
        let decoded = Snapshot::decode(&snapshot.to_string()).unwrap();
        assert_eq!(decoded, snapshot);
    }

    #[test]
    fn rejects_garbage() {
        assert!(Snapshot::decode("{not json").is_err());
        assert!(Snapshot::decode(r#"{"seats":[{"id":"x"}]}"#).is_err());
    }
}
