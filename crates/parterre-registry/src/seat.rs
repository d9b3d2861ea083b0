//! Seat entity types.

use std::sync::Mutex;

use serde::{Deserialize, Serialize};

/// A single reservable seat.
///
/// The booking state is guarded by a per-seat lock; every operation is
/// atomic with respect to this one seat only.
#[derive(Debug)]
pub struct Seat {
    id: u32,
    booked_by: Mutex<Option<String>>,
}

impl Seat {
    /// Create a free seat with the given 1-based id.
    pub fn new(id: u32) -> Self {
        Self {
            id,
            booked_by: Mutex::new(None),
        }
    }

    /// The seat's 1-based id.
    pub const fn id(&self) -> u32 {
        self.id
    }

    /// Whether the seat is currently booked.
    pub fn is_booked(&self) -> bool {
        self.booked_by.lock().unwrap().is_some()
    }

    /// The name holding the seat, if any.
    pub fn booked_by(&self) -> Option<String> {
        self.booked_by.lock().unwrap().clone()
    }

    /// Book the seat for `name`. Returns false if it was already booked.
    pub fn book(&self, name: &str) -> bool {
        let mut holder = self.booked_by.lock().unwrap();
        if holder.is_some() {
            return false;
        }
        *holder = Some(name.to_owned());
        true
    }

    /// Clear the booking unconditionally.
    pub fn free(&self) {
        *self.booked_by.lock().unwrap() = None;
    }

    /// The seat's wire form.
    pub fn record(&self) -> SeatRecord {
        let booked_by = self.booked_by();
        SeatRecord {
            id: self.id,
            booked: booked_by.is_some(),
            booked_by,
        }
    }
}

impl std::fmt::Display for Seat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.booked_by() {
            Some(name) => write!(f, "seat {} ({})", self.id, name),
            None => write!(f, "seat {} (free)", self.id),
        }
    }
}

/// Wire form of a seat, as carried in fleet snapshots.
///
/// The wire shape is fixed: `id` is a decimal string, `bookedBy` is a
/// string or null, `booked` is a boolean.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatRecord {
    /// 1-based seat id, serialized as a string.
    #[serde(with = "string_id")]
    pub id: u32,
    /// The name holding the seat, if any.
    #[serde(rename = "bookedBy")]
    pub booked_by: Option<String>,
    /// Whether the seat is booked.
    pub booked: bool,
}

impl SeatRecord {
    /// Rebuild a live seat from this record.
    ///
    /// A record claiming a holder while unbooked restores as free: the
    /// `booked` flag wins.
    pub fn restore(&self) -> Seat {
        let holder = if self.booked {
            self.booked_by.clone()
        } else {
            None
        };
        Seat {
            id: self.id,
            booked_by: Mutex::new(holder),
        }
    }
}

/// Seat ids travel as decimal strings on the wire.
mod string_id {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(id: &u32, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(id)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn book_only_once() {
        let seat = Seat::new(1);
        assert!(seat.book("ada"));
        assert!(!seat.book("grace"));
        assert_eq!(seat.booked_by().as_deref(), Some("ada"));
    }

    #[test]
    fn free_clears_unconditionally() {
        let seat = Seat::new(1);
        seat.free();
        assert!(!seat.is_booked());

        seat.book("ada");
        seat.free();
        assert!(!seat.is_booked());
    }

    #[test]
    fn concurrent_booking_has_one_winner() {
        use std::sync::Arc;

        let seat = Arc::new(Seat::new(5));
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let seat = seat.clone();
                std::thread::spawn(move || seat.book(&format!("guest-{i}")))
            })
            .collect();

        let wins = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(wins, 1);
        assert!(seat.is_booked());
    }

    #[test]
    fn record_restore_roundtrip() {
        let seat = Seat::new(7);
        seat.book("ada");

        let restored = seat.record().restore();
        assert_eq!(restored.id(), 7);
        assert_eq!(restored.booked_by().as_deref(), Some("ada"));
    }

    #[test]
    fn inconsistent_record_restores_free() {
        let record = SeatRecord {
            id: 3,
            booked_by: Some("ghost".into()),
            booked: false,
        };
        assert!(!record.restore().is_booked());
    }
}
