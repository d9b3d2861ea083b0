//! The seat registry: booking state shared across the fleet.

use std::sync::RwLock;

use crate::seat::{Seat, SeatRecord};

/// Outcome of a `reserve` operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReserveOutcome {
    /// The seat with this id was assigned.
    Assigned(u32),
    /// The name already holds a seat.
    AlreadyReserved,
    /// No free seat remained.
    SoldOut,
}

/// Outcome of a `bookSeat` operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookOutcome {
    /// The seat with this id was assigned.
    Assigned(u32),
    /// The requested seat number is out of range or already booked.
    Unavailable(u32),
}

/// Fixed-size ordered collection of seats.
///
/// Individual operations lock one seat at a time. The registry-wide lock
/// is taken for write only on wholesale replacement from a peer snapshot;
/// everything else shares a read guard.
#[derive(Debug)]
pub struct SeatRegistry {
    seats: RwLock<Vec<Seat>>,
}

impl SeatRegistry {
    /// Create a registry of free seats with ids `1..=num_seats`.
    pub fn new(num_seats: u32) -> Self {
        Self {
            seats: RwLock::new((1..=num_seats).map(Seat::new).collect()),
        }
    }

    /// Number of seats.
    pub fn len(&self) -> usize {
        self.seats.read().unwrap().len()
    }

    /// Whether the registry has no seats at all.
    pub fn is_empty(&self) -> bool {
        self.seats.read().unwrap().is_empty()
    }

    /// Book the first free seat in index order for `name`.
    ///
    /// Fails if `name` already holds a seat, or when nothing is free.
    pub fn reserve(&self, name: &str) -> ReserveOutcome {
        let seats = self.seats.read().unwrap();
        if seats.iter().any(|s| s.booked_by().as_deref() == Some(name)) {
            return ReserveOutcome::AlreadyReserved;
        }
        for seat in seats.iter() {
            if seat.book(name) {
                return ReserveOutcome::Assigned(seat.id());
            }
        }
        ReserveOutcome::SoldOut
    }

    /// Book the exact seat `seat_num` (1-indexed) for `name`.
    pub fn book_seat(&self, name: &str, seat_num: u32) -> BookOutcome {
        let seats = self.seats.read().unwrap();
        let seat = match seat_num
            .checked_sub(1)
            .and_then(|i| seats.get(i as usize))
        {
            Some(seat) => seat,
            None => return BookOutcome::Unavailable(seat_num),
        };
        if seat.book(name) {
            BookOutcome::Assigned(seat.id())
        } else {
            BookOutcome::Unavailable(seat_num)
        }
    }

    /// The id of the seat held by `name`, if any.
    pub fn search(&self, name: &str) -> Option<u32> {
        let seats = self.seats.read().unwrap();
        seats
            .iter()
            .find(|s| s.booked_by().as_deref() == Some(name))
            .map(Seat::id)
    }

    /// Free the seat held by `name`, returning its id. Not holding a
    /// seat is non-fatal and reported as `None`.
    pub fn delete(&self, name: &str) -> Option<u32> {
        let seats = self.seats.read().unwrap();
        let seat = seats
            .iter()
            .find(|s| s.booked_by().as_deref() == Some(name))?;
        seat.free();
        Some(seat.id())
    }

    /// Serialize every seat in index order.
    pub fn snapshot(&self) -> Vec<SeatRecord> {
        self.seats.read().unwrap().iter().map(Seat::record).collect()
    }

    /// Replace the whole registry with the given records.
    ///
    /// This is the receiving side of versioned replication: no per-seat
    /// merge, the snapshot wins outright.
    pub fn replace(&self, records: &[SeatRecord]) {
        let mut seats = self.seats.write().unwrap();
        *seats = records.iter().map(SeatRecord::restore).collect();
    }
}
