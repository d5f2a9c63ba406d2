//! Checks that run before anything reaches the reservation store.
//!
//! Batch checks are all-or-nothing: a roster with one bad seat is rejected as
//! a whole. Interactive checks cover a single booking or cancellation form.

use crate::error::{RequiredField, SeatingError};
use crate::roster::RosterEntry;
use crate::types::{
    CancellationRequest, Reservation, ReservationRequest, SeatNumber, SEAT_COUNT,
};
use chrono::{DateTime, Utc};
use regex::Regex;
use std::collections::HashSet;
use std::hash::Hash;
use std::sync::LazyLock;

/// Korean mobile number, e.g. `010-1234-5678`.
#[allow(clippy::expect_used)] // Pattern is a literal; covered by tests
static PHONE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^01[0-9]-[0-9]{3,4}-[0-9]{4}$").expect("phone pattern should compile")
});

/// Validates a parsed roster and converts it into reservations.
///
/// Seat range is checked over the whole batch first, then duplicates.
///
/// # Errors
///
/// - [`SeatingError::InvalidSeatRange`]: every out-of-range seat, in batch order
/// - [`SeatingError::DuplicateSeat`]: each repeated seat once
pub fn validate_batch(
    entries: &[RosterEntry],
    timestamp: DateTime<Utc>,
) -> Result<Vec<Reservation>, SeatingError> {
    let out_of_range: Vec<u32> = entries
        .iter()
        .map(|entry| entry.seat_number)
        .filter(|seat| !(1..=SEAT_COUNT).contains(seat))
        .collect();
    if !out_of_range.is_empty() {
        return Err(SeatingError::InvalidSeatRange {
            seats: out_of_range,
        });
    }

    let duplicates = duplicate_seats(entries.iter().map(|entry| entry.seat_number));
    if !duplicates.is_empty() {
        return Err(SeatingError::DuplicateSeat { seats: duplicates });
    }

    entries
        .iter()
        .map(|entry| {
            Reservation::new(
                SeatNumber::new(entry.seat_number)?,
                &entry.name,
                "",
                &entry.location,
                entry.payment_status,
                timestamp,
            )
        })
        .collect()
}

/// Duplicate check for records read back from a persistence sink.
///
/// # Errors
///
/// [`SeatingError::DuplicateSeat`] when two rows claim the same seat.
pub fn validate_records(records: &[Reservation]) -> Result<(), SeatingError> {
    let duplicates = duplicate_seats(records.iter().map(|record| record.seat().get()));
    if duplicates.is_empty() {
        Ok(())
    } else {
        Err(SeatingError::DuplicateSeat { seats: duplicates })
    }
}

/// Checks a booking form.
///
/// Blank fields are reported together before the phone format is checked.
///
/// # Errors
///
/// - [`SeatingError::MissingRequiredField`]: name, phone or location blank
/// - [`SeatingError::InvalidPhoneFormat`]: see [`validate_phone`]
pub fn validate_reservation_request(request: &ReservationRequest) -> Result<(), SeatingError> {
    require(&[
        (RequiredField::Name, &request.name),
        (RequiredField::Phone, &request.phone),
        (RequiredField::Location, &request.location),
    ])?;
    validate_phone(&request.phone)
}

/// Checks a cancellation form.
///
/// # Errors
///
/// [`SeatingError::MissingRequiredField`] when name or phone is blank.
pub fn validate_cancellation_request(request: &CancellationRequest) -> Result<(), SeatingError> {
    require(&[
        (RequiredField::Name, &request.name),
        (RequiredField::Phone, &request.phone),
    ])
}

/// Accepts `01X-XXX-XXXX` and `01X-XXXX-XXXX` with ASCII digits.
///
/// # Errors
///
/// [`SeatingError::InvalidPhoneFormat`] for anything else.
pub fn validate_phone(phone: &str) -> Result<(), SeatingError> {
    if PHONE_PATTERN.is_match(phone.trim()) {
        Ok(())
    } else {
        Err(SeatingError::InvalidPhoneFormat {
            phone: phone.to_string(),
        })
    }
}

fn require(fields: &[(RequiredField, &String)]) -> Result<(), SeatingError> {
    let missing: Vec<RequiredField> = fields
        .iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|&(field, _)| field)
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(SeatingError::MissingRequiredField { fields: missing })
    }
}

/// Values that occur more than once, each listed once, in order of first repetition.
fn duplicate_seats<T>(seats: impl IntoIterator<Item = T>) -> Vec<T>
where
    T: Copy + Eq + Hash,
{
    let mut seen = HashSet::new();
    let mut reported = HashSet::new();
    seats
        .into_iter()
        .filter(|seat| !seen.insert(*seat) && reported.insert(*seat))
        .collect()
}
