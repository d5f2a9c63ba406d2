//! Domain types for the bus seat plan.
//!
//! Value objects (seat numbers, payment status, reservations), the command
//! payloads callers hand to the engine, and [`SeatingState`], the canonical
//! seat → reservation mapping every view is derived from.

use crate::error::{RequiredField, SeatingError};
use crate::projections::palette::LocationPalette;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Number of seats on the bus. Seats are numbered `1..=SEAT_COUNT`.
pub const SEAT_COUNT: u32 = 28;

// ============================================================================
// Value Objects
// ============================================================================

/// A seat number known to be inside `1..=SEAT_COUNT`
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct SeatNumber(u32);

impl SeatNumber {
    /// Validates and wraps a seat number.
    ///
    /// # Errors
    ///
    /// Returns [`SeatingError::InvalidSeatRange`] when `number` is 0 or
    /// greater than [`SEAT_COUNT`].
    pub fn new(number: u32) -> Result<Self, SeatingError> {
        if (1..=SEAT_COUNT).contains(&number) {
            Ok(Self(number))
        } else {
            Err(SeatingError::InvalidSeatRange {
                seats: vec![number],
            })
        }
    }

    /// Returns the raw number
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }

    /// Every seat on the bus, in order
    pub fn all() -> impl Iterator<Item = Self> {
        (1..=SEAT_COUNT).map(Self)
    }
}

impl TryFrom<u32> for SeatNumber {
    type Error = SeatingError;

    fn try_from(number: u32) -> Result<Self, Self::Error> {
        Self::new(number)
    }
}

impl From<SeatNumber> for u32 {
    fn from(seat: SeatNumber) -> Self {
        seat.0
    }
}

impl fmt::Display for SeatNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Keywords that mark a passenger as paid. Checked before the pending ones.
const PAID_KEYWORDS: [&str; 5] = ["입완", "입금완료", "완료", "입금됨", "결제완료"];

/// Keywords that mark a passenger as not yet paid.
const PENDING_KEYWORDS: [&str; 5] = ["예정", "입금예정", "미입금", "대기", "예약"];

/// Payment state of a reservation
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    /// Fare received
    Paid,
    /// Fare not received yet
    #[default]
    Pending,
}

impl PaymentStatus {
    /// Maps a free-text status token to a payment status.
    ///
    /// Matching is by substring and case-sensitive. Paid keywords win over
    /// pending ones; anything unrecognized is pending.
    #[must_use]
    pub fn normalize(raw: &str) -> Self {
        if PAID_KEYWORDS.iter().any(|keyword| raw.contains(keyword)) {
            Self::Paid
        } else {
            Self::Pending
        }
    }

    /// Returns `true` when `raw` contains any paid or pending keyword
    #[must_use]
    pub fn is_recognized(raw: &str) -> bool {
        PAID_KEYWORDS
            .iter()
            .chain(PENDING_KEYWORDS.iter())
            .any(|keyword| raw.contains(keyword))
    }

    /// Reads the stored form (`paid` / `pending`), falling back to
    /// [`PaymentStatus::normalize`] for anything else.
    #[must_use]
    pub fn from_stored(raw: &str) -> Self {
        match raw.trim() {
            "paid" => Self::Paid,
            "pending" => Self::Pending,
            other => Self::normalize(other),
        }
    }

    /// Display label
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Paid => "입금완료",
            Self::Pending => "입금예정",
        }
    }

    /// Stored form
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Paid => "paid",
            Self::Pending => "pending",
        }
    }

    /// Returns `true` for [`PaymentStatus::Paid`]
    #[must_use]
    pub const fn is_paid(self) -> bool {
        matches!(self, Self::Paid)
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ============================================================================
// Reservation
// ============================================================================

/// One occupied seat
///
/// Name and location are trimmed and never empty. The phone is empty for
/// passengers that came from a text roster.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ReservationRecord", into = "ReservationRecord")]
pub struct Reservation {
    seat: SeatNumber,
    name: String,
    phone: String,
    location: String,
    payment_status: PaymentStatus,
    timestamp: DateTime<Utc>,
}

impl Reservation {
    /// Builds a reservation, trimming every text field.
    ///
    /// # Errors
    ///
    /// Returns [`SeatingError::MissingRequiredField`] when the name or the
    /// location is blank.
    pub fn new(
        seat: SeatNumber,
        name: &str,
        phone: &str,
        location: &str,
        payment_status: PaymentStatus,
        timestamp: DateTime<Utc>,
    ) -> Result<Self, SeatingError> {
        let name = name.trim();
        let location = location.trim();

        let mut fields = Vec::new();
        if name.is_empty() {
            fields.push(RequiredField::Name);
        }
        if location.is_empty() {
            fields.push(RequiredField::Location);
        }
        if !fields.is_empty() {
            return Err(SeatingError::MissingRequiredField { fields });
        }

        Ok(Self {
            seat,
            name: name.to_string(),
            phone: phone.trim().to_string(),
            location: location.to_string(),
            payment_status,
            timestamp,
        })
    }

    /// Seat this reservation occupies
    #[must_use]
    pub const fn seat(&self) -> SeatNumber {
        self.seat
    }

    /// Passenger name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Contact phone, empty when unknown
    #[must_use]
    pub fn phone(&self) -> &str {
        &self.phone
    }

    /// Boarding location
    #[must_use]
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Payment state
    #[must_use]
    pub const fn payment_status(&self) -> PaymentStatus {
        self.payment_status
    }

    /// When the reservation was made (advisory)
    #[must_use]
    pub const fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Exact match on name and phone, after trimming the challenge.
    #[must_use]
    pub fn matches_identity(&self, name: &str, phone: &str) -> bool {
        self.name == name.trim() && self.phone == phone.trim()
    }
}

/// Row layout used by persistence sinks
///
/// `payment_status` is kept as text so rows written by older tools with a
/// raw keyword still load.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationRecord {
    /// Seat number
    pub seat_number: u32,
    /// Passenger name
    pub name: String,
    /// Contact phone
    #[serde(default)]
    pub phone: String,
    /// Boarding location
    pub location: String,
    /// `paid` or `pending`
    #[serde(default)]
    pub payment_status: String,
    /// When the reservation was made
    pub timestamp: DateTime<Utc>,
}

impl TryFrom<ReservationRecord> for Reservation {
    type Error = SeatingError;

    fn try_from(record: ReservationRecord) -> Result<Self, Self::Error> {
        Self::new(
            SeatNumber::new(record.seat_number)?,
            &record.name,
            &record.phone,
            &record.location,
            PaymentStatus::from_stored(&record.payment_status),
            record.timestamp,
        )
    }
}

impl From<Reservation> for ReservationRecord {
    fn from(reservation: Reservation) -> Self {
        Self {
            seat_number: reservation.seat.get(),
            name: reservation.name,
            phone: reservation.phone,
            location: reservation.location,
            payment_status: reservation.payment_status.as_str().to_string(),
            timestamp: reservation.timestamp,
        }
    }
}

// ============================================================================
// Requests
// ============================================================================

/// Correlates a command with the action that settles it
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Creates a new random `RequestId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Interactive single-seat reservation, as typed into the booking form
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationRequest {
    /// Requested seat, unchecked
    pub seat: u32,
    /// Passenger name
    pub name: String,
    /// Contact phone
    pub phone: String,
    /// Boarding location
    pub location: String,
    /// Payment state, pending unless stated
    pub payment_status: PaymentStatus,
}

impl ReservationRequest {
    /// Creates a pending reservation request
    #[must_use]
    pub fn new(
        seat: u32,
        name: impl Into<String>,
        phone: impl Into<String>,
        location: impl Into<String>,
    ) -> Self {
        Self {
            seat,
            name: name.into(),
            phone: phone.into(),
            location: location.into(),
            payment_status: PaymentStatus::Pending,
        }
    }

    /// Sets the payment state
    #[must_use]
    pub const fn with_payment_status(mut self, payment_status: PaymentStatus) -> Self {
        self.payment_status = payment_status;
        self
    }
}

/// Request to release a seat; name and phone must match the reservation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancellationRequest {
    /// Seat to release, unchecked
    pub seat: u32,
    /// Name on the reservation
    pub name: String,
    /// Phone on the reservation
    pub phone: String,
}

impl CancellationRequest {
    /// Creates a cancellation request
    #[must_use]
    pub fn new(seat: u32, name: impl Into<String>, phone: impl Into<String>) -> Self {
        Self {
            seat,
            name: name.into(),
            phone: phone.into(),
        }
    }
}

// ============================================================================
// State
// ============================================================================

/// What an outstanding command is doing
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MutationKind {
    /// Installing a parsed text roster
    Import,
    /// Replacing contents with what the persistence sink holds
    Load,
    /// Writing one seat
    Reserve(SeatNumber),
    /// Releasing one seat
    Cancel(SeatNumber),
    /// Removing every reservation
    Clear,
}

impl MutationKind {
    /// Metric label
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Import => "import",
            Self::Load => "load",
            Self::Reserve(_) => "reserve",
            Self::Cancel(_) => "cancel",
            Self::Clear => "clear",
        }
    }
}

/// The command currently holding the mutation guard
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PendingMutation {
    /// Command correlation id
    pub request_id: RequestId,
    /// What it is doing
    pub kind: MutationKind,
}

/// Canonical reservation state
#[derive(Clone, Debug)]
pub struct SeatingState {
    reservations: BTreeMap<SeatNumber, Reservation>,
    palette: LocationPalette,
    in_flight: Option<PendingMutation>,
    last_error: Option<SeatingError>,
    revision: u64,
}

impl SeatingState {
    /// Creates an empty seat plan
    #[must_use]
    pub fn new() -> Self {
        Self {
            reservations: BTreeMap::new(),
            palette: LocationPalette::new(),
            in_flight: None,
            last_error: None,
            revision: 0,
        }
    }

    /// Inserts or overwrites the reservation's seat, returning what was there.
    ///
    /// A location seen for the first time gets the next palette colour.
    pub fn upsert(&mut self, reservation: Reservation) -> Option<Reservation> {
        self.palette.assign(reservation.location());
        self.reservations.insert(reservation.seat(), reservation)
    }

    /// Checks the identity challenge for `seat` without changing anything.
    ///
    /// # Errors
    ///
    /// [`SeatingError::NotFound`] for an empty seat,
    /// [`SeatingError::IdentityMismatch`] when name or phone differ.
    pub fn check_identity(
        &self,
        seat: SeatNumber,
        name: &str,
        phone: &str,
    ) -> Result<&Reservation, SeatingError> {
        let reservation = self
            .reservations
            .get(&seat)
            .ok_or(SeatingError::NotFound { seat })?;

        if reservation.matches_identity(name, phone) {
            Ok(reservation)
        } else {
            Err(SeatingError::IdentityMismatch { seat })
        }
    }

    /// Removes `seat` when name and phone match the stored reservation.
    ///
    /// # Errors
    ///
    /// Same as [`SeatingState::check_identity`]; the state is untouched on error.
    pub fn remove_if_match(
        &mut self,
        seat: SeatNumber,
        name: &str,
        phone: &str,
    ) -> Result<Reservation, SeatingError> {
        self.check_identity(seat, name, phone)?;
        self.reservations
            .remove(&seat)
            .ok_or(SeatingError::NotFound { seat })
    }

    /// Discards everything, then installs `records` in order.
    ///
    /// The palette is rebuilt from the records' first-seen locations.
    pub fn replace_all(&mut self, records: impl IntoIterator<Item = Reservation>) {
        self.clear();
        for reservation in records {
            self.upsert(reservation);
        }
    }

    /// Removes every reservation and forgets every location colour
    pub fn clear(&mut self) {
        self.reservations.clear();
        self.palette.clear();
    }

    /// Owned copy of the current contents
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<SeatNumber, Reservation> {
        self.reservations.clone()
    }

    /// Current contents, ordered by seat
    #[must_use]
    pub const fn reservations(&self) -> &BTreeMap<SeatNumber, Reservation> {
        &self.reservations
    }

    /// Reservation on `seat`, if any
    #[must_use]
    pub fn get(&self, seat: SeatNumber) -> Option<&Reservation> {
        self.reservations.get(&seat)
    }

    /// Number of occupied seats
    #[must_use]
    pub fn occupied(&self) -> usize {
        self.reservations.len()
    }

    /// Location colours assigned so far
    #[must_use]
    pub const fn palette(&self) -> &LocationPalette {
        &self.palette
    }

    /// Command holding the mutation guard, if any
    #[must_use]
    pub const fn in_flight(&self) -> Option<&PendingMutation> {
        self.in_flight.as_ref()
    }

    /// Takes the mutation guard
    pub fn begin(&mut self, request_id: RequestId, kind: MutationKind) {
        self.in_flight = Some(PendingMutation { request_id, kind });
    }

    /// Releases the guard if `request_id` holds it
    pub fn finish(&mut self, request_id: RequestId) -> bool {
        if self
            .in_flight
            .is_some_and(|pending| pending.request_id == request_id)
        {
            self.in_flight = None;
            true
        } else {
            false
        }
    }

    /// Most recent failure, cleared by the next successful mutation
    #[must_use]
    pub const fn last_error(&self) -> Option<&SeatingError> {
        self.last_error.as_ref()
    }

    pub(crate) fn set_last_error(&mut self, error: Option<SeatingError>) {
        self.last_error = error;
    }

    /// Number of mutations committed so far; never decreases
    #[must_use]
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    pub(crate) fn mark_committed(&mut self) {
        self.revision += 1;
    }
}

impl Default for SeatingState {
    fn default() -> Self {
        Self::new()
    }
}
