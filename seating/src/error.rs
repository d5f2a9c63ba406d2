//! Error types for the bus seating engine.
//!
//! [`SeatingError`] is what callers see. It is `Clone` and serializable
//! because failures travel through the store as `RequestFailed` actions.
//! [`PersistenceError`] is what a persistence sink reports; the engine folds
//! it into [`SeatingError::PersistenceFailure`].

use crate::types::{SeatNumber, SEAT_COUNT};
use seatplan_runtime::StoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// A field that must be filled in before a seat can be reserved or released.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequiredField {
    /// Passenger name
    Name,
    /// Contact phone number
    Phone,
    /// Boarding location
    Location,
}

impl fmt::Display for RequiredField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Name => "name",
            Self::Phone => "phone",
            Self::Location => "location",
        })
    }
}

/// Persistence sink operation, used in failure reports and metric labels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PersistenceOperation {
    /// Reading every stored reservation
    ReadAll,
    /// Upserting one reservation
    Write,
    /// Deleting one seat
    DeleteBySeat,
    /// Deleting everything
    ClearAll,
}

impl PersistenceOperation {
    /// Stable snake-case name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ReadAll => "read_all",
            Self::Write => "write",
            Self::DeleteBySeat => "delete_by_seat",
            Self::ClearAll => "clear_all",
        }
    }
}

impl fmt::Display for PersistenceOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every user-visible failure of the seating engine.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SeatingError {
    /// The roster text was empty after trimming.
    #[error("no passenger information was entered")]
    EmptyInput,

    /// No roster line matched `<order>. <name>(<status>, <location>, <seat>)`.
    #[error("no line matched the roster format, e.g. `1. Kim(입완, Yangjae, 1)`")]
    EmptyResult,

    /// One or more seat numbers fall outside the seat universe.
    #[error("seat numbers must be between 1 and {}: {}", SEAT_COUNT, join(.seats))]
    InvalidSeatRange {
        /// Offending seat numbers, in input order
        seats: Vec<u32>,
    },

    /// The same seat number appears more than once in a batch.
    #[error("duplicate seat numbers: {}", join(.seats))]
    DuplicateSeat {
        /// Each duplicated seat number, listed once
        seats: Vec<u32>,
    },

    /// Required fields were left blank.
    #[error("required fields are missing: {}", join(.fields))]
    MissingRequiredField {
        /// Every blank field
        fields: Vec<RequiredField>,
    },

    /// The phone number is not of the form `01X-XXX(X)-XXXX`.
    #[error("invalid phone number `{phone}`, expected e.g. 010-1234-5678")]
    InvalidPhoneFormat {
        /// The rejected input
        phone: String,
    },

    /// There is no reservation on the seat.
    #[error("seat {seat} has no reservation")]
    NotFound {
        /// Requested seat
        seat: SeatNumber,
    },

    /// Name or phone differ from the stored reservation.
    #[error("name and phone do not match the reservation on seat {seat}")]
    IdentityMismatch {
        /// Requested seat
        seat: SeatNumber,
    },

    /// A previous change is still waiting on the persistence sink.
    #[error("another change is still being saved, try again once it completes")]
    MutationInFlight,

    /// The persistence sink call failed; nothing was applied.
    #[error("saving failed during {operation}: {reason}")]
    PersistenceFailure {
        /// Operation that failed
        operation: PersistenceOperation,
        /// Sink-provided reason
        reason: String,
    },

    /// The caller stopped waiting for the outcome.
    #[error("timed out waiting for the reservation store")]
    Timeout,

    /// The store runtime failed.
    #[error("reservation store unavailable: {0}")]
    Runtime(String),
}

impl SeatingError {
    /// Wrap a sink failure.
    #[must_use]
    pub fn persistence(operation: PersistenceOperation, error: &PersistenceError) -> Self {
        Self::PersistenceFailure {
            operation,
            reason: error.to_string(),
        }
    }

    /// Short snake-case tag, used as a metric label.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::EmptyInput => "empty_input",
            Self::EmptyResult => "empty_result",
            Self::InvalidSeatRange { .. } => "invalid_seat_range",
            Self::DuplicateSeat { .. } => "duplicate_seat",
            Self::MissingRequiredField { .. } => "missing_required_field",
            Self::InvalidPhoneFormat { .. } => "invalid_phone_format",
            Self::NotFound { .. } => "not_found",
            Self::IdentityMismatch { .. } => "identity_mismatch",
            Self::MutationInFlight => "mutation_in_flight",
            Self::PersistenceFailure { .. } => "persistence_failure",
            Self::Timeout => "timeout",
            Self::Runtime(_) => "runtime",
        }
    }
}

impl From<StoreError> for SeatingError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::Timeout => Self::Timeout,
            StoreError::ChannelClosed => Self::Runtime(error.to_string()),
        }
    }
}

/// Errors reported by a persistence sink.
#[derive(Error, Debug)]
pub enum PersistenceError {
    /// Underlying I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stored document could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored row violates a reservation invariant.
    #[error("corrupt record: {0}")]
    CorruptRecord(String),

    /// The sink refused or could not be reached.
    #[error("sink unavailable: {0}")]
    Unavailable(String),
}

fn join<I>(items: I) -> String
where
    I: IntoIterator,
    I::Item: fmt::Display,
{
    items
        .into_iter()
        .map(|item| item.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_seats() {
        let error = SeatingError::InvalidSeatRange { seats: vec![0, 29] };
        assert_eq!(
            error.to_string(),
            "seat numbers must be between 1 and 28: 0, 29"
        );

        let error = SeatingError::DuplicateSeat { seats: vec![3] };
        assert_eq!(error.to_string(), "duplicate seat numbers: 3");
    }

    #[test]
    fn missing_fields_are_listed_together() {
        let error = SeatingError::MissingRequiredField {
            fields: vec![RequiredField::Name, RequiredField::Location],
        };
        assert_eq!(error.to_string(), "required fields are missing: name, location");
        assert_eq!(error.kind(), "missing_required_field");
    }

    #[test]
    fn store_timeout_maps_to_timeout() {
        assert_eq!(SeatingError::from(StoreError::Timeout), SeatingError::Timeout);
        assert!(matches!(
            SeatingError::from(StoreError::ChannelClosed),
            SeatingError::Runtime(_)
        ));
    }

    #[test]
    fn persistence_failure_keeps_operation_and_reason() {
        let error = SeatingError::persistence(
            PersistenceOperation::Write,
            &PersistenceError::Unavailable("offline".to_string()),
        );
        assert_eq!(
            error.to_string(),
            "saving failed during write: sink unavailable: offline"
        );
    }
}
