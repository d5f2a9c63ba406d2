//! Bus seat plan: reservation-state reconciliation for a 28-seat bus.
//!
//! Passengers arrive either as a pasted text roster or from a persistence
//! sink. Both paths are validated, land in one canonical seat → reservation
//! map, and every view (seat colours, statistics, roster listing) is derived
//! from that map after each change.
//!
//! # Architecture
//!
//! ```text
//! roster text ──parse──> validate_batch ─┐
//!                                        ├──> SeatingReducer ──> SeatingState
//! booking form ──validate_reservation ───┘         │                  │
//!                                                  │ Effect           │ snapshot
//!                                                  ▼                  ▼
//!                                          PersistenceSink       SeatMapView ──> RenderSink
//! ```
//!
//! Single-seat edits are applied only after the persistence sink confirms
//! them, and only one such edit may be outstanding at a time.
//!
//! # Usage
//!
//! ```rust,ignore
//! use bus_seating::{engine::SeatingEngine, types::ReservationRequest};
//!
//! let engine = SeatingEngine::from_config(&config, Arc::new(TracingRenderer));
//! engine.import_roster("1. Kim(입완, Yangjae, 1)").await?;
//! engine
//!     .reserve_seat(ReservationRequest::new(2, "Lee", "010-1234-5678", "Sadang"))
//!     .await?;
//! assert_eq!(engine.statistics().await.total, 2);
//! ```

#![forbid(unsafe_code)]

pub mod aggregates;
pub mod config;
pub mod engine;
pub mod error;
pub mod persistence;
pub mod projections;
pub mod render;
pub mod roster;
pub mod types;
pub mod validation;

pub use aggregates::{SeatingAction, SeatingEnvironment, SeatingReducer};
pub use config::Config;
pub use engine::{ImportSummary, SeatingEngine};
pub use error::{PersistenceError, SeatingError};
pub use types::{
    CancellationRequest, PaymentStatus, Reservation, ReservationRequest, SeatNumber,
    SeatingState, SEAT_COUNT,
};
