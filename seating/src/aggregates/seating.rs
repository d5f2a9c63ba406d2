//! Seating aggregate: the reservation store's reducer.
//!
//! Commands are validated against current state. Anything that must reach the
//! persistence sink is returned as an effect; the store only changes when the
//! sink's confirmation comes back as an event. While a command is waiting on
//! the sink, every other command is turned away with
//! [`SeatingError::MutationInFlight`].
//!
//! ```text
//! ReserveSeat ──validate──> begin guard ──Effect──> sink.write
//!                                                      │
//!            SeatReserved / RequestFailed <────────────┘
//!                     │
//!               apply_event: upsert, release guard
//! ```

use crate::error::{PersistenceOperation, SeatingError};
use crate::persistence::{PersistenceSink, SinkFuture};
use crate::roster::{candidate_line_count, parse_roster};
use crate::types::{
    CancellationRequest, MutationKind, RequestId, Reservation, ReservationRequest, SeatNumber,
    SeatingState,
};
use crate::validation::{
    validate_batch, validate_cancellation_request, validate_records,
    validate_reservation_request,
};
use chrono::{DateTime, Utc};
use seatplan_core::{effect::Effect, environment::Clock, reducer::Reducer, smallvec, SmallVec};
use seatplan_runtime::metrics::{MutationMetrics, PersistenceMetrics};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

// ============================================================================
// Actions
// ============================================================================

/// Actions for the seating aggregate
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum SeatingAction {
    // ========== Commands ==========
    /// Replace the plan with a pasted text roster (local only, not persisted)
    ImportRoster {
        /// Correlation id
        request_id: RequestId,
        /// Roster text, one passenger per line
        text: String,
    },

    /// Replace the plan with what the persistence sink holds
    LoadReservations {
        /// Correlation id
        request_id: RequestId,
    },

    /// Book one seat
    ReserveSeat {
        /// Correlation id
        request_id: RequestId,
        /// Booking form
        request: ReservationRequest,
    },

    /// Release one seat after the identity challenge
    CancelReservation {
        /// Correlation id
        request_id: RequestId,
        /// Cancellation form
        request: CancellationRequest,
    },

    /// Remove every reservation
    ClearAll {
        /// Correlation id
        request_id: RequestId,
    },

    // ========== Events ==========
    /// A text roster passed validation
    RosterImported {
        /// Correlation id
        request_id: RequestId,
        /// Validated reservations, in roster order
        reservations: Vec<Reservation>,
        /// Non-blank lines that did not match the roster format
        skipped_lines: usize,
    },

    /// The persistence sink's contents were read
    ReservationsLoaded {
        /// Correlation id
        request_id: RequestId,
        /// Stored reservations
        reservations: Vec<Reservation>,
    },

    /// The sink stored a reservation
    SeatReserved {
        /// Correlation id
        request_id: RequestId,
        /// What was stored
        reservation: Reservation,
    },

    /// The sink deleted a reservation
    SeatCancelled {
        /// Correlation id
        request_id: RequestId,
        /// What was removed
        reservation: Reservation,
    },

    /// The sink deleted everything
    SeatsCleared {
        /// Correlation id
        request_id: RequestId,
    },

    /// The command was rejected or the sink call failed; nothing changed
    RequestFailed {
        /// Correlation id
        request_id: RequestId,
        /// Why
        error: SeatingError,
    },
}

impl SeatingAction {
    /// Correlation id carried by every action
    #[must_use]
    pub const fn request_id(&self) -> RequestId {
        match self {
            Self::ImportRoster { request_id, .. }
            | Self::LoadReservations { request_id }
            | Self::ReserveSeat { request_id, .. }
            | Self::CancelReservation { request_id, .. }
            | Self::ClearAll { request_id }
            | Self::RosterImported { request_id, .. }
            | Self::ReservationsLoaded { request_id, .. }
            | Self::SeatReserved { request_id, .. }
            | Self::SeatCancelled { request_id, .. }
            | Self::SeatsCleared { request_id }
            | Self::RequestFailed { request_id, .. } => *request_id,
        }
    }

    /// Check if this is a command
    #[must_use]
    pub const fn is_command(&self) -> bool {
        matches!(
            self,
            Self::ImportRoster { .. }
                | Self::LoadReservations { .. }
                | Self::ReserveSeat { .. }
                | Self::CancelReservation { .. }
                | Self::ClearAll { .. }
        )
    }

    /// Check if this is an event
    #[must_use]
    pub const fn is_event(&self) -> bool {
        !self.is_command()
    }

    /// Whether this event changes the seat plan
    #[must_use]
    pub const fn is_commit(&self) -> bool {
        matches!(
            self,
            Self::RosterImported { .. }
                | Self::ReservationsLoaded { .. }
                | Self::SeatReserved { .. }
                | Self::SeatCancelled { .. }
                | Self::SeatsCleared { .. }
        )
    }

    /// Whether this action settles the command `request_id`
    #[must_use]
    pub fn is_outcome_for(&self, request_id: RequestId) -> bool {
        self.is_event() && self.request_id() == request_id
    }
}

// ============================================================================
// Environment
// ============================================================================

/// Dependencies of the seating reducer
#[derive(Clone)]
pub struct SeatingEnvironment {
    /// Timestamps for new reservations
    pub clock: Arc<dyn Clock>,
    /// Where confirmed changes are written
    pub persistence: Arc<dyn PersistenceSink>,
}

impl SeatingEnvironment {
    /// Creates a new `SeatingEnvironment`
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, persistence: Arc<dyn PersistenceSink>) -> Self {
        Self { clock, persistence }
    }
}

// ============================================================================
// Reducer
// ============================================================================

/// Reducer for the seating aggregate
#[derive(Clone, Debug, Default)]
pub struct SeatingReducer;

impl SeatingReducer {
    /// Creates a new `SeatingReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Outcome decided without touching the sink
    fn reject(request_id: RequestId, error: SeatingError) -> SmallVec<[Effect<SeatingAction>; 4]> {
        tracing::warn!(%request_id, kind = error.kind(), %error, "Command rejected");
        smallvec![Effect::feedback(SeatingAction::RequestFailed { request_id, error })]
    }

    fn validate_import(
        text: &str,
        now: DateTime<Utc>,
    ) -> Result<(Vec<Reservation>, usize), SeatingError> {
        let entries = parse_roster(text)?;
        let skipped_lines = candidate_line_count(text) - entries.len();
        Ok((validate_batch(&entries, now)?, skipped_lines))
    }

    fn validate_reserve_seat(
        request: &ReservationRequest,
        now: DateTime<Utc>,
    ) -> Result<Reservation, SeatingError> {
        validate_reservation_request(request)?;
        Reservation::new(
            SeatNumber::new(request.seat)?,
            &request.name,
            &request.phone,
            &request.location,
            request.payment_status,
            now,
        )
    }

    fn validate_cancel(
        state: &SeatingState,
        request: &CancellationRequest,
    ) -> Result<Reservation, SeatingError> {
        validate_cancellation_request(request)?;
        let seat = SeatNumber::new(request.seat)?;
        state
            .check_identity(seat, &request.name, &request.phone)
            .cloned()
    }

    /// Runs a sink call, recording its duration and failure
    async fn persist<T>(
        operation: PersistenceOperation,
        call: SinkFuture<'_, T>,
    ) -> Result<T, SeatingError> {
        let start = Instant::now();
        let result = call.await;
        PersistenceMetrics::record_call(operation.as_str(), start.elapsed());

        result.map_err(|error| {
            tracing::error!(%operation, %error, "Persistence sink call failed");
            PersistenceMetrics::record_failure(operation.as_str());
            SeatingError::persistence(operation, &error)
        })
    }

    /// Effect that settles `request_id` with the sink's answer
    fn sink_effect<F, Fut>(request_id: RequestId, call: F) -> Effect<SeatingAction>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<SeatingAction, SeatingError>> + Send + 'static,
    {
        Effect::Future(Box::pin(async move {
            Some(
                call()
                    .await
                    .unwrap_or_else(|error| SeatingAction::RequestFailed { request_id, error }),
            )
        }))
    }

    /// Applies an event to state
    fn apply_event(state: &mut SeatingState, action: &SeatingAction) {
        match action {
            SeatingAction::RosterImported {
                request_id,
                reservations,
                skipped_lines,
            } => {
                state.replace_all(reservations.iter().cloned());
                Self::commit(state, *request_id, MutationKind::Import);
                tracing::info!(
                    %request_id,
                    imported = reservations.len(),
                    skipped_lines,
                    "Roster imported"
                );
            },
            SeatingAction::ReservationsLoaded {
                request_id,
                reservations,
            } => {
                state.replace_all(reservations.iter().cloned());
                Self::commit(state, *request_id, MutationKind::Load);
                tracing::info!(%request_id, loaded = reservations.len(), "Reservations loaded");
            },
            SeatingAction::SeatReserved {
                request_id,
                reservation,
            } => {
                let seat = reservation.seat();
                state.upsert(reservation.clone());
                Self::commit(state, *request_id, MutationKind::Reserve(seat));
                tracing::info!(%request_id, %seat, location = reservation.location(), "Seat reserved");
            },
            SeatingAction::SeatCancelled {
                request_id,
                reservation,
            } => {
                let seat = reservation.seat();
                if let Err(error) =
                    state.remove_if_match(seat, reservation.name(), reservation.phone())
                {
                    tracing::warn!(%request_id, %seat, %error, "Cancelled seat no longer matched");
                }
                Self::commit(state, *request_id, MutationKind::Cancel(seat));
                tracing::info!(%request_id, %seat, "Seat cancelled");
            },
            SeatingAction::SeatsCleared { request_id } => {
                state.clear();
                Self::commit(state, *request_id, MutationKind::Clear);
                tracing::info!(%request_id, "All seats cleared");
            },
            SeatingAction::RequestFailed { request_id, error } => {
                state.finish(*request_id);
                state.set_last_error(Some(error.clone()));
                MutationMetrics::record_rejection(error.kind());
            },
            // Commands are not events
            _ => {},
        }
    }

    fn commit(state: &mut SeatingState, request_id: RequestId, kind: MutationKind) {
        state.finish(request_id);
        state.set_last_error(None);
        state.mark_committed();
        MutationMetrics::record_commit(kind.as_str());
    }
}

impl Reducer for SeatingReducer {
    type State = SeatingState;
    type Action = SeatingAction;
    type Environment = SeatingEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        if let Some(pending) = state.in_flight().filter(|_| action.is_command()) {
            tracing::debug!(
                holder = %pending.request_id,
                kind = pending.kind.as_str(),
                "Mutation already in flight"
            );
            return Self::reject(action.request_id(), SeatingError::MutationInFlight);
        }

        match action {
            // ========== Commands ==========
            SeatingAction::ImportRoster { request_id, text } => {
                match Self::validate_import(&text, env.clock.now()) {
                    Ok((reservations, skipped_lines)) => {
                        state.begin(request_id, MutationKind::Import);
                        smallvec![Effect::feedback(SeatingAction::RosterImported {
                            request_id,
                            reservations,
                            skipped_lines,
                        })]
                    },
                    Err(error) => Self::reject(request_id, error),
                }
            },

            SeatingAction::LoadReservations { request_id } => {
                state.begin(request_id, MutationKind::Load);
                let sink = Arc::clone(&env.persistence);
                smallvec![Self::sink_effect(request_id, move || async move {
                    let reservations =
                        Self::persist(PersistenceOperation::ReadAll, sink.read_all()).await?;
                    validate_records(&reservations)?;
                    Ok(SeatingAction::ReservationsLoaded {
                        request_id,
                        reservations,
                    })
                })]
            },

            SeatingAction::ReserveSeat {
                request_id,
                request,
            } => match Self::validate_reserve_seat(&request, env.clock.now()) {
                Ok(reservation) => {
                    state.begin(request_id, MutationKind::Reserve(reservation.seat()));
                    let sink = Arc::clone(&env.persistence);
                    smallvec![Self::sink_effect(request_id, move || async move {
                        Self::persist(PersistenceOperation::Write, sink.write(reservation.clone()))
                            .await?;
                        Ok(SeatingAction::SeatReserved {
                            request_id,
                            reservation,
                        })
                    })]
                },
                Err(error) => Self::reject(request_id, error),
            },

            SeatingAction::CancelReservation {
                request_id,
                request,
            } => match Self::validate_cancel(state, &request) {
                Ok(reservation) => {
                    let seat = reservation.seat();
                    state.begin(request_id, MutationKind::Cancel(seat));
                    let sink = Arc::clone(&env.persistence);
                    smallvec![Self::sink_effect(request_id, move || async move {
                        Self::persist(PersistenceOperation::DeleteBySeat, sink.delete_by_seat(seat))
                            .await?;
                        Ok(SeatingAction::SeatCancelled {
                            request_id,
                            reservation,
                        })
                    })]
                },
                Err(error) => Self::reject(request_id, error),
            },

            SeatingAction::ClearAll { request_id } => {
                state.begin(request_id, MutationKind::Clear);
                let sink = Arc::clone(&env.persistence);
                smallvec![Self::sink_effect(request_id, move || async move {
                    Self::persist(PersistenceOperation::ClearAll, sink.clear_all()).await?;
                    Ok(SeatingAction::SeatsCleared { request_id })
                })]
            },

            // ========== Events ==========
            event => {
                Self::apply_event(state, &event);
                SmallVec::new()
            },
        }
    }
}
