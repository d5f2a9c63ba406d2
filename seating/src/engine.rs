//! The seating engine: one explicit context object per session.
//!
//! [`SeatingEngine`] owns the [`Store`] running the seating reducer, turns each
//! call into a command and waits for the matching outcome.
//!
//! Rendering follows the store, not the caller: a background task watches the
//! store's action stream and hands a fresh [`SeatMapView`] to the rendering
//! sink after every committed mutation, including one that lands after its
//! caller gave up waiting.

use crate::aggregates::{SeatingAction, SeatingEnvironment, SeatingReducer};
use crate::config::Config;
use crate::error::SeatingError;
use crate::persistence::JsonFilePersistence;
use crate::projections::{location_statistics, LocationStatistics, SeatMapView, Statistics};
use crate::render::RenderSink;
use crate::types::{
    CancellationRequest, RequestId, Reservation, ReservationRequest, SeatNumber, SeatingState,
};
use seatplan_core::environment::SystemClock;
use seatplan_runtime::Store;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

/// Store type driving the seating reducer
pub type SeatingStore = Store<SeatingState, SeatingAction, SeatingEnvironment, SeatingReducer>;

/// Result of a text import
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImportSummary {
    /// Passengers installed
    pub imported: usize,
    /// Non-blank lines that did not match the roster format
    pub skipped_lines: usize,
}

/// Reservation engine for one bus
#[derive(Clone)]
pub struct SeatingEngine {
    store: SeatingStore,
    rendered: watch::Receiver<u64>,
    request_timeout: Duration,
    _render_task: Arc<RenderTask>,
}

/// Aborts the render loop once the last engine handle is gone
struct RenderTask(JoinHandle<()>);

impl Drop for RenderTask {
    fn drop(&mut self) {
        self.0.abort();
    }
}

impl SeatingEngine {
    /// Creates an engine with an empty seat plan.
    ///
    /// Spawns the render loop, so it must be called inside a tokio runtime.
    #[must_use]
    pub fn new(
        environment: SeatingEnvironment,
        renderer: Arc<dyn RenderSink>,
        request_timeout: Duration,
    ) -> Self {
        let store = Store::new(SeatingState::new(), SeatingReducer::new(), environment);
        let (rendered_tx, rendered) = watch::channel(0);
        let commits = store.subscribe_actions();
        let task = tokio::spawn(render_commits(store.clone(), commits, renderer, rendered_tx));

        Self {
            store,
            rendered,
            request_timeout,
            _render_task: Arc::new(RenderTask(task)),
        }
    }

    /// Creates an engine backed by the configured JSON file and the system clock
    #[must_use]
    pub fn from_config(config: &Config, renderer: Arc<dyn RenderSink>) -> Self {
        let environment = SeatingEnvironment::new(
            Arc::new(SystemClock),
            Arc::new(JsonFilePersistence::new(config.storage.data_file.clone())),
        );
        Self::new(environment, renderer, config.request_timeout())
    }

    /// Replaces the plan with a pasted roster.
    ///
    /// The import is local: nothing is written to the persistence sink.
    ///
    /// # Errors
    ///
    /// [`SeatingError::EmptyInput`], [`SeatingError::EmptyResult`],
    /// [`SeatingError::InvalidSeatRange`], [`SeatingError::DuplicateSeat`],
    /// [`SeatingError::MutationInFlight`] or [`SeatingError::Timeout`]. The
    /// plan is unchanged on error.
    pub async fn import_roster(&self, text: &str) -> Result<ImportSummary, SeatingError> {
        let action = SeatingAction::ImportRoster {
            request_id: RequestId::new(),
            text: text.to_string(),
        };

        match self.dispatch(action).await? {
            SeatingAction::RosterImported {
                reservations,
                skipped_lines,
                ..
            } => Ok(ImportSummary {
                imported: reservations.len(),
                skipped_lines,
            }),
            other => Err(unexpected(&other)),
        }
    }

    /// Replaces the plan with what the persistence sink holds and returns
    /// the number of reservations loaded.
    ///
    /// # Errors
    ///
    /// [`SeatingError::PersistenceFailure`] if the sink cannot be read,
    /// [`SeatingError::DuplicateSeat`] if it holds two rows for one seat,
    /// [`SeatingError::MutationInFlight`] or [`SeatingError::Timeout`].
    pub async fn load_reservations(&self) -> Result<usize, SeatingError> {
        let action = SeatingAction::LoadReservations {
            request_id: RequestId::new(),
        };

        match self.dispatch(action).await? {
            SeatingAction::ReservationsLoaded { reservations, .. } => Ok(reservations.len()),
            other => Err(unexpected(&other)),
        }
    }

    /// Books a seat, overwriting any previous occupant.
    ///
    /// # Errors
    ///
    /// Validation errors ([`SeatingError::MissingRequiredField`],
    /// [`SeatingError::InvalidPhoneFormat`], [`SeatingError::InvalidSeatRange`]),
    /// [`SeatingError::PersistenceFailure`], [`SeatingError::MutationInFlight`]
    /// or [`SeatingError::Timeout`].
    pub async fn reserve_seat(
        &self,
        request: ReservationRequest,
    ) -> Result<Reservation, SeatingError> {
        let action = SeatingAction::ReserveSeat {
            request_id: RequestId::new(),
            request,
        };

        match self.dispatch(action).await? {
            SeatingAction::SeatReserved { reservation, .. } => Ok(reservation),
            other => Err(unexpected(&other)),
        }
    }

    /// Releases a seat if name and phone match, returning the removed reservation.
    ///
    /// # Errors
    ///
    /// [`SeatingError::MissingRequiredField`], [`SeatingError::InvalidSeatRange`],
    /// [`SeatingError::NotFound`], [`SeatingError::IdentityMismatch`],
    /// [`SeatingError::PersistenceFailure`], [`SeatingError::MutationInFlight`]
    /// or [`SeatingError::Timeout`].
    pub async fn cancel_reservation(
        &self,
        request: CancellationRequest,
    ) -> Result<Reservation, SeatingError> {
        let action = SeatingAction::CancelReservation {
            request_id: RequestId::new(),
            request,
        };

        match self.dispatch(action).await? {
            SeatingAction::SeatCancelled { reservation, .. } => Ok(reservation),
            other => Err(unexpected(&other)),
        }
    }

    /// Removes every reservation, here and in the persistence sink.
    ///
    /// # Errors
    ///
    /// [`SeatingError::PersistenceFailure`], [`SeatingError::MutationInFlight`]
    /// or [`SeatingError::Timeout`].
    pub async fn clear_all(&self) -> Result<(), SeatingError> {
        let action = SeatingAction::ClearAll {
            request_id: RequestId::new(),
        };

        match self.dispatch(action).await? {
            SeatingAction::SeatsCleared { .. } => Ok(()),
            other => Err(unexpected(&other)),
        }
    }

    /// Owned copy of the current reservations
    pub async fn snapshot(&self) -> BTreeMap<SeatNumber, Reservation> {
        self.store.state(SeatingState::snapshot).await
    }

    /// Whole-bus counts
    pub async fn statistics(&self) -> Statistics {
        self.store
            .state(|state| Statistics::from_snapshot(state.reservations()))
            .await
    }

    /// Per-location counts, busiest first
    pub async fn location_statistics(&self) -> Vec<LocationStatistics> {
        self.store
            .state(|state| location_statistics(state.reservations(), state.palette()))
            .await
    }

    /// Current seat map
    pub async fn view(&self) -> SeatMapView {
        self.store
            .state(|state| SeatMapView::build(state.reservations(), state.palette()))
            .await
    }

    /// Whether a command is still waiting on the persistence sink
    pub async fn is_busy(&self) -> bool {
        self.store.state(|state| state.in_flight().is_some()).await
    }

    /// Most recent failure recorded by the store
    pub async fn last_error(&self) -> Option<SeatingError> {
        self.store.state(|state| state.last_error().cloned()).await
    }

    /// Sends a command and waits for the event that settles it
    async fn dispatch(&self, action: SeatingAction) -> Result<SeatingAction, SeatingError> {
        let request_id = action.request_id();

        let outcome = self
            .store
            .send_and_wait_for(
                action,
                move |candidate| candidate.is_outcome_for(request_id),
                self.request_timeout,
            )
            .await
            .inspect_err(|error| {
                tracing::warn!(%request_id, %error, "Gave up waiting for command outcome");
            })?;

        match outcome {
            SeatingAction::RequestFailed { error, .. } => Err(error),
            outcome => {
                self.wait_until_rendered().await;
                Ok(outcome)
            },
        }
    }

    /// Waits until the render loop has drawn the plan as it stands now
    async fn wait_until_rendered(&self) {
        let revision = self.store.state(SeatingState::revision).await;
        let mut rendered = self.rendered.clone();
        if rendered.wait_for(|drawn| *drawn >= revision).await.is_err() {
            tracing::warn!(revision, "Render loop stopped before drawing the plan");
        }
    }
}

/// Renders the plan after every committed mutation until the store goes away
async fn render_commits(
    store: SeatingStore,
    mut commits: broadcast::Receiver<SeatingAction>,
    renderer: Arc<dyn RenderSink>,
    rendered: watch::Sender<u64>,
) {
    loop {
        match commits.recv().await {
            Ok(action) if action.is_commit() => {},
            Ok(_) => continue,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Render loop lagged; drawing the current plan");
            },
            Err(broadcast::error::RecvError::Closed) => break,
        }

        let (revision, view) = store
            .state(|state| {
                (
                    state.revision(),
                    SeatMapView::build(state.reservations(), state.palette()),
                )
            })
            .await;
        renderer.render(&view);
        rendered.send_replace(revision);
    }
}

fn unexpected(action: &SeatingAction) -> SeatingError {
    SeatingError::Runtime(format!("unexpected outcome: {action:?}"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::persistence::InMemoryPersistence;
    use crate::render::RecordingRenderer;
    use seatplan_testing::test_clock;

    fn engine() -> (SeatingEngine, Arc<RecordingRenderer>) {
        let renderer = Arc::new(RecordingRenderer::new());
        let environment = SeatingEnvironment::new(
            Arc::new(test_clock()),
            Arc::new(InMemoryPersistence::new()),
        );
        let engine = SeatingEngine::new(
            environment,
            Arc::clone(&renderer) as Arc<dyn RenderSink>,
            Duration::from_secs(1),
        );
        (engine, renderer)
    }

    #[tokio::test]
    async fn successful_import_renders_once() {
        let (engine, renderer) = engine();
        let summary = engine
            .import_roster("1. Kim(입완, Yangjae, 1)\nignored")
            .await
            .unwrap();

        assert_eq!(
            summary,
            ImportSummary {
                imported: 1,
                skipped_lines: 1
            }
        );
        assert_eq!(renderer.count(), 1);
        assert_eq!(renderer.last().unwrap().statistics.total, 1);
    }

    #[tokio::test]
    async fn rejected_import_does_not_render() {
        let (engine, renderer) = engine();
        let result = engine.import_roster("").await;

        assert_eq!(result, Err(SeatingError::EmptyInput));
        tokio::task::yield_now().await;
        assert_eq!(renderer.count(), 0);
        assert_eq!(engine.last_error().await, Some(SeatingError::EmptyInput));
        assert!(!engine.is_busy().await);
    }
}
