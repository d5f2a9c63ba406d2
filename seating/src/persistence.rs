//! Persistence sinks for reservations.
//!
//! The engine never mutates its store until the sink has confirmed the
//! change. Sinks only ever see fully validated [`Reservation`]s.
//!
//! - [`JsonFilePersistence`]: one JSON document on disk, rewritten per change
//! - [`InMemoryPersistence`]: a map with failure and pause switches, for tests and demos

use crate::error::{PersistenceError, PersistenceOperation};
use crate::types::{Reservation, ReservationRecord, SeatNumber};
use crate::validation::validate_records;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::future::Future;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use tokio::sync::watch;

/// Future returned by [`PersistenceSink`] operations
pub type SinkFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, PersistenceError>> + Send + 'a>>;

/// External record store for reservations
///
/// Every call is atomic from the engine's point of view: it either fully
/// happens or returns an error.
///
/// Note: Returns `Pin<Box<dyn Future>>` instead of `async fn` to be
/// dyn-compatible (object-safe).
pub trait PersistenceSink: Send + Sync {
    /// Every stored reservation, ordered by seat
    fn read_all(&self) -> SinkFuture<'_, Vec<Reservation>>;

    /// Inserts or replaces the reservation's seat
    fn write(&self, reservation: Reservation) -> SinkFuture<'_, ()>;

    /// Removes whatever is stored for `seat`
    fn delete_by_seat(&self, seat: SeatNumber) -> SinkFuture<'_, ()>;

    /// Removes every reservation
    fn clear_all(&self) -> SinkFuture<'_, ()>;
}

// ============================================================================
// JSON file
// ============================================================================

/// On-disk document layout
#[derive(Debug, Default, Serialize, Deserialize)]
struct Document {
    reservations: Vec<ReservationRecord>,
}

/// Stores reservations as one JSON document
///
/// ```json
/// { "reservations": [ { "seat_number": 1, "name": "Kim", "phone": "",
///   "location": "Yangjae", "payment_status": "paid",
///   "timestamp": "2025-01-01T00:00:00Z" } ] }
/// ```
///
/// A missing or empty file reads as no reservations. Writes go to a sibling
/// temporary file that is then renamed over the original. A document holding
/// two rows for one seat is reported as corrupt and never rewritten.
#[derive(Debug)]
pub struct JsonFilePersistence {
    path: PathBuf,
    lock: tokio::sync::Mutex<()>,
}

impl JsonFilePersistence {
    /// Creates a sink backed by `path`. The file is created on first write.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Backing file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<Vec<Reservation>, PersistenceError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(error) if error.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(error) => return Err(error.into()),
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }

        let document: Document = serde_json::from_slice(&bytes)?;
        let mut reservations = document
            .reservations
            .into_iter()
            .map(|record| {
                let seat = record.seat_number;
                Reservation::try_from(record)
                    .map_err(|error| PersistenceError::CorruptRecord(format!("seat {seat}: {error}")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        reservations.sort_by_key(Reservation::seat);
        Ok(reservations)
    }

    async fn save(&self, reservations: BTreeMap<SeatNumber, Reservation>) -> Result<(), PersistenceError> {
        let document = Document {
            reservations: reservations.into_values().map(ReservationRecord::from).collect(),
        };
        let json = serde_json::to_vec_pretty(&document)?;

        let mut temp = self.path.clone().into_os_string();
        temp.push(".tmp");
        tokio::fs::write(&temp, json).await?;
        tokio::fs::rename(&temp, &self.path).await?;
        Ok(())
    }

    async fn modify<F>(&self, change: F) -> Result<(), PersistenceError>
    where
        F: FnOnce(&mut BTreeMap<SeatNumber, Reservation>) + Send,
    {
        let _guard = self.lock.lock().await;
        let stored = self.load().await?;
        validate_records(&stored)
            .map_err(|error| PersistenceError::CorruptRecord(error.to_string()))?;

        let mut reservations: BTreeMap<SeatNumber, Reservation> = stored
            .into_iter()
            .map(|reservation| (reservation.seat(), reservation))
            .collect();
        change(&mut reservations);
        self.save(reservations).await
    }
}

impl PersistenceSink for JsonFilePersistence {
    fn read_all(&self) -> SinkFuture<'_, Vec<Reservation>> {
        Box::pin(async move {
            let _guard = self.lock.lock().await;
            self.load().await
        })
    }

    fn write(&self, reservation: Reservation) -> SinkFuture<'_, ()> {
        Box::pin(self.modify(move |reservations| {
            reservations.insert(reservation.seat(), reservation);
        }))
    }

    fn delete_by_seat(&self, seat: SeatNumber) -> SinkFuture<'_, ()> {
        Box::pin(self.modify(move |reservations| {
            reservations.remove(&seat);
        }))
    }

    fn clear_all(&self) -> SinkFuture<'_, ()> {
        Box::pin(async move {
            let _guard = self.lock.lock().await;
            self.save(BTreeMap::new()).await
        })
    }
}

// ============================================================================
// In memory
// ============================================================================

/// Map-backed sink with switches for failure injection
///
/// While [`InMemoryPersistence::pause`] is in effect every call blocks until
/// [`InMemoryPersistence::resume`]; this keeps a mutation in flight for as
/// long as a test needs.
#[derive(Debug)]
pub struct InMemoryPersistence {
    records: Mutex<BTreeMap<SeatNumber, Reservation>>,
    failing: AtomicBool,
    calls: Mutex<Vec<PersistenceOperation>>,
    paused: watch::Sender<bool>,
}

impl InMemoryPersistence {
    /// Creates an empty sink
    #[must_use]
    pub fn new() -> Self {
        Self::with_records(Vec::new())
    }

    /// Creates a sink already holding `records`
    #[must_use]
    pub fn with_records(records: impl IntoIterator<Item = Reservation>) -> Self {
        let (paused, _) = watch::channel(false);
        Self {
            records: Mutex::new(
                records
                    .into_iter()
                    .map(|reservation| (reservation.seat(), reservation))
                    .collect(),
            ),
            failing: AtomicBool::new(false),
            calls: Mutex::new(Vec::new()),
            paused,
        }
    }

    /// Makes every following call fail (or succeed again)
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Holds every following call until [`InMemoryPersistence::resume`]
    pub fn pause(&self) {
        self.paused.send_replace(true);
    }

    /// Releases held calls
    pub fn resume(&self) {
        self.paused.send_replace(false);
    }

    /// Operations received so far, in order
    #[must_use]
    pub fn calls(&self) -> Vec<PersistenceOperation> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Current contents, ordered by seat
    #[must_use]
    pub fn records(&self) -> Vec<Reservation> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }

    async fn enter(&self, operation: PersistenceOperation) -> Result<(), PersistenceError> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(operation);

        let mut paused = self.paused.subscribe();
        // The sender lives in `self`, so the channel cannot close here
        let _ = paused.wait_for(|paused| !*paused).await;

        if self.failing.load(Ordering::SeqCst) {
            Err(PersistenceError::Unavailable(format!(
                "{operation} rejected by injected failure"
            )))
        } else {
            Ok(())
        }
    }

    fn with_map<T>(&self, f: impl FnOnce(&mut BTreeMap<SeatNumber, Reservation>) -> T) -> T {
        let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut records)
    }
}

impl Default for InMemoryPersistence {
    fn default() -> Self {
        Self::new()
    }
}

impl PersistenceSink for InMemoryPersistence {
    fn read_all(&self) -> SinkFuture<'_, Vec<Reservation>> {
        Box::pin(async move {
            self.enter(PersistenceOperation::ReadAll).await?;
            Ok(self.records())
        })
    }

    fn write(&self, reservation: Reservation) -> SinkFuture<'_, ()> {
        Box::pin(async move {
            self.enter(PersistenceOperation::Write).await?;
            self.with_map(|records| records.insert(reservation.seat(), reservation));
            Ok(())
        })
    }

    fn delete_by_seat(&self, seat: SeatNumber) -> SinkFuture<'_, ()> {
        Box::pin(async move {
            self.enter(PersistenceOperation::DeleteBySeat).await?;
            self.with_map(|records| records.remove(&seat));
            Ok(())
        })
    }

    fn clear_all(&self) -> SinkFuture<'_, ()> {
        Box::pin(async move {
            self.enter(PersistenceOperation::ClearAll).await?;
            self.with_map(BTreeMap::clear);
            Ok(())
        })
    }
}
