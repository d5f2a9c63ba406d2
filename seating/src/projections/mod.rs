//! Read-side views derived from the reservation store.
//!
//! Nothing here is stored. Every view is a pure function of a snapshot of
//! [`SeatingState`](crate::types::SeatingState) plus its location palette,
//! recomputed after each mutation:
//!
//! ```text
//! SeatingState ──snapshot──> Statistics / LocationStatistics
//!       │                           │
//!       └──palette──────────> SeatMapView ──> RenderSink
//! ```

pub mod palette;
pub mod seat_map;
pub mod statistics;

pub use palette::{LocationPalette, FALLBACK_COLOR, PALETTE};
pub use seat_map::{darken, LegendEntry, RosterLine, SeatMapView, SeatRender};
pub use statistics::{location_statistics, LocationStatistics, Statistics};
