//! Rendering sinks.
//!
//! A sink receives a fresh [`SeatMapView`] after every committed change. It
//! only draws; it never reads back into the engine.

use crate::projections::SeatMapView;
use std::sync::{Mutex, PoisonError};

/// Something that draws the seat plan
pub trait RenderSink: Send + Sync {
    /// Draws `view`
    fn render(&self, view: &SeatMapView);
}

/// Logs a one-line summary of each view
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingRenderer;

impl RenderSink for TracingRenderer {
    fn render(&self, view: &SeatMapView) {
        let stats = view.statistics;
        tracing::info!(
            total = stats.total,
            paid = stats.paid,
            pending = stats.pending,
            empty = stats.empty,
            locations = view.locations.len(),
            "Seat plan updated"
        );
    }
}

/// Prints the full seat map to stdout
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleRenderer;

impl RenderSink for ConsoleRenderer {
    fn render(&self, view: &SeatMapView) {
        println!("{view}");
    }
}

/// Keeps every view it is given
#[derive(Debug, Default)]
pub struct RecordingRenderer {
    views: Mutex<Vec<SeatMapView>>,
}

impl RecordingRenderer {
    /// Creates an empty recorder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every view received, oldest first
    #[must_use]
    pub fn views(&self) -> Vec<SeatMapView> {
        self.views.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Most recent view
    #[must_use]
    pub fn last(&self) -> Option<SeatMapView> {
        self.views
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }

    /// Number of views received
    #[must_use]
    pub fn count(&self) -> usize {
        self.views.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl RenderSink for RecordingRenderer {
    fn render(&self, view: &SeatMapView) {
        self.views
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(view.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projections::LocationPalette;
    use std::collections::BTreeMap;

    #[test]
    fn recorder_keeps_views_in_order() {
        let recorder = RecordingRenderer::new();
        assert!(recorder.last().is_none());

        let view = SeatMapView::build(&BTreeMap::new(), &LocationPalette::new());
        recorder.render(&view);
        recorder.render(&view);

        assert_eq!(recorder.count(), 2);
        assert_eq!(recorder.last(), Some(view));
    }

    #[test]
    fn tracing_renderer_accepts_any_view() {
        TracingRenderer.render(&SeatMapView::build(&BTreeMap::new(), &LocationPalette::new()));
    }
}
