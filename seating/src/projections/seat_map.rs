//! Render instructions for the seat map, roster listing and colour legend.

use super::palette::LocationPalette;
use super::statistics::{location_statistics, LocationStatistics, Statistics};
use crate::types::{PaymentStatus, Reservation, SeatNumber};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Opacity of a seat whose fare has not been received.
const PENDING_OPACITY: f32 = 0.7;

/// How much darker a seat border is than its fill, in percent.
const BORDER_DARKEN_PERCENT: u8 = 20;

/// How to draw one seat
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SeatRender {
    /// Seat number
    pub seat: SeatNumber,
    /// Whether anyone sits here
    pub occupied: bool,
    /// Payment state of the occupant
    pub payment_status: Option<PaymentStatus>,
    /// Fill colour (the occupant's location colour)
    pub display_color: Option<String>,
    /// Border colour, the fill darkened
    pub border_color: Option<String>,
    /// 1.0, or 0.7 for a pending occupant
    pub opacity: f32,
    /// Hover text lines: name, status label, location, phone if known
    pub tooltip: Vec<String>,
}

impl SeatRender {
    fn empty(seat: SeatNumber) -> Self {
        Self {
            seat,
            occupied: false,
            payment_status: None,
            display_color: None,
            border_color: None,
            opacity: 1.0,
            tooltip: Vec::new(),
        }
    }

    fn occupied(reservation: &Reservation, palette: &LocationPalette) -> Self {
        let status = reservation.payment_status();
        let color = palette.color_of(reservation.location());

        let mut tooltip = vec![
            reservation.name().to_string(),
            status.label().to_string(),
            reservation.location().to_string(),
        ];
        if !reservation.phone().is_empty() {
            tooltip.push(reservation.phone().to_string());
        }

        Self {
            seat: reservation.seat(),
            occupied: true,
            payment_status: Some(status),
            display_color: color.map(str::to_string),
            border_color: color.and_then(|c| darken(c, BORDER_DARKEN_PERCENT)),
            opacity: match (color, status) {
                (Some(_), PaymentStatus::Pending) => PENDING_OPACITY,
                _ => 1.0,
            },
            tooltip,
        }
    }
}

/// One line of the passenger listing
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RosterLine {
    /// Seat number
    pub seat: SeatNumber,
    /// Passenger name
    pub name: String,
    /// Payment state
    pub payment_status: PaymentStatus,
    /// Boarding location
    pub location: String,
}

/// One entry of the colour legend
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LegendEntry {
    /// Boarding location
    pub location: String,
    /// Its colour
    pub color: &'static str,
}

/// Everything a rendering sink needs to draw the current seat plan
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SeatMapView {
    /// One entry per seat, in seat order
    pub seats: Vec<SeatRender>,
    /// Whole-bus counts
    pub statistics: Statistics,
    /// Per-location counts, busiest first
    pub locations: Vec<LocationStatistics>,
    /// Passengers by seat number
    pub roster: Vec<RosterLine>,
    /// Location colours in first-seen order
    pub legend: Vec<LegendEntry>,
}

impl SeatMapView {
    /// Derives the view from a snapshot and the current palette
    #[must_use]
    pub fn build(snapshot: &BTreeMap<SeatNumber, Reservation>, palette: &LocationPalette) -> Self {
        let seats = SeatNumber::all()
            .map(|seat| {
                snapshot.get(&seat).map_or_else(
                    || SeatRender::empty(seat),
                    |reservation| SeatRender::occupied(reservation, palette),
                )
            })
            .collect();

        let roster = snapshot
            .values()
            .map(|reservation| RosterLine {
                seat: reservation.seat(),
                name: reservation.name().to_string(),
                payment_status: reservation.payment_status(),
                location: reservation.location().to_string(),
            })
            .collect();

        let legend = palette
            .iter()
            .map(|(location, color)| LegendEntry {
                location: location.to_string(),
                color,
            })
            .collect();

        Self {
            seats,
            statistics: Statistics::from_snapshot(snapshot),
            locations: location_statistics(snapshot, palette),
            roster,
            legend,
        }
    }

    /// Render instruction for `seat`
    #[must_use]
    pub fn seat(&self, seat: SeatNumber) -> Option<&SeatRender> {
        self.seats.iter().find(|render| render.seat == seat)
    }
}

impl fmt::Display for SeatMapView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.seats.chunks(4) {
            let cells: Vec<String> = row
                .iter()
                .map(|render| match render.payment_status {
                    Some(PaymentStatus::Paid) => format!("[{:>2}●]", render.seat.get()),
                    Some(PaymentStatus::Pending) => format!("[{:>2}○]", render.seat.get()),
                    None => format!("[{:>2} ]", render.seat.get()),
                })
                .collect();
            writeln!(f, "{}", cells.join(" "))?;
        }

        let stats = &self.statistics;
        writeln!(
            f,
            "\ntotal {} | {} {} | {} {} | empty {}",
            stats.total,
            PaymentStatus::Paid.label(),
            stats.paid,
            PaymentStatus::Pending.label(),
            stats.pending,
            stats.empty
        )?;

        if !self.locations.is_empty() {
            writeln!(f)?;
            for location in &self.locations {
                writeln!(
                    f,
                    "{} {:<12} {:>2} (paid {}, pending {})",
                    location.color, location.location, location.total, location.paid, location.pending
                )?;
            }
        }

        if !self.roster.is_empty() {
            writeln!(f)?;
            for line in &self.roster {
                writeln!(
                    f,
                    "{:>2}  {:<10} {}  {}",
                    line.seat.get(),
                    line.name,
                    line.payment_status.label(),
                    line.location
                )?;
            }
        }

        Ok(())
    }
}

/// Darkens a `#rrggbb` colour by `percent`.
///
/// Each channel loses `round(2.55 * percent)`, clamped at zero. Returns
/// `None` if `color` is not a six-digit hex colour.
#[must_use]
pub fn darken(color: &str, percent: u8) -> Option<String> {
    let hex = color.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let value = u32::from_str_radix(hex, 16).ok()?;
    let amount = (255 * u32::from(percent) + 50) / 100;

    let channel = |shift: u32| ((value >> shift) & 0xff).saturating_sub(amount);
    Some(format!(
        "#{:02x}{:02x}{:02x}",
        channel(16),
        channel(8),
        channel(0)
    ))
}
