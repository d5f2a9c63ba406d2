//! Seat counts derived from a snapshot.

use super::palette::LocationPalette;
use crate::types::{Reservation, SeatNumber, SEAT_COUNT};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Whole-bus seat counts
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Statistics {
    /// Occupied seats
    pub total: u32,
    /// Occupied seats with the fare received
    pub paid: u32,
    /// Occupied seats still waiting on the fare
    pub pending: u32,
    /// Free seats
    pub empty: u32,
}

impl Statistics {
    /// Counts a snapshot
    #[must_use]
    pub fn from_snapshot(snapshot: &BTreeMap<SeatNumber, Reservation>) -> Self {
        let (total, paid) = tally(snapshot.values());
        Self {
            total,
            paid,
            pending: total - paid,
            empty: SEAT_COUNT.saturating_sub(total),
        }
    }
}

/// Seat counts for one boarding location
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LocationStatistics {
    /// Boarding location
    pub location: String,
    /// Colour assigned to the location
    pub color: &'static str,
    /// Passengers boarding here
    pub total: u32,
    /// ... of which paid
    pub paid: u32,
    /// ... of which pending
    pub pending: u32,
}

/// Groups a snapshot by location.
///
/// Busiest location first. Ties keep first-seen order from the palette;
/// locations the palette does not know sort last, in seat order.
#[must_use]
pub fn location_statistics(
    snapshot: &BTreeMap<SeatNumber, Reservation>,
    palette: &LocationPalette,
) -> Vec<LocationStatistics> {
    let mut groups: Vec<(&str, Vec<&Reservation>)> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for reservation in snapshot.values() {
        let location = reservation.location();
        let slot = *index.entry(location).or_insert_with(|| {
            groups.push((location, Vec::new()));
            groups.len() - 1
        });
        groups[slot].1.push(reservation);
    }

    groups.sort_by_key(|(location, _)| palette.rank_of(location).unwrap_or(usize::MAX));

    let mut stats: Vec<LocationStatistics> = groups
        .into_iter()
        .map(|(location, members)| {
            let (total, paid) = tally(members.into_iter());
            LocationStatistics {
                location: location.to_string(),
                color: palette.color_or_fallback(location),
                total,
                paid,
                pending: total - paid,
            }
        })
        .collect();

    stats.sort_by(|a, b| b.total.cmp(&a.total));
    stats
}

fn tally<'a>(reservations: impl Iterator<Item = &'a Reservation>) -> (u32, u32) {
    reservations.fold((0, 0), |(total, paid), reservation| {
        (
            total + 1,
            paid + u32::from(reservation.payment_status().is_paid()),
        )
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::{PaymentStatus, SeatingState};
    use seatplan_core::environment::Clock;
    use seatplan_testing::test_clock;

    fn seat(state: &mut SeatingState, number: u32, location: &str, status: PaymentStatus) {
        state.upsert(
            Reservation::new(
                SeatNumber::new(number).unwrap(),
                &format!("passenger {number}"),
                "",
                location,
                status,
                test_clock().now(),
            )
            .unwrap(),
        );
    }

    #[test]
    fn empty_bus() {
        let stats = Statistics::from_snapshot(&BTreeMap::new());
        assert_eq!(
            stats,
            Statistics {
                total: 0,
                paid: 0,
                pending: 0,
                empty: 28
            }
        );
    }

    #[test]
    fn counts_paid_and_pending() {
        let mut state = SeatingState::new();
        seat(&mut state, 1, "Yangjae", PaymentStatus::Paid);
        seat(&mut state, 2, "Yangjae", PaymentStatus::Pending);
        seat(&mut state, 3, "Sadang", PaymentStatus::Paid);

        let stats = Statistics::from_snapshot(state.reservations());
        assert_eq!(stats.total, 3);
        assert_eq!(stats.paid, 2);
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.empty, 25);
    }

    #[test]
    fn locations_sorted_by_size_then_first_seen() {
        let mut state = SeatingState::new();
        seat(&mut state, 1, "Sadang", PaymentStatus::Paid);
        seat(&mut state, 2, "Yangjae", PaymentStatus::Pending);
        seat(&mut state, 3, "Yangjae", PaymentStatus::Paid);
        seat(&mut state, 4, "Suwon", PaymentStatus::Pending);

        let stats = location_statistics(state.reservations(), state.palette());
        let order: Vec<_> = stats.iter().map(|s| s.location.as_str()).collect();
        assert_eq!(order, vec!["Yangjae", "Sadang", "Suwon"]);

        assert_eq!(stats[0].total, 2);
        assert_eq!(stats[0].paid, 1);
        assert_eq!(stats[0].pending, 1);
        assert_eq!(stats[0].color, "#3498db");
        assert_eq!(stats[1].color, "#e74c3c");
    }

    #[test]
    fn unknown_location_gets_fallback_colour() {
        let mut state = SeatingState::new();
        seat(&mut state, 1, "Sadang", PaymentStatus::Paid);

        let stats = location_statistics(state.reservations(), &LocationPalette::new());
        assert_eq!(stats[0].color, super::super::palette::FALLBACK_COLOR);
    }
}
