//! Location colour assignment.
//!
//! Every distinct boarding location gets a colour the first time it is seen.
//! Colours are handed out round-robin from [`PALETTE`] and repeat once there
//! are more locations than colours.

/// Colours handed out to locations, in assignment order.
pub const PALETTE: [&str; 14] = [
    "#e74c3c", "#3498db", "#2ecc71", "#f39c12", "#9b59b6", "#1abc9c", "#e67e22", "#34495e",
    "#e91e63", "#00bcd4", "#8bc34a", "#ff5722", "#795548", "#607d8b",
];

/// Colour for a location that has no assignment.
pub const FALLBACK_COLOR: &str = "#3498db";

/// Location → colour assignments in first-seen order
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LocationPalette {
    assignments: Vec<(String, &'static str)>,
}

impl LocationPalette {
    /// Creates an empty palette
    #[must_use]
    pub const fn new() -> Self {
        Self {
            assignments: Vec::new(),
        }
    }

    /// Returns the location's colour, assigning the next one if it is new.
    pub fn assign(&mut self, location: &str) -> &'static str {
        if let Some(color) = self.color_of(location) {
            return color;
        }

        let color = PALETTE[self.assignments.len() % PALETTE.len()];
        self.assignments.push((location.to_string(), color));
        color
    }

    /// Colour assigned to `location`, if any
    #[must_use]
    pub fn color_of(&self, location: &str) -> Option<&'static str> {
        self.assignments
            .iter()
            .find(|(known, _)| known == location)
            .map(|&(_, color)| color)
    }

    /// Colour assigned to `location`, or [`FALLBACK_COLOR`]
    #[must_use]
    pub fn color_or_fallback(&self, location: &str) -> &'static str {
        self.color_of(location).unwrap_or(FALLBACK_COLOR)
    }

    /// Position of `location` in first-seen order
    #[must_use]
    pub fn rank_of(&self, location: &str) -> Option<usize> {
        self.assignments
            .iter()
            .position(|(known, _)| known == location)
    }

    /// Assignments in first-seen order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &'static str)> {
        self.assignments
            .iter()
            .map(|(location, color)| (location.as_str(), *color))
    }

    /// Number of locations seen
    #[must_use]
    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    /// Returns `true` if no location has a colour yet
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    /// Forgets every assignment; the next location gets the first colour again
    pub fn clear(&mut self) {
        self.assignments.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assignment_is_stable() {
        let mut palette = LocationPalette::new();
        assert_eq!(palette.assign("Yangjae"), "#e74c3c");
        assert_eq!(palette.assign("Sadang"), "#3498db");
        assert_eq!(palette.assign("Yangjae"), "#e74c3c");
        assert_eq!(palette.len(), 2);
        assert_eq!(palette.rank_of("Sadang"), Some(1));
    }

    #[test]
    fn colours_wrap_after_the_last_entry() {
        let mut palette = LocationPalette::new();
        for index in 0..PALETTE.len() {
            palette.assign(&format!("stop-{index}"));
        }
        assert_eq!(palette.assign("one more"), PALETTE[0]);
        assert_eq!(palette.assign("and another"), PALETTE[1]);
    }

    #[test]
    fn unknown_locations_use_the_fallback() {
        let palette = LocationPalette::new();
        assert_eq!(palette.color_of("Nowhere"), None);
        assert_eq!(palette.color_or_fallback("Nowhere"), FALLBACK_COLOR);
    }

    #[test]
    fn clear_restarts_the_rotation() {
        let mut palette = LocationPalette::new();
        palette.assign("A");
        palette.assign("B");
        palette.clear();
        assert!(palette.is_empty());
        assert_eq!(palette.assign("B"), PALETTE[0]);
    }
}
