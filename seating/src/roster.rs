//! Free-text roster parsing.
//!
//! Organisers paste the passenger list from a group chat, one passenger per
//! line:
//!
//! ```text
//! 1. Kim(입완, Yangjae, 1)
//! 2. Lee(예정, Sadang, 3)
//! ```
//!
//! Lines that do not have this shape are skipped silently. The result is a
//! list of [`RosterEntry`] candidates; range and duplicate checks happen in
//! [`crate::validation`].

use crate::error::SeatingError;
use crate::types::PaymentStatus;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// `<order>. <name>(<status>, <location>, <seat>)`, searched anywhere in the line.
#[allow(clippy::expect_used)] // Pattern is a literal; covered by tests
static LINE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([0-9]+)\.\s*([^(]+)\(([^,]+),\s*([^,]+),\s*([0-9]+)\)")
        .expect("roster line pattern should compile")
});

/// One parsed roster line, before seat validation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    /// Position in the organiser's list
    pub order_number: u32,
    /// Passenger name, trimmed
    pub name: String,
    /// Status token as typed
    pub raw_status: String,
    /// Status after keyword normalization
    pub payment_status: PaymentStatus,
    /// Boarding location, trimmed
    pub location: String,
    /// Requested seat, unchecked
    pub seat_number: u32,
}

/// Parses one roster line. Returns `None` if the line does not match.
///
/// Numbers too large for `u32` saturate, so an absurd seat is still reported
/// by range validation instead of vanishing.
#[must_use]
pub fn parse_line(line: &str) -> Option<RosterEntry> {
    let captures = LINE_PATTERN.captures(line.trim())?;

    let name = captures.get(2)?.as_str().trim();
    let raw_status = captures.get(3)?.as_str().trim();
    let location = captures.get(4)?.as_str().trim();
    if name.is_empty() || location.is_empty() {
        return None;
    }

    if !PaymentStatus::is_recognized(raw_status) {
        tracing::trace!(raw_status, "Unrecognized status token, treating as pending");
    }

    Some(RosterEntry {
        order_number: parse_number(captures.get(1)?.as_str()),
        name: name.to_string(),
        raw_status: raw_status.to_string(),
        payment_status: PaymentStatus::normalize(raw_status),
        location: location.to_string(),
        seat_number: parse_number(captures.get(5)?.as_str()),
    })
}

/// Parses a pasted roster, keeping matching lines in input order.
///
/// # Errors
///
/// - [`SeatingError::EmptyInput`]: the text is blank
/// - [`SeatingError::EmptyResult`]: no line matched
pub fn parse_roster(text: &str) -> Result<Vec<RosterEntry>, SeatingError> {
    if text.trim().is_empty() {
        return Err(SeatingError::EmptyInput);
    }

    let lines: Vec<&str> = candidate_lines(text).collect();
    let entries: Vec<RosterEntry> = lines.iter().filter_map(|line| parse_line(line)).collect();

    let skipped = lines.len() - entries.len();
    if skipped > 0 {
        tracing::debug!(skipped, parsed = entries.len(), "Skipped roster lines that did not match");
    }

    if entries.is_empty() {
        return Err(SeatingError::EmptyResult);
    }

    Ok(entries)
}

/// Number of non-blank lines in `text`, matching or not
#[must_use]
pub fn candidate_line_count(text: &str) -> usize {
    candidate_lines(text).count()
}

fn candidate_lines(text: &str) -> impl Iterator<Item = &str> {
    text.split('\n').filter(|line| !line.trim().is_empty())
}

fn parse_number(digits: &str) -> u32 {
    digits.parse().unwrap_or(u32::MAX)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_well_formed_line() {
        let entry = parse_line("1. Kim(입완, Yangjae, 1)").unwrap();
        assert_eq!(
            entry,
            RosterEntry {
                order_number: 1,
                name: "Kim".to_string(),
                raw_status: "입완".to_string(),
                payment_status: PaymentStatus::Paid,
                location: "Yangjae".to_string(),
                seat_number: 1,
            }
        );
    }

    #[test]
    fn tolerates_loose_spacing_and_leading_noise() {
        let entry = parse_line("  >> 12.김진욱 (예정,양재,  14)  ").unwrap();
        assert_eq!(entry.order_number, 12);
        assert_eq!(entry.name, "김진욱");
        assert_eq!(entry.location, "양재");
        assert_eq!(entry.seat_number, 14);
        assert_eq!(entry.payment_status, PaymentStatus::Pending);
    }

    #[test]
    fn rejects_malformed_lines() {
        assert_eq!(parse_line("Kim(입완, Yangjae, 1)"), None);
        assert_eq!(parse_line("1. Kim 입완 Yangjae 1"), None);
        assert_eq!(parse_line("1. Kim(입완, Yangjae)"), None);
        assert_eq!(parse_line("1. Kim(입완, Yangjae, two)"), None);
        assert_eq!(parse_line("1. Kim(입완,   , 4)"), None);
        assert_eq!(parse_line(""), None);
    }

    #[test]
    fn oversized_numbers_saturate() {
        let entry = parse_line("1. Kim(입완, Yangjae, 99999999999)").unwrap();
        assert_eq!(entry.seat_number, u32::MAX);
    }

    #[test]
    fn roster_keeps_matching_lines_in_order() {
        let text = "1. Kim(입완, Yangjae, 1)\n\nnot a passenger\n2. Lee(예정, Sadang, 3)\r\n";
        let entries = parse_roster(text).unwrap();
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Kim", "Lee"]);
        assert_eq!(entries[1].seat_number, 3);
        assert_eq!(candidate_line_count(text), 3);
    }

    #[test]
    fn blank_roster_is_empty_input() {
        assert_eq!(parse_roster("   \n\t\n"), Err(SeatingError::EmptyInput));
    }

    #[test]
    fn roster_without_matches_is_empty_result() {
        assert_eq!(
            parse_roster("hello\nworld"),
            Err(SeatingError::EmptyResult)
        );
    }
}
