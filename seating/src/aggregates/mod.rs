//! Aggregate reducers for the bus seat plan.
//!
//! - Seating: the reservation store, its in-flight guard and the
//!   apply-after-success protocol with the persistence sink

pub mod seating;

pub use seating::{SeatingAction, SeatingEnvironment, SeatingReducer};
