//! # kennel-booking
//!
//! Client-side coordination for the kennel calendar and booking form.
//!
//! ## Pieces
//!
//! - `availability`: merges a resource list with the batch availability
//!   answer; always yields an entry for every requested kennel
//! - `grid`: the visible kennel window; each load replaces the previous view
//!   and stale or cancelled loads never write state
//! - `assignment`: multi-pet booking draft with adjacency pre-fill and
//!   soft/hard conflict states, plus moving a reservation between kennels
//! - `dashboard`: check-in / check-out / overnight buckets by tenant-local date
//! - `schedule`: staff shift validation
//! - `report`: reservation summaries for operators

pub mod assignment;
pub mod availability;
pub mod dashboard;
pub mod grid;
pub mod report;
pub mod schedule;

pub use assignment::{move_reservation, BookingDraft, BookingRequest, KennelOption, OptionState};
pub use availability::{occupies_day, overlaps_range, reconcile, Reconciliation};
pub use dashboard::{classify, compute_metrics, DashboardData, DashboardFilter, DashboardMetrics};
pub use grid::{CellState, GridState, GridWindow, KennelGrid, KennelRow, LoadOutcome};
pub use schedule::{validate_shift, StaffShift};

#[cfg(test)]
mod testutil;
