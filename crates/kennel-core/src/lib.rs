//! # kennel-core
//!
//! Core types for the kennel booking coordination system.
//!
//! A tenant runs a boarding/daycare facility made of bookable resources
//! (kennels, suites). Reservations claim one resource for one pet over a
//! date range. This crate holds the shared vocabulary:
//!
//! - Domain types (`Resource`, `Reservation`, `DateRange`, ...)
//! - The unified `KennelError` and field-level `ValidationErrors`
//! - Tenant configuration loaded from `.kennel/config.toml`
//! - The kennel name comparator used for every kennel listing
//! - Fail-open helpers for graceful degradation at fetch boundaries

mod error;
mod types;
mod validation;

pub mod config;
pub mod fail_open;
pub mod sort;

pub use config::KennelConfig;
pub use error::{KennelError, Result};
pub use sort::{compare_kennel_names, sort_resources};
pub use types::*;
pub use validation::{FieldError, ValidationErrors};
