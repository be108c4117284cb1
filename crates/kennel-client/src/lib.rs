//! # kennel-client
//!
//! Typed client for the kennel booking backend.
//!
//! - `KennelApi` is the seam every state container talks through;
//!   `HttpKennelApi` speaks JSON over HTTP, `MockKennelApi` serves tests.
//! - Every response is decoded through one envelope type (`ApiEnvelope<T>`).
//!   A body that does not match is a `KennelError::Decode`, never a guess.
//! - Credentials come from an injected `TokenProvider`. A missing token
//!   sends the request unauthenticated instead of failing.

mod api;
mod auth;
mod client;
mod envelope;
mod mock;
mod types;

pub use api::{list_all_reservations, list_all_resources, KennelApi};
pub use auth::{EnvToken, NoToken, Session, StaticToken, TokenProvider};
pub use client::HttpKennelApi;
pub use envelope::{
    decode_envelope, error_message, ApiEnvelope, BatchAvailability, Page, Pagination,
    ReservationList, ResourceList,
};
pub use mock::MockKennelApi;
pub use types::*;
