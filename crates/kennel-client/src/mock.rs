//! In-memory backend for tests

use async_trait::async_trait;
use kennel_core::{KennelError, Reservation, Resource, ResourceAvailability, Result};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use crate::api::KennelApi;
use crate::envelope::{Page, Pagination};
use crate::types::{
    BatchAvailabilityRequest, NewReservation, ReservationQuery, ReservationUpdate, ResourceQuery,
};

/// Canned failure returned by a mock endpoint
#[derive(Debug, Clone)]
enum MockFailure {
    Network(String),
    Decode(String),
    Rejected(u16, String),
    Unauthorized(String),
}

impl MockFailure {
    fn to_error(&self) -> KennelError {
        match self {
            Self::Network(msg) => KennelError::Http(msg.clone()),
            Self::Decode(msg) => KennelError::Decode(msg.clone()),
            Self::Rejected(status, msg) => KennelError::Rejected {
                status: *status,
                message: msg.clone(),
            },
            Self::Unauthorized(msg) => KennelError::Unauthorized(msg.clone()),
        }
    }
}

#[derive(Default)]
struct MockState {
    resources: Vec<Resource>,
    availability: Vec<ResourceAvailability>,
    reservations: Vec<Reservation>,
    resources_failure: Option<MockFailure>,
    availability_failure: Option<MockFailure>,
    reservations_failure: Option<MockFailure>,
    create_failure: Option<MockFailure>,
    pet_create_failures: HashMap<String, MockFailure>,
    update_failure: Option<MockFailure>,
    availability_delays: VecDeque<Duration>,
    created: Vec<NewReservation>,
    calls: HashMap<&'static str, usize>,
    next_id: u64,
}

/// Mock booking backend for testing
#[derive(Default)]
pub struct MockKennelApi {
    state: Mutex<MockState>,
}

impl MockKennelApi {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, MockState> {
        // A panicking test thread must not cascade into every other assertion
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn with_resources(self, resources: Vec<Resource>) -> Self {
        self.state().resources = resources;
        self
    }

    pub fn with_availability(self, availability: Vec<ResourceAvailability>) -> Self {
        self.state().availability = availability;
        self
    }

    pub fn with_reservations(self, reservations: Vec<Reservation>) -> Self {
        self.state().reservations = reservations;
        self
    }

    pub fn failing_resources(self, message: &str) -> Self {
        self.state().resources_failure = Some(MockFailure::Network(message.to_string()));
        self
    }

    pub fn failing_availability(self, message: &str) -> Self {
        self.state().availability_failure = Some(MockFailure::Network(message.to_string()));
        self
    }

    /// Batch endpoint answers with a body that does not decode
    pub fn malformed_availability(self, message: &str) -> Self {
        self.state().availability_failure = Some(MockFailure::Decode(message.to_string()));
        self
    }

    /// Batch endpoint answers 401, as with an expired token
    pub fn unauthorized_availability(self, message: &str) -> Self {
        self.state().availability_failure = Some(MockFailure::Unauthorized(message.to_string()));
        self
    }

    pub fn rejecting_availability(self, status: u16, message: &str) -> Self {
        self.state().availability_failure =
            Some(MockFailure::Rejected(status, message.to_string()));
        self
    }

    pub fn unauthorized_reservations(self, message: &str) -> Self {
        self.state().reservations_failure = Some(MockFailure::Unauthorized(message.to_string()));
        self
    }

    pub fn failing_reservations(self, message: &str) -> Self {
        self.state().reservations_failure = Some(MockFailure::Network(message.to_string()));
        self
    }

    /// Every create is answered with the given status and message
    pub fn rejecting_creates(self, status: u16, message: &str) -> Self {
        self.state().create_failure = Some(MockFailure::Rejected(status, message.to_string()));
        self
    }

    /// Creates for one pet are answered with the given status and message
    pub fn rejecting_creates_for_pet(self, pet_id: &str, status: u16, message: &str) -> Self {
        self.state().pet_create_failures.insert(
            pet_id.to_string(),
            MockFailure::Rejected(status, message.to_string()),
        );
        self
    }

    pub fn rejecting_updates(self, status: u16, message: &str) -> Self {
        self.state().update_failure = Some(MockFailure::Rejected(status, message.to_string()));
        self
    }

    /// Delays applied to successive batch availability calls
    pub fn with_availability_delays(self, delays: Vec<Duration>) -> Self {
        self.state().availability_delays = delays.into();
        self
    }

    /// Replace the availability answer for subsequent calls
    pub fn set_availability(&self, availability: Vec<ResourceAvailability>) {
        self.state().availability = availability;
    }

    /// Make the batch endpoint succeed again
    pub fn recover_availability(&self) {
        self.state().availability_failure = None;
    }

    /// Make every create succeed again
    pub fn recover_creates(&self) {
        let mut state = self.state();
        state.create_failure = None;
        state.pet_create_failures.clear();
    }

    /// Reservations accepted through `create_reservation`
    pub fn created(&self) -> Vec<NewReservation> {
        self.state().created.clone()
    }

    pub fn call_count(&self, endpoint: &str) -> usize {
        self.state().calls.get(endpoint).copied().unwrap_or(0)
    }

    fn record(&self, endpoint: &'static str) {
        *self.state().calls.entry(endpoint).or_insert(0) += 1;
    }
}

fn paginate<T: Clone>(items: &[T], page: u32, limit: u32) -> Page<T> {
    let limit = limit.max(1);
    let total_pages = ((items.len() as u64 + limit as u64 - 1) / limit as u64) as u32;
    let start = (page.saturating_sub(1) as usize) * limit as usize;
    let slice = items.iter().skip(start).take(limit as usize).cloned().collect();
    Page::new(
        slice,
        Some(Pagination {
            page,
            limit,
            total_count: items.len() as u64,
            total_pages,
        }),
    )
}

#[async_trait]
impl KennelApi for MockKennelApi {
    async fn list_resources(&self, query: &ResourceQuery) -> Result<Page<Resource>> {
        self.record("list_resources");
        let state = self.state();
        if let Some(failure) = &state.resources_failure {
            return Err(failure.to_error());
        }

        let matching: Vec<Resource> = state
            .resources
            .iter()
            .filter(|r| query.resource_type.map_or(true, |t| r.resource_type == t))
            .cloned()
            .collect();
        Ok(paginate(&matching, query.page, query.limit))
    }

    async fn batch_availability(
        &self,
        request: &BatchAvailabilityRequest,
    ) -> Result<Vec<ResourceAvailability>> {
        self.record("batch_availability");
        let delay = self.state().availability_delays.pop_front();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let state = self.state();
        if let Some(failure) = &state.availability_failure {
            return Err(failure.to_error());
        }

        // Like the real backend, only answers for ids it knows about
        Ok(state
            .availability
            .iter()
            .filter(|a| request.resource_ids.contains(&a.resource_id))
            .cloned()
            .collect())
    }

    async fn list_reservations(&self, query: &ReservationQuery) -> Result<Page<Reservation>> {
        self.record("list_reservations");
        let state = self.state();
        if let Some(failure) = &state.reservations_failure {
            return Err(failure.to_error());
        }

        let matching: Vec<Reservation> = state
            .reservations
            .iter()
            .filter(|r| query.statuses.is_empty() || query.statuses.contains(&r.status))
            .filter(|r| {
                query.range.map_or(true, |range| {
                    r.start_date.date_naive() <= range.end_date
                        && r.end_date.date_naive() >= range.start_date
                })
            })
            .cloned()
            .collect();
        Ok(paginate(&matching, query.page, query.limit))
    }

    async fn create_reservation(&self, reservation: &NewReservation) -> Result<Reservation> {
        self.record("create_reservation");
        let mut state = self.state();
        if let Some(failure) = &state.create_failure {
            return Err(failure.to_error());
        }
        if let Some(failure) = state.pet_create_failures.get(&reservation.pet_id) {
            return Err(failure.to_error());
        }

        state.next_id += 1;
        let created = Reservation {
            id: format!("mock-res-{}", state.next_id),
            pet_id: reservation.pet_id.clone(),
            customer_id: reservation.customer_id.clone(),
            service_id: reservation.service_id.clone(),
            resource_id: reservation.resource_id.clone(),
            start_date: reservation.start_date,
            end_date: reservation.end_date,
            status: reservation
                .status
                .unwrap_or(kennel_core::ReservationStatus::Pending),
            external_id: None,
            created_at: Some(chrono::Utc::now()),
            pet: None,
            customer: None,
            service: None,
            resource: None,
        };
        state.created.push(reservation.clone());
        state.reservations.push(created.clone());
        Ok(created)
    }

    async fn update_reservation(
        &self,
        id: &str,
        update: &ReservationUpdate,
    ) -> Result<Reservation> {
        self.record("update_reservation");
        let mut state = self.state();
        if let Some(failure) = &state.update_failure {
            return Err(failure.to_error());
        }
        let existing = state
            .reservations
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| KennelError::NotFound(format!("reservation {}", id)))?;

        if let Some(resource_id) = &update.resource_id {
            existing.resource_id = Some(resource_id.clone());
        }
        if let Some(start) = update.start_date {
            existing.start_date = start;
        }
        if let Some(end) = update.end_date {
            existing.end_date = end;
        }
        if let Some(status) = update.status {
            existing.status = status;
        }
        Ok(existing.clone())
    }
}
