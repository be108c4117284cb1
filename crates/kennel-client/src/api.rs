//! Backend API abstraction

use async_trait::async_trait;
use kennel_core::{Reservation, Resource, ResourceAvailability, Result};
use tracing::warn;

use crate::envelope::Page;
use crate::types::{
    BatchAvailabilityRequest, NewReservation, ReservationQuery, ReservationUpdate, ResourceQuery,
};

/// Upper bound on pages walked by the `list_all_*` helpers
const MAX_PAGES: u32 = 200;

/// Trait for talking to the booking backend (allows mocking in tests)
#[async_trait]
pub trait KennelApi: Send + Sync {
    /// `GET /api/resources`
    async fn list_resources(&self, query: &ResourceQuery) -> Result<Page<Resource>>;

    /// `POST /api/resources/availability/batch`
    async fn batch_availability(
        &self,
        request: &BatchAvailabilityRequest,
    ) -> Result<Vec<ResourceAvailability>>;

    /// `GET /api/reservations`
    async fn list_reservations(&self, query: &ReservationQuery) -> Result<Page<Reservation>>;

    /// `POST /api/reservations`
    async fn create_reservation(&self, reservation: &NewReservation) -> Result<Reservation>;

    /// `PUT /api/reservations/{id}`
    async fn update_reservation(&self, id: &str, update: &ReservationUpdate)
        -> Result<Reservation>;
}

/// Fetch every page of resources matching `query`
pub async fn list_all_resources<A>(api: &A, query: &ResourceQuery) -> Result<Vec<Resource>>
where
    A: KennelApi + ?Sized,
{
    let mut query = query.clone();
    let mut all = Vec::new();

    loop {
        let page = api.list_resources(&query).await?;
        let more = page.has_more(query.page);
        all.extend(page.items);

        if !more {
            break;
        }
        if query.page >= MAX_PAGES {
            warn!("Stopped listing resources after {} pages", MAX_PAGES);
            break;
        }
        query.page += 1;
    }

    Ok(all)
}

/// Fetch every page of reservations matching `query`
pub async fn list_all_reservations<A>(api: &A, query: &ReservationQuery) -> Result<Vec<Reservation>>
where
    A: KennelApi + ?Sized,
{
    let mut query = query.clone();
    let mut all = Vec::new();

    loop {
        let page = api.list_reservations(&query).await?;
        let more = page.has_more(query.page);
        all.extend(page.items);

        if !more {
            break;
        }
        if query.page >= MAX_PAGES {
            warn!("Stopped listing reservations after {} pages", MAX_PAGES);
            break;
        }
        query.page += 1;
    }

    Ok(all)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MockKennelApi;
    use kennel_core::ResourceType;

    fn kennels(n: usize) -> Vec<Resource> {
        (1..=n)
            .map(|i| Resource::new(format!("r{}", i), format!("A{:02}", i), ResourceType::StandardSuite))
            .collect()
    }

    #[tokio::test]
    async fn test_list_all_resources_walks_pages() {
        let api = MockKennelApi::new().with_resources(kennels(7));
        let query = ResourceQuery::default().with_limit(3);

        let all = list_all_resources(&api, &query).await.unwrap();

        assert_eq!(all.len(), 7);
        assert_eq!(api.call_count("list_resources"), 3);
    }

    #[tokio::test]
    async fn test_list_all_resources_propagates_errors() {
        let api = MockKennelApi::new().failing_resources("connection refused");
        let result = list_all_resources(&api, &ResourceQuery::default()).await;
        assert!(result.is_err());
    }
}
