//! Builders shared by unit tests

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use kennel_core::{Reservation, ReservationStatus, Resource, ResourceType};

pub fn utc() -> Tz {
    Tz::UTC
}

pub fn at(rfc3339: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(rfc3339)
        .unwrap()
        .with_timezone(&Utc)
}

pub fn reservation(id: &str, start: &str, end: &str, status: ReservationStatus) -> Reservation {
    Reservation {
        id: id.to_string(),
        pet_id: format!("pet-{}", id),
        customer_id: "cust-1".to_string(),
        service_id: "svc-boarding".to_string(),
        resource_id: None,
        start_date: at(start),
        end_date: at(end),
        status,
        external_id: None,
        created_at: None,
        pet: None,
        customer: None,
        service: None,
        resource: None,
    }
}

pub fn kennel(id: &str, name: &str) -> Resource {
    Resource::new(id, name, ResourceType::StandardSuite)
}

/// Kennels `A01..A{n}` with ids equal to their names
pub fn row_a(n: usize) -> Vec<Resource> {
    (1..=n)
        .map(|i| {
            let name = format!("A{:02}", i);
            kennel(&name, &name)
        })
        .collect()
}
