//! Response envelope
//!
//! The backend wraps every payload as
//! `{"status": "...", "data": <payload>, "pagination": {...}}`. Decoding goes
//! through `decode_envelope` only.

use kennel_core::{KennelError, Reservation, Resource, ResourceAvailability, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Standard response wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiEnvelope<T> {
    #[serde(default)]
    pub status: Option<String>,
    pub data: T,
    #[serde(default)]
    pub pagination: Option<Pagination>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Paging metadata attached to list responses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub limit: u32,
    #[serde(default)]
    pub total_count: u64,
    #[serde(default)]
    pub total_pages: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceList {
    pub resources: Vec<Resource>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservationList {
    pub reservations: Vec<Reservation>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchAvailability {
    pub resources: Vec<ResourceAvailability>,
}

/// Error body returned with non-2xx statuses
#[derive(Debug, Clone, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// One page of a list endpoint
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub pagination: Option<Pagination>,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, pagination: Option<Pagination>) -> Self {
        Self { items, pagination }
    }

    /// Whether a page after `page` exists
    pub fn has_more(&self, page: u32) -> bool {
        match self.pagination {
            Some(p) => !self.items.is_empty() && page < p.total_pages,
            None => false,
        }
    }
}

/// Decode a response body into the standard envelope
pub fn decode_envelope<T: DeserializeOwned>(body: &[u8]) -> Result<ApiEnvelope<T>> {
    serde_json::from_slice(body).map_err(|e| KennelError::Decode(e.to_string()))
}

/// Extract the server's message from an error body, if it has one
pub fn error_message(body: &[u8]) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_slice(body).ok()?;
    parsed
        .message
        .or(parsed.error)
        .filter(|m| !m.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_reservation_list() {
        let body = br#"{
            "status": "success",
            "data": {"reservations": [{
                "id": "r1",
                "startDate": "2025-05-01T14:00:00Z",
                "endDate": "2025-05-03T10:00:00Z",
                "status": "CONFIRMED"
            }]},
            "pagination": {"page": 1, "limit": 50, "totalCount": 1, "totalPages": 1}
        }"#;
        let envelope: ApiEnvelope<ReservationList> = decode_envelope(body).unwrap();
        assert_eq!(envelope.data.reservations.len(), 1);
        assert_eq!(envelope.pagination.unwrap().total_count, 1);
    }

    #[test]
    fn test_shape_mismatch_is_decode_error() {
        // Array at the top level instead of the envelope
        let body = br#"[{"id": "r1"}]"#;
        let result: Result<ApiEnvelope<ReservationList>> = decode_envelope(body);
        assert!(matches!(result, Err(KennelError::Decode(_))));

        // Payload under a different key
        let body = br#"{"data": {"data": []}}"#;
        let result: Result<ApiEnvelope<ReservationList>> = decode_envelope(body);
        assert!(matches!(result, Err(KennelError::Decode(_))));
    }

    #[test]
    fn test_error_message_extraction() {
        assert_eq!(
            error_message(br#"{"status": "error", "message": "Kennel already booked"}"#),
            Some("Kennel already booked".to_string())
        );
        assert_eq!(
            error_message(br#"{"error": "Invalid date range"}"#),
            Some("Invalid date range".to_string())
        );
        assert_eq!(error_message(b"<html>Bad Gateway</html>"), None);
    }

    #[test]
    fn test_page_has_more() {
        let pagination = Pagination {
            page: 1,
            limit: 2,
            total_count: 3,
            total_pages: 2,
        };
        let page = Page::new(vec![1, 2], Some(pagination));
        assert!(page.has_more(1));
        assert!(!page.has_more(2));
        assert!(!Page::<i32>::new(vec![], Some(pagination)).has_more(1));
        assert!(!Page::new(vec![1], None).has_more(1));
    }
}
