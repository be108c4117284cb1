//! Request types for the booking backend

use chrono::{DateTime, NaiveDate, Utc};
use kennel_core::{DateRange, ReservationStatus, ResourceType};
use serde::{Deserialize, Serialize};

/// Sort direction for list endpoints
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// `GET /api/resources` parameters
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceQuery {
    pub resource_type: Option<ResourceType>,
    pub page: u32,
    pub limit: u32,
    pub sort_by: Option<String>,
    pub sort_order: SortOrder,
}

impl Default for ResourceQuery {
    fn default() -> Self {
        Self {
            resource_type: None,
            page: 1,
            limit: 100,
            sort_by: Some("name".to_string()),
            sort_order: SortOrder::Asc,
        }
    }
}

impl ResourceQuery {
    pub fn of_type(resource_type: Option<ResourceType>) -> Self {
        Self {
            resource_type,
            ..Self::default()
        }
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("page", self.page.to_string()),
            ("limit", self.limit.to_string()),
            ("sortOrder", self.sort_order.as_str().to_string()),
        ];
        if let Some(resource_type) = self.resource_type {
            pairs.push(("type", resource_type.to_string()));
        }
        if let Some(sort_by) = &self.sort_by {
            pairs.push(("sortBy", sort_by.clone()));
        }
        pairs
    }
}

/// `GET /api/reservations` parameters
#[derive(Debug, Clone, PartialEq)]
pub struct ReservationQuery {
    /// Empty means every status
    pub statuses: Vec<ReservationStatus>,
    pub page: u32,
    pub limit: u32,
    pub sort_by: Option<String>,
    pub sort_order: SortOrder,
    pub range: Option<DateRange>,
}

impl Default for ReservationQuery {
    fn default() -> Self {
        Self {
            statuses: Vec::new(),
            page: 1,
            limit: 100,
            sort_by: Some("startDate".to_string()),
            sort_order: SortOrder::Asc,
            range: None,
        }
    }
}

impl ReservationQuery {
    /// Reservations the operations dashboard tracks
    pub fn active() -> Self {
        Self {
            statuses: ReservationStatus::ACTIVE.to_vec(),
            ..Self::default()
        }
    }

    /// Most recently created first
    pub fn recent(limit: u32) -> Self {
        Self {
            limit,
            sort_by: Some("createdAt".to_string()),
            sort_order: SortOrder::Desc,
            ..Self::default()
        }
    }

    pub fn within(mut self, range: DateRange) -> Self {
        self.range = Some(range);
        self
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("page", self.page.to_string()),
            ("limit", self.limit.to_string()),
            ("sortOrder", self.sort_order.as_str().to_string()),
        ];
        if !self.statuses.is_empty() {
            let statuses: Vec<&str> = self.statuses.iter().map(|s| s.as_str()).collect();
            pairs.push(("status", statuses.join(",")));
        }
        if let Some(sort_by) = &self.sort_by {
            pairs.push(("sortBy", sort_by.clone()));
        }
        if let Some(range) = &self.range {
            pairs.push(("startDate", range.start_date.to_string()));
            pairs.push(("endDate", range.end_date.to_string()));
        }
        pairs
    }
}

/// `POST /api/resources/availability/batch` body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchAvailabilityRequest {
    pub resource_ids: Vec<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl BatchAvailabilityRequest {
    pub fn new(resource_ids: Vec<String>, range: DateRange) -> Self {
        Self {
            resource_ids,
            start_date: range.start_date,
            end_date: range.end_date,
        }
    }
}

/// `POST /api/reservations` body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReservation {
    pub customer_id: String,
    pub pet_id: String,
    pub service_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ReservationStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// `PUT /api/reservations/{id}` body; unset fields are left unchanged
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ReservationStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reservation_query_pairs() {
        let range = DateRange::new(
            NaiveDate::from_ymd_opt(2025, 2, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 2, 7).unwrap(),
        )
        .unwrap();
        let pairs = ReservationQuery::active().within(range).to_query_pairs();
        assert!(pairs.contains(&("status", "PENDING,CONFIRMED,CHECKED_IN".to_string())));
        assert!(pairs.contains(&("startDate", "2025-02-01".to_string())));
        assert!(pairs.contains(&("endDate", "2025-02-07".to_string())));
    }

    #[test]
    fn test_resource_query_pairs() {
        let pairs = ResourceQuery::of_type(Some(ResourceType::VipSuite))
            .with_limit(25)
            .to_query_pairs();
        assert!(pairs.contains(&("type", "VIP_SUITE".to_string())));
        assert!(pairs.contains(&("limit", "25".to_string())));
    }

    #[test]
    fn test_batch_request_wire_shape() {
        let range = DateRange::day(NaiveDate::from_ymd_opt(2025, 2, 1).unwrap());
        let request = BatchAvailabilityRequest::new(vec!["r1".into()], range);
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "resourceIds": ["r1"],
                "startDate": "2025-02-01",
                "endDate": "2025-02-01"
            })
        );
    }

    #[test]
    fn test_update_omits_unset_fields() {
        let update = ReservationUpdate {
            status: Some(ReservationStatus::CheckedIn),
            ..Default::default()
        };
        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(json, serde_json::json!({"status": "CHECKED_IN"}));
    }
}
