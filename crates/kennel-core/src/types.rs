//! Core type definitions for kennel booking

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::validation::ValidationErrors;
use crate::{KennelError, Result};

/// Kind of bookable suite
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResourceType {
    StandardSuite,
    StandardPlusSuite,
    VipSuite,
}

impl ResourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StandardSuite => "STANDARD_SUITE",
            Self::StandardPlusSuite => "STANDARD_PLUS_SUITE",
            Self::VipSuite => "VIP_SUITE",
        }
    }
}

impl std::fmt::Display for ResourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ResourceType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_uppercase().replace('-', "_").as_str() {
            "STANDARD_SUITE" | "STANDARD" => Ok(Self::StandardSuite),
            "STANDARD_PLUS_SUITE" | "STANDARD_PLUS" => Ok(Self::StandardPlusSuite),
            "VIP_SUITE" | "VIP" => Ok(Self::VipSuite),
            _ => Err(format!("Invalid resource type: {}", s)),
        }
    }
}

/// A bookable unit of capacity (kennel, suite)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub id: String,
    pub name: String,
    /// Suite number shown on the calendar, e.g. `A01`
    #[serde(default)]
    pub suite_number: Option<String>,
    #[serde(rename = "type")]
    pub resource_type: ResourceType,
}

impl Resource {
    pub fn new(id: impl Into<String>, name: impl Into<String>, resource_type: ResourceType) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            suite_number: None,
            resource_type,
        }
    }

    /// Name used for display and ordering
    pub fn display_name(&self) -> &str {
        self.suite_number.as_deref().unwrap_or(&self.name)
    }
}

/// Reservation lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReservationStatus {
    Pending,
    Confirmed,
    CheckedIn,
    CheckedOut,
    Completed,
    Cancelled,
    NoShow,
}

impl ReservationStatus {
    /// Statuses the operations dashboard treats as live
    pub const ACTIVE: [ReservationStatus; 3] = [Self::Pending, Self::Confirmed, Self::CheckedIn];

    pub fn is_active(&self) -> bool {
        Self::ACTIVE.contains(self)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Confirmed => "CONFIRMED",
            Self::CheckedIn => "CHECKED_IN",
            Self::CheckedOut => "CHECKED_OUT",
            Self::Completed => "COMPLETED",
            Self::Cancelled => "CANCELLED",
            Self::NoShow => "NO_SHOW",
        }
    }
}

impl std::fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ReservationStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_uppercase().replace('-', "_").as_str() {
            "PENDING" => Ok(Self::Pending),
            "CONFIRMED" => Ok(Self::Confirmed),
            "CHECKED_IN" => Ok(Self::CheckedIn),
            "CHECKED_OUT" => Ok(Self::CheckedOut),
            "COMPLETED" => Ok(Self::Completed),
            "CANCELLED" | "CANCELED" => Ok(Self::Cancelled),
            "NO_SHOW" => Ok(Self::NoShow),
            _ => Err(format!("Invalid reservation status: {}", s)),
        }
    }
}

/// Service category of the booked service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServiceCategory {
    Boarding,
    Daycare,
    Grooming,
    Training,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PetRef {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerRef {
    pub id: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceRef {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub service_category: Option<ServiceCategory>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRef {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// A booked stay for one pet against one resource and one service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    pub id: String,
    #[serde(default)]
    pub pet_id: String,
    #[serde(default)]
    pub customer_id: String,
    #[serde(default)]
    pub service_id: String,
    #[serde(default)]
    pub resource_id: Option<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub status: ReservationStatus,
    /// Id in the system the reservation was imported from
    #[serde(default)]
    pub external_id: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub pet: Option<PetRef>,
    #[serde(default)]
    pub customer: Option<CustomerRef>,
    #[serde(default)]
    pub service: Option<ServiceRef>,
    #[serde(default)]
    pub resource: Option<ResourceRef>,
}

impl Reservation {
    /// Calendar date the stay starts on, as seen in the tenant's timezone
    pub fn local_start_date(&self, tz: &Tz) -> NaiveDate {
        self.start_date.with_timezone(tz).date_naive()
    }

    /// Calendar date the stay ends on, as seen in the tenant's timezone
    pub fn local_end_date(&self, tz: &Tz) -> NaiveDate {
        self.end_date.with_timezone(tz).date_naive()
    }

    /// Whether the reservation came from a migrated system
    pub fn is_imported(&self) -> bool {
        self.external_id.as_deref().is_some_and(|id| !id.is_empty())
    }

    pub fn pet_name(&self) -> Option<&str> {
        self.pet.as_ref().and_then(|p| p.name.as_deref())
    }

    /// Resource id from the flat field or the embedded resource
    pub fn assigned_resource_id(&self) -> Option<&str> {
        self.resource_id
            .as_deref()
            .or_else(|| self.resource.as_ref().map(|r| r.id.as_str()))
            .filter(|id| !id.is_empty())
    }

    pub fn resource_name(&self) -> Option<&str> {
        self.resource.as_ref().and_then(|r| r.name.as_deref())
    }

    pub fn service_category(&self) -> Option<ServiceCategory> {
        self.service.as_ref().and_then(|s| s.service_category)
    }

    /// First eight characters of the id, for log lines and reports
    pub fn short_id(&self) -> String {
        self.id.chars().take(8).collect()
    }
}

/// Inclusive range of calendar dates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawDateRange")]
pub struct DateRange {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl DateRange {
    /// Create a range; the end date may equal but not precede the start
    pub fn new(start_date: NaiveDate, end_date: NaiveDate) -> Result<Self> {
        if end_date < start_date {
            let mut errors = ValidationErrors::new();
            errors.add(
                "endDate",
                format!("End date {} is before start date {}", end_date, start_date),
            );
            return Err(KennelError::Validation(errors));
        }
        Ok(Self {
            start_date,
            end_date,
        })
    }

    /// Single-day range
    pub fn day(date: NaiveDate) -> Self {
        Self {
            start_date: date,
            end_date: date,
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }

    /// Every date in the range, in order
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end_date;
        self.start_date.iter_days().take_while(move |d| *d <= end)
    }

    pub fn num_days(&self) -> i64 {
        (self.end_date - self.start_date).num_days() + 1
    }
}

/// Unchecked wire form of `DateRange`
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDateRange {
    start_date: NaiveDate,
    end_date: NaiveDate,
}

impl TryFrom<RawDateRange> for DateRange {
    type Error = KennelError;

    fn try_from(raw: RawDateRange) -> Result<Self> {
        Self::new(raw.start_date, raw.end_date)
    }
}

impl std::fmt::Display for DateRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..={}", self.start_date, self.end_date)
    }
}

/// Availability of one resource over a date range
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceAvailability {
    pub resource_id: String,
    pub is_available: bool,
    #[serde(default)]
    pub occupying_reservations: Vec<Reservation>,
}

impl ResourceAvailability {
    /// Entry for a resource with no known conflicts
    pub fn available(resource_id: impl Into<String>) -> Self {
        Self {
            resource_id: resource_id.into(),
            is_available: true,
            occupying_reservations: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reservation_decodes_backend_shape() {
        let json = r#"{
            "id": "5f0c2a9e-1111-2222-3333-444455556666",
            "petId": "pet-1",
            "customerId": "cust-1",
            "serviceId": "svc-1",
            "resourceId": "res-1",
            "startDate": "2025-03-10T15:00:00.000Z",
            "endDate": "2025-03-12T17:00:00.000Z",
            "status": "CHECKED_IN",
            "service": {"id": "svc-1", "name": "Boarding", "serviceCategory": "BOARDING"},
            "resource": {"id": "res-1", "name": "A01"}
        }"#;
        let reservation: Reservation = serde_json::from_str(json).unwrap();
        assert_eq!(reservation.status, ReservationStatus::CheckedIn);
        assert_eq!(reservation.assigned_resource_id(), Some("res-1"));
        assert_eq!(reservation.resource_name(), Some("A01"));
        assert_eq!(reservation.service_category(), Some(ServiceCategory::Boarding));
        assert_eq!(reservation.short_id(), "5f0c2a9e");
    }

    #[test]
    fn test_unknown_service_category() {
        let service: ServiceRef =
            serde_json::from_str(r#"{"id": "s", "serviceCategory": "HYDROTHERAPY"}"#).unwrap();
        assert_eq!(service.service_category, Some(ServiceCategory::Other));
    }

    #[test]
    fn test_local_dates_follow_timezone() {
        let reservation = Reservation {
            id: "r1".into(),
            pet_id: "p".into(),
            customer_id: "c".into(),
            service_id: "s".into(),
            resource_id: None,
            start_date: "2025-03-10T02:30:00Z".parse().unwrap(),
            end_date: "2025-03-11T02:30:00Z".parse().unwrap(),
            status: ReservationStatus::Confirmed,
            external_id: None,
            created_at: None,
            pet: None,
            customer: None,
            service: None,
            resource: None,
        };
        assert_eq!(
            reservation.local_start_date(&Tz::America__Denver),
            NaiveDate::from_ymd_opt(2025, 3, 9).unwrap()
        );
        assert_eq!(
            reservation.local_start_date(&Tz::UTC),
            NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
        );
    }

    #[test]
    fn test_local_dates_follow_daylight_saving() {
        // 00:30 MDT (UTC-6) on July 10; a fixed UTC-7 offset would say July 9
        let start = "2025-07-10T06:30:00Z".parse::<DateTime<Utc>>().unwrap();
        assert_eq!(
            start.with_timezone(&Tz::America__Denver).date_naive(),
            NaiveDate::from_ymd_opt(2025, 7, 10).unwrap()
        );
        // The same UTC time in winter (MST, UTC-7) falls on the previous day
        let winter = "2025-01-10T06:30:00Z".parse::<DateTime<Utc>>().unwrap();
        assert_eq!(
            winter.with_timezone(&Tz::America__Denver).date_naive(),
            NaiveDate::from_ymd_opt(2025, 1, 9).unwrap()
        );
    }

    #[test]
    fn test_imported_fields_decode() {
        let json = r#"{
            "id": "r9",
            "startDate": "2025-03-10T15:00:00Z",
            "endDate": "2025-03-12T17:00:00Z",
            "status": "CONFIRMED",
            "externalId": "gingr-4411",
            "createdAt": "2025-02-01T08:15:00Z",
            "pet": {"id": "p1", "name": "Biscuit"}
        }"#;
        let reservation: Reservation = serde_json::from_str(json).unwrap();
        assert!(reservation.is_imported());
        assert_eq!(reservation.pet_name(), Some("Biscuit"));
        assert!(reservation.created_at.is_some());
    }

    #[test]
    fn test_reversed_date_range_rejected_on_decode() {
        let result: std::result::Result<DateRange, _> =
            serde_json::from_str(r#"{"startDate": "2025-06-05", "endDate": "2025-06-01"}"#);
        assert!(result.is_err());
        let ok: DateRange =
            serde_json::from_str(r#"{"startDate": "2025-06-01", "endDate": "2025-06-05"}"#).unwrap();
        assert_eq!(ok.num_days(), 5);
    }

    #[test]
    fn test_date_range_validation() {
        let a = NaiveDate::from_ymd_opt(2025, 1, 5).unwrap();
        let b = NaiveDate::from_ymd_opt(2025, 1, 7).unwrap();
        let range = DateRange::new(a, b).unwrap();
        assert_eq!(range.num_days(), 3);
        assert_eq!(range.days().count(), 3);
        assert!(range.contains(b));
        assert!(matches!(DateRange::new(b, a), Err(KennelError::Validation(_))));
    }

    #[test]
    fn test_date_range_serializes_as_calendar_dates() {
        let range = DateRange::day(NaiveDate::from_ymd_opt(2025, 6, 1).unwrap());
        let json = serde_json::to_value(range).unwrap();
        assert_eq!(json["startDate"], "2025-06-01");
        assert_eq!(json["endDate"], "2025-06-01");
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!("checked_in".parse::<ReservationStatus>(), Ok(ReservationStatus::CheckedIn));
        assert!(ReservationStatus::Pending.is_active());
        assert!(!ReservationStatus::CheckedOut.is_active());
        assert_eq!("vip".parse::<ResourceType>(), Ok(ResourceType::VipSuite));
    }
}
