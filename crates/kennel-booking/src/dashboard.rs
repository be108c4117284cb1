//! Dashboard check-in / check-out / overnight classification
//!
//! All date comparisons use the tenant's configured IANA timezone, daylight
//! saving included. A stay stamped 02:00 UTC belongs to the previous day for
//! a facility in Denver, and that is the day staff expect it on.

use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use kennel_client::{list_all_reservations, KennelApi, ReservationQuery};
use kennel_core::fail_open::fail_open_or_else;
use kennel_core::Reservation;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};

/// How one reservation relates to the reference day
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DayClassification {
    pub check_in: bool,
    pub check_out: bool,
    pub overnight: bool,
}

/// Classify `reservation` against `day` in the tenant's timezone
///
/// - check-in: starts on `day`
/// - check-out: ends on `day`
/// - overnight: started before `day` and ends on or after it
///
/// The three flags are independent, so a same-day stay is both a check-in
/// and a check-out but never overnight.
pub fn classify(reservation: &Reservation, day: NaiveDate, tz: &Tz) -> DayClassification {
    let start = reservation.local_start_date(tz);
    let end = reservation.local_end_date(tz);
    DayClassification {
        check_in: start == day,
        check_out: end == day,
        overnight: start < day && end >= day,
    }
}

/// Today's date for the tenant
pub fn tenant_today(tz: &Tz) -> NaiveDate {
    Utc::now().with_timezone(tz).date_naive()
}

/// Which reservations the dashboard list shows
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DashboardFilter {
    /// Check-ins and check-outs, each reservation once
    #[default]
    All,
    CheckIns,
    CheckOuts,
    Overnight,
}

impl std::str::FromStr for DashboardFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "all" => Ok(Self::All),
            "check-ins" | "checkins" | "check-in" | "in" => Ok(Self::CheckIns),
            "check-outs" | "checkouts" | "check-out" | "out" => Ok(Self::CheckOuts),
            "overnight" | "overnights" => Ok(Self::Overnight),
            _ => Err(format!("Invalid dashboard filter: {}", s)),
        }
    }
}

/// Metrics for one reference day, as reservation ids
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardMetrics {
    pub date: Option<NaiveDate>,
    pub check_ins: Vec<String>,
    pub check_outs: Vec<String>,
    pub overnight: Vec<String>,
    /// Union of check-ins and check-outs
    pub all: Vec<String>,
}

impl DashboardMetrics {
    pub fn ids(&self, filter: DashboardFilter) -> &[String] {
        match filter {
            DashboardFilter::All => &self.all,
            DashboardFilter::CheckIns => &self.check_ins,
            DashboardFilter::CheckOuts => &self.check_outs,
            DashboardFilter::Overnight => &self.overnight,
        }
    }

    pub fn count(&self, filter: DashboardFilter) -> usize {
        self.ids(filter).len()
    }
}

/// Bucket active reservations for `day`
///
/// Reservations that are not active (checked out, cancelled, ...) are ignored.
pub fn compute_metrics(
    reservations: &[Reservation],
    day: NaiveDate,
    tz: &Tz,
) -> DashboardMetrics {
    let mut metrics = DashboardMetrics {
        date: Some(day),
        ..Default::default()
    };
    let mut in_all = HashSet::new();

    for reservation in reservations.iter().filter(|r| r.status.is_active()) {
        let class = classify(reservation, day, tz);
        if class.check_in {
            metrics.check_ins.push(reservation.id.clone());
        }
        if class.check_out {
            metrics.check_outs.push(reservation.id.clone());
        }
        if class.overnight {
            metrics.overnight.push(reservation.id.clone());
        }
        if (class.check_in || class.check_out) && in_all.insert(reservation.id.as_str()) {
            metrics.all.push(reservation.id.clone());
        }
    }

    metrics
}

/// Dashboard state: active reservations fetched once, re-bucketed per date
pub struct DashboardData<A: KennelApi + ?Sized> {
    api: Arc<A>,
    tz: Tz,
    page_limit: u32,
    date: NaiveDate,
    reservations: Vec<Reservation>,
    metrics: DashboardMetrics,
    last_error: Option<String>,
    loaded: bool,
}

impl<A: KennelApi + ?Sized> DashboardData<A> {
    pub fn new(api: Arc<A>, tz: Tz, date: NaiveDate) -> Self {
        Self {
            api,
            tz,
            page_limit: 100,
            date,
            reservations: Vec::new(),
            metrics: DashboardMetrics {
                date: Some(date),
                ..Default::default()
            },
            last_error: None,
            loaded: false,
        }
    }

    pub fn with_page_limit(mut self, page_limit: u32) -> Self {
        self.page_limit = page_limit.max(1);
        self
    }

    /// Fetch active reservations and recompute metrics
    ///
    /// A failed fetch leaves an empty list and a user-facing message.
    pub async fn load(&mut self) {
        let query = ReservationQuery::active().with_limit(self.page_limit);
        let api = self.api.clone();
        let fetched = fail_open_or_else("dashboard_reservations", Vec::new, || async move {
            list_all_reservations(api.as_ref(), &query).await
        })
        .await;

        let (reservations, last_error) = match fetched {
            Ok((reservations, degraded)) => (
                reservations,
                degraded.then(|| {
                    "Reservations could not be loaded. Counts may be incomplete.".to_string()
                }),
            ),
            Err(e) => {
                warn!("Dashboard reservations rejected: {}", e);
                (Vec::new(), Some(e.user_message()))
            }
        };
        self.reservations = reservations;
        self.last_error = last_error;
        self.loaded = true;
        self.recompute();
        info!(
            "Dashboard for {}: {} check-ins, {} check-outs, {} overnight",
            self.date,
            self.metrics.check_ins.len(),
            self.metrics.check_outs.len(),
            self.metrics.overnight.len()
        );
    }

    /// Change the reference day without refetching
    pub fn set_date(&mut self, date: NaiveDate) {
        self.date = date;
        self.recompute();
    }

    fn recompute(&mut self) {
        self.metrics = compute_metrics(&self.reservations, self.date, &self.tz);
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn metrics(&self) -> &DashboardMetrics {
        &self.metrics
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Reservations shown under `filter`, in metrics order
    pub fn reservations_for(&self, filter: DashboardFilter) -> Vec<&Reservation> {
        self.metrics
            .ids(filter)
            .iter()
            .filter_map(|id| self.reservations.iter().find(|r| &r.id == id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{reservation, utc};
    use kennel_client::MockKennelApi;
    use kennel_core::ReservationStatus;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 4, d).unwrap()
    }

    #[test]
    fn test_same_day_is_check_in_and_check_out() {
        let r = reservation(
            "same",
            "2025-04-10T08:00:00Z",
            "2025-04-10T17:00:00Z",
            ReservationStatus::Confirmed,
        );
        let class = classify(&r, date(10), &utc());
        assert!(class.check_in);
        assert!(class.check_out);
        assert!(!class.overnight);

        let metrics = compute_metrics(&[r], date(10), &utc());
        assert_eq!(metrics.check_ins, vec!["same".to_string()]);
        assert_eq!(metrics.check_outs, vec!["same".to_string()]);
        assert_eq!(metrics.all, vec!["same".to_string()]);
    }

    #[test]
    fn test_spanning_stay_is_overnight_only() {
        let r = reservation(
            "span",
            "2025-04-09T15:00:00Z",
            "2025-04-11T10:00:00Z",
            ReservationStatus::CheckedIn,
        );
        assert_eq!(
            classify(&r, date(10), &utc()),
            DayClassification {
                check_in: false,
                check_out: false,
                overnight: true
            }
        );
    }

    #[test]
    fn test_departure_day_counts_as_overnight_and_check_out() {
        let r = reservation(
            "leaving",
            "2025-04-09T15:00:00Z",
            "2025-04-10T10:00:00Z",
            ReservationStatus::CheckedIn,
        );
        let class = classify(&r, date(10), &utc());
        assert!(class.check_out);
        assert!(class.overnight);
        assert!(!class.check_in);
    }

    #[test]
    fn test_tenant_timezone_moves_midnight_stays() {
        // 01:30 UTC on the 11th is the evening of the 10th in Chicago
        let r = reservation(
            "late",
            "2025-04-11T01:30:00Z",
            "2025-04-13T16:00:00Z",
            ReservationStatus::Pending,
        );
        let central = chrono_tz::America::Chicago;
        assert!(classify(&r, date(10), &central).check_in);
        assert!(!classify(&r, date(10), &utc()).check_in);
        assert!(classify(&r, date(11), &utc()).check_in);
    }

    #[test]
    fn test_daylight_saving_shifts_check_in_day() {
        let denver = chrono_tz::America::Denver;
        let july = |d: u32| NaiveDate::from_ymd_opt(2025, 7, d).unwrap();
        let january = |d: u32| NaiveDate::from_ymd_opt(2025, 1, d).unwrap();

        // 00:30 MDT on Jul 10
        let summer = reservation(
            "summer",
            "2025-07-10T06:30:00Z",
            "2025-07-12T16:00:00Z",
            ReservationStatus::Confirmed,
        );
        assert!(classify(&summer, july(10), &denver).check_in);
        assert!(!classify(&summer, july(9), &denver).check_in);

        // 23:30 MST on Jan 9
        let winter = reservation(
            "winter",
            "2025-01-10T06:30:00Z",
            "2025-01-12T16:00:00Z",
            ReservationStatus::Confirmed,
        );
        assert!(classify(&winter, january(9), &denver).check_in);
        assert!(!classify(&winter, january(10), &denver).check_in);
    }

    #[test]
    fn test_all_is_union_without_duplicates() {
        let reservations = vec![
            reservation("in", "2025-04-10T09:00:00Z", "2025-04-12T09:00:00Z", ReservationStatus::Confirmed),
            reservation("out", "2025-04-08T09:00:00Z", "2025-04-10T09:00:00Z", ReservationStatus::CheckedIn),
            reservation("both", "2025-04-10T07:00:00Z", "2025-04-10T18:00:00Z", ReservationStatus::Pending),
            reservation("stay", "2025-04-09T07:00:00Z", "2025-04-12T18:00:00Z", ReservationStatus::CheckedIn),
        ];

        let metrics = compute_metrics(&reservations, date(10), &utc());

        assert_eq!(metrics.count(DashboardFilter::CheckIns), 2);
        assert_eq!(metrics.count(DashboardFilter::CheckOuts), 2);
        assert_eq!(metrics.all, vec!["in", "out", "both"]);
        assert_eq!(metrics.overnight, vec!["out", "stay"]);
    }

    #[test]
    fn test_inactive_reservations_ignored() {
        let reservations = vec![
            reservation("gone", "2025-04-10T09:00:00Z", "2025-04-11T09:00:00Z", ReservationStatus::Cancelled),
            reservation("done", "2025-04-09T09:00:00Z", "2025-04-10T09:00:00Z", ReservationStatus::CheckedOut),
        ];
        let metrics = compute_metrics(&reservations, date(10), &utc());
        assert!(metrics.all.is_empty());
        assert!(metrics.overnight.is_empty());
    }

    #[test]
    fn test_filter_parsing() {
        assert_eq!("check-ins".parse::<DashboardFilter>(), Ok(DashboardFilter::CheckIns));
        assert_eq!("OVERNIGHT".parse::<DashboardFilter>(), Ok(DashboardFilter::Overnight));
        assert!("tomorrow".parse::<DashboardFilter>().is_err());
    }

    #[tokio::test]
    async fn test_dashboard_fetches_once_and_rebuckets() {
        let api = Arc::new(MockKennelApi::new().with_reservations(vec![
            reservation("r1", "2025-04-10T09:00:00Z", "2025-04-12T09:00:00Z", ReservationStatus::Confirmed),
            reservation("r2", "2025-04-12T09:00:00Z", "2025-04-13T09:00:00Z", ReservationStatus::Pending),
        ]));
        let mut dashboard = DashboardData::new(api.clone(), utc(), date(10));

        dashboard.load().await;
        assert_eq!(dashboard.metrics().check_ins, vec!["r1".to_string()]);

        dashboard.set_date(date(12));
        assert_eq!(dashboard.metrics().check_ins, vec!["r2".to_string()]);
        assert_eq!(dashboard.metrics().check_outs, vec!["r1".to_string()]);
        assert_eq!(dashboard.reservations_for(DashboardFilter::All).len(), 2);
        assert_eq!(api.call_count("list_reservations"), 1);
    }

    #[tokio::test]
    async fn test_dashboard_fetch_failure_is_contained() {
        let api = Arc::new(MockKennelApi::new().failing_reservations("timeout"));
        let mut dashboard = DashboardData::new(api, utc(), date(10));

        dashboard.load().await;

        assert!(dashboard.is_loaded());
        assert!(dashboard.last_error().is_some());
        assert_eq!(dashboard.metrics().count(DashboardFilter::All), 0);
    }

    #[tokio::test]
    async fn test_dashboard_expired_session_is_reported() {
        let api = Arc::new(MockKennelApi::new().unauthorized_reservations("jwt expired"));
        let mut dashboard = DashboardData::new(api, utc(), date(10));

        dashboard.load().await;

        assert_eq!(
            dashboard.last_error(),
            Some("Your session has expired. Please sign in again.")
        );
        assert_eq!(dashboard.metrics().count(DashboardFilter::All), 0);
    }
}
