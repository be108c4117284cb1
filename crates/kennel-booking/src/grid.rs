//! Kennel grid state
//!
//! Owns the {kennel, availability} view for the visible date window. Every
//! window or filter change triggers a full load that replaces the previous
//! rows wholesale.
//!
//! Loads are tagged with a sequence number. Only the most recently issued
//! load may write state, so a slow response for an old window can never
//! overwrite a newer one. After `cancel` no load writes state at all.
//!
//! A transient backend failure leaves a usable (possibly degraded) grid. A
//! backend verdict such as an expired session leaves an empty grid carrying
//! the error message.

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use kennel_client::{list_all_resources, KennelApi, ResourceQuery};
use kennel_core::{sort_resources, DateRange, KennelError, Reservation, Resource, ResourceType};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::availability::{occupies_day, reconcile};

const DEGRADED_MESSAGE: &str =
    "Live availability could not be loaded. All kennels are shown as available.";

/// Date window and filter the grid is showing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridWindow {
    pub range: DateRange,
    pub resource_type: Option<ResourceType>,
}

impl GridWindow {
    pub fn new(range: DateRange, resource_type: Option<ResourceType>) -> Self {
        Self {
            range,
            resource_type,
        }
    }
}

/// What a single grid cell shows
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellState {
    Free,
    Occupied { reservation_ids: Vec<String> },
}

/// One kennel with its availability for the window
#[derive(Debug, Clone, PartialEq)]
pub struct KennelRow {
    pub resource: Resource,
    pub is_available: bool,
    pub occupying_reservations: Vec<Reservation>,
}

impl KennelRow {
    /// Unavailable kennels render disabled
    pub fn is_selectable(&self) -> bool {
        self.is_available
    }

    pub fn cell(&self, day: NaiveDate, tz: &Tz) -> CellState {
        let reservation_ids: Vec<String> = self
            .occupying_reservations
            .iter()
            .filter(|r| occupies_day(r, day, tz))
            .map(|r| r.id.clone())
            .collect();

        if reservation_ids.is_empty() {
            CellState::Free
        } else {
            CellState::Occupied { reservation_ids }
        }
    }
}

/// Snapshot of the grid
#[derive(Debug, Clone, Default)]
pub struct GridState {
    pub window: Option<GridWindow>,
    /// Rows in kennel-name order
    pub rows: Vec<KennelRow>,
    pub loading: bool,
    /// Availability is the all-available fallback
    pub degraded: bool,
    /// User-facing message for the last load
    pub last_error: Option<String>,
    pub loaded_at: Option<DateTime<Utc>>,
}

impl GridState {
    pub fn is_loaded(&self) -> bool {
        self.loaded_at.is_some() && !self.loading
    }

    pub fn row(&self, resource_id: &str) -> Option<&KennelRow> {
        self.rows.iter().find(|r| r.resource.id == resource_id)
    }

    /// Selectable kennels, in kennel-name order
    pub fn available_resources(&self) -> Vec<Resource> {
        self.rows
            .iter()
            .filter(|r| r.is_selectable())
            .map(|r| r.resource.clone())
            .collect()
    }

    /// Kennels held by committed reservations
    pub fn occupied_ids(&self) -> HashSet<String> {
        self.rows
            .iter()
            .filter(|r| !r.is_selectable())
            .map(|r| r.resource.id.clone())
            .collect()
    }
}

/// Result of a `KennelGrid::load`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The load replaced the grid state
    Applied,
    /// A newer load was issued; this response was discarded
    Stale,
    /// The grid was cancelled; nothing was written
    Cancelled,
}

/// Kennel calendar state container
pub struct KennelGrid<A: KennelApi + ?Sized> {
    api: Arc<A>,
    tz: Tz,
    page_limit: u32,
    sequence: AtomicU64,
    cancelled: AtomicBool,
    state: RwLock<GridState>,
}

impl<A: KennelApi + ?Sized> KennelGrid<A> {
    pub fn new(api: Arc<A>, tz: Tz) -> Self {
        Self {
            api,
            tz,
            page_limit: 100,
            sequence: AtomicU64::new(0),
            cancelled: AtomicBool::new(false),
            state: RwLock::new(GridState::default()),
        }
    }

    /// Page size used when listing kennels
    pub fn with_page_limit(mut self, page_limit: u32) -> Self {
        self.page_limit = page_limit.max(1);
        self
    }

    /// Tenant timezone used to place reservations on calendar days
    pub fn timezone(&self) -> &Tz {
        &self.tz
    }

    /// Current state
    pub async fn snapshot(&self) -> GridState {
        self.state.read().await.clone()
    }

    /// Stop all current and future loads from writing state
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Load `window`, replacing whatever the grid showed before
    pub async fn load(&self, window: GridWindow) -> LoadOutcome {
        if self.is_cancelled() {
            return LoadOutcome::Cancelled;
        }

        let token = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.write().await.loading = true;
        debug!("Grid load #{} for {}", token, window.range);

        let (rows, degraded, last_error) = self.fetch(&window).await;

        if self.is_cancelled() {
            debug!("Grid load #{} finished after cancel; dropping response", token);
            return LoadOutcome::Cancelled;
        }

        let mut state = self.state.write().await;
        if token != self.sequence.load(Ordering::SeqCst) {
            debug!("Grid load #{} superseded; dropping response", token);
            return LoadOutcome::Stale;
        }

        info!(
            "Grid loaded {} kennels for {}{}",
            rows.len(),
            window.range,
            if degraded { " (degraded)" } else { "" }
        );
        *state = GridState {
            window: Some(window),
            rows,
            loading: false,
            degraded,
            last_error,
            loaded_at: Some(Utc::now()),
        };
        LoadOutcome::Applied
    }

    /// Reload the current window, if any
    pub async fn refresh(&self) -> Option<LoadOutcome> {
        let window = self.state.read().await.window?;
        Some(self.load(window).await)
    }

    async fn fetch(&self, window: &GridWindow) -> (Vec<KennelRow>, bool, Option<String>) {
        let query = ResourceQuery::of_type(window.resource_type).with_limit(self.page_limit);
        let mut resources = match list_all_resources(self.api.as_ref(), &query).await {
            Ok(resources) => resources,
            Err(e) => return failed_fetch("kennels", window, e),
        };
        sort_resources(&mut resources);

        let ids: Vec<String> = resources.iter().map(|r| r.id.clone()).collect();
        let availability = match reconcile(self.api.as_ref(), &ids, window.range, &self.tz).await {
            Ok(availability) => availability,
            Err(e) => return failed_fetch("availability", window, e),
        };

        let rows = resources
            .into_iter()
            .map(|resource| {
                let (is_available, occupying_reservations) = match availability.get(&resource.id) {
                    Some(entry) => (entry.is_available, entry.occupying_reservations.clone()),
                    None => (true, Vec::new()),
                };
                KennelRow {
                    resource,
                    is_available,
                    occupying_reservations,
                }
            })
            .collect();

        let degraded = availability.is_degraded();
        (rows, degraded, degraded.then(|| DEGRADED_MESSAGE.to_string()))
    }
}

/// Empty rows for a failed fetch; only transient failures mark the grid degraded
fn failed_fetch(
    what: &str,
    window: &GridWindow,
    e: KennelError,
) -> (Vec<KennelRow>, bool, Option<String>) {
    warn!("Failed to load {} for {}: {}", what, window.range, e);
    (Vec::new(), e.is_transient(), Some(e.user_message()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{kennel, reservation, utc};
    use kennel_client::MockKennelApi;
    use kennel_core::{ReservationStatus, ResourceAvailability};
    use std::time::Duration;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 4, d).unwrap()
    }

    fn window(start: u32, end: u32) -> GridWindow {
        GridWindow::new(DateRange::new(date(start), date(end)).unwrap(), None)
    }

    fn kennels() -> Vec<Resource> {
        vec![kennel("k10", "A10"), kennel("k2", "A2"), kennel("kb1", "B1"), kennel("k1", "A1")]
    }

    #[tokio::test]
    async fn test_load_sorts_and_merges() {
        let booked = reservation(
            "r1",
            "2025-04-08T15:00:00Z",
            "2025-04-09T10:00:00Z",
            ReservationStatus::Confirmed,
        );
        let api = Arc::new(MockKennelApi::new().with_resources(kennels()).with_availability(vec![
            ResourceAvailability {
                resource_id: "k2".into(),
                is_available: false,
                occupying_reservations: vec![booked],
            },
        ]));
        let grid = KennelGrid::new(api, utc());

        assert_eq!(grid.load(window(7, 13)).await, LoadOutcome::Applied);

        let state = grid.snapshot().await;
        let names: Vec<&str> = state.rows.iter().map(|r| r.resource.display_name()).collect();
        assert_eq!(names, vec!["A1", "A2", "A10", "B1"]);
        assert!(state.is_loaded());
        assert!(!state.degraded);

        let a2 = state.row("k2").unwrap();
        assert!(!a2.is_selectable());
        assert_eq!(a2.cell(date(7), &utc()), CellState::Free);
        assert_eq!(
            a2.cell(date(8), &utc()),
            CellState::Occupied {
                reservation_ids: vec!["r1".into()]
            }
        );
        assert_eq!(state.occupied_ids(), HashSet::from(["k2".to_string()]));
        assert_eq!(state.available_resources().len(), 3);
    }

    #[tokio::test]
    async fn test_batch_failure_renders_unblocked_grid() {
        let api = Arc::new(
            MockKennelApi::new()
                .with_resources(kennels())
                .failing_availability("connection reset"),
        );
        let grid = KennelGrid::new(api, utc());

        assert_eq!(grid.load(window(7, 13)).await, LoadOutcome::Applied);

        let state = grid.snapshot().await;
        assert_eq!(state.rows.len(), 4);
        assert!(state.rows.iter().all(|r| r.is_selectable()));
        assert!(state.degraded);
        assert!(state.last_error.is_some());
    }

    #[tokio::test]
    async fn test_resource_failure_degrades_to_empty() {
        let api = Arc::new(MockKennelApi::new().failing_resources("dns failure"));
        let grid = KennelGrid::new(api, utc());

        assert_eq!(grid.load(window(7, 13)).await, LoadOutcome::Applied);

        let state = grid.snapshot().await;
        assert!(state.rows.is_empty());
        assert!(state.degraded);
        assert!(state.last_error.is_some());
    }

    #[tokio::test]
    async fn test_expired_session_is_reported_not_degraded() {
        let api = Arc::new(
            MockKennelApi::new()
                .with_resources(kennels())
                .unauthorized_availability("jwt expired"),
        );
        let grid = KennelGrid::new(api, utc());

        assert_eq!(grid.load(window(7, 13)).await, LoadOutcome::Applied);

        let state = grid.snapshot().await;
        assert!(state.rows.is_empty());
        assert!(!state.degraded);
        assert_eq!(
            state.last_error.as_deref(),
            Some("Your session has expired. Please sign in again.")
        );
    }

    #[tokio::test]
    async fn test_cells_follow_tenant_timezone() {
        // Late evening in Denver, already the next day in UTC
        let booked = reservation(
            "r1",
            "2025-04-09T04:00:00Z",
            "2025-04-09T05:00:00Z",
            ReservationStatus::Confirmed,
        );
        let api = Arc::new(MockKennelApi::new().with_resources(kennels()).with_availability(vec![
            ResourceAvailability {
                resource_id: "k1".into(),
                is_available: false,
                occupying_reservations: vec![booked],
            },
        ]));
        let grid = KennelGrid::new(api, chrono_tz::America::Denver);
        grid.load(window(7, 13)).await;

        let state = grid.snapshot().await;
        let a1 = state.row("k1").unwrap();
        assert_eq!(
            a1.cell(date(8), grid.timezone()),
            CellState::Occupied {
                reservation_ids: vec!["r1".into()]
            }
        );
        assert_eq!(a1.cell(date(9), grid.timezone()), CellState::Free);
    }

    #[tokio::test]
    async fn test_reload_replaces_rather_than_merges() {
        let api = Arc::new(MockKennelApi::new().with_resources(kennels()).with_availability(vec![
            ResourceAvailability {
                resource_id: "k1".into(),
                is_available: false,
                occupying_reservations: vec![],
            },
        ]));
        let grid = KennelGrid::new(api.clone(), utc());
        grid.load(window(7, 13)).await;
        assert!(!grid.snapshot().await.row("k1").unwrap().is_available);

        api.set_availability(vec![]);
        grid.load(window(14, 20)).await;

        let state = grid.snapshot().await;
        assert!(state.row("k1").unwrap().is_available);
        assert_eq!(state.window, Some(window(14, 20)));
    }

    #[tokio::test]
    async fn test_out_of_order_response_is_discarded() {
        let api = Arc::new(
            MockKennelApi::new()
                .with_resources(kennels())
                .with_availability_delays(vec![Duration::from_millis(150), Duration::ZERO]),
        );
        let grid = Arc::new(KennelGrid::new(api, utc()));

        let slow = {
            let grid = grid.clone();
            tokio::spawn(async move { grid.load(window(7, 13)).await })
        };
        // Let the first load reach the backend before issuing the second
        tokio::time::sleep(Duration::from_millis(30)).await;
        let fast = grid.load(window(14, 20)).await;
        let slow = slow.await.unwrap();

        assert_eq!(fast, LoadOutcome::Applied);
        assert_eq!(slow, LoadOutcome::Stale);
        assert_eq!(grid.snapshot().await.window, Some(window(14, 20)));
    }

    #[tokio::test]
    async fn test_cancel_drops_in_flight_response() {
        let api = Arc::new(
            MockKennelApi::new()
                .with_resources(kennels())
                .with_availability_delays(vec![Duration::from_millis(100)]),
        );
        let grid = Arc::new(KennelGrid::new(api, utc()));

        let pending = {
            let grid = grid.clone();
            tokio::spawn(async move { grid.load(window(7, 13)).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        grid.cancel();

        assert_eq!(pending.await.unwrap(), LoadOutcome::Cancelled);
        assert!(grid.snapshot().await.rows.is_empty());
        assert_eq!(grid.load(window(7, 13)).await, LoadOutcome::Cancelled);
    }

    #[tokio::test]
    async fn test_refresh_without_window() {
        let grid = KennelGrid::new(Arc::new(MockKennelApi::new()), utc());
        assert_eq!(grid.refresh().await, None);
    }
}
