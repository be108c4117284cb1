//! Availability reconciliation
//!
//! Combines the kennels on screen with the backend's batch availability
//! answer. The output always has exactly one entry per requested kennel, in
//! request order. Kennels the backend said nothing about count as available,
//! and kennels nobody asked about are dropped.
//!
//! When the batch call fails transiently (unreachable, unexpected body) the
//! view degrades to "everything available" and the reconciliation is flagged
//! as degraded. Backend verdicts such as an expired session are returned.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use chrono_tz::Tz;
use kennel_client::{BatchAvailabilityRequest, KennelApi};
use kennel_core::fail_open::fail_open;
use kennel_core::{DateRange, Reservation, ResourceAvailability, Result};
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

fn start_of_day(day: NaiveDate) -> NaiveDateTime {
    day.and_time(NaiveTime::MIN)
}

/// Whether a reservation occupies a calendar day in the tenant's timezone
///
/// The stay is widened to whole days (00:00:00 on its start date through
/// 23:59:59 on its end date) and tested against noon of `day`.
pub fn occupies_day(reservation: &Reservation, day: NaiveDate, tz: &Tz) -> bool {
    let start = start_of_day(reservation.local_start_date(tz));
    let end = start_of_day(reservation.local_end_date(tz)) + Duration::seconds(86_399);
    let noon = start_of_day(day) + Duration::hours(12);
    start <= noon && noon <= end
}

/// Whether a reservation occupies any day of `range`
pub fn overlaps_range(reservation: &Reservation, range: &DateRange, tz: &Tz) -> bool {
    range.days().any(|day| occupies_day(reservation, day, tz))
}

/// Per-kennel availability for one date range
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    range: DateRange,
    entries: Vec<ResourceAvailability>,
    index: HashMap<String, usize>,
    degraded: bool,
}

impl Reconciliation {
    fn from_entries(range: DateRange, entries: Vec<ResourceAvailability>, degraded: bool) -> Self {
        let index = entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.resource_id.clone(), i))
            .collect();
        Self {
            range,
            entries,
            index,
            degraded,
        }
    }

    /// Every requested kennel marked available, flagged degraded
    pub fn all_available(resource_ids: &[String], range: DateRange) -> Self {
        let entries = dedup(resource_ids)
            .into_iter()
            .map(ResourceAvailability::available)
            .collect();
        Self::from_entries(range, entries, true)
    }

    /// Normalize a batch answer against the requested ids
    pub fn merge(
        resource_ids: &[String],
        returned: Vec<ResourceAvailability>,
        range: DateRange,
        tz: &Tz,
    ) -> Self {
        let mut by_id: HashMap<String, ResourceAvailability> = HashMap::new();
        let mut extras = 0;
        for entry in returned {
            if !resource_ids.contains(&entry.resource_id) {
                extras += 1;
                continue;
            }
            // First answer for an id wins
            by_id.entry(entry.resource_id.clone()).or_insert(entry);
        }
        if extras > 0 {
            debug!("Ignoring {} availability entries for unrequested kennels", extras);
        }

        let entries = dedup(resource_ids)
            .into_iter()
            .map(|id| match by_id.remove(&id) {
                Some(mut entry) => {
                    entry
                        .occupying_reservations
                        .retain(|r| overlaps_range(r, &range, tz));
                    entry
                }
                None => ResourceAvailability::available(id),
            })
            .collect();

        Self::from_entries(range, entries, false)
    }

    pub fn range(&self) -> DateRange {
        self.range
    }

    /// True when the batch answer was replaced by the all-available fallback
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[ResourceAvailability] {
        &self.entries
    }

    pub fn get(&self, resource_id: &str) -> Option<&ResourceAvailability> {
        self.index.get(resource_id).map(|&i| &self.entries[i])
    }

    /// Availability flag; kennels without data count as available
    pub fn is_available(&self, resource_id: &str) -> bool {
        self.get(resource_id).map_or(true, |e| e.is_available)
    }

    /// Kennels held by previously committed reservations
    pub fn occupied_ids(&self) -> HashSet<String> {
        self.entries
            .iter()
            .filter(|e| !e.is_available)
            .map(|e| e.resource_id.clone())
            .collect()
    }
}

fn dedup(ids: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.iter()
        .filter(|id| seen.insert(id.as_str()))
        .cloned()
        .collect()
}

/// Query the batch endpoint and reconcile the answer against `resource_ids`
///
/// Transient backend errors degrade to every kennel available. Any other
/// error (expired session, rejected request) is returned.
pub async fn reconcile<A>(
    api: &A,
    resource_ids: &[String],
    range: DateRange,
    tz: &Tz,
) -> Result<Reconciliation>
where
    A: KennelApi + ?Sized,
{
    if resource_ids.is_empty() {
        return Ok(Reconciliation::from_entries(range, Vec::new(), false));
    }

    let request = BatchAvailabilityRequest::new(dedup(resource_ids), range);
    let reconciliation = match fail_open("batch_availability", || {
        api.batch_availability(&request)
    })
    .await?
    {
        Some(returned) => {
            debug!(
                "Batch availability for {} returned {} of {} kennels",
                range,
                returned.len(),
                request.resource_ids.len()
            );
            Reconciliation::merge(resource_ids, returned, range, tz)
        }
        None => {
            warn!(
                "Availability unknown for {}; assuming all {} kennels available",
                range,
                request.resource_ids.len()
            );
            Reconciliation::all_available(resource_ids, range)
        }
    };
    Ok(reconciliation)
}
