//! Reservation summaries for operators
//!
//! Quick checks run against a reservation listing: which recent bookings
//! never got a kennel, how bookings spread across kennels, and what came in
//! through the legacy import (reservations carrying an `externalId`).

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use kennel_core::{compare_kennel_names, Reservation, ReservationStatus};
use std::collections::{BTreeSet, HashMap};
use std::fmt;

const NO_RESOURCE: &str = "NONE";
const UNKNOWN_KENNEL: &str = "Unknown";

/// One line of the recent-reservations listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecentLine {
    pub short_id: String,
    pub start_date: NaiveDate,
    /// Short resource id, or `NONE`
    pub resource: String,
    pub status: ReservationStatus,
    pub pet_name: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecentSummary {
    pub lines: Vec<RecentLine>,
    pub without_resource: usize,
    pub total: usize,
}

/// Newest `limit` reservations plus a count of those with no kennel
///
/// Newest means latest `createdAt`; reservations without one keep listing
/// order after those that have it.
pub fn recent_summary(reservations: &[Reservation], limit: usize, tz: &Tz) -> RecentSummary {
    let mut newest: Vec<&Reservation> = reservations.iter().collect();
    newest.sort_by(|a, b| match (a.created_at, b.created_at) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });

    let lines = newest
        .into_iter()
        .take(limit)
        .map(|r| RecentLine {
            short_id: r.short_id(),
            start_date: r.local_start_date(tz),
            resource: r
                .assigned_resource_id()
                .map(|id| id.chars().take(8).collect())
                .unwrap_or_else(|| NO_RESOURCE.to_string()),
            status: r.status,
            pet_name: r.pet_name().map(str::to_string),
            created_at: r.created_at,
        })
        .collect();

    RecentSummary {
        lines,
        without_resource: reservations
            .iter()
            .filter(|r| r.assigned_resource_id().is_none())
            .count(),
        total: reservations.len(),
    }
}

impl fmt::Display for RecentSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Recent {} reservations:", self.lines.len())?;
        for line in &self.lines {
            write!(
                f,
                "  {}... Start: {} Resource: {} Status: {}",
                line.short_id, line.start_date, line.resource, line.status
            )?;
            if let Some(pet) = &line.pet_name {
                write!(f, " Pet: {}", pet)?;
            }
            if let Some(created) = line.created_at {
                write!(f, " Created: {}", created.format("%Y-%m-%dT%H:%M:%S"))?;
            }
            writeln!(f)?;
        }
        write!(
            f,
            "\nReservations without resource: {} / {}",
            self.without_resource, self.total
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KennelCount {
    pub kennel: String,
    pub count: usize,
}

/// How reservations spread across kennels
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Distribution {
    pub total: usize,
    /// Busiest first; ties in kennel-name order
    pub kennels: Vec<KennelCount>,
}

impl Distribution {
    pub fn unique_kennels(&self) -> usize {
        self.kennels.len()
    }
}

pub fn kennel_distribution(reservations: &[Reservation]) -> Distribution {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for r in reservations {
        *counts.entry(r.resource_name().unwrap_or(UNKNOWN_KENNEL)).or_insert(0) += 1;
    }

    let mut kennels: Vec<KennelCount> = counts
        .into_iter()
        .map(|(kennel, count)| KennelCount {
            kennel: kennel.to_string(),
            count,
        })
        .collect();
    kennels.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| compare_kennel_names(&a.kennel, &b.kennel))
    });

    Distribution {
        total: reservations.len(),
        kennels,
    }
}

impl Distribution {
    /// Render the top `limit` kennels
    pub fn render(&self, limit: usize) -> String {
        let mut out = format!(
            "Total reservations checked: {}\nUnique kennels used: {}\n\nKennel distribution:\n",
            self.total,
            self.unique_kennels()
        );
        for k in self.kennels.iter().take(limit) {
            out.push_str(&format!("  {}: {}\n", k.kennel, k.count));
        }
        out
    }
}

/// One sample line of the imported-reservations report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedLine {
    pub short_id: String,
    pub external_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub kennel: String,
    pub status: ReservationStatus,
}

/// Reservations that came in through the legacy import
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedSummary {
    pub total: usize,
    pub imported: usize,
    /// Earliest and latest local start date among imported reservations
    pub first_start: Option<NaiveDate>,
    pub last_start: Option<NaiveDate>,
    pub samples: Vec<ImportedLine>,
    /// Kennel spread of the imported reservations only
    pub distribution: Distribution,
}

/// Summarize imported reservations, keeping the first `sample_limit` as samples
pub fn imported_summary(
    reservations: &[Reservation],
    sample_limit: usize,
    tz: &Tz,
) -> ImportedSummary {
    let imported: Vec<Reservation> = reservations
        .iter()
        .filter(|r| r.is_imported())
        .cloned()
        .collect();

    let starts = imported.iter().map(|r| r.local_start_date(tz));
    let first_start = starts.clone().min();
    let last_start = starts.max();

    let samples = imported
        .iter()
        .take(sample_limit)
        .map(|r| ImportedLine {
            short_id: r.short_id(),
            external_id: r.external_id.clone().unwrap_or_default(),
            start_date: r.local_start_date(tz),
            end_date: r.local_end_date(tz),
            kennel: r.resource_name().unwrap_or("N/A").to_string(),
            status: r.status,
        })
        .collect();

    ImportedSummary {
        total: reservations.len(),
        imported: imported.len(),
        first_start,
        last_start,
        samples,
        distribution: kennel_distribution(&imported),
    }
}

impl ImportedSummary {
    /// Render the summary with the top `kennel_limit` kennels
    pub fn render(&self, kennel_limit: usize) -> String {
        let mut out = format!(
            "Total reservations: {}\nImported (with externalId): {}\n",
            self.total, self.imported
        );
        if let (Some(first), Some(last)) = (self.first_start, self.last_start) {
            out.push_str(&format!("Date range: {} to {}\n", first, last));
        }
        if !self.samples.is_empty() {
            out.push_str(&format!("\nFirst {} imported reservations:\n", self.samples.len()));
            for line in &self.samples {
                out.push_str(&format!(
                    "  {}... {} to {} - External ID: {} - Resource: {} - Status: {}\n",
                    line.short_id,
                    line.start_date,
                    line.end_date,
                    line.external_id,
                    line.kennel,
                    line.status
                ));
            }
            out.push_str(&format!("\nResource distribution (top {}):\n", kennel_limit));
            for k in self.distribution.kennels.iter().take(kennel_limit) {
                out.push_str(&format!("  {}: {} reservations\n", k.kennel, k.count));
            }
        }
        out
    }
}

/// Totals for a date-range listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeSummary {
    pub total: usize,
    pub resource_ids: BTreeSet<String>,
}

pub fn range_summary(reservations: &[Reservation]) -> RangeSummary {
    RangeSummary {
        total: reservations.len(),
        resource_ids: reservations
            .iter()
            .filter_map(|r| r.assigned_resource_id())
            .map(str::to_string)
            .collect(),
    }
}
