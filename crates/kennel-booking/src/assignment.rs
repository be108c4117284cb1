//! Multi-pet kennel assignment
//!
//! A booking draft maps each selected pet to one kennel. The first pet gets
//! the kennel the user clicked (the anchor). The others are pre-filled with
//! the kennels that follow the anchor in kennel-name order, and every pet
//! can be overridden by hand.
//!
//! Each kennel in a pet's dropdown is in exactly one state:
//!
//! | State          | Meaning                                        | Selectable |
//! |----------------|------------------------------------------------|------------|
//! | `Available`    | No conflict                                    | yes        |
//! | `SoftConflict` | Chosen for a different pet in this draft       | yes        |
//! | `HardConflict` | Held by a previously committed reservation     | no         |
//!
//! Soft conflicts are allowed while editing but block submission, since each
//! pet becomes its own reservation and both would claim the same kennel.
//!
//! Submission creates reservations one pet at a time. The draft remembers
//! which pets were booked, so resubmitting after a partial failure only
//! creates the missing ones.

use chrono::{DateTime, Utc};
use kennel_client::{KennelApi, NewReservation, ReservationUpdate};
use kennel_core::{
    compare_kennel_names, KennelError, Reservation, Resource, Result, ValidationErrors,
};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, info, warn};

use crate::grid::GridState;

/// Field key for errors about one pet's kennel
pub fn pet_field(pet_id: &str) -> String {
    format!("pet:{}", pet_id)
}

/// Dropdown state of one kennel for one pet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionState {
    Available,
    SoftConflict,
    HardConflict,
}

impl OptionState {
    /// Hard conflicts are disabled, not just highlighted
    pub fn is_disabled(&self) -> bool {
        matches!(self, Self::HardConflict)
    }
}

/// One dropdown entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KennelOption {
    pub resource_id: String,
    pub label: String,
    pub state: OptionState,
    /// Other pets in the draft that picked this kennel
    pub claimed_by: Vec<String>,
}

/// Stay details shared by every pet in the draft
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingRequest {
    pub customer_id: String,
    pub service_id: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub notes: Option<String>,
}

/// Transient multi-pet booking form state
#[derive(Debug, Clone, Default)]
pub struct BookingDraft {
    selected_pets: Vec<String>,
    assignments: HashMap<String, String>,
    /// Derived from committed reservations; replaced on every grid load
    occupied: HashSet<String>,
    labels: HashMap<String, String>,
    /// Reservations already created by an earlier submit, by pet
    booked: HashMap<String, Reservation>,
}

impl BookingDraft {
    pub fn new(occupied: HashSet<String>) -> Self {
        Self {
            occupied,
            ..Self::default()
        }
    }

    /// Draft over the kennels currently on the grid
    pub fn from_grid(state: &GridState) -> Self {
        let mut draft = Self::new(state.occupied_ids());
        draft.remember_labels(state.rows.iter().map(|r| &r.resource));
        draft
    }

    /// Replace the committed-occupancy set after the grid reloads
    pub fn set_occupied(&mut self, occupied: HashSet<String>) {
        self.occupied = occupied;
    }

    fn remember_labels<'a>(&mut self, resources: impl IntoIterator<Item = &'a Resource>) {
        for resource in resources {
            self.labels
                .insert(resource.id.clone(), resource.display_name().to_string());
        }
    }

    fn label<'a>(&'a self, resource_id: &'a str) -> &'a str {
        self.labels
            .get(resource_id)
            .map(String::as_str)
            .unwrap_or(resource_id)
    }

    /// Add a pet; returns false if it was already selected
    pub fn select_pet(&mut self, pet_id: impl Into<String>) -> bool {
        let pet_id = pet_id.into();
        if self.selected_pets.contains(&pet_id) {
            return false;
        }
        self.selected_pets.push(pet_id);
        true
    }

    /// Remove a pet and its assignment
    pub fn deselect_pet(&mut self, pet_id: &str) {
        self.selected_pets.retain(|p| p != pet_id);
        self.assignments.remove(pet_id);
    }

    pub fn selected_pets(&self) -> &[String] {
        &self.selected_pets
    }

    pub fn assignment(&self, pet_id: &str) -> Option<&str> {
        self.assignments.get(pet_id).map(String::as_str)
    }

    /// Assign a kennel to a pet by hand
    ///
    /// Soft conflicts are accepted; hard conflicts are refused.
    pub fn assign(&mut self, pet_id: &str, resource_id: &str) -> Result<()> {
        let mut errors = ValidationErrors::new();
        if !self.selected_pets.iter().any(|p| p == pet_id) {
            errors.add(pet_field(pet_id), "Pet is not part of this booking");
        } else if self.occupied.contains(resource_id) {
            errors.add(
                pet_field(pet_id),
                format!("Kennel {} is already booked for these dates", self.label(resource_id)),
            );
        }
        if !errors.is_empty() {
            return Err(KennelError::Validation(errors));
        }

        self.assignments
            .insert(pet_id.to_string(), resource_id.to_string());
        Ok(())
    }

    pub fn clear_assignment(&mut self, pet_id: &str) {
        self.assignments.remove(pet_id);
    }

    /// Reservation created for `pet_id` by an earlier submit
    pub fn booked(&self, pet_id: &str) -> Option<&Reservation> {
        self.booked.get(pet_id)
    }

    /// Derive default assignments from the anchor kennel
    ///
    /// Pet 0 gets the anchor; pet `i` gets the kennel `i` places after the
    /// anchor in kennel-name order, or nothing when the list runs out.
    /// Existing assignments of selected pets are replaced.
    pub fn prefill(&mut self, anchor_id: &str, available: &[Resource]) {
        self.remember_labels(available);

        let mut sorted: Vec<&Resource> = available
            .iter()
            .filter(|r| !self.occupied.contains(&r.id))
            .collect();
        sorted.sort_by(|a, b| compare_kennel_names(a.display_name(), b.display_name()));

        let anchor_pos = sorted.iter().position(|r| r.id == anchor_id);
        if anchor_pos.is_none() {
            debug!("Anchor kennel {} is not in the available list", anchor_id);
        }

        for (i, pet_id) in self.selected_pets.iter().enumerate() {
            let target = if i == 0 {
                Some(anchor_id).filter(|id| !self.occupied.contains(*id))
            } else {
                anchor_pos
                    .and_then(|pos| sorted.get(pos + i))
                    .map(|r| r.id.as_str())
            };

            match target {
                Some(resource_id) => {
                    self.assignments
                        .insert(pet_id.clone(), resource_id.to_string());
                }
                None => {
                    self.assignments.remove(pet_id);
                }
            }
        }
    }

    /// State of `resource_id` in `pet_id`'s dropdown
    pub fn option_state(&self, pet_id: &str, resource_id: &str) -> OptionState {
        if self.occupied.contains(resource_id) {
            return OptionState::HardConflict;
        }
        let claimed_elsewhere = self
            .assignments
            .iter()
            .any(|(other, assigned)| other != pet_id && assigned == resource_id);
        if claimed_elsewhere {
            OptionState::SoftConflict
        } else {
            OptionState::Available
        }
    }

    /// Dropdown entries for one pet, in kennel-name order
    pub fn options_for(&self, pet_id: &str, resources: &[Resource]) -> Vec<KennelOption> {
        let mut sorted: Vec<&Resource> = resources.iter().collect();
        sorted.sort_by(|a, b| compare_kennel_names(a.display_name(), b.display_name()));

        sorted
            .into_iter()
            .map(|resource| {
                let mut claimed_by: Vec<String> = self
                    .selected_pets
                    .iter()
                    .filter(|other| {
                        other.as_str() != pet_id
                            && self.assignment(other) == Some(resource.id.as_str())
                    })
                    .cloned()
                    .collect();
                claimed_by.sort();
                KennelOption {
                    resource_id: resource.id.clone(),
                    label: resource.display_name().to_string(),
                    state: self.option_state(pet_id, &resource.id),
                    claimed_by,
                }
            })
            .collect()
    }

    /// Check the draft can be submitted
    ///
    /// Returns `(pet, kennel)` pairs in selection order.
    pub fn validate(&self) -> std::result::Result<Vec<(String, String)>, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if self.selected_pets.is_empty() {
            errors.add("pets", "Select at least one pet");
            return Err(errors);
        }

        let mut by_kennel: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for pet_id in &self.selected_pets {
            if let Some(resource_id) = self.assignment(pet_id) {
                by_kennel.entry(resource_id).or_default().push(pet_id);
            }
        }

        let mut pairs = Vec::with_capacity(self.selected_pets.len());
        for pet_id in &self.selected_pets {
            let Some(resource_id) = self.assignment(pet_id) else {
                errors.add(pet_field(pet_id), "Select a kennel for this pet");
                continue;
            };

            // A booked pet's kennel is occupied by its own reservation
            if self.occupied.contains(resource_id) && !self.booked.contains_key(pet_id) {
                errors.add(
                    pet_field(pet_id),
                    format!("Kennel {} is already booked for these dates", self.label(resource_id)),
                );
            }

            let sharing = &by_kennel[resource_id];
            if sharing.len() > 1 {
                errors.add(
                    pet_field(pet_id),
                    format!(
                        "Kennel {} is assigned to more than one pet: {}",
                        self.label(resource_id),
                        sharing.join(", ")
                    ),
                );
            }

            pairs.push((pet_id.clone(), resource_id.to_string()));
        }

        errors.into_result(pairs)
    }

    /// Validate and create one reservation per pet
    ///
    /// Pets booked by an earlier submit are skipped. On success every pet's
    /// reservation is returned in selection order. A rejected submission
    /// keeps everything the user entered, plus the pets booked so far.
    pub async fn submit<A>(&mut self, api: &A, request: &BookingRequest) -> Result<Vec<Reservation>>
    where
        A: KennelApi + ?Sized,
    {
        let pairs = match self.validate() {
            Ok(pairs) => pairs,
            Err(mut errors) => {
                check_dates(request, &mut errors);
                return Err(KennelError::Validation(errors));
            }
        };
        let mut errors = ValidationErrors::new();
        check_dates(request, &mut errors);
        if !errors.is_empty() {
            return Err(KennelError::Validation(errors));
        }

        let mut created = 0;
        for (pet_id, resource_id) in &pairs {
            if let Some(existing) = self.booked.get(pet_id) {
                debug!("Pet {} already booked as {}; skipping", pet_id, existing.id);
                continue;
            }
            let reservation = NewReservation {
                customer_id: request.customer_id.clone(),
                pet_id: pet_id.clone(),
                service_id: request.service_id.clone(),
                resource_id: Some(resource_id.clone()),
                start_date: request.start_date,
                end_date: request.end_date,
                status: None,
                notes: request.notes.clone(),
            };

            match api.create_reservation(&reservation).await {
                Ok(r) => {
                    created += 1;
                    self.booked.insert(pet_id.clone(), r);
                }
                Err(e) => {
                    if self.booked.is_empty() {
                        warn!("Booking for pet {} failed: {}", pet_id, e);
                    } else {
                        let mut ids: Vec<&str> =
                            self.booked.values().map(|r| r.id.as_str()).collect();
                        ids.sort_unstable();
                        warn!(
                            "Booking for pet {} failed; already created {}: {}",
                            pet_id,
                            ids.join(", "),
                            e
                        );
                    }
                    return Err(e);
                }
            }
        }

        info!("Created {} reservations", created);
        Ok(pairs
            .iter()
            .filter_map(|(pet_id, _)| self.booked.get(pet_id).cloned())
            .collect())
    }
}

/// Move a committed reservation to another kennel on the grid
///
/// The target must be a kennel the grid shows, and must not be held by any
/// other reservation for the grid's window. The backend remains the final
/// judge of the move.
pub async fn move_reservation<A>(
    api: &A,
    grid: &GridState,
    reservation_id: &str,
    target_id: &str,
) -> Result<Reservation>
where
    A: KennelApi + ?Sized,
{
    let mut errors = ValidationErrors::new();
    match grid.row(target_id) {
        None => errors.add("resourceId", format!("Kennel {} is not on the grid", target_id)),
        Some(row) => {
            let held_by_other = row
                .occupying_reservations
                .iter()
                .any(|r| r.id != reservation_id);
            let held_unknown = !row.is_available && row.occupying_reservations.is_empty();
            if held_by_other || held_unknown {
                errors.add(
                    "resourceId",
                    format!(
                        "Kennel {} is already booked for these dates",
                        row.resource.display_name()
                    ),
                );
            }
        }
    }
    if !errors.is_empty() {
        return Err(KennelError::Validation(errors));
    }

    let update = ReservationUpdate {
        resource_id: Some(target_id.to_string()),
        ..Default::default()
    };
    match api.update_reservation(reservation_id, &update).await {
        Ok(moved) => {
            info!("Moved reservation {} to kennel {}", moved.short_id(), target_id);
            Ok(moved)
        }
        Err(e) => {
            warn!("Moving reservation {} to {} failed: {}", reservation_id, target_id, e);
            Err(e)
        }
    }
}

fn check_dates(request: &BookingRequest, errors: &mut ValidationErrors) {
    if request.end_date <= request.start_date {
        errors.add("endDate", "End date must be after start date");
    }
}
