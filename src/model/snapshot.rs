//! Read-only view of every entity a calculation may touch.
//!
//! A snapshot is loaded from a JSON document:
//!
//! ```text
//! {"people": [...], "areas": [...], "work_items": [...], "groups": [...]}
//! ```

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::Path;

use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use super::{Area, Person, WorkItem, WorkItemGroup};
use crate::calendar::WorkCalendar;
use crate::costs::CostKind;
use crate::error::{CalcError, SnapshotError};

#[derive(Debug, Default, Deserialize)]
struct SnapshotFile {
    #[serde(default)]
    people: Vec<Person>,
    #[serde(default)]
    areas: Vec<Area>,
    #[serde(default)]
    work_items: Vec<WorkItem>,
    #[serde(default)]
    groups: Vec<WorkItemGroup>,
}

#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    people: BTreeMap<Uuid, Person>,
    areas: BTreeMap<Uuid, Area>,
    work_items: BTreeMap<Uuid, WorkItem>,
    groups: BTreeMap<Uuid, WorkItemGroup>,
}

fn index<T>(
    items: Vec<T>,
    id: impl Fn(&T) -> Uuid,
    what: &str,
) -> Result<BTreeMap<Uuid, T>, CalcError> {
    let mut map = BTreeMap::new();
    for item in items {
        let key = id(&item);
        if map.insert(key, item).is_some() {
            return Err(CalcError::domain(format!("duplicate {} id {}", what, key)));
        }
    }
    Ok(map)
}

fn named(name: &str, err: CalcError) -> CalcError {
    match err {
        CalcError::Domain { reason } => CalcError::domain(format!("{}: {}", name, reason)),
        other => other,
    }
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_person(mut self, person: Person) -> Self {
        self.people.insert(person.id, person);
        self
    }

    pub fn with_area(mut self, area: Area) -> Self {
        self.areas.insert(area.id, area);
        self
    }

    pub fn with_work_item(mut self, item: WorkItem) -> Self {
        self.work_items.insert(item.id, item);
        self
    }

    pub fn with_group(mut self, group: WorkItemGroup) -> Self {
        self.groups.insert(group.id, group);
        self
    }

    /// Parse and validate a snapshot document.
    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        let file: SnapshotFile = serde_json::from_str(json)?;
        let snapshot = Self {
            people: index(file.people, |p| p.id, "person")?,
            areas: index(file.areas, |a| a.id, "area")?,
            work_items: index(file.work_items, |w| w.id, "work item")?,
            groups: index(file.groups, |g| g.id, "group")?,
        };
        snapshot.validate()?;
        Ok(snapshot)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, SnapshotError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| SnapshotError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let snapshot = Self::from_json(&content)?;
        tracing::info!(
            "Loaded snapshot from {}: {} people, {} work items, {} groups",
            path.display(),
            snapshot.people.len(),
            snapshot.work_items.len(),
            snapshot.groups.len()
        );
        Ok(snapshot)
    }

    /// Check the invariants calculations rely on.
    pub fn validate(&self) -> Result<(), CalcError> {
        for person in self.people.values() {
            let mut seen = HashSet::new();
            for rate in &person.rates {
                if !seen.insert(rate.effective_from) {
                    return Err(CalcError::domain(format!(
                        "{} has two rates effective from {}",
                        person.name, rate.effective_from
                    )));
                }
            }
            if let Some(cost) = person.costs.iter().find(|c| c.kind == CostKind::OneOff) {
                return Err(CalcError::domain(format!(
                    "{} has a one-off cost starting {}; person costs must recur",
                    person.name, cost.start_date
                )));
            }
        }

        for area in self.areas.values() {
            if let Some(manager) = area.manager_id {
                self.person(manager)?;
            }
        }

        for item in self.work_items.values() {
            item.phases.validate().map_err(|e| named(&item.name, e))?;
            if let Some(area_id) = item.area_id {
                self.area(area_id)?;
            }
            let managers = [item.product_manager_id, item.delivery_manager_id];
            for manager in managers.into_iter().flatten() {
                self.person(manager)?;
            }
            for task in &item.tasks {
                self.person(task.person_id)?;
            }
        }

        for group in self.groups.values() {
            group.phases.validate().map_err(|e| named(&group.name, e))?;
            for member in &group.members {
                self.work_item(*member)?;
            }
        }

        Ok(())
    }

    /// Log tasks allocated more days than their span has working days.
    ///
    /// Allocations come from an external scheduler, so these are reported
    /// rather than rejected. Returns the number found.
    pub fn check_allocations(&self, calendar: &WorkCalendar) -> usize {
        let mut found = 0;
        for item in self.work_items.values() {
            for task in &item.tasks {
                let workdays = calendar.workdays_in(task.span());
                if task.allocated_days > Decimal::from(workdays) {
                    tracing::warn!(
                        "Task {} on {} allocates {} days over {} working days",
                        task.id,
                        item.name,
                        task.allocated_days,
                        workdays
                    );
                    found += 1;
                }
            }
        }
        found
    }

    pub fn person(&self, id: Uuid) -> Result<&Person, CalcError> {
        self.people.get(&id).ok_or(CalcError::UnknownPerson(id))
    }

    pub fn area(&self, id: Uuid) -> Result<&Area, CalcError> {
        self.areas.get(&id).ok_or(CalcError::UnknownArea(id))
    }

    pub fn work_item(&self, id: Uuid) -> Result<&WorkItem, CalcError> {
        self.work_items.get(&id).ok_or(CalcError::UnknownWorkItem(id))
    }

    pub fn group(&self, id: Uuid) -> Result<&WorkItemGroup, CalcError> {
        self.groups.get(&id).ok_or(CalcError::UnknownGroup(id))
    }

    pub fn people(&self) -> impl Iterator<Item = &Person> {
        self.people.values()
    }

    pub fn areas(&self) -> impl Iterator<Item = &Area> {
        self.areas.values()
    }

    pub fn work_items(&self) -> impl Iterator<Item = &WorkItem> {
        self.work_items.values()
    }

    pub fn groups(&self) -> impl Iterator<Item = &WorkItemGroup> {
        self.groups.values()
    }

    /// Hidden work items, and those in a hidden area, are left out of every
    /// roll-up.
    pub fn is_visible(&self, item: &WorkItem) -> bool {
        item.visible
            && item
                .area_id
                .and_then(|id| self.areas.get(&id))
                .is_none_or(|area| area.visible)
    }

    /// Visible members of a group.
    pub fn visible_members(&self, group: &WorkItemGroup) -> Result<Vec<&WorkItem>, CalcError> {
        let mut members = Vec::with_capacity(group.members.len());
        for id in &group.members {
            let item = self.work_item(*id)?;
            if self.is_visible(item) {
                members.push(item);
            }
        }
        Ok(members)
    }

    /// Ids of work items that belong to at least one group.
    pub fn grouped_ids(&self) -> BTreeSet<Uuid> {
        self.groups
            .values()
            .flat_map(|g| g.members.iter().copied())
            .collect()
    }
}
