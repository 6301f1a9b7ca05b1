use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Budget, Link, PhaseDates, Status, Task, default_visible};
use crate::costs::CostLine;

/// A product or project that owns tasks, costs and budgets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItem {
    pub id: Uuid,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area_id: Option<Uuid>,
    #[serde(default = "default_visible")]
    pub visible: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_manager_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_manager_id: Option<Uuid>,
    #[serde(flatten)]
    pub phases: PhaseDates,
    #[serde(default)]
    pub budgets: Vec<Budget>,
    #[serde(default)]
    pub costs: Vec<CostLine>,
    #[serde(default)]
    pub savings: Vec<CostLine>,
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub statuses: Vec<Status>,
    #[serde(default)]
    pub links: Vec<Link>,
}

impl WorkItem {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: None,
            area_id: None,
            visible: true,
            product_manager_id: None,
            delivery_manager_id: None,
            phases: PhaseDates::default(),
            budgets: Vec::new(),
            costs: Vec::new(),
            savings: Vec::new(),
            tasks: Vec::new(),
            statuses: Vec::new(),
            links: Vec::new(),
        }
    }
}

/// A set of work items reported together. Owns no tasks or costs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItemGroup {
    pub id: Uuid,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(flatten)]
    pub phases: PhaseDates,
    pub members: Vec<Uuid>,
    #[serde(default)]
    pub statuses: Vec<Status>,
}

impl WorkItemGroup {
    pub fn new(name: impl Into<String>, members: impl IntoIterator<Item = Uuid>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: None,
            phases: PhaseDates::default(),
            members: members.into_iter().collect(),
            statuses: Vec::new(),
        }
    }
}
