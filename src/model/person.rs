use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::costs::CostLine;
use crate::rates::{Rate, RateSchedule};

/// Someone whose time is spent on work items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub is_contractor: bool,
    #[serde(default)]
    pub rates: Vec<Rate>,
    /// Non-salary costs such as pension or national insurance.
    #[serde(default)]
    pub costs: Vec<CostLine>,
}

impl Person {
    pub fn new(name: impl Into<String>, is_contractor: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            is_contractor,
            rates: Vec::new(),
            costs: Vec::new(),
        }
    }

    pub fn with_rate(mut self, rate: Rate) -> Self {
        self.rates.push(rate);
        self
    }

    pub fn with_cost(mut self, cost: CostLine) -> Self {
        self.costs.push(cost);
        self
    }

    pub fn schedule(&self) -> RateSchedule<'_> {
        RateSchedule::new(&self.rates)
    }

    pub fn employment(&self) -> &'static str {
        if self.is_contractor {
            "Contractor"
        } else {
            "Civil Servant"
        }
    }
}
