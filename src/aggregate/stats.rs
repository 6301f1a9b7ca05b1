use std::iter::Sum;
use std::ops::{Add, AddAssign};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::CalcError;
use crate::model::Person;

/// Spend and budget figures for one window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub contractor: Decimal,
    #[serde(rename = "non-contractor")]
    pub non_contractor: Decimal,
    pub additional: Decimal,
    pub budget: Decimal,
    pub savings: Decimal,
    pub total: Decimal,
    pub remaining: Decimal,
}

impl Stats {
    /// Derives `total` and `remaining` from the parts.
    pub fn new(
        contractor: Decimal,
        non_contractor: Decimal,
        additional: Decimal,
        budget: Decimal,
        savings: Decimal,
    ) -> Self {
        let total = contractor + non_contractor + additional;
        Self {
            contractor,
            non_contractor,
            additional,
            budget,
            savings,
            total,
            remaining: budget - total,
        }
    }

    /// Everything zero; what a subject with no dated activity reports.
    pub fn zero() -> Self {
        Self::default()
    }
}

impl Add for Stats {
    type Output = Stats;

    fn add(mut self, other: Stats) -> Stats {
        self += other;
        self
    }
}

impl AddAssign for Stats {
    fn add_assign(&mut self, other: Stats) {
        self.contractor += other.contractor;
        self.non_contractor += other.non_contractor;
        self.additional += other.additional;
        self.budget += other.budget;
        self.savings += other.savings;
        self.total += other.total;
        self.remaining += other.remaining;
    }
}

impl Sum for Stats {
    fn sum<I: Iterator<Item = Stats>>(iter: I) -> Stats {
        iter.fold(Stats::zero(), Add::add)
    }
}

/// Which people's time to count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PeopleFilter {
    #[default]
    All,
    ContractorOnly,
    NonContractorOnly,
}

impl PeopleFilter {
    /// Asking for contractors only and non-contractors only at once has no
    /// answer.
    pub fn from_flags(contractor_only: bool, non_contractor_only: bool) -> Result<Self, CalcError> {
        match (contractor_only, non_contractor_only) {
            (true, true) => Err(CalcError::domain(
                "only one of contractor_only and non_contractor_only can be set",
            )),
            (true, false) => Ok(PeopleFilter::ContractorOnly),
            (false, true) => Ok(PeopleFilter::NonContractorOnly),
            (false, false) => Ok(PeopleFilter::All),
        }
    }

    pub fn matches(&self, person: &Person) -> bool {
        match self {
            PeopleFilter::All => true,
            PeopleFilter::ContractorOnly => person.is_contractor,
            PeopleFilter::NonContractorOnly => !person.is_contractor,
        }
    }
}

/// Budget health: total cost against the final budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Rag {
    Green,
    Amber,
    Red,
}

impl Rag {
    /// GREEN within budget, AMBER within `amber_threshold` times the budget,
    /// RED beyond.
    pub fn assess(budget: Decimal, total_cost: Decimal, amber_threshold: Decimal) -> Self {
        if budget >= total_cost {
            Rag::Green
        } else if budget * amber_threshold >= total_cost {
            Rag::Amber
        } else {
            Rag::Red
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn test_new_derives_totals() {
        let stats = Stats::new(dec!(100), dec!(50), dec!(25), dec!(1000), dec!(10));
        assert_eq!(stats.total, dec!(175));
        assert_eq!(stats.remaining, dec!(825));
    }

    #[test]
    fn test_sum_is_element_wise() {
        let a = Stats::new(dec!(100), dec!(0), dec!(5), dec!(200), dec!(1));
        let b = Stats::new(dec!(1), dec!(2), dec!(3), dec!(10), dec!(0));
        let sum: Stats = [a, b].into_iter().sum();

        assert_eq!(sum, Stats::new(dec!(101), dec!(2), dec!(8), dec!(210), dec!(1)));
        assert_eq!(Vec::<Stats>::new().into_iter().sum::<Stats>(), Stats::zero());
    }

    #[test]
    fn test_serialised_field_names() {
        let json = serde_json::to_value(Stats::zero()).unwrap();
        assert!(json.get("non-contractor").is_some());
        assert_eq!(serde_json::to_value(Rag::Amber).unwrap(), "AMBER");
    }

    #[test]
    fn test_people_filter_flags() {
        assert_eq!(PeopleFilter::from_flags(false, false).unwrap(), PeopleFilter::All);
        assert_eq!(
            PeopleFilter::from_flags(true, false).unwrap(),
            PeopleFilter::ContractorOnly
        );
        assert!(matches!(
            PeopleFilter::from_flags(true, true),
            Err(CalcError::Domain { .. })
        ));
    }

    #[test]
    fn test_rag_thresholds() {
        let threshold = dec!(1.1);
        assert_eq!(Rag::assess(dec!(0), dec!(0), threshold), Rag::Green);
        assert_eq!(Rag::assess(dec!(100), dec!(100), threshold), Rag::Green);
        assert_eq!(Rag::assess(dec!(100), dec!(110), threshold), Rag::Amber);
        assert_eq!(Rag::assess(dec!(100), dec!(110.01), threshold), Rag::Red);
    }
}
