use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Membership plan codes offered at the front desk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PlanName {
    Monthly,
    Quarterly,
    #[serde(rename = "Half-Yearly")]
    HalfYearly,
    Yearly,
}

impl PlanName {
    pub const ALL: [PlanName; 4] = [
        PlanName::Monthly,
        PlanName::Quarterly,
        PlanName::HalfYearly,
        PlanName::Yearly,
    ];

    /// Number of calendar months a plan runs for.
    pub fn months(self) -> u32 {
        match self {
            PlanName::Monthly => 1,
            PlanName::Quarterly => 3,
            PlanName::HalfYearly => 6,
            PlanName::Yearly => 12,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PlanName::Monthly => "Monthly",
            PlanName::Quarterly => "Quarterly",
            PlanName::HalfYearly => "Half-Yearly",
            PlanName::Yearly => "Yearly",
        }
    }

    pub fn next(self) -> Self {
        match self {
            PlanName::Monthly => PlanName::Quarterly,
            PlanName::Quarterly => PlanName::HalfYearly,
            PlanName::HalfYearly => PlanName::Yearly,
            PlanName::Yearly => PlanName::Monthly,
        }
    }

    pub fn previous(self) -> Self {
        match self {
            PlanName::Monthly => PlanName::Yearly,
            PlanName::Quarterly => PlanName::Monthly,
            PlanName::HalfYearly => PlanName::Quarterly,
            PlanName::Yearly => PlanName::HalfYearly,
        }
    }
}

impl fmt::Display for PlanName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for PlanName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PlanName::ALL
            .into_iter()
            .find(|plan| plan.label() == s)
            .ok_or_else(|| format!("unknown plan: {s}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_spelling_matches_backend() {
        let json = serde_json::to_string(&PlanName::HalfYearly).unwrap();
        assert_eq!(json, "\"Half-Yearly\"");

        let plan: PlanName = serde_json::from_str("\"Quarterly\"").unwrap();
        assert_eq!(plan, PlanName::Quarterly);
    }

    #[test]
    fn unknown_plan_is_rejected() {
        assert!("Weekly".parse::<PlanName>().is_err());
        assert!(serde_json::from_str::<PlanName>("\"half-yearly\"").is_err());
    }

    #[test]
    fn cycling_visits_every_plan() {
        let mut plan = PlanName::Monthly;
        for _ in 0..4 {
            plan = plan.next();
        }
        assert_eq!(plan, PlanName::Monthly);
        assert_eq!(PlanName::Monthly.previous(), PlanName::Yearly);
    }
}
