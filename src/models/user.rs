use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::PlanName;

/// Payload for creating a member account from the admin dashboard.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub phone: Option<String>,
}

impl NewUser {
    /// Names of the required fields that are still blank.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.name.trim().is_empty() {
            missing.push("name");
        }
        if self.email.trim().is_empty() {
            missing.push("email");
        }
        if self.password.is_empty() {
            missing.push("password");
        }
        missing
    }
}

/// Body of `POST /api/plan/assign`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanAssignment {
    pub email: String,
    pub plan_name: PlanName,
    pub start_date: NaiveDate,
    pub expiry_date: NaiveDate,
}

/// The signed-in member's own plan, as returned by `/api/plan/myplan`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberPlan {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone_number: Option<String>,
    pub plan_name: PlanName,
    pub start_date: String,
    #[serde(default)]
    pub expiry_date: Option<String>,
    #[serde(default)]
    pub last_workout: Option<String>,
    #[serde(default)]
    pub workouts_this_month: Option<u32>,
}
