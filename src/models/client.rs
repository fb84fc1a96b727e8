use serde::{Deserialize, Serialize};

use super::PlanName;

/// A gym member as listed by the admin roster endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    #[serde(default, alias = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub plan_name: Option<PlanName>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub expiry_date: Option<String>,
}

impl Client {
    /// First eight characters of the backend id, for compact display.
    pub fn short_id(&self) -> &str {
        match &self.id {
            Some(id) => id.get(..8).unwrap_or(id.as_str()),
            None => "N/A",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_roster_entry_with_missing_fields() {
        let client: Client = serde_json::from_str(
            r#"{"_id":"65f1c0ffee1234","name":"Asha","email":"a@x.com","planName":null}"#,
        )
        .unwrap();

        assert_eq!(client.id.as_deref(), Some("65f1c0ffee1234"));
        assert_eq!(client.short_id(), "65f1c0ff");
        assert!(client.phone_number.is_none());
        assert!(client.plan_name.is_none());
        assert!(client.start_date.is_none());
    }

    #[test]
    fn decodes_assigned_plan() {
        let client: Client = serde_json::from_str(
            r#"{"name":"Ben","email":"b@x.com","phoneNumber":"555","planName":"Half-Yearly",
                "startDate":"2024-01-15","expiryDate":"2024-07-15"}"#,
        )
        .unwrap();

        assert_eq!(client.plan_name, Some(PlanName::HalfYearly));
        assert_eq!(client.expiry_date.as_deref(), Some("2024-07-15"));
        assert_eq!(client.short_id(), "N/A");
    }
}
