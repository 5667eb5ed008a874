use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Roster entry as served by the employee directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(
    example = json!({
        "id": 7,
        "firstName": "John",
        "lastName": "Doe",
        "email": "john.doe@company.com",
        "phoneNumber": "+94712345678",
        "jobTitle": "MECHANIC",
        "role": "EMPLOYEE",
        "active": true
    })
)]
pub struct Employee {
    pub id: u64,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    /// Specialization tag, e.g. MECHANIC.
    #[serde(default)]
    pub job_title: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl Employee {
    /// Only active accounts with the EMPLOYEE role are workable staff.
    pub fn is_assignable(&self) -> bool {
        self.active
            && self
                .role
                .as_deref()
                .map_or(true, |r| r.eq_ignore_ascii_case("EMPLOYEE"))
    }

    pub fn has_specialization(&self, tag: &str) -> bool {
        self.job_title
            .as_deref()
            .is_some_and(|t| t.trim().eq_ignore_ascii_case(tag.trim()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn employee(job: Option<&str>, role: Option<&str>, active: bool) -> Employee {
        Employee {
            id: 1,
            first_name: Some("Ann".into()),
            last_name: None,
            email: None,
            phone_number: None,
            job_title: job.map(str::to_string),
            role: role.map(str::to_string),
            active,
        }
    }

    #[test]
    fn specialization_match_ignores_case() {
        assert!(employee(Some("Mechanic"), None, true).has_specialization("MECHANIC"));
        assert!(!employee(Some("TECHNICIAN"), None, true).has_specialization("MECHANIC"));
        assert!(!employee(None, None, true).has_specialization("MECHANIC"));
    }

    #[test]
    fn admins_and_inactive_accounts_are_not_assignable() {
        assert!(employee(None, Some("employee"), true).is_assignable());
        assert!(!employee(None, Some("ADMIN"), true).is_assignable());
        assert!(!employee(None, Some("EMPLOYEE"), false).is_assignable());
    }

    #[test]
    fn directory_payload_defaults() {
        let e: Employee = serde_json::from_str(r#"{"id": 3, "jobTitle": "MECHANIC"}"#).unwrap();
        assert!(e.active);
        assert_eq!(e.email, None);
    }
}
